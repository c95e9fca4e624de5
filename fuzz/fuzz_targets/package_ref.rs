#![no_main]

use libfuzzer_sys::fuzz_target;
use rlscan_core::types::PackageRef;

fuzz_target!(|data: &str| {
    if let Ok(purl) = PackageRef::parse(data) {
        let base = purl.without_build_param();
        assert!(!base.is_reproducible_build());
        assert_eq!(base.without_build_param(), base);
    }
});
