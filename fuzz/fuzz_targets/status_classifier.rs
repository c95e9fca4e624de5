#![no_main]

use libfuzzer_sys::fuzz_target;
use rlscan_scanner::classifier::{classify_checks, classify_status};

fuzz_target!(|input: (i32, &str)| {
    let (exit_code, output) = input;

    // 음수만 분류 불가, 그 외에는 종료 코드가 판정을 결정한다
    match classify_status(exit_code, output) {
        Some(verdict) => {
            assert!(exit_code >= 0);
            assert_eq!(verdict.passed, exit_code == 0);
            assert!(!verdict.message.contains('\n'));
        }
        None => assert!(exit_code < 0),
    }

    match classify_checks(exit_code) {
        Some(verdict) => assert_eq!(verdict.passed, exit_code != 3),
        None => assert!(exit_code < 0),
    }
});
