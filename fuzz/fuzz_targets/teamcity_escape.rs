#![no_main]

use libfuzzer_sys::fuzz_target;
use rlscan_scanner::reporter::{escape, service_message_with};

fuzz_target!(|value: &str| {
    let escaped = escape(value);

    // 모든 `|`는 알려진 이스케이프 쌍을 시작해야 하고, 날 문자가 남으면 안 된다
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        match c {
            '|' => assert!(matches!(
                chars.next(),
                Some('\'' | '|' | 'n' | 'r' | '[' | ']')
            )),
            '\'' | '[' | ']' | '\n' | '\r' => panic!("unescaped {c:?} in {escaped:?}"),
            _ => {}
        }
    }

    let line = service_message_with("message", &[("text", value)]);
    assert!(line.starts_with("##teamcity[message text='"));
    assert!(line.ends_with("']"));
    assert!(!line.contains('\n'));
});
