#![no_main]

use libfuzzer_sys::fuzz_target;
use logsieve_pattern::{Fingerprint, Template};

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);
    let template = Template::of(&line);

    // 같은 입력은 항상 같은 템플릿
    assert_eq!(template, Template::of(&line));
    assert_eq!(template.len(), template.words().len());

    // 단어에는 숫자나 공백이 남지 않음
    for word in template.words() {
        assert!(!word.is_empty());
        assert!(!word.bytes().any(|b| b.is_ascii_digit() || b.is_ascii_whitespace()));
    }
    assert_eq!(template.as_str(), template.words().join(" "));

    let fp = template.fingerprint();
    let hex = fp.to_string();
    assert_eq!(hex.len(), 32);
    assert_eq!(hex.parse::<Fingerprint>().ok(), Some(fp));
});
