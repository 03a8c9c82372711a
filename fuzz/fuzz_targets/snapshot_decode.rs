#![no_main]

use libfuzzer_sys::fuzz_target;
use logsieve_pattern::Snapshot;

fuzz_target!(|data: &[u8]| {
    let Ok(snapshot) = serde_json::from_slice::<Snapshot>(data) else {
        return;
    };

    // 디코딩에 성공한 스냅샷은 다시 써도 같은 값으로 읽혀야 함
    let encoded = serde_json::to_vec(&snapshot).expect("decoded snapshot must re-encode");
    let decoded: Snapshot =
        serde_json::from_slice(&encoded).expect("re-encoded snapshot must decode");
    assert_eq!(decoded, snapshot);
});
