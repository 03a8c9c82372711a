#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use logsieve_core::types::{Record, Severity};
use logsieve_pattern::{DedupEngine, MemoryStore, PatternStore, Template};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// 처리할 라인 (최대 64개로 제한)
    lines: Vec<FuzzLine>,
    /// 억제할 라인 인덱스
    suppress: Option<u8>,
}

#[derive(Arbitrary, Debug)]
struct FuzzLine {
    message: String,
    severity: FuzzSeverity,
}

#[derive(Arbitrary, Debug, Clone, Copy)]
enum FuzzSeverity {
    Unknown,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<FuzzSeverity> for Severity {
    fn from(s: FuzzSeverity) -> Self {
        match s {
            FuzzSeverity::Unknown => Severity::Unknown,
            FuzzSeverity::Debug => Severity::Debug,
            FuzzSeverity::Info => Severity::Info,
            FuzzSeverity::Warn => Severity::Warn,
            FuzzSeverity::Error => Severity::Error,
        }
    }
}

fuzz_target!(|input: FuzzInput| {
    let lines = &input.lines[..input.lines.len().min(64)];
    let store = Arc::new(MemoryStore::new());
    let engine = DedupEngine::new(Arc::clone(&store));

    if let Some(line) = input.suppress.and_then(|idx| lines.get(idx as usize)) {
        let fp = Template::of(&line.message).fingerprint();
        store.suppress(fp, "fuzz").expect("memory store never fails");
    }

    let mut counted = 0u64;
    for line in lines {
        let record = Record::new(line.message.clone(), "fuzz").with_severity(line.severity.into());
        let result = engine.process(&record);

        if result.is_suppressed {
            assert_eq!(result.count, 0);
            assert!(!result.is_new);
        } else {
            counted += 1;
            assert!(result.count >= 1);
            assert_eq!(result.is_new, result.count == 1);
            assert!(!result.degraded);
            assert!(!store.is_suppressed(result.fingerprint).expect("memory store never fails"));
        }
    }

    let total: u64 = store
        .list()
        .expect("memory store never fails")
        .iter()
        .map(|entry| entry.count)
        .sum();
    assert_eq!(total, counted);
});
