//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 패턴 엔진 자체는 전역 상태를 갖지 않으며, 호출측(파이프라인)이
//! 처리 결과 필드를 보고 `metrics::counter!()` 등을 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logsieve_`
//! - 접미어: `_total` (counter), `_seconds` (histogram), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(logsieve_core::metrics::RECORDS_PROCESSED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 소스 ID 레이블 키
pub const LABEL_SOURCE: &str = "source";

/// 심각도 레이블 키 (UNKNOWN, DEBUG, INFO, WARN, ERROR)
pub const LABEL_SEVERITY: &str = "severity";

// ─── 레코드 처리 메트릭 ────────────────────────────────────────────

/// 처리된 전체 레코드 수 (counter, label: source)
pub const RECORDS_PROCESSED_TOTAL: &str = "logsieve_records_processed_total";

/// 처음 관측된 패턴 수 (counter, label: severity)
pub const PATTERNS_NEW_TOTAL: &str = "logsieve_patterns_new_total";

/// 이미 알려진 패턴으로 합쳐진 레코드 수 (counter, label: severity)
pub const PATTERNS_KNOWN_TOTAL: &str = "logsieve_patterns_known_total";

/// 억제된 레코드 수 (counter)
pub const RECORDS_SUPPRESSED_TOTAL: &str = "logsieve_records_suppressed_total";

/// 저장소 실패로 "새 패턴"으로 처리된 레코드 수 (counter)
pub const RECORDS_DEGRADED_TOTAL: &str = "logsieve_records_degraded_total";

/// 레코드 처리 지연 시간 (histogram, 초)
pub const PROCESSING_DURATION_SECONDS: &str = "logsieve_processing_duration_seconds";

/// 저장소의 고유 패턴 수 (gauge)
pub const PATTERNS_DISTINCT: &str = "logsieve_patterns_distinct";

// ─── 소스 / 알림 메트릭 ────────────────────────────────────────────

/// 소스 에러 수 (counter, label: source)
pub const SOURCE_ERRORS_TOTAL: &str = "logsieve_source_errors_total";

/// 전송된 알림 수 (counter)
pub const ALERTS_EMITTED_TOTAL: &str = "logsieve_alerts_emitted_total";

/// 전송 실패한 알림 수 (counter)
pub const ALERTS_FAILED_TOTAL: &str = "logsieve_alerts_failed_total";

/// 중복 제거 윈도우 또는 속도 제한으로 보류된 알림 수 (counter)
pub const ALERTS_THROTTLED_TOTAL: &str = "logsieve_alerts_throttled_total";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 레코드 처리 지연 시간 히스토그램 버킷 (초)
///
/// 1us ~ 100ms 범위 (메모리 저장소 기준)
pub const PROCESSING_DURATION_BUCKETS: [f64; 9] = [
    0.000_001, 0.000_005, 0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.01, 0.1,
];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `logsieve run` 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        RECORDS_PROCESSED_TOTAL,
        "Total number of records processed by the dedup engine"
    );
    describe_counter!(
        PATTERNS_NEW_TOTAL,
        "Total number of records that created a new pattern"
    );
    describe_counter!(
        PATTERNS_KNOWN_TOTAL,
        "Total number of records merged into an already known pattern"
    );
    describe_counter!(
        RECORDS_SUPPRESSED_TOTAL,
        "Total number of records dropped by a suppression rule"
    );
    describe_counter!(
        RECORDS_DEGRADED_TOTAL,
        "Total number of records treated as new because the pattern store failed"
    );
    describe_histogram!(
        PROCESSING_DURATION_SECONDS,
        "Time to process a single record in seconds"
    );
    describe_gauge!(
        PATTERNS_DISTINCT,
        "Number of distinct patterns currently in the store"
    );
    describe_counter!(
        SOURCE_ERRORS_TOTAL,
        "Total number of record sources that terminated with an error"
    );
    describe_counter!(
        ALERTS_EMITTED_TOTAL,
        "Total number of alerts delivered to the alert sink"
    );
    describe_counter!(
        ALERTS_FAILED_TOTAL,
        "Total number of alerts the alert sink rejected or failed to receive"
    );
    describe_counter!(
        ALERTS_THROTTLED_TOTAL,
        "Total number of alerts held back by the dedup window or rate limit"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        RECORDS_PROCESSED_TOTAL,
        PATTERNS_NEW_TOTAL,
        PATTERNS_KNOWN_TOTAL,
        RECORDS_SUPPRESSED_TOTAL,
        RECORDS_DEGRADED_TOTAL,
        PROCESSING_DURATION_SECONDS,
        PATTERNS_DISTINCT,
        SOURCE_ERRORS_TOTAL,
        ALERTS_EMITTED_TOTAL,
        ALERTS_FAILED_TOTAL,
        ALERTS_THROTTLED_TOTAL,
    ];

    #[test]
    fn all_metrics_start_with_logsieve_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("logsieve_"),
                "Metric '{}' does not start with 'logsieve_' prefix",
                name
            );
        }
    }

    #[test]
    fn metric_names_are_unique() {
        let unique: std::collections::HashSet<_> = ALL_METRIC_NAMES.iter().collect();
        assert_eq!(unique.len(), ALL_METRIC_NAMES.len());
    }

    #[test]
    fn counters_end_with_total() {
        let counters = [
            RECORDS_PROCESSED_TOTAL,
            PATTERNS_NEW_TOTAL,
            PATTERNS_KNOWN_TOTAL,
            RECORDS_SUPPRESSED_TOTAL,
            RECORDS_DEGRADED_TOTAL,
            SOURCE_ERRORS_TOTAL,
            ALERTS_EMITTED_TOTAL,
            ALERTS_FAILED_TOTAL,
            ALERTS_THROTTLED_TOTAL,
        ];
        for name in counters {
            assert!(name.ends_with("_total"), "counter '{name}' missing _total");
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        // 레코더가 설치되지 않아도 패닉하지 않아야 한다
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        for label in [LABEL_SOURCE, LABEL_SEVERITY] {
            assert_eq!(label.to_lowercase(), label);
        }
    }

    #[test]
    fn processing_duration_buckets_are_sorted() {
        let buckets = PROCESSING_DURATION_BUCKETS;
        for i in 1..buckets.len() {
            assert!(
                buckets[i] > buckets[i - 1],
                "Bucket values must be in ascending order"
            );
        }
    }
}
