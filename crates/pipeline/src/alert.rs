//! 알림 생성 및 관리 -- 패턴 처리 결과를 Alertmanager [`Alert`]로 변환합니다.
//!
//! [`AlertGenerator`]는 억제되지 않은 [`PatternResult`]를 받아 패턴 지문 단위로
//! 중복 제거와 속도 제한을 적용한 뒤 알림을 생성합니다.
//! [`silence_for`]는 한 패턴을 조용히 만드는 사일런스를 만듭니다.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use chrono::Utc;

use logsieve_core::types::{Alert, Matcher, Severity, Silence};
use logsieve_pattern::{Fingerprint, PatternResult};

/// 알림 `alertname` 라벨 값, 사일런스 `createdBy` 값
pub const ALERT_NAME: &str = "logsieve";

/// `description` 주석에 담는 샘플의 최대 문자 수
pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// 패턴 지문 라벨 이름 (사일런스 매처도 이 라벨을 사용)
pub const LABEL_PATTERN_HASH: &str = "pattern_hash";

/// 알림 생성기
///
/// 패턴 처리 결과를 `Alert`로 변환하며,
/// 중복 제거와 속도 제한 기능을 제공합니다.
#[derive(Debug)]
pub struct AlertGenerator {
    /// 중복 제거 윈도우 (0이면 비활성)
    dedup_window: Duration,
    /// 패턴당 분당 최대 알림 수
    rate_limit_per_pattern: u32,
    /// 중복 제거 추적: 지문 -> 마지막 알림 시각
    dedup_tracker: HashMap<Fingerprint, SystemTime>,
    /// 속도 제한 추적: 지문 -> (이 분에 생성된 알림 수, 분 시작 시각)
    rate_tracker: HashMap<Fingerprint, (u32, SystemTime)>,
    /// 생성된 총 알림 수
    total_generated: u64,
    /// 중복 제거로 억제된 알림 수
    dedup_suppressed: u64,
    /// 속도 제한으로 억제된 알림 수
    rate_suppressed: u64,
}

impl AlertGenerator {
    /// 새 알림 생성기를 만듭니다.
    pub fn new(dedup_window_secs: u64, rate_limit_per_pattern: u32) -> Self {
        Self {
            dedup_window: Duration::from_secs(dedup_window_secs),
            rate_limit_per_pattern,
            dedup_tracker: HashMap::new(),
            rate_tracker: HashMap::new(),
            total_generated: 0,
            dedup_suppressed: 0,
            rate_suppressed: 0,
        }
    }

    /// 처리 결과에서 알림을 생성합니다.
    ///
    /// 억제된 결과는 무시하고, 중복 제거와 속도 제한을 통과한 경우에만 `Some(Alert)`를 반환합니다.
    pub fn generate(&mut self, result: &PatternResult, source_id: &str) -> Option<Alert> {
        if result.is_suppressed {
            return None;
        }
        let fingerprint = result.fingerprint;

        if self.is_duplicate(fingerprint) {
            self.dedup_suppressed += 1;
            tracing::debug!(fingerprint = %fingerprint, "alert suppressed by dedup window");
            return None;
        }

        if self.is_rate_limited(fingerprint) {
            self.rate_suppressed += 1;
            tracing::debug!(fingerprint = %fingerprint, "alert suppressed by rate limit");
            return None;
        }

        let alert = alert_for(result.severity, fingerprint, &result.sample, source_id);

        self.dedup_tracker.insert(fingerprint, SystemTime::now());
        self.update_rate_counter(fingerprint);
        self.total_generated += 1;

        Some(alert)
    }

    /// 중복 알림인지 확인합니다.
    fn is_duplicate(&self, fingerprint: Fingerprint) -> bool {
        if let Some(last_time) = self.dedup_tracker.get(&fingerprint)
            && let Ok(elapsed) = last_time.elapsed()
        {
            return elapsed < self.dedup_window;
        }
        false
    }

    /// 속도 제한에 걸리는지 확인합니다.
    fn is_rate_limited(&self, fingerprint: Fingerprint) -> bool {
        if let Some((count, minute_start)) = self.rate_tracker.get(&fingerprint)
            && let Ok(elapsed) = minute_start.elapsed()
            && elapsed < Duration::from_secs(60)
        {
            return *count >= self.rate_limit_per_pattern;
        }
        false
    }

    /// 속도 제한 카운터를 업데이트합니다.
    fn update_rate_counter(&mut self, fingerprint: Fingerprint) {
        let now = SystemTime::now();
        let entry = self.rate_tracker.entry(fingerprint).or_insert((0, now));

        if let Ok(elapsed) = entry.1.elapsed()
            && elapsed >= Duration::from_secs(60)
        {
            *entry = (1, now);
            return;
        }

        entry.0 += 1;
    }

    /// 만료된 추적 데이터를 정리합니다.
    ///
    /// 장시간 실행 시 주기적으로 호출하여 메모리 성장을 방지합니다.
    pub fn cleanup_expired(&mut self) {
        let dedup_keep = self.dedup_window * 2;
        self.dedup_tracker.retain(|_, last_time| {
            last_time
                .elapsed()
                .map(|e| e < dedup_keep)
                .unwrap_or(false)
        });

        self.rate_tracker.retain(|_, (_, minute_start)| {
            minute_start
                .elapsed()
                .map(|e| e < Duration::from_secs(120))
                .unwrap_or(false)
        });
    }

    /// 추적 중인 지문 수
    pub fn tracked_patterns(&self) -> usize {
        self.dedup_tracker.len().max(self.rate_tracker.len())
    }

    /// 생성된 총 알림 수를 반환합니다.
    pub fn total_generated(&self) -> u64 {
        self.total_generated
    }

    /// 중복 제거로 억제된 알림 수를 반환합니다.
    pub fn dedup_suppressed(&self) -> u64 {
        self.dedup_suppressed
    }

    /// 속도 제한으로 억제된 알림 수를 반환합니다.
    pub fn rate_suppressed(&self) -> u64 {
        self.rate_suppressed
    }
}

/// 패턴 하나에 대한 알림을 만듭니다.
///
/// 라벨: `alertname`, `pattern_hash`, `level`, `source`
/// 주석: `summary` (`<LEVEL> pattern`), `description` (샘플, 최대 500자)
pub fn alert_for(
    severity: Severity,
    fingerprint: Fingerprint,
    sample: &str,
    source_id: &str,
) -> Alert {
    let labels = HashMap::from([
        ("alertname".to_owned(), ALERT_NAME.to_owned()),
        (LABEL_PATTERN_HASH.to_owned(), fingerprint.to_string()),
        ("level".to_owned(), severity.as_str().to_owned()),
        ("source".to_owned(), source_id.to_owned()),
    ]);
    let annotations = HashMap::from([
        ("summary".to_owned(), format!("{} pattern", severity.as_str())),
        (
            "description".to_owned(),
            truncate_chars(sample, DESCRIPTION_MAX_CHARS),
        ),
    ]);

    Alert {
        labels,
        annotations,
        starts_at: Utc::now(),
        ends_at: None,
        generator_url: None,
    }
}

/// 패턴 하나를 조용히 만드는 사일런스를 만듭니다.
///
/// 매처는 `pattern_hash=<지문>` (정규식 아님), 기간은 지금부터 `duration`.
pub fn silence_for(fingerprint: Fingerprint, reason: &str, duration: Duration) -> Silence {
    let starts_at = Utc::now();
    let ends_at = chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| starts_at.checked_add_signed(d))
        .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC);

    Silence {
        matchers: vec![Matcher {
            name: LABEL_PATTERN_HASH.to_owned(),
            value: fingerprint.to_string(),
            is_regex: false,
        }],
        starts_at,
        ends_at,
        created_by: ALERT_NAME.to_owned(),
        comment: reason.to_owned(),
    }
}

/// 문자 경계를 지키며 최대 `max` 문자로 자릅니다.
fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_owned(),
        None => s.to_owned(),
    }
}
