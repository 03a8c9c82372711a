//! 스냅샷 비교와 규칙 제안
//!
//! 현재 패턴 목록과 이전 스냅샷을 (심각도, 지문) 기준으로 비교해
//! 새 패턴, 사라진 패턴, 횟수 변화를 구하고 간단한 휴리스틱으로 규칙을 제안합니다.
//! 두 함수 모두 순수 함수입니다.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use logsieve_core::types::Severity;

use crate::snapshot::Snapshot;
use crate::store::PatternEntry;
use crate::template::Fingerprint;

/// 횟수 급증으로 보는 최소 새 횟수
const SPIKE_MIN_COUNT: u64 = 10;

/// 횟수 급증 배수 (새 횟수 > 이전 횟수 x 배수)
const SPIKE_FACTOR: u64 = 2;

/// 두 세대 모두에 있고 횟수가 달라진 패턴
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountDelta {
    /// 심각도
    pub severity: Severity,
    /// 지문
    pub fingerprint: Fingerprint,
    /// 현재 샘플
    pub sample: String,
    /// 이전 횟수
    pub old_count: u64,
    /// 현재 횟수
    pub new_count: u64,
}

/// 비교 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Changes {
    /// 현재에만 있는 패턴
    pub new_patterns: Vec<PatternEntry>,
    /// 이전에만 있는 패턴
    pub gone_patterns: Vec<PatternEntry>,
    /// 횟수가 달라진 패턴
    pub count_deltas: Vec<CountDelta>,
}

impl Changes {
    /// 변화가 하나도 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.new_patterns.is_empty() && self.gone_patterns.is_empty() && self.count_deltas.is_empty()
    }
}

/// 현재 패턴 목록을 이전 스냅샷과 비교합니다.
///
/// 이전 스냅샷이 없으면 모든 현재 패턴이 새 패턴입니다.
/// 결과 순서는 입력 순서를 따릅니다.
pub fn diff(current: &[PatternEntry], previous: Option<&Snapshot>) -> Changes {
    let previous: &[PatternEntry] = previous
        .map(|s| s.patterns.as_slice())
        .unwrap_or_default();

    let prev_by_key: HashMap<(Severity, Fingerprint), &PatternEntry> = previous
        .iter()
        .map(|p| ((p.severity, p.fingerprint), p))
        .collect();
    let current_keys: HashSet<(Severity, Fingerprint)> = current
        .iter()
        .map(|p| (p.severity, p.fingerprint))
        .collect();

    let mut changes = Changes::default();
    let mut visited = HashSet::new();

    for entry in current {
        let key = (entry.severity, entry.fingerprint);
        if !visited.insert(key) {
            continue;
        }
        match prev_by_key.get(&key) {
            None => changes.new_patterns.push(entry.clone()),
            Some(prev) if prev.count != entry.count => changes.count_deltas.push(CountDelta {
                severity: entry.severity,
                fingerprint: entry.fingerprint,
                sample: entry.sample.clone(),
                old_count: prev.count,
                new_count: entry.count,
            }),
            Some(_) => {}
        }
    }

    let mut visited = HashSet::new();
    for entry in previous {
        let key = (entry.severity, entry.fingerprint);
        if !current_keys.contains(&key) && visited.insert(key) {
            changes.gone_patterns.push(entry.clone());
        }
    }

    changes
}

/// 제안 규칙 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    /// 억제
    Suppress,
    /// 알림
    Alert,
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Suppress => f.write_str("suppress"),
            Self::Alert => f.write_str("alert"),
        }
    }
}

/// 제안 규칙
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestedRule {
    /// 규칙 종류
    pub action: RuleAction,
    /// 대상 지문
    pub fingerprint: Fingerprint,
    /// 심각도
    pub severity: Severity,
    /// 샘플
    pub sample: String,
    /// 제안 사유
    pub reason: String,
}

/// 비교 결과에서 규칙을 제안합니다.
///
/// - 새 ERROR/WARN 패턴: `alert`
/// - 새 INFO/DEBUG 패턴 중 횟수가 `suppress_threshold` 이상: `suppress`
/// - 새 횟수가 이전의 2배를 넘고 10 이상인 변화: `alert` ("count spike")
pub fn suggest_rules(changes: &Changes, suppress_threshold: u64) -> Vec<SuggestedRule> {
    let mut rules = Vec::new();

    for p in &changes.new_patterns {
        let suggestion = match p.severity {
            Severity::Error | Severity::Warn => {
                Some((RuleAction::Alert, format!("new {} pattern", p.severity)))
            }
            Severity::Info | Severity::Debug if p.count >= suppress_threshold => Some((
                RuleAction::Suppress,
                format!("new {} pattern, count {}", p.severity, p.count),
            )),
            _ => None,
        };
        if let Some((action, reason)) = suggestion {
            rules.push(SuggestedRule {
                action,
                fingerprint: p.fingerprint,
                severity: p.severity,
                sample: p.sample.clone(),
                reason,
            });
        }
    }

    for d in &changes.count_deltas {
        if d.new_count > d.old_count.saturating_mul(SPIKE_FACTOR) && d.new_count >= SPIKE_MIN_COUNT
        {
            rules.push(SuggestedRule {
                action: RuleAction::Alert,
                fingerprint: d.fingerprint,
                severity: d.severity,
                sample: d.sample.clone(),
                reason: "count spike".to_owned(),
            });
        }
    }

    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(severity: Severity, text: &str, count: u64) -> PatternEntry {
        PatternEntry {
            severity,
            fingerprint: Fingerprint::of(text),
            sample: text.to_owned(),
            count,
        }
    }

    fn snapshot(patterns: Vec<PatternEntry>) -> Snapshot {
        Snapshot::new(patterns)
    }

    #[test]
    fn no_previous_means_everything_is_new() {
        let current = vec![entry(Severity::Error, "h1", 1), entry(Severity::Info, "h2", 3)];
        let changes = diff(&current, None);
        assert_eq!(changes.new_patterns, current);
        assert!(changes.gone_patterns.is_empty());
        assert!(changes.count_deltas.is_empty());
    }

    #[test]
    fn detects_gone_and_count_changes() {
        let current = vec![entry(Severity::Error, "h1", 5)];
        let previous = snapshot(vec![
            entry(Severity::Error, "h1", 1),
            entry(Severity::Warn, "h2", 2),
        ]);

        let changes = diff(&current, Some(&previous));
        assert!(changes.new_patterns.is_empty());
        assert_eq!(changes.gone_patterns.len(), 1);
        assert_eq!(changes.gone_patterns[0].severity, Severity::Warn);
        assert_eq!(changes.gone_patterns[0].fingerprint, Fingerprint::of("h2"));
        assert_eq!(changes.count_deltas.len(), 1);
        assert_eq!(changes.count_deltas[0].fingerprint, Fingerprint::of("h1"));
        assert_eq!(changes.count_deltas[0].old_count, 1);
        assert_eq!(changes.count_deltas[0].new_count, 5);
    }

    #[test]
    fn severity_is_part_of_the_key() {
        let current = vec![entry(Severity::Warn, "h1", 1)];
        let previous = snapshot(vec![entry(Severity::Error, "h1", 1)]);
        let changes = diff(&current, Some(&previous));
        assert_eq!(changes.new_patterns.len(), 1);
        assert_eq!(changes.gone_patterns.len(), 1);
    }

    #[test]
    fn identical_generations_have_no_changes() {
        let patterns = vec![entry(Severity::Info, "same", 4)];
        let changes = diff(&patterns, Some(&snapshot(patterns.clone())));
        assert!(changes.is_empty());
    }

    #[test]
    fn suggests_suppress_for_noisy_new_info() {
        let changes = Changes {
            new_patterns: vec![entry(Severity::Info, "noisy", 10)],
            ..Changes::default()
        };
        let rules = suggest_rules(&changes, 5);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].action, RuleAction::Suppress);
        assert_eq!(rules[0].reason, "new INFO pattern, count 10");
    }

    #[test]
    fn below_threshold_info_and_unknown_get_nothing() {
        let changes = Changes {
            new_patterns: vec![
                entry(Severity::Debug, "quiet", 4),
                entry(Severity::Unknown, "mystery", 100),
            ],
            ..Changes::default()
        };
        assert!(suggest_rules(&changes, 5).is_empty());
    }

    #[test]
    fn suggests_alert_for_new_error_and_warn() {
        let changes = Changes {
            new_patterns: vec![entry(Severity::Error, "boom", 1), entry(Severity::Warn, "hmm", 1)],
            ..Changes::default()
        };
        let rules = suggest_rules(&changes, 5);
        assert_eq!(rules.len(), 2);
        assert!(rules.iter().all(|r| r.action == RuleAction::Alert));
        assert_eq!(rules[0].reason, "new ERROR pattern");
        assert_eq!(rules[1].reason, "new WARN pattern");
    }

    #[test]
    fn count_spike_rules() {
        let delta = |old, new| CountDelta {
            severity: Severity::Info,
            fingerprint: Fingerprint::of("x"),
            sample: "x".to_owned(),
            old_count: old,
            new_count: new,
        };
        let changes = Changes {
            count_deltas: vec![delta(4, 20), delta(10, 11), delta(4, 9), delta(5, 10)],
            ..Changes::default()
        };
        let rules = suggest_rules(&changes, 5);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].action, RuleAction::Alert);
        assert_eq!(rules[0].reason, "count spike");
    }

    #[test]
    fn rule_action_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RuleAction::Suppress).unwrap(), "\"suppress\"");
        assert_eq!(RuleAction::Alert.to_string(), "alert");
    }
}
