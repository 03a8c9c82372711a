//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 레코드 소스, 패턴 엔진, 알림 싱크가 공유하는 데이터 구조를 정의합니다.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 심각도 레벨
///
/// `Ord` 구현으로 비교가 가능합니다 (`Unknown < Debug < Info < Warn < Error`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// 알 수 없음 (소스가 제공하지 않았고 분류도 실패)
    #[default]
    Unknown,
    /// 디버그
    Debug,
    /// 정보
    Info,
    /// 경고
    Warn,
    /// 에러
    Error,
}

impl Severity {
    /// 모든 심각도 (오름차순)
    pub const ALL: [Severity; 5] = [
        Self::Unknown,
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
    ];

    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다. 인식할 수 없으면 `None`을 반환합니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" | "err" => Some(Self::Error),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// 대문자 표기 이름 (`"ERROR"` 등)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }

    /// 소스가 심각도를 알려주었는지 여부
    pub fn is_known(&self) -> bool {
        *self != Self::Unknown
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 정규화된 입력 레코드
///
/// 모든 소스(파일, HTTP, Prometheus 스크레이프)는 이 형식으로 레코드를 생성하므로
/// 패턴 엔진과 하위 단계는 소스 종류를 알 필요가 없습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// 수집 시각
    pub timestamp: DateTime<Utc>,
    /// 심각도 (모르면 `Unknown`)
    #[serde(default)]
    pub severity: Severity,
    /// 메시지 본문
    pub message: String,
    /// 추가 레이블 (순서 없음)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    /// 소스 식별자
    pub source_id: String,
}

impl Record {
    /// 현재 시각, `Unknown` 심각도로 레코드를 생성합니다.
    pub fn new(message: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            severity: Severity::Unknown,
            message: message.into(),
            labels: HashMap::new(),
            source_id: source_id.into(),
        }
    }

    /// 심각도를 지정합니다.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// 레이블을 추가합니다.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.source_id, self.message)
    }
}

/// Alertmanager API v2 알림
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// 레이블 (alertname, pattern_hash, level, source)
    pub labels: HashMap<String, String>,
    /// 주석 (summary, description)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub annotations: HashMap<String, String>,
    /// 시작 시각
    #[serde(rename = "startsAt")]
    pub starts_at: DateTime<Utc>,
    /// 종료 시각 (없으면 Alertmanager가 resolve_timeout으로 결정)
    #[serde(rename = "endsAt", default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
    /// 생성기 URL
    #[serde(
        rename = "generatorURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub generator_url: Option<String>,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.labels.get("alertname").map_or("-", String::as_str);
        let hash = self.labels.get("pattern_hash").map_or("-", String::as_str);
        write!(f, "{name} pattern_hash={hash}")
    }
}

/// 레이블 매처
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matcher {
    /// 레이블 이름
    pub name: String,
    /// 매칭 값
    pub value: String,
    /// 정규식 여부
    #[serde(rename = "isRegex")]
    pub is_regex: bool,
}

/// Alertmanager API v2 사일런스 생성 요청
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Silence {
    /// 매처 목록
    pub matchers: Vec<Matcher>,
    /// 시작 시각
    #[serde(rename = "startsAt")]
    pub starts_at: DateTime<Utc>,
    /// 종료 시각
    #[serde(rename = "endsAt")]
    pub ends_at: DateTime<Utc>,
    /// 생성자
    #[serde(rename = "createdBy")]
    pub created_by: String,
    /// 코멘트 (억제 사유)
    pub comment: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Unknown < Severity::Debug);
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
    }

    #[test]
    fn severity_from_str_loose() {
        assert_eq!(Severity::from_str_loose("ERROR"), Some(Severity::Error));
        assert_eq!(Severity::from_str_loose("warning"), Some(Severity::Warn));
        assert_eq!(Severity::from_str_loose(" Info "), Some(Severity::Info));
        assert_eq!(Severity::from_str_loose("dEbUg"), Some(Severity::Debug));
        assert_eq!(Severity::from_str_loose("verbose"), None);
        assert_eq!(Severity::from_str_loose(""), None);
    }

    #[test]
    fn severity_display_is_uppercase() {
        assert_eq!(Severity::Warn.to_string(), "WARN");
        assert_eq!(Severity::default().to_string(), "UNKNOWN");
    }

    #[test]
    fn severity_serializes_uppercase() {
        let json = serde_json::to_string(&Severity::Error).unwrap();
        assert_eq!(json, "\"ERROR\"");
        let back: Severity = serde_json::from_str("\"DEBUG\"").unwrap();
        assert_eq!(back, Severity::Debug);
    }

    #[test]
    fn record_builder() {
        let record = Record::new("disk full", "file:/var/log/app.log")
            .with_severity(Severity::Error)
            .with_label("host", "web-1");
        assert_eq!(record.severity, Severity::Error);
        assert_eq!(record.labels.get("host").map(String::as_str), Some("web-1"));
        assert_eq!(
            record.to_string(),
            "[ERROR] file:/var/log/app.log: disk full"
        );
    }

    #[test]
    fn alert_uses_alertmanager_field_names() {
        let alert = Alert {
            labels: HashMap::from([("alertname".to_owned(), "logsieve".to_owned())]),
            annotations: HashMap::new(),
            starts_at: Utc::now(),
            ends_at: None,
            generator_url: None,
        };
        let value = serde_json::to_value(&alert).unwrap();
        assert!(value.get("startsAt").is_some());
        assert!(value.get("endsAt").is_none());
        assert!(value.get("annotations").is_none());
        assert_eq!(value["labels"]["alertname"], "logsieve");
    }

    #[test]
    fn silence_uses_alertmanager_field_names() {
        let silence = Silence {
            matchers: vec![Matcher {
                name: "pattern_hash".to_owned(),
                value: "abc".to_owned(),
                is_regex: false,
            }],
            starts_at: Utc::now(),
            ends_at: Utc::now(),
            created_by: "logsieve".to_owned(),
            comment: "noise".to_owned(),
        };
        let value = serde_json::to_value(&silence).unwrap();
        assert_eq!(value["matchers"][0]["isRegex"], false);
        assert_eq!(value["createdBy"], "logsieve");
    }
}
