//! 설정 관리 -- logsieve.toml 파싱 및 런타임 설정
//!
//! [`SieveConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGSIEVE_STORE_PATH=/var/lib/logsieve/store.json` 형식)
//! 3. 설정 파일 (`logsieve.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logsieve_core::error::SieveError> {
//! use logsieve_core::config::SieveConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = SieveConfig::load("logsieve.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = SieveConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, SieveError};

/// logsieve 통합 설정
///
/// `logsieve.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SieveConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 패턴 저장소 설정
    #[serde(default)]
    pub store: StoreConfig,
    /// 스냅샷 설정
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    /// Alertmanager 연동 설정
    #[serde(default)]
    pub alertmanager: AlertmanagerConfig,
    /// 메트릭 엔드포인트 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// 수집 파이프라인 설정
    #[serde(default)]
    pub pipeline: IngestConfig,
    /// 레코드 소스 목록
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

impl SieveConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SieveError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SieveError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SieveError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                SieveError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, SieveError> {
        toml::from_str(toml_str).map_err(|e| {
            SieveError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGSIEVE_{SECTION}_{FIELD}`
    /// 예: `LOGSIEVE_ALERTMANAGER_URL=http://localhost:9093`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGSIEVE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGSIEVE_GENERAL_LOG_FORMAT");

        // Store / Snapshot
        override_string(&mut self.store.path, "LOGSIEVE_STORE_PATH");
        override_string(&mut self.snapshot.dir, "LOGSIEVE_SNAPSHOT_DIR");
        override_usize(&mut self.snapshot.retain, "LOGSIEVE_SNAPSHOT_RETAIN");

        // Alertmanager
        override_string(&mut self.alertmanager.url, "LOGSIEVE_ALERTMANAGER_URL");
        override_u64(
            &mut self.alertmanager.timeout_secs,
            "LOGSIEVE_ALERTMANAGER_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.alertmanager.dedup_window_secs,
            "LOGSIEVE_ALERTMANAGER_DEDUP_WINDOW_SECS",
        );
        override_u32(
            &mut self.alertmanager.rate_limit_per_pattern,
            "LOGSIEVE_ALERTMANAGER_RATE_LIMIT_PER_PATTERN",
        );
        override_u64(
            &mut self.alertmanager.silence_duration_hours,
            "LOGSIEVE_ALERTMANAGER_SILENCE_DURATION_HOURS",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "LOGSIEVE_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "LOGSIEVE_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "LOGSIEVE_METRICS_PORT");

        // Pipeline
        override_usize(
            &mut self.pipeline.channel_capacity,
            "LOGSIEVE_PIPELINE_CHANNEL_CAPACITY",
        );
        override_u64(
            &mut self.pipeline.suppress_threshold,
            "LOGSIEVE_PIPELINE_SUPPRESS_THRESHOLD",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), SieveError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.pipeline.channel_capacity == 0 {
            return Err(invalid(
                "pipeline.channel_capacity",
                "must be greater than 0".to_owned(),
            ));
        }

        if !self.alertmanager.url.is_empty() {
            if !self.alertmanager.url.starts_with("http://")
                && !self.alertmanager.url.starts_with("https://")
            {
                return Err(invalid(
                    "alertmanager.url",
                    format!("'{}' must start with http:// or https://", self.alertmanager.url),
                ));
            }
            if self.alertmanager.timeout_secs == 0 {
                return Err(invalid(
                    "alertmanager.timeout_secs",
                    "must be greater than 0".to_owned(),
                ));
            }
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid("metrics.port", "must be greater than 0".to_owned()));
        }

        let mut seen_ids = HashSet::new();
        for (i, source) in self.sources.iter().enumerate() {
            let field = format!("sources[{i}]");
            match source.kind {
                SourceKind::File if source.path.is_empty() => {
                    return Err(invalid(&field, "file source requires 'path'".to_owned()));
                }
                SourceKind::Http | SourceKind::Prometheus if source.url.is_empty() => {
                    return Err(invalid(
                        &field,
                        format!("{} source requires 'url'", source.kind),
                    ));
                }
                _ => {}
            }
            if source.timeout_secs == Some(0) {
                return Err(invalid(
                    &format!("{field}.timeout_secs"),
                    "must be greater than 0".to_owned(),
                ));
            }
            let id = source.effective_id();
            if !seen_ids.insert(id.clone()) {
                return Err(invalid(&field, format!("duplicate source id '{id}'")));
            }
        }

        Ok(())
    }

    /// 파일 영속화가 설정되었는지 여부
    pub fn has_store_path(&self) -> bool {
        !self.store.path.is_empty()
    }
}

fn invalid(field: &str, reason: String) -> SieveError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 패턴 저장소 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON 상태 파일 경로 (비어 있으면 메모리 전용)
    pub path: String,
}

/// 스냅샷 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// 스냅샷 디렉토리 (비어 있으면 비활성)
    pub dir: String,
    /// 보관할 세대 수 (0이면 전부 보관)
    pub retain: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            dir: String::new(),
            retain: 10,
        }
    }
}

/// Alertmanager 연동 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertmanagerConfig {
    /// 베이스 URL (비어 있으면 알림 비활성)
    pub url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 같은 패턴의 알림 중복 제거 윈도우 (초, 0이면 비활성)
    pub dedup_window_secs: u64,
    /// 패턴당 분당 최대 알림 수
    pub rate_limit_per_pattern: u32,
    /// 생성하는 사일런스의 유효 기간 (시간)
    pub silence_duration_hours: u64,
}

impl Default for AlertmanagerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: 10,
            dedup_window_secs: 300,
            rate_limit_per_pattern: 10,
            silence_duration_hours: 8760,
        }
    }
}

impl AlertmanagerConfig {
    /// 알림 전송이 설정되었는지 여부
    pub fn is_enabled(&self) -> bool {
        !self.url.is_empty()
    }
}

/// 메트릭 엔드포인트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9464,
        }
    }
}

/// 수집 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// 소스별 레코드 큐 용량
    pub channel_capacity: usize,
    /// 새 INFO/DEBUG 패턴 억제 제안 임계값
    pub suppress_threshold: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            suppress_threshold: 5,
        }
    }
}

/// 소스 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// 로컬 파일 (한 번 읽기)
    File,
    /// 텍스트를 반환하는 HTTP 엔드포인트
    Http,
    /// Prometheus 노출 형식 엔드포인트
    #[serde(alias = "metrics")]
    Prometheus,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Http => write!(f, "http"),
            Self::Prometheus => write!(f, "prometheus"),
        }
    }
}

/// 레코드 소스 하나의 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    /// 소스 ID (비어 있으면 `<type>:<path|url>`)
    #[serde(default)]
    pub id: String,
    /// 소스 종류
    #[serde(rename = "type")]
    pub kind: SourceKind,
    /// 파일 경로 (file)
    #[serde(default)]
    pub path: String,
    /// URL (http, prometheus)
    #[serde(default)]
    pub url: String,
    /// 요청 타임아웃 (초, 네트워크 소스 전용)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl SourceSpec {
    /// 실제로 사용할 소스 ID
    pub fn effective_id(&self) -> String {
        if !self.id.is_empty() {
            return self.id.clone();
        }
        match self.kind {
            SourceKind::File => format!("file:{}", self.path),
            SourceKind::Http => format!("http:{}", self.url),
            SourceKind::Prometheus => format!("prometheus:{}", self.url),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    override_parsed(target, env_key, "bool");
}

fn override_usize(target: &mut usize, env_key: &str) {
    override_parsed(target, env_key, "usize");
}

fn override_u16(target: &mut u16, env_key: &str) {
    override_parsed(target, env_key, "u16");
}

fn override_u32(target: &mut u32, env_key: &str) {
    override_parsed(target, env_key, "u32");
}

fn override_u64(target: &mut u64, env_key: &str) {
    override_parsed(target, env_key, "u64");
}

fn override_parsed<T: std::str::FromStr>(target: &mut T, env_key: &str, type_name: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                expected = type_name,
                "failed to parse env var, ignoring"
            ),
        }
    }
}
