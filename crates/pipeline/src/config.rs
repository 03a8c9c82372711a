//! 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`SieveConfig`]에서 파이프라인이 실제로 쓰는 값만 추려냅니다.
//!
//! # 사용 예시
//! ```
//! use logsieve_core::config::SieveConfig;
//! use logsieve_pipeline::config::PipelineConfig;
//!
//! let core_config = SieveConfig::default();
//! let config = PipelineConfig::from_core(&core_config);
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use logsieve_core::config::SieveConfig;

use crate::error::PipelineError;

/// 파이프라인 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 소스별 레코드 큐 용량
    pub channel_capacity: usize,
    /// Alertmanager 베이스 URL (비어 있으면 알림 비활성)
    pub alertmanager_url: String,
    /// Alertmanager 요청 타임아웃 (초)
    pub alertmanager_timeout_secs: u64,
    /// 같은 패턴의 알림 중복 제거 윈도우 (초, 0이면 비활성)
    pub alert_dedup_window_secs: u64,
    /// 패턴당 분당 최대 알림 수
    pub alert_rate_limit_per_pattern: u32,
    /// 사일런스 유효 기간 (시간)
    pub silence_duration_hours: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_core(&SieveConfig::default())
    }
}

impl PipelineConfig {
    /// core 설정에서 파이프라인 설정을 생성합니다.
    pub fn from_core(core: &SieveConfig) -> Self {
        Self {
            channel_capacity: core.pipeline.channel_capacity,
            alertmanager_url: core.alertmanager.url.clone(),
            alertmanager_timeout_secs: core.alertmanager.timeout_secs,
            alert_dedup_window_secs: core.alertmanager.dedup_window_secs,
            alert_rate_limit_per_pattern: core.alertmanager.rate_limit_per_pattern,
            silence_duration_hours: core.alertmanager.silence_duration_hours,
        }
    }

    /// 알림 전송이 설정되었는지 여부
    pub fn alerts_enabled(&self) -> bool {
        !self.alertmanager_url.is_empty()
    }

    /// Alertmanager 요청 타임아웃
    pub fn alertmanager_timeout(&self) -> Duration {
        Duration::from_secs(self.alertmanager_timeout_secs)
    }

    /// 사일런스 유효 기간
    pub fn silence_duration(&self) -> Duration {
        Duration::from_secs(self.silence_duration_hours.saturating_mul(3600))
    }

    /// 설정 값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.channel_capacity == 0 {
            return Err(PipelineError::Config {
                field: "channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.alerts_enabled() {
            if self.alertmanager_timeout_secs == 0 {
                return Err(PipelineError::Config {
                    field: "alertmanager_timeout_secs".to_owned(),
                    reason: "must be greater than 0".to_owned(),
                });
            }
            if self.silence_duration_hours == 0 {
                return Err(PipelineError::Config {
                    field: "silence_duration_hours".to_owned(),
                    reason: "must be greater than 0".to_owned(),
                });
            }
        }

        Ok(())
    }
}
