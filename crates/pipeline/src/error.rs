//! 파이프라인 에러 타입
//!
//! [`PipelineError`]는 수집기 구성, 알림 전송, 태스크 실행 중 발생하는 에러를 표현합니다.
//! `From<PipelineError> for SieveError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use logsieve_core::error::{ConfigError, SieveError, SinkError, SourceError, StorageError};

/// 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// HTTP 클라이언트 생성 실패
    #[error("http client error for {endpoint}: {reason}")]
    Client {
        /// 대상 URL
        endpoint: String,
        /// 실패 사유
        reason: String,
    },

    /// 소스 에러
    #[error(transparent)]
    Source(#[from] SourceError),

    /// 알림 싱크 에러
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// 저장소 에러
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// 소비 태스크 실패 (패닉/취소)
    #[error("task error: {0}")]
    Task(String),
}

impl From<PipelineError> for SieveError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Config { field, reason } => {
                SieveError::Config(ConfigError::InvalidValue { field, reason })
            }
            PipelineError::Client { endpoint, reason } => {
                SieveError::Sink(SinkError::Request { endpoint, reason })
            }
            PipelineError::Source(e) => SieveError::Source(e),
            PipelineError::Sink(e) => SieveError::Sink(e),
            PipelineError::Storage(e) => SieveError::Storage(e),
            PipelineError::Task(reason) => SieveError::Io(std::io::Error::other(reason)),
        }
    }
}
