//! 패턴 엔진 에러 타입
//!
//! 템플릿 생성, 분류, 비교는 모든 입력에 대해 실패하지 않습니다.
//! 이 모듈의 에러는 외부 입력(지문 문자열)과 영속화 계층에서만 발생합니다.

use logsieve_core::error::{ConfigError, SieveError, StorageError};

/// 패턴 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    /// 지문 문자열 형식 오류
    #[error("invalid fingerprint '{value}': {reason}")]
    InvalidFingerprint {
        /// 입력 문자열
        value: String,
        /// 실패 사유
        reason: String,
    },

    /// 저장소 / 스냅샷 영속화 에러
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<PatternError> for SieveError {
    fn from(err: PatternError) -> Self {
        match err {
            PatternError::InvalidFingerprint { value, reason } => {
                SieveError::Config(ConfigError::InvalidValue {
                    field: "fingerprint".to_owned(),
                    reason: format!("'{value}': {reason}"),
                })
            }
            PatternError::Storage(e) => SieveError::Storage(e),
        }
    }
}
