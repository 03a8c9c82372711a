//! 에러 타입 -- 도메인별 에러 정의
//!
//! 모든 에러는 문제가 된 리소스(파일 경로, 소스 ID, URL)를 메시지에 포함합니다.

/// logsieve 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum SieveError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 패턴 저장소 / 스냅샷 영속화 에러
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// 레코드 소스 에러
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// 알림 싱크 에러
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 영속화 에러
///
/// 저장소 파일, 스냅샷 파일 등 디스크 상태의 읽기/쓰기/디코딩 실패를 나타냅니다.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 읽기 실패
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    /// 쓰기 실패
    #[error("failed to write {path}: {reason}")]
    Write { path: String, reason: String },

    /// 저장된 상태가 손상됨 (디코딩 실패)
    #[error("corrupt state in {path}: {reason}")]
    Corrupt { path: String, reason: String },

    /// 백엔드 사용 불가
    #[error("storage backend unavailable: {0}")]
    Backend(String),
}

/// 레코드 소스 에러
///
/// 소스 하나의 스트림만 종료시키며, 다른 소스에는 영향을 주지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// 소스 I/O 실패 (파일 열기/읽기)
    #[error("source '{source_id}': io error on {path}: {reason}")]
    Io {
        source_id: String,
        path: String,
        reason: String,
    },

    /// HTTP 요청 실패 (연결, 타임아웃, 본문 읽기)
    #[error("source '{source_id}': request to {url} failed: {reason}")]
    Request {
        source_id: String,
        url: String,
        reason: String,
    },

    /// 비정상 HTTP 상태 코드
    #[error("source '{source_id}': GET {url} returned {status}")]
    Status {
        source_id: String,
        url: String,
        status: u16,
    },
}

impl SourceError {
    /// 에러를 발생시킨 소스 ID를 반환합니다.
    pub fn source_id(&self) -> &str {
        match self {
            Self::Io { source_id, .. }
            | Self::Request { source_id, .. }
            | Self::Status { source_id, .. } => source_id,
        }
    }
}

/// 알림 싱크 에러
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// 요청 전송 실패
    #[error("request to {endpoint} failed: {reason}")]
    Request { endpoint: String, reason: String },

    /// 2xx가 아닌 응답
    #[error("{endpoint} returned {status}")]
    Status { endpoint: String, status: u16 },

    /// 응답 디코딩 실패
    #[error("invalid response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_names_path() {
        let err = StorageError::Corrupt {
            path: "/var/lib/logsieve/store.json".to_owned(),
            reason: "expected value at line 1".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/var/lib/logsieve/store.json"));
        assert!(msg.contains("expected value"));
    }

    #[test]
    fn source_error_names_source_and_resource() {
        let err = SourceError::Status {
            source_id: "metrics".to_owned(),
            url: "http://127.0.0.1:9100/metrics".to_owned(),
            status: 503,
        };
        let msg = err.to_string();
        assert!(msg.contains("metrics"));
        assert!(msg.contains("9100"));
        assert!(msg.contains("503"));
        assert_eq!(err.source_id(), "metrics");
    }

    #[test]
    fn converts_to_sieve_error() {
        let err: SieveError = StorageError::Backend("locked".to_owned()).into();
        assert!(matches!(err, SieveError::Storage(_)));

        let err: SieveError = ConfigError::FileNotFound {
            path: "logsieve.toml".to_owned(),
        }
        .into();
        assert!(err.to_string().contains("logsieve.toml"));
    }
}
