//! HTTP 텍스트 소스
//!
//! 엔드포인트를 한 번 GET으로 조회하고, 응답 본문을 라인 단위 레코드로 나눕니다.
//! 200이 아닌 응답은 URL과 상태 코드를 담은 에러로 보고됩니다.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use logsieve_core::error::SourceError;
use logsieve_core::pipeline::{RecordSender, RecordSource, RecordStream};

use super::{body_lines, emit_lines};
use crate::error::PipelineError;

/// 기본 요청 타임아웃
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP 텍스트 소스
#[derive(Debug, Clone)]
pub struct HttpSource {
    id: String,
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    /// 새 HTTP 소스를 생성합니다.
    pub fn new(
        id: impl Into<String>,
        url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let url = url.into();
        let client = build_client(&url, timeout)?;
        Ok(Self {
            id: id.into(),
            url,
            client,
        })
    }

    /// 조회할 URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RecordSource for HttpSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn stream(self: Box<Self>, capacity: usize, cancel: CancellationToken) -> RecordStream {
        let (tx, stream) = RecordStream::channel(capacity, cancel);
        let Self { id, url, client } = *self;
        tokio::spawn(async move {
            scrape(&client, &id, &url, false, tx).await;
        });
        stream
    }
}

/// 타임아웃이 설정된 HTTP 클라이언트를 생성합니다.
pub(crate) fn build_client(url: &str, timeout: Duration) -> Result<reqwest::Client, PipelineError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PipelineError::Client {
            endpoint: url.to_owned(),
            reason: e.to_string(),
        })
}

/// URL을 한 번 조회하고 본문 라인을 레코드로 보냅니다.
///
/// 조회 중 취소되면 에러 없이 종료합니다.
pub(crate) async fn scrape(
    client: &reqwest::Client,
    source_id: &str,
    url: &str,
    skip_comments: bool,
    tx: RecordSender,
) {
    let fetched = tokio::select! {
        biased;
        _ = tx.cancel_token().cancelled() => {
            tracing::debug!(source = %source_id, "scrape cancelled");
            return;
        }
        fetched = fetch_text(client, source_id, url) => fetched,
    };

    match fetched {
        Ok(body) => {
            if emit_lines(&tx, source_id, body_lines(&body, skip_comments)).await {
                tracing::debug!(source = %source_id, url = %url, "scrape finished");
            }
        }
        Err(e) => {
            tracing::warn!(source = %source_id, error = %e, "scrape failed");
            tx.fail(e).await;
        }
    }
}

async fn fetch_text(
    client: &reqwest::Client,
    source_id: &str,
    url: &str,
) -> Result<String, SourceError> {
    let request_error = |e: reqwest::Error| SourceError::Request {
        source_id: source_id.to_owned(),
        url: url.to_owned(),
        reason: e.to_string(),
    };

    let response = client.get(url).send().await.map_err(request_error)?;
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(SourceError::Status {
            source_id: source_id.to_owned(),
            url: url.to_owned(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(request_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_keeps_url() {
        let source = HttpSource::new("api", "http://127.0.0.1:8080/logs", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(source.id(), "api");
        assert_eq!(source.url(), "http://127.0.0.1:8080/logs");
    }

    #[tokio::test]
    async fn connection_refused_reports_url() {
        // 바인드 후 즉시 닫아서 연결이 거부되는 포트를 얻는다
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = format!("http://{addr}/logs");
        let source = HttpSource::new("api", &url, Duration::from_secs(2)).unwrap();
        let mut stream = Box::new(source).stream(4, CancellationToken::new());

        assert!(stream.records.recv().await.is_none());
        let err = stream.errors.recv().await.expect("request error");
        assert!(matches!(err, SourceError::Request { .. }));
        assert!(err.to_string().contains(&url));
    }
}
