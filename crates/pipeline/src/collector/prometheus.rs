//! Prometheus 노출 형식 소스
//!
//! `/metrics` 엔드포인트를 한 번 스크레이프하고, `# HELP` / `# TYPE` 주석 라인을 뺀
//! 샘플 라인마다 레코드 하나를 만듭니다.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use logsieve_core::pipeline::{RecordSource, RecordStream};

use super::http::{build_client, scrape};
use crate::error::PipelineError;

/// 기본 스크레이프 타임아웃
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Prometheus 스크레이프 소스
#[derive(Debug, Clone)]
pub struct PrometheusSource {
    id: String,
    url: String,
    client: reqwest::Client,
}

impl PrometheusSource {
    /// 새 스크레이프 소스를 생성합니다.
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

    /// 스크레이프할 URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RecordSource for PrometheusSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn stream(self: Box<Self>, capacity: usize, cancel: CancellationToken) -> RecordStream {
        let (tx, stream) = RecordStream::channel(capacity, cancel);
        let Self { id, url, client } = *self;
        tokio::spawn(async move {
            scrape(&client, &id, &url, true, tx).await;
        });
        stream
    }
}
