//! Alertmanager API v2 클라이언트
//!
//! - `POST /api/v2/alerts`: 알림 목록 전송
//! - `POST /api/v2/silences`: 사일런스 생성, 응답의 `silenceID` 반환
//!
//! 2xx가 아닌 응답은 [`SinkError::Status`]로 보고됩니다.

use std::time::Duration;

use serde::Deserialize;

use logsieve_core::error::SinkError;
use logsieve_core::pipeline::AlertSink;
use logsieve_core::types::{Alert, Silence};

use crate::error::PipelineError;

/// 기본 요청 타임아웃
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const ALERTS_PATH: &str = "/api/v2/alerts";
const SILENCES_PATH: &str = "/api/v2/silences";

/// 사일런스 생성 응답
///
/// Alertmanager는 최상위 `silenceID`를 반환하고,
/// 일부 프록시는 `data` 아래에 감싸서 반환합니다.
#[derive(Debug, Default, Deserialize)]
struct SilenceResponse {
    #[serde(rename = "silenceID")]
    silence_id: Option<String>,
    data: Option<SilenceData>,
}

#[derive(Debug, Deserialize)]
struct SilenceData {
    #[serde(rename = "silenceID")]
    silence_id: String,
}

impl SilenceResponse {
    fn into_id(self) -> Option<String> {
        self.silence_id.or(self.data.map(|d| d.silence_id))
    }
}

/// Alertmanager 클라이언트
#[derive(Debug, Clone)]
pub struct AlertmanagerClient {
    base_url: String,
    client: reqwest::Client,
}

impl AlertmanagerClient {
    /// 새 클라이언트를 생성합니다. `base_url` 끝의 `/`는 무시합니다.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PipelineError> {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Client {
                endpoint: base_url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self { base_url, client })
    }

    /// 베이스 URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<reqwest::Response, SinkError> {
        let response = self
            .client
            .post(endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| SinkError::Request {
                endpoint: endpoint.to_owned(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Status {
                endpoint: endpoint.to_owned(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

impl AlertSink for AlertmanagerClient {
    async fn post_alerts(&self, alerts: &[Alert]) -> Result<(), SinkError> {
        if alerts.is_empty() {
            return Ok(());
        }
        let endpoint = self.endpoint(ALERTS_PATH);
        self.post_json(&endpoint, alerts).await?;
        tracing::debug!(endpoint = %endpoint, count = alerts.len(), "alerts posted");
        Ok(())
    }

    async fn post_silence(&self, silence: &Silence) -> Result<String, SinkError> {
        let endpoint = self.endpoint(SILENCES_PATH);
        let response = self.post_json(&endpoint, silence).await?;

        let decode_error = |reason: String| SinkError::Decode {
            endpoint: endpoint.clone(),
            reason,
        };
        let body: SilenceResponse = response
            .json()
            .await
            .map_err(|e| decode_error(e.to_string()))?;
        let id = body
            .into_id()
            .ok_or_else(|| decode_error("missing silenceID".to_owned()))?;

        tracing::info!(endpoint = %endpoint, silence_id = %id, "silence created");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = AlertmanagerClient::new("http://am:9093/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.base_url(), "http://am:9093");
        assert_eq!(client.endpoint(ALERTS_PATH), "http://am:9093/api/v2/alerts");
    }

    #[test]
    fn silence_response_accepts_both_shapes() {
        let top: SilenceResponse = serde_json::from_str(r#"{"silenceID":"abc"}"#).unwrap();
        assert_eq!(top.into_id().as_deref(), Some("abc"));

        let wrapped: SilenceResponse =
            serde_json::from_str(r#"{"data":{"silenceID":"def"}}"#).unwrap();
        assert_eq!(wrapped.into_id().as_deref(), Some("def"));

        let empty: SilenceResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.into_id().is_none());
    }

    #[tokio::test]
    async fn empty_alert_list_sends_nothing() {
        // 연결할 곳이 없어도 빈 목록은 성공
        let client = AlertmanagerClient::new("http://127.0.0.1:1", DEFAULT_TIMEOUT).unwrap();
        assert!(client.post_alerts(&[]).await.is_ok());
    }
}
