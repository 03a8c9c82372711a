//! 레코드 수집 모듈 -- 여러 소스에서 로그 라인을 읽어 [`Record`]로 만듭니다.
//!
//! # 수집 소스
//! - [`FileSource`]: 로컬 파일을 한 번 끝까지 읽기
//! - [`HttpSource`]: 텍스트를 반환하는 HTTP 엔드포인트 한 번 조회
//! - [`PrometheusSource`]: Prometheus 노출 형식 엔드포인트 한 번 스크레이프
//!
//! # 아키텍처
//! 각 소스는 [`RecordSource::stream`] 호출 시 자체 tokio 태스크를 띄우고,
//! 레코드를 bounded `mpsc` 채널로 보냅니다. 에러는 별도 채널로 한 번만 보고되며,
//! 소스가 끝나거나 취소되면 두 채널이 모두 닫힙니다.
//!
//! [`Record`]: logsieve_core::types::Record

pub mod file;
pub mod http;
pub mod prometheus;

pub use file::FileSource;
pub use http::HttpSource;
pub use prometheus::PrometheusSource;

use std::time::Duration;

use logsieve_core::config::{SourceKind, SourceSpec};
use logsieve_core::pipeline::{RecordSender, RecordSource};
use logsieve_core::types::Record;

use crate::error::PipelineError;

/// 설정 한 항목에서 소스를 생성합니다.
pub fn build_source(spec: &SourceSpec) -> Result<Box<dyn RecordSource>, PipelineError> {
    let id = spec.effective_id();
    let timeout = spec.timeout_secs.map(Duration::from_secs);

    let source: Box<dyn RecordSource> = match spec.kind {
        SourceKind::File => Box::new(FileSource::new(id, &spec.path)),
        SourceKind::Http => {
            let timeout = timeout.unwrap_or(http::DEFAULT_TIMEOUT);
            Box::new(HttpSource::new(id, &spec.url, timeout)?)
        }
        SourceKind::Prometheus => {
            let timeout = timeout.unwrap_or(prometheus::DEFAULT_TIMEOUT);
            Box::new(PrometheusSource::new(id, &spec.url, timeout)?)
        }
    };

    tracing::debug!(source = %source.id(), kind = %spec.kind, "source configured");
    Ok(source)
}

/// 설정의 모든 소스를 순서대로 생성합니다.
pub fn sources_from_config(specs: &[SourceSpec]) -> Result<Vec<Box<dyn RecordSource>>, PipelineError> {
    specs.iter().map(build_source).collect()
}

/// 응답 본문을 트림된 비어 있지 않은 라인으로 나눕니다.
///
/// `skip_comments`이면 `#`으로 시작하는 라인(HELP/TYPE)도 건너뜁니다.
pub(crate) fn body_lines(body: &str, skip_comments: bool) -> impl Iterator<Item = &str> {
    body.lines()
        .map(str::trim)
        .filter(move |line| !line.is_empty() && !(skip_comments && line.starts_with('#')))
}

/// 라인들을 레코드로 보냅니다. 취소되었거나 수신측이 사라지면 `false`.
pub(crate) async fn emit_lines<'a>(
    tx: &RecordSender,
    source_id: &str,
    lines: impl Iterator<Item = &'a str>,
) -> bool {
    for line in lines {
        if !tx.send(Record::new(line, source_id)).await {
            return false;
        }
    }
    true
}
