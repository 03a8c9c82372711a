//! 파이프라인 오케스트레이션 -- 수집/패턴 처리/알림의 전체 흐름을 관리합니다.
//!
//! # 내부 아키텍처
//! ```text
//! RecordSource --mpsc--> consume task --> DedupEngine::process --> PatternResult
//!  (소스당 1개)           (소스당 1개)                                 |
//!                                                    +-----------------+-----------------+
//!                                                    v                                   v
//!                                       AlertGenerator -> AlertSink            observer (mpsc)
//! ```
//!
//! 소스마다 소비 태스크가 하나씩 있어 한 소스 안의 레코드 순서는 보존됩니다.
//! 엔진과 알림 생성기는 태스크 사이에서 공유되며, 싱크 호출 중에는 어떤 락도 잡지 않습니다.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use logsieve_core::metrics as m;
use logsieve_core::pipeline::{AlertSink, RecordSource, RecordStream};
use logsieve_pattern::{DedupEngine, PatternResult, PatternStore};

use crate::alert::AlertGenerator;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::sink::AlertmanagerClient;

/// 알림 추적 데이터를 정리하는 주기 (소스당 레코드 수)
const ALERT_CLEANUP_EVERY: u64 = 4096;

/// 실패한 소스 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    /// 소스 ID
    pub source_id: String,
    /// 에러 메시지
    pub error: String,
}

/// 실행 결과 요약
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// 처리한 레코드 수
    pub records: u64,
    /// 새 패턴을 만든 레코드 수
    pub new: u64,
    /// 기존 패턴에 합쳐진 레코드 수
    pub known: u64,
    /// 억제된 레코드 수
    pub suppressed: u64,
    /// 저장소 실패로 성능 저하 모드로 처리된 레코드 수
    pub degraded: u64,
    /// 전송에 성공한 알림 수
    pub alerts_sent: u64,
    /// 전송에 실패한 알림 수
    pub alerts_failed: u64,
    /// 중복 제거/속도 제한으로 보내지 않은 알림 수
    pub alerts_throttled: u64,
    /// 에러로 종료된 소스 목록
    pub source_errors: Vec<SourceFailure>,
}

impl RunReport {
    fn tally(&mut self, result: &PatternResult) {
        self.records += 1;
        if result.is_suppressed {
            self.suppressed += 1;
        } else if result.is_new {
            self.new += 1;
        } else {
            self.known += 1;
        }
        if result.degraded {
            self.degraded += 1;
        }
    }

    fn merge(&mut self, other: RunReport) {
        self.records += other.records;
        self.new += other.new;
        self.known += other.known;
        self.suppressed += other.suppressed;
        self.degraded += other.degraded;
        self.alerts_sent += other.alerts_sent;
        self.alerts_failed += other.alerts_failed;
        self.alerts_throttled += other.alerts_throttled;
        self.source_errors.extend(other.source_errors);
    }
}

/// 소비 태스크들이 공유하는 상태
struct Shared<S, K> {
    engine: Arc<DedupEngine<S>>,
    sink: Option<Arc<K>>,
    alerts: Mutex<AlertGenerator>,
    observer: Option<mpsc::Sender<PatternResult>>,
}

impl<S: PatternStore, K: AlertSink> Shared<S, K> {
    async fn emit_alert(&self, result: &PatternResult, source_id: &str, report: &mut RunReport) {
        let Some(sink) = &self.sink else {
            return;
        };

        let alert = {
            let mut generator = self.alerts.lock().unwrap_or_else(PoisonError::into_inner);
            generator.generate(result, source_id)
        };
        let Some(alert) = alert else {
            report.alerts_throttled += 1;
            counter!(m::ALERTS_THROTTLED_TOTAL).increment(1);
            return;
        };

        match sink.post_alerts(std::slice::from_ref(&alert)).await {
            Ok(()) => {
                report.alerts_sent += 1;
                counter!(m::ALERTS_EMITTED_TOTAL).increment(1);
            }
            Err(e) => {
                report.alerts_failed += 1;
                counter!(m::ALERTS_FAILED_TOTAL).increment(1);
                tracing::warn!(
                    source = %source_id,
                    fingerprint = %result.fingerprint,
                    error = %e,
                    "failed to post alert"
                );
            }
        }
    }

    fn cleanup_alerts(&self) {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cleanup_expired();
    }
}

fn record_metrics(source_id: &str, result: &PatternResult) {
    counter!(m::RECORDS_PROCESSED_TOTAL, m::LABEL_SOURCE => source_id.to_owned()).increment(1);
    if result.is_suppressed {
        counter!(m::RECORDS_SUPPRESSED_TOTAL).increment(1);
        return;
    }
    let severity = result.severity.as_str();
    if result.is_new {
        counter!(m::PATTERNS_NEW_TOTAL, m::LABEL_SEVERITY => severity).increment(1);
    } else {
        counter!(m::PATTERNS_KNOWN_TOTAL, m::LABEL_SEVERITY => severity).increment(1);
    }
    if result.degraded {
        counter!(m::RECORDS_DEGRADED_TOTAL).increment(1);
    }
}

/// 소스 하나의 스트림을 끝까지 소비합니다.
async fn consume<S: PatternStore, K: AlertSink>(
    source_id: String,
    mut stream: RecordStream,
    shared: Arc<Shared<S, K>>,
) -> RunReport {
    let mut report = RunReport::default();

    while let Some(record) = stream.records.recv().await {
        let started = Instant::now();
        let result = shared.engine.process(&record);
        histogram!(m::PROCESSING_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        report.tally(&result);
        record_metrics(&record.source_id, &result);
        if result.is_new
            && let Ok(distinct) = shared.engine.distinct_patterns()
        {
            gauge!(m::PATTERNS_DISTINCT).set(distinct as f64);
        }
        if report.records % ALERT_CLEANUP_EVERY == 0 {
            shared.cleanup_alerts();
        }

        if result.is_suppressed {
            continue;
        }
        shared.emit_alert(&result, &record.source_id, &mut report).await;
        if let Some(observer) = &shared.observer
            && observer.send(result).await.is_err()
        {
            tracing::trace!(source = %source_id, "result observer closed");
        }
    }

    if let Some(err) = stream.errors.recv().await {
        counter!(m::SOURCE_ERRORS_TOTAL, m::LABEL_SOURCE => source_id.clone()).increment(1);
        tracing::warn!(source = %source_id, error = %err, "source terminated with error");
        report.source_errors.push(SourceFailure {
            source_id: source_id.clone(),
            error: err.to_string(),
        });
    }

    tracing::debug!(source = %source_id, records = report.records, "source drained");
    report
}

/// 수집 파이프라인 -- 여러 소스를 동시에 소비해 엔진에 넣고 알림을 보냅니다.
///
/// # 사용 예시
/// ```ignore
/// use logsieve_pipeline::SievePipelineBuilder;
///
/// let pipeline = SievePipelineBuilder::new(engine)
///     .config(config)
///     .sources(sources)
///     .sink(Arc::new(client))
///     .build()?;
///
/// let report = pipeline.run().await;
/// ```
pub struct SievePipeline<S, K = AlertmanagerClient> {
    config: PipelineConfig,
    engine: Arc<DedupEngine<S>>,
    sources: Vec<Box<dyn RecordSource>>,
    sink: Option<Arc<K>>,
    observer: Option<mpsc::Sender<PatternResult>>,
    cancel: CancellationToken,
}

impl<S: PatternStore, K: AlertSink> SievePipeline<S, K> {
    /// 취소 토큰. 취소하면 모든 소스가 멈추고 `run`이 반환됩니다.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 등록된 소스 수
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// 모든 소스를 끝까지 (또는 취소될 때까지) 처리합니다.
    ///
    /// 소스 하나의 에러는 그 소스만 종료시키고 [`RunReport::source_errors`]에 기록됩니다.
    pub async fn run(self) -> RunReport {
        let Self {
            config,
            engine,
            sources,
            sink,
            observer,
            cancel,
        } = self;

        let shared = Arc::new(Shared {
            engine,
            sink,
            alerts: Mutex::new(AlertGenerator::new(
                config.alert_dedup_window_secs,
                config.alert_rate_limit_per_pattern,
            )),
            observer,
        });

        tracing::info!(sources = sources.len(), "pipeline started");

        let mut tasks = Vec::with_capacity(sources.len());
        for source in sources {
            let source_id = source.id().to_owned();
            let stream = source.stream(config.channel_capacity, cancel.clone());
            let handle = tokio::spawn(consume(source_id.clone(), stream, Arc::clone(&shared)));
            tasks.push((source_id, handle));
        }

        let mut report = RunReport::default();
        for (source_id, handle) in tasks {
            match handle.await {
                Ok(partial) => report.merge(partial),
                Err(e) => {
                    tracing::error!(source = %source_id, error = %e, "consume task failed");
                    report.source_errors.push(SourceFailure {
                        source_id,
                        error: PipelineError::Task(e.to_string()).to_string(),
                    });
                }
            }
        }

        tracing::info!(
            records = report.records,
            new = report.new,
            known = report.known,
            suppressed = report.suppressed,
            failed_sources = report.source_errors.len(),
            cancelled = cancel.is_cancelled(),
            "pipeline finished"
        );
        report
    }
}

/// 파이프라인 빌더
pub struct SievePipelineBuilder<S, K = AlertmanagerClient> {
    config: PipelineConfig,
    engine: Arc<DedupEngine<S>>,
    sources: Vec<Box<dyn RecordSource>>,
    sink: Option<Arc<K>>,
    observer: Option<mpsc::Sender<PatternResult>>,
    cancel: Option<CancellationToken>,
}

impl<S: PatternStore> SievePipelineBuilder<S> {
    /// 새 빌더를 생성합니다. 싱크를 지정하지 않으면 알림을 보내지 않습니다.
    pub fn new(engine: Arc<DedupEngine<S>>) -> Self {
        Self {
            config: PipelineConfig::default(),
            engine,
            sources: Vec::new(),
            sink: None,
            observer: None,
            cancel: None,
        }
    }
}

impl<S: PatternStore, K: AlertSink> SievePipelineBuilder<S, K> {
    /// 파이프라인 설정을 지정합니다.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// 소스를 하나 추가합니다.
    pub fn source(mut self, source: Box<dyn RecordSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// 소스 여러 개를 추가합니다.
    pub fn sources(mut self, sources: impl IntoIterator<Item = Box<dyn RecordSource>>) -> Self {
        self.sources.extend(sources);
        self
    }

    /// 알림 싱크를 지정합니다.
    pub fn sink<K2: AlertSink>(self, sink: Arc<K2>) -> SievePipelineBuilder<S, K2> {
        SievePipelineBuilder {
            config: self.config,
            engine: self.engine,
            sources: self.sources,
            sink: Some(sink),
            observer: self.observer,
            cancel: self.cancel,
        }
    }

    /// 억제되지 않은 처리 결과를 받을 채널을 지정합니다.
    pub fn observer(mut self, tx: mpsc::Sender<PatternResult>) -> Self {
        self.observer = Some(tx);
        self
    }

    /// 외부 취소 토큰을 지정합니다. 지정하지 않으면 새로 만듭니다.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// 파이프라인을 빌드합니다.
    pub fn build(self) -> Result<SievePipeline<S, K>, PipelineError> {
        self.config.validate()?;

        Ok(SievePipeline {
            config: self.config,
            engine: self.engine,
            sources: self.sources,
            sink: self.sink,
            observer: self.observer,
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}
