//! 파이프라인 trait -- 모듈 확장 포인트 정의
//!
//! - [`RecordSource`]: 레코드 생산자 (파일, HTTP, 메트릭 스크레이프 등)
//! - [`AlertSink`]: 알림/사일런스 소비자 (Alertmanager 등)
//!
//! 패턴 엔진은 이 trait들만 알고, 구체적인 구현에는 의존하지 않습니다.

use std::future::Future;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{SinkError, SourceError};
use crate::types::{Alert, Record, Silence};

/// 레코드 생산자 trait
///
/// 새로운 입력 소스를 지원하려면 이 trait을 구현합니다.
/// `stream`은 백그라운드 태스크를 띄우고 즉시 반환해야 하며,
/// 소스가 소진되거나 취소되면 두 채널을 모두 닫아야 합니다.
pub trait RecordSource: Send + 'static {
    /// 안정적인 소스 식별자 (예: `file:/var/log/app.log`)
    fn id(&self) -> &str;

    /// 레코드 스트림을 시작합니다.
    ///
    /// `capacity`는 레코드 큐의 최대 길이입니다.
    fn stream(self: Box<Self>, capacity: usize, cancel: CancellationToken) -> RecordStream;
}

/// 소스 하나의 출력 -- 레코드 큐와 별도의 에러 채널
#[derive(Debug)]
pub struct RecordStream {
    /// 레코드 수신 채널 (소스 내 순서 보존)
    pub records: mpsc::Receiver<Record>,
    /// 에러 수신 채널 (최대 1개, 종료 시 닫힘)
    pub errors: mpsc::Receiver<SourceError>,
}

impl RecordStream {
    /// 송신측과 수신측 쌍을 생성합니다.
    pub fn channel(capacity: usize, cancel: CancellationToken) -> (RecordSender, Self) {
        let (record_tx, record_rx) = mpsc::channel(capacity.max(1));
        let (error_tx, error_rx) = mpsc::channel(1);
        (
            RecordSender {
                records: record_tx,
                errors: error_tx,
                cancel,
            },
            Self {
                records: record_rx,
                errors: error_rx,
            },
        )
    }
}

/// 소스 구현이 사용하는 송신측
///
/// 드롭되면 두 채널이 모두 닫힙니다.
#[derive(Debug)]
pub struct RecordSender {
    records: mpsc::Sender<Record>,
    errors: mpsc::Sender<SourceError>,
    cancel: CancellationToken,
}

impl RecordSender {
    /// 레코드를 큐에 넣습니다.
    ///
    /// 큐가 가득 차 있어도 취소되면 즉시 반환합니다.
    /// 계속 보내도 되면 `true`, 취소되었거나 수신측이 사라졌으면 `false`를 반환합니다.
    pub async fn send(&self, record: Record) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            result = self.records.send(record) => result.is_ok(),
        }
    }

    /// 에러를 보고하고 스트림을 종료합니다.
    pub async fn fail(self, err: SourceError) {
        // 에러 채널 용량이 1이고 에러는 한 번만 보내므로 대기하지 않는다
        if self.errors.try_send(err).is_err() {
            tracing::debug!("source error dropped, receiver closed");
        }
    }

    /// 취소 여부
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 취소 토큰
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// 알림 소비자 trait
///
/// Alertmanager 같은 외부 시스템으로 알림과 사일런스를 전달합니다.
/// 구현은 `Send + Sync + 'static`이어야 여러 소스 태스크에서 공유할 수 있습니다.
pub trait AlertSink: Send + Sync + 'static {
    /// 알림 목록을 전송합니다.
    fn post_alerts(&self, alerts: &[Alert]) -> impl Future<Output = Result<(), SinkError>> + Send;

    /// 사일런스를 생성하고 ID를 반환합니다.
    fn post_silence(
        &self,
        silence: &Silence,
    ) -> impl Future<Output = Result<String, SinkError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sender_delivers_in_order() {
        let cancel = CancellationToken::new();
        let (tx, mut stream) = RecordStream::channel(4, cancel);

        assert!(tx.send(Record::new("first", "test")).await);
        assert!(tx.send(Record::new("second", "test")).await);
        drop(tx);

        assert_eq!(stream.records.recv().await.unwrap().message, "first");
        assert_eq!(stream.records.recv().await.unwrap().message, "second");
        assert!(stream.records.recv().await.is_none());
        assert!(stream.errors.recv().await.is_none());
    }

    #[tokio::test]
    async fn send_unblocks_on_cancel_when_queue_full() {
        let cancel = CancellationToken::new();
        let (tx, _stream) = RecordStream::channel(1, cancel.clone());

        assert!(tx.send(Record::new("fills queue", "test")).await);

        let handle = tokio::spawn(async move { tx.send(Record::new("blocked", "test")).await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        cancel.cancel();

        let sent = tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("send should unblock after cancel")
            .unwrap();
        assert!(!sent);
    }

    #[tokio::test]
    async fn fail_reports_error_then_closes() {
        let cancel = CancellationToken::new();
        let (tx, mut stream) = RecordStream::channel(4, cancel);

        tx.fail(SourceError::Io {
            source_id: "file:/missing".to_owned(),
            path: "/missing".to_owned(),
            reason: "not found".to_owned(),
        })
        .await;

        assert!(stream.records.recv().await.is_none());
        let err = stream.errors.recv().await.expect("error should be delivered");
        assert_eq!(err.source_id(), "file:/missing");
        assert!(stream.errors.recv().await.is_none());
    }
}
