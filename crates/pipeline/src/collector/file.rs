//! 파일 소스
//!
//! 로그 파일을 처음부터 끝까지 한 번 읽습니다. 라인은 트림되고 빈 라인은 건너뜁니다.
//! UTF-8이 아닌 바이트는 대체 문자로 바뀌며 에러로 취급하지 않습니다.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use logsieve_core::error::SourceError;
use logsieve_core::pipeline::{RecordSender, RecordSource, RecordStream};
use logsieve_core::types::Record;

/// 파일 소스
#[derive(Debug, Clone)]
pub struct FileSource {
    id: String,
    path: PathBuf,
}

impl FileSource {
    /// 새 파일 소스를 생성합니다.
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }

    /// 읽을 파일 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, err: &std::io::Error) -> SourceError {
        SourceError::Io {
            source_id: self.id.clone(),
            path: self.path.display().to_string(),
            reason: err.to_string(),
        }
    }

    async fn read_lines(self, tx: RecordSender) {
        let opened = tokio::select! {
            biased;
            _ = tx.cancel_token().cancelled() => return,
            opened = File::open(&self.path) => opened,
        };
        let file = match opened {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(source = %self.id, path = %self.path.display(), error = %e, "failed to open log file");
                tx.fail(self.io_error(&e)).await;
                return;
            }
        };

        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        let mut emitted = 0u64;

        loop {
            buf.clear();
            let read = tokio::select! {
                biased;
                _ = tx.cancel_token().cancelled() => {
                    tracing::debug!(source = %self.id, emitted, "file source cancelled");
                    return;
                }
                read = reader.read_until(b'\n', &mut buf) => read,
            };

            match read {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if !tx.send(Record::new(line, self.id.as_str())).await {
                        return;
                    }
                    emitted += 1;
                }
                Err(e) => {
                    tracing::warn!(source = %self.id, path = %self.path.display(), error = %e, "failed to read log file");
                    tx.fail(self.io_error(&e)).await;
                    return;
                }
            }
        }

        tracing::debug!(source = %self.id, emitted, "file source exhausted");
    }
}

impl RecordSource for FileSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn stream(self: Box<Self>, capacity: usize, cancel: CancellationToken) -> RecordStream {
        let (tx, stream) = RecordStream::channel(capacity, cancel);
        tokio::spawn((*self).read_lines(tx));
        stream
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::*;

    async fn collect(source: FileSource) -> (Vec<String>, Option<SourceError>) {
        let mut stream = Box::new(source).stream(4, CancellationToken::new());
        let mut lines = Vec::new();
        while let Some(record) = stream.records.recv().await {
            lines.push(record.message);
        }
        (lines, stream.errors.recv().await)
    }

    #[tokio::test]
    async fn reads_trimmed_non_empty_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  ERROR disk full  ").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "\t").unwrap();
        write!(file, "INFO started").unwrap();

        let (lines, err) = collect(FileSource::new("app", file.path())).await;
        assert_eq!(lines, vec!["ERROR disk full", "INFO started"]);
        assert!(err.is_none());
    }

    #[tokio::test]
    async fn records_carry_source_id_and_unknown_severity() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "hello").unwrap();

        let mut stream = Box::new(FileSource::new("app", file.path())).stream(4, CancellationToken::new());
        let record = stream.records.recv().await.unwrap();
        assert_eq!(record.source_id, "app");
        assert_eq!(record.severity, logsieve_core::types::Severity::Unknown);
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced_not_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"bad \xff byte\nnext\n").unwrap();

        let (lines, err) = collect(FileSource::new("app", file.path())).await;
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("bad"));
        assert!(err.is_none());
    }

    #[tokio::test]
    async fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.log");

        let (lines, err) = collect(FileSource::new("app", &path)).await;
        assert!(lines.is_empty());
        let err = err.expect("open failure should be reported");
        assert_eq!(err.source_id(), "app");
        assert!(err.to_string().contains("missing.log"));
    }

    #[tokio::test]
    async fn cancel_stops_reading_when_queue_full() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..100 {
            writeln!(file, "line {i}").unwrap();
        }

        let cancel = CancellationToken::new();
        let mut stream = Box::new(FileSource::new("app", file.path())).stream(1, cancel.clone());

        // 큐를 비우지 않은 채로 취소
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let drained = tokio::time::timeout(Duration::from_secs(1), async {
            let mut n = 0;
            while stream.records.recv().await.is_some() {
                n += 1;
            }
            n
        })
        .await
        .expect("channels should close after cancel");
        assert!(drained < 100);
    }
}
