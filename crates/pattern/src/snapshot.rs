//! 스냅샷 -- 특정 시점의 패턴 목록과 세대 관리
//!
//! 스냅샷 하나는 JSON 파일 하나(`snapshot-<unix_millis>.json`)입니다.
//! [`SnapshotDir`]은 디렉토리 안의 세대를 저장/정리하고 가장 최근 세대를 불러옵니다.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use logsieve_core::error::StorageError;

use crate::store::PatternEntry;

const FILE_PREFIX: &str = "snapshot-";
const FILE_SUFFIX: &str = ".json";

/// 특정 시점의 패턴 목록 (생성 후 변경되지 않음)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// 생성 시각 (UTC)
    pub timestamp: DateTime<Utc>,
    /// 패턴 목록
    #[serde(default)]
    pub patterns: Vec<PatternEntry>,
}

impl Snapshot {
    /// 현재 시각으로 스냅샷을 만듭니다.
    pub fn new(patterns: Vec<PatternEntry>) -> Self {
        Self {
            timestamp: Utc::now(),
            patterns,
        }
    }

    /// 스냅샷 파일 하나를 읽습니다.
    ///
    /// 파일이 없으면 `Ok(None)`, 디코딩에 실패하면 `StorageError::Corrupt`입니다.
    pub async fn load_file(path: impl AsRef<Path>) -> Result<Option<Self>, StorageError> {
        let path = path.as_ref();
        let path_text = path.display().to_string();
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::Read {
                    path: path_text,
                    reason: e.to_string(),
                });
            }
        };
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                path: path_text,
                reason: e.to_string(),
            })
    }

    /// 스냅샷을 파일 하나로 씁니다. 상위 디렉토리를 만듭니다.
    pub async fn save_file(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        let path = path.as_ref();
        let write_err = |e: &dyn std::fmt::Display| StorageError::Write {
            path: path.display().to_string(),
            reason: e.to_string(),
        };
        let data = serde_json::to_vec_pretty(self).map_err(|e| write_err(&e))?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| write_err(&e))?;
        }
        tokio::fs::write(path, data)
            .await
            .map_err(|e| write_err(&e))
    }
}

/// 스냅샷 세대 디렉토리
#[derive(Debug, Clone)]
pub struct SnapshotDir {
    dir: PathBuf,
    retain: usize,
}

impl SnapshotDir {
    /// 세대 디렉토리를 만듭니다. `retain`이 0이면 모든 세대를 보관합니다.
    pub fn new(dir: impl Into<PathBuf>, retain: usize) -> Self {
        Self {
            dir: dir.into(),
            retain,
        }
    }

    /// 디렉토리 경로
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 새 세대를 저장하고 보관 한도를 넘는 오래된 세대를 지웁니다.
    ///
    /// 저장된 파일 경로를 반환합니다.
    pub async fn save(&self, patterns: Vec<PatternEntry>) -> Result<PathBuf, StorageError> {
        let snapshot = Snapshot::new(patterns);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::Write {
                path: self.dir.display().to_string(),
                reason: e.to_string(),
            })?;

        // 같은 밀리초에 두 번 저장해도 덮어쓰지 않도록 다음 빈 이름을 찾는다
        let mut millis = snapshot.timestamp.timestamp_millis();
        let mut path = self.file_for(millis);
        while tokio::fs::try_exists(&path).await.unwrap_or(false) {
            millis += 1;
            path = self.file_for(millis);
        }

        snapshot.save_file(&path).await?;
        info!(
            path = %path.display(),
            patterns = snapshot.patterns.len(),
            "snapshot saved"
        );

        self.prune().await?;
        Ok(path)
    }

    /// 가장 최근 세대를 불러옵니다.
    ///
    /// 디렉토리나 세대 파일이 없으면 `Ok(None)`입니다.
    pub async fn latest(&self) -> Result<Option<Snapshot>, StorageError> {
        let generations = self.generations().await?;
        let Some((_, path)) = generations.last() else {
            debug!(dir = %self.dir.display(), "no snapshot generations found");
            return Ok(None);
        };
        Snapshot::load_file(path).await
    }

    /// 세대 파일 목록 (오래된 순, `(millis, path)`)
    pub async fn generations(&self) -> Result<Vec<(i64, PathBuf)>, StorageError> {
        let read_err = |e: std::io::Error| StorageError::Read {
            path: self.dir.display().to_string(),
            reason: e.to_string(),
        };
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(read_err(e)),
        };

        let mut generations = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
            let name = entry.file_name();
            if let Some(millis) = name.to_str().and_then(parse_generation) {
                generations.push((millis, entry.path()));
            }
        }
        generations.sort_by_key(|(millis, _)| *millis);
        Ok(generations)
    }

    async fn prune(&self) -> Result<(), StorageError> {
        if self.retain == 0 {
            return Ok(());
        }
        let generations = self.generations().await?;
        let excess = generations.len().saturating_sub(self.retain);
        for (_, path) in generations.into_iter().take(excess) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "old snapshot pruned"),
                Err(e) => warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to prune old snapshot"
                ),
            }
        }
        Ok(())
    }

    fn file_for(&self, millis: i64) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{millis}{FILE_SUFFIX}"))
    }
}

/// `snapshot-<millis>.json` 파일명에서 millis를 꺼냅니다.
fn parse_generation(name: &str) -> Option<i64> {
    name.strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)?
        .parse()
        .ok()
}
