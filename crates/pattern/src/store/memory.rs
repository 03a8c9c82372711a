//! 메모리 패턴 저장소 (선택적 JSON 파일 영속화)
//!
//! 파일 형식:
//!
//! ```json
//! {
//!   "seen": [{ "level": "ERROR", "hash": "<32 hex>", "sample": "...", "count": 3 }],
//!   "suppressed": { "<32 hex>": "noise" }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use logsieve_core::error::StorageError;
use logsieve_core::types::Severity;

use super::{PatternEntry, PatternStore, SeenOutcome};
use crate::template::Fingerprint;

#[derive(Debug, Default)]
struct StoreState {
    seen: HashMap<(Severity, Fingerprint), PatternStat>,
    suppressed: HashMap<Fingerprint, String>,
}

#[derive(Debug, Clone, Default)]
struct PatternStat {
    sample: String,
    count: u64,
}

/// 디스크 형식
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistState {
    #[serde(default)]
    seen: Vec<PatternEntry>,
    #[serde(default)]
    suppressed: BTreeMap<Fingerprint, String>,
}

/// 메모리 패턴 저장소
///
/// `path`가 없으면 `load` / `save`는 아무것도 하지 않습니다.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
    path: Option<PathBuf>,
}

impl MemoryStore {
    /// 메모리 전용 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON 파일로 영속화하는 저장소를 생성합니다.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            state: RwLock::default(),
            path: Some(path.into()),
        }
    }

    /// 영속화 파일 경로
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// 고유 패턴 수
    pub fn len(&self) -> usize {
        self.read().seen.len()
    }

    /// 패턴이 하나도 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.read().seen.is_empty()
    }

    /// 억제된 지문 수
    pub fn suppressed_len(&self) -> usize {
        self.read().suppressed.len()
    }

    // 상태는 문장 단위로 항상 일관되므로 poison은 무시하고 진행한다
    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn to_persist(&self) -> PersistState {
        let state = self.read();
        let mut seen: Vec<PatternEntry> = state
            .seen
            .iter()
            .map(|((severity, fingerprint), stat)| PatternEntry {
                severity: *severity,
                fingerprint: *fingerprint,
                sample: stat.sample.clone(),
                count: stat.count,
            })
            .collect();
        let suppressed = state
            .suppressed
            .iter()
            .map(|(fp, reason)| (*fp, reason.clone()))
            .collect();
        drop(state);

        seen.sort_by(|a, b| {
            (a.severity, a.fingerprint).cmp(&(b.severity, b.fingerprint))
        });
        PersistState { seen, suppressed }
    }
}

impl PatternStore for MemoryStore {
    fn seen(
        &self,
        severity: Severity,
        fingerprint: Fingerprint,
        sample: &str,
    ) -> Result<SeenOutcome, StorageError> {
        let mut state = self.write();
        let outcome = match state.seen.get_mut(&(severity, fingerprint)) {
            Some(stat) => {
                stat.count += 1;
                if stat.sample.is_empty() && !sample.is_empty() {
                    stat.sample = sample.to_owned();
                }
                SeenOutcome {
                    is_new: false,
                    count: stat.count,
                }
            }
            None => {
                state.seen.insert(
                    (severity, fingerprint),
                    PatternStat {
                        sample: sample.to_owned(),
                        count: 1,
                    },
                );
                SeenOutcome {
                    is_new: true,
                    count: 1,
                }
            }
        };
        Ok(outcome)
    }

    fn get_count(&self, severity: Severity, fingerprint: Fingerprint) -> Result<u64, StorageError> {
        Ok(self
            .read()
            .seen
            .get(&(severity, fingerprint))
            .map_or(0, |stat| stat.count))
    }

    fn suppress(&self, fingerprint: Fingerprint, reason: &str) -> Result<(), StorageError> {
        self.write().suppressed.insert(fingerprint, reason.to_owned());
        debug!(fingerprint = %fingerprint, reason, "pattern suppressed");
        Ok(())
    }

    fn is_suppressed(&self, fingerprint: Fingerprint) -> Result<bool, StorageError> {
        Ok(self.read().suppressed.contains_key(&fingerprint))
    }

    fn suppression_reason(
        &self,
        fingerprint: Fingerprint,
    ) -> Result<Option<String>, StorageError> {
        Ok(self.read().suppressed.get(&fingerprint).cloned())
    }

    fn list(&self) -> Result<Vec<PatternEntry>, StorageError> {
        let state = self.read();
        Ok(state
            .seen
            .iter()
            .map(|((severity, fingerprint), stat)| PatternEntry {
                severity: *severity,
                fingerprint: *fingerprint,
                sample: stat.sample.clone(),
                count: stat.count,
            })
            .collect())
    }

    fn pattern_count(&self) -> Result<usize, StorageError> {
        Ok(self.len())
    }

    async fn load(&self) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let path_text = path.display().to_string();

        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path_text, "no store file yet, starting empty");
                return Ok(());
            }
            Err(e) => {
                return Err(StorageError::Read {
                    path: path_text,
                    reason: e.to_string(),
                });
            }
        };

        let persisted: PersistState =
            serde_json::from_slice(&data).map_err(|e| StorageError::Corrupt {
                path: path_text.clone(),
                reason: e.to_string(),
            })?;

        let patterns = persisted.seen.len();
        let suppressed = persisted.suppressed.len();
        {
            let mut state = self.write();
            for entry in persisted.seen {
                state.seen.insert(
                    (entry.severity, entry.fingerprint),
                    PatternStat {
                        sample: entry.sample,
                        count: entry.count,
                    },
                );
            }
            state.suppressed.extend(persisted.suppressed);
        }

        info!(path = %path_text, patterns, suppressed, "pattern store loaded");
        Ok(())
    }

    async fn save(&self) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let path_text = path.display().to_string();
        let write_err = |e: &dyn std::fmt::Display| StorageError::Write {
            path: path_text.clone(),
            reason: e.to_string(),
        };

        let persisted = self.to_persist();
        let data = serde_json::to_vec_pretty(&persisted).map_err(|e| write_err(&e))?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| write_err(&e))?;
        }

        // 임시 파일에 쓴 뒤 교체해서 중간에 끊겨도 이전 상태가 남는다
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &data)
            .await
            .map_err(|e| write_err(&e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| write_err(&e))?;

        debug!(
            path = %path_text,
            patterns = persisted.seen.len(),
            suppressed = persisted.suppressed.len(),
            "pattern store saved"
        );
        Ok(())
    }
}
