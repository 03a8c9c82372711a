//! 패턴 저장소 -- (심각도, 지문)별 샘플/횟수와 억제 상태
//!
//! [`PatternStore`]는 엔진과 스냅샷 비교기가 의존하는 유일한 저장 인터페이스입니다.
//! 구현은 여러 소스 태스크에서 동시에 호출되어도 안전해야 하며,
//! `seen` 한 번의 결과는 이후의 `get_count` / `list`에 반드시 반영되어야 합니다.
//!
//! # 구현
//! - [`MemoryStore`]: 메모리 + 선택적 JSON 파일 영속화

pub mod memory;

pub use memory::MemoryStore;

use std::future::Future;

use serde::{Deserialize, Serialize};

use logsieve_core::error::StorageError;
use logsieve_core::types::Severity;

use crate::template::Fingerprint;

/// 저장된 패턴 하나
///
/// 직렬화 필드명(`level`, `hash`)은 저장 파일과 스냅샷 파일 형식입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternEntry {
    /// 심각도
    #[serde(rename = "level")]
    pub severity: Severity,
    /// 지문
    #[serde(rename = "hash")]
    pub fingerprint: Fingerprint,
    /// 처음 관측된 비어 있지 않은 메시지
    pub sample: String,
    /// 관측 횟수
    pub count: u64,
}

/// `seen` 호출 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeenOutcome {
    /// 이 호출이 엔트리를 만들었는지 여부
    pub is_new: bool,
    /// 이 호출로 증가한 직후의 횟수
    pub count: u64,
}

/// 패턴 저장소 trait
///
/// 변경 경로는 배타 잠금, 읽기 경로는 공유 잠금을 사용해야 합니다.
/// 메모리 구현은 잠금을 잡은 채 I/O를 하지 않습니다.
pub trait PatternStore: Send + Sync + 'static {
    /// 엔트리의 횟수를 1 늘립니다. 없으면 횟수 1로 만듭니다.
    ///
    /// 저장된 샘플이 비어 있고 `sample`이 비어 있지 않으면 채웁니다.
    /// 비어 있지 않은 샘플은 덮어쓰지 않습니다.
    fn seen(
        &self,
        severity: Severity,
        fingerprint: Fingerprint,
        sample: &str,
    ) -> Result<SeenOutcome, StorageError>;

    /// 엔트리의 횟수 (없으면 0)
    fn get_count(&self, severity: Severity, fingerprint: Fingerprint) -> Result<u64, StorageError>;

    /// 지문을 억제합니다. 이미 있으면 사유를 덮어씁니다.
    fn suppress(&self, fingerprint: Fingerprint, reason: &str) -> Result<(), StorageError>;

    /// 지문이 억제되었는지 여부
    fn is_suppressed(&self, fingerprint: Fingerprint) -> Result<bool, StorageError>;

    /// 억제 사유 (억제되지 않았으면 `None`)
    fn suppression_reason(&self, fingerprint: Fingerprint)
    -> Result<Option<String>, StorageError>;

    /// 모든 엔트리의 복사본 (순서 없음)
    fn list(&self) -> Result<Vec<PatternEntry>, StorageError>;

    /// 고유 (심각도, 지문) 엔트리 수
    fn pattern_count(&self) -> Result<usize, StorageError> {
        Ok(self.list()?.len())
    }

    /// 영속 매체에서 상태를 불러옵니다. 매체가 없으면 아무것도 하지 않습니다.
    fn load(&self) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// 현재 상태를 영속 매체에 씁니다.
    fn save(&self) -> impl Future<Output = Result<(), StorageError>> + Send;
}
