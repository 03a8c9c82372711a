#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`template`]: 라인 -> 템플릿/지문 변환, 약한 동등성
//! - [`severity`]: 키워드 기반 심각도 분류
//! - [`store`]: 패턴 저장소 trait과 메모리/JSON 구현
//! - [`engine`]: 퍼지 병합과 억제를 적용하는 중복 제거 엔진
//! - [`snapshot`]: 스냅샷 파일과 세대 디렉토리
//! - [`changes`]: 스냅샷 비교와 규칙 제안
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! Record -> Classifier -> Template -> [suppressed?] -> FuzzyIndex -> PatternStore -> PatternResult
//!                                                                        |
//!                                                  SnapshotDir <- list() + diff() -> suggest_rules()
//! ```

pub mod changes;
pub mod engine;
pub mod error;
pub mod severity;
pub mod snapshot;
pub mod store;
pub mod template;

// --- 주요 타입 re-export ---

// 엔진
pub use engine::{DedupEngine, PatternResult};

// 템플릿
pub use template::{Fingerprint, Template, template_of, weak_equal};

// 저장소
pub use store::{MemoryStore, PatternEntry, PatternStore, SeenOutcome};

// 스냅샷 / 비교
pub use changes::{Changes, CountDelta, RuleAction, SuggestedRule, diff, suggest_rules};
pub use snapshot::{Snapshot, SnapshotDir};

// 에러
pub use error::PatternError;
