#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`collector`]: 레코드 소스 (파일, HTTP, Prometheus)
//! - [`alert`]: 알림 생성 (중복 제거, 속도 제한), 사일런스 생성
//! - [`sink`]: Alertmanager API v2 클라이언트
//! - [`pipeline`]: 소스별 소비 태스크를 묶는 파이프라인 오케스트레이션
//! - [`config`]: 파이프라인 설정
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! [[sources]] -> collector -> mpsc -> DedupEngine -> AlertGenerator -> AlertmanagerClient
//!                                          |
//!                                          +-> observer (CLI 출력)
//! ```

pub mod alert;
pub mod collector;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod sink;

// --- 주요 타입 re-export ---

// 파이프라인
pub use pipeline::{RunReport, SievePipeline, SievePipelineBuilder, SourceFailure};

// 소스
pub use collector::{FileSource, HttpSource, PrometheusSource, build_source, sources_from_config};

// 알림
pub use alert::{AlertGenerator, alert_for, silence_for};
pub use sink::AlertmanagerClient;

// 설정 / 에러
pub use config::PipelineConfig;
pub use error::PipelineError;
