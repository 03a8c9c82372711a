//! 중복 제거 엔진 -- 레코드 하나를 패턴 결과 하나로 변환합니다.
//!
//! # 처리 순서
//! 1. 심각도 확정 (레코드 값 또는 [`severity::classify`](crate::severity::classify))
//! 2. 템플릿과 지문 생성
//! 3. 억제된 지문이면 저장소를 건드리지 않고 즉시 반환
//! 4. 같은 (심각도, 단어 수) 버킷에서 약한 동등 템플릿을 찾아 지문을 병합,
//!    없으면 이 템플릿을 새로 등록. 병합된 지문이 억제되어 있으면 3단계처럼 반환
//! 5. 저장소 `seen` 호출
//!
//! 4~5단계는 인덱스 잠금 하나로 묶여 있어 약한 동등 템플릿 두 개가 동시에 처음
//! 등장해도 둘 다 등록되는 일이 없습니다.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::warn;

use logsieve_core::error::StorageError;
use logsieve_core::types::{Record, Severity};

use crate::severity;
use crate::store::PatternStore;
use crate::template::{Fingerprint, Template};

/// 레코드 하나의 처리 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternResult {
    /// 확정된 심각도
    pub severity: Severity,
    /// 병합 후 지문 (억제된 경우 억제 목록과 일치한 지문)
    pub fingerprint: Fingerprint,
    /// 레코드 메시지
    pub sample: String,
    /// 이 레코드가 새 패턴을 만들었는지 여부
    pub is_new: bool,
    /// 억제되었는지 여부
    pub is_suppressed: bool,
    /// 이 레코드 반영 직후의 패턴 횟수 (억제 시 0)
    pub count: u64,
    /// 저장소 실패로 "새 패턴"으로 간주했는지 여부
    pub degraded: bool,
}

/// 퍼지 병합 인덱스
///
/// 약한 동등성은 단어 수가 같을 때만 성립하므로 (심각도, 단어 수)로 나눕니다.
/// 버킷 안에서는 등록 순서대로 검사하며 처음 일치한 템플릿을 사용합니다.
#[derive(Debug, Default)]
struct TemplateIndex {
    buckets: HashMap<(Severity, usize), Vec<Template>>,
}

impl TemplateIndex {
    /// 일치하는 템플릿의 지문을 반환하거나, 없으면 등록하고 자기 지문을 반환합니다.
    fn resolve(&mut self, severity: Severity, template: &Template) -> Fingerprint {
        let bucket = self
            .buckets
            .entry((severity, template.len()))
            .or_default();
        if let Some(existing) = bucket.iter().find(|t| t.weak_equal(template)) {
            return existing.fingerprint();
        }
        bucket.push(template.clone());
        template.fingerprint()
    }

    /// 이미 저장된 패턴을 등록합니다. 같은 지문이 있으면 무시합니다.
    fn register(&mut self, severity: Severity, template: Template) -> bool {
        let bucket = self
            .buckets
            .entry((severity, template.len()))
            .or_default();
        if bucket
            .iter()
            .any(|t| t.fingerprint() == template.fingerprint())
        {
            return false;
        }
        bucket.push(template);
        true
    }

    fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

/// 중복 제거 엔진
///
/// 저장소는 `Arc`로 공유되어 엔진 밖(CLI 요약, 스냅샷 저장)에서도 읽을 수 있습니다.
pub struct DedupEngine<S> {
    store: Arc<S>,
    index: Mutex<TemplateIndex>,
}

impl<S: PatternStore> DedupEngine<S> {
    /// 저장소를 사용하는 엔진을 생성합니다.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            index: Mutex::default(),
        }
    }

    /// 공유 저장소
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// 인덱스에 등록된 템플릿 수
    pub fn indexed_templates(&self) -> usize {
        self.lock_index().len()
    }

    /// 저장소의 고유 패턴 수
    ///
    /// 인덱스에 없는 저장 엔트리(샘플이 지문과 맞지 않는 엔트리)도 셉니다.
    pub fn distinct_patterns(&self) -> Result<usize, StorageError> {
        self.store.pattern_count()
    }

    /// 저장소에 이미 있는 패턴으로 퍼지 병합 인덱스를 채웁니다.
    ///
    /// 샘플을 다시 템플릿으로 만들었을 때 저장된 지문과 같은 엔트리만 등록합니다.
    /// 등록 순서는 (심각도, 지문) 순입니다. 등록된 수를 반환합니다.
    pub fn prime_index(&self) -> Result<usize, StorageError> {
        let mut entries = self.store.list()?;
        entries.sort_by_key(|e| (e.severity, e.fingerprint));

        let mut index = self.lock_index();
        let mut registered = 0;
        for entry in entries {
            let template = Template::of(&entry.sample);
            if template.fingerprint() == entry.fingerprint
                && index.register(entry.severity, template)
            {
                registered += 1;
            }
        }
        Ok(registered)
    }

    /// 레코드 하나를 처리합니다.
    ///
    /// 실패하지 않습니다. 저장소 에러는 `degraded = true`인 "새 패턴" 결과로 바뀝니다.
    pub fn process(&self, record: &Record) -> PatternResult {
        let severity = severity::resolve(record.severity, &record.message);
        let template = Template::of(&record.message);
        let raw_fingerprint = template.fingerprint();

        if self.is_suppressed(raw_fingerprint) {
            return suppressed_result(severity, raw_fingerprint, &record.message);
        }

        let mut index = self.lock_index();
        let fingerprint = index.resolve(severity, &template);
        // 억제된 패턴으로 병합되는 변형도 억제 대상이다
        if fingerprint != raw_fingerprint && self.is_suppressed(fingerprint) {
            drop(index);
            return suppressed_result(severity, fingerprint, &record.message);
        }
        let outcome = self.store.seen(severity, fingerprint, &record.message);
        drop(index);

        match outcome {
            Ok(outcome) => PatternResult {
                severity,
                fingerprint,
                sample: record.message.clone(),
                is_new: outcome.is_new,
                is_suppressed: false,
                count: outcome.count,
                degraded: false,
            },
            Err(e) => {
                warn!(
                    fingerprint = %fingerprint,
                    source = %record.source_id,
                    error = %e,
                    "pattern store update failed, treating record as new"
                );
                PatternResult {
                    severity,
                    fingerprint,
                    sample: record.message.clone(),
                    is_new: true,
                    is_suppressed: false,
                    count: 0,
                    degraded: true,
                }
            }
        }
    }

    fn lock_index(&self) -> MutexGuard<'_, TemplateIndex> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 조회에 실패하면 억제되지 않은 것으로 봅니다.
    fn is_suppressed(&self, fingerprint: Fingerprint) -> bool {
        self.store.is_suppressed(fingerprint).unwrap_or_else(|e| {
            warn!(
                fingerprint = %fingerprint,
                error = %e,
                "suppression lookup failed, treating pattern as not suppressed"
            );
            false
        })
    }
}

fn suppressed_result(severity: Severity, fingerprint: Fingerprint, message: &str) -> PatternResult {
    PatternResult {
        severity,
        fingerprint,
        sample: message.to_owned(),
        is_new: false,
        is_suppressed: true,
        count: 0,
        degraded: false,
    }
}
