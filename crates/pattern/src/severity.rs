//! 심각도 분류 -- 소스가 심각도를 주지 않은 레코드의 심각도를 추정합니다.
//!
//! 소문자로 바꾼 메시지에서 키워드를 순서대로 찾습니다.
//! 에러 계열이 경고보다, 경고가 디버그보다, 디버그가 정보보다 우선합니다.

use logsieve_core::types::Severity;

/// 우선순위 순 키워드 테이블
const KEYWORDS: &[(Severity, &[&str])] = &[
    (Severity::Error, &["error", "exception", "fatal", "panic"]),
    (Severity::Warn, &["warn", "warning"]),
    (Severity::Debug, &["debug"]),
    (Severity::Info, &["info"]),
];

/// 메시지 내용으로 심각도를 분류합니다.
///
/// 어떤 키워드도 없으면 `Severity::Unknown`을 반환합니다.
pub fn classify(message: &str) -> Severity {
    let lower = message.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map_or(Severity::Unknown, |(severity, _)| *severity)
}

/// 레코드의 심각도를 확정합니다.
///
/// 레코드가 알려진 심각도를 가지고 있으면 그대로, 아니면 [`classify`] 결과를 사용합니다.
pub fn resolve(given: Severity, message: &str) -> Severity {
    if given.is_known() {
        given
    } else {
        classify(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_keyword() {
        assert_eq!(classify("ERROR disk full"), Severity::Error);
        assert_eq!(classify("unhandled Exception in thread"), Severity::Error);
        assert_eq!(classify("FATAL: out of memory"), Severity::Error);
        assert_eq!(classify("kernel panic"), Severity::Error);
        assert_eq!(classify("warning: retry attempt 1"), Severity::Warn);
        assert_eq!(classify("DEBUG trace entry"), Severity::Debug);
        assert_eq!(classify("INFO server started"), Severity::Info);
        assert_eq!(classify("server started"), Severity::Unknown);
        assert_eq!(classify(""), Severity::Unknown);
    }

    #[test]
    fn error_keywords_take_priority() {
        assert_eq!(classify("WARN previous error recovered"), Severity::Error);
        assert_eq!(classify("info: request failed with error code 500"), Severity::Error);
        assert_eq!(classify("debug warn mix"), Severity::Warn);
        assert_eq!(classify("info debug mix"), Severity::Debug);
    }

    #[test]
    fn keyword_may_appear_inside_words() {
        assert_eq!(classify("errors=0"), Severity::Error);
        assert_eq!(classify("see information page"), Severity::Info);
    }

    #[test]
    fn resolve_prefers_given_severity() {
        assert_eq!(resolve(Severity::Info, "ERROR but labelled info"), Severity::Info);
        assert_eq!(resolve(Severity::Unknown, "ERROR unlabelled"), Severity::Error);
    }
}
