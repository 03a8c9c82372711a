//! logsieve.toml 통합 설정 테스트
//!
//! - logsieve.toml.example 파싱 테스트
//! - 부분 설정 (일부 섹션만) 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use logsieve_core::config::{SieveConfig, SourceKind};
use logsieve_core::error::{ConfigError, SieveError};

const EXAMPLE: &str = include_str!("../../../logsieve.toml.example");

/// 환경변수를 설정한 채로 클로저를 실행하고 원래 값으로 복구합니다.
fn with_env<T>(key: &str, value: &str, f: impl FnOnce() -> T) -> T {
    let original = std::env::var(key).ok();
    // SAFETY: 테스트는 serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var(key, value);
    }

    let result = f();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var(key, val),
            None => std::env::remove_var(key),
        }
    }
    result
}

// =============================================================================
// logsieve.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let config = SieveConfig::parse(EXAMPLE).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "pretty");
    assert_eq!(config.store.path, "/var/lib/logsieve/store.json");
    assert_eq!(config.snapshot.dir, "/var/lib/logsieve/snapshots");
}

#[test]
fn example_config_passes_validation() {
    let config = SieveConfig::parse(EXAMPLE).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_declares_sources() {
    let config = SieveConfig::parse(EXAMPLE).expect("should parse");

    assert_eq!(config.sources.len(), 2);
    assert_eq!(config.sources[0].kind, SourceKind::File);
    assert_eq!(config.sources[0].effective_id(), "app");
    assert_eq!(config.sources[1].kind, SourceKind::Prometheus);
    assert_eq!(config.sources[1].timeout_secs, Some(10));
}

#[test]
fn example_config_matches_code_defaults() {
    let from_file = SieveConfig::parse(EXAMPLE).expect("should parse");
    let from_code = SieveConfig::default();

    assert_eq!(from_file.general.log_level, from_code.general.log_level);
    assert_eq!(from_file.general.log_format, from_code.general.log_format);
    assert_eq!(from_file.snapshot.retain, from_code.snapshot.retain);

    assert_eq!(from_file.alertmanager.url, from_code.alertmanager.url);
    assert_eq!(
        from_file.alertmanager.timeout_secs,
        from_code.alertmanager.timeout_secs
    );
    assert_eq!(
        from_file.alertmanager.dedup_window_secs,
        from_code.alertmanager.dedup_window_secs
    );
    assert_eq!(
        from_file.alertmanager.rate_limit_per_pattern,
        from_code.alertmanager.rate_limit_per_pattern
    );
    assert_eq!(
        from_file.alertmanager.silence_duration_hours,
        from_code.alertmanager.silence_duration_hours
    );

    assert_eq!(from_file.metrics.enabled, from_code.metrics.enabled);
    assert_eq!(from_file.metrics.listen_addr, from_code.metrics.listen_addr);
    assert_eq!(from_file.metrics.port, from_code.metrics.port);

    assert_eq!(
        from_file.pipeline.channel_capacity,
        from_code.pipeline.channel_capacity
    );
    assert_eq!(
        from_file.pipeline.suppress_threshold,
        from_code.pipeline.suppress_threshold
    );
}

// =============================================================================
// 부분 설정 로딩 테스트
// =============================================================================

#[test]
fn partial_config_general_only() {
    let toml = r#"
[general]
log_level = "debug"
log_format = "json"
"#;
    let config = SieveConfig::parse(toml).expect("should parse");
    config.validate().expect("should validate");

    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.general.log_format, "json");
    // 나머지 섹션은 기본값
    assert!(!config.has_store_path());
    assert!(!config.alertmanager.is_enabled());
    assert!(config.sources.is_empty());
}

#[test]
fn partial_config_alertmanager_only() {
    let toml = r#"
[alertmanager]
url = "http://alertmanager:9093"
dedup_window_secs = 0
"#;
    let config = SieveConfig::parse(toml).expect("should parse");
    config.validate().expect("should validate");

    assert!(config.alertmanager.is_enabled());
    assert_eq!(config.alertmanager.dedup_window_secs, 0);
    // 생략된 필드는 기본값
    assert_eq!(config.alertmanager.rate_limit_per_pattern, 10);
}

#[test]
fn partial_config_http_source() {
    let toml = r#"
[[sources]]
type = "http"
url = "http://logs.internal/export"
"#;
    let config = SieveConfig::parse(toml).expect("should parse");
    config.validate().expect("should validate");

    assert_eq!(
        config.sources[0].effective_id(),
        "http:http://logs.internal/export"
    );
    assert_eq!(config.sources[0].timeout_secs, None);
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = r#"
[general]
log_level = "info"
"#;
    let result = with_env("LOGSIEVE_GENERAL_LOG_LEVEL", "error", || {
        let mut config = SieveConfig::parse(toml).expect("should parse");
        config.apply_env_overrides();
        config.general.log_level
    });
    assert_eq!(result, "error");
}

#[test]
#[serial_test::serial]
fn env_override_store_path() {
    let result = with_env("LOGSIEVE_STORE_PATH", "/tmp/logsieve/store.json", || {
        let mut config = SieveConfig::parse("").expect("should parse");
        config.apply_env_overrides();
        config.store.path
    });
    assert_eq!(result, "/tmp/logsieve/store.json");
}

#[test]
#[serial_test::serial]
fn env_override_bool_field() {
    let result = with_env("LOGSIEVE_METRICS_ENABLED", "true", || {
        let mut config = SieveConfig::parse("").expect("should parse");
        config.apply_env_overrides();
        config.metrics.enabled
    });
    assert!(result);
}

#[test]
#[serial_test::serial]
fn env_override_numeric_field() {
    let result = with_env("LOGSIEVE_PIPELINE_SUPPRESS_THRESHOLD", "12", || {
        let mut config = SieveConfig::parse("").expect("should parse");
        config.apply_env_overrides();
        config.pipeline.suppress_threshold
    });
    assert_eq!(result, 12);
}

#[test]
#[serial_test::serial]
fn env_override_invalid_number_is_ignored() {
    let result = with_env("LOGSIEVE_SNAPSHOT_RETAIN", "many", || {
        let mut config = SieveConfig::parse("").expect("should parse");
        config.apply_env_overrides();
        config.snapshot.retain
    });
    assert_eq!(result, 10);
}

// =============================================================================
// 에러 테스트
// =============================================================================

#[test]
fn malformed_toml_is_parse_error() {
    let result = SieveConfig::parse("[general\nlog_level = ");
    assert!(matches!(
        result,
        Err(SieveError::Config(ConfigError::ParseFailed { .. }))
    ));
}

#[test]
fn wrong_type_is_parse_error() {
    let result = SieveConfig::parse("[pipeline]\nchannel_capacity = \"big\"");
    assert!(matches!(
        result,
        Err(SieveError::Config(ConfigError::ParseFailed { .. }))
    ));
}

#[tokio::test]
async fn missing_file_is_file_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("absent.toml");
    let result = SieveConfig::from_file(&path).await;
    match result {
        Err(SieveError::Config(ConfigError::FileNotFound { path: p })) => {
            assert!(p.ends_with("absent.toml"));
        }
        other => panic!("expected FileNotFound, got {other:?}"),
    }
}

#[tokio::test]
#[serial_test::serial]
async fn load_reads_file_and_validates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("logsieve.toml");
    tokio::fs::write(&path, "[general]\nlog_level = \"verbose\"\n")
        .await
        .expect("write");

    let result = SieveConfig::load(&path).await;
    assert!(matches!(
        result,
        Err(SieveError::Config(ConfigError::InvalidValue { .. }))
    ));
}
