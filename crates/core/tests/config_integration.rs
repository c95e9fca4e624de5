//! rlscan.toml 통합 설정 테스트
//!
//! - rlscan.toml.example 파싱 테스트
//! - 부분 설정 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 파일 로딩 에러 테스트

use std::fs;

use rlscan_core::config::RlScanConfig;
use rlscan_core::error::{ConfigError, RlScanError};

// =============================================================================
// rlscan.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../rlscan.toml.example");
    let config = RlScanConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "pretty");
    assert_eq!(config.reporter.message_reporter, "text");
}

#[test]
fn example_config_matches_code_defaults() {
    let content = include_str!("../../../rlscan.toml.example");
    let config = RlScanConfig::parse(content).expect("should parse");
    let defaults = RlScanConfig::default();

    assert_eq!(config.engine.deploy_program, defaults.engine.deploy_program);
    assert_eq!(config.engine.executable_name, defaults.engine.executable_name);
    assert_eq!(config.engine.tmp_dir, defaults.engine.tmp_dir);
    assert_eq!(config.engine.install_dir(), defaults.engine.install_dir());
    assert_eq!(config.engine.cache_path(), defaults.engine.cache_path());
    assert_eq!(
        config.engine.report_scratch_dir(),
        defaults.engine.report_scratch_dir()
    );
    assert_eq!(config.engine.store_dir(), defaults.engine.store_dir());
    assert_eq!(
        config.engine.keep_ephemeral_store,
        defaults.engine.keep_ephemeral_store
    );
    config.validate().expect("example config should validate");
}

// =============================================================================
// 부분 설정 테스트
// =============================================================================

#[test]
fn partial_config_reporter_only() {
    let toml = r#"
[reporter]
message_reporter = "teamcity"
"#;
    let config = RlScanConfig::parse(toml).expect("should parse");
    assert_eq!(config.reporter.message_reporter, "teamcity");
    assert_eq!(config.engine.store_dir(), "/tmp/__rlstore");
    assert_eq!(config.general.log_level, "info");
}

#[test]
fn partial_config_engine_paths() {
    let toml = r#"
[engine]
install_dir = "/opt/rl/install"
report_scratch_dir = "/opt/rl/report"
"#;
    let config = RlScanConfig::parse(toml).expect("should parse");
    assert_eq!(config.engine.install_dir(), "/opt/rl/install");
    assert_eq!(config.engine.report_scratch_dir(), "/opt/rl/report");
    assert_eq!(config.engine.cache_path(), "/tmp/rl-secure.cache");
}

#[tokio::test]
#[serial_test::serial]
async fn load_derives_unset_paths_from_tmp_dir() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let path = dir.path().join("rlscan.toml");
    fs::write(&path, "[engine]\ntmp_dir = \"/ci/tmp\"\n").expect("write config");

    let config = RlScanConfig::load(&path).await.expect("should load");
    assert_eq!(config.engine.install_dir.as_deref(), Some("/ci/tmp/__rlsecure"));
    assert_eq!(config.engine.store_dir.as_deref(), Some("/ci/tmp/__rlstore"));
}

// =============================================================================
// 파일 로딩 테스트
// =============================================================================

#[tokio::test]
#[serial_test::serial]
async fn load_reads_file_and_validates() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let path = dir.path().join("rlscan.toml");
    fs::write(&path, "[general]\nlog_format = \"json\"\n").expect("write config");

    let config = RlScanConfig::load(&path).await.expect("should load");
    assert_eq!(config.general.log_format, "json");
}

#[tokio::test]
#[serial_test::serial]
async fn load_rejects_invalid_values() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let path = dir.path().join("rlscan.toml");
    fs::write(&path, "[reporter]\nmessage_reporter = \"xml\"\n").expect("write config");

    let err = RlScanConfig::load(&path).await.unwrap_err();
    assert!(matches!(
        err,
        RlScanError::Config(ConfigError::InvalidValue { .. })
    ));
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

    let original = std::env::var("RLSCAN_GENERAL_LOG_LEVEL").ok();
    // SAFETY: #[serial]로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("RLSCAN_GENERAL_LOG_LEVEL", "error");
    }

    let mut config = RlScanConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();
    let result = config.general.log_level.clone();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("RLSCAN_GENERAL_LOG_LEVEL", val),
            None => std::env::remove_var("RLSCAN_GENERAL_LOG_LEVEL"),
        }
    }

    assert_eq!(result, "error");
}

#[test]
#[serial_test::serial]
fn from_env_applies_overrides_to_defaults() {
    let original = std::env::var("RLSCAN_REPORTER_MESSAGE_REPORTER").ok();
    // SAFETY: #[serial]로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("RLSCAN_REPORTER_MESSAGE_REPORTER", "teamcity");
    }

    let result = RlScanConfig::from_env();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("RLSCAN_REPORTER_MESSAGE_REPORTER", val),
            None => std::env::remove_var("RLSCAN_REPORTER_MESSAGE_REPORTER"),
        }
    }

    let config = result.expect("defaults with override should validate");
    assert_eq!(config.reporter.message_reporter, "teamcity");
}

#[test]
fn empty_string_parses_with_defaults() {
    let config = RlScanConfig::parse("").expect("empty config should parse");
    config.validate().expect("defaults should validate");
}
