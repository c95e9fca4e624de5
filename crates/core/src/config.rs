//! 설정 관리 — rlscan.toml 파싱 및 런타임 설정
//!
//! [`RlScanConfig`]는 로깅, 엔진 파일 배치, 메시지 리포터 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`RLSCAN_ENGINE_STORE_DIR=/data/store` 형식)
//! 3. 설정 파일 (`--config`로 지정, 선택)
//! 4. 기본값 (`Default` 구현)
//!
//! 라이선스, 프록시, 볼트 키, 패키지 비밀번호 같은 비밀값은 설정 파일에 두지 않습니다.
//! 이들은 [`crate::secrets`]에서 `RLSECURE_*` 환경변수로만 읽습니다.
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), rlscan_core::error::RlScanError> {
//! use rlscan_core::config::RlScanConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = RlScanConfig::load("rlscan.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = RlScanConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, RlScanError};

/// rlscan 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RlScanConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 엔진 설치/스토어/리포트 경로 설정
    #[serde(default)]
    pub engine: EngineConfig,
    /// 상태 메시지 리포터 설정
    #[serde(default)]
    pub reporter: ReporterConfig,
}

impl RlScanConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RlScanError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.engine.resolve_paths();
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일 없이 기본값 + 환경변수 오버라이드로 설정을 만듭니다.
    pub fn from_env() -> Result<Self, RlScanError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.engine.resolve_paths();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, RlScanError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RlScanError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                RlScanError::io(path, e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, RlScanError> {
        toml::from_str(toml_str).map_err(|e| {
            RlScanError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `RLSCAN_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let Self {
            general,
            engine,
            reporter,
        } = self;
        let strings: [(&str, &mut String); 6] = [
            ("RLSCAN_GENERAL_LOG_LEVEL", &mut general.log_level),
            ("RLSCAN_GENERAL_LOG_FORMAT", &mut general.log_format),
            ("RLSCAN_ENGINE_DEPLOY_PROGRAM", &mut engine.deploy_program),
            ("RLSCAN_ENGINE_EXECUTABLE_NAME", &mut engine.executable_name),
            ("RLSCAN_ENGINE_TMP_DIR", &mut engine.tmp_dir),
            ("RLSCAN_REPORTER_MESSAGE_REPORTER", &mut reporter.message_reporter),
        ];
        for (key, target) in strings {
            if let Some(value) = lookup(key) {
                *target = value;
            }
        }

        let paths: [(&str, &mut Option<String>); 4] = [
            ("RLSCAN_ENGINE_INSTALL_DIR", &mut engine.install_dir),
            ("RLSCAN_ENGINE_CACHE_PATH", &mut engine.cache_path),
            ("RLSCAN_ENGINE_REPORT_SCRATCH_DIR", &mut engine.report_scratch_dir),
            ("RLSCAN_ENGINE_STORE_DIR", &mut engine.store_dir),
        ];
        for (key, target) in paths {
            if let Some(value) = lookup(key) {
                *target = Some(value);
            }
        }

        let key = "RLSCAN_ENGINE_KEEP_EPHEMERAL_STORE";
        if let Some(value) = lookup(key) {
            match value.parse::<bool>() {
                Ok(parsed) => engine.keep_ephemeral_store = parsed,
                Err(_) => warn!(env_key = key, value = %value, "ignoring non-boolean override"),
            }
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), RlScanError> {
        one_of("general.log_level", &self.general.log_level, LOG_LEVELS)?;
        one_of("general.log_format", &self.general.log_format, LOG_FORMATS)?;
        one_of(
            "reporter.message_reporter",
            &self.reporter.message_reporter,
            MESSAGE_REPORTERS,
        )?;

        let engine = &self.engine;
        let required = [
            ("engine.deploy_program", engine.deploy_program.as_str()),
            ("engine.executable_name", engine.executable_name.as_str()),
            ("engine.tmp_dir", engine.tmp_dir.as_str()),
        ];
        let explicit = [
            ("engine.install_dir", &engine.install_dir),
            ("engine.cache_path", &engine.cache_path),
            ("engine.report_scratch_dir", &engine.report_scratch_dir),
            ("engine.store_dir", &engine.store_dir),
        ];
        let blank = required
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| field)
            .or_else(|| {
                explicit.into_iter().find_map(|(field, value)| {
                    value
                        .as_deref()
                        .is_some_and(|v| v.trim().is_empty())
                        .then_some(field)
                })
            });
        if let Some(field) = blank {
            return Err(invalid(field, "must not be empty"));
        }

        // 스크래치 디렉토리는 매 실행마다 삭제되므로 스토어와 겹치면 안 됨
        if engine.report_scratch_dir() == engine.store_dir() {
            return Err(invalid(
                "engine.report_scratch_dir",
                "must differ from engine.store_dir",
            ));
        }

        Ok(())
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["json", "pretty"];
const MESSAGE_REPORTERS: &[&str] = &["text", "teamcity"];

fn invalid(field: &str, reason: impl Into<String>) -> RlScanError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

fn one_of(field: &str, value: &str, allowed: &[&str]) -> Result<(), RlScanError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(invalid(
            field,
            format!("'{value}' is not one of: {}", allowed.join(", ")),
        ))
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 엔진 설치 및 작업 디렉토리 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 엔진 설치 프로그램
    pub deploy_program: String,
    /// 설치 디렉토리 안의 엔진 실행 파일 이름
    pub executable_name: String,
    /// 아래 경로들을 따로 지정하지 않았을 때 기준이 되는 디렉토리
    pub tmp_dir: String,
    /// 엔진 설치 디렉토리 (기본 `{tmp_dir}/__rlsecure`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_dir: Option<String>,
    /// 설치 가속용 캐시 파일 (기본 `{tmp_dir}/rl-secure.cache`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<String>,
    /// 리포트 임시 디렉토리, 매 실행마다 재생성 (기본 `{tmp_dir}/__rlsecure-report`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_scratch_dir: Option<String>,
    /// 임시 스토어 디렉토리 (기본 `{tmp_dir}/__rlstore`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<String>,
    /// 실행 후 임시 스토어를 남길지 여부
    pub keep_ephemeral_store: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deploy_program: "rl-deploy".to_owned(),
            executable_name: "rl-secure".to_owned(),
            tmp_dir: "/tmp".to_owned(),
            install_dir: None,
            cache_path: None,
            report_scratch_dir: None,
            store_dir: None,
            keep_ephemeral_store: false,
        }
    }
}

impl EngineConfig {
    pub fn install_dir(&self) -> String {
        self.under_tmp(&self.install_dir, "__rlsecure")
    }

    pub fn cache_path(&self) -> String {
        self.under_tmp(&self.cache_path, "rl-secure.cache")
    }

    pub fn report_scratch_dir(&self) -> String {
        self.under_tmp(&self.report_scratch_dir, "__rlsecure-report")
    }

    pub fn store_dir(&self) -> String {
        self.under_tmp(&self.store_dir, "__rlstore")
    }

    /// 지정되지 않은 경로를 `tmp_dir` 기준 값으로 채웁니다.
    ///
    /// 오버라이드를 모두 적용한 뒤에 호출해야 `RLSCAN_ENGINE_TMP_DIR`이 반영됩니다.
    pub fn resolve_paths(&mut self) {
        self.install_dir = Some(self.install_dir());
        self.cache_path = Some(self.cache_path());
        self.report_scratch_dir = Some(self.report_scratch_dir());
        self.store_dir = Some(self.store_dir());
    }

    fn under_tmp(&self, explicit: &Option<String>, name: &str) -> String {
        explicit
            .clone()
            .unwrap_or_else(|| format!("{}/{name}", self.tmp_dir.trim_end_matches('/')))
    }
}

/// 상태 메시지 리포터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    /// 메시지 형식 (text, teamcity)
    pub message_reporter: String,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            message_reporter: "text".to_owned(),
        }
    }
}
