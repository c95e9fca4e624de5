//! 에러 타입 — 스캔 오케스트레이션 도메인별 에러 정의
//!
//! 외부 엔진(`rl-secure`) 호출 실패는 [`ExecutionError`], 스토어 상태 위반은
//! [`InvalidStateError`], 분류 문법 밖의 종료 코드는 [`UnrecoverableStatusError`]로
//! 표현됩니다. 모든 에러는 [`RlScanError`]로 `?` 전파됩니다.

use std::path::PathBuf;

/// rlscan 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum RlScanError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 인자 검증 에러
    #[error("{0}")]
    Parameter(#[from] ParameterError),

    /// 외부 프로세스 실행 에러
    #[error("{0}")]
    Execution(#[from] ExecutionError),

    /// 스토어/볼트 상태 에러
    #[error("{0}")]
    InvalidState(#[from] InvalidStateError),

    /// 상태 조회 결과를 분류할 수 없음
    #[error("{0}")]
    UnrecoverableStatus(#[from] UnrecoverableStatusError),

    /// 파일 시스템 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 경로
        path: PathBuf,
        /// 원본 I/O 에러
        source: std::io::Error,
    },
}

impl RlScanError {
    /// 경로 정보를 포함한 I/O 에러를 생성합니다.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 명령줄 인자 검증 에러
#[derive(Debug, thiserror::Error)]
pub enum ParameterError {
    /// 인자 조합 또는 값이 유효하지 않음
    #[error("{field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ParameterError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 외부 프로세스 실행 에러
///
/// `command` 필드는 항상 비밀값이 마스킹된 명령줄입니다.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// strict 모드에서 0이 아닌 종료 코드
    #[error("command \"{command}\" returned non-zero exit code ({exit_code})")]
    NonZeroExit { command: String, exit_code: i32 },

    /// 프로세스 실행 자체가 실패함
    #[error("{reason} while executing \"{command}\"")]
    Launch { command: String, reason: String },
}

impl ExecutionError {
    /// 마스킹된 명령줄을 반환합니다.
    pub fn command(&self) -> &str {
        match self {
            Self::NonZeroExit { command, .. } | Self::Launch { command, .. } => command,
        }
    }
}

/// 스토어 및 볼트 상태 에러
#[derive(Debug, thiserror::Error)]
pub enum InvalidStateError {
    /// 기존 스토어 경로가 디렉토리가 아님
    #[error("rl-store path is not a directory: {path}")]
    NotADirectory { path: String },

    /// 초기화 대상 디렉토리가 비어 있지 않음
    #[error("rl-store location must be empty before initialization: {path}")]
    NotEmpty { path: String },

    /// 패키지 비밀번호가 지정되었지만 볼트 키가 없음
    #[error("package passwords require a vault key (use --vault-key or RLSECURE_VAULT_KEY)")]
    MissingVaultKey,
}

/// status/checks 호출이 분류 문법 밖의 종료 코드를 반환함
#[derive(Debug, thiserror::Error)]
#[error("command \"{command}\" terminated with unexpected exit code ({exit_code})")]
pub struct UnrecoverableStatusError {
    /// 마스킹된 명령줄
    pub command: String,
    /// 원본 종료 코드 (시그널 종료는 음수)
    pub exit_code: i32,
}
