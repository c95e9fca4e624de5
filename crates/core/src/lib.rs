#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod secrets;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{
    ConfigError, ExecutionError, InvalidStateError, ParameterError, RlScanError,
    UnrecoverableStatusError,
};

// 설정
pub use config::RlScanConfig;

// 비밀값
pub use secrets::{InstallCredentials, PackagePasswords};

// 도메인 타입
pub use types::{PackageRef, PackageSource, RemoteAuth, ReportFormats, SecretString};
