//! Command handlers -- one module per subcommand group

pub mod config;
pub mod prune;
pub mod scan;

use std::path::Path;

use rlscan_core::config::RlScanConfig;
use rlscan_scanner::ReporterKind;

use crate::error::CliError;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_PATH: &str = "rlscan.toml";

/// Loads the effective configuration.
///
/// An explicit path must exist. Without one, `rlscan.toml` is used when present,
/// otherwise defaults plus environment overrides.
pub async fn load_config(path: Option<&Path>) -> Result<RlScanConfig, CliError> {
    let config = match path {
        Some(path) => RlScanConfig::load(path).await?,
        None if Path::new(DEFAULT_CONFIG_PATH).is_file() => {
            RlScanConfig::load(DEFAULT_CONFIG_PATH).await?
        }
        None => RlScanConfig::from_env()?,
    };
    Ok(config)
}

/// Reporter selection: command-line flag first, then `[reporter]` config.
pub fn reporter_kind(
    flag: Option<ReporterKind>,
    config: &RlScanConfig,
) -> Result<ReporterKind, CliError> {
    match flag {
        Some(kind) => Ok(kind),
        None => config
            .reporter
            .message_reporter
            .parse()
            .map_err(CliError::Config),
    }
}
