//! `rlscan config` -- validate or print the effective configuration
//!
//! "Effective" means what a scan would run with: the config file (explicit or
//! `./rlscan.toml`), then `RLSCAN_*` overrides, then defaults. Secret
//! `RLSECURE_*` variables are never part of it.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use colored::Colorize;
use rlscan_core::config::RlScanConfig;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

use super::{DEFAULT_CONFIG_PATH, load_config};

/// Sections accepted by `config show --section`.
const SECTIONS: &[&str] = &["general", "engine", "reporter"];

/// Where the effective configuration was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConfigSource {
    Explicit(PathBuf),
    WorkingDir,
    Defaults,
}

impl ConfigSource {
    fn resolve(config_path: Option<&Path>) -> Self {
        match config_path {
            Some(path) => Self::Explicit(path.to_path_buf()),
            None if Path::new(DEFAULT_CONFIG_PATH).is_file() => Self::WorkingDir,
            None => Self::Defaults,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit(path) => write!(f, "{}", path.display()),
            Self::WorkingDir => f.write_str(DEFAULT_CONFIG_PATH),
            Self::Defaults => f.write_str("(defaults)"),
        }
    }
}

impl Serialize for ConfigSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub async fn execute(
    args: ConfigArgs,
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let source = ConfigSource::resolve(config_path);
    debug!(source = %source, "resolving configuration");

    match args.action {
        ConfigAction::Validate => validate(source, config_path, writer).await,
        ConfigAction::Show { section } => show(source, config_path, section, writer).await,
    }
}

/// Renders the verdict first, then fails with exit code 2 if the configuration is invalid.
async fn validate(
    source: ConfigSource,
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let report = match load_config(config_path).await {
        Ok(config) => ConfigValidationReport {
            source,
            valid: true,
            message_reporter: Some(config.reporter.message_reporter),
            error: None,
        },
        Err(e) => ConfigValidationReport {
            source,
            valid: false,
            message_reporter: None,
            error: Some(e.to_string()),
        },
    };

    writer.render(&report)?;

    if report.valid {
        Ok(())
    } else {
        Err(CliError::Config("configuration is invalid".to_owned()))
    }
}

async fn show(
    source: ConfigSource,
    config_path: Option<&Path>,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = load_config(config_path).await?;
    let values = select_section(&config, section.as_deref())?;
    writer.render(&ConfigReport {
        source,
        section,
        config: values,
    })
}

fn select_section(
    config: &RlScanConfig,
    section: Option<&str>,
) -> Result<serde_json::Value, CliError> {
    let mut all = serde_json::to_value(config)?;
    match section {
        None => Ok(all),
        Some(name) if SECTIONS.contains(&name) => Ok(all[name].take()),
        Some(other) => Err(CliError::Command(format!(
            "unknown section: {other} (expected: {})",
            SECTIONS.join(", ")
        ))),
    }
}

/// `config show` payload. Text output renders `config` as TOML.
#[derive(Serialize)]
struct ConfigReport {
    source: ConfigSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    section: Option<String>,
    config: serde_json::Value,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        let heading = match &self.section {
            Some(section) => format!("[{section}]"),
            None => "all sections".to_owned(),
        };
        writeln!(
            w,
            "Configuration {} (source: {})",
            heading.bold(),
            self.source
        )?;
        writeln!(w)?;

        let body = toml::to_string_pretty(&self.config).map_err(std::io::Error::other)?;
        write!(w, "{body}")
    }
}

/// `config validate` payload.
#[derive(Serialize)]
struct ConfigValidationReport {
    source: ConfigSource,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_reporter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Config: {}", self.source.to_string().bold())?;
        match (&self.error, &self.message_reporter) {
            (Some(error), _) => {
                writeln!(w, "  {}", "INVALID".red().bold())?;
                writeln!(w, "  {}", error.red())
            }
            (None, Some(reporter)) => {
                writeln!(w, "  {} (message reporter: {reporter})", "VALID".green().bold())
            }
            (None, None) => writeln!(w, "  {}", "VALID".green().bold()),
        }
    }
}
