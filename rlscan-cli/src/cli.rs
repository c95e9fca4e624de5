//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O. Cross-argument rules live in
//! `commands::scan`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use rlscan_scanner::ReporterKind;

/// rlscan -- scan packages with rl-secure and report the verdict to CI.
///
/// Use `rlscan <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "rlscan", version, about, long_about = None)]
pub struct Cli {
    /// Path to the rlscan.toml configuration file (defaults apply when absent).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format for `config` commands.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a local package file.
    RlScan(LocalScanArgs),

    /// Download a package from an http(s) URL and scan it.
    RlScanUrl(UrlScanArgs),

    /// Import a package by PURL (npm, pypi, gem, nuget, vsx) and scan it.
    RlScanPurl(PurlScanArgs),

    /// Import a container image (pkg:docker/...) and scan it.
    RlScanDocker(DockerScanArgs),

    /// Remove package versions from an existing rl-store.
    RlPrune(PruneArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- scan ----

/// Options shared by every scan subcommand.
#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Package URL used to identify the scanned package in the rl-store.
    #[arg(long)]
    pub purl: Option<String>,

    /// Existing rl-store to use instead of a temporary one.
    #[arg(long)]
    pub rl_store: Option<PathBuf>,

    /// Vault key of the rl-store (falls back to RLSECURE_VAULT_KEY).
    #[arg(long)]
    pub vault_key: Option<String>,

    /// Password for unpacking protected files. Repeatable.
    #[arg(long = "password")]
    pub passwords: Vec<String>,

    /// File listing passwords for protected files. Repeatable.
    #[arg(long = "password-list")]
    pub password_lists: Vec<PathBuf>,

    /// Base64 encoded password list. Repeatable.
    #[arg(long = "encoded-password-list", visible_alias = "encoded-list")]
    pub encoded_password_lists: Vec<String>,

    /// Replace the package version if it already exists in the rl-store.
    #[arg(long)]
    pub replace: bool,

    /// Previously analyzed version to compare against.
    #[arg(long)]
    pub diff_with: Option<String>,

    /// Previously analyzed version to synchronize settings with.
    #[arg(long)]
    pub sync_with: Option<String>,

    /// rl-level used for analysis (temporary rl-store only).
    #[arg(long)]
    pub rl_level: Option<String>,

    /// Directory receiving the reports; must be empty if it exists.
    #[arg(long)]
    pub report_path: PathBuf,

    /// Comma-separated report formats.
    #[arg(long, default_value = "all")]
    pub report_format: String,

    /// Status message format (text, teamcity); overrides the config file.
    #[arg(long, value_parser = parse_reporter)]
    pub message_reporter: Option<ReporterKind>,

    /// Create an rl-safe archive in the report directory.
    #[arg(long)]
    pub pack_safe: bool,
}

/// Credentials for remote downloads.
#[derive(Args, Debug, Clone, Default)]
pub struct RemoteAuthArgs {
    /// User for basic authentication.
    #[arg(long)]
    pub auth_user: Option<String>,

    /// Password for basic authentication.
    #[arg(long)]
    pub auth_pass: Option<String>,

    /// Token for bearer authentication.
    #[arg(long)]
    pub bearer_token: Option<String>,
}

/// Scan a local package file.
#[derive(Args, Debug)]
pub struct LocalScanArgs {
    /// Package file to scan. Glob patterns must match exactly one file.
    #[arg(long)]
    pub package_path: PathBuf,

    #[command(flatten)]
    pub scan: ScanArgs,
}

/// Scan a package downloaded from a URL.
#[derive(Args, Debug)]
pub struct UrlScanArgs {
    /// http(s) URL of the package.
    #[arg(long)]
    pub import_url: String,

    #[command(flatten)]
    pub auth: RemoteAuthArgs,

    #[command(flatten)]
    pub scan: ScanArgs,
}

/// Scan a package imported by PURL.
#[derive(Args, Debug)]
pub struct PurlScanArgs {
    /// PURL of the package to import.
    #[arg(long)]
    pub import_purl: String,

    #[command(flatten)]
    pub auth: RemoteAuthArgs,

    #[command(flatten)]
    pub scan: ScanArgs,
}

/// Scan a container image.
#[derive(Args, Debug)]
pub struct DockerScanArgs {
    /// Image reference (pkg:docker/...).
    #[arg(long)]
    pub import_docker: String,

    #[command(flatten)]
    pub auth: RemoteAuthArgs,

    #[command(flatten)]
    pub scan: ScanArgs,
}

// ---- prune ----

/// Remove package versions from an rl-store.
#[derive(Args, Debug)]
pub struct PruneArgs {
    /// Package URL whose versions are pruned.
    #[arg(long)]
    pub purl: String,

    /// Existing rl-store.
    #[arg(long)]
    pub rl_store: PathBuf,

    /// Vault key of the rl-store (falls back to RLSECURE_VAULT_KEY).
    #[arg(long)]
    pub vault_key: Option<String>,

    /// Remove versions analyzed before this date.
    #[arg(long)]
    pub before_date: Option<String>,

    /// Remove versions analyzed after this date.
    #[arg(long)]
    pub after_date: Option<String>,

    /// Remove versions older than this many days.
    #[arg(long)]
    pub days_older: Option<u32>,

    /// Remove versions older than this many hours.
    #[arg(long)]
    pub hours_older: Option<u32>,

    /// Status message format (text, teamcity); overrides the config file.
    #[arg(long, value_parser = parse_reporter)]
    pub message_reporter: Option<ReporterKind>,
}

// ---- config ----

/// Manage rlscan configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, engine, reporter).
        #[arg(long)]
        section: Option<String>,
    },
}

fn parse_reporter(value: &str) -> Result<ReporterKind, String> {
    value.parse()
}
