//! rlscan -- command-line front end for rl-secure scans.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;
use colored::Colorize;
use rlscan_core::config::{GeneralConfig, RlScanConfig};

use crate::cli::{Cli, Commands};
use crate::commands::scan::ScanTarget;
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            if !e.is_reported() {
                eprintln!("{} {}", "error:".red().bold(), e);
            }
            e.exit_code()
        }
    };

    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32, CliError> {
    let config_path = cli.config.as_deref();

    if let Commands::Config(args) = cli.command {
        init_logging(&GeneralConfig::default(), cli.log_level.as_deref())?;
        let writer = OutputWriter::new(cli.output);
        commands::config::execute(args, config_path, &writer).await?;
        return Ok(0);
    }

    let config = commands::load_config(config_path).await?;
    init_logging(&config.general, cli.log_level.as_deref())?;
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "rlscan starting");

    dispatch(cli.command, &config).await
}

async fn dispatch(command: Commands, config: &RlScanConfig) -> Result<i32, CliError> {
    match command {
        Commands::RlScan(args) => {
            commands::scan::execute(ScanTarget::Local(args.package_path), args.scan, config).await
        }
        Commands::RlScanUrl(args) => {
            commands::scan::execute(ScanTarget::Url(args.import_url, args.auth), args.scan, config)
                .await
        }
        Commands::RlScanPurl(args) => {
            commands::scan::execute(
                ScanTarget::Purl(args.import_purl, args.auth),
                args.scan,
                config,
            )
            .await
        }
        Commands::RlScanDocker(args) => {
            commands::scan::execute(
                ScanTarget::Docker(args.import_docker, args.auth),
                args.scan,
                config,
            )
            .await
        }
        Commands::RlPrune(args) => commands::prune::execute(args, config).await,
        // handled before the configuration is loaded
        Commands::Config(_) => Ok(0),
    }
}

fn init_logging(general: &GeneralConfig, level: Option<&str>) -> Result<(), CliError> {
    logging::init_tracing(general, level).map_err(|e| CliError::Config(e.to_string()))
}
