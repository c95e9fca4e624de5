//! `rlscan rl-prune` command handler

use rlscan_core::config::RlScanConfig;
use rlscan_core::secrets::{self, InstallCredentials};
use rlscan_core::types::{PackageRef, SecretString};
use rlscan_scanner::{
    EngineLayout, PruneRequest, ScanOrchestrator, StatusReporter, TokioCommandRunner,
    stdout_reporter,
};

use crate::cli::PruneArgs;
use crate::error::CliError;

use super::reporter_kind;

/// Execute `rl-prune` and return the process exit code.
pub async fn execute(args: PruneArgs, config: &RlScanConfig) -> Result<i32, CliError> {
    let reporter = stdout_reporter(reporter_kind(args.message_reporter, config)?);

    match run(args, config, reporter.as_ref()).await {
        Ok(code) => Ok(code),
        Err(e) => {
            reporter.fatal(&e.to_string());
            Err(e.reported())
        }
    }
}

async fn run(
    args: PruneArgs,
    config: &RlScanConfig,
    reporter: &dyn StatusReporter,
) -> Result<i32, CliError> {
    let request = build_request(args, secrets::env_lookup)?;
    let layout = EngineLayout::from_core(&config.engine);
    let runner = TokioCommandRunner;
    let code = ScanOrchestrator::new(&runner, reporter, &layout)
        .with_install_credentials(InstallCredentials::collect(secrets::env_lookup))
        .prune(&request)
        .await?;
    Ok(code)
}

/// Turns the arguments into a [`PruneRequest`].
pub fn build_request(
    args: PruneArgs,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<PruneRequest, CliError> {
    let vault_key = args
        .vault_key
        .filter(|k| !k.is_empty())
        .map(SecretString::from)
        .or_else(|| secrets::vault_key_from(&lookup));

    Ok(PruneRequest {
        purl: PackageRef::parse(&args.purl)?,
        store: args.rl_store,
        vault_key,
        before_date: args.before_date,
        after_date: args.after_date,
        days_older: args.days_older,
        hours_older: args.hours_older,
    })
}
