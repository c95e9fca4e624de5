//! `rlscan rl-scan*` command handlers
//!
//! Every parameter rule is checked here, before the engine is installed or any
//! subprocess is launched. Errors from that point on are emitted through the
//! status reporter and mapped to an exit code.

use std::path::{Path, PathBuf};

use rlscan_core::config::RlScanConfig;
use rlscan_core::error::ParameterError;
use rlscan_core::secrets::{self, InstallCredentials, PackagePasswords};
use rlscan_core::types::{PackageRef, PackageSource, RemoteAuth, ReportFormats, SecretString};
use rlscan_scanner::{
    EngineLayout, ScanOrchestrator, ScanRequest, StatusReporter, TokioCommandRunner,
    stdout_reporter,
};
use tracing::info;

use crate::cli::{RemoteAuthArgs, ScanArgs};
use crate::error::CliError;

use super::reporter_kind;

/// Where the package comes from, as given on the command line.
#[derive(Debug, Clone)]
pub enum ScanTarget {
    Local(PathBuf),
    Url(String, RemoteAuthArgs),
    Purl(String, RemoteAuthArgs),
    Docker(String, RemoteAuthArgs),
}

/// Execute a scan subcommand and return the process exit code.
pub async fn execute(
    target: ScanTarget,
    args: ScanArgs,
    config: &RlScanConfig,
) -> Result<i32, CliError> {
    let reporter = stdout_reporter(reporter_kind(args.message_reporter, config)?);

    match run(target, args, config, reporter.as_ref()).await {
        Ok(code) => Ok(code),
        Err(e) => {
            reporter.fatal(&e.to_string());
            Err(e.reported())
        }
    }
}

async fn run(
    target: ScanTarget,
    args: ScanArgs,
    config: &RlScanConfig,
    reporter: &dyn StatusReporter,
) -> Result<i32, CliError> {
    let request = build_request(target, args, secrets::env_lookup)?;
    info!(
        purl = %request.package_ref(),
        existing_store = request.existing_store.is_some(),
        report_path = %request.report_path.display(),
        "scan parameters validated"
    );

    let layout = EngineLayout::from_core(&config.engine);
    let runner = TokioCommandRunner;
    let outcome = ScanOrchestrator::new(&runner, reporter, &layout)
        .with_install_credentials(InstallCredentials::collect(secrets::env_lookup))
        .run(&request)
        .await?;
    Ok(outcome.exit_code)
}

/// Validates the arguments and turns them into a [`ScanRequest`].
///
/// `lookup` resolves `RLSECURE_*` environment variables.
pub fn build_request(
    target: ScanTarget,
    args: ScanArgs,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ScanRequest, CliError> {
    let purl = args.purl.as_deref().map(PackageRef::parse).transpose()?;

    validate_store_level_purl(&args, purl.as_ref())?;
    validate_store_diff_purl(&args, purl.as_ref())?;
    validate_purl_repro_store(&args, purl.as_ref())?;
    validate_report_path(&args.report_path)?;
    let report_formats = ReportFormats::parse(&args.report_format)?;

    let source = match target {
        ScanTarget::Local(path) => PackageSource::LocalFile(validate_package_path(&path)?),
        ScanTarget::Url(url, auth) => PackageSource::url(&url, remote_auth(auth))?,
        ScanTarget::Purl(purl, auth) => PackageSource::purl(&purl, remote_auth(auth))?,
        ScanTarget::Docker(image, auth) => PackageSource::docker(&image, remote_auth(auth))?,
    };

    let vault_key = args
        .vault_key
        .filter(|k| !k.is_empty())
        .map(SecretString::from)
        .or_else(|| secrets::vault_key_from(&lookup));

    let passwords = PackagePasswords::collect(
        &lookup,
        args.passwords,
        args.encoded_password_lists,
        args.password_lists,
    );

    Ok(ScanRequest {
        source,
        purl,
        existing_store: args.rl_store,
        vault_key,
        passwords,
        replace: args.replace,
        diff_with: args.diff_with,
        sync_with: args.sync_with,
        rl_level: args.rl_level,
        report_path: args.report_path,
        report_formats,
        pack_safe: args.pack_safe,
    })
}

fn remote_auth(args: RemoteAuthArgs) -> RemoteAuth {
    RemoteAuth {
        user: args.auth_user,
        password: args.auth_pass.map(SecretString::from),
        bearer_token: args.bearer_token.map(SecretString::from),
    }
}

/// A reused store needs an explicit reference and takes no level.
fn validate_store_level_purl(args: &ScanArgs, purl: Option<&PackageRef>) -> Result<(), ParameterError> {
    if args.rl_store.is_some() {
        if purl.is_none() {
            return Err(ParameterError::invalid(
                "--purl",
                "must be specified when using an existing rl-store",
            ));
        }
        if args.rl_level.is_some() {
            return Err(ParameterError::invalid(
                "--rl-level",
                "--rl-store and --rl-level can't be used together",
            ));
        }
    }
    Ok(())
}

fn validate_store_diff_purl(args: &ScanArgs, purl: Option<&PackageRef>) -> Result<(), ParameterError> {
    if args.diff_with.is_some() {
        if purl.is_none() {
            return Err(ParameterError::invalid(
                "--purl",
                "must be specified when generating a difference report",
            ));
        }
        if args.rl_store.is_none() {
            return Err(ParameterError::invalid(
                "--rl-store",
                "must be specified when generating a difference report",
            ));
        }
    }
    Ok(())
}

fn validate_purl_repro_store(args: &ScanArgs, purl: Option<&PackageRef>) -> Result<(), ParameterError> {
    if purl.is_some_and(PackageRef::is_reproducible_build) && args.rl_store.is_none() {
        return Err(ParameterError::invalid(
            "--rl-store",
            "must be specified when generating a reproducible build report",
        ));
    }
    Ok(())
}

fn validate_report_path(path: &Path) -> Result<(), ParameterError> {
    if !path.exists() {
        return Ok(());
    }
    let empty_dir = path.is_dir()
        && std::fs::read_dir(path)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
    if !empty_dir {
        return Err(ParameterError::invalid(
            "--report-path",
            "needs to point to an empty directory",
        ));
    }
    Ok(())
}

/// Resolves `--package-path` as a glob pattern that must match exactly one regular file.
fn validate_package_path(path: &Path) -> Result<PathBuf, ParameterError> {
    let pattern = path.to_str().ok_or_else(|| {
        ParameterError::invalid("--package-path", "is not valid UTF-8")
    })?;
    let matches = glob::glob(pattern)
        .map_err(|e| ParameterError::invalid("--package-path", format!("invalid pattern: {e}")))?
        .filter_map(Result::ok)
        .collect::<Vec<_>>();

    match matches.as_slice() {
        [] => Err(ParameterError::invalid(
            "--package-path",
            format!("\"{pattern}\" doesn't resolve to any file"),
        )),
        [single] if single.is_file() => Ok(single.clone()),
        [single] => Err(ParameterError::invalid(
            "--package-path",
            format!("\"{}\" is not a regular file", single.display()),
        )),
        _ => Err(ParameterError::invalid(
            "--package-path",
            format!("\"{pattern}\" resolves to more than one file"),
        )),
    }
}
