//! Integration tests for the scan pipeline
//!
//! A scripted runner stands in for the engine: it records every command vector and
//! simulates the filesystem side effects the real engine would have.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rlscan_core::error::{ExecutionError, InvalidStateError, RlScanError};
use rlscan_core::secrets::PackagePasswords;
use rlscan_core::types::{PackageRef, PackageSource, ReportFormats, SecretString};
use rlscan_scanner::runner::{EngineCommand, MASK};
use rlscan_scanner::store::STORE_MARKER;
use rlscan_scanner::{
    CommandRunner, EngineLayout, ProcessOutput, PruneRequest, ScanOrchestrator, ScanRequest,
    StatusReporter, TeamCityReporter,
};

/// Engine stand-in with canned status/checks answers.
struct ScriptedEngine {
    calls: Mutex<Vec<EngineCommand>>,
    status: (i32, &'static str),
    checks_exit: i32,
    fail_subcommand: Option<&'static str>,
}

impl ScriptedEngine {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            status: (0, ""),
            checks_exit: 0,
            fail_subcommand: None,
        }
    }

    fn calls(&self) -> Vec<EngineCommand> {
        self.calls.lock().unwrap().clone()
    }

    fn subcommands(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| c.args.first().cloned().unwrap_or_default())
            .collect()
    }

    fn find(&self, subcommand: &str) -> EngineCommand {
        self.calls()
            .into_iter()
            .find(|c| c.args.first().is_some_and(|a| a == subcommand))
            .unwrap_or_else(|| panic!("no `{subcommand}` invocation recorded"))
    }
}

fn arg_value<'a>(cmd: &'a EngineCommand, prefix: &str) -> Option<&'a str> {
    cmd.args.iter().find_map(|a| a.strip_prefix(prefix))
}

impl CommandRunner for ScriptedEngine {
    async fn run(&self, command: &EngineCommand) -> Result<ProcessOutput, ExecutionError> {
        self.calls.lock().unwrap().push(command.clone());
        let sub = command.args.first().cloned().unwrap_or_default();

        if self.fail_subcommand == Some(sub.as_str()) {
            return Err(ExecutionError::NonZeroExit {
                command: command.redacted(),
                exit_code: 2,
            });
        }

        match sub.as_str() {
            "init" => {
                let store = arg_value(command, "--rl-store=").unwrap();
                std::fs::create_dir_all(Path::new(store).join(STORE_MARKER)).unwrap();
                Ok(ProcessOutput::default())
            }
            "report" => {
                let out = PathBuf::from(arg_value(command, "--output-path=").unwrap());
                std::fs::create_dir_all(out.join("rl-json")).unwrap();
                std::fs::write(out.join("rl-json/report.rl.json"), "{}").unwrap();
                if let Some(version) = arg_value(command, "--diff-with=") {
                    let diff = out.join(format!("rl-html-diff-with-{version}"));
                    std::fs::create_dir_all(&diff).unwrap();
                    std::fs::write(diff.join("index.html"), "diff").unwrap();
                }
                Ok(ProcessOutput::default())
            }
            "pack" => {
                let out = PathBuf::from(arg_value(command, "--output-path=").unwrap());
                std::fs::write(out.join("package.rl-safe"), "archive").unwrap();
                Ok(ProcessOutput::default())
            }
            "--version" => Ok(ProcessOutput {
                exit_code: 0,
                stdout: "rl-secure 2.0.0\n".to_owned(),
            }),
            "status" => Ok(ProcessOutput {
                exit_code: self.status.0,
                stdout: self.status.1.to_owned(),
            }),
            "checks" => Ok(ProcessOutput {
                exit_code: self.checks_exit,
                stdout: String::new(),
            }),
            _ => Ok(ProcessOutput::default()),
        }
    }
}

/// Reporter that records events as plain strings.
#[derive(Default)]
struct RecordingReporter {
    events: Mutex<Vec<String>>,
    exit_codes: bool,
}

impl RecordingReporter {
    fn text() -> Self {
        Self {
            exit_codes: true,
            ..Self::default()
        }
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl StatusReporter for RecordingReporter {
    fn block_start(&self, label: &str) {
        self.events.lock().unwrap().push(format!("start:{label}"));
    }

    fn block_end(&self, label: &str) {
        self.events.lock().unwrap().push(format!("end:{label}"));
    }

    fn info(&self, message: &str) {
        self.events.lock().unwrap().push(format!("info:{message}"));
    }

    fn scan_result(&self, passed: bool, message: &str) -> bool {
        self.events
            .lock()
            .unwrap()
            .push(format!("result:{passed}:{message}"));
        self.exit_codes
    }

    fn fatal(&self, message: &str) {
        self.events.lock().unwrap().push(format!("fatal:{message}"));
    }
}

struct Workspace {
    _root: tempfile::TempDir,
    layout: EngineLayout,
    package: PathBuf,
    report_path: PathBuf,
}

fn workspace() -> Workspace {
    let root = tempfile::TempDir::new().unwrap();
    let layout = EngineLayout::rooted_at(root.path());
    let package = root.path().join("left-pad-1.0.0.tgz");
    std::fs::write(&package, "tgz").unwrap();
    let report_path = root.path().join("report");
    Workspace {
        layout,
        package,
        report_path,
        _root: root,
    }
}

#[cfg(unix)]
fn install_engine(layout: &EngineLayout) {
    use std::os::unix::fs::PermissionsExt;
    std::fs::create_dir_all(&layout.install_dir).unwrap();
    std::fs::write(&layout.executable, "#!/bin/sh\n").unwrap();
    std::fs::set_permissions(&layout.executable, std::fs::Permissions::from_mode(0o755)).unwrap();
}

fn existing_store(root: &Path) -> PathBuf {
    let store = root.join("persistent-store");
    std::fs::create_dir_all(store.join(STORE_MARKER)).unwrap();
    store
}

#[tokio::test]
async fn test_e2e_ephemeral_store_scan_passes() {
    let ws = workspace();
    let engine = ScriptedEngine::new();
    let reporter = RecordingReporter::text();

    let mut request = ScanRequest::new(PackageSource::LocalFile(ws.package.clone()), &ws.report_path);
    request.purl = Some(PackageRef::parse("pkg:npm/left-pad@1.0.0").unwrap());

    let outcome = ScanOrchestrator::new(&engine, &reporter, &ws.layout)
        .run(&request)
        .await
        .unwrap();

    assert!(outcome.verdict.passed);
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(
        engine.subcommands(),
        vec!["install", "init", "vault", "scan", "--version", "report", "status"]
    );

    let scan = engine.find("scan");
    assert!(scan.has_arg("--purl=pkg:npm/left-pad@1.0.0"));
    assert!(scan.has_arg(&format!("--file-path={}", ws.package.display())));
    assert!(arg_value(&scan, "--vault-key=").is_some_and(|k| !k.is_empty()));

    let report = engine.find("report");
    assert_eq!(report.args[1], "all");

    assert!(ws.report_path.join("rl-json/report.rl.json").is_file());
    assert!(!ws.layout.store_dir.exists(), "ephemeral store is torn down");

    let events = reporter.events();
    assert!(events.contains(&"info:rl-secure 2.0.0".to_owned()));
    assert_eq!(events.last().unwrap(), "result:true:analysis: passed");
}

#[cfg(unix)]
#[tokio::test]
async fn test_reproducible_build_uses_checks_grammar() {
    let ws = workspace();
    install_engine(&ws.layout);
    let store = existing_store(ws._root.path());
    let engine = ScriptedEngine {
        checks_exit: 3,
        ..ScriptedEngine::new()
    };
    let reporter = RecordingReporter::text();

    let mut request = ScanRequest::new(PackageSource::LocalFile(ws.package.clone()), &ws.report_path);
    request.purl = Some(PackageRef::parse("pkg:npm/left-pad@1.0.0?build=repro").unwrap());
    request.existing_store = Some(store.clone());

    let outcome = ScanOrchestrator::new(&engine, &reporter, &ws.layout)
        .run(&request)
        .await
        .unwrap();

    assert!(!outcome.verdict.passed);
    assert_eq!(outcome.verdict.message, "reproducible build check: failed");
    assert_eq!(outcome.exit_code, 1);

    assert_eq!(
        engine.subcommands(),
        vec!["scan", "--version", "report", "checks"]
    );
    let checks = engine.find("checks");
    assert!(checks.has_arg("--purl=pkg:npm/left-pad@1.0.0"));
    assert!(checks.has_arg(&format!("--rl-store={}", store.display())));
    assert!(arg_value(&checks, "--vault-key=").is_none());
    assert!(store.exists(), "user store is never removed");
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_status_extracts_ci_text() {
    let ws = workspace();
    install_engine(&ws.layout);
    let engine = ScriptedEngine {
        status: (5, "Policy check\n[CI:TEXT] disallowed license found\n"),
        ..ScriptedEngine::new()
    };
    let reporter = RecordingReporter::text();
    let request = ScanRequest::new(PackageSource::LocalFile(ws.package.clone()), &ws.report_path);

    let outcome = ScanOrchestrator::new(&engine, &reporter, &ws.layout)
        .run(&request)
        .await
        .unwrap();

    assert_eq!(outcome.exit_code, 1);
    assert_eq!(outcome.verdict.message, "disallowed license found");
    let status = engine.find("status");
    assert!(status.has_arg("--purl=rl-scanner/left-pad-1.0.0.tgz@latest"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_teamcity_failure_exits_zero() {
    let ws = workspace();
    install_engine(&ws.layout);
    let engine = ScriptedEngine {
        status: (1, ""),
        ..ScriptedEngine::new()
    };
    let reporter = TeamCityReporter::new(Vec::new());
    let request = ScanRequest::new(PackageSource::LocalFile(ws.package.clone()), &ws.report_path);

    let outcome = ScanOrchestrator::new(&engine, &reporter, &ws.layout)
        .run(&request)
        .await
        .unwrap();

    assert!(!outcome.verdict.passed);
    assert_eq!(outcome.exit_code, 0);

    let output = String::from_utf8(reporter.into_inner()).unwrap();
    assert!(output.contains("##teamcity[buildProblem description='Scan result: analysis: failed... FAIL']"));
    assert!(output.contains("##teamcity[blockOpened name='Generating reports']"));
    assert!(output.contains("##teamcity[progressFinish 'Generating reports']"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_unrecoverable_status_is_an_error() {
    let ws = workspace();
    install_engine(&ws.layout);
    let engine = ScriptedEngine {
        status: (-9, ""),
        ..ScriptedEngine::new()
    };
    let reporter = RecordingReporter::text();
    let request = ScanRequest::new(PackageSource::LocalFile(ws.package.clone()), &ws.report_path);

    let err = ScanOrchestrator::new(&engine, &reporter, &ws.layout)
        .run(&request)
        .await
        .unwrap_err();

    assert!(matches!(err, RlScanError::UnrecoverableStatus(_)));
    assert!(!reporter.events().iter().any(|e| e.starts_with("result:")));
    assert!(!ws.layout.store_dir.exists());
}

#[tokio::test]
async fn test_passwords_without_vault_key_launch_nothing() {
    let ws = workspace();
    let store = existing_store(ws._root.path());
    let engine = ScriptedEngine::new();
    let reporter = RecordingReporter::text();

    let mut request = ScanRequest::new(PackageSource::LocalFile(ws.package.clone()), &ws.report_path);
    request.purl = Some(PackageRef::parse("pkg:npm/left-pad@1.0.0").unwrap());
    request.existing_store = Some(store);
    request.passwords = PackagePasswords::collect(
        |_| None,
        vec!["hunter2".to_owned()],
        Vec::new(),
        Vec::new(),
    );

    let err = ScanOrchestrator::new(&engine, &reporter, &ws.layout)
        .run(&request)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RlScanError::InvalidState(InvalidStateError::MissingVaultKey)
    ));
    assert!(engine.calls().is_empty());
    assert!(reporter.events().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_non_empty_store_location_never_runs_init() {
    let ws = workspace();
    install_engine(&ws.layout);
    std::fs::create_dir_all(&ws.layout.store_dir).unwrap();
    std::fs::write(ws.layout.store_dir.join("stale"), "x").unwrap();
    let engine = ScriptedEngine::new();
    let reporter = RecordingReporter::text();
    let request = ScanRequest::new(PackageSource::LocalFile(ws.package.clone()), &ws.report_path);

    let err = ScanOrchestrator::new(&engine, &reporter, &ws.layout)
        .run(&request)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RlScanError::InvalidState(InvalidStateError::NotEmpty { .. })
    ));
    assert!(engine.calls().is_empty());
    assert!(ws.layout.store_dir.join("stale").exists());
    assert_eq!(
        reporter.events(),
        vec!["start:Initializing rl-store", "end:Initializing rl-store"]
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_scan_failure_is_redacted_and_closes_block() {
    let ws = workspace();
    install_engine(&ws.layout);
    let store = existing_store(ws._root.path());
    let engine = ScriptedEngine {
        fail_subcommand: Some("scan"),
        ..ScriptedEngine::new()
    };
    let reporter = RecordingReporter::text();

    let mut request = ScanRequest::new(PackageSource::LocalFile(ws.package.clone()), &ws.report_path);
    request.purl = Some(PackageRef::parse("pkg:npm/left-pad@1.0.0").unwrap());
    request.existing_store = Some(store);
    request.vault_key = Some(SecretString::new("vault-secret"));
    request.passwords = PackagePasswords::collect(
        |_| None,
        vec!["hunter2".to_owned()],
        vec!["ZW5jb2RlZA==".to_owned()],
        Vec::new(),
    );

    let err = ScanOrchestrator::new(&engine, &reporter, &ws.layout)
        .run(&request)
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains(&format!("--vault-key={MASK}")));
    assert!(message.contains(&format!("--password={MASK}")));
    assert!(message.contains(&format!("--encoded-list={MASK}")));
    for secret in ["vault-secret", "hunter2", "ZW5jb2RlZA=="] {
        assert!(!message.contains(secret), "leaked {secret}");
    }

    let scan = engine.find("scan");
    assert!(scan.has_arg("--password=hunter2"));
    assert_eq!(engine.subcommands(), vec!["scan"]);
    let events = reporter.events();
    assert_eq!(
        events,
        vec![
            "start:Scanning pkg:npm/left-pad@1.0.0",
            "end:Scanning pkg:npm/left-pad@1.0.0"
        ]
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_diff_pack_and_sync_flags() {
    let ws = workspace();
    install_engine(&ws.layout);
    let store = existing_store(ws._root.path());
    let engine = ScriptedEngine::new();
    let reporter = RecordingReporter::text();

    let mut request = ScanRequest::new(
        PackageSource::url("https://example.com/left-pad-1.0.0.tgz", Default::default()).unwrap(),
        &ws.report_path,
    );
    request.purl = Some(PackageRef::parse("pkg:npm/left-pad@1.0.0").unwrap());
    request.existing_store = Some(store);
    request.replace = true;
    request.sync_with = Some("0.9.0".to_owned());
    request.diff_with = Some("0.9.0".to_owned());
    request.pack_safe = true;
    request.report_formats = ReportFormats::parse("rl-json,rl-summary-pdf,sarif").unwrap();

    ScanOrchestrator::new(&engine, &reporter, &ws.layout)
        .run(&request)
        .await
        .unwrap();

    let scan = engine.find("scan");
    assert!(scan.has_arg("--import=https://example.com/left-pad-1.0.0.tgz"));
    assert!(scan.has_arg("--replace"));
    assert!(scan.has_arg("--sync-with=0.9.0"));

    let report = engine.find("report");
    assert_eq!(report.args[1], "rl-json,rl-summary-pdf,sarif");
    assert!(report.has_arg("--diff-with=0.9.0"));

    let pack = engine.find("pack");
    assert!(pack.has_arg("--format=sarif"));

    assert_eq!(
        std::fs::read_to_string(ws.report_path.join("rl-html/index.html")).unwrap(),
        "diff"
    );
    assert!(ws.report_path.join("package.rl-safe").is_file());
}

#[cfg(unix)]
#[tokio::test]
async fn test_prune_runs_against_existing_store() {
    let ws = workspace();
    install_engine(&ws.layout);
    let store = existing_store(ws._root.path());
    let engine = ScriptedEngine::new();
    let reporter = RecordingReporter::text();

    let request = PruneRequest {
        purl: PackageRef::parse("pkg:npm/left-pad@1.0.0").unwrap(),
        store: store.clone(),
        vault_key: None,
        before_date: None,
        after_date: None,
        days_older: Some(7),
        hours_older: None,
    };

    let code = ScanOrchestrator::new(&engine, &reporter, &ws.layout)
        .prune(&request)
        .await
        .unwrap();

    assert_eq!(code, 0);
    let prune = engine.find("prune");
    assert_eq!(
        prune.args,
        vec![
            "prune".to_owned(),
            "--no-tracking".to_owned(),
            "--no-color".to_owned(),
            format!("--rl-store={}", store.display()),
            "--purl=pkg:npm/left-pad@1.0.0".to_owned(),
            "--days-older=7".to_owned(),
        ]
    );
    assert_eq!(reporter.events().last().unwrap(), "info:prune: completed");
}
