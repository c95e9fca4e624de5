//! 스캔 파이프라인
//!
//! 설치 확인 → 스토어 준비 → scan → report → pack(선택) → 복사 → 분류 → 결과 보고.
//! 각 단계는 이전 단계가 성공했을 때만 실행되며, 첫 실패에서 중단됩니다.
//! 비밀번호 사전 검사는 어떤 프로세스도 실행하기 전에 수행됩니다.

use std::path::PathBuf;

use rlscan_core::error::{InvalidStateError, RlScanError};
use rlscan_core::secrets::{InstallCredentials, PackagePasswords};
use rlscan_core::types::{PackageRef, PackageSource, ReportFormats, SecretString};
use tracing::{debug, info, warn};

use crate::classifier::{ResultClassifier, ScanVerdict};
use crate::config::EngineLayout;
use crate::install::Installer;
use crate::report::ReportStage;
use crate::reporter::{ProgressBlock, StatusReporter};
use crate::runner::CommandRunner;
use crate::store::{RunContext, StoreManager, generate_vault_key};

/// 검증이 끝난 스캔 요청
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub source: PackageSource,
    /// 없으면 소스 이름에서 유도합니다.
    pub purl: Option<PackageRef>,
    /// 재사용할 스토어. 없으면 임시 스토어를 만듭니다.
    pub existing_store: Option<PathBuf>,
    /// 기존 스토어용 볼트 키 (플래그 또는 환경변수)
    pub vault_key: Option<SecretString>,
    pub passwords: PackagePasswords,
    pub replace: bool,
    pub diff_with: Option<String>,
    pub sync_with: Option<String>,
    /// 임시 스토어 전용 분석 레벨
    pub rl_level: Option<String>,
    pub report_path: PathBuf,
    pub report_formats: ReportFormats,
    pub pack_safe: bool,
}

impl ScanRequest {
    /// 기본값으로 채운 요청
    pub fn new(source: PackageSource, report_path: impl Into<PathBuf>) -> Self {
        Self {
            source,
            purl: None,
            existing_store: None,
            vault_key: None,
            passwords: PackagePasswords::default(),
            replace: false,
            diff_with: None,
            sync_with: None,
            rl_level: None,
            report_path: report_path.into(),
            report_formats: ReportFormats::default(),
            pack_safe: false,
        }
    }

    /// 지정된 참조 또는 소스 이름에서 유도한 참조
    pub fn package_ref(&self) -> PackageRef {
        self.purl
            .clone()
            .unwrap_or_else(|| PackageRef::derived_from_source(&self.source.name()))
    }
}

/// 검증이 끝난 prune 요청
#[derive(Debug, Clone)]
pub struct PruneRequest {
    pub purl: PackageRef,
    pub store: PathBuf,
    pub vault_key: Option<SecretString>,
    pub before_date: Option<String>,
    pub after_date: Option<String>,
    pub days_older: Option<u32>,
    pub hours_older: Option<u32>,
}

impl PruneRequest {
    fn filter_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(date) = &self.before_date {
            args.push(format!("--before-date={date}"));
        }
        if let Some(date) = &self.after_date {
            args.push(format!("--after-date={date}"));
        }
        if let Some(days) = self.days_older {
            args.push(format!("--days-older={days}"));
        }
        if let Some(hours) = self.hours_older {
            args.push(format!("--hours-older={hours}"));
        }
        args
    }
}

/// 실행 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub verdict: ScanVerdict,
    /// 프로세스 종료 코드
    pub exit_code: i32,
}

/// 파이프라인 실행기
pub struct ScanOrchestrator<'a, R> {
    runner: &'a R,
    reporter: &'a dyn StatusReporter,
    layout: &'a EngineLayout,
    install_credentials: InstallCredentials,
}

impl<'a, R: CommandRunner> ScanOrchestrator<'a, R> {
    pub fn new(runner: &'a R, reporter: &'a dyn StatusReporter, layout: &'a EngineLayout) -> Self {
        Self {
            runner,
            reporter,
            layout,
            install_credentials: InstallCredentials::default(),
        }
    }

    /// 설치에 사용할 라이선스/프록시 자격 증명
    pub fn with_install_credentials(mut self, credentials: InstallCredentials) -> Self {
        self.install_credentials = credentials;
        self
    }

    /// 스캔 파이프라인 전체를 실행합니다.
    pub async fn run(&self, request: &ScanRequest) -> Result<ScanOutcome, RlScanError> {
        check_password_preflight(request)?;

        let purl = request.package_ref();
        info!(purl = %purl, source = %request.source.name(), "starting scan");

        self.ensure_installed().await?;

        let context = self.prepare_store(request).await?;
        let result = self.run_with_store(&context, &purl, request).await;
        self.teardown(&context).await;
        result
    }

    /// 기존 스토어에서 패키지 버전을 정리합니다.
    pub async fn prune(&self, request: &PruneRequest) -> Result<i32, RlScanError> {
        info!(purl = %request.purl, store = %request.store.display(), "starting prune");
        self.ensure_installed().await?;

        let mut store = StoreManager::new(self.runner, self.layout);
        let context = store
            .activate_existing(&request.store, request.vault_key.clone())
            .await?;

        {
            let _block = ProgressBlock::open(self.reporter, format!("Pruning {}", request.purl));
            let cmd = self
                .layout
                .engine()
                .args(["prune", "--no-tracking", "--no-color"])
                .args(context.store_args())
                .arg(format!("--purl={}", request.purl))
                .args(request.filter_args());
            self.runner.run(&cmd).await?;
        }

        self.reporter.info("prune: completed");
        Ok(0)
    }

    async fn ensure_installed(&self) -> Result<(), RlScanError> {
        Installer::new(self.runner, self.layout, &self.install_credentials)
            .ensure_installed(self.reporter)
            .await?;
        Ok(())
    }

    async fn prepare_store(&self, request: &ScanRequest) -> Result<RunContext, RlScanError> {
        let mut store = StoreManager::new(self.runner, self.layout);
        match &request.existing_store {
            Some(path) => {
                store
                    .activate_existing(path, request.vault_key.clone())
                    .await
            }
            None => {
                let _block = ProgressBlock::open(self.reporter, "Initializing rl-store");
                store
                    .create_and_initialize(
                        &self.layout.store_dir,
                        request.rl_level.as_deref(),
                        Some(generate_vault_key()),
                        true,
                    )
                    .await
            }
        }
    }

    async fn run_with_store(
        &self,
        context: &RunContext,
        purl: &PackageRef,
        request: &ScanRequest,
    ) -> Result<ScanOutcome, RlScanError> {
        self.scan(context, purl, request).await?;
        self.print_version().await?;

        let reports = ReportStage::new(self.runner, self.layout);
        {
            let _block = ProgressBlock::open(self.reporter, "Generating reports");
            reports
                .generate(
                    context,
                    purl,
                    &request.report_formats,
                    request.diff_with.as_deref(),
                )
                .await?;
        }

        if request.pack_safe {
            let _block = ProgressBlock::open(self.reporter, "Creating rl-safe archive");
            reports.pack(context, purl, &request.report_formats).await?;
        }

        reports.copy_out(&request.report_path).await?;

        let verdict = ResultClassifier::new(self.runner, self.layout)
            .classify(context, purl)
            .await?;

        let exit_code = if self.reporter.scan_result(verdict.passed, &verdict.message) {
            if verdict.passed { 0 } else { 1 }
        } else {
            0
        };
        info!(passed = verdict.passed, exit_code, "scan finished");
        Ok(ScanOutcome { verdict, exit_code })
    }

    async fn scan(
        &self,
        context: &RunContext,
        purl: &PackageRef,
        request: &ScanRequest,
    ) -> Result<(), RlScanError> {
        let _block = ProgressBlock::open(self.reporter, format!("Scanning {purl}"));

        let mut cmd = self
            .layout
            .engine()
            .args(["scan", "--no-tracking"])
            .args(context.store_args())
            .arg(format!("--purl={purl}"))
            .args(request.source.engine_args());
        if request.replace {
            cmd = cmd.arg("--replace");
        }
        if let Some(version) = &request.sync_with {
            cmd = cmd.arg(format!("--sync-with={version}"));
        }
        cmd = cmd.args(request.passwords.engine_args());

        self.runner.run(&cmd).await?;
        Ok(())
    }

    async fn print_version(&self) -> Result<(), RlScanError> {
        let cmd = self.layout.engine().arg("--version").lenient().captured();
        let output = self.runner.run(&cmd).await?;
        let version = output.stdout.trim();
        if !version.is_empty() {
            self.reporter.info(version);
        }
        Ok(())
    }

    async fn teardown(&self, context: &RunContext) {
        if !context.is_ephemeral() || self.layout.keep_ephemeral_store {
            return;
        }
        match tokio::fs::remove_dir_all(context.store_path()).await {
            Ok(()) => debug!(store = %context.store_path().display(), "ephemeral rl-store removed"),
            Err(e) => warn!(
                store = %context.store_path().display(),
                error = %e,
                "failed to remove ephemeral rl-store"
            ),
        }
    }
}

/// 비밀번호가 있으면 볼트 키가 있어야 합니다. 임시 스토어는 키를 새로 만듭니다.
pub fn check_password_preflight(request: &ScanRequest) -> Result<(), RlScanError> {
    let has_key = request.existing_store.is_none() || request.vault_key.is_some();
    if !request.passwords.is_empty() && !has_key {
        return Err(InvalidStateError::MissingVaultKey.into());
    }
    Ok(())
}
