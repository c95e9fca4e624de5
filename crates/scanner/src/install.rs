//! 엔진 설치 확인 및 설치

use rlscan_core::error::RlScanError;
use rlscan_core::secrets::InstallCredentials;
use tracing::info;

use crate::config::EngineLayout;
use crate::reporter::{ProgressBlock, StatusReporter};
use crate::runner::{CommandRunner, EngineCommand};

/// 엔진이 없을 때 설치 프로그램을 실행합니다.
pub struct Installer<'a, R> {
    runner: &'a R,
    layout: &'a EngineLayout,
    credentials: &'a InstallCredentials,
}

impl<'a, R: CommandRunner> Installer<'a, R> {
    pub fn new(runner: &'a R, layout: &'a EngineLayout, credentials: &'a InstallCredentials) -> Self {
        Self {
            runner,
            layout,
            credentials,
        }
    }

    /// 설치 명령
    ///
    /// 캐시 파일이 있으면 `--package-path`로 전달해 다운로드를 건너뜁니다.
    pub fn install_command(&self) -> EngineCommand {
        let mut cmd = EngineCommand::new(&self.layout.deploy_program)
            .arg("install")
            .arg(self.layout.install_dir.display().to_string())
            .arg("--no-tracking")
            .args(self.credentials.engine_args());
        if self.layout.cache_path.is_file() {
            cmd = cmd.arg(format!("--package-path={}", self.layout.cache_path.display()));
        }
        cmd
    }

    /// 이미 설치되어 있으면 아무 것도 하지 않습니다. 설치를 수행했으면 `true`.
    pub async fn ensure_installed(
        &self,
        reporter: &dyn StatusReporter,
    ) -> Result<bool, RlScanError> {
        if self.layout.is_installed() {
            return Ok(false);
        }

        let _block = ProgressBlock::open(reporter, "Installing rl-secure");
        info!(install_dir = %self.layout.install_dir.display(), "installing rl-secure");
        self.runner.run(&self.install_command()).await?;
        Ok(true)
    }
}
