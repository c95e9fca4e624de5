//! rl-store 준비 -- 기존 스토어 활성화 또는 새 스토어 초기화
//!
//! 스토어 경로와 볼트 키는 [`RunContext`]에 담겨 이후 모든 엔진 호출에 전달됩니다.
//! 전역 상태는 없습니다.
//!
//! # 상태 전이
//!
//! ```text
//! Uninitialized ──activate_existing(marker 있음)──▶ UseExisting
//!       │
//!       └──create_and_initialize──▶ Initializing ──▶ Ready
//! ```

use std::path::{Path, PathBuf};

use rlscan_core::error::{InvalidStateError, RlScanError};
use rlscan_core::types::SecretString;
use tracing::{debug, info, warn};

use crate::config::EngineLayout;
use crate::runner::CommandRunner;

/// 초기화된 스토어에 엔진이 남기는 하위 디렉토리
pub const STORE_MARKER: &str = ".rl-secure";

/// 한 번의 실행 동안 공유되는 스토어 정보
#[derive(Debug, Clone)]
pub struct RunContext {
    store_path: PathBuf,
    vault_key: Option<SecretString>,
    ephemeral: bool,
}

impl RunContext {
    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub fn vault_key(&self) -> Option<&SecretString> {
        self.vault_key.as_ref()
    }

    /// 이번 실행을 위해 만든 임시 스토어인지
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    /// 스토어를 사용하는 모든 엔진 명령에 붙는 인자
    ///
    /// `--rl-store`는 항상, `--vault-key`는 키가 있을 때만 포함됩니다.
    pub fn store_args(&self) -> Vec<String> {
        let mut args = vec![format!("--rl-store={}", self.store_path.display())];
        if let Some(key) = &self.vault_key {
            args.push(format!("--vault-key={}", key.expose()));
        }
        args
    }
}

/// 스토어 준비 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Uninitialized,
    Initializing,
    Ready,
    UseExisting,
}

/// 임시 스토어용 무작위 볼트 키
pub fn generate_vault_key() -> SecretString {
    SecretString::new(uuid::Uuid::new_v4().simple().to_string())
}

/// 스토어 활성화/초기화를 담당합니다.
pub struct StoreManager<'a, R> {
    runner: &'a R,
    layout: &'a EngineLayout,
    state: StoreState,
}

impl<'a, R: CommandRunner> StoreManager<'a, R> {
    pub fn new(runner: &'a R, layout: &'a EngineLayout) -> Self {
        Self {
            runner,
            layout,
            state: StoreState::Uninitialized,
        }
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    /// 사용자가 지정한 기존 스토어를 활성화합니다.
    ///
    /// 경로가 디렉토리가 아니면 실패합니다. 아직 초기화되지 않은 디렉토리는
    /// [`Self::create_and_initialize`] 경로를 그대로 따릅니다.
    pub async fn activate_existing(
        &mut self,
        path: &Path,
        vault_key: Option<SecretString>,
    ) -> Result<RunContext, RlScanError> {
        if !path.is_dir() {
            return Err(InvalidStateError::NotADirectory {
                path: path.display().to_string(),
            }
            .into());
        }

        if !path.join(STORE_MARKER).exists() {
            info!(store = %path.display(), "rl-store is not initialized, initializing");
            return self.create_and_initialize(path, None, vault_key, false).await;
        }

        debug!(store = %path.display(), "using existing rl-store");
        self.state = StoreState::UseExisting;
        Ok(RunContext {
            store_path: path.to_path_buf(),
            vault_key,
            ephemeral: false,
        })
    }

    /// 빈 디렉토리에 스토어를 초기화하고, 키가 있으면 볼트도 초기화합니다.
    ///
    /// 디렉토리가 비어 있지 않으면 어떤 엔진 명령도 실행하지 않고 실패합니다.
    pub async fn create_and_initialize(
        &mut self,
        path: &Path,
        level: Option<&str>,
        vault_key: Option<SecretString>,
        ephemeral: bool,
    ) -> Result<RunContext, RlScanError> {
        let created = !path.exists();
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| RlScanError::io(path, e))?;

        if !is_empty_dir(path).await? {
            return Err(InvalidStateError::NotEmpty {
                path: path.display().to_string(),
            }
            .into());
        }

        self.state = StoreState::Initializing;
        let context = RunContext {
            store_path: path.to_path_buf(),
            vault_key,
            ephemeral,
        };

        if let Err(e) = self.run_init(&context, level).await {
            if created {
                if let Err(cleanup) = tokio::fs::remove_dir_all(path).await {
                    warn!(store = %path.display(), error = %cleanup, "failed to remove partial rl-store");
                }
            }
            self.state = StoreState::Uninitialized;
            return Err(e);
        }

        info!(store = %path.display(), ephemeral, "rl-store initialized");
        self.state = StoreState::Ready;
        Ok(context)
    }

    async fn run_init(&self, context: &RunContext, level: Option<&str>) -> Result<(), RlScanError> {
        let mut init = self
            .layout
            .engine()
            .arg("init")
            .arg(format!("--rl-store={}", context.store_path.display()));
        if let Some(level) = level {
            init = init.arg(format!("--rl-level={level}"));
        }
        self.runner
            .run(&init.args(["--no-tracking", "--silent"]))
            .await?;

        if context.vault_key.is_some() {
            let vault = self
                .layout
                .engine()
                .args(["vault", "init"])
                .args(context.store_args())
                .args(["--no-tracking", "--silent"]);
            self.runner.run(&vault).await?;
        }
        Ok(())
    }
}

async fn is_empty_dir(path: &Path) -> Result<bool, RlScanError> {
    let mut entries = tokio::fs::read_dir(path)
        .await
        .map_err(|e| RlScanError::io(path, e))?;
    let first = entries
        .next_entry()
        .await
        .map_err(|e| RlScanError::io(path, e))?;
    Ok(first.is_none())
}
