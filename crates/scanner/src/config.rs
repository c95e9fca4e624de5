//! 엔진 파일 배치 설정
//!
//! [`EngineLayout`]은 core의 [`EngineConfig`]를 경로 타입으로 변환한 값입니다.
//! 모든 엔진 호출은 이 구조체에서 실행 파일 경로와 작업 디렉토리를 얻습니다.

use std::path::{Path, PathBuf};

use rlscan_core::config::EngineConfig;

use crate::runner::EngineCommand;

/// 엔진 설치/캐시/리포트/스토어 경로
#[derive(Debug, Clone)]
pub struct EngineLayout {
    /// 엔진 설치 프로그램
    pub deploy_program: String,
    /// 엔진 설치 디렉토리
    pub install_dir: PathBuf,
    /// 엔진 실행 파일
    pub executable: PathBuf,
    /// 설치 가속용 캐시 파일
    pub cache_path: PathBuf,
    /// 리포트 임시 디렉토리
    pub report_scratch_dir: PathBuf,
    /// 임시 스토어 디렉토리
    pub store_dir: PathBuf,
    /// 실행 후 임시 스토어 유지 여부
    pub keep_ephemeral_store: bool,
}

impl EngineLayout {
    /// core 설정에서 경로 배치를 만듭니다.
    pub fn from_core(core: &EngineConfig) -> Self {
        let install_dir = PathBuf::from(core.install_dir());
        Self {
            deploy_program: core.deploy_program.clone(),
            executable: install_dir.join(&core.executable_name),
            install_dir,
            cache_path: PathBuf::from(core.cache_path()),
            report_scratch_dir: PathBuf::from(core.report_scratch_dir()),
            store_dir: PathBuf::from(core.store_dir()),
            keep_ephemeral_store: core.keep_ephemeral_store,
        }
    }

    /// 모든 작업 경로를 `root` 아래에 둡니다.
    pub fn rooted_at(root: &Path) -> Self {
        let install_dir = root.join("__rlsecure");
        Self {
            deploy_program: "rl-deploy".to_owned(),
            executable: install_dir.join("rl-secure"),
            install_dir,
            cache_path: root.join("rl-secure.cache"),
            report_scratch_dir: root.join("__rlsecure-report"),
            store_dir: root.join("__rlstore"),
            keep_ephemeral_store: false,
        }
    }

    /// 엔진 실행 파일로 시작하는 명령
    pub fn engine(&self) -> EngineCommand {
        EngineCommand::new(self.executable.display().to_string())
    }

    /// 엔진 실행 파일이 존재하고 실행 가능한지 확인합니다.
    pub fn is_installed(&self) -> bool {
        is_executable(&self.executable)
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
