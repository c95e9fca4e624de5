//! 리포트 생성, rl-safe 아카이브, 결과물 복사

use std::path::{Path, PathBuf};

use rlscan_core::error::RlScanError;
use rlscan_core::types::{PackageRef, ReportFormats};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::EngineLayout;
use crate::runner::CommandRunner;
use crate::store::RunContext;

/// diff 리포트 생성 시 엔진이 만드는 HTML 디렉토리 접두사
const DIFF_HTML_PREFIX: &str = "rl-html-diff-with-";
/// HTML 리포트의 표준 디렉토리 이름
const HTML_DIR: &str = "rl-html";

/// 리포트 임시 디렉토리를 비운 상태로 다시 만듭니다.
pub async fn prepare_scratch(dir: &Path) -> Result<(), RlScanError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => debug!(dir = %dir.display(), "removed previous report scratch"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(RlScanError::io(dir, e)),
    }
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| RlScanError::io(dir, e))
}

/// 임시 디렉토리의 diff HTML 디렉토리를 `rl-html`로 바꿉니다.
///
/// 여러 개면 이름순 첫 번째만 사용합니다. 바꿨으면 새 경로를 반환합니다.
pub async fn normalize_diff_html(scratch: &Path) -> Result<Option<PathBuf>, RlScanError> {
    let mut entries = tokio::fs::read_dir(scratch)
        .await
        .map_err(|e| RlScanError::io(scratch, e))?;
    let mut candidates = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| RlScanError::io(scratch, e))?
    {
        if entry.file_name().to_string_lossy().starts_with(DIFF_HTML_PREFIX) {
            candidates.push(entry.path());
        }
    }
    candidates.sort();

    let Some(source) = candidates.into_iter().next() else {
        return Ok(None);
    };

    let target = scratch.join(HTML_DIR);
    if target.exists() {
        tokio::fs::remove_dir_all(&target)
            .await
            .map_err(|e| RlScanError::io(&target, e))?;
    }
    tokio::fs::rename(&source, &target)
        .await
        .map_err(|e| RlScanError::io(&source, e))?;
    debug!(from = %source.display(), "renamed diff html report");
    Ok(Some(target))
}

/// `src` 트리 전체를 `dst` 아래로 복사합니다. 같은 이름의 파일은 덮어씁니다.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<u64, RlScanError> {
    std::fs::create_dir_all(dst).map_err(|e| RlScanError::io(dst, e))?;
    let mut copied = 0;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            RlScanError::io(path, e.into())
        })?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| RlScanError::io(entry.path(), std::io::Error::other(e)))?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| RlScanError::io(&target, e))?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(|e| RlScanError::io(&target, e))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// report/pack 단계 실행기
pub struct ReportStage<'a, R> {
    runner: &'a R,
    layout: &'a EngineLayout,
}

impl<'a, R: CommandRunner> ReportStage<'a, R> {
    pub fn new(runner: &'a R, layout: &'a EngineLayout) -> Self {
        Self { runner, layout }
    }

    /// 요청된 형식의 리포트를 임시 디렉토리에 생성합니다.
    pub async fn generate(
        &self,
        context: &RunContext,
        purl: &PackageRef,
        formats: &ReportFormats,
        diff_with: Option<&str>,
    ) -> Result<(), RlScanError> {
        let scratch = &self.layout.report_scratch_dir;
        prepare_scratch(scratch).await?;

        let mut cmd = self
            .layout
            .engine()
            .arg("report")
            .arg(formats.selector())
            .arg("--no-tracking")
            .args(context.store_args())
            .arg(format!("--purl={purl}"))
            .arg(format!("--output-path={}", scratch.display()));
        if let Some(version) = diff_with {
            cmd = cmd.arg(format!("--diff-with={version}"));
        }
        self.runner.run(&cmd).await?;

        if diff_with.is_some() {
            normalize_diff_html(scratch).await?;
        }
        info!(formats = %formats.selector(), "reports generated");
        Ok(())
    }

    /// rl-safe 아카이브를 임시 디렉토리에 생성합니다.
    ///
    /// pack이 지원하지 않는 형식은 버리며, 남는 형식이 없으면 `--format`을 생략합니다.
    pub async fn pack(
        &self,
        context: &RunContext,
        purl: &PackageRef,
        formats: &ReportFormats,
    ) -> Result<(), RlScanError> {
        let mut cmd = self
            .layout
            .engine()
            .args(["pack", "--no-tracking"])
            .args(context.store_args())
            .arg(format!("--purl={purl}"))
            .arg(format!(
                "--output-path={}",
                self.layout.report_scratch_dir.display()
            ));
        match formats.pack_subset() {
            Some(subset) => cmd = cmd.arg(format!("--format={}", subset.selector())),
            None => warn!(
                requested = %formats.selector(),
                "no requested format is supported by pack, using engine default"
            ),
        }
        self.runner.run(&cmd).await?;
        info!("rl-safe archive created");
        Ok(())
    }

    /// 임시 디렉토리의 결과물을 사용자 리포트 경로로 복사합니다.
    ///
    /// 디렉토리 순회와 복사는 블로킹 I/O이므로 blocking 스레드에서 실행합니다.
    pub async fn copy_out(&self, report_path: &Path) -> Result<u64, RlScanError> {
        let src = self.layout.report_scratch_dir.clone();
        let dst = report_path.to_path_buf();
        let copied = tokio::task::spawn_blocking(move || copy_tree(&src, &dst))
            .await
            .map_err(|e| {
                let reason = format!("spawn_blocking failed: {e}");
                RlScanError::io(report_path, std::io::Error::other(reason))
            })??;
        info!(files = copied, report_path = %report_path.display(), "reports copied");
        Ok(copied)
    }
}
