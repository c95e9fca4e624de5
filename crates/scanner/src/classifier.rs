//! 스캔 결과 분류
//!
//! 두 가지 종료 코드 문법이 있습니다.
//!
//! | 문법 | 명령 | 통과 | 실패 | 분류 불가 |
//! |------|------|------|------|-----------|
//! | 일반 | `status --return-status` | 0 | 양수 | 음수 |
//! | 재현 빌드 | `checks --return-status` | 3이 아닌 0 이상 | 3 | 음수 |
//!
//! 일반 문법의 실패 메시지는 status 출력의 `[CI:TEXT]` 줄에서 가져옵니다.

use std::sync::LazyLock;

use regex::Regex;
use rlscan_core::error::{RlScanError, UnrecoverableStatusError};
use rlscan_core::types::PackageRef;
use tracing::{debug, info};

use crate::config::EngineLayout;
use crate::runner::CommandRunner;
use crate::store::RunContext;

/// `[CI:TEXT] <message>` 줄
static CI_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*\[CI:TEXT\][ \t]*(.*?)[ \t\r]*$").expect("CI:TEXT pattern is valid")
});

const ANALYSIS_PASSED: &str = "analysis: passed";
const ANALYSIS_FAILED: &str = "analysis: failed";
const REPRO_PASSED: &str = "reproducible build check: passed";
const REPRO_FAILED: &str = "reproducible build check: failed";

/// `checks`가 재현 빌드 불일치를 알리는 종료 코드
const REPRO_MISMATCH_EXIT: i32 = 3;

/// 최종 판정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanVerdict {
    pub passed: bool,
    pub message: String,
}

impl ScanVerdict {
    fn pass(message: &str) -> Self {
        Self {
            passed: true,
            message: message.to_owned(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
        }
    }
}

/// status 출력에서 첫 번째 `[CI:TEXT]` 메시지를 찾습니다.
pub fn ci_text(output: &str) -> Option<&str> {
    CI_TEXT
        .captures_iter(output)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .find(|m| !m.is_empty())
}

/// 일반 문법. 음수 종료 코드는 `None`.
pub fn classify_status(exit_code: i32, output: &str) -> Option<ScanVerdict> {
    match exit_code {
        0 => Some(ScanVerdict::pass(ANALYSIS_PASSED)),
        code if code > 0 => Some(ScanVerdict::fail(
            ci_text(output).unwrap_or(ANALYSIS_FAILED),
        )),
        _ => None,
    }
}

/// 재현 빌드 문법. 음수 종료 코드는 `None`.
pub fn classify_checks(exit_code: i32) -> Option<ScanVerdict> {
    match exit_code {
        REPRO_MISMATCH_EXIT => Some(ScanVerdict::fail(REPRO_FAILED)),
        code if code >= 0 => Some(ScanVerdict::pass(REPRO_PASSED)),
        _ => None,
    }
}

/// 엔진 상태 조회를 실행하고 판정을 만듭니다.
pub struct ResultClassifier<'a, R> {
    runner: &'a R,
    layout: &'a EngineLayout,
}

impl<'a, R: CommandRunner> ResultClassifier<'a, R> {
    pub fn new(runner: &'a R, layout: &'a EngineLayout) -> Self {
        Self { runner, layout }
    }

    /// 참조에 `build=repro`가 있으면 재현 빌드 문법, 아니면 일반 문법을 씁니다.
    pub async fn classify(
        &self,
        context: &RunContext,
        purl: &PackageRef,
    ) -> Result<ScanVerdict, RlScanError> {
        if purl.is_reproducible_build() {
            self.classify_reproducible(context, purl).await
        } else {
            self.classify_analysis(context, purl).await
        }
    }

    async fn classify_analysis(
        &self,
        context: &RunContext,
        purl: &PackageRef,
    ) -> Result<ScanVerdict, RlScanError> {
        let cmd = self
            .layout
            .engine()
            .args(["status", "--return-status", "--no-color"])
            .args(context.store_args())
            .arg(format!("--purl={purl}"))
            .lenient()
            .captured();
        let output = self.runner.run(&cmd).await?;
        debug!(exit_code = output.exit_code, "status finished");

        let verdict = classify_status(output.exit_code, &output.stdout).ok_or_else(|| {
            UnrecoverableStatusError {
                command: cmd.redacted(),
                exit_code: output.exit_code,
            }
        })?;
        info!(passed = verdict.passed, "analysis classified");
        Ok(verdict)
    }

    async fn classify_reproducible(
        &self,
        context: &RunContext,
        purl: &PackageRef,
    ) -> Result<ScanVerdict, RlScanError> {
        let base = purl.without_build_param();
        let cmd = self
            .layout
            .engine()
            .args(["checks", "--return-status", "--no-color"])
            .args(context.store_args())
            .arg(format!("--purl={base}"))
            .lenient();
        let output = self.runner.run(&cmd).await?;
        debug!(exit_code = output.exit_code, "checks finished");

        let verdict =
            classify_checks(output.exit_code).ok_or_else(|| UnrecoverableStatusError {
                command: cmd.redacted(),
                exit_code: output.exit_code,
            })?;
        info!(passed = verdict.passed, "reproducible build classified");
        Ok(verdict)
    }
}
