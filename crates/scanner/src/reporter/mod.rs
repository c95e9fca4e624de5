//! 상태 메시지 리포터 -- 진행 블록, 정보 메시지, 최종 스캔 결과 출력
//!
//! 두 구현이 같은 [`StatusReporter`] trait을 공유하며, 실행 시점에 `--message-reporter`
//! 값으로 선택됩니다.
//!
//! - [`TextReporter`]: 사람이 읽는 한 줄 메시지, 결과는 프로세스 종료 코드로 전달
//! - [`TeamCityReporter`]: `##teamcity[...]` 서비스 메시지, 결과는 CI 호스트가 메시지로 판단
//!
//! 진행 블록은 [`ProgressBlock`] 가드로 열고, 가드가 drop될 때(에러 경로 포함) 항상 닫힙니다.

use std::io::Write;
use std::str::FromStr;
use std::sync::Mutex;

use tracing::warn;

mod teamcity;
mod text;

pub use teamcity::{TeamCityReporter, escape, service_message, service_message_with};
pub use text::TextReporter;

/// 리포터 공통 인터페이스
pub trait StatusReporter: Send + Sync {
    /// 진행 블록 시작 신호
    fn block_start(&self, label: &str);

    /// 진행 블록 종료 신호
    fn block_end(&self, label: &str);

    /// 한 줄 정보 메시지
    fn info(&self, message: &str);

    /// 최종 결과를 출력하고, 호출자가 결과를 종료 코드로 변환해야 하는지 반환합니다.
    fn scan_result(&self, passed: bool, message: &str) -> bool;

    /// 실행을 중단시키는 에러를 출력합니다.
    fn fatal(&self, message: &str);
}

/// 블록 범위 진행 알림
///
/// 생성 시 `block_start`, drop 시 `block_end`를 호출합니다.
#[must_use = "the block closes as soon as the guard is dropped"]
pub struct ProgressBlock<'a> {
    reporter: &'a dyn StatusReporter,
    label: String,
}

impl<'a> ProgressBlock<'a> {
    pub fn open(reporter: &'a dyn StatusReporter, label: impl Into<String>) -> Self {
        let label = label.into();
        reporter.block_start(&label);
        Self { reporter, label }
    }
}

impl Drop for ProgressBlock<'_> {
    fn drop(&mut self) {
        self.reporter.block_end(&self.label);
    }
}

/// 리포터 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterKind {
    Text,
    TeamCity,
}

impl FromStr for ReporterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "teamcity" => Ok(Self::TeamCity),
            other => Err(format!(
                "unknown message reporter '{other}' (expected: text, teamcity)"
            )),
        }
    }
}

/// stdout에 쓰는 리포터를 생성합니다.
pub fn stdout_reporter(kind: ReporterKind) -> Box<dyn StatusReporter> {
    match kind {
        ReporterKind::Text => Box::new(TextReporter::new(std::io::stdout())),
        ReporterKind::TeamCity => Box::new(TeamCityReporter::new(std::io::stdout())),
    }
}

/// 줄 단위 출력 대상. 매 줄마다 flush합니다.
pub(crate) struct LineSink<W> {
    inner: Mutex<W>,
}

impl<W: Write> LineSink<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(writer),
        }
    }

    pub(crate) fn line(&self, line: &str) {
        let mut w = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writeln!(w, "{line}").and_then(|()| w.flush()) {
            warn!(error = %e, "failed to write status message");
        }
    }

    pub(crate) fn into_inner(self) -> W {
        self.inner.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}
