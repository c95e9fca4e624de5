//! rl-secure 스캔 오케스트레이션
//!
//! # Module Structure
//!
//! - [`runner`]: Subprocess seam (`CommandRunner`, `TokioCommandRunner`, secret redaction)
//! - [`reporter`]: Status reporters (`StatusReporter`, `TextReporter`, `TeamCityReporter`, `ProgressBlock`)
//! - [`config`]: Engine file layout (`EngineLayout`)
//! - [`install`]: Engine install check and install command (`Installer`)
//! - [`store`]: rl-store activation and initialization (`StoreManager`, `RunContext`)
//! - [`report`]: Report generation, rl-safe pack and copy-out (`ReportStage`)
//! - [`classifier`]: Pass/fail grammars (`ResultClassifier`, `ScanVerdict`)
//! - [`orchestrator`]: The full pipeline (`ScanOrchestrator`, `ScanRequest`, `PruneRequest`)
//!
//! # Architecture
//!
//! ```text
//! ScanRequest --> Installer --> StoreManager --> RunContext
//!                                                   |
//!                       scan --> report --> pack --> copy-out
//!                                                   |
//!                                           ResultClassifier
//!                                                   |
//!                                     StatusReporter::scan_result --> exit code
//! ```

pub mod classifier;
pub mod config;
pub mod install;
pub mod orchestrator;
pub mod report;
pub mod reporter;
pub mod runner;
pub mod store;

// --- Public API Re-exports ---

// Orchestrator
pub use orchestrator::{PruneRequest, ScanOrchestrator, ScanOutcome, ScanRequest};

// Layout
pub use config::EngineLayout;

// Subprocess
pub use runner::{CommandRunner, EngineCommand, ProcessOutput, TokioCommandRunner};

// Reporters
pub use reporter::{
    ProgressBlock, ReporterKind, StatusReporter, TeamCityReporter, TextReporter, stdout_reporter,
};

// Store
pub use store::{RunContext, StoreManager, StoreState};

// Classification
pub use classifier::{ResultClassifier, ScanVerdict};
