//! Plain text status messages.

use std::io::Write;

use super::{LineSink, StatusReporter};

/// Human-readable reporter. The verdict is turned into the process exit code.
pub struct TextReporter<W> {
    sink: LineSink<W>,
}

impl<W: Write> TextReporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            sink: LineSink::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.sink.into_inner()
    }
}

impl<W: Write + Send> StatusReporter for TextReporter<W> {
    fn block_start(&self, label: &str) {
        self.sink.line(&format!("Started: {label}"));
    }

    fn block_end(&self, label: &str) {
        self.sink.line(&format!("Finished: {label}"));
    }

    fn info(&self, message: &str) {
        self.sink.line(&format!("Info: {message}"));
    }

    fn scan_result(&self, passed: bool, message: &str) -> bool {
        if passed {
            self.sink.line("Scan result: PASS");
        } else {
            self.sink.line(&format!("Scan result: {message}... FAIL"));
        }
        true
    }

    fn fatal(&self, message: &str) {
        self.sink.line(&format!("Error: {message}"));
    }
}
