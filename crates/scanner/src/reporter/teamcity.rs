//! TeamCity service messages.
//!
//! Every message is one stdout line, either the single-value form
//! `##teamcity[name 'value']` or the attribute form
//! `##teamcity[name key='value' ...]`. Values are escaped with [`escape`].

use std::io::Write;

use super::{LineSink, StatusReporter};

/// Escapes a value for a service message.
///
/// `'` → `|'`, `|` → `||`, `\n` → `|n`, `\r` → `|r`, `[` → `|[`, `]` → `|]`.
/// Characters are mapped one at a time, so an inserted `|` is never escaped again.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '\'' => out.push_str("|'"),
            '|' => out.push_str("||"),
            '\n' => out.push_str("|n"),
            '\r' => out.push_str("|r"),
            '[' => out.push_str("|["),
            ']' => out.push_str("|]"),
            _ => out.push(c),
        }
    }
    out
}

/// Single-value form: `##teamcity[name 'value']`.
pub fn service_message(name: &str, value: &str) -> String {
    format!("##teamcity[{name} '{}']", escape(value))
}

/// Attribute form: `##teamcity[name k1='v1' k2='v2']`.
pub fn service_message_with(name: &str, attrs: &[(&str, &str)]) -> String {
    let body = attrs
        .iter()
        .map(|(k, v)| format!("{k}='{}'", escape(v)))
        .collect::<Vec<_>>()
        .join(" ");
    format!("##teamcity[{name} {body}]")
}

/// CI protocol reporter. The build status is carried by the messages, so the
/// verdict is never turned into an exit code.
pub struct TeamCityReporter<W> {
    sink: LineSink<W>,
}

impl<W: Write> TeamCityReporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            sink: LineSink::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.sink.into_inner()
    }

    fn build_problem(&self, description: &str) {
        self.sink.line(&service_message_with(
            "buildProblem",
            &[("description", description)],
        ));
    }

    fn build_status(&self, text: &str) {
        self.sink
            .line(&service_message_with("buildStatus", &[("text", text)]));
    }
}

impl<W: Write + Send> StatusReporter for TeamCityReporter<W> {
    fn block_start(&self, label: &str) {
        self.sink.line(&service_message("progressStart", label));
        self.sink
            .line(&service_message_with("blockOpened", &[("name", label)]));
    }

    fn block_end(&self, label: &str) {
        self.sink
            .line(&service_message_with("blockClosed", &[("name", label)]));
        self.sink.line(&service_message("progressFinish", label));
    }

    fn info(&self, message: &str) {
        self.sink
            .line(&service_message_with("message", &[("text", message)]));
    }

    fn scan_result(&self, passed: bool, message: &str) -> bool {
        if passed {
            self.build_status("Scan result: PASS");
        } else {
            self.build_problem(&format!("Scan result: {message}... FAIL"));
        }
        false
    }

    fn fatal(&self, message: &str) {
        self.build_problem(message);
    }
}
