//! Output formatting for `config` commands, text vs JSON
//!
//! Scan commands never write here: their stdout belongs to the status reporter.

use std::io::Write;

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Human-readable rendering of a command payload.
pub trait Render {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()>;
}

/// Writes command payloads in the format selected by `--output`.
///
/// The payload is rendered into memory first, so a failed rendering never
/// leaves half a document on stdout.
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Renders to stdout.
    pub fn render<T: Render + Serialize>(&self, payload: &T) -> Result<(), CliError> {
        self.write_to(payload, &mut std::io::stdout().lock())
    }

    pub fn write_to<T, W>(&self, payload: &T, out: &mut W) -> Result<(), CliError>
    where
        T: Render + Serialize,
        W: Write,
    {
        let rendered = match self.format {
            OutputFormat::Text => {
                let mut buf = Vec::new();
                payload.render_text(&mut buf)?;
                buf
            }
            OutputFormat::Json => {
                let mut buf = serde_json::to_vec_pretty(payload)?;
                buf.push(b'\n');
                buf
            }
        };
        out.write_all(&rendered)?;
        out.flush()?;
        Ok(())
    }
}
