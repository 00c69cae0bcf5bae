//! Output sinks for the run transcript
//!
//! Every component that prints user-facing lines receives a `Transcript`
//! instead of writing to process-wide stdout. Background mode swaps the
//! sink for a log file at startup; nothing downstream knows the
//! difference.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::config::OutputMode;

/// File name background mode writes the transcript to
pub const BACKGROUND_LOG: &str = "wget-log";

/// Where user-facing transcript lines go
///
/// Carries the output mode alongside the sink so progress rendering always
/// matches the destination: interactive on a terminal, line-oriented in a
/// log file. The two are never mixed within a run.
pub struct Transcript {
    out: Box<dyn Write + Send>,
    mode: OutputMode,
}

impl Transcript {
    /// Transcript on standard output, with interactive progress rendering
    pub fn stdout() -> Self {
        Self {
            out: Box::new(io::stdout()),
            mode: OutputMode::Interactive,
        }
    }

    /// Transcript written to a log file, with line-oriented progress
    ///
    /// The file at `path` is created, or truncated when it already exists.
    pub fn to_log_file(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            out: Box::new(file),
            mode: OutputMode::Logging,
        })
    }

    /// Transcript over an arbitrary sink
    pub fn with_writer(out: Box<dyn Write + Send>, mode: OutputMode) -> Self {
        Self { out, mode }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Writes one transcript line and flushes it through
    pub fn line(&mut self, text: &str) {
        let result = writeln!(self.out, "{}", text).and_then(|_| self.out.flush());
        if let Err(e) = result {
            tracing::debug!("transcript write failed: {}", e);
        }
    }

    /// Direct access to the sink, for progress rendering
    pub fn writer(&mut self) -> &mut (dyn Write + Send) {
        self.out.as_mut()
    }
}
