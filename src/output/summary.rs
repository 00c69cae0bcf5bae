//! End-of-run download summaries

use crate::download::{FetchResult, FetchStatus};
use crate::output::Transcript;

/// Tally of per-URL outcomes across one run
///
/// Skipped targets (filtered out before any request) are not counted as
/// attempts; the summary reports fetches only.
#[derive(Debug, Clone, Default)]
pub struct DownloadSummary {
    attempted: usize,
    succeeded: usize,
    failed: Vec<(String, String)>,
}

impl DownloadSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one fetch outcome into the tally
    pub fn record(&mut self, result: &FetchResult) {
        match result.status {
            FetchStatus::Success => {
                self.attempted += 1;
                self.succeeded += 1;
            }
            FetchStatus::Failed => {
                self.attempted += 1;
                let message = result
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string());
                self.failed.push((result.url.clone(), message));
            }
            FetchStatus::Skipped => {}
        }
    }

    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    /// Failed URLs with their error messages, in completion order
    pub fn failures(&self) -> &[(String, String)] {
        &self.failed
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    /// Returns the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }
        (self.succeeded as f64 / self.attempted as f64) * 100.0
    }

    /// Prints the final tally line
    pub fn print(&self, transcript: &mut Transcript) {
        transcript.line(&format!(
            "Download summary: {}/{} files downloaded successfully",
            self.succeeded, self.attempted
        ));
    }
}
