//! Output module for user-facing reporting
//!
//! This module handles:
//! - The run transcript and where it goes (terminal or `wget-log`)
//! - The end-of-run download summary
//!
//! Diagnostic logging is separate and goes through `tracing`; the
//! transcript carries only the lines a wget user would expect to see.

mod sink;
mod summary;

pub use sink::{Transcript, BACKGROUND_LOG};
pub use summary::DownloadSummary;
