//! Download module for fetching resources to disk
//!
//! This module contains the transfer machinery shared by every mode:
//! - HTTP fetching with streaming bodies
//! - Byte-rate limiting in one-second quota windows
//! - Progress tracking and rendering
//! - A fixed-size worker pool for concurrent downloads

mod fetcher;
mod pool;
mod progress;
mod rate_limit;

pub use fetcher::{
    build_http_client, content_size, fetch_to_file, filename_for, FetchOutcome, FetchReport,
    FetchResult, FetchStatus,
};
pub use pool::{PoolHandle, WorkerPool};
pub use progress::{
    format_duration, format_size, Progress, ProgressRenderer, ProgressTracker, Snapshot,
};
pub use rate_limit::{Grant, RateLimiter, RateWindow};
