//! Kagami: a website downloader and mirroring engine
//!
//! This crate downloads individual files and mirrors entire websites for
//! offline viewing, rewriting links so the local copy browses the way the
//! live site does.

pub mod config;
pub mod download;
pub mod mirror;
pub mod output;
pub mod render;
pub mod state;
pub mod url;

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for kagami operations
#[derive(Debug, Error)]
pub enum KagamiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error for {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("Server returned status {code} for {url}")]
    BadStatus { url: String, code: u16 },

    #[error("URL parse error: {0}")]
    InvalidUrl(#[from] ::url::ParseError),

    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Render failed for {url}: {message}")]
    Render { url: String, message: String },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid rate limit: {0}")]
    InvalidRateLimit(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Result type alias for kagami operations
pub type Result<T> = std::result::Result<T, KagamiError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{DownloadOptions, Filters, MirrorOptions, OutputMode};
pub use download::{FetchResult, FetchStatus};
pub use output::{DownloadSummary, Transcript};
pub use render::{PageRenderer, RenderedPage};
pub use state::TargetState;
pub use url::{local_path, same_origin, visit_key};
