use std::collections::HashSet;
use std::path::PathBuf;

use serde::Deserialize;
use url::Url;

/// Where user-facing output goes and how progress is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Terminal output with an in-place progress bar
    Interactive,

    /// Line-oriented output suitable for a log file (background mode)
    Logging,
}

/// URL filters applied at discovery time, immutable for the run
#[derive(Debug, Clone, Default)]
pub struct Filters {
    /// File extensions that are never downloaded (stored without the dot)
    pub reject_extensions: HashSet<String>,

    /// Path prefixes that are never entered (stored as "/prefix")
    pub exclude_prefixes: Vec<String>,
}

impl Filters {
    pub fn new(reject_extensions: HashSet<String>, exclude_prefixes: Vec<String>) -> Self {
        Self {
            reject_extensions,
            exclude_prefixes,
        }
    }

    /// Returns true if the URL's path ends in a rejected extension
    pub fn rejects(&self, url: &Url) -> bool {
        if self.reject_extensions.is_empty() {
            return false;
        }
        let path = url.path();
        let last = path.rsplit('/').next().unwrap_or("");
        match last.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => self
                .reject_extensions
                .contains(ext.to_ascii_lowercase().as_str()),
            _ => false,
        }
    }

    /// Returns true if the URL's path sits under an excluded prefix
    pub fn excludes(&self, url: &Url) -> bool {
        let path = url.path();
        self.exclude_prefixes.iter().any(|prefix| {
            path == prefix || path.starts_with(&format!("{}/", prefix.trim_end_matches('/')))
        })
    }
}

/// Options for a mirror run, owned by the coordinator
#[derive(Debug, Clone)]
pub struct MirrorOptions {
    /// The page the crawl starts from; its host defines the origin scope
    pub seed: Url,

    /// Root directory the mirrored tree is written under
    pub output_dir: PathBuf,

    /// Rewrite same-origin links to relative local paths after fetching
    pub convert_links: bool,

    /// Discovery-time URL filters
    pub filters: Filters,

    /// Number of concurrent fetch workers
    pub concurrency: usize,

    /// Bytes per second across each download, 0 for unlimited
    pub rate_limit: u64,

    /// Render pages through the external renderer before extraction
    pub dynamic: bool,

    /// User-Agent header for every request
    pub user_agent: String,
}

/// Options for the single-file and URL-list download modes
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Directory downloaded files land in
    pub output_dir: PathBuf,

    /// Explicit file name for single-file mode, overriding the URL-derived one
    pub output_file: Option<String>,

    /// Number of concurrent fetch workers (URL-list mode)
    pub concurrency: usize,

    /// Bytes per second across each download, 0 for unlimited
    pub rate_limit: u64,

    /// User-Agent header for every request
    pub user_agent: String,
}

/// Optional TOML defaults file, merged under the command-line flags
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub defaults: ProfileDefaults,

    #[serde(default)]
    pub filters: ProfileFilters,
}

/// Default values for common flags
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileDefaults {
    /// Default output directory
    #[serde(rename = "output-dir")]
    pub output_dir: Option<String>,

    /// Default worker count
    pub concurrency: Option<usize>,

    /// Default rate limit in the flag grammar (e.g. "200k")
    #[serde(rename = "rate-limit")]
    pub rate_limit: Option<String>,

    /// Default User-Agent header
    #[serde(rename = "user-agent")]
    pub user_agent: Option<String>,
}

/// Default filter lists
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileFilters {
    /// Extensions to reject, without the dot
    pub reject: Option<Vec<String>>,

    /// Path prefixes to exclude
    pub exclude: Option<Vec<String>>,
}
