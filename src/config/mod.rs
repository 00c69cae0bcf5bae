//! Configuration module for kagami
//!
//! This module holds the runtime option structs, the flag-value parsers, and
//! the optional TOML profile that supplies defaults under the command line.
//!
//! # Example
//!
//! ```no_run
//! use kagami::config::{load_profile, parse_rate_limit};
//! use std::path::Path;
//!
//! let profile = load_profile(Path::new("kagami.toml")).unwrap();
//! let limit = parse_rate_limit("200k").unwrap();
//! assert_eq!(limit, 204_800);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    DownloadOptions, Filters, MirrorOptions, OutputMode, Profile, ProfileDefaults, ProfileFilters,
};

// Re-export parser functions
pub use parser::{load_profile, parse_exclude_list, parse_rate_limit, parse_reject_list, read_url_file};

// Re-export validation helpers
pub use validation::{validate_concurrency, validate_output_dir, validate_seed_url};
