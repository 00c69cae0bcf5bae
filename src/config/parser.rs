use std::collections::HashSet;
use std::path::Path;

use crate::config::types::Profile;
use crate::config::validation::validate_profile;
use crate::ConfigError;

/// Loads and parses a profile file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML profile file
///
/// # Returns
///
/// * `Ok(Profile)` - Successfully loaded and validated profile
/// * `Err(ConfigError)` - Failed to load, parse, or validate the profile
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use kagami::config::load_profile;
///
/// let profile = load_profile(Path::new("kagami.toml")).unwrap();
/// println!("Default concurrency: {:?}", profile.defaults.concurrency);
/// ```
pub fn load_profile(path: &Path) -> Result<Profile, ConfigError> {
    // Read the profile file
    let content = std::fs::read_to_string(path)?;

    // Parse TOML
    let profile: Profile = toml::from_str(&content)?;

    // Validate the profile
    validate_profile(&profile)?;

    Ok(profile)
}

/// Parses a rate limit given as digits with an optional k or M suffix
///
/// The suffix multiplies by 1024 (`k`/`K`) or 1024*1024 (`m`/`M`). An empty
/// string means no limit and parses to 0; an explicit zero or any other
/// shape is an error.
///
/// # Example
///
/// ```
/// use kagami::config::parse_rate_limit;
///
/// assert_eq!(parse_rate_limit("100k").unwrap(), 102_400);
/// assert_eq!(parse_rate_limit("").unwrap(), 0);
/// assert!(parse_rate_limit("fast").is_err());
/// ```
pub fn parse_rate_limit(spec: &str) -> Result<u64, ConfigError> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Ok(0);
    }

    let (digits, multiplier) = match spec.strip_suffix(['k', 'K']) {
        Some(rest) => (rest, 1024u64),
        None => match spec.strip_suffix(['m', 'M']) {
            Some(rest) => (rest, 1024u64 * 1024),
            None => (spec, 1),
        },
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConfigError::InvalidRateLimit(format!(
            "expected digits with an optional k or M suffix, got '{}'",
            spec
        )));
    }

    let value: u64 = digits
        .parse()
        .map_err(|_| ConfigError::InvalidRateLimit(format!("value out of range: '{}'", spec)))?;

    let limit = value
        .checked_mul(multiplier)
        .ok_or_else(|| ConfigError::InvalidRateLimit(format!("value out of range: '{}'", spec)))?;

    if limit == 0 {
        return Err(ConfigError::InvalidRateLimit(format!(
            "rate limit must be positive, got '{}'",
            spec
        )));
    }

    Ok(limit)
}

/// Parses a comma-separated reject list into a set of extensions
///
/// Entries are trimmed, a leading dot is dropped, and matching is
/// case-insensitive, so "jpg, .GIF" rejects both photo.jpg and anim.gif.
pub fn parse_reject_list(list: &str) -> HashSet<String> {
    list.split(',')
        .map(|entry| entry.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Parses a comma-separated exclude list into rooted path prefixes
///
/// Entries are trimmed of surrounding slashes and stored as "/prefix".
pub fn parse_exclude_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|entry| entry.trim().trim_matches('/').to_string())
        .filter(|entry| !entry.is_empty())
        .map(|entry| format!("/{}", entry))
        .collect()
}

/// Reads a URL-list file: one URL per line, blank lines and # comments skipped
pub fn read_url_file(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
