use url::Url;

use crate::config::parser::parse_rate_limit;
use crate::config::types::{Profile, ProfileDefaults, ProfileFilters};
use crate::ConfigError;

/// Validates an entire profile
pub fn validate_profile(profile: &Profile) -> Result<(), ConfigError> {
    validate_defaults(&profile.defaults)?;
    validate_filter_lists(&profile.filters)?;
    Ok(())
}

/// Validates profile defaults
fn validate_defaults(defaults: &ProfileDefaults) -> Result<(), ConfigError> {
    if let Some(concurrency) = defaults.concurrency {
        validate_concurrency(concurrency)?;
    }

    if let Some(rate_limit) = &defaults.rate_limit {
        // The grammar check is the validation; the parsed value is recomputed
        // at merge time.
        parse_rate_limit(rate_limit)?;
    }

    if let Some(output_dir) = &defaults.output_dir {
        validate_output_dir(output_dir)?;
    }

    if let Some(user_agent) = &defaults.user_agent {
        if user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user-agent cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates profile filter lists
fn validate_filter_lists(filters: &ProfileFilters) -> Result<(), ConfigError> {
    if let Some(reject) = &filters.reject {
        for entry in reject {
            validate_extension_entry(entry)?;
        }
    }

    if let Some(exclude) = &filters.exclude {
        for entry in exclude {
            if entry.trim().trim_matches('/').is_empty() {
                return Err(ConfigError::Validation(format!(
                    "exclude entry cannot be empty, got '{}'",
                    entry
                )));
            }
        }
    }

    Ok(())
}

/// Validates a worker count
pub fn validate_concurrency(concurrency: usize) -> Result<(), ConfigError> {
    if !(1..=100).contains(&concurrency) {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            concurrency
        )));
    }
    Ok(())
}

/// Validates an output directory setting
pub fn validate_output_dir(dir: &str) -> Result<(), ConfigError> {
    if dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Parses and validates a seed or download URL
///
/// Only http and https URLs with a host are accepted.
pub fn validate_seed_url(input: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(input)
        .map_err(|e| ConfigError::InvalidUrl(format!("'{}': {}", input, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "URL '{}' must use the http or https scheme",
            input
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "URL '{}' has no host",
            input
        )));
    }

    Ok(url)
}

/// Validates a reject-list extension entry
fn validate_extension_entry(entry: &str) -> Result<(), ConfigError> {
    let bare = entry.trim().trim_start_matches('.');

    if bare.is_empty() {
        return Err(ConfigError::Validation(format!(
            "reject entry cannot be empty, got '{}'",
            entry
        )));
    }

    if !bare.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::Validation(format!(
            "reject entry must be a bare extension like 'jpg', got '{}'",
            entry
        )));
    }

    Ok(())
}
