//! URL handling module for kagami
//!
//! This module provides origin scoping, visited-set keys, and the mapping
//! from URLs to local file paths.

mod local_path;

use url::Url;

// Re-export main functions
pub use local_path::local_path;
pub(crate) use local_path::file_extension;

/// Returns true if two URLs belong to the same origin for mirroring
///
/// The host and any explicit port must match; the scheme does not
/// participate, so the http and https forms of a site mirror into the same
/// tree.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use kagami::url::same_origin;
///
/// let a = Url::parse("http://example.com/page").unwrap();
/// let b = Url::parse("https://example.com/other").unwrap();
/// let c = Url::parse("http://cdn.example.com/lib.js").unwrap();
///
/// assert!(same_origin(&a, &b));
/// assert!(!same_origin(&a, &c));
/// ```
pub fn same_origin(a: &Url, b: &Url) -> bool {
    let host_a = a.host_str().map(|h| h.to_lowercase());
    let host_b = b.host_str().map(|h| h.to_lowercase());
    host_a.is_some() && host_a == host_b && a.port() == b.port()
}

/// Canonical key identifying a resource in the visited set
///
/// Strips the scheme and fragment, keeping host, port, path, and query.
/// Two URLs that map to the same local file share a key, so a resource is
/// fetched at most once per run.
pub fn visit_key(url: &Url) -> String {
    let mut key = String::new();

    if let Some(host) = url.host_str() {
        key.push_str(&host.to_lowercase());
    }
    if let Some(port) = url.port() {
        key.push(':');
        key.push_str(&port.to_string());
    }
    key.push_str(url.path());
    if let Some(query) = url.query() {
        key.push('?');
        key.push_str(query);
    }

    key
}
