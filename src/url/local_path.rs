use std::path::PathBuf;

use sha2::{Digest, Sha256};
use url::Url;

/// Extensions treated as real files rather than page routes
const KNOWN_EXTENSIONS: &[&str] = &[
    "avif", "bmp", "css", "csv", "eot", "gif", "gz", "htm", "html", "ico", "jpeg", "jpg", "js",
    "json", "map", "md", "mjs", "mp3", "mp4", "ogg", "otf", "pdf", "png", "rar", "svg", "tar",
    "ttf", "txt", "wasm", "wav", "webm", "webp", "woff", "woff2", "xml", "zip", "7z",
];

/// Maps a URL to the relative local path its content is stored at
///
/// The first component is always the host (with any port folded in), so
/// mirrors of different sites never collide. Directory-like URLs and
/// extensionless routes map to an `index.html` inside a directory named
/// after the path; a query string is folded into the file name as a short
/// hash so distinct representations get distinct files. The mapping is
/// deterministic and ignores the scheme and fragment.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use url::Url;
/// use kagami::url::local_path;
///
/// let url = Url::parse("http://example.com/images/photo.jpg").unwrap();
/// assert_eq!(local_path(&url), PathBuf::from("example.com/images/photo.jpg"));
///
/// let url = Url::parse("http://example.com/about").unwrap();
/// assert_eq!(local_path(&url), PathBuf::from("example.com/about/index.html"));
///
/// let url = Url::parse("http://example.com/api/v1/users/123").unwrap();
/// assert_eq!(
///     local_path(&url),
///     PathBuf::from("example.com/pages/api/v1/users/123/index.html")
/// );
/// ```
pub fn local_path(url: &Url) -> PathBuf {
    let mut path = PathBuf::from(host_segment(url));

    let segments: Vec<String> = url
        .path_segments()
        .map(|segments| {
            segments
                .filter(|segment| !segment.is_empty())
                .map(sanitize)
                .collect()
        })
        .unwrap_or_default();

    let trailing_slash = url.path().ends_with('/');
    let query_suffix = url.query().map(query_hash);

    let (dirs, file) = if segments.is_empty() {
        (Vec::new(), index_name(&query_suffix))
    } else if trailing_slash {
        (segments, index_name(&query_suffix))
    } else {
        // Path ends in a real segment; decide file vs route by extension
        let last = segments[segments.len() - 1].clone();
        match known_extension(&last) {
            Some((stem, ext)) => {
                let file = match &query_suffix {
                    Some(hash) => format!("{}-{}.{}", stem, hash, ext),
                    None => last,
                };
                (segments[..segments.len() - 1].to_vec(), file)
            }
            None => {
                let dirs = if segments.len() == 1 {
                    segments
                } else {
                    let mut with_prefix = vec!["pages".to_string()];
                    with_prefix.extend(segments);
                    with_prefix
                };
                (dirs, index_name(&query_suffix))
            }
        }
    };

    for dir in dirs {
        path.push(dir);
    }
    path.push(file);
    path
}

/// Directory name for the URL's host, with any explicit port folded in
fn host_segment(url: &Url) -> String {
    let host = url
        .host_str()
        .map(|h| h.to_lowercase())
        .unwrap_or_else(|| "unknown-host".to_string());

    match url.port() {
        Some(port) => format!("{}_{}", sanitize(&host), port),
        None => sanitize(&host),
    }
}

/// Splits a segment into stem and extension when the extension is a known
/// file type
fn known_extension(segment: &str) -> Option<(&str, &str)> {
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    KNOWN_EXTENSIONS
        .contains(&ext.to_ascii_lowercase().as_str())
        .then_some((stem, ext))
}

/// Recognized extension of the URL's last path segment, lowercased
pub(crate) fn file_extension(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    known_extension(segment).map(|(_, ext)| ext.to_ascii_lowercase())
}

/// First 8 hex characters of the query's SHA-256, folded into file names
fn query_hash(query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    hex::encode(hasher.finalize())[..8].to_string()
}

fn index_name(query_suffix: &Option<String>) -> String {
    match query_suffix {
        Some(hash) => format!("index-{}.html", hash),
        None => "index.html".to_string(),
    }
}

/// Replaces characters that cannot appear in file names on common filesystems
fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '\\' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect()
}
