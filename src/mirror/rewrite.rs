//! Link rewriting for offline browsing
//!
//! After a document is fetched, same-origin references are rewritten to
//! relative paths between the mapped local files, so the mirrored tree
//! browses without a web server. Foreign references and anything that does
//! not resolve are left untouched.

use std::path::Path;

use url::Url;

use crate::mirror::extract::{extract_css_urls, extract_html_refs, resolve_reference};
use crate::url::{local_path, same_origin};

/// Rewrites one raw reference found in `base_doc`
///
/// Returns the replacement string, or None when the reference must stay as
/// written (foreign host, unresolvable, or special scheme). Same-origin
/// references become the relative path from the directory of the document's
/// local file to the target's local file, with any fragment re-appended.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use kagami::mirror::rewrite_reference;
///
/// let doc = Url::parse("http://example.com/").unwrap();
///
/// let local = rewrite_reference("http://example.com/file.html", &doc);
/// assert_eq!(local.as_deref(), Some("file.html"));
///
/// // Foreign hosts keep their absolute URL
/// assert_eq!(rewrite_reference("https://other.net/page", &doc), None);
/// ```
pub fn rewrite_reference(raw: &str, base_doc: &Url) -> Option<String> {
    let resolved = resolve_reference(raw, base_doc)?;
    if !same_origin(&resolved, base_doc) {
        return None;
    }

    let target_local = local_path(&resolved);
    let base_local = local_path(base_doc);
    let base_dir = base_local.parent().unwrap_or_else(|| Path::new(""));

    let relative = pathdiff::diff_paths(&target_local, base_dir)?;
    let mut link = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    if let Some(fragment) = resolved.fragment() {
        link.push('#');
        link.push_str(fragment);
    }

    Some(link)
}

/// Rewrites every localizable reference in an HTML document
pub fn rewrite_html_document(html: &str, base_doc: &Url) -> String {
    apply_rewrites(html, extract_html_refs(html), base_doc)
}

/// Rewrites every localizable `url(...)` reference in a CSS document
pub fn rewrite_css_document(css: &str, base_doc: &Url) -> String {
    apply_rewrites(css, extract_css_urls(css), base_doc)
}

fn apply_rewrites(body: &str, refs: Vec<String>, base_doc: &Url) -> String {
    let mut result = body.to_string();
    for raw in refs {
        if let Some(replacement) = rewrite_reference(&raw, base_doc) {
            result = replace_reference(&result, &raw, &replacement);
        }
    }
    result
}

/// Replaces a reference everywhere it appears in its quoting context
///
/// Only delimited occurrences are touched ("raw", 'raw', (raw)), so a
/// reference that happens to appear in page text stays as written.
fn replace_reference(body: &str, raw: &str, replacement: &str) -> String {
    let mut result = body.to_string();
    for (open, close) in [('"', '"'), ('\'', '\''), ('(', ')')] {
        let from = format!("{}{}{}", open, raw, close);
        let to = format!("{}{}{}", open, replacement, close);
        result = result.replace(&from, &to);
    }
    result
}
