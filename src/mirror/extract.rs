//! Resource extraction from fetched documents
//!
//! This module pulls raw references out of HTML and CSS so the coordinator
//! can discover children and the rewriter can localize links:
//! - `<a href>`, `<link href>`, `<script src>`, `<img src>`, `<source src>`
//! - `url(...)` occurrences in stylesheets, `<style>` blocks, and `style`
//!   attributes
//!
//! References come back exactly as written in the document, in first-seen
//! order with duplicates removed. Malformed markup never aborts extraction.

use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

/// Extracts every raw reference from an HTML document
///
/// # Arguments
///
/// * `html` - The HTML content to scan
///
/// # Returns
///
/// Raw reference strings as written in the markup, deduplicated, in
/// document order
pub fn extract_html_refs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut refs = Vec::new();
    let mut seen = HashSet::new();

    let selector = match Selector::parse(
        "a[href], link[href], script[src], img[src], source[src], style, [style]",
    ) {
        Ok(selector) => selector,
        Err(_) => return refs,
    };

    for element in document.select(&selector) {
        match element.value().name() {
            "a" | "link" => {
                if let Some(href) = element.value().attr("href") {
                    push_unique(&mut refs, &mut seen, href);
                }
            }
            "script" | "img" | "source" => {
                if let Some(src) = element.value().attr("src") {
                    push_unique(&mut refs, &mut seen, src);
                }
            }
            "style" => {
                let css: String = element.text().collect();
                for url in extract_css_urls(&css) {
                    push_unique(&mut refs, &mut seen, &url);
                }
            }
            _ => {}
        }

        if let Some(inline) = element.value().attr("style") {
            for url in extract_css_urls(inline) {
                push_unique(&mut refs, &mut seen, &url);
            }
        }
    }

    refs
}

/// Extracts every `url(...)` reference from CSS text
///
/// Quotes inside the parentheses are optional; `data:` URIs are skipped.
pub fn extract_css_urls(css: &str) -> Vec<String> {
    let mut urls = Vec::new();
    let mut seen = HashSet::new();

    let mut cursor = 0;
    while let Some(found) = css[cursor..].find("url(") {
        let start = cursor + found + 4;
        let Some(close) = css[start..].find(')') else {
            break;
        };
        let end = start + close;

        let raw = css[start..end]
            .trim()
            .trim_matches('"')
            .trim_matches('\'')
            .trim();
        if !raw.is_empty() && !raw.starts_with("data:") && seen.insert(raw.to_string()) {
            urls.push(raw.to_string());
        }

        cursor = end + 1;
    }

    urls
}

/// Resolves a raw reference against the document URL
///
/// Returns None if the reference should not become a crawl target:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only anchors
/// - references that fail to resolve
/// - non-HTTP(S) URLs after resolution
pub fn resolve_reference(raw: &str, base: &Url) -> Option<Url> {
    let raw = raw.trim();

    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }

    if raw.starts_with("javascript:")
        || raw.starts_with("mailto:")
        || raw.starts_with("tel:")
        || raw.starts_with("data:")
    {
        return None;
    }

    match base.join(raw) {
        Ok(resolved) if resolved.scheme() == "http" || resolved.scheme() == "https" => {
            Some(resolved)
        }
        _ => None,
    }
}

fn push_unique(refs: &mut Vec<String>, seen: &mut HashSet<String>, raw: &str) {
    let raw = raw.trim();
    if raw.is_empty() {
        return;
    }
    if seen.insert(raw.to_string()) {
        refs.push(raw.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("http://example.com/page").unwrap()
    }

    #[test]
    fn test_extract_anchor_href() {
        let html = r#"<html><body><a href="/other">Link</a></body></html>"#;
        assert_eq!(extract_html_refs(html), vec!["/other"]);
    }

    #[test]
    fn test_extract_stylesheet_and_script() {
        let html = r#"
            <html>
            <head>
                <link rel="stylesheet" href="/css/main.css">
                <script src="/js/app.js"></script>
            </head>
            <body></body>
            </html>
        "#;
        assert_eq!(extract_html_refs(html), vec!["/css/main.css", "/js/app.js"]);
    }

    #[test]
    fn test_extract_img_and_source() {
        let html = r#"
            <body>
                <img src="/images/logo.png">
                <picture><source src="/images/hero.webp"></picture>
            </body>
        "#;
        assert_eq!(
            extract_html_refs(html),
            vec!["/images/logo.png", "/images/hero.webp"]
        );
    }

    #[test]
    fn test_extract_inline_style_block() {
        let html = r#"
            <head><style>body { background: url(/images/bg.png); }</style></head>
        "#;
        assert_eq!(extract_html_refs(html), vec!["/images/bg.png"]);
    }

    #[test]
    fn test_extract_style_attribute() {
        let html = r#"<div style="background-image: url('/images/tile.gif')"></div>"#;
        assert_eq!(extract_html_refs(html), vec!["/images/tile.gif"]);
    }

    #[test]
    fn test_document_order_and_dedup() {
        let html = r#"
            <body>
                <a href="/first">One</a>
                <img src="/second.png">
                <a href="/first">Again</a>
                <a href="/third">Three</a>
            </body>
        "#;
        assert_eq!(
            extract_html_refs(html),
            vec!["/first", "/second.png", "/third"]
        );
    }

    #[test]
    fn test_malformed_markup_still_extracts() {
        let html = r#"<body><a href="/ok">ok<div><img src="/img.png"</body>"#;
        let refs = extract_html_refs(html);
        assert!(refs.contains(&"/ok".to_string()));
    }

    #[test]
    fn test_extract_css_urls_in_order() {
        let css = r#"
            body { background: url("/images/bg.png"); }
            .hero { background-image: url('/images/hero.jpg'); }
        "#;
        assert_eq!(
            extract_css_urls(css),
            vec!["/images/bg.png", "/images/hero.jpg"]
        );
    }

    #[test]
    fn test_extract_css_urls_unquoted() {
        let css = "@font-face { src: url(/fonts/mono.woff2); }";
        assert_eq!(extract_css_urls(css), vec!["/fonts/mono.woff2"]);
    }

    #[test]
    fn test_extract_css_skips_data_uris() {
        let css = "body { background: url(data:image/png;base64,AAAA); }";
        assert!(extract_css_urls(css).is_empty());
    }

    #[test]
    fn test_extract_css_dedups() {
        let css = ".a { background: url(/t.png); } .b { background: url(/t.png); }";
        assert_eq!(extract_css_urls(css), vec!["/t.png"]);
    }

    #[test]
    fn test_resolve_relative_reference() {
        let resolved = resolve_reference("/other", &base_url()).unwrap();
        assert_eq!(resolved.as_str(), "http://example.com/other");
    }

    #[test]
    fn test_resolve_skips_special_schemes() {
        assert!(resolve_reference("javascript:void(0)", &base_url()).is_none());
        assert!(resolve_reference("mailto:a@example.com", &base_url()).is_none());
        assert!(resolve_reference("tel:+123", &base_url()).is_none());
        assert!(resolve_reference("data:text/plain,x", &base_url()).is_none());
    }

    #[test]
    fn test_resolve_skips_fragment_only() {
        assert!(resolve_reference("#section", &base_url()).is_none());
    }

    #[test]
    fn test_resolve_skips_non_http_result() {
        assert!(resolve_reference("ftp://example.com/file", &base_url()).is_none());
    }

    #[test]
    fn test_resolve_keeps_foreign_hosts() {
        let resolved = resolve_reference("https://cdn.example.org/lib.js", &base_url()).unwrap();
        assert_eq!(resolved.host_str(), Some("cdn.example.org"));
    }
}
