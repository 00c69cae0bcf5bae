//! Mirror module for whole-site downloads
//!
//! This module contains the mirror engine, including:
//! - Reference extraction from HTML and CSS documents
//! - The crawl frontier with origin scoping and filters
//! - Link rewriting for offline browsing
//! - The coordinator that drives fetch workers to completion

mod coordinator;
mod extract;
mod frontier;
mod rewrite;

pub use coordinator::{mirror_site, Coordinator};
pub use extract::{extract_css_urls, extract_html_refs, resolve_reference};
pub use frontier::{CrawlTarget, Discovery, Frontier, FrontierCounts, ResourceKind};
pub use rewrite::{rewrite_css_document, rewrite_html_document, rewrite_reference};
