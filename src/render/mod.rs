//! Headless page rendering for dynamic sites
//!
//! Server-rendered pages mirror correctly from their raw HTML. Sites that
//! build their DOM in JavaScript do not, so mirror mode can route pages
//! through a renderer first. The engine depends only on the narrow
//! `PageRenderer` capability below; the stock implementation shells out to
//! an external renderer command, which keeps the crawl logic testable
//! without ever driving a real browser.

mod command;

pub use command::CommandRenderer;

use async_trait::async_trait;
use url::Url;

/// A sub-resource captured while a page rendered
#[derive(Debug, Clone)]
pub struct CapturedResource {
    /// Absolute URL the resource was served from
    pub url: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// The rendered form of one page
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// DOM serialized after scripts have run
    pub html: String,
    /// Resources the page loaded while rendering
    pub resources: Vec<CapturedResource>,
}

/// Capability interface for producing the post-JavaScript DOM of a page
///
/// Failures are per-URL: the mirror engine records them as fetch failures
/// for that page and carries on with the crawl.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &Url) -> crate::Result<RenderedPage>;
}
