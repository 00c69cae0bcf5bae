//! Mirror coordinator - crawl orchestration for whole-site downloads
//!
//! This module contains the main mirror loop that coordinates all aspects
//! of a site download, including:
//! - Claiming targets from the frontier and dispatching them to workers
//! - Absorbing fetch outcomes and discovering newly referenced URLs
//! - Rewriting and re-persisting documents when link conversion is on
//! - Routing pages through the renderer in dynamic mode

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Client;
use url::Url;

use crate::config::MirrorOptions;
use crate::download::{
    build_http_client, fetch_to_file, FetchOutcome, FetchResult, RateLimiter, WorkerPool,
};
use crate::mirror::extract::{extract_css_urls, extract_html_refs, resolve_reference};
use crate::mirror::frontier::{CrawlTarget, Discovery, Frontier, ResourceKind};
use crate::mirror::rewrite::{rewrite_css_document, rewrite_html_document};
use crate::output::{DownloadSummary, Transcript};
use crate::render::{PageRenderer, RenderedPage};
use crate::url::{local_path, same_origin};
use crate::KagamiError;

/// One unit of work handed to the pool
struct FetchJob {
    target: CrawlTarget,
    /// Absolute destination under the output root
    dest: PathBuf,
}

/// What a worker produced for one job
enum WorkerYield {
    Fetched(FetchOutcome),
    Rendered(RenderedPage),
}

struct FetchDone {
    url: Url,
    local_path: PathBuf,
    dest: PathBuf,
    kind: ResourceKind,
    outcome: crate::Result<WorkerYield>,
}

/// Main mirror coordinator structure
///
/// The coordinator task exclusively owns the frontier; workers only fetch.
/// Outcomes come back over the pool's results channel, and every frontier
/// mutation happens here, so no URL is ever fetched twice.
pub struct Coordinator {
    options: MirrorOptions,
    client: Client,
    frontier: Frontier,
    renderer: Option<Arc<dyn PageRenderer>>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// The renderer is consulted for page targets only when the options
    /// enable dynamic mode; it is ignored otherwise.
    pub fn new(
        options: MirrorOptions,
        renderer: Option<Arc<dyn PageRenderer>>,
    ) -> crate::Result<Self> {
        let client = build_http_client(&options.user_agent)?;
        let frontier = Frontier::new(options.seed.clone(), options.filters.clone());
        let renderer = if options.dynamic { renderer } else { None };

        Ok(Self {
            options,
            client,
            frontier,
            renderer,
        })
    }

    /// Runs the mirror to completion and returns the outcome tally
    ///
    /// Keeps at most `concurrency` targets outstanding. Terminates when the
    /// frontier is empty and no fetch is in flight; per-URL failures are
    /// recorded and never abort the run.
    pub async fn run(&mut self, transcript: &mut Transcript) -> crate::Result<DownloadSummary> {
        transcript.line(&format!("Starting mirror of {}", self.options.seed));
        transcript.line(&format!(
            "Output directory: {}",
            self.options.output_dir.display()
        ));

        tokio::fs::create_dir_all(&self.options.output_dir)
            .await
            .map_err(|e| fs_error(&self.options.output_dir, e))?;

        let concurrency = self.options.concurrency.max(1);
        let rate_limit = self.options.rate_limit;
        let worker_client = self.client.clone();
        let worker_renderer = self.renderer.clone();

        let mut pool = WorkerPool::start(concurrency, move |job: FetchJob| {
            let client = worker_client.clone();
            let renderer = worker_renderer.clone();
            async move { execute_job(client, renderer, job, rate_limit).await }
        });

        let mut summary = DownloadSummary::new();
        let mut in_flight = 0usize;

        loop {
            while in_flight < concurrency {
                let Some(target) = self.frontier.claim_next() else {
                    break;
                };
                transcript.line(&format!("Downloading: {}", target.url));
                tracing::debug!(
                    host = %target.origin_host,
                    path = %target.url.path(),
                    "dispatching fetch"
                );

                let dest = self.options.output_dir.join(&target.local_path);
                if pool.jobs.send(FetchJob { target, dest }).await.is_err() {
                    tracing::error!("worker pool closed early");
                    break;
                }
                in_flight += 1;
            }

            if in_flight == 0 {
                break;
            }

            let Some(done) = pool.results.recv().await else {
                break;
            };
            in_flight -= 1;
            self.absorb(done, &mut summary, transcript).await;
        }

        drop(pool.jobs);
        while let Some(done) = pool.results.recv().await {
            self.absorb(done, &mut summary, transcript).await;
        }

        let counts = self.frontier.counts();
        tracing::info!(
            "Mirror finished: {} fetched, {} failed, {} filtered out",
            counts.fetched,
            counts.failed,
            counts.filtered
        );

        Ok(summary)
    }

    /// Folds one worker outcome back into the frontier and summary
    async fn absorb(
        &mut self,
        done: FetchDone,
        summary: &mut DownloadSummary,
        transcript: &mut Transcript,
    ) {
        let FetchDone {
            url,
            local_path,
            dest,
            kind,
            outcome,
        } = done;

        match outcome {
            Ok(WorkerYield::Fetched(FetchOutcome { bytes, body })) => {
                self.frontier.record_outcome(&url, true);
                summary.record(&FetchResult::success(url.as_str(), local_path, bytes));
                if let Some(body) = body {
                    self.process_document(&url, &dest, kind, &body).await;
                }
            }
            Ok(WorkerYield::Rendered(RenderedPage { html, resources })) => {
                match write_file(&dest, html.as_bytes()).await {
                    Ok(()) => {
                        self.frontier.record_outcome(&url, true);
                        summary.record(&FetchResult::success(
                            url.as_str(),
                            local_path,
                            html.len() as u64,
                        ));
                        self.absorb_captured(resources, summary, transcript).await;
                        self.process_document(&url, &dest, kind, &html).await;
                    }
                    Err(e) => {
                        self.frontier.record_outcome(&url, false);
                        transcript.line(&format!("Error downloading {}: {}", url, e));
                        summary.record(&FetchResult::failed(
                            url.as_str(),
                            local_path,
                            e.to_string(),
                        ));
                    }
                }
            }
            Err(e) => {
                self.frontier.record_outcome(&url, false);
                transcript.line(&format!("Error downloading {}: {}", url, e));
                summary.record(&FetchResult::failed(url.as_str(), local_path, e.to_string()));
            }
        }
    }

    /// Discovers references from a fetched document and rewrites it in
    /// place when link conversion is enabled
    async fn process_document(&mut self, url: &Url, dest: &Path, kind: ResourceKind, body: &str) {
        let refs = match kind {
            ResourceKind::Stylesheet => extract_css_urls(body),
            _ => extract_html_refs(body),
        };

        let mut queued = 0;
        for raw in &refs {
            if let Some(resolved) = resolve_reference(raw, url) {
                if self.frontier.discover(&resolved) == Discovery::Queued {
                    queued += 1;
                }
            }
        }
        tracing::debug!(
            "{}: {} references, {} newly queued",
            url,
            refs.len(),
            queued
        );

        if self.options.convert_links {
            let rewritten = match kind {
                ResourceKind::Stylesheet => rewrite_css_document(body, url),
                _ => rewrite_html_document(body, url),
            };
            if rewritten != body {
                if let Err(e) = write_file(dest, rewritten.as_bytes()).await {
                    tracing::warn!("failed to rewrite {}: {}", dest.display(), e);
                }
            }
        }
    }

    /// Persists sub-resources captured by the renderer
    ///
    /// Captured URLs honor the same origin boundary and filters as fetched
    /// ones; anything already settled in the frontier is skipped.
    async fn absorb_captured(
        &mut self,
        resources: Vec<crate::render::CapturedResource>,
        summary: &mut DownloadSummary,
        transcript: &mut Transcript,
    ) {
        for resource in resources {
            let Ok(url) = Url::parse(&resource.url) else {
                tracing::debug!("unparseable captured resource URL: {}", resource.url);
                continue;
            };
            if !same_origin(&url, &self.options.seed) {
                continue;
            }
            if self.options.filters.rejects(&url) || self.options.filters.excludes(&url) {
                continue;
            }
            if !self.frontier.record_captured(&url) {
                continue;
            }

            let relative = local_path(&url);
            let dest = self.options.output_dir.join(&relative);
            match write_file(&dest, &resource.bytes).await {
                Ok(()) => {
                    summary.record(&FetchResult::success(
                        url.as_str(),
                        relative,
                        resource.bytes.len() as u64,
                    ));
                }
                Err(e) => {
                    transcript.line(&format!("Error downloading {}: {}", url, e));
                    summary.record(&FetchResult::failed(url.as_str(), relative, e.to_string()));
                }
            }
        }
    }
}

async fn execute_job(
    client: Client,
    renderer: Option<Arc<dyn PageRenderer>>,
    job: FetchJob,
    rate_limit: u64,
) -> FetchDone {
    let outcome = match renderer {
        Some(renderer) if job.target.kind == ResourceKind::Page => renderer
            .render(&job.target.url)
            .await
            .map(WorkerYield::Rendered),
        _ => {
            let mut limiter = RateLimiter::from_limit(rate_limit);
            fetch_to_file(&client, &job.target.url, &job.dest, limiter.as_mut(), None)
                .await
                .map(WorkerYield::Fetched)
        }
    };

    FetchDone {
        url: job.target.url,
        local_path: job.target.local_path,
        dest: job.dest,
        kind: job.target.kind,
        outcome,
    }
}

async fn write_file(dest: &Path, bytes: &[u8]) -> crate::Result<()> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| fs_error(parent, e))?;
        }
    }
    tokio::fs::write(dest, bytes)
        .await
        .map_err(|e| fs_error(dest, e))
}

fn fs_error(path: &Path, source: std::io::Error) -> KagamiError {
    KagamiError::Filesystem {
        path: path.to_path_buf(),
        source,
    }
}

/// Mirrors a site to completion
///
/// This is the main entry point for mirror mode. It will:
/// 1. Scope the crawl to the seed's origin
/// 2. Fetch the seed and every same-origin resource it references,
///    recursively, through a bounded worker pool
/// 3. Rewrite links for offline browsing when enabled
/// 4. Return the per-URL outcome tally
///
/// # Arguments
///
/// * `options` - The mirror configuration
/// * `renderer` - Renderer consulted for pages in dynamic mode
/// * `transcript` - Sink for user-facing run output
///
/// # Example
///
/// ```no_run
/// use kagami::config::{Filters, MirrorOptions};
/// use kagami::mirror::mirror_site;
/// use kagami::output::Transcript;
/// use std::path::PathBuf;
/// use url::Url;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let options = MirrorOptions {
///     seed: Url::parse("http://example.com/")?,
///     output_dir: PathBuf::from("mirrors/example.com"),
///     convert_links: true,
///     filters: Filters::default(),
///     concurrency: 5,
///     rate_limit: 0,
///     dynamic: false,
///     user_agent: "kagami/1.0".to_string(),
/// };
/// let mut transcript = Transcript::stdout();
/// let summary = mirror_site(options, None, &mut transcript).await?;
/// println!("{} files downloaded", summary.succeeded());
/// # Ok(())
/// # }
/// ```
pub async fn mirror_site(
    options: MirrorOptions,
    renderer: Option<Arc<dyn PageRenderer>>,
    transcript: &mut Transcript,
) -> crate::Result<DownloadSummary> {
    let mut coordinator = Coordinator::new(options, renderer)?;
    coordinator.run(transcript).await
}
