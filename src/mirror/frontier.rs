//! Crawl frontier: URL dedupe, filtering, and fetch scheduling
//!
//! The frontier is the single owner of everything the mirror knows about a
//! site. Its target map doubles as the visited set, so check-and-insert is
//! atomic by construction and no URL is ever fetched twice.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::path::PathBuf;

use url::Url;

use crate::config::Filters;
use crate::state::TargetState;
use crate::url::{file_extension, local_path, same_origin, visit_key};

// ===== Resource kinds =====

/// What a URL is expected to hold, inferred from its path
///
/// Drives scheduling priority: pages are fetched before stylesheets and
/// stylesheets before plain assets, so new references enter the frontier
/// as early as possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    /// HTML document, or an extensionless route assumed to serve one
    Page,
    /// Stylesheet, may reference further assets
    Stylesheet,
    /// Terminal content: images, scripts, fonts, media
    Asset,
}

impl ResourceKind {
    /// Guesses the kind from the last path segment's extension
    ///
    /// Extensionless paths and unrecognized extensions are assumed to be
    /// pages, matching how they are mapped to `index.html` files on disk.
    pub fn guess(url: &Url) -> Self {
        match file_extension(url).as_deref() {
            Some("html") | Some("htm") => ResourceKind::Page,
            Some("css") => ResourceKind::Stylesheet,
            Some(_) => ResourceKind::Asset,
            None => ResourceKind::Page,
        }
    }
}

// ===== Crawl targets =====

/// A URL the mirror knows about, with its mapped location and lifecycle
#[derive(Debug, Clone)]
pub struct CrawlTarget {
    pub url: Url,
    /// Host (and explicit port) the URL belongs to
    pub origin_host: String,
    /// Where the content is stored, relative to the mirror root
    pub local_path: PathBuf,
    pub kind: ResourceKind,
    pub state: TargetState,
}

impl CrawlTarget {
    fn new(url: Url) -> Self {
        let origin_host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host.to_lowercase(), port),
            (Some(host), None) => host.to_lowercase(),
            (None, _) => String::new(),
        };
        Self {
            origin_host,
            local_path: local_path(&url),
            kind: ResourceKind::guess(&url),
            state: TargetState::Discovered,
            url,
        }
    }
}

/// Outcome of offering a URL to the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discovery {
    /// New in-scope URL, queued for fetching
    Queued,
    /// New URL, but the origin boundary or a filter excludes it
    FilteredOut,
    /// Seen before, nothing to do
    AlreadyKnown,
}

// ===== Scheduling queue =====

/// Heap entry: lower kind first, then discovery order
#[derive(Debug, Clone, PartialEq, Eq)]
struct QueuedTarget {
    kind: ResourceKind,
    seq: u64,
    key: String,
}

impl Ord for QueuedTarget {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse both fields so pages pop before
        // stylesheets and assets, oldest first within a kind
        other
            .kind
            .cmp(&self.kind)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedTarget {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Totals across every target the frontier has seen
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrontierCounts {
    pub fetched: usize,
    pub failed: usize,
    pub filtered: usize,
    pub pending: usize,
}

// ===== Frontier =====

/// Single-owner scheduler for a mirror run
///
/// All mutation goes through the owning coordinator, so no locking is
/// needed. Targets are created on first reference and never removed, which
/// makes repeat discoveries no-ops for the life of the run.
#[derive(Debug)]
pub struct Frontier {
    origin: Url,
    filters: Filters,
    targets: HashMap<String, CrawlTarget>,
    queue: BinaryHeap<QueuedTarget>,
    next_seq: u64,
}

impl Frontier {
    /// Creates a frontier scoped to the seed's origin, with the seed queued
    pub fn new(seed: Url, filters: Filters) -> Self {
        let mut frontier = Self {
            origin: seed.clone(),
            filters,
            targets: HashMap::new(),
            queue: BinaryHeap::new(),
            next_seq: 0,
        };
        frontier.discover(&seed);
        frontier
    }

    /// Offers a URL to the frontier
    ///
    /// New in-scope URLs are queued. Foreign hosts and filter matches are
    /// recorded as filtered so later references to them are cheap no-ops.
    pub fn discover(&mut self, url: &Url) -> Discovery {
        let key = visit_key(url);
        if self.targets.contains_key(&key) {
            return Discovery::AlreadyKnown;
        }

        let mut target = CrawlTarget::new(url.clone());
        if !same_origin(url, &self.origin)
            || self.filters.rejects(url)
            || self.filters.excludes(url)
        {
            target.state = TargetState::FilteredOut;
            self.targets.insert(key, target);
            return Discovery::FilteredOut;
        }

        target.state = TargetState::Queued;
        self.queue.push(QueuedTarget {
            kind: target.kind,
            seq: self.next_seq,
            key: key.clone(),
        });
        self.next_seq += 1;
        self.targets.insert(key, target);
        Discovery::Queued
    }

    /// Claims the highest-priority queued target, marking it in flight
    ///
    /// Each target is claimed at most once; returns None when the queue is
    /// empty.
    pub fn claim_next(&mut self) -> Option<CrawlTarget> {
        while let Some(entry) = self.queue.pop() {
            let Some(target) = self.targets.get_mut(&entry.key) else {
                continue;
            };
            if target.state != TargetState::Queued {
                continue;
            }
            target.state = TargetState::Fetching;
            return Some(target.clone());
        }
        None
    }

    /// Records the fetch outcome for an in-flight target
    pub fn record_outcome(&mut self, url: &Url, success: bool) {
        let key = visit_key(url);
        if let Some(target) = self.targets.get_mut(&key) {
            let next = if success {
                TargetState::Fetched
            } else {
                TargetState::Failed
            };
            debug_assert!(target.state.can_transition_to(next));
            target.state = next;
        }
    }

    /// Claims a URL whose content arrived outside the fetch pipeline
    ///
    /// Rendered pages hand their sub-resources over as ready bytes; those
    /// URLs are settled directly so they are never requested again. Returns
    /// false when the URL is already in flight or settled.
    pub fn record_captured(&mut self, url: &Url) -> bool {
        let key = visit_key(url);
        match self.targets.get_mut(&key) {
            Some(target) => match target.state {
                TargetState::Discovered | TargetState::Queued => {
                    target.state = TargetState::Fetched;
                    true
                }
                _ => false,
            },
            None => {
                let mut target = CrawlTarget::new(url.clone());
                target.state = TargetState::Fetched;
                self.targets.insert(key, target);
                true
            }
        }
    }

    /// True while queued work remains
    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Per-state tally of everything the frontier has seen
    pub fn counts(&self) -> FrontierCounts {
        let mut counts = FrontierCounts::default();
        for target in self.targets.values() {
            match target.state {
                TargetState::Fetched => counts.fetched += 1,
                TargetState::Failed => counts.failed += 1,
                TargetState::FilteredOut => counts.filtered += 1,
                _ => counts.pending += 1,
            }
        }
        counts
    }
}
