/// Byte-rate limiting for downloads
///
/// A download asks the limiter for permission before transferring each chunk.
/// Quota is accounted in one-second windows; when a window is spent the
/// limiter sleeps until the window rolls over, so a transfer larger than the
/// limit completes in one-second slices instead of starving.
use std::time::{Duration, Instant};

/// Length of one quota window
const WINDOW: Duration = Duration::from_secs(1);

/// Outcome of asking a window for transfer quota
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// The caller may transfer this many bytes now (already accounted)
    Bytes(usize),

    /// The window is spent; ask again at the given instant
    ExhaustedUntil(Instant),
}

/// Per-second quota accounting for one transfer
///
/// The current time is always passed in by the caller, which keeps the
/// arithmetic deterministic under test.
#[derive(Debug)]
pub struct RateWindow {
    window_start: Instant,
    consumed: u64,
    limit: u64,
}

impl RateWindow {
    /// Creates a window with a positive bytes-per-second limit
    pub fn new(limit: u64, now: Instant) -> Self {
        debug_assert!(limit > 0);
        Self {
            window_start: now,
            consumed: 0,
            limit,
        }
    }

    /// Requests up to `want` bytes of quota from the current window
    ///
    /// Rolls the window over when a full second has elapsed since it opened.
    /// Granted bytes are deducted immediately; a grant is never larger than
    /// `want` or than the quota remaining in the window.
    pub fn grant(&mut self, now: Instant, want: usize) -> Grant {
        if now.duration_since(self.window_start) >= WINDOW {
            self.window_start = now;
            self.consumed = 0;
        }

        let remaining = self.limit - self.consumed;
        if remaining == 0 {
            return Grant::ExhaustedUntil(self.window_start + WINDOW);
        }

        let granted = remaining.min(want as u64);
        self.consumed += granted;
        Grant::Bytes(granted as usize)
    }
}

/// Async wrapper that sleeps out exhausted windows
#[derive(Debug)]
pub struct RateLimiter {
    window: RateWindow,
}

impl RateLimiter {
    /// Returns a limiter for a positive limit, or None when the limit is
    /// zero (unlimited)
    pub fn from_limit(limit: u64) -> Option<Self> {
        (limit > 0).then(|| Self {
            window: RateWindow::new(limit, Instant::now()),
        })
    }

    /// Bytes per second this limiter enforces
    pub fn limit(&self) -> u64 {
        self.window.limit
    }

    /// Waits until quota is available and returns how many of the `want`
    /// bytes may be transferred now
    pub async fn throttle(&mut self, want: usize) -> usize {
        loop {
            match self.window.grant(Instant::now(), want) {
                Grant::Bytes(n) => return n,
                Grant::ExhaustedUntil(at) => {
                    tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await;
                }
            }
        }
    }
}
