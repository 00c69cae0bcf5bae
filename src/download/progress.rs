/// Download progress tracking and rendering
///
/// A `ProgressTracker` accumulates byte counts and produces render snapshots
/// at most every 100ms, smoothing the transfer speed with an exponential
/// moving average so the display does not flicker. The final snapshot always
/// reports the overall average speed for the whole transfer.
///
/// Two renderers share the snapshots: the interactive one rewrites a single
/// terminal line in place, the logging one emits one plain line per sample
/// for background-mode log files. A run uses exactly one of them.
use std::io::Write;
use std::time::{Duration, Instant};

use crate::config::OutputMode;

/// Minimum time between rendered samples
const RENDER_INTERVAL: Duration = Duration::from_millis(100);

/// Weight of the newest sample in the smoothed speed
const SMOOTHING: f64 = 0.8;

/// Instantaneous speeds at or below this many bytes per second do not seed
/// the moving average
const NOISE_FLOOR: f64 = 1.0;

/// Width of the interactive progress bar
const BAR_WIDTH: usize = 40;

/// A point-in-time view of a transfer, ready to render
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub bytes_so_far: u64,
    pub total_bytes: Option<u64>,
    /// Bytes per second; smoothed during the transfer, overall average at the end
    pub speed: f64,
    pub elapsed: Duration,
}

impl Snapshot {
    /// Completion percentage, None when the total is unknown
    pub fn percent(&self) -> Option<u8> {
        match self.total_bytes {
            Some(total) if total > 0 => {
                Some(((self.bytes_so_far * 100) / total).min(100) as u8)
            }
            Some(_) => Some(100),
            None => None,
        }
    }
}

/// Byte accounting and speed smoothing for one transfer
///
/// The current time is passed into every call so the arithmetic can be
/// driven deterministically under test.
#[derive(Debug)]
pub struct ProgressTracker {
    total_bytes: Option<u64>,
    bytes_so_far: u64,
    started_at: Instant,
    last_sample_at: Instant,
    last_sample_bytes: u64,
    smoothed_speed: Option<f64>,
}

impl ProgressTracker {
    pub fn new(total_bytes: Option<u64>, now: Instant) -> Self {
        Self {
            total_bytes,
            bytes_so_far: 0,
            started_at: now,
            last_sample_at: now,
            last_sample_bytes: 0,
            smoothed_speed: None,
        }
    }

    /// Adds `n` transferred bytes; returns a snapshot when enough time has
    /// passed since the last one
    pub fn record(&mut self, n: u64, now: Instant) -> Option<Snapshot> {
        self.bytes_so_far += n;

        let since_sample = now.duration_since(self.last_sample_at);
        if since_sample < RENDER_INTERVAL {
            return None;
        }

        let delta = (self.bytes_so_far - self.last_sample_bytes) as f64;
        let instant_speed = delta / since_sample.as_secs_f64();

        self.smoothed_speed = match self.smoothed_speed {
            Some(previous) => Some(SMOOTHING * instant_speed + (1.0 - SMOOTHING) * previous),
            None if instant_speed > NOISE_FLOOR => Some(instant_speed),
            None => None,
        };

        self.last_sample_at = now;
        self.last_sample_bytes = self.bytes_so_far;

        Some(Snapshot {
            bytes_so_far: self.bytes_so_far,
            total_bytes: self.total_bytes,
            speed: self.smoothed_speed.unwrap_or(0.0),
            elapsed: now.duration_since(self.started_at),
        })
    }

    /// Final snapshot reporting the overall average speed
    pub fn finish(&self, now: Instant) -> Snapshot {
        let elapsed = now.duration_since(self.started_at);
        let secs = elapsed.as_secs_f64();
        let speed = if secs > 0.0 {
            self.bytes_so_far as f64 / secs
        } else {
            0.0
        };

        Snapshot {
            bytes_so_far: self.bytes_so_far,
            total_bytes: self.total_bytes,
            speed,
            elapsed,
        }
    }
}

/// Renders snapshots as a single terminal line rewritten in place
#[derive(Debug, Default)]
pub struct InteractiveRenderer {
    ticks: usize,
}

impl InteractiveRenderer {
    pub fn render(&mut self, out: &mut dyn Write, snap: &Snapshot) -> std::io::Result<()> {
        let line = self.line(snap);
        write!(out, "\r{:<76}", line)?;
        out.flush()
    }

    pub fn finish(&mut self, out: &mut dyn Write, snap: &Snapshot) -> std::io::Result<()> {
        let line = match snap.total_bytes {
            Some(total) => format!(
                "{:>10} / {} [{}] 100% {}/s in {}",
                format_size(snap.bytes_so_far),
                format_size(total),
                "=".repeat(BAR_WIDTH),
                format_size(snap.speed as u64),
                format_duration(snap.elapsed)
            ),
            None => format!(
                "{:>10} [{}] {}/s in {}",
                format_size(snap.bytes_so_far),
                "=".repeat(BAR_WIDTH),
                format_size(snap.speed as u64),
                format_duration(snap.elapsed)
            ),
        };
        writeln!(out, "\r{:<76}", line)?;
        out.flush()
    }

    fn line(&mut self, snap: &Snapshot) -> String {
        match snap.total_bytes {
            Some(total) => {
                let pct = snap.percent().unwrap_or(0);
                let eta = if snap.speed > 0.0 && total > snap.bytes_so_far {
                    let secs = (total - snap.bytes_so_far) as f64 / snap.speed;
                    format_duration(Duration::from_secs_f64(secs))
                } else {
                    "--".to_string()
                };
                format!(
                    "{:>10} / {} [{}] {:>3}% {}/s eta {}",
                    format_size(snap.bytes_so_far),
                    format_size(total),
                    bar_known(pct),
                    pct,
                    format_size(snap.speed as u64),
                    eta
                )
            }
            None => {
                // No total to fill a bar against; slide a cursor instead
                self.ticks += 1;
                format!(
                    "{:>10} [{}] {}/s",
                    format_size(snap.bytes_so_far),
                    bar_unknown(self.ticks),
                    format_size(snap.speed as u64)
                )
            }
        }
    }
}

/// Renders snapshots as one plain line per sample
#[derive(Debug, Default)]
pub struct LoggingRenderer;

impl LoggingRenderer {
    pub fn render(&self, out: &mut dyn Write, snap: &Snapshot) -> std::io::Result<()> {
        let kbs = snap.speed / 1024.0;
        match snap.total_bytes {
            Some(total) => writeln!(
                out,
                "{} of {} ({}%) {:.2} KB/s",
                snap.bytes_so_far,
                total,
                snap.percent().unwrap_or(0),
                kbs
            ),
            None => writeln!(out, "{} of unknown {:.2} KB/s", snap.bytes_so_far, kbs),
        }
    }
}

/// One of the two snapshot renderers, selected by output mode
#[derive(Debug)]
pub enum ProgressRenderer {
    Interactive(InteractiveRenderer),
    Logging(LoggingRenderer),
}

impl ProgressRenderer {
    pub fn for_mode(mode: OutputMode) -> Self {
        match mode {
            OutputMode::Interactive => Self::Interactive(InteractiveRenderer::default()),
            OutputMode::Logging => Self::Logging(LoggingRenderer),
        }
    }

    pub fn render(&mut self, out: &mut dyn Write, snap: &Snapshot) -> std::io::Result<()> {
        match self {
            Self::Interactive(r) => r.render(out, snap),
            Self::Logging(r) => r.render(out, snap),
        }
    }

    pub fn finish(&mut self, out: &mut dyn Write, snap: &Snapshot) -> std::io::Result<()> {
        match self {
            Self::Interactive(r) => r.finish(out, snap),
            Self::Logging(r) => r.render(out, snap),
        }
    }
}

/// Tracker, renderer, and output sink bundled for one transfer
pub struct Progress<'w> {
    tracker: ProgressTracker,
    renderer: ProgressRenderer,
    out: &'w mut (dyn Write + Send),
}

impl<'w> Progress<'w> {
    pub fn new(out: &'w mut (dyn Write + Send), mode: OutputMode, total_bytes: Option<u64>) -> Self {
        Self {
            tracker: ProgressTracker::new(total_bytes, Instant::now()),
            renderer: ProgressRenderer::for_mode(mode),
            out,
        }
    }

    /// Records transferred bytes, rendering when the cadence allows
    pub fn record(&mut self, n: u64) {
        if let Some(snap) = self.tracker.record(n, Instant::now()) {
            if let Err(e) = self.renderer.render(self.out, &snap) {
                tracing::debug!("progress render failed: {}", e);
            }
        }
    }

    /// Renders the final overall-average line
    pub fn finish(&mut self) {
        let snap = self.tracker.finish(Instant::now());
        if let Err(e) = self.renderer.finish(self.out, &snap) {
            tracing::debug!("progress render failed: {}", e);
        }
    }
}

fn bar_known(pct: u8) -> String {
    let filled = (pct as usize * BAR_WIDTH) / 100;
    if filled >= BAR_WIDTH {
        "=".repeat(BAR_WIDTH)
    } else {
        let mut bar = String::with_capacity(BAR_WIDTH);
        bar.push_str(&"=".repeat(filled));
        bar.push('>');
        bar.push_str(&"-".repeat(BAR_WIDTH - filled - 1));
        bar
    }
}

fn bar_unknown(ticks: usize) -> String {
    let token = "<=>";
    let span = BAR_WIDTH - token.len();
    let pos = ticks % (span + 1);
    format!("{}{}{}", "-".repeat(pos), token, "-".repeat(span - pos))
}

/// Formats a byte count with binary units
pub fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    let b = bytes as f64;
    if b >= GIB {
        format!("{:.1} GiB", b / GIB)
    } else if b >= MIB {
        format!("{:.1} MiB", b / MIB)
    } else if b >= KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{} B", bytes)
    }
}

/// Formats a duration as compact hours/minutes/seconds
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    if total < 1 {
        return "< 1s".to_string();
    }

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}h{:02}m{:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
