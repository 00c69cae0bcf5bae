//! Kagami main entry point
//!
//! This is the command-line interface for the Kagami website downloader.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use kagami::config::{
    load_profile, parse_exclude_list, parse_rate_limit, parse_reject_list, read_url_file,
    validate_concurrency, validate_seed_url, DownloadOptions, Filters, MirrorOptions, Profile,
};
use kagami::download::{
    build_http_client, content_size, fetch_to_file, filename_for, FetchReport, FetchResult,
    FetchStatus, RateLimiter, WorkerPool,
};
use kagami::mirror::mirror_site;
use kagami::output::{DownloadSummary, Transcript, BACKGROUND_LOG};
use kagami::render::{CommandRenderer, PageRenderer};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Kagami: a website downloader and mirroring engine
///
/// Kagami downloads single files, lists of files, or entire websites for
/// offline viewing, with bandwidth limiting and live progress reporting.
#[derive(Parser, Debug)]
#[command(name = "kagami")]
#[command(version = "1.0.0")]
#[command(about = "A website downloader and mirroring engine", long_about = None)]
struct Cli {
    /// URL to download
    #[arg(value_name = "URL")]
    url: Option<String>,

    /// Continue in the background, writing output to wget-log
    #[arg(short = 'B', long)]
    background: bool,

    /// Save the download under this file name
    #[arg(short = 'O', long, value_name = "FILE")]
    output_file: Option<String>,

    /// Directory downloads are saved into
    #[arg(short = 'P', long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Bandwidth cap per transfer, e.g. 400k or 2M
    #[arg(long, value_name = "RATE")]
    rate_limit: Option<String>,

    /// File with one URL per line to download
    #[arg(short = 'i', long, value_name = "FILE", conflicts_with_all = ["url", "mirror"])]
    input_file: Option<PathBuf>,

    /// Mirror the site at URL for offline viewing
    #[arg(long, requires = "url")]
    mirror: bool,

    /// Rewrite links in mirrored documents to point at the local copies
    #[arg(long, requires = "mirror")]
    convert_links: bool,

    /// Comma-separated extensions to skip while mirroring, e.g. jpg,gif
    #[arg(short = 'R', long, value_name = "LIST", requires = "mirror")]
    reject: Option<String>,

    /// Comma-separated path prefixes to skip while mirroring, e.g. /js,/ads
    #[arg(short = 'X', long, value_name = "LIST", requires = "mirror")]
    exclude: Option<String>,

    /// Number of parallel downloads
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// Render pages through the external renderer before saving
    #[arg(long, requires = "render_cmd")]
    dynamic: bool,

    /// Command that renders a URL and prints the rendered page as JSON
    #[arg(long, value_name = "CMD")]
    render_cmd: Option<String>,

    /// Path to a TOML defaults file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    // Load the optional defaults profile
    let profile = match &cli.config {
        Some(path) => {
            tracing::info!("Loading defaults from: {}", path.display());
            load_profile(path)?
        }
        None => Profile::default(),
    };

    // Background mode swaps the transcript sink before anything is written
    let mut transcript = if cli.background {
        println!("Output will be written to \"{}\"", BACKGROUND_LOG);
        Transcript::to_log_file(Path::new(BACKGROUND_LOG))?
    } else {
        Transcript::stdout()
    };

    let summary = if let Some(input) = &cli.input_file {
        handle_url_list(&cli, &profile, input, &mut transcript).await?
    } else if cli.mirror {
        handle_mirror(&cli, &profile, &mut transcript).await?
    } else if let Some(url) = &cli.url {
        handle_download(&cli, &profile, url, &mut transcript).await?
    } else {
        anyhow::bail!("no URL given; supply a URL or --input-file <FILE>");
    };

    summary.print(&mut transcript);
    if !summary.all_succeeded() {
        std::process::exit(1);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("kagami=info,warn"),
            1 => EnvFilter::new("kagami=debug,info"),
            2 => EnvFilter::new("kagami=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

// ===== Flag/profile merging (CLI wins, then profile, then built-ins) =====

fn merged_output_dir(cli: &Cli, profile: &Profile) -> Option<PathBuf> {
    cli.output_dir
        .clone()
        .or_else(|| profile.defaults.output_dir.as_ref().map(PathBuf::from))
}

fn merged_concurrency(cli: &Cli, profile: &Profile) -> anyhow::Result<usize> {
    let value = cli
        .concurrency
        .or(profile.defaults.concurrency)
        .unwrap_or(5);
    validate_concurrency(value)?;
    Ok(value)
}

fn merged_rate_limit(cli: &Cli, profile: &Profile) -> anyhow::Result<u64> {
    match cli
        .rate_limit
        .as_deref()
        .or(profile.defaults.rate_limit.as_deref())
    {
        Some(text) => Ok(parse_rate_limit(text)?),
        None => Ok(0),
    }
}

fn merged_user_agent(profile: &Profile) -> String {
    profile
        .defaults
        .user_agent
        .clone()
        .unwrap_or_else(|| format!("kagami/{}", env!("CARGO_PKG_VERSION")))
}

fn merged_filters(cli: &Cli, profile: &Profile) -> Filters {
    let reject = match &cli.reject {
        Some(list) => parse_reject_list(list),
        None => profile
            .filters
            .reject
            .as_ref()
            .map(|items| parse_reject_list(&items.join(",")))
            .unwrap_or_default(),
    };
    let exclude = match &cli.exclude {
        Some(list) => parse_exclude_list(list),
        None => profile
            .filters
            .exclude
            .as_ref()
            .map(|items| parse_exclude_list(&items.join(",")))
            .unwrap_or_default(),
    };
    Filters::new(reject, exclude)
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Handles the single-file download mode
async fn handle_download(
    cli: &Cli,
    profile: &Profile,
    url: &str,
    transcript: &mut Transcript,
) -> anyhow::Result<DownloadSummary> {
    let url = validate_seed_url(url)?;
    let options = DownloadOptions {
        output_dir: merged_output_dir(cli, profile).unwrap_or_else(|| PathBuf::from(".")),
        output_file: cli.output_file.clone(),
        concurrency: merged_concurrency(cli, profile)?,
        rate_limit: merged_rate_limit(cli, profile)?,
        user_agent: merged_user_agent(profile),
    };

    let client = build_http_client(&options.user_agent)?;
    let file_name = options
        .output_file
        .clone()
        .unwrap_or_else(|| filename_for(&url));
    let dest = options.output_dir.join(&file_name);

    transcript.line(&format!("start at {}", timestamp()));

    let mut limiter = RateLimiter::from_limit(options.rate_limit);
    let report = FetchReport {
        transcript,
        narrate: true,
        progress: true,
    };

    let mut summary = DownloadSummary::new();
    match fetch_to_file(&client, &url, &dest, limiter.as_mut(), Some(report)).await {
        Ok(outcome) => {
            summary.record(&FetchResult::success(url.as_str(), dest, outcome.bytes));
        }
        Err(e) => {
            transcript.line(&format!("Error downloading {}: {}", url, e));
            summary.record(&FetchResult::failed(url.as_str(), dest, e.to_string()));
        }
    }

    transcript.line(&format!("finished at {}", timestamp()));
    Ok(summary)
}

/// Handles the URL-list download mode
async fn handle_url_list(
    cli: &Cli,
    profile: &Profile,
    input: &Path,
    transcript: &mut Transcript,
) -> anyhow::Result<DownloadSummary> {
    let lines = read_url_file(input)?;
    if lines.is_empty() {
        anyhow::bail!("no URLs found in {}", input.display());
    }

    let options = DownloadOptions {
        output_dir: merged_output_dir(cli, profile)
            .unwrap_or_else(|| PathBuf::from("downloads")),
        output_file: None,
        concurrency: merged_concurrency(cli, profile)?,
        rate_limit: merged_rate_limit(cli, profile)?,
        user_agent: merged_user_agent(profile),
    };

    let client = build_http_client(&options.user_agent)?;

    // Size pre-pass: one HEAD per URL, reported before any download starts
    let mut targets = Vec::with_capacity(lines.len());
    let mut sizes = Vec::with_capacity(lines.len());
    for line in &lines {
        let url = validate_seed_url(line)?;
        let size = match content_size(&client, &url).await {
            Ok(Some(n)) => n.to_string(),
            _ => "unknown".to_string(),
        };
        sizes.push(size);
        targets.push(url);
    }
    transcript.line(&format!("content size: [{}]", sizes.join(", ")));

    let rate_limit = options.rate_limit;
    let output_dir = options.output_dir.clone();
    let worker_client = client.clone();
    let mut pool = WorkerPool::start(options.concurrency, move |url: Url| {
        let client = worker_client.clone();
        let dest = output_dir.join(filename_for(&url));
        async move {
            let mut limiter = RateLimiter::from_limit(rate_limit);
            match fetch_to_file(&client, &url, &dest, limiter.as_mut(), None).await {
                Ok(outcome) => FetchResult::success(url.as_str(), dest, outcome.bytes),
                Err(e) => FetchResult::failed(url.as_str(), dest, e.to_string()),
            }
        }
    });

    // Feed from a separate task so the bounded job queue cannot stall the
    // result drain below
    let feeder_jobs = pool.jobs.clone();
    tokio::spawn(async move {
        for url in targets {
            if feeder_jobs.send(url).await.is_err() {
                break;
            }
        }
    });
    drop(pool.jobs);

    let mut summary = DownloadSummary::new();
    let mut finished = Vec::new();
    while let Some(result) = pool.results.recv().await {
        match result.status {
            FetchStatus::Success => {
                transcript.line(&format!("finished {}", result.url));
                finished.push(result.url.clone());
            }
            _ => {
                transcript.line(&format!(
                    "Error downloading {}: {}",
                    result.url,
                    result.error.as_deref().unwrap_or("unknown error")
                ));
            }
        }
        summary.record(&result);
    }

    transcript.line(&format!("Download finished: [{}]", finished.join(", ")));
    Ok(summary)
}

/// Handles the mirror mode
async fn handle_mirror(
    cli: &Cli,
    profile: &Profile,
    transcript: &mut Transcript,
) -> anyhow::Result<DownloadSummary> {
    let seed = validate_seed_url(cli.url.as_deref().unwrap_or_default())?;
    let host = seed.host_str().unwrap_or("site").to_string();

    let options = MirrorOptions {
        seed: seed.clone(),
        output_dir: merged_output_dir(cli, profile)
            .unwrap_or_else(|| Path::new("mirrors").join(&host)),
        convert_links: cli.convert_links,
        filters: merged_filters(cli, profile),
        concurrency: merged_concurrency(cli, profile)?,
        rate_limit: merged_rate_limit(cli, profile)?,
        dynamic: cli.dynamic,
        user_agent: merged_user_agent(profile),
    };

    let renderer: Option<Arc<dyn PageRenderer>> = match (&cli.render_cmd, cli.dynamic) {
        (Some(cmd), true) => Some(Arc::new(CommandRenderer::new(cmd.clone()))),
        _ => None,
    };

    let summary = mirror_site(options, renderer, transcript).await?;
    Ok(summary)
}
