/// Single-resource fetching
///
/// One call fetches one URL into one local file: send the request, check the
/// status, create parent directories, then stream the body chunk by chunk
/// through the rate limiter and the progress display into a buffered writer.
/// Text bodies (HTML and CSS) are additionally returned decoded so callers
/// can extract and rewrite references without re-reading the file.
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::{AsyncWriteExt, BufWriter};
use url::Url;

use crate::download::progress::Progress;
use crate::download::rate_limit::RateLimiter;
use crate::output::Transcript;
use crate::{KagamiError, Result};

/// Terminal status of one fetch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Success,
    Skipped,
    Failed,
}

/// Record of one fetch attempt, collected into the run summary
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub url: String,
    pub local_path: PathBuf,
    pub status: FetchStatus,
    pub bytes: u64,
    pub error: Option<String>,
}

impl FetchResult {
    pub fn success(url: impl Into<String>, local_path: PathBuf, bytes: u64) -> Self {
        Self {
            url: url.into(),
            local_path,
            status: FetchStatus::Success,
            bytes,
            error: None,
        }
    }

    pub fn skipped(url: impl Into<String>, local_path: PathBuf) -> Self {
        Self {
            url: url.into(),
            local_path,
            status: FetchStatus::Skipped,
            bytes: 0,
            error: None,
        }
    }

    pub fn failed(url: impl Into<String>, local_path: PathBuf, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            local_path,
            status: FetchStatus::Failed,
            bytes: 0,
            error: Some(error.into()),
        }
    }
}

/// What a completed fetch hands back to the caller
#[derive(Debug)]
pub struct FetchOutcome {
    /// Bytes written to the destination file
    pub bytes: u64,

    /// Decoded body for text/html and text/css responses
    pub body: Option<String>,
}

/// User-facing reporting hooks for one fetch
pub struct FetchReport<'t> {
    pub transcript: &'t mut Transcript,

    /// Print the request/response transcript lines
    pub narrate: bool,

    /// Render a progress line while the body streams
    pub progress: bool,
}

/// Builds the HTTP client shared by every mode of a run
pub fn build_http_client(user_agent: &str) -> Result<Client> {
    let client = Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()?;
    Ok(client)
}

/// Fetches `url` into `dest`, streaming the body through the limiter and
/// the progress display
///
/// A non-2xx response is a hard failure and nothing is written. On a stream
/// or write error the partial file is removed before the error is returned.
/// Memory use stays bounded by the chunk size except for text bodies, which
/// are accumulated for the caller.
pub async fn fetch_to_file(
    client: &Client,
    url: &Url,
    dest: &Path,
    mut limiter: Option<&mut RateLimiter>,
    mut report: Option<FetchReport<'_>>,
) -> Result<FetchOutcome> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| KagamiError::Network {
            url: url.to_string(),
            source: e,
        })?;

    let status = response.status();
    if let Some(r) = report.as_mut() {
        if r.narrate {
            r.transcript
                .line(&format!("sending request, awaiting response... status {}", status));
        }
    }

    if !status.is_success() {
        return Err(KagamiError::BadStatus {
            url: url.to_string(),
            code: status.as_u16(),
        });
    }

    let total_bytes = response.content_length();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();
    let is_text = content_type.starts_with("text/html") || content_type.starts_with("text/css");

    if let Some(r) = report.as_mut() {
        if r.narrate {
            match total_bytes {
                Some(n) => r.transcript.line(&format!(
                    "content size: {} [~{:.2}MB]",
                    n,
                    n as f64 / 1_000_000.0
                )),
                None => r.transcript.line("content size: unknown"),
            }
            r.transcript
                .line(&format!("saving file to: ./{}", dest.display()));
        }
    }

    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| KagamiError::Filesystem {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
    }

    let file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| KagamiError::Filesystem {
            path: dest.to_path_buf(),
            source: e,
        })?;
    let mut writer = BufWriter::new(file);

    let mut written: u64 = 0;
    let mut text_buf: Vec<u8> = Vec::new();

    {
        let mut progress = match report.as_mut() {
            Some(r) if r.progress => {
                let mode = r.transcript.mode();
                Some(Progress::new(r.transcript.writer(), mode, total_bytes))
            }
            _ => None,
        };

        let mut stream = response.bytes_stream();
        while let Some(chunk_result) = stream.next().await {
            let chunk = match chunk_result {
                Ok(chunk) => chunk,
                Err(e) => {
                    discard_partial(dest).await;
                    return Err(KagamiError::Network {
                        url: url.to_string(),
                        source: e,
                    });
                }
            };

            // The limiter may hand the chunk back in several slices
            let mut offset = 0usize;
            while offset < chunk.len() {
                let remaining = chunk.len() - offset;
                let granted = match limiter.as_mut() {
                    Some(lim) => lim.throttle(remaining).await,
                    None => remaining,
                };

                if let Err(e) = writer.write_all(&chunk[offset..offset + granted]).await {
                    discard_partial(dest).await;
                    return Err(KagamiError::Filesystem {
                        path: dest.to_path_buf(),
                        source: e,
                    });
                }

                written += granted as u64;
                offset += granted;

                if let Some(p) = progress.as_mut() {
                    p.record(granted as u64);
                }
            }

            if is_text {
                text_buf.extend_from_slice(&chunk);
            }
        }

        if let Err(e) = writer.flush().await {
            discard_partial(dest).await;
            return Err(KagamiError::Filesystem {
                path: dest.to_path_buf(),
                source: e,
            });
        }

        if let Some(p) = progress.as_mut() {
            p.finish();
        }
    }

    if let Some(r) = report.as_mut() {
        if r.narrate {
            r.transcript.line(&format!("Downloaded [{}]", url));
        }
    }

    tracing::debug!(url = %url, bytes = written, "fetched");

    let body = is_text.then(|| String::from_utf8_lossy(&text_buf).into_owned());
    Ok(FetchOutcome {
        bytes: written,
        body,
    })
}

/// Asks the server for the size of a resource without downloading it
pub async fn content_size(client: &Client, url: &Url) -> Result<Option<u64>> {
    let response = client
        .head(url.clone())
        .send()
        .await
        .map_err(|e| KagamiError::Network {
            url: url.to_string(),
            source: e,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(KagamiError::BadStatus {
            url: url.to_string(),
            code: status.as_u16(),
        });
    }

    Ok(response.content_length())
}

/// Derives a destination file name from the URL path
///
/// The last non-empty path segment wins; a bare host falls back to
/// "index.html".
pub fn filename_for(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "index.html".to_string())
}

async fn discard_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::debug!("could not remove partial file {}: {}", path.display(), e);
    }
}
