//! Renderer backed by an external command

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use tokio::process::Command;
use url::Url;

use crate::render::{CapturedResource, PageRenderer, RenderedPage};
use crate::KagamiError;

/// Wire format the renderer command prints on stdout
#[derive(Debug, Deserialize)]
struct RenderPayload {
    html: String,
    #[serde(default)]
    resources: Vec<ResourcePayload>,
}

#[derive(Debug, Deserialize)]
struct ResourcePayload {
    url: String,
    #[serde(default)]
    content_type: Option<String>,
    /// Base64-encoded body
    bytes: String,
}

/// Renders pages by running an external renderer command
///
/// The configured command line is split on whitespace; the page URL is
/// appended as the final argument. The command must print a JSON document
/// on stdout:
///
/// ```json
/// {
///   "html": "<html>...</html>",
///   "resources": [
///     { "url": "http://example.com/app.css",
///       "content_type": "text/css",
///       "bytes": "Ym9keSB7fQ==" }
///   ]
/// }
/// ```
///
/// where `bytes` is the base64-encoded resource body. Every failure mode
/// (spawn, non-zero exit, malformed JSON, bad base64) surfaces as a render
/// error for that URL only.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    command: String,
}

impl CommandRenderer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl PageRenderer for CommandRenderer {
    async fn render(&self, url: &Url) -> crate::Result<RenderedPage> {
        let mut parts = self.command.split_whitespace();
        let Some(program) = parts.next() else {
            return Err(render_error(url, "renderer command is empty"));
        };

        let output = Command::new(program)
            .args(parts)
            .arg(url.as_str())
            .output()
            .await
            .map_err(|e| render_error(url, format!("failed to run {}: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(render_error(
                url,
                format!("renderer exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        let payload: RenderPayload = serde_json::from_slice(&output.stdout)
            .map_err(|e| render_error(url, format!("malformed renderer output: {}", e)))?;

        let mut resources = Vec::with_capacity(payload.resources.len());
        for resource in payload.resources {
            let bytes = general_purpose::STANDARD.decode(&resource.bytes).map_err(|e| {
                render_error(
                    url,
                    format!("invalid base64 body for {}: {}", resource.url, e),
                )
            })?;
            resources.push(CapturedResource {
                url: resource.url,
                content_type: resource.content_type,
                bytes,
            });
        }

        Ok(RenderedPage {
            html: payload.html,
            resources,
        })
    }
}

fn render_error(url: &Url, message: impl Into<String>) -> KagamiError {
    KagamiError::Render {
        url: url.to_string(),
        message: message.into(),
    }
}
