//! Remote browser-rendering service backend.
//!
//! POSTs a JSON job to an HTTP endpoint that drives a browser and answers
//! with raw image bytes.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header;
use serde::Serialize;

use super::{CaptureError, CaptureOptions, Capturer, ViewportConfig};

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "shotit/0.1";

/// Extra time on top of the capture timeout before the HTTP request gives up.
const TRANSPORT_SLACK: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CaptureJob<'a> {
    url: &'a str,
    viewport: ViewportConfig,
    screenshot_options: ScreenshotOptions,
    wait_until: &'static str,
    timeout: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScreenshotOptions {
    #[serde(rename = "type")]
    kind: &'static str,
    full_page: bool,
}

/// Capturer backed by a remote rendering endpoint.
#[derive(Debug, Clone)]
pub struct RemoteCapturer {
    http: Arc<reqwest::Client>,
    endpoint: String,
}

impl RemoteCapturer {
    /// Create a client for `endpoint`.
    ///
    /// `timeout` is the capture budget passed to the service; the HTTP
    /// request itself is allowed a few more seconds.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, CaptureError> {
        let http = reqwest::Client::builder()
            .timeout(timeout + TRANSPORT_SLACK)
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|e| CaptureError::Config(e.to_string()))?;

        Ok(Self { http: Arc::new(http), endpoint: endpoint.to_string() })
    }
}

#[async_trait::async_trait]
impl Capturer for RemoteCapturer {
    async fn capture(&self, url: &str, opts: &CaptureOptions) -> Result<Bytes, CaptureError> {
        let job = CaptureJob {
            url,
            viewport: opts.viewport,
            screenshot_options: ScreenshotOptions { kind: "webp", full_page: opts.viewport.full_page },
            wait_until: "networkidle0",
            timeout: opts.timeout_ms(),
        };

        tracing::debug!(url, endpoint = %self.endpoint, "requesting remote capture");

        let response = self
            .http
            .post(&self.endpoint)
            .header(header::ACCEPT, "image/webp")
            .json(&job)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() { CaptureError::Timeout(opts.timeout_ms()) } else { CaptureError::Network(e.to_string()) }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CaptureError::Remote { status: status.as_u16(), body });
        }

        let bytes = response.bytes().await.map_err(|e| CaptureError::Network(e.to_string()))?;
        if bytes.is_empty() {
            return Err(CaptureError::Screenshot("remote capture returned an empty body".into()));
        }

        tracing::debug!(url, size = bytes.len(), "remote capture complete");
        Ok(bytes)
    }
}
