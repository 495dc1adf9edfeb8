//! Screenshot capture backends.
//!
//! Viewport selection is shared; backends only turn a URL plus a
//! [`ViewportConfig`] into WebP bytes.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use shotit_core::config::{CaptureBackend, CaptureConfig};
use shotit_core::{Error, Modifier};
use thiserror::Error;

#[cfg(feature = "render")]
mod headless;
mod remote;

#[cfg(feature = "render")]
pub use headless::HeadlessCapturer;
pub use remote::RemoteCapturer;

/// Errors that can occur while capturing a screenshot.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Failed to launch or connect to the browser.
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    /// Failed to load the target page.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// The page loaded but the screenshot could not be taken.
    #[error("capture failed: {0}")]
    Screenshot(String),

    /// The capture did not finish in time.
    #[error("capture timeout after {0}ms")]
    Timeout(u64),

    /// The remote capture service answered with an error status.
    #[error("remote capture returned {status}: {body}")]
    Remote { status: u16, body: String },

    /// Network error talking to the remote capture service.
    #[error("network error: {0}")]
    Network(String),

    /// The selected backend cannot be built from the given settings.
    #[error("capture backend misconfigured: {0}")]
    Config(String),
}

impl From<CaptureError> for Error {
    fn from(err: CaptureError) -> Self {
        Error::CaptureFailed(err.to_string())
    }
}

/// Browser viewport for one capture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportConfig {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
    #[serde(skip)]
    pub full_page: bool,
}

impl ViewportConfig {
    pub const DESKTOP: Self = Self { width: 1280, height: 800, device_scale_factor: 2.0, full_page: false };
    pub const MOBILE: Self = Self { width: 390, height: 844, device_scale_factor: 2.0, full_page: false };
    /// Open Graph preview size.
    pub const SOCIAL: Self = Self { width: 1200, height: 630, device_scale_factor: 1.0, full_page: false };

    pub fn is_mobile(&self) -> bool {
        (self.width, self.height) == (Self::MOBILE.width, Self::MOBILE.height)
    }
}

/// Pick the viewport for a set of request modifiers.
///
/// `social` wins over `mobile` and `full`.
pub fn viewport_for(modifiers: &[Modifier]) -> ViewportConfig {
    if modifiers.contains(&Modifier::Social) {
        return ViewportConfig::SOCIAL;
    }

    let base = if modifiers.contains(&Modifier::Mobile) { ViewportConfig::MOBILE } else { ViewportConfig::DESKTOP };
    ViewportConfig { full_page: modifiers.contains(&Modifier::Full), ..base }
}

/// Options for a single capture.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub viewport: ViewportConfig,
    pub timeout: Duration,
}

impl CaptureOptions {
    pub fn new(viewport: ViewportConfig, timeout: Duration) -> Self {
        Self { viewport, timeout }
    }

    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Turns a URL into WebP image bytes.
#[async_trait::async_trait]
pub trait Capturer: Send + Sync {
    /// Capture `url` with the given viewport.
    async fn capture(&self, url: &str, opts: &CaptureOptions) -> Result<Bytes, CaptureError>;
}

/// Build the capturer selected by `config`.
///
/// # Errors
///
/// Returns [`CaptureError::Config`] when the backend is unavailable in this
/// build or lacks required settings, and [`CaptureError::BrowserLaunch`] when
/// Chromium cannot be started.
pub async fn build_capturer(config: &CaptureConfig) -> Result<Arc<dyn Capturer>, CaptureError> {
    match config.backend {
        CaptureBackend::Remote => {
            let endpoint = config
                .endpoint
                .as_deref()
                .ok_or_else(|| CaptureError::Config("remote backend requires capture.endpoint".into()))?;
            tracing::info!(endpoint, "using remote capture backend");
            Ok(Arc::new(RemoteCapturer::new(endpoint, config.timeout())?))
        }
        #[cfg(feature = "render")]
        CaptureBackend::Headless => {
            tracing::info!("launching headless browser");
            Ok(Arc::new(HeadlessCapturer::launch(config.chrome_executable.as_deref()).await?))
        }
        #[cfg(not(feature = "render"))]
        CaptureBackend::Headless => {
            Err(CaptureError::Config("headless backend requires the `render` feature".into()))
        }
    }
}
