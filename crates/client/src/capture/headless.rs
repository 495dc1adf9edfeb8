//! Headless Chromium backend using chromiumoxide.

use std::path::Path;

use bytes::Bytes;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use futures_util::StreamExt;
use tokio::task::JoinHandle;

use super::{CaptureError, CaptureOptions, Capturer};

/// Headless Chrome/Chromium capturer.
///
/// One browser process is shared; every capture opens and closes its own tab.
pub struct HeadlessCapturer {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl HeadlessCapturer {
    /// Launch a headless browser.
    ///
    /// Uses `executable` when given, otherwise chromiumoxide's own lookup.
    /// The Chrome DevTools Protocol event loop runs on a background task.
    pub async fn launch(executable: Option<&Path>) -> Result<Self, CaptureError> {
        let mut builder = BrowserConfig::builder();
        if let Some(path) = executable {
            builder = builder.chrome_executable(path);
        }

        let (browser, mut handler) =
            Browser::launch(builder.build().map_err(CaptureError::BrowserLaunch)?)
                .await
                .map_err(|e| CaptureError::BrowserLaunch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler event error: {e}");
                    break;
                }
            }
        });

        Ok(Self { browser, handler })
    }
}

impl Drop for HeadlessCapturer {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait::async_trait]
impl Capturer for HeadlessCapturer {
    async fn capture(&self, url: &str, opts: &CaptureOptions) -> Result<Bytes, CaptureError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| CaptureError::Navigation(e.to_string()))?;

        let start = std::time::Instant::now();
        let viewport = opts.viewport;

        let result = tokio::time::timeout(opts.timeout, async {
            page.execute(SetDeviceMetricsOverrideParams::new(
                i64::from(viewport.width),
                i64::from(viewport.height),
                viewport.device_scale_factor,
                viewport.is_mobile(),
            ))
            .await
            .map_err(|e| CaptureError::Navigation(e.to_string()))?;

            page.goto(url).await.map_err(|e| CaptureError::Navigation(e.to_string()))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| CaptureError::Navigation(e.to_string()))?;

            page.screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Webp)
                    .full_page(viewport.full_page)
                    .build(),
            )
            .await
            .map_err(|e| CaptureError::Screenshot(e.to_string()))
        })
        .await;

        page.close().await.ok();

        let image = result.map_err(|_| CaptureError::Timeout(opts.timeout_ms()))??;
        tracing::debug!(url, size = image.len(), elapsed = ?start.elapsed(), "headless capture complete");

        Ok(Bytes::from(image))
    }
}
