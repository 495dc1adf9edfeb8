//! The screenshot route.
//!
//! Order of checks for a request path:
//! 1. Dated requests are read-only: exact date, then nearest earlier date, then 404.
//! 2. `@refresh` is refused when the slot was already refreshed today.
//! 3. Without `@refresh`, a stored `latest` capture is served as is.
//! 4. Otherwise the page is captured, stored under `latest` and today's date, and served.

use std::future::Future;

use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, ETAG};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Uri};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use chrono::Utc;
use shotit_client::{CaptureOptions, check_target, viewport_for};
use shotit_core::analytics::{AccessEvent, CreateEvent};
use shotit_core::keys::{IMAGE_CONTENT_TYPE, build_key, key_prefix};
use shotit_core::screenshots::{find_nearest_date, get_screenshot, save_screenshot};
use shotit_core::{Error, Modifier, ParsedRequest, ScreenshotMetadata, normalize_url, parse_request};

use crate::error::ApiError;
use crate::state::AppState;

const X_SCREENSHOT_CACHED: HeaderName = HeaderName::from_static("x-screenshot-cached");
const X_SCREENSHOT_CAPTURED: HeaderName = HeaderName::from_static("x-screenshot-captured");
const X_SCREENSHOT_DATE: HeaderName = HeaderName::from_static("x-screenshot-date");

const IMAGE_CACHE_CONTROL: &str = "public, max-age=86400";

/// A parsed request resolved to its cache slot.
struct Target {
    parsed: ParsedRequest,
    normalized_url: String,
    /// Key addressed by the request, dated or `latest`.
    key: String,
    /// `latest` key of the slot; analytics rows are keyed by it.
    latest_key: String,
    modifiers_label: String,
}

impl Target {
    fn resolve(path: &str) -> Result<Self, Error> {
        let parsed = parse_request(path)?;
        let normalized_url = normalize_url(&parsed.target_url)?;
        let key = build_key(&normalized_url, &parsed.modifiers, parsed.date.as_deref());
        let latest_key = build_key(&normalized_url, &parsed.modifiers, None);
        let modifiers_label = parsed.modifiers_label();

        Ok(Self { parsed, normalized_url, key, latest_key, modifiers_label })
    }

    fn access_event(&self, accessed_at: String) -> AccessEvent {
        AccessEvent {
            storage_key: self.latest_key.clone(),
            target_url: self.normalized_url.clone(),
            modifiers: self.modifiers_label.clone(),
            accessed_at,
        }
    }

    fn create_event(&self, created_at: String) -> CreateEvent {
        CreateEvent {
            storage_key: self.latest_key.clone(),
            target_url: self.normalized_url.clone(),
            modifiers: self.modifiers_label.clone(),
            created_at,
        }
    }
}

/// Fallback handler: every path that is not a fixed route.
pub async fn screenshot(State(state): State<AppState>, uri: Uri) -> Result<Response, ApiError> {
    let target = Target::resolve(uri.path())?;
    tracing::debug!(path = uri.path(), key = %target.key, "screenshot request");

    if let Some(date) = target.parsed.date.as_deref() {
        return serve_dated(&state, &target, date).await;
    }

    let refresh = target.parsed.has(Modifier::Refresh);
    let throttled = refresh && state.config.refresh_limit_enabled;

    if throttled {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        if !state.limiter.check(&today, &target.normalized_url, &target.parsed.modifiers).await? {
            return Err(ApiError::RefreshLimited);
        }
    }

    if !refresh && let Some(cached) = get_screenshot(state.store.as_ref(), &target.key).await? {
        record_access(&state, &target);
        return Ok(image_response(cached.data, &cached.metadata, true, None));
    }

    if state.config.capture.block_private_targets {
        check_target(&target.normalized_url).await.map_err(Error::from)?;
    }

    let opts = CaptureOptions::new(viewport_for(&target.parsed.modifiers), state.config.capture.timeout());
    let data = state
        .capturer
        .capture(&target.normalized_url, &opts)
        .await
        .map_err(Error::from)?;

    let now = Utc::now();
    let metadata = ScreenshotMetadata::for_capture(&target.normalized_url, &target.modifiers_label, &data, now);
    save_screenshot(state.store.as_ref(), &target.key, data.clone(), &metadata).await?;

    let analytics = state.analytics.clone();
    let created = target.create_event(metadata.captured_at.clone());
    let accessed = target.access_event(metadata.captured_at.clone());
    queue_analytics(async move {
        analytics.record_created(created).await?;
        analytics.record_access(accessed).await
    });

    if throttled {
        state.limiter.record(now, &target.normalized_url, &target.parsed.modifiers).await?;
    }

    tracing::info!(url = %target.normalized_url, key = %target.key, size = data.len(), "captured screenshot");
    Ok(image_response(data, &metadata, false, None))
}

async fn serve_dated(state: &AppState, target: &Target, date: &str) -> Result<Response, ApiError> {
    let store = state.store.as_ref();

    if let Some(exact) = get_screenshot(store, &target.key).await? {
        record_access(state, target);
        return Ok(image_response(exact.data, &exact.metadata, true, None));
    }

    if let Some(nearest) = find_nearest_date(store, key_prefix(&target.key), date).await? {
        let nearest_key = build_key(&target.normalized_url, &target.parsed.modifiers, Some(&nearest));
        if let Some(fallback) = get_screenshot(store, &nearest_key).await? {
            record_access(state, target);
            return Ok(image_response(fallback.data, &fallback.metadata, true, Some(&nearest)));
        }
    }

    Err(ApiError::NotFound(format!(
        "No screenshot found for {} on or before {date}. No earlier screenshots are available for this URL.",
        target.normalized_url
    )))
}

fn record_access(state: &AppState, target: &Target) {
    let analytics = state.analytics.clone();
    let event = target.access_event(Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true));
    queue_analytics(async move { analytics.record_access(event).await });
}

/// Run an analytics write in the background. Failures are logged only.
fn queue_analytics<F>(write: F)
where
    F: Future<Output = Result<(), Error>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = write.await {
            tracing::warn!(error = %e, "failed to write analytics event");
        }
    });
}

fn image_response(data: Bytes, metadata: &ScreenshotMetadata, cached: bool, served_date: Option<&str>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(IMAGE_CONTENT_TYPE));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(IMAGE_CACHE_CONTROL));
    headers.insert(X_SCREENSHOT_CACHED, HeaderValue::from_static(if cached { "true" } else { "false" }));

    if let Ok(captured) = HeaderValue::from_str(&metadata.captured_at) {
        headers.insert(X_SCREENSHOT_CAPTURED, captured);
    }
    if let Some(sha) = &metadata.content_sha256
        && let Ok(etag) = HeaderValue::from_str(&format!("\"{sha}\""))
    {
        headers.insert(ETAG, etag);
    }
    if let Some(date) = served_date
        && let Ok(value) = HeaderValue::from_str(date)
    {
        headers.insert(X_SCREENSHOT_DATE, value);
    }

    (headers, data).into_response()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::StatusCode;
    use bytes::Bytes;
    use chrono::{TimeZone, Utc};
    use shotit_core::keys::build_key;
    use shotit_core::screenshots::save_screenshot;
    use shotit_core::{BlobStore, ScreenshotMetadata};

    use crate::routes::testing::{FakeCapturer, Harness, IMAGE, body_bytes, body_text};

    const LATEST: &str = "screenshots/https://example.com/default/latest.webp";

    async fn seed(harness: &Harness, day: u32, body: &'static [u8]) {
        let at = Utc.with_ymd_and_hms(2026, 1, day, 10, 0, 0).unwrap();
        let meta = ScreenshotMetadata::for_capture("https://example.com", "", body, at);
        let latest = build_key("https://example.com", &[], None);
        save_screenshot(harness.store.as_ref(), &latest, Bytes::from_static(body), &meta).await.unwrap();
    }

    async fn wait_for_access_count(harness: &Harness, expected: i64) {
        for _ in 0..100 {
            let top = harness.state.analytics.top_screenshots(10).await.unwrap();
            if top.first().map(|s| s.access_count) == Some(expected) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("access count never reached {expected}");
    }

    #[tokio::test]
    async fn test_capture_then_cache_hit() {
        let harness = Harness::new().await;

        let first = harness.get("/example.com").await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()["content-type"], "image/webp");
        assert_eq!(first.headers()["cache-control"], "public, max-age=86400");
        assert_eq!(first.headers()["x-screenshot-cached"], "false");
        assert!(first.headers().contains_key("x-screenshot-captured"));
        assert!(first.headers().contains_key("etag"));
        assert_eq!(body_bytes(first).await.as_ref(), IMAGE);

        let second = harness.get("/https://EXAMPLE.com?utm=1").await;
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(second.headers()["x-screenshot-cached"], "true");
        assert_eq!(harness.capturer.calls(), 1);

        // latest plus today's dated copy
        assert_eq!(harness.store.len().await, 2);
        assert!(harness.store.head(LATEST).await.unwrap().is_some());

        wait_for_access_count(&harness, 2).await;
        let stats = harness.state.analytics.recent_screenshots(10).await.unwrap();
        assert_eq!(stats[0].storage_key, LATEST);
        assert_eq!(stats[0].created_count, 1);
    }

    #[tokio::test]
    async fn test_modifiers_select_slot_and_viewport() {
        let harness = Harness::new().await;

        let response = harness.get("/example.com@mobile@full").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            harness
                .store
                .head("screenshots/https://example.com/full-mobile/latest.webp")
                .await
                .unwrap()
                .is_some()
        );

        let viewport = (*harness.capturer.last_viewport.lock().unwrap()).unwrap();
        assert_eq!((viewport.width, viewport.height), (390, 844));
        assert!(viewport.full_page);
    }

    #[tokio::test]
    async fn test_refresh_recaptures_once_per_day() {
        let harness = Harness::new().await;

        assert_eq!(harness.get("/example.com").await.status(), StatusCode::OK);

        let refreshed = harness.get("/example.com@refresh").await;
        assert_eq!(refreshed.status(), StatusCode::OK);
        assert_eq!(refreshed.headers()["x-screenshot-cached"], "false");
        assert_eq!(harness.capturer.calls(), 2);

        let limited = harness.get("/example.com@refresh").await;
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body_text(limited).await, "Refresh limit: once per day per URL");
        assert_eq!(harness.capturer.calls(), 2);

        // a different slot has its own budget
        assert_eq!(harness.get("/example.com@refresh@mobile").await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_refresh_unthrottled_when_disabled() {
        let mut harness = Harness::new().await;
        let mut config = (*harness.state.config).clone();
        config.refresh_limit_enabled = false;
        harness.state.config = std::sync::Arc::new(config);

        assert_eq!(harness.get("/example.com@refresh").await.status(), StatusCode::OK);
        assert_eq!(harness.get("/example.com@refresh").await.status(), StatusCode::OK);
        assert_eq!(harness.capturer.calls(), 2);
    }

    #[tokio::test]
    async fn test_dated_exact_hit() {
        let harness = Harness::new().await;
        seed(&harness, 25, b"jan-25").await;

        let response = harness.get("/example.com@2026-01-25").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-screenshot-cached"], "true");
        assert!(!response.headers().contains_key("x-screenshot-date"));
        assert_eq!(body_bytes(response).await.as_ref(), b"jan-25");
        assert_eq!(harness.capturer.calls(), 0);
    }

    #[tokio::test]
    async fn test_dated_nearest_earlier() {
        let harness = Harness::new().await;
        seed(&harness, 20, b"jan-20").await;
        seed(&harness, 25, b"jan-25").await;
        seed(&harness, 30, b"jan-30").await;

        let response = harness.get("/example.com@2026-01-28").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-screenshot-date"], "2026-01-25");
        assert_eq!(response.headers()["x-screenshot-captured"], "2026-01-25T10:00:00.000Z");
        assert_eq!(body_bytes(response).await.as_ref(), b"jan-25");

        wait_for_access_count(&harness, 1).await;
        let top = harness.state.analytics.top_screenshots(10).await.unwrap();
        assert_eq!(top[0].storage_key, LATEST);
    }

    #[tokio::test]
    async fn test_dated_without_history_is_not_found() {
        let harness = Harness::new().await;
        seed(&harness, 30, b"jan-30").await;

        let response = harness.get("/example.com@2026-01-28@refresh").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_text(response).await,
            "No screenshot found for https://example.com on or before 2026-01-28. \
             No earlier screenshots are available for this URL."
        );
        assert_eq!(harness.capturer.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_requests() {
        let harness = Harness::new().await;

        let response = harness.get("/example.com@foo").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Unknown modifier: @foo");

        let response = harness.get("/@full").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "No URL provided");

        let response = harness.get("/example.com@2026-01-01@2026-01-02").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Only one @date modifier allowed");

        assert_eq!(harness.capturer.calls(), 0);
    }

    #[tokio::test]
    async fn test_capture_failure_is_bad_gateway() {
        let capturer = FakeCapturer { fail_with: Some("net::ERR_NAME_NOT_RESOLVED".into()), ..Default::default() };
        let harness = Harness::with_capturer(capturer).await;

        let response = harness.get("/example.com").await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_text(response).await;
        assert!(body.starts_with("Failed to capture screenshot: Screenshot failed:"));
        assert!(body.contains("net::ERR_NAME_NOT_RESOLVED"));
        assert!(harness.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_private_target_blocked() {
        let mut harness = Harness::new().await;
        let mut config = (*harness.state.config).clone();
        config.capture.block_private_targets = true;
        harness.state.config = std::sync::Arc::new(config);

        let response = harness.get("/http://127.0.0.1:8080/admin").await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(body_text(response).await.contains("target blocked"));
        assert_eq!(harness.capturer.calls(), 0);
    }
}
