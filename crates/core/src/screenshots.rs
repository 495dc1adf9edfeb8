//! Screenshot persistence on top of a [`BlobStore`].
//!
//! Each capture is written twice: once under the `latest` key and once under
//! the dated key for the capture day, so history queries can find it later.

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::Error;
use crate::keys::{IMAGE_CONTENT_TYPE, dated_key};
use crate::nearest::find_nearest;
use crate::storage::{BlobStore, PutOptions};

const CAPTURED_AT: &str = "captured_at";
const TARGET_URL: &str = "target_url";
const MODIFIERS: &str = "modifiers";
const CONTENT_SHA256: &str = "content_sha256";

/// Metadata attached to every stored screenshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenshotMetadata {
    /// RFC 3339 timestamp with millisecond precision, UTC.
    pub captured_at: String,
    pub target_url: String,
    /// Comma-joined storage modifiers in request order.
    pub modifiers: String,
    /// Hex SHA-256 of the image bytes, used as the HTTP entity tag.
    pub content_sha256: Option<String>,
}

impl ScreenshotMetadata {
    /// Describe a fresh capture of `data`.
    pub fn for_capture(target_url: &str, modifiers: &str, data: &[u8], captured_at: DateTime<Utc>) -> Self {
        Self {
            captured_at: captured_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            target_url: target_url.to_string(),
            modifiers: modifiers.to_string(),
            content_sha256: Some(hex::encode(Sha256::digest(data))),
        }
    }

    /// The `YYYY-MM-DD` part of `captured_at`.
    pub fn capture_date(&self) -> &str {
        self.captured_at.split('T').next().unwrap_or_default()
    }

    fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert(CAPTURED_AT.to_string(), self.captured_at.clone());
        map.insert(TARGET_URL.to_string(), self.target_url.clone());
        map.insert(MODIFIERS.to_string(), self.modifiers.clone());
        if let Some(sha) = &self.content_sha256 {
            map.insert(CONTENT_SHA256.to_string(), sha.clone());
        }
        map
    }

    fn from_map(map: &BTreeMap<String, String>) -> Self {
        let field = |name: &str| map.get(name).cloned().unwrap_or_default();
        Self {
            captured_at: field(CAPTURED_AT),
            target_url: field(TARGET_URL),
            modifiers: field(MODIFIERS),
            content_sha256: map.get(CONTENT_SHA256).cloned(),
        }
    }
}

/// A stored screenshot.
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub data: Bytes,
    pub metadata: ScreenshotMetadata,
}

/// Load the screenshot stored at `key`.
pub async fn get_screenshot(store: &dyn BlobStore, key: &str) -> Result<Option<Screenshot>, Error> {
    Ok(store
        .get(key)
        .await?
        .map(|object| Screenshot { metadata: ScreenshotMetadata::from_map(&object.meta.metadata), data: object.data }))
}

/// Store a capture under `latest_key` and under the dated key of its capture day.
pub async fn save_screenshot(
    store: &dyn BlobStore, latest_key: &str, data: Bytes, metadata: &ScreenshotMetadata,
) -> Result<(), Error> {
    let options = PutOptions { content_type: Some(IMAGE_CONTENT_TYPE.to_string()), metadata: metadata.to_map() };

    store.put(latest_key, data.clone(), options.clone()).await?;

    let dated = dated_key(latest_key, metadata.capture_date());
    store.put(&dated, data, options).await?;

    tracing::debug!(latest = latest_key, dated = %dated, "saved screenshot");
    Ok(())
}

/// The closest capture date strictly before `before_date` under `prefix`.
pub async fn find_nearest_date(store: &dyn BlobStore, prefix: &str, before_date: &str) -> Result<Option<String>, Error> {
    let keys = store.list(prefix).await?;
    Ok(find_nearest(keys.iter().map(String::as_str), prefix, before_date))
}
