//! Once-per-day refresh throttle.
//!
//! A refresh leaves an empty marker object keyed by day, URL and modifier
//! set. While the marker exists, further refreshes of the same slot are
//! refused. Old markers are never read again once the day rolls over.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::Error;
use crate::keys::rate_limit_key;
use crate::request::Modifier;
use crate::storage::{BlobStore, PutOptions};

/// Refresh throttle backed by marker objects in a [`BlobStore`].
#[derive(Clone)]
pub struct RefreshLimiter {
    store: Arc<dyn BlobStore>,
}

impl RefreshLimiter {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Whether a refresh of this slot is still allowed on `today` (`YYYY-MM-DD`).
    pub async fn check(&self, today: &str, normalized_url: &str, modifiers: &[Modifier]) -> Result<bool, Error> {
        let key = rate_limit_key(today, normalized_url, modifiers);
        Ok(self.store.head(&key).await?.is_none())
    }

    /// Record that this slot was refreshed.
    pub async fn record(
        &self, now: DateTime<Utc>, normalized_url: &str, modifiers: &[Modifier],
    ) -> Result<(), Error> {
        let today = now.format("%Y-%m-%d").to_string();
        let key = rate_limit_key(&today, normalized_url, modifiers);

        let mut metadata = BTreeMap::new();
        metadata.insert("recorded_at".to_string(), now.to_rfc3339_opts(SecondsFormat::Millis, true));

        self.store
            .put(&key, Bytes::new(), PutOptions { content_type: None, metadata })
            .await?;

        tracing::debug!(key = %key, "recorded refresh");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    const URL: &str = "https://example.com";

    fn limiter() -> (Arc<MemoryStore>, RefreshLimiter) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), RefreshLimiter::new(store))
    }

    #[tokio::test]
    async fn test_allows_first_refresh() {
        let (_, limiter) = limiter();
        assert!(limiter.check("2026-01-28", URL, &[Modifier::Full]).await.unwrap());
    }

    #[tokio::test]
    async fn test_blocks_second_refresh_same_day() {
        let (store, limiter) = limiter();
        let now = Utc.with_ymd_and_hms(2026, 1, 28, 9, 30, 0).unwrap();

        limiter.record(now, URL, &[Modifier::Refresh, Modifier::Full]).await.unwrap();

        assert!(store.head("ratelimit/2026-01-28/https://example.com/full").await.unwrap().is_some());
        assert!(!limiter.check("2026-01-28", URL, &[Modifier::Full, Modifier::Refresh]).await.unwrap());
    }

    #[tokio::test]
    async fn test_other_slots_unaffected() {
        let (_, limiter) = limiter();
        let now = Utc.with_ymd_and_hms(2026, 1, 28, 9, 30, 0).unwrap();
        limiter.record(now, URL, &[Modifier::Full]).await.unwrap();

        assert!(limiter.check("2026-01-28", URL, &[Modifier::Mobile]).await.unwrap());
        assert!(limiter.check("2026-01-29", URL, &[Modifier::Full]).await.unwrap());
        assert!(limiter.check("2026-01-28", "https://other.com", &[Modifier::Full]).await.unwrap());
    }
}
