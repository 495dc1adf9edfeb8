//! Shared handler state.

use std::sync::Arc;

use shotit_client::{Capturer, build_capturer};
use shotit_core::storage::open_store;
use shotit_core::{AnalyticsDb, AppConfig, BlobStore, RefreshLimiter};

/// Everything a request handler needs. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn BlobStore>,
    pub limiter: RefreshLimiter,
    pub analytics: AnalyticsDb,
    pub capturer: Arc<dyn Capturer>,
}

impl AppState {
    pub fn new(
        config: AppConfig, store: Arc<dyn BlobStore>, analytics: AnalyticsDb, capturer: Arc<dyn Capturer>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            limiter: RefreshLimiter::new(store.clone()),
            store,
            analytics,
            capturer,
        }
    }

    /// Open the analytics database, the blob store, and the capturer named by `config`.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let analytics = AnalyticsDb::open(&config.db_path).await?;
        let store = open_store(&config.storage).await?;
        let capturer = build_capturer(&config.capture).await?;

        tracing::info!(
            db = %config.db_path.display(),
            storage = ?config.storage.backend,
            capture = ?config.capture.backend,
            "state initialized"
        );

        Ok(Self::new(config, store, analytics, capturer))
    }
}
