//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::{AppConfig, CaptureBackend, StorageBackend};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `bind_addr` is not a socket address
    /// - `homepage_limit` is outside 1..=100
    /// - `capture.timeout_ms` is under 1s or over 2 minutes
    /// - `hero_url` or `public_host` is empty
    ///
    /// Returns `ConfigError::Missing` if the selected storage or capture
    /// backend lacks its required setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        if self.homepage_limit == 0 || self.homepage_limit > 100 {
            return Err(ConfigError::Invalid {
                field: "homepage_limit".into(),
                reason: "must be between 1 and 100".into(),
            });
        }

        if self.capture.timeout_ms < 1_000 {
            return Err(ConfigError::Invalid { field: "capture.timeout_ms".into(), reason: "must be at least 1000ms".into() });
        }
        if self.capture.timeout_ms > 120_000 {
            return Err(ConfigError::Invalid {
                field: "capture.timeout_ms".into(),
                reason: "must not exceed 2 minutes (120000ms)".into(),
            });
        }

        if self.hero_url.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "hero_url".into(), reason: "must not be empty".into() });
        }
        if self.public_host.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "public_host".into(), reason: "must not be empty".into() });
        }

        if self.storage.backend == StorageBackend::S3 && self.storage.bucket.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::Missing {
                field: "storage.bucket".into(),
                hint: "Set SHOTIT_STORAGE__BUCKET environment variable".into(),
            });
        }

        if self.capture.backend == CaptureBackend::Remote && self.capture.endpoint.as_deref().is_none_or(str::is_empty)
        {
            return Err(ConfigError::Missing {
                field: "capture.endpoint".into(),
                hint: "Set SHOTIT_CAPTURE__ENDPOINT environment variable".into(),
            });
        }

        if self.storage.backend == StorageBackend::Memory {
            tracing::warn!("memory storage selected; screenshots are lost on restart");
        }

        Ok(())
    }
}
