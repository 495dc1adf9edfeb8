//! Core types and shared functionality for shotit.
//!
//! This crate provides:
//! - Request path grammar and URL normalization
//! - Storage key layout and nearest-date lookup
//! - Blob storage backends and screenshot persistence
//! - Refresh throttling and SQLite analytics
//! - Configuration and unified error types

pub mod analytics;
pub mod config;
pub mod error;
pub mod keys;
pub mod nearest;
pub mod normalize;
pub mod ratelimit;
pub mod request;
pub mod screenshots;
pub mod storage;

pub use analytics::{AnalyticsDb, ScreenshotStats};
pub use config::AppConfig;
pub use error::Error;
pub use normalize::normalize_url;
pub use ratelimit::RefreshLimiter;
pub use request::{Modifier, ParsedRequest, parse_request};
pub use screenshots::{Screenshot, ScreenshotMetadata};
pub use storage::BlobStore;
