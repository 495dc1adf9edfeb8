//! SQLite-backed screenshot analytics.
//!
//! Counts how often each stored screenshot is served and captured, and
//! exposes the two leaderboards shown on the homepage. Writes are cheap
//! upserts keyed by storage key; callers treat them as best-effort.

pub mod connection;
pub mod migrations;
pub mod stats;

pub use connection::AnalyticsDb;
pub use stats::{AccessEvent, CreateEvent, ScreenshotStats, public_path};
