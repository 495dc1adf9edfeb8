//! Access and capture counters per stored screenshot.

use super::connection::AnalyticsDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// One row of `screenshot_stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotStats {
    pub storage_key: String,
    pub target_url: String,
    /// Comma-joined modifier labels as they appeared in the request.
    pub modifiers: String,
    pub access_count: i64,
    pub created_count: i64,
    /// First capture time; `None` for rows only ever served from cache.
    pub created_at: Option<String>,
    pub last_created_at: Option<String>,
    pub last_accessed_at: Option<String>,
}

impl ScreenshotStats {
    /// Path on this service that serves the same screenshot.
    pub fn public_path(&self) -> String {
        public_path(&self.target_url, &self.modifiers)
    }
}

/// A stored screenshot was served from cache.
#[derive(Debug, Clone)]
pub struct AccessEvent {
    pub storage_key: String,
    pub target_url: String,
    pub modifiers: String,
    pub accessed_at: String,
}

/// A new screenshot was captured and stored.
#[derive(Debug, Clone)]
pub struct CreateEvent {
    pub storage_key: String,
    pub target_url: String,
    pub modifiers: String,
    pub created_at: String,
}

const SELECT_STATS: &str = "SELECT
    storage_key, target_url, modifiers, access_count, created_count,
    created_at, last_created_at, last_accessed_at
FROM screenshot_stats";

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScreenshotStats> {
    Ok(ScreenshotStats {
        storage_key: row.get(0)?,
        target_url: row.get(1)?,
        modifiers: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        access_count: row.get(3)?,
        created_count: row.get(4)?,
        created_at: row.get(5)?,
        last_created_at: row.get(6)?,
        last_accessed_at: row.get(7)?,
    })
}

impl AnalyticsDb {
    /// Count one cache hit for `event.storage_key`.
    pub async fn record_access(&self, event: AccessEvent) -> Result<(), Error> {
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO screenshot_stats (
                        storage_key, target_url, modifiers, access_count, last_accessed_at
                    ) VALUES (?1, ?2, ?3, 1, ?4)
                    ON CONFLICT(storage_key) DO UPDATE SET
                        target_url = excluded.target_url,
                        modifiers = excluded.modifiers,
                        access_count = screenshot_stats.access_count + 1,
                        last_accessed_at = excluded.last_accessed_at",
                    params![event.storage_key, event.target_url, event.modifiers, event.accessed_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Count one fresh capture for `event.storage_key`.
    ///
    /// `created_at` keeps the first capture time; later captures only move
    /// `last_created_at`.
    pub async fn record_created(&self, event: CreateEvent) -> Result<(), Error> {
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO screenshot_stats (
                        storage_key, target_url, modifiers, created_count, created_at, last_created_at
                    ) VALUES (?1, ?2, ?3, 1, ?4, ?4)
                    ON CONFLICT(storage_key) DO UPDATE SET
                        target_url = excluded.target_url,
                        modifiers = excluded.modifiers,
                        created_count = screenshot_stats.created_count + 1,
                        created_at = COALESCE(screenshot_stats.created_at, excluded.created_at),
                        last_created_at = excluded.created_at",
                    params![event.storage_key, event.target_url, event.modifiers, event.created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Most served screenshots, ties broken by most recent access.
    pub async fn top_screenshots(&self, limit: usize) -> Result<Vec<ScreenshotStats>, Error> {
        let sql = format!("{SELECT_STATS} ORDER BY access_count DESC, last_accessed_at DESC LIMIT ?1");
        self.query_stats(sql, limit).await
    }

    /// Most recently first-captured screenshots.
    pub async fn recent_screenshots(&self, limit: usize) -> Result<Vec<ScreenshotStats>, Error> {
        let sql = format!("{SELECT_STATS} ORDER BY created_at DESC LIMIT ?1");
        self.query_stats(sql, limit).await
    }

    async fn query_stats(&self, sql: String, limit: usize) -> Result<Vec<ScreenshotStats>, Error> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.conn
            .call(move |conn| -> Result<Vec<ScreenshotStats>, Error> {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![limit], map_row)?;
                let stats = rows.collect::<Result<Vec<_>, _>>()?;
                Ok(stats)
            })
            .await
            .map_err(Error::from)
    }
}

/// The service path for a screenshot: scheme stripped, one `@mod` per
/// comma-separated modifier. An `@` inside the URL is written as `%40` so
/// it is not read back as a modifier delimiter.
///
/// `public_path("https://example.com/a", "full,mobile")` is
/// `/example.com/a@full@mobile`.
pub fn public_path(target_url: &str, modifiers: &str) -> String {
    let without_scheme = ["https://", "http://"]
        .iter()
        .find_map(|scheme| target_url.strip_prefix(scheme))
        .unwrap_or(target_url)
        .replace('@', "%40");

    let suffix: String = modifiers
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| format!("@{part}"))
        .collect();

    format!("/{without_scheme}{suffix}")
}
