//! Storage key layout.
//!
//! ```text
//! screenshots/<normalizedUrl>/<default|mod-mod>/<latest|YYYY-MM-DD>.webp
//! ratelimit/<YYYY-MM-DD>/<normalizedUrl>/<default|mod-mod>
//! ```

use crate::request::Modifier;

/// Root of every screenshot object.
pub const SCREENSHOT_ROOT: &str = "screenshots";

/// Root of every refresh-throttle marker.
pub const RATE_LIMIT_ROOT: &str = "ratelimit";

/// File extension of stored images.
pub const IMAGE_EXTENSION: &str = "webp";

/// MIME type of stored images.
pub const IMAGE_CONTENT_TYPE: &str = "image/webp";

/// Filename stem of the most recent capture.
pub const LATEST_STEM: &str = "latest";

/// Modifier segment used when no slot-selecting modifier is present.
pub const DEFAULT_MODIFIER_PART: &str = "default";

/// The modifier segment of a key.
///
/// `refresh` never contributes. The rest are sorted alphabetically and
/// joined with `-`; repeats are kept.
pub fn modifier_part(modifiers: &[Modifier]) -> String {
    let mut names: Vec<&str> = modifiers
        .iter()
        .filter(|m| **m != Modifier::Refresh)
        .map(|m| m.as_str())
        .collect();

    if names.is_empty() {
        return DEFAULT_MODIFIER_PART.to_string();
    }

    names.sort_unstable();
    names.join("-")
}

/// Build the storage key for a screenshot.
///
/// `normalized_url` must already be canonical; no normalization happens here.
pub fn build_key(normalized_url: &str, modifiers: &[Modifier], date: Option<&str>) -> String {
    let stem = date.unwrap_or(LATEST_STEM);
    format!(
        "{SCREENSHOT_ROOT}/{normalized_url}/{}/{stem}.{IMAGE_EXTENSION}",
        modifier_part(modifiers)
    )
}

/// Everything up to and including the final `/` of `key`.
pub fn key_prefix(key: &str) -> &str {
    match key.rfind('/') {
        Some(idx) => &key[..=idx],
        None => "",
    }
}

/// Swap the filename of a screenshot key for a dated one.
pub fn dated_key(key: &str, date: &str) -> String {
    format!("{}{date}.{IMAGE_EXTENSION}", key_prefix(key))
}

/// Marker key for the once-per-day refresh throttle.
pub fn rate_limit_key(today: &str, normalized_url: &str, modifiers: &[Modifier]) -> String {
    format!("{RATE_LIMIT_ROOT}/{today}/{normalized_url}/{}", modifier_part(modifiers))
}
