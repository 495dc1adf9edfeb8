//! Nearest-earlier-date lookup over stored screenshot keys.

use std::sync::LazyLock;

use regex::Regex;

use crate::keys::IMAGE_EXTENSION;

static DATED_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^([0-9]{{4}}-[0-9]{{2}}-[0-9]{{2}})\.{}$", regex::escape(IMAGE_EXTENSION))).unwrap()
});

/// The date of a dated snapshot filename such as `2026-01-28.webp`.
pub fn dated_filename(filename: &str) -> Option<&str> {
    DATED_FILENAME
        .captures(filename)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Find the latest dated entry strictly before `before_date`.
///
/// Only keys sitting directly under `prefix` with a `YYYY-MM-DD.<ext>`
/// filename are considered, so `latest.<ext>` and nested objects of other
/// URLs that share the prefix are skipped. Dates compare as strings, which
/// is chronological for the fixed-width format.
pub fn find_nearest<'a, I>(keys: I, prefix: &str, before_date: &str) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    keys.into_iter()
        .filter_map(|key| key.strip_prefix(prefix))
        .filter(|name| !name.contains('/'))
        .filter_map(dated_filename)
        .filter(|date| *date < before_date)
        .max()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "screenshots/https://example.com/default/";

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| format!("{PREFIX}{n}")).collect()
    }

    fn nearest(keys: &[String], before: &str) -> Option<String> {
        find_nearest(keys.iter().map(String::as_str), PREFIX, before)
    }

    #[test]
    fn test_picks_closest_earlier_date() {
        let keys = keys(&["2026-01-20.webp", "2026-01-25.webp", "2026-01-30.webp", "latest.webp"]);
        assert_eq!(nearest(&keys, "2026-01-28").as_deref(), Some("2026-01-25"));
    }

    #[test]
    fn test_exact_date_excluded() {
        let keys = keys(&["2026-01-20.webp", "2026-01-28.webp"]);
        assert_eq!(nearest(&keys, "2026-01-28").as_deref(), Some("2026-01-20"));
    }

    #[test]
    fn test_empty_listing() {
        assert_eq!(nearest(&[], "2026-01-28"), None);
    }

    #[test]
    fn test_all_later() {
        let keys = keys(&["2026-02-01.webp", "2026-03-01.webp"]);
        assert_eq!(nearest(&keys, "2026-01-28"), None);
    }

    #[test]
    fn test_ignores_non_dated_names() {
        let keys = keys(&["latest.webp", "2026-01-2.webp", "2026-01-20.png", "2026-01-20.webp.meta.json", "notes.txt"]);
        assert_eq!(nearest(&keys, "2026-12-31"), None);
    }

    #[test]
    fn test_ignores_nested_keys_sharing_prefix() {
        let mut listed = keys(&["2026-01-10.webp"]);
        listed.push(format!("{PREFIX}sub/default/2026-01-20.webp"));
        assert_eq!(nearest(&listed, "2026-01-28").as_deref(), Some("2026-01-10"));
    }

    #[test]
    fn test_ignores_other_prefixes() {
        let listed = vec!["screenshots/https://other.com/default/2026-01-27.webp".to_string()];
        assert_eq!(nearest(&listed, "2026-01-28"), None);
    }

    #[test]
    fn test_dated_filename() {
        assert_eq!(dated_filename("2026-01-28.webp"), Some("2026-01-28"));
        assert_eq!(dated_filename("latest.webp"), None);
        assert_eq!(dated_filename("2026-01-28xwebp"), None);
    }
}
