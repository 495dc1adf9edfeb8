//! URL canonicalization for cache-key identity.
//!
//! Two requests that only differ in scheme default, letter case, query
//! string or fragment must land on the same cache entry.
//!
//! Normalization steps:
//! 1. Trim surrounding whitespace
//! 2. Default scheme to `https://` if missing
//! 3. Lowercase the host (port kept when non-default)
//! 4. Percent-decode and lowercase the path (non-ASCII stays literal)
//! 5. Collapse a lone `/` path to the empty string
//! 6. Drop query and fragment

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use crate::Error;

/// Characters that stay escaped after decoding a path segment, because a
/// literal copy would change the meaning of the URL when it is parsed again.
const REPARSE_SENSITIVE: &AsciiSet = &CONTROLS.add(b'%').add(b'?').add(b'#').add(b'/').add(b'\\');

/// Canonicalize a target URL into the form used inside cache keys.
///
/// The result has the shape `scheme://host[:port]path` and is idempotent:
/// normalizing an already-normalized URL returns it unchanged.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] when the input cannot be parsed as a URL
/// or has no host.
pub fn normalize_url(input: &str) -> Result<String, Error> {
    let trimmed = input.trim();

    let full = if has_http_scheme(trimmed) { trimmed.to_string() } else { format!("https://{trimmed}") };

    let parsed = url::Url::parse(&full).map_err(|e| Error::InvalidUrl(format!("{trimmed}: {e}")))?;

    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| Error::InvalidUrl(format!("{trimmed}: missing host")))?
        .to_lowercase();

    let port = parsed.port().map(|p| format!(":{p}")).unwrap_or_default();

    let mut path = decode_path(parsed.path());
    if path == "/" {
        path.clear();
    }

    Ok(format!("{}://{host}{port}{path}", parsed.scheme()))
}

fn has_http_scheme(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Decode and lowercase each path segment, then escape only the ASCII
/// characters in [`REPARSE_SENSITIVE`] and trailing spaces, which a URL
/// parser would trim. Everything else, non-ASCII included, stays literal.
fn decode_path(path: &str) -> String {
    let decoded = path
        .split('/')
        .map(|segment| {
            let segment = percent_decode_str(segment).decode_utf8_lossy().to_lowercase();
            segment.chars().map(escape_reparse_sensitive).collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("/");

    let kept = decoded.trim_end_matches(' ');
    let trailing = decoded.len() - kept.len();
    format!("{kept}{}", "%20".repeat(trailing))
}

fn escape_reparse_sensitive(c: char) -> String {
    if !c.is_ascii() {
        return c.to_string();
    }
    let mut buf = [0u8; 4];
    utf8_percent_encode(c.encode_utf8(&mut buf), REPARSE_SENSITIVE).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adds_https_when_missing() {
        assert_eq!(normalize_url("example.com").unwrap(), "https://example.com");
    }

    #[test]
    fn test_preserves_existing_scheme() {
        assert_eq!(normalize_url("https://example.com").unwrap(), "https://example.com");
        assert_eq!(normalize_url("http://example.com").unwrap(), "http://example.com");
    }

    #[test]
    fn test_scheme_detection_ignores_case() {
        assert_eq!(normalize_url("HTTP://Example.com").unwrap(), "http://example.com");
    }

    #[test]
    fn test_lowercases_host() {
        assert_eq!(normalize_url("https://EXAMPLE.COM").unwrap(), "https://example.com");
        assert_eq!(normalize_url("EXAMPLE.COM").unwrap(), normalize_url("https://example.com").unwrap());
    }

    #[test]
    fn test_lowercases_path() {
        assert_eq!(normalize_url("https://example.com/Page").unwrap(), "https://example.com/page");
    }

    #[test]
    fn test_strips_query_and_fragment() {
        assert_eq!(normalize_url("https://example.com?foo=bar").unwrap(), "https://example.com");
        assert_eq!(normalize_url("https://example.com#section").unwrap(), "https://example.com");
        assert_eq!(normalize_url("https://example.com/Page?x=1#y").unwrap(), "https://example.com/page");
    }

    #[test]
    fn test_decodes_path() {
        assert_eq!(normalize_url("https://example.com/my%20page").unwrap(), "https://example.com/my page");
        assert_eq!(
            normalize_url("https://Example.COM/My%20Page?utm_source=twitter#section").unwrap(),
            "https://example.com/my page"
        );
    }

    #[test]
    fn test_keeps_port() {
        assert_eq!(normalize_url("http://Example.com:8080/").unwrap(), "http://example.com:8080");
        assert_eq!(normalize_url("https://example.com:443/a").unwrap(), "https://example.com/a");
    }

    #[test]
    fn test_keeps_non_root_trailing_slash() {
        assert_eq!(normalize_url("https://example.com/docs/").unwrap(), "https://example.com/docs/");
    }

    #[test]
    fn test_keeps_reparse_sensitive_escapes() {
        assert_eq!(normalize_url("https://example.com/a%3Fb").unwrap(), "https://example.com/a%3Fb");
        assert_eq!(normalize_url("https://example.com/100%25").unwrap(), "https://example.com/100%25");
        assert_eq!(normalize_url("https://example.com/a%2F..%2Fb").unwrap(), "https://example.com/a%2F..%2Fb");
        assert_eq!(normalize_url("https://example.com/a%2f").unwrap(), "https://example.com/a%2F");
    }

    #[test]
    fn test_non_ascii_path_decoded_and_lowercased() {
        let upper = normalize_url("https://example.com/CAFÉ").unwrap();
        let encoded = normalize_url("https://example.com/caf%C3%A9").unwrap();
        let encoded_upper = normalize_url("example.com/CAF%C3%89").unwrap();

        assert_eq!(upper, "https://example.com/café");
        assert_eq!(encoded, "https://example.com/café");
        assert_eq!(encoded_upper, "https://example.com/café");
        assert_eq!(normalize_url("https://example.com/%E2%9C%93").unwrap(), "https://example.com/✓");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "EXAMPLE.COM",
            "https://example.com/Page?x=1#y",
            "https://Example.COM/My%20Page?utm_source=twitter#section",
            "http://example.com:8080/A/B/",
            "example.com/%E2%9C%93/caf%C3%A9",
            "https://example.com/a%3Fb%23c",
            "https://example.com/100%2541",
            "https://example.com/trailing%20%20",
            "https://example.com/a%2F..%2Fb",
            "https://example.com/%09tab",
            "https://example.com/CAFÉ/Ünïcode",
            "https://example.com/a%40b",
        ];
        for input in inputs {
            let once = normalize_url(input).unwrap();
            let twice = normalize_url(&once).unwrap();
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[test]
    fn test_invalid_url_fails_closed() {
        assert!(matches!(normalize_url("https://"), Err(Error::InvalidUrl(_))));
        assert!(matches!(normalize_url("exa mple.com"), Err(Error::InvalidUrl(_))));
        assert!(matches!(normalize_url(""), Err(Error::InvalidUrl(_))));
    }
}
