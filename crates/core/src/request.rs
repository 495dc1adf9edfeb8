//! Request-path grammar.
//!
//! A screenshot request path looks like `/<url>(@<modifier>)*`, where each
//! modifier is either one of `full`, `mobile`, `refresh`, `social`
//! (case-insensitive) or a single `YYYY-MM-DD` date.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Separator between the target URL and each suffix token.
pub const MODIFIER_DELIMITER: char = '@';

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").unwrap());

/// A recognized suffix token that changes how a screenshot is captured or keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    /// Capture the whole scrollable page.
    Full,
    /// Use a phone-sized viewport.
    Mobile,
    /// Bypass the cached copy and capture again.
    Refresh,
    /// Capture at link-preview (Open Graph) dimensions.
    Social,
}

impl Modifier {
    pub const ALL: [Modifier; 4] = [Modifier::Full, Modifier::Mobile, Modifier::Refresh, Modifier::Social];

    pub fn as_str(self) -> &'static str {
        match self {
            Modifier::Full => "full",
            Modifier::Mobile => "mobile",
            Modifier::Refresh => "refresh",
            Modifier::Social => "social",
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modifier {
    type Err = Error;

    /// Parse a suffix token, ignoring case.
    ///
    /// The error echoes the token exactly as given.
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.to_lowercase().as_str() {
            "full" => Ok(Modifier::Full),
            "mobile" => Ok(Modifier::Mobile),
            "refresh" => Ok(Modifier::Refresh),
            "social" => Ok(Modifier::Social),
            _ => Err(Error::UnknownModifier(token.to_string())),
        }
    }
}

/// Whether `token` has the fixed-width `YYYY-MM-DD` shape.
///
/// Only the shape is checked; `2026-13-45` is accepted.
pub fn is_date_token(token: &str) -> bool {
    DATE_PATTERN.is_match(token)
}

/// A decoded request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    /// The URL segment exactly as it appeared in the path.
    pub target_url: String,
    /// Modifiers in input order, duplicates kept.
    pub modifiers: Vec<Modifier>,
    /// Requested historical date, absent for "latest".
    pub date: Option<String>,
}

impl ParsedRequest {
    pub fn has(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    /// Modifiers that select a cache slot, i.e. everything except `refresh`, in input order.
    pub fn storage_modifiers(&self) -> Vec<Modifier> {
        self.modifiers.iter().copied().filter(|m| *m != Modifier::Refresh).collect()
    }

    /// Comma-joined storage modifiers, as recorded in object metadata and analytics.
    pub fn modifiers_label(&self) -> String {
        self.storage_modifiers()
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Parse a raw request path into its target URL, modifiers, and optional date.
///
/// One leading `/` is stripped. The target URL is returned verbatim; it is
/// normalized separately.
///
/// # Errors
///
/// - [`Error::NoUrl`] when nothing precedes the first `@`
/// - [`Error::MultipleDates`] when more than one date token is present
/// - [`Error::UnknownModifier`] for any other unrecognized token
pub fn parse_request(path: &str) -> Result<ParsedRequest, Error> {
    let rest = path.strip_prefix('/').unwrap_or(path);

    let mut segments = rest.split(MODIFIER_DELIMITER);
    let target_url = segments.next().unwrap_or_default();
    if target_url.is_empty() {
        return Err(Error::NoUrl);
    }

    let (modifiers, date) = segments.try_fold(
        (Vec::new(), None::<String>),
        |(mut modifiers, date), token| -> Result<_, Error> {
            if is_date_token(token) {
                if date.is_some() {
                    return Err(Error::MultipleDates);
                }
                return Ok((modifiers, Some(token.to_string())));
            }
            modifiers.push(token.parse::<Modifier>()?);
            Ok((modifiers, date))
        },
    )?;

    Ok(ParsedRequest { target_url: target_url.to_string(), modifiers, date })
}
