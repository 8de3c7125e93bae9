// SPDX-License-Identifier: MPL-2.0

//! Canonical tag handling.
//!
//! Trackers are keyed by a normalized tag so that "Artist Name (123)",
//! "#artist_name" and "user:Artist_Name" all collapse to the same key.

use once_cell::sync::Lazy;
use regex::Regex;

/// Trailing post-count suffix as rendered by autocomplete, e.g. "tag (1234)".
static COUNT_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(\d+\)\s*$").expect("invalid count suffix regex"));

/// Leading `user:` prefix, case-insensitive.
static USER_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^user:").expect("invalid user prefix regex"));

/// Normalize user input into a canonical search tag.
///
/// Lowercases, strips a leading `#` or `user:`, strips a trailing
/// post-count suffix, and replaces whitespace runs with underscores.
pub fn normalize_tag(input: &str) -> String {
    let trimmed = input.trim();
    let no_hash = trimmed.strip_prefix('#').unwrap_or(trimmed).trim_start();
    let no_user = USER_PREFIX.replace(no_hash, "");
    let no_count = COUNT_SUFFIX.replace(&no_user, "");

    no_count
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}
