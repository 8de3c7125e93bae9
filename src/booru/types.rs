// SPDX-License-Identifier: MPL-2.0

use serde::Deserialize;

/// Decoupled from the provider's wire format so the rest of the app only
/// sees our own types.
#[derive(Debug, Clone)]
pub struct RemotePost {
    /// Id assigned by the remote service; drives cursor comparisons.
    pub post_id: u64,
    pub file_url: String,
    /// Preview candidate chosen from sample/preview/file, skipping videos
    /// when a still image is available. Empty when nothing qualifies.
    pub preview_url: String,
    pub sample_url: String,
    pub tags: String,
    pub rating: String,
    /// Remote-reported publish time, unix seconds.
    pub published_at: i64,
}

/// One raw record of the rule34 search API.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPost {
    pub id: u64,
    #[serde(default)]
    pub file_url: String,
    #[serde(default)]
    pub sample_url: String,
    #[serde(default)]
    pub preview_url: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub rating: String,
    /// Last-change timestamp, unix seconds.
    #[serde(default)]
    pub change: i64,
}

/// One autocomplete suggestion.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSuggestion {
    /// The raw tag value.
    pub value: String,
    /// Display string, e.g. "tag (123)".
    pub label: String,
}

/// Tag suggestion surfaced to the add-tracker picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSuggestion {
    pub value: String,
    pub label: String,
}

/// One page of a paginated tracker search.
#[derive(Debug, Clone)]
pub struct PageQuery<'a> {
    /// Canonical search key.
    pub tag: &'a str,
    /// When true the tag is an uploader name and is prefixed `user:`.
    pub uploader: bool,
    /// Exclusive lower bound on remote ids; 0 means no bound.
    pub cursor: u64,
    /// 0-based page index.
    pub page: u32,
    /// Credentials attached as query parameters when present.
    pub user_id: Option<&'a str>,
    pub api_key: Option<&'a str>,
}
