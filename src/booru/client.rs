// SPDX-License-Identifier: MPL-2.0

use crate::booru::ProviderError;
use crate::booru::types::{PageQuery, RawPost, RawSuggestion, RemotePost, TagSuggestion};
use crate::config::{
    AUTOCOMPLETE_ENDPOINT, AUTOCOMPLETE_TIMEOUT, DEFAULT_API_ENDPOINT, PAGE_SIZE, REQUEST_TIMEOUT,
    USER_AGENT,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::future::Future;
use url::Url;

/// Media URLs the gallery cannot thumbnail directly.
static VIDEO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(webm|mp4|mov)(\?|$)").expect("invalid video regex"));

/// Capability set of a booru backend. One implementation per provider,
/// selected by configuration.
pub trait BooruProvider: Send + Sync {
    /// Fetch one page of posts for a tracker search.
    fn fetch_page(
        &self,
        query: &PageQuery<'_>,
    ) -> impl Future<Output = Result<Vec<RemotePost>, ProviderError>> + Send;

    /// Look up tag suggestions for partial user input.
    fn search_tags(
        &self,
        input: &str,
    ) -> impl Future<Output = Result<Vec<TagSuggestion>, ProviderError>> + Send;
}

impl<T: BooruProvider + ?Sized> BooruProvider for std::sync::Arc<T> {
    fn fetch_page(
        &self,
        query: &PageQuery<'_>,
    ) -> impl Future<Output = Result<Vec<RemotePost>, ProviderError>> + Send {
        (**self).fetch_page(query)
    }

    fn search_tags(
        &self,
        input: &str,
    ) -> impl Future<Output = Result<Vec<TagSuggestion>, ProviderError>> + Send {
        (**self).search_tags(input)
    }
}

/// Client for the rule34 JSON API.
pub struct Rule34Client {
    http: reqwest::Client,
    search_url: Url,
    autocomplete_url: Url,
}

impl Rule34Client {
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_endpoints(DEFAULT_API_ENDPOINT, AUTOCOMPLETE_ENDPOINT)
    }

    pub fn with_endpoints(search: &str, autocomplete: &str) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self {
            http,
            search_url: Url::parse(search)
                .map_err(|e| ProviderError::InvalidResponse(format!("bad endpoint: {}", e)))?,
            autocomplete_url: Url::parse(autocomplete)
                .map_err(|e| ProviderError::InvalidResponse(format!("bad endpoint: {}", e)))?,
        })
    }
}

impl BooruProvider for Rule34Client {
    async fn fetch_page(&self, query: &PageQuery<'_>) -> Result<Vec<RemotePost>, ProviderError> {
        let mut url = self.search_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("page", "dapi")
                .append_pair("s", "post")
                .append_pair("q", "index")
                .append_pair("limit", &PAGE_SIZE.to_string())
                .append_pair("pid", &query.page.to_string())
                .append_pair("tags", &search_expression(query))
                .append_pair("json", "1");

            if let (Some(user_id), Some(api_key)) = (query.user_id, query.api_key) {
                pairs
                    .append_pair("user_id", user_id)
                    .append_pair("api_key", api_key);
            }
        }

        let response = self
            .http
            .get(url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                context: format!("page {} of '{}'", query.page, query.tag),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        parse_posts(&body)
    }

    async fn search_tags(&self, input: &str) -> Result<Vec<TagSuggestion>, ProviderError> {
        let trimmed = input.trim();
        if trimmed.len() < 2 {
            return Ok(Vec::new());
        }

        let mut url = self.autocomplete_url.clone();
        url.query_pairs_mut().append_pair("q", trimmed);

        let response = self
            .http
            .get(url)
            .timeout(AUTOCOMPLETE_TIMEOUT)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                context: format!("autocomplete '{}'", trimmed),
            });
        }

        let suggestions: Vec<RawSuggestion> = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(suggestions
            .into_iter()
            .map(|s| TagSuggestion {
                value: s.value,
                label: s.label,
            })
            .collect())
    }
}

/// Build the `tags` search expression: `{prefix}{tag}{id filter}`.
fn search_expression(query: &PageQuery<'_>) -> String {
    let prefix = if query.uploader { "user:" } else { "" };
    if query.cursor > 0 {
        format!("{}{} id:>{}", prefix, query.tag, query.cursor)
    } else {
        format!("{}{}", prefix, query.tag)
    }
}

/// Parse a search response body into normalized posts.
///
/// The API answers an exhausted search with an empty body rather than an
/// empty array, so that case is a valid empty page.
fn parse_posts(body: &str) -> Result<Vec<RemotePost>, ProviderError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let raw: Vec<RawPost> = serde_json::from_str(body)
        .map_err(|e| ProviderError::InvalidResponse(format!("not a post list: {}", e)))?;

    Ok(raw.into_iter().map(normalize_post).collect())
}

fn normalize_post(raw: RawPost) -> RemotePost {
    let preview_url = pick_preview_url(&raw);
    let sample_url = if raw.sample_url.is_empty() {
        raw.file_url.clone()
    } else {
        raw.sample_url
    };

    RemotePost {
        post_id: raw.id,
        file_url: raw.file_url,
        preview_url,
        sample_url,
        tags: raw.tags,
        rating: raw.rating,
        published_at: raw.change,
    }
}

fn is_video(url: &str) -> bool {
    !url.is_empty() && VIDEO_RE.is_match(url)
}

/// Preview selection: prefer sample, then preview, then file, skipping any
/// candidate that is a video. Empty when every candidate is a video.
fn pick_preview_url(raw: &RawPost) -> String {
    for candidate in [&raw.sample_url, &raw.preview_url, &raw.file_url] {
        if !candidate.is_empty() && !is_video(candidate) {
            return candidate.clone();
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(sample: &str, preview: &str, file: &str) -> RawPost {
        RawPost {
            id: 1,
            file_url: file.to_string(),
            sample_url: sample.to_string(),
            preview_url: preview.to_string(),
            tags: String::new(),
            rating: String::new(),
            change: 0,
        }
    }

    fn query(tag: &str, uploader: bool, cursor: u64) -> String {
        search_expression(&PageQuery {
            tag,
            uploader,
            cursor,
            page: 0,
            user_id: None,
            api_key: None,
        })
    }

    #[test]
    fn expression_plain_tag() {
        assert_eq!(query("long_hair", false, 0), "long_hair");
    }

    #[test]
    fn expression_with_cursor() {
        assert_eq!(query("long_hair", false, 4200), "long_hair id:>4200");
    }

    #[test]
    fn expression_uploader_prefix() {
        assert_eq!(query("someone", true, 7), "user:someone id:>7");
    }

    #[test]
    fn preview_prefers_sample() {
        let p = pick_preview_url(&raw("https://s.jpg", "https://p.jpg", "https://f.png"));
        assert_eq!(p, "https://s.jpg");
    }

    #[test]
    fn preview_skips_video_sample() {
        let p = pick_preview_url(&raw("https://s.mp4", "https://p.jpg", "https://f.webm"));
        assert_eq!(p, "https://p.jpg");
    }

    #[test]
    fn preview_empty_when_all_video() {
        let p = pick_preview_url(&raw("https://s.mp4", "https://p.webm?x=1", "https://f.mov"));
        assert_eq!(p, "");
    }

    #[test]
    fn video_match_is_case_insensitive_and_query_aware() {
        assert!(is_video("https://x/clip.WEBM"));
        assert!(is_video("https://x/clip.mp4?token=abc"));
        assert!(!is_video("https://x/clip.mp4.jpg"));
        assert!(!is_video(""));
    }

    #[test]
    fn empty_body_is_empty_page() {
        assert!(parse_posts("").unwrap().is_empty());
        assert!(parse_posts("  \n").unwrap().is_empty());
    }

    #[test]
    fn non_array_body_is_invalid() {
        let err = parse_posts(r#"{"success": false}"#).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[test]
    fn parses_and_normalizes_posts() {
        let body = r#"[
            {"id": 42, "file_url": "https://f.png", "sample_url": "",
             "preview_url": "https://p.jpg", "tags": "a b", "rating": "s",
             "change": 1700000000}
        ]"#;

        let posts = parse_posts(body).unwrap();
        assert_eq!(posts.len(), 1);
        let post = &posts[0];
        assert_eq!(post.post_id, 42);
        assert_eq!(post.preview_url, "https://p.jpg");
        // Sample falls back to the file URL when the API omits it.
        assert_eq!(post.sample_url, "https://f.png");
        assert_eq!(post.published_at, 1_700_000_000);
    }

    #[test]
    fn missing_fields_default() {
        let posts = parse_posts(r#"[{"id": 7}]"#).unwrap();
        assert_eq!(posts[0].post_id, 7);
        assert_eq!(posts[0].file_url, "");
        assert_eq!(posts[0].published_at, 0);
    }
}
