//! Core data model: [`DiscoveryItem`], [`ExtractedContent`], [`Article`], and the
//! telemetry record types. Mirrors the field/invariant table in the design doc —
//! see `Article::compose` for the DiscoveryItem/ExtractedContent merge rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The fixed `schema_version` stamped onto every `Article` this pipeline emits.
pub const SCHEMA_VERSION: &str = "1.0";

/// A single trending-news result as returned by a [`crate::news_source::NewsSource`].
///
/// Immutable once constructed; lives only for the duration of one market batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryItem {
    pub title: String,
    pub url: String,
    pub description: String,
    pub date_published: DateTime<Utc>,
    pub provider: String,
    pub origin_country: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub source_api: String,
}

impl DiscoveryItem {
    /// True when every required field is non-empty. Items failing this are
    /// skipped by the news source's own response mapping, not by the pipeline.
    pub fn has_required_fields(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.url.trim().is_empty()
            && !self.description.trim().is_empty()
            && !self.provider.trim().is_empty()
            && !self.origin_country.trim().is_empty()
            && !self.source_api.trim().is_empty()
    }

    /// The `host` component of `url`, lowercased. Used for custom-fetcher lookup
    /// and as the provider key in build telemetry.
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
    }
}

/// Output of [`crate::extraction::ArticleExtractor`]. Mutable until it is frozen
/// into an `Article`; lives only during a single build.
#[derive(Debug, Clone, Default)]
pub struct ExtractedContent {
    pub cleaned_text: String,
    pub meta_lang: Option<String>,
    pub meta_keywords: String,
    pub authors: Vec<String>,
    pub top_image: Option<String>,
}

impl ExtractedContent {
    pub fn is_empty(&self) -> bool {
        self.cleaned_text.trim().is_empty()
    }
}

/// The persisted record. Constructed once by [`Article::compose`] and never
/// mutated by this system after that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub description: String,
    pub date_published: DateTime<Utc>,
    pub provider: String,
    pub content: String,
    pub origin_country: String,
    pub source_api: String,
    pub schema_version: String,
    pub date_scraped: DateTime<Utc>,
    pub post_processed: bool,

    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub related_countries: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Raised when `Article::compose` cannot produce a record satisfying the
/// invariants in §3 of the design doc (missing required field, malformed URL,
/// out-of-range content length, etc).
#[derive(Debug, thiserror::Error)]
pub enum ArticleCompositionError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("url does not start with http:// or https://: {0}")]
    InvalidUrl(String),
    #[error("origin_country is not two uppercase letters: {0}")]
    InvalidCountry(String),
    #[error("language is not two lowercase letters: {0}")]
    InvalidLanguage(String),
    #[error("image_url does not start with http:// or https://: {0}")]
    InvalidImageUrl(String),
    #[error("content length {len} outside [{min}, {max}]")]
    ContentLengthOutOfRange { len: usize, min: usize, max: usize },
}

impl Article {
    /// Merge a `DiscoveryItem` (authoritative for metadata) with an
    /// `ExtractedContent` (authoritative for body/authors, and a fallback for
    /// language/image) into a validated `Article`.
    ///
    /// Field authority, per the design doc §4.5:
    /// - DiscoveryItem: title, url, description, date_published, provider,
    ///   origin_country, source_api.
    /// - ExtractedContent: content, authors.
    /// - language: DiscoveryItem wins if present, else ExtractedContent.meta_lang.
    /// - image_url: DiscoveryItem wins if present, else ExtractedContent.top_image.
    /// - keywords: ExtractedContent.meta_keywords split on whitespace.
    pub fn compose(
        item: &DiscoveryItem,
        extracted: &ExtractedContent,
        min_content_len: usize,
        max_content_len: usize,
        now: DateTime<Utc>,
    ) -> Result<Article, ArticleCompositionError> {
        if !item.has_required_fields() {
            return Err(ArticleCompositionError::MissingField("discovery item"));
        }
        if !item.url.starts_with("http://") && !item.url.starts_with("https://") {
            return Err(ArticleCompositionError::InvalidUrl(item.url.clone()));
        }
        if !is_two_uppercase_letters(&item.origin_country) {
            return Err(ArticleCompositionError::InvalidCountry(
                item.origin_country.clone(),
            ));
        }

        let language = item.language.clone().or_else(|| extracted.meta_lang.clone());
        if let Some(lang) = &language {
            if !is_two_lowercase_letters(lang) {
                return Err(ArticleCompositionError::InvalidLanguage(lang.clone()));
            }
        }

        let image_url = item.image_url.clone().or_else(|| extracted.top_image.clone());
        if let Some(img) = &image_url {
            if !img.starts_with("http://") && !img.starts_with("https://") {
                return Err(ArticleCompositionError::InvalidImageUrl(img.clone()));
            }
        }

        let content_len = extracted.cleaned_text.chars().count();
        if content_len < min_content_len || content_len > max_content_len {
            return Err(ArticleCompositionError::ContentLengthOutOfRange {
                len: content_len,
                min: min_content_len,
                max: max_content_len,
            });
        }

        let keywords = if extracted.meta_keywords.trim().is_empty() {
            Vec::new()
        } else {
            extracted
                .meta_keywords
                .split_whitespace()
                .map(|s| s.to_string())
                .collect()
        };

        Ok(Article {
            title: item.title.clone(),
            url: item.url.clone(),
            description: item.description.clone(),
            date_published: item.date_published,
            provider: item.provider.clone(),
            content: extracted.cleaned_text.clone(),
            origin_country: item.origin_country.clone(),
            source_api: item.source_api.clone(),
            schema_version: SCHEMA_VERSION.to_string(),
            date_scraped: now,
            post_processed: false,
            language,
            keywords,
            category: None,
            authors: extracted.authors.clone(),
            related_countries: Vec::new(),
            image_url,
        })
    }
}

fn is_two_uppercase_letters(s: &str) -> bool {
    s.len() == 2 && s.chars().all(|c| c.is_ascii_uppercase())
}

fn is_two_lowercase_letters(s: &str) -> bool {
    s.len() == 2 && s.chars().all(|c| c.is_ascii_lowercase())
}

/// Identifier of a row inserted by the store adapter — whatever the underlying
/// store hands back (an ObjectId as a string, in the Mongo-backed adapter).
pub type PersistedId = String;

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> DiscoveryItem {
        DiscoveryItem {
            title: "Title".into(),
            url: "https://example.com/a".into(),
            description: "Desc".into(),
            date_published: Utc::now(),
            provider: "Example".into(),
            origin_country: "GB".into(),
            language: None,
            image_url: None,
            source_api: "bing".into(),
        }
    }

    fn extracted(text: &str) -> ExtractedContent {
        ExtractedContent {
            cleaned_text: text.to_string(),
            meta_lang: Some("en".into()),
            meta_keywords: "alpha beta".into(),
            authors: vec!["Jane Doe".into()],
            top_image: None,
        }
    }

    #[test]
    fn compose_ok_sets_invariant_fields() {
        let body = "x".repeat(200);
        let a = Article::compose(&item(), &extracted(&body), 100, 5000, Utc::now()).unwrap();
        assert!(a.url.starts_with("https://"));
        assert_eq!(a.origin_country, "GB");
        assert_eq!(a.language.as_deref(), Some("en"));
        assert!(!a.post_processed);
        assert_eq!(a.keywords, vec!["alpha", "beta"]);
    }

    #[test]
    fn compose_rejects_content_below_minimum() {
        let err = Article::compose(&item(), &extracted("short"), 100, 5000, Utc::now()).unwrap_err();
        assert!(matches!(err, ArticleCompositionError::ContentLengthOutOfRange { .. }));
    }

    #[test]
    fn compose_rejects_bad_country() {
        let mut i = item();
        i.origin_country = "gb".into();
        let body = "x".repeat(200);
        let err = Article::compose(&i, &extracted(&body), 100, 5000, Utc::now()).unwrap_err();
        assert!(matches!(err, ArticleCompositionError::InvalidCountry(_)));
    }

    #[test]
    fn discovery_item_host_lowercases() {
        let mut i = item();
        i.url = "https://WWW.MSN.com/Article".into();
        assert_eq!(i.host().as_deref(), Some("www.msn.com"));
    }
}
