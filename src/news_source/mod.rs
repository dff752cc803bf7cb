//! The `NewsSource` contract: per-country trending-article discovery.
//!
//! Grounded on `original_source/globe_news_scraper/data_providers/news_sources/base.py`
//! (the abstract base class) generalized per REDESIGN FLAGS §9 into a plain Rust
//! trait — concrete sources are stateless aside from their own configuration, so
//! no factory indirection is needed beyond a typed `Vec<Arc<dyn NewsSource>>`
//! built once at startup.

pub mod bing;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::DiscoveryItem;

/// Distinguished subtype of [`NewsSourceError`] for HTTP 429 responses —
/// the only error the retry combinator in [`bing::BingNewsSource`] retries.
#[derive(Debug, Error)]
#[error("news source rate limited: {0}")]
pub struct RateLimitError(pub String);

/// Failure from a news-search API call. Rate-limit responses are kept as a
/// distinguished variant so callers (and the retry combinator in each
/// concrete `NewsSource`) can tell "exhausted retries on a rate limit" apart
/// from any other transport/decode failure.
#[derive(Debug, Error)]
pub enum NewsSourceError {
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),
    #[error("news source error: {0}")]
    Other(String),
}

impl NewsSourceError {
    pub fn other(msg: impl Into<String>) -> Self {
        NewsSourceError::Other(msg.into())
    }
}

/// Per-country trending-article discovery, with retry-on-rate-limit left to
/// each implementation (the original's `tenacity` decorator is reimplemented
/// per source using the `backoff` crate already in the dependency stack).
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// `country_market` is a `"<lang>-<COUNTRY>"` tag, e.g. `"en-GB"`.
    async fn trending(&self, country_market: &str) -> Result<Vec<DiscoveryItem>, NewsSourceError>;

    /// The markets this source is configured to iterate.
    fn available_markets(&self) -> Vec<String>;

    /// A stable identifier for this source, used in logs and telemetry.
    fn name(&self) -> &'static str;
}
