//! Per-domain custom fetchers. A custom fetcher, if registered for
//! `host(url)`, is authoritative: [`crate::scraping::fetcher::WebContentFetcher`]
//! never falls through to basic/postman/playwright for that host.

pub mod msn;

use async_trait::async_trait;

/// A per-domain override of the generic fetch chain.
#[async_trait]
pub trait CustomFetcher: Send + Sync {
    /// Fetch `url`, returning `(status, body)`. Timeout → 408; any other
    /// error → 500; body is empty on non-200.
    async fn fetch(&self, url: &str) -> (u16, String);
}
