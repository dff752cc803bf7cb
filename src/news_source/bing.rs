//! Bing-news-like reference `NewsSource` implementation.
//!
//! Grounded directly on `original_source/.../news_sources/bing_news.py`: GET
//! `{endpoint}/v7.0/news?mkt=...&sortBy=Relevance&safeSearch=Off` with the
//! subscription key in `Ocp-Apim-Subscription-Key`; 429 → `NewsSourceError::RateLimited`,
//! other 4xx/5xx → `NewsSourceError::Other`; 1-second sleep after a successful
//! request (client-side rate shaping); retry-on-rate-limit via the `backoff`
//! crate rather than the original's `tenacity` decorator, per REDESIGN FLAGS §9.

use std::time::Duration;

use async_trait::async_trait;
use backoff::{future::retry, Error as BackoffError, ExponentialBackoffBuilder};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::core::types::DiscoveryItem;
use crate::news_source::{NewsSource, NewsSourceError, RateLimitError};

/// Minimum/maximum backoff interval between retries, per the design doc's
/// "exponential backoff between 4s and 10s".
const BACKOFF_MIN: Duration = Duration::from_secs(4);
const BACKOFF_MAX: Duration = Duration::from_secs(10);
/// At most 3 attempts total (the original's `stop_after_attempt(3)`).
const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Deserialize)]
struct BingNewsResponse {
    #[serde(default)]
    value: Vec<BingNewsArticle>,
}

#[derive(Debug, Deserialize)]
struct BingNewsArticle {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    description: Option<String>,
    #[serde(rename = "datePublished")]
    date_published: Option<String>,
    #[serde(default)]
    provider: Vec<BingProvider>,
    image: Option<BingImage>,
}

#[derive(Debug, Deserialize)]
struct BingProvider {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BingImage {
    thumbnail: Option<BingThumbnail>,
}

#[derive(Debug, Deserialize)]
struct BingThumbnail {
    #[serde(rename = "contentUrl")]
    content_url: Option<String>,
}

/// One of the two outcomes a single Bing request can produce that the retry
/// combinator needs to distinguish: rate-limited (retry) vs anything else
/// (fail immediately).
enum BingFetchError {
    RateLimit(String),
    Other(String),
}

pub struct BingNewsSource {
    client: Client,
    endpoint: String,
    subscription_key: String,
    markets: Vec<String>,
}

impl BingNewsSource {
    pub fn new(endpoint: String, subscription_key: String, markets: Vec<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            subscription_key,
            markets,
        }
    }

    async fn fetch_once(&self, mkt: &str) -> Result<BingNewsResponse, BingFetchError> {
        let url = format!("{}/v7.0/news", self.endpoint.trim_end_matches('/'));
        let resp = self
            .client
            .get(&url)
            .header("Ocp-Apim-Subscription-Key", &self.subscription_key)
            .query(&[
                ("mkt", mkt),
                ("sortBy", "Relevance"),
                ("safeSearch", "Off"),
            ])
            .send()
            .await
            .map_err(|e| BingFetchError::Other(e.to_string()))?;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(BingFetchError::RateLimit(format!(
                "rate limit exceeded for mkt={mkt}"
            )));
        }
        if !status.is_success() {
            return Err(BingFetchError::Other(format!(
                "Bing News API request failed: HTTP {status}"
            )));
        }

        resp.json::<BingNewsResponse>()
            .await
            .map_err(|e| BingFetchError::Other(format!("failed to decode response: {e}")))
    }

    fn map_response(&self, response: BingNewsResponse, cc: &str, lang: &str) -> Vec<DiscoveryItem> {
        response
            .value
            .into_iter()
            .filter_map(|article| {
                let provider = article.provider.first().and_then(|p| p.name.clone())?;
                let date_published: DateTime<Utc> = article
                    .date_published
                    .as_deref()
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    .map(|dt| dt.with_timezone(&Utc))?;

                let image_url = article
                    .image
                    .and_then(|i| i.thumbnail)
                    .and_then(|t| t.content_url)
                    .and_then(|u| u.split('&').next().map(|s| s.to_string()))
                    .filter(|s| !s.is_empty());

                let item = DiscoveryItem {
                    title: article.name,
                    url: article.url,
                    description: article.description.unwrap_or_default(),
                    date_published,
                    provider,
                    origin_country: cc.to_string(),
                    language: Some(lang.to_string()),
                    image_url,
                    source_api: self.name().to_string(),
                };

                item.has_required_fields().then_some(item)
            })
            .collect()
    }
}

#[async_trait]
impl NewsSource for BingNewsSource {
    async fn trending(&self, country_market: &str) -> Result<Vec<DiscoveryItem>, NewsSourceError> {
        let (lang, cc) = country_market.split_once('-').ok_or_else(|| {
            NewsSourceError::other(format!("invalid mkt param: {country_market}"))
        })?;
        let cc = cc.to_ascii_uppercase();
        let lang = lang.to_ascii_lowercase();

        let backoff_policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(BACKOFF_MIN)
            .with_max_interval(BACKOFF_MAX)
            .with_max_elapsed_time(Some(BACKOFF_MAX * MAX_ATTEMPTS))
            .build();

        let attempt = std::sync::atomic::AtomicU32::new(0);
        let response = retry(backoff_policy, || async {
            let n = attempt.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            info!(mkt = country_market, attempt = n, "requesting trending news");
            if n > MAX_ATTEMPTS {
                return Err(BackoffError::permanent(BingFetchError::Other(
                    "exceeded max retry attempts".to_string(),
                )));
            }
            match self.fetch_once(country_market).await {
                Ok(resp) => Ok(resp),
                Err(BingFetchError::RateLimit(msg)) => {
                    Err(BackoffError::transient(BingFetchError::RateLimit(msg)))
                }
                Err(other) => Err(BackoffError::permanent(other)),
            }
        })
        .await
        .map_err(|e| match e {
            BingFetchError::RateLimit(msg) => NewsSourceError::RateLimited(RateLimitError(msg)),
            BingFetchError::Other(msg) => NewsSourceError::other(msg),
        })?;

        // Client-side rate shaping: sleep after every successful request.
        tokio::time::sleep(Duration::from_secs(1)).await;

        Ok(self.map_response(response, &cc, &lang))
    }

    fn available_markets(&self) -> Vec<String> {
        self.markets.clone()
    }

    fn name(&self) -> &'static str {
        "BingNewsSource"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_variant_is_distinguishable_from_other() {
        let rate_limited = NewsSourceError::RateLimited(RateLimitError("rate limit exceeded for mkt=en-GB".into()));
        let other = NewsSourceError::other("boom");
        assert!(matches!(rate_limited, NewsSourceError::RateLimited(_)));
        assert!(matches!(other, NewsSourceError::Other(_)));
    }

    #[test]
    fn market_tag_splits_into_lang_and_country() {
        let source = BingNewsSource::new(
            "https://api.bing.microsoft.com".to_string(),
            "key".to_string(),
            vec!["en-GB".to_string()],
        );
        assert_eq!(source.available_markets(), vec!["en-GB".to_string()]);
    }

    #[test]
    fn map_response_skips_items_missing_provider() {
        let source = BingNewsSource::new(
            "https://api.bing.microsoft.com".to_string(),
            "key".to_string(),
            vec![],
        );
        let response = BingNewsResponse {
            value: vec![BingNewsArticle {
                name: "Title".to_string(),
                url: "https://example.com/a".to_string(),
                description: Some("desc".to_string()),
                date_published: Some("2024-01-01T00:00:00Z".to_string()),
                provider: vec![],
                image: None,
            }],
        };
        let items = source.map_response(response, "GB", "en");
        assert!(items.is_empty());
    }

    #[test]
    fn map_response_accepts_well_formed_article() {
        let source = BingNewsSource::new(
            "https://api.bing.microsoft.com".to_string(),
            "key".to_string(),
            vec![],
        );
        let response = BingNewsResponse {
            value: vec![BingNewsArticle {
                name: "Title".to_string(),
                url: "https://example.com/a".to_string(),
                description: Some("desc".to_string()),
                date_published: Some("2024-01-01T00:00:00Z".to_string()),
                provider: vec![BingProvider {
                    name: Some("Example Provider".to_string()),
                }],
                image: Some(BingImage {
                    thumbnail: Some(BingThumbnail {
                        content_url: Some("https://img.example.com/x.jpg&w=200".to_string()),
                    }),
                }),
            }],
        };
        let items = source.map_response(response, "GB", "en");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].origin_country, "GB");
        assert_eq!(items[0].language.as_deref(), Some("en"));
        assert_eq!(items[0].image_url.as_deref(), Some("https://img.example.com/x.jpg"));
    }
}
