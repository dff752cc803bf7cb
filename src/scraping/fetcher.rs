//! Fetch raw HTML for a URL via the fallback chain described in the original
//! `web_content_fetcher.py`: per-domain custom fetcher → basic HTTP (random
//! UA) → basic HTTP (Postman UA) → headless browser. Every attempt is
//! recorded on the shared [`Telemetry`] sink regardless of outcome.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use reqwest::Client;
use tracing::warn;

use crate::core::telemetry::Telemetry;
use crate::scraping::browser_manager::fetch_html_native;
use crate::scraping::custom::CustomFetcher;

/// Default User-Agent pool, carried over from the stealth-header pool this
/// fetch chain's teacher module used for generic HTTP GETs.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edg/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
];

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const BROWSER_TIMEOUT: Duration = Duration::from_secs(10);
const BROWSER_WAIT_MS: u64 = 2000;

/// Fetch raw HTML for a URL by whichever method works, tracking every attempt.
pub struct WebContentFetcher {
    client: Client,
    user_agents: Vec<String>,
    postman_user_agent: String,
    custom_fetchers: HashMap<String, Arc<dyn CustomFetcher>>,
    telemetry: Arc<Telemetry>,
}

impl WebContentFetcher {
    pub fn new(
        user_agents: Vec<String>,
        postman_user_agent: String,
        custom_fetchers: HashMap<String, Arc<dyn CustomFetcher>>,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        Self {
            client: Client::new(),
            user_agents,
            postman_user_agent,
            custom_fetchers,
            telemetry,
        }
    }

    /// Build the default fetcher with the MSN custom fetcher registered.
    pub fn with_defaults(telemetry: Arc<Telemetry>) -> Self {
        let mut custom: HashMap<String, Arc<dyn CustomFetcher>> = HashMap::new();
        custom.insert(
            "www.msn.com".to_string(),
            Arc::new(crate::scraping::custom::msn::MsnFetcher::new()),
        );
        Self::new(
            DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            "PostmanRuntime/7.36.0".to_string(),
            custom,
            telemetry,
        )
    }

    fn host(url: &str) -> Option<String> {
        url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
    }

    fn random_user_agent(&self) -> &str {
        self.user_agents
            .choose(&mut rand::rng())
            .map(|s| s.as_str())
            .unwrap_or("Mozilla/5.0")
    }

    /// Run the fallback chain for `url`. Returns the fetched HTML body, or
    /// `None` if every stage failed.
    pub async fn fetch(&self, url: &str) -> Option<String> {
        if let Some(host) = Self::host(url) {
            if let Some(custom) = self.custom_fetchers.get(&host) {
                let (status, body) = custom.fetch(url).await;
                self.telemetry.track_request(&format!("custom_{}_request", host), status);
                return if status == 200 { Some(body) } else { None };
            }
        }

        let mut last_status = 0u16;

        match self.fetch_basic(url, self.random_user_agent()).await {
            Ok(body) => {
                self.telemetry.track_request("basic_request", 200);
                return Some(body);
            }
            Err(status) => {
                self.telemetry.track_request("basic_request", status);
                last_status = status;
            }
        }

        let postman_ua = self.postman_user_agent.clone();
        match self.fetch_basic(url, &postman_ua).await {
            Ok(body) => {
                self.telemetry.track_request("postman_request", 200);
                return Some(body);
            }
            Err(status) => {
                self.telemetry.track_request("postman_request", status);
                last_status = status;
            }
        }

        match fetch_html_native(url, BROWSER_WAIT_MS, BROWSER_TIMEOUT).await {
            Ok((status, body)) => {
                self.telemetry.track_request("playwright_request", status);
                if status == 200 {
                    return Some(body);
                }
                last_status = status;
            }
            Err(e) => {
                warn!(url, error = %e, "headless fetch failed");
                last_status = 500;
                self.telemetry.track_request("playwright_request", last_status);
            }
        }

        self.telemetry.track_request("all_methods_failed", last_status);
        None
    }

    /// One basic HTTP GET with the given User-Agent. Returns `Ok(body)` on
    /// 200 with detectable encoding, `Err(status)` otherwise. Errors inside
    /// this stage are logged at WARNING and translated to a 500 status —
    /// never propagated to the caller.
    async fn fetch_basic(&self, url: &str, user_agent: &str) -> Result<String, u16> {
        let resp = self
            .client
            .get(url)
            .timeout(HTTP_TIMEOUT)
            .header("User-Agent", user_agent)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Referer", "https://www.google.com/")
            .header("Connection", "keep-alive")
            .send()
            .await
            .map_err(|e| {
                warn!(url, error = %e, "basic fetch request error");
                500u16
            })?;

        let status = resp.status().as_u16();
        if status != 200 {
            return Err(status);
        }

        let has_declared_charset = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.to_ascii_lowercase().contains("charset="))
            .unwrap_or(false);

        let bytes = resp.bytes().await.map_err(|e| {
            warn!(url, error = %e, "basic fetch body read error");
            500u16
        })?;

        if has_declared_charset {
            return Ok(String::from_utf8_lossy(&bytes).into_owned());
        }

        // Server declared no charset — attempt to detect one. No charset
        // sniffing crate is in this dependency stack, so a strict UTF-8
        // parse stands in for "encoding detectable"; anything else is
        // treated as an undetectable encoding and fails this stage.
        match std::str::from_utf8(&bytes) {
            Ok(text) => Ok(text.to_string()),
            Err(_) => Err(500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysStatus(u16, String);

    #[async_trait::async_trait]
    impl CustomFetcher for AlwaysStatus {
        async fn fetch(&self, _url: &str) -> (u16, String) {
            (self.0, self.1.clone())
        }
    }

    #[tokio::test]
    async fn custom_fetcher_short_circuits_on_non_200() {
        let telemetry = Arc::new(Telemetry::new());
        let mut custom: HashMap<String, Arc<dyn CustomFetcher>> = HashMap::new();
        custom.insert(
            "www.msn.com".to_string(),
            Arc::new(AlwaysStatus(403, String::new())),
        );
        let fetcher = WebContentFetcher::new(
            vec!["UA/1".to_string()],
            "Postman/1".to_string(),
            custom,
            telemetry.clone(),
        );

        let result = fetcher.fetch("https://www.msn.com/some/article").await;
        assert!(result.is_none());
        assert_eq!(telemetry.request_count("custom_www.msn.com_request", 403), 1);
        assert_eq!(telemetry.request_count("basic_request", 200), 0);
        assert_eq!(telemetry.request_count("postman_request", 200), 0);
    }

    #[tokio::test]
    async fn custom_fetcher_returns_body_on_200() {
        let telemetry = Arc::new(Telemetry::new());
        let mut custom: HashMap<String, Arc<dyn CustomFetcher>> = HashMap::new();
        custom.insert(
            "www.msn.com".to_string(),
            Arc::new(AlwaysStatus(200, "<html>ok</html>".to_string())),
        );
        let fetcher = WebContentFetcher::new(
            vec!["UA/1".to_string()],
            "Postman/1".to_string(),
            custom,
            telemetry,
        );

        let result = fetcher.fetch("https://www.msn.com/some/article").await;
        assert_eq!(result.as_deref(), Some("<html>ok</html>"));
    }
}
