//! Custom fetcher for `msn.com`, grounded on the original's `_fetch_msn_com`:
//! MSN's article page renders through several possible selectors (A/B tested
//! templates), so the algorithm waits for the first one to show up rather than
//! assuming a fixed DOM shape, then normalizes whatever it finds into one
//! place before handing HTML back to the generic extractor.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::warn;

use crate::scraping::browser_manager::{build_headless_config, find_chrome_executable};
use chromiumoxide::Browser;
use futures::StreamExt;

use super::CustomFetcher;

/// Selectors tried in order, each with its own 10-second visibility wait.
const CANDIDATE_SELECTORS: &[&str] = &[
    "[id^='ViewsPageId-']",
    "msn-article-page",
    ".article-page",
    "cp-article-reader",
];

/// Post-selector settle time. An empirical constant from the original fetcher
/// — an implementer may make it configurable but must not go below this.
const POST_SELECTOR_WAIT: Duration = Duration::from_secs(5);

const SELECTOR_WAIT_TIMEOUT: Duration = Duration::from_secs(10);
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct MsnFetcher;

impl MsnFetcher {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MsnFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CustomFetcher for MsnFetcher {
    async fn fetch(&self, url: &str) -> (u16, String) {
        match tokio::time::timeout(Duration::from_secs(10), fetch_inner(url)).await {
            Ok(Ok(html)) => (200, html),
            Ok(Err(e)) => {
                warn!(url, error = %e, "msn custom fetcher error");
                (500, String::new())
            }
            Err(_) => (408, String::new()),
        }
    }
}

async fn fetch_inner(url: &str) -> anyhow::Result<String> {
    let exe = find_chrome_executable()
        .ok_or_else(|| anyhow::anyhow!("no browser found for msn custom fetcher"))?;
    let config = build_headless_config(&exe, 1280, 900)?;

    let (mut browser, mut handler) = Browser::launch(config).await?;
    let _handle = tokio::spawn(async move { while handler.next().await.is_some() {} });

    let result = async {
        let page = browser.new_page(url).await?;

        wait_for_any_selector(&page, CANDIDATE_SELECTORS, SELECTOR_WAIT_TIMEOUT).await;
        tokio::time::sleep(POST_SELECTOR_WAIT).await;

        extract_and_reinsert_article_body(&page).await?;

        let html = page.content().await?;
        Ok::<String, anyhow::Error>(html)
    }
    .await;

    let _ = browser.close().await;
    result
}

/// Poll for the first of `selectors` to resolve to an element, each allotted
/// its own slice of `per_selector_timeout`. Returns as soon as any one is
/// found; silently gives up (the caller proceeds regardless) once every
/// selector has timed out, matching the original's "first hit or all time out"
/// contract.
async fn wait_for_any_selector(
    page: &chromiumoxide::Page,
    selectors: &[&str],
    per_selector_timeout: Duration,
) {
    for selector in selectors {
        let deadline = Instant::now() + per_selector_timeout;
        while Instant::now() < deadline {
            if page.find_element(*selector).await.is_ok() {
                return;
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }
}

/// Find the innermost article-body element, trying in order: `cp-article`'s
/// shadow-root `.article-body` → `.article-body` → `<article>` →
/// `[id^='ViewsPageId-']` → `<body>`; reinsert its innerHTML as
/// `document.body.innerHTML` wrapped in a single `<div class="article-body">`
/// so the downstream extractor always finds content in the same place.
async fn extract_and_reinsert_article_body(page: &chromiumoxide::Page) -> anyhow::Result<()> {
    let script = r#"
        (() => {
            const tryShadow = () => {
                const host = document.querySelector('cp-article');
                if (host && host.shadowRoot) {
                    const el = host.shadowRoot.querySelector('.article-body');
                    if (el) return el.innerHTML;
                }
                return null;
            };
            const bySelector = (sel) => {
                const el = document.querySelector(sel);
                return el ? el.innerHTML : null;
            };
            const inner =
                tryShadow() ??
                bySelector('.article-body') ??
                bySelector('article') ??
                bySelector("[id^='ViewsPageId-']") ??
                document.body.innerHTML;
            document.body.innerHTML = '<div class="article-body">' + inner + '</div>';
            return true;
        })();
    "#;

    page.evaluate(script).await?;
    Ok(())
}
