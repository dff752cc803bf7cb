//! Native headless-browser management using `chromiumoxide`.
//!
//! This module is the single source of truth for:
//! * Finding a usable browser executable (Brave → Chrome → Chromium, cross-platform).
//! * Launching a headless browser session via chromiumoxide.
//! * Rendering a URL to HTML as the last resort in [`crate::scraping::fetcher`]'s
//!   fallback chain, with a hard navigation timeout and guaranteed teardown.
//!
//! The original fetch-path this was adapted from used Firefox via Playwright;
//! no Firefox CDP/automation crate exists in this dependency stack, so Chromium
//! via `chromiumoxide` stands in for it. See DESIGN.md for that substitution.

use anyhow::{anyhow, Result};
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Browser;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};

// ── Browser executable discovery ─────────────────────────────────────────────

/// Find a usable Chromium-family browser executable.
///
/// Resolution order:
/// 1. `CHROME_EXECUTABLE` env var (works great in Docker:
///    `CHROME_EXECUTABLE=/usr/bin/chromium`)
/// 2. PATH scan – finds package-manager installs on all platforms.
/// 3. OS-specific well-known install paths.
pub fn find_chrome_executable() -> Option<String> {
    if let Ok(p) = std::env::var("CHROME_EXECUTABLE") {
        if Path::new(&p).exists() {
            return Some(p);
        }
    }

    if let Ok(path_var) = std::env::var("PATH") {
        let candidates = [
            "brave-browser",
            "brave",
            "google-chrome",
            "chromium",
            "chromium-browser",
            "chrome",
        ];
        for dir in std::env::split_paths(&path_var) {
            for exe in candidates {
                let full = dir.join(exe);
                if full.exists() {
                    return Some(full.to_string_lossy().to_string());
                }
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        let candidates = [
            "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        let candidates = [
            "/usr/bin/brave-browser",
            "/usr/bin/brave",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/bin/google-chrome",
            "/usr/local/bin/chromium",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "windows")]
    {
        let candidates = [
            r"C:\Program Files\BraveSoftware\Brave-Browser\Application\brave.exe",
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    None
}

/// Returns `true` when a usable browser binary is present on this machine.
pub fn native_browser_available() -> bool {
    find_chrome_executable().is_some()
}

// ── Headless browser config builder ──────────────────────────────────────────

/// Build a `BrowserConfig` for headless operation.
pub fn build_headless_config(exe: &str, width: u32, height: u32) -> Result<BrowserConfig> {
    BrowserConfig::builder()
        .chrome_executable(exe)
        .viewport(Viewport {
            width,
            height,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(width, height)
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-setuid-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--disable-background-networking")
        .arg("--disable-sync")
        .arg("--disable-translate")
        .arg("--disable-crash-reporter")
        .arg("--disable-breakpad")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--hide-scrollbars")
        .arg("--mute-audio")
        .build()
        .map_err(|e| anyhow!("failed to build browser config: {}", e))
}

// ── Lightweight "fetch rendered HTML" primitive ──────────────────────────────

/// Fetch the rendered HTML of `url` using a native headless browser, under a
/// hard `timeout`. Launches a fresh browser, navigates, settles for `wait_ms`,
/// captures `document.documentElement.outerHTML`, then closes — on every exit
/// path, including the timeout one.
///
/// Returns `(status_code, html)`; status is always 200 on success.
pub async fn fetch_html_native(
    url: &str,
    wait_ms: u64,
    timeout: Duration,
) -> Result<(u16, String)> {
    let exe = find_chrome_executable().ok_or_else(|| {
        anyhow!("no browser found; install Brave/Chrome/Chromium or set CHROME_EXECUTABLE")
    })?;

    info!(url, browser = %exe, "launching headless browser");

    let config = build_headless_config(&exe, 1280, 900)?;

    let (mut browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| anyhow!("failed to launch browser ({}): {}", exe, e))?;

    let _handle = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                error!("CDP handler error: {}", e);
            }
        }
    });

    let fetch = async {
        let page = browser
            .new_page(url)
            .await
            .map_err(|e| anyhow!("failed to open page: {}", e))?;

        tokio::time::sleep(Duration::from_millis(wait_ms)).await;

        let html = page
            .content()
            .await
            .map_err(|e| anyhow!("failed to read page content: {}", e))?;

        Ok::<(u16, String), anyhow::Error>((200u16, html))
    };

    let result = match tokio::time::timeout(timeout, fetch).await {
        Ok(inner) => inner,
        Err(_) => Err(anyhow!("headless render timed out after {:?}", timeout)),
    };

    if let Err(e) = browser.close().await {
        warn!("browser close error (non-fatal): {}", e);
    }

    result
}
