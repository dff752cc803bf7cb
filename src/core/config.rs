//! File-based config loader (`news-harvest.json`) with env-var fallback,
//! adapted from the original MCP server's `ShadowConfig` pattern: every field
//! resolves as JSON field → env var → built-in default, documented inline.

/// Bing News sub-config (mirrors the `bing_news` key in news-harvest.json).
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct BingNewsConfig {
    pub endpoint: Option<String>,
    pub subscription_key: Option<String>,
    /// Comma-separated market tags, e.g. `"en-US,en-GB,fr-FR"`.
    pub countries: Option<String>,
}

impl BingNewsConfig {
    /// Endpoint: JSON field → `BING_NEWS_ENDPOINT` env var → Bing's public default.
    pub fn resolve_endpoint(&self) -> String {
        if let Some(e) = &self.endpoint {
            if !e.trim().is_empty() {
                return e.clone();
            }
        }
        std::env::var("BING_NEWS_ENDPOINT")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "https://api.bing.microsoft.com/v7.0/news".to_string())
    }

    /// Subscription key: JSON field → `BING_NEWS_SUBSCRIPTION_KEY` env var → `None`.
    pub fn resolve_subscription_key(&self) -> Option<String> {
        if let Some(k) = &self.subscription_key {
            return Some(k.clone());
        }
        std::env::var("BING_NEWS_SUBSCRIPTION_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty())
    }

    /// Market tags: JSON field → `BING_NEWS_COUNTRIES` env var → a small default set.
    pub fn resolve_markets(&self) -> Vec<String> {
        let raw = self
            .countries
            .clone()
            .or_else(|| std::env::var("BING_NEWS_COUNTRIES").ok())
            .unwrap_or_else(|| "en-US,en-GB".to_string());
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Top-level config loaded from `news-harvest.json`.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct HarvestConfig {
    #[serde(default)]
    pub bing_news: BingNewsConfig,
    pub store_uri: Option<String>,
    pub store_db: Option<String>,
    pub max_scraping_workers: Option<usize>,
    pub min_content_length: Option<usize>,
    pub max_content_length: Option<usize>,
    pub logging_dir: Option<String>,
    pub user_agents: Option<Vec<String>>,
    pub postman_user_agent: Option<String>,
    pub record_failures: Option<bool>,
}

pub const ENV_CONFIG_PATH: &str = "NEWS_HARVEST_CONFIG";

/// Load `news-harvest.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `NEWS_HARVEST_CONFIG` env var path.
/// 2. `./news-harvest.json` (process cwd).
/// 3. `../news-harvest.json` (one level up).
///
/// Missing file → `HarvestConfig::default()` (silent, all env-var fallbacks
/// apply). Parse error → log a warning, return `HarvestConfig::default()`.
pub fn load_harvest_config() -> HarvestConfig {
    let candidates: Vec<std::path::PathBuf> = {
        let mut v = vec![
            std::path::PathBuf::from("news-harvest.json"),
            std::path::PathBuf::from("../news-harvest.json"),
        ];
        if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
            v.insert(0, std::path::PathBuf::from(env_path));
        }
        v
    };

    for path in &candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<HarvestConfig>(&contents) {
                Ok(cfg) => {
                    tracing::info!(path = %path.display(), "news-harvest.json loaded");
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "news-harvest.json parse error — using defaults");
                    return HarvestConfig::default();
                }
            },
            Err(_) => continue, // file not found at this path — try next
        }
    }

    // No config file found anywhere — silently use defaults (all env-var fallbacks will apply).
    HarvestConfig::default()
}

/// Root log level: CLI override → `LOG_LEVEL` env var → `INFO`.
pub fn resolve_log_level(cli_override: Option<&str>) -> String {
    if let Some(l) = cli_override {
        if !l.trim().is_empty() {
            return l.to_ascii_uppercase();
        }
    }
    std::env::var("LOG_LEVEL")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "INFO".to_string())
        .to_ascii_uppercase()
}

/// Directory for the rotating JSON log file: JSON field → `LOGGING_DIR` env var
/// → `None` (console-only logging).
pub fn resolve_logging_dir(cfg: &HarvestConfig) -> Option<String> {
    if let Some(d) = &cfg.logging_dir {
        if !d.trim().is_empty() {
            return Some(d.clone());
        }
    }
    std::env::var("LOGGING_DIR").ok().filter(|v| !v.trim().is_empty())
}

impl HarvestConfig {
    /// Store connection URI: JSON field → `STORE_URI` env var → local default.
    pub fn resolve_store_uri(&self) -> String {
        if let Some(u) = &self.store_uri {
            if !u.trim().is_empty() {
                return u.clone();
            }
        }
        std::env::var("STORE_URI")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "mongodb://localhost:27017".to_string())
    }

    /// Store database name: JSON field → `STORE_DB` env var → `"globe"`.
    pub fn resolve_store_db(&self) -> String {
        if let Some(d) = &self.store_db {
            if !d.trim().is_empty() {
                return d.clone();
            }
        }
        std::env::var("STORE_DB")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "globe".to_string())
    }

    /// Worker-pool size per market: JSON field → `MAX_SCRAPING_WORKERS` env var → 5.
    pub fn resolve_max_scraping_workers(&self) -> usize {
        if let Some(n) = self.max_scraping_workers {
            return n;
        }
        std::env::var("MAX_SCRAPING_WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5)
    }

    /// Minimum content length: JSON field → `MIN_CONTENT_LENGTH` env var → 150.
    pub fn resolve_min_content_length(&self) -> usize {
        if let Some(n) = self.min_content_length {
            return n;
        }
        std::env::var("MIN_CONTENT_LENGTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(150)
    }

    /// Maximum content length: JSON field → `MAX_CONTENT_LENGTH` env var → 50_000.
    pub fn resolve_max_content_length(&self) -> usize {
        if let Some(n) = self.max_content_length {
            return n;
        }
        std::env::var("MAX_CONTENT_LENGTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(50_000)
    }

    /// User-agent pool: JSON field → `USER_AGENTS` env var (comma-separated) →
    /// the built-in default pool in [`crate::scraping::fetcher::DEFAULT_USER_AGENTS`].
    pub fn resolve_user_agents(&self) -> Vec<String> {
        if let Some(list) = &self.user_agents {
            if !list.is_empty() {
                return list.clone();
            }
        }
        if let Ok(raw) = std::env::var("USER_AGENTS") {
            let parsed: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !parsed.is_empty() {
                return parsed;
            }
        }
        crate::scraping::fetcher::DEFAULT_USER_AGENTS
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Alternate "Postman" user agent: JSON field → `POSTMAN_USER_AGENT` env var
    /// → a fixed default matching the original's literal Postman UA string.
    pub fn resolve_postman_user_agent(&self) -> String {
        if let Some(ua) = &self.postman_user_agent {
            if !ua.trim().is_empty() {
                return ua.clone();
            }
        }
        std::env::var("POSTMAN_USER_AGENT")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "PostmanRuntime/7.36.0".to_string())
    }

    /// Whether to also persist build failures to a `failed_articles` collection.
    /// JSON field → `RECORD_FAILED_ARTICLES` env var → `false`.
    pub fn resolve_record_failures(&self) -> bool {
        if let Some(b) = self.record_failures {
            return b;
        }
        std::env::var("RECORD_FAILED_ARTICLES")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_resolves_builtin_defaults() {
        let cfg = HarvestConfig::default();
        assert_eq!(cfg.resolve_max_scraping_workers(), 5);
        assert_eq!(cfg.resolve_min_content_length(), 150);
        assert_eq!(cfg.resolve_max_content_length(), 50_000);
        assert_eq!(cfg.resolve_store_db(), "globe");
    }

    #[test]
    fn bing_markets_split_on_comma_and_trim() {
        let cfg = BingNewsConfig {
            endpoint: None,
            subscription_key: None,
            countries: Some(" en-US, en-GB ,fr-FR".to_string()),
        };
        assert_eq!(cfg.resolve_markets(), vec!["en-US", "en-GB", "fr-FR"]);
    }
}
