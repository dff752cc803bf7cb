use std::str::FromStr;
use std::sync::Arc;

use clap::Parser;
use cron::Schedule;
use tracing::{error, info};
use tracing_subscriber::fmt::writer::MakeWriterExt;

use news_harvest::core::config::{self, HarvestConfig};
use news_harvest::core::telemetry::Telemetry;
use news_harvest::error::HarvestError;
use news_harvest::news_source::bing::BingNewsSource;
use news_harvest::news_source::NewsSource;
use news_harvest::store::mongo::MongoStore;
use news_harvest::store::Store;
use news_harvest::{ArticleBuilder, NewsPipeline};

#[derive(Parser, Debug)]
#[command(name = "news-harvest", about = "Daily trending-news harvest pipeline")]
struct Cli {
    /// Runtime environment.
    #[arg(long, value_enum, default_value_t = Env::Dev)]
    env: Env,

    /// Overrides the LOG_LEVEL config value.
    #[arg(long)]
    log_level: Option<String>,

    /// Cron expression; when set, the pipeline runs on each trigger. Accepts
    /// either a bare five-field UNIX expression or a six-field expression
    /// with a leading seconds field.
    #[arg(long)]
    cron_schedule: Option<String>,

    /// Run once immediately at startup, independent of `--cron-schedule`.
    #[arg(long)]
    run_now: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum Env {
    Dev,
    Prod,
    Test,
}

impl std::fmt::Display for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Env::Dev => write!(f, "dev"),
            Env::Prod => write!(f, "prod"),
            Env::Test => write!(f, "test"),
        }
    }
}

fn init_logging(cfg: &HarvestConfig, cli: &Cli) {
    let level = config::resolve_log_level(cli.log_level.as_deref());
    let env_filter = tracing_subscriber::EnvFilter::try_new(level.to_ascii_lowercase())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match config::resolve_logging_dir(cfg) {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(&dir, "news-harvest.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            // Leak the guard: it must live for the process lifetime to keep
            // flushing the non-blocking writer, and main() never returns early
            // from inside this function.
            Box::leak(Box::new(guard));

            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .json()
                .with_writer(non_blocking.and(std::io::stdout))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(env_filter).init();
        }
    }
}

async fn build_sources(cfg: &HarvestConfig) -> Vec<Arc<dyn NewsSource>> {
    let mut sources: Vec<Arc<dyn NewsSource>> = Vec::new();

    let endpoint = cfg.bing_news.resolve_endpoint();
    let markets = cfg.bing_news.resolve_markets();
    match cfg.bing_news.resolve_subscription_key() {
        Some(key) => {
            sources.push(Arc::new(BingNewsSource::new(endpoint, key, markets)));
        }
        None => {
            tracing::warn!("no BING_NEWS_SUBSCRIPTION_KEY configured; Bing source disabled");
        }
    }

    sources
}

fn build_fetcher(
    cfg: &HarvestConfig,
    telemetry: Arc<Telemetry>,
) -> news_harvest::scraping::WebContentFetcher {
    let mut custom: std::collections::HashMap<String, Arc<dyn news_harvest::scraping::custom::CustomFetcher>> =
        std::collections::HashMap::new();
    custom.insert(
        "www.msn.com".to_string(),
        Arc::new(news_harvest::scraping::custom::msn::MsnFetcher::new()),
    );
    news_harvest::scraping::WebContentFetcher::new(
        cfg.resolve_user_agents(),
        cfg.resolve_postman_user_agent(),
        custom,
        telemetry,
    )
}

/// `cron`'s parser mandates a leading seconds field (6–7 fields total) and
/// rejects bare 5-field UNIX cron syntax. Prepend a `0` seconds field to a
/// 5-field expression so the documented 5-field `--cron-schedule` input still
/// parses; a 6/7-field expression passes through unchanged.
fn normalize_cron_expr(expr: &str) -> String {
    if expr.split_whitespace().count() == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    }
}

async fn run_once(cfg: &HarvestConfig, store: Arc<dyn Store>) {
    let telemetry = Arc::new(Telemetry::new());
    let sources = build_sources(cfg).await;
    if sources.is_empty() {
        tracing::warn!("no news sources configured; nothing to harvest this run");
        return;
    }

    let fetcher = Arc::new(build_fetcher(cfg, telemetry.clone()));
    let builder = Arc::new(ArticleBuilder::new(
        fetcher,
        news_harvest::extraction::ArticleExtractor::new(),
        news_harvest::validation::ContentValidator::new(
            cfg.resolve_min_content_length(),
            cfg.resolve_max_content_length(),
        ),
        telemetry.clone(),
        store.clone(),
        cfg.resolve_min_content_length(),
        cfg.resolve_max_content_length(),
    ));

    let pipeline = NewsPipeline::new(
        sources,
        builder,
        store,
        telemetry,
        cfg.resolve_max_scraping_workers(),
    );

    let inserted = pipeline.run().await;
    info!(count = inserted.len(), "pipeline run complete");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let cfg = config::load_harvest_config();
    init_logging(&cfg, &cli);

    info!(env = %cli.env, "starting news-harvest");

    let store: Arc<dyn Store> = match MongoStore::connect(
        &cfg.resolve_store_uri(),
        &cfg.resolve_store_db(),
        cfg.resolve_record_failures(),
    )
    .await
    {
        Ok(store) => Arc::new(store),
        Err(e) => {
            let err = HarvestError::StoreInit(e.to_string());
            error!(error = %err, fatal = true, "store initialization failed");
            std::process::exit(1);
        }
    };

    if cli.run_now {
        run_once(&cfg, store.clone()).await;
    }

    if let Some(expr) = &cli.cron_schedule {
        let normalized = normalize_cron_expr(expr);
        let schedule = match Schedule::from_str(&normalized) {
            Ok(s) => s,
            Err(e) => {
                let err = HarvestError::InvalidCronSchedule(format!("{expr:?}: {e}"));
                error!(expr, error = %err, fatal = true, "invalid cron schedule");
                std::process::exit(1);
            }
        };

        loop {
            let Some(next) = schedule.upcoming(chrono::Utc).next() else {
                error!("cron schedule has no further upcoming triggers");
                break;
            };
            let now = chrono::Utc::now();
            let wait = (next - now).to_std().unwrap_or(std::time::Duration::ZERO);
            info!(next = %next, "waiting for next cron trigger");
            tokio::time::sleep(wait).await;
            run_once(&cfg, store.clone()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_to_dev_env_with_no_cron_schedule() {
        let cli = Cli::parse_from(["news-harvest"]);
        assert!(matches!(cli.env, Env::Dev));
        assert!(cli.cron_schedule.is_none());
        assert!(!cli.run_now);
    }

    #[test]
    fn cli_accepts_env_log_level_and_cron_schedule_flags() {
        let cli = Cli::parse_from([
            "news-harvest",
            "--env",
            "prod",
            "--log-level",
            "debug",
            "--cron-schedule",
            "0 6 * * *",
            "--run-now",
        ]);
        assert!(matches!(cli.env, Env::Prod));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.cron_schedule.as_deref(), Some("0 6 * * *"));
        assert!(cli.run_now);
    }

    #[test]
    fn cli_rejects_an_unknown_env_value() {
        let result = Cli::try_parse_from(["news-harvest", "--env", "staging"]);
        assert!(result.is_err());
    }

    #[test]
    fn normalize_cron_expr_prepends_seconds_field_to_five_field_input() {
        assert_eq!(normalize_cron_expr("0 6 * * *"), "0 0 6 * * *");
    }

    #[test]
    fn normalize_cron_expr_leaves_six_field_input_unchanged() {
        assert_eq!(normalize_cron_expr("0 0 6 * * *"), "0 0 6 * * *");
    }

    #[test]
    fn normalize_cron_expr_parses_via_schedule_from_str() {
        let five_field = normalize_cron_expr("0 6 * * *");
        assert!(Schedule::from_str(&five_field).is_ok());
    }
}
