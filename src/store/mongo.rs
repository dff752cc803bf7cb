//! MongoDB-backed `Store` adapter, grounded directly on
//! `original_source/globe_news_scraper/database/mongo_handler.py`'s
//! `does_article_exist`/`insert_bulk_articles` pair. Schema/index/view
//! management (`initialize_database`, `_create_daily_summary_view`, etc.) is
//! explicitly out of scope per spec.md §1 — only the two read/write
//! operations the pipeline invokes are implemented here.

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::error::ErrorKind;
use mongodb::options::InsertManyOptions;
use mongodb::{Client, Collection};
use tracing::{error, warn};

use crate::core::types::Article;
use crate::store::{BulkInsertError, BulkInsertResult, Store, StoreError};

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct FailedArticle {
    url: String,
    failure_reason: String,
}

pub struct MongoStore {
    articles: Collection<Article>,
    failed_articles: Collection<FailedArticle>,
    record_failures: bool,
}

impl MongoStore {
    /// Connect to `uri`, select database `db_name`, and hand back a store
    /// bound to its `articles` and `failed_articles` collections. Failure to
    /// connect is fatal per the design doc (§7 initialization failure) — the
    /// caller should treat `Err` as a reason to exit with code 1.
    pub async fn connect(uri: &str, db_name: &str, record_failures: bool) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| StoreError(format!("failed to connect to store: {e}")))?;

        // Verify reachability the way the original's `admin.command('ping')` does.
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError(format!("store ping failed: {e}")))?;

        let db = client.database(db_name);
        Ok(Self {
            articles: db.collection("articles"),
            failed_articles: db.collection("failed_articles"),
            record_failures,
        })
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn exists(&self, url: &str) -> bool {
        match self.articles.count_documents(doc! { "url": url }).await {
            Ok(count) => count > 0,
            Err(e) => {
                error!(url, error = %e, "store error while checking article existence");
                false
            }
        }
    }

    async fn bulk_insert(&self, articles: &[Article]) -> BulkInsertResult {
        if articles.is_empty() {
            return BulkInsertResult::default();
        }

        let opts = InsertManyOptions::builder().ordered(false).build();
        match self.articles.insert_many(articles).with_options(opts).await {
            Ok(result) => BulkInsertResult {
                inserted_ids: result
                    .inserted_ids
                    .values()
                    .map(|id| id.to_string())
                    .collect(),
                errors: Vec::new(),
            },
            Err(e) => match *e.kind {
                ErrorKind::BulkWrite(ref failure) => {
                    let inserted_ids: Vec<String> = failure
                        .inserted_ids
                        .values()
                        .map(|id| id.to_string())
                        .collect();
                    let errors: Vec<BulkInsertError> = failure
                        .write_errors
                        .as_ref()
                        .map(|write_errors| {
                            write_errors
                                .iter()
                                .map(|we| BulkInsertError {
                                    index: we.index,
                                    url: articles.get(we.index).map(|a| a.url.clone()).unwrap_or_default(),
                                    error: we.message.clone(),
                                })
                                .collect()
                        })
                        .unwrap_or_default();

                    if inserted_ids.is_empty() {
                        error!(count = articles.len(), "failed to insert any articles");
                    } else if !errors.is_empty() {
                        warn!(
                            inserted = inserted_ids.len(),
                            failed = errors.len(),
                            "inserted some articles, some failed"
                        );
                    }

                    BulkInsertResult { inserted_ids, errors }
                }
                other => {
                    error!(error = %other, "bulk insert failed completely");
                    BulkInsertResult {
                        inserted_ids: Vec::new(),
                        errors: vec![BulkInsertError {
                            index: 0,
                            url: String::new(),
                            error: other.to_string(),
                        }],
                    }
                }
            },
        }
    }

    async fn record_failure(&self, article_url: &str, failure_reason: &str) {
        if !self.record_failures {
            return;
        }
        let doc = FailedArticle {
            url: article_url.to_string(),
            failure_reason: failure_reason.to_string(),
        };
        if let Err(e) = self.failed_articles.insert_one(doc).await {
            warn!(url = article_url, error = %e, "failed to record failed article");
        }
    }
}
