//! In-memory `Store` fake, used throughout the test suite in place of a live
//! MongoDB instance. Supports injecting synthetic per-URL insert failures so
//! the partial-failure scenario (design doc §8 scenario 6) is exercisable
//! without a real database.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::types::Article;
use crate::store::{BulkInsertError, BulkInsertResult, Store};

#[derive(Default)]
struct Inner {
    existing_urls: HashSet<String>,
    inserted: Vec<Article>,
    failed_articles: Vec<(String, String)>,
}

/// An in-memory store. `fail_urls` lets a test simulate a bulk-write error on
/// specific URLs (the MongoDB-equivalent of a unique-index violation).
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_urls: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            fail_urls: Mutex::new(HashSet::new()),
        }
    }

    /// Seed the store as if `url` were already persisted — for dedup tests.
    pub fn seed_existing(&self, url: &str) {
        self.inner
            .lock()
            .expect("memory store lock poisoned")
            .existing_urls
            .insert(url.to_string());
    }

    /// Mark `url` to fail on its next `bulk_insert` attempt.
    pub fn fail_on_insert(&self, url: &str) {
        self.fail_urls
            .lock()
            .expect("memory store fail_urls lock poisoned")
            .insert(url.to_string());
    }

    pub fn inserted_articles(&self) -> Vec<Article> {
        self.inner.lock().expect("memory store lock poisoned").inserted.clone()
    }

    pub fn failed_articles(&self) -> Vec<(String, String)> {
        self.inner
            .lock()
            .expect("memory store lock poisoned")
            .failed_articles
            .clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn exists(&self, url: &str) -> bool {
        self.inner
            .lock()
            .expect("memory store lock poisoned")
            .existing_urls
            .contains(url)
    }

    async fn bulk_insert(&self, articles: &[Article]) -> BulkInsertResult {
        let mut result = BulkInsertResult::default();
        let fail_urls = self.fail_urls.lock().expect("memory store fail_urls lock poisoned");
        let mut inner = self.inner.lock().expect("memory store lock poisoned");

        for (index, article) in articles.iter().enumerate() {
            if fail_urls.contains(&article.url) {
                result.errors.push(BulkInsertError {
                    index,
                    url: article.url.clone(),
                    error: "Duplicate key".to_string(),
                });
                continue;
            }
            inner.existing_urls.insert(article.url.clone());
            inner.inserted.push(article.clone());
            result.inserted_ids.push(Uuid::new_v4().to_string());
        }

        result
    }

    async fn record_failure(&self, article_url: &str, failure_reason: &str) {
        self.inner
            .lock()
            .expect("memory store lock poisoned")
            .failed_articles
            .push((article_url.to_string(), failure_reason.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn article(url: &str) -> Article {
        Article {
            title: "T".into(),
            url: url.into(),
            description: "D".into(),
            date_published: Utc::now(),
            provider: "P".into(),
            content: "x".repeat(200),
            origin_country: "GB".into(),
            source_api: "bing".into(),
            schema_version: "1.0".into(),
            date_scraped: Utc::now(),
            post_processed: false,
            language: None,
            keywords: vec![],
            category: None,
            authors: vec![],
            related_countries: vec![],
            image_url: None,
        }
    }

    #[tokio::test]
    async fn exists_reflects_seeded_urls() {
        let store = MemoryStore::new();
        store.seed_existing("https://example.com/a");
        assert!(store.exists("https://example.com/a").await);
        assert!(!store.exists("https://example.com/b").await);
    }

    #[tokio::test]
    async fn bulk_insert_reports_per_document_failure() {
        let store = MemoryStore::new();
        store.fail_on_insert("https://example.com/bad");
        let articles = vec![
            article("https://example.com/good-1"),
            article("https://example.com/bad"),
            article("https://example.com/good-2"),
        ];
        let result = store.bulk_insert(&articles).await;
        assert_eq!(result.inserted_ids.len(), 2);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].index, 1);
        assert_eq!(result.errors[0].url, "https://example.com/bad");
    }

    #[tokio::test]
    async fn bulk_insert_on_empty_input_returns_empty() {
        let store = MemoryStore::new();
        let result = store.bulk_insert(&[]).await;
        assert!(result.inserted_ids.is_empty());
        assert!(result.errors.is_empty());
    }
}
