//! Document-store contract consumed by the pipeline: dedup lookup and
//! unordered bulk insert with partial-failure reporting. Schema management
//! (index creation, view materialization) is out of scope per spec.md §1 —
//! only the two operations the pipeline invokes are specified here.

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::{Article, PersistedId};

/// A single document's bulk-insert failure, carrying enough context for an
/// operator to find the offending record (`index` into the input batch,
/// the article's `url`, and the underlying store's error message).
#[derive(Debug, Clone)]
pub struct BulkInsertError {
    pub index: usize,
    pub url: String,
    pub error: String,
}

/// Outcome of a [`Store::bulk_insert`] call: ids of everything that made it
/// in, plus per-document errors for everything that didn't. The design doc's
/// invariant `len(inserted_ids) + len(errors) <= len(input)` holds for every
/// concrete implementation.
#[derive(Debug, Default, Clone)]
pub struct BulkInsertResult {
    pub inserted_ids: Vec<PersistedId>,
    pub errors: Vec<BulkInsertError>,
}

#[derive(Debug, Error)]
#[error("store error: {0}")]
pub struct StoreError(pub String);

/// The document-store operations the pipeline invokes, abstracted behind a
/// trait so the pipeline is testable against [`memory::MemoryStore`] without
/// a live database (the teacher's own pattern for `SearchService`, see
/// `tools/search/service.rs`).
#[async_trait]
pub trait Store: Send + Sync {
    /// Returns `false` on any underlying error (logged by the implementation,
    /// never propagated — per the design doc's error-handling policy for this
    /// operation).
    async fn exists(&self, url: &str) -> bool;

    /// Unordered insert: one failed document does not abort others. On total
    /// failure (timeout, connection), returns empty `inserted_ids` and a
    /// single synthetic error entry.
    async fn bulk_insert(&self, articles: &[Article]) -> BulkInsertResult;

    /// Optional failure-recording sink (`failed_articles` collection in the
    /// reference design). Implementations that don't support it are a no-op.
    async fn record_failure(&self, _article_url: &str, _failure_reason: &str) {}
}
