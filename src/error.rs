//! Typed error taxonomy: one leaf `thiserror` type per module boundary
//! (re-exported below), plus [`HarvestError`] for the handful of startup
//! failures `main.rs` treats as fatal. Mirrors the teacher's own split of
//! `thiserror`-derived leaf enums per module rather than one grand error type.

use thiserror::Error;

pub use crate::core::types::ArticleCompositionError;
pub use crate::extraction::ExtractionError;
pub use crate::news_source::{NewsSourceError, RateLimitError};
pub use crate::store::StoreError;

/// A validation failure on extracted body text, carrying the full issues list
/// produced by [`crate::validation::ContentValidator::validate`].
#[derive(Debug, Error)]
#[error("content failed validation: {issues:?}")]
pub struct ValidationError {
    pub issues: Vec<String>,
}

/// Top-level error for pipeline-level operations that can't simply be
/// swallowed (per the design doc's propagation policy, only initialization
/// failures reach this far — everything else is recorded in telemetry and
/// logged in place).
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("store initialization failed: {0}")]
    StoreInit(String),
    #[error("required configuration missing: {0}")]
    MissingConfig(String),
    #[error("invalid cron schedule: {0}")]
    InvalidCronSchedule(String),
}
