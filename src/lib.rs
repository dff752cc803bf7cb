//! `news-harvest`: daily trending-news discovery, concurrent fetch-with-fallback,
//! content validation, dedup, and bulk persistence for the Globe app.
//!
//! See `NewsPipeline` for the orchestration entrypoint.

pub mod article_builder;
pub mod core;
pub mod error;
pub mod extraction;
pub mod news_source;
pub mod pipeline;
pub mod scraping;
pub mod store;
pub mod validation;

pub use article_builder::ArticleBuilder;
pub use core::telemetry::Telemetry;
pub use core::types::{Article, ArticleCompositionError, DiscoveryItem, ExtractedContent, PersistedId};
pub use pipeline::NewsPipeline;
