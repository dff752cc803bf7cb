pub mod config;
pub mod telemetry;
pub mod types;

pub use telemetry::Telemetry;
pub use types::{Article, ArticleCompositionError, DiscoveryItem, ExtractedContent, PersistedId};
