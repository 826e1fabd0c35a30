//! External collaborator interfaces (spec §6): the downstream index, the
//! content detector/extractor, and the configuration property source.
//! These are specified only by the interface the core consumes; concrete
//! implementations here are reference/stub implementations so the engine
//! is runnable end to end without a real search index or extraction stack.

mod detector;
mod memory_index;

pub use detector::InferContentDetector;
pub use memory_index::InMemoryIndex;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::Document;

/// Index sink failures are always treated as transient by the publisher
/// (spec §7: "does not fail the phase") — the document file is left on
/// disk and retried on the next crawl.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("transient index error: {0}")]
    Transient(String),
}

/// The downstream search index: a document sink consumed by the publisher.
#[async_trait]
pub trait IndexSink: Send + Sync {
    async fn exists(&self, id: &str) -> Result<bool, IndexError>;
    async fn upsert(&self, document: &Document) -> Result<(), IndexError>;
    async fn delete(&self, id: &str) -> Result<(), IndexError>;
    async fn count(&self, filter: &str) -> Result<u64, IndexError>;
}

/// A type detector and text extractor, bounded by `content_limit`
/// characters (spec §6).
pub trait ContentDetector: Send + Sync {
    fn detect_type(&self, bytes: &[u8], name: Option<&str>) -> String;

    fn extract(&self, bytes: &[u8], mime_type: &str, content_limit: usize) -> Option<String>;
}
