//! Error taxonomy for the crawl engine.
//!
//! Structural errors (lockfile, queue directories, rename sequencing) abort
//! the crawl; document-level errors (extraction, transform, publish) are
//! recovered locally and logged. See `CrawlError::is_fatal`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("configuration invalid: {0}")]
    ConfigInvalid(String),

    #[error("crawl already active at {0}")]
    CrawlAlreadyActive(PathBuf),

    #[error("filesystem operation failed: {0}")]
    IoFailed(#[from] std::io::Error),

    #[error("content extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("transform failed: {0}")]
    TransformFailed(String),

    #[error("publish failed: {0}")]
    PublishFailed(String),

    #[error("crawl cancelled")]
    Cancelled,

    #[error("queue transition failed: {0}")]
    TransitionFailed(String),

    #[error("document serialization failed: {0}")]
    Serialization(String),
}

impl CrawlError {
    /// Structural errors surface to the orchestrator and abort the crawl.
    /// Document-level errors (Extraction/Transform/Publish) are recovered
    /// locally by the phase that produced them and never reach here as a
    /// fatal condition.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CrawlError::ConfigInvalid(_)
                | CrawlError::CrawlAlreadyActive(_)
                | CrawlError::IoFailed(_)
                | CrawlError::TransitionFailed(_)
                | CrawlError::Cancelled
        )
    }
}

pub type CrawlResult<T> = Result<T, CrawlError>;
