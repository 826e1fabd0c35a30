//! The extractor: walks a content source, builds documents, and enqueues
//! them onto the Extract channel (spec §4.3).

mod filesystem;
mod web;

pub use filesystem::FilesystemExtractor;
pub use web::WebExtractor;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::config::Settings;
use crate::error::CrawlResult;
use crate::external::{ContentDetector, IndexSink};
use crate::model::{reserved, Document, Field};
use crate::policy::PathPolicy;
use crate::queue::{ChannelMessage, CrawlQueue, CrawlType, Sentinel};

/// Shared state for one extractor run: policies, collaborators, and the
/// channel the extractor feeds.
pub struct ExtractContext {
    pub queue: Arc<CrawlQueue>,
    pub settings: Arc<Settings>,
    pub follow: PathPolicy,
    pub ignore: PathPolicy,
    pub index: Arc<dyn IndexSink>,
    pub detector: Arc<dyn ContentDetector>,
    pub sender: mpsc::Sender<ChannelMessage>,
    pub cancel: Arc<AtomicBool>,
    pub since: Option<DateTime<Utc>>,
}

impl ExtractContext {
    pub fn crawl_type(&self) -> CrawlType {
        self.queue.crawl_type()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst) || self.queue.is_shutting_down()
    }

    pub fn id_prefix(&self) -> &str {
        &self.settings.extract.id_value_prefix
    }

    pub async fn send(&self, msg: ChannelMessage) {
        let _ = self.sender.send(msg).await;
    }

    pub async fn finish(&self, aborted: bool) {
        let sentinel = if aborted { Sentinel::Abort } else { Sentinel::Finish };
        self.send(ChannelMessage::Sentinel(sentinel)).await;
    }
}

#[async_trait]
pub trait Extractor: Send + Sync {
    async fn run(&self, ctx: &ExtractContext) -> CrawlResult<()>;
}

/// A fresh document from the schema prototype: one `is_content` text field,
/// ready for reserved-field population.
pub fn prototype_document(name: impl Into<String>, doc_type: impl Into<String>) -> Document {
    let mut doc = Document::new(name, doc_type);
    doc.schema_version = "1.0".to_string();
    let mut content = Field::new("content", crate::model::FieldType::Text);
    content.set_feature(reserved::FEATURE_IS_CONTENT, "true");
    doc.bag.set(content);
    doc
}
