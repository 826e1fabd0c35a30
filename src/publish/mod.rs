//! The publisher (spec §4.5): dequeues transformed document ids, ships them
//! to the downstream index, and clears their on-disk publish-phase file on
//! success. An index error of any kind leaves the file in place for the
//! next crawl's retry and never fails the phase (spec §7); only a
//! structural queue I/O error (reading or deleting the publish-phase file)
//! aborts the crawl.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::error::CrawlResult;
use crate::external::{IndexError, IndexSink};
use crate::queue::{ChannelMessage, CrawlQueue, Phase, Sentinel};

pub struct PublishContext {
    pub queue: Arc<CrawlQueue>,
    pub index: Arc<dyn IndexSink>,
    pub receiver: tokio::sync::mpsc::Receiver<ChannelMessage>,
    pub cancel: Arc<AtomicBool>,
    /// Spec §5 "Timeouts": the Publish channel poll re-polls on timeout
    /// unless a shutdown is in progress.
    pub queue_poll_timeout: Duration,
}

pub struct PublishSummary {
    pub published: usize,
    pub deferred: usize,
    pub aborted: bool,
}

/// Drains the Publish channel until a terminal sentinel, publishing each
/// document id it sees.
pub async fn run(mut ctx: PublishContext) -> CrawlResult<PublishSummary> {
    let mut published = 0usize;
    let mut deferred = 0usize;
    let mut aborted = false;

    loop {
        let msg = match tokio::time::timeout(ctx.queue_poll_timeout, ctx.receiver.recv()).await {
            Ok(Some(msg)) => msg,
            Ok(None) => break,
            Err(_elapsed) => {
                if ctx.queue.is_shutting_down() {
                    warn!("publish poll timed out during shutdown, exiting");
                    aborted = true;
                    break;
                }
                continue;
            }
        };

        if ctx.cancel.load(Ordering::SeqCst) || ctx.queue.is_shutting_down() {
            warn!("publisher cancelled, discarding remaining queued work");
            aborted = true;
            break;
        }

        match msg {
            ChannelMessage::Sentinel(Sentinel::Start) => continue,
            ChannelMessage::Sentinel(Sentinel::Finish) => {
                info!("publisher received finish sentinel, draining complete");
                break;
            }
            ChannelMessage::Sentinel(Sentinel::Abort) => {
                warn!("publisher received abort sentinel, discarding remaining work");
                aborted = true;
                break;
            }
            ChannelMessage::DocId { id, .. } => match publish_one(&ctx, &id).await {
                Ok(true) => published += 1,
                Ok(false) => deferred += 1,
                Err(e) => {
                    error!(doc_id = %id, error = %e, "structural error publishing document, aborting crawl");
                    ctx.queue.request_shutdown();
                    return Err(e);
                }
            },
        }
    }

    Ok(PublishSummary {
        published,
        deferred,
        aborted,
    })
}

/// Returns `Ok(true)` on a successful publish, `Ok(false)` when the failure
/// is transient and the document should be retried on the next crawl.
async fn publish_one(ctx: &PublishContext, doc_id: &str) -> CrawlResult<bool> {
    let document = ctx.queue.read_from(Phase::Publish, doc_id)?;

    match ctx.index.upsert(&document).await {
        Ok(()) => {
            ctx.queue.delete_from(Phase::Publish, doc_id)?;
            Ok(true)
        }
        Err(IndexError::Transient(msg)) => {
            warn!(doc_id, %msg, "transient index error, will retry");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{IndexSink, InMemoryIndex};
    use crate::model::{reserved, Document, Field};
    use crate::queue::{ChannelMessage, CrawlQueue, CrawlType};
    use tempfile::tempdir;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn publishes_document_and_removes_its_file() {
        let dir = tempdir().unwrap();
        let queue = Arc::new(CrawlQueue::new(dir.path()));
        queue.start(CrawlType::Full, None).unwrap();

        let mut doc = Document::new("a.txt", "File");
        doc.bag.set(Field::text(reserved::NSD_ID, "x_1"));
        queue.write_into(Phase::Publish, &doc, "x_1").unwrap();

        let index = Arc::new(InMemoryIndex::new());
        let (tx, rx) = mpsc::channel(8);
        tx.send(ChannelMessage::doc_id("x_1")).await.unwrap();
        tx.send(ChannelMessage::Sentinel(Sentinel::Finish))
            .await
            .unwrap();
        drop(tx);

        let ctx = PublishContext {
            queue: queue.clone(),
            index: index.clone(),
            receiver: rx,
            cancel: Arc::new(AtomicBool::new(false)),
            queue_poll_timeout: Duration::from_secs(5),
        };
        let summary = run(ctx).await.unwrap();

        assert_eq!(summary.published, 1);
        assert!(index.exists("x_1").await.unwrap());
        assert!(queue.read_from(Phase::Publish, "x_1").is_err());
    }

    #[tokio::test]
    async fn abort_sentinel_stops_without_publishing_remaining() {
        let dir = tempdir().unwrap();
        let queue = Arc::new(CrawlQueue::new(dir.path()));
        queue.start(CrawlType::Full, None).unwrap();

        let index = Arc::new(InMemoryIndex::new());
        let (tx, rx) = mpsc::channel(8);
        tx.send(ChannelMessage::Sentinel(Sentinel::Abort))
            .await
            .unwrap();
        drop(tx);

        let ctx = PublishContext {
            queue,
            index,
            receiver: rx,
            cancel: Arc::new(AtomicBool::new(false)),
            queue_poll_timeout: Duration::from_secs(5),
        };
        let summary = run(ctx).await.unwrap();
        assert!(summary.aborted);
        assert_eq!(summary.published, 0);
    }
}
