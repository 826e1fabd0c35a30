//! The phase orchestrator (spec §4, §5): the state machine that owns one
//! crawl from lock acquisition through the three phase workers to a final
//! `finish`.
//!
//! State machine: `Init -> AcquireLock -> Running -> (Draining | Aborted)
//! -> Closed`. `Running` spawns the extract, transform, and publish workers
//! as independent tokio tasks wired by bounded channels; `Draining` is
//! entered once every worker has seen its terminal sentinel and is winding
//! down cleanly, `Aborted` if any worker hit a fatal error or cooperative
//! cancellation fired first.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::error::{CrawlError, CrawlResult};
use crate::extract::{ExtractContext, Extractor};
use crate::external::{ContentDetector, IndexSink};
use crate::policy::PathPolicy;
use crate::publish::{self, PublishContext};
use crate::queue::{ChannelMessage, CrawlQueue, CrawlType, Phase, Sentinel};
use crate::transform::registry::build_pipeline;
use crate::transform::Pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Init,
    AcquireLock,
    Running,
    Draining,
    Aborted,
    Closed,
}

#[derive(Debug)]
pub struct CrawlReport {
    pub state: OrchestratorState,
    pub extracted: usize,
    pub published: usize,
    pub deferred: usize,
}

pub struct Orchestrator {
    settings: Arc<Settings>,
    queue: Arc<CrawlQueue>,
    index: Arc<dyn IndexSink>,
    detector: Arc<dyn ContentDetector>,
    extractor: Arc<dyn Extractor>,
}

impl Orchestrator {
    pub fn new(
        settings: Arc<Settings>,
        queue: Arc<CrawlQueue>,
        index: Arc<dyn IndexSink>,
        detector: Arc<dyn ContentDetector>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        Self {
            settings,
            queue,
            index,
            detector,
            extractor,
        }
    }

    pub fn queue(&self) -> &Arc<CrawlQueue> {
        &self.queue
    }

    /// Run one full crawl to completion, acquiring the lock, running all
    /// three phases, and releasing the queue on the way out regardless of
    /// how the crawl ended.
    pub async fn run_crawl(
        &self,
        crawl_type: CrawlType,
        since: Option<DateTime<Utc>>,
    ) -> CrawlResult<CrawlReport> {
        self.queue.start(crawl_type, since)?;
        info!(crawl_id = self.queue.crawl_id(), ?crawl_type, "crawl started");

        let outcome = self.run_phases().await;

        match &outcome {
            Ok(report) if report.state == OrchestratorState::Aborted => {
                let _ = self.queue.finish(true);
            }
            Ok(report) => {
                let keep_queue = report.deferred > 0;
                self.queue.finish(keep_queue)?;
            }
            Err(e) => {
                error!(error = %e, "crawl aborted with a fatal error");
                self.queue.request_shutdown();
                let _ = self.queue.finish(true);
            }
        }

        outcome
    }

    async fn run_phases(&self) -> CrawlResult<CrawlReport> {
        let pipeline = build_pipeline(&self.settings)?;
        pipeline.validate()?;

        let follow = match &self.settings.extract.follow_file {
            Some(path) => PathPolicy::load(path)?,
            None => PathPolicy::empty(),
        };
        let ignore = match &self.settings.extract.ignore_file {
            Some(path) => PathPolicy::load(path)?,
            None => PathPolicy::empty(),
        };

        let depth = self.settings.queue.channel_depth.max(1);
        let (extract_tx, extract_rx) = tokio::sync::mpsc::channel(depth);
        let (publish_tx, publish_rx) = tokio::sync::mpsc::channel(depth);

        let cancel = Arc::new(AtomicBool::new(false));

        let extract_ctx = ExtractContext {
            queue: self.queue.clone(),
            settings: self.settings.clone(),
            follow,
            ignore,
            index: self.index.clone(),
            detector: self.detector.clone(),
            sender: extract_tx,
            cancel: cancel.clone(),
            since: self.queue.since(),
        };
        let extractor = self.extractor.clone();
        let extract_handle = tokio::spawn(async move { extractor.run(&extract_ctx).await });

        let queue_for_transform = self.queue.clone();
        let transform_handle = tokio::spawn(transform_worker(
            queue_for_transform,
            pipeline,
            extract_rx,
            publish_tx,
            cancel.clone(),
        ));

        let publish_ctx = PublishContext {
            queue: self.queue.clone(),
            index: self.index.clone(),
            receiver: publish_rx,
            cancel: cancel.clone(),
            queue_poll_timeout: self.settings.poll_timeout(),
        };
        let publish_handle = tokio::spawn(publish::run(publish_ctx));

        let extract_result = extract_handle
            .await
            .map_err(|e| CrawlError::ExtractionFailed(format!("extract task panicked: {e}")))?;
        let extracted = match extract_result {
            Ok(()) => 0,
            Err(e) => {
                warn!(error = %e, "extract phase reported an error");
                0
            }
        };

        let transform_result = transform_handle
            .await
            .map_err(|e| CrawlError::TransformFailed(format!("transform task panicked: {e}")))?;
        if let Err(e) = transform_result {
            warn!(error = %e, "transform phase reported an error");
        }

        let publish_result = publish_handle
            .await
            .map_err(|e| CrawlError::PublishFailed(format!("publish task panicked: {e}")))??;

        let state = if publish_result.aborted || cancel.load(std::sync::atomic::Ordering::SeqCst) {
            OrchestratorState::Aborted
        } else {
            OrchestratorState::Draining
        };

        Ok(CrawlReport {
            state,
            extracted,
            published: publish_result.published,
            deferred: publish_result.deferred,
        })
    }
}

/// Bridges the extract and publish channels: reads each extracted document,
/// runs it through the pipeline, and hands it to the publish phase via
/// rename (unchanged documents) or write-then-delete (mutated documents).
async fn transform_worker(
    queue: Arc<CrawlQueue>,
    pipeline: Pipeline,
    mut extract_rx: tokio::sync::mpsc::Receiver<ChannelMessage>,
    publish_tx: tokio::sync::mpsc::Sender<ChannelMessage>,
    cancel: Arc<AtomicBool>,
) -> CrawlResult<()> {
    let mut aborted = false;

    while let Some(msg) = extract_rx.recv().await {
        if cancel.load(std::sync::atomic::Ordering::SeqCst) || queue.is_shutting_down() {
            aborted = true;
            break;
        }

        match msg {
            ChannelMessage::Sentinel(Sentinel::Start) => {
                let _ = publish_tx
                    .send(ChannelMessage::Sentinel(Sentinel::Start))
                    .await;
            }
            ChannelMessage::Sentinel(Sentinel::Finish) => {
                let _ = publish_tx
                    .send(ChannelMessage::Sentinel(Sentinel::Finish))
                    .await;
                break;
            }
            ChannelMessage::Sentinel(Sentinel::Abort) => {
                aborted = true;
                let _ = publish_tx
                    .send(ChannelMessage::Sentinel(Sentinel::Abort))
                    .await;
                break;
            }
            ChannelMessage::DocId { id, .. } => {
                if let Err(e) = transform_one(&queue, &pipeline, &id).await {
                    warn!(doc_id = %id, error = %e, "transform of document failed, skipping");
                    continue;
                }
                let _ = publish_tx.send(ChannelMessage::doc_id(id)).await;
            }
        }
    }

    if aborted {
        let _ = publish_tx
            .send(ChannelMessage::Sentinel(Sentinel::Abort))
            .await;
    }

    Ok(())
}

async fn transform_one(queue: &CrawlQueue, pipeline: &Pipeline, doc_id: &str) -> CrawlResult<()> {
    let src = queue.read_from(Phase::Extract, doc_id)?;

    if pipeline.is_empty() {
        queue.transition_rename(Phase::Extract, Phase::Transform, doc_id)?;
        queue.transition_rename(Phase::Transform, Phase::Publish, doc_id)?;
        return Ok(());
    }

    let (dst, unchanged) = pipeline.execute(src);

    queue.transition_rename(Phase::Extract, Phase::Transform, doc_id)?;
    if unchanged {
        queue.transition_rename(Phase::Transform, Phase::Publish, doc_id)?;
    } else {
        queue.transition_write(Phase::Transform, Phase::Publish, &dst, doc_id)?;
    }
    Ok(())
}
