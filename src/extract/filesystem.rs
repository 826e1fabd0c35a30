//! Depth-first filesystem extractor (spec §4.3): walks a root directory,
//! applies follow/ignore policy and the incremental gate, and emits one
//! document per qualifying file (or one per row, when CSV expansion is
//! configured).

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::CrawlResult;
use crate::external::IndexSink;
use crate::hashing::{document_hash, generate_doc_id};
use crate::model::{reserved, Document, Field};
use crate::queue::{ChannelMessage, CrawlType, Phase};

use super::{prototype_document, ExtractContext, Extractor};

pub struct FilesystemExtractor;

impl FilesystemExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FilesystemExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn system_time_to_chrono(t: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(t)
}

fn relative_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn is_csv_mime(mime_type: &str) -> bool {
    mime_type == "text/csv" || mime_type == "application/csv"
}

#[async_trait]
impl Extractor for FilesystemExtractor {
    async fn run(&self, ctx: &ExtractContext) -> CrawlResult<()> {
        let root = ctx.settings.extract.root.clone();
        let validation_only = ctx.settings.extract.validation_only;
        let content_limit = ctx.settings.extract.content_limit;
        let id_prefix = ctx.id_prefix().to_string();

        ctx.send(ChannelMessage::Sentinel(crate::queue::Sentinel::Start))
            .await;

        let mut seen = 0usize;
        let mut emitted = 0usize;
        let mut aborted = false;

        // Pre-visit directory: prune whole subtrees the Follow policy excludes
        // (spec §4.3 step 1), rather than only filtering individual files.
        let prune_root = root.clone();
        let follow = &ctx.follow;
        let walker = WalkDir::new(&root)
            .follow_links(false)
            .into_iter()
            .filter_entry(move |entry| {
                if entry.file_type().is_file() || entry.path() == prune_root {
                    return true;
                }
                if follow.is_empty() {
                    return true;
                }
                let rel = relative_name(&prune_root, entry.path());
                follow.is_matched_normalized(&rel)
            });

        for entry in walker {
            if ctx.is_cancelled() {
                warn!("extractor cancelled mid-walk");
                aborted = true;
                break;
            }

            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let rel = relative_name(&root, path);

            if !ctx.follow.is_empty() && !ctx.follow.is_matched_normalized(&rel) {
                debug!(path = %rel, "skipped: not in follow list");
                continue;
            }
            if ctx.ignore.is_matched_normalized(&rel) {
                debug!(path = %rel, "skipped: matched ignore list");
                continue;
            }

            let metadata = match fs::metadata(path) {
                Ok(m) => m,
                Err(e) => {
                    warn!(path = %rel, error = %e, "skipping unreadable file");
                    continue;
                }
            };
            let modified = metadata.modified().map(system_time_to_chrono).ok();
            let doc_id = generate_doc_id(&id_prefix, &rel);

            // Incremental gate (spec §4.3 step 3): a docId absent from the
            // index is always processed, regardless of mtime; a docId
            // present in the index is processed only if the file changed
            // since the last crawl.
            if ctx.crawl_type() == CrawlType::Incremental {
                match ctx.index.exists(&doc_id).await {
                    Ok(true) => {
                        let changed = match (modified, ctx.since) {
                            (Some(modified), Some(since)) => modified > since,
                            _ => true,
                        };
                        if !changed {
                            debug!(path = %rel, "skipped: unchanged since last incremental crawl");
                            continue;
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!(path = %rel, error = %e, "index lookup failed, processing file");
                    }
                }
            }

            seen += 1;

            let bytes = match fs::read(path) {
                Ok(b) => b,
                Err(e) => {
                    warn!(path = %rel, error = %e, "failed to read file, skipping");
                    continue;
                }
            };
            let mime_type = ctx.detector.detect_type(&bytes, Some(&rel));

            if ctx.settings.extract.csv_row_to_document && is_csv_mime(&mime_type) {
                match emit_csv_rows(ctx, &rel, &bytes, &id_prefix, validation_only).await {
                    Ok(n) => emitted += n,
                    Err(e) => warn!(path = %rel, error = %e, "csv expansion failed, skipping file"),
                }
                continue;
            }

            let created = metadata.created().map(system_time_to_chrono).ok();
            let mut doc = prototype_document(rel.clone(), reserved::UNKNOWN_DOC_TYPE);
            doc.bag.set_text(reserved::NSD_ID, doc_id.clone());
            doc.bag.set_text(reserved::NSD_FILE_NAME, rel.clone());
            doc.bag
                .set_text(reserved::NSD_URL, format!("file://{}", path.display()));
            doc.bag
                .set_text(reserved::NSD_URL_VIEW, format!("file://{}", path.display()));
            doc.bag.set_text(reserved::NSD_URL_DISPLAY, rel.clone());
            doc.bag.set_text(reserved::NSD_MIME_TYPE, mime_type.clone());
            doc.bag
                .set_text(reserved::NSD_FILE_SIZE, metadata.len().to_string());
            doc.bag
                .set_text(reserved::NSD_CRAWL_TYPE, ctx.crawl_type().as_str());
            if let Some(created) = created {
                doc.bag
                    .set_text(reserved::NSD_DOC_CREATED_TS, created.to_rfc3339());
            }
            if let Some(modified) = modified {
                doc.bag
                    .set_text(reserved::NSD_DOC_MODIFIED_TS, modified.to_rfc3339());
            }
            if let Some(text) = ctx.detector.extract(&bytes, &mime_type, content_limit) {
                if let Some(content) = doc.bag.content_field_mut() {
                    content.set_single_value(text);
                }
            }
            let hash = document_hash(&doc)?;
            doc.bag.set_text(reserved::NSD_DOC_HASH, hash);

            if validation_only {
                debug!(path = %rel, "validation-only: skipping write and enqueue");
                emitted += 1;
                continue;
            }

            ctx.queue.write_into(Phase::Extract, &doc, &doc_id)?;
            ctx.send(ChannelMessage::doc_id(doc_id)).await;
            emitted += 1;
        }

        info!(seen, emitted, aborted, "extractor walk finished");
        ctx.finish(aborted).await;
        Ok(())
    }
}

async fn emit_csv_rows(
    ctx: &ExtractContext,
    parent_rel: &str,
    bytes: &[u8],
    id_prefix: &str,
    validation_only: bool,
) -> CrawlResult<usize> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(bytes);
    let headers = reader.headers()?.clone();
    let mut count = 0usize;

    for (row_index, record) in reader.records().enumerate() {
        let record = record?;
        let logical_key = format!("{parent_rel}#{row_index}");
        let doc_id = generate_doc_id(id_prefix, &logical_key);

        let mut doc = prototype_document(logical_key.clone(), reserved::UNKNOWN_DOC_TYPE);
        doc.bag.set_text(reserved::NSD_ID, doc_id.clone());
        doc.bag.set_text(reserved::NSD_FILE_NAME, parent_rel.to_string());
        doc.bag.set_text(reserved::NSD_MIME_TYPE, "text/csv");
        doc.bag
            .set_text(reserved::NSD_CRAWL_TYPE, ctx.crawl_type().as_str());

        for (header, value) in headers.iter().zip(record.iter()) {
            doc.bag.set(Field::text(header, value));
        }

        let hash = document_hash(&doc)?;
        doc.bag.set_text(reserved::NSD_DOC_HASH, hash);

        if validation_only {
            count += 1;
            continue;
        }

        ctx.queue.write_into(Phase::Extract, &doc, &doc_id)?;
        ctx.send(ChannelMessage::doc_id(doc_id)).await;
        count += 1;
    }

    Ok(count)
}

impl From<csv::Error> for crate::error::CrawlError {
    fn from(e: csv::Error) -> Self {
        crate::error::CrawlError::ExtractionFailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Settings};
    use crate::external::{InferContentDetector, InMemoryIndex};
    use crate::policy::PathPolicy;
    use crate::queue::CrawlQueue;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use tempfile::tempdir;
    use tokio::sync::mpsc;

    fn build_ctx(root: std::path::PathBuf, queue: Arc<CrawlQueue>) -> (ExtractContext, mpsc::Receiver<ChannelMessage>) {
        let mut config = Config::default();
        config.extract.root = root;
        config.extract.id_value_prefix = "x_".to_string();
        let settings = Arc::new(Settings::from_config(config));
        let (tx, rx) = mpsc::channel(64);
        let ctx = ExtractContext {
            queue,
            settings,
            follow: PathPolicy::empty(),
            ignore: PathPolicy::empty(),
            index: Arc::new(InMemoryIndex::new()),
            detector: Arc::new(InferContentDetector::new()),
            sender: tx,
            cancel: Arc::new(AtomicBool::new(false)),
            since: None,
        };
        (ctx, rx)
    }

    #[tokio::test]
    async fn walks_single_file_and_emits_one_document() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello world").unwrap();

        let queue = Arc::new(CrawlQueue::new(dir.path()));
        queue.start(crate::queue::CrawlType::Full, None).unwrap();

        let (ctx, mut rx) = build_ctx(dir.path().to_path_buf(), queue.clone());
        FilesystemExtractor::new().run(&ctx).await.unwrap();

        let mut doc_ids = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let ChannelMessage::DocId { id, .. } = msg {
                doc_ids.push(id);
            }
        }
        assert_eq!(doc_ids.len(), 1);
        let doc = queue.read_from(Phase::Extract, &doc_ids[0]).unwrap();
        assert_eq!(doc.bag.get_single(reserved::NSD_FILE_NAME), Some("a.txt"));
    }

    #[tokio::test]
    async fn ignore_list_skips_matching_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("keep.txt"), b"keep").unwrap();
        std::fs::write(dir.path().join("skip.log"), b"skip").unwrap();

        let queue = Arc::new(CrawlQueue::new(dir.path()));
        queue.start(crate::queue::CrawlType::Full, None).unwrap();

        let (mut ctx, mut rx) = build_ctx(dir.path().to_path_buf(), queue.clone());
        ctx.ignore = PathPolicy::parse("\\.log$").unwrap();
        FilesystemExtractor::new().run(&ctx).await.unwrap();

        let mut names = Vec::new();
        while let Ok(ChannelMessage::DocId { id, .. }) = rx.try_recv() {
            let doc = queue.read_from(Phase::Extract, &id).unwrap();
            names.push(doc.bag.get_single(reserved::NSD_FILE_NAME).unwrap().to_string());
        }
        assert_eq!(names, vec!["keep.txt".to_string()]);
    }
}
