//! Minimal, non-recursive web extractor (spec §11.3 supplement): fetches a
//! fixed list of URLs and emits one document per successful response. Real
//! link discovery/recursive crawling is out of scope for this crate; this
//! exists so `extract.root` can name an `http(s)://` URL list file instead
//! of only a filesystem path.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{CrawlError, CrawlResult};
use crate::hashing::{document_hash, generate_doc_id};
use crate::model::reserved;
use crate::queue::{ChannelMessage, Phase, Sentinel};

use super::{prototype_document, ExtractContext, Extractor};

pub struct WebExtractor {
    client: reqwest::Client,
}

impl WebExtractor {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for WebExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn read_url_list(path: &std::path::Path) -> CrawlResult<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CrawlError::ConfigInvalid(format!("cannot read url list {}: {e}", path.display()))
    })?;
    Ok(text
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect())
}

#[async_trait]
impl Extractor for WebExtractor {
    async fn run(&self, ctx: &ExtractContext) -> CrawlResult<()> {
        let urls = read_url_list(&ctx.settings.extract.root)?;
        let id_prefix = ctx.id_prefix().to_string();
        let content_limit = ctx.settings.extract.content_limit;
        let validation_only = ctx.settings.extract.validation_only;

        ctx.send(ChannelMessage::Sentinel(Sentinel::Start)).await;

        let mut emitted = 0usize;
        let mut aborted = false;

        for url in urls {
            if ctx.is_cancelled() {
                aborted = true;
                break;
            }
            if !ctx.follow.is_empty() && !ctx.follow.is_matched_normalized(&url) {
                continue;
            }
            if ctx.ignore.is_matched_normalized(&url) {
                continue;
            }

            let response = match self.client.get(&url).send().await {
                Ok(r) => r,
                Err(e) => {
                    warn!(url = %url, error = %e, "fetch failed, skipping");
                    continue;
                }
            };
            let mime_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.split(';').next().unwrap_or(s).trim().to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());

            let bytes = match response.bytes().await {
                Ok(b) => b,
                Err(e) => {
                    warn!(url = %url, error = %e, "failed reading response body, skipping");
                    continue;
                }
            };

            let doc_id = generate_doc_id(&id_prefix, &url);
            let mut doc = prototype_document(url.clone(), reserved::UNKNOWN_DOC_TYPE);
            doc.bag.set_text(reserved::NSD_ID, doc_id.clone());
            doc.bag.set_text(reserved::NSD_URL, url.clone());
            doc.bag.set_text(reserved::NSD_MIME_TYPE, mime_type.clone());
            doc.bag
                .set_text(reserved::NSD_CRAWL_TYPE, ctx.crawl_type().as_str());
            if let Some(text) = ctx.detector.extract(&bytes, &mime_type, content_limit) {
                if let Some(content) = doc.bag.content_field_mut() {
                    content.set_single_value(text);
                }
            }
            let hash = document_hash(&doc)?;
            doc.bag.set_text(reserved::NSD_DOC_HASH, hash);

            if validation_only {
                emitted += 1;
                continue;
            }

            ctx.queue.write_into(Phase::Extract, &doc, &doc_id)?;
            ctx.send(ChannelMessage::doc_id(doc_id)).await;
            emitted += 1;
        }

        info!(emitted, aborted, "web extractor finished");
        ctx.finish(aborted).await;
        Ok(())
    }
}
