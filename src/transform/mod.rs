//! The transformer pipeline (spec §4.4): an ordered, configurable sequence
//! of named document transformers, resolved from a static registry.

mod bag_copy;
mod content_clean;
mod doc_type;
mod field_delete;
mod field_mapper;
mod pc_collapse;
mod pc_composite;
pub mod registry;

pub use bag_copy::BagCopy;
pub use content_clean::ContentClean;
pub use doc_type::DocTypeAssign;
pub use field_delete::FieldDelete;
pub use field_mapper::FieldMapper;
pub use pc_collapse::PcCollapse;
pub use pc_composite::PcComposite;

use tracing::warn;

use crate::error::CrawlResult;
use crate::model::Document;

/// A named, pure `Document -> Document` function plus a `validate()`
/// precondition check. Implementations cache their parsed configuration at
/// construction time; `process` never re-reads a file.
pub trait Transformer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fails with `ConfigInvalid` if a required configuration file or
    /// property is missing.
    fn validate(&self) -> CrawlResult<()>;

    /// Pure: produces a freshly-allocated document, never mutating `src`.
    fn process(&self, src: &Document) -> CrawlResult<Document>;
}

fn is_empty_result(doc: &Document) -> bool {
    doc.doc_type.is_empty() && doc.bag.is_empty() && doc.relationships.is_empty()
}

/// An ordered sequence of transformers. Unknown names collapse to identity
/// at registry-resolution time (spec §4.4); here, a transformer that
/// errors or returns an empty document is itself replaced with a bag-copy
/// of the document as it stood before that stage (spec §7 `TransformFailed`).
pub struct Pipeline {
    transformers: Vec<Box<dyn Transformer>>,
}

impl Pipeline {
    pub fn new(transformers: Vec<Box<dyn Transformer>>) -> Self {
        Self { transformers }
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    pub fn validate(&self) -> CrawlResult<()> {
        for t in &self.transformers {
            t.validate()?;
        }
        Ok(())
    }

    /// `src` flows through each transformer in order; `dst = T.process(src);
    /// src = dst`. Returns the final document alongside whether every stage
    /// resolved to a referentially-unchanged identity (used by the
    /// transform worker to pick rename-only vs. write-then-delete handoff).
    pub fn execute(&self, src: Document) -> (Document, bool) {
        let mut current = src;
        let mut all_identity = true;

        for t in &self.transformers {
            let pre = current.clone();
            let outcome = t.process(&current);
            current = match outcome {
                Ok(dst) if !is_empty_result(&dst) => {
                    if dst != pre {
                        all_identity = false;
                    }
                    dst
                }
                Ok(_) => {
                    warn!(transformer = t.name(), "empty result, substituting bag-copy");
                    all_identity = false;
                    pre.deep_clone()
                }
                Err(e) => {
                    warn!(transformer = t.name(), error = %e, "transform failed, substituting bag-copy");
                    all_identity = false;
                    pre.deep_clone()
                }
            };
        }

        (current, all_identity)
    }
}
