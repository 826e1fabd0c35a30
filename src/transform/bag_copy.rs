//! Deep-clone identity transformer: used directly and as the terminal
//! fallback for unknown registry names and failed stages.

use crate::error::CrawlResult;
use crate::model::Document;

use super::Transformer;

#[derive(Default)]
pub struct BagCopy;

impl BagCopy {
    pub fn new() -> Self {
        Self
    }
}

impl Transformer for BagCopy {
    fn name(&self) -> &'static str {
        super::registry::BAG_COPY
    }

    fn validate(&self) -> CrawlResult<()> {
        Ok(())
    }

    fn process(&self, src: &Document) -> CrawlResult<Document> {
        Ok(src.deep_clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_a_structurally_equal_independent_copy() {
        let doc = Document::new("a", "File");
        let copy = BagCopy::new().process(&doc).unwrap();
        assert_eq!(copy, doc);
    }
}
