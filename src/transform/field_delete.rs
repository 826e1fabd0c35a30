//! Drops fields matching a glob pattern list across every bag in the
//! document tree (spec §4.4).

use std::path::PathBuf;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::{CrawlError, CrawlResult};
use crate::model::Document;

use super::Transformer;

fn load(path: &std::path::Path) -> CrawlResult<GlobSet> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CrawlError::ConfigInvalid(format!("cannot read field-delete file {}: {e}", path.display()))
    })?;
    let mut builder = GlobSetBuilder::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let glob = Glob::new(line)
            .map_err(|e| CrawlError::ConfigInvalid(format!("bad glob {line:?}: {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| CrawlError::ConfigInvalid(format!("bad field-delete patterns: {e}")))
}

pub struct FieldDelete {
    path: Option<PathBuf>,
    patterns: GlobSet,
}

impl FieldDelete {
    pub fn new(path: Option<PathBuf>) -> CrawlResult<Self> {
        let patterns = match &path {
            Some(p) => load(p)?,
            None => GlobSetBuilder::new().build().unwrap(),
        };
        Ok(Self { path, patterns })
    }
}

impl Transformer for FieldDelete {
    fn name(&self) -> &'static str {
        super::registry::FIELD_DELETE
    }

    fn validate(&self) -> CrawlResult<()> {
        if let Some(path) = &self.path {
            load(path)?;
        }
        Ok(())
    }

    fn process(&self, src: &Document) -> CrawlResult<Document> {
        let mut dst = src.deep_clone();
        dst.walk_bags_mut(&mut |bag| {
            bag.retain(|name, _| !self.patterns.is_match(name));
        });
        Ok(dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Field;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn deletes_matching_fields_and_shrinks_bag() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "nsd_*").unwrap();
        let transformer = FieldDelete::new(Some(f.path().to_path_buf())).unwrap();

        let mut doc = Document::new("a", "File");
        doc.bag.set(Field::text("nsd_id", "x"));
        doc.bag.set(Field::text("title", "y"));

        let before = doc.bag.len();
        let out = transformer.process(&doc).unwrap();
        assert!(out.bag.len() < before);
        assert!(out.bag.get("nsd_id").is_none());
        assert!(out.bag.get("title").is_some());
    }

    #[test]
    fn no_matching_pattern_is_a_no_op() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "does_not_exist_*").unwrap();
        let transformer = FieldDelete::new(Some(f.path().to_path_buf())).unwrap();

        let mut doc = Document::new("a", "File");
        doc.bag.set(Field::text("title", "y"));
        let before = doc.bag.len();
        let out = transformer.process(&doc).unwrap();
        assert_eq!(out.bag.len(), before);
    }
}
