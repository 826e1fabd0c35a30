//! Per-document on-disk serialization (spec §6): XML, one file per document.

use std::fs;
use std::path::Path;

use crate::error::{CrawlError, CrawlResult};
use crate::model::Document;

pub fn write_document(path: &Path, document: &Document) -> CrawlResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let xml = quick_xml::se::to_string(document)
        .map_err(|e| CrawlError::Serialization(e.to_string()))?;
    fs::write(path, xml)?;
    Ok(())
}

pub fn read_document(path: &Path) -> CrawlResult<Document> {
    let xml = fs::read_to_string(path)?;
    quick_xml::de::from_str(&xml).map_err(|e| CrawlError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Field;
    use tempfile::tempdir;

    #[test]
    fn round_trips_a_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.xml");

        let mut doc = Document::new("a.txt", "File");
        doc.bag.set(Field::text("nsd_id", "x_abc123"));
        doc.bag.set(Field::text("nsd_file_name", "a.txt"));

        write_document(&path, &doc).unwrap();
        let loaded = read_document(&path).unwrap();

        assert_eq!(loaded.bag.get_single("nsd_id"), Some("x_abc123"));
        assert_eq!(loaded.doc_type, "File");
    }
}
