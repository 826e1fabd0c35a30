//! Assigns `nsd_doc_type` from a MIME/extension/icon lookup table (spec
//! §4.4 doc-type-assign).

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{CrawlError, CrawlResult};
use crate::model::{reserved, Document};

use super::Transformer;

#[derive(Debug, Clone, Default)]
struct DocTypeTable {
    by_mime: HashMap<String, String>,
    by_extension: HashMap<String, String>,
}

impl DocTypeTable {
    fn name_by_mime_type(&self, mime: &str) -> &str {
        self.by_mime
            .get(mime)
            .map(|s| s.as_str())
            .unwrap_or(reserved::UNKNOWN_DOC_TYPE)
    }

    fn name_by_file_extension(&self, file_name: &str) -> &str {
        let ext = file_name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
        self.by_extension
            .get(&ext)
            .map(|s| s.as_str())
            .unwrap_or(reserved::UNKNOWN_DOC_TYPE)
    }
}

/// Header: `type_name,file_extension,mime_type,url_pattern,icon_name`.
fn load_table(path: &std::path::Path) -> CrawlResult<DocTypeTable> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| CrawlError::ConfigInvalid(format!("cannot read doc-type table: {e}")))?;
    let mut table = DocTypeTable::default();
    for record in reader.records() {
        let record =
            record.map_err(|e| CrawlError::ConfigInvalid(format!("bad doc-type row: {e}")))?;
        let type_name = record.get(0).unwrap_or_default().to_string();
        let extension = record.get(1).unwrap_or_default().to_ascii_lowercase();
        let mime_type = record.get(2).unwrap_or_default().to_string();
        if !mime_type.is_empty() {
            table.by_mime.insert(mime_type, type_name.clone());
        }
        if !extension.is_empty() {
            table.by_extension.insert(extension, type_name);
        }
    }
    Ok(table)
}

pub struct DocTypeAssign {
    path: Option<PathBuf>,
    table: DocTypeTable,
}

impl DocTypeAssign {
    pub fn new(path: Option<PathBuf>) -> CrawlResult<Self> {
        let table = match &path {
            Some(p) => load_table(p)?,
            None => DocTypeTable::default(),
        };
        Ok(Self { path, table })
    }
}

impl Transformer for DocTypeAssign {
    fn name(&self) -> &'static str {
        super::registry::DOC_TYPE
    }

    fn validate(&self) -> CrawlResult<()> {
        if let Some(path) = &self.path {
            load_table(path)?;
        }
        Ok(())
    }

    fn process(&self, src: &Document) -> CrawlResult<Document> {
        let mut dst = src.deep_clone();
        dst.walk_bags_mut(&mut |bag| {
            let needs_assignment = match bag.get(reserved::NSD_DOC_TYPE).and_then(|f| f.single_value()) {
                None => true,
                Some("") => true,
                Some(reserved::UNKNOWN_DOC_TYPE) => true,
                Some(_) => false,
            };
            if !needs_assignment {
                return;
            }
            let mime = bag
                .get_single(reserved::NSD_MIME_TYPE)
                .unwrap_or_default()
                .to_string();
            let mut resolved = self.table.name_by_mime_type(&mime).to_string();
            if resolved == reserved::UNKNOWN_DOC_TYPE {
                let file_name = bag
                    .get_single(reserved::NSD_FILE_NAME)
                    .unwrap_or_default()
                    .to_string();
                resolved = self.table.name_by_file_extension(&file_name).to_string();
            }
            bag.set_text(reserved::NSD_DOC_TYPE, resolved);
        });
        Ok(dst)
    }
}
