//! Single-level relationship-bag collapse into the root bag (spec §4.4
//! pc-collapse). Registered under two names, `field_collapse` and
//! `pc_collapse` (see registry.rs) so a pipeline can run two
//! independently-configured instances.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{CrawlError, CrawlResult};
use crate::model::{reserved, Document, Field};

use super::Transformer;

/// `docType = relType1,relType2,...`
fn load(path: &std::path::Path) -> CrawlResult<HashMap<String, Vec<String>>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CrawlError::ConfigInvalid(format!("cannot read pc-collapse file {}: {e}", path.display()))
    })?;
    let mut map = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((doc_type, rel_types)) = line.split_once('=') {
            let rel_types = rel_types
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            map.insert(doc_type.trim().to_string(), rel_types);
        }
    }
    Ok(map)
}

fn title_to_name(s: &str) -> String {
    s.to_lowercase().replace([' ', '-'], "_")
}

pub struct PcCollapse {
    registry_key: &'static str,
    path: Option<PathBuf>,
    id_prefix: String,
    mapping: HashMap<String, Vec<String>>,
}

impl PcCollapse {
    pub fn new(
        registry_key: &'static str,
        path: Option<PathBuf>,
        id_prefix: String,
    ) -> CrawlResult<Self> {
        let mapping = match &path {
            Some(p) => load(p)?,
            None => HashMap::new(),
        };
        Ok(Self {
            registry_key,
            path,
            id_prefix,
            mapping,
        })
    }

    fn skip_field(&self, name: &str) -> bool {
        reserved::is_reserved_prefix(name) || name == format!("{}id", self.id_prefix)
    }
}

impl Transformer for PcCollapse {
    fn name(&self) -> &'static str {
        self.registry_key
    }

    fn validate(&self) -> CrawlResult<()> {
        if let Some(path) = &self.path {
            load(path)?;
        }
        Ok(())
    }

    fn process(&self, src: &Document) -> CrawlResult<Document> {
        let mut dst = src.deep_clone();
        let Some(allowed) = self.mapping.get(&dst.doc_type) else {
            return Ok(dst);
        };

        for rel in &dst.relationships {
            if !allowed.contains(&rel.rel_type) {
                continue;
            }
            let child_doc_type = rel
                .documents
                .first()
                .map(|d| d.doc_type.clone())
                .unwrap_or_else(|| rel.rel_type.clone());
            let prefix = title_to_name(&child_doc_type);

            for field in rel.bag.fields() {
                if self.skip_field(&field.name) {
                    continue;
                }
                let new_name = format!("rel_{prefix}_{}", field.name);
                match dst.bag.get_mut(&new_name) {
                    Some(existing) => {
                        existing.values.extend(field.values.clone());
                        existing.multi_value_flag = true;
                    }
                    None => {
                        let mut collapsed = Field::new(new_name, field.field_type);
                        collapsed.values = field.values.clone();
                        collapsed.multi_value_flag = field.values.len() > 1;
                        dst.bag.set(collapsed);
                    }
                }
            }
        }

        dst.relationships.clear();
        Ok(dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Relationship;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn identity_on_bag_when_no_relationships() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "Part = Part BOM").unwrap();
        let t = PcCollapse::new("pc_collapse", Some(f.path().to_path_buf()), "x_".to_string())
            .unwrap();

        let doc = Document::new("p", "Part");
        let out = t.process(&doc).unwrap();
        assert_eq!(out.bag, doc.bag);
        assert!(out.relationships.is_empty());
    }

    #[test]
    fn folds_matching_relationship_bag_into_root() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "Part = Part BOM").unwrap();
        let t = PcCollapse::new("pc_collapse", Some(f.path().to_path_buf()), "x_".to_string())
            .unwrap();

        let mut doc = Document::new("p", "Part");
        let mut rel = Relationship::new("Part BOM");
        rel.bag.set(Field::text("qty", "3"));
        rel.documents.push(Document::new("c", "BomLine"));
        doc.relationships.push(rel);

        let out = t.process(&doc).unwrap();
        assert_eq!(out.bag.get_single("rel_bomline_qty"), Some("3"));
        assert!(out.relationships.is_empty());
    }
}
