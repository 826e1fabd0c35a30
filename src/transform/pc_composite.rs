//! Multi-level parent-child collapse (spec §4.4 parent-child-collapse):
//! folds an arbitrarily deep relationship chain down to a single child
//! level, lifting ancestor fields into the leaf bag.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{CrawlError, CrawlResult};
use crate::model::{reserved, Bag, Document, Field, Relationship};

use super::Transformer;

/// `docType = spec1,spec2,...` where each spec is a `/`-separated chain of
/// relationship types, read level by level.
fn load(path: &std::path::Path) -> CrawlResult<HashMap<String, Vec<Vec<String>>>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CrawlError::ConfigInvalid(format!(
            "cannot read parent-child file {}: {e}",
            path.display()
        ))
    })?;
    let mut map = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((doc_type, specs)) = line.split_once('=') {
            let specs: Vec<Vec<String>> = specs
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|spec| {
                    spec.split('/')
                        .map(|seg| seg.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .collect();
            map.insert(doc_type.trim().to_string(), specs);
        }
    }
    Ok(map)
}

fn merge_child_wins(parent: &Bag, child: &Bag) -> Bag {
    let mut merged = parent.clone();
    for field in child.fields() {
        merged.set(field.clone());
    }
    merged
}

pub struct PcComposite {
    path: Option<PathBuf>,
    mapping: HashMap<String, Vec<Vec<String>>>,
}

impl PcComposite {
    pub fn new(path: Option<PathBuf>) -> CrawlResult<Self> {
        let mapping = match &path {
            Some(p) => load(p)?,
            None => HashMap::new(),
        };
        Ok(Self { path, mapping })
    }
}

#[allow(clippy::too_many_arguments)]
fn collapse_level(
    ancestor_bag: &Bag,
    hop: &str,
    rest: &[String],
    relationships: &[Relationship],
    top_rel_type: &str,
    root_acl: Option<&Field>,
) -> Vec<Relationship> {
    let mut output = Vec::new();

    for rel in relationships {
        if rel.rel_type != hop {
            continue;
        }
        let merged_ancestor = merge_child_wins(ancestor_bag, &rel.bag);

        if rest.len() >= 2 {
            let (next_hop, next_rest) = rest.split_first().unwrap();
            for child in &rel.documents {
                let deeper_ancestor = merge_child_wins(&merged_ancestor, &child.bag);
                output.extend(collapse_level(
                    &deeper_ancestor,
                    next_hop,
                    next_rest,
                    &child.relationships,
                    top_rel_type,
                    root_acl,
                ));
            }
            continue;
        }

        for child in &rel.documents {
            let leaf_label = rest.first().cloned().unwrap_or_else(|| child.doc_type.clone());
            let mut leaf = child.deep_clone();
            leaf.bag = merge_child_wins(&merged_ancestor, &leaf.bag);
            leaf.set_field(reserved::NSD_REL_TYPE, top_rel_type);
            leaf.set_field(reserved::NSD_DOC_TYPE, leaf_label);

            if !leaf.bag.contains(reserved::NSD_ACL_VIEW) {
                if let Some(acl) = root_acl {
                    let mut field = acl.clone();
                    field.multi_value_flag = true;
                    leaf.bag.set(field);
                }
            }
            leaf.relationships.clear();

            let mut out_rel = Relationship::new(top_rel_type.to_string());
            out_rel.documents.push(leaf);
            output.push(out_rel);
        }
    }

    output
}

impl Transformer for PcComposite {
    fn name(&self) -> &'static str {
        super::registry::PC_COMPOSITE
    }

    fn validate(&self) -> CrawlResult<()> {
        if let Some(path) = &self.path {
            load(path)?;
        }
        Ok(())
    }

    fn process(&self, src: &Document) -> CrawlResult<Document> {
        let mut dst = src.deep_clone();
        let Some(specs) = self.mapping.get(&dst.doc_type) else {
            return Ok(dst);
        };

        let root_acl = dst.bag.get(reserved::NSD_ACL_VIEW).cloned();
        let mut collapsed = Vec::new();
        for segments in specs {
            let Some((hop, rest)) = segments.split_first() else {
                continue;
            };
            collapsed.extend(collapse_level(
                &dst.bag,
                hop,
                rest,
                &dst.relationships,
                hop,
                root_acl.as_ref(),
            ));
        }
        dst.relationships = collapsed;

        if dst.bag.contains(reserved::NSD_IS_PARENT) {
            dst.set_is_parent(true);
        }

        if let Some(parent_id) = dst.id().map(|s| s.to_string()) {
            for rel in &mut dst.relationships {
                for doc in &mut rel.documents {
                    match doc.bag.get_mut(reserved::NSD_PARENT_ID) {
                        Some(field) => {
                            if !field.values.contains(&parent_id) {
                                field.values.push(parent_id.clone());
                            }
                            field.multi_value_flag = true;
                        }
                        None => {
                            let mut field = Field::text(reserved::NSD_PARENT_ID, parent_id.clone());
                            field.multi_value_flag = true;
                            doc.bag.set(field);
                        }
                    }
                }
            }
        }

        Ok(dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn collapses_two_level_chain_to_single_relationship() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "Part = Part BOM/BomLine").unwrap();
        let t = PcComposite::new(Some(f.path().to_path_buf())).unwrap();

        let mut doc = Document::new("p", "Part");
        doc.bag.set(Field::text("nsd_id", "parent-1"));

        let mut rel = Relationship::new("Part BOM");
        let mut child = Document::new("c", "BomLine");
        child.bag.set(Field::text("qty", "3"));
        rel.documents.push(child);
        doc.relationships.push(rel);

        let out = t.process(&doc).unwrap();
        assert_eq!(out.relationships.len(), 1);
        let rel = &out.relationships[0];
        assert_eq!(rel.rel_type, "Part BOM");
        let leaf = &rel.documents[0];
        assert_eq!(leaf.bag.get_single("qty"), Some("3"));
        assert_eq!(leaf.bag.get_single(reserved::NSD_REL_TYPE), Some("Part BOM"));
        assert_eq!(leaf.bag.get_single(reserved::NSD_DOC_TYPE), Some("BomLine"));
        assert_eq!(
            leaf.bag.get_single(reserved::NSD_PARENT_ID),
            Some("parent-1")
        );
    }
}
