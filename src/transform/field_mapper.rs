//! Renames fields across every bag in the document tree from a
//! `sourceFieldName = targetFieldName` properties file (spec §4.4).

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{CrawlError, CrawlResult};
use crate::model::{Bag, Document, Field};

use super::Transformer;

/// Splits on the first `=` after trimming the key, matching the teacher's
/// documented Java-properties parsing behavior (keys may themselves
/// contain whitespace).
fn parse_properties(text: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            map.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    map
}

fn load(path: &std::path::Path) -> CrawlResult<HashMap<String, String>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CrawlError::ConfigInvalid(format!("cannot read field-mapper file {}: {e}", path.display()))
    })?;
    Ok(parse_properties(&text))
}

pub struct FieldMapper {
    path: Option<PathBuf>,
    mapping: HashMap<String, String>,
}

impl FieldMapper {
    pub fn new(path: Option<PathBuf>) -> CrawlResult<Self> {
        let mapping = match &path {
            Some(p) => load(p)?,
            None => HashMap::new(),
        };
        Ok(Self { path, mapping })
    }

    fn rename_bag(&self, bag: &Bag) -> Bag {
        bag.fields()
            .map(|field| {
                let mut renamed = field.clone();
                if let Some(target) = self.mapping.get(&field.name) {
                    renamed.name = target.clone();
                }
                renamed
            })
            .collect::<Vec<Field>>()
            .into_iter()
            .collect()
    }
}

impl Transformer for FieldMapper {
    fn name(&self) -> &'static str {
        super::registry::FIELD_MAPPER
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
            *bag = self.rename_bag(bag);
        });
        Ok(dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn renames_matching_fields_and_preserves_count() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "old_name = new_name").unwrap();
        let mapper = FieldMapper::new(Some(f.path().to_path_buf())).unwrap();

        let mut doc = Document::new("a", "File");
        doc.bag.set(Field::text("old_name", "v1"));
        doc.bag.set(Field::text("other", "v2"));

        let before_count = doc.bag.len();
        let out = mapper.process(&doc).unwrap();

        assert_eq!(out.bag.len(), before_count);
        assert_eq!(out.bag.get_single("new_name"), Some("v1"));
        assert_eq!(out.bag.get_single("other"), Some("v2"));
        assert!(out.bag.get("old_name").is_none());
    }

    #[test]
    fn parses_keys_with_embedded_whitespace() {
        let mapping = parse_properties("source name = target name\n");
        assert_eq!(
            mapping.get("source name").map(|s| s.as_str()),
            Some("target name")
        );
    }
}
