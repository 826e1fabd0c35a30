//! The document model (spec §3): a recursive tree of `{bag, relationships[]}`.

use serde::{Deserialize, Serialize};

use super::bag::Bag;
use super::ordered_map::OrderedMap;
use super::reserved;

/// A typed relationship from a document to a list of child documents, each
/// relationship carrying its own attribute bag. Relationships may nest to
/// arbitrary depth through the child documents' own relationships.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "type")]
    pub rel_type: String,
    pub bag: Bag,
    pub documents: Vec<Document>,
}

impl Relationship {
    pub fn new(rel_type: impl Into<String>) -> Self {
        Self {
            rel_type: rel_type.into(),
            bag: Bag::new(),
            documents: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub title: String,
    pub schema_version: String,
    pub features: OrderedMap<String>,
    pub bag: Bag,
    pub relationships: Vec<Relationship>,
    /// Principal -> permission.
    pub acl: OrderedMap<String>,
}

impl Document {
    pub fn new(name: impl Into<String>, doc_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc_type: doc_type.into(),
            title: String::new(),
            schema_version: String::new(),
            features: OrderedMap::new(),
            bag: Bag::new(),
            relationships: Vec::new(),
            acl: OrderedMap::new(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.bag.id()
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<String>) {
        self.bag.set_text(name, value);
    }

    /// Deep clone, the identity operation behind the `bag-copy` transformer
    /// (invariant 4/7: transformers never mutate their input, and a
    /// bag-copy result is referentially independent of its source).
    pub fn deep_clone(&self) -> Document {
        self.clone()
    }

    /// Visit every bag in the document tree in depth-first pre-order: this
    /// document's own bag, then each relationship's bag, then recursively
    /// each related document's tree. Several transformers (content-clean,
    /// doc-type-assign, field-mapper, field-delete) operate over exactly
    /// this set (spec §4.4).
    pub fn walk_bags_mut(&mut self, f: &mut impl FnMut(&mut Bag)) {
        f(&mut self.bag);
        for rel in &mut self.relationships {
            f(&mut rel.bag);
            for child in &mut rel.documents {
                child.walk_bags_mut(f);
            }
        }
    }

    pub fn walk_bags(&self, f: &mut impl FnMut(&Bag)) {
        f(&self.bag);
        for rel in &self.relationships {
            f(&rel.bag);
            for child in &rel.documents {
                child.walk_bags(f);
            }
        }
    }

    pub fn is_parent(&self) -> bool {
        self.bag
            .get(reserved::NSD_IS_PARENT)
            .and_then(|f| f.single_value())
            == Some("true")
    }

    pub fn set_is_parent(&mut self, value: bool) {
        self.bag
            .set_text(reserved::NSD_IS_PARENT, if value { "true" } else { "false" });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Field;

    #[test]
    fn deep_clone_is_referentially_independent() {
        let mut doc = Document::new("a.txt", "File");
        doc.bag.set(Field::text("nsd_id", "abc"));

        let mut copy = doc.deep_clone();
        copy.bag.set(Field::text("nsd_id", "xyz"));

        assert_eq!(doc.bag.get_single("nsd_id"), Some("abc"));
        assert_eq!(copy.bag.get_single("nsd_id"), Some("xyz"));
    }

    #[test]
    fn walk_bags_visits_root_then_relationships_then_children() {
        let mut doc = Document::new("parent", "Part");
        let mut rel = Relationship::new("Part BOM");
        rel.documents.push(Document::new("child", "BomLine"));
        doc.relationships.push(rel);

        let mut seen = Vec::new();
        doc.walk_bags(&mut |bag| seen.push(bag as *const Bag));
        assert_eq!(seen.len(), 3);
    }
}
