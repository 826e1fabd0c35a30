//! An in-process reference `IndexSink`, so the publisher and integration
//! tests have a concrete index to drive without a real search engine.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{IndexError, IndexSink};
use crate::model::{reserved, Document};

#[derive(Default)]
pub struct InMemoryIndex {
    documents: Mutex<HashMap<String, Document>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &str) -> Option<Document> {
        self.documents.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl IndexSink for InMemoryIndex {
    async fn exists(&self, id: &str) -> Result<bool, IndexError> {
        Ok(self.documents.lock().unwrap().contains_key(id))
    }

    async fn upsert(&self, document: &Document) -> Result<(), IndexError> {
        let id = document
            .id()
            .ok_or_else(|| IndexError::Transient(format!("document missing {}", reserved::NSD_ID)))?
            .to_string();
        self.documents
            .lock()
            .unwrap()
            .insert(id, document.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), IndexError> {
        self.documents.lock().unwrap().remove(id);
        Ok(())
    }

    async fn count(&self, filter: &str) -> Result<u64, IndexError> {
        let documents = self.documents.lock().unwrap();
        if filter.is_empty() {
            return Ok(documents.len() as u64);
        }
        Ok(documents
            .values()
            .filter(|d| d.doc_type == filter)
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Field;

    #[tokio::test]
    async fn upsert_then_exists() {
        let index = InMemoryIndex::new();
        let mut doc = Document::new("a.txt", "File");
        doc.bag.set(Field::text("nsd_id", "x_abc"));

        index.upsert(&doc).await.unwrap();
        assert!(index.exists("x_abc").await.unwrap());
        assert!(!index.exists("x_missing").await.unwrap());
    }

    #[tokio::test]
    async fn delete_removes_document() {
        let index = InMemoryIndex::new();
        let mut doc = Document::new("a.txt", "File");
        doc.bag.set(Field::text("nsd_id", "x_abc"));
        index.upsert(&doc).await.unwrap();

        index.delete("x_abc").await.unwrap();
        assert!(!index.exists("x_abc").await.unwrap());
    }
}
