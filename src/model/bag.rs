//! The primary field container (spec §3): an ordered, name-unique mapping
//! of field name to [`Field`].

use serde::{Deserialize, Serialize};

use super::field::Field;
use super::ordered_map::OrderedMap;
use super::reserved;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bag {
    fields: OrderedMap<Field>,
}

impl Bag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Insert or replace a field, preserving its original position if it
    /// already existed.
    pub fn set(&mut self, field: Field) {
        self.fields.insert(field.name.clone(), field);
    }

    pub fn remove(&mut self, name: &str) -> Option<Field> {
        self.fields.remove(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    pub fn fields_mut(&mut self) -> impl Iterator<Item = &mut Field> {
        self.fields.iter_mut().map(|(_, v)| v)
    }

    pub fn retain(&mut self, predicate: impl FnMut(&str, &Field) -> bool) {
        self.fields.retain(predicate);
    }

    /// The single field with `is_content=true`, if one exists.
    pub fn content_field(&self) -> Option<&Field> {
        self.fields().find(|f| f.is_content())
    }

    pub fn content_field_mut(&mut self) -> Option<&mut Field> {
        self.fields_mut().find(|f| f.is_content())
    }

    /// The single field with `is_primary_key=true`, if one exists.
    pub fn primary_key_field(&self) -> Option<&Field> {
        self.fields().find(|f| f.is_primary_key())
    }

    pub fn get_single(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|f| f.single_value())
    }

    pub fn set_text(&mut self, name: &str, value: impl Into<String>) {
        match self.get_mut(name) {
            Some(field) => field.set_single_value(value),
            None => self.set(Field::text(name, value)),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.get_single(reserved::NSD_ID)
    }

    pub fn doc_type(&self) -> Option<&str> {
        self.get_single(reserved::NSD_DOC_TYPE)
    }
}

impl FromIterator<Field> for Bag {
    fn from_iter<T: IntoIterator<Item = Field>>(iter: T) -> Self {
        let mut bag = Bag::new();
        for field in iter {
            bag.set(field);
        }
        bag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldType;

    #[test]
    fn set_preserves_position_on_replace() {
        let mut bag = Bag::new();
        bag.set(Field::text("a", "1"));
        bag.set(Field::text("b", "2"));
        bag.set(Field::text("a", "99"));
        let names: Vec<_> = bag.fields().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(bag.get_single("a"), Some("99"));
    }

    #[test]
    fn content_field_lookup() {
        let mut bag = Bag::new();
        let mut f = Field::text("body", "hello world");
        f.set_feature("is_content", "true");
        bag.set(f);
        bag.set(Field::new("other", FieldType::Text));
        assert_eq!(bag.content_field().map(|f| f.name.as_str()), Some("body"));
    }
}
