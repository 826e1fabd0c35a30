//! Typed field values within a [`crate::model::Bag`].

use serde::{Deserialize, Serialize};

use super::ordered_map::OrderedMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    Integer,
    Long,
    Float,
    Double,
    Boolean,
    DateTime,
}

/// Inclusive min/max bounds, stored as their raw string representation —
/// the field's `field_type` governs how a consumer should parse them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldRange {
    pub min: Option<String>,
    pub max: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub title: Option<String>,
    pub features: OrderedMap<String>,
    /// Values in declaration order. A single-value field carries exactly
    /// one entry once populated; a multi-value field carries zero or more.
    pub values: Vec<String>,
    pub default_value: Option<String>,
    pub display_size: Option<u32>,
    pub sort_order: Option<i32>,
    pub range: Option<FieldRange>,
    pub multi_value_flag: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            title: None,
            features: OrderedMap::new(),
            values: Vec::new(),
            default_value: None,
            display_size: None,
            sort_order: None,
            range: None,
            multi_value_flag: false,
        }
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut f = Self::new(name, FieldType::Text);
        f.values.push(value.into());
        f
    }

    pub fn single_value(&self) -> Option<&str> {
        self.values.first().map(|s| s.as_str())
    }

    pub fn set_single_value(&mut self, value: impl Into<String>) {
        self.values = vec![value.into()];
    }

    pub fn feature(&self, name: &str) -> Option<&str> {
        self.features.get(name).map(|s| s.as_str())
    }

    pub fn feature_bool(&self, name: &str) -> bool {
        matches!(self.feature(name), Some("true"))
    }

    pub fn set_feature(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.features.insert(name, value.into());
    }

    pub fn is_content(&self) -> bool {
        self.feature_bool(super::reserved::FEATURE_IS_CONTENT)
    }

    pub fn is_hidden(&self) -> bool {
        self.feature_bool(super::reserved::FEATURE_IS_HIDDEN)
    }

    pub fn is_primary_key(&self) -> bool {
        self.feature_bool(super::reserved::FEATURE_IS_PRIMARY_KEY)
    }

    /// The `mv_delimiter` feature, defaulting to `|` (spec §3).
    pub fn multi_value_delimiter(&self) -> char {
        self.feature("mv_delimiter")
            .and_then(|s| s.chars().next())
            .unwrap_or('|')
    }

    /// Join values with the configured delimiter, for serialization to
    /// row-oriented formats.
    pub fn joined_value(&self) -> String {
        let delim = self.multi_value_delimiter();
        self.values.join(&delim.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_field_carries_single_value() {
        let f = Field::text("title", "hello");
        assert_eq!(f.single_value(), Some("hello"));
    }

    #[test]
    fn default_mv_delimiter_is_pipe() {
        let f = Field::new("tags", FieldType::Text);
        assert_eq!(f.multi_value_delimiter(), '|');
    }

    #[test]
    fn mv_delimiter_feature_overrides_default() {
        let mut f = Field::new("tags", FieldType::Text);
        f.set_feature("mv_delimiter", ";");
        assert_eq!(f.multi_value_delimiter(), ';');
    }
}
