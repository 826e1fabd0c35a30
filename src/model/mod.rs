//! The document model: bags, fields, and the recursive document/relationship
//! tree that flows through extract, transform, and publish.

mod bag;
mod document;
mod field;
mod ordered_map;
pub mod reserved;

pub use bag::Bag;
pub use document::{Document, Relationship};
pub use field::{Field, FieldRange, FieldType};
pub use ordered_map::OrderedMap;
