//! Whitespace/control-character cleanup of the `is_content` field across
//! every bag in the document tree (spec §4.4).

use crate::error::CrawlResult;
use crate::model::Document;

use super::Transformer;

#[derive(Default)]
pub struct ContentClean;

impl ContentClean {
    pub fn new() -> Self {
        Self
    }
}

impl Transformer for ContentClean {
    fn name(&self) -> &'static str {
        super::registry::CONTENT_CLEAN
    }

    fn validate(&self) -> CrawlResult<()> {
        Ok(())
    }

    fn process(&self, src: &Document) -> CrawlResult<Document> {
        let mut dst = src.deep_clone();
        dst.walk_bags_mut(&mut |bag| {
            if let Some(field) = bag.content_field_mut() {
                for value in field.values.iter_mut() {
                    *value = clean(value);
                }
            }
        });
        Ok(dst)
    }
}

/// `dots(spaces(control(v)))`, idempotent by construction: each pass leaves
/// no control characters, no run of whitespace longer than one space, and
/// no run of `.` longer than one.
pub fn clean(v: &str) -> String {
    dots(&spaces(&control(v)))
}

fn control(v: &str) -> String {
    let mut out = String::with_capacity(v.len());
    for c in v.chars() {
        let c = match c {
            '\r' | '\n' | '\t' => ' ',
            other => other,
        };
        if (c as u32) >= 128 {
            continue;
        }
        if c.is_control() && c != ' ' {
            continue;
        }
        out.push(c);
    }
    out.trim().to_string()
}

fn spaces(v: &str) -> String {
    v.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn dots(v: &str) -> String {
    let mut out = String::with_capacity(v.len());
    let mut prev_dot = false;
    for c in v.chars() {
        if c == '.' {
            if prev_dot {
                continue;
            }
            prev_dot = true;
        } else {
            prev_dot = false;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Field;

    fn content_doc(value: &str) -> Document {
        let mut doc = Document::new("a", "File");
        let mut field = Field::text("body", value);
        field.set_feature("is_content", "true");
        doc.bag.set(field);
        doc
    }

    #[test]
    fn collapses_whitespace_and_control_chars() {
        let doc = content_doc("hello\r\n\tworld   foo...bar....baz");
        let cleaned = ContentClean::new().process(&doc).unwrap();
        assert_eq!(
            cleaned.bag.content_field().unwrap().single_value(),
            Some("hello world foo.bar.baz")
        );
    }

    #[test]
    fn is_idempotent() {
        let doc = content_doc("hello\r\nworld....now");
        let once = ContentClean::new().process(&doc).unwrap();
        let twice = ContentClean::new().process(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn does_not_mutate_input() {
        let doc = content_doc("  raw   value  ");
        let before = doc.clone();
        let _ = ContentClean::new().process(&doc).unwrap();
        assert_eq!(doc, before);
    }
}
