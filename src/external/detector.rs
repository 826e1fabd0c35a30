//! A reference `ContentDetector` built on `infer` for MIME sniffing, with a
//! minimal text extractor handling `text/*` content directly. Real
//! format-specific extraction (PDF, OCR, office documents) is an external
//! collaborator, out of scope for this crate.

use super::ContentDetector;

pub struct InferContentDetector;

impl InferContentDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for InferContentDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentDetector for InferContentDetector {
    fn detect_type(&self, bytes: &[u8], name: Option<&str>) -> String {
        if let Some(kind) = infer::get(bytes) {
            return kind.mime_type().to_string();
        }
        if let Some(name) = name {
            if let Some(guess) = guess_from_extension(name) {
                return guess.to_string();
            }
        }
        if bytes.iter().take(512).all(|b| is_probably_text(*b)) {
            return "text/plain".to_string();
        }
        "application/octet-stream".to_string()
    }

    fn extract(&self, bytes: &[u8], mime_type: &str, content_limit: usize) -> Option<String> {
        if !mime_type.starts_with("text/") {
            return None;
        }
        let text = String::from_utf8_lossy(bytes);
        Some(text.chars().take(content_limit).collect())
    }
}

fn is_probably_text(b: u8) -> bool {
    b == b'\n' || b == b'\r' || b == b'\t' || (0x20..0x7f).contains(&b)
}

fn guess_from_extension(name: &str) -> Option<&'static str> {
    let ext = name.rsplit('.').next()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "txt" => "text/plain",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_plain_text() {
        let detector = InferContentDetector::new();
        let mime = detector.detect_type(b"hello world", Some("a.txt"));
        assert_eq!(mime, "text/plain");
    }

    #[test]
    fn extract_bounds_to_content_limit() {
        let detector = InferContentDetector::new();
        let text = detector
            .extract(b"hello world", "text/plain", 5)
            .unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn extract_returns_none_for_non_text() {
        let detector = InferContentDetector::new();
        assert!(detector
            .extract(&[0xff, 0xd8, 0xff], "image/jpeg", 100)
            .is_none());
    }
}
