//! Follow/Ignore regex policies (spec §4.2): newline-delimited regex lists
//! scoping the crawl.

use std::fs;
use std::path::Path;

use regex::Regex;

use crate::error::{CrawlError, CrawlResult};

#[derive(Debug, Clone, Default)]
pub struct PathPolicy {
    patterns: Vec<Regex>,
}

impl PathPolicy {
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// An empty follow/ignore list means "no restriction configured".
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Load a policy file: `#` starts a comment line, blank lines ignored,
    /// one regex per remaining line.
    pub fn load(path: &Path) -> CrawlResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            CrawlError::ConfigInvalid(format!("cannot read policy file {}: {e}", path.display()))
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> CrawlResult<Self> {
        let mut patterns = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let re = Regex::new(line)
                .map_err(|e| CrawlError::ConfigInvalid(format!("bad pattern {line:?}: {e}")))?;
            patterns.push(re);
        }
        Ok(Self { patterns })
    }

    /// True iff any pattern finds a match anywhere within `name`.
    pub fn is_matched(&self, name: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(name))
    }

    /// Strip a Windows-style `X:` drive prefix and normalize `\` to `/`
    /// before matching.
    pub fn is_matched_normalized(&self, name: &str) -> bool {
        self.is_matched(&normalize_path(name))
    }
}

fn normalize_path(name: &str) -> String {
    let stripped = match name.as_bytes() {
        [drive, b':', rest @ ..] if drive.is_ascii_alphabetic() => {
            std::str::from_utf8(rest).unwrap_or(name)
        }
        _ => name,
    };
    stripped.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignore_list_skips_matching_files() {
        let policy = PathPolicy::parse("\\.log$\n").unwrap();
        assert!(policy.is_matched_normalized("/data/b.log"));
        assert!(!policy.is_matched_normalized("/data/a.txt"));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let policy = PathPolicy::parse("# comment\n\n\\.log$\n").unwrap();
        assert_eq!(policy.patterns.len(), 1);
    }

    #[test]
    fn normalizes_windows_drive_and_separators() {
        let policy = PathPolicy::parse("^/data/a\\.txt$\n").unwrap();
        assert!(policy.is_matched_normalized(r"C:\data\a.txt"));
    }
}
