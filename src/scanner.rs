//! Topline `@TYPE:ID` extraction.
//!
//! Only the first few lines of a file may claim a tag. Shebangs, blank lines,
//! license boilerplate, and multi-line block comments are stepped over; an
//! unterminated block comment consumes the rest of the scan window.
use crate::policy::ToplineRules;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

fn topline_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[#/<!\-\s]*@([A-Z_]+):([A-Z_]+-[0-9]{3,})")
            .expect("regex for topline tags")
    })
}

/// A tag claimed on a file's topline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopLineTag {
    /// The TYPE token, e.g. `SPEC`.
    pub tag_type: String,
    /// The ID token, e.g. `AUTH-003`.
    pub local_id: String,
}

impl TopLineTag {
    /// Full tag id as stored in the index, e.g. `@SPEC:AUTH-003`.
    pub fn full_id(&self) -> String {
        format!("@{}:{}", self.tag_type, self.local_id)
    }

    /// Parse a full `@TYPE:ID` string.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if !raw.starts_with('@') {
            return None;
        }
        let caps = topline_regex().captures(raw)?;
        if caps.get(0)?.end() != raw.len() {
            return None;
        }
        Some(Self {
            tag_type: caps[1].to_string(),
            local_id: caps[2].to_string(),
        })
    }
}

impl fmt::Display for TopLineTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}:{}", self.tag_type, self.local_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CommentState {
    Outside,
    InsideBlockComment { end_marker: String },
}

/// Scanner configured from the policy's topline rules.
#[derive(Debug, Clone)]
pub struct TopLineScanner {
    max_scan_lines: usize,
    skip_header_patterns: Vec<String>,
    comment_pairs: Vec<(String, String)>,
}

impl TopLineScanner {
    pub fn new(rules: &ToplineRules) -> Self {
        Self {
            max_scan_lines: rules.max_scan_lines,
            skip_header_patterns: rules
                .skip_header_patterns
                .iter()
                .map(|pattern| pattern.to_lowercase())
                .filter(|pattern| !pattern.is_empty())
                .collect(),
            comment_pairs: rules.comment_pairs(),
        }
    }

    /// Return the first topline tag within the scan window, if any.
    pub fn scan(&self, text: &str) -> Option<TopLineTag> {
        let mut lines = text.lines().peekable();
        if lines.peek().is_some_and(|line| line.starts_with("#!")) {
            lines.next();
        }

        let mut state = CommentState::Outside;
        for line in lines.take(self.max_scan_lines) {
            let trimmed = line.trim();
            match &state {
                CommentState::InsideBlockComment { end_marker } => {
                    if trimmed.contains(end_marker.as_str()) {
                        state = CommentState::Outside;
                    }
                    continue;
                }
                CommentState::Outside => {}
            }

            if trimmed.is_empty() {
                continue;
            }
            if let Some(end_marker) = self.opens_unclosed_comment(trimmed) {
                state = CommentState::InsideBlockComment { end_marker };
                continue;
            }
            if self.is_header_boilerplate(trimmed) {
                continue;
            }
            if let Some(caps) = topline_regex().captures(line) {
                return Some(TopLineTag {
                    tag_type: caps[1].to_string(),
                    local_id: caps[2].to_string(),
                });
            }
        }
        None
    }

    /// If the line starts a block comment that does not close on the same
    /// line, return the end marker to wait for.
    fn opens_unclosed_comment(&self, trimmed: &str) -> Option<String> {
        for (start, end) in &self.comment_pairs {
            let Some(rest) = trimmed.strip_prefix(start.as_str()) else {
                continue;
            };
            if rest.contains(end.as_str()) {
                return None;
            }
            return Some(end.clone());
        }
        None
    }

    fn is_header_boilerplate(&self, trimmed: &str) -> bool {
        let lower = trimmed.to_lowercase();
        self.skip_header_patterns
            .iter()
            .any(|pattern| lower.contains(pattern.as_str()))
    }
}

#[cfg(test)]
#[path = "scanner_tests.rs"]
mod tests;
