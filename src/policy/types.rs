//! Typed mirror of `.tagguard/policy.json`.
use super::{
    DEFAULT_BATCH_FILE_THRESHOLD, DEFAULT_EXPIRE_HOURS_BLOCK, DEFAULT_EXPIRE_HOURS_WARN,
    DEFAULT_LOCK_TIMEOUT_MS, DEFAULT_MAX_SCAN_LINES,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether violations block (`strict`) or warn and auto-remediate (`balanced`).
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    Strict,
    #[default]
    Balanced,
}

impl PolicyMode {
    /// Return the stable string identifier used in JSON artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyMode::Strict => "strict",
            PolicyMode::Balanced => "balanced",
        }
    }
}

impl fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered glob → domain mapping; the first matching glob wins.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct DomainMapping {
    pub glob: String,
    pub domain: String,
}

/// Rules for locating a `@TYPE:ID` marker near the top of a file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ToplineRules {
    pub max_scan_lines: usize,
    pub skip_header_patterns: Vec<String>,
    /// Flat list read two at a time as `(start, end)` delimiters.
    pub block_comment_pairs: Vec<String>,
}

impl Default for ToplineRules {
    fn default() -> Self {
        Self {
            max_scan_lines: DEFAULT_MAX_SCAN_LINES,
            skip_header_patterns: ["copyright", "license", "spdx-license-identifier"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            block_comment_pairs: ["/*", "*/", "<!--", "-->", "\"\"\"", "\"\"\"", "'''", "'''"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ToplineRules {
    /// Pair up `block_comment_pairs`; a trailing unpaired entry is dropped.
    pub fn comment_pairs(&self) -> Vec<(String, String)> {
        if self.block_comment_pairs.len() % 2 != 0 {
            tracing::warn!(
                entries = self.block_comment_pairs.len(),
                "blockCommentPairs has an unpaired trailing entry; ignoring it"
            );
        }
        self.block_comment_pairs
            .chunks_exact(2)
            .filter(|pair| !pair[0].is_empty() && !pair[1].is_empty())
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect()
    }
}

/// Code-first reservation and expiry thresholds.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoplanRules {
    pub reserve_on_code_first: bool,
    pub spec_stub_template_path: String,
    pub expire_hours_warn: i64,
    pub expire_hours_block: i64,
}

impl Default for AutoplanRules {
    fn default() -> Self {
        Self {
            reserve_on_code_first: true,
            spec_stub_template_path: String::new(),
            expire_hours_warn: DEFAULT_EXPIRE_HOURS_WARN,
            expire_hours_block: DEFAULT_EXPIRE_HOURS_BLOCK,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchGuard {
    pub file_threshold: usize,
}

impl Default for BatchGuard {
    fn default() -> Self {
        Self {
            file_threshold: DEFAULT_BATCH_FILE_THRESHOLD,
        }
    }
}

/// Process-loaded rule set; read-only for the lifetime of an invocation.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyConfig {
    pub eligible: Vec<String>,
    pub excluded: Vec<String>,
    pub domains_map: Vec<DomainMapping>,
    pub topline_rules: ToplineRules,
    pub autoplan: AutoplanRules,
    pub batch_guard: BatchGuard,
    pub policy_mode: PolicyMode,
    pub lock_timeout_ms: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            eligible: Vec::new(),
            excluded: [".git/**", ".tagguard/**", "target/**", "node_modules/**"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            domains_map: Vec::new(),
            topline_rules: ToplineRules::default(),
            autoplan: AutoplanRules::default(),
            batch_guard: BatchGuard::default(),
            policy_mode: PolicyMode::default(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }
}
