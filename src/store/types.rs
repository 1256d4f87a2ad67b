//! Typed records persisted under `.tagguard/state/`.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle operations recorded in the ledger.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LedgerOp {
    Reserve,
    Register,
    Release,
    Expire,
}

impl LedgerOp {
    /// Return the stable string identifier used in JSON artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerOp::Reserve => "RESERVE",
            LedgerOp::Register => "REGISTER",
            LedgerOp::Release => "RELEASE",
            LedgerOp::Expire => "EXPIRE",
        }
    }
}

impl fmt::Display for LedgerOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted lifecycle state of a tag id.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TagState {
    Reserved,
    Active,
    Released,
    Expired,
}

impl TagState {
    /// Return the stable string identifier used in JSON artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            TagState::Reserved => "reserved",
            TagState::Active => "active",
            TagState::Released => "released",
            TagState::Expired => "expired",
        }
    }
}

impl fmt::Display for TagState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable line of `ledger.jsonl`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub ts: DateTime<Utc>,
    pub op: LedgerOp,
    pub id: String,
    pub actor: String,
    #[serde(default)]
    pub paths: Vec<String>,
    pub state: TagState,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub reserved_until: Option<DateTime<Utc>>,
}

/// Current state of one tag id in `index.json`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub tag_type: String,
    #[serde(default)]
    pub primary_path: Option<String>,
    pub state: TagState,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub reserved_until: Option<DateTime<Utc>>,
}

impl IndexEntry {
    /// The recorded primary, treating an empty string as unset.
    pub fn primary(&self) -> Option<&str> {
        self.primary_path
            .as_deref()
            .filter(|path| !path.trim().is_empty())
    }
}

/// `index.json`: tag id → entry, serialized in sorted key order.
pub type TagIndex = BTreeMap<String, IndexEntry>;

/// `counters.json`: domain → last issued sequence.
pub type Counters = BTreeMap<String, u64>;

/// Result of reading the ledger tolerantly.
#[derive(Debug, Default, Clone)]
pub struct LedgerRead {
    pub entries: Vec<LedgerEntry>,
    /// Lines that failed to parse (typically a torn trailing append).
    pub skipped_lines: usize,
}
