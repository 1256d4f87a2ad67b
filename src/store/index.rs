//! Materialized `index.json` and ledger replay.
use super::atomic::{read_json_optional, write_json_atomic};
use super::{IndexEntry, LedgerEntry, LedgerOp, TagIndex, TagState};
use anyhow::Result;
use std::path::Path;

/// Read `index.json`; `Ok(None)` when it does not exist.
pub fn read_index(path: &Path) -> Result<Option<TagIndex>> {
    read_json_optional(path)
}

/// Read the index, collapsing a missing or malformed file into an empty map.
pub fn index_or_empty(path: &Path) -> TagIndex {
    match read_index(path) {
        Ok(index) => index.unwrap_or_default(),
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "treating unusable index as empty");
            TagIndex::new()
        }
    }
}

pub fn write_index(path: &Path, index: &TagIndex) -> Result<()> {
    write_json_atomic(path, index)
}

/// Fold one ledger event into the index.
pub fn apply_ledger_entry(index: &mut TagIndex, entry: &LedgerEntry) {
    match entry.op {
        LedgerOp::Reserve => {
            index.insert(
                entry.id.clone(),
                IndexEntry {
                    id: entry.id.clone(),
                    tag_type: tag_type_of(&entry.id),
                    primary_path: None,
                    state: TagState::Reserved,
                    domain: entry.domain.clone(),
                    reserved_until: entry.reserved_until,
                },
            );
        }
        LedgerOp::Register => {
            let row = index
                .entry(entry.id.clone())
                .or_insert_with(|| IndexEntry {
                    id: entry.id.clone(),
                    tag_type: tag_type_of(&entry.id),
                    primary_path: None,
                    state: TagState::Active,
                    domain: entry.domain.clone(),
                    reserved_until: None,
                });
            if row.primary().is_none() {
                row.primary_path = entry.paths.first().cloned();
            }
            row.state = TagState::Active;
            row.reserved_until = None;
        }
        LedgerOp::Release | LedgerOp::Expire => {
            if let Some(row) = index.get_mut(&entry.id) {
                row.state = entry.state;
            }
        }
    }
}

/// Reconstruct the index by replaying ledger events in append order.
pub fn replay_ledger(entries: &[LedgerEntry]) -> TagIndex {
    let mut index = TagIndex::new();
    for entry in entries {
        apply_ledger_entry(&mut index, entry);
    }
    index
}

/// Extract the TYPE token from `@TYPE:ID`.
pub fn tag_type_of(tag_id: &str) -> String {
    tag_id
        .trim_start_matches('@')
        .split_once(':')
        .map(|(tag_type, _)| tag_type.to_string())
        .unwrap_or_default()
}
