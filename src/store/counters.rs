//! Per-domain sequence counters in `counters.json`.
use super::atomic::{read_json_optional, write_json_atomic};
use super::Counters;
use anyhow::Result;
use std::path::Path;

/// Read `counters.json`; `Ok(None)` when it does not exist.
pub fn read_counters(path: &Path) -> Result<Option<Counters>> {
    read_json_optional(path)
}

/// Read counters, collapsing a missing or malformed file into an empty map.
pub fn counters_or_empty(path: &Path) -> Counters {
    match read_counters(path) {
        Ok(counters) => counters.unwrap_or_default(),
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "treating unusable counters as empty");
            Counters::new()
        }
    }
}

pub fn write_counters(path: &Path, counters: &Counters) -> Result<()> {
    write_json_atomic(path, counters)
}
