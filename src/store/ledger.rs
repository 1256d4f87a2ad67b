//! Append-only `ledger.jsonl`.
//!
//! The ledger is never rewritten or truncated. Readers skip lines that fail
//! to parse so a torn trailing append never poisons the whole history.
use super::{Counters, LedgerEntry, LedgerOp, LedgerRead};
use anyhow::{Context, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

/// Append one entry as a single JSON line.
pub fn append_ledger(path: &Path, entry: &LedgerEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create state dir")?;
    }
    let mut line = serde_json::to_vec(entry).context("serialize ledger entry")?;
    line.push(b'\n');
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    file.write_all(&line)
        .with_context(|| format!("write {}", path.display()))?;
    file.sync_data()
        .with_context(|| format!("sync {}", path.display()))?;
    Ok(())
}

/// Read every parsable entry in append order. A missing ledger is empty.
pub fn read_ledger(path: &Path) -> Result<LedgerRead> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(LedgerRead::default()),
        Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
    };
    let mut read = LedgerRead::default();
    for (line_no, line) in bytes.split(|byte| *byte == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<LedgerEntry>(line) {
            Ok(entry) => read.entries.push(entry),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    line = line_no + 1,
                    error = %err,
                    "skipping unparsable ledger line"
                );
                read.skipped_lines += 1;
            }
        }
    }
    Ok(read)
}

/// Read the ledger, collapsing an unreadable file into an empty history.
pub fn ledger_or_empty(path: &Path) -> LedgerRead {
    read_ledger(path).unwrap_or_else(|err| {
        tracing::warn!(error = %format!("{err:#}"), "treating unreadable ledger as empty");
        LedgerRead::default()
    })
}

/// Highest sequence minted per domain according to RESERVE events.
pub fn max_reserved_sequences(entries: &[LedgerEntry]) -> Counters {
    let mut max = Counters::new();
    for entry in entries.iter().filter(|entry| entry.op == LedgerOp::Reserve) {
        let Some(sequence) = sequence_of(&entry.id) else {
            continue;
        };
        let slot = max.entry(entry.domain.clone()).or_insert(0);
        *slot = (*slot).max(sequence);
    }
    max
}

/// Parse the trailing sequence number of a tag id such as `@SPEC:AUTH-003`.
pub fn sequence_of(tag_id: &str) -> Option<u64> {
    let (_, digits) = tag_id.rsplit_once('-')?;
    digits.parse().ok()
}
