//! Filesystem-backed reservation state.
//!
//! `ledger.jsonl` is the append-only source of truth; `index.json` and
//! `counters.json` are derived snapshots rewritten atomically. All writes go
//! through a `StateTxn`, which only exists while the state lock is held.
use crate::paths::ProjectPaths;
use anyhow::Result;
use std::time::Duration;

mod atomic;
mod counters;
mod index;
mod ledger;
mod lock;
mod types;

pub use atomic::{read_json_optional, write_bytes_atomic, write_json_atomic};
pub use counters::{counters_or_empty, read_counters, write_counters};
pub use index::{
    apply_ledger_entry, index_or_empty, read_index, replay_ledger, tag_type_of, write_index,
};
pub use ledger::{
    append_ledger, ledger_or_empty, max_reserved_sequences, read_ledger, sequence_of,
};
pub use lock::{LockError, StateLock};
pub use types::*;

/// Handle on one project's state directory, constructed once per invocation
/// and passed to every component that reads or writes state.
#[derive(Debug, Clone)]
pub struct StateStore {
    paths: ProjectPaths,
    lock_timeout: Duration,
}

impl StateStore {
    pub fn new(paths: ProjectPaths, lock_timeout: Duration) -> Self {
        Self {
            paths,
            lock_timeout,
        }
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    /// Lock-free snapshot of the index. Never mutates anything.
    pub fn load_index(&self) -> TagIndex {
        index_or_empty(&self.paths.index_path())
    }

    /// Lock-free snapshot of the counters. Never mutates anything.
    pub fn load_counters(&self) -> Counters {
        counters_or_empty(&self.paths.counters_path())
    }

    /// Run `operation` inside the state lock. The lock is released when this
    /// returns, whether `operation` succeeds, fails, or panics.
    pub fn with_lock<T>(
        &self,
        operation: impl FnOnce(&StateTxn<'_>) -> Result<T>,
    ) -> Result<T> {
        let lock = StateLock::acquire(&self.paths.lock_path(), self.lock_timeout)?;
        let txn = StateTxn {
            paths: &self.paths,
            _lock: &lock,
        };
        let result = operation(&txn);
        drop(lock);
        result
    }
}

/// Write access to state, only obtainable through `StateStore::with_lock`.
pub struct StateTxn<'a> {
    paths: &'a ProjectPaths,
    _lock: &'a StateLock,
}

impl StateTxn<'_> {
    pub fn paths(&self) -> &ProjectPaths {
        self.paths
    }

    /// Ledger history as seen inside the lock.
    pub fn ledger(&self) -> Result<LedgerRead> {
        read_ledger(&self.paths.ledger_path())
    }

    /// Counters for update. A malformed file is reseeded from the ledger so a
    /// corrupted snapshot can never cause an id to be issued twice.
    pub fn counters_for_update(&self, ledger: &LedgerRead) -> Counters {
        let path = self.paths.counters_path();
        let mut counters = match read_counters(&path) {
            Ok(counters) => counters.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(
                    error = %format!("{err:#}"),
                    "counters unusable; reseeding from ledger"
                );
                Counters::new()
            }
        };
        for (domain, sequence) in max_reserved_sequences(&ledger.entries) {
            let slot = counters.entry(domain).or_insert(0);
            *slot = (*slot).max(sequence);
        }
        counters
    }

    pub fn write_counters(&self, counters: &Counters) -> Result<()> {
        write_counters(&self.paths.counters_path(), counters)
    }

    /// Index for update. A missing or malformed snapshot is rebuilt from the
    /// ledger rather than started empty.
    pub fn index_for_update(&self, ledger: &LedgerRead) -> TagIndex {
        match read_index(&self.paths.index_path()) {
            Ok(Some(index)) => index,
            Ok(None) => replay_ledger(&ledger.entries),
            Err(err) => {
                tracing::warn!(
                    error = %format!("{err:#}"),
                    "index unusable; rebuilding from ledger"
                );
                replay_ledger(&ledger.entries)
            }
        }
    }

    pub fn write_index(&self, index: &TagIndex) -> Result<()> {
        write_index(&self.paths.index_path(), index)
    }

    pub fn append(&self, entry: &LedgerEntry) -> Result<()> {
        append_ledger(&self.paths.ledger_path(), entry)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
