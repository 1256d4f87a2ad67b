//! Explicit lifecycle commands over reserved and registered tag ids.
//!
//! Each mutation takes the state lock, appends exactly one ledger event per
//! affected id, and rewrites the index snapshot before releasing the lock.
use crate::paths::ProjectPaths;
use crate::policy::PolicyConfig;
use crate::scanner::TopLineTag;
use crate::store::{
    apply_ledger_entry, replay_ledger, Counters, IndexEntry, LedgerEntry, LedgerOp, StateStore,
    TagState,
};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("{tag} is already owned by {existing}")]
    DuplicatePrimary { tag: String, existing: String },
    #[error("unknown tag {0}")]
    UnknownTag(String),
    #[error("invalid tag id {0:?} (expected @TYPE:DOMAIN-NNN)")]
    InvalidTag(String),
    #[error("cannot {op} {tag} while it is {state}")]
    InvalidTransition {
        tag: String,
        op: LedgerOp,
        state: TagState,
    },
}

/// Read-time standing of a tag, folding reservation deadlines into the
/// persisted state.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DerivedState {
    Reserved,
    Expiring,
    Expired,
    Active,
    Released,
}

impl DerivedState {
    /// Standing of `entry` at `now` given the warning window in hours.
    pub fn of(entry: &IndexEntry, now: DateTime<Utc>, warn_hours: i64) -> Self {
        match entry.state {
            TagState::Active => DerivedState::Active,
            TagState::Released => DerivedState::Released,
            TagState::Expired => DerivedState::Expired,
            TagState::Reserved => match entry.reserved_until {
                Some(until) if now > until => DerivedState::Expired,
                Some(until) if now > until - Duration::hours(warn_hours) => {
                    DerivedState::Expiring
                }
                _ => DerivedState::Reserved,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DerivedState::Reserved => "reserved",
            DerivedState::Expiring => "expiring",
            DerivedState::Expired => "expired",
            DerivedState::Active => "active",
            DerivedState::Released => "released",
        }
    }
}

impl fmt::Display for DerivedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    pub id: String,
    pub domain: String,
    pub state: DerivedState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_until: Option<DateTime<Utc>>,
}

/// Snapshot of every indexed id plus the per-domain counters.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub entries: Vec<StatusEntry>,
    pub counters: Counters,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RebuildSummary {
    pub entries: usize,
    pub skipped_lines: usize,
}

/// Whether a register call changed anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered(IndexEntry),
    Unchanged(IndexEntry),
}

impl RegisterOutcome {
    pub fn entry(&self) -> &IndexEntry {
        match self {
            RegisterOutcome::Registered(entry) | RegisterOutcome::Unchanged(entry) => entry,
        }
    }
}

pub struct Lifecycle<'a> {
    store: &'a StateStore,
    policy: &'a PolicyConfig,
}

impl<'a> Lifecycle<'a> {
    pub fn new(store: &'a StateStore, policy: &'a PolicyConfig) -> Self {
        Self { store, policy }
    }

    fn paths(&self) -> &ProjectPaths {
        self.store.paths()
    }

    /// Bind `tag_id` to its primary file, moving it to `active`.
    pub fn register(
        &self,
        tag_id: &str,
        path: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<RegisterOutcome> {
        let tag = TopLineTag::parse(tag_id)
            .ok_or_else(|| LifecycleError::InvalidTag(tag_id.to_string()))?;
        let tag_id = tag.full_id();
        let rel = self.paths().normalize_changed(path)?;

        let outcome = self.store.with_lock(|txn| {
            let ledger = txn.ledger()?;
            let mut index = txn.index_for_update(&ledger);
            let domain = match index.get(&tag_id) {
                Some(existing) if existing.state == TagState::Released => {
                    return Err(LifecycleError::InvalidTransition {
                        tag: tag_id.clone(),
                        op: LedgerOp::Register,
                        state: existing.state,
                    }
                    .into());
                }
                Some(existing) => match existing.primary() {
                    Some(primary) if primary != rel => {
                        return Err(LifecycleError::DuplicatePrimary {
                            tag: tag_id.clone(),
                            existing: primary.to_string(),
                        }
                        .into());
                    }
                    Some(_) if existing.state == TagState::Active => {
                        return Ok(RegisterOutcome::Unchanged(existing.clone()));
                    }
                    _ => existing.domain.clone(),
                },
                None => domain_of(&tag),
            };

            let entry = LedgerEntry {
                ts: now,
                op: LedgerOp::Register,
                id: tag_id.clone(),
                actor: actor.to_string(),
                paths: vec![rel.clone()],
                state: TagState::Active,
                domain,
                reserved_until: None,
            };
            txn.append(&entry)?;
            apply_ledger_entry(&mut index, &entry);
            txn.write_index(&index)?;
            let row = index
                .get(&tag_id)
                .cloned()
                .ok_or_else(|| LifecycleError::UnknownTag(tag_id.clone()))?;
            Ok(RegisterOutcome::Registered(row))
        })?;

        if let RegisterOutcome::Registered(entry) = &outcome {
            tracing::info!(tag = %entry.id, path = %rel, "registered primary");
        }
        Ok(outcome)
    }

    /// Retire an active or reserved id.
    pub fn release(&self, tag_id: &str, actor: &str, now: DateTime<Utc>) -> Result<IndexEntry> {
        let tag_id = tag_id.trim().to_string();
        let released = self.store.with_lock(|txn| {
            let ledger = txn.ledger()?;
            let mut index = txn.index_for_update(&ledger);
            let Some(existing) = index.get(&tag_id) else {
                return Err(LifecycleError::UnknownTag(tag_id.clone()).into());
            };
            if !matches!(existing.state, TagState::Active | TagState::Reserved) {
                return Err(LifecycleError::InvalidTransition {
                    tag: tag_id.clone(),
                    op: LedgerOp::Release,
                    state: existing.state,
                }
                .into());
            }

            let entry = LedgerEntry {
                ts: now,
                op: LedgerOp::Release,
                id: tag_id.clone(),
                actor: actor.to_string(),
                paths: existing.primary().map(str::to_string).into_iter().collect(),
                state: TagState::Released,
                domain: existing.domain.clone(),
                reserved_until: None,
            };
            txn.append(&entry)?;
            apply_ledger_entry(&mut index, &entry);
            txn.write_index(&index)?;
            index
                .get(&tag_id)
                .cloned()
                .ok_or_else(|| anyhow::Error::from(LifecycleError::UnknownTag(tag_id.clone())))
        })?;
        tracing::info!(tag = %released.id, "released");
        Ok(released)
    }

    /// Persist `reserved -> expired` for every reservation past its deadline.
    /// Returns the ids that were expired, in index order.
    pub fn expire_overdue(&self, actor: &str, now: DateTime<Utc>) -> Result<Vec<String>> {
        let expired = self.store.with_lock(|txn| {
            let ledger = txn.ledger()?;
            let mut index = txn.index_for_update(&ledger);
            let overdue: Vec<LedgerEntry> = index
                .values()
                .filter(|entry| entry.state == TagState::Reserved)
                .filter(|entry| entry.reserved_until.is_some_and(|until| now > until))
                .map(|entry| LedgerEntry {
                    ts: now,
                    op: LedgerOp::Expire,
                    id: entry.id.clone(),
                    actor: actor.to_string(),
                    paths: Vec::new(),
                    state: TagState::Expired,
                    domain: entry.domain.clone(),
                    reserved_until: entry.reserved_until,
                })
                .collect();
            if overdue.is_empty() {
                return Ok(Vec::new());
            }
            for entry in &overdue {
                txn.append(entry)?;
                apply_ledger_entry(&mut index, entry);
            }
            txn.write_index(&index)?;
            Ok(overdue.into_iter().map(|entry| entry.id).collect())
        })?;
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "expired overdue reservations");
        }
        Ok(expired)
    }

    /// Replace `index.json` with a replay of the ledger.
    pub fn rebuild_index(&self) -> Result<RebuildSummary> {
        let summary = self.store.with_lock(|txn| {
            let ledger = txn.ledger()?;
            let index = replay_ledger(&ledger.entries);
            txn.write_index(&index)?;
            Ok(RebuildSummary {
                entries: index.len(),
                skipped_lines: ledger.skipped_lines,
            })
        })?;
        tracing::info!(
            entries = summary.entries,
            skipped = summary.skipped_lines,
            "rebuilt index from ledger"
        );
        Ok(summary)
    }

    /// Lock-free report of every indexed id with its derived standing.
    pub fn status(&self, now: DateTime<Utc>) -> StatusReport {
        let warn_hours = self.policy.autoplan.expire_hours_warn;
        let entries = self
            .store
            .load_index()
            .into_values()
            .map(|entry| StatusEntry {
                state: DerivedState::of(&entry, now, warn_hours),
                primary_path: entry.primary().map(str::to_string),
                id: entry.id,
                domain: entry.domain,
                reserved_until: entry.reserved_until,
            })
            .collect();
        StatusReport {
            entries,
            counters: self.store.load_counters(),
        }
    }
}

/// Domain token of a `DOMAIN-NNN` local id.
fn domain_of(tag: &TopLineTag) -> String {
    tag.local_id
        .rsplit_once('-')
        .map(|(domain, _)| domain.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
