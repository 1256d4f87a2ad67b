//! Minting SPEC reservations.
//!
//! Every step after lock acquisition runs inside one critical section:
//! bump and persist the domain counter, materialize the stub document, append
//! the RESERVE event, and upsert the index. The counter is persisted first, so
//! a crash part-way through leaves a gap in the sequence, never a reused id.
use crate::domain::{canonical_domain, DEFAULT_DOMAIN};
use crate::policy::PolicyConfig;
use crate::store::{
    apply_ledger_entry, write_bytes_atomic, LedgerEntry, LedgerOp, StateStore, TagState,
};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const PLACEHOLDER_TITLE: &str = "TBD: title";
const PLACEHOLDER_PURPOSE: &str = "TBD: describe the purpose of this change";
const PLACEHOLDER_CRITERION: &str = "TBD: acceptance criterion";
const PLACEHOLDER_NOTES: &str = "Reserved automatically before the specification was written.";

/// Optional values substituted into the stub template.
#[derive(Debug, Clone, Default)]
pub struct StubFields {
    pub title: Option<String>,
    pub purpose: Option<String>,
    pub acceptance_criteria: Vec<String>,
    pub notes: Option<String>,
}

/// A freshly minted reservation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub tag_id: String,
    pub domain: String,
    pub sequence: u64,
    pub stub_path: PathBuf,
    pub reserved_until: DateTime<Utc>,
}

/// Who is reserving, when, and on behalf of which changed file.
#[derive(Debug, Clone)]
pub struct ReserveRequest<'a> {
    pub domain: &'a str,
    pub actor: &'a str,
    pub now: DateTime<Utc>,
    pub trigger_path: Option<&'a str>,
    pub fields: &'a StubFields,
}

pub struct ReservationAllocator<'a> {
    store: &'a StateStore,
    policy: &'a PolicyConfig,
}

impl<'a> ReservationAllocator<'a> {
    pub fn new(store: &'a StateStore, policy: &'a PolicyConfig) -> Self {
        Self { store, policy }
    }

    /// Mint the next `@SPEC:<DOMAIN>-<NNN>` id for `request.domain`.
    ///
    /// Fails with a `LockError::Timeout` (wrapped in `anyhow`) when the state
    /// lock cannot be acquired, or when the domain is not a valid code;
    /// nothing is written in either case.
    pub fn reserve(&self, request: &ReserveRequest<'_>) -> Result<Reservation> {
        let domain = normalize_domain(request.domain)?;
        let reserved_until =
            request.now + Duration::hours(self.policy.autoplan.expire_hours_block);
        let template = self.load_template();

        let reservation = self.store.with_lock(|txn| {
            let ledger = txn.ledger()?;
            let mut counters = txn.counters_for_update(&ledger);
            let sequence = counters.get(&domain).copied().unwrap_or(0) + 1;
            counters.insert(domain.clone(), sequence);
            txn.write_counters(&counters)?;

            let tag_id = format!("@SPEC:{domain}-{sequence:03}");
            let stub_path = txn.paths().spec_stub_path(&domain, sequence);
            if stub_path.exists() {
                tracing::warn!(
                    path = %stub_path.display(),
                    "stub already exists; leaving it untouched"
                );
            } else {
                let body = render_stub(&template, &tag_id, &domain, request);
                write_stub(&stub_path, &body)?;
            }

            let mut paths = vec![txn.paths().display_rel(&stub_path)];
            if let Some(trigger) = request.trigger_path {
                paths.push(trigger.to_string());
            }
            let entry = LedgerEntry {
                ts: request.now,
                op: LedgerOp::Reserve,
                id: tag_id.clone(),
                actor: request.actor.to_string(),
                paths,
                state: TagState::Reserved,
                domain: domain.clone(),
                reserved_until: Some(reserved_until),
            };
            txn.append(&entry)?;

            let mut index = txn.index_for_update(&ledger);
            apply_ledger_entry(&mut index, &entry);
            txn.write_index(&index)?;

            Ok(Reservation {
                tag_id,
                domain: domain.clone(),
                sequence,
                stub_path,
                reserved_until,
            })
        })?;

        tracing::info!(
            tag = %reservation.tag_id,
            domain = %reservation.domain,
            reserved_until = %reservation.reserved_until,
            "reserved spec id"
        );
        Ok(reservation)
    }

    /// Read the stub template; any failure degrades to an empty body.
    fn load_template(&self) -> String {
        let rel = self.policy.autoplan.spec_stub_template_path.trim();
        if rel.is_empty() {
            return String::new();
        }
        let path = self.store.paths().resolve_rel(rel);
        fs::read_to_string(&path).unwrap_or_else(|err| {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "stub template unreadable; using empty body"
            );
            String::new()
        })
    }
}

/// Uppercase the domain, falling back to the default when blank. Codes the
/// topline scanner could not read back are rejected.
pub fn normalize_domain(raw: &str) -> Result<String> {
    if raw.trim().is_empty() {
        return Ok(DEFAULT_DOMAIN.to_string());
    }
    match canonical_domain(raw) {
        Some(domain) => Ok(domain),
        None => bail!("invalid domain {raw:?} (expected letters A-Z and _ only)"),
    }
}

/// Substitute `{{PLACEHOLDER}}` tokens verbatim.
pub fn render_stub(
    template: &str,
    tag_id: &str,
    domain: &str,
    request: &ReserveRequest<'_>,
) -> String {
    let fields = request.fields;
    let criterion = |slot: usize| {
        fields
            .acceptance_criteria
            .get(slot)
            .map(String::as_str)
            .unwrap_or(PLACEHOLDER_CRITERION)
            .to_string()
    };
    let replacements = [
        ("{{ID}}", tag_id.to_string()),
        ("{{DOMAIN}}", domain.to_string()),
        (
            "{{TITLE}}",
            fields.title.as_deref().unwrap_or(PLACEHOLDER_TITLE).to_string(),
        ),
        (
            "{{PURPOSE}}",
            fields
                .purpose
                .as_deref()
                .unwrap_or(PLACEHOLDER_PURPOSE)
                .to_string(),
        ),
        ("{{AC1}}", criterion(0)),
        ("{{AC2}}", criterion(1)),
        ("{{AC3}}", criterion(2)),
        (
            "{{NOTES}}",
            fields.notes.as_deref().unwrap_or(PLACEHOLDER_NOTES).to_string(),
        ),
        (
            "{{DATETIME}}",
            request.now.to_rfc3339_opts(SecondsFormat::Secs, true),
        ),
        ("{{ACTOR}}", request.actor.to_string()),
    ];
    let mut out = template.to_string();
    for (token, value) in replacements {
        out = out.replace(token, &value);
    }
    out
}

fn write_stub(path: &Path, body: &str) -> Result<()> {
    write_bytes_atomic(path, body.as_bytes())
        .with_context(|| format!("write stub {}", path.display()))
}

#[cfg(test)]
#[path = "reserve_tests.rs"]
mod tests;
