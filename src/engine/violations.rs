//! Per-file violation classification.
use super::types::{ActionKind, Evaluation, RemediationAction, Violation, ViolationKind};
use crate::domain::DomainResolver;
use crate::lifecycle::DerivedState;
use crate::paths::ProjectPaths;
use crate::policy::{PathFilter, PolicyConfig, PolicyMode};
use crate::reserve::{ReservationAllocator, ReserveRequest, StubFields};
use crate::scanner::{TopLineScanner, TopLineTag};
use crate::store::{LockError, TagIndex, TagState};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs;
use std::path::Path;

/// Extensions treated as source code for code-first detection.
pub const CODE_EXTENSIONS: &[&str] = &[
    "c", "cc", "cpp", "cs", "dart", "go", "h", "hpp", "java", "js", "jsx", "kt", "m", "mjs",
    "php", "py", "rb", "rs", "scala", "sh", "svelte", "swift", "ts", "tsx", "vue",
];

/// Whether `rel_path` has a source-code extension.
pub fn is_code_file(rel_path: &str) -> bool {
    Path::new(rel_path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            CODE_EXTENSIONS
                .iter()
                .any(|code| ext.eq_ignore_ascii_case(code))
        })
}

/// Everything a violation pass needs, borrowed for one invocation.
pub struct ViolationEngine<'a> {
    pub(crate) paths: &'a ProjectPaths,
    pub(crate) policy: &'a PolicyConfig,
    pub(crate) filter: &'a PathFilter,
    pub(crate) scanner: &'a TopLineScanner,
    pub(crate) resolver: &'a DomainResolver,
    pub(crate) index: &'a TagIndex,
    pub(crate) allocator: &'a ReservationAllocator<'a>,
    pub(crate) actor: &'a str,
    pub(crate) now: DateTime<Utc>,
}

impl ViolationEngine<'_> {
    /// Classify a batch of changed files under `mode`.
    pub fn evaluate(&self, files: &[String], mode: PolicyMode) -> Evaluation {
        let mut out = Evaluation::default();
        let threshold = self.policy.batch_guard.file_threshold;
        if files.len() > threshold {
            tracing::info!(
                files = files.len(),
                threshold,
                "batch guard tripped; skipping per-file checks"
            );
            out.push(
                Violation {
                    kind: ViolationKind::BatchGuard,
                    file_path: "*".to_string(),
                    tag_id: None,
                    domain: None,
                    detail: format!(
                        "{} changed files exceed the batch threshold of {threshold}",
                        files.len()
                    ),
                },
                RemediationAction {
                    kind: ActionKind::SplitBatch,
                    message: format!(
                        "Batch of {} files exceeds the threshold of {threshold}; split the change into smaller batches so each file can be validated.",
                        files.len()
                    ),
                    file_path: None,
                    tag_id: None,
                },
            );
            return out;
        }

        for raw in files {
            let rel = match self.paths.normalize_changed(raw) {
                Ok(rel) => rel,
                Err(err) => {
                    tracing::debug!(path = %raw, error = %err, "skipping path outside root");
                    continue;
                }
            };
            if !self.filter.is_eligible(&rel) {
                tracing::debug!(path = %rel, "not eligible");
                continue;
            }
            self.evaluate_file(&rel, mode, &mut out);
        }
        out
    }

    fn evaluate_file(&self, rel: &str, mode: PolicyMode, out: &mut Evaluation) {
        let abs = self.paths.root().join(rel);
        let text = match fs::read_to_string(&abs) {
            Ok(text) => text,
            Err(err) => {
                tracing::debug!(path = %rel, error = %err, "unreadable; skipping");
                return;
            }
        };
        out.processed_file_count += 1;

        let Some(tag) = self.scanner.scan(&text) else {
            if is_code_file(rel) {
                self.handle_code_first(rel, mode, out);
            }
            return;
        };
        self.check_tag(rel, &tag, out);
    }

    fn handle_code_first(&self, rel: &str, mode: PolicyMode, out: &mut Evaluation) {
        if !self.policy.autoplan.reserve_on_code_first {
            return;
        }
        let domain = self.resolver.resolve(rel);
        match mode {
            PolicyMode::Strict => out.push(
                Violation {
                    kind: ViolationKind::CodeFirstRequireSpec,
                    file_path: rel.to_string(),
                    tag_id: None,
                    domain: Some(domain.clone()),
                    detail: "source file has no topline tag".to_string(),
                },
                RemediationAction {
                    kind: ActionKind::RequireSpec,
                    message: format!(
                        "Write a SPEC for domain {domain} first, then add its @SPEC:{domain}-NNN tag to the top of {rel}."
                    ),
                    file_path: Some(rel.to_string()),
                    tag_id: None,
                },
            ),
            PolicyMode::Balanced => {
                let fields = StubFields::default();
                let request = ReserveRequest {
                    domain: &domain,
                    actor: self.actor,
                    now: self.now,
                    trigger_path: Some(rel),
                    fields: &fields,
                };
                let reservation = match self.allocator.reserve(&request) {
                    Ok(reservation) => reservation,
                    Err(err) => {
                        let reason = if err.downcast_ref::<LockError>().is_some() {
                            "state lock unavailable"
                        } else {
                            "reservation failed"
                        };
                        tracing::warn!(
                            path = %rel,
                            error = %format!("{err:#}"),
                            "{reason}; continuing without reservation"
                        );
                        out.degraded
                            .push(format!("{reason}; no reservation minted for {rel}"));
                        return;
                    }
                };
                let stub = self.paths.display_rel(&reservation.stub_path);
                out.push(
                    Violation {
                        kind: ViolationKind::CodeFirstAutoplan,
                        file_path: rel.to_string(),
                        tag_id: Some(reservation.tag_id.clone()),
                        domain: Some(reservation.domain.clone()),
                        detail: format!(
                            "reserved {} for code written before its spec",
                            reservation.tag_id
                        ),
                    },
                    RemediationAction {
                        kind: ActionKind::AddToplineTag,
                        message: format!(
                            "Reserved {tag} (stub: {stub}); add `{tag}` as a topline comment in {rel} and complete the SPEC before {until}.",
                            tag = reservation.tag_id,
                            until = format_ts(reservation.reserved_until),
                        ),
                        file_path: Some(rel.to_string()),
                        tag_id: Some(reservation.tag_id),
                    },
                );
            }
        }
    }

    fn check_tag(&self, rel: &str, tag: &TopLineTag, out: &mut Evaluation) {
        let tag_id = tag.full_id();
        let Some(entry) = self.index.get(&tag_id) else {
            tracing::debug!(path = %rel, tag = %tag_id, "tag not indexed");
            return;
        };

        if entry.tag_type == tag.tag_type {
            if let Some(primary) = entry.primary().filter(|primary| *primary != rel) {
                out.push(
                    Violation {
                        kind: ViolationKind::DuplicatePrimary,
                        file_path: rel.to_string(),
                        tag_id: Some(tag_id.clone()),
                        domain: Some(entry.domain.clone()),
                        detail: format!("{tag_id} is already owned by {primary}"),
                    },
                    RemediationAction {
                        kind: ActionKind::UseRelates,
                        message: format!(
                            "{tag_id} is already owned by {primary}; reference it from {rel} with a Relates note instead of claiming it."
                        ),
                        file_path: Some(rel.to_string()),
                        tag_id: Some(tag_id.clone()),
                    },
                );
            }
        }

        // A persisted `expired` row keeps blocking until it is renewed or registered.
        if !matches!(entry.state, TagState::Reserved | TagState::Expired) {
            return;
        }
        let standing = DerivedState::of(entry, self.now, self.policy.autoplan.expire_hours_warn);
        if standing == DerivedState::Expired {
            let expired = match entry.reserved_until {
                Some(until) => format!("expired at {}", format_ts(until)),
                None => "expired".to_string(),
            };
            out.push(
                Violation {
                    kind: ViolationKind::ExpiredReservation,
                    file_path: rel.to_string(),
                    tag_id: Some(tag_id.clone()),
                    domain: Some(entry.domain.clone()),
                    detail: format!("reservation {expired}"),
                },
                RemediationAction {
                    kind: ActionKind::RenewReservation,
                    message: format!(
                        "Reservation {tag_id} {expired}; run the planning step again to reserve a fresh SPEC id."
                    ),
                    file_path: Some(rel.to_string()),
                    tag_id: Some(tag_id),
                },
            );
        } else if let (DerivedState::Expiring, Some(until)) = (standing, entry.reserved_until) {
            out.push(
                Violation {
                    kind: ViolationKind::ExpiringReservation,
                    file_path: rel.to_string(),
                    tag_id: Some(tag_id.clone()),
                    domain: Some(entry.domain.clone()),
                    detail: format!("reservation expires at {}", format_ts(until)),
                },
                RemediationAction {
                    kind: ActionKind::FinalizeReservation,
                    message: format!(
                        "Reservation {tag_id} expires at {}; finish the SPEC before then.",
                        format_ts(until)
                    ),
                    file_path: Some(rel.to_string()),
                    tag_id: Some(tag_id),
                },
            );
        }
    }
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
#[path = "violations_tests.rs"]
mod tests;
