//! Verdict types returned to the host.
use crate::policy::PolicyMode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Violation categories a changed file (or batch) can fall into.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    BatchGuard,
    CodeFirstRequireSpec,
    CodeFirstAutoplan,
    DuplicatePrimary,
    ExpiredReservation,
    ExpiringReservation,
}

impl ViolationKind {
    /// Return the stable string identifier used in JSON artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::BatchGuard => "batch-guard",
            ViolationKind::CodeFirstRequireSpec => "code-first-require-spec",
            ViolationKind::CodeFirstAutoplan => "code-first-autoplan",
            ViolationKind::DuplicatePrimary => "duplicate-primary",
            ViolationKind::ExpiredReservation => "expired-reservation",
            ViolationKind::ExpiringReservation => "expiring-reservation",
        }
    }

    /// Whether this kind blocks under `strict`. Autoplan and expiring
    /// reservations stay advisory in every mode.
    pub fn blocks_in_strict(&self) -> bool {
        matches!(
            self,
            ViolationKind::BatchGuard
                | ViolationKind::CodeFirstRequireSpec
                | ViolationKind::DuplicatePrimary
                | ViolationKind::ExpiredReservation
        )
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub kind: ViolationKind,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub detail: String,
}

/// What the user should do about a violation.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    SplitBatch,
    RequireSpec,
    AddToplineTag,
    UseRelates,
    RenewReservation,
    FinalizeReservation,
}

impl ActionKind {
    /// Return the stable string identifier used in JSON artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::SplitBatch => "split-batch",
            ActionKind::RequireSpec => "require-spec",
            ActionKind::AddToplineTag => "add-topline-tag",
            ActionKind::UseRelates => "use-relates",
            ActionKind::RenewReservation => "renew-reservation",
            ActionKind::FinalizeReservation => "finalize-reservation",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemediationAction {
    pub kind: ActionKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_id: Option<String>,
}

/// Raw output of the violation engine before aggregation.
#[derive(Debug, Default, Clone)]
pub struct Evaluation {
    /// Violations paired with the action that remediates each.
    pub findings: Vec<(Violation, RemediationAction)>,
    pub processed_file_count: usize,
    pub degraded: Vec<String>,
}

impl Evaluation {
    pub(crate) fn push(&mut self, violation: Violation, action: RemediationAction) {
        self.findings.push((violation, action));
    }
}

/// Structured verdict for one batch of changed files.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub block: bool,
    pub violations: Vec<Violation>,
    pub actions: Vec<RemediationAction>,
    pub policy_mode: PolicyMode,
    pub processed_file_count: usize,
    pub policy_loaded: bool,
    #[serde(default)]
    pub degraded: Vec<String>,
}

impl Decision {
    /// Verdict for a project without a usable policy: nothing is checked.
    pub fn unchecked(policy_mode: PolicyMode) -> Self {
        Self {
            block: false,
            violations: Vec::new(),
            actions: Vec::new(),
            policy_mode,
            processed_file_count: 0,
            policy_loaded: false,
            degraded: Vec::new(),
        }
    }

    pub fn count(&self, kind: ViolationKind) -> usize {
        self.violations
            .iter()
            .filter(|violation| violation.kind == kind)
            .count()
    }
}
