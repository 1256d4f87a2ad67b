//! Reduce findings plus policy mode into a single verdict.
use super::types::{Decision, Evaluation, RemediationAction};
use crate::policy::PolicyMode;

/// Block only in `strict` mode, and only for blocking kinds. Actions for
/// blocking findings come first, then advisory ones, each in emission order;
/// identical messages are reported once.
pub fn aggregate(mode: PolicyMode, evaluation: Evaluation) -> Decision {
    let block = mode == PolicyMode::Strict
        && evaluation
            .findings
            .iter()
            .any(|(violation, _)| violation.kind.blocks_in_strict());

    let (blocking, advisory): (Vec<_>, Vec<_>) = evaluation
        .findings
        .iter()
        .partition(|(violation, _)| violation.kind.blocks_in_strict());
    let mut actions: Vec<RemediationAction> = Vec::new();
    for (_, action) in blocking.into_iter().chain(advisory) {
        if !actions.iter().any(|seen| seen.message == action.message) {
            actions.push(action.clone());
        }
    }

    let violations = evaluation
        .findings
        .into_iter()
        .map(|(violation, _)| violation)
        .collect();

    Decision {
        block,
        violations,
        actions,
        policy_mode: mode,
        processed_file_count: evaluation.processed_file_count,
        policy_loaded: true,
        degraded: evaluation.degraded,
    }
}
