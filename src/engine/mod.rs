//! Edit gate: classify a batch of changed files and decide whether to block.
//!
//! Evaluation never fails. Missing policy means "not opted in"; unreadable
//! files, lock contention, and reservation I/O errors are logged and noted as
//! degraded, and only policy violations under `strict` can set `block`.
use crate::domain::DomainResolver;
use crate::paths::ProjectPaths;
use crate::policy::{load_policy_or_none, PathFilter, PolicyConfig, PolicyMode};
use crate::reserve::ReservationAllocator;
use crate::scanner::TopLineScanner;
use crate::store::StateStore;
use chrono::{DateTime, Utc};
use std::time::Duration;

mod decision;
mod types;
mod violations;

pub use decision::aggregate;
pub use types::*;
pub use violations::{is_code_file, ViolationEngine, CODE_EXTENSIONS};

/// Per-invocation operation context supplied by the host.
#[derive(Debug, Clone)]
pub struct EvalContext {
    /// Overrides the policy's `policyMode` when set.
    pub mode: Option<PolicyMode>,
    pub actor: String,
    pub now: DateTime<Utc>,
}

impl EvalContext {
    pub fn new(mode: Option<PolicyMode>, actor: impl Into<String>) -> Self {
        Self {
            mode,
            actor: actor.into(),
            now: Utc::now(),
        }
    }
}

/// Evaluate `files` against the project's policy and state.
pub fn evaluate(paths: &ProjectPaths, files: &[String], ctx: &EvalContext) -> Decision {
    match load_policy_or_none(paths) {
        Some(policy) => evaluate_with_policy(paths, &policy, files, ctx),
        None => {
            tracing::debug!(root = %paths.root().display(), "no policy; skipping validation");
            Decision::unchecked(ctx.mode.unwrap_or_default())
        }
    }
}

/// Evaluate with an already-loaded policy.
pub fn evaluate_with_policy(
    paths: &ProjectPaths,
    policy: &PolicyConfig,
    files: &[String],
    ctx: &EvalContext,
) -> Decision {
    let mode = ctx.mode.unwrap_or(policy.policy_mode);
    let store = StateStore::new(paths.clone(), Duration::from_millis(policy.lock_timeout_ms));
    let index = store.load_index();
    let filter = PathFilter::new(policy);
    let scanner = TopLineScanner::new(&policy.topline_rules);
    let resolver = DomainResolver::new(policy);
    let allocator = ReservationAllocator::new(&store, policy);
    let engine = ViolationEngine {
        paths,
        policy,
        filter: &filter,
        scanner: &scanner,
        resolver: &resolver,
        index: &index,
        allocator: &allocator,
        actor: &ctx.actor,
        now: ctx.now,
    };

    let evaluation = engine.evaluate(files, mode);
    let decision = aggregate(mode, evaluation);
    tracing::debug!(
        block = decision.block,
        violations = decision.violations.len(),
        processed = decision.processed_file_count,
        mode = %mode,
        "evaluation complete"
    );
    decision
}
