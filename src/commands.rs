//! Command handlers wiring CLI arguments onto library operations.
use crate::cli::{
    Command, EvaluateArgs, ExpireArgs, RegisterArgs, ReleaseArgs, ReserveArgs, RootArgs,
    StatusArgs,
};
use crate::engine::{self, EvalContext};
use crate::lifecycle::Lifecycle;
use crate::output;
use crate::paths::ProjectPaths;
use crate::policy::{default_policy, load_policy, PolicyConfig};
use crate::reserve::{ReservationAllocator, ReserveRequest, StubFields};
use crate::store::StateStore;
use anyhow::Result;
use chrono::Utc;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

/// Exit status of `evaluate` when the decision blocks the edit.
pub const EXIT_BLOCKED: u8 = 2;

/// Dispatch one parsed invocation.
pub fn run(args: RootArgs) -> Result<ExitCode> {
    let paths = project_paths(&args.root);
    match args.command {
        Command::Evaluate(args) => run_evaluate(&paths, args),
        Command::Reserve(args) => run_reserve(&paths, args).map(|()| ExitCode::SUCCESS),
        Command::Register(args) => run_register(&paths, args).map(|()| ExitCode::SUCCESS),
        Command::Release(args) => run_release(&paths, args).map(|()| ExitCode::SUCCESS),
        Command::Expire(args) => run_expire(&paths, args).map(|()| ExitCode::SUCCESS),
        Command::RebuildIndex => run_rebuild_index(&paths).map(|()| ExitCode::SUCCESS),
        Command::Status(args) => run_status(&paths, args).map(|()| ExitCode::SUCCESS),
    }
}

fn project_paths(root: &Path) -> ProjectPaths {
    let root = std::fs::canonicalize(root).unwrap_or_else(|err| {
        tracing::warn!(root = %root.display(), error = %err, "cannot canonicalize root");
        root.to_path_buf()
    });
    ProjectPaths::new(root)
}

/// Policy for maintenance commands: a missing file means defaults, a
/// malformed one is an error.
fn policy_for_commands(paths: &ProjectPaths) -> Result<PolicyConfig> {
    Ok(load_policy(paths)?.unwrap_or_else(|| {
        tracing::debug!(path = %paths.policy_path().display(), "no policy; using defaults");
        default_policy()
    }))
}

fn state_store(paths: &ProjectPaths, policy: &PolicyConfig) -> StateStore {
    StateStore::new(paths.clone(), Duration::from_millis(policy.lock_timeout_ms))
}

pub fn run_evaluate(paths: &ProjectPaths, args: EvaluateArgs) -> Result<ExitCode> {
    let ctx = EvalContext::new(args.mode, args.actor.resolve());
    let decision = engine::evaluate(paths, &args.files, &ctx);
    if args.json {
        output::print_json(&decision, "decision")?;
    } else {
        output::print_decision(&decision);
    }
    Ok(if decision.block {
        ExitCode::from(EXIT_BLOCKED)
    } else {
        ExitCode::SUCCESS
    })
}

pub fn run_reserve(paths: &ProjectPaths, args: ReserveArgs) -> Result<()> {
    let policy = policy_for_commands(paths)?;
    let store = state_store(paths, &policy);
    let mut criteria = args.criteria;
    if criteria.len() > 3 {
        tracing::warn!(count = criteria.len(), "only the first 3 criteria are used");
        criteria.truncate(3);
    }
    let fields = StubFields {
        title: args.title,
        purpose: args.purpose,
        acceptance_criteria: criteria,
        notes: args.notes,
    };
    let actor = args.actor.resolve();
    let request = ReserveRequest {
        domain: &args.domain,
        actor: &actor,
        now: Utc::now(),
        trigger_path: None,
        fields: &fields,
    };
    let reservation = ReservationAllocator::new(&store, &policy).reserve(&request)?;
    if args.json {
        output::print_json(&reservation, "reservation")
    } else {
        output::print_reservation(&reservation);
        Ok(())
    }
}

pub fn run_register(paths: &ProjectPaths, args: RegisterArgs) -> Result<()> {
    let policy = policy_for_commands(paths)?;
    let store = state_store(paths, &policy);
    let outcome = Lifecycle::new(&store, &policy).register(
        &args.tag,
        &args.path,
        &args.actor.resolve(),
        Utc::now(),
    )?;
    output::print_register(&outcome);
    Ok(())
}

pub fn run_release(paths: &ProjectPaths, args: ReleaseArgs) -> Result<()> {
    let policy = policy_for_commands(paths)?;
    let store = state_store(paths, &policy);
    let entry =
        Lifecycle::new(&store, &policy).release(&args.tag, &args.actor.resolve(), Utc::now())?;
    output::print_release(&entry);
    Ok(())
}

pub fn run_expire(paths: &ProjectPaths, args: ExpireArgs) -> Result<()> {
    let policy = policy_for_commands(paths)?;
    let store = state_store(paths, &policy);
    let expired =
        Lifecycle::new(&store, &policy).expire_overdue(&args.actor.resolve(), Utc::now())?;
    output::print_expired(&expired);
    Ok(())
}

pub fn run_rebuild_index(paths: &ProjectPaths) -> Result<()> {
    let policy = policy_for_commands(paths)?;
    let store = state_store(paths, &policy);
    let summary = Lifecycle::new(&store, &policy).rebuild_index()?;
    output::print_rebuild(&summary);
    Ok(())
}

pub fn run_status(paths: &ProjectPaths, args: StatusArgs) -> Result<()> {
    let policy = policy_for_commands(paths)?;
    let store = state_store(paths, &policy);
    let report = Lifecycle::new(&store, &policy).status(Utc::now());
    if args.json {
        output::print_json(&report, "status report")
    } else {
        output::print_status(&report);
        Ok(())
    }
}
