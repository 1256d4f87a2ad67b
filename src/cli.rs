//! CLI argument parsing for the tag reservation workflow.
//!
//! The CLI stays thin: every command maps onto one library operation so the
//! same engine can be embedded in an editor hook without going through argv.
use crate::policy::PolicyMode;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Environment variable consulted for the actor recorded in ledger events.
pub const ACTOR_ENV: &str = "TAGGUARD_ACTOR";

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "tagguard",
    version,
    about = "Validate topline tags and manage SPEC reservations",
    after_help = "Commands:\n  evaluate FILES...              Classify changed files (exit 2 when blocked)\n  reserve --domain <D>           Mint the next @SPEC:<D>-NNN reservation\n  register <TAG> <PATH>          Bind a tag id to its primary file\n  release <TAG>                  Retire a tag id\n  expire                         Persist overdue reservations as expired\n  rebuild-index                  Rebuild index.json from the ledger\n  status                         List tag ids and counters\n\nExamples:\n  tagguard evaluate src/auth/login.py\n  tagguard --root /srv/app evaluate --mode strict --json src/pay/charge.ts\n  tagguard reserve --domain AUTH --title \"Session refresh\"\n  tagguard register @SPEC:AUTH-001 src/auth/session.py",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Project root containing `.tagguard/`
    #[arg(long, value_name = "DIR", global = true, default_value = ".")]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Evaluate(EvaluateArgs),
    Reserve(ReserveArgs),
    Register(RegisterArgs),
    Release(ReleaseArgs),
    Expire(ExpireArgs),
    /// Rebuild index.json by replaying the ledger
    RebuildIndex,
    Status(StatusArgs),
}

/// Actor recorded on ledger events.
#[derive(Args, Debug, Clone)]
pub struct ActorArgs {
    /// Actor recorded in the ledger (defaults to $TAGGUARD_ACTOR, then $USER)
    #[arg(long, value_name = "NAME")]
    pub actor: Option<String>,
}

#[derive(Parser, Debug)]
#[command(about = "Classify a batch of changed files against policy and state")]
pub struct EvaluateArgs {
    /// Changed files, absolute or relative to the project root
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<String>,

    /// Override the policy's mode for this run
    #[arg(long, value_enum)]
    pub mode: Option<PolicyMode>,

    #[command(flatten)]
    pub actor: ActorArgs,

    /// Emit the decision as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Reserve the next SPEC id for a domain and write its stub")]
pub struct ReserveArgs {
    /// Domain to reserve in (uppercased; blank means CORE)
    #[arg(long, value_name = "DOMAIN")]
    pub domain: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub purpose: Option<String>,

    /// Acceptance criterion; repeat up to three times
    #[arg(
        long = "criteria",
        value_name = "TEXT",
        num_args = 1,
        action = clap::ArgAction::Append
    )]
    pub criteria: Vec<String>,

    #[arg(long)]
    pub notes: Option<String>,

    #[command(flatten)]
    pub actor: ActorArgs,

    /// Emit the reservation as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Bind a tag id to its primary file")]
pub struct RegisterArgs {
    /// Full tag id, e.g. @SPEC:AUTH-001
    #[arg(value_name = "TAG")]
    pub tag: String,

    /// Primary file path
    #[arg(value_name = "PATH")]
    pub path: String,

    #[command(flatten)]
    pub actor: ActorArgs,
}

#[derive(Parser, Debug)]
#[command(about = "Retire a reserved or active tag id")]
pub struct ReleaseArgs {
    #[arg(value_name = "TAG")]
    pub tag: String,

    #[command(flatten)]
    pub actor: ActorArgs,
}

#[derive(Parser, Debug)]
#[command(about = "Persist overdue reservations as expired")]
pub struct ExpireArgs {
    #[command(flatten)]
    pub actor: ActorArgs,
}

#[derive(Parser, Debug)]
#[command(about = "List tag ids with their derived state and the counters")]
pub struct StatusArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

impl ActorArgs {
    /// Resolve the actor: flag, then `$TAGGUARD_ACTOR`, then `$USER`.
    pub fn resolve(&self) -> String {
        self.actor
            .clone()
            .or_else(|| std::env::var(ACTOR_ENV).ok())
            .or_else(|| std::env::var("USER").ok())
            .filter(|actor| !actor.trim().is_empty())
            .unwrap_or_else(|| "unknown".to_string())
    }
}
