//! Policy schema, defaults, and compiled matchers.
//!
//! The policy is loaded fresh for every invocation and never mutated; every
//! absent field is filled from `default_policy` so the engine reads typed
//! values instead of probing raw JSON.

/// Default hours before `reservedUntil` at which a reservation starts warning.
pub const DEFAULT_EXPIRE_HOURS_WARN: i64 = 24;
/// Default reservation lifetime in hours.
pub const DEFAULT_EXPIRE_HOURS_BLOCK: i64 = 72;
/// Default number of changed files above which per-file checks are skipped.
pub const DEFAULT_BATCH_FILE_THRESHOLD: usize = 25;
/// Default number of lines scanned for a topline tag (after any shebang).
pub const DEFAULT_MAX_SCAN_LINES: usize = 20;
/// Default bounded wait for the state lock.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 3000;

mod config;
mod matchers;
mod types;

pub use config::{default_policy, load_policy, load_policy_or_none};
pub use matchers::{compile_globs, PathFilter};
pub use types::*;
