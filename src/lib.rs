//! Topline tag validation and SPEC reservation bookkeeping.
//!
//! [`engine::evaluate`] classifies a batch of changed files against
//! `.tagguard/policy.json` and the reservation state under
//! `.tagguard/state/`. [`reserve::ReservationAllocator`] and
//! [`lifecycle::Lifecycle`] are the only writers of that state, and both do
//! so under the state lock.
pub mod cli;
pub mod commands;
pub mod domain;
pub mod engine;
pub mod lifecycle;
pub mod output;
pub mod paths;
pub mod policy;
pub mod reserve;
pub mod scanner;
pub mod store;
