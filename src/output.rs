//! Human-readable and JSON rendering for command results.
use crate::engine::Decision;
use crate::lifecycle::{RebuildSummary, RegisterOutcome, StatusReport};
use crate::reserve::Reservation;
use crate::store::IndexEntry;
use anyhow::{Context, Result};
use chrono::SecondsFormat;
use serde::Serialize;

/// Print any serializable result as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T, what: &str) -> Result<()> {
    let text = serde_json::to_string_pretty(value).with_context(|| format!("serialize {what}"))?;
    println!("{text}");
    Ok(())
}

pub fn print_decision(decision: &Decision) {
    print!("{}", render_decision(decision));
}

/// Text form of a decision: verdict line, then violations and actions.
pub fn render_decision(decision: &Decision) -> String {
    let mut out = String::new();
    if !decision.policy_loaded {
        out.push_str("policy: none (validation skipped)\n");
        return out;
    }
    let verdict = if decision.block { "blocked" } else { "ok" };
    out.push_str(&format!(
        "decision: {verdict} (mode {}, {} file(s) checked)\n",
        decision.policy_mode, decision.processed_file_count
    ));
    if !decision.violations.is_empty() {
        out.push_str("violations:\n");
        for violation in &decision.violations {
            out.push_str(&format!(
                "  - {}: {} ({})\n",
                violation.kind, violation.file_path, violation.detail
            ));
        }
    }
    if !decision.actions.is_empty() {
        out.push_str("actions:\n");
        for action in &decision.actions {
            out.push_str(&format!("  - [{}] {}\n", action.kind, action.message));
        }
    }
    if !decision.degraded.is_empty() {
        out.push_str(&format!("degraded: {}\n", decision.degraded.join("; ")));
    }
    out
}

pub fn print_reservation(reservation: &Reservation) {
    println!("reserved: {}", reservation.tag_id);
    println!("stub: {}", reservation.stub_path.display());
    println!(
        "reserved until: {}",
        reservation
            .reserved_until
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    );
}

pub fn print_register(outcome: &RegisterOutcome) {
    let entry = outcome.entry();
    let primary = entry.primary().unwrap_or("-");
    match outcome {
        RegisterOutcome::Registered(_) => println!("registered {} -> {primary}", entry.id),
        RegisterOutcome::Unchanged(_) => {
            println!("{} already registered to {primary}", entry.id)
        }
    }
}

pub fn print_release(entry: &IndexEntry) {
    println!("released {}", entry.id);
}

pub fn print_expired(ids: &[String]) {
    if ids.is_empty() {
        println!("no overdue reservations");
        return;
    }
    for id in ids {
        println!("expired {id}");
    }
}

pub fn print_rebuild(summary: &RebuildSummary) {
    println!("index rebuilt: {} tag id(s)", summary.entries);
    if summary.skipped_lines > 0 {
        println!("skipped {} unparsable ledger line(s)", summary.skipped_lines);
    }
}

pub fn print_status(report: &StatusReport) {
    print!("{}", render_status(report));
}

pub fn render_status(report: &StatusReport) -> String {
    let mut out = String::new();
    if report.entries.is_empty() {
        out.push_str("tags: none\n");
    } else {
        out.push_str("tags:\n");
        for entry in &report.entries {
            out.push_str(&format!("  - {}: {}", entry.id, entry.state));
            if let Some(primary) = entry.primary_path.as_ref() {
                out.push_str(&format!(" ({primary})"));
            }
            if let Some(until) = entry.reserved_until {
                out.push_str(&format!(
                    " until {}",
                    until.to_rfc3339_opts(SecondsFormat::Secs, true)
                ));
            }
            out.push('\n');
        }
    }
    if !report.counters.is_empty() {
        out.push_str("counters:\n");
        for (domain, value) in &report.counters {
            out.push_str(&format!("  - {domain}: {value}\n"));
        }
    }
    out
}
