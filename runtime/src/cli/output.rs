// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Output helpers driven by the global CLI flags.
//!
//! `main` turns `--json`, `--quiet`, `--verbose` and `--no-color` into
//! `JOURNEY_*` environment variables so every command can read them.

use crate::journey::JourneySession;

pub const ENV_JSON: &str = "JOURNEY_JSON";
pub const ENV_QUIET: &str = "JOURNEY_QUIET";
pub const ENV_VERBOSE: &str = "JOURNEY_VERBOSE";
pub const ENV_NO_COLOR: &str = "JOURNEY_NO_COLOR";

fn flag(name: &str) -> bool {
    std::env::var(name).map(|v| v == "1").unwrap_or(false)
}

pub fn is_json() -> bool {
    flag(ENV_JSON)
}

pub fn is_quiet() -> bool {
    flag(ENV_QUIET)
}

pub fn is_verbose() -> bool {
    flag(ENV_VERBOSE)
}

pub fn no_color() -> bool {
    flag(ENV_NO_COLOR) || std::env::var_os("NO_COLOR").is_some()
}

/// Print a JSON value to stdout, pretty-printed.
pub fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(_) => println!("{value}"),
    }
}

/// Short machine-readable summary of a session.
pub fn session_summary_json(session: &JourneySession) -> serde_json::Value {
    serde_json::json!({
        "session_id": session.id().to_string(),
        "start_url": session.start_url(),
        "termination": session.termination().map(|t| t.label()),
        "steps": session.steps().len(),
        "edges": session.graph().edge_count(),
        "resources": session.registry().len(),
    })
}

/// Human-readable summary lines of a session.
pub fn session_summary_lines(session: &JourneySession) -> Vec<String> {
    let mut lines = vec![
        format!("Journey {}", session.id()),
        format!("  start:       {}", session.start_url()),
        format!(
            "  termination: {}",
            session.termination().map(|t| t.label()).unwrap_or("running")
        ),
        format!("  steps:       {}", session.steps().len()),
        format!("  edges:       {}", session.graph().edge_count()),
        format!("  resources:   {}", session.registry().len()),
    ];
    for resource in session.resources() {
        lines.push(format!(
            "    [{}] {} (step {}, {})",
            resource.provider,
            resource.canonical_id,
            resource.first_seen_step,
            resource.channel.as_str()
        ));
    }
    lines
}

/// Print the session summary unless `--quiet`; as JSON with `--json`.
pub fn print_session_summary(session: &JourneySession) {
    if is_json() {
        print_json(&session_summary_json(session));
    } else if !is_quiet() {
        for line in session_summary_lines(session) {
            println!("{line}");
        }
    }
}
