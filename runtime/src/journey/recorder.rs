// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Journey recorder: turns a session into a self-contained trace.
//!
//! The recorder only reads the session. Changing the trace format never
//! touches navigation logic.

use super::{JourneySession, JourneyStep, NavigationGraph, TerminationReason};
use crate::discovery::MediaResource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

/// Session metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceMetadata {
    pub session_id: String,
    pub start_url: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub termination: Option<TerminationReason>,
    pub engine_version: String,
}

/// Totals over the whole journey.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSummary {
    pub total_steps: usize,
    pub total_attempts: usize,
    pub failed_actions: usize,
    pub url_changes: usize,
    pub same_page_changes: usize,
    pub edges: usize,
    pub resources: usize,
    pub resources_by_provider: BTreeMap<String, usize>,
    pub candidate_kinds: BTreeMap<String, usize>,
    pub discovery_parse_errors: usize,
}

/// The serialized form of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyTrace {
    pub metadata: TraceMetadata,
    pub steps: Vec<JourneyStep>,
    pub graph: NavigationGraph,
    pub resources: Vec<MediaResource>,
    pub summary: TraceSummary,
}

pub struct JourneyRecorder;

impl JourneyRecorder {
    pub fn record(session: &JourneySession) -> JourneyTrace {
        let resources = session.resources();
        JourneyTrace {
            metadata: TraceMetadata {
                session_id: session.id().to_string(),
                start_url: session.start_url().to_string(),
                started_at: session.started_at(),
                ended_at: session.ended_at(),
                duration_ms: session.ended_at().map(|end| {
                    (end - session.started_at())
                        .num_milliseconds()
                        .max(0) as u64
                }),
                termination: session.termination(),
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            summary: summarize(session, &resources),
            steps: session.steps().to_vec(),
            graph: session.graph().clone(),
            resources,
        }
    }

    pub fn to_json_pretty(session: &JourneySession) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&Self::record(session))
    }

    /// Write the pretty-printed trace to `path`.
    pub fn write_to(session: &JourneySession, path: &Path) -> io::Result<()> {
        let json = Self::to_json_pretty(session).map_err(io::Error::other)?;
        std::fs::write(path, json)
    }
}

fn summarize(session: &JourneySession, resources: &[MediaResource]) -> TraceSummary {
    let mut summary = TraceSummary {
        total_steps: session.steps().len(),
        edges: session.graph().edge_count(),
        resources: resources.len(),
        discovery_parse_errors: session.parse_errors(),
        ..Default::default()
    };
    summary.resources_by_provider = session
        .registry()
        .count_by_provider()
        .into_iter()
        .map(|(provider, n)| (provider.to_string(), n))
        .collect();
    for step in session.steps() {
        summary.total_attempts += step.attempts.len();
        summary.failed_actions += step.failed_attempts();
        if step.url_changed() {
            summary.url_changes += 1;
        } else if step.state_changed {
            summary.same_page_changes += 1;
        }
        for candidate in &step.candidates {
            *summary
                .candidate_kinds
                .entry(candidate.kind.as_str().to_string())
                .or_insert(0) += 1;
        }
    }
    summary
}
