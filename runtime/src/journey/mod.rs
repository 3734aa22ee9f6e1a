// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Journey data model and recorder.
//!
//! A [`JourneySession`] is built by the navigation controller, which is its
//! only writer. Once finished it is frozen and can be turned into a
//! serializable [`JourneyTrace`] by the recorder.

pub mod graph;
pub mod recorder;
pub mod sink;
pub mod types;

pub use graph::NavigationGraph;
pub use recorder::{JourneyRecorder, JourneyTrace, TraceMetadata, TraceSummary};
pub use sink::{ArtifactKind, DirectorySink, DiscardSink, SnapshotSink};
pub use types::{
    ActionAttempt, ActionOutcome, JourneyStep, PageSnapshot, TerminationReason, VetoReason,
    VideoState,
};

use crate::discovery::{MediaResource, ResourceRegistry};
use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

/// One crawl run.
#[derive(Debug)]
pub struct JourneySession {
    id: Uuid,
    start_url: String,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    steps: Vec<JourneyStep>,
    graph: NavigationGraph,
    registry: ResourceRegistry,
    termination: Option<TerminationReason>,
    parse_errors: usize,
}

impl JourneySession {
    pub fn new(start_url: &str, registry: ResourceRegistry) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_url: start_url.to_string(),
            started_at: Utc::now(),
            ended_at: None,
            steps: Vec::new(),
            graph: NavigationGraph::new(),
            registry,
            termination: None,
            parse_errors: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn steps(&self) -> &[JourneyStep] {
        &self.steps
    }

    pub fn graph(&self) -> &NavigationGraph {
        &self.graph
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Discovered resources in first-seen order.
    pub fn resources(&self) -> Vec<MediaResource> {
        self.registry.snapshot()
    }

    pub fn termination(&self) -> Option<TerminationReason> {
        self.termination
    }

    pub fn is_finished(&self) -> bool {
        self.termination.is_some()
    }

    /// Provider matches dropped because no id could be extracted.
    pub fn parse_errors(&self) -> usize {
        self.parse_errors
    }

    pub(crate) fn push_step(&mut self, step: JourneyStep) {
        if self.is_finished() {
            warn!("ignoring step {} on finished session {}", step.index, self.id);
            return;
        }
        self.steps.push(step);
    }

    pub(crate) fn add_edge(&mut self, from: &str, to: &str) {
        if self.is_finished() {
            return;
        }
        self.graph.add_edge(from, to);
    }

    /// Freeze the session. Later calls keep the first reason.
    pub(crate) fn finish(&mut self, reason: TerminationReason, parse_errors: usize) {
        if self.is_finished() {
            return;
        }
        self.termination = Some(reason);
        self.parse_errors = parse_errors;
        self.ended_at = Some(Utc::now());
    }
}
