// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Step-level records of a journey.

use crate::scoring::InteractiveCandidate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why the guard refused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VetoReason {
    /// The target URL was already arrived at earlier in the session.
    RevisitedUrl,
    /// A same-page change led back to an already seen page state.
    RepeatedState,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// No actionable candidate remained.
    DeadEnd,
    /// The loop guard refused to continue.
    GuardVeto(VetoReason),
    /// The configured step ceiling was reached.
    StepBudget,
    /// The start URL could not be loaded.
    NavigationFailed,
    /// The browser context disappeared mid-run. Only seen on partial
    /// sessions carried by `JourneyError::SessionFatal`.
    SessionFatal,
}

impl TerminationReason {
    pub fn label(&self) -> &'static str {
        match self {
            TerminationReason::DeadEnd => "dead_end",
            TerminationReason::GuardVeto(VetoReason::RevisitedUrl) => "guard_veto:revisited_url",
            TerminationReason::GuardVeto(VetoReason::RepeatedState) => "guard_veto:repeated_state",
            TerminationReason::StepBudget => "step_budget",
            TerminationReason::NavigationFailed => "navigation_failed",
            TerminationReason::SessionFatal => "session_fatal",
        }
    }
}

/// Result of one click attempt within a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The URL or the page state changed.
    Changed,
    /// The click went through but nothing observable happened.
    NoEffect,
    Stale,
    Obscured,
    /// The driver failed (after retries for transient errors).
    DriverFailed,
    /// The guard refused the candidate or its result.
    Vetoed,
}

impl ActionOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionOutcome::Changed => "changed",
            ActionOutcome::NoEffect => "no_effect",
            ActionOutcome::Stale => "stale",
            ActionOutcome::Obscured => "obscured",
            ActionOutcome::DriverFailed => "driver_failed",
            ActionOutcome::Vetoed => "vetoed",
        }
    }

    pub fn is_failure(self) -> bool {
        !matches!(self, ActionOutcome::Changed)
    }
}

/// One click attempt, successful or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionAttempt {
    /// Position of the candidate in the ranked list.
    pub rank: usize,
    pub text: String,
    pub href: Option<String>,
    pub outcome: ActionOutcome,
    /// Error or veto detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Playback state of the page's video, when any.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoState {
    pub has_video: bool,
    pub has_embedded_player: bool,
    pub playing: bool,
    pub current_time: f64,
    pub duration: f64,
    pub has_controls: bool,
    /// Decision or interaction overlays are present.
    pub has_interaction_points: bool,
}

/// References to the artifacts captured on arrival.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// Opaque reference returned by the sink, if it kept the HTML.
    pub html_ref: Option<String>,
    pub screenshot_ref: Option<String>,
    /// FNV-1a hash of the serialized DOM, hex encoded.
    pub html_fingerprint: Option<String>,
    pub html_bytes: usize,
    pub screenshot_bytes: usize,
}

/// One observed state plus the action attempted from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyStep {
    pub index: usize,
    /// URL at arrival.
    pub url: String,
    pub title: Option<String>,
    /// Ranked candidates observed on arrival.
    pub candidates: Vec<InteractiveCandidate>,
    /// The candidate whose action was accepted, if any.
    pub chosen: Option<InteractiveCandidate>,
    /// Whether the accepted action changed the URL or the page state.
    pub state_changed: bool,
    /// URL after the accepted action, when it differs from `url`.
    pub landed_url: Option<String>,
    pub attempts: Vec<ActionAttempt>,
    /// Canonical ids first registered during this step.
    pub new_resources: Vec<String>,
    pub video: Option<VideoState>,
    pub snapshot: PageSnapshot,
    pub timestamp: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl JourneyStep {
    pub fn failed_attempts(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| a.outcome.is_failure())
            .count()
    }

    pub fn url_changed(&self) -> bool {
        self.landed_url.is_some()
    }
}
