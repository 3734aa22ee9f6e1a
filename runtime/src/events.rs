// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Journey event bus: typed events from the navigation controller.
//!
//! The EventBus is a `tokio::sync::broadcast` channel that carries
//! [`JourneyEvent`] values. Any consumer (the JSONL journal, a progress
//! printer, a test) can subscribe independently. When no subscribers
//! exist, events are silently dropped.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Every event the engine emits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JourneyEvent {
    /// A session was created for a start URL.
    SessionStarted {
        session_id: String,
        start_url: String,
        timestamp: String,
    },
    /// A step was committed to the session.
    StepCommitted {
        session_id: String,
        index: usize,
        url: String,
        candidates: usize,
        chosen: Option<String>,
        state_changed: bool,
        landed_url: Option<String>,
        elapsed_ms: u64,
    },
    /// A media resource was registered for the first time.
    ResourceDiscovered {
        session_id: String,
        canonical_id: String,
        provider: String,
        channel: String,
        step: usize,
    },
    /// A click attempt did not produce an accepted transition.
    ActionFailed {
        session_id: String,
        step: usize,
        rank: usize,
        outcome: String,
        detail: Option<String>,
    },
    /// The session reached a terminal state.
    SessionTerminated {
        session_id: String,
        reason: String,
        steps: usize,
        resources: usize,
        edges: usize,
    },
}

impl JourneyEvent {
    pub fn session_id(&self) -> &str {
        match self {
            JourneyEvent::SessionStarted { session_id, .. }
            | JourneyEvent::StepCommitted { session_id, .. }
            | JourneyEvent::ResourceDiscovered { session_id, .. }
            | JourneyEvent::ActionFailed { session_id, .. }
            | JourneyEvent::SessionTerminated { session_id, .. } => session_id,
        }
    }
}

/// The event bus. Cloning shares the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<JourneyEvent>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers. Silently ignores if no subscribers.
    pub fn emit(&self, event: JourneyEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<JourneyEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// RFC 3339 timestamp for the current time.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
