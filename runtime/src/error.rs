// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for the journey engine.
//!
//! Only [`JourneyError::SessionFatal`] ever escapes the navigation
//! controller. Driver, action and discovery errors are absorbed where they
//! happen and show up in the recorded trace instead.

use crate::journey::JourneySession;

/// A failure reported by the browser driver adapter.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("{op} timed out after {timeout_ms}ms")]
    Timeout { op: String, timeout_ms: u64 },

    #[error("navigation aborted: {0}")]
    NavigationAborted(String),

    #[error("frame detached: {0}")]
    DetachedFrame(String),

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    /// The browser context (or the whole browser) is gone.
    #[error("browser context closed: {0}")]
    ContextClosed(String),
}

impl DriverError {
    /// Build a timeout error for the named operation.
    pub fn timeout(op: &str, timeout_ms: u64) -> Self {
        DriverError::Timeout {
            op: op.to_string(),
            timeout_ms,
        }
    }

    /// Whether this error means the session cannot continue at all.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DriverError::ContextClosed(_))
    }

    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DriverError::Timeout { .. }
                | DriverError::NavigationAborted(_)
                | DriverError::DetachedFrame(_)
        )
    }
}

/// A failure while activating a candidate element.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("element is stale: {0}")]
    Stale(String),

    #[error("element is obscured: {0}")]
    Obscured(String),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl ActionError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ActionError::Driver(e) if e.is_fatal())
    }
}

/// A URL matched a provider pattern but no canonical id could be extracted.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot extract {provider} id from {url}: {reason}")]
pub struct DiscoveryParseError {
    pub url: String,
    pub provider: String,
    pub reason: String,
}

/// Errors surfaced to whoever drives the engine.
#[derive(thiserror::Error, Debug)]
pub enum JourneyError {
    /// The browser context is gone. Carries everything recorded so far.
    #[error("session fatal: {reason}")]
    SessionFatal {
        reason: String,
        partial: Box<JourneySession>,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl JourneyError {
    /// The partially recorded session, if this error carries one.
    pub fn partial_session(&self) -> Option<&JourneySession> {
        match self {
            JourneyError::SessionFatal { partial, .. } => Some(partial),
            JourneyError::Config(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_context_closed_is_fatal() {
        assert!(DriverError::ContextClosed("gone".into()).is_fatal());
        assert!(!DriverError::timeout("navigate", 100).is_fatal());
        assert!(!DriverError::Script("boom".into()).is_fatal());
        assert!(!DriverError::Protocol("x".into()).is_fatal());
    }

    #[test]
    fn test_transient_classes() {
        assert!(DriverError::timeout("click", 5).is_transient());
        assert!(DriverError::DetachedFrame("f1".into()).is_transient());
        assert!(!DriverError::ContextClosed("gone".into()).is_transient());
        assert!(!DriverError::Script("syntax".into()).is_transient());
    }

    #[test]
    fn test_action_error_fatality_follows_driver() {
        let fatal: ActionError = DriverError::ContextClosed("closed".into()).into();
        assert!(fatal.is_fatal());
        assert!(!ActionError::Stale("h3".into()).is_fatal());
        assert!(!ActionError::Obscured("h3".into()).is_fatal());
    }

    #[test]
    fn test_error_messages() {
        let e = DriverError::timeout("navigate", 30000);
        assert_eq!(e.to_string(), "navigate timed out after 30000ms");

        let p = DiscoveryParseError {
            url: "https://vod.vimeocdn.com/x/master.m3u8".into(),
            provider: "vimeo".into(),
            reason: "no numeric id".into(),
        };
        assert!(p.to_string().contains("vimeo"));
        assert!(p.to_string().contains("no numeric id"));
    }
}
