// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Driver calls with bounded retries for transient failures.

use crate::error::{ActionError, DriverError};
use crate::journey::ActionOutcome;
use crate::renderer::{with_timeout, ElementHandle, NavigationResult, RenderContext};
use tracing::debug;

/// Attempts and per-attempt timeout for one driver call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, at least one.
    pub attempts: u32,
    pub timeout_ms: u64,
}

/// Click a candidate, retrying transient driver errors.
///
/// Stale and obscured elements are returned at once: a second click on the
/// same handle would fail the same way.
pub async fn click_with_retry(
    ctx: &mut dyn RenderContext,
    handle: &ElementHandle,
    policy: RetryPolicy,
) -> Result<(), ActionError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match with_timeout("click", policy.timeout_ms, ctx.click(handle)).await {
            Ok(()) => return Ok(()),
            Err(ActionError::Driver(e)) if e.is_transient() && attempt < policy.attempts.max(1) => {
                debug!("click on {} failed ({e}), attempt {attempt}", handle.0);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Navigate, retrying transient driver errors.
pub async fn navigate_with_retry(
    ctx: &mut dyn RenderContext,
    url: &str,
    policy: RetryPolicy,
) -> Result<NavigationResult, DriverError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let outer = policy.timeout_ms.saturating_add(1_000);
        match with_timeout("navigate", outer, ctx.navigate(url, policy.timeout_ms)).await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() && attempt < policy.attempts.max(1) => {
                debug!("navigation to {url} failed ({e}), attempt {attempt}");
            }
            Err(e) => return Err(e),
        }
    }
}

/// How a failed click shows up in the attempt log.
pub fn outcome_for(err: &ActionError) -> ActionOutcome {
    match err {
        ActionError::Stale(_) => ActionOutcome::Stale,
        ActionError::Obscured(_) => ActionOutcome::Obscured,
        ActionError::Driver(_) => ActionOutcome::DriverFailed,
    }
}
