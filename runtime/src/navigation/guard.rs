// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Loop and depth guard.
//!
//! Three independent stop conditions: a URL already arrived at, a page state
//! (URL plus candidate set) already seen, and the step ceiling.

use crate::journey::VetoReason;
use fnv::{FnvHashSet, FnvHasher};
use std::hash::{Hash, Hasher};

/// Normalize a URL for visited-set membership: drop the fragment.
pub fn normalize_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut u) => {
            u.set_fragment(None);
            u.to_string()
        }
        Err(_) => raw.split('#').next().unwrap_or(raw).to_string(),
    }
}

/// Fingerprint of a page state: its URL and the set of candidate signatures.
pub fn state_fingerprint<S: AsRef<str>>(url: &str, signatures: &[S]) -> u64 {
    let mut sorted: Vec<&str> = signatures.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();
    sorted.dedup();
    let mut hasher = FnvHasher::default();
    normalize_url(url).hash(&mut hasher);
    sorted.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Clone)]
pub struct LoopGuard {
    visited: FnvHashSet<String>,
    states: FnvHashSet<u64>,
    max_steps: usize,
}

impl LoopGuard {
    pub fn new(max_steps: usize) -> Self {
        Self {
            visited: FnvHashSet::default(),
            states: FnvHashSet::default(),
            max_steps,
        }
    }

    pub fn mark_visited(&mut self, url: &str) {
        self.visited.insert(normalize_url(url));
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(&normalize_url(url))
    }

    /// Check a transition from `from` to `to`. Staying on the same URL is
    /// never a revisit.
    pub fn check_transition(&self, from: &str, to: &str) -> Result<(), VetoReason> {
        if normalize_url(from) == normalize_url(to) {
            return Ok(());
        }
        if self.is_visited(to) {
            return Err(VetoReason::RevisitedUrl);
        }
        Ok(())
    }

    /// Remember a page state. Returns `false` if it was seen before.
    pub fn remember_state(&mut self, fingerprint: u64) -> bool {
        self.states.insert(fingerprint)
    }

    /// Steps that may still be committed after `committed` steps.
    pub fn remaining(&self, committed: usize) -> usize {
        self.max_steps.saturating_sub(committed)
    }

    /// Whether step number `index` (zero based) is the last one the budget allows.
    pub fn is_last_step(&self, index: usize) -> bool {
        index + 1 >= self.max_steps
    }
}
