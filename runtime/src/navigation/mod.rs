// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Navigation: the crawl state machine, its loop guard and the retrying
//! driver calls it acts through.

pub mod act;
pub mod controller;
pub mod guard;

pub use controller::{NavigationController, SETTLE_CONDITION};
pub use guard::{normalize_url, state_fingerprint, LoopGuard};
