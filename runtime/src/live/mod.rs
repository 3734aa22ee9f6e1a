// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Live runs: several journeys at once, one browser context each.

pub mod runner;

pub use runner::{run_batch, BatchError, BatchOutcome, DEFAULT_CONCURRENCY};
