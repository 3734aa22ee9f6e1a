// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI subcommand implementations for the journey binary.

pub mod batch_cmd;
pub mod crawl_cmd;
pub mod doctor;
pub mod output;
