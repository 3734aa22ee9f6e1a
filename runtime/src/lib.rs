// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Journey runtime: an autonomous crawler for interactive, stateful web
//! experiences.
//!
//! A [`navigation::NavigationController`] drives one browser context
//! through a narrative: it scores the interactive elements of each page,
//! acts on the best one, verifies that something changed and records the
//! step. Media resources are discovered along the way from the DOM and
//! from network traffic, deduplicated by canonical id. The result is a
//! [`journey::JourneySession`], serialized by [`journey::JourneyRecorder`].

pub mod audit;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod events;
pub mod journey;
pub mod live;
pub mod navigation;
pub mod renderer;
pub mod scoring;

pub use config::CrawlConfig;
pub use error::{ActionError, DiscoveryParseError, DriverError, JourneyError};
pub use journey::{JourneyRecorder, JourneySession};
pub use navigation::NavigationController;
