// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Crawl configuration.
//!
//! Resolution order: built-in defaults, then an optional JSON file, then
//! `JOURNEY_*` environment variables, then whatever the caller (usually the
//! CLI) overrides explicitly.

use crate::discovery::{default_provider_patterns, ProviderMatcher, ProviderPattern};
use crate::error::JourneyError;
use crate::scoring::{
    default_destinations, default_keywords, CandidateScorer, DestinationRule, KeywordRule,
    SelectorTiers, TierScores, DEFAULT_TEXT_LIMIT,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_MAX_STEPS: &str = "JOURNEY_MAX_STEPS";
pub const ENV_ACTION_RETRY_BOUND: &str = "JOURNEY_ACTION_RETRY_BOUND";
pub const ENV_SETTLE_TIMEOUT_MS: &str = "JOURNEY_SETTLE_TIMEOUT_MS";
pub const ENV_NAVIGATION_TIMEOUT_MS: &str = "JOURNEY_NAVIGATION_TIMEOUT_MS";

/// Everything one crawl needs besides its start URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Hard ceiling on committed steps.
    pub max_steps: usize,
    /// Attempts per driver call before a transient failure degrades.
    pub action_retry_bound: u32,
    /// How long to wait for the page to settle after a click.
    pub settle_timeout_ms: u64,
    /// Quiet time after every click before the page is inspected again,
    /// counted against `settle_timeout_ms`.
    pub min_settle_ms: u64,
    pub navigation_timeout_ms: u64,
    /// Timeout for every other driver call (evaluate, click, screenshot).
    pub action_timeout_ms: u64,
    /// Pause before each arrival.
    pub step_delay_ms: u64,
    pub keyword_vocabulary: Vec<KeywordRule>,
    pub known_provider_patterns: Vec<ProviderPattern>,
    pub selector_tiers: SelectorTiers,
    pub tier_scores: TierScores,
    pub destination_rules: Vec<DestinationRule>,
    /// Characters of candidate text kept in the trace.
    pub text_limit: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_steps: 25,
            action_retry_bound: 3,
            settle_timeout_ms: 3_000,
            min_settle_ms: 1_000,
            navigation_timeout_ms: 30_000,
            action_timeout_ms: 10_000,
            step_delay_ms: 0,
            keyword_vocabulary: default_keywords(),
            known_provider_patterns: default_provider_patterns(),
            selector_tiers: SelectorTiers::default(),
            tier_scores: TierScores::default(),
            destination_rules: default_destinations(),
            text_limit: DEFAULT_TEXT_LIMIT,
        }
    }
}

impl CrawlConfig {
    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, JourneyError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Read a JSON config file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, JourneyError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| JourneyError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&raw)
            .map_err(|e| JourneyError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Apply `JOURNEY_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary lookup. Unparseable values are
    /// ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.max_steps = read_env_usize(&lookup, ENV_MAX_STEPS, self.max_steps);
        self.action_retry_bound =
            read_env_u32(&lookup, ENV_ACTION_RETRY_BOUND, self.action_retry_bound);
        self.settle_timeout_ms =
            read_env_u64(&lookup, ENV_SETTLE_TIMEOUT_MS, self.settle_timeout_ms);
        self.navigation_timeout_ms =
            read_env_u64(&lookup, ENV_NAVIGATION_TIMEOUT_MS, self.navigation_timeout_ms);
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), JourneyError> {
        if self.max_steps == 0 {
            return Err(JourneyError::Config("max_steps must be at least 1".into()));
        }
        if self.action_retry_bound == 0 {
            return Err(JourneyError::Config(
                "action_retry_bound must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("settle_timeout_ms", self.settle_timeout_ms),
            ("navigation_timeout_ms", self.navigation_timeout_ms),
            ("action_timeout_ms", self.action_timeout_ms),
        ] {
            if value == 0 {
                return Err(JourneyError::Config(format!("{name} must be positive")));
            }
        }
        if self.selector_tiers.is_empty() {
            return Err(JourneyError::Config("no selector tiers configured".into()));
        }
        self.provider_matcher()?;
        Ok(())
    }

    /// Compile the provider patterns.
    pub fn provider_matcher(&self) -> Result<ProviderMatcher, JourneyError> {
        ProviderMatcher::new(&self.known_provider_patterns)
            .map_err(|e| JourneyError::Config(format!("invalid provider pattern: {e}")))
    }

    /// Build the candidate scorer for this configuration.
    pub fn scorer(&self) -> CandidateScorer {
        CandidateScorer::new(
            self.tier_scores,
            self.keyword_vocabulary.clone(),
            self.destination_rules.clone(),
            self.text_limit,
        )
    }
}

fn read_env_u64<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str, default_value: u64) -> u64 {
    lookup(name)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default_value)
}

fn read_env_u32<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str, default_value: u32) -> u32 {
    lookup(name)
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(default_value)
}

fn read_env_usize<F: Fn(&str) -> Option<String>>(
    lookup: &F,
    name: &str,
    default_value: usize,
) -> usize {
    lookup(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default_value)
}
