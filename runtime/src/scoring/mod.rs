// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Candidate scorer.
//!
//! Priority is tiered and additive: tier base, plus every matching keyword
//! bonus, plus a destination bonus when the href has a next-step shape. The
//! destination bonus is floored above the largest possible keyword and tier
//! contribution, so a shaped href always outranks a keyword-only element.

pub mod rules;

pub use rules::{
    default_destinations, default_keywords, DestinationRule, KeywordRule, SelectorTier,
    SelectorTiers, TierScores, DEFAULT_KEYWORD_BONUS,
};

use crate::renderer::{ElementHandle, RawElement, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default cap on recorded candidate text, in characters.
pub const DEFAULT_TEXT_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    Link,
    Button,
    Unknown,
}

impl CandidateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateKind::Link => "link",
            CandidateKind::Button => "button",
            CandidateKind::Unknown => "unknown",
        }
    }

    fn of(raw: &RawElement) -> Self {
        let tag = raw.tag.to_ascii_uppercase();
        let role = raw.role.as_deref().unwrap_or_default();
        let input_type = raw
            .input_type
            .as_deref()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if tag == "A" && raw.href.is_some() {
            CandidateKind::Link
        } else if tag == "BUTTON"
            || role.eq_ignore_ascii_case("button")
            || (tag == "INPUT" && matches!(input_type.as_str(), "submit" | "button"))
        {
            CandidateKind::Button
        } else {
            CandidateKind::Unknown
        }
    }
}

/// A scored, clickable element on the current page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractiveCandidate {
    #[serde(skip)]
    pub handle: Option<ElementHandle>,
    pub kind: CandidateKind,
    /// Visible text, truncated.
    pub text: String,
    pub href: Option<String>,
    pub rect: Rect,
    pub priority: u32,
    /// The selector tier that produced this candidate.
    pub provenance: SelectorTier,
}

impl InteractiveCandidate {
    /// Identity used for de-duplication and same-page change detection.
    pub fn signature(&self) -> String {
        signature(&self.text, self.href.as_deref())
    }
}

fn signature(text: &str, href: Option<&str>) -> String {
    format!("{}\u{1f}{}", text, href.unwrap_or_default())
}

/// Tiered, additive scorer. Deterministic for a given input order.
#[derive(Debug, Clone)]
pub struct CandidateScorer {
    tier_scores: TierScores,
    keywords: Vec<KeywordRule>,
    destinations: Vec<DestinationRule>,
    destination_floor: u32,
    text_limit: usize,
}

impl Default for CandidateScorer {
    fn default() -> Self {
        Self::new(
            TierScores::default(),
            default_keywords(),
            default_destinations(),
            DEFAULT_TEXT_LIMIT,
        )
    }
}

impl CandidateScorer {
    pub fn new(
        tier_scores: TierScores,
        keywords: Vec<KeywordRule>,
        destinations: Vec<DestinationRule>,
        text_limit: usize,
    ) -> Self {
        let keyword_ceiling: u32 = keywords.iter().map(|k| k.bonus).sum();
        let destination_floor = keyword_ceiling
            .saturating_add(tier_scores.spread())
            .saturating_add(1);
        let keywords = keywords
            .into_iter()
            .filter(|k| !k.word.trim().is_empty())
            .map(|k| KeywordRule {
                word: k.word.to_lowercase(),
                bonus: k.bonus,
            })
            .collect();
        let destinations = destinations
            .into_iter()
            .filter(|d| !d.fragment.is_empty())
            .map(|d| DestinationRule {
                fragment: d.fragment.to_lowercase(),
                bonus: d.bonus,
            })
            .collect();
        Self {
            tier_scores,
            keywords,
            destinations,
            destination_floor,
            text_limit,
        }
    }

    /// Smallest bonus any destination match can contribute.
    pub fn destination_floor(&self) -> u32 {
        self.destination_floor
    }

    /// Sum of bonuses of every keyword contained in `text`.
    pub fn keyword_bonus(&self, text: &str) -> u32 {
        let text = text.to_lowercase();
        self.keywords
            .iter()
            .filter(|k| text.contains(&k.word))
            .map(|k| k.bonus)
            .sum()
    }

    /// Bonus of the best destination rule matching `href`, or 0.
    pub fn destination_bonus(&self, href: &str) -> u32 {
        let href = href.to_lowercase();
        self.destinations
            .iter()
            .filter(|d| href.contains(&d.fragment))
            .map(|d| d.bonus.max(self.destination_floor))
            .max()
            .unwrap_or(0)
    }

    /// Priority of one element.
    pub fn priority(&self, raw: &RawElement) -> u32 {
        let mut score = self.tier_scores.base(raw.tier);
        score = score.saturating_add(self.keyword_bonus(&raw.text));
        if let Some(href) = raw.href.as_deref() {
            score = score.saturating_add(self.destination_bonus(href));
        }
        score
    }

    /// Filter, de-duplicate, score and rank the elements of one page.
    ///
    /// Only visible and enabled elements are kept. Elements with the same
    /// (text, href) collapse to the first one encountered. The result is
    /// sorted by priority, descending, with ties kept in input order.
    pub fn rank(&self, elements: Vec<RawElement>) -> Vec<InteractiveCandidate> {
        let mut seen = HashSet::new();
        let mut ranked: Vec<InteractiveCandidate> = elements
            .into_iter()
            .filter(|e| e.visible && e.enabled)
            .filter(|e| seen.insert(signature(e.text.trim(), e.href.as_deref())))
            .map(|e| {
                let priority = self.priority(&e);
                InteractiveCandidate {
                    kind: CandidateKind::of(&e),
                    text: truncate_chars(e.text.trim(), self.text_limit),
                    href: e.href,
                    rect: e.rect,
                    priority,
                    provenance: e.tier,
                    handle: Some(e.handle),
                }
            })
            .collect();
        ranked.sort_by(|a, b| b.priority.cmp(&a.priority));
        ranked
    }
}

fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}
