// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Scoring configuration: selector tiers, tier bases, keyword and
//! destination rules.

use serde::{Deserialize, Serialize};

/// Bonus given to a keyword configured as a bare string.
pub const DEFAULT_KEYWORD_BONUS: u32 = 15;

/// Which selector family an element matched first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorTier {
    /// Explicit progression affordances and known in-domain link shapes.
    Primary,
    /// Generic styled buttons and internal links.
    Secondary,
    /// Any remaining enabled button or real link.
    Fallback,
}

impl SelectorTier {
    pub const ALL: [SelectorTier; 3] = [
        SelectorTier::Primary,
        SelectorTier::Secondary,
        SelectorTier::Fallback,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SelectorTier::Primary => "primary",
            SelectorTier::Secondary => "secondary",
            SelectorTier::Fallback => "fallback",
        }
    }
}

/// CSS selector families, one list per tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorTiers {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
    pub fallback: Vec<String>,
}

impl Default for SelectorTiers {
    fn default() -> Self {
        fn owned(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }
        Self {
            primary: owned(&[
                r#"a[href*="starter"]"#,
                r#"a[href*="red-pill"]"#,
                r#"a[href*="pilgrim"]"#,
                r#"a[href*="continue"]"#,
                r#"button[id*="continue"]"#,
                r#"[data-action*="continue"]"#,
                "#left-option",
                "#right-option",
            ]),
            secondary: owned(&[
                ".btn-hexa",
                ".btn-primary",
                "button[onclick]",
                r#"[role="button"]"#,
                ".video-option",
                "[data-video]",
                r#"a[href^="/"]"#,
            ]),
            fallback: owned(&[
                "button:not([disabled])",
                r##"a[href]:not([href="#"])"##,
                r#"input[type="submit"]"#,
            ]),
        }
    }
}

impl SelectorTiers {
    pub fn selectors(&self, tier: SelectorTier) -> &[String] {
        match tier {
            SelectorTier::Primary => &self.primary,
            SelectorTier::Secondary => &self.secondary,
            SelectorTier::Fallback => &self.fallback,
        }
    }

    /// Tiers with their selectors, highest tier first.
    pub fn iter(&self) -> impl Iterator<Item = (SelectorTier, &[String])> {
        SelectorTier::ALL.into_iter().map(move |t| (t, self.selectors(t)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, s)| s.is_empty())
    }
}

/// Base score per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierScores {
    pub primary: u32,
    pub secondary: u32,
    pub fallback: u32,
}

impl Default for TierScores {
    fn default() -> Self {
        Self {
            primary: 10,
            secondary: 5,
            fallback: 1,
        }
    }
}

impl TierScores {
    pub fn base(&self, tier: SelectorTier) -> u32 {
        match tier {
            SelectorTier::Primary => self.primary,
            SelectorTier::Secondary => self.secondary,
            SelectorTier::Fallback => self.fallback,
        }
    }

    /// Widest gap a tier alone can open between two candidates.
    pub fn spread(&self) -> u32 {
        let all = [self.primary, self.secondary, self.fallback];
        let max = all.iter().copied().max().unwrap_or(0);
        let min = all.iter().copied().min().unwrap_or(0);
        max - min
    }
}

/// A progression or decision word matched against visible text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "KeywordRuleRepr")]
pub struct KeywordRule {
    pub word: String,
    pub bonus: u32,
}

impl KeywordRule {
    pub fn new(word: &str, bonus: u32) -> Self {
        Self {
            word: word.to_string(),
            bonus,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeywordRuleRepr {
    Bare(String),
    Full {
        word: String,
        #[serde(default = "default_keyword_bonus")]
        bonus: u32,
    },
}

fn default_keyword_bonus() -> u32 {
    DEFAULT_KEYWORD_BONUS
}

impl From<KeywordRuleRepr> for KeywordRule {
    fn from(repr: KeywordRuleRepr) -> Self {
        match repr {
            KeywordRuleRepr::Bare(word) => KeywordRule {
                word,
                bonus: DEFAULT_KEYWORD_BONUS,
            },
            KeywordRuleRepr::Full { word, bonus } => KeywordRule { word, bonus },
        }
    }
}

pub fn default_keywords() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new("continuar", 20),
        KeywordRule::new("continue", 20),
        KeywordRule::new("next", 15),
        KeywordRule::new("siguiente", 15),
        KeywordRule::new("start", 15),
        KeywordRule::new("comenzar", 15),
        KeywordRule::new("pill", 10),
        KeywordRule::new("pilgrim", 10),
    ]
}

/// A "next step" URL shape matched against an element's href.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationRule {
    /// Case-insensitive substring of the href.
    pub fragment: String,
    /// Requested bonus. Raised to the scorer's floor if lower.
    #[serde(default)]
    pub bonus: u32,
}

impl DestinationRule {
    pub fn new(fragment: &str, bonus: u32) -> Self {
        Self {
            fragment: fragment.to_string(),
            bonus,
        }
    }
}

pub fn default_destinations() -> Vec<DestinationRule> {
    vec![
        DestinationRule::new("/starter", 25),
        DestinationRule::new("/continue", 25),
        DestinationRule::new("/next", 20),
        DestinationRule::new("red-pill", 20),
        DestinationRule::new("/pilgrim", 15),
    ]
}
