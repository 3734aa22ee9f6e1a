// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Provider patterns: decide whether a URL is a media resource and extract
//! its canonical id.
//!
//! Patterns are tried in order. The first pattern whose `url_pattern`
//! matches owns the URL: if its id rule then fails, the URL is reported as a
//! [`DiscoveryParseError`] rather than handed to a later pattern.

use crate::error::DiscoveryParseError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which provider a media resource belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Hosted-video provider A (Vimeo).
    Vimeo,
    /// Hosted-video provider B (YouTube).
    Youtube,
    /// A direct media file or streaming manifest.
    DirectMedia,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Vimeo => "vimeo",
            ProviderKind::Youtube => "youtube",
            ProviderKind::DirectMedia => "direct_media",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configurable provider rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderPattern {
    pub kind: ProviderKind,
    /// Regex deciding whether a URL belongs to this provider.
    pub url_pattern: String,
    /// Regex whose first capture group is the canonical id. `None` uses the
    /// file basename of the URL path.
    #[serde(default)]
    pub id_pattern: Option<String>,
}

/// The built-in provider rules.
pub fn default_provider_patterns() -> Vec<ProviderPattern> {
    vec![
        ProviderPattern {
            kind: ProviderKind::Vimeo,
            url_pattern: r"(?i)^https?://([a-z0-9-]+\.)*vimeo(cdn)?\.com/".to_string(),
            id_pattern: Some(
                r"(?i)vimeo\.com/(?:video/|channels/[^/]+/|groups/[^/]+/videos/)?(\d{4,})"
                    .to_string(),
            ),
        },
        ProviderPattern {
            kind: ProviderKind::Youtube,
            url_pattern: r"(?i)^https?://([a-z0-9-]+\.)*(youtube(-nocookie)?\.com|youtu\.be)/"
                .to_string(),
            id_pattern: Some(
                r"(?:/embed/|/watch\?(?:[^#]*&)?v=|youtu\.be/|/shorts/|/v/)([A-Za-z0-9_-]{6,})"
                    .to_string(),
            ),
        },
        ProviderPattern {
            kind: ProviderKind::DirectMedia,
            url_pattern: r"(?i)\.(mp4|webm|m3u8|mpd|mov|m4v|ogv)(?:[?#]|$)".to_string(),
            id_pattern: None,
        },
    ]
}

struct CompiledPattern {
    kind: ProviderKind,
    url_re: Regex,
    id_re: Option<Regex>,
}

/// Compiled provider rules, shared by both discovery channels.
pub struct ProviderMatcher {
    compiled: Vec<CompiledPattern>,
}

impl ProviderMatcher {
    /// Compile the given rules. Fails on the first invalid regex.
    pub fn new(patterns: &[ProviderPattern]) -> Result<Self, regex::Error> {
        let mut compiled = Vec::with_capacity(patterns.len());
        for p in patterns {
            compiled.push(CompiledPattern {
                kind: p.kind,
                url_re: Regex::new(&p.url_pattern)?,
                id_re: p.id_pattern.as_deref().map(Regex::new).transpose()?,
            });
        }
        Ok(Self { compiled })
    }

    /// Classify a URL.
    ///
    /// `Ok(None)` means no provider claims the URL. `Err` means a provider
    /// claimed it but the canonical id could not be extracted.
    pub fn classify(&self, url: &str) -> Result<Option<(ProviderKind, String)>, DiscoveryParseError> {
        let Some(pattern) = self.compiled.iter().find(|p| p.url_re.is_match(url)) else {
            return Ok(None);
        };

        let id = match &pattern.id_re {
            Some(re) => re
                .captures(url)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string()),
            None => file_basename(url),
        };

        match id {
            Some(id) if !id.is_empty() => Ok(Some((pattern.kind, id))),
            _ => Err(DiscoveryParseError {
                url: url.to_string(),
                provider: pattern.kind.to_string(),
                reason: if pattern.id_re.is_some() {
                    "id pattern did not match".to_string()
                } else {
                    "no file name in path".to_string()
                },
            }),
        }
    }
}

/// Last path segment of a URL, without query or fragment.
fn file_basename(raw: &str) -> Option<String> {
    let path = match url::Url::parse(raw) {
        Ok(u) => u.path().to_string(),
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    path.rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(String::from)
}
