// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Passive discovery channel fed by network responses.

use super::patterns::{ProviderKind, ProviderMatcher};
use super::registry::{DiscoveryChannel, MediaResource, ResourceRegistry};
use crate::renderer::{NetworkResponse, ResponseCallback};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Streaming and media MIME types that mark a response as media even when
/// its URL has no recognizable extension.
const MEDIA_MIME_PREFIXES: &[&str] = &[
    "video/",
    "application/vnd.apple.mpegurl",
    "application/x-mpegurl",
    "application/dash+xml",
];

/// Where the crawl currently is, for attributing callback-time sightings.
#[derive(Default)]
struct Position {
    step: usize,
    page_url: String,
}

/// Network response observer.
///
/// Registered once per session. The driver may call [`observe`](Self::observe)
/// from its event task at any time, including mid-step.
pub struct NetworkChannel {
    matcher: Arc<ProviderMatcher>,
    registry: ResourceRegistry,
    position: Mutex<Position>,
    fresh: Mutex<Vec<String>>,
    parse_errors: AtomicUsize,
    detached: AtomicBool,
}

impl NetworkChannel {
    pub fn new(matcher: Arc<ProviderMatcher>, registry: ResourceRegistry) -> Arc<Self> {
        Arc::new(Self {
            matcher,
            registry,
            position: Mutex::new(Position::default()),
            fresh: Mutex::new(Vec::new()),
            parse_errors: AtomicUsize::new(0),
            detached: AtomicBool::new(false),
        })
    }

    /// Attribute subsequent sightings to this step and page.
    pub fn set_position(&self, step: usize, page_url: &str) {
        let mut pos = self.position.lock().unwrap_or_else(PoisonError::into_inner);
        pos.step = step;
        pos.page_url = page_url.to_string();
    }

    /// Stop accepting responses. The driver may keep calling the callback
    /// until its context closes; those calls become no-ops.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }

    /// Inspect one response. Returns the canonical id if it was new.
    pub fn observe(&self, response: &NetworkResponse) -> Option<String> {
        if self.detached.load(Ordering::Acquire) || response.status >= 400 {
            return None;
        }

        let (provider, canonical_id) = match self.matcher.classify(&response.url) {
            Ok(Some(hit)) => hit,
            Ok(None) => {
                let is_media_mime = response.mime_type.as_deref().is_some_and(|m| {
                    let m = m.to_ascii_lowercase();
                    MEDIA_MIME_PREFIXES.iter().any(|p| m.starts_with(p))
                });
                let basename = url::Url::parse(&response.url)
                    .ok()
                    .and_then(|u| u.path_segments()?.next_back().map(String::from))
                    .filter(|s| !s.is_empty());
                match (is_media_mime, basename) {
                    (true, Some(name)) => (ProviderKind::DirectMedia, name),
                    _ => return None,
                }
            }
            Err(e) => {
                self.parse_errors.fetch_add(1, Ordering::Relaxed);
                warn!("network discovery dropped a match: {e}");
                return None;
            }
        };

        let (step, page_url) = {
            let pos = self.position.lock().unwrap_or_else(PoisonError::into_inner);
            (pos.step, pos.page_url.clone())
        };

        let stored = self.registry.add(MediaResource {
            canonical_id: canonical_id.clone(),
            provider,
            first_seen_step: step,
            first_seen_url: page_url,
            channel: DiscoveryChannel::Network,
            source_url: response.url.clone(),
            discovered_at: Utc::now(),
        });

        if !stored {
            return None;
        }
        debug!("network channel discovered {provider} resource {canonical_id}");
        self.fresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(canonical_id.clone());
        Some(canonical_id)
    }

    /// Take the ids this channel registered since the last drain.
    pub fn drain_fresh(&self) -> Vec<String> {
        std::mem::take(&mut *self.fresh.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of matches dropped because no id could be extracted.
    pub fn parse_errors(&self) -> usize {
        self.parse_errors.load(Ordering::Relaxed)
    }

    /// A driver callback forwarding into this channel.
    pub fn callback(self: &Arc<Self>) -> ResponseCallback {
        let channel = Arc::clone(self);
        Arc::new(move |response: NetworkResponse| {
            channel.observe(&response);
        })
    }
}
