// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Resource discovery engine.
//!
//! Two channels feed one [`ResourceRegistry`]: the passive network channel
//! (registered once per session, fires asynchronously) and the active DOM
//! channel (one scan per step). Both classify URLs with the same
//! [`ProviderMatcher`].

pub mod dom;
pub mod network;
pub mod patterns;
pub mod registry;

pub use patterns::{default_provider_patterns, ProviderKind, ProviderMatcher, ProviderPattern};
pub use registry::{DiscoveryChannel, MediaResource, ResourceRegistry};

use crate::error::DriverError;
use crate::renderer::{with_timeout, RenderContext};
use chrono::Utc;
use dom::{parse_scan_result, DomMediaHit, MEDIA_SCAN_SCRIPT};
use network::NetworkChannel;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Session-scoped discovery engine.
pub struct DiscoveryEngine {
    matcher: Arc<ProviderMatcher>,
    registry: ResourceRegistry,
    network: Arc<NetworkChannel>,
    dom_parse_errors: AtomicUsize,
}

impl DiscoveryEngine {
    /// Build an engine with a fresh registry.
    pub fn new(patterns: &[ProviderPattern]) -> Result<Self, regex::Error> {
        let matcher = Arc::new(ProviderMatcher::new(patterns)?);
        let registry = ResourceRegistry::new();
        let network = NetworkChannel::new(Arc::clone(&matcher), registry.clone());
        Ok(Self {
            matcher,
            registry,
            network,
            dom_parse_errors: AtomicUsize::new(0),
        })
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Register the passive channel with the page. Call once per session.
    pub async fn attach(&self, ctx: &mut dyn RenderContext) -> Result<(), DriverError> {
        ctx.on_network_response(self.network.callback()).await
    }

    /// Stop the passive channel. Called when the session finishes so the
    /// registry of a finished session no longer changes.
    pub fn detach(&self) {
        self.network.detach();
    }

    /// Attribute everything seen from now on to `step` at `page_url`.
    pub fn begin_step(&self, step: usize, page_url: &str) {
        self.network.set_position(step, page_url);
    }

    /// Run the DOM scan and register its hits. Returns the newly stored ids.
    pub async fn scan_dom(
        &self,
        ctx: &dyn RenderContext,
        step: usize,
        page_url: &str,
        timeout_ms: u64,
    ) -> Result<Vec<String>, DriverError> {
        let value = with_timeout("media scan", timeout_ms, ctx.execute_js(MEDIA_SCAN_SCRIPT)).await?;
        Ok(self.register_dom_hits(&parse_scan_result(value), step, page_url))
    }

    /// Classify DOM hits and submit them to the registry.
    pub fn register_dom_hits(&self, hits: &[DomMediaHit], step: usize, page_url: &str) -> Vec<String> {
        let mut fresh = Vec::new();
        for hit in hits {
            let (provider, canonical_id) = match self.matcher.classify(&hit.src) {
                Ok(Some(found)) => found,
                Ok(None) => continue,
                Err(e) => {
                    self.dom_parse_errors.fetch_add(1, Ordering::Relaxed);
                    warn!("dom discovery dropped <{}>: {e}", hit.tag);
                    continue;
                }
            };
            let stored = self.registry.add(MediaResource {
                canonical_id: canonical_id.clone(),
                provider,
                first_seen_step: step,
                first_seen_url: page_url.to_string(),
                channel: DiscoveryChannel::Dom,
                source_url: hit.src.clone(),
                discovered_at: Utc::now(),
            });
            if stored {
                debug!("dom channel discovered {provider} resource {canonical_id}");
                fresh.push(canonical_id);
            }
        }
        fresh
    }

    /// Ids the network channel stored since the last call.
    pub fn drain_network(&self) -> Vec<String> {
        self.network.drain_fresh()
    }

    /// Total matches dropped for lack of an extractable id, across channels.
    pub fn parse_errors(&self) -> usize {
        self.dom_parse_errors.load(Ordering::Relaxed) + self.network.parse_errors()
    }
}
