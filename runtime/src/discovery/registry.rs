// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Deduplicating store of discovered media resources.
//!
//! The registry is shared between the navigation loop and the network
//! callback, which fires on the driver's event task at arbitrary points.
//! Insertion is keyed by canonical id through the map's entry API, so the
//! first observation wins no matter which channel delivers it.

use super::patterns::ProviderKind;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// How a resource was first observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryChannel {
    /// Found by scanning the rendered DOM.
    Dom,
    /// Found by intercepting a completed network response.
    Network,
}

impl DiscoveryChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            DiscoveryChannel::Dom => "dom",
            DiscoveryChannel::Network => "network",
        }
    }
}

/// A deduplicated media asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaResource {
    /// Provider-normalized id; the deduplication key.
    pub canonical_id: String,
    pub provider: ProviderKind,
    /// Step index during which the resource was first seen.
    pub first_seen_step: usize,
    /// Page URL at the time of first sighting.
    pub first_seen_url: String,
    pub channel: DiscoveryChannel,
    /// The raw URL the id was extracted from.
    pub source_url: String,
    pub discovered_at: DateTime<Utc>,
}

struct Slot {
    seq: u64,
    resource: MediaResource,
}

#[derive(Default)]
struct RegistryInner {
    entries: DashMap<String, Slot>,
    next_seq: AtomicU64,
}

/// Session-scoped resource registry. Cloning shares the same store.
#[derive(Clone, Default)]
pub struct ResourceRegistry {
    inner: Arc<RegistryInner>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a resource unless its canonical id is already known.
    ///
    /// Returns `true` if the resource was stored, `false` if it was a
    /// duplicate (in which case nothing changes).
    pub fn add(&self, resource: MediaResource) -> bool {
        match self.inner.entries.entry(resource.canonical_id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
                slot.insert(Slot { seq, resource });
                true
            }
        }
    }

    pub fn contains(&self, canonical_id: &str) -> bool {
        self.inner.entries.contains_key(canonical_id)
    }

    pub fn get(&self, canonical_id: &str) -> Option<MediaResource> {
        self.inner
            .entries
            .get(canonical_id)
            .map(|slot| slot.resource.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// All resources in first-seen order.
    pub fn snapshot(&self) -> Vec<MediaResource> {
        let mut slots: Vec<(u64, MediaResource)> = self
            .inner
            .entries
            .iter()
            .map(|e| (e.seq, e.resource.clone()))
            .collect();
        slots.sort_by_key(|(seq, _)| *seq);
        slots.into_iter().map(|(_, r)| r).collect()
    }

    /// Resource counts per provider.
    pub fn count_by_provider(&self) -> BTreeMap<ProviderKind, usize> {
        let mut counts = BTreeMap::new();
        for entry in self.inner.entries.iter() {
            *counts.entry(entry.resource.provider).or_insert(0) += 1;
        }
        counts
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("len", &self.len())
            .finish()
    }
}
