// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Navigation graph: URL to the set of URLs reached from it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Directed graph of observed transitions. Duplicate edges collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavigationGraph {
    adjacency: BTreeMap<String, BTreeSet<String>>,
}

impl NavigationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `from -> to`. Returns `false` if the edge already existed.
    pub fn add_edge(&mut self, from: &str, to: &str) -> bool {
        self.adjacency
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string())
    }

    pub fn contains_edge(&self, from: &str, to: &str) -> bool {
        self.adjacency
            .get(from)
            .is_some_and(|targets| targets.contains(to))
    }

    pub fn successors(&self, from: &str) -> impl Iterator<Item = &str> {
        self.adjacency
            .get(from)
            .into_iter()
            .flat_map(|targets| targets.iter().map(String::as_str))
    }

    /// All edges, ordered by source then target.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.adjacency
            .iter()
            .flat_map(|(from, targets)| targets.iter().map(move |to| (from.as_str(), to.as_str())))
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum()
    }

    /// Distinct URLs appearing on either end of an edge.
    pub fn node_count(&self) -> usize {
        let mut nodes: BTreeSet<&str> = BTreeSet::new();
        for (from, to) in self.edges() {
            nodes.insert(from);
            nodes.insert(to);
        }
        nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }
}
