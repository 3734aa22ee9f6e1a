// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! Destinations for arrival snapshots (HTML and screenshots).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Html,
    Screenshot,
}

impl ArtifactKind {
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Html => "html",
            ArtifactKind::Screenshot => "png",
        }
    }
}

/// Receives the artifacts captured on every arrival.
///
/// Returns an opaque reference to the stored artifact, or `None` if the
/// sink keeps nothing.
pub trait SnapshotSink: Send + Sync {
    fn store(&self, step: usize, kind: ArtifactKind, bytes: &[u8]) -> io::Result<Option<String>>;
}

/// Drops every artifact.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl SnapshotSink for DiscardSink {
    fn store(&self, _step: usize, _kind: ArtifactKind, _bytes: &[u8]) -> io::Result<Option<String>> {
        Ok(None)
    }
}

/// Writes `step_NN_arrival.{html,png}` files into one directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    /// Create the directory if needed.
    pub fn create(root: &Path) -> io::Result<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_path(&self, step: usize, kind: ArtifactKind) -> PathBuf {
        self.root
            .join(format!("step_{step:02}_arrival.{}", kind.extension()))
    }
}

impl SnapshotSink for DirectorySink {
    fn store(&self, step: usize, kind: ArtifactKind, bytes: &[u8]) -> io::Result<Option<String>> {
        let path = self.artifact_path(step, kind);
        fs::write(&path, bytes)?;
        Ok(Some(path.display().to_string()))
    }
}
