// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

//! JSONL journal: append-only log of journey events.
//!
//! Features:
//! - Append-only JSONL format, one event per line
//! - Automatic rotation when the file exceeds the size limit
//! - Rotated files named `.1`, `.2`, etc. (max 5 rotations)

use crate::events::JourneyEvent;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default journal size before rotation (100 MB).
pub const MAX_LOG_SIZE: u64 = 100 * 1024 * 1024;

/// Maximum number of rotated journal files to keep.
const MAX_ROTATIONS: u32 = 5;

/// One journal line.
#[derive(Debug, Clone, Serialize)]
pub struct JournalEntry<'a> {
    pub logged_at: String,
    #[serde(flatten)]
    pub event: &'a JourneyEvent,
}

/// Append-only JSONL journal with automatic rotation.
pub struct JournalLogger {
    file: File,
    path: PathBuf,
    max_size: u64,
    /// Approximate current size (re-checked on open).
    current_size: u64,
}

impl JournalLogger {
    /// Open or create the journal file.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_limit(path, MAX_LOG_SIZE)
    }

    /// Open with a custom rotation threshold in bytes.
    pub fn open_with_limit(path: &Path, max_size: u64) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open journal: {}", path.display()))?;

        let current_size = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            file,
            path: path.to_path_buf(),
            max_size,
            current_size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event.
    pub fn log(&mut self, event: &JourneyEvent) -> Result<()> {
        if self.current_size >= self.max_size {
            self.rotate()?;
        }

        let json = serde_json::to_string(&JournalEntry {
            logged_at: Utc::now().to_rfc3339(),
            event,
        })?;
        writeln!(self.file, "{json}")?;
        self.current_size += json.len() as u64 + 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }

    /// Rotate journal files: journal.jsonl → journal.jsonl.1, .1 → .2, etc.
    fn rotate(&mut self) -> Result<()> {
        self.file.flush()?;

        let oldest = rotation_path(&self.path, MAX_ROTATIONS);
        if oldest.exists() {
            let _ = std::fs::remove_file(&oldest);
        }

        for i in (1..MAX_ROTATIONS).rev() {
            let from = rotation_path(&self.path, i);
            let to = rotation_path(&self.path, i + 1);
            if from.exists() {
                let _ = std::fs::rename(&from, &to);
            }
        }

        let _ = std::fs::rename(&self.path, rotation_path(&self.path, 1));

        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| "failed to reopen journal after rotation")?;
        self.current_size = 0;

        Ok(())
    }
}

/// Build path for a rotated file: `journal.jsonl.1`, `journal.jsonl.2`, etc.
pub fn rotation_path(base: &Path, index: u32) -> PathBuf {
    let name = format!(
        "{}.{index}",
        base.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("journal.jsonl")
    );
    base.with_file_name(name)
}
