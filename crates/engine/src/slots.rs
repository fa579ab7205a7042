// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blue/green slot resolution and symlink cutover.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One of the two interchangeable deployment directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Green,
    Blue,
    Unknown,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Green => "green",
            Slot::Blue => "blue",
            Slot::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from the cutover operation.
#[derive(Debug, Error)]
pub enum SlotError {
    #[error("build directory missing: {0}")]
    MissingSource(PathBuf),
    #[error("{action} failed for {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_err<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(std::io::Error) -> SlotError + 'a {
    move |source| SlotError::Io {
        action,
        path: path.to_path_buf(),
        source,
    }
}

/// Outcome of one cutover, recorded in stage metadata.
#[derive(Debug, Clone, Serialize)]
pub struct CutoverRecord {
    pub source: String,
    pub previous_target: String,
    pub next_target: String,
    pub live_symlink: String,
    pub copied: bool,
    pub switched: bool,
    pub dry_run: bool,
}

/// The blue/green directory pair and the live symlink in front of them.
#[derive(Debug, Clone)]
pub struct Slots {
    green_path: PathBuf,
    blue_path: PathBuf,
    live_symlink: PathBuf,
}

impl Slots {
    pub fn new(
        green_path: impl Into<PathBuf>,
        blue_path: impl Into<PathBuf>,
        live_symlink: impl Into<PathBuf>,
    ) -> Self {
        Self {
            green_path: green_path.into(),
            blue_path: blue_path.into(),
            live_symlink: live_symlink.into(),
        }
    }

    pub fn live_symlink(&self) -> &Path {
        &self.live_symlink
    }

    /// Directory backing a slot; `Unknown` has none.
    pub fn slot_path(&self, slot: Slot) -> Option<&Path> {
        match slot {
            Slot::Green => Some(&self.green_path),
            Slot::Blue => Some(&self.blue_path),
            Slot::Unknown => None,
        }
    }

    /// Resolve the currently live slot by reading the symlink.
    /// A missing or foreign target resolves to `Unknown`.
    pub fn read_active(&self) -> Slot {
        match std::fs::read_link(&self.live_symlink) {
            Ok(target) if target == self.green_path => Slot::Green,
            Ok(target) if target == self.blue_path => Slot::Blue,
            _ => Slot::Unknown,
        }
    }

    /// Slot the next cutover will populate: the standby of the active
    /// slot, or green when no slot is live yet.
    pub fn next_target(&self) -> Slot {
        match self.read_active() {
            Slot::Green => Slot::Blue,
            Slot::Blue | Slot::Unknown => Slot::Green,
        }
    }

    /// When the live symlink was last swapped, from its own metadata.
    pub fn last_cutover_at(&self) -> Option<DateTime<Utc>> {
        let meta = std::fs::symlink_metadata(&self.live_symlink).ok()?;
        let modified = meta.modified().ok()?;
        Some(DateTime::<Utc>::from(modified))
    }

    /// Copy `source` into the standby slot and swap the live symlink.
    ///
    /// The swap is unlink-then-create; the final state always has the
    /// symlink pointing at one of the two slot directories. In dry-run
    /// mode only the plan is recorded.
    pub fn cutover(&self, source: &Path, dry_run: bool) -> Result<CutoverRecord, SlotError> {
        let previous = self.read_active();
        let next = self.next_target();
        let previous_target = match previous {
            Slot::Unknown => "unknown (none)".to_string(),
            slot => slot.to_string(),
        };
        let mut record = CutoverRecord {
            source: source.display().to_string(),
            previous_target,
            next_target: next.to_string(),
            live_symlink: self.live_symlink.display().to_string(),
            copied: false,
            switched: false,
            dry_run,
        };
        if dry_run {
            return Ok(record);
        }

        if !source.is_dir() {
            return Err(SlotError::MissingSource(source.to_path_buf()));
        }
        let next_path = match self.slot_path(next) {
            Some(path) => path.to_path_buf(),
            // next_target never returns Unknown.
            None => return Err(SlotError::MissingSource(source.to_path_buf())),
        };

        if let Some(parent) = next_path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err("create parent", parent))?;
        }
        if next_path.exists() {
            std::fs::remove_dir_all(&next_path).map_err(io_err("clear slot", &next_path))?;
        }
        copy_tree(source, &next_path)?;
        record.copied = true;

        // Remove the old link even when dangling (symlink_metadata sees it
        // where exists() would not).
        if std::fs::symlink_metadata(&self.live_symlink).is_ok() {
            std::fs::remove_file(&self.live_symlink)
                .map_err(io_err("unlink", &self.live_symlink))?;
        }
        std::os::unix::fs::symlink(&next_path, &self.live_symlink)
            .map_err(io_err("symlink", &self.live_symlink))?;
        record.switched = true;

        tracing::info!(
            previous = %record.previous_target,
            next = %record.next_target,
            "cutover switched live symlink"
        );
        Ok(record)
    }
}

fn copy_tree(from: &Path, to: &Path) -> Result<(), SlotError> {
    std::fs::create_dir_all(to).map_err(io_err("create dir", to))?;
    for entry in std::fs::read_dir(from).map_err(io_err("read dir", from))? {
        let entry = entry.map_err(io_err("read dir", from))?;
        let target = to.join(entry.file_name());
        let file_type = entry.file_type().map_err(io_err("stat", from))?;
        if file_type.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(io_err("copy", &target))?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "slots_tests.rs"]
mod tests;
