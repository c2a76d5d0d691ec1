/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Bookkeeping and file plumbing shared by both scheduler tables.
//!
//! The generic table-file manager that decides *when* to load or dump lives
//! outside this crate.  It talks to each table through [`ManagedTable`], which
//! reduces every outcome to the pass/fail result that manager expects while
//! still logging the detailed [`TableError`] report.

pub mod error;

pub use error::TableError;

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, info};

// ── Load status ───────────────────────────────────────────────────────────────

/// Outcome of the most recent load attempt, as reported in housekeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    /// No load since start-up or since the last status reset.
    #[default]
    Undefined,
    Valid,
    Invalid,
}

/// How a table load treats rows the file does not mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadType {
    /// Start from an empty table; unmentioned rows become empty/disabled.
    #[default]
    Replace,
    /// Start from the live table; only mentioned rows change.
    Update,
}

/// Load-status counters kept per table.  Cleared by `reset_status()`; never
/// touches table contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TableStatus {
    /// Set once any load has been committed.
    pub loaded: bool,
    pub last_load_status: LoadStatus,
    /// Entries processed by the last committed load.
    pub last_load_count: usize,
    /// Rejected loads since start-up or the last status reset.
    pub load_errors: u32,
}

impl TableStatus {
    pub(crate) fn record_success(&mut self, count: usize) {
        self.loaded = true;
        self.last_load_status = LoadStatus::Valid;
        self.last_load_count = count;
    }

    /// A rejected load leaves `last_load_count` as it was.
    pub(crate) fn record_failure(&mut self) {
        self.last_load_status = LoadStatus::Invalid;
        self.load_errors = self.load_errors.wrapping_add(1);
    }

    pub(crate) fn reset(&mut self) {
        self.last_load_status = LoadStatus::Undefined;
        self.last_load_count = 0;
        self.load_errors = 0;
    }
}

// ── Table-manager seam ────────────────────────────────────────────────────────

/// Load/dump callbacks granted to the external table-file manager.
///
/// The manager guarantees the path exists and is well-formed at the file-system
/// level; parsing and validating the logical content is the table's job.
pub trait ManagedTable {
    /// Short table name used in log events (`"message"`, `"schedule"`).
    fn table_name(&self) -> &'static str;

    /// Parse `path` and commit it atomically.  Returns the number of entries
    /// processed.
    fn load_file(&mut self, path: &Path, load_type: LoadType) -> Result<usize>;

    /// Write a reloadable snapshot to `path`.  Returns the number of entries
    /// written.
    fn dump_file(&self, path: &Path) -> Result<usize>;

    /// Pass/fail form of [`load_file`](Self::load_file) for the table manager.
    fn load_callback(&mut self, path: &Path, load_type: LoadType) -> bool {
        match self.load_file(path, load_type) {
            Ok(count) => {
                info!(
                    table = self.table_name(),
                    path = %path.display(),
                    count,
                    "Table load committed"
                );
                true
            }
            Err(e) => {
                error!(table = self.table_name(), "Table load rejected: {:#}", e);
                false
            }
        }
    }

    /// Pass/fail form of [`dump_file`](Self::dump_file) for the table manager.
    fn dump_callback(&self, path: &Path) -> bool {
        match self.dump_file(path) {
            Ok(count) => {
                info!(
                    table = self.table_name(),
                    path = %path.display(),
                    count,
                    "Table dumped"
                );
                true
            }
            Err(e) => {
                error!(table = self.table_name(), "Table dump failed: {:#}", e);
                false
            }
        }
    }
}

// ── JSON file helpers ─────────────────────────────────────────────────────────

/// Read and deserialize a JSON table file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Cannot open table file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON table file: {}", path.display()))
}

/// Serialize `value` as pretty JSON, creating or truncating `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize table dump")?;
    fs::write(path, text + "\n")
        .with_context(|| format!("Cannot write dump file: {}", path.display()))
}

/// `description` text stamped into dump files.
pub(crate) fn dump_description() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("Table dumped at unix time {secs}")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
