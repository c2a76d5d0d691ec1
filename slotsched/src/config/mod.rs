/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scheduler configuration loading and validation.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working 100-slot, 10 ms configuration.
//!
//! The expected YAML structure is:
//! ```yaml
//! app_name: SLOTSCHED
//! frame:
//!   slots_per_major_frame: 100
//!   activities_per_slot: 5
//!   minor_frame_us: 10000
//! sync:
//!   noisy_tolerance_us: 500
//!   max_noisy_frames: 3
//!   attempts: 3
//!   confirm_ticks: 10
//! tables:
//!   message_max_entries: 128
//!   message_table_file: demos/msg_tbl.json
//!   schedule_table_file: demos/sch_tbl.json
//!   dump_dir: /tmp/slotsched
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::schtbl::TableGeometry;
use crate::sync::SyncConfig;
use crate::tick::TickTiming;

/// Largest Message Table: ids are 16-bit.
pub const MAX_MESSAGE_ENTRIES: usize = 1 << 16;

// ── Error type ────────────────────────────────────────────────────────────────

/// A configuration that parsed but cannot drive a scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("frame.slots_per_major_frame must be at least 1")]
    NoSlots,

    #[error("frame.activities_per_slot must be at least 1")]
    NoActivities,

    #[error("frame.minor_frame_us must be at least 1")]
    ZeroMinorFrame,

    #[error("sync.noisy_tolerance_us ({tolerance_us}) must be smaller than frame.minor_frame_us ({minor_frame_us})")]
    ToleranceTooWide {
        tolerance_us: u64,
        minor_frame_us: u64,
    },

    #[error("sync.confirm_ticks must be at least 1")]
    NoConfirmTicks,

    #[error("tables.message_max_entries must be in 1..={MAX_MESSAGE_ENTRIES}, got {0}")]
    MessageEntries(usize),
}

// ── Sections ──────────────────────────────────────────────────────────────────

/// Frame geometry and timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub slots_per_major_frame: u16,
    pub activities_per_slot: u16,
    /// Nominal slot duration in microseconds.
    pub minor_frame_us: u64,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            slots_per_major_frame: 100,
            activities_per_slot: 5,
            minor_frame_us: 10_000,
        }
    }
}

/// Frame-sync thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Deviation from `minor_frame_us` beyond which a tick is noisy.
    pub noisy_tolerance_us: u64,
    pub max_noisy_frames: u32,
    pub attempts: u32,
    pub confirm_ticks: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            noisy_tolerance_us: 500,
            max_noisy_frames: 3,
            attempts: 3,
            confirm_ticks: 10,
        }
    }
}

/// Table capacity and optional start-up files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TablesConfig {
    pub message_max_entries: usize,
    pub message_table_file: Option<PathBuf>,
    pub schedule_table_file: Option<PathBuf>,
    /// Where dumps are written; no dumps when absent.
    pub dump_dir: Option<PathBuf>,
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            message_max_entries: 128,
            message_table_file: None,
            schedule_table_file: None,
            dump_dir: None,
        }
    }
}

fn default_app_name() -> String {
    "SLOTSCHED".to_string()
}

// ── SchedulerConfig ───────────────────────────────────────────────────────────

/// Complete scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Stamped into table dumps.
    pub app_name: String,
    pub frame: FrameConfig,
    pub sync: SyncSettings,
    pub tables: TablesConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            frame: FrameConfig::default(),
            sync: SyncSettings::default(),
            tables: TablesConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Parse and validate `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, the YAML is structurally
    /// invalid, or [`validate`](Self::validate) rejects the values.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading scheduler configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let config = Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))?;

        info!(
            slots = config.frame.slots_per_major_frame,
            activities = config.frame.activities_per_slot,
            minor_frame_us = config.frame.minor_frame_us,
            message_entries = config.tables.message_max_entries,
            "Scheduler configuration loaded"
        );
        Ok(config)
    }

    /// Parse and validate a YAML document.  An empty document yields the
    /// defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?
        };
        config.validate()?;
        debug!(?config, "Configuration validated");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame.slots_per_major_frame == 0 {
            return Err(ConfigError::NoSlots);
        }
        if self.frame.activities_per_slot == 0 {
            return Err(ConfigError::NoActivities);
        }
        if self.frame.minor_frame_us == 0 {
            return Err(ConfigError::ZeroMinorFrame);
        }
        if self.sync.noisy_tolerance_us >= self.frame.minor_frame_us {
            return Err(ConfigError::ToleranceTooWide {
                tolerance_us: self.sync.noisy_tolerance_us,
                minor_frame_us: self.frame.minor_frame_us,
            });
        }
        if self.sync.confirm_ticks == 0 {
            return Err(ConfigError::NoConfirmTicks);
        }
        let entries = self.tables.message_max_entries;
        if entries == 0 || entries > MAX_MESSAGE_ENTRIES {
            return Err(ConfigError::MessageEntries(entries));
        }
        Ok(())
    }

    pub fn geometry(&self) -> TableGeometry {
        TableGeometry {
            slots_per_major_frame: self.frame.slots_per_major_frame,
            activities_per_slot: self.frame.activities_per_slot,
            msg_max_entries: self.tables.message_max_entries,
        }
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            max_noisy_frames: self.sync.max_noisy_frames,
            attempts: self.sync.attempts,
            confirm_ticks: self.sync.confirm_ticks,
        }
    }

    pub fn timing(&self) -> TickTiming {
        TickTiming {
            minor_frame_us: self.frame.minor_frame_us,
            noisy_tolerance_us: self.sync.noisy_tolerance_us,
        }
    }

    pub fn minor_frame(&self) -> Duration {
        Duration::from_micros(self.frame.minor_frame_us)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = SchedulerConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.app_name, "SLOTSCHED");
        assert_eq!(cfg.geometry().total_entries(), 500);
        assert_eq!(cfg.minor_frame(), Duration::from_millis(10));
    }

    #[test]
    fn load_full_yaml() {
        let yaml = r#"
app_name: TESTSCH
frame:
  slots_per_major_frame: 50
  activities_per_slot: 4
  minor_frame_us: 20000
sync:
  noisy_tolerance_us: 1000
  max_noisy_frames: 5
  attempts: 2
  confirm_ticks: 4
tables:
  message_max_entries: 256
  message_table_file: msg.json
  schedule_table_file: sch.json
  dump_dir: /tmp/dumps
"#;
        let f = yaml_tempfile(yaml);
        let cfg = SchedulerConfig::load_from_file(f.path()).unwrap();

        assert_eq!(cfg.app_name, "TESTSCH");
        assert_eq!(cfg.frame.slots_per_major_frame, 50);
        assert_eq!(cfg.timing().noisy_tolerance_us, 1000);
        assert_eq!(cfg.sync_config().attempts, 2);
        assert_eq!(cfg.geometry().msg_max_entries, 256);
        assert_eq!(cfg.tables.message_table_file, Some(PathBuf::from("msg.json")));
        assert_eq!(cfg.tables.dump_dir, Some(PathBuf::from("/tmp/dumps")));
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let cfg = SchedulerConfig::from_yaml_str("frame:\n  activities_per_slot: 2\n").unwrap();
        assert_eq!(cfg.frame.activities_per_slot, 2);
        assert_eq!(cfg.frame.slots_per_major_frame, 100);
        assert_eq!(cfg.sync, SyncSettings::default());
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(
            SchedulerConfig::from_yaml_str("  \n").unwrap(),
            SchedulerConfig::default()
        );
    }

    #[test]
    fn zero_geometry_is_rejected() {
        let mut cfg = SchedulerConfig::default();
        cfg.frame.slots_per_major_frame = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::NoSlots));

        let mut cfg = SchedulerConfig::default();
        cfg.frame.activities_per_slot = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::NoActivities));
    }

    #[test]
    fn tolerance_must_be_below_minor_frame() {
        let mut cfg = SchedulerConfig::default();
        cfg.sync.noisy_tolerance_us = cfg.frame.minor_frame_us;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ToleranceTooWide { .. })
        ));
    }

    #[test]
    fn zero_confirm_ticks_is_rejected() {
        let err = SchedulerConfig::from_yaml_str("sync:\n  confirm_ticks: 0\n").unwrap_err();
        assert!(format!("{err:#}").contains("confirm_ticks"));
    }

    #[test]
    fn message_entries_capped_at_sixteen_bits() {
        let mut cfg = SchedulerConfig::default();
        cfg.tables.message_max_entries = MAX_MESSAGE_ENTRIES;
        assert!(cfg.validate().is_ok());
        cfg.tables.message_max_entries = MAX_MESSAGE_ENTRIES + 1;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::MessageEntries(MAX_MESSAGE_ENTRIES + 1))
        );
    }

    #[test]
    fn missing_file_returns_error() {
        let result = SchedulerConfig::load_from_file(Path::new("/nonexistent/path/config.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        assert!(SchedulerConfig::load_from_file(f.path()).is_err());
    }
}
