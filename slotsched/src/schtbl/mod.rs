/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Schedule Table: *when* the scheduler sends.
//!
//! `slots_per_major_frame × activities_per_slot` entries, grouped by slot:
//!
//! ```text
//! index = slot × activities_per_slot + activity
//!
//! slot 0: [a0][a1][a2][a3][a4]   slot 1: [a0][a1] …   slot N-1: … [a4]
//! ```
//!
//! Each entry fires its Message Table row on the passes where
//! `pass % period == offset`.  `period == 0` never fires.
//!
//! The expected JSON file layout is:
//! ```json
//! {
//!   "app-name": "SLOTSCHED",
//!   "tbl-name": "Schedule",
//!   "activity-array": [
//!     { "name": "HK_REQ", "slot": 0, "activity": 0, "enabled": true,
//!       "period": 4, "offset": 2, "msg-index": 5 }
//!   ]
//! }
//! ```
//!
//! The first element without a `slot` or `activity` ends the list.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::table::{self, LoadType, ManagedTable, TableError, TableStatus};

// ── Error types ───────────────────────────────────────────────────────────────

/// Violations of the shared entry validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    /// `period` or `offset` does not fit the 8-bit table field.
    #[error("{field} {value} exceeds the maximum of {}", u8::MAX)]
    FieldTooLarge { field: &'static str, value: u16 },

    #[error("offset {offset} must be less than period {period}")]
    OffsetNotBelowPeriod { offset: u16, period: u16 },

    #[error("message index {index} is out of range (valid 0..{max_entries})")]
    MsgIndexOutOfRange { index: u16, max_entries: usize },
}

/// A `(slot, activity)` address outside the table geometry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("slot {slot} is out of range (valid 0..{slots})")]
    SlotOutOfRange { slot: u16, slots: u16 },

    #[error("activity {activity} is out of range (valid 0..{activities})")]
    ActivityOutOfRange { activity: u16, activities: u16 },
}

/// Single-entry command failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchTblError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Entry(#[from] EntryError),
}

// ── Geometry ──────────────────────────────────────────────────────────────────

/// Shape of the Schedule Table and the range of Message Table indices its
/// entries may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableGeometry {
    pub slots_per_major_frame: u16,
    pub activities_per_slot: u16,
    pub msg_max_entries: usize,
}

impl TableGeometry {
    pub fn total_entries(&self) -> usize {
        usize::from(self.slots_per_major_frame) * usize::from(self.activities_per_slot)
    }
}

// ── ScheduleEntry ─────────────────────────────────────────────────────────────

/// One activity: a periodic dispatch rule naming a Message Table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ScheduleEntry {
    pub enabled: bool,
    /// Pass-count divisor; `0` means "never fire".
    pub period: u8,
    /// Phase within the period, `offset < period`.
    pub offset: u8,
    pub msg_tbl_index: u16,
}

impl ScheduleEntry {
    /// `true` when this entry fires on major-frame pass `pass`.
    pub fn is_due(&self, pass: u32) -> bool {
        self.enabled && self.period > 0 && pass % u32::from(self.period) == u32::from(self.offset)
    }
}

/// The single validation rule shared by table loads and entry commands.
///
/// Fields arrive wider than the packed entry (file and command layouts differ
/// from the table's), so range checks happen here before packing.
pub fn validate_entry(
    enabled: bool,
    period: u16,
    offset: u16,
    msg_tbl_index: u16,
    msg_max_entries: usize,
) -> Result<ScheduleEntry, EntryError> {
    let packed_period = u8::try_from(period).map_err(|_| EntryError::FieldTooLarge {
        field: "period",
        value: period,
    })?;
    let packed_offset = u8::try_from(offset).map_err(|_| EntryError::FieldTooLarge {
        field: "offset",
        value: offset,
    })?;

    if period > 0 && offset >= period {
        return Err(EntryError::OffsetNotBelowPeriod { offset, period });
    }
    if usize::from(msg_tbl_index) >= msg_max_entries {
        return Err(EntryError::MsgIndexOutOfRange {
            index: msg_tbl_index,
            max_entries: msg_max_entries,
        });
    }

    Ok(ScheduleEntry {
        enabled,
        period: packed_period,
        offset: packed_offset,
        msg_tbl_index,
    })
}

// ── File format ───────────────────────────────────────────────────────────────

/// Schedule table file as read from / written to JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScheduleTableFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tbl_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub activity_array: Vec<ScheduleFileEntry>,
}

/// One element of `activity-array`, keyed by `(slot, activity)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScheduleFileEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_index: Option<u16>,
}

// ── ScheduleTable ─────────────────────────────────────────────────────────────

/// Fixed-geometry store of activity entries.
#[derive(Debug, Clone)]
pub struct ScheduleTable {
    app_name: String,
    geometry: TableGeometry,
    entries: Vec<ScheduleEntry>,
    status: TableStatus,
}

impl ScheduleTable {
    /// Create a table with every entry disabled.
    pub fn new(app_name: impl Into<String>, geometry: TableGeometry) -> Self {
        Self {
            app_name: app_name.into(),
            geometry,
            entries: vec![ScheduleEntry::default(); geometry.total_entries()],
            status: TableStatus::default(),
        }
    }

    pub fn geometry(&self) -> TableGeometry {
        self.geometry
    }

    pub fn status(&self) -> &TableStatus {
        &self.status
    }

    /// Clear load-status counters.  Entries are untouched.
    pub fn reset_status(&mut self) {
        self.status.reset();
    }

    /// Flattened index of `(slot, activity)`, bounds-checked.
    pub fn entry_index(&self, slot: u16, activity: u16) -> Result<usize, IndexError> {
        if slot >= self.geometry.slots_per_major_frame {
            return Err(IndexError::SlotOutOfRange {
                slot,
                slots: self.geometry.slots_per_major_frame,
            });
        }
        if activity >= self.geometry.activities_per_slot {
            return Err(IndexError::ActivityOutOfRange {
                activity,
                activities: self.geometry.activities_per_slot,
            });
        }
        Ok(usize::from(slot) * usize::from(self.geometry.activities_per_slot)
            + usize::from(activity))
    }

    pub fn entry(&self, slot: u16, activity: u16) -> Result<ScheduleEntry, IndexError> {
        let index = self.entry_index(slot, activity)?;
        Ok(self.entries[index])
    }

    /// The `activities_per_slot` entries of `slot`, in activity order.  Empty
    /// for an out-of-range slot.
    pub fn slot_entries(&self, slot: u16) -> &[ScheduleEntry] {
        let width = usize::from(self.geometry.activities_per_slot);
        let start = usize::from(slot) * width;
        self.entries.get(start..start + width).unwrap_or(&[])
    }

    /// [`validate_entry`] against this table's Message Table range.
    pub fn validate_entry(
        &self,
        enabled: bool,
        period: u16,
        offset: u16,
        msg_tbl_index: u16,
    ) -> Result<ScheduleEntry, EntryError> {
        validate_entry(
            enabled,
            period,
            offset,
            msg_tbl_index,
            self.geometry.msg_max_entries,
        )
    }

    /// Replace every field of one entry in place (single-entry load command).
    pub fn load_entry(
        &mut self,
        slot: u16,
        activity: u16,
        enabled: bool,
        period: u16,
        offset: u16,
        msg_tbl_index: u16,
    ) -> Result<ScheduleEntry, SchTblError> {
        let index = self.entry_index(slot, activity)?;
        let entry = self.validate_entry(enabled, period, offset, msg_tbl_index)?;
        self.entries[index] = entry;
        debug!(slot, activity, ?entry, "Schedule entry loaded");
        Ok(entry)
    }

    /// Enable or disable one entry in place (configure command).  The
    /// resulting entry is re-validated with the shared rule.
    pub fn configure_entry(
        &mut self,
        slot: u16,
        activity: u16,
        enabled: bool,
    ) -> Result<ScheduleEntry, SchTblError> {
        let index = self.entry_index(slot, activity)?;
        let current = self.entries[index];
        let entry = self.validate_entry(
            enabled,
            u16::from(current.period),
            u16::from(current.offset),
            current.msg_tbl_index,
        )?;
        self.entries[index] = entry;
        debug!(slot, activity, enabled, "Schedule entry configured");
        Ok(entry)
    }

    /// Validate `file` in a scratch copy and commit it only if every entry is
    /// valid.  Returns the number of entries processed.
    ///
    /// Message indices are range-checked only; whether they name a populated
    /// Message Table row is a dispatch-time concern.
    pub fn load(&mut self, file: &ScheduleTableFile, load_type: LoadType) -> Result<usize, TableError> {
        match self.build_scratch(file, load_type) {
            Ok((scratch, count)) => {
                self.entries = scratch;
                self.status.record_success(count);
                info!(count, ?load_type, "Schedule Table load updated {count} entries");
                Ok(count)
            }
            Err(e) => {
                self.status.record_failure();
                warn!(error = %e, "Schedule Table load rejected");
                Err(e)
            }
        }
    }

    fn build_scratch(
        &self,
        file: &ScheduleTableFile,
        load_type: LoadType,
    ) -> Result<(Vec<ScheduleEntry>, usize), TableError> {
        let mut scratch = match load_type {
            LoadType::Replace => vec![ScheduleEntry::default(); self.entries.len()],
            LoadType::Update => self.entries.clone(),
        };
        let mut count = 0usize;

        for (position, raw) in file.activity_array.iter().enumerate() {
            let (Some(slot), Some(activity)) = (raw.slot, raw.activity) else {
                debug!(position, "activity-array ends at entry without slot/activity");
                break;
            };

            let index = self
                .entry_index(slot, activity)
                .map_err(|source| TableError::Address { position, source })?;

            let missing = |field| TableError::MissingField { position, field };
            let enabled = raw.enabled.ok_or_else(|| missing("enabled"))?;
            let period = raw.period.ok_or_else(|| missing("period"))?;
            let offset = raw.offset.ok_or_else(|| missing("offset"))?;
            let msg_index = raw.msg_index.ok_or_else(|| missing("msg-index"))?;

            let entry = self
                .validate_entry(enabled, period, offset, msg_index)
                .map_err(|source| TableError::Entry {
                    position,
                    slot,
                    activity,
                    source,
                })?;

            scratch[index] = entry;
            count += 1;
        }

        if count == 0 {
            return Err(TableError::Empty);
        }
        Ok((scratch, count))
    }

    /// Snapshot every entry, disabled ones included, in slot/activity order.
    pub fn dump(&self) -> ScheduleTableFile {
        let width = self.geometry.activities_per_slot;
        let activity_array = (0..self.geometry.slots_per_major_frame)
            .flat_map(|slot| (0..width).map(move |activity| (slot, activity)))
            .zip(self.entries.iter())
            .map(|((slot, activity), entry)| ScheduleFileEntry {
                name: None,
                descr: None,
                slot: Some(slot),
                activity: Some(activity),
                enabled: Some(entry.enabled),
                period: Some(u16::from(entry.period)),
                offset: Some(u16::from(entry.offset)),
                msg_index: Some(entry.msg_tbl_index),
            })
            .collect();

        ScheduleTableFile {
            app_name: Some(self.app_name.clone()),
            tbl_name: Some("Schedule".to_string()),
            description: Some(table::dump_description()),
            activity_array,
        }
    }
}

impl ManagedTable for ScheduleTable {
    fn table_name(&self) -> &'static str {
        "schedule"
    }

    fn load_file(&mut self, path: &Path, load_type: LoadType) -> Result<usize> {
        let file: ScheduleTableFile = match table::read_json(path) {
            Ok(file) => file,
            Err(e) => {
                self.status.record_failure();
                return Err(e);
            }
        };
        let count = self
            .load(&file, load_type)
            .with_context(|| format!("Invalid schedule table file: {}", path.display()))?;
        Ok(count)
    }

    fn dump_file(&self, path: &Path) -> Result<usize> {
        let file = self.dump();
        table::write_json(path, &file)?;
        Ok(file.activity_array.len())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::LoadStatus;
    use tempfile::NamedTempFile;

    const GEOMETRY: TableGeometry = TableGeometry {
        slots_per_major_frame: 4,
        activities_per_slot: 3,
        msg_max_entries: 8,
    };

    fn raw(slot: u16, activity: u16, period: u16, offset: u16, msg: u16) -> ScheduleFileEntry {
        ScheduleFileEntry {
            slot: Some(slot),
            activity: Some(activity),
            enabled: Some(true),
            period: Some(period),
            offset: Some(offset),
            msg_index: Some(msg),
            ..Default::default()
        }
    }

    fn file(entries: Vec<ScheduleFileEntry>) -> ScheduleTableFile {
        ScheduleTableFile {
            activity_array: entries,
            ..Default::default()
        }
    }

    // ── validate_entry ────────────────────────────────────────────────────────

    #[test]
    fn validate_accepts_offset_below_period() {
        let e = validate_entry(true, 4, 3, 7, 8).unwrap();
        assert_eq!(
            e,
            ScheduleEntry {
                enabled: true,
                period: 4,
                offset: 3,
                msg_tbl_index: 7
            }
        );
    }

    #[test]
    fn validate_rejects_offset_equal_to_period() {
        assert_eq!(
            validate_entry(true, 4, 4, 0, 8).unwrap_err(),
            EntryError::OffsetNotBelowPeriod {
                offset: 4,
                period: 4
            }
        );
    }

    #[test]
    fn validate_period_zero_allows_any_small_offset() {
        assert!(validate_entry(true, 0, 9, 0, 8).is_ok());
    }

    #[test]
    fn validate_rejects_message_index_past_table() {
        assert_eq!(
            validate_entry(false, 1, 0, 8, 8).unwrap_err(),
            EntryError::MsgIndexOutOfRange {
                index: 8,
                max_entries: 8
            }
        );
    }

    #[test]
    fn validate_rejects_fields_wider_than_eight_bits() {
        assert!(matches!(
            validate_entry(true, 256, 0, 0, 8),
            Err(EntryError::FieldTooLarge { field: "period", .. })
        ));
        assert!(matches!(
            validate_entry(true, 0, 300, 0, 8),
            Err(EntryError::FieldTooLarge { field: "offset", .. })
        ));
    }

    // ── ScheduleEntry::is_due ─────────────────────────────────────────────────

    #[test]
    fn entry_fires_on_matching_phase_only() {
        let e = validate_entry(true, 4, 2, 0, 8).unwrap();
        let fired: Vec<u32> = (0..12).filter(|p| e.is_due(*p)).collect();
        assert_eq!(fired, vec![2, 6, 10]);
    }

    #[test]
    fn disabled_or_zero_period_never_fires() {
        let disabled = validate_entry(false, 1, 0, 0, 8).unwrap();
        let never = validate_entry(true, 0, 0, 0, 8).unwrap();
        assert!((0..64).all(|p| !disabled.is_due(p) && !never.is_due(p)));
    }

    // ── entry_index ───────────────────────────────────────────────────────────

    #[test]
    fn entry_index_flattens_slot_major() {
        let tbl = ScheduleTable::new("TEST", GEOMETRY);
        assert_eq!(tbl.entry_index(0, 0).unwrap(), 0);
        assert_eq!(tbl.entry_index(1, 0).unwrap(), 3);
        assert_eq!(tbl.entry_index(3, 2).unwrap(), 11);
    }

    #[test]
    fn entry_index_rejects_out_of_range_address() {
        let tbl = ScheduleTable::new("TEST", GEOMETRY);
        assert_eq!(
            tbl.entry_index(4, 0).unwrap_err(),
            IndexError::SlotOutOfRange { slot: 4, slots: 4 }
        );
        assert_eq!(
            tbl.entry_index(0, 3).unwrap_err(),
            IndexError::ActivityOutOfRange {
                activity: 3,
                activities: 3
            }
        );
    }

    // ── load ──────────────────────────────────────────────────────────────────

    #[test]
    fn load_places_entries_by_address() {
        let mut tbl = ScheduleTable::new("TEST", GEOMETRY);
        let count = tbl
            .load(
                &file(vec![raw(2, 1, 4, 2, 5), raw(0, 0, 1, 0, 1)]),
                LoadType::Replace,
            )
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(tbl.entry(2, 1).unwrap().msg_tbl_index, 5);
        assert_eq!(tbl.slot_entries(2)[1].period, 4);
        assert!(!tbl.entry(1, 1).unwrap().enabled);
        assert_eq!(tbl.status().last_load_status, LoadStatus::Valid);
    }

    #[test]
    fn one_invalid_entry_leaves_live_table_unchanged() {
        let mut tbl = ScheduleTable::new("TEST", GEOMETRY);
        tbl.load(&file(vec![raw(0, 0, 2, 1, 3)]), LoadType::Replace)
            .unwrap();
        let before = tbl.dump().activity_array;

        let err = tbl
            .load(
                &file(vec![raw(1, 0, 2, 0, 1), raw(1, 1, 2, 2, 1)]),
                LoadType::Replace,
            )
            .unwrap_err();
        assert_eq!(
            err,
            TableError::Entry {
                position: 1,
                slot: 1,
                activity: 1,
                source: EntryError::OffsetNotBelowPeriod {
                    offset: 2,
                    period: 2
                }
            }
        );
        assert_eq!(tbl.dump().activity_array, before);
        assert_eq!(tbl.status().last_load_status, LoadStatus::Invalid);
        assert_eq!(tbl.status().last_load_count, 1);
    }

    #[test]
    fn bad_address_is_a_load_error() {
        let mut tbl = ScheduleTable::new("TEST", GEOMETRY);
        let err = tbl
            .load(&file(vec![raw(9, 0, 1, 0, 0)]), LoadType::Replace)
            .unwrap_err();
        assert!(matches!(
            err,
            TableError::Address {
                position: 0,
                source: IndexError::SlotOutOfRange { slot: 9, .. }
            }
        ));
    }

    #[test]
    fn missing_field_is_a_load_error() {
        let mut tbl = ScheduleTable::new("TEST", GEOMETRY);
        let mut e = raw(0, 0, 1, 0, 0);
        e.msg_index = None;
        assert_eq!(
            tbl.load(&file(vec![e]), LoadType::Replace).unwrap_err(),
            TableError::MissingField {
                position: 0,
                field: "msg-index"
            }
        );
    }

    #[test]
    fn update_load_keeps_unmentioned_entries() {
        let mut tbl = ScheduleTable::new("TEST", GEOMETRY);
        tbl.load(&file(vec![raw(0, 0, 1, 0, 1)]), LoadType::Replace)
            .unwrap();
        tbl.load(&file(vec![raw(3, 2, 1, 0, 2)]), LoadType::Update)
            .unwrap();
        assert!(tbl.entry(0, 0).unwrap().enabled);
        assert!(tbl.entry(3, 2).unwrap().enabled);
    }

    // ── single-entry commands ─────────────────────────────────────────────────

    #[test]
    fn load_entry_validates_with_shared_rule() {
        let mut tbl = ScheduleTable::new("TEST", GEOMETRY);
        assert!(tbl.load_entry(1, 1, true, 8, 3, 2).is_ok());
        assert_eq!(
            tbl.load_entry(1, 1, true, 8, 8, 2).unwrap_err(),
            SchTblError::Entry(EntryError::OffsetNotBelowPeriod {
                offset: 8,
                period: 8
            })
        );
        assert_eq!(tbl.entry(1, 1).unwrap().offset, 3, "rejected command left entry alone");
        assert!(matches!(
            tbl.load_entry(1, 7, true, 1, 0, 0),
            Err(SchTblError::Index(IndexError::ActivityOutOfRange { .. }))
        ));
    }

    #[test]
    fn configure_entry_toggles_enabled_only() {
        let mut tbl = ScheduleTable::new("TEST", GEOMETRY);
        tbl.load_entry(2, 0, true, 4, 1, 6).unwrap();
        let e = tbl.configure_entry(2, 0, false).unwrap();
        assert!(!e.enabled);
        assert_eq!((e.period, e.offset, e.msg_tbl_index), (4, 1, 6));
    }

    // ── dump ──────────────────────────────────────────────────────────────────

    #[test]
    fn dump_emits_every_entry_in_order_and_reloads() {
        let mut tbl = ScheduleTable::new("TEST", GEOMETRY);
        tbl.load(
            &file(vec![raw(3, 2, 8, 7, 7), raw(1, 0, 2, 1, 4)]),
            LoadType::Replace,
        )
        .unwrap();

        let dump = tbl.dump();
        assert_eq!(dump.activity_array.len(), 12);
        assert_eq!(dump.activity_array[3].slot, Some(1));
        assert_eq!(dump.activity_array[3].activity, Some(0));
        assert_eq!(dump.activity_array[11].period, Some(8));

        let mut copy = ScheduleTable::new("TEST", GEOMETRY);
        copy.load(&dump, LoadType::Replace).unwrap();
        for slot in 0..4 {
            assert_eq!(copy.slot_entries(slot), tbl.slot_entries(slot));
        }
    }

    #[test]
    fn dump_file_reloads_through_callbacks() {
        let mut tbl = ScheduleTable::new("TEST", GEOMETRY);
        tbl.load_entry(0, 2, true, 2, 1, 3).unwrap();

        let out = NamedTempFile::new().unwrap();
        assert!(tbl.dump_callback(out.path()));

        let mut copy = ScheduleTable::new("TEST", GEOMETRY);
        assert!(copy.load_callback(out.path(), LoadType::Replace));
        assert_eq!(copy.entry(0, 2).unwrap(), tbl.entry(0, 2).unwrap());
    }
}
