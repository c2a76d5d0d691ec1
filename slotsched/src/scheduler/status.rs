/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Runtime counters and the telemetry snapshots built from them.
//!
//! [`SchedulerCounters`] is written only by the slot processor and the
//! command handlers in [`super`].  Counters roll over at `u32::MAX`.

use serde::Serialize;

use crate::msgtbl::MessageRecord;
use crate::schtbl::ScheduleEntry;
use crate::sync::SyncState;
use crate::table::TableStatus;

/// The full counter set.  Zeroed at start-up and by `reset_status()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SchedulerCounters {
    pub valid_commands: u32,
    pub invalid_commands: u32,

    /// Slots visited, skipped ones included.
    pub slots_processed: u32,
    pub activity_success: u32,
    pub activity_failure: u32,

    pub valid_major_frames: u32,
    pub missed_major_frames: u32,
    pub unexpected_major_frames: u32,

    /// Wraps of the slot cursor past slot 0.
    pub table_passes: u32,

    /// Slots jumped over by late ticks.
    pub skipped_slots: u32,
    /// Ticks that advanced more than one slot.
    pub multiple_slots: u32,
    /// Ticks that advanced no slot.
    pub same_slot: u32,
}

pub(crate) fn bump(counter: &mut u32) {
    *counter = counter.wrapping_add(1);
}

pub(crate) fn add(counter: &mut u32, n: u64) {
    // Truncation is the rollover the counter would have reached anyway
    *counter = counter.wrapping_add(n as u32);
}

/// Diagnostic packet: counters plus the complete sync and cursor state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub counters: SchedulerCounters,
    pub sync_state: SyncState,
    pub sync_attempts_left: u32,
    pub last_sync_slot: Option<u16>,
    pub noisy_streak: u32,
    pub ignore_major_frame: bool,
    pub unexpected_major_frame: bool,
    /// `None` until the first tick.
    pub current_slot: Option<u16>,
    pub major_frame_pass: u32,
}

/// Periodic status packet: counters, the sync state block and both tables'
/// load status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Housekeeping {
    pub counters: SchedulerCounters,
    pub sync_state: SyncState,
    pub sync_attempts_left: u32,
    pub last_sync_slot: Option<u16>,
    pub noisy_streak: u32,
    pub ignore_major_frame: bool,
    pub unexpected_major_frame: bool,
    pub message_table: TableStatus,
    pub schedule_table: TableStatus,
}

/// Telemetry for one Schedule Table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchEntryTlm {
    pub slot: u16,
    pub activity: u16,
    pub entry: ScheduleEntry,
}

/// Telemetry for one Message Table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsgEntryTlm {
    pub index: u16,
    pub record: MessageRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_roll_over() {
        let mut c = u32::MAX;
        bump(&mut c);
        assert_eq!(c, 0);

        let mut d = u32::MAX - 1;
        add(&mut d, 3);
        assert_eq!(d, 1);
    }

    #[test]
    fn housekeeping_serializes_with_snake_case_state() {
        let hk = Housekeeping {
            counters: SchedulerCounters::default(),
            sync_state: SyncState::SyncPending,
            sync_attempts_left: 2,
            last_sync_slot: Some(4),
            noisy_streak: 0,
            ignore_major_frame: false,
            unexpected_major_frame: false,
            message_table: TableStatus::default(),
            schedule_table: TableStatus::default(),
        };
        let json = serde_json::to_value(&hk).unwrap();
        assert_eq!(json["sync_state"], "sync_pending");
        assert_eq!(json["last_sync_slot"], 4);
        assert_eq!(json["message_table"]["load_errors"], 0);
        assert_eq!(json["message_table"]["last_load_status"], "undefined");
        assert_eq!(json["counters"]["activity_success"], 0);
    }
}
