/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Slot processor: the per-tick entry point.
//!
//! [`Scheduler`] owns both tables, the frame-sync machine, the runtime
//! counters and the outbound bus.  One [`process_tick`](Scheduler::process_tick)
//! call handles one minor-frame event:
//!
//! ```text
//! Tick ──► slots elapsed ──► advance cursor ──► FrameSync ──► dispatch slot
//!          (0 / 1 / k)        (mod slots,        (may realign     (due entries
//!                              wraps → pass)      cursor to 0)     → bus)
//! ```
//!
//! # Tick-path rules
//!
//! | Slots elapsed | Counters | Dispatch |
//! |---|---|---|
//! | 0 | `same_slot` + 1 | none |
//! | 1 | `slots_processed` + 1 | landing slot |
//! | k > 1 | `multiple_slots` + 1, `skipped_slots` + (k − 1), `slots_processed` + k | landing slot only |
//!
//! An entry is due when `pass % period == offset`, where `pass` is the
//! major-frame pass counter.  The counter advances once per wrap of the cursor,
//! so every entry is considered at most once per pass.
//!
//! # Realignment
//!
//! A sync attempt moves the cursor to slot 0.  Where it lands decides whether
//! the signal was early or late:
//!
//! | Cursor at signal | Reading | Pass | Dispatch |
//! |---|---|---|---|
//! | 0 | on time | unchanged | as usual |
//! | `1 .. slots/2` | late, slot 0 of this pass already seen | unchanged | none on this tick; slots already served this pass are not served again |
//! | `slots/2 ..` | early, next pass begins now | + 1 | new slot 0 |
//!
//! Dispatch continues while unsynced: the cursor free-runs and scheduling
//! loses precision rather than stopping.
//!
//! Nothing on the tick path allocates or returns an error.  Failures are
//! logged once each, counted, and folded into the boolean result.

pub mod error;
pub mod status;

pub use error::{CommandError, DispatchError};
pub use status::{Diagnostics, Housekeeping, MsgEntryTlm, SchEntryTlm, SchedulerCounters};

use tracing::{debug, info, warn};

use crate::bus::MessageBus;
use crate::config::SchedulerConfig;
use crate::msgtbl::{MessageRecord, MessageTable, MSG_MAX_BYTES};
use crate::schtbl::{ScheduleEntry, ScheduleTable};
use crate::sync::{FrameSync, SyncState};
use crate::tick::{Tick, TickTiming};

use status::{add, bump};

/// The table-driven slot scheduler.
#[derive(Debug)]
pub struct Scheduler<B> {
    msg_tbl: MessageTable,
    sch_tbl: ScheduleTable,
    sync: FrameSync,
    timing: TickTiming,
    counters: SchedulerCounters,
    /// Current slot; `None` until the first tick.
    cursor: Option<u16>,
    major_frame_pass: u32,
    /// Highest slot of the current pass dispatched before a late realignment
    /// moved the cursor back.
    served_through: Option<u16>,
    bus: B,
    buffer: [u8; MSG_MAX_BYTES],
}

impl<B: MessageBus> Scheduler<B> {
    /// Build a scheduler with empty tables.  `config` is assumed validated.
    pub fn new(config: &SchedulerConfig, bus: B) -> Self {
        let geometry = config.geometry();
        Self {
            msg_tbl: MessageTable::new(config.app_name.clone(), geometry.msg_max_entries),
            sch_tbl: ScheduleTable::new(config.app_name.clone(), geometry),
            sync: FrameSync::new(config.sync_config()),
            timing: config.timing(),
            counters: SchedulerCounters::default(),
            cursor: None,
            major_frame_pass: 0,
            served_through: None,
            bus,
            buffer: [0; MSG_MAX_BYTES],
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn message_table(&self) -> &MessageTable {
        &self.msg_tbl
    }

    /// Load/dump access for the table manager.  Holding it excludes ticks.
    pub fn message_table_mut(&mut self) -> &mut MessageTable {
        &mut self.msg_tbl
    }

    pub fn schedule_table(&self) -> &ScheduleTable {
        &self.sch_tbl
    }

    /// Load/dump access for the table manager.  Holding it excludes ticks.
    pub fn schedule_table_mut(&mut self) -> &mut ScheduleTable {
        &mut self.sch_tbl
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn counters(&self) -> &SchedulerCounters {
        &self.counters
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync.state()
    }

    pub fn current_slot(&self) -> Option<u16> {
        self.cursor
    }

    pub fn major_frame_pass(&self) -> u32 {
        self.major_frame_pass
    }

    // ── Tick path ─────────────────────────────────────────────────────────────

    /// Process one minor-frame tick.  Returns `false` if any due activity
    /// failed to dispatch.
    pub fn process_tick(&mut self, tick: &Tick) -> bool {
        let obs = self.timing.observe(tick);
        let slots = self.sch_tbl.geometry().slots_per_major_frame;

        let cursor = self.cursor;
        let (mut landing, crossed, mut fresh) = match cursor {
            None => {
                bump(&mut self.counters.slots_processed);
                (0, false, true)
            }
            Some(current) if obs.slots_elapsed == 0 => {
                bump(&mut self.counters.same_slot);
                (current, false, false)
            }
            Some(current) => {
                let elapsed = obs.slots_elapsed;
                if elapsed > 1 {
                    bump(&mut self.counters.multiple_slots);
                    add(&mut self.counters.skipped_slots, elapsed - 1);
                    debug!(from = current, skipped = elapsed - 1, "Slots skipped");
                }
                add(&mut self.counters.slots_processed, elapsed);

                let total = u64::from(current).saturating_add(elapsed);
                let width = u64::from(slots);
                let wraps = total / width;
                // total % width < slots, so the conversion cannot fail
                let landing = u16::try_from(total % width).unwrap_or_default();
                self.start_passes(wraps);
                (landing, wraps > 0, true)
            }
        };

        let report = self.sync.observe(&obs, landing, crossed);
        if report.valid_major {
            bump(&mut self.counters.valid_major_frames);
        }
        if report.missed_major {
            bump(&mut self.counters.missed_major_frames);
        }
        if report.unexpected_major {
            bump(&mut self.counters.unexpected_major_frames);
        }
        if report.realign && landing != 0 {
            if landing < slots / 2 {
                debug!(
                    from = landing,
                    pass = self.major_frame_pass,
                    "Late major frame, cursor moved back to slot 0"
                );
                if !crossed {
                    self.served_through = self.served_through.max(cursor);
                }
                fresh = false;
            } else {
                debug!(from = landing, "Early major frame, cursor realigned to slot 0");
                self.start_passes(1);
                fresh = true;
            }
            landing = 0;
        } else if let Some(last) = self.served_through {
            if landing <= last {
                fresh = false;
            } else {
                self.served_through = None;
            }
        }

        self.cursor = Some(landing);

        if fresh {
            self.dispatch_slot(landing)
        } else {
            true
        }
    }

    fn start_passes(&mut self, wraps: u64) {
        if wraps > 0 {
            self.served_through = None;
        }
        add(&mut self.counters.table_passes, wraps);
        // Pass numbers are taken modulo 2^32 like the counters
        self.major_frame_pass = self.major_frame_pass.wrapping_add(wraps as u32);
    }

    fn dispatch_slot(&mut self, slot: u16) -> bool {
        let pass = self.major_frame_pass;
        let mut all_sent = true;

        for activity in 0..self.sch_tbl.geometry().activities_per_slot {
            let Ok(entry) = self.sch_tbl.entry(slot, activity) else {
                continue;
            };
            if !entry.is_due(pass) {
                continue;
            }
            match self.dispatch(slot, activity, entry) {
                Ok(()) => bump(&mut self.counters.activity_success),
                Err(e) => {
                    bump(&mut self.counters.activity_failure);
                    warn!(pass, error = %e, "Scheduled activity failed");
                    all_sent = false;
                }
            }
        }
        all_sent
    }

    fn dispatch(&mut self, slot: u16, activity: u16, entry: ScheduleEntry) -> Result<(), DispatchError> {
        let index = entry.msg_tbl_index;
        let record = self
            .msg_tbl
            .get(index)
            .map_err(|source| DispatchError::Message {
                slot,
                activity,
                source,
            })?;
        let len = record
            .encode_into(&mut self.buffer)
            .map_err(|source| DispatchError::Encode {
                slot,
                activity,
                index,
                source,
            })?;
        self.bus
            .send(&self.buffer[..len])
            .map_err(|source| DispatchError::Bus {
                slot,
                activity,
                index,
                source,
            })
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    /// Zero every counter and sync flag and both tables' load status.  Table
    /// contents, the cursor and the pass counter are left alone.
    pub fn reset_status(&mut self) {
        self.counters = SchedulerCounters::default();
        self.sync.reset();
        self.msg_tbl.reset_status();
        self.sch_tbl.reset_status();
        info!("Scheduler status reset");
    }

    pub fn noop(&mut self) {
        bump(&mut self.counters.valid_commands);
        info!(version = env!("CARGO_PKG_VERSION"), "No operation command received");
    }

    /// Enable or disable one Schedule Table entry.
    pub fn configure_sch_entry(
        &mut self,
        slot: u16,
        activity: u16,
        enabled: bool,
    ) -> Result<ScheduleEntry, CommandError> {
        let result = self
            .sch_tbl
            .configure_entry(slot, activity, enabled)
            .map_err(CommandError::from);
        self.command_result("configure schedule entry", result)
    }

    /// Replace every field of one Schedule Table entry.
    pub fn load_sch_entry(
        &mut self,
        slot: u16,
        activity: u16,
        enabled: bool,
        period: u16,
        offset: u16,
        msg_tbl_index: u16,
    ) -> Result<ScheduleEntry, CommandError> {
        let result = self
            .sch_tbl
            .load_entry(slot, activity, enabled, period, offset, msg_tbl_index)
            .map_err(CommandError::from);
        self.command_result("load schedule entry", result)
    }

    /// Telemetry for one Schedule Table entry.
    pub fn send_sch_entry(&mut self, slot: u16, activity: u16) -> Result<SchEntryTlm, CommandError> {
        let result = self
            .sch_tbl
            .entry(slot, activity)
            .map(|entry| SchEntryTlm {
                slot,
                activity,
                entry,
            })
            .map_err(|e| CommandError::from(crate::schtbl::SchTblError::from(e)));
        self.command_result("send schedule entry", result)
    }

    /// Replace one Message Table row.
    pub fn load_msg_entry(&mut self, index: u16, record: MessageRecord) -> Result<(), CommandError> {
        let result = self
            .msg_tbl
            .load_entry(index, record)
            .map_err(CommandError::from);
        self.command_result("load message entry", result)
    }

    /// Telemetry for one Message Table row.
    pub fn send_msg_entry(&mut self, index: u16) -> Result<MsgEntryTlm, CommandError> {
        let result = self
            .msg_tbl
            .get(index)
            .map(|record| MsgEntryTlm {
                index,
                record: record.clone(),
            })
            .map_err(CommandError::from);
        self.command_result("send message entry", result)
    }

    /// Diagnostic snapshot of the full runtime state.
    pub fn diagnostics(&mut self) -> Diagnostics {
        bump(&mut self.counters.valid_commands);
        Diagnostics {
            counters: self.counters,
            sync_state: self.sync.state(),
            sync_attempts_left: self.sync.attempts_left(),
            last_sync_slot: self.sync.last_sync_slot(),
            noisy_streak: self.sync.noisy_streak(),
            ignore_major_frame: self.sync.ignore_major_frame(),
            unexpected_major_frame: self.sync.unexpected_major_frame(),
            current_slot: self.cursor,
            major_frame_pass: self.major_frame_pass,
        }
    }

    /// Periodic status packet.
    pub fn housekeeping(&self) -> Housekeeping {
        Housekeeping {
            counters: self.counters,
            sync_state: self.sync.state(),
            sync_attempts_left: self.sync.attempts_left(),
            last_sync_slot: self.sync.last_sync_slot(),
            noisy_streak: self.sync.noisy_streak(),
            ignore_major_frame: self.sync.ignore_major_frame(),
            unexpected_major_frame: self.sync.unexpected_major_frame(),
            message_table: *self.msg_tbl.status(),
            schedule_table: *self.sch_tbl.status(),
        }
    }

    fn command_result<T>(
        &mut self,
        command: &'static str,
        result: Result<T, CommandError>,
    ) -> Result<T, CommandError> {
        match &result {
            Ok(_) => bump(&mut self.counters.valid_commands),
            Err(e) => {
                bump(&mut self.counters.invalid_commands);
                warn!(command, error = %e, "Command rejected");
            }
        }
        result
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
