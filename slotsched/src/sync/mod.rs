/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Frame Sync State Machine.
//!
//! Tracks whether the slot cursor agrees with the external major-frame signal.
//!
//! ```text
//!              major frame                N good ticks
//!   UNSYNCED ──────────────► SYNC_PENDING ─────────────► SYNCED
//!      ▲   (cursor → 0,          │                         │
//!      │    attempt − 1)         │ one bad tick            │ missed / unexpected
//!      │                         │ (MissedMajorFrame + 1)  │ major frame, or noise
//!      └─────────────────────────┴─────────────────────────┘
//! ```
//!
//! A good tick while pending advances exactly one clean slot and lands on slot
//! 0 if and only if the major-frame signal arrived with it.
//!
//! When the attempt budget is spent the machine stops listening to the
//! major-frame signal (`ignore_major_frame`) and the scheduler free-runs on
//! its own cursor until a status reset.  More than `max_noisy_frames`
//! consecutive noisy ticks force `UNSYNCED` from any state.
//!
//! The machine owns its own state but no counters; it reports what happened
//! through [`SyncReport`] and the slot processor does the bookkeeping.

use serde::Serialize;
use tracing::{info, warn};

use crate::tick::TickObservation;

/// Confidence in the slot cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Unsynced,
    SyncPending,
    Synced,
}

/// Thresholds for [`FrameSync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Consecutive noisy ticks tolerated before sync is dropped.
    pub max_noisy_frames: u32,
    /// Sync attempts allowed before the major-frame signal is ignored.
    pub attempts: u32,
    /// Good ticks needed to go from pending to synced.
    pub confirm_ticks: u32,
}

/// What one tick did to sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Move the cursor to slot 0 (a sync attempt started).
    pub realign: bool,
    pub valid_major: bool,
    pub missed_major: bool,
    pub unexpected_major: bool,
    /// Sync dropped because of sustained noise.
    pub noise_desync: bool,
    /// The attempt budget ran out on this tick.
    pub budget_exhausted: bool,
}

#[derive(Debug, Clone)]
pub struct FrameSync {
    config: SyncConfig,
    state: SyncState,
    attempts_left: u32,
    confirmed: u32,
    noisy_streak: u32,
    ignore_major_frame: bool,
    unexpected_major_frame: bool,
    last_sync_slot: Option<u16>,
}

impl FrameSync {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            state: SyncState::Unsynced,
            attempts_left: config.attempts,
            confirmed: 0,
            noisy_streak: 0,
            ignore_major_frame: false,
            unexpected_major_frame: false,
            last_sync_slot: None,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn attempts_left(&self) -> u32 {
        self.attempts_left
    }

    pub fn noisy_streak(&self) -> u32 {
        self.noisy_streak
    }

    pub fn ignore_major_frame(&self) -> bool {
        self.ignore_major_frame
    }

    pub fn unexpected_major_frame(&self) -> bool {
        self.unexpected_major_frame
    }

    /// Slot the cursor was on when the last sync attempt realigned it.
    pub fn last_sync_slot(&self) -> Option<u16> {
        self.last_sync_slot
    }

    /// Back to the start-up baseline: unsynced, full budget, flags clear.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    /// Feed one tick.  `landing_slot` is where the cursor arrived after
    /// advancing by `obs.slots_elapsed`; `crossed_slot_zero` is set when that
    /// advance wrapped past (or onto) slot 0.
    pub fn observe(
        &mut self,
        obs: &TickObservation,
        landing_slot: u16,
        crossed_slot_zero: bool,
    ) -> SyncReport {
        let mut report = SyncReport::default();

        self.noisy_streak = if obs.noisy {
            self.noisy_streak.saturating_add(1)
        } else {
            0
        };

        match self.state {
            SyncState::Unsynced => {
                if obs.major_frame {
                    self.begin_sync(landing_slot, &mut report);
                }
            }
            SyncState::SyncPending => {
                let on_boundary = obs.major_frame == (landing_slot == 0);
                if obs.slots_elapsed == 1 && !obs.noisy && on_boundary {
                    self.confirmed += 1;
                    if self.confirmed >= self.config.confirm_ticks {
                        self.state = SyncState::Synced;
                        self.attempts_left = self.config.attempts;
                        self.unexpected_major_frame = false;
                        info!(confirmed = self.confirmed, "Frame sync established");
                    }
                } else {
                    report.missed_major = true;
                    self.lose_sync("sync confirmation failed", landing_slot);
                }
            }
            SyncState::Synced => {
                if obs.major_frame {
                    // Valid only on the tick that starts the pass
                    if landing_slot == 0 && crossed_slot_zero {
                        report.valid_major = true;
                    } else {
                        report.unexpected_major = true;
                        self.unexpected_major_frame = true;
                        self.lose_sync("unexpected major frame", landing_slot);
                    }
                } else if crossed_slot_zero {
                    report.missed_major = true;
                    self.lose_sync("missed major frame", landing_slot);
                }
            }
        }

        if self.noisy_streak > self.config.max_noisy_frames && self.state != SyncState::Unsynced {
            report.noise_desync = true;
            self.lose_sync("consecutive noisy frames", landing_slot);
        }

        report
    }

    fn begin_sync(&mut self, landing_slot: u16, report: &mut SyncReport) {
        if self.ignore_major_frame {
            return;
        }
        if self.attempts_left == 0 {
            self.ignore_major_frame = true;
            report.budget_exhausted = true;
            warn!(
                attempts = self.config.attempts,
                "Sync attempts exhausted, ignoring major frame signal"
            );
            return;
        }
        self.attempts_left -= 1;
        self.last_sync_slot = Some(landing_slot);
        self.confirmed = 0;
        self.state = SyncState::SyncPending;
        report.realign = true;
        info!(
            slot = landing_slot,
            attempts_left = self.attempts_left,
            "Major frame received, sync pending"
        );
    }

    fn lose_sync(&mut self, reason: &'static str, slot: u16) {
        warn!(
            reason,
            slot,
            from = ?self.state,
            noisy_streak = self.noisy_streak,
            "Frame sync lost"
        );
        self.state = SyncState::Unsynced;
        self.confirmed = 0;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: SyncConfig = SyncConfig {
        max_noisy_frames: 2,
        attempts: 2,
        confirm_ticks: 3,
    };

    fn clean() -> TickObservation {
        TickObservation {
            slots_elapsed: 1,
            noisy: false,
            major_frame: false,
        }
    }

    fn major() -> TickObservation {
        TickObservation {
            major_frame: true,
            ..clean()
        }
    }

    fn noisy() -> TickObservation {
        TickObservation {
            noisy: true,
            ..clean()
        }
    }

    /// Realign at slot 5, then confirm with clean ticks on slots 1..=3.
    fn synced() -> FrameSync {
        let mut sync = FrameSync::new(CONFIG);
        assert!(sync.observe(&major(), 5, false).realign);
        for slot in 1..=3 {
            sync.observe(&clean(), slot, false);
        }
        assert_eq!(sync.state(), SyncState::Synced);
        sync
    }

    #[test]
    fn starts_unsynced_with_full_budget() {
        let sync = FrameSync::new(CONFIG);
        assert_eq!(sync.state(), SyncState::Unsynced);
        assert_eq!(sync.attempts_left(), 2);
        assert_eq!(sync.last_sync_slot(), None);
    }

    #[test]
    fn major_frame_while_unsynced_starts_attempt() {
        let mut sync = FrameSync::new(CONFIG);
        let r = sync.observe(&major(), 7, false);
        assert!(r.realign);
        assert_eq!(sync.state(), SyncState::SyncPending);
        assert_eq!(sync.attempts_left(), 1);
        assert_eq!(sync.last_sync_slot(), Some(7));
    }

    #[test]
    fn clean_ticks_without_signal_stay_unsynced() {
        let mut sync = FrameSync::new(CONFIG);
        for slot in 1..10 {
            assert_eq!(sync.observe(&clean(), slot, false), SyncReport::default());
        }
        assert_eq!(sync.state(), SyncState::Unsynced);
    }

    #[test]
    fn confirmation_reaches_synced_and_refills_budget() {
        let sync = synced();
        assert_eq!(sync.attempts_left(), 2);
    }

    #[test]
    fn bad_tick_while_pending_counts_missed() {
        let mut sync = FrameSync::new(CONFIG);
        sync.observe(&major(), 3, false);
        let skipped = TickObservation {
            slots_elapsed: 2,
            ..clean()
        };
        let r = sync.observe(&skipped, 2, false);
        assert!(r.missed_major);
        assert_eq!(sync.state(), SyncState::Unsynced);
    }

    #[test]
    fn major_frame_off_slot_zero_while_pending_is_bad() {
        let mut sync = FrameSync::new(CONFIG);
        sync.observe(&major(), 3, false);
        assert!(sync.observe(&major(), 1, false).missed_major);
    }

    #[test]
    fn on_time_major_frames_while_synced_are_valid() {
        let mut sync = synced();
        for _ in 0..10 {
            let r = sync.observe(&major(), 0, true);
            assert!(r.valid_major);
            assert!(!r.missed_major && !r.unexpected_major);
        }
        assert_eq!(sync.state(), SyncState::Synced);
    }

    #[test]
    fn repeated_major_frame_inside_slot_zero_is_unexpected() {
        let mut sync = synced();
        assert!(sync.observe(&major(), 0, true).valid_major);

        let repeat = TickObservation {
            slots_elapsed: 0,
            ..major()
        };
        let r = sync.observe(&repeat, 0, false);
        assert!(!r.valid_major);
        assert!(r.unexpected_major);
        assert!(sync.unexpected_major_frame());
        assert_eq!(sync.state(), SyncState::Unsynced);
    }

    #[test]
    fn early_major_frame_while_synced_is_unexpected() {
        let mut sync = synced();
        let r = sync.observe(&major(), 42, false);
        assert!(r.unexpected_major);
        assert!(sync.unexpected_major_frame());
        assert_eq!(sync.state(), SyncState::Unsynced);
    }

    #[test]
    fn wrap_without_major_frame_while_synced_is_missed() {
        let mut sync = synced();
        let r = sync.observe(&clean(), 0, true);
        assert!(r.missed_major);
        assert_eq!(sync.state(), SyncState::Unsynced);
    }

    #[test]
    fn sustained_noise_drops_sync() {
        let mut sync = synced();
        assert!(!sync.observe(&noisy(), 4, false).noise_desync);
        assert!(!sync.observe(&noisy(), 5, false).noise_desync);
        assert!(sync.observe(&noisy(), 6, false).noise_desync);
        assert_eq!(sync.state(), SyncState::Unsynced);
        assert_eq!(sync.noisy_streak(), 3);
    }

    #[test]
    fn clean_tick_clears_noise_streak() {
        let mut sync = synced();
        sync.observe(&noisy(), 4, false);
        sync.observe(&noisy(), 5, false);
        sync.observe(&clean(), 6, false);
        assert_eq!(sync.noisy_streak(), 0);
        assert!(!sync.observe(&noisy(), 7, false).noise_desync);
        assert_eq!(sync.state(), SyncState::Synced);
    }

    #[test]
    fn exhausted_budget_ignores_major_frame() {
        let mut sync = FrameSync::new(CONFIG);
        // two failed attempts
        for _ in 0..2 {
            assert!(sync.observe(&major(), 9, false).realign);
            sync.observe(&noisy(), 1, false);
            assert_eq!(sync.state(), SyncState::Unsynced);
        }
        let r = sync.observe(&major(), 9, false);
        assert!(r.budget_exhausted);
        assert!(!r.realign);
        assert!(sync.ignore_major_frame());

        // further signals are ignored without another report
        assert_eq!(sync.observe(&major(), 9, false), SyncReport::default());
        assert_eq!(sync.state(), SyncState::Unsynced);
    }

    #[test]
    fn reset_restores_baseline() {
        let mut sync = synced();
        sync.observe(&major(), 42, false);
        sync.reset();
        assert_eq!(sync.state(), SyncState::Unsynced);
        assert_eq!(sync.attempts_left(), 2);
        assert_eq!(sync.last_sync_slot(), None);
        assert!(!sync.unexpected_major_frame());
        assert!(!sync.ignore_major_frame());
    }
}
