/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Tick input: what the minor-frame interrupt hands the slot processor.
//!
//! A [`Tick`] carries the time measured since the previous tick and whether
//! the major-frame signal arrived since then.  [`TickTiming`] turns it into a
//! [`TickObservation`]: whole slots elapsed (rounded to the nearest slot) and
//! whether the measured time was noisy.

use std::time::{Duration, Instant};

/// One minor-frame event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Time since the previous tick.
    pub elapsed: Duration,
    /// The major-frame signal arrived since the previous tick.
    pub major_frame: bool,
}

impl Tick {
    /// A tick exactly `minor_frame` after the previous one.
    pub fn nominal(minor_frame: Duration) -> Self {
        Self {
            elapsed: minor_frame,
            major_frame: false,
        }
    }

    pub fn with_major_frame(mut self) -> Self {
        self.major_frame = true;
        self
    }
}

/// Derives [`Tick`]s from a monotonic clock.
#[derive(Debug, Clone)]
pub struct TickClock {
    nominal: Duration,
    last: Option<Instant>,
}

impl TickClock {
    pub fn new(nominal: Duration) -> Self {
        Self {
            nominal,
            last: None,
        }
    }

    /// Build the tick observed now.
    pub fn tick(&mut self, major_frame: bool) -> Tick {
        self.tick_at(Instant::now(), major_frame)
    }

    /// Build the tick observed at `now`.  The first tick reports the nominal
    /// duration because nothing precedes it.
    pub fn tick_at(&mut self, now: Instant, major_frame: bool) -> Tick {
        let elapsed = match self.last {
            Some(last) => now.saturating_duration_since(last),
            None => self.nominal,
        };
        self.last = Some(now);
        Tick {
            elapsed,
            major_frame,
        }
    }
}

/// What the slot processor and frame sync need to know about one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickObservation {
    pub slots_elapsed: u64,
    pub noisy: bool,
    pub major_frame: bool,
}

/// Nominal slot duration and noise tolerance, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickTiming {
    pub minor_frame_us: u64,
    pub noisy_tolerance_us: u64,
}

impl TickTiming {
    pub fn observe(&self, tick: &Tick) -> TickObservation {
        let elapsed_us = u64::try_from(tick.elapsed.as_micros()).unwrap_or(u64::MAX);
        let minor = self.minor_frame_us.max(1);
        TickObservation {
            slots_elapsed: elapsed_us.saturating_add(minor / 2) / minor,
            noisy: elapsed_us.abs_diff(self.minor_frame_us) > self.noisy_tolerance_us,
            major_frame: tick.major_frame,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const TIMING: TickTiming = TickTiming {
        minor_frame_us: 10_000,
        noisy_tolerance_us: 500,
    };

    fn us(n: u64) -> Tick {
        Tick {
            elapsed: Duration::from_micros(n),
            major_frame: false,
        }
    }

    #[test]
    fn nominal_tick_is_one_clean_slot() {
        let obs = TIMING.observe(&Tick::nominal(Duration::from_millis(10)));
        assert_eq!(obs.slots_elapsed, 1);
        assert!(!obs.noisy);
        assert!(!obs.major_frame);
    }

    #[test]
    fn jitter_within_tolerance_is_clean() {
        assert!(!TIMING.observe(&us(10_500)).noisy);
        assert!(!TIMING.observe(&us(9_500)).noisy);
        assert!(TIMING.observe(&us(10_501)).noisy);
    }

    #[test]
    fn slots_round_to_nearest() {
        assert_eq!(TIMING.observe(&us(4_999)).slots_elapsed, 0);
        assert_eq!(TIMING.observe(&us(5_000)).slots_elapsed, 1);
        assert_eq!(TIMING.observe(&us(24_000)).slots_elapsed, 2);
        assert_eq!(TIMING.observe(&us(40_000)).slots_elapsed, 4);
    }

    #[test]
    fn major_frame_flag_passes_through() {
        let t = Tick::nominal(Duration::from_millis(10)).with_major_frame();
        assert!(TIMING.observe(&t).major_frame);
    }

    #[test]
    fn clock_measures_between_ticks() {
        let mut clock = TickClock::new(Duration::from_millis(10));
        let start = Instant::now();
        assert_eq!(clock.tick_at(start, true).elapsed, Duration::from_millis(10));

        let t = clock.tick_at(start + Duration::from_millis(23), false);
        assert_eq!(t.elapsed, Duration::from_millis(23));
        assert!(!t.major_frame);
    }
}
