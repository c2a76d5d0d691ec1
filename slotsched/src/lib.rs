/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! slotsched – table-driven slot scheduler
//!
//! Fires pre-built bus messages at fixed points of a periodic major frame
//! divided into minor-frame slots.
//!
//! ```text
//! lib.rs
//! ├── config/      – YAML scheduler configuration
//! ├── table/       – load status, JSON file I/O, table-manager seam
//! ├── msgtbl/      – Message Table, packet record, data-word parsing
//! ├── schtbl/      – Schedule Table, shared entry validation
//! ├── sync/        – frame sync state machine
//! ├── scheduler/   – slot processor, commands, counters and telemetry
//! ├── bus.rs       – outbound message bus seam
//! └── tick.rs      – tick input and tick clock
//! ```

pub mod bus;
pub mod config;
pub mod msgtbl;
pub mod scheduler;
pub mod schtbl;
pub mod sync;
pub mod table;
pub mod tick;
