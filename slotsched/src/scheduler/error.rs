/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the slot scheduler.
//!
//! Two error enums model the two failure layers:
//!
//! * [`DispatchError`]: why one due activity was not delivered.  Never leaves
//!   the tick path: each one is logged once and folded into
//!   `activity_failure`.
//! * [`CommandError`]: why a single-entry command was rejected at the command
//!   boundary.  The table is left unmodified.
//!
//! | Variant | Layer | Counter |
//! |---|---|---|
//! | `DispatchError::Message` | tick | `activity_failure` |
//! | `DispatchError::Encode` | tick | `activity_failure` |
//! | `DispatchError::Bus` | tick | `activity_failure` |
//! | `CommandError::*` | command | `invalid_commands` |

use thiserror::Error;

use crate::bus::BusError;
use crate::msgtbl::packet::RecordError;
use crate::msgtbl::MsgTblError;
use crate::schtbl::SchTblError;

// ── Dispatch ──────────────────────────────────────────────────────────────────

/// A due activity that could not be sent.  `slot`/`activity` identify the
/// Schedule Table entry that fired.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The entry's message index does not resolve to a populated row.
    #[error("slot {slot} activity {activity}: {source}")]
    Message {
        slot: u16,
        activity: u16,
        #[source]
        source: MsgTblError,
    },

    /// The row could not be encoded into the message buffer.
    #[error("slot {slot} activity {activity}, message index {index}: {source}")]
    Encode {
        slot: u16,
        activity: u16,
        index: u16,
        #[source]
        source: RecordError,
    },

    /// The bus refused the encoded message.
    #[error("slot {slot} activity {activity}, message index {index}: {source}")]
    Bus {
        slot: u16,
        activity: u16,
        index: u16,
        #[source]
        source: BusError,
    },
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// A single-entry command rejected before touching any table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("schedule entry command rejected: {0}")]
    Schedule(#[from] SchTblError),

    #[error("message entry command rejected: {0}")]
    Message(#[from] MsgTblError),
}
