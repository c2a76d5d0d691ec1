/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured load/dump errors shared by the Message and Schedule tables.
//!
//! Every variant identifies the offending entry (its position in the file's
//! entry array, plus its key when one was read) and, where relevant, the
//! field that failed.  A rejected load reports exactly one of these and leaves
//! the live table untouched.

use thiserror::Error;

use crate::msgtbl::packet::RecordError;
use crate::msgtbl::words::WordsError;
use crate::schtbl::{EntryError, IndexError};

/// Why a table load (or a single dump entry) failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// The file's entry array is empty, or its first element has no key.
    #[error("table file has no entries")]
    Empty,

    /// A keyed entry lacks one of its required fields.
    #[error("entry {position}: missing required field '{field}'")]
    MissingField {
        position: usize,
        field: &'static str,
    },

    /// A message entry's `id` does not address a table row.
    #[error("entry {position}: message id {id} is out of range (valid 0..{max_entries})")]
    MessageIdOutOfRange {
        position: usize,
        id: u32,
        max_entries: usize,
    },

    /// A message entry's `data-words` string failed to parse.
    #[error("entry {position} (message id {id}): invalid data-words: {source}")]
    DataWords {
        position: usize,
        id: u16,
        #[source]
        source: WordsError,
    },

    /// A message entry's header and payload are inconsistent.
    #[error("entry {position} (message id {id}): {source}")]
    Record {
        position: usize,
        id: u16,
        #[source]
        source: RecordError,
    },

    /// A schedule entry's slot/activity address is out of range.
    #[error("entry {position}: {source}")]
    Address {
        position: usize,
        #[source]
        source: IndexError,
    },

    /// A schedule entry failed the shared entry validation rule.
    #[error("entry {position} (slot {slot}, activity {activity}): {source}")]
    Entry {
        position: usize,
        slot: u16,
        activity: u16,
        #[source]
        source: EntryError,
    },

    /// A message row's declared size cannot be represented in a dump file.
    /// Only that row is omitted; the rest of the dump proceeds.
    #[error("message id {id}: {words} data words exceed the {max}-word buffer, entry omitted from dump")]
    DumpOverflow { id: u16, words: usize, max: usize },
}
