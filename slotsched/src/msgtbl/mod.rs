/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Message Table: *what* the scheduler sends.
//!
//! A fixed-capacity, sparsely populated array of pre-built bus messages
//! addressed by a dense integer id.  Schedule Table entries refer to rows by
//! id; the slot processor resolves them through [`MessageTable::get`] on every
//! dispatch.
//!
//! The expected JSON file layout is:
//! ```json
//! {
//!   "app-name": "SLOTSCHED",
//!   "tbl-name": "Message",
//!   "message-array": [
//!     { "name": "HK_REQ", "id": 5, "stream-id": 6147, "seq-seg": 49152,
//!       "length": 1, "data-words": "0" }
//!   ]
//! }
//! ```
//!
//! Ids may appear in any order.  The first element without an `id` ends the
//! list; anything after it is ignored.

pub mod packet;
pub mod words;

pub use packet::{MessageRecord, PrimaryHeader, MAX_PAYLOAD_WORDS, MSG_MAX_BYTES, MSG_MAX_WORDS};

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::table::{self, LoadType, ManagedTable, TableError, TableStatus};
use packet::RecordError;
use words::{format_data_words, parse_data_words};

// ── File format ───────────────────────────────────────────────────────────────

/// Message table file as read from / written to JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MessageTableFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tbl_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub message_array: Vec<MessageFileEntry>,
}

/// One element of `message-array`.
///
/// Every field is optional at the serde level so that a missing field is
/// reported as a [`TableError::MissingField`] naming the entry, rather than as
/// an anonymous parse failure.  `name` and `descr` are ground-side annotations
/// and are not stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MessageFileEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq_seg: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_words: Option<String>,
}

/// Result of [`MessageTable::dump`]: the reloadable file image plus one error
/// per row that had to be left out.
#[derive(Debug, Clone, Default)]
pub struct MessageTableDump {
    pub file: MessageTableFile,
    pub errors: Vec<TableError>,
}

// ── Error type ────────────────────────────────────────────────────────────────

/// Single-row access failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MsgTblError {
    #[error("message index {index} is out of range (valid 0..{max_entries})")]
    OutOfRange { index: u16, max_entries: usize },

    #[error("message index {index} is not populated")]
    NotLoaded { index: u16 },

    #[error("message index {index}: {source}")]
    Record {
        index: u16,
        #[source]
        source: RecordError,
    },
}

// ── MessageTable ──────────────────────────────────────────────────────────────

/// Fixed-capacity store of packet records.
///
/// Storage is allocated once in [`new`](Self::new).  A full load builds a
/// scratch copy and swaps it in only after every entry validated, so a reader
/// never sees a half-applied load.
#[derive(Debug, Clone)]
pub struct MessageTable {
    app_name: String,
    entries: Vec<Option<MessageRecord>>,
    status: TableStatus,
}

impl MessageTable {
    /// Create an empty table with `max_entries` rows (at most 65 536, since
    /// ids are 16-bit).
    pub fn new(app_name: impl Into<String>, max_entries: usize) -> Self {
        let max_entries = max_entries.min(usize::from(u16::MAX) + 1);
        Self {
            app_name: app_name.into(),
            entries: vec![None; max_entries],
            status: TableStatus::default(),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.entries.len()
    }

    /// Number of populated rows.
    pub fn populated(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn status(&self) -> &TableStatus {
        &self.status
    }

    /// Clear load-status counters.  Entry contents are untouched.
    pub fn reset_status(&mut self) {
        self.status.reset();
    }

    /// Range-checked read of one row.  Called by the slot processor on every
    /// dispatch.
    pub fn get(&self, index: u16) -> Result<&MessageRecord, MsgTblError> {
        match self.entries.get(usize::from(index)) {
            None => Err(MsgTblError::OutOfRange {
                index,
                max_entries: self.entries.len(),
            }),
            Some(None) => Err(MsgTblError::NotLoaded { index }),
            Some(Some(record)) => Ok(record),
        }
    }

    /// Replace one row in place (single-entry load command).
    ///
    /// The row is swapped as one value, so a dispatch sees either the old or
    /// the new record.
    pub fn load_entry(&mut self, index: u16, record: MessageRecord) -> Result<(), MsgTblError> {
        let max_entries = self.entries.len();
        let slot = self
            .entries
            .get_mut(usize::from(index))
            .ok_or(MsgTblError::OutOfRange { index, max_entries })?;
        record
            .validate()
            .map_err(|source| MsgTblError::Record { index, source })?;

        debug!(index, stream_id = record.header.stream_id, "Message entry loaded");
        *slot = Some(record);
        Ok(())
    }

    /// Validate `file` in a scratch copy and commit it only if every entry is
    /// valid.  Returns the number of entries processed.
    ///
    /// # Errors
    /// The first invalid entry aborts the load; the live table and the last
    /// load count are left unchanged.
    pub fn load(&mut self, file: &MessageTableFile, load_type: LoadType) -> Result<usize, TableError> {
        match self.build_scratch(file, load_type) {
            Ok((scratch, count)) => {
                self.entries = scratch;
                self.status.record_success(count);
                info!(count, ?load_type, "Message Table load updated {count} entries");
                Ok(count)
            }
            Err(e) => {
                self.status.record_failure();
                warn!(error = %e, "Message Table load rejected");
                Err(e)
            }
        }
    }

    fn build_scratch(
        &self,
        file: &MessageTableFile,
        load_type: LoadType,
    ) -> Result<(Vec<Option<MessageRecord>>, usize), TableError> {
        let max_entries = self.entries.len();
        let mut scratch = match load_type {
            LoadType::Replace => vec![None; max_entries],
            LoadType::Update => self.entries.clone(),
        };
        let mut count = 0usize;

        for (position, entry) in file.message_array.iter().enumerate() {
            let Some(raw_id) = entry.id else {
                debug!(position, "message-array ends at entry without 'id'");
                break;
            };

            let id = u16::try_from(raw_id)
                .ok()
                .filter(|id| usize::from(*id) < max_entries)
                .ok_or(TableError::MessageIdOutOfRange {
                    position,
                    id: raw_id,
                    max_entries,
                })?;

            let missing = |field| TableError::MissingField { position, field };
            let header = PrimaryHeader {
                stream_id: entry.stream_id.ok_or_else(|| missing("stream-id"))?,
                seq_seg: entry.seq_seg.ok_or_else(|| missing("seq-seg"))?,
                length: entry.length.ok_or_else(|| missing("length"))?,
            };

            let payload = match &entry.data_words {
                Some(text) => parse_data_words(text, MAX_PAYLOAD_WORDS)
                    .map_err(|source| TableError::DataWords { position, id, source })?,
                None => Vec::new(),
            };

            let record = MessageRecord::new(header, payload)
                .map_err(|source| TableError::Record { position, id, source })?;

            debug!(
                position,
                id,
                stream_id = record.header.stream_id,
                words = record.payload.len(),
                "  message entry"
            );
            scratch[usize::from(id)] = Some(record);
            count += 1;
        }

        if count == 0 {
            return Err(TableError::Empty);
        }
        Ok((scratch, count))
    }

    /// Snapshot every populated row in id order, in the same format `load`
    /// accepts.
    ///
    /// A row whose size cannot be represented is left out and reported in
    /// [`MessageTableDump::errors`]; the remaining rows are still dumped.
    pub fn dump(&self) -> MessageTableDump {
        let mut dump = MessageTableDump {
            file: MessageTableFile {
                app_name: Some(self.app_name.clone()),
                tbl_name: Some("Message".to_string()),
                description: Some(table::dump_description()),
                message_array: Vec::new(),
            },
            errors: Vec::new(),
        };

        for (index, row) in self.entries.iter().enumerate() {
            let (Some(record), Ok(id)) = (row, u16::try_from(index)) else {
                continue;
            };

            let words = record.header.data_words().max(record.payload.len());
            if words > MAX_PAYLOAD_WORDS {
                let err = TableError::DumpOverflow {
                    id,
                    words,
                    max: MAX_PAYLOAD_WORDS,
                };
                error!("Error creating dump file message entry: {err}");
                dump.errors.push(err);
                continue;
            }

            dump.file.message_array.push(MessageFileEntry {
                name: None,
                descr: None,
                id: Some(u32::from(id)),
                stream_id: Some(record.header.stream_id),
                seq_seg: Some(record.header.seq_seg),
                length: Some(record.header.length),
                data_words: (!record.payload.is_empty())
                    .then(|| format_data_words(&record.payload)),
            });
        }

        dump
    }
}

impl ManagedTable for MessageTable {
    fn table_name(&self) -> &'static str {
        "message"
    }

    fn load_file(&mut self, path: &Path, load_type: LoadType) -> Result<usize> {
        let file: MessageTableFile = match table::read_json(path) {
            Ok(file) => file,
            Err(e) => {
                self.status.record_failure();
                return Err(e);
            }
        };
        let count = self
            .load(&file, load_type)
            .with_context(|| format!("Invalid message table file: {}", path.display()))?;
        Ok(count)
    }

    fn dump_file(&self, path: &Path) -> Result<usize> {
        let dump = self.dump();
        if !dump.errors.is_empty() {
            warn!(
                omitted = dump.errors.len(),
                "Message Table dump omitted entries"
            );
        }
        table::write_json(path, &dump.file)?;
        Ok(dump.file.message_array.len())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
