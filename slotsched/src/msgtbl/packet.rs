/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Typed packet record stored in each Message Table row.
//!
//! The table keeps structured data; bytes only exist at the bus boundary:
//!
//! ```text
//! MessageRecord ──encode_into()──►  [ stream-id | seq-seg | length | data … ]  ──► bus
//!   (typed)                           big-endian, exactly length + 7 bytes
//! ```
//!
//! `length` follows the CCSDS primary-header convention: total packet bytes
//! minus seven.  Payload words not supplied by the table are zero-filled up
//! to the declared length.

use serde::Serialize;
use thiserror::Error;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Capacity of one message buffer in 16-bit words, primary header included.
pub const MSG_MAX_WORDS: usize = 64;

/// Capacity of one message buffer in bytes.
pub const MSG_MAX_BYTES: usize = MSG_MAX_WORDS * 2;

/// Primary header size in 16-bit words.
pub const PRI_HDR_WORDS: usize = 3;

/// Primary header size in bytes.
pub const PRI_HDR_BYTES: usize = PRI_HDR_WORDS * 2;

/// Largest payload (secondary header + data) in 16-bit words.
pub const MAX_PAYLOAD_WORDS: usize = MSG_MAX_WORDS - PRI_HDR_WORDS;

// ── Error type ────────────────────────────────────────────────────────────────

/// Structural problems with a packet record or its wire image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The declared length describes a packet larger than the buffer capacity.
    #[error("declared packet size {bytes} bytes exceeds the {max}-byte message buffer")]
    TooLong { bytes: usize, max: usize },

    /// More payload words were supplied than the declared length can carry.
    #[error("{words} payload words exceed the {declared_words} words declared by the length field")]
    PayloadExceedsLength { words: usize, declared_words: usize },

    /// The output buffer handed to `encode_into` is too small.
    #[error("encode buffer holds {available} bytes but the packet needs {needed}")]
    BufferTooSmall { needed: usize, available: usize },

    /// The input handed to `decode` ends before the declared packet does.
    #[error("packet truncated: {available} bytes available, {needed} required")]
    Truncated { needed: usize, available: usize },
}

// ── PrimaryHeader ─────────────────────────────────────────────────────────────

/// The three header words at the front of every bus message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PrimaryHeader {
    /// Stream identifier (version, type, secondary-header flag, APID).
    pub stream_id: u16,

    /// Sequence flags and sequence count.
    pub seq_seg: u16,

    /// Declared length: total packet bytes minus seven.
    pub length: u16,
}

impl PrimaryHeader {
    /// Total size of the packet this header declares, in bytes.
    pub fn packet_bytes(&self) -> usize {
        usize::from(self.length) + 7
    }

    /// Bytes following the primary header.
    pub fn data_bytes(&self) -> usize {
        usize::from(self.length) + 1
    }

    /// Words needed to hold [`data_bytes`](Self::data_bytes), rounded up.
    pub fn data_words(&self) -> usize {
        self.data_bytes().div_ceil(2)
    }

    fn write_be(&self, out: &mut [u8]) {
        out[0..2].copy_from_slice(&self.stream_id.to_be_bytes());
        out[2..4].copy_from_slice(&self.seq_seg.to_be_bytes());
        out[4..6].copy_from_slice(&self.length.to_be_bytes());
    }

    fn read_be(bytes: &[u8]) -> Self {
        Self {
            stream_id: u16::from_be_bytes([bytes[0], bytes[1]]),
            seq_seg: u16::from_be_bytes([bytes[2], bytes[3]]),
            length: u16::from_be_bytes([bytes[4], bytes[5]]),
        }
    }
}

// ── MessageRecord ─────────────────────────────────────────────────────────────

/// One populated Message Table row: header plus the payload words supplied by
/// the table file or a load command.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MessageRecord {
    pub header: PrimaryHeader,

    /// Words after the primary header (secondary header included, if any).
    /// May be shorter than the declared length; the remainder encodes as zero.
    pub payload: Vec<u16>,
}

impl MessageRecord {
    /// Build a record, rejecting one whose stored length disagrees with its
    /// header.
    pub fn new(header: PrimaryHeader, payload: Vec<u16>) -> Result<Self, RecordError> {
        let record = Self { header, payload };
        record.validate()?;
        Ok(record)
    }

    /// Check the buffer-capacity and declared-length invariants.
    pub fn validate(&self) -> Result<(), RecordError> {
        let bytes = self.header.packet_bytes();
        if bytes > MSG_MAX_BYTES {
            return Err(RecordError::TooLong {
                bytes,
                max: MSG_MAX_BYTES,
            });
        }
        let declared_words = self.header.data_words();
        if self.payload.len() > declared_words {
            return Err(RecordError::PayloadExceedsLength {
                words: self.payload.len(),
                declared_words,
            });
        }
        Ok(())
    }

    /// Size of the wire image in bytes.
    pub fn encoded_len(&self) -> usize {
        self.header.packet_bytes()
    }

    /// Write the big-endian wire image into `buf` and return its length.
    ///
    /// Does not allocate; the slot processor calls this on the tick path with
    /// a fixed scratch buffer.
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<usize, RecordError> {
        self.validate()?;

        let len = self.encoded_len();
        if buf.len() < len {
            return Err(RecordError::BufferTooSmall {
                needed: len,
                available: buf.len(),
            });
        }

        let out = &mut buf[..len];
        out.fill(0);
        self.header.write_be(out);

        for (i, word) in self.payload.iter().enumerate() {
            let at = PRI_HDR_BYTES + i * 2;
            let [hi, lo] = word.to_be_bytes();
            out[at] = hi;
            // Odd packet sizes drop the low byte of the final word
            if at + 1 < len {
                out[at + 1] = lo;
            }
        }

        Ok(len)
    }

    /// Rebuild a record from a wire image.  The payload always spans the full
    /// declared length.
    pub fn decode(bytes: &[u8]) -> Result<Self, RecordError> {
        if bytes.len() < PRI_HDR_BYTES {
            return Err(RecordError::Truncated {
                needed: PRI_HDR_BYTES,
                available: bytes.len(),
            });
        }

        let header = PrimaryHeader::read_be(bytes);
        let len = header.packet_bytes();
        if len > MSG_MAX_BYTES {
            return Err(RecordError::TooLong {
                bytes: len,
                max: MSG_MAX_BYTES,
            });
        }
        if bytes.len() < len {
            return Err(RecordError::Truncated {
                needed: len,
                available: bytes.len(),
            });
        }

        let payload = bytes[PRI_HDR_BYTES..len]
            .chunks(2)
            .map(|pair| match pair {
                [hi, lo] => u16::from_be_bytes([*hi, *lo]),
                [hi] => u16::from_be_bytes([*hi, 0]),
                _ => 0,
            })
            .collect();

        Ok(Self { header, payload })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
