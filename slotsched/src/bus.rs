/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Outbound bus-send seam.
//!
//! The scheduler hands each due message to a [`MessageBus`] as the encoded
//! wire image.  The transport behind it belongs to the host.

use thiserror::Error;
use tracing::debug;

use crate::msgtbl::MessageRecord;

/// Why the bus refused a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("bus rejected message for stream 0x{stream_id:04X}: {reason}")]
    Rejected { stream_id: u16, reason: String },

    #[error("bus is not connected")]
    Disconnected,
}

/// Outbound message transport.  Called on the tick path, so implementations
/// must not block.
pub trait MessageBus {
    fn send(&mut self, packet: &[u8]) -> Result<(), BusError>;
}

/// Logs every message at `debug` level and accepts it.
#[derive(Debug, Default)]
pub struct TracingBus {
    sent: u64,
}

impl TracingBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl MessageBus for TracingBus {
    fn send(&mut self, packet: &[u8]) -> Result<(), BusError> {
        self.sent += 1;
        let stream_id = packet
            .get(0..2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
            .unwrap_or_default();
        debug!(stream_id = format_args!("0x{stream_id:04X}"), bytes = packet.len(), "Bus send");
        Ok(())
    }
}

/// Keeps every packet it receives; can be told to reject a stream.
#[derive(Debug, Default)]
pub struct RecordingBus {
    packets: Vec<Vec<u8>>,
    reject_stream: Option<u16>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every packet whose stream id equals `stream_id`.
    pub fn reject_stream(&mut self, stream_id: u16) {
        self.reject_stream = Some(stream_id);
    }

    pub fn packets(&self) -> &[Vec<u8>] {
        &self.packets
    }

    /// Received packets decoded back into records; undecodable ones skipped.
    pub fn records(&self) -> Vec<MessageRecord> {
        self.packets
            .iter()
            .filter_map(|p| MessageRecord::decode(p).ok())
            .collect()
    }
}

impl MessageBus for RecordingBus {
    fn send(&mut self, packet: &[u8]) -> Result<(), BusError> {
        let stream_id = match packet {
            [hi, lo, ..] => u16::from_be_bytes([*hi, *lo]),
            _ => return Err(BusError::Disconnected),
        };
        if self.reject_stream == Some(stream_id) {
            return Err(BusError::Rejected {
                stream_id,
                reason: "stream blocked".to_string(),
            });
        }
        self.packets.push(packet.to_vec());
        Ok(())
    }
}
