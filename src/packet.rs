// LoRaPack - Hex-encoded telemetry packetizer for LoRa links
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Outgoing packet accumulator
//!
//! A [`PacketBuffer`] collects encoded fields for one radio payload. The
//! leading header of a packet is described separately by a plain-data
//! [`PacketHeader`], so re-priming a continuation packet with the same
//! header is an explicit [`PacketBuffer::reset`] call.
//!
//! # Packet Layouts
//!
//! ```text
//! samples:        [timestamp: i64] [board_timestamp: i32] ([channel: u8] [value: f32])*
//! boards info:    [timestamp: i64] ([board_id: i64] [type: str] [fw: str] [serial: str])*
//! sensors config: ([sensor_id: u16] [board_id: u8] [name: str] [serial: str] [units: str])*
//! gps:            [timestamp: i64] [latitude: f32] [longitude: f32] [altitude: f32]
//! ```

use crate::codec::{self, EncodedField, HexEncode};

/// Fields written at the start of every packet of a given kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacketHeader {
    /// No header
    #[default]
    None,
    /// Shared wall-clock timestamp (ms)
    Timestamp(i64),
    /// Bucket wall-clock timestamp (ms) and device tick
    Bucket {
        timestamp: i64,
        board_timestamp: i32,
    },
}

impl PacketHeader {
    /// Encoded size of the header, in bytes
    pub fn size(&self) -> usize {
        match self {
            PacketHeader::None => 0,
            PacketHeader::Timestamp(_) => i64::WIDTH,
            PacketHeader::Bucket { .. } => i64::WIDTH + i32::WIDTH,
        }
    }

    fn write(&self, out: &mut String) {
        match *self {
            PacketHeader::None => {}
            PacketHeader::Timestamp(timestamp) => timestamp.encode_hex(out),
            PacketHeader::Bucket {
                timestamp,
                board_timestamp,
            } => {
                timestamp.encode_hex(out);
                board_timestamp.encode_hex(out);
            }
        }
    }
}

/// Encoded payload for one outgoing radio packet
///
/// The buffer does no bounds checking; capacity is enforced by the packer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketBuffer {
    port: u8,
    confirmed: bool,
    chars: String,
    dirty: bool,
}

impl PacketBuffer {
    /// Create an empty buffer for the given logical port
    pub fn new(port: u8, confirmed: bool) -> Self {
        Self {
            port,
            confirmed,
            chars: String::new(),
            dirty: false,
        }
    }

    /// Drop accumulated characters, keeping port and confirmation flag
    pub fn clear(&mut self) {
        self.chars.clear();
        self.dirty = false;
    }

    /// Clear and write `header` at the start of the buffer
    ///
    /// A header alone does not make the buffer dirty.
    pub fn reset(&mut self, header: &PacketHeader) {
        self.clear();
        header.write(&mut self.chars);
    }

    /// Append an already encoded field
    pub fn append(&mut self, field: &EncodedField) {
        self.chars.push_str(field.as_str());
        self.dirty = true;
    }

    /// Encode and append a scalar
    pub fn push<T: HexEncode>(&mut self, value: T) {
        value.encode_hex(&mut self.chars);
        self.dirty = true;
    }

    /// Encode and append zero-terminated text
    pub fn push_str(&mut self, text: &str) {
        codec::encode_str_into(text, &mut self.chars);
        self.dirty = true;
    }

    /// Logical port (fPort)
    pub fn port(&self) -> u8 {
        self.port
    }

    /// Whether the radio should request a link-level acknowledgment
    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    /// True once anything beyond the header has been appended
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Encoded payload
    pub fn payload(&self) -> &str {
        &self.chars
    }

    /// Size in bytes once decoded from hex
    pub fn size_bytes(&self) -> usize {
        self.chars.len() / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer() {
        let buffer = PacketBuffer::new(4, false);
        assert_eq!(buffer.port(), 4);
        assert!(!buffer.is_confirmed());
        assert!(!buffer.is_dirty());
        assert_eq!(buffer.size_bytes(), 0);
    }

    #[test]
    fn test_append_marks_dirty() {
        let mut buffer = PacketBuffer::new(1, true);
        buffer.append(&codec::encode(0x0102u16));
        assert!(buffer.is_dirty());
        assert_eq!(buffer.size_bytes(), 2);
        assert_eq!(buffer.payload(), "0102");
    }

    #[test]
    fn test_clear_keeps_port_and_flag() {
        let mut buffer = PacketBuffer::new(3, true);
        buffer.push(7u32);
        buffer.clear();
        assert!(!buffer.is_dirty());
        assert_eq!(buffer.size_bytes(), 0);
        assert_eq!(buffer.port(), 3);
        assert!(buffer.is_confirmed());
    }

    #[test]
    fn test_reset_with_header_not_dirty() {
        let mut buffer = PacketBuffer::new(1, true);
        let header = PacketHeader::Bucket {
            timestamp: 1000,
            board_timestamp: 5,
        };
        buffer.reset(&header);
        assert!(!buffer.is_dirty());
        assert_eq!(buffer.size_bytes(), header.size());
        assert_eq!(buffer.payload(), "00000000000003E800000005");
    }

    #[test]
    fn test_push_str() {
        let mut buffer = PacketBuffer::new(4, false);
        buffer.push_str("ppb");
        assert_eq!(buffer.payload(), "70706200");
        assert_eq!(buffer.size_bytes(), codec::estimate_str_size("ppb"));
    }

    #[test]
    fn test_header_sizes() {
        assert_eq!(PacketHeader::None.size(), 0);
        assert_eq!(PacketHeader::Timestamp(0).size(), 8);
        assert_eq!(
            PacketHeader::Bucket {
                timestamp: 0,
                board_timestamp: 0
            }
            .size(),
            12
        );
    }
}
