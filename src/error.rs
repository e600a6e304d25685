//! Error types for LoRaPack
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Result type alias for packing operations
pub type Result<T> = std::result::Result<T, PackError>;

/// Main error type for packing operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PackError {
    /// The transport refused a packet; the rest of the batch was not attempted
    #[error("Transport failure after {packets_sent} packet(s): {source}")]
    Transport {
        /// Packets accepted by the transport before the failure
        packets_sent: usize,
        /// Payload bytes in those packets
        bytes_sent: usize,
        /// Underlying transport error
        #[source]
        source: TransportError,
    },

    /// Decoding error
    #[error("Decoding error: {0}")]
    Decode(#[from] DecodeError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Session could not be started
    #[error("Session error: {0}")]
    Session(String),
}

/// Errors while reading an encoded payload back
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Not enough characters left
    #[error("Payload too short: need {needed} chars at offset {offset}, have {available}")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Character is not a hexadecimal digit
    #[error("Invalid hex digit {digit:?} at offset {offset}")]
    InvalidDigit { offset: usize, digit: char },

    /// Payload has an odd number of characters
    #[error("Odd payload length: {0} chars")]
    OddLength(usize),

    /// String field without its zero terminator
    #[error("Unterminated string starting at offset {0}")]
    UnterminatedString(usize),
}

/// Errors reported by a transport
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Link is not open
    #[error("Disconnected: {reason}")]
    Disconnected { reason: String },

    /// Radio rejected the payload
    #[error("Payload rejected: {reason}")]
    Rejected { reason: String },

    /// No answer from the radio in time
    #[error("Timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Payload larger than the radio accepts at the current data rate
    #[error("Invalid payload length: {size} bytes (max: {max})")]
    InvalidPayloadLength { size: usize, max: usize },

    /// Session parameter or join failure
    #[error("Session command failed: {0}")]
    Session(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PackError::Transport {
            packets_sent: 2,
            bytes_sent: 80,
            source: TransportError::Rejected {
                reason: "mac_err".to_string(),
            },
        };
        let msg = format!("{}", err);
        assert!(msg.contains("2 packet"));
        assert!(msg.contains("mac_err"));
    }

    #[test]
    fn test_error_conversion() {
        let decode_err = DecodeError::OddLength(3);
        let pack_err: PackError = decode_err.into();
        assert!(matches!(pack_err, PackError::Decode(_)));
    }

    #[test]
    fn test_transport_error_source() {
        use std::error::Error as _;

        let err = PackError::Transport {
            packets_sent: 0,
            bytes_sent: 0,
            source: TransportError::Timeout { timeout_ms: 20_000 },
        };
        assert!(err.source().is_some());
    }
}
