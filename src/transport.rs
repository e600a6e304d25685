// LoRaPack - Hex-encoded telemetry packetizer for LoRa links
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Transport abstraction
//!
//! The radio driver lives outside this crate. Persisters only need a
//! [`Transport`]: something that opens a link, takes session parameters,
//! and sends one encoded packet at a time, blocking until the radio has
//! accepted or refused it. Retries and duty-cycle waits happen inside the
//! transport.

use crate::config::LinkConfig;
use crate::error::TransportError;
use crate::packet::PacketBuffer;
use std::collections::VecDeque;

/// Link to the radio
pub trait Transport {
    /// Open the link at `endpoint`
    fn open(&mut self, endpoint: &str) -> Result<(), TransportError>;

    /// Close the link
    fn close(&mut self);

    /// Send one packet, all-or-nothing
    fn send_payload(&mut self, packet: &PacketBuffer) -> Result<(), TransportError>;

    /// Current maximum payload size in bytes; may change between sends
    fn packet_length(&self) -> usize;

    fn set_data_rate(&mut self, _data_rate: u8) -> Result<(), TransportError> {
        Ok(())
    }

    fn set_tx_power(&mut self, _tx_power: i8) -> Result<(), TransportError> {
        Ok(())
    }

    fn set_adr(&mut self, _enabled: bool) -> Result<(), TransportError> {
        Ok(())
    }

    fn set_app_eui(&mut self, _app_eui: &str) -> Result<(), TransportError> {
        Ok(())
    }

    fn set_app_key(&mut self, _app_key: &str) -> Result<(), TransportError> {
        Ok(())
    }

    fn set_device_eui(&mut self, _dev_eui: &str) -> Result<(), TransportError> {
        Ok(())
    }

    /// Join the network
    fn join(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// A packet as handed to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPacket {
    pub port: u8,
    pub confirmed: bool,
    /// Hex-encoded payload
    pub payload: String,
}

impl SentPacket {
    /// Decoded payload size in bytes
    pub fn size(&self) -> usize {
        self.payload.len() / 2
    }
}

/// Statistics about transport usage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportMetrics {
    /// Packets accepted
    pub packets_sent: u64,
    /// Payload bytes accepted
    pub bytes_sent: u64,
    /// Sends refused
    pub send_failures: u64,
}

/// In-memory transport recording every packet it accepts
///
/// Useful for tests and for hosts that forward packets by other means.
/// Failures can be scripted per send attempt.
#[derive(Debug)]
pub struct MemoryTransport {
    packet_length: usize,
    is_open: bool,
    joined: bool,
    sent: Vec<SentPacket>,
    attempts: usize,
    fail_on: VecDeque<usize>,
    data_rate: Option<u8>,
    config: Option<LinkConfig>,
    metrics: TransportMetrics,
}

impl MemoryTransport {
    /// Create an open transport with a fixed packet length
    pub fn new(packet_length: usize) -> Self {
        Self {
            packet_length,
            is_open: true,
            joined: false,
            sent: Vec::new(),
            attempts: 0,
            fail_on: VecDeque::new(),
            data_rate: None,
            config: None,
            metrics: TransportMetrics::default(),
        }
    }

    /// Create a closed transport whose packet length follows the data rate
    /// rules of `config`
    pub fn from_config(config: &LinkConfig) -> Self {
        Self {
            is_open: false,
            data_rate: Some(config.data_rate),
            config: Some(config.clone()),
            ..Self::new(config.max_packet_length(config.data_rate))
        }
    }

    /// Create a closed transport; it must be opened before sending
    pub fn closed(packet_length: usize) -> Self {
        Self {
            is_open: false,
            ..Self::new(packet_length)
        }
    }

    /// Refuse the `attempt`-th send (1-based, counted over the transport's life)
    pub fn fail_on_attempt(mut self, attempt: usize) -> Self {
        self.fail_on.push_back(attempt);
        self
    }

    /// Change the advertised packet length
    pub fn set_packet_length(&mut self, packet_length: usize) {
        self.packet_length = packet_length;
    }

    /// Packets accepted so far, in send order
    pub fn sent(&self) -> &[SentPacket] {
        &self.sent
    }

    /// Remove and return the accepted packets
    pub fn take_sent(&mut self) -> Vec<SentPacket> {
        std::mem::take(&mut self.sent)
    }

    /// Number of send attempts, including refused ones
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn is_joined(&self) -> bool {
        self.joined
    }

    /// Last data rate applied through the session setters
    pub fn data_rate(&self) -> Option<u8> {
        self.data_rate
    }

    pub fn metrics(&self) -> &TransportMetrics {
        &self.metrics
    }
}

impl Transport for MemoryTransport {
    fn open(&mut self, _endpoint: &str) -> Result<(), TransportError> {
        self.is_open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.is_open = false;
        self.joined = false;
    }

    fn send_payload(&mut self, packet: &PacketBuffer) -> Result<(), TransportError> {
        if !self.is_open {
            return Err(TransportError::Disconnected {
                reason: "Transport is closed".to_string(),
            });
        }

        self.attempts += 1;
        if self.fail_on.front() == Some(&self.attempts) {
            self.fail_on.pop_front();
            self.metrics.send_failures += 1;
            return Err(TransportError::Rejected {
                reason: format!("scripted failure on attempt {}", self.attempts),
            });
        }

        if packet.size_bytes() > self.packet_length {
            self.metrics.send_failures += 1;
            return Err(TransportError::InvalidPayloadLength {
                size: packet.size_bytes(),
                max: self.packet_length,
            });
        }

        self.metrics.packets_sent += 1;
        self.metrics.bytes_sent += packet.size_bytes() as u64;
        self.sent.push(SentPacket {
            port: packet.port(),
            confirmed: packet.is_confirmed(),
            payload: packet.payload().to_string(),
        });
        Ok(())
    }

    fn packet_length(&self) -> usize {
        self.packet_length
    }

    fn set_data_rate(&mut self, data_rate: u8) -> Result<(), TransportError> {
        self.data_rate = Some(data_rate);
        if let Some(config) = &self.config {
            self.packet_length = config.max_packet_length(data_rate);
        }
        Ok(())
    }

    fn join(&mut self) -> Result<(), TransportError> {
        if !self.is_open {
            return Err(TransportError::Session("join on closed link".to_string()));
        }
        self.joined = true;
        Ok(())
    }
}
