//! # LoRaPack - Hex-encoded telemetry packetizer for LoRa links
//!
//! Packs board descriptions, sensor configurations and time-bucketed samples
//! into LoRaWAN-sized packets, encoded as uppercase big-endian hex.
//!
//! ## Key Features
//!
//! - **Greedy packing**: records fill each packet up to the transport's
//!   current packet length
//! - **Shared headers**: one timestamp per board batch, one per sample bucket
//! - **Observable drops**: oversize records are counted, never split
//! - **Pluggable transport**: anything implementing [`Transport`]
//!
//! ## Quick Start
//!
//! ```rust
//! use lorapack::{BoardInfo, HexReader, LinkConfig, LoRaPersister, MemoryTransport};
//!
//! let mut persister = LoRaPersister::new(MemoryTransport::new(51), LinkConfig::default()).unwrap();
//!
//! let boards = [BoardInfo::new(1, "Host", "1.0", "SN-001", 1_700_000_000_000)];
//! let report = persister.add_boards_info(&boards).unwrap();
//! assert_eq!(report.packets_sent, 1);
//!
//! // Decode what went over the air
//! let packet = &persister.transport().sent()[0];
//! let mut reader = HexReader::new(&packet.payload).unwrap();
//! assert_eq!(reader.read_i64().unwrap(), 1_700_000_000_000);
//! assert_eq!(reader.read_i64().unwrap(), 1);
//! assert_eq!(reader.read_string().unwrap(), "Host");
//! ```
//!
//! ## Modules
//!
//! - [`codec`]: Hex encoding of primitives and strings, and decoding
//! - [`packet`]: Packet buffer and headers
//! - [`record`]: Board, sensor, sample and GPS records
//! - [`packer`]: Greedy batch packer
//! - [`aggregator`]: Time-bucket aggregation of samples
//! - [`policy`]: Per-record-kind persistence policies
//! - [`persister`]: Session facade over a transport
//! - [`transport`]: Radio link abstraction
//! - [`metrics`]: Packing statistics

// Modules
pub mod aggregator;
pub mod codec;
pub mod config;
pub mod error;
pub mod metrics;
pub mod packer;
pub mod packet;
pub mod persister;
pub mod policy;
pub mod record;
pub mod transport;

// Re-exports for convenient access
pub use aggregator::{Aggregator, SampleBatch, TimeBucket};
pub use codec::{encode, encode_str, estimate_str_size, EncodedField, HexEncode, HexReader};
pub use config::LinkConfig;
pub use error::{DecodeError, PackError, Result, TransportError};
pub use metrics::{PackMetrics, PackReport};
pub use packer::{pack_records, BatchPacker, Packable};
pub use packet::{PacketBuffer, PacketHeader};
pub use persister::LoRaPersister;
pub use policy::{
    BoardsInfoPolicy, SamplesPolicy, SensorsConfigPolicy, BOARDS_INFO_PORT, GPS_PORT,
    SAMPLES_PORT, SENSORS_CONFIG_PORT,
};
pub use record::{BoardInfo, GpsFix, Record, SampleRecord, SensorConfig};
pub use transport::{MemoryTransport, SentPacket, Transport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
