// LoRaPack - Hex-encoded telemetry packetizer for LoRa links
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! High-level persister API
//!
//! [`LoRaPersister`] owns a [`Transport`] and the three persistence policies,
//! and keeps [`PackMetrics`] across calls.
//!
//! # Example
//!
//! ```rust
//! use lorapack::{LinkConfig, LoRaPersister, MemoryTransport, SampleRecord};
//!
//! let config = LinkConfig {
//!     data_rate: 0,
//!     aggregation_factor: 60,
//!     ..Default::default()
//! };
//! let transport = MemoryTransport::from_config(&config);
//! let mut persister = LoRaPersister::new(transport, config).unwrap();
//!
//! persister.start().unwrap();
//! persister
//!     .add_samples(&[SampleRecord::new(0, 1_000, 42, 21.5)])
//!     .unwrap();
//!
//! assert_eq!(persister.transport().sent().len(), 1);
//! ```

use crate::config::LinkConfig;
use crate::error::{PackError, Result, TransportError};
use crate::metrics::{PackMetrics, PackReport};
use crate::policy::{
    BoardsInfoPolicy, SamplesPolicy, SensorsConfigPolicy, BOARDS_INFO_PORT, SAMPLES_PORT,
    SENSORS_CONFIG_PORT,
};
use crate::record::{BoardInfo, SampleRecord, SensorConfig};
use crate::transport::Transport;
use log::{info, warn};

/// Session over one radio link
pub struct LoRaPersister<T: Transport> {
    transport: T,
    config: LinkConfig,
    boards: BoardsInfoPolicy,
    sensors: SensorsConfigPolicy,
    samples: SamplesPolicy,
    metrics: PackMetrics,
}

impl<T: Transport> LoRaPersister<T> {
    /// Create a persister; the configuration is validated here
    pub fn new(transport: T, config: LinkConfig) -> Result<Self> {
        config.validate()?;

        let mut samples = SamplesPolicy::new(config.aggregation_factor)?;
        if !config.samples_confirmed() {
            samples = samples.unconfirmed();
        }

        Ok(Self {
            transport,
            config,
            boards: BoardsInfoPolicy,
            sensors: SensorsConfigPolicy,
            samples,
            metrics: PackMetrics::new(),
        })
    }

    /// Open the link, apply the session parameters and join the network
    pub fn start(&mut self) -> Result<()> {
        let config = &self.config;
        info!("Opening LoRa link on {}", config.endpoint);
        self.transport
            .open(&config.endpoint)
            .map_err(|e| PackError::Session(format!("cannot open {}: {}", config.endpoint, e)))?;

        if let Err(e) = self.transport.set_tx_power(config.tx_power) {
            warn!("Cannot set TX power to {} dBm: {}", config.tx_power, e);
        }
        if let Err(e) = self.transport.set_data_rate(config.data_rate) {
            warn!("Cannot set data rate DR{}: {}", config.data_rate, e);
        }
        if let Err(e) = self.transport.set_adr(!config.disable_adr) {
            warn!("Cannot change ADR setting: {}", e);
        }

        apply_identifier(
            &mut self.transport,
            "application EUI",
            &config.app_eui,
            T::set_app_eui,
        )?;
        apply_identifier(
            &mut self.transport,
            "application key",
            &config.app_key,
            T::set_app_key,
        )?;
        apply_identifier(
            &mut self.transport,
            "device EUI",
            &config.dev_eui,
            T::set_device_eui,
        )?;

        join_network(&mut self.transport, config.max_retry)?;
        info!(
            "LoRa session started (DR{}, {} byte packets)",
            config.data_rate,
            self.transport.packet_length()
        );
        Ok(())
    }

    /// Close the link
    pub fn stop(&mut self) {
        self.transport.close();
        info!("LoRa session stopped");
    }

    /// Send board descriptions on the boards-info port
    pub fn add_boards_info(&mut self, boards: &[BoardInfo]) -> Result<PackReport> {
        let result = self.boards.persist(&mut self.transport, boards);
        self.track(BOARDS_INFO_PORT, result)
    }

    /// Send enabled sensor configurations on the sensors-config port
    pub fn add_sensors_config(&mut self, sensors: &[SensorConfig]) -> Result<PackReport> {
        let result = self.sensors.persist(&mut self.transport, sensors);
        self.track(SENSORS_CONFIG_PORT, result)
    }

    /// Aggregate and send samples, preceded by the GPS fix if any
    pub fn add_samples(&mut self, samples: &[SampleRecord]) -> Result<PackReport> {
        let result = self.samples.persist(&mut self.transport, samples);
        self.track(SAMPLES_PORT, result)
    }

    fn track(&mut self, port: u8, result: Result<PackReport>) -> Result<PackReport> {
        match &result {
            Ok(report) => {
                if report.has_drops() {
                    warn!(
                        "{} record(s) dropped on port {}",
                        report.records_dropped, port
                    );
                }
                self.metrics.record(port, report);
            }
            Err(PackError::Transport {
                packets_sent,
                bytes_sent,
                ..
            }) => {
                // Packets accepted before the failure still went over the air
                let partial = PackReport {
                    packets_sent: *packets_sent,
                    bytes_sent: *bytes_sent,
                    ..Default::default()
                };
                self.metrics.record(port, &partial);
                self.metrics.record_failure();
            }
            Err(_) => self.metrics.record_failure(),
        }
        result
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Statistics since creation
    pub fn metrics(&self) -> &PackMetrics {
        &self.metrics
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the persister and hand back the transport
    pub fn into_transport(self) -> T {
        self.transport
    }
}

/// Join with up to `attempts` tries
fn join_network<T: Transport>(transport: &mut T, attempts: u32) -> Result<()> {
    for attempt in 1..=attempts {
        match transport.join() {
            Ok(()) => {
                info!("Joined network on attempt {}", attempt);
                return Ok(());
            }
            Err(e) => warn!("Join attempt {}/{} failed: {}", attempt, attempts, e),
        }
    }
    Err(PackError::Session(format!(
        "join failed after {} attempts",
        attempts
    )))
}

/// Apply a device identifier; empty values keep the radio's stored one
fn apply_identifier<T: Transport>(
    transport: &mut T,
    name: &str,
    value: &str,
    set: fn(&mut T, &str) -> std::result::Result<(), TransportError>,
) -> Result<()> {
    if value.is_empty() {
        info!("No {} configured, keeping the radio's value", name);
        return Ok(());
    }
    set(transport, value).map_err(|e| PackError::Session(format!("cannot set {}: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketBuffer;
    use crate::transport::MemoryTransport;

    /// Transport that never joins and rejects identifiers
    #[derive(Default)]
    struct StubbornRadio {
        joins: u32,
        reject_identifiers: bool,
    }

    impl Transport for StubbornRadio {
        fn open(&mut self, _endpoint: &str) -> std::result::Result<(), TransportError> {
            Ok(())
        }

        fn close(&mut self) {}

        fn send_payload(&mut self, _packet: &PacketBuffer) -> std::result::Result<(), TransportError> {
            Ok(())
        }

        fn packet_length(&self) -> usize {
            51
        }

        fn set_app_eui(&mut self, _app_eui: &str) -> std::result::Result<(), TransportError> {
            if self.reject_identifiers {
                return Err(TransportError::Rejected {
                    reason: "bad EUI".to_string(),
                });
            }
            Ok(())
        }

        fn join(&mut self) -> std::result::Result<(), TransportError> {
            self.joins += 1;
            Err(TransportError::Timeout { timeout_ms: 10_000 })
        }
    }

    #[test]
    fn test_new_validates_config() {
        let config = LinkConfig {
            aggregation_factor: 0,
            ..Default::default()
        };
        let result = LoRaPersister::new(MemoryTransport::new(51), config);
        assert!(matches!(result, Err(PackError::InvalidConfig(_))));
    }

    #[test]
    fn test_start_opens_and_joins() {
        let config = LinkConfig {
            data_rate: 3,
            ..Default::default()
        };
        let transport = MemoryTransport::from_config(&config);
        let mut persister = LoRaPersister::new(transport, config).unwrap();
        persister.start().unwrap();

        assert!(persister.transport().is_open());
        assert!(persister.transport().is_joined());
        assert_eq!(persister.transport().data_rate(), Some(3));
        assert_eq!(persister.transport().packet_length(), 115);

        persister.stop();
        assert!(!persister.transport().is_open());
    }

    #[test]
    fn test_join_gives_up_after_max_retry() {
        let config = LinkConfig {
            max_retry: 3,
            ..Default::default()
        };
        let mut persister = LoRaPersister::new(StubbornRadio::default(), config).unwrap();
        assert!(matches!(persister.start(), Err(PackError::Session(_))));
        assert_eq!(persister.transport().joins, 3);
    }

    #[test]
    fn test_rejected_identifier_aborts_start() {
        let config = LinkConfig {
            app_eui: "70B3D57ED0000000".to_string(),
            ..Default::default()
        };
        let radio = StubbornRadio {
            reject_identifiers: true,
            ..Default::default()
        };
        let mut persister = LoRaPersister::new(radio, config).unwrap();
        assert!(matches!(persister.start(), Err(PackError::Session(_))));
        assert_eq!(persister.transport().joins, 0);
    }

    #[test]
    fn test_force_unconfirmed() {
        let config = LinkConfig {
            force_unconfirmed: true,
            ..Default::default()
        };
        let mut persister = LoRaPersister::new(MemoryTransport::new(51), config).unwrap();
        persister
            .add_samples(&[SampleRecord::new(0, 1_000, 1, 2.0)])
            .unwrap();
        assert!(!persister.transport().sent()[0].confirmed);
    }

    #[test]
    fn test_metrics_per_port() {
        let mut persister =
            LoRaPersister::new(MemoryTransport::new(51), LinkConfig::default()).unwrap();
        persister
            .add_boards_info(&[BoardInfo::new(1, "Host", "1.0", "A", 1_000)])
            .unwrap();
        persister
            .add_sensors_config(&[SensorConfig::new(1, 0, "NO2", "S1", "ppb")])
            .unwrap();
        persister
            .add_samples(&[SampleRecord::new(0, 1_000, 1, 2.0)])
            .unwrap();

        let metrics = persister.metrics();
        assert_eq!(metrics.total.packets_sent, 3);
        assert_eq!(metrics.by_port[&BOARDS_INFO_PORT].records_packed, 1);
        assert_eq!(metrics.by_port[&SENSORS_CONFIG_PORT].records_packed, 1);
        assert_eq!(metrics.by_port[&SAMPLES_PORT].records_packed, 1);
        assert_eq!(metrics.failed_batches, 0);
    }

    #[test]
    fn test_failure_counted_in_metrics() {
        let transport = MemoryTransport::new(51).fail_on_attempt(1);
        let mut persister = LoRaPersister::new(transport, LinkConfig::default()).unwrap();
        let result = persister.add_boards_info(&[BoardInfo::new(1, "Host", "1.0", "A", 1_000)]);

        assert!(result.is_err());
        assert_eq!(persister.metrics().failed_batches, 1);
        assert_eq!(persister.metrics().total.packets_sent, 0);
    }

    #[test]
    fn test_partial_failure_keeps_sent_packets_in_metrics() {
        // sensors estimate 17 bytes and encode to 14; one per 20-byte packet
        let transport = MemoryTransport::new(20).fail_on_attempt(2);
        let mut persister = LoRaPersister::new(transport, LinkConfig::default()).unwrap();
        let sensors: Vec<_> = (0..3)
            .map(|id| SensorConfig::new(id, 0, "NO2", "S1", "ppb"))
            .collect();

        let result = persister.add_sensors_config(&sensors);
        assert!(matches!(
            result,
            Err(PackError::Transport {
                packets_sent: 1,
                ..
            })
        ));

        let metrics = persister.metrics();
        assert_eq!(persister.transport().sent().len(), 1);
        assert_eq!(metrics.failed_batches, 1);
        assert_eq!(metrics.total.packets_sent, 1);
        assert_eq!(metrics.total.bytes_sent, 14);
        assert_eq!(metrics.by_port[&SENSORS_CONFIG_PORT].packets_sent, 1);
        assert!(metrics.report().contains("Packets sent: 1"));
    }
}
