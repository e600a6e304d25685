//! Configuration types for LoRaPack

use crate::error::{PackError, Result};
use serde::{Deserialize, Serialize};

/// Maximum payload per LoRaWAN data rate (DR0..DR7)
pub const PACKET_LENGTH_BY_DATA_RATE: [usize; 8] = [51, 51, 51, 115, 222, 222, 222, 222];

/// Highest supported data rate
pub const MAX_DATA_RATE: u8 = 7;

/// Link and session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Serial endpoint of the radio
    pub endpoint: String,

    /// Application EUI; empty keeps the radio's stored value
    pub app_eui: String,

    /// Application key; empty keeps the radio's stored value
    pub app_key: String,

    /// Device EUI; empty keeps the radio's stored value
    pub dev_eui: String,

    /// LoRaWAN data rate (default: 5)
    pub data_rate: u8,

    /// Transmit power in dBm (default: 14)
    pub tx_power: i8,

    /// Maximum payload override in bytes; 0 derives it from the data rate
    pub packet_length: usize,

    /// Join attempts before giving up
    pub max_retry: u32,

    /// Disable adaptive data rate
    pub disable_adr: bool,

    /// Send samples unconfirmed
    pub force_unconfirmed: bool,

    /// Sample aggregation window in seconds
    pub aggregation_factor: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            endpoint: "/dev/ttyUSB0".to_string(),
            app_eui: String::new(),
            app_key: String::new(),
            dev_eui: String::new(),
            data_rate: 5,
            tx_power: 14,
            packet_length: 0,
            max_retry: 5,
            disable_adr: false,
            force_unconfirmed: false,
            aggregation_factor: 1,
        }
    }
}

impl LinkConfig {
    /// Create a configuration for a specific endpoint
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Maximum payload at `data_rate`, honoring the override
    ///
    /// Unknown data rates fall back to DR0.
    pub fn max_packet_length(&self, data_rate: u8) -> usize {
        if self.packet_length != 0 {
            return self.packet_length;
        }
        PACKET_LENGTH_BY_DATA_RATE
            .get(data_rate as usize)
            .copied()
            .unwrap_or(PACKET_LENGTH_BY_DATA_RATE[0])
    }

    /// Whether samples are sent as confirmed messages
    pub fn samples_confirmed(&self) -> bool {
        !self.force_unconfirmed
    }

    /// Check the configuration for values the packer cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.aggregation_factor == 0 {
            return Err(PackError::InvalidConfig(
                "aggregation_factor must be at least 1".to_string(),
            ));
        }
        if self.data_rate > MAX_DATA_RATE {
            return Err(PackError::InvalidConfig(format!(
                "data_rate {} out of range 0..={}",
                self.data_rate, MAX_DATA_RATE
            )));
        }
        if self.max_retry == 0 {
            return Err(PackError::InvalidConfig(
                "max_retry must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_config_default() {
        let config = LinkConfig::default();
        assert_eq!(config.endpoint, "/dev/ttyUSB0");
        assert_eq!(config.data_rate, 5);
        assert_eq!(config.tx_power, 14);
        assert_eq!(config.max_retry, 5);
        assert_eq!(config.aggregation_factor, 1);
        assert!(config.samples_confirmed());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_packet_length_by_data_rate() {
        let config = LinkConfig::default();
        assert_eq!(config.max_packet_length(0), 51);
        assert_eq!(config.max_packet_length(3), 115);
        assert_eq!(config.max_packet_length(5), 222);
        assert_eq!(config.max_packet_length(12), 51);
    }

    #[test]
    fn test_max_packet_length_override() {
        let config = LinkConfig {
            packet_length: 20,
            ..Default::default()
        };
        assert_eq!(config.max_packet_length(5), 20);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero_factor = LinkConfig {
            aggregation_factor: 0,
            ..Default::default()
        };
        assert!(matches!(
            zero_factor.validate(),
            Err(PackError::InvalidConfig(_))
        ));

        let bad_dr = LinkConfig {
            data_rate: 9,
            ..Default::default()
        };
        assert!(bad_dr.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: LinkConfig = serde_json::from_str(
            r#"{ "endpoint": "/dev/ttyACM0", "packet_length": 64, "force_unconfirmed": true }"#,
        )
        .unwrap();
        assert_eq!(config.endpoint, "/dev/ttyACM0");
        assert_eq!(config.packet_length, 64);
        assert!(!config.samples_confirmed());
        assert_eq!(config.data_rate, 5);
    }
}
