//! Domain records
//!
//! Input records handed to the persisters, and the [`Record`] variant that
//! gives each packable item its wire size and layout.

use crate::codec::{estimate_str_size, HexEncode};
use crate::packer::Packable;
use crate::packet::PacketBuffer;
use serde::{Deserialize, Serialize};

/// Encoded size of one `(channel, value)` sample pair
pub const SAMPLE_PAIR_SIZE: usize = u8::WIDTH + f32::WIDTH;

/// Encoded size of a GPS message
pub const GPS_MESSAGE_SIZE: usize = i64::WIDTH + 3 * f32::WIDTH;

/// Space reserved for the fixed fields of a sensor configuration record
///
/// Larger than the 3 bytes actually written; receivers rely on the
/// resulting packet boundaries.
pub const SENSOR_FIXED_RESERVE: usize = 6;

/// Board description
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoardInfo {
    pub board_id: i64,
    pub board_type: String,
    pub fw_revision: String,
    pub serial: String,
    /// Wall-clock timestamp (ms)
    pub timestamp: i64,
}

impl BoardInfo {
    pub fn new(
        board_id: i64,
        board_type: impl Into<String>,
        fw_revision: impl Into<String>,
        serial: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            board_id,
            board_type: board_type.into(),
            fw_revision: fw_revision.into(),
            serial: serial.into(),
            timestamp,
        }
    }
}

/// Sensor channel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub sensor_id: u16,
    pub board_id: u8,
    pub name: String,
    pub serial: String,
    pub measurement_units: String,
    pub enabled: bool,
}

impl SensorConfig {
    /// Create an enabled sensor configuration
    pub fn new(
        sensor_id: u16,
        board_id: u8,
        name: impl Into<String>,
        serial: impl Into<String>,
        measurement_units: impl Into<String>,
    ) -> Self {
        Self {
            sensor_id,
            board_id,
            name: name.into(),
            serial: serial.into(),
            measurement_units: measurement_units.into(),
            enabled: true,
        }
    }

    /// Same configuration, disabled
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// One evaluated sample from a sensor channel
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SampleRecord {
    pub channel: u8,
    pub board_id: u8,
    /// Wall-clock collection time (ms)
    pub collected_timestamp: i64,
    /// Device tick at sampling time
    pub on_board_timestamp: i32,
    pub evaluated_value: f64,
    /// Valid when > 0
    pub latitude: f64,
    /// Valid when > 0
    pub longitude: f64,
    /// Valid when > 0
    pub altitude: f64,
}

impl SampleRecord {
    /// Create a sample without position
    pub fn new(
        channel: u8,
        collected_timestamp: i64,
        on_board_timestamp: i32,
        evaluated_value: f64,
    ) -> Self {
        Self {
            channel,
            collected_timestamp,
            on_board_timestamp,
            evaluated_value,
            ..Default::default()
        }
    }

    /// Attach a position to the sample
    pub fn with_position(mut self, latitude: f64, longitude: f64, altitude: f64) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self.altitude = altitude;
        self
    }

    /// Whether the sample carries a usable fix
    pub fn has_fix(&self) -> bool {
        self.latitude > 0.0
    }
}

/// Position sent once per sample batch
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GpsFix {
    /// Wall-clock timestamp of the bucket the fix came from (ms)
    pub timestamp: i64,
    pub latitude: f32,
    pub longitude: f32,
    pub altitude: f32,
}

impl GpsFix {
    /// Build a fix from a sample, zeroing non-positive coordinates
    pub fn from_sample(sample: &SampleRecord, timestamp: i64) -> Self {
        Self {
            timestamp,
            latitude: positive_or_zero(sample.latitude) as f32,
            longitude: positive_or_zero(sample.longitude) as f32,
            altitude: positive_or_zero(sample.altitude) as f32,
        }
    }
}

impl Packable for GpsFix {
    fn estimated_size(&self) -> usize {
        GPS_MESSAGE_SIZE
    }

    fn append_to(&self, buffer: &mut PacketBuffer) {
        buffer.push(self.timestamp);
        buffer.push(self.latitude);
        buffer.push(self.longitude);
        buffer.push(self.altitude);
    }
}

fn positive_or_zero(value: f64) -> f64 {
    if value > 0.0 {
        value
    } else {
        0.0
    }
}

/// A packable item
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Record<'a> {
    Board(&'a BoardInfo),
    Sensor(&'a SensorConfig),
    Sample { channel: u8, value: f32 },
}

impl Packable for Record<'_> {
    fn estimated_size(&self) -> usize {
        match self {
            Record::Board(board) => {
                estimate_str_size(&board.board_type)
                    + estimate_str_size(&board.fw_revision)
                    + estimate_str_size(&board.serial)
                    + i64::WIDTH
            }
            Record::Sensor(sensor) => {
                estimate_str_size(&sensor.name)
                    + estimate_str_size(&sensor.serial)
                    + estimate_str_size(&sensor.measurement_units)
                    + SENSOR_FIXED_RESERVE
            }
            Record::Sample { .. } => SAMPLE_PAIR_SIZE,
        }
    }

    fn append_to(&self, buffer: &mut PacketBuffer) {
        match *self {
            Record::Board(board) => {
                buffer.push(board.board_id);
                buffer.push_str(&board.board_type);
                buffer.push_str(&board.fw_revision);
                buffer.push_str(&board.serial);
            }
            Record::Sensor(sensor) => {
                buffer.push(sensor.sensor_id);
                buffer.push(sensor.board_id);
                buffer.push_str(&sensor.name);
                buffer.push_str(&sensor.serial);
                buffer.push_str(&sensor.measurement_units);
            }
            Record::Sample { channel, value } => {
                buffer.push(channel);
                buffer.push(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appended_size(record: Record<'_>) -> usize {
        let mut buffer = PacketBuffer::new(0, false);
        record.append_to(&mut buffer);
        buffer.size_bytes()
    }

    #[test]
    fn test_board_size_matches_encoding() {
        let board = BoardInfo::new(3, "ExpShield1", "R1.2", "SN-0042", 0);
        let record = Record::Board(&board);
        // 11 + 5 + 8 string bytes + 8 fixed
        assert_eq!(record.estimated_size(), 32);
        assert_eq!(record.estimated_size(), appended_size(record));
    }

    #[test]
    fn test_sensor_size_covers_encoding() {
        let sensor = SensorConfig::new(10, 1, "NO2", "B43F", "ppb");
        let record = Record::Sensor(&sensor);
        // 4 + 5 + 4 string bytes + 6 reserved
        assert_eq!(record.estimated_size(), 19);
        // sensor_id (2) + board_id (1) + strings
        assert_eq!(appended_size(record), 16);
    }

    #[test]
    fn test_sample_pair_size() {
        let record = Record::Sample {
            channel: 2,
            value: 21.5,
        };
        assert_eq!(record.estimated_size(), 5);
        assert_eq!(appended_size(record), 5);
    }

    #[test]
    fn test_gps_fix_clamps_negative() {
        let sample = SampleRecord::new(0, 0, 0, 1.0).with_position(45.8, -8.6, -3.0);
        let fix = GpsFix::from_sample(&sample, 60_000);
        assert_eq!(fix.latitude, 45.8f64 as f32);
        assert_eq!(fix.longitude, 0.0);
        assert_eq!(fix.altitude, 0.0);
        assert_eq!(fix.timestamp, 60_000);
    }

    #[test]
    fn test_gps_layout_size() {
        let mut buffer = PacketBuffer::new(2, true);
        GpsFix::default().append_to(&mut buffer);
        assert_eq!(buffer.size_bytes(), GPS_MESSAGE_SIZE);
        assert_eq!(GPS_MESSAGE_SIZE, 20);
    }

    #[test]
    fn test_has_fix() {
        let sample = SampleRecord::new(0, 0, 0, 1.0);
        assert!(!sample.has_fix());
        assert!(!sample.clone().with_position(0.0, 9.0, 100.0).has_fix());
        assert!(sample.with_position(1.0, 0.0, 0.0).has_fix());
    }
}
