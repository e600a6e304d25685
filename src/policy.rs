//! Persistence policies
//!
//! Each policy binds one record kind to a logical port, a packet header and
//! the [`BatchPacker`]:
//!
//! | Policy | Port | Header | Confirmed |
//! |---|---|---|---|
//! | [`BoardsInfoPolicy`] | 3 | first board's timestamp | no |
//! | [`SensorsConfigPolicy`] | 4 | none | no |
//! | [`SamplesPolicy`] | 1 | per bucket | yes, unless forced off |
//! | GPS fix of a sample batch | 2 | none | always |

use crate::aggregator::{Aggregator, TimeBucket};
use crate::error::{PackError, Result};
use crate::metrics::PackReport;
use crate::packer::{pack_records, BatchPacker};
use crate::packet::PacketHeader;
use crate::record::{BoardInfo, Record, SampleRecord, SensorConfig, GPS_MESSAGE_SIZE};
use crate::transport::Transport;
use log::warn;

/// Port for sample packets
pub const SAMPLES_PORT: u8 = 1;
/// Port for the GPS message
pub const GPS_PORT: u8 = 2;
/// Port for board descriptions
pub const BOARDS_INFO_PORT: u8 = 3;
/// Port for sensor configurations
pub const SENSORS_CONFIG_PORT: u8 = 4;

/// Sends board descriptions under one shared timestamp
#[derive(Debug, Clone, Copy, Default)]
pub struct BoardsInfoPolicy;

impl BoardsInfoPolicy {
    pub fn persist<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        boards: &[BoardInfo],
    ) -> Result<PackReport> {
        let Some(first) = boards.first() else {
            return Ok(PackReport::default());
        };

        let records: Vec<_> = boards.iter().map(Record::Board).collect();
        pack_records(
            transport,
            BOARDS_INFO_PORT,
            false,
            PacketHeader::Timestamp(first.timestamp),
            &records,
        )
    }
}

/// Sends the configuration of enabled sensors
#[derive(Debug, Clone, Copy, Default)]
pub struct SensorsConfigPolicy;

impl SensorsConfigPolicy {
    pub fn persist<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        sensors: &[SensorConfig],
    ) -> Result<PackReport> {
        let records: Vec<_> = sensors
            .iter()
            .filter(|sensor| sensor.enabled)
            .map(Record::Sensor)
            .collect();
        pack_records(
            transport,
            SENSORS_CONFIG_PORT,
            false,
            PacketHeader::None,
            &records,
        )
    }
}

/// Sends samples grouped by time bucket, preceded by at most one GPS fix
///
/// The GPS fix always goes out confirmed; only sample packets follow the
/// confirmation setting.
#[derive(Debug, Clone, Copy)]
pub struct SamplesPolicy {
    aggregator: Aggregator,
    confirmed: bool,
}

impl SamplesPolicy {
    /// Confirmed sample policy with `aggregation_factor`-second buckets
    pub fn new(aggregation_factor: u32) -> Result<Self> {
        Ok(Self {
            aggregator: Aggregator::new(aggregation_factor)?,
            confirmed: true,
        })
    }

    /// Send sample packets unconfirmed
    pub fn unconfirmed(mut self) -> Self {
        self.confirmed = false;
        self
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn persist<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        samples: &[SampleRecord],
    ) -> Result<PackReport> {
        let batch = self.aggregator.aggregate(samples);
        let mut report = PackReport::default();

        if let Some(fix) = batch.gps {
            report = pack_records(transport, GPS_PORT, true, PacketHeader::None, &[fix])?;
            if report.has_drops() {
                warn!(
                    "GPS fix not sent on port {}: packet length {} is below {} bytes",
                    GPS_PORT,
                    transport.packet_length(),
                    GPS_MESSAGE_SIZE
                );
            }
        }
        let gps = report;

        let samples_report =
            pack_buckets(transport, SAMPLES_PORT, self.confirmed, &batch.buckets).map_err(
                |e| match e {
                    PackError::Transport {
                        packets_sent,
                        bytes_sent,
                        source,
                    } => PackError::Transport {
                        packets_sent: packets_sent + gps.packets_sent,
                        bytes_sent: bytes_sent + gps.bytes_sent,
                        source,
                    },
                    other => other,
                },
            )?;
        report.merge(&samples_report);
        Ok(report)
    }
}

/// Pack each bucket under its own header; continuation packets repeat it
fn pack_buckets<T: Transport + ?Sized>(
    transport: &mut T,
    port: u8,
    confirmed: bool,
    buckets: &[TimeBucket<'_>],
) -> Result<PackReport> {
    let mut packer = BatchPacker::new(transport, port, confirmed);
    for bucket in buckets {
        packer.start_segment(bucket.header())?;
        for sample in &bucket.samples {
            packer.push(&Record::Sample {
                channel: sample.channel,
                value: sample.evaluated_value as f32,
            })?;
        }
    }
    packer.finish()
}
