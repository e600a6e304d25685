// LoRaPack - Hex-encoded telemetry packetizer for LoRa links
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Time-bucket aggregation of samples
//!
//! The [`Aggregator`] groups samples collected in the same wall-clock window
//! so they can share one packet header:
//!
//! - bucket key: `floor(collected_timestamp_ms / (1000 * aggregation_factor))`
//! - board timestamp: highest device tick of the lowest channel in the bucket
//! - GPS fix: first sample with `latitude > 0`, scanning buckets in time order
//!
//! Buckets come out sorted by key.

use crate::error::{PackError, Result};
use crate::packet::PacketHeader;
use crate::record::{GpsFix, SampleRecord};
use log::info;
use std::collections::BTreeMap;

/// Samples sharing one aggregation window
#[derive(Debug, Clone, PartialEq)]
pub struct TimeBucket<'a> {
    /// Aggregated timestamp (window index)
    pub key: i64,
    /// Wall-clock start of the window (ms)
    pub timestamp: i64,
    /// Device tick representing the whole bucket
    pub board_timestamp: i32,
    /// Samples in input order
    pub samples: Vec<&'a SampleRecord>,
}

impl TimeBucket<'_> {
    /// Header carried by every packet of this bucket
    pub fn header(&self) -> PacketHeader {
        PacketHeader::Bucket {
            timestamp: self.timestamp,
            board_timestamp: self.board_timestamp,
        }
    }

    /// Lowest channel present in the bucket
    pub fn lowest_channel(&self) -> Option<u8> {
        self.samples.iter().map(|s| s.channel).min()
    }

    /// Window start as a UTC date-time
    #[cfg(feature = "timestamps")]
    pub fn start_time(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// Aggregated view of one sample batch
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleBatch<'a> {
    /// Position to send before any bucket
    pub gps: Option<GpsFix>,
    /// Buckets in ascending time order
    pub buckets: Vec<TimeBucket<'a>>,
}

impl SampleBatch<'_> {
    /// Total samples across buckets
    pub fn sample_count(&self) -> usize {
        self.buckets.iter().map(|b| b.samples.len()).sum()
    }
}

/// Groups samples into fixed-width time buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregator {
    aggregation_factor: u32,
}

impl Aggregator {
    /// Create an aggregator with windows of `aggregation_factor` seconds
    pub fn new(aggregation_factor: u32) -> Result<Self> {
        if aggregation_factor == 0 {
            return Err(PackError::InvalidConfig(
                "aggregation factor must be at least 1 second".to_string(),
            ));
        }
        Ok(Self { aggregation_factor })
    }

    /// Window width in seconds
    pub fn aggregation_factor(&self) -> u32 {
        self.aggregation_factor
    }

    /// Window width in milliseconds
    pub fn bucket_width_ms(&self) -> i64 {
        1000 * self.aggregation_factor as i64
    }

    /// Window index of a wall-clock timestamp (ms)
    pub fn bucket_key(&self, timestamp_ms: i64) -> i64 {
        timestamp_ms.div_euclid(self.bucket_width_ms())
    }

    /// Wall-clock start of a window (ms), clamped to the `i64` range
    pub fn bucket_start(&self, key: i64) -> i64 {
        key.saturating_mul(self.bucket_width_ms())
    }

    /// Bucket the samples, derive board timestamps and pick the GPS fix
    pub fn aggregate<'a>(&self, samples: &'a [SampleRecord]) -> SampleBatch<'a> {
        let mut by_key: BTreeMap<i64, Vec<&'a SampleRecord>> = BTreeMap::new();
        for sample in samples {
            by_key
                .entry(self.bucket_key(sample.collected_timestamp))
                .or_default()
                .push(sample);
        }

        info!(
            "Aggregated {} samples in {} buckets",
            samples.len(),
            by_key.len()
        );

        let buckets: Vec<_> = by_key
            .into_iter()
            .filter_map(|(key, samples)| {
                board_timestamp(&samples).map(|board_timestamp| TimeBucket {
                    key,
                    timestamp: self.bucket_start(key),
                    board_timestamp,
                    samples,
                })
            })
            .collect();

        SampleBatch {
            gps: select_gps_fix(&buckets),
            buckets,
        }
    }
}

/// Highest device tick among the samples of the lowest channel
///
/// Returns `None` for an empty slice.
pub fn board_timestamp(samples: &[&SampleRecord]) -> Option<i32> {
    let lowest = samples.iter().map(|s| s.channel).min()?;
    samples
        .iter()
        .filter(|s| s.channel == lowest)
        .map(|s| s.on_board_timestamp)
        .max()
}

/// First fix found scanning buckets in order
///
/// Samples with `latitude <= 0` carry no fix, whatever their longitude or
/// altitude.
pub fn select_gps_fix(buckets: &[TimeBucket<'_>]) -> Option<GpsFix> {
    buckets.iter().find_map(|bucket| {
        bucket
            .samples
            .iter()
            .find(|s| s.has_fix())
            .map(|s| GpsFix::from_sample(s, bucket.timestamp))
    })
}
