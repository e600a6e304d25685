//! Packing statistics
//!
//! [`PackReport`] describes one persister call; [`PackMetrics`] accumulates
//! reports over a session so dropped records stay visible.

use std::collections::HashMap;

/// Outcome of one successful packing call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackReport {
    /// Packets accepted by the transport
    pub packets_sent: usize,
    /// Payload bytes accepted by the transport (decoded size)
    pub bytes_sent: usize,
    /// Records appended to a packet
    pub records_packed: usize,
    /// Records discarded because they cannot fit in any packet
    pub records_dropped: usize,
}

impl PackReport {
    /// Add another report's counters to this one
    pub fn merge(&mut self, other: &PackReport) {
        self.packets_sent += other.packets_sent;
        self.bytes_sent += other.bytes_sent;
        self.records_packed += other.records_packed;
        self.records_dropped += other.records_dropped;
    }

    /// Check whether any record was lost to the size limit
    pub fn has_drops(&self) -> bool {
        self.records_dropped > 0
    }
}

/// Cumulative statistics per logical port
#[derive(Debug, Clone, Default)]
pub struct PackMetrics {
    /// Totals over all ports
    pub total: PackReport,
    /// Totals per logical port
    pub by_port: HashMap<u8, PackReport>,
    /// Calls aborted by a transport failure
    pub failed_batches: u64,
}

impl PackMetrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful call on `port`
    pub fn record(&mut self, port: u8, report: &PackReport) {
        self.total.merge(report);
        self.by_port.entry(port).or_default().merge(report);
    }

    /// Record a call aborted by the transport
    pub fn record_failure(&mut self) {
        self.failed_batches += 1;
    }

    /// Average payload size in bytes
    pub fn average_packet_size(&self) -> f64 {
        if self.total.packets_sent == 0 {
            return 0.0;
        }
        self.total.bytes_sent as f64 / self.total.packets_sent as f64
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a human-readable report
    pub fn report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== LoRaPack Packing Metrics ===\n\n");
        report.push_str(&format!("Packets sent: {}\n", self.total.packets_sent));
        report.push_str(&format!("Bytes sent: {} bytes\n", self.total.bytes_sent));
        report.push_str(&format!(
            "Average packet size: {:.1} bytes\n",
            self.average_packet_size()
        ));
        report.push_str(&format!("Records packed: {}\n", self.total.records_packed));
        report.push_str(&format!(
            "Records dropped (oversize): {}\n",
            self.total.records_dropped
        ));
        report.push_str(&format!("Failed batches: {}\n\n", self.failed_batches));

        report.push_str("Per port:\n");
        let mut ports: Vec<_> = self.by_port.iter().collect();
        ports.sort_by_key(|(port, _)| **port);
        for (port, stats) in ports {
            report.push_str(&format!(
                "  port {}: {} packets, {} bytes, {} dropped\n",
                port, stats.packets_sent, stats.bytes_sent, stats.records_dropped
            ));
        }

        report
    }
}
