// LoRaPack - Hex-encoded telemetry packetizer for LoRa links
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Greedy batch packer
//!
//! The [`BatchPacker`] fills a [`PacketBuffer`] with records until the next
//! one would exceed the transport's packet length, hands the buffer to the
//! transport, and starts a new one primed with the same header.
//!
//! Policy:
//! - A record that exactly fills the remaining space is appended without a
//!   flush.
//! - A record that cannot fit even in a freshly primed buffer
//!   (`header + size > max`) is dropped and counted in the report.
//! - The first transport failure aborts the batch; nothing further is
//!   appended.

use crate::error::{PackError, Result};
use crate::metrics::PackReport;
use crate::packet::{PacketBuffer, PacketHeader};
use crate::transport::Transport;
use log::{debug, error, warn};

/// Item with a known encoded size and layout
pub trait Packable {
    /// Encoded size in bytes; must not be smaller than what `append_to` writes
    fn estimated_size(&self) -> usize;

    /// Encode into `buffer`
    fn append_to(&self, buffer: &mut PacketBuffer);
}

/// Packs records into transport-sized packets
pub struct BatchPacker<'t, T: Transport + ?Sized> {
    transport: &'t mut T,
    header: PacketHeader,
    buffer: PacketBuffer,
    report: PackReport,
}

impl<'t, T: Transport + ?Sized> BatchPacker<'t, T> {
    /// Create a packer for packets on `port`, with no header
    pub fn new(transport: &'t mut T, port: u8, confirmed: bool) -> Self {
        Self {
            transport,
            header: PacketHeader::None,
            buffer: PacketBuffer::new(port, confirmed),
            report: PackReport::default(),
        }
    }

    /// Use `header` at the start of every packet
    pub fn with_header(mut self, header: PacketHeader) -> Self {
        self.header = header;
        self.buffer.reset(&header);
        self
    }

    /// Flush pending records, then continue with a new header
    pub fn start_segment(&mut self, header: PacketHeader) -> Result<()> {
        self.flush()?;
        self.header = header;
        self.buffer.reset(&header);
        Ok(())
    }

    /// Header written at the start of each packet
    pub fn header(&self) -> &PacketHeader {
        &self.header
    }

    /// Append one record, flushing first if it does not fit
    ///
    /// Returns `Ok(false)` when the record was dropped as oversize.
    pub fn push<P: Packable + ?Sized>(&mut self, record: &P) -> Result<bool> {
        let max = self.transport.packet_length();
        let size = record.estimated_size();
        let capacity = max.saturating_sub(self.header.size());

        if size > capacity {
            warn!(
                "Dropping record on port {}: {} bytes exceeds capacity of {} bytes",
                self.buffer.port(),
                size,
                capacity
            );
            self.report.records_dropped += 1;
            return Ok(false);
        }

        if self.buffer.size_bytes() + size > max {
            self.flush()?;
        }

        record.append_to(&mut self.buffer);
        self.report.records_packed += 1;
        Ok(true)
    }

    /// Append every record in order, stopping at the first transport failure
    pub fn push_all<'r, P, I>(&mut self, records: I) -> Result<()>
    where
        P: Packable + 'r,
        I: IntoIterator<Item = &'r P>,
    {
        for record in records {
            self.push(record)?;
        }
        Ok(())
    }

    /// Send the current buffer if it holds any record
    ///
    /// Returns `Ok(true)` if a packet went out.
    pub fn flush(&mut self) -> Result<bool> {
        if !self.buffer.is_dirty() {
            return Ok(false);
        }

        let size = self.buffer.size_bytes();
        match self.transport.send_payload(&self.buffer) {
            Ok(()) => {
                debug!(
                    "Sent {} bytes on port {} ({})",
                    size,
                    self.buffer.port(),
                    if self.buffer.is_confirmed() {
                        "confirmed"
                    } else {
                        "unconfirmed"
                    }
                );
                self.report.packets_sent += 1;
                self.report.bytes_sent += size;
                self.buffer.reset(&self.header);
                Ok(true)
            }
            Err(source) => {
                error!(
                    "Transport refused packet on port {} after {} packet(s): {}",
                    self.buffer.port(),
                    self.report.packets_sent,
                    source
                );
                Err(PackError::Transport {
                    packets_sent: self.report.packets_sent,
                    bytes_sent: self.report.bytes_sent,
                    source,
                })
            }
        }
    }

    /// Counters so far
    pub fn report(&self) -> &PackReport {
        &self.report
    }

    /// Flush the trailing partial packet and return the report
    pub fn finish(mut self) -> Result<PackReport> {
        self.flush()?;
        Ok(self.report)
    }
}

/// Pack `records` into packets on `port` and send them
pub fn pack_records<T, P>(
    transport: &mut T,
    port: u8,
    confirmed: bool,
    header: PacketHeader,
    records: &[P],
) -> Result<PackReport>
where
    T: Transport + ?Sized,
    P: Packable,
{
    let mut packer = BatchPacker::new(transport, port, confirmed).with_header(header);
    packer.push_all(records)?;
    packer.finish()
}
