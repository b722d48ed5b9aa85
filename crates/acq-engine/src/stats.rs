//! Acquisition statistics
//!
//! Counters are kept as atomics for cheap snapshots and mirrored to the
//! `metrics` facade for whatever recorder the host installs.

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::{counter, gauge};
use serde::Serialize;

/// Point-in-time engine statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AcquisitionStats {
    /// Packets parsed and stored in the ring
    pub packets_received: u64,
    /// Counter discontinuities observed
    pub packets_lost: u64,
    /// Stores that left the ring at or above capacity - 1
    pub overflow_events: u64,
    /// Failed transport reads (timeouts excluded)
    pub transport_errors: u64,
    /// Batches delivered to the consumer
    pub batches_extracted: u64,
    /// Unread samples at the time of the last store or extraction
    pub available: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    packets_received: AtomicU64,
    packets_lost: AtomicU64,
    overflow_events: AtomicU64,
    transport_errors: AtomicU64,
    batches_extracted: AtomicU64,
    available: AtomicU64,
}

impl Counters {
    pub(crate) fn record_packet(&self, available: usize) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
        counter!("acq_packets_received_total").increment(1);
        self.record_available(available);
    }

    pub(crate) fn record_loss(&self) {
        self.packets_lost.fetch_add(1, Ordering::Relaxed);
        counter!("acq_packets_lost_total").increment(1);
    }

    pub(crate) fn record_overflow(&self) {
        self.overflow_events.fetch_add(1, Ordering::Relaxed);
        counter!("acq_ring_overflow_total").increment(1);
    }

    pub(crate) fn record_transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
        counter!("acq_transport_errors_total").increment(1);
    }

    pub(crate) fn record_batch(&self, available: usize) {
        self.batches_extracted.fetch_add(1, Ordering::Relaxed);
        counter!("acq_batches_extracted_total").increment(1);
        self.record_available(available);
    }

    fn record_available(&self, available: usize) {
        self.available.store(available as u64, Ordering::Relaxed);
        gauge!("acq_ring_available").set(available as f64);
    }

    pub(crate) fn snapshot(&self) -> AcquisitionStats {
        AcquisitionStats {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_lost: self.packets_lost.load(Ordering::Relaxed),
            overflow_events: self.overflow_events.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            batches_extracted: self.batches_extracted.load(Ordering::Relaxed),
            available: self.available.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let counters = Counters::default();
        counters.record_packet(1);
        counters.record_packet(2);
        counters.record_loss();
        counters.record_batch(0);

        let stats = counters.snapshot();
        assert_eq!(stats.packets_received, 2);
        assert_eq!(stats.packets_lost, 1);
        assert_eq!(stats.batches_extracted, 1);
        assert_eq!(stats.available, 0);
        assert_eq!(stats.overflow_events, 0);
    }
}
