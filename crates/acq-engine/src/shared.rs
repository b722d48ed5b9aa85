//! State shared between the receiver and the batch extractor
//!
//! A single mutex guards the ring, both indices and the loss-detection
//! state. The wake signal, stop flag and statistics live beside it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use acq_protocol::RawSample;
use ring_buffer::RingBuffer;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::stats::Counters;
use crate::wake::WakeSignal;

/// Result of storing one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushOutcome {
    /// Unread samples after the store
    pub available: usize,
    /// The counter did not follow the previous sample
    pub lost: bool,
    /// The ring reached capacity - 1 with this store
    pub saturated: bool,
}

#[derive(Debug)]
pub(crate) struct RingState {
    pub(crate) ring: RingBuffer,
    /// Counter of the previously stored sample
    last_counter: Option<i32>,
    /// Overflow already reported for the current saturated stretch
    overflow_reported: bool,
}

#[derive(Debug)]
pub(crate) struct Shared {
    state: Mutex<RingState>,
    pub(crate) wake: WakeSignal,
    pub(crate) stats: Counters,
    stop: AtomicBool,
    batch_size: usize,
}

impl Shared {
    pub(crate) fn new(ring: RingBuffer, batch_size: usize) -> Self {
        Self {
            state: Mutex::new(RingState {
                ring,
                last_counter: None,
                overflow_reported: false,
            }),
            wake: WakeSignal::new(),
            stats: Counters::default(),
            stop: AtomicBool::new(false),
            batch_size,
        }
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, RingState>, EngineError> {
        self.state
            .lock()
            .map_err(|_| EngineError::Synchronization("ring buffer lock poisoned".to_string()))
    }

    pub(crate) fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Request both sides to stop and release a waiting consumer
    pub(crate) fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.wake.close();
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Store one parsed sample
    ///
    /// Copies the sample into the write slot, checks counter continuity,
    /// advances the write index and posts the wake signal once a full batch
    /// is available. A full lap overwrites unread samples without notice
    /// beyond the overflow warning.
    pub(crate) fn push_sample(&self, sample: &RawSample) -> Result<PushOutcome, EngineError> {
        let mut state = self.lock()?;
        state.ring.write_slot().copy_from(sample);

        let lost = match state.last_counter {
            Some(last) if sample.counter != last.wrapping_add(1) => {
                warn!(
                    observed = sample.counter,
                    expected = last.wrapping_add(1),
                    "Packet loss: counter discontinuity"
                );
                self.stats.record_loss();
                true
            }
            _ => false,
        };
        state.last_counter = Some(sample.counter);

        state.ring.advance_write();
        let available = state.ring.available();

        let saturated = state.ring.is_saturated();
        if saturated {
            self.stats.record_overflow();
            if !state.overflow_reported {
                warn!(
                    "Ring buffer overflow imminent: {} of {} slots unread, consumer is falling behind",
                    available,
                    state.ring.capacity()
                );
                state.overflow_reported = true;
            }
        } else if state.overflow_reported {
            debug!("Ring buffer back below capacity ({} unread)", available);
            state.overflow_reported = false;
        }

        if available >= self.batch_size {
            self.wake.post()?;
        }
        drop(state);

        self.stats.record_packet(available);
        Ok(PushOutcome {
            available,
            lost,
            saturated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acq_protocol::PacketLayout;

    fn shared(batch: usize, factor: usize) -> Shared {
        let layout = PacketLayout::new(2, 1);
        let ring = RingBuffer::for_batches(batch, factor, &layout).unwrap();
        Shared::new(ring, batch)
    }

    fn sample(counter: i32) -> RawSample {
        RawSample {
            counter,
            timestamp: (counter as u32).wrapping_mul(10),
            analog: vec![0, 0],
            digital: vec![0],
        }
    }

    #[test]
    fn test_first_sample_sets_reference_only() {
        let shared = shared(4, 2);
        let outcome = shared.push_sample(&sample(57)).unwrap();
        assert!(!outcome.lost);
        assert_eq!(outcome.available, 1);
    }

    #[test]
    fn test_loss_detected_once_per_gap() {
        let shared = shared(4, 4);
        let lost: Vec<bool> = [1, 2, 4, 5]
            .iter()
            .map(|&c| shared.push_sample(&sample(c)).unwrap().lost)
            .collect();
        assert_eq!(lost, vec![false, false, true, false]);
        assert_eq!(shared.stats.snapshot().packets_lost, 1);
    }

    #[test]
    fn test_contiguous_counters_report_no_loss() {
        let shared = shared(4, 4);
        for c in 1..=4 {
            assert!(!shared.push_sample(&sample(c)).unwrap().lost);
        }
        assert_eq!(shared.stats.snapshot().packets_lost, 0);
    }

    #[test]
    fn test_counter_wraparound_is_continuous() {
        let shared = shared(4, 4);
        shared.push_sample(&sample(i32::MAX)).unwrap();
        let outcome = shared.push_sample(&sample(i32::MIN)).unwrap();
        assert!(!outcome.lost);
    }

    #[test]
    fn test_post_only_when_batch_available() {
        let shared = shared(3, 4);
        shared.push_sample(&sample(0)).unwrap();
        shared.push_sample(&sample(1)).unwrap();
        assert!(!shared.wake.is_posted());
        shared.push_sample(&sample(2)).unwrap();
        assert!(shared.wake.is_posted());
    }

    #[test]
    fn test_overflow_counted_every_time() {
        // Capacity 8: the 7th store saturates, the 8th laps to empty
        let shared = shared(4, 2);
        for c in 0..6 {
            shared.push_sample(&sample(c)).unwrap();
        }
        assert!(!shared.lock().unwrap().overflow_reported);

        shared.push_sample(&sample(6)).unwrap();
        assert_eq!(shared.stats.snapshot().overflow_events, 1);
        assert!(shared.lock().unwrap().overflow_reported);

        let outcome = shared.push_sample(&sample(7)).unwrap();
        assert_eq!(outcome.available, 0);
        assert!(!outcome.saturated);
        assert!(!shared.lock().unwrap().overflow_reported);

        for c in 8..15 {
            shared.push_sample(&sample(c)).unwrap();
        }
        assert_eq!(shared.stats.snapshot().overflow_events, 2);
        assert!(shared.lock().unwrap().overflow_reported);
    }

    #[test]
    fn test_stop_closes_wake_signal() {
        let shared = shared(4, 2);
        assert!(!shared.is_stopped());
        shared.stop();
        assert!(shared.is_stopped());
        assert!(shared.wake.is_closed());
    }

    #[test]
    fn test_overflow_reported_once_per_saturated_stretch() {
        // Capacity 8, consumer reads one sample per store once saturated
        let shared = shared(4, 2);
        for c in 0..7 {
            shared.push_sample(&sample(c)).unwrap();
        }
        assert!(shared.lock().unwrap().overflow_reported);

        for c in 7..12 {
            shared.lock().unwrap().ring.advance_read(1);
            let outcome = shared.push_sample(&sample(c)).unwrap();
            assert!(outcome.saturated);
            assert!(shared.lock().unwrap().overflow_reported);
        }
        assert_eq!(shared.stats.snapshot().overflow_events, 6);

        // Draining below capacity - 1 ends the stretch
        shared.lock().unwrap().ring.advance_read(4);
        shared.push_sample(&sample(12)).unwrap();
        assert!(!shared.lock().unwrap().overflow_reported);
    }
}
