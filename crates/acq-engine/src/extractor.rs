//! Batch extraction
//!
//! Consumer side of the ring. Once per cycle the caller blocks in
//! [`BatchExtractor::extract_batch`] until a full batch is available, then
//! the batch is copied, calibrated and reformatted into the output buffer.

use std::sync::Arc;

use byteorder::{ByteOrder, NativeEndian};
use ring_buffer::RingBuffer;
use signal_layout::{Calibration, OutputBatch, OutputLayout, SignalSource};
use tracing::trace;

use crate::error::EngineError;
use crate::shared::Shared;

/// Consumer handle of an [`AcquisitionEngine`](crate::AcquisitionEngine)
pub struct BatchExtractor {
    shared: Arc<Shared>,
    layout: Arc<OutputLayout>,
    calibration: Arc<Calibration>,
    batch: OutputBatch,
}

impl BatchExtractor {
    pub(crate) fn new(
        shared: Arc<Shared>,
        layout: Arc<OutputLayout>,
        calibration: Arc<Calibration>,
    ) -> Self {
        let batch = OutputBatch::new(Arc::clone(&layout));
        Self {
            shared,
            layout,
            calibration,
            batch,
        }
    }

    /// Block until a full batch is available and write it into the output buffer
    ///
    /// Exactly `batch_size` samples are consumed; any surplus stays in the
    /// ring for the next cycle. Returns [`EngineError::Shutdown`] once the
    /// engine has been shut down.
    pub fn extract_batch(&mut self) -> Result<&OutputBatch, EngineError> {
        if self.shared.is_stopped() {
            return Err(EngineError::Shutdown);
        }

        let batch_size = self.shared.batch_size();
        let mut state = self.shared.lock()?;
        let mut available = state.ring.available();
        while available < batch_size {
            self.shared.wake.reset()?;
            drop(state);
            self.shared.wake.wait()?;
            state = self.shared.lock()?;
            available = state.ring.available();
        }

        if available > batch_size {
            trace!("Extracting {} of {} available samples", batch_size, available);
        }

        fill_batch(&mut self.batch, &self.layout, &self.calibration, &state.ring);
        state.ring.advance_read(batch_size);
        let remaining = state.ring.available();
        drop(state);

        self.shared.stats.record_batch(remaining);
        Ok(&self.batch)
    }

    /// Most recently extracted batch
    pub fn batch(&self) -> &OutputBatch {
        &self.batch
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Byte offset of every signal region within the output buffer
    pub fn offsets(&self) -> Vec<usize> {
        self.layout.offsets()
    }
}

/// Copy the next `batch_size` unread samples into `batch`, signal by signal
fn fill_batch(
    batch: &mut OutputBatch,
    layout: &OutputLayout,
    calibration: &Calibration,
    ring: &RingBuffer,
) {
    let samples = layout.batch_size();
    for (index, descriptor) in layout.descriptors().iter().enumerate() {
        let Some(region) = batch.signal_bytes_mut(index) else {
            continue;
        };
        let slots = ring.iter_unread(samples);

        match descriptor.source {
            SignalSource::Counter => {
                for (out, slot) in region.chunks_exact_mut(4).zip(slots) {
                    NativeEndian::write_i32(out, slot.counter);
                }
            }
            SignalSource::Timestamp => {
                for (out, slot) in region.chunks_exact_mut(4).zip(slots) {
                    NativeEndian::write_u32(out, slot.timestamp);
                }
            }
            SignalSource::Analog { channel } => {
                let entry = calibration.entries()[channel];
                for (out, slot) in region.chunks_exact_mut(8).zip(slots) {
                    NativeEndian::write_f64(out, entry.apply(slot.analog[channel]));
                }
            }
            SignalSource::Digital { bit } => {
                for (out, slot) in region.iter_mut().zip(slots) {
                    *out = slot.digital_bit(bit).unwrap_or(0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{engine_config, packet};
    use crate::AcquisitionEngine;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_end_to_end_batch_contents() {
        // A = 2, D = 1, batch 4, capacity 8
        let mut config = engine_config(4, 2);
        config.signals.push(signal_layout::SignalDeclaration::analog("Ai0", 0));
        let engine = AcquisitionEngine::new(&config).unwrap();
        let mut injector = engine.take_injector().unwrap();
        let mut extractor = engine.take_extractor().unwrap();

        for counter in 10..14 {
            injector
                .push_packet(&packet(counter, counter as u32 * 100, [100, 200], 0b1))
                .unwrap();
        }

        let batch = extractor.extract_batch().unwrap();
        assert_eq!(batch.u32_values(0).unwrap(), vec![10, 11, 12, 13]);
        assert_eq!(batch.u32_values(1).unwrap(), vec![1000, 1100, 1200, 1300]);
        assert_eq!(batch.f64_values(2).unwrap(), vec![200.0; 4]);
        assert_eq!(batch.f64_values(4).unwrap(), vec![100.0; 4]);
        for sample in 0..4 {
            assert_eq!(batch.read_u8(3, sample), Some(1));
        }
        assert_eq!(engine.available().unwrap(), 0);
        assert_eq!(engine.stats().batches_extracted, 1);
    }

    #[test]
    fn test_calibration_applied() {
        let mut config = engine_config(4, 2);
        config.calibration.gains = vec![1.0, 0.01];
        config.calibration.offsets = vec![0.0, 5.0];
        let engine = AcquisitionEngine::new(&config).unwrap();
        let mut injector = engine.take_injector().unwrap();
        let mut extractor = engine.take_extractor().unwrap();

        for counter in 0..4 {
            injector.push_packet(&packet(counter, 0, [0, 1000], 0)).unwrap();
        }

        let values = extractor.extract_batch().unwrap().f64_values(2).unwrap();
        for value in values {
            assert!((value - 15.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_digital_bits_extracted() {
        let mut config = engine_config(4, 2);
        config.signals.truncate(2);
        for bit in 0..4 {
            config
                .signals
                .push(signal_layout::SignalDeclaration::digital(&format!("Di{bit}"), bit));
        }
        let engine = AcquisitionEngine::new(&config).unwrap();
        let mut injector = engine.take_injector().unwrap();
        let mut extractor = engine.take_extractor().unwrap();

        for counter in 0..4 {
            injector.push_packet(&packet(counter, 0, [0, 0], 0b1010)).unwrap();
        }

        let batch = extractor.extract_batch().unwrap();
        let bits: Vec<u8> = (2..6).map(|signal| batch.read_u8(signal, 0).unwrap()).collect();
        assert_eq!(bits, vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_surplus_stays_for_next_cycle() {
        let engine = AcquisitionEngine::new(&engine_config(4, 4)).unwrap();
        let mut injector = engine.take_injector().unwrap();
        let mut extractor = engine.take_extractor().unwrap();

        for counter in 0..6 {
            injector.push_packet(&packet(counter, 0, [0, 0], 0)).unwrap();
        }
        extractor.extract_batch().unwrap();
        assert_eq!(engine.available().unwrap(), 2);

        for counter in 6..8 {
            injector.push_packet(&packet(counter, 0, [0, 0], 0)).unwrap();
        }
        let batch = extractor.extract_batch().unwrap();
        assert_eq!(batch.u32_values(0).unwrap(), vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_blocks_until_batch_complete() {
        let engine = AcquisitionEngine::new(&engine_config(4, 2)).unwrap();
        let mut injector = engine.take_injector().unwrap();
        let mut extractor = engine.take_extractor().unwrap();

        let (tx, rx) = mpsc::channel();
        let consumer = thread::spawn(move || {
            let counters = extractor
                .extract_batch()
                .map(|batch| batch.u32_values(0).unwrap_or_default());
            tx.send(counters).unwrap();
        });

        for counter in 0..3 {
            injector.push_packet(&packet(counter, 0, [0, 0], 0)).unwrap();
        }
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        injector.push_packet(&packet(3, 0, [0, 0], 0)).unwrap();
        let counters = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert_eq!(counters, vec![0, 1, 2, 3]);
        consumer.join().unwrap();
    }

    #[test]
    fn test_shutdown_releases_blocked_consumer() {
        let engine = AcquisitionEngine::new(&engine_config(4, 2)).unwrap();
        let mut extractor = engine.take_extractor().unwrap();

        let consumer = thread::spawn(move || extractor.extract_batch().map(|_| ()));
        thread::sleep(Duration::from_millis(50));
        engine.shutdown();

        let result = consumer.join().unwrap();
        assert!(matches!(result, Err(EngineError::Shutdown)));
    }

    #[test]
    fn test_offsets_follow_declaration_order() {
        let engine = AcquisitionEngine::new(&engine_config(4, 2)).unwrap();
        let extractor = engine.take_extractor().unwrap();
        // u32, u32, f64, u8 regions of 4 samples
        assert_eq!(extractor.offsets(), vec![0, 16, 32, 64]);
        assert_eq!(extractor.batch().as_bytes().len(), 68);
    }
}
