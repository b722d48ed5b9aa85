//! Acquisition Engine
//!
//! Owns the shared ring and hands out exactly one producer and one
//! consumer. The producer is either a [`NetworkReceiver`] reading from a
//! transport or a [`PacketInjector`] fed by the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use acq_protocol::{PacketLayout, PacketSource};
use ring_buffer::RingBuffer;
use signal_layout::{Calibration, ConfigurationError, OutputLayout};
use tracing::info;

use crate::config::{EngineConfig, ReceiverConfig};
use crate::error::EngineError;
use crate::extractor::BatchExtractor;
use crate::receiver::{resolve_core, NetworkReceiver, PacketInjector, ReceiverHandle};
use crate::shared::Shared;
use crate::stats::AcquisitionStats;

/// Network-fed acquisition buffer
pub struct AcquisitionEngine {
    shared: Arc<Shared>,
    layout: Arc<OutputLayout>,
    calibration: Arc<Calibration>,
    packet_layout: PacketLayout,
    receiver_config: ReceiverConfig,
    producer_taken: AtomicBool,
    consumer_taken: AtomicBool,
}

impl AcquisitionEngine {
    /// Validate `config` and allocate the ring and output layout
    ///
    /// Nothing is started; obtain the consumer with
    /// [`take_extractor`](Self::take_extractor) and start a producer with
    /// [`spawn_receiver`](Self::spawn_receiver).
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let packet_layout = config
            .geometry
            .packet_layout()
            .map_err(ConfigurationError::from)?;
        let layout = OutputLayout::build(&config.signals, &config.geometry, config.batch_size)?;
        let calibration = Calibration::from_config(
            &config.calibration,
            config.geometry.total_analog_channels(),
        )?;
        let ring = RingBuffer::for_batches(config.batch_size, config.overflow_factor, &packet_layout)?;

        info!(
            "Acquisition engine created: {} analog channels, {} digital words, {} signals, batch {}, ring {} samples",
            packet_layout.analog_channels(),
            packet_layout.digital_words(),
            layout.signal_count(),
            config.batch_size,
            ring.capacity()
        );

        Ok(Self {
            shared: Arc::new(Shared::new(ring, config.batch_size)),
            layout: Arc::new(layout),
            calibration: Arc::new(calibration),
            packet_layout,
            receiver_config: config.receiver.clone(),
            producer_taken: AtomicBool::new(false),
            consumer_taken: AtomicBool::new(false),
        })
    }

    /// Output layout of every extracted batch
    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Wire layout of one packet
    pub fn packet_layout(&self) -> PacketLayout {
        self.packet_layout
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn batch_size(&self) -> usize {
        self.shared.batch_size()
    }

    /// Ring capacity in samples
    pub fn capacity(&self) -> Result<usize, EngineError> {
        Ok(self.shared.lock()?.ring.capacity())
    }

    /// Unread samples currently in the ring
    pub fn available(&self) -> Result<usize, EngineError> {
        Ok(self.shared.lock()?.ring.available())
    }

    /// Take the consumer handle; only one exists per engine
    pub fn take_extractor(&self) -> Result<BatchExtractor, EngineError> {
        if self.consumer_taken.swap(true, Ordering::SeqCst) {
            return Err(EngineError::AlreadyTaken("batch extractor"));
        }
        Ok(BatchExtractor::new(
            Arc::clone(&self.shared),
            Arc::clone(&self.layout),
            Arc::clone(&self.calibration),
        ))
    }

    /// Take the producer as a caller-driven packet injector
    pub fn take_injector(&self) -> Result<PacketInjector, EngineError> {
        if self.producer_taken.swap(true, Ordering::SeqCst) {
            return Err(EngineError::AlreadyTaken("packet producer"));
        }
        Ok(PacketInjector::new(Arc::clone(&self.shared), self.packet_layout))
    }

    /// Take the producer as a receiver over `source`, to be driven by the caller
    pub fn receiver<S: PacketSource>(&self, source: S) -> Result<NetworkReceiver<S>, EngineError> {
        let injector = self.take_injector()?;
        let backoff = Duration::from_millis(self.receiver_config.retry_backoff_ms);
        Ok(NetworkReceiver::new(source, injector, backoff))
    }

    /// Start the receiver over `source` on its own named thread, pinned to
    /// the configured core if any
    pub fn spawn_receiver<S>(&self, source: S) -> Result<ReceiverHandle, EngineError>
    where
        S: PacketSource + 'static,
    {
        let core = self.receiver_config.cpu_affinity.map(resolve_core).transpose()?;
        let receiver = self.receiver(source)?;
        let handle = ReceiverHandle::spawn(receiver, &self.receiver_config.thread_name, core)?;
        info!("Receiver thread '{}' started", self.receiver_config.thread_name);
        Ok(handle)
    }

    /// Stop the receiver loop and release a blocked consumer
    ///
    /// The receiver notices the request after its current read returns, so
    /// transports should carry a read timeout.
    pub fn shutdown(&self) {
        if !self.shared.is_stopped() {
            info!("Shutting down acquisition engine");
        }
        self.shared.stop();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.is_stopped()
    }

    /// Snapshot of the engine statistics
    pub fn stats(&self) -> AcquisitionStats {
        self.shared.stats.snapshot()
    }
}

impl Drop for AcquisitionEngine {
    fn drop(&mut self) {
        self.shared.stop();
    }
}
