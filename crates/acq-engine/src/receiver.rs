//! Network receiver
//!
//! Producer side of the ring. The receiver runs on its own OS thread and
//! loops: read exactly one packet, parse it, store it. Transport failures
//! are logged and retried without limit; only a synchronization failure or
//! a shutdown request ends the loop.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use acq_protocol::{PacketLayout, PacketSource, RawSample, TransportError};
use core_affinity::CoreId;
use tracing::{debug, info, trace, warn};

use crate::error::EngineError;
use crate::shared::{PushOutcome, Shared};

/// Parses raw packets and stores them in the engine's ring
///
/// Obtained from [`AcquisitionEngine::take_injector`](crate::AcquisitionEngine::take_injector)
/// to feed packets from the caller's own thread, or used internally by
/// [`NetworkReceiver`].
pub struct PacketInjector {
    shared: Arc<Shared>,
    layout: PacketLayout,
    sample: RawSample,
}

impl PacketInjector {
    pub(crate) fn new(shared: Arc<Shared>, layout: PacketLayout) -> Self {
        let sample = RawSample::zeroed(&layout);
        Self {
            shared,
            layout,
            sample,
        }
    }

    /// Expected packet length in bytes
    pub fn packet_len(&self) -> usize {
        self.layout.packet_len()
    }

    /// Parse one packet and store the sample
    pub fn push_packet(&mut self, packet: &[u8]) -> Result<PushOutcome, EngineError> {
        self.layout.decode_into(packet, &mut self.sample)?;
        self.shared.push_sample(&self.sample)
    }
}

/// Where the receiver is within one iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    /// Between iterations
    Idle,
    /// Waiting on the transport for a full packet
    Reading,
    /// Packet parsed, being stored
    Parsed,
}

/// Result of one receiver iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// A sample was stored
    Stored(PushOutcome),
    /// The read timed out with nothing received
    Idle,
    /// The read failed and will be retried
    Failed,
}

/// Reads packets from a [`PacketSource`] into the engine's ring
pub struct NetworkReceiver<S: PacketSource> {
    source: S,
    injector: PacketInjector,
    packet: Vec<u8>,
    state: ReceiverState,
    /// Consecutive failed reads
    failures: u64,
    retry_backoff: Duration,
}

impl<S: PacketSource> NetworkReceiver<S> {
    pub(crate) fn new(source: S, injector: PacketInjector, retry_backoff: Duration) -> Self {
        let packet = vec![0u8; injector.packet_len()];
        Self {
            source,
            injector,
            packet,
            state: ReceiverState::Idle,
            failures: 0,
            retry_backoff,
        }
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    /// Read, parse and store one packet
    pub fn step(&mut self) -> Result<StepOutcome, EngineError> {
        self.state = ReceiverState::Reading;
        if let Err(err) = self.source.read_packet(&mut self.packet) {
            self.state = ReceiverState::Idle;
            return Ok(self.record_failure(err));
        }

        if self.failures > 0 {
            info!("Transport recovered after {} failed reads", self.failures);
            self.failures = 0;
        }

        self.state = ReceiverState::Parsed;
        let outcome = self.injector.push_packet(&self.packet)?;
        self.state = ReceiverState::Idle;
        Ok(StepOutcome::Stored(outcome))
    }

    fn record_failure(&mut self, err: TransportError) -> StepOutcome {
        if err.is_timeout() {
            trace!("Packet read timed out");
            return StepOutcome::Idle;
        }

        self.injector.shared.stats.record_transport_error();
        if self.failures == 0 {
            warn!("Packet read failed, retrying: {}", err);
        } else {
            debug!("Packet read failed ({} in a row): {}", self.failures + 1, err);
        }
        self.failures += 1;
        StepOutcome::Failed
    }

    /// Loop until the engine is shut down
    pub fn run(mut self) -> Result<(), EngineError> {
        info!(
            "Network receiver started ({} byte packets)",
            self.packet.len()
        );

        while !self.injector.shared.is_stopped() {
            if self.step()? == StepOutcome::Failed && !self.retry_backoff.is_zero() {
                thread::sleep(self.retry_backoff);
            }
        }

        info!("Network receiver stopped");
        Ok(())
    }
}

/// Handle to a receiver running on its own thread
pub struct ReceiverHandle {
    handle: JoinHandle<Result<(), EngineError>>,
}

impl ReceiverHandle {
    pub(crate) fn spawn<S>(
        receiver: NetworkReceiver<S>,
        thread_name: &str,
        core: Option<CoreId>,
    ) -> Result<Self, EngineError>
    where
        S: PacketSource + 'static,
    {
        let handle = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || {
                if let Some(core) = core {
                    pin_current_thread(core);
                }
                receiver.run()
            })
            .map_err(EngineError::Spawn)?;
        Ok(Self { handle })
    }

    /// Whether the receiver thread has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the receiver thread to exit
    pub fn join(self) -> Result<(), EngineError> {
        self.handle
            .join()
            .map_err(|_| EngineError::Synchronization("receiver thread panicked".to_string()))?
    }
}

/// Look up core `index` among the cores this process may run on
pub(crate) fn resolve_core(index: usize) -> Result<CoreId, EngineError> {
    let cores = core_affinity::get_core_ids().unwrap_or_default();
    cores
        .iter()
        .copied()
        .find(|core| core.id == index)
        .ok_or(EngineError::CpuAffinity {
            core: index,
            available: cores.len(),
        })
}

fn pin_current_thread(core: CoreId) {
    if core_affinity::set_for_current(core) {
        info!("Receiver pinned to core {}", core.id);
    } else {
        warn!("Failed to pin receiver to core {}, running unpinned", core.id);
    }
}
