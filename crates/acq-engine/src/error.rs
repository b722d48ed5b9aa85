//! Engine Error Types

use acq_protocol::ProtocolError;
use ring_buffer::RingError;
use signal_layout::ConfigurationError;
use thiserror::Error;

/// Errors surfaced by the acquisition engine
///
/// Lost packets, ring overflow and recoverable transport failures are not
/// errors: they are logged and counted in [`AcquisitionStats`](crate::AcquisitionStats).
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid configuration, the engine was not started
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Packet could not be decoded
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Ring buffer could not be allocated
    #[error("Ring buffer error: {0}")]
    Ring(#[from] RingError),

    /// Lock or wake signal failure
    #[error("Synchronization failure: {0}")]
    Synchronization(String),

    /// Engine was shut down while waiting
    #[error("Acquisition engine shut down")]
    Shutdown,

    /// Producer or consumer handle requested twice
    #[error("The {0} of this engine has already been taken")]
    AlreadyTaken(&'static str),

    /// Receiver thread could not be started
    #[error("Failed to spawn receiver thread: {0}")]
    Spawn(std::io::Error),

    /// Requested receiver core does not exist on this host
    #[error("Cannot pin receiver to core {core}: {available} cores available")]
    CpuAffinity { core: usize, available: usize },
}

impl EngineError {
    /// Whether this error ends the current call because of a shutdown request
    pub fn is_shutdown(&self) -> bool {
        matches!(self, EngineError::Shutdown)
    }
}
