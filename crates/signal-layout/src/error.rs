//! Configuration Error Types

use acq_protocol::ProtocolError;
use thiserror::Error;

use crate::signal::{ElementType, SignalKind};

/// Errors found while validating an acquisition configuration
///
/// Any of these is fatal: an engine is never partially configured.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// Fewer signals than the mandatory Counter and Timestamp
    #[error("At least two signals (Counter, Timestamp) are required, found {found}")]
    TooFewSignals { found: usize },

    /// Signal 0 or 1 is not the mandatory Counter / Timestamp
    #[error("Signal {index} ({name}) must be {expected:?}, found {found:?}")]
    HeaderSignal {
        index: usize,
        name: String,
        expected: SignalKind,
        found: SignalKind,
    },

    /// Counter or Timestamp declared after the first two signals
    #[error("Signal {index} ({name}): {kind:?} is only allowed as signal 0 or 1")]
    MisplacedHeader {
        index: usize,
        name: String,
        kind: SignalKind,
    },

    /// Element type does not fit the signal kind
    #[error("Signal {index} ({name}): element type {found} is invalid for {kind:?} signals")]
    ElementType {
        index: usize,
        name: String,
        kind: SignalKind,
        found: ElementType,
    },

    /// Analog or Digital signal without a channel index
    #[error("Signal {index} ({name}): a channel index is required for {kind:?} signals")]
    MissingChannel {
        index: usize,
        name: String,
        kind: SignalKind,
    },

    /// Analog channel index outside the board geometry
    #[error("Signal {index} ({name}): analog channel {channel} out of range 0..{limit}")]
    AnalogChannel {
        index: usize,
        name: String,
        channel: u32,
        limit: usize,
    },

    /// Digital bit index outside the board geometry
    #[error("Signal {index} ({name}): digital bit {channel} out of range 0..{limit}")]
    DigitalChannel {
        index: usize,
        name: String,
        channel: u32,
        limit: usize,
    },

    /// Signal declares a sample count different from the batch size
    #[error("Signal {index} ({name}): {found} samples declared, batch size is {expected}")]
    SampleCount {
        index: usize,
        name: String,
        expected: usize,
        found: usize,
    },

    /// Calibration array length does not match the analog channel count
    #[error("Calibration {field} has {found} entries, expected {expected}")]
    CalibrationLength {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    /// Batch size of zero
    #[error("Batch size must be at least 1")]
    ZeroBatchSize,

    /// Ring overflow factor too small to absorb jitter
    #[error("Overflow factor must be at least {min}, found {found}")]
    OverflowFactor { min: usize, found: usize },

    /// Board geometry cannot describe a packet
    #[error("Invalid board geometry: {0}")]
    Geometry(#[from] ProtocolError),
}

impl ConfigurationError {
    /// Index of the offending signal, for per-signal errors
    pub fn signal_index(&self) -> Option<usize> {
        match self {
            Self::HeaderSignal { index, .. }
            | Self::MisplacedHeader { index, .. }
            | Self::ElementType { index, .. }
            | Self::MissingChannel { index, .. }
            | Self::AnalogChannel { index, .. }
            | Self::DigitalChannel { index, .. }
            | Self::SampleCount { index, .. } => Some(*index),
            _ => None,
        }
    }
}
