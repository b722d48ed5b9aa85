//! Engine configuration

use acq_protocol::BoardGeometry;
use ring_buffer::{DEFAULT_OVERFLOW_FACTOR, MIN_OVERFLOW_FACTOR};
use serde::{Deserialize, Serialize};
use signal_layout::{CalibrationConfig, ConfigurationError, SignalDeclaration};

/// Acquisition engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Digitizer channel layout
    pub geometry: BoardGeometry,

    /// Samples per signal extracted each cycle
    pub batch_size: usize,

    /// Ring capacity in batches
    #[serde(default = "default_overflow_factor")]
    pub overflow_factor: usize,

    /// Per-channel gains and offsets
    pub calibration: CalibrationConfig,

    /// Output signals; the first two must be Counter and Timestamp
    pub signals: Vec<SignalDeclaration>,

    /// Receiver thread settings
    #[serde(default)]
    pub receiver: ReceiverConfig,
}

fn default_overflow_factor() -> usize {
    DEFAULT_OVERFLOW_FACTOR
}

impl Default for EngineConfig {
    fn default() -> Self {
        let geometry = BoardGeometry::default();
        let calibration = CalibrationConfig::identity(geometry.total_analog_channels());
        Self {
            geometry,
            batch_size: 100,
            overflow_factor: DEFAULT_OVERFLOW_FACTOR,
            calibration,
            signals: vec![
                SignalDeclaration::counter("Counter"),
                SignalDeclaration::timestamp("Time"),
            ],
            receiver: ReceiverConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Ring capacity in samples
    pub fn capacity(&self) -> usize {
        self.batch_size.saturating_mul(self.overflow_factor)
    }

    /// Check the ring sizing parameters
    ///
    /// Signal declarations and calibration are checked while building the
    /// output layout.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.batch_size == 0 {
            return Err(ConfigurationError::ZeroBatchSize);
        }
        if self.overflow_factor < MIN_OVERFLOW_FACTOR {
            return Err(ConfigurationError::OverflowFactor {
                min: MIN_OVERFLOW_FACTOR,
                found: self.overflow_factor,
            });
        }
        Ok(())
    }
}

/// Receiver thread settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// OS thread name
    pub thread_name: String,
    /// Pause after a failed read before retrying (0 = retry immediately)
    pub retry_backoff_ms: u64,
    /// Core index the receiver thread is pinned to
    pub cpu_affinity: Option<usize>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            thread_name: "acq-receiver".to_string(),
            retry_backoff_ms: 0,
            cpu_affinity: None,
        }
    }
}
