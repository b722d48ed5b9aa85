//! Per-Channel Analog Calibration

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Linear conversion of raw ADC counts to physical units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationEntry {
    /// Multiplier applied to the raw count
    pub gain: f64,
    /// Added after the gain
    pub offset: f64,
}

impl CalibrationEntry {
    /// Pass-through calibration
    pub const IDENTITY: CalibrationEntry = CalibrationEntry { gain: 1.0, offset: 0.0 };

    /// Create an entry
    pub fn new(gain: f64, offset: f64) -> Self {
        Self { gain, offset }
    }

    /// Convert a raw count
    #[inline]
    pub fn apply(&self, raw: i16) -> f64 {
        raw as f64 * self.gain + self.offset
    }
}

impl Default for CalibrationEntry {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Calibration arrays as they appear in configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// One gain per analog channel
    pub gains: Vec<f64>,
    /// One offset per analog channel
    pub offsets: Vec<f64>,
}

impl CalibrationConfig {
    /// Unity gains and zero offsets for `channels` analog channels
    pub fn identity(channels: usize) -> Self {
        Self {
            gains: vec![1.0; channels],
            offsets: vec![0.0; channels],
        }
    }
}

/// Calibration table indexed by global analog channel
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    entries: Vec<CalibrationEntry>,
}

impl Calibration {
    /// Build the table from gain and offset arrays
    ///
    /// Both arrays must hold exactly `channels` elements.
    pub fn from_arrays(gains: &[f64], offsets: &[f64], channels: usize) -> Result<Self, ConfigurationError> {
        if gains.len() != channels {
            return Err(ConfigurationError::CalibrationLength {
                field: "gains",
                expected: channels,
                found: gains.len(),
            });
        }
        if offsets.len() != channels {
            return Err(ConfigurationError::CalibrationLength {
                field: "offsets",
                expected: channels,
                found: offsets.len(),
            });
        }

        let entries = gains
            .iter()
            .zip(offsets)
            .map(|(&gain, &offset)| CalibrationEntry::new(gain, offset))
            .collect();
        Ok(Self { entries })
    }

    /// Build the table from its configuration form
    pub fn from_config(config: &CalibrationConfig, channels: usize) -> Result<Self, ConfigurationError> {
        Self::from_arrays(&config.gains, &config.offsets, channels)
    }

    /// Identity calibration for `channels` channels
    pub fn identity(channels: usize) -> Self {
        Self {
            entries: vec![CalibrationEntry::IDENTITY; channels],
        }
    }

    /// Number of calibrated channels
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for an analog channel
    pub fn entry(&self, channel: usize) -> Option<&CalibrationEntry> {
        self.entries.get(channel)
    }

    /// All entries in channel order
    pub fn entries(&self) -> &[CalibrationEntry] {
        &self.entries
    }
}
