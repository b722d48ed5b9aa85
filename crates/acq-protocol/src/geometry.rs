//! Digitizer Board Geometry

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::packet::PacketLayout;
use crate::wire::BITS_PER_DIGITAL_WORD;

/// Channel layout of the digitizer system feeding one stream
///
/// Analog channels of all ADC boards are concatenated in board order, so a
/// global analog channel index runs over `0..total_analog_channels()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardGeometry {
    /// Analog channel count of each ADC board, in stream order
    pub adc_channels: Vec<u32>,
    /// Number of 32-bit digital input words (one per DIO module)
    pub digital_words: u32,
}

impl Default for BoardGeometry {
    fn default() -> Self {
        Self {
            adc_channels: vec![32],
            digital_words: 1,
        }
    }
}

impl BoardGeometry {
    /// Create a geometry from per-board analog channel counts
    pub fn new(adc_channels: Vec<u32>, digital_words: u32) -> Self {
        Self {
            adc_channels,
            digital_words,
        }
    }

    /// Number of ADC boards
    pub fn adc_boards(&self) -> usize {
        self.adc_channels.len()
    }

    /// Total analog channels across all ADC boards
    pub fn total_analog_channels(&self) -> usize {
        self.adc_channels.iter().map(|&c| c as usize).sum()
    }

    /// Number of 32-bit digital words per sample
    pub fn digital_words(&self) -> usize {
        self.digital_words as usize
    }

    /// Number of addressable digital input bits
    pub fn digital_bits(&self) -> usize {
        self.digital_words() * BITS_PER_DIGITAL_WORD
    }

    /// Wire layout of one packet produced by this geometry
    pub fn packet_layout(&self) -> Result<PacketLayout, ProtocolError> {
        let analog = self.total_analog_channels();
        let digital = self.digital_words();
        if analog == 0 && digital == 0 {
            return Err(ProtocolError::EmptyGeometry);
        }
        Ok(PacketLayout::new(analog, digital))
    }
}
