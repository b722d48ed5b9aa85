//! Wire Packet Layout and Decoding
//!
//! One packet carries one sample of every channel:
//!
//! | Offset        | Length | Field                                  |
//! |---------------|--------|----------------------------------------|
//! | 0             | 2*A    | A signed 16-bit raw analog samples     |
//! | 2*A           | 4*D    | D unsigned 32-bit digital input words  |
//! | 2*A + 4*D     | 4      | signed 32-bit sample counter           |
//! | 2*A + 4*D + 4 | 4      | unsigned 32-bit device timestamp       |
//!
//! All fields are little-endian.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::ProtocolError;
use crate::wire::{
    ANALOG_SAMPLE_BYTES, BITS_PER_DIGITAL_WORD, COUNTER_BYTES, DIGITAL_WORD_BYTES,
    TIMESTAMP_BYTES,
};

/// One raw sample as delivered by the digitizer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSample {
    /// Sample counter (increments by one per packet)
    pub counter: i32,
    /// Device timestamp in ticks
    pub timestamp: u32,
    /// Raw ADC counts, one per analog channel
    pub analog: Vec<i16>,
    /// Raw digital input words, one per digital module
    pub digital: Vec<u32>,
}

impl RawSample {
    /// Create a zeroed sample shaped for `layout`
    pub fn zeroed(layout: &PacketLayout) -> Self {
        Self {
            counter: 0,
            timestamp: 0,
            analog: vec![0; layout.analog_channels()],
            digital: vec![0; layout.digital_words()],
        }
    }

    /// Overwrite this sample in place, reusing its allocations
    pub fn copy_from(&mut self, other: &RawSample) {
        self.counter = other.counter;
        self.timestamp = other.timestamp;
        self.analog.clone_from(&other.analog);
        self.digital.clone_from(&other.digital);
    }

    /// Value (0 or 1) of a digital input bit, if the bit exists
    pub fn digital_bit(&self, bit: usize) -> Option<u8> {
        let word = self.digital.get(bit / BITS_PER_DIGITAL_WORD)?;
        Some(((word >> (bit % BITS_PER_DIGITAL_WORD)) & 1) as u8)
    }
}

/// Byte layout of a packet for a given number of analog channels and digital words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketLayout {
    analog_channels: usize,
    digital_words: usize,
}

impl PacketLayout {
    /// Create a layout
    pub fn new(analog_channels: usize, digital_words: usize) -> Self {
        Self {
            analog_channels,
            digital_words,
        }
    }

    /// Number of analog channels per packet
    pub fn analog_channels(&self) -> usize {
        self.analog_channels
    }

    /// Number of digital words per packet
    pub fn digital_words(&self) -> usize {
        self.digital_words
    }

    /// Total packet length in bytes
    pub fn packet_len(&self) -> usize {
        self.timestamp_offset() + TIMESTAMP_BYTES
    }

    /// Offset of the first digital word
    pub fn digital_offset(&self) -> usize {
        self.analog_channels * ANALOG_SAMPLE_BYTES
    }

    /// Offset of the sample counter
    pub fn counter_offset(&self) -> usize {
        self.digital_offset() + self.digital_words * DIGITAL_WORD_BYTES
    }

    /// Offset of the device timestamp
    pub fn timestamp_offset(&self) -> usize {
        self.counter_offset() + COUNTER_BYTES
    }

    /// Decode a packet into an existing sample, reusing its buffers
    pub fn decode_into(&self, packet: &[u8], sample: &mut RawSample) -> Result<(), ProtocolError> {
        self.check_length(packet.len())?;

        sample.analog.resize(self.analog_channels, 0);
        sample.digital.resize(self.digital_words, 0);

        LittleEndian::read_i16_into(&packet[..self.digital_offset()], &mut sample.analog);
        LittleEndian::read_u32_into(
            &packet[self.digital_offset()..self.counter_offset()],
            &mut sample.digital,
        );
        sample.counter = LittleEndian::read_i32(&packet[self.counter_offset()..self.timestamp_offset()]);
        sample.timestamp = LittleEndian::read_u32(&packet[self.timestamp_offset()..]);

        Ok(())
    }

    /// Decode a packet into a freshly allocated sample
    pub fn decode(&self, packet: &[u8]) -> Result<RawSample, ProtocolError> {
        let mut sample = RawSample::zeroed(self);
        self.decode_into(packet, &mut sample)?;
        Ok(sample)
    }

    /// Encode a sample into wire format (used by simulators and tests)
    pub fn encode(&self, sample: &RawSample) -> Result<Vec<u8>, ProtocolError> {
        if sample.analog.len() != self.analog_channels || sample.digital.len() != self.digital_words {
            return Err(ProtocolError::SampleShape {
                expected_analog: self.analog_channels,
                expected_digital: self.digital_words,
                actual_analog: sample.analog.len(),
                actual_digital: sample.digital.len(),
            });
        }

        let mut packet = vec![0u8; self.packet_len()];
        LittleEndian::write_i16_into(&sample.analog, &mut packet[..self.digital_offset()]);
        LittleEndian::write_u32_into(
            &sample.digital,
            &mut packet[self.digital_offset()..self.counter_offset()],
        );
        LittleEndian::write_i32(
            &mut packet[self.counter_offset()..self.timestamp_offset()],
            sample.counter,
        );
        LittleEndian::write_u32(&mut packet[self.timestamp_offset()..], sample.timestamp);
        Ok(packet)
    }

    fn check_length(&self, actual: usize) -> Result<(), ProtocolError> {
        let expected = self.packet_len();
        if actual != expected {
            return Err(ProtocolError::PacketLength { expected, actual });
        }
        Ok(())
    }
}
