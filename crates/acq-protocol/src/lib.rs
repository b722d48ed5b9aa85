//! Digitizer Stream Protocol
//!
//! This crate describes the fixed-format packets produced by streaming
//! digitizer boards: one packet per sample, carrying every analog channel,
//! every digital input word, a sample counter and a device timestamp.
//! It also provides the TCP (bulk) and UDP (real-time) transports the
//! packets arrive on.

mod error;
mod geometry;
mod packet;
mod transport;

pub use error::{ProtocolError, TransportError};
pub use geometry::BoardGeometry;
pub use packet::{PacketLayout, RawSample};
pub use transport::{DatagramSource, PacketReader, PacketSource, StreamSource, TransportMode};

/// Field sizes of the wire packet
pub mod wire {
    /// One signed 16-bit raw ADC sample per analog channel
    pub const ANALOG_SAMPLE_BYTES: usize = 2;
    /// One unsigned 32-bit word per digital input module
    pub const DIGITAL_WORD_BYTES: usize = 4;
    /// Signed 32-bit sample counter
    pub const COUNTER_BYTES: usize = 4;
    /// Unsigned 32-bit device timestamp (ticks)
    pub const TIMESTAMP_BYTES: usize = 4;
    /// Digital input bits carried by one digital word
    pub const BITS_PER_DIGITAL_WORD: usize = 32;
}
