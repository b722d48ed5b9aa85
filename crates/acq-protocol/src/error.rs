//! Protocol and Transport Error Types

use thiserror::Error;

/// Errors raised while decoding or encoding wire packets
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Packet does not have the length implied by the board geometry
    #[error("Packet length mismatch: expected {expected} bytes, got {actual}")]
    PacketLength { expected: usize, actual: usize },

    /// Sample does not match the packet layout it is encoded with
    #[error(
        "Sample shape mismatch: expected {expected_analog} analog / {expected_digital} digital, \
         got {actual_analog} / {actual_digital}"
    )]
    SampleShape {
        expected_analog: usize,
        expected_digital: usize,
        actual_analog: usize,
        actual_digital: usize,
    },

    /// Geometry carries neither analog channels nor digital words
    #[error("Board geometry declares no analog channels and no digital words")]
    EmptyGeometry,
}

/// Errors that can occur while reading packets from the network
#[derive(Debug, Error)]
pub enum TransportError {
    /// Socket level error
    #[error("Transport I/O error: {0}")]
    Io(std::io::Error),

    /// Peer closed the stream
    #[error("Connection closed by peer after {received} of {expected} bytes")]
    ConnectionClosed { received: usize, expected: usize },

    /// Datagram carried more or fewer bytes than one packet
    #[error("Datagram size mismatch: expected {expected} bytes, got {actual}")]
    DatagramSize { expected: usize, actual: usize },

    /// Read timeout elapsed before any packet data arrived
    #[error("Timed out waiting for packet data")]
    TimedOut,
}

impl TransportError {
    /// Whether the error only reports that no data arrived in time
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::TimedOut)
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => TransportError::TimedOut,
            _ => TransportError::Io(err),
        }
    }
}
