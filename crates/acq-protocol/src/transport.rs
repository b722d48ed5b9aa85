//! Network Transports
//!
//! The digitizer streams packets either over a TCP connection (bulk mode,
//! packets may be split across reads) or as UDP datagrams (real-time mode,
//! one datagram per packet).

use std::io::{ErrorKind, Read};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::error::TransportError;

/// How packets travel from the digitizer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// TCP byte stream (bulk readout)
    Stream,
    /// UDP datagrams (real-time readout)
    #[default]
    Datagram,
}

/// A source of fixed-length packets
pub trait PacketSource: Send {
    /// Fill `buf` with exactly one packet
    fn read_packet(&mut self, buf: &mut [u8]) -> Result<(), TransportError>;
}

impl<S: PacketSource + ?Sized> PacketSource for Box<S> {
    fn read_packet(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        (**self).read_packet(buf)
    }
}

/// Reassembles fixed-length packets from a byte stream
///
/// A read timeout is reported as [`TransportError::TimedOut`] even in the
/// middle of a packet. The bytes received so far stay pending and the next
/// call resumes where the last one stopped, so the stream never loses packet
/// alignment and the caller regains control once per timeout.
#[derive(Debug)]
pub struct PacketReader<R> {
    reader: R,
    pending: Vec<u8>,
    filled: usize,
}

impl<R: Read> PacketReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: Vec::new(),
            filled: 0,
        }
    }

    /// Underlying reader
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Bytes of the next packet already received
    pub fn pending_len(&self) -> usize {
        self.filled
    }

    /// Fill `buf` with the next complete packet
    pub fn read_packet(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        let expected = buf.len();
        if self.pending.len() != expected {
            self.pending.resize(expected, 0);
            self.filled = 0;
        }

        while self.filled < expected {
            match self.reader.read(&mut self.pending[self.filled..]) {
                Ok(0) => {
                    let received = std::mem::take(&mut self.filled);
                    return Err(TransportError::ConnectionClosed { received, expected });
                }
                Ok(n) => self.filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    let err = TransportError::from(e);
                    if !err.is_timeout() {
                        self.filled = 0;
                    } else if self.filled > 0 {
                        trace!("Read timed out with {} of {} bytes pending", self.filled, expected);
                    }
                    return Err(err);
                }
            }
        }

        buf.copy_from_slice(&self.pending);
        self.filled = 0;
        Ok(())
    }
}

/// TCP client reading packets from the digitizer's bulk port
pub struct StreamSource {
    reader: PacketReader<TcpStream>,
    peer: SocketAddr,
}

impl StreamSource {
    /// Connect to the digitizer
    ///
    /// # Arguments
    /// * `addr` - Address of the digitizer data port
    /// * `read_timeout` - Optional bound on each blocking read
    pub fn connect<A: ToSocketAddrs>(addr: A, read_timeout: Option<Duration>) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(read_timeout)?;
        stream.set_nodelay(true)?;
        let source = Self::from_stream(stream)?;
        info!("Connected to digitizer stream at {}", source.peer);
        Ok(source)
    }

    /// Wrap an already connected stream
    pub fn from_stream(stream: TcpStream) -> Result<Self, TransportError> {
        let peer = stream.peer_addr()?;
        Ok(Self {
            reader: PacketReader::new(stream),
            peer,
        })
    }

    /// Address of the digitizer
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl PacketSource for StreamSource {
    fn read_packet(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        self.reader.read_packet(buf)
    }
}

/// UDP listener receiving one packet per datagram
pub struct DatagramSource {
    socket: UdpSocket,
    scratch: Vec<u8>,
}

impl DatagramSource {
    /// Bind a listening socket
    ///
    /// # Arguments
    /// * `addr` - Local address to listen on (e.g. `0.0.0.0:53676`)
    /// * `read_timeout` - Optional bound on each blocking receive
    pub fn bind<A: ToSocketAddrs>(addr: A, read_timeout: Option<Duration>) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(read_timeout)?;
        let source = Self::from_socket(socket);
        info!("Listening for digitizer datagrams on {}", source.local_addr()?);
        Ok(source)
    }

    /// Wrap an already bound socket
    pub fn from_socket(socket: UdpSocket) -> Self {
        Self {
            socket,
            scratch: Vec::new(),
        }
    }

    /// Local listening address
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }
}

impl PacketSource for DatagramSource {
    fn read_packet(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        // One spare byte so an oversized datagram is detected instead of truncated
        if self.scratch.len() != buf.len() + 1 {
            self.scratch.resize(buf.len() + 1, 0);
        }

        let (received, from) = self.socket.recv_from(&mut self.scratch)?;
        if received != buf.len() {
            debug!("Dropping {} byte datagram from {}", received, from);
            return Err(TransportError::DatagramSize {
                expected: buf.len(),
                actual: received,
            });
        }

        buf.copy_from_slice(&self.scratch[..received]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::Write;
    use std::net::TcpListener;

    /// Reader replaying a script of chunks and errors, then `WouldBlock` forever
    struct ScriptedReader {
        script: VecDeque<std::io::Result<Vec<u8>>>,
    }

    impl ScriptedReader {
        fn new(script: Vec<std::io::Result<Vec<u8>>>) -> Self {
            Self {
                script: script.into(),
            }
        }
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.script.pop_front() {
                Some(Ok(chunk)) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                Some(Err(e)) => Err(e),
                None => Err(ErrorKind::WouldBlock.into()),
            }
        }
    }

    fn chunks(data: &[u8], size: usize) -> Vec<std::io::Result<Vec<u8>>> {
        data.chunks(size).map(|c| Ok(c.to_vec())).collect()
    }

    #[test]
    fn test_reader_accumulates_partial_reads() {
        let data: Vec<u8> = (0u8..32).collect();
        let mut reader = PacketReader::new(ScriptedReader::new(chunks(&data, 3)));

        let mut first = [0u8; 16];
        reader.read_packet(&mut first).unwrap();
        assert_eq!(first.to_vec(), (0u8..16).collect::<Vec<_>>());

        let mut second = [0u8; 16];
        reader.read_packet(&mut second).unwrap();
        assert_eq!(second.to_vec(), (16u8..32).collect::<Vec<_>>());
    }

    #[test]
    fn test_reader_reports_closed_stream() {
        let mut script = chunks(&[1, 2, 3, 4, 5], 2);
        script.push(Ok(Vec::new()));
        let mut reader = PacketReader::new(ScriptedReader::new(script));

        let mut buf = [0u8; 8];
        match reader.read_packet(&mut buf) {
            Err(TransportError::ConnectionClosed { received, expected }) => {
                assert_eq!(received, 5);
                assert_eq!(expected, 8);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(reader.pending_len(), 0);
    }

    #[test]
    fn test_stall_mid_packet_returns_timeout() {
        let mut reader = PacketReader::new(ScriptedReader::new(vec![Ok(vec![1, 2, 3])]));
        let mut buf = [0u8; 16];

        let (tx, rx) = std::sync::mpsc::channel();
        let worker = std::thread::spawn(move || {
            let result = reader.read_packet(&mut buf);
            tx.send(result.map_err(|e| e.is_timeout())).unwrap();
            reader
        });

        let result = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(result, Err(true));
        let reader = worker.join().unwrap();
        assert_eq!(reader.pending_len(), 3);
    }

    #[test]
    fn test_resumes_after_timeout_without_losing_alignment() {
        let mut reader = PacketReader::new(ScriptedReader::new(vec![
            Ok(vec![1, 2, 3]),
            Err(ErrorKind::TimedOut.into()),
            Ok(vec![4, 5]),
            Err(ErrorKind::WouldBlock.into()),
            Ok(vec![6, 7, 8, 9, 10]),
        ]));
        let mut buf = [0u8; 8];

        assert!(reader.read_packet(&mut buf).unwrap_err().is_timeout());
        assert!(reader.read_packet(&mut buf).unwrap_err().is_timeout());
        assert_eq!(reader.pending_len(), 5);

        reader.read_packet(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(reader.pending_len(), 0);
    }

    #[test]
    fn test_hard_error_discards_partial_packet() {
        let mut reader = PacketReader::new(ScriptedReader::new(vec![
            Ok(vec![1, 2]),
            Err(ErrorKind::ConnectionReset.into()),
        ]));
        let mut buf = [0u8; 4];
        assert!(matches!(reader.read_packet(&mut buf), Err(TransportError::Io(_))));
        assert_eq!(reader.pending_len(), 0);
    }

    #[test]
    fn test_timeout_maps_to_timed_out() {
        let err = TransportError::from(std::io::Error::from(ErrorKind::WouldBlock));
        assert!(err.is_timeout());
        let err = TransportError::from(std::io::Error::from(ErrorKind::ConnectionReset));
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_stream_source_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let sender = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            conn.write_all(&[1, 2, 3]).unwrap();
            conn.flush().unwrap();
            std::thread::sleep(Duration::from_millis(20));
            conn.write_all(&[4, 5, 6, 7, 8]).unwrap();
        });

        let mut source = StreamSource::connect(addr, Some(Duration::from_secs(5))).unwrap();
        let mut buf = [0u8; 8];
        source.read_packet(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4, 5, 6, 7, 8]);
        sender.join().unwrap();
    }

    #[test]
    fn test_datagram_source_over_loopback() {
        let mut source = DatagramSource::bind("127.0.0.1:0", Some(Duration::from_secs(5))).unwrap();
        let target = source.local_addr().unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();

        sender.send_to(&[9, 8, 7, 6], target).unwrap();
        let mut buf = [0u8; 4];
        source.read_packet(&mut buf).unwrap();
        assert_eq!(buf, [9, 8, 7, 6]);

        sender.send_to(&[1, 2, 3, 4, 5], target).unwrap();
        assert!(matches!(
            source.read_packet(&mut buf),
            Err(TransportError::DatagramSize { expected: 4, actual: 5 })
        ));
    }

    #[test]
    fn test_default_transport_mode() {
        assert_eq!(TransportMode::default(), TransportMode::Datagram);
    }
}
