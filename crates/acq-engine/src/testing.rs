//! Shared test fixtures

use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

use acq_protocol::{BoardGeometry, PacketLayout, PacketSource, RawSample, TransportError};
use signal_layout::{CalibrationConfig, SignalDeclaration};

use crate::config::{EngineConfig, ReceiverConfig};

/// Two analog channels, one digital word; signals Counter, Time, Ai1, Di0
pub(crate) fn engine_config(batch_size: usize, overflow_factor: usize) -> EngineConfig {
    EngineConfig {
        geometry: BoardGeometry::new(vec![2], 1),
        batch_size,
        overflow_factor,
        calibration: CalibrationConfig::identity(2),
        signals: vec![
            SignalDeclaration::counter("Counter"),
            SignalDeclaration::timestamp("Time"),
            SignalDeclaration::analog("Ai1", 1),
            SignalDeclaration::digital("Di0", 0),
        ],
        receiver: ReceiverConfig::default(),
    }
}

/// Encoded packet for the two-channel, one-word geometry
pub(crate) fn packet(counter: i32, timestamp: u32, analog: [i16; 2], digital: u32) -> Vec<u8> {
    let sample = RawSample {
        counter,
        timestamp,
        analog: analog.to_vec(),
        digital: vec![digital],
    };
    PacketLayout::new(2, 1)
        .encode(&sample)
        .expect("sample matches layout")
}

/// Packet source replaying a fixed script, then timing out
pub(crate) struct ScriptedSource {
    script: VecDeque<Result<Vec<u8>, TransportError>>,
}

impl ScriptedSource {
    pub(crate) fn new(script: Vec<Result<Vec<u8>, TransportError>>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl PacketSource for ScriptedSource {
    fn read_packet(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        match self.script.pop_front() {
            Some(Ok(packet)) => {
                buf.copy_from_slice(&packet);
                Ok(())
            }
            Some(Err(err)) => Err(err),
            None => {
                thread::sleep(Duration::from_millis(1));
                Err(TransportError::TimedOut)
            }
        }
    }
}
