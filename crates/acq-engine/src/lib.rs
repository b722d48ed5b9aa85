//! Acquisition Engine
//!
//! Decouples a continuously arriving digitizer packet stream from a
//! periodic real-time consumer. A receiver thread parses one packet per
//! sample into a ring buffer; once per cycle the consumer blocks until a
//! full batch is available and extracts it, calibrated, into the output
//! batch buffer.
//!
//! ```text
//! PacketSource -> NetworkReceiver -> [RingBuffer] -> BatchExtractor -> OutputBatch
//! ```

mod config;
mod engine;
mod error;
mod extractor;
mod receiver;
mod shared;
mod stats;
mod wake;

#[cfg(test)]
mod testing;

pub use config::{EngineConfig, ReceiverConfig};
pub use engine::AcquisitionEngine;
pub use error::EngineError;
pub use extractor::BatchExtractor;
pub use receiver::{NetworkReceiver, PacketInjector, ReceiverHandle, ReceiverState, StepOutcome};
pub use shared::PushOutcome;
pub use stats::AcquisitionStats;
pub use wake::WakeSignal;
