//! Acquisition Runner
//!
//! Wires a transport, an [`AcquisitionEngine`] and a fixed-rate consumer
//! loop together for standalone operation.

pub mod settings;

use acq_engine::{AcquisitionEngine, AcquisitionStats, EngineError};
use acq_protocol::{DatagramSource, PacketSource, StreamSource, TransportError, TransportMode};
use config::ConfigError;
use thiserror::Error;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub use settings::{LogFormat, RunnerConfig, TransportConfig};

/// Runner errors
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid log level: {0}")]
    LogLevel(String),

    #[error("Failed to install tracing subscriber: {0}")]
    Logging(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Install the global tracing subscriber
pub fn init_logging(level: &str, format: LogFormat) -> Result<(), RunnerError> {
    let level: Level = level
        .parse()
        .map_err(|_| RunnerError::LogLevel(level.to_string()))?;

    let result = match format {
        LogFormat::Text => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_target(true)
                .with_thread_names(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
        LogFormat::Json => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_target(true)
                .with_thread_names(true)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
    };
    result.map_err(|err| RunnerError::Logging(err.to_string()))
}

/// Open the packet source described by `config`
///
/// Stream mode connects to the digitizer; datagram mode binds the local
/// address the digitizer sends to.
pub fn open_source(config: &TransportConfig) -> Result<Box<dyn PacketSource>, RunnerError> {
    let addr = (config.address.as_str(), config.port);
    let timeout = config.read_timeout();
    let source: Box<dyn PacketSource> = match config.mode {
        TransportMode::Stream => Box::new(StreamSource::connect(addr, timeout)?),
        TransportMode::Datagram => Box::new(DatagramSource::bind(addr, timeout)?),
    };
    Ok(source)
}

/// Run the acquisition loop over `source` until `max_cycles` batches were
/// extracted or the engine shuts down
pub fn run<S>(config: &RunnerConfig, source: S) -> Result<AcquisitionStats, RunnerError>
where
    S: PacketSource + 'static,
{
    let engine = AcquisitionEngine::new(&config.engine)?;
    let mut extractor = engine.take_extractor()?;
    let receiver = engine.spawn_receiver(source)?;

    let layout = engine.layout();
    info!(
        "Output batch: {} signals, {} bytes, offsets {:?}",
        layout.signal_count(),
        layout.total_bytes(),
        layout.offsets()
    );

    let mut cycles: u64 = 0;
    while config.max_cycles.map_or(true, |max| cycles < max) {
        match extractor.extract_batch() {
            Ok(_) => cycles += 1,
            Err(EngineError::Shutdown) => break,
            Err(err) => {
                engine.shutdown();
                return Err(err.into());
            }
        }

        if config.report_interval > 0 && cycles % config.report_interval == 0 {
            let stats = engine.stats();
            info!(
                "Cycle {}: {} packets, {} lost, {} overflows, {} transport errors, {} unread",
                cycles,
                stats.packets_received,
                stats.packets_lost,
                stats.overflow_events,
                stats.transport_errors,
                stats.available
            );
        }
    }

    engine.shutdown();
    if let Err(err) = receiver.join() {
        warn!("Receiver ended with error: {}", err);
    }

    let stats = engine.stats();
    info!("Acquisition finished after {} cycles", cycles);
    Ok(stats)
}
