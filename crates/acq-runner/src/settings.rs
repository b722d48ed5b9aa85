//! Runner configuration
//!
//! Loaded from a TOML (or any format the `config` crate recognises) file,
//! with `ACQ__`-prefixed environment variables layered on top, e.g.
//! `ACQ__TRANSPORT__PORT=6000` or `ACQ__ENGINE__BATCH_SIZE=50`.

use std::path::Path;
use std::time::Duration;

use acq_engine::EngineConfig;
use acq_protocol::TransportMode;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::RunnerError;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// TCP stream or UDP datagrams
    pub mode: TransportMode,
    /// Digitizer address (stream) or local bind address (datagram)
    pub address: String,
    pub port: u16,
    /// Read timeout; bounds how long shutdown waits on the receiver (0 = block)
    pub read_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: TransportMode::Datagram,
            address: "0.0.0.0".to_string(),
            port: 5000,
            read_timeout_ms: 100,
        }
    }
}

impl TransportConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }
}

/// Complete runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub engine: EngineConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    /// Maximum tracing level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Stop after this many batches (run until shutdown when absent)
    #[serde(default)]
    pub max_cycles: Option<u64>,
    /// Log statistics every this many cycles (0 = never)
    #[serde(default = "default_report_interval")]
    pub report_interval: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_report_interval() -> u64 {
    100
}

impl RunnerConfig {
    /// Load from `path` with environment overrides
    pub fn load(path: &Path) -> Result<Self, RunnerError> {
        let settings = Config::builder()
            .add_source(File::from(path))
            .add_source(Environment::with_prefix("ACQ").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Parse from TOML text, without environment overrides
    pub fn from_toml(text: &str) -> Result<Self, RunnerError> {
        let settings = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
