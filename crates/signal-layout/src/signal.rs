//! Signal Declarations and Resolved Descriptors

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of an output signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// Packet sample counter
    Counter,
    /// Device timestamp
    Timestamp,
    /// Calibrated analog channel
    Analog,
    /// Single digital input bit
    Digital,
}

/// Element type of an output signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

impl ElementType {
    /// Size of one element in bytes
    pub fn size_bytes(&self) -> usize {
        match self {
            ElementType::Int8 | ElementType::UInt8 => 1,
            ElementType::Int16 | ElementType::UInt16 => 2,
            ElementType::Int32 | ElementType::UInt32 | ElementType::Float32 => 4,
            ElementType::Int64 | ElementType::UInt64 | ElementType::Float64 => 8,
        }
    }

    /// Lowercase type name as used in configuration files
    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Int8 => "int8",
            ElementType::UInt8 => "uint8",
            ElementType::Int16 => "int16",
            ElementType::UInt16 => "uint16",
            ElementType::Int32 => "int32",
            ElementType::UInt32 => "uint32",
            ElementType::Int64 => "int64",
            ElementType::UInt64 => "uint64",
            ElementType::Float32 => "float32",
            ElementType::Float64 => "float64",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl SignalKind {
    /// Whether `element_type` may carry this kind of signal
    pub fn accepts(&self, element_type: ElementType) -> bool {
        match self {
            SignalKind::Counter | SignalKind::Timestamp => {
                matches!(element_type, ElementType::Int32 | ElementType::UInt32)
            }
            SignalKind::Analog => element_type == ElementType::Float64,
            SignalKind::Digital => matches!(element_type, ElementType::UInt8 | ElementType::Int8),
        }
    }
}

/// One output signal as declared in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalDeclaration {
    /// Signal name
    pub name: String,
    /// What the signal carries
    pub kind: SignalKind,
    /// Analog channel index, or digital bit index
    #[serde(default)]
    pub channel: Option<u32>,
    /// Element type of the output samples
    pub element_type: ElementType,
    /// Samples per batch, if the declaration pins it
    #[serde(default)]
    pub samples: Option<usize>,
}

impl SignalDeclaration {
    /// Counter declaration
    pub fn counter(name: &str) -> Self {
        Self::new(name, SignalKind::Counter, None, ElementType::UInt32)
    }

    /// Timestamp declaration
    pub fn timestamp(name: &str) -> Self {
        Self::new(name, SignalKind::Timestamp, None, ElementType::UInt32)
    }

    /// Calibrated analog channel declaration
    pub fn analog(name: &str, channel: u32) -> Self {
        Self::new(name, SignalKind::Analog, Some(channel), ElementType::Float64)
    }

    /// Digital input bit declaration
    pub fn digital(name: &str, bit: u32) -> Self {
        Self::new(name, SignalKind::Digital, Some(bit), ElementType::UInt8)
    }

    fn new(name: &str, kind: SignalKind, channel: Option<u32>, element_type: ElementType) -> Self {
        Self {
            name: name.to_string(),
            kind,
            channel,
            element_type,
            samples: None,
        }
    }

    /// Override the element type
    pub fn with_element_type(mut self, element_type: ElementType) -> Self {
        self.element_type = element_type;
        self
    }
}

/// Where the samples of a resolved signal come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
    /// Packet counter
    Counter,
    /// Device timestamp
    Timestamp,
    /// Analog channel, converted through its calibration entry
    Analog { channel: usize },
    /// One bit of the digital input words
    Digital { bit: usize },
}

impl SignalSource {
    /// Kind of this source
    pub fn kind(&self) -> SignalKind {
        match self {
            SignalSource::Counter => SignalKind::Counter,
            SignalSource::Timestamp => SignalKind::Timestamp,
            SignalSource::Analog { .. } => SignalKind::Analog,
            SignalSource::Digital { .. } => SignalKind::Digital,
        }
    }
}

/// A validated signal with its place in the output batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalDescriptor {
    /// Signal name
    pub name: String,
    /// Sample source
    pub source: SignalSource,
    /// Element type of the output samples
    pub element_type: ElementType,
    /// Byte offset of the signal region in the output batch
    pub byte_offset: usize,
    /// Length of the signal region in bytes (`batch_size * element size`)
    pub region_len: usize,
}
