//! Output Layout Builder
//!
//! Resolves the ordered signal declarations into byte regions of the output
//! batch. Each signal owns one contiguous region of `batch_size` elements,
//! regions follow each other in declaration order.

use std::ops::Range;

use acq_protocol::BoardGeometry;
use tracing::debug;

use crate::error::ConfigurationError;
use crate::signal::{SignalDeclaration, SignalDescriptor, SignalKind, SignalSource};

/// Validates declarations against a board geometry
pub struct LayoutBuilder<'a> {
    geometry: &'a BoardGeometry,
    batch_size: usize,
}

impl<'a> LayoutBuilder<'a> {
    /// Create a builder for `batch_size` samples per signal
    pub fn new(geometry: &'a BoardGeometry, batch_size: usize) -> Self {
        Self { geometry, batch_size }
    }

    /// Validate every declaration and compute the output layout
    pub fn build(&self, declarations: &[SignalDeclaration]) -> Result<OutputLayout, ConfigurationError> {
        if self.batch_size == 0 {
            return Err(ConfigurationError::ZeroBatchSize);
        }
        if declarations.len() < 2 {
            return Err(ConfigurationError::TooFewSignals {
                found: declarations.len(),
            });
        }

        let mut descriptors = Vec::with_capacity(declarations.len());
        let mut offset = 0usize;

        for (index, declaration) in declarations.iter().enumerate() {
            let source = self.resolve(index, declaration)?;

            if !declaration.kind.accepts(declaration.element_type) {
                return Err(ConfigurationError::ElementType {
                    index,
                    name: declaration.name.clone(),
                    kind: declaration.kind,
                    found: declaration.element_type,
                });
            }

            if let Some(samples) = declaration.samples {
                if samples != self.batch_size {
                    return Err(ConfigurationError::SampleCount {
                        index,
                        name: declaration.name.clone(),
                        expected: self.batch_size,
                        found: samples,
                    });
                }
            }

            let region_len = declaration.element_type.size_bytes() * self.batch_size;
            debug!(
                "Signal {} ({}) {:?} at offset {} ({} bytes)",
                index, declaration.name, source, offset, region_len
            );
            descriptors.push(SignalDescriptor {
                name: declaration.name.clone(),
                source,
                element_type: declaration.element_type,
                byte_offset: offset,
                region_len,
            });
            offset += region_len;
        }

        Ok(OutputLayout {
            descriptors,
            batch_size: self.batch_size,
            total_bytes: offset,
        })
    }

    /// Check kind placement and channel range for one declaration
    fn resolve(&self, index: usize, declaration: &SignalDeclaration) -> Result<SignalSource, ConfigurationError> {
        let expected_header = match index {
            0 => Some(SignalKind::Counter),
            1 => Some(SignalKind::Timestamp),
            _ => None,
        };

        match (expected_header, declaration.kind) {
            (Some(expected), found) if expected != found => {
                return Err(ConfigurationError::HeaderSignal {
                    index,
                    name: declaration.name.clone(),
                    expected,
                    found,
                })
            }
            (None, kind @ (SignalKind::Counter | SignalKind::Timestamp)) => {
                return Err(ConfigurationError::MisplacedHeader {
                    index,
                    name: declaration.name.clone(),
                    kind,
                })
            }
            _ => {}
        }

        match declaration.kind {
            SignalKind::Counter => Ok(SignalSource::Counter),
            SignalKind::Timestamp => Ok(SignalSource::Timestamp),
            SignalKind::Analog => {
                let channel = self.channel_of(index, declaration)?;
                let limit = self.geometry.total_analog_channels();
                if channel as usize >= limit {
                    return Err(ConfigurationError::AnalogChannel {
                        index,
                        name: declaration.name.clone(),
                        channel,
                        limit,
                    });
                }
                Ok(SignalSource::Analog {
                    channel: channel as usize,
                })
            }
            SignalKind::Digital => {
                let bit = self.channel_of(index, declaration)?;
                let limit = self.geometry.digital_bits();
                if bit as usize >= limit {
                    return Err(ConfigurationError::DigitalChannel {
                        index,
                        name: declaration.name.clone(),
                        channel: bit,
                        limit,
                    });
                }
                Ok(SignalSource::Digital { bit: bit as usize })
            }
        }
    }

    fn channel_of(&self, index: usize, declaration: &SignalDeclaration) -> Result<u32, ConfigurationError> {
        declaration
            .channel
            .ok_or_else(|| ConfigurationError::MissingChannel {
                index,
                name: declaration.name.clone(),
                kind: declaration.kind,
            })
    }
}

/// Byte layout of the output batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    descriptors: Vec<SignalDescriptor>,
    batch_size: usize,
    total_bytes: usize,
}

impl OutputLayout {
    /// Build a layout (shorthand for [`LayoutBuilder`])
    pub fn build(
        declarations: &[SignalDeclaration],
        geometry: &BoardGeometry,
        batch_size: usize,
    ) -> Result<Self, ConfigurationError> {
        LayoutBuilder::new(geometry, batch_size).build(declarations)
    }

    /// All signals in declaration order
    pub fn descriptors(&self) -> &[SignalDescriptor] {
        &self.descriptors
    }

    /// One signal
    pub fn descriptor(&self, signal: usize) -> Option<&SignalDescriptor> {
        self.descriptors.get(signal)
    }

    /// Index of the signal called `name`
    pub fn find(&self, name: &str) -> Option<usize> {
        self.descriptors.iter().position(|d| d.name == name)
    }

    /// Number of signals
    pub fn signal_count(&self) -> usize {
        self.descriptors.len()
    }

    /// Samples per signal per batch
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Size of the whole output batch in bytes
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Byte offset of every signal, in declaration order
    pub fn offsets(&self) -> Vec<usize> {
        self.descriptors.iter().map(|d| d.byte_offset).collect()
    }

    /// Byte range of one signal inside the batch
    pub fn region(&self, signal: usize) -> Option<Range<usize>> {
        self.descriptors
            .get(signal)
            .map(|d| d.byte_offset..d.byte_offset + d.region_len)
    }
}
