//! Output Batch Buffer
//!
//! The contiguous buffer handed to the downstream consumer once per cycle.
//! Elements are stored in host byte order.

use std::sync::Arc;

use byteorder::{ByteOrder, NativeEndian};

use crate::layout::OutputLayout;
use crate::signal::SignalDescriptor;

/// Contiguous output buffer laid out by an [`OutputLayout`]
#[derive(Debug, Clone)]
pub struct OutputBatch {
    layout: Arc<OutputLayout>,
    bytes: Vec<u8>,
}

impl OutputBatch {
    /// Allocate a zeroed batch for `layout`
    pub fn new(layout: Arc<OutputLayout>) -> Self {
        let bytes = vec![0u8; layout.total_bytes()];
        Self { layout, bytes }
    }

    /// Layout of this batch
    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Whole batch as raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Raw bytes of one signal region
    pub fn signal_bytes(&self, signal: usize) -> Option<&[u8]> {
        let range = self.layout.region(signal)?;
        Some(&self.bytes[range])
    }

    /// Mutable raw bytes of one signal region
    pub fn signal_bytes_mut(&mut self, signal: usize) -> Option<&mut [u8]> {
        let range = self.layout.region(signal)?;
        Some(&mut self.bytes[range])
    }

    /// Sample `sample` of a 4-byte signal as unsigned bits
    pub fn read_u32(&self, signal: usize, sample: usize) -> Option<u32> {
        let bytes = self.element(signal, sample, 4)?;
        Some(NativeEndian::read_u32(bytes))
    }

    /// Sample `sample` of a 4-byte signal as signed value
    pub fn read_i32(&self, signal: usize, sample: usize) -> Option<i32> {
        let bytes = self.element(signal, sample, 4)?;
        Some(NativeEndian::read_i32(bytes))
    }

    /// Sample `sample` of a float64 signal
    pub fn read_f64(&self, signal: usize, sample: usize) -> Option<f64> {
        let bytes = self.element(signal, sample, 8)?;
        Some(NativeEndian::read_f64(bytes))
    }

    /// Sample `sample` of a single-byte signal
    pub fn read_u8(&self, signal: usize, sample: usize) -> Option<u8> {
        self.element(signal, sample, 1).map(|bytes| bytes[0])
    }

    /// All samples of a float64 signal
    pub fn f64_values(&self, signal: usize) -> Option<Vec<f64>> {
        self.typed_region(signal, 8)
            .map(|bytes| bytes.chunks_exact(8).map(NativeEndian::read_f64).collect())
    }

    /// All samples of a 4-byte signal as unsigned bits
    pub fn u32_values(&self, signal: usize) -> Option<Vec<u32>> {
        self.typed_region(signal, 4)
            .map(|bytes| bytes.chunks_exact(4).map(NativeEndian::read_u32).collect())
    }

    fn descriptor(&self, signal: usize) -> Option<&SignalDescriptor> {
        self.layout.descriptor(signal)
    }

    fn typed_region(&self, signal: usize, size: usize) -> Option<&[u8]> {
        let descriptor = self.descriptor(signal)?;
        if descriptor.element_type.size_bytes() != size {
            return None;
        }
        self.signal_bytes(signal)
    }

    fn element(&self, signal: usize, sample: usize, size: usize) -> Option<&[u8]> {
        if sample >= self.layout.batch_size() {
            return None;
        }
        let region = self.typed_region(signal, size)?;
        Some(&region[sample * size..(sample + 1) * size])
    }
}
