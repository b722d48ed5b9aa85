//! Sample Ring Buffer
//!
//! Fixed-capacity circular storage for raw digitizer samples, sized once at
//! configuration time as `batch_size * overflow_factor` slots.

mod buffer;

pub use buffer::{RingBuffer, RingError, DEFAULT_OVERFLOW_FACTOR, MIN_OVERFLOW_FACTOR};
