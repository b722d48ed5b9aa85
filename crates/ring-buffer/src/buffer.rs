//! Ring Buffer Implementation

use acq_protocol::{PacketLayout, RawSample};
use thiserror::Error;

/// Default ring size in batches
pub const DEFAULT_OVERFLOW_FACTOR: usize = 4;

/// Smallest ring size in batches
pub const MIN_OVERFLOW_FACTOR: usize = 2;

/// Errors creating a ring buffer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RingError {
    /// Capacity too small to hold a single sample
    #[error("Ring capacity must be at least 2 slots, got {0}")]
    CapacityTooSmall(usize),
}

/// Circular array of raw samples with wraparound read and write indices
///
/// The ring itself is not synchronized: a single producer advances the
/// write index, a single consumer advances the read index, and the caller
/// serializes both behind one lock. No index ever leaves `0..capacity`.
///
/// The ring never refuses a write. When the producer laps a slow consumer,
/// unread slots are overwritten in place.
#[derive(Debug)]
pub struct RingBuffer {
    /// Pre-allocated slots
    slots: Box<[RawSample]>,
    /// Index of the next slot to write
    write_index: usize,
    /// Index of the first unread slot
    read_index: usize,
    /// Total samples written (for statistics)
    total_written: u64,
}

impl RingBuffer {
    /// Create a ring of `capacity` slots shaped for `layout`
    pub fn new(capacity: usize, layout: &PacketLayout) -> Result<Self, RingError> {
        if capacity < 2 {
            return Err(RingError::CapacityTooSmall(capacity));
        }
        let slots: Vec<RawSample> = (0..capacity).map(|_| RawSample::zeroed(layout)).collect();
        Ok(Self {
            slots: slots.into_boxed_slice(),
            write_index: 0,
            read_index: 0,
            total_written: 0,
        })
    }

    /// Create a ring holding `overflow_factor` batches of `batch_size` samples
    pub fn for_batches(batch_size: usize, overflow_factor: usize, layout: &PacketLayout) -> Result<Self, RingError> {
        Self::new(batch_size.saturating_mul(overflow_factor), layout)
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Index of the next slot to write
    pub fn write_index(&self) -> usize {
        self.write_index
    }

    /// Index of the first unread slot
    pub fn read_index(&self) -> usize {
        self.read_index
    }

    /// Samples written but not yet read: `(write - read) mod capacity`
    pub fn available(&self) -> usize {
        let capacity = self.capacity();
        (self.write_index + capacity - self.read_index) % capacity
    }

    /// Whether the producer is about to lap the consumer
    pub fn is_saturated(&self) -> bool {
        self.available() >= self.capacity() - 1
    }

    /// Fill ratio (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        self.available() as f64 / self.capacity() as f64
    }

    /// Slot at the write index, to be filled before [`advance_write`](Self::advance_write)
    pub fn write_slot(&mut self) -> &mut RawSample {
        &mut self.slots[self.write_index]
    }

    /// Copy `sample` into the write slot and advance the write index
    pub fn push(&mut self, sample: &RawSample) {
        self.write_slot().copy_from(sample);
        self.advance_write();
    }

    /// Move the write index forward by one slot
    pub fn advance_write(&mut self) {
        self.write_index = (self.write_index + 1) % self.capacity();
        self.total_written += 1;
    }

    /// Move the read index forward by `n` slots
    pub fn advance_read(&mut self, n: usize) {
        self.read_index = (self.read_index + n) % self.capacity();
    }

    /// Unread slot `offset` positions after the read index
    pub fn peek(&self, offset: usize) -> &RawSample {
        &self.slots[(self.read_index + offset) % self.capacity()]
    }

    /// Iterate over `count` slots starting at the read index
    pub fn iter_unread(&self, count: usize) -> impl Iterator<Item = &RawSample> + '_ {
        (0..count).map(move |offset| self.peek(offset))
    }

    /// Total samples written since creation
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Discard unread samples
    pub fn clear(&mut self) {
        self.read_index = self.write_index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn layout() -> PacketLayout {
        PacketLayout::new(2, 1)
    }

    fn sample(counter: i32) -> RawSample {
        RawSample {
            counter,
            timestamp: counter as u32 * 10,
            analog: vec![counter as i16, -(counter as i16)],
            digital: vec![counter as u32],
        }
    }

    #[test]
    fn test_push_and_peek() {
        let mut ring = RingBuffer::new(10, &layout()).unwrap();
        for i in 0..5 {
            ring.push(&sample(i));
        }

        assert_eq!(ring.available(), 5);
        assert_eq!(ring.peek(0).counter, 0);
        assert_eq!(ring.peek(4).analog, vec![4, -4]);

        ring.advance_read(3);
        assert_eq!(ring.available(), 2);
        let counters: Vec<i32> = ring.iter_unread(2).map(|s| s.counter).collect();
        assert_eq!(counters, vec![3, 4]);
    }

    #[test]
    fn test_available_wraps() {
        let mut ring = RingBuffer::new(10, &layout()).unwrap();
        // read = 8, write = 2
        for _ in 0..8 {
            ring.advance_write();
        }
        ring.advance_read(8);
        for _ in 0..4 {
            ring.advance_write();
        }
        assert_eq!(ring.write_index(), 2);
        assert_eq!(ring.read_index(), 8);
        assert_eq!(ring.available(), 4);
    }

    #[test]
    fn test_overwrite_on_full_lap() {
        let mut ring = RingBuffer::new(4, &layout()).unwrap();
        for i in 0..3 {
            ring.push(&sample(i));
        }
        assert!(ring.is_saturated());

        // A fourth write laps the reader: the ring looks empty again
        ring.push(&sample(3));
        assert_eq!(ring.available(), 0);
        ring.push(&sample(4));
        assert_eq!(ring.available(), 1);
        assert_eq!(ring.peek(0).counter, 4);
        assert_eq!(ring.total_written(), 5);
    }

    #[test]
    fn test_for_batches_capacity() {
        let ring = RingBuffer::for_batches(4, 2, &layout()).unwrap();
        assert_eq!(ring.capacity(), 8);
        assert_eq!(ring.peek(7).analog.len(), 2);
        assert_eq!(ring.peek(7).digital.len(), 1);
    }

    #[test]
    fn test_capacity_too_small() {
        assert_eq!(
            RingBuffer::new(1, &layout()).unwrap_err(),
            RingError::CapacityTooSmall(1)
        );
    }

    #[test]
    fn test_fill_ratio_and_clear() {
        let mut ring = RingBuffer::new(100, &layout()).unwrap();
        for _ in 0..50 {
            ring.advance_write();
        }
        assert!((ring.fill_ratio() - 0.5).abs() < 0.01);
        ring.clear();
        assert_eq!(ring.available(), 0);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Write,
        Read(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![Just(Op::Write), (0usize..64).prop_map(Op::Read)]
    }

    proptest! {
        #[test]
        fn prop_indices_stay_in_range(capacity in 2usize..64, ops in proptest::collection::vec(op(), 0..256)) {
            let mut ring = RingBuffer::new(capacity, &PacketLayout::new(0, 0)).unwrap();
            for op in ops {
                match op {
                    Op::Write => ring.advance_write(),
                    Op::Read(n) => ring.advance_read(n),
                }
                prop_assert!(ring.write_index() < capacity);
                prop_assert!(ring.read_index() < capacity);
                prop_assert!(ring.available() < capacity);
            }
        }

        #[test]
        fn prop_available_invariant_under_equal_advance(
            capacity in 2usize..64,
            writes in 0usize..200,
            reads in 0usize..200,
            shift in 0usize..200,
        ) {
            let mut ring = RingBuffer::new(capacity, &PacketLayout::new(0, 0)).unwrap();
            for _ in 0..writes {
                ring.advance_write();
            }
            ring.advance_read(reads);
            let before = ring.available();

            for _ in 0..shift {
                ring.advance_write();
            }
            ring.advance_read(shift);
            prop_assert_eq!(ring.available(), before);
        }
    }
}
