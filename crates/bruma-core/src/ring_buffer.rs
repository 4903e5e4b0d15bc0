//! Fixed-capacity ring buffer for granular capture.
//!
//! The Memory engine continuously writes live (or substitute) audio into
//! this buffer and reads grains back out of it. Invariants it maintains:
//!
//! - `write_pos` is always in `[0, capacity)`;
//! - `captured()` grows monotonically and saturates at `capacity`;
//! - reads address audio relative to the write head ("n samples ago"),
//!   which is the natural coordinate for recency-biased grain selection.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

/// Circular sample store with a wrapping write pointer.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    data: Vec<f32>,
    write_pos: usize,
    captured: usize,
}

impl RingBuffer {
    /// Create with the given capacity in samples. Capacity must be > 0.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0.0; capacity.max(1)],
            write_pos: 0,
            captured: 0,
        }
    }

    /// Capacity in samples.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of valid samples written so far, saturating at capacity.
    #[inline]
    pub fn captured(&self) -> usize {
        self.captured
    }

    /// Current write position, always `< capacity`.
    #[inline]
    pub fn write_pos(&self) -> usize {
        self.write_pos
    }

    /// Append one sample, wrapping at capacity.
    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.data[self.write_pos] = sample;
        self.write_pos += 1;
        if self.write_pos == self.data.len() {
            self.write_pos = 0;
        }
        if self.captured < self.data.len() {
            self.captured += 1;
        }
    }

    /// Append a block of samples.
    pub fn extend(&mut self, samples: &[f32]) {
        for &s in samples {
            self.push(s);
        }
    }

    /// Read the sample written `age` samples ago (0 = most recent).
    ///
    /// Ages beyond the captured region return 0.0 — a grain scheduled
    /// into unwritten space is silent rather than garbage.
    #[inline]
    pub fn read_ago(&self, age: usize) -> f32 {
        if age >= self.captured {
            return 0.0;
        }
        // write_pos points at the next slot, so "1 ago" is write_pos - 1
        let idx = (self.write_pos + self.data.len() - 1 - age) % self.data.len();
        self.data[idx]
    }

    /// Forget everything; capacity is unchanged.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
        self.write_pos = 0;
        self.captured = 0;
    }
}
