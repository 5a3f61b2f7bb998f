//! Growable sample buffer moved between pipeline stages.
//!
//! A [`SampleBuffer`] carries interleaved `f32` samples from the decode/mix
//! stage to an output sink. The backing store may be larger than the logical
//! sample count, and the two grow paths have different contracts:
//! - [`SampleBuffer::set_length`] is a pure resize for full-overwrite
//!   producers; growing discards the old contents.
//! - [`SampleBuffer::write_at`] is an offset write for incremental producers;
//!   growing preserves everything already in the store.
//!
//! Not thread-safe: a single writer at a time, and readers must observe the
//! buffer only across an external synchronization point (a handoff queue or a
//! mutex around the whole buffer). Growth allocates synchronously, so
//! real-time callers should pre-size.

use thiserror::Error;

/// Errors raised by buffer operations.
#[derive(Debug, Error)]
pub enum BufferError {
    /// A fixed-capacity buffer that has already been sized was asked to grow.
    #[error("cannot grow fixed-capacity buffer from {capacity} to {requested} samples")]
    ResizeOnImmutableBuffer { capacity: usize, requested: usize },
}

/// Who owns the backing store, decided at construction and fixed for the
/// lifetime of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOwnership {
    /// The buffer owns its allocation and frees it on drop.
    OwnsStore,
    /// The store is caller-supplied memory, never reallocated or freed here.
    ExternalView,
}

#[derive(Debug)]
enum Store<'a> {
    Owned(Box<[f32]>),
    View(&'a mut [f32]),
}

impl Store<'_> {
    fn slice(&self) -> &[f32] {
        match self {
            Store::Owned(samples) => samples,
            Store::View(samples) => samples,
        }
    }

    fn slice_mut(&mut self) -> &mut [f32] {
        match self {
            Store::Owned(samples) => samples,
            Store::View(samples) => samples,
        }
    }
}

/// Contiguous interleaved `f32` sample container with format metadata and a
/// playback-position marker.
///
/// Invariant: `len() <= capacity()` at all times; a failed grow commits
/// nothing.
#[derive(Debug)]
pub struct SampleBuffer<'a> {
    store: Store<'a>,
    length: usize,
    sample_rate: u32,
    channels: u16,
    position: f64,
    fixed_capacity: bool,
}

impl SampleBuffer<'static> {
    /// Create an empty growable buffer.
    pub fn new() -> Self {
        Self::owned(false)
    }

    /// Create an empty fixed-capacity buffer. The first nonzero sizing pins
    /// the capacity; any later grow fails with
    /// [`BufferError::ResizeOnImmutableBuffer`].
    pub fn fixed() -> Self {
        Self::owned(true)
    }

    fn owned(fixed_capacity: bool) -> Self {
        Self {
            store: Store::Owned(Vec::new().into_boxed_slice()),
            length: 0,
            sample_rate: 44_100,
            channels: 2,
            position: 0.0,
            fixed_capacity,
        }
    }
}

impl Default for SampleBuffer<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> SampleBuffer<'a> {
    /// Wrap caller-supplied memory. The buffer never reallocates or frees the
    /// slice; capacity is fixed at the slice length and `len() == capacity()`.
    pub fn view(samples: &'a mut [f32]) -> SampleBuffer<'a> {
        let length = samples.len();
        SampleBuffer {
            store: Store::View(samples),
            length,
            sample_rate: 44_100,
            channels: 2,
            position: 0.0,
            fixed_capacity: true,
        }
    }

    /// Logical number of valid samples (not bytes, not frames).
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Size of the backing store in samples; may exceed [`SampleBuffer::len`].
    pub fn capacity(&self) -> usize {
        self.store.slice().len()
    }

    /// Logical size in bytes, independent of the backing capacity.
    pub fn byte_size(&self) -> usize {
        self.length * size_of::<f32>()
    }

    pub fn ownership(&self) -> StoreOwnership {
        match self.store {
            Store::Owned(_) => StoreOwnership::OwnsStore,
            Store::View(_) => StoreOwnership::ExternalView,
        }
    }

    pub fn is_fixed_capacity(&self) -> bool {
        self.fixed_capacity
    }

    /// The valid sample region `[0, len)`.
    pub fn samples(&self) -> &[f32] {
        &self.store.slice()[..self.length]
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        let length = self.length;
        &mut self.store.slice_mut()[..length]
    }

    /// Sample rate in hertz. Format metadata only, never validated against
    /// the store.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn set_channels(&mut self, channels: u16) {
        self.channels = channels;
    }

    /// Playback-timeline marker in buffer-defined units; not tied to `len()`.
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn set_position(&mut self, position: f64) {
        self.position = position;
    }

    /// Copy sample rate and channel count from another buffer. Sample data is
    /// never touched.
    pub fn copy_format(&mut self, from: &SampleBuffer<'_>) {
        self.sample_rate = from.sample_rate;
        self.channels = from.channels;
    }

    /// Set the logical length, growing the store if needed.
    ///
    /// Growing is a pure resize: the store is replaced with a fresh zeroed
    /// allocation of exactly `samples` samples and the old contents are
    /// discarded. Shrinking or equal sizing never touches capacity.
    pub fn set_length(&mut self, samples: usize) -> Result<(), BufferError> {
        if samples > self.capacity() {
            self.check_growable(samples)?;
            self.store = Store::Owned(vec![0.0; samples].into_boxed_slice());
        }
        self.length = samples;
        Ok(())
    }

    /// Copy `source` into the store at `offset`, growing if the span
    /// `offset + source.len()` exceeds capacity.
    ///
    /// Unlike [`SampleBuffer::set_length`], growth preserves everything
    /// already in the store: the entire old allocation is copied to the front
    /// of the new one before `source` is written at `offset`. When the span
    /// fits, the copy happens in place without reallocating. Logical length
    /// becomes `max(len, span)`.
    pub fn write_at(&mut self, source: &[f32], offset: usize) -> Result<(), BufferError> {
        let span = offset + source.len();
        if span > self.capacity() {
            self.check_growable(span)?;
            let mut grown = vec![0.0; span].into_boxed_slice();
            let old = self.store.slice();
            grown[..old.len()].copy_from_slice(old);
            grown[offset..span].copy_from_slice(source);
            self.store = Store::Owned(grown);
        } else {
            self.store.slice_mut()[offset..span].copy_from_slice(source);
        }
        self.length = self.length.max(span);
        Ok(())
    }

    fn check_growable(&self, requested: usize) -> Result<(), BufferError> {
        let capacity = self.capacity();
        let pinned = match self.store {
            Store::View(_) => true,
            Store::Owned(_) => self.fixed_capacity && capacity > 0,
        };
        if pinned {
            return Err(BufferError::ResizeOnImmutableBuffer {
                capacity,
                requested,
            });
        }
        Ok(())
    }
}
