//! Output capability surface.
//!
//! Every audio sink, platform-backed or the [`crate::null::NullOutput`]
//! sentinel, implements [`AudioOutput`]. Methods take `&self` so instances
//! can be shared across threads behind `Arc`; implementations use interior
//! mutability for their own state.

use serde::{Deserialize, Serialize};

use crate::buffer::SampleBuffer;

/// Result of handing a buffer to [`AudioOutput::play`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    /// The buffer was accepted and queued for the device.
    BufferWritten,
    /// The sink is at capacity; retry after some audio has drained.
    BufferFull,
    /// The sink cannot accept audio right now.
    InvalidState,
}

/// Output device metadata for selection UIs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Stable identifier (backend-specific).
    pub id: String,
    /// Human-readable display name.
    pub name: String,
}

/// Pull-based streaming callback handed to [`AudioOutput::play`] together
/// with the buffer. The sink notifies it once the buffer's samples have been
/// consumed and the caller may refill.
pub trait BufferProvider: Send + Sync {
    fn on_buffer_processed(&self, buffer: &SampleBuffer<'_>);
}

/// An audio output sink.
pub trait AudioOutput: Send + Sync {
    /// Identity. Lookup by name is case-sensitive; display ordering is not.
    fn name(&self) -> &str;

    /// Queue a buffer of interleaved samples for the device. Never blocks;
    /// backpressure is reported as [`OutputState::BufferFull`].
    fn play(&self, buffer: &SampleBuffer<'_>, provider: &dyn BufferProvider) -> OutputState;

    /// Hold playback without discarding queued audio.
    fn pause(&self);

    fn resume(&self);

    /// Stop playback and discard queued audio.
    fn stop(&self);

    /// Block until queued audio has been consumed (bounded wait).
    fn drain(&self);

    fn set_volume(&self, volume: f64);

    fn volume(&self) -> f64;

    /// Seconds of audio currently buffered ahead of the device.
    fn latency(&self) -> f64;

    /// Preferred device sample rate in hertz, or -1 when unknown.
    fn default_sample_rate(&self) -> i32;

    /// Devices this sink can address, or `None` when enumeration is
    /// unavailable.
    fn device_list(&self) -> Option<Vec<Device>>;

    fn default_device(&self) -> Option<Device>;

    /// Route playback to the device with the given id. Returns false when no
    /// such device exists.
    fn set_default_device(&self, device_id: &str) -> bool;
}
