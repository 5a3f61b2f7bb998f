//! No-op output sentinel.

use std::sync::Mutex;

use crate::buffer::SampleBuffer;
use crate::output::{AudioOutput, BufferProvider, Device, OutputState};

/// Capability-conformant stand-in used whenever no real output is available.
///
/// Accepts every call and answers with fixed sentinel values, so selection
/// paths never hand out a "nothing" the caller must null-check. Volume is the
/// one piece of real state: it round-trips like any other output's.
pub struct NullOutput {
    volume: Mutex<f64>,
}

impl Default for NullOutput {
    fn default() -> Self {
        Self {
            volume: Mutex::new(1.0),
        }
    }
}

impl AudioOutput for NullOutput {
    fn name(&self) -> &str {
        "NoOutput"
    }

    fn play(&self, _buffer: &SampleBuffer<'_>, _provider: &dyn BufferProvider) -> OutputState {
        OutputState::InvalidState
    }

    fn pause(&self) {}

    fn resume(&self) {}

    fn stop(&self) {}

    fn drain(&self) {}

    fn set_volume(&self, volume: f64) {
        *self.volume.lock().unwrap() = volume;
    }

    fn volume(&self) -> f64 {
        *self.volume.lock().unwrap()
    }

    fn latency(&self) -> f64 {
        0.0
    }

    fn default_sample_rate(&self) -> i32 {
        -1
    }

    fn device_list(&self) -> Option<Vec<Device>> {
        None
    }

    fn default_device(&self) -> Option<Device> {
        None
    }

    fn set_default_device(&self, _device_id: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopProvider;

    impl BufferProvider for NoopProvider {
        fn on_buffer_processed(&self, _buffer: &SampleBuffer<'_>) {}
    }

    #[test]
    fn play_reports_invalid_state() {
        let output = NullOutput::default();
        let buffer = SampleBuffer::new();
        assert_eq!(
            output.play(&buffer, &NoopProvider),
            OutputState::InvalidState
        );
    }

    #[test]
    fn sentinel_answers() {
        let output = NullOutput::default();
        assert_eq!(output.name(), "NoOutput");
        assert_eq!(output.latency(), 0.0);
        assert_eq!(output.default_sample_rate(), -1);
        assert!(output.device_list().is_none());
        assert!(output.default_device().is_none());
        assert!(!output.set_default_device("anything"));
    }

    #[test]
    fn volume_round_trips() {
        let output = NullOutput::default();
        assert_eq!(output.volume(), 1.0);
        output.set_volume(0.25);
        assert_eq!(output.volume(), 0.25);
    }
}
