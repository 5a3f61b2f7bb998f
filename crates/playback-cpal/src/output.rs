//! CPAL-backed output sink.
//!
//! `cpal::Stream` is not `Send`, so the stream lives on a dedicated worker
//! thread commanded over a channel; `play` only talks to the shared sample
//! queue and the command channel. The stream is opened lazily for the format
//! of the first buffer and reopened when the format or target device
//! changes.
//!
//! The device callback:
//! - refills a small local buffer from the queue without blocking
//! - applies volume and basic channel mapping (mono↔stereo, best-effort
//!   otherwise)
//! - converts `f32` samples to the device sample format
//! - fills underruns with silence

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};
use playback_core::{
    AudioOutput, BufferProvider, Device, OutputDiscovery, OutputState, OwnedOutput, SampleBuffer,
    SharedOutput,
};

use crate::device;
use crate::queue::SampleQueue;

/// Queue bound target, in seconds of audio at the open format.
const BUFFER_SECONDS: f32 = 2.0;

/// Max frames pulled from the queue per callback refill.
const REFILL_MAX_FRAMES: usize = 4096;

/// Upper bound on how long `drain` waits for the callback to empty the
/// queue.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

enum StreamCommand {
    Open {
        sample_rate: u32,
        channels: u16,
        ack: Sender<bool>,
    },
    Close,
}

/// State shared between the handle, the worker, and the device callback.
#[derive(Clone)]
struct StreamShared {
    queue: Arc<SampleQueue>,
    paused: Arc<AtomicBool>,
    volume_bits: Arc<AtomicU64>,
    underrun_events: Arc<AtomicU64>,
    preferred_device: Arc<Mutex<Option<String>>>,
}

/// An [`AudioOutput`] that plays through the default CPAL host.
pub struct CpalOutput {
    name: String,
    shared: StreamShared,
    commands: Sender<StreamCommand>,
    open_format: Mutex<Option<(u32, u16)>>,
}

impl CpalOutput {
    pub fn new() -> Self {
        let host = cpal::default_host();
        let shared = StreamShared {
            queue: Arc::new(SampleQueue::new(1)),
            paused: Arc::new(AtomicBool::new(false)),
            volume_bits: Arc::new(AtomicU64::new(1.0f64.to_bits())),
            underrun_events: Arc::new(AtomicU64::new(0)),
            preferred_device: Arc::new(Mutex::new(None)),
        };
        let (commands, command_rx) = crossbeam_channel::unbounded();
        let worker_shared = shared.clone();
        std::thread::spawn(move || stream_worker(command_rx, worker_shared));
        Self {
            name: host.id().name().to_string(),
            shared,
            commands,
            open_format: Mutex::new(None),
        }
    }

    /// Underruns observed by the device callback since creation.
    pub fn underrun_events(&self) -> u64 {
        self.shared.underrun_events.load(Ordering::Relaxed)
    }

    /// Make sure a stream for this format is open; returns false when the
    /// stream cannot be opened.
    fn ensure_stream(&self, sample_rate: u32, channels: u16) -> bool {
        let mut open = self.open_format.lock().unwrap();
        if *open == Some((sample_rate, channels)) {
            return true;
        }
        let (ack, ack_rx) = crossbeam_channel::bounded(1);
        if self
            .commands
            .send(StreamCommand::Open {
                sample_rate,
                channels,
                ack,
            })
            .is_err()
        {
            return false;
        }
        let ok = ack_rx.recv().unwrap_or(false);
        *open = if ok { Some((sample_rate, channels)) } else { None };
        ok
    }

    fn close_stream(&self) {
        *self.open_format.lock().unwrap() = None;
        let _ = self.commands.send(StreamCommand::Close);
    }
}

impl Default for CpalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for CpalOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn play(&self, buffer: &SampleBuffer<'_>, provider: &dyn BufferProvider) -> OutputState {
        if !self.ensure_stream(buffer.sample_rate(), buffer.channels()) {
            return OutputState::InvalidState;
        }
        if !self.shared.queue.try_push(buffer.samples()) {
            return OutputState::BufferFull;
        }
        provider.on_buffer_processed(buffer);
        OutputState::BufferWritten
    }

    fn pause(&self) {
        self.shared.paused.store(true, Ordering::Relaxed);
    }

    fn resume(&self) {
        self.shared.paused.store(false, Ordering::Relaxed);
    }

    fn stop(&self) {
        self.shared.queue.clear();
        self.shared.paused.store(false, Ordering::Relaxed);
        self.close_stream();
    }

    fn drain(&self) {
        if !self.shared.queue.wait_empty(DRAIN_TIMEOUT) {
            tracing::warn!(
                queued = self.shared.queue.len(),
                "drain timed out with samples still queued"
            );
        }
    }

    fn set_volume(&self, volume: f64) {
        self.shared
            .volume_bits
            .store(volume.to_bits(), Ordering::Relaxed);
    }

    fn volume(&self) -> f64 {
        f64::from_bits(self.shared.volume_bits.load(Ordering::Relaxed))
    }

    fn latency(&self) -> f64 {
        let open = self.open_format.lock().unwrap();
        match *open {
            Some((sample_rate, channels)) if sample_rate > 0 && channels > 0 => {
                self.shared.queue.len() as f64 / (sample_rate as f64 * channels as f64)
            }
            _ => 0.0,
        }
    }

    fn default_sample_rate(&self) -> i32 {
        let host = cpal::default_host();
        let Some(device) = host.default_output_device() else {
            return -1;
        };
        match device.default_output_config() {
            Ok(config) => config.sample_rate() as i32,
            Err(_) => -1,
        }
    }

    fn device_list(&self) -> Option<Vec<Device>> {
        let host = cpal::default_host();
        device::list_output_devices(&host).ok()
    }

    fn default_device(&self) -> Option<Device> {
        let host = cpal::default_host();
        let preferred = self.shared.preferred_device.lock().unwrap().clone();
        if let Some(id) = preferred {
            if let Some(found) = device::list_output_devices(&host)
                .ok()
                .and_then(|devices| devices.into_iter().find(|d| d.id == id))
            {
                return Some(found);
            }
        }
        device::default_output_device(&host)
    }

    fn set_default_device(&self, device_id: &str) -> bool {
        let host = cpal::default_host();
        if device::find_device_by_id(&host, device_id).is_err() {
            return false;
        }
        *self.shared.preferred_device.lock().unwrap() = Some(device_id.to_string());
        // reroute on the next play
        self.close_stream();
        true
    }
}

/// Owns the `cpal::Stream`; exits when the command channel closes.
fn stream_worker(commands: Receiver<StreamCommand>, shared: StreamShared) {
    let mut stream: Option<cpal::Stream> = None;
    while let Ok(command) = commands.recv() {
        match command {
            StreamCommand::Open {
                sample_rate,
                channels,
                ack,
            } => {
                stream = None;
                shared.queue.clear();
                match open_stream(&shared, sample_rate, channels) {
                    Ok(opened) => {
                        stream = Some(opened);
                        let _ = ack.send(true);
                    }
                    Err(e) => {
                        tracing::warn!("failed to open output stream: {e:#}");
                        let _ = ack.send(false);
                    }
                }
            }
            StreamCommand::Close => {
                stream = None;
                shared.queue.clear();
            }
        }
    }
    drop(stream);
}

fn open_stream(shared: &StreamShared, sample_rate: u32, channels: u16) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let preferred = shared.preferred_device.lock().unwrap().clone();
    let device = match preferred {
        Some(id) => device::find_device_by_id(&host, &id)?,
        None => host
            .default_output_device()
            .ok_or_else(|| anyhow!("no default output device"))?,
    };

    let supported = device::pick_output_config(&device, sample_rate, channels)?;
    let mut config: cpal::StreamConfig = supported.clone().into();
    if let Some(size) = device::pick_buffer_size(&supported) {
        config.buffer_size = size;
    }

    shared
        .queue
        .set_max_samples(max_buffered_samples(sample_rate, channels));

    let stream = build_stream_for_format(&device, &config, supported.sample_format(), shared, channels)?;
    stream.play()?;
    tracing::info!(
        device = %device.description()?,
        rate = config.sample_rate,
        channels = config.channels,
        "output stream open"
    );
    Ok(stream)
}

/// Queue bound in samples for the open format.
fn max_buffered_samples(sample_rate: u32, channels: u16) -> usize {
    let frames = (sample_rate as f32 * BUFFER_SECONDS).ceil() as usize;
    frames.saturating_mul(channels.max(1) as usize)
}

fn build_stream_for_format(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    shared: &StreamShared,
    src_channels: u16,
) -> Result<cpal::Stream> {
    match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(device, config, shared, src_channels),
        cpal::SampleFormat::I16 => build_stream::<i16>(device, config, shared, src_channels),
        cpal::SampleFormat::I32 => build_stream::<i32>(device, config, shared, src_channels),
        cpal::SampleFormat::U16 => build_stream::<u16>(device, config, shared, src_channels),
        other => Err(anyhow!("unsupported sample format: {other:?}")),
    }
}

/// Type-specialized stream builder for CPAL sample formats.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    shared: &StreamShared,
    src_channels: u16,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels_out = config.channels as usize;
    let src_channels = src_channels.max(1) as usize;

    let queue = shared.queue.clone();
    let paused = shared.paused.clone();
    let volume_bits = shared.volume_bits.clone();
    let underrun_events = shared.underrun_events.clone();

    let mut pending: Vec<f32> = Vec::new();
    let mut pos = 0usize;

    let err_fn = |err| tracing::warn!("stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            if paused.load(Ordering::Relaxed) {
                data.fill(<T as cpal::Sample>::from_sample::<f32>(0.0));
                return;
            }

            let volume = f64::from_bits(volume_bits.load(Ordering::Relaxed)) as f32;
            let frames = data.len() / channels_out;

            for frame in 0..frames {
                if pos >= pending.len() {
                    pending.clear();
                    pos = 0;
                    if queue.pop_up_to(REFILL_MAX_FRAMES * src_channels, &mut pending) == 0 {
                        // No more audio ready; fill the rest with silence.
                        underrun_events.fetch_add(1, Ordering::Relaxed);
                        for idx in (frame * channels_out)..data.len() {
                            data[idx] = <T as cpal::Sample>::from_sample::<f32>(0.0);
                        }
                        return;
                    }
                }
                for ch in 0..channels_out {
                    let sample =
                        volume * mapped_sample(&pending, pos, src_channels, channels_out, ch);
                    data[frame * channels_out + ch] =
                        <T as cpal::Sample>::from_sample::<f32>(sample);
                }
                pos += src_channels;
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

/// Read the sample for `dst_ch` from the source frame starting at
/// `frame_start`.
///
/// Mapping rules:
/// - mono → anything: duplicate channel 0
/// - stereo → mono: average L/R
/// - stereo → stereo: pass-through
/// - other layouts: clamp to the available source channels
fn mapped_sample(
    src: &[f32],
    frame_start: usize,
    src_channels: usize,
    dst_channels: usize,
    dst_ch: usize,
) -> f32 {
    let get = |ch: usize| src.get(frame_start + ch).copied().unwrap_or(0.0);
    match (src_channels, dst_channels) {
        (1, _) => get(0),
        (2, 1) => 0.5 * (get(0) + get(1)),
        (2, 2) => get(dst_ch.min(1)),
        _ => get(dst_ch.min(src_channels.saturating_sub(1))),
    }
}

/// Discovery source exposing the CPAL-backed output.
pub struct CpalDiscovery;

impl OutputDiscovery for CpalDiscovery {
    fn query_shared(&self) -> Vec<SharedOutput> {
        vec![Arc::new(CpalOutput::new()) as SharedOutput]
    }

    fn query_owned(&self) -> Vec<OwnedOutput> {
        vec![Box::new(CpalOutput::new()) as OwnedOutput]
    }
}
