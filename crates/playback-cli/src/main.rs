//! Playback demo CLI.
//!
//! Exercises the playback core end to end: discovers outputs through the
//! CPAL backend, resolves the active one via the preference file, and can
//! feed it a generated tone.
//!
//! ## Modes
//! - `outputs` / `devices`: inspect what selection would see.
//! - `select`: persist a preferred output name.
//! - `play`: synthesize a sine tone into sample buffers and push them
//!   through the selected output, backing off on `BufferFull`.

mod cli;
mod tone;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use playback_core::{
    BufferProvider, FilePreferences, OutputSelector, OutputState, SampleBuffer,
};
use playback_cpal::CpalDiscovery;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let prefs = Arc::new(FilePreferences::load(&args.prefs).context("load preferences")?);
    let selector = OutputSelector::new(Arc::new(CpalDiscovery), prefs);

    match &args.cmd {
        cli::Command::Outputs => {
            for output in selector.all() {
                println!(
                    "{} (default rate {} Hz)",
                    output.name(),
                    output.default_sample_rate()
                );
            }
        }
        cli::Command::Devices => {
            let output = selector.selected();
            match output.device_list() {
                Some(devices) if !devices.is_empty() => {
                    for device in devices {
                        println!("{}: {}", device.id, device.name);
                    }
                }
                _ => println!("no devices reported by {}", output.name()),
            }
        }
        cli::Command::Select { name } => {
            selector.select(name);
            println!("active output is now: {}", selector.selected().name());
        }
        cli::Command::Play {
            freq,
            seconds,
            rate,
            volume,
        } => play_tone(&selector, *freq, *seconds, *rate, *volume)?,
    }

    Ok(())
}

/// Counts buffers the output has consumed.
#[derive(Default)]
struct ChunkCounter {
    processed: AtomicU64,
}

impl ChunkCounter {
    fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }
}

impl BufferProvider for ChunkCounter {
    fn on_buffer_processed(&self, _buffer: &SampleBuffer<'_>) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }
}

const CHUNK_FRAMES: usize = 1024;
const CHANNELS: usize = 2;

fn play_tone(
    selector: &OutputSelector,
    freq: f32,
    seconds: f32,
    rate: u32,
    volume: f64,
) -> Result<()> {
    let output = selector.selected();
    tracing::info!(output = %output.name(), freq, seconds, "playing test tone");
    output.set_volume(volume);

    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    let _ = ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    });

    let provider = ChunkCounter::default();
    let mut generator = tone::ToneGenerator::new(freq, rate);
    let total_frames = (seconds.max(0.0) * rate as f32) as u64;
    let mut sent_frames = 0u64;

    let mut buffer = SampleBuffer::new();
    buffer.set_sample_rate(rate);
    buffer.set_channels(CHANNELS as u16);

    'chunks: while sent_frames < total_frames {
        let frames = CHUNK_FRAMES.min((total_frames - sent_frames) as usize);
        buffer.set_length(frames * CHANNELS)?;
        generator.fill(buffer.samples_mut());

        loop {
            if stop_rx.try_recv().is_ok() {
                tracing::info!("interrupted, stopping playback");
                break 'chunks;
            }
            match output.play(&buffer, &provider) {
                OutputState::BufferWritten => break,
                OutputState::BufferFull => std::thread::sleep(Duration::from_millis(10)),
                OutputState::InvalidState => {
                    tracing::warn!(output = %output.name(), "output cannot play");
                    break 'chunks;
                }
            }
        }
        sent_frames += frames as u64;
    }

    output.drain();
    output.stop();
    tracing::info!(
        buffers = provider.processed(),
        frames = sent_frames,
        "tone finished"
    );
    Ok(())
}
