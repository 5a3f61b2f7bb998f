//! Output device enumeration and stream-config selection.
//!
//! Thin wrappers around CPAL for:
//! - listing output devices as selection metadata
//! - finding a device by stable id
//! - choosing a supported config for a requested rate/channel pair

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait};
use playback_core::Device;

/// List output devices as selection metadata.
pub fn list_output_devices(host: &cpal::Host) -> Result<Vec<Device>> {
    let devices = host.output_devices().context("no output devices")?;
    let mut out = Vec::new();
    for device in devices {
        let name = device.description()?.to_string();
        let id = device_id(&device, &name);
        out.push(Device { id, name });
    }
    Ok(out)
}

/// The host default output device, if any.
pub fn default_output_device(host: &cpal::Host) -> Option<Device> {
    let device = host.default_output_device()?;
    let name = device.description().ok()?.to_string();
    let id = device_id(&device, &name);
    Some(Device { id, name })
}

/// Find an output device by the id reported in [`list_output_devices`].
pub fn find_device_by_id(host: &cpal::Host, id: &str) -> Result<cpal::Device> {
    let devices = host.output_devices().context("no output devices")?;
    for device in devices {
        let name = device.description()?.to_string();
        if device_id(&device, &name) == id {
            return Ok(device);
        }
    }
    Err(anyhow!("no output device matched id: {id}"))
}

/// Stable id for a device; falls back to the display name where the backend
/// has no id.
pub fn device_id(device: &cpal::Device, name: &str) -> String {
    if let Ok(id) = device.id() {
        return id.to_string();
    }
    name.to_string()
}

/// Choose the best supported output config for `target_rate`/`channels`.
///
/// Ranking: matching channel count first, then an exact rate match, then the
/// friendlier sample format. Rates outside a range are clamped to its edge.
pub fn pick_output_config(
    device: &cpal::Device,
    target_rate: u32,
    channels: u16,
) -> Result<cpal::SupportedStreamConfig> {
    let ranges: Vec<cpal::SupportedStreamConfigRange> =
        device.supported_output_configs()?.collect();
    if ranges.is_empty() {
        return Err(anyhow!("no supported output configs"));
    }

    let mut best: Option<(Candidate, cpal::SupportedStreamConfig)> = None;
    for range in ranges {
        let rate = clamp_rate(range.min_sample_rate(), range.max_sample_rate(), target_rate);
        let candidate = Candidate {
            channels_match: range.channels() == channels,
            rate_exact: rate == target_rate,
            format_rank: sample_format_rank(range.sample_format()),
        };
        let replace = match &best {
            None => true,
            Some((current, _)) => candidate.beats(current),
        };
        if replace {
            best = Some((candidate, range.with_sample_rate(rate)));
        }
    }

    Ok(best.unwrap().1)
}

/// Prefer a fixed stream buffer size if the device advertises a range.
///
/// Returns `None` when the device only supports its default buffer size.
pub fn pick_buffer_size(config: &cpal::SupportedStreamConfig) -> Option<cpal::BufferSize> {
    match config.buffer_size() {
        cpal::SupportedBufferSize::Range { min, max } => {
            const MAX_FRAMES: u32 = 16_384;
            let chosen = if *max > MAX_FRAMES {
                if *min > MAX_FRAMES { *min } else { MAX_FRAMES }
            } else {
                *max
            };
            Some(cpal::BufferSize::Fixed(chosen))
        }
        cpal::SupportedBufferSize::Unknown => None,
    }
}

#[derive(Clone, Copy)]
struct Candidate {
    channels_match: bool,
    rate_exact: bool,
    format_rank: u8,
}

impl Candidate {
    fn beats(&self, other: &Candidate) -> bool {
        if self.channels_match != other.channels_match {
            self.channels_match
        } else if self.rate_exact != other.rate_exact {
            self.rate_exact
        } else {
            self.format_rank < other.format_rank
        }
    }
}

fn clamp_rate(min: u32, max: u32, target: u32) -> u32 {
    target.clamp(min, max)
}

fn sample_format_rank(format: cpal::SampleFormat) -> u8 {
    match format {
        cpal::SampleFormat::F32 => 0,
        cpal::SampleFormat::I32 => 1,
        cpal::SampleFormat::I16 => 2,
        cpal::SampleFormat::U16 => 3,
        _ => 10,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_rate_prefers_target_when_in_range() {
        assert_eq!(clamp_rate(44_100, 96_000, 48_000), 48_000);
    }

    #[test]
    fn clamp_rate_clamps_to_edges() {
        assert_eq!(clamp_rate(44_100, 96_000, 22_050), 44_100);
        assert_eq!(clamp_rate(44_100, 96_000, 192_000), 96_000);
    }

    #[test]
    fn candidate_prefers_matching_channels() {
        let matching = Candidate {
            channels_match: true,
            rate_exact: false,
            format_rank: 3,
        };
        let mismatched = Candidate {
            channels_match: false,
            rate_exact: true,
            format_rank: 0,
        };
        assert!(matching.beats(&mismatched));
        assert!(!mismatched.beats(&matching));
    }

    #[test]
    fn candidate_prefers_exact_rate_then_format() {
        let exact = Candidate {
            channels_match: true,
            rate_exact: true,
            format_rank: 2,
        };
        let clamped = Candidate {
            channels_match: true,
            rate_exact: false,
            format_rank: 0,
        };
        assert!(exact.beats(&clamped));

        let f32_format = Candidate {
            channels_match: true,
            rate_exact: true,
            format_rank: 0,
        };
        assert!(f32_format.beats(&exact));
    }

    #[test]
    fn sample_format_rank_prefers_f32() {
        assert!(sample_format_rank(cpal::SampleFormat::F32) < sample_format_rank(cpal::SampleFormat::I16));
        assert!(sample_format_rank(cpal::SampleFormat::I16) < sample_format_rank(cpal::SampleFormat::U16));
    }
}
