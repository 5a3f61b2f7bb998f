use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "playback", version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Preference file (TOML)
    #[arg(long, default_value = "playback.toml")]
    pub prefs: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List discovered outputs in display order
    Outputs,

    /// List devices addressable by the selected output
    Devices,

    /// Persist the preferred output by name
    Select {
        /// Output name (exact match)
        name: String,
    },

    /// Play a test tone through the selected output
    Play {
        /// Tone frequency in hertz
        #[arg(long, default_value_t = 440.0)]
        freq: f32,

        /// Duration in seconds
        #[arg(long, default_value_t = 3.0)]
        seconds: f32,

        /// Sample rate in hertz
        #[arg(long, default_value_t = 48_000)]
        rate: u32,

        /// Playback volume (0.0..=1.0)
        #[arg(long, default_value_t = 1.0)]
        volume: f64,
    },
}
