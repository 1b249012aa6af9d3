use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::error::Result;
use crate::settings::{AudioCodec, SettingsUpdate, VideoCodec};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the ffmpeg command for a video and settings
    Command {
        /// Input video file
        input: PathBuf,

        #[command(flatten)]
        settings: SettingsArgs,

        /// Also print the token list handed to the engine
        #[arg(long)]
        tokens: bool,
    },

    /// Run the transcoding engine once and write the result
    Process {
        /// Input video file
        input: PathBuf,

        #[command(flatten)]
        settings: SettingsArgs,

        /// Hand-edited command to run instead of the generated one
        #[arg(long)]
        command: Option<String>,

        /// Use the in-memory engine instead of ffmpeg
        #[arg(long)]
        simulate: bool,

        /// Where to write the processed video
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Line-oriented editing session with auto-processing
    Interactive {
        /// Input video file
        input: PathBuf,

        /// Media duration in seconds, skips probing
        #[arg(long)]
        duration: Option<String>,

        /// Use the in-memory engine instead of ffmpeg
        #[arg(long)]
        simulate: bool,
    },

    /// Inspect or remove the saved settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Convert between seconds and time codes
    Time {
        #[command(subcommand)]
        action: TimeAction,
    },

    /// List the allowed values of enumerated settings
    Options,

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Show the saved settings snapshot
    Show,

    /// Remove the saved settings snapshot
    Clear,
}

#[derive(Subcommand)]
pub enum TimeAction {
    /// Seconds to HH:MM:SS.mmm
    Format {
        #[arg(allow_negative_numbers = true)]
        seconds: f64,
    },

    /// HH:MM:SS.mmm, MM:SS(.mmm) or SS(.mmm) to seconds
    Parse { text: String },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write the default configuration
    Init {
        /// Target path (default: ffviz.toml)
        path: Option<PathBuf>,
    },
}

/// Settings flags shared by the one-shot subcommands. They overlay the
/// saved snapshot.
#[derive(ClapArgs, Debug, Default, Clone)]
pub struct SettingsArgs {
    /// Trim start (HH:MM:SS.mmm, MM:SS or seconds)
    #[arg(long)]
    pub start: Option<String>,

    /// Trim end
    #[arg(long)]
    pub end: Option<String>,

    /// Media duration, skips probing
    #[arg(long)]
    pub duration: Option<String>,

    /// Drop the audio stream
    #[arg(long)]
    pub mute: bool,

    /// Video codec
    #[arg(long)]
    pub vcodec: Option<VideoCodec>,

    /// Audio codec
    #[arg(long)]
    pub acodec: Option<AudioCodec>,

    /// Video bitrate, e.g. 2M
    #[arg(long)]
    pub vbitrate: Option<String>,

    /// Audio bitrate, e.g. 128k
    #[arg(long)]
    pub abitrate: Option<String>,

    #[arg(long)]
    pub preset: Option<String>,

    #[arg(long)]
    pub profile: Option<String>,

    #[arg(long)]
    pub level: Option<String>,

    #[arg(long)]
    pub fps: Option<String>,

    #[arg(long = "pix-fmt")]
    pub pix_fmt: Option<String>,

    #[arg(long)]
    pub channels: Option<String>,

    #[arg(long = "sample-rate")]
    pub sample_rate: Option<String>,

    /// Output file name
    #[arg(long)]
    pub name: Option<String>,
}

impl SettingsArgs {
    /// Media duration in seconds, if given.
    pub fn duration_seconds(&self) -> Result<Option<f64>> {
        self.duration
            .as_deref()
            .map(|text| SettingsUpdate::field("duration", text).map(|u| u.duration))
            .transpose()
            .map(Option::flatten)
    }

    /// Option flags as updates, applied in order. Trim flags come last so
    /// they are clamped against the final duration.
    pub fn updates(&self) -> Result<Vec<SettingsUpdate>> {
        let mut updates = Vec::new();

        if self.mute {
            updates.push(SettingsUpdate { mute_audio: Some(true), ..Default::default() });
        }
        if let Some(codec) = self.vcodec {
            updates.push(SettingsUpdate { video_codec: Some(codec), ..Default::default() });
        }
        if let Some(codec) = self.acodec {
            updates.push(SettingsUpdate { audio_codec: Some(codec), ..Default::default() });
        }

        let fields = [
            ("vbitrate", &self.vbitrate),
            ("abitrate", &self.abitrate),
            ("preset", &self.preset),
            ("profile", &self.profile),
            ("level", &self.level),
            ("fps", &self.fps),
            ("pix-fmt", &self.pix_fmt),
            ("channels", &self.channels),
            ("sample-rate", &self.sample_rate),
            ("name", &self.name),
            ("start", &self.start),
            ("end", &self.end),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                updates.push(SettingsUpdate::field(name, value)?);
            }
        }

        Ok(updates)
    }
}
