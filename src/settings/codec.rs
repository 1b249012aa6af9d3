use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::VizError;

/// Video encoder selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VideoCodec {
    /// Re-encode with the engine's default encoder
    #[serde(rename = "default")]
    Default,
    /// Pass the stream through untouched
    #[default]
    #[serde(rename = "copy")]
    Copy,
    #[serde(rename = "libx264")]
    Libx264,
    #[serde(rename = "libx265")]
    Libx265,
    #[serde(rename = "libvpx-vp9")]
    LibvpxVp9,
    #[serde(rename = "libaom-av1")]
    LibaomAv1,
}

/// Audio encoder selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AudioCodec {
    #[serde(rename = "default")]
    Default,
    #[default]
    #[serde(rename = "copy")]
    Copy,
    #[serde(rename = "aac")]
    Aac,
    #[serde(rename = "libmp3lame")]
    Libmp3lame,
    #[serde(rename = "libopus")]
    Libopus,
    #[serde(rename = "libvorbis")]
    Libvorbis,
}

impl VideoCodec {
    pub const ALL: [VideoCodec; 6] = [
        VideoCodec::Default,
        VideoCodec::Copy,
        VideoCodec::Libx264,
        VideoCodec::Libx265,
        VideoCodec::LibvpxVp9,
        VideoCodec::LibaomAv1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoCodec::Default => "default",
            VideoCodec::Copy => "copy",
            VideoCodec::Libx264 => "libx264",
            VideoCodec::Libx265 => "libx265",
            VideoCodec::LibvpxVp9 => "libvpx-vp9",
            VideoCodec::LibaomAv1 => "libaom-av1",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VideoCodec::Default => "Re-encode (default)",
            VideoCodec::Copy => "No re-encode (copy)",
            VideoCodec::Libx264 => "H.264 (libx264)",
            VideoCodec::Libx265 => "H.265 (libx265)",
            VideoCodec::LibvpxVp9 => "VP9 (libvpx-vp9)",
            VideoCodec::LibaomAv1 => "AV1 (libaom-av1)",
        }
    }

    pub fn is_copy(&self) -> bool {
        matches!(self, VideoCodec::Copy)
    }

    /// Only the x264 encoder takes `-preset`, `-profile:v` and `-level`.
    pub fn supports_h264_tuning(&self) -> bool {
        matches!(self, VideoCodec::Libx264)
    }

    /// Encoder name to emit after `-c:v`, if any.
    pub fn encoder(&self) -> Option<&'static str> {
        match self {
            VideoCodec::Default => None,
            other => Some(other.as_str()),
        }
    }
}

impl AudioCodec {
    pub const ALL: [AudioCodec; 6] = [
        AudioCodec::Default,
        AudioCodec::Copy,
        AudioCodec::Aac,
        AudioCodec::Libmp3lame,
        AudioCodec::Libopus,
        AudioCodec::Libvorbis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioCodec::Default => "default",
            AudioCodec::Copy => "copy",
            AudioCodec::Aac => "aac",
            AudioCodec::Libmp3lame => "libmp3lame",
            AudioCodec::Libopus => "libopus",
            AudioCodec::Libvorbis => "libvorbis",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AudioCodec::Default => "Re-encode (default)",
            AudioCodec::Copy => "No re-encode (copy)",
            AudioCodec::Aac => "AAC",
            AudioCodec::Libmp3lame => "MP3 (libmp3lame)",
            AudioCodec::Libopus => "Opus (libopus)",
            AudioCodec::Libvorbis => "Vorbis (libvorbis)",
        }
    }

    pub fn is_copy(&self) -> bool {
        matches!(self, AudioCodec::Copy)
    }

    pub fn encoder(&self) -> Option<&'static str> {
        match self {
            AudioCodec::Default => None,
            other => Some(other.as_str()),
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoCodec {
    type Err = VizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VideoCodec::ALL
            .into_iter()
            .find(|codec| codec.as_str() == s.trim())
            .ok_or_else(|| VizError::Settings(format!("Unknown video codec '{}'", s)))
    }
}

impl FromStr for AudioCodec {
    type Err = VizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AudioCodec::ALL
            .into_iter()
            .find(|codec| codec.as_str() == s.trim())
            .ok_or_else(|| VizError::Settings(format!("Unknown audio codec '{}'", s)))
    }
}
