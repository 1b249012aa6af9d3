use crate::settings::options::{OPUS_DEFAULT_BITRATE, OPUS_DEFAULT_SAMPLE_RATE, OPUS_SAMPLE_RATES};
use crate::settings::{AudioCodec, Settings};
use crate::timecode::{format_time, is_valid_time};

use super::FfmpegCommand;

/// Shortest start-to-end gap that still produces a trim token, in seconds.
pub const MIN_SEGMENT: f64 = 0.1;

// Compared at millisecond precision so 20.0 - 19.9 counts as 0.1.
fn is_usable_length(length: f64) -> bool {
    (length * 1000.0).round() > (MIN_SEGMENT * 1000.0).round()
}

/// Pure mapping from [`Settings`] to ffmpeg tokens.
///
/// Token order: input, trim (`-ss`, `-t`, output seeking), video, audio,
/// output. Nothing here fails; anomalies drop the affected token group.
pub struct CommandSynthesizer;

impl CommandSynthesizer {
    /// Build the full command for `input_file_name`
    pub fn synthesize(settings: &Settings, input_file_name: &str) -> FfmpegCommand {
        let command = FfmpegCommand::new(input_file_name);
        let command = Self::with_trim(command, settings);
        let command = Self::with_video(command, settings);
        let command = Self::with_audio(command, settings);
        command.output(settings.resolved_output_name(input_file_name))
    }

    /// Option tokens only, as handed to the engine between input and output
    pub fn options(settings: &Settings) -> Vec<String> {
        Self::synthesize(settings, "").options().to_vec()
    }

    fn with_trim(command: FfmpegCommand, settings: &Settings) -> FfmpegCommand {
        let (start, end, duration) = (settings.start_time, settings.end_time, settings.duration);
        if !is_valid_time(start) || !is_valid_time(end) || !is_valid_time(duration) {
            tracing::warn!(
                "Invalid timing values detected: start={} end={} duration={}",
                start, end, duration
            );
            return command;
        }

        let start = start.min(duration - MIN_SEGMENT).max(0.0);
        let mut command = command;
        if start > 0.0 {
            command = command.seek(format_time(start));
        }

        let length = if end > start && end < duration {
            Some(end - start)
        } else if start > 0.0 && end >= duration {
            Some(duration - start)
        } else {
            None
        };

        match length {
            Some(length) if is_usable_length(length) => command.duration(format_time(length)),
            _ => command,
        }
    }

    fn with_video(command: FfmpegCommand, settings: &Settings) -> FfmpegCommand {
        let codec = settings.video_codec;
        if codec.is_copy() {
            return command.copy_video();
        }

        let mut command = match codec.encoder() {
            Some(encoder) => command.video_codec(encoder),
            None => command,
        };
        if !settings.video_bitrate.trim().is_empty() {
            command = command.video_bitrate(settings.video_bitrate.trim());
        }
        if codec.supports_h264_tuning() {
            command = command
                .preset(&settings.video_preset)
                .profile(&settings.video_profile)
                .level(&settings.video_level);
        }
        if !settings.video_fps.trim().is_empty() {
            command = command.frame_rate(settings.video_fps.trim());
        }
        command.pixel_format(&settings.pixel_format)
    }

    fn with_audio(command: FfmpegCommand, settings: &Settings) -> FfmpegCommand {
        if settings.mute_audio {
            return command.no_audio();
        }

        let codec = settings.audio_codec;
        if codec.is_copy() {
            return command.copy_audio();
        }

        let mut command = match codec.encoder() {
            Some(encoder) => command.audio_codec(encoder),
            None => command,
        };
        let bitrate = settings.audio_bitrate.trim();

        if codec == AudioCodec::Libopus {
            let bitrate = if bitrate.is_empty() { OPUS_DEFAULT_BITRATE } else { bitrate };
            let channels = if settings.audio_channels.trim() == "1" { "1" } else { "2" };
            let sample_rate = match settings.audio_sample_rate.trim().parse::<u32>() {
                Ok(rate) if OPUS_SAMPLE_RATES.contains(&rate) => rate.to_string(),
                _ => OPUS_DEFAULT_SAMPLE_RATE.to_string(),
            };

            return command
                .audio_bitrate(bitrate)
                .audio_channels(channels)
                .audio_sample_rate(sample_rate)
                .args(["-application", "audio", "-frame_duration", "20"]);
        }

        if !bitrate.is_empty() {
            command = command.audio_bitrate(bitrate);
        }
        command
            .audio_channels(&settings.audio_channels)
            .audio_sample_rate(&settings.audio_sample_rate)
    }
}
