// Settings model
//
// `Settings` is the single source of truth for command synthesis:
// - codec: video/audio encoder enums
// - options: allowed values for the enumerated fields
//
// Every mutation goes through `Settings::apply`, which re-clamps the trim
// window whenever a trim field is touched.

pub mod codec;
pub mod options;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub use codec::{AudioCodec, VideoCodec};

use crate::error::{Result, VizError};
use crate::timecode::parse_time_flexible;

pub const OUTPUT_SUFFIX: &str = "_processed";
pub const OUTPUT_EXTENSION: &str = "mp4";
pub const FALLBACK_OUTPUT_NAME: &str = "output.mp4";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub mute_audio: bool,
    pub video_codec: VideoCodec,
    pub audio_codec: AudioCodec,
    pub video_bitrate: String,
    pub audio_bitrate: String,
    pub video_preset: String,
    pub video_profile: String,
    pub video_level: String,
    pub video_fps: String,
    pub pixel_format: String,
    pub audio_channels: String,
    pub audio_sample_rate: String,
    /// Playback only; never reaches the command
    pub restart_at_trim_start: bool,
    /// Empty means "derive from the input file name"
    pub output_file_name: String,
}

/// The part of [`Settings`] that survives between sessions.
///
/// Trim window and duration belong to the loaded video and are never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedSettings {
    pub mute_audio: bool,
    pub video_codec: VideoCodec,
    pub audio_codec: AudioCodec,
    pub video_bitrate: String,
    pub audio_bitrate: String,
    pub video_preset: String,
    pub video_profile: String,
    pub video_level: String,
    pub video_fps: String,
    pub pixel_format: String,
    pub audio_channels: String,
    pub audio_sample_rate: String,
    pub restart_at_trim_start: bool,
    pub output_file_name: String,
}

/// A partial change to [`Settings`]; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub duration: Option<f64>,
    pub mute_audio: Option<bool>,
    pub video_codec: Option<VideoCodec>,
    pub audio_codec: Option<AudioCodec>,
    pub video_bitrate: Option<String>,
    pub audio_bitrate: Option<String>,
    pub video_preset: Option<String>,
    pub video_profile: Option<String>,
    pub video_level: Option<String>,
    pub video_fps: Option<String>,
    pub pixel_format: Option<String>,
    pub audio_channels: Option<String>,
    pub audio_sample_rate: Option<String>,
    pub restart_at_trim_start: Option<bool>,
    pub output_file_name: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let persisted = PersistedSettings::default();
        Self {
            start_time: 0.0,
            end_time: 0.0,
            duration: 0.0,
            mute_audio: persisted.mute_audio,
            video_codec: persisted.video_codec,
            audio_codec: persisted.audio_codec,
            video_bitrate: persisted.video_bitrate,
            audio_bitrate: persisted.audio_bitrate,
            video_preset: persisted.video_preset,
            video_profile: persisted.video_profile,
            video_level: persisted.video_level,
            video_fps: persisted.video_fps,
            pixel_format: persisted.pixel_format,
            audio_channels: persisted.audio_channels,
            audio_sample_rate: persisted.audio_sample_rate,
            restart_at_trim_start: persisted.restart_at_trim_start,
            output_file_name: persisted.output_file_name,
        }
    }
}

impl Default for PersistedSettings {
    fn default() -> Self {
        Self {
            mute_audio: false,
            video_codec: VideoCodec::Copy,
            audio_codec: AudioCodec::Copy,
            video_bitrate: String::new(),
            audio_bitrate: String::new(),
            video_preset: "medium".to_string(),
            video_profile: "high".to_string(),
            video_level: "4.1".to_string(),
            video_fps: String::new(),
            pixel_format: "yuv420p".to_string(),
            audio_channels: "2".to_string(),
            audio_sample_rate: "48000".to_string(),
            restart_at_trim_start: true,
            output_file_name: String::new(),
        }
    }
}

impl Settings {
    /// Snapshot of the fields that are persisted between sessions.
    pub fn persisted(&self) -> PersistedSettings {
        PersistedSettings {
            mute_audio: self.mute_audio,
            video_codec: self.video_codec,
            audio_codec: self.audio_codec,
            video_bitrate: self.video_bitrate.clone(),
            audio_bitrate: self.audio_bitrate.clone(),
            video_preset: self.video_preset.clone(),
            video_profile: self.video_profile.clone(),
            video_level: self.video_level.clone(),
            video_fps: self.video_fps.clone(),
            pixel_format: self.pixel_format.clone(),
            audio_channels: self.audio_channels.clone(),
            audio_sample_rate: self.audio_sample_rate.clone(),
            restart_at_trim_start: self.restart_at_trim_start,
            output_file_name: self.output_file_name.clone(),
        }
    }

    /// Overlay a persisted snapshot, leaving the trim window alone.
    pub fn apply_persisted(&mut self, saved: PersistedSettings) {
        self.mute_audio = saved.mute_audio;
        self.video_codec = saved.video_codec;
        self.audio_codec = saved.audio_codec;
        self.video_bitrate = saved.video_bitrate;
        self.audio_bitrate = saved.audio_bitrate;
        self.video_preset = saved.video_preset;
        self.video_profile = saved.video_profile;
        self.video_level = saved.video_level;
        self.video_fps = saved.video_fps;
        self.pixel_format = saved.pixel_format;
        self.audio_channels = saved.audio_channels;
        self.audio_sample_rate = saved.audio_sample_rate;
        self.restart_at_trim_start = saved.restart_at_trim_start;
        self.output_file_name = saved.output_file_name;
        self.normalize_options();
    }

    /// Merge `update` into the settings.
    ///
    /// Returns true when anything changed.
    pub fn apply(&mut self, update: SettingsUpdate) -> bool {
        let before = self.clone();
        let touches_trim =
            update.start_time.is_some() || update.end_time.is_some() || update.duration.is_some();

        if let Some(v) = update.start_time {
            self.start_time = v;
        }
        if let Some(v) = update.end_time {
            self.end_time = v;
        }
        if let Some(v) = update.duration {
            if v.is_finite() && v >= 0.0 {
                self.duration = v;
            } else {
                warn!("Invalid duration provided: {}", v);
            }
        }
        if let Some(v) = update.mute_audio {
            self.mute_audio = v;
        }
        if let Some(v) = update.video_codec {
            self.video_codec = v;
        }
        if let Some(v) = update.audio_codec {
            self.audio_codec = v;
        }
        if let Some(v) = update.video_bitrate {
            self.video_bitrate = v;
        }
        if let Some(v) = update.audio_bitrate {
            self.audio_bitrate = v;
        }
        if let Some(v) = update.video_preset {
            self.video_preset = v;
        }
        if let Some(v) = update.video_profile {
            self.video_profile = v;
        }
        if let Some(v) = update.video_level {
            self.video_level = v;
        }
        if let Some(v) = update.video_fps {
            self.video_fps = v;
        }
        if let Some(v) = update.pixel_format {
            self.pixel_format = v;
        }
        if let Some(v) = update.audio_channels {
            self.audio_channels = v;
        }
        if let Some(v) = update.audio_sample_rate {
            self.audio_sample_rate = v;
        }
        if let Some(v) = update.restart_at_trim_start {
            self.restart_at_trim_start = v;
        }
        if let Some(v) = update.output_file_name {
            self.output_file_name = v;
        }

        if touches_trim {
            self.clamp_trim();
        }
        self.normalize_options();

        *self != before
    }

    /// Enforce `0 <= start_time <= end_time <= duration`.
    pub fn clamp_trim(&mut self) {
        let duration = self.duration;
        let mut start = self.start_time;
        let mut end = self.end_time;

        if !start.is_finite() || start < 0.0 {
            start = 0.0;
        }
        if !end.is_finite() || end < 0.0 {
            end = duration;
        }

        start = start.min(duration).max(0.0);
        end = end.min(duration).max(start);

        self.start_time = start;
        self.end_time = end;
    }

    /// Replace enumerated values missing from their option tables with the
    /// field defaults.
    pub fn normalize_options(&mut self) {
        let defaults = PersistedSettings::default();
        let fields = [
            ("preset", options::VIDEO_PRESETS, &mut self.video_preset, defaults.video_preset),
            ("profile", options::VIDEO_PROFILES, &mut self.video_profile, defaults.video_profile),
            ("level", options::VIDEO_LEVELS, &mut self.video_level, defaults.video_level),
            ("pix-fmt", options::PIXEL_FORMATS, &mut self.pixel_format, defaults.pixel_format),
            ("channels", options::AUDIO_CHANNELS, &mut self.audio_channels, defaults.audio_channels),
            (
                "sample-rate",
                options::AUDIO_SAMPLE_RATES,
                &mut self.audio_sample_rate,
                defaults.audio_sample_rate,
            ),
        ];

        for (field, table, value, default) in fields {
            if !options::is_allowed(table, value.as_str()) {
                warn!("Unsupported {} '{}', using {}", field, value, default);
                *value = default;
            }
        }
    }

    /// Output name as the user set it, or derived from `input_file_name`.
    pub fn resolved_output_name(&self, input_file_name: &str) -> String {
        if !self.output_file_name.trim().is_empty() {
            return self.output_file_name.clone();
        }
        if input_file_name.is_empty() {
            return FALLBACK_OUTPUT_NAME.to_string();
        }
        derive_output_file_name(input_file_name)
    }
}

/// `clip.mov` -> `clip_processed.mp4`
pub fn derive_output_file_name(input_file_name: &str) -> String {
    let base = input_file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(input_file_name);
    let stem = match base.rfind('.') {
        Some(idx) if idx > 0 => &base[..idx],
        _ => base,
    };
    format!("{}{}.{}", stem, OUTPUT_SUFFIX, OUTPUT_EXTENSION)
}

fn check_option(table: &[options::OptionEntry], field: &str, value: &str) -> Result<String> {
    if options::is_allowed(table, value) {
        Ok(value.to_string())
    } else {
        Err(VizError::Settings(format!(
            "'{}' is not a valid {} (expected one of: {})",
            value,
            field,
            table.iter().map(|e| e.value).collect::<Vec<_>>().join(", ")
        )))
    }
}

fn parse_flag(field: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(VizError::Settings(format!("'{}' is not a valid value for {}", value, field))),
    }
}

impl SettingsUpdate {
    /// Build a single-field update from a field name and its textual value.
    ///
    /// Time fields take the flexible time syntax; enumerated fields are
    /// checked against their option tables.
    pub fn field(name: &str, value: &str) -> Result<Self> {
        let mut update = SettingsUpdate::default();
        let text = value.trim().to_string();

        match name {
            "start" | "end" | "duration" => {
                let seconds = parse_time_flexible(&text)
                    .ok_or_else(|| VizError::Settings(format!("Invalid time '{}'", value)))?;
                match name {
                    "start" => update.start_time = Some(seconds),
                    "end" => update.end_time = Some(seconds),
                    _ => update.duration = Some(seconds),
                }
            }
            "mute" => update.mute_audio = Some(parse_flag(name, &text)?),
            "restart" => update.restart_at_trim_start = Some(parse_flag(name, &text)?),
            "vcodec" => update.video_codec = Some(text.parse()?),
            "acodec" => update.audio_codec = Some(text.parse()?),
            "vbitrate" => update.video_bitrate = Some(text),
            "abitrate" => update.audio_bitrate = Some(text),
            "fps" => update.video_fps = Some(text),
            "name" => update.output_file_name = Some(text),
            "preset" => update.video_preset = Some(check_option(options::VIDEO_PRESETS, name, &text)?),
            "profile" => {
                update.video_profile = Some(check_option(options::VIDEO_PROFILES, name, &text)?)
            }
            "level" => update.video_level = Some(check_option(options::VIDEO_LEVELS, name, &text)?),
            "pix-fmt" => update.pixel_format = Some(check_option(options::PIXEL_FORMATS, name, &text)?),
            "channels" => {
                update.audio_channels = Some(check_option(options::AUDIO_CHANNELS, name, &text)?)
            }
            "sample-rate" => {
                update.audio_sample_rate =
                    Some(check_option(options::AUDIO_SAMPLE_RATES, name, &text)?)
            }
            other => return Err(VizError::Settings(format!("Unknown setting '{}'", other))),
        }

        Ok(update)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_duration(duration: f64) -> Settings {
        let mut settings = Settings::default();
        settings.apply(SettingsUpdate {
            duration: Some(duration),
            end_time: Some(duration),
            ..Default::default()
        });
        settings
    }

    fn assert_window(s: &Settings) {
        assert!(0.0 <= s.start_time, "start {}", s.start_time);
        assert!(s.start_time <= s.end_time, "start {} end {}", s.start_time, s.end_time);
        assert!(s.end_time <= s.duration, "end {} duration {}", s.end_time, s.duration);
    }

    #[test]
    fn test_trim_window_is_clamped() {
        let cases = [
            (f64::NAN, 10.0),
            (-4.0, 10.0),
            (25.0, 30.0),
            (12.0, 3.0),
            (5.0, f64::INFINITY),
            (5.0, -1.0),
            (f64::NEG_INFINITY, f64::NAN),
        ];

        for (start, end) in cases {
            let mut s = with_duration(20.0);
            s.apply(SettingsUpdate {
                start_time: Some(start),
                end_time: Some(end),
                ..Default::default()
            });
            assert_window(&s);
        }
    }

    #[test]
    fn test_nan_start_becomes_zero_and_out_of_order_end_collapses() {
        let mut s = with_duration(20.0);
        s.apply(SettingsUpdate { start_time: Some(f64::NAN), ..Default::default() });
        assert_eq!(s.start_time, 0.0);

        s.apply(SettingsUpdate { start_time: Some(12.0), end_time: Some(3.0), ..Default::default() });
        assert_eq!(s.start_time, 12.0);
        assert_eq!(s.end_time, 12.0);
    }

    #[test]
    fn test_invalid_duration_is_ignored() {
        let mut s = with_duration(20.0);
        s.apply(SettingsUpdate { duration: Some(f64::NAN), ..Default::default() });
        assert_eq!(s.duration, 20.0);
        s.apply(SettingsUpdate { duration: Some(-1.0), ..Default::default() });
        assert_eq!(s.duration, 20.0);
        assert_window(&s);
    }

    #[test]
    fn test_shrinking_duration_pulls_window_in() {
        let mut s = with_duration(20.0);
        s.apply(SettingsUpdate { start_time: Some(15.0), ..Default::default() });
        s.apply(SettingsUpdate { duration: Some(10.0), ..Default::default() });
        assert_eq!(s.start_time, 10.0);
        assert_eq!(s.end_time, 10.0);
    }

    #[test]
    fn test_apply_reports_change() {
        let mut s = Settings::default();
        assert!(!s.apply(SettingsUpdate::default()));
        assert!(s.apply(SettingsUpdate { video_codec: Some(VideoCodec::Libx264), ..Default::default() }));
        assert!(!s.apply(SettingsUpdate { video_codec: Some(VideoCodec::Libx264), ..Default::default() }));
    }

    #[test]
    fn test_persisted_snapshot_excludes_session_fields() {
        let mut s = with_duration(42.0);
        s.apply(SettingsUpdate { start_time: Some(3.0), ..Default::default() });
        let json = serde_json::to_value(s.persisted()).unwrap();
        let object = json.as_object().unwrap();

        for key in ["startTime", "endTime", "duration", "videoSrc", "fileName", "currentTime", "isPlaying"] {
            assert!(!object.contains_key(key), "snapshot leaked {}", key);
        }
        assert_eq!(object.len(), 14);
        assert_eq!(object["videoCodec"], "copy");
    }

    #[test]
    fn test_partial_snapshot_fills_defaults() {
        let saved: PersistedSettings =
            serde_json::from_str(r#"{"videoCodec":"libx264","muteAudio":true}"#).unwrap();
        assert_eq!(saved.video_codec, VideoCodec::Libx264);
        assert!(saved.mute_audio);
        assert_eq!(saved.audio_sample_rate, "48000");
    }

    #[test]
    fn test_output_name_derivation() {
        assert_eq!(derive_output_file_name("clip.mov"), "clip_processed.mp4");
        assert_eq!(derive_output_file_name("/videos/a.b.mkv"), "a.b_processed.mp4");
        assert_eq!(derive_output_file_name("noext"), "noext_processed.mp4");

        let mut s = Settings::default();
        assert_eq!(s.resolved_output_name(""), "output.mp4");
        assert_eq!(s.resolved_output_name("input.mp4"), "input_processed.mp4");
        s.output_file_name = "custom.mp4".to_string();
        assert_eq!(s.resolved_output_name("input.mp4"), "custom.mp4");
    }

    #[test]
    fn test_field_updates() {
        let update = SettingsUpdate::field("start", "01:05.5").unwrap();
        assert_eq!(update.start_time, Some(65.5));

        let update = SettingsUpdate::field("vcodec", "libx265").unwrap();
        assert_eq!(update.video_codec, Some(VideoCodec::Libx265));

        assert!(SettingsUpdate::field("preset", "warp").is_err());
        assert!(SettingsUpdate::field("start", "soon").is_err());
        assert!(SettingsUpdate::field("colour", "red").is_err());
        assert_eq!(SettingsUpdate::field("mute", "on").unwrap().mute_audio, Some(true));
    }

    #[test]
    fn test_unsupported_enumerated_values_fall_back() {
        let saved: PersistedSettings = serde_json::from_str(
            r#"{"audioCodec":"aac","audioSampleRate":"12345","audioChannels":"7","videoPreset":"turbo"}"#,
        )
        .unwrap();
        let mut settings = Settings::default();
        settings.apply_persisted(saved);
        assert_eq!(settings.audio_codec, AudioCodec::Aac);
        assert_eq!(settings.audio_sample_rate, "48000");
        assert_eq!(settings.audio_channels, "2");
        assert_eq!(settings.video_preset, "medium");

        settings.apply(SettingsUpdate {
            video_level: Some("9.9".to_string()),
            pixel_format: Some("nv12".to_string()),
            audio_channels: Some("6".to_string()),
            ..Default::default()
        });
        assert_eq!(settings.video_level, "4.1");
        assert_eq!(settings.pixel_format, "yuv420p");
        assert_eq!(settings.audio_channels, "6");
    }
}
