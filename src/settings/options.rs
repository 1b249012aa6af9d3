//! Allowed values for the enumerated settings fields.

pub struct OptionEntry {
    pub value: &'static str,
    pub label: &'static str,
}

const fn entry(value: &'static str, label: &'static str) -> OptionEntry {
    OptionEntry { value, label }
}

pub const VIDEO_PRESETS: &[OptionEntry] = &[
    entry("ultrafast", "Ultrafast"),
    entry("superfast", "Superfast"),
    entry("veryfast", "Veryfast"),
    entry("faster", "Faster"),
    entry("fast", "Fast"),
    entry("medium", "Medium"),
    entry("slow", "Slow"),
    entry("slower", "Slower"),
    entry("veryslow", "Veryslow"),
];

pub const VIDEO_PROFILES: &[OptionEntry] = &[
    entry("baseline", "Baseline"),
    entry("main", "Main"),
    entry("high", "High"),
];

pub const VIDEO_LEVELS: &[OptionEntry] = &[
    entry("3.0", "3.0"),
    entry("3.1", "3.1"),
    entry("4.0", "4.0"),
    entry("4.1", "4.1"),
    entry("4.2", "4.2"),
    entry("5.0", "5.0"),
    entry("5.1", "5.1"),
];

pub const PIXEL_FORMATS: &[OptionEntry] = &[
    entry("yuv420p", "YUV 4:2:0 Planar"),
    entry("yuv422p", "YUV 4:2:2 Planar"),
    entry("yuv444p", "YUV 4:4:4 Planar"),
    entry("rgb24", "RGB 24-bit"),
];

pub const AUDIO_CHANNELS: &[OptionEntry] = &[
    entry("1", "Mono (1)"),
    entry("2", "Stereo (2)"),
    entry("6", "5.1 Surround (6)"),
];

pub const AUDIO_SAMPLE_RATES: &[OptionEntry] = &[
    entry("22050", "22050 Hz"),
    entry("44100", "44100 Hz"),
    entry("48000", "48000 Hz"),
    entry("96000", "96000 Hz"),
];

/// Sample rates libopus accepts.
pub const OPUS_SAMPLE_RATES: &[u32] = &[8000, 12000, 16000, 24000, 48000];

pub const OPUS_DEFAULT_BITRATE: &str = "128k";
pub const OPUS_DEFAULT_SAMPLE_RATE: &str = "48000";

pub fn is_allowed(table: &[OptionEntry], value: &str) -> bool {
    table.iter().any(|e| e.value == value)
}

/// All named tables, in display order.
pub fn tables() -> [(&'static str, &'static [OptionEntry]); 6] {
    [
        ("preset", VIDEO_PRESETS),
        ("profile", VIDEO_PROFILES),
        ("level", VIDEO_LEVELS),
        ("pix-fmt", PIXEL_FORMATS),
        ("channels", AUDIO_CHANNELS),
        ("sample-rate", AUDIO_SAMPLE_RATES),
    ]
}
