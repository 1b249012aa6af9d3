use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, VizError};

fn default_input_name() -> String {
    "input".to_string()
}

fn default_probe_path() -> String {
    "ffprobe".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Path to ffprobe binary, used to read the media duration
    pub probe_path: String,
    /// Arguments placed before every token list handed to ffmpeg.
    /// `-y` is needed because the engine never answers prompts.
    pub global_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Re-run the engine automatically when settings change
    pub auto_process: bool,
    /// Quiet period after the last settings change before auto-processing (ms)
    pub debounce_ms: u64,
    /// Delay between the engine becoming ready and the first automatic run (ms)
    pub ready_delay_ms: u64,
    /// Name the input bytes are staged under in the engine file system
    pub input_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding the persisted settings snapshot
    pub settings_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            probe_path: default_probe_path(),
            global_args: vec![
                "-hide_banner".to_string(),
                "-nostdin".to_string(),
                "-y".to_string(),
            ],
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            auto_process: true,
            debounce_ms: 1500,
            ready_delay_ms: 500,
            input_name: default_input_name(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from(".ffviz").join("settings.json"),
        }
    }
}

impl ProcessingConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn ready_delay(&self) -> Duration {
        Duration::from_millis(self.ready_delay_ms)
    }
}

impl Config {
    /// Missing sections and keys fall back to their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VizError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| VizError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| VizError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}
