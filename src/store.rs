use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{Result, VizError};
use crate::settings::PersistedSettings;

/// Key the settings snapshot is stored under.
pub const STORAGE_KEY: &str = "ffmpegVisualizerSettings";

/// Persistence for the settings snapshot.
///
/// A missing or unreadable snapshot loads as `None`, never as an error.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Option<PersistedSettings>;

    fn save(&self, settings: &PersistedSettings) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// JSON file holding an object of snapshots keyed by storage key.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Map<String, Value> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return Map::new(),
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                warn!("Ignoring unreadable settings file {}", self.path.display());
                Map::new()
            }
        }
    }

    fn write_map(&self, map: Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&Value::Object(map))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Option<PersistedSettings> {
        let value = self.read_map().remove(STORAGE_KEY)?;
        match serde_json::from_value(value) {
            Ok(settings) => Some(settings),
            Err(e) => {
                warn!("Failed to load saved settings: {}", e);
                None
            }
        }
    }

    fn save(&self, settings: &PersistedSettings) -> Result<()> {
        let mut map = self.read_map();
        map.insert(STORAGE_KEY.to_string(), serde_json::to_value(settings)?);
        self.write_map(map)?;
        debug!("Saved settings to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut map = self.read_map();
        if map.remove(STORAGE_KEY).is_some() {
            self.write_map(map)?;
        }
        Ok(())
    }
}

/// Process-local store; nothing outlives the session.
#[derive(Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Option<PersistedSettings> {
        let guard = self.snapshot.lock().ok()?;
        serde_json::from_str(guard.as_deref()?).ok()
    }

    fn save(&self, settings: &PersistedSettings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        let mut guard = self
            .snapshot
            .lock()
            .map_err(|_| VizError::Settings("settings store poisoned".to_string()))?;
        *guard = Some(json);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if let Ok(mut guard) = self.snapshot.lock() {
            *guard = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::VideoCodec;
    use assert_fs::prelude::*;

    #[test]
    fn test_missing_file_loads_nothing() {
        let temp = assert_fs::TempDir::new().unwrap();
        let store = JsonFileStore::new(temp.child("nested/settings.json").path());
        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let temp = assert_fs::TempDir::new().unwrap();
        let store = JsonFileStore::new(temp.child("state/settings.json").path());

        let mut saved = PersistedSettings::default();
        saved.video_codec = VideoCodec::Libx264;
        saved.video_bitrate = "2M".to_string();
        store.save(&saved).unwrap();

        let content = std::fs::read_to_string(temp.child("state/settings.json").path()).unwrap();
        assert!(content.contains(STORAGE_KEY));
        assert_eq!(store.load(), Some(saved));
    }

    #[test]
    fn test_corrupt_snapshot_is_ignored() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("settings.json");

        file.write_str("{ not json").unwrap();
        assert!(JsonFileStore::new(file.path()).load().is_none());

        file.write_str(r#"{"ffmpegVisualizerSettings": {"videoCodec": "h263"}}"#)
            .unwrap();
        assert!(JsonFileStore::new(file.path()).load().is_none());
    }

    #[test]
    fn test_clear_keeps_other_keys() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("settings.json");
        file.write_str(r#"{"other": 1}"#).unwrap();

        let store = JsonFileStore::new(file.path());
        store.save(&PersistedSettings::default()).unwrap();
        store.clear().unwrap();

        assert!(store.load().is_none());
        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.contains("\"other\""));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.load().is_none());
        store.save(&PersistedSettings::default()).unwrap();
        assert!(store.load().is_some());
        store.clear().unwrap();
        assert!(store.load().is_none());
    }
}
