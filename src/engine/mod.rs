// Transcoding engine boundary
//
// The engine is an opaque collaborator with a small file namespace:
// - ffmpeg: native ffmpeg subprocess, files staged in a private temp dir
// - simulated: in-memory engine that copies input to output
//
// Progress is published through a watch channel, log lines through a
// broadcast channel. Consumers decide how to surface them.

pub mod ffmpeg;
pub mod simulated;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

pub use ffmpeg::{probe_duration, FfmpegEngine};
pub use simulated::{SimulatedBehavior, SimulatedEngine};

use crate::config::EngineConfig;
use crate::error::{Result, VizError};

/// Engine progress for the running invocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    /// Completed fraction, 0.0 to 1.0
    pub ratio: f64,
    /// Seconds since the invocation started
    pub elapsed_seconds: f64,
}

/// An entry of the engine file namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
}

/// Main trait for transcoding engine operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Prepare the engine; a no-op when already ready
    async fn load(&self) -> Result<()>;

    fn is_ready(&self) -> bool;

    /// Run with the given argument list (no program token)
    async fn execute(&self, args: &[String]) -> Result<()>;

    async fn write_file(&self, name: &str, data: &[u8]) -> Result<()>;

    async fn read_file(&self, name: &str) -> Result<Vec<u8>>;

    /// May fail for missing files; callers treat deletion as best effort
    async fn delete_file(&self, name: &str) -> Result<()>;

    async fn list_files(&self) -> Result<Vec<FileEntry>>;

    /// Latest progress of the running invocation, `None` when idle
    fn progress(&self) -> watch::Receiver<Option<Progress>>;

    /// Diagnostic log lines
    fn subscribe_logs(&self) -> broadcast::Receiver<String>;
}

/// Factory for creating engine instances
pub struct EngineFactory;

impl EngineFactory {
    /// Native ffmpeg, or the in-memory engine when `simulate` is set
    pub fn create(config: EngineConfig, simulate: bool) -> Result<Arc<dyn TranscodeEngine>> {
        if simulate {
            Ok(Arc::new(SimulatedEngine::new()))
        } else {
            Ok(Arc::new(FfmpegEngine::new(config)?))
        }
    }
}

/// File names are flat: no separators, no `.`/`..`.
pub(crate) fn validate_file_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(VizError::InvalidFileName(name.to_string()));
    }
    Ok(())
}
