use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};

use crate::config::Config;
use crate::engine::{probe_duration, EngineFactory, TranscodeEngine};
use crate::error::{Result, VizError};
use crate::processor::{ProcessedOutput, Processor};
use crate::session::Session;
use crate::settings::SettingsUpdate;
use crate::store::{JsonFileStore, SettingsStore};

/// Session, persistence and processing wired together.
///
/// Settings are saved on every committed change and each change is handed
/// to the processor for debounced auto-processing.
pub struct Workflow {
    config: Config,
    session: Session,
    store: Arc<dyn SettingsStore>,
    processor: Processor,
}

impl Workflow {
    pub fn new(config: Config, engine: Arc<dyn TranscodeEngine>, store: Arc<dyn SettingsStore>) -> Self {
        let session = Session::new(store.load());
        let processor = Processor::new(engine, config.processing.clone());

        Self {
            config,
            session,
            store,
            processor,
        }
    }

    /// Engine and store as described by `config`
    pub fn from_config(config: Config, simulate: bool) -> Result<Self> {
        let engine = EngineFactory::create(config.engine.clone(), simulate)?;
        let store = Arc::new(JsonFileStore::new(&config.storage.settings_path));
        Ok(Self::new(config, engine, store))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    /// Read a video file and select its full length.
    ///
    /// Without an explicit `duration` the length is probed with ffprobe.
    pub async fn open_video<P: AsRef<Path>>(&mut self, path: P, duration: Option<f64>) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(VizError::FileNotFound(path.display().to_string()));
        }

        let duration = match duration {
            Some(duration) => duration,
            None => probe_duration(&self.config.engine.probe_path, path)
                .await?
                .ok_or_else(|| {
                    VizError::Config(format!(
                        "Could not determine the duration of {}; pass --duration",
                        path.display()
                    ))
                })?,
        };

        let data = fs::read(path).await?;
        self.processor.clear_results();
        self.session.load_video(path, data);
        self.session.set_duration(duration);
        self.save()?;
        Ok(())
    }

    /// Load the engine and fire the one-shot auto-process for a pending input.
    pub async fn start_engine(&self) -> Result<()> {
        self.processor.engine().load().await?;
        self.processor.on_engine_ready(self.session.processing_job().ok());
        Ok(())
    }

    /// Single entry point for settings changes.
    pub fn update(&mut self, update: SettingsUpdate) -> Result<bool> {
        if !self.session.update(update) {
            return Ok(false);
        }
        self.save()?;
        self.notify_processor();
        Ok(true)
    }

    /// Change settings for this session only: nothing is saved and no
    /// auto-processing is scheduled.
    pub fn overlay(&mut self, update: SettingsUpdate) -> bool {
        self.session.update(update)
    }

    pub fn commit_edit(&mut self, edited: &str) -> Result<bool> {
        let overridden = self.session.commit_edit(edited)?;
        self.notify_processor();
        Ok(overridden)
    }

    pub fn reset_command(&mut self) {
        self.session.reset_command();
        self.notify_processor();
    }

    /// Move the playback position. Playback never touches the command.
    pub fn seek(&mut self, seconds: f64) {
        self.session.seek(seconds);
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.session.set_playing(playing);
    }

    pub fn set_auto_process(&self, enabled: bool) {
        self.processor.set_auto_process(enabled);
        if enabled {
            self.notify_processor();
        }
    }

    /// Manual trigger
    pub async fn process(&self) -> Result<ProcessedOutput> {
        let job = self.session.processing_job()?;
        self.processor.process_now(job).await
    }

    pub fn reset_video(&mut self) -> Result<()> {
        self.processor.clear_results();
        self.session.reset_video();
        self.save()
    }

    /// Remove the saved snapshot and restore option defaults.
    pub fn clear_settings(&mut self) -> Result<()> {
        self.store.clear()?;
        self.session.clear_settings();
        self.notify_processor();
        info!("Saved settings removed");
        Ok(())
    }

    fn save(&self) -> Result<()> {
        self.store.save(&self.session.settings().persisted())
    }

    fn notify_processor(&self) {
        match self.session.processing_job() {
            Ok(job) => self.processor.settings_changed(job),
            Err(VizError::MissingInput) => {}
            Err(e) => warn!("Current command cannot be processed: {}", e),
        }
    }
}

/// Write processed bytes to `path`, creating parent directories.
pub async fn write_output<P: AsRef<Path>>(output: &ProcessedOutput, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    fs::write(path, output.data.as_slice()).await?;
    info!("Wrote {} ({:.2} MB)", path.display(), output.size_mb());
    Ok(())
}
