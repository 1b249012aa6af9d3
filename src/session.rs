use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::command::{parse_command_line, CommandEditor, CommandSynthesizer, FfmpegCommand};
use crate::error::{Result, VizError};
use crate::processor::ProcessingJob;
use crate::settings::{derive_output_file_name, PersistedSettings, Settings, SettingsUpdate};

/// One editing session: the settings, the loaded video and the command
/// derived from them.
///
/// All settings mutations go through [`Session::update`] so the trim window
/// is re-clamped and the displayed command recomputed in one place.
#[derive(Debug, Clone, Default)]
pub struct Session {
    settings: Settings,
    video_src: Option<PathBuf>,
    file_name: String,
    input: Option<Arc<Vec<u8>>>,
    current_time: f64,
    is_playing: bool,
    editor: CommandEditor,
    ffmpeg_command: String,
}

impl Session {
    /// Defaults overlaid with a saved snapshot, if any.
    pub fn new(saved: Option<PersistedSettings>) -> Self {
        let mut session = Self::default();
        if let Some(saved) = saved {
            debug!("Restoring saved settings");
            session.settings.apply_persisted(saved);
        }
        session.refresh();
        session
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn video_src(&self) -> Option<&Path> {
        self.video_src.as_deref()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn has_input(&self) -> bool {
        self.input.as_ref().is_some_and(|data| !data.is_empty())
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Playback position; restarts at the trim start when configured.
    pub fn seek(&mut self, seconds: f64) {
        let s = &self.settings;
        self.current_time = if s.restart_at_trim_start && seconds >= s.end_time {
            s.start_time
        } else {
            seconds.clamp(0.0, s.duration.max(0.0))
        };
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.is_playing = playing;
    }

    /// The command currently in effect, synthesized or overridden.
    pub fn command(&self) -> &str {
        &self.ffmpeg_command
    }

    pub fn synthesized(&self) -> FfmpegCommand {
        CommandSynthesizer::synthesize(&self.settings, &self.file_name)
    }

    pub fn is_modified(&self) -> bool {
        self.editor.is_overridden()
    }

    pub fn warning(&self) -> Option<&'static str> {
        self.editor.warning()
    }

    fn refresh(&mut self) {
        let synthesized = self.synthesized().to_string();
        self.ffmpeg_command = self.editor.effective(&synthesized).to_string();
    }

    /// Merge a partial change. Returns true when the settings changed.
    pub fn update(&mut self, update: SettingsUpdate) -> bool {
        let changed = self.settings.apply(update);
        if changed {
            self.refresh();
        }
        changed
    }

    /// A video was picked: remember it and derive the output name.
    pub fn load_video<P: AsRef<Path>>(&mut self, path: P, data: Vec<u8>) {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        info!("Loaded video {} ({} bytes)", path.display(), data.len());

        self.settings.output_file_name = derive_output_file_name(&file_name);
        self.video_src = Some(path.to_path_buf());
        self.file_name = file_name;
        self.input = Some(Arc::new(data));
        self.current_time = 0.0;
        self.refresh();
    }

    /// Media metadata arrived: the whole video is selected.
    pub fn set_duration(&mut self, duration: f64) -> bool {
        self.update(SettingsUpdate {
            duration: Some(duration),
            end_time: Some(duration),
            ..Default::default()
        })
    }

    /// Forget the video and trim window; option fields survive.
    pub fn reset_video(&mut self) {
        let persisted = self.settings.persisted();
        *self = Self::default();
        self.settings.apply_persisted(persisted);
        self.refresh();
        info!("Video reset");
    }

    /// Restore option defaults; the video and trim window stay.
    pub fn clear_settings(&mut self) {
        self.settings.apply_persisted(PersistedSettings::default());
        if !self.file_name.is_empty() {
            self.settings.output_file_name = derive_output_file_name(&self.file_name);
        }
        self.refresh();
        info!("Settings cleared");
    }

    /// Commit a hand-edited command. Returns true when it overrides synthesis.
    pub fn commit_edit(&mut self, edited: &str) -> Result<bool> {
        parse_command_line(edited)?;
        let synthesized = self.synthesized().to_string();
        let overridden = self.editor.commit_edit(edited, &synthesized);
        self.refresh();
        Ok(overridden)
    }

    pub fn reset_command(&mut self) {
        self.editor.reset();
        self.refresh();
    }

    /// Snapshot of what the engine should run for the current state.
    pub fn processing_job(&self) -> Result<ProcessingJob> {
        let input = self.input.clone().ok_or(VizError::MissingInput)?;
        let resolved = self.settings.resolved_output_name(&self.file_name);

        let (options, output_name) = if self.editor.is_overridden() {
            let parsed = parse_command_line(&self.ffmpeg_command)?;
            (parsed.options, parsed.output.unwrap_or(resolved))
        } else {
            (CommandSynthesizer::options(&self.settings), resolved)
        };

        Ok(ProcessingJob {
            input,
            options,
            output_name,
            settings: self.settings.clone(),
        })
    }
}
