use tracing::info;

pub const OVERRIDE_WARNING: &str = "You have manually edited the FFmpeg command. Changes to settings \
will not update this command automatically. Use reset-command to return to the auto-generated command.";

/// Which command is current: the live synthesis or a frozen user edit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CommandMode {
    #[default]
    Auto,
    Overridden(String),
}

/// Tracks hand edits of the synthesized command.
///
/// Once an edit is committed the command stays frozen through any number of
/// settings changes until [`CommandEditor::reset`] is called.
#[derive(Debug, Clone, Default)]
pub struct CommandEditor {
    mode: CommandMode,
}

impl CommandEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> &CommandMode {
        &self.mode
    }

    pub fn is_overridden(&self) -> bool {
        matches!(self.mode, CommandMode::Overridden(_))
    }

    /// The command that should be shown and executed.
    pub fn effective<'a>(&'a self, synthesized: &'a str) -> &'a str {
        match &self.mode {
            CommandMode::Auto => synthesized,
            CommandMode::Overridden(frozen) => frozen,
        }
    }

    /// Commit an edit. An edit identical to the current synthesis does not
    /// leave `Auto`. Returns true when the editor is overridden afterwards.
    pub fn commit_edit(&mut self, edited: &str, synthesized: &str) -> bool {
        let edited = edited.trim();
        match &self.mode {
            CommandMode::Auto if edited == synthesized => {}
            _ => {
                info!("Command overridden by user edit");
                self.mode = CommandMode::Overridden(edited.to_string());
            }
        }
        self.is_overridden()
    }

    /// Return to live synthesis.
    pub fn reset(&mut self) {
        if self.is_overridden() {
            info!("Command reset to auto-generated");
        }
        self.mode = CommandMode::Auto;
    }

    /// Warning to surface while settings and command are decoupled.
    pub fn warning(&self) -> Option<&'static str> {
        self.is_overridden().then_some(OVERRIDE_WARNING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_follows_synthesis() {
        let editor = CommandEditor::new();
        assert_eq!(editor.effective("ffmpeg -i \"a\" \"b\""), "ffmpeg -i \"a\" \"b\"");
        assert!(editor.warning().is_none());
    }

    #[test]
    fn test_unchanged_edit_stays_auto() {
        let mut editor = CommandEditor::new();
        assert!(!editor.commit_edit("ffmpeg x ", "ffmpeg x"));
        assert_eq!(editor.mode(), &CommandMode::Auto);
    }

    #[test]
    fn test_override_freezes_until_reset() {
        let mut editor = CommandEditor::new();
        assert!(editor.commit_edit("ffmpeg -i in -an out", "ffmpeg -i in out"));

        for synthesized in ["ffmpeg one", "ffmpeg two", "ffmpeg three"] {
            assert_eq!(editor.effective(synthesized), "ffmpeg -i in -an out");
        }
        assert!(editor.warning().is_some());

        // a later edit replaces the frozen command even if it matches synthesis
        editor.commit_edit("ffmpeg two", "ffmpeg two");
        assert_eq!(editor.effective("ffmpeg three"), "ffmpeg two");

        editor.reset();
        assert_eq!(editor.effective("ffmpeg three"), "ffmpeg three");
        assert!(!editor.is_overridden());
    }
}
