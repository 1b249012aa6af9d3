// Command synthesis and editing
//
// - builder: ordered ffmpeg token list with display rendering
// - synth: pure Settings -> tokens mapping
// - parse: splitting hand-edited command lines back into options
// - editor: auto-generated vs user-overridden command state

pub mod builder;
pub mod editor;
pub mod parse;
pub mod synth;

pub use builder::*;
pub use editor::{CommandEditor, CommandMode, OVERRIDE_WARNING};
pub use parse::{parse_command_line, tokenize, ParsedCommand};
pub use synth::CommandSynthesizer;
