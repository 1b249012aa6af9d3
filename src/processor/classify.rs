use std::io::ErrorKind;

use crate::error::VizError;

/// User-facing category of an engine execution failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    CodecCompatibility,
    InvalidArgument,
    FileAccess,
    Codec,
    Unknown,
}

impl FailureKind {
    /// Pick a category from the raw engine message. First match wins.
    pub fn classify(raw: &str) -> Self {
        if raw.contains("index out of bounds") {
            FailureKind::CodecCompatibility
        } else if raw.contains("Invalid argument") {
            FailureKind::InvalidArgument
        } else if raw.contains("Permission denied") {
            FailureKind::FileAccess
        } else if raw.contains("codec") || raw.contains("encoder") {
            FailureKind::Codec
        } else {
            FailureKind::Unknown
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        match self {
            FailureKind::CodecCompatibility => Some(
                "Audio/video codec compatibility issue. Try using \"copy\" for both audio and video \
                 codecs, or try a different audio codec like AAC instead of Opus.",
            ),
            FailureKind::InvalidArgument => {
                Some("Invalid parameters provided. Please check your codec and format settings.")
            }
            FailureKind::FileAccess => {
                Some("File access error. Please try uploading the video again.")
            }
            FailureKind::Codec => {
                Some("Codec error. Try using different audio/video codec settings.")
            }
            FailureKind::Unknown => None,
        }
    }
}

/// Turn a raw engine failure message into a [`VizError::Execution`].
pub fn execution_error(raw: &str) -> VizError {
    let kind = FailureKind::classify(raw);
    let message = match kind.hint() {
        Some(hint) => hint.to_string(),
        None => raw.trim().to_string(),
    };
    VizError::Execution { kind, message }
}

/// The single message shown to the user for a failed invocation.
pub fn user_message(error: &VizError) -> String {
    match error {
        VizError::OutputNotCreated(_) => {
            "Video processing failed. Please check your settings and try again.".to_string()
        }
        VizError::EmptyOutput(_) => {
            "Output video file is empty. Please check your trim settings and try again.".to_string()
        }
        VizError::FileNotFound(_) | VizError::InvalidFileName(_) => {
            "File system error. Please try processing again.".to_string()
        }
        VizError::Io(e) if e.kind() == ErrorKind::AlreadyExists => {
            "File conflict detected. Please try again.".to_string()
        }
        VizError::Io(_) => "File system error. Please try processing again.".to_string(),
        other => other.to_string(),
    }
}
