use thiserror::Error;

use crate::processor::FailureKind;

#[derive(Error, Debug)]
pub enum VizError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Engine not loaded")]
    EngineNotReady,

    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Engine execution failed: {0}")]
    EngineFailed(String),

    #[error("Invalid virtual file name: {0}")]
    InvalidFileName(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("FFmpeg processing failed: {message}")]
    Execution { kind: FailureKind, message: String },

    #[error("Output file '{0}' was not created. FFmpeg command may have failed.")]
    OutputNotCreated(String),

    #[error("Output file '{0}' is empty or invalid.")]
    EmptyOutput(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Invalid trim window: {0}")]
    InvalidTrim(String),

    #[error("No input video loaded")]
    MissingInput,

    #[error("Another invocation is already in flight")]
    Busy,
}

pub type Result<T> = std::result::Result<T, VizError>;
