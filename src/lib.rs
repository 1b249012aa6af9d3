//! ffviz - ffmpeg command visualizer
//!
//! Synthesizes ffmpeg command lines from a trim window and codec settings,
//! tracks hand edits of the generated command, and orchestrates runs of a
//! transcoding engine (native ffmpeg or an in-memory simulation).

pub mod cli;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod processor;
pub mod session;
pub mod settings;
pub mod store;
pub mod timecode;
pub mod workflow;
