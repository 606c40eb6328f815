//! # mkvshrink-av
//!
//! Probing, stream selection, and external tool management for mkvshrink.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and ffprobe.
//! - **Command execution** ([`ToolCommand`]) -- async builder with optional
//!   timeout for running external processes.
//! - **Scratch files** ([`ScratchFile`]) -- per-job capture file for probe
//!   diagnostics, removed on every exit path.
//! - **Probe parsing** ([`ProbeParser`]) -- turns ffprobe's diagnostic text
//!   into a [`mkvshrink_core::StreamTable`].
//! - **Stream selection** ([`StreamSelector`]) -- picks the audio and
//!   subtitle streams to keep for two languages.
//! - **Encoding** ([`EncodeArgs`], [`run_encode`]) -- builds the ffmpeg
//!   argument list and runs it, removing partial output on failure.

pub mod command;
pub mod encode;
pub mod probe;
pub mod scratch;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use encode::{run_encode, EncodeArgs, EncodeProfile};
pub use probe::{run_probe, ProbeParser, StreamSelector};
pub use scratch::ScratchFile;
pub use tools::{ToolInfo, ToolRegistry};
