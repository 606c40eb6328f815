//! Unified error type for mkvshrink.
//!
//! Every failure is propagated as a value; nothing below the binary ever
//! terminates the process. [`Error::is_fatal`] separates environment
//! misconfiguration detected at startup from per-file failures that the
//! batch reports and moves past.

use std::path::PathBuf;

/// Unified error type covering all failure modes in mkvshrink.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// None of the known naming conventions matched the input filename.
    #[error("no naming pattern matched: {file_name}")]
    PatternNotFound {
        /// The filename that was examined.
        file_name: String,
    },

    /// Neither the primary nor the secondary audio language is present.
    #[error("no usable audio stream in {}", input.display())]
    NoUsableAudio {
        /// The input file being converted.
        input: PathBuf,
    },

    /// An external tool could not be located.
    #[error("{tool} not found; is it installed and in PATH?")]
    ToolNotFound {
        /// Name of the missing tool.
        tool: String,
    },

    /// An external tool (ffprobe, ffmpeg) failed to run or returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// The encoder failed. `cleanup` carries the error from removing the
    /// partially written output, when that also failed.
    #[error("{}", encode_failed_message(.message, .output, .cleanup))]
    EncodeFailed {
        /// Encoder failure description.
        message: String,
        /// The output file the encoder was writing.
        output: PathBuf,
        /// Failure to remove the partial output, if any.
        cleanup: Option<std::io::Error>,
    },

    /// The computed output path names the input file itself.
    #[error("output would replace the input {}", path.display())]
    OutputIsInput {
        /// The input file.
        path: PathBuf,
    },

    /// Another input of the same batch already maps to this output.
    #[error("output {} is already claimed by another file in this batch", output.display())]
    OutputConflict {
        /// The contested output path.
        output: PathBuf,
    },

    /// Creating, reading, or removing the probe scratch file failed.
    #[error("scratch file {}: {source}", path.display())]
    Scratch {
        /// Path of the scratch file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The working directory could not be enumerated.
    #[error("failed to read directory {}: {source}", path.display())]
    DirectoryRead {
        /// The directory being scanned.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Configuration failed validation.
    #[error("Config error: {0}")]
    Config(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

fn encode_failed_message(
    message: &str,
    output: &std::path::Path,
    cleanup: &Option<std::io::Error>,
) -> String {
    match cleanup {
        Some(e) => format!(
            "encode failed: {message}; additionally failed to remove {}: {e}",
            output.display()
        ),
        None => format!("encode failed: {message}"),
    }
}

impl Error {
    /// Whether this error indicates environment misconfiguration that should
    /// stop the whole run rather than a single file.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ToolNotFound { .. } | Error::DirectoryRead { .. } | Error::Config(_)
        )
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::PatternNotFound`].
    pub fn pattern_not_found(file_name: impl Into<String>) -> Self {
        Error::PatternNotFound {
            file_name: file_name.into(),
        }
    }

    /// Convenience constructor for [`Error::Scratch`].
    pub fn scratch(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Scratch {
            path: path.into(),
            source,
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
