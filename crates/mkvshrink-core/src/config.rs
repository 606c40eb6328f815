//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from TOML by the binary
//! and carries the batch, selection, naming, encode, and tool sections. Every
//! section defaults sensibly so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub batch: BatchConfig,
    pub selection: SelectionConfig,
    pub naming: NamingConfig,
    pub encode: EncodeConfig,
    pub tools: ToolsConfig,
}

impl Config {
    /// Reject settings that would make every job fail or misbehave.
    pub fn validate(&self) -> Result<()> {
        let ext = self.batch.extension.trim_start_matches('.');
        if ext.is_empty() {
            return Err(Error::Config("batch.extension must not be empty".into()));
        }
        if self.batch.concurrency_factor == 0 {
            return Err(Error::Config(
                "batch.concurrency_factor must be at least 1".into(),
            ));
        }
        if self.batch.max_jobs == Some(0) {
            return Err(Error::Config("batch.max_jobs must be at least 1".into()));
        }

        for (key, lang) in [
            ("selection.primary_language", &self.selection.primary_language),
            ("selection.secondary_language", &self.selection.secondary_language),
        ] {
            if !is_language_code(lang) {
                return Err(Error::Config(format!(
                    "{key} must be a three-letter language code, got '{lang}'"
                )));
            }
        }
        if self.selection.primary_language == self.selection.secondary_language {
            return Err(Error::Config(
                "selection.primary_language and selection.secondary_language must differ".into(),
            ));
        }

        let suffix = self.naming.suffix.trim();
        if suffix.is_empty() {
            return Err(Error::Config("naming.suffix must not be empty".into()));
        }
        if suffix.contains(['/', '\\']) {
            return Err(Error::Config(format!(
                "naming.suffix must not contain a path separator, got '{suffix}'"
            )));
        }

        if self.encode.crf > 51 {
            return Err(Error::Config(format!(
                "encode.crf must be between 0 and 51, got {}",
                self.encode.crf
            )));
        }
        if self.encode.scale_height == 0 {
            return Err(Error::Config("encode.scale_height must be positive".into()));
        }
        if self.encode.video_codec.trim().is_empty() {
            return Err(Error::Config("encode.video_codec must not be empty".into()));
        }

        Ok(())
    }
}

fn is_language_code(s: &str) -> bool {
    s.len() == 3 && s.bytes().all(|b| b.is_ascii_lowercase())
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// Which files are picked up and how many run at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Input file extension, with or without the leading dot.
    pub extension: String,
    /// Jobs allowed per CPU core.
    pub concurrency_factor: usize,
    /// Hard cap on concurrent jobs, overriding `cores * concurrency_factor`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_jobs: Option<usize>,
    /// Where converted files are written. Defaults to the input directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            extension: "mkv".into(),
            concurrency_factor: 3,
            max_jobs: None,
            output_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Which subtitle track wins when several share a language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitlePolicy {
    /// Keep the earliest track.
    First,
    /// Keep the latest track. Releases often put a forced track first.
    #[default]
    Last,
}

/// Languages of interest for stream selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub primary_language: String,
    pub secondary_language: String,
    pub subtitle_policy: SubtitlePolicy,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            primary_language: "rus".into(),
            secondary_language: "eng".into(),
            subtitle_policy: SubtitlePolicy::Last,
        }
    }
}

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

/// Output filename settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Descriptor appended before the extension.
    pub suffix: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            suffix: ".720p.H265".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Fixed video encode profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    pub video_codec: String,
    pub crf: u32,
    /// Output height; width follows the source aspect ratio.
    pub scale_height: u32,
    /// Pass `-y` so an existing output file is replaced.
    pub overwrite: bool,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            video_codec: "libx265".into(),
            crf: 23,
            scale_height: 720,
            overwrite: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

/// External tool locations and limits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    /// Kill the encoder after this many seconds. Unlimited when unset.
    pub encode_timeout_secs: Option<u64>,
    /// Kill the probe after this many seconds. Unlimited when unset.
    pub probe_timeout_secs: Option<u64>,
    /// Directory for probe scratch files. Defaults to the input's directory.
    pub scratch_dir: Option<PathBuf>,
}
