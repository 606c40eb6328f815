//! External tool detection and management.
//!
//! The [`ToolRegistry`] discovers and caches the locations of the encoder and
//! its probe companion (ffmpeg, ffprobe) and provides lookup methods for the
//! rest of the crate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mkvshrink_core::config::ToolsConfig;
use serde::{Deserialize, Serialize};

/// Known tool names that the registry manages.
pub const KNOWN_TOOLS: &[&str] = &["ffmpeg", "ffprobe"];

/// A discovered tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Human-readable tool name (e.g. "ffmpeg").
    pub name: String,
    /// Resolved path to the executable.
    pub path: PathBuf,
    /// Maximum execution time before the tool is killed. Unlimited if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of `-version` output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool configurations.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolConfig>,
}

impl ToolRegistry {
    /// Discover tools by searching `PATH` (or using overrides from config).
    ///
    /// For each known tool, if the [`ToolsConfig`] supplies a custom path
    /// **and** that path exists, it is used directly. Otherwise
    /// [`which::which`] is used to locate the tool in `PATH`. Tools that are
    /// not found are omitted from the registry.
    pub fn discover(tools_config: &ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let (custom_path, timeout_secs) = match name {
                "ffmpeg" => (
                    tools_config.ffmpeg_path.as_deref(),
                    tools_config.encode_timeout_secs,
                ),
                "ffprobe" => (
                    tools_config.ffprobe_path.as_deref(),
                    tools_config.probe_timeout_secs,
                ),
                _ => (None, None),
            };

            let resolved = match custom_path {
                Some(p) if p.exists() => Some(p.to_path_buf()),
                Some(p) => {
                    tracing::warn!(
                        tool = name,
                        path = %p.display(),
                        "Configured tool path does not exist, searching PATH"
                    );
                    which::which(name).ok()
                }
                None => which::which(name).ok(),
            };

            match resolved {
                Some(path) => {
                    tracing::debug!(tool = name, path = %path.display(), "Found tool");
                    tools.insert(
                        name.to_string(),
                        ToolConfig {
                            name: name.to_string(),
                            path,
                            timeout: timeout_secs.map(Duration::from_secs),
                        },
                    );
                }
                None => tracing::debug!(tool = name, "Tool not found"),
            }
        }

        Self { tools }
    }

    /// Build a registry from explicit paths, skipping discovery.
    pub fn with_paths(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        let mut tools = HashMap::new();
        for (name, path) in [("ffmpeg", ffmpeg.into()), ("ffprobe", ffprobe.into())] {
            tools.insert(
                name.to_string(),
                ToolConfig {
                    name: name.to_string(),
                    path,
                    timeout: None,
                },
            );
        }
        Self { tools }
    }

    /// Return the [`ToolConfig`] for the given tool, or
    /// [`mkvshrink_core::Error::ToolNotFound`] if it was not found during
    /// discovery.
    pub fn require(&self, name: &str) -> mkvshrink_core::Result<&ToolConfig> {
        self.tools
            .get(name)
            .ok_or_else(|| mkvshrink_core::Error::ToolNotFound {
                tool: name.to_string(),
            })
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| match self.tools.get(name) {
                Some(cfg) => ToolInfo {
                    name: name.to_string(),
                    available: true,
                    version: detect_version(&cfg.path),
                    path: Some(cfg.path.clone()),
                },
                None => ToolInfo {
                    name: name.to_string(),
                    available: false,
                    version: None,
                    path: None,
                },
            })
            .collect()
    }
}

/// Run `<tool> -version` and return the first line of stdout.
fn detect_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}
