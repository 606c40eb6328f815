pub use mkvshrink_core::config::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    expand_paths(&mut config);

    config
        .validate()
        .with_context(|| format!("Invalid config file: {:?}", path))?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./mkvshrink.toml",
        "~/.config/mkvshrink/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    // Return default config if no file found
    Ok(Config::default())
}

/// Expand a leading `~` in every configured path.
fn expand_paths(config: &mut Config) {
    let expand = |p: &mut Option<std::path::PathBuf>| {
        if let Some(path) = p.as_mut() {
            let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
            *path = expanded.into();
        }
    };

    expand(&mut config.batch.output_dir);
    expand(&mut config.tools.ffmpeg_path);
    expand(&mut config.tools.ffprobe_path);
    expand(&mut config.tools.scratch_dir);
}
