use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mkvshrink")]
#[command(author, version, about = "Batch-convert MKV episodes to 720p HEVC, keeping two languages")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert every matching file in a directory
    Run {
        /// Directory to scan (not recursive)
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Maximum number of files converted at once
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Write converted files here instead of next to the inputs
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Probe and print the ffmpeg command for each file without encoding
        #[arg(long)]
        dry_run: bool,

        /// Replace output files that already exist
        #[arg(long)]
        overwrite: bool,
    },

    /// Probe a media file and show which streams would be kept
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the output name each input name would be converted to
    Rename {
        /// File names to transform
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Display version information
    Version,
}
