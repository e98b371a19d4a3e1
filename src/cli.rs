//! Command-line interface for stillcast
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::job::FitMode;

/// Turn audio files into still-image videos
#[derive(Parser, Debug)]
#[command(
    name = "stillcast",
    version,
    about = "Batch-convert audio files into videos with a cover image"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: info logs, -vv: debug logs)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print events as JSON lines instead of progress bars
    #[arg(long)]
    pub json: bool,

    /// Cover image shown for the whole video (jpg, jpeg, png, bmp)
    #[arg(long, short = 'i', value_name = "IMG")]
    pub image: Option<PathBuf>,

    /// Directory for the produced videos (default: [output] dir from config)
    #[arg(long, short = 'o', value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// How the image is fitted into the 1920x1080 frame (default: pad)
    #[arg(long, value_enum, value_name = "MODE")]
    pub fit: Option<FitMode>,

    /// Audio files, or directories to scan for audio files
    #[arg(value_name = "AUDIO|DIR")]
    pub inputs: Vec<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that ffmpeg and ffprobe are installed and working
    Check,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration inspection actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration (file plus environment overrides) as TOML
    Show,
    /// Print the configuration file path
    Path,
}
