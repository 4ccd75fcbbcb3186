//! CLI argument parsing and configuration

use clap::Parser;
use std::path::PathBuf;

/// songsorter - Music emotion analysis
///
/// Predicts arousal and valence for every half-second of a song and prints
/// the resulting emotion curve. Several files can be ordered into a playlist
/// that flows between similar moods.
#[derive(Parser, Debug)]
#[command(name = "songsorter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Audio files or directories to analyze
    #[arg(value_name = "PATH", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Model weights (.safetensors, or .onnx with the onnx feature)
    #[arg(short, long, value_name = "FILE")]
    pub model: Option<PathBuf>,

    /// Write results as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Order the songs by emotional similarity
    #[arg(short, long, default_value = "false")]
    pub sort: bool,

    /// Run on the CPU even if an accelerator is available
    #[arg(long, default_value = "false")]
    pub cpu: bool,

    /// Number of worker threads (defaults to CPU count - 1)
    #[arg(short = 'j', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Scan subdirectories recursively
    #[arg(short, long, default_value = "false")]
    pub recursive: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress progress bars)
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,
}

impl Cli {
    /// Get the log level based on verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
