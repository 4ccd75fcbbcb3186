//! Runtime configuration settings

use std::path::PathBuf;

/// Runtime settings for the analysis pipeline
#[derive(Debug, Clone)]
pub struct Settings {
    /// Input paths (files or directories)
    pub inputs: Vec<PathBuf>,
    /// Scan recursively
    pub recursive: bool,
    /// Explicit model weights, bypassing the search list
    pub model_path: Option<PathBuf>,
    /// Skip accelerator probing
    pub force_cpu: bool,
    /// JSON output file
    pub json_output: Option<PathBuf>,
    /// Compute the nearest-neighbour playlist order
    pub sort: bool,
    /// Number of analysis worker threads
    pub analysis_threads: usize,
    /// Show progress bars
    pub show_progress: bool,
}

/// Default worker count: all cores but one, at least one
pub fn default_threads() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

impl Settings {
    /// Create settings from CLI arguments
    pub fn from_cli(cli: &super::cli::Cli) -> Self {
        Self {
            inputs: cli.inputs.clone(),
            recursive: cli.recursive,
            model_path: cli.model.clone(),
            force_cpu: cli.cpu,
            json_output: cli.json.clone(),
            sort: cli.sort,
            analysis_threads: cli.threads.unwrap_or_else(default_threads).max(1),
            show_progress: !cli.quiet,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            recursive: false,
            model_path: None,
            force_cpu: false,
            json_output: None,
            sort: false,
            analysis_threads: default_threads(),
            show_progress: true,
        }
    }
}
