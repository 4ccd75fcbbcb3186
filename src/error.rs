//! Unified error types for songsorter
//!
//! Error strategy:
//! - Per-file errors (decode, sample rate, too short): Recoverable, skip and continue
//! - Model errors (missing/corrupt weights, inference): Fatal, abort batch
//!
//! All errors include actionable suggestions where possible.

use crate::inference::Device;
use std::path::PathBuf;
use thiserror::Error;

/// Supported audio formats for helpful error messages
pub const SUPPORTED_FORMATS: &str = "MP3, WAV, FLAC, AIFF, OGG, M4A";

/// Top-level error type for songsorter operations
#[derive(Debug, Error)]
pub enum SongSorterError {
    // =========================================================================
    // Input validation - recoverable, skip file and continue batch
    // =========================================================================
    #[error("Please load your audio with a sampling rate of {expected} Hz (got {actual} Hz)\n  Tip: Decode from a file path to let songsorter resample for you")]
    SamplingRate { expected: u32, actual: u32 },

    #[error("Audio too short: {samples} samples, at least {required} required (one 0.5s segment)")]
    AudioTooShort { samples: usize, required: usize },

    #[error("Invalid audio buffer: {reason}")]
    InvalidAudio { reason: String },

    #[error("Failed to decode audio file '{path}': {reason}\n  Supported formats: {SUPPORTED_FORMATS}\n  Tip: If the file plays in other apps, it may be corrupted or use an unsupported codec")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Unsupported audio format for '{path}': {format}\n  Supported formats: {SUPPORTED_FORMATS}")]
    UnsupportedFormat { path: PathBuf, format: String },

    #[error("File not found: '{0}'\n  Tip: Check the path exists and is accessible")]
    FileNotFound(PathBuf),

    // =========================================================================
    // Feature pipeline invariants
    // =========================================================================
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Cannot assemble an empty feature batch")]
    EmptyBatch,

    // =========================================================================
    // Model errors - fatal, no fallback model
    // =========================================================================
    #[error("Emotion model not found.\n\n  Locations checked:\n{locations}\n\n  To fix this, either:\n  1. Set the environment variable:\n     export SONGSORTER_MODEL_PATH=/path/to/model_state_dict.safetensors\n  2. Or place the model in one of the above locations.")]
    ModelNotFound { locations: String },

    #[error("Failed to load emotion model from '{path}': {reason}\n  Tip: The weights file may be corrupt or exported for a different architecture")]
    ModelLoadError { path: PathBuf, reason: String },

    #[error("Model inference failed: {reason}")]
    InferenceError { reason: String },

    #[error("Model runs on {model} but the song was prepared for {song}")]
    DeviceMismatch { song: Device, model: Device },

    // =========================================================================
    // Output and configuration
    // =========================================================================
    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the output directory")]
    OutputError { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for songsorter operations
pub type Result<T> = std::result::Result<T, SongSorterError>;

impl SongSorterError {
    /// Returns true if this error only concerns one input file (skip it, continue batch)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SongSorterError::SamplingRate { .. }
                | SongSorterError::AudioTooShort { .. }
                | SongSorterError::InvalidAudio { .. }
                | SongSorterError::DecodeError { .. }
                | SongSorterError::UnsupportedFormat { .. }
                | SongSorterError::FileNotFound(_)
        )
    }

    /// Returns true if the model itself is unusable
    pub fn is_model_error(&self) -> bool {
        matches!(
            self,
            SongSorterError::ModelNotFound { .. }
                | SongSorterError::ModelLoadError { .. }
                | SongSorterError::DeviceMismatch { .. }
        )
    }

    /// Create a decode error with context about the issue
    pub fn decode_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SongSorterError::DecodeError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a model load error for a weights file
    pub fn model_load_error(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        SongSorterError::ModelLoadError {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an output error, checking for common issues
    pub fn output_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!("Permission denied. Check that you have write access to {}", path.display())
            }
            std::io::ErrorKind::NotFound => {
                format!("Directory does not exist: {}", path.parent().map(|p| p.display().to_string()).unwrap_or_default())
            }
            _ => err.to_string(),
        };
        SongSorterError::OutputError { path, reason }
    }
}

impl From<ndarray::ShapeError> for SongSorterError {
    fn from(err: ndarray::ShapeError) -> Self {
        SongSorterError::ShapeMismatch {
            expected: "valid shape".into(),
            actual: err.to_string(),
        }
    }
}
