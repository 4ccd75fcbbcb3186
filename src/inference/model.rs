//! Emotion model location
//!
//! Weights are never downloaded or created; they must already exist in one
//! of the locations below.

use crate::error::{Result, SongSorterError};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding the weights location
pub const MODEL_PATH_ENV: &str = "SONGSORTER_MODEL_PATH";

/// Base filename of the trained state dict
pub const MODEL_BASENAME: &str = "model_state_dict";

/// Weights file format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightFormat {
    /// safetensors state dict for the native LSTM
    SafeTensors,
    /// Exported ONNX graph for ONNX Runtime
    Onnx,
}

impl WeightFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("onnx") => WeightFormat::Onnx,
            _ => WeightFormat::SafeTensors,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            WeightFormat::SafeTensors => "safetensors",
            WeightFormat::Onnx => "onnx",
        }
    }

    /// Formats this build can load, most preferred first
    pub fn supported() -> &'static [WeightFormat] {
        #[cfg(feature = "onnx")]
        {
            &[WeightFormat::Onnx, WeightFormat::SafeTensors]
        }
        #[cfg(not(feature = "onnx"))]
        {
            &[WeightFormat::SafeTensors]
        }
    }
}

/// Application directories for `io.github.etashj.songsorter`
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("io.github", "etashj", "songsorter")
}

/// Check for user-provided model path via environment variable
pub fn get_user_model_path() -> Option<PathBuf> {
    std::env::var_os(MODEL_PATH_ENV).map(PathBuf::from)
}

/// Candidate weight files in search order, without checking existence
///
/// 1. SONGSORTER_MODEL_PATH environment variable
/// 2. ProjectDirs cache: ~/.cache/songsorter/models/ (Linux)
///    or ~/Library/Caches/io.github.etashj.songsorter/models/ (macOS)
/// 3. ProjectDirs data: ~/.local/share/songsorter/models/
/// 4. Current directory: ./models/
pub fn candidate_paths() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(env_path) = get_user_model_path() {
        candidates.push(env_path);
    }

    let mut dirs = Vec::new();
    if let Some(proj_dirs) = project_dirs() {
        dirs.push(proj_dirs.cache_dir().join("models"));
        dirs.push(proj_dirs.data_dir().join("models"));
    }
    dirs.push(PathBuf::from("./models"));

    for dir in dirs {
        for format in WeightFormat::supported() {
            candidates.push(dir.join(format!("{}.{}", MODEL_BASENAME, format.extension())));
        }
    }

    candidates
}

/// Resolve the weights file
///
/// An explicit path must exist; it does not fall back to the search list.
pub fn find_model_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(SongSorterError::ModelNotFound {
            locations: format!("  - {} (--model)", path.display()),
        });
    }

    let candidates = candidate_paths();
    if let Some(found) = candidates.iter().find(|p| p.is_file()) {
        debug!("Found model weights at {}", found.display());
        return Ok(found.canonicalize().unwrap_or_else(|_| found.clone()));
    }

    let locations = candidates
        .iter()
        .map(|loc| format!("  - {}", loc.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(SongSorterError::ModelNotFound { locations })
}

/// Format of the weights the default search would load
///
/// Falls back to the most preferred format this build supports when no
/// weights are installed yet.
pub fn default_model_format() -> WeightFormat {
    match find_model_path(None) {
        Ok(path) => WeightFormat::from_path(&path),
        Err(_) => WeightFormat::supported()
            .first()
            .copied()
            .unwrap_or(WeightFormat::SafeTensors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            WeightFormat::from_path(Path::new("m/model_state_dict.onnx")),
            WeightFormat::Onnx
        );
        assert_eq!(
            WeightFormat::from_path(Path::new("m/model_state_dict.safetensors")),
            WeightFormat::SafeTensors
        );
        assert_eq!(WeightFormat::from_path(Path::new("weights")), WeightFormat::SafeTensors);
    }

    #[test]
    fn test_candidates_include_local_models_dir() {
        let candidates = candidate_paths();
        assert!(candidates
            .iter()
            .any(|p| p.ends_with("models/model_state_dict.safetensors")));
    }

    #[test]
    fn test_missing_explicit_path_is_not_found() {
        let err = find_model_path(Some(Path::new("/nonexistent/weights.safetensors"))).unwrap_err();
        match err {
            SongSorterError::ModelNotFound { locations } => {
                assert!(locations.contains("/nonexistent/weights.safetensors"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_existing_explicit_path_is_used() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("custom.safetensors");
        std::fs::write(&path, b"x").unwrap();
        assert_eq!(find_model_path(Some(&path)).unwrap(), path);
    }
}
