//! File discovery and scanning

use crate::error::{Result, SongSorterError};
use crate::types::AudioFormat;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Discovered audio file with basic metadata
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub format: AudioFormat,
    pub size_bytes: u64,
}

/// Scan a path (file or directory) for audio files
///
/// Directory results are sorted by path so runs are reproducible.
pub fn scan(input: &Path, recursive: bool) -> Result<Vec<DiscoveredFile>> {
    if !input.exists() {
        return Err(SongSorterError::FileNotFound(input.to_path_buf()));
    }

    let mut files = Vec::new();

    if input.is_file() {
        // Single file mode
        if let Some(file) = try_discover_file(input) {
            files.push(file);
        } else {
            return Err(SongSorterError::UnsupportedFormat {
                path: input.to_path_buf(),
                format: input
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            });
        }
    } else if input.is_dir() {
        // Directory mode
        let walker = if recursive {
            WalkDir::new(input)
        } else {
            WalkDir::new(input).max_depth(1)
        };

        for entry in walker.sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_file() {
                if let Some(file) = try_discover_file(path) {
                    debug!("Discovered: {}", file.path.display());
                    files.push(file);
                }
            }
        }

        if files.is_empty() {
            warn!("No supported audio files found in {}", input.display());
        }
    }

    Ok(files)
}

/// Scan several inputs in order, dropping duplicate paths
///
/// A missing or unsupported single file is reported and skipped rather than
/// failing the whole scan.
pub fn scan_all(inputs: &[PathBuf], recursive: bool) -> (Vec<DiscoveredFile>, Vec<SongSorterError>) {
    let mut seen = HashSet::new();
    let mut files = Vec::new();
    let mut errors = Vec::new();

    for input in inputs {
        match scan(input, recursive) {
            Ok(found) => {
                for file in found {
                    if seen.insert(file.path.clone()) {
                        files.push(file);
                    }
                }
            }
            Err(e) => {
                warn!("{}", e);
                errors.push(e);
            }
        }
    }

    info!("Discovered {} audio files", files.len());
    (files, errors)
}

/// Try to create a DiscoveredFile if the path is a supported audio format
fn try_discover_file(path: &Path) -> Option<DiscoveredFile> {
    let ext = path.extension()?.to_str()?;
    let format = AudioFormat::from_extension(ext)?;

    let metadata = std::fs::metadata(path).ok()?;
    let size_bytes = metadata.len();

    Some(DiscoveredFile {
        path: path.to_path_buf(),
        format,
        size_bytes,
    })
}
