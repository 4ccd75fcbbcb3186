//! JSON export for interoperability with other tools

use crate::error::{Result, SongSorterError};
use crate::inference::Device;
use crate::types::AnalyzedSong;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

/// JSON output schema version
const SCHEMA_VERSION: &str = "1.0";

/// Top-level JSON output structure
#[derive(Debug, Serialize, Deserialize)]
pub struct SongSorterJson {
    /// Schema version for forward compatibility
    pub version: String,
    /// Export metadata
    pub metadata: ExportMetadata,
    /// Analyzed songs, in output order
    pub songs: Vec<SongJson>,
}

/// Export metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// songsorter version that generated this file
    pub generator_version: String,
    /// Timestamp of export
    pub exported_at: String,
    /// Number of songs
    pub song_count: usize,
}

/// JSON representation of an analyzed song
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongJson {
    /// File path (absent for in-memory audio)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub title: String,
    pub duration_seconds: f64,
    pub device: Device,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average: Option<EmotionJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    /// Per-segment predictions in chronological order
    #[serde(default)]
    pub segments: Vec<SegmentJson>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EmotionJson {
    pub arousal: f32,
    pub valence: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SegmentJson {
    pub index: usize,
    pub start_seconds: f64,
    pub arousal: f32,
    pub valence: f32,
}

/// Write analyzed songs to a JSON file
///
/// Uses atomic write pattern: writes to a temp file first, then renames.
/// This prevents data corruption if the write is interrupted.
pub fn write_json(songs: &[AnalyzedSong], output_path: &Path) -> Result<()> {
    // Write to temp file in same directory (ensures same filesystem for atomic rename)
    let temp_path = output_path.with_extension("json.tmp");

    let file = File::create(&temp_path).map_err(|e| SongSorterError::output_error(output_path, e))?;
    let writer = BufWriter::new(file);

    let output = SongSorterJson {
        version: SCHEMA_VERSION.to_string(),
        metadata: ExportMetadata {
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: chrono::Utc::now().to_rfc3339(),
            song_count: songs.len(),
        },
        songs: songs.iter().map(song_to_json).collect(),
    };

    serde_json::to_writer_pretty(writer, &output).map_err(|e| {
        // Clean up temp file on error
        let _ = std::fs::remove_file(&temp_path);
        SongSorterError::OutputError {
            path: output_path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    // Atomic rename: either succeeds completely or fails without modifying target
    std::fs::rename(&temp_path, output_path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        SongSorterError::OutputError {
            path: output_path.to_path_buf(),
            reason: format!("Failed to finalize file: {}", e),
        }
    })?;

    info!("Wrote {} songs to {}", songs.len(), output_path.display());

    Ok(())
}

/// Read a previously exported JSON file
pub fn read_json(path: &Path) -> Result<SongSorterJson> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        SongSorterError::ConfigError(format!("Could not parse {}: {}", path.display(), e))
    })
}

fn song_to_json(song: &AnalyzedSong) -> SongJson {
    SongJson {
        path: song.path.as_ref().map(|p| p.to_string_lossy().to_string()),
        title: song.title.clone(),
        duration_seconds: song.duration_seconds,
        device: song.device,
        average: song.average.map(|p| EmotionJson {
            arousal: p.arousal,
            valence: p.valence,
        }),
        mood: song.mood.map(|m| m.to_string()),
        segments: song
            .segments
            .iter()
            .map(|s| SegmentJson {
                index: s.index,
                start_seconds: s.start_seconds,
                arousal: s.emotion.arousal,
                valence: s.emotion.valence,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EmotionPoint, Mood, SegmentEmotion};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn sample_song() -> AnalyzedSong {
        let emotion = EmotionPoint::new(0.4, 0.3);
        AnalyzedSong {
            path: Some(PathBuf::from("/music/track.flac")),
            title: "Track".to_string(),
            duration_seconds: 1.0,
            device: Device::Cpu,
            segments: vec![
                SegmentEmotion {
                    index: 0,
                    start_seconds: 0.0,
                    emotion,
                },
                SegmentEmotion {
                    index: 1,
                    start_seconds: 0.5,
                    emotion,
                },
            ],
            average: Some(emotion),
            mood: Some(emotion.mood()),
            analyzed_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_write_and_read_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("songs.json");

        write_json(&[sample_song()], &path).unwrap();
        assert!(!dir.path().join("songs.json.tmp").exists());

        let parsed = read_json(&path).unwrap();
        assert_eq!(parsed.version, "1.0");
        assert_eq!(parsed.metadata.song_count, 1);

        let song = &parsed.songs[0];
        assert_eq!(song.title, "Track");
        assert_eq!(song.device, Device::Cpu);
        assert_eq!(song.segments.len(), 2);
        assert_eq!(song.segments[1].start_seconds, 0.5);
        assert_eq!(song.mood.as_deref(), Some(Mood::Energetic.as_str()));
    }

    #[test]
    fn test_device_serialized_lowercase() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("songs.json");
        write_json(&[sample_song()], &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"device\": \"cpu\""));
    }

    #[test]
    fn test_unwritable_location_is_output_error() {
        let err = write_json(&[], Path::new("/nonexistent/dir/songs.json")).unwrap_err();
        assert!(matches!(err, SongSorterError::OutputError { .. }));
    }
}
