//! Core data types for songsorter
//!
//! These types represent the domain model and flow through the pipeline.

use crate::inference::Device;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// =============================================================================
// Emotion primitives
// =============================================================================

/// One arousal/valence estimate on Russell's circumplex model of affect
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EmotionPoint {
    /// Activation intensity
    pub arousal: f32,
    /// Positive/negative affect
    pub valence: f32,
}

impl EmotionPoint {
    pub fn new(arousal: f32, valence: f32) -> Self {
        Self { arousal, valence }
    }

    /// Angle on the circumplex in degrees, normalised to [0, 360)
    ///
    /// Valence is the horizontal axis, arousal the vertical one.
    pub fn angle_degrees(&self) -> f32 {
        self.arousal.atan2(self.valence).to_degrees().rem_euclid(360.0)
    }

    /// Euclidean distance between two points
    pub fn distance(&self, other: &EmotionPoint) -> f32 {
        let da = self.arousal - other.arousal;
        let dv = self.valence - other.valence;
        (da * da + dv * dv).sqrt()
    }

    /// Both coordinates are finite
    pub fn is_finite(&self) -> bool {
        self.arousal.is_finite() && self.valence.is_finite()
    }

    /// Interpretable label from the 12-point circumplex of core affect
    /// (Yik, Russell & Steiger, 2011)
    pub fn mood(&self) -> Mood {
        Mood::from_angle(self.angle_degrees())
    }

    /// Mean of a sequence of points, `None` when empty
    pub fn mean(points: &[EmotionPoint]) -> Option<EmotionPoint> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let (a, v) = points.iter().fold((0.0f64, 0.0f64), |(a, v), p| {
            (a + p.arousal as f64, v + p.valence as f64)
        });
        Some(EmotionPoint::new((a / n) as f32, (v / n) as f32))
    }
}

impl fmt::Display for EmotionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<A:{:.4}, V:{:.4}>", self.arousal, self.valence)
    }
}

/// The twelve labelled sectors of the circumplex, 30 degrees each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    Satisfied,
    Enthusiastic,
    Energetic,
    Activated,
    Frenzied,
    Distressed,
    Unhappy,
    Sad,
    Sluggish,
    Quiet,
    Placid,
    Serene,
}

impl Mood {
    /// Sector for an angle in degrees; sectors are half-open `(lo, hi]`
    /// and centred on multiples of 30 starting from Satisfied at 0
    pub fn from_angle(degrees: f32) -> Self {
        let theta = degrees.rem_euclid(360.0);
        match theta {
            t if t > 345.0 || t <= 15.0 => Mood::Satisfied,
            t if t <= 45.0 => Mood::Enthusiastic,
            t if t <= 75.0 => Mood::Energetic,
            t if t <= 105.0 => Mood::Activated,
            t if t <= 135.0 => Mood::Frenzied,
            t if t <= 165.0 => Mood::Distressed,
            t if t <= 195.0 => Mood::Unhappy,
            t if t <= 225.0 => Mood::Sad,
            t if t <= 255.0 => Mood::Sluggish,
            t if t <= 285.0 => Mood::Quiet,
            t if t <= 315.0 => Mood::Placid,
            _ => Mood::Serene,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Satisfied => "Satisfied",
            Mood::Enthusiastic => "Enthusiastic",
            Mood::Energetic => "Energetic",
            Mood::Activated => "Activated",
            Mood::Frenzied => "Frenzied",
            Mood::Distressed => "Distressed",
            Mood::Unhappy => "Unhappy",
            Mood::Sad => "Sad",
            Mood::Sluggish => "Sluggish",
            Mood::Quiet => "Quiet",
            Mood::Placid => "Placid",
            Mood::Serene => "Serene",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Analysis results
// =============================================================================

/// Prediction for one 0.5s segment, aligned to its position in the track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentEmotion {
    /// Segment index (0-based, chronological)
    pub index: usize,
    /// Start of the segment in seconds from the beginning of the track
    pub start_seconds: f64,
    /// Predicted emotion
    pub emotion: EmotionPoint,
}

/// Complete analysis result for a single song
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzedSong {
    /// Source file path (None for in-memory buffers)
    pub path: Option<PathBuf>,
    /// Title from tags, falling back to the file name
    pub title: String,
    /// Duration in seconds
    pub duration_seconds: f64,
    /// Backend the model ran on
    pub device: Device,
    /// Per-segment predictions in chronological order
    pub segments: Vec<SegmentEmotion>,
    /// Mean of all segment predictions
    pub average: Option<EmotionPoint>,
    /// Circumplex label of the average
    pub mood: Option<Mood>,
    /// Timestamp of analysis
    pub analyzed_at: chrono::DateTime<chrono::Utc>,
}

// =============================================================================
// Audio buffer types
// =============================================================================

/// Decoded mono samples ready for analysis
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Mono samples normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Duration in seconds
    pub duration: f64,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        // Guard against division by zero - use 0 duration for invalid sample rate
        let duration = if sample_rate > 0 {
            samples.len() as f64 / sample_rate as f64
        } else {
            0.0
        };
        Self {
            samples,
            sample_rate,
            duration,
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

// =============================================================================
// Supported formats
// =============================================================================

/// Audio formats accepted by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
    Flac,
    Aiff,
    Ogg,
    M4a,
}

impl AudioFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "wav" => Some(AudioFormat::Wav),
            "flac" => Some(AudioFormat::Flac),
            "aiff" | "aif" => Some(AudioFormat::Aiff),
            "ogg" | "oga" => Some(AudioFormat::Ogg),
            "m4a" | "mp4" => Some(AudioFormat::M4a),
            _ => None,
        }
    }

    /// Check if a path has a supported extension
    pub fn is_supported_path(path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mood_sectors() {
        assert_eq!(Mood::from_angle(0.0), Mood::Satisfied);
        assert_eq!(Mood::from_angle(350.0), Mood::Satisfied);
        assert_eq!(Mood::from_angle(15.0), Mood::Satisfied);
        assert_eq!(Mood::from_angle(16.0), Mood::Enthusiastic);
        assert_eq!(Mood::from_angle(90.0), Mood::Activated);
        assert_eq!(Mood::from_angle(180.0), Mood::Unhappy);
        assert_eq!(Mood::from_angle(270.0), Mood::Quiet);
        assert_eq!(Mood::from_angle(330.0), Mood::Serene);
        assert_eq!(Mood::from_angle(-30.0), Mood::Serene);
    }

    #[test]
    fn test_point_mood_uses_full_circle() {
        // Negative valence and arousal lands in the lower-left quadrant
        let p = EmotionPoint::new(-0.5, -0.6);
        assert!(p.angle_degrees() > 195.0 && p.angle_degrees() < 225.0);
        assert_eq!(p.mood(), Mood::Sad);

        let p = EmotionPoint::new(0.8, 0.0);
        assert_eq!(p.mood(), Mood::Activated);
    }

    #[test]
    fn test_mean_and_distance() {
        let points = [EmotionPoint::new(0.0, 1.0), EmotionPoint::new(1.0, 0.0)];
        let mean = EmotionPoint::mean(&points).unwrap();
        assert!((mean.arousal - 0.5).abs() < 1e-6);
        assert!((mean.valence - 0.5).abs() < 1e-6);
        assert!(EmotionPoint::mean(&[]).is_none());

        let d = EmotionPoint::new(0.0, 0.0).distance(&EmotionPoint::new(3.0, 4.0));
        assert!((d - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_audio_buffer_duration() {
        let buffer = AudioBuffer::new(vec![0.0; 44100], 44100);
        assert!((buffer.duration - 1.0).abs() < 1e-9);
        assert_eq!(buffer.len(), 44100);
        assert!(AudioBuffer::new(vec![], 0).is_empty());
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(AudioFormat::from_extension("MP3"), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::from_extension("aif"), Some(AudioFormat::Aiff));
        assert_eq!(AudioFormat::from_extension("txt"), None);
        assert!(AudioFormat::is_supported_path(std::path::Path::new("a/b.flac")));
    }
}
