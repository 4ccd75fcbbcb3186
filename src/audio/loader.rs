//! Audio loading and precondition checks
//!
//! A waveform enters the pipeline either as a file path (decoded and
//! resampled to 44.1kHz) or as an already-decoded buffer, which must already
//! be at 44.1kHz. Both paths are held to the same length and finiteness rules.

use super::decoder::{self, TARGET_SAMPLE_RATE};
use crate::error::{Result, SongSorterError};
use crate::features::SEGMENT_SAMPLES;
use crate::types::AudioBuffer;
use std::path::PathBuf;
use tracing::debug;

/// Where a song's waveform comes from
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Audio file to decode
    Path(PathBuf),
    /// Mono samples decoded elsewhere
    Buffer { samples: Vec<f32>, sample_rate: u32 },
}

impl AudioSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        AudioSource::Path(path.into())
    }

    pub fn buffer(samples: Vec<f32>, sample_rate: u32) -> Self {
        AudioSource::Buffer {
            samples,
            sample_rate,
        }
    }
}

impl From<PathBuf> for AudioSource {
    fn from(path: PathBuf) -> Self {
        AudioSource::Path(path)
    }
}

impl From<&std::path::Path> for AudioSource {
    fn from(path: &std::path::Path) -> Self {
        AudioSource::Path(path.to_path_buf())
    }
}

impl From<AudioBuffer> for AudioSource {
    fn from(buffer: AudioBuffer) -> Self {
        AudioSource::Buffer {
            samples: buffer.samples,
            sample_rate: buffer.sample_rate,
        }
    }
}

/// Obtain a validated mono waveform at [`TARGET_SAMPLE_RATE`]
///
/// Buffers at any other rate are rejected rather than resampled.
pub fn load(source: AudioSource) -> Result<AudioBuffer> {
    let buffer = match source {
        AudioSource::Path(path) => decoder::decode(&path)?,
        AudioSource::Buffer {
            samples,
            sample_rate,
        } => {
            if sample_rate != TARGET_SAMPLE_RATE {
                return Err(SongSorterError::SamplingRate {
                    expected: TARGET_SAMPLE_RATE,
                    actual: sample_rate,
                });
            }
            AudioBuffer::new(samples, sample_rate)
        }
    };

    validate(&buffer)?;
    debug!(
        "Loaded {} samples ({:.2}s) at {}Hz",
        buffer.len(),
        buffer.duration,
        buffer.sample_rate
    );
    Ok(buffer)
}

/// Check the invariants every waveform must satisfy before segmentation
pub fn validate(buffer: &AudioBuffer) -> Result<()> {
    if buffer.sample_rate != TARGET_SAMPLE_RATE {
        return Err(SongSorterError::SamplingRate {
            expected: TARGET_SAMPLE_RATE,
            actual: buffer.sample_rate,
        });
    }

    if buffer.len() < SEGMENT_SAMPLES {
        return Err(SongSorterError::AudioTooShort {
            samples: buffer.len(),
            required: SEGMENT_SAMPLES,
        });
    }

    if let Some(idx) = buffer.samples.iter().position(|s| !s.is_finite()) {
        return Err(SongSorterError::InvalidAudio {
            reason: format!("non-finite sample at index {}", idx),
        });
    }

    Ok(())
}
