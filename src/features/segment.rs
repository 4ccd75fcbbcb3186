//! Fixed-length segmentation
//!
//! A waveform of `L` samples yields `L / n` segments of `n` samples. The
//! `L % n` samples that do not fill a segment are dropped from the *start*
//! of the track, so the last segment always ends on the final sample.

use super::SEGMENT_SAMPLES;
use crate::error::{Result, SongSorterError};

/// A borrowed, fixed-length slice of a waveform
#[derive(Debug, Clone, Copy)]
pub struct Segment<'a> {
    /// Segment index (0-based, chronological)
    pub index: usize,
    /// Offset of the first sample in the source waveform
    pub start_sample: usize,
    /// The segment's samples
    pub samples: &'a [f32],
}

impl Segment<'_> {
    /// Start time of the segment within the track
    pub fn start_seconds(&self, sample_rate: u32) -> f64 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.start_sample as f64 / sample_rate as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Splits waveforms into non-overlapping fixed-length segments
#[derive(Debug, Clone, Copy)]
pub struct Segmenter {
    segment_samples: usize,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self {
            segment_samples: SEGMENT_SAMPLES,
        }
    }
}

impl Segmenter {
    /// Create a segmenter with a custom segment length (must be non-zero)
    pub fn new(segment_samples: usize) -> Result<Self> {
        if segment_samples == 0 {
            return Err(SongSorterError::ConfigError(
                "segment length must be at least one sample".to_string(),
            ));
        }
        Ok(Self { segment_samples })
    }

    pub fn segment_samples(&self) -> usize {
        self.segment_samples
    }

    /// Number of full segments in `len` samples
    pub fn segment_count(&self, len: usize) -> usize {
        len / self.segment_samples
    }

    /// Number of leading samples that are dropped
    pub fn remainder(&self, len: usize) -> usize {
        len % self.segment_samples
    }

    /// Split `samples` into segments
    ///
    /// Fails with `AudioTooShort` when not even one segment fits.
    pub fn segment<'a>(&self, samples: &'a [f32]) -> Result<Vec<Segment<'a>>> {
        if samples.len() < self.segment_samples {
            return Err(SongSorterError::AudioTooShort {
                samples: samples.len(),
                required: self.segment_samples,
            });
        }

        let remainder = self.remainder(samples.len());
        let segments = samples[remainder..]
            .chunks_exact(self.segment_samples)
            .enumerate()
            .map(|(index, chunk)| Segment {
                index,
                start_sample: remainder + index * self.segment_samples,
                samples: chunk,
            })
            .collect();

        Ok(segments)
    }
}
