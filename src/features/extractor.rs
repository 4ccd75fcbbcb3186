//! Per-segment log-mel feature extraction
//!
//! For each 22050-sample segment:
//! 1. Centered power STFT (`n_fft = 2048`, `hop = 512`) -> `(1025, 44)`
//! 2. Slaney mel projection -> `(128, 44)`
//! 3. `ln(1 + x)` compression
//! 4. Transpose to time-major `(44, 128)`, the layout the LSTM consumes
//!
//! Segments are independent, so they are extracted in parallel with rayon
//! and collected back in segment order.

use super::mel::MelFilterbank;
use super::segment::Segment;
use super::stft::Stft;
use super::{FeatureMatrix, HOP_LENGTH, N_FFT, N_MELS, SEGMENT_SAMPLES};
use crate::audio::TARGET_SAMPLE_RATE;
use crate::error::{Result, SongSorterError};
use rayon::prelude::*;
use tracing::debug;

/// Feature extraction parameters
///
/// The defaults are the values the emotion model was trained with; other
/// values produce features the shipped model cannot interpret.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureConfig {
    pub sample_rate: u32,
    pub segment_samples: usize,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    pub fmin: f64,
    pub fmax: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate: TARGET_SAMPLE_RATE,
            segment_samples: SEGMENT_SAMPLES,
            n_fft: N_FFT,
            hop_length: HOP_LENGTH,
            n_mels: N_MELS,
            fmin: 0.0,
            fmax: TARGET_SAMPLE_RATE as f64 / 2.0,
        }
    }
}

impl FeatureConfig {
    /// Time frames produced for one segment
    pub fn frames_per_segment(&self) -> usize {
        1 + self.segment_samples / self.hop_length
    }

    fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 || self.segment_samples == 0 {
            return Err(SongSorterError::ConfigError(
                "sample rate and segment length must be non-zero".to_string(),
            ));
        }
        if self.n_fft < 2 || self.hop_length == 0 || self.n_mels == 0 {
            return Err(SongSorterError::ConfigError(format!(
                "invalid STFT parameters: n_fft={}, hop={}, n_mels={}",
                self.n_fft, self.hop_length, self.n_mels
            )));
        }
        if !(self.fmin >= 0.0 && self.fmax > self.fmin) {
            return Err(SongSorterError::ConfigError(format!(
                "invalid mel range: {} Hz to {} Hz",
                self.fmin, self.fmax
            )));
        }
        Ok(())
    }
}

/// Converts segments into `(frames, n_mels)` log-mel matrices
///
/// Holds the FFT plan and filterbank, so build it once and share it
/// (`&FeatureExtractor` is `Sync`) across songs and threads.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    config: FeatureConfig,
    stft: Stft,
    mel: MelFilterbank,
}

impl FeatureExtractor {
    /// Extractor with the model's training parameters
    pub fn new() -> Self {
        let config = FeatureConfig::default();
        Self {
            stft: Stft::new(config.n_fft, config.hop_length),
            mel: MelFilterbank::new(
                config.sample_rate,
                config.n_fft,
                config.n_mels,
                config.fmin,
                config.fmax,
            ),
            config,
        }
    }

    /// Extractor with custom parameters
    pub fn with_config(config: FeatureConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            stft: Stft::new(config.n_fft, config.hop_length),
            mel: MelFilterbank::new(
                config.sample_rate,
                config.n_fft,
                config.n_mels,
                config.fmin,
                config.fmax,
            ),
            config,
        })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Expected `(frames, n_mels)` shape of every matrix
    pub fn output_shape(&self) -> (usize, usize) {
        (self.config.frames_per_segment(), self.config.n_mels)
    }

    /// Log-mel matrix for one segment of exactly `segment_samples` samples
    pub fn extract(&self, samples: &[f32]) -> Result<FeatureMatrix> {
        if samples.len() != self.config.segment_samples {
            return Err(SongSorterError::ShapeMismatch {
                expected: format!("{} samples", self.config.segment_samples),
                actual: format!("{} samples", samples.len()),
            });
        }

        let power = self.stft.power(samples);
        let mut mel = self.mel.apply(&power);
        mel.mapv_inplace(f32::ln_1p);

        // (n_mels, frames) -> (frames, n_mels)
        let features = mel.reversed_axes().as_standard_layout().into_owned();

        let expected = self.output_shape();
        if features.dim() != expected {
            return Err(SongSorterError::ShapeMismatch {
                expected: format!("{:?}", expected),
                actual: format!("{:?}", features.dim()),
            });
        }

        Ok(features)
    }

    /// Extract every segment in parallel, preserving segment order
    pub fn extract_segments(&self, segments: &[Segment<'_>]) -> Result<Vec<FeatureMatrix>> {
        debug!("Extracting features for {} segments", segments.len());
        segments
            .par_iter()
            .map(|segment| self.extract(segment.samples))
            .collect()
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}
