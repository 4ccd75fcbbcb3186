//! Audio-to-feature pipeline
//!
//! Turns a validated waveform into a fixed-shape `(segments, 44, 128)` tensor:
//!
//! - `segment`: 0.5s non-overlapping segments, leading remainder dropped
//! - `stft` / `mel`: centered power STFT and Slaney mel filterbank
//! - `extractor`: per-segment `log1p` mel matrices, time-major
//! - `batch`: stacking into a single batch for the model
//!
//! # Parameters
//!
//! All parameters are fixed by the trained model:
//! - **44100 Hz** input, **22050**-sample segments
//! - **n_fft = 2048**, **hop = 512**, **128** mel bands from 0 Hz to Nyquist
//! - centered framing gives `1 + 22050 / 512 = 44` frames per segment

pub mod batch;
pub mod extractor;
pub mod mel;
pub mod segment;
pub mod stft;

pub use batch::BatchAssembler;
pub use extractor::{FeatureConfig, FeatureExtractor};
pub use mel::MelFilterbank;
pub use segment::{Segment, Segmenter};
pub use stft::Stft;

/// Samples per segment (0.5s at 44.1kHz)
pub const SEGMENT_SAMPLES: usize = 22050;

/// FFT window size
pub const N_FFT: usize = 2048;

/// Hop length between STFT frames
pub const HOP_LENGTH: usize = 512;

/// Number of mel bands
pub const N_MELS: usize = 128;

/// Time frames per segment with centered framing
pub const FRAMES_PER_SEGMENT: usize = 1 + SEGMENT_SAMPLES / HOP_LENGTH; // 44

/// One segment's features: `(FRAMES_PER_SEGMENT, N_MELS)`
pub type FeatureMatrix = ndarray::Array2<f32>;

/// Stacked segment features: `(segments, FRAMES_PER_SEGMENT, N_MELS)`
pub type FeatureBatch = ndarray::Array3<f32>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_constants() {
        assert_eq!(SEGMENT_SAMPLES, 22050);
        assert_eq!(FRAMES_PER_SEGMENT, 44);
        assert_eq!(N_MELS, 128);
    }
}
