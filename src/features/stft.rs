//! STFT (Short-Time Fourier Transform) for mel feature extraction
//!
//! # STFT Parameter Choices
//!
//! - **NFFT = 2048**: ~46ms windows at 44.1kHz with 1025 frequency bins
//!   (~21.5 Hz resolution).
//!
//! - **HOP_LENGTH = 512**: 75% overlap between consecutive frames.
//!
//! - **Centered frames**: the signal is zero padded by `n_fft / 2` on both
//!   sides so frame `t` is centred on sample `t * hop`. This gives
//!   `1 + len / hop` frames regardless of `n_fft`.
//!
//! - **Periodic Hann window**: smooth tapering reduces spectral leakage.

use ndarray::Array2;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Power STFT with a precomputed plan and window
///
/// The plan is immutable and shared, so one `Stft` can serve many threads.
#[derive(Clone)]
pub struct Stft {
    n_fft: usize,
    hop_length: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl std::fmt::Debug for Stft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stft")
            .field("n_fft", &self.n_fft)
            .field("hop_length", &self.hop_length)
            .finish()
    }
}

impl Stft {
    pub fn new(n_fft: usize, hop_length: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n_fft);

        Self {
            n_fft,
            hop_length,
            window: hann_window(n_fft),
            fft,
        }
    }

    /// Number of positive-frequency bins (DC through Nyquist)
    pub fn num_freq_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Number of centered frames for a signal of `len` samples
    pub fn num_frames(&self, len: usize) -> usize {
        1 + len / self.hop_length
    }

    /// Power spectrogram `|X|^2`, bin-major: `(freq_bins, frames)`
    pub fn power(&self, samples: &[f32]) -> Array2<f32> {
        // Odd sizes get the extra sample on the right so the last frame fits
        let pad_left = self.n_fft / 2;
        let pad_right = self.n_fft - pad_left;
        let mut padded = vec![0.0f32; pad_left + samples.len() + pad_right];
        padded[pad_left..pad_left + samples.len()].copy_from_slice(samples);

        let num_frames = self.num_frames(samples.len());
        let num_bins = self.num_freq_bins();
        let mut spectrogram = Array2::<f32>::zeros((num_bins, num_frames));

        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];

        for frame_idx in 0..num_frames {
            let start = frame_idx * self.hop_length;
            let frame = &padded[start..start + self.n_fft];

            for ((slot, &sample), &w) in buffer.iter_mut().zip(frame).zip(&self.window) {
                *slot = Complex::new(sample * w, 0.0);
            }

            self.fft.process_with_scratch(&mut buffer, &mut scratch);

            for (bin, value) in buffer[..num_bins].iter().enumerate() {
                spectrogram[[bin, frame_idx]] = value.norm_sqr();
            }
        }

        spectrogram
    }
}

/// Generate a periodic Hann window of given size
fn hann_window(size: usize) -> Vec<f32> {
    use std::f32::consts::PI;
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{HOP_LENGTH, N_FFT, SEGMENT_SAMPLES};

    #[test]
    fn test_hann_window() {
        let window = hann_window(4);
        assert_eq!(window.len(), 4);
        // Periodic Hann: 0 at the start, 1 at the centre
        assert!(window[0] < 0.01);
        assert!(window[2] > 0.99);
    }

    #[test]
    fn test_frame_count_for_segment() {
        let stft = Stft::new(N_FFT, HOP_LENGTH);
        assert_eq!(stft.num_frames(SEGMENT_SAMPLES), 44);
        assert_eq!(stft.num_freq_bins(), 1025);

        let power = stft.power(&vec![0.0; SEGMENT_SAMPLES]);
        assert_eq!(power.dim(), (1025, 44));
    }

    #[test]
    fn test_silence_has_zero_power() {
        let stft = Stft::new(N_FFT, HOP_LENGTH);
        let power = stft.power(&vec![0.0; 4096]);
        assert!(power.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        use std::f32::consts::PI;
        let sr = 44100.0;
        // Pick a frequency exactly on bin 100
        let freq = 100.0 * sr / N_FFT as f32;
        let samples: Vec<f32> = (0..SEGMENT_SAMPLES)
            .map(|i| (2.0 * PI * freq * i as f32 / sr).sin())
            .collect();

        let stft = Stft::new(N_FFT, HOP_LENGTH);
        let power = stft.power(&samples);

        // Middle frame is fully inside the signal
        let column = power.column(22);
        let peak = column
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc });
        assert_eq!(peak.0, 100);
    }

    #[test]
    fn test_odd_fft_size_frames_fit() {
        // len divisible by hop: last frame starts exactly at the final sample
        let stft = Stft::new(2047, 512);
        let power = stft.power(&vec![0.25; 2048]);
        assert_eq!(power.dim(), (1024, 5));
        assert!(power.iter().all(|v| v.is_finite()));
    }
}
