//! Mel filterbank
//!
//! Slaney-style mel scale (linear below 1 kHz, logarithmic above) with
//! Slaney area normalisation, so every triangular filter integrates to
//! roughly the same energy regardless of its bandwidth.

use ndarray::Array2;

/// Frequency where the Slaney scale switches from linear to log
const MIN_LOG_HZ: f64 = 1000.0;
/// Width of one mel in the linear region
const F_SP: f64 = 200.0 / 3.0;
/// Mel value at `MIN_LOG_HZ`
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

/// Step size of the log region: ln(6.4) / 27
fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Convert frequency (Hz) to the Slaney mel scale
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Convert a Slaney mel value back to Hz
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular mel filters over the positive FFT bins
#[derive(Debug, Clone)]
pub struct MelFilterbank {
    /// Filter weights `(n_mels, n_fft / 2 + 1)`
    filters: Array2<f32>,
}

impl MelFilterbank {
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize, fmin: f64, fmax: f64) -> Self {
        let n_freqs = n_fft / 2 + 1;
        let sr = sample_rate as f64;

        let fft_freqs: Vec<f64> = (0..n_freqs).map(|k| k as f64 * sr / n_fft as f64).collect();

        // n_mels + 2 band edges evenly spaced in mel
        let mel_min = hz_to_mel(fmin);
        let mel_max = hz_to_mel(fmax);
        let edges: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
            .collect();

        let mut filters = Array2::<f32>::zeros((n_mels, n_freqs));
        for m in 0..n_mels {
            let (left, center, right) = (edges[m], edges[m + 1], edges[m + 2]);
            let rising = center - left;
            let falling = right - center;
            let enorm = 2.0 / (right - left);

            for (k, &f) in fft_freqs.iter().enumerate() {
                let lower = (f - left) / rising;
                let upper = (right - f) / falling;
                let weight = lower.min(upper).max(0.0);
                filters[[m, k]] = (weight * enorm) as f32;
            }
        }

        Self { filters }
    }

    pub fn n_mels(&self) -> usize {
        self.filters.nrows()
    }

    pub fn n_freqs(&self) -> usize {
        self.filters.ncols()
    }

    pub fn filters(&self) -> &Array2<f32> {
        &self.filters
    }

    /// Project a `(freq_bins, frames)` power spectrogram to `(n_mels, frames)`
    pub fn apply(&self, power: &Array2<f32>) -> Array2<f32> {
        self.filters.dot(power)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{N_FFT, N_MELS};

    #[test]
    fn test_mel_scale_breakpoints() {
        assert!(hz_to_mel(0.0).abs() < 1e-12);
        assert!((hz_to_mel(1000.0) - 15.0).abs() < 1e-9);
        assert!((hz_to_mel(6400.0) - 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_mel_round_trip() {
        for hz in [0.0, 250.0, 999.0, 1000.0, 4410.0, 22050.0] {
            let back = mel_to_hz(hz_to_mel(hz));
            assert!((back - hz).abs() < 1e-6, "{hz} -> {back}");
        }
    }

    #[test]
    fn test_filterbank_shape_and_coverage() {
        let fb = MelFilterbank::new(44100, N_FFT, N_MELS, 0.0, 22050.0);
        assert_eq!(fb.filters().dim(), (128, 1025));

        // Every filter is non-negative and has some support
        for row in fb.filters().rows() {
            assert!(row.iter().all(|&w| w >= 0.0));
            assert!(row.iter().any(|&w| w > 0.0));
        }
    }

    #[test]
    fn test_filter_peaks_increase_with_band() {
        let fb = MelFilterbank::new(44100, N_FFT, N_MELS, 0.0, 22050.0);
        let argmax = |m: usize| {
            fb.filters()
                .row(m)
                .iter()
                .enumerate()
                .fold((0, f32::MIN), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc })
                .0
        };
        assert!(argmax(10) < argmax(60));
        assert!(argmax(60) < argmax(120));
    }
}
