//! Batch assembly
//!
//! Stacks per-segment `(frames, n_mels)` matrices into one
//! `(segments, frames, n_mels)` tensor, segment index on axis 0.

use super::{FeatureBatch, FeatureMatrix, FRAMES_PER_SEGMENT, N_MELS};
use crate::error::{Result, SongSorterError};
use ndarray::{stack, ArrayView2, Axis};

#[derive(Debug, Clone, Copy)]
pub struct BatchAssembler {
    frames: usize,
    n_mels: usize,
}

impl Default for BatchAssembler {
    fn default() -> Self {
        Self {
            frames: FRAMES_PER_SEGMENT,
            n_mels: N_MELS,
        }
    }
}

impl BatchAssembler {
    pub fn new(frames: usize, n_mels: usize) -> Self {
        Self { frames, n_mels }
    }

    pub fn assemble(&self, features: &[FeatureMatrix]) -> Result<FeatureBatch> {
        if features.is_empty() {
            return Err(SongSorterError::EmptyBatch);
        }

        let expected = (self.frames, self.n_mels);
        if let Some((i, bad)) = features
            .iter()
            .enumerate()
            .find(|(_, m)| m.dim() != expected)
        {
            return Err(SongSorterError::ShapeMismatch {
                expected: format!("{:?}", expected),
                actual: format!("{:?} at segment {}", bad.dim(), i),
            });
        }

        let views: Vec<ArrayView2<f32>> = features.iter().map(|m| m.view()).collect();
        Ok(stack(Axis(0), &views)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_assemble_keeps_order() {
        let features: Vec<FeatureMatrix> = (0..3)
            .map(|i| Array2::from_elem((FRAMES_PER_SEGMENT, N_MELS), i as f32))
            .collect();
        let batch = BatchAssembler::default().assemble(&features).unwrap();

        assert_eq!(batch.dim(), (3, 44, 128));
        for (i, matrix) in features.iter().enumerate() {
            assert_eq!(batch.index_axis(Axis(0), i), matrix.view());
        }
    }

    #[test]
    fn test_empty_batch_rejected() {
        let err = BatchAssembler::default().assemble(&[]).unwrap_err();
        assert!(matches!(err, SongSorterError::EmptyBatch));
    }

    #[test]
    fn test_wrong_shape_rejected() {
        let features = vec![
            Array2::zeros((FRAMES_PER_SEGMENT, N_MELS)),
            Array2::zeros((FRAMES_PER_SEGMENT, 64)),
        ];
        let err = BatchAssembler::default().assemble(&features).unwrap_err();
        match err {
            SongSorterError::ShapeMismatch { actual, .. } => assert!(actual.contains("segment 1")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
