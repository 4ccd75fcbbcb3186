//! Model backend abstraction
//!
//! Every backend takes a `(segments, 44, 128)` feature batch and returns one
//! arousal/valence pair per segment. Hyperparameters are fixed at load time.

use super::Device;
use crate::error::Result;
use crate::features::FeatureBatch;
use crate::types::EmotionPoint;

/// Emotion regression backend
pub trait EmotionModel: Send + Sync {
    /// Predict one point per segment, in batch order
    fn predict(&self, batch: &FeatureBatch) -> Result<Vec<EmotionPoint>>;

    /// Device this model executes on
    fn device(&self) -> Device;

    /// Get the name of this backend (for logging)
    fn name(&self) -> &'static str;
}
