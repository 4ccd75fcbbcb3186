//! Shared model runner
//!
//! Resolves and loads the weights once, then serves any number of songs.
//! Cloning is cheap: clones share the same loaded model.

use super::lstm::{LstmEmotionModel, ModelHyperparameters};
use super::model::{find_model_path, WeightFormat};
use super::traits::EmotionModel;
use super::Device;
use crate::error::{Result, SongSorterError};
use crate::features::{FeatureBatch, FRAMES_PER_SEGMENT, N_MELS};
use crate::types::EmotionPoint;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Clone)]
pub struct ModelRunner {
    model: Arc<dyn EmotionModel>,
}

impl std::fmt::Debug for ModelRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRunner")
            .field("backend", &self.model.name())
            .field("device", &self.model.device())
            .finish()
    }
}

impl ModelRunner {
    /// Locate and load the trained model for `device`
    ///
    /// `model_path` overrides the search list. The backend follows the
    /// weights file: `.onnx` runs on ONNX Runtime, anything else is read as
    /// a safetensors state dict for the native CPU model.
    pub fn load(device: Device, model_path: Option<&Path>) -> Result<Self> {
        let path = find_model_path(model_path)?;
        info!("Loading emotion model from {}", path.display());

        let model: Arc<dyn EmotionModel> = match WeightFormat::from_path(&path) {
            WeightFormat::SafeTensors => {
                if device != Device::Cpu {
                    return Err(SongSorterError::DeviceMismatch {
                        song: device,
                        model: Device::Cpu,
                    });
                }
                Arc::new(LstmEmotionModel::load(&path, ModelHyperparameters::default())?)
            }
            WeightFormat::Onnx => Self::load_onnx(&path, device)?,
        };

        Ok(Self { model })
    }

    #[cfg(feature = "onnx")]
    fn load_onnx(path: &Path, device: Device) -> Result<Arc<dyn EmotionModel>> {
        Ok(Arc::new(super::onnx::OrtEmotionModel::load(path, device)?))
    }

    #[cfg(not(feature = "onnx"))]
    fn load_onnx(path: &Path, _device: Device) -> Result<Arc<dyn EmotionModel>> {
        Err(SongSorterError::model_load_error(
            path,
            "ONNX models require building songsorter with --features onnx",
        ))
    }

    /// Wrap an already-constructed model
    pub fn with_model(model: impl EmotionModel + 'static) -> Self {
        Self {
            model: Arc::new(model),
        }
    }

    pub fn device(&self) -> Device {
        self.model.device()
    }

    pub fn backend(&self) -> &'static str {
        self.model.name()
    }

    /// Predict one point per segment of a `(N, 44, 128)` batch
    pub fn run(&self, batch: &FeatureBatch) -> Result<Vec<EmotionPoint>> {
        let (n, frames, mels) = batch.dim();
        if n == 0 {
            return Err(SongSorterError::EmptyBatch);
        }
        if (frames, mels) != (FRAMES_PER_SEGMENT, N_MELS) {
            return Err(SongSorterError::ShapeMismatch {
                expected: format!("(N, {}, {})", FRAMES_PER_SEGMENT, N_MELS),
                actual: format!("{:?}", batch.dim()),
            });
        }

        let start = Instant::now();
        let points = self.model.predict(batch)?;

        if points.len() != n {
            return Err(SongSorterError::InferenceError {
                reason: format!("model returned {} predictions for {} segments", points.len(), n),
            });
        }
        if let Some(idx) = points.iter().position(|p| !p.is_finite()) {
            return Err(SongSorterError::InferenceError {
                reason: format!("non-finite prediction for segment {}", idx),
            });
        }

        debug!(
            "{} predicted {} segments in {:.1}ms",
            self.model.name(),
            n,
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(points)
    }
}
