//! ONNX Runtime emotion model
//!
//! Runs an exported `(N, 44, 128) -> (N, 2)` graph. Execution providers are
//! configured from the selected [`Device`], with CPU always registered last
//! as the fallback inside the session.

use super::traits::EmotionModel;
use super::Device;
use crate::error::{Result, SongSorterError};
use crate::features::FeatureBatch;
use crate::types::EmotionPoint;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// ONNX Runtime backed emotion model
pub struct OrtEmotionModel {
    /// ORT session (wrapped in Mutex for interior mutability)
    session: Mutex<Session>,
    device: Device,
}

impl std::fmt::Debug for OrtEmotionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtEmotionModel")
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl OrtEmotionModel {
    pub fn load(path: &Path, device: Device) -> Result<Self> {
        let session = Self::create_session(path, device)?;
        info!(
            "ONNX emotion model initialized with {} provider, model: {}",
            device,
            path.display()
        );
        Ok(Self {
            session: Mutex::new(session),
            device,
        })
    }

    /// Create ORT session with the execution provider for `device`
    fn create_session(path: &Path, device: Device) -> Result<Session> {
        use ort::execution_providers::CPUExecutionProvider;

        let builder = Session::builder()
            .map_err(|e| SongSorterError::model_load_error(path, format!("session builder: {}", e)))?;

        let builder = match device {
            #[cfg(target_os = "macos")]
            Device::CoreMl => {
                use ort::execution_providers::CoreMLExecutionProvider;
                builder.with_execution_providers([
                    CoreMLExecutionProvider::default().build(),
                    CPUExecutionProvider::default().build(),
                ])
            }
            Device::Cuda => {
                use ort::execution_providers::CUDAExecutionProvider;
                builder.with_execution_providers([
                    CUDAExecutionProvider::default().build(),
                    CPUExecutionProvider::default().build(),
                ])
            }
            _ => builder.with_execution_providers([CPUExecutionProvider::default().build()]),
        }
        .map_err(|e| {
            SongSorterError::model_load_error(path, format!("failed to configure {}: {}", device, e))
        })?;

        builder
            .commit_from_file(path)
            .map_err(|e| SongSorterError::model_load_error(path, e))
    }
}

impl EmotionModel for OrtEmotionModel {
    fn predict(&self, batch: &FeatureBatch) -> Result<Vec<EmotionPoint>> {
        let n = batch.dim().0;
        if n == 0 {
            return Err(SongSorterError::EmptyBatch);
        }

        // Lock the session mutex for mutable access
        let mut session = self.session.lock().map_err(|_| SongSorterError::InferenceError {
            reason: "Failed to acquire session lock".to_string(),
        })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| SongSorterError::InferenceError {
                reason: "Model has no input tensors defined".to_string(),
            })?;

        // ort needs an owned array
        let input_tensor =
            Tensor::from_array(batch.clone()).map_err(|e| SongSorterError::InferenceError {
                reason: format!("Failed to create input tensor: {}", e),
            })?;

        let outputs = session
            .run(ort::inputs![input_name.as_str() => input_tensor])
            .map_err(|e| SongSorterError::InferenceError {
                reason: format!("Inference failed: {}", e),
            })?;

        let output = outputs
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or_else(|| SongSorterError::InferenceError {
                reason: "No output tensor from model".to_string(),
            })?;

        let (output_shape, output_data) =
            output
                .try_extract_tensor::<f32>()
                .map_err(|e| SongSorterError::InferenceError {
                    reason: format!("Failed to extract output tensor: {}", e),
                })?;

        let shape: Vec<i64> = output_shape.iter().copied().collect();
        debug!("ONNX output shape {:?}", shape);

        // Expect exactly (N, 2), row-major
        if shape.len() != 2 || shape[0] != n as i64 || shape[1] != 2 || output_data.len() != n * 2
        {
            return Err(SongSorterError::InferenceError {
                reason: format!("Expected output shape [{}, 2], got {:?}", n, shape),
            });
        }

        Ok(output_data
            .chunks_exact(2)
            .map(|pair| EmotionPoint::new(pair[0], pair[1]))
            .collect())
    }

    fn device(&self) -> Device {
        self.device
    }

    fn name(&self) -> &'static str {
        "onnx-runtime"
    }
}
