//! Emotion model inference
//!
//! - `device`: ordered backend probe (CoreML, CUDA, CPU)
//! - `model`: weights location (`SONGSORTER_MODEL_PATH`, cache, data, ./models)
//! - `lstm` / `weights`: native LSTM over a safetensors state dict
//! - `onnx`: ONNX Runtime backend (`onnx` feature)
//! - `runner`: shared, validated entry point used by songs and the pipeline

pub mod device;
pub mod lstm;
pub mod model;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod runner;
pub mod traits;
pub mod weights;

pub use device::{Device, DeviceSelector, DEVICE_PRIORITY};
pub use lstm::{LstmEmotionModel, LstmLayer, ModelHyperparameters};
pub use model::{default_model_format, find_model_path, WeightFormat, MODEL_PATH_ENV};
#[cfg(feature = "onnx")]
pub use onnx::OrtEmotionModel;
pub use runner::ModelRunner;
pub use traits::EmotionModel;
