//! Compute backend selection
//!
//! Backends are probed in priority order and the first available one wins.
//! CPU is always available, so selection never fails.

use super::model::WeightFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Compute target for model inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Apple platform accelerator (CoreML execution provider)
    CoreMl,
    /// NVIDIA GPU (CUDA execution provider)
    Cuda,
    /// Portable CPU fallback
    Cpu,
}

/// Probe order, most preferred first
pub const DEVICE_PRIORITY: [Device; 3] = [Device::CoreMl, Device::Cuda, Device::Cpu];

impl Device {
    pub fn as_str(self) -> &'static str {
        match self {
            Device::CoreMl => "coreml",
            Device::Cuda => "cuda",
            Device::Cpu => "cpu",
        }
    }

    pub fn is_accelerated(self) -> bool {
        !matches!(self, Device::Cpu)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability probe: is this backend usable in the current process?
pub type DeviceProbe = Box<dyn Fn(Device) -> bool + Send + Sync>;

/// Picks the first available backend from [`DEVICE_PRIORITY`]
pub struct DeviceSelector {
    probe: DeviceProbe,
}

impl fmt::Debug for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSelector").finish_non_exhaustive()
    }
}

impl Default for DeviceSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceSelector {
    /// Selector backed by the runtime's execution provider checks
    pub fn new() -> Self {
        Self {
            probe: Box::new(is_available),
        }
    }

    /// Selector that only ever picks the CPU
    pub fn cpu_only() -> Self {
        Self::with_probe(|device| device == Device::Cpu)
    }

    /// Selector with a custom probe
    pub fn with_probe<F>(probe: F) -> Self
    where
        F: Fn(Device) -> bool + Send + Sync + 'static,
    {
        Self {
            probe: Box::new(probe),
        }
    }

    pub fn select(&self) -> Device {
        let device = DEVICE_PRIORITY
            .iter()
            .copied()
            .find(|&d| d == Device::Cpu || (self.probe)(d))
            .unwrap_or(Device::Cpu);
        debug!("Selected compute device: {}", device);
        device
    }

    /// First available device that can run weights of `format`
    ///
    /// Native safetensors weights only run on the CPU; ONNX graphs get the
    /// probed device.
    pub fn select_for(&self, format: WeightFormat) -> Device {
        match format {
            WeightFormat::SafeTensors => Device::Cpu,
            WeightFormat::Onnx => self.select(),
        }
    }
}

/// Default capability check
///
/// Accelerated backends are only reachable through the ONNX Runtime
/// execution providers compiled into this build.
pub fn is_available(device: Device) -> bool {
    match device {
        Device::Cpu => true,
        Device::CoreMl => coreml_available(),
        Device::Cuda => cuda_available(),
    }
}

#[cfg(all(feature = "onnx", target_os = "macos"))]
fn coreml_available() -> bool {
    use ort::execution_providers::{CoreMLExecutionProvider, ExecutionProvider};
    CoreMLExecutionProvider::default()
        .is_available()
        .unwrap_or(false)
}

#[cfg(not(all(feature = "onnx", target_os = "macos")))]
fn coreml_available() -> bool {
    false
}

#[cfg(feature = "onnx")]
fn cuda_available() -> bool {
    use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};
    CUDAExecutionProvider::default().is_available().unwrap_or(false)
}

#[cfg(not(feature = "onnx"))]
fn cuda_available() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        assert_eq!(DEVICE_PRIORITY, [Device::CoreMl, Device::Cuda, Device::Cpu]);
    }

    #[test]
    fn test_first_available_wins() {
        let selector = DeviceSelector::with_probe(|_| true);
        assert_eq!(selector.select(), Device::CoreMl);

        let selector = DeviceSelector::with_probe(|d| d == Device::Cuda);
        assert_eq!(selector.select(), Device::Cuda);
    }

    #[test]
    fn test_cpu_always_available() {
        let selector = DeviceSelector::with_probe(|_| false);
        assert_eq!(selector.select(), Device::Cpu);
        assert_eq!(DeviceSelector::cpu_only().select(), Device::Cpu);
        assert!(is_available(Device::Cpu));
    }

    #[test]
    fn test_native_weights_pin_cpu_even_with_accelerators() {
        let selector = DeviceSelector::with_probe(|_| true);
        assert_eq!(selector.select_for(WeightFormat::SafeTensors), Device::Cpu);
        assert_eq!(selector.select_for(WeightFormat::Onnx), Device::CoreMl);
    }

    #[test]
    fn test_device_display_and_serde() {
        assert_eq!(Device::CoreMl.to_string(), "coreml");
        let json = serde_json::to_string(&Device::Cuda).unwrap();
        assert_eq!(json, "\"cuda\"");
        let back: Device = serde_json::from_str("\"cpu\"").unwrap();
        assert_eq!(back, Device::Cpu);
    }
}
