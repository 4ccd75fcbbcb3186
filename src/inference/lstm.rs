//! Native LSTM emotion regressor
//!
//! Stacked LSTM over the time axis of each segment's log-mel matrix, followed
//! by a linear head on the last hidden state of the top layer:
//!
//! ```text
//! (44, 128) -> LSTM(128 -> 20) -> LSTM(20 -> 20) -> h[43] -> Linear(20 -> 2)
//! ```
//!
//! Gate layout follows the PyTorch state dict: rows of `weight_ih` and
//! `weight_hh` are the input, forget, cell and output gates, in that order.
//!
//! ```text
//! c' = f * c + i * g
//! h' = o * tanh(c')
//! ```

use super::traits::EmotionModel;
use super::weights::WeightStore;
use super::Device;
use crate::error::{Result, SongSorterError};
use crate::features::{FeatureBatch, N_MELS};
use crate::types::EmotionPoint;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rayon::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Architecture of the trained model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelHyperparameters {
    pub input_size: usize,
    pub hidden_size: usize,
    pub num_layers: usize,
    pub output_size: usize,
}

impl Default for ModelHyperparameters {
    fn default() -> Self {
        Self {
            input_size: N_MELS,
            hidden_size: 20,
            num_layers: 2,
            output_size: 2,
        }
    }
}

/// One LSTM layer's parameters
#[derive(Debug, Clone)]
pub struct LstmLayer {
    /// `(4 * hidden, input)`
    w_ih: Array2<f32>,
    /// `(4 * hidden, hidden)`
    w_hh: Array2<f32>,
    /// `b_ih + b_hh`, `(4 * hidden)`
    bias: Array1<f32>,
    hidden_size: usize,
}

impl LstmLayer {
    pub fn new(
        w_ih: Array2<f32>,
        w_hh: Array2<f32>,
        b_ih: Array1<f32>,
        b_hh: Array1<f32>,
    ) -> Result<Self> {
        let hidden_size = w_hh.ncols();
        let gates = 4 * hidden_size;
        if w_ih.nrows() != gates
            || w_hh.nrows() != gates
            || b_ih.len() != gates
            || b_hh.len() != gates
        {
            return Err(SongSorterError::ShapeMismatch {
                expected: format!("{} gate rows for hidden size {}", gates, hidden_size),
                actual: format!(
                    "w_ih {:?}, w_hh {:?}, b_ih {}, b_hh {}",
                    w_ih.dim(),
                    w_hh.dim(),
                    b_ih.len(),
                    b_hh.len()
                ),
            });
        }

        Ok(Self {
            w_ih,
            w_hh,
            bias: b_ih + b_hh,
            hidden_size,
        })
    }

    pub fn input_size(&self) -> usize {
        self.w_ih.ncols()
    }

    /// Run the layer over a `(time, input)` sequence, returning `(time, hidden)`
    fn forward(&self, sequence: ArrayView2<f32>) -> Array2<f32> {
        let steps = sequence.nrows();
        let hs = self.hidden_size;

        // Input projection for all timesteps at once: (time, 4 * hidden)
        let projected = sequence.dot(&self.w_ih.t()) + &self.bias;

        let mut h = Array1::<f32>::zeros(hs);
        let mut c = Array1::<f32>::zeros(hs);
        let mut outputs = Array2::<f32>::zeros((steps, hs));

        for t in 0..steps {
            let gates = &projected.row(t) + &self.w_hh.dot(&h);

            for k in 0..hs {
                let i = sigmoid(gates[k]);
                let f = sigmoid(gates[hs + k]);
                let g = gates[2 * hs + k].tanh();
                let o = sigmoid(gates[3 * hs + k]);
                c[k] = f * c[k] + i * g;
                h[k] = o * c[k].tanh();
            }

            outputs.row_mut(t).assign(&h);
        }

        outputs
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Stacked LSTM + linear head running on the CPU
#[derive(Debug, Clone)]
pub struct LstmEmotionModel {
    hparams: ModelHyperparameters,
    layers: Vec<LstmLayer>,
    /// `(output, hidden)`
    fc_weight: Array2<f32>,
    fc_bias: Array1<f32>,
}

impl LstmEmotionModel {
    /// Assemble a model from already-loaded parameters
    pub fn from_parameters(
        hparams: ModelHyperparameters,
        layers: Vec<LstmLayer>,
        fc_weight: Array2<f32>,
        fc_bias: Array1<f32>,
    ) -> Result<Self> {
        if layers.len() != hparams.num_layers {
            return Err(SongSorterError::ShapeMismatch {
                expected: format!("{} LSTM layers", hparams.num_layers),
                actual: format!("{} layers", layers.len()),
            });
        }

        for (k, layer) in layers.iter().enumerate() {
            let input = if k == 0 { hparams.input_size } else { hparams.hidden_size };
            if layer.hidden_size != hparams.hidden_size || layer.input_size() != input {
                return Err(SongSorterError::ShapeMismatch {
                    expected: format!("layer {}: input {}, hidden {}", k, input, hparams.hidden_size),
                    actual: format!(
                        "input {}, hidden {}",
                        layer.input_size(),
                        layer.hidden_size
                    ),
                });
            }
        }

        if fc_weight.dim() != (hparams.output_size, hparams.hidden_size)
            || fc_bias.len() != hparams.output_size
        {
            return Err(SongSorterError::ShapeMismatch {
                expected: format!("fc ({}, {})", hparams.output_size, hparams.hidden_size),
                actual: format!("fc {:?}, bias {}", fc_weight.dim(), fc_bias.len()),
            });
        }

        Ok(Self {
            hparams,
            layers,
            fc_weight,
            fc_bias,
        })
    }

    /// Load a PyTorch state dict exported to safetensors
    ///
    /// Expected tensors: `lstm.weight_ih_l{k}`, `lstm.weight_hh_l{k}`,
    /// `lstm.bias_ih_l{k}`, `lstm.bias_hh_l{k}` for each layer, then
    /// `fc.weight` and `fc.bias`.
    pub fn load(path: &Path, hparams: ModelHyperparameters) -> Result<Self> {
        let store = WeightStore::open(path)?;
        debug!("Weight tensors: {:?}", store.names()?);

        let hs = hparams.hidden_size;
        let mut layers = Vec::with_capacity(hparams.num_layers);
        for k in 0..hparams.num_layers {
            let input = if k == 0 { hparams.input_size } else { hs };
            layers.push(LstmLayer::new(
                store.matrix(&format!("lstm.weight_ih_l{}", k), (4 * hs, input))?,
                store.matrix(&format!("lstm.weight_hh_l{}", k), (4 * hs, hs))?,
                store.vector(&format!("lstm.bias_ih_l{}", k), 4 * hs)?,
                store.vector(&format!("lstm.bias_hh_l{}", k), 4 * hs)?,
            )?);
        }

        let fc_weight = store.matrix("fc.weight", (hparams.output_size, hs))?;
        let fc_bias = store.vector("fc.bias", hparams.output_size)?;

        let model = Self::from_parameters(hparams, layers, fc_weight, fc_bias)
            .map_err(|e| SongSorterError::model_load_error(path, e))?;

        info!(
            "Loaded LSTM emotion model ({} layers, hidden {}) from {}",
            hparams.num_layers,
            hs,
            path.display()
        );
        Ok(model)
    }

    pub fn hyperparameters(&self) -> &ModelHyperparameters {
        &self.hparams
    }

    /// Forward pass for one `(time, input)` sequence
    fn forward_one(&self, sequence: ArrayView2<f32>) -> Array1<f32> {
        let mut current = sequence.to_owned();
        for layer in &self.layers {
            current = layer.forward(current.view());
        }

        let last = current.row(current.nrows() - 1);
        self.fc_weight.dot(&last) + &self.fc_bias
    }
}

impl EmotionModel for LstmEmotionModel {
    fn predict(&self, batch: &FeatureBatch) -> Result<Vec<EmotionPoint>> {
        let (n, steps, features) = batch.dim();
        if n == 0 {
            return Err(SongSorterError::EmptyBatch);
        }
        if steps == 0 || features != self.hparams.input_size {
            return Err(SongSorterError::ShapeMismatch {
                expected: format!("(N, T > 0, {})", self.hparams.input_size),
                actual: format!("{:?}", batch.dim()),
            });
        }
        if self.hparams.output_size < 2 {
            return Err(SongSorterError::InferenceError {
                reason: format!("model has {} outputs, need 2", self.hparams.output_size),
            });
        }

        // Sequences are independent; output column 0 is arousal, 1 is valence
        let points: Vec<EmotionPoint> = (0..n)
            .into_par_iter()
            .map(|i| {
                let out = self.forward_one(batch.index_axis(Axis(0), i));
                EmotionPoint::new(out[0], out[1])
            })
            .collect();

        Ok(points)
    }

    fn device(&self) -> Device {
        Device::Cpu
    }

    fn name(&self) -> &'static str {
        "lstm-native"
    }
}
