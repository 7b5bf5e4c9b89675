//! Patch predictors.
//!
//! [`DenseNetwork`] is the bundled implementation: a stack of fully
//! connected layers stored as JSON and evaluated on the flattened patch.

use std::path::Path;

use ndarray::ArrayView3;
use serde::{Deserialize, Serialize};

use super::{read_artifact, NUM_OUTPUTS};
use crate::error::{LabelError, Result};

/// Maps one normalized `(C, ph, pw)` patch to raw parameter outputs.
pub trait PatchPredictor: Send + Sync {
    /// Flattened input length the predictor expects, if fixed.
    fn input_len(&self) -> Option<usize> {
        None
    }

    fn predict(&self, patch: ArrayView3<f32>) -> Result<[f32; NUM_OUTPUTS]>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Tanh,
    #[default]
    Identity,
}

impl Activation {
    #[inline]
    fn apply(self, v: f32) -> f32 {
        match self {
            Activation::Relu => v.max(0.0),
            Activation::Tanh => v.tanh(),
            Activation::Identity => v,
        }
    }
}

/// Fully connected layer, `weights` row-major `(outputs, inputs)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub inputs: usize,
    pub outputs: usize,
    pub weights: Vec<f32>,
    pub bias: Vec<f32>,
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    fn forward(&self, input: &[f32]) -> Vec<f32> {
        self.weights
            .chunks_exact(self.inputs)
            .zip(self.bias.iter())
            .map(|(row, &b)| {
                let sum: f32 = row.iter().zip(input).map(|(w, x)| w * x).sum();
                self.activation.apply(sum + b)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseNetwork {
    layers: Vec<DenseLayer>,
}

impl DenseNetwork {
    /// Build a network, checking that consecutive layers line up and the
    /// last one emits the five parameter outputs.
    pub fn new(layers: Vec<DenseLayer>) -> Result<Self> {
        let net = Self { layers };
        net.validate()?;
        Ok(net)
    }

    /// Load a network stored as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let net: Self = read_artifact(path)?;
        net.validate().map_err(|e| LabelError::ModelArtifact {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(net)
    }

    fn validate(&self) -> Result<()> {
        let Some(last) = self.layers.last() else {
            return Err(LabelError::InvalidArgument("network has no layers".to_string()));
        };
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.inputs == 0 || layer.weights.len() != layer.inputs * layer.outputs {
                return Err(LabelError::InvalidArgument(format!(
                    "layer {i}: {} weights for {}x{}",
                    layer.weights.len(),
                    layer.outputs,
                    layer.inputs
                )));
            }
            if layer.bias.len() != layer.outputs {
                return Err(LabelError::InvalidArgument(format!(
                    "layer {i}: {} biases for {} outputs",
                    layer.bias.len(),
                    layer.outputs
                )));
            }
        }
        for (i, pair) in self.layers.windows(2).enumerate() {
            if pair[0].outputs != pair[1].inputs {
                return Err(LabelError::InvalidArgument(format!(
                    "layer {i} emits {} values, layer {} expects {}",
                    pair[0].outputs,
                    i + 1,
                    pair[1].inputs
                )));
            }
        }
        if last.outputs != NUM_OUTPUTS {
            return Err(LabelError::InvalidArgument(format!(
                "network emits {} values, expected {NUM_OUTPUTS}",
                last.outputs
            )));
        }
        Ok(())
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    /// Evaluate on a flat input of length `input_len()`.
    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        self.layers
            .iter()
            .fold(input.to_vec(), |x, layer| layer.forward(&x))
    }
}

impl PatchPredictor for DenseNetwork {
    fn input_len(&self) -> Option<usize> {
        self.layers.first().map(|l| l.inputs)
    }

    fn predict(&self, patch: ArrayView3<f32>) -> Result<[f32; NUM_OUTPUTS]> {
        let flat: Vec<f32> = patch.iter().copied().collect();
        if Some(flat.len()) != self.input_len() {
            return Err(LabelError::ShapeMismatch(format!(
                "patch has {} values, network expects {:?}",
                flat.len(),
                self.input_len()
            )));
        }

        let out = self.forward(&flat);
        <[f32; NUM_OUTPUTS]>::try_from(out.as_slice()).map_err(|_| {
            LabelError::ShapeMismatch(format!("network produced {} outputs", out.len()))
        })
    }
}
