//! Normalization metadata shipped next to a predictor.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{read_artifact, NUM_OUTPUTS};
use crate::error::{LabelError, Result};

/// Patch shape plus input and output normalization of a trained predictor.
///
/// Inputs are normalized per channel as `(v / 255 - image_mean[c]) / image_std[c]`;
/// outputs are mapped back with `shift + raw * gain`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorMetadata {
    /// Patch `(height, width)`
    pub shape: [usize; 2],
    pub shift: [f32; NUM_OUTPUTS],
    pub gain: [f32; NUM_OUTPUTS],
    pub image_mean: Vec<f32>,
    pub image_std: Vec<f32>,
}

impl EstimatorMetadata {
    /// Load and validate a metadata file.
    pub fn load(path: &Path) -> Result<Self> {
        let meta: Self = read_artifact(path)?;
        meta.validate().map_err(|e| LabelError::ModelArtifact {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(meta)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.shape[0] == 0 || self.shape[1] == 0 {
            return Err(LabelError::InvalidArgument(format!(
                "patch shape {:?} is empty",
                self.shape
            )));
        }
        if self.image_mean.is_empty() || self.image_mean.len() != self.image_std.len() {
            return Err(LabelError::InvalidArgument(format!(
                "image_mean has {} channels, image_std has {}",
                self.image_mean.len(),
                self.image_std.len()
            )));
        }
        if self.image_std.iter().any(|&s| s == 0.0 || !s.is_finite()) {
            return Err(LabelError::InvalidArgument(
                "image_std must be finite and nonzero".to_string(),
            ));
        }
        Ok(())
    }

    /// Channels the predictor was trained on.
    #[inline]
    pub fn channels(&self) -> usize {
        self.image_mean.len()
    }

    #[inline]
    pub fn patch_shape(&self) -> (usize, usize) {
        (self.shape[0], self.shape[1])
    }

    /// Length of a flattened `(C, ph, pw)` patch.
    pub fn patch_len(&self) -> usize {
        self.channels() * self.shape[0] * self.shape[1]
    }

    /// Map raw predictor outputs back to parameter space.
    pub fn denormalize(&self, raw: &[f32; NUM_OUTPUTS]) -> [f32; NUM_OUTPUTS] {
        std::array::from_fn(|k| self.shift[k] + raw[k] * self.gain[k])
    }
}
