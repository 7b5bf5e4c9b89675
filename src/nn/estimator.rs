//! Rejection-sampling parameter estimator.

use std::path::Path;

use ndarray::{s, Array3, ArrayView2, ArrayView3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, instrument};

use super::metadata::EstimatorMetadata;
use super::predictor::{DenseNetwork, PatchPredictor};
use super::{metadata_path, model_path, NUM_OUTPUTS};
use crate::device::Device;
use crate::error::{LabelError, Result};
use crate::guided::PstParameters;

/// Construction options of a [`PstParametersEstimator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EstimatorOptions {
    pub device: Device,
    /// Seed of the patch sampler; `None` draws one from the OS per call.
    pub seed: Option<u64>,
}

/// Estimates [`PstParameters`] for an image from randomly sampled patches.
pub struct PstParametersEstimator {
    predictor: Box<dyn PatchPredictor>,
    metadata: EstimatorMetadata,
    device: Device,
    seed: Option<u64>,
}

impl PstParametersEstimator {
    /// Load the network and metadata of model `version` from `models_dir`.
    ///
    /// # Errors
    /// [`LabelError::ModelArtifact`] when a file is missing, unreadable or
    /// inconsistent with the other.
    pub fn load(models_dir: impl AsRef<Path>, version: u32, options: EstimatorOptions) -> Result<Self> {
        let dir = models_dir.as_ref();
        let model_file = model_path(dir, version);
        let metadata = EstimatorMetadata::load(&metadata_path(dir, version))?;
        let network = DenseNetwork::load(&model_file)?;

        Self::new(Box::new(network), metadata, options).map_err(|e| LabelError::ModelArtifact {
            path: model_file,
            reason: e.to_string(),
        })
    }

    /// Pair any predictor with its metadata.
    pub fn new(
        predictor: Box<dyn PatchPredictor>,
        metadata: EstimatorMetadata,
        options: EstimatorOptions,
    ) -> Result<Self> {
        metadata.validate()?;
        if let Some(len) = predictor.input_len() {
            if len != metadata.patch_len() {
                return Err(LabelError::ShapeMismatch(format!(
                    "predictor takes {len} inputs, metadata describes {} ({} x {:?})",
                    metadata.patch_len(),
                    metadata.channels(),
                    metadata.shape
                )));
            }
        }

        Ok(Self {
            predictor,
            metadata,
            device: options.device,
            seed: options.seed,
        })
    }

    pub fn metadata(&self) -> &EstimatorMetadata {
        &self.metadata
    }

    #[inline]
    pub fn device(&self) -> Device {
        self.device
    }

    /// Estimate parameters for an `(H, W, C)` image.
    ///
    /// Uses a sampler seeded from the options, so a fixed seed makes repeated
    /// calls on the same inputs return the same parameters.
    ///
    /// # Arguments
    /// * `image` - Image whose channel count matches the model
    /// * `mask` - Optional `(H, W)` mask; patches must lie fully on nonzero pixels
    /// * `n_samples` - Number of patches to aggregate
    pub fn apply(
        &self,
        image: ArrayView3<u8>,
        mask: Option<ArrayView2<u8>>,
        n_samples: usize,
    ) -> Result<PstParameters> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.apply_with_rng(image, mask, n_samples, &mut rng)
    }

    /// [`apply`](Self::apply) with a caller-provided random source.
    #[instrument(level = "debug", skip_all, fields(n_samples = n_samples, device = %self.device))]
    pub fn apply_with_rng<R: Rng>(
        &self,
        image: ArrayView3<u8>,
        mask: Option<ArrayView2<u8>>,
        n_samples: usize,
        rng: &mut R,
    ) -> Result<PstParameters> {
        let patches = self.sample_patches(image, mask, n_samples, rng)?;

        let raw: Vec<[f32; NUM_OUTPUTS]> = if self.device.is_parallel() {
            patches
                .par_iter()
                .map(|p| self.predictor.predict(p.view()))
                .collect::<Result<_>>()?
        } else {
            patches
                .iter()
                .map(|p| self.predictor.predict(p.view()))
                .collect::<Result<_>>()?
        };

        let denormalized: Vec<[f32; NUM_OUTPUTS]> =
            raw.iter().map(|r| self.metadata.denormalize(r)).collect();
        let estimate: [f32; NUM_OUTPUTS] = std::array::from_fn(|k| {
            let mut column: Vec<f32> = denormalized.iter().map(|row| row[k]).collect();
            median(&mut column)
        });
        debug!(?estimate, "aggregated estimate");

        let [phase_strength, warp_strength, sigma_lpf, thresh_min, thresh_max] = estimate;
        PstParameters::new(
            phase_strength,
            warp_strength,
            sigma_lpf,
            Some(thresh_min),
            Some(thresh_max),
            true,
        )
    }

    /// Draw random origins until `n_samples` valid patches are collected.
    ///
    /// Gives up once `n_samples³` origins have been rejected.
    fn sample_patches<R: Rng>(
        &self,
        image: ArrayView3<u8>,
        mask: Option<ArrayView2<u8>>,
        n_samples: usize,
        rng: &mut R,
    ) -> Result<Vec<Array3<f32>>> {
        if n_samples == 0 {
            return Err(LabelError::InvalidArgument(
                "n_samples must be at least 1".to_string(),
            ));
        }
        let (height, width, channels) = image.dim();
        if channels != self.metadata.channels() {
            return Err(LabelError::ShapeMismatch(format!(
                "image has {channels} channels, model expects {}",
                self.metadata.channels()
            )));
        }
        if let Some(m) = &mask {
            if m.dim() != (height, width) {
                return Err(LabelError::ShapeMismatch(format!(
                    "mask is {:?}, image is {:?}",
                    m.dim(),
                    (height, width)
                )));
            }
        }
        if height == 0 || width == 0 {
            return Err(LabelError::SamplingExhausted {
                requested: n_samples,
                failed: 0,
            });
        }

        let (ph, pw) = self.metadata.patch_shape();
        let max_failed = (n_samples as u64).saturating_pow(3);
        let mut failed = 0u64;
        let mut patches = Vec::with_capacity(n_samples);

        while patches.len() < n_samples {
            if failed >= max_failed {
                return Err(LabelError::SamplingExhausted {
                    requested: n_samples,
                    failed,
                });
            }

            let i = rng.gen_range(0..height);
            let j = rng.gen_range(0..width);
            let fits = i + ph <= height && j + pw <= width;
            let on_mask = fits
                && mask.map_or(true, |m| {
                    m.slice(s![i..i + ph, j..j + pw]).iter().all(|&v| v != 0)
                });
            if !on_mask {
                failed += 1;
                continue;
            }

            patches.push(self.normalize_patch(image.slice(s![i..i + ph, j..j + pw, ..])));
        }

        debug!(collected = patches.len(), failed, "sampled patches");
        Ok(patches)
    }

    /// `(ph, pw, C)` bytes to a normalized `(C, ph, pw)` float patch.
    fn normalize_patch(&self, patch: ArrayView3<u8>) -> Array3<f32> {
        let (ph, pw, channels) = patch.dim();
        let mean = &self.metadata.image_mean;
        let std = &self.metadata.image_std;
        Array3::from_shape_fn((channels, ph, pw), |(c, y, x)| {
            (patch[[y, x, c]] as f32 / 255.0 - mean[c]) / std[c]
        })
    }
}

/// Median of `values`; the mean of the two middle values for even counts.
fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return f32::NAN;
    }
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        0.5 * (values[mid - 1] + values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::DenseLayer;
    use ndarray::Array2;

    /// Returns the mean of the patch in every output slot.
    struct MeanPredictor;

    impl PatchPredictor for MeanPredictor {
        fn predict(&self, patch: ArrayView3<f32>) -> Result<[f32; NUM_OUTPUTS]> {
            let m = patch.mean().unwrap_or(0.0);
            Ok([m; NUM_OUTPUTS])
        }
    }

    fn metadata(channels: usize) -> EstimatorMetadata {
        EstimatorMetadata {
            shape: [4, 4],
            shift: [20.0, 400.0, 0.1, -1.0, 0.5],
            gain: [1.0, 1.0, 0.0, 0.0, 0.0],
            image_mean: vec![0.0; channels],
            image_std: vec![1.0; channels],
        }
    }

    fn estimator(seed: Option<u64>) -> PstParametersEstimator {
        PstParametersEstimator::new(
            Box::new(MeanPredictor),
            metadata(1),
            EstimatorOptions {
                device: Device::Cpu,
                seed,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_constant_image_estimate() {
        let image = Array3::<u8>::from_elem((16, 16, 1), 255);
        let params = estimator(Some(1)).apply(image.view(), None, 9).unwrap();

        assert!((params.phase_strength() - 21.0).abs() < 1e-5);
        assert!((params.warp_strength() - 401.0).abs() < 1e-5);
        assert_eq!(params.thresh_min(), Some(-1.0));
        assert!(params.morph_flag());
    }

    #[test]
    fn test_mask_restricts_patches() {
        // left half dark, right half bright; only the right half is allowed
        let image = Array3::from_shape_fn((12, 12, 1), |(_, x, _)| if x < 6 { 0u8 } else { 255u8 });
        let mask = Array2::from_shape_fn((12, 12), |(_, x)| if x >= 6 { 255u8 } else { 0u8 });

        let params = estimator(Some(3))
            .apply(image.view(), Some(mask.view()), 5)
            .unwrap();

        assert!((params.phase_strength() - 21.0).abs() < 1e-5);
    }

    #[test]
    fn test_image_smaller_than_patch_exhausts() {
        let image = Array3::<u8>::zeros((3, 3, 1));
        let err = estimator(Some(0)).apply(image.view(), None, 4).unwrap_err();
        match err {
            LabelError::SamplingExhausted { requested, failed } => {
                assert_eq!(requested, 4);
                assert_eq!(failed, 64);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_zero_samples_rejected() {
        let image = Array3::<u8>::zeros((8, 8, 1));
        assert!(matches!(
            estimator(None).apply(image.view(), None, 0),
            Err(LabelError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_channel_mismatch_rejected() {
        let image = Array3::<u8>::zeros((8, 8, 3));
        assert!(matches!(
            estimator(None).apply(image.view(), None, 2),
            Err(LabelError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_predictor_input_len_checked() {
        let net = DenseNetwork::new(vec![DenseLayer {
            inputs: 10,
            outputs: 5,
            weights: vec![0.0; 50],
            bias: vec![0.0; 5],
            activation: Default::default(),
        }])
        .unwrap();
        let result = PstParametersEstimator::new(Box::new(net), metadata(1), EstimatorOptions::default());
        assert!(matches!(result, Err(LabelError::ShapeMismatch(_))));
    }
}
