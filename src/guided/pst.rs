//! Phase Stretch Transform labeler.
//!
//! Holds the current [`PstParameters`] and a kernel cached for the last image
//! shape. The kernel is rebuilt on first use, when the image shape changes,
//! and when new parameters change the phase or warp strength.

use ndarray::{Array2, ArrayView2};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use super::params::PstParameters;
use super::result::PstResult;
use super::FeatureLabeler;
use crate::device::Device;
use crate::error::{LabelError, Result};
use crate::spectral::{feature_map, PstKernel};

/// Construction options of a [`PstLabeler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LabelerOptions {
    pub device: Device,
}

/// Edge/feature labeler based on the Phase Stretch Transform.
pub struct PstLabeler {
    params: Option<PstParameters>,
    height: usize,
    width: usize,
    kernel: Option<PstKernel>,
    device: Device,
    kernel_builds: u64,
}

impl Default for PstLabeler {
    fn default() -> Self {
        Self::new()
    }
}

fn build_kernel(
    device: Device,
    builds: &mut u64,
    height: usize,
    width: usize,
    phase_strength: f32,
    warp_strength: f32,
) -> PstKernel {
    *builds += 1;
    debug!(height, width, phase_strength, warp_strength, %device, "building PST kernel");
    PstKernel::new(height, width, phase_strength, warp_strength, device)
}

impl PstLabeler {
    /// Labeler on the detected device, without parameters.
    pub fn new() -> Self {
        Self::with_options(LabelerOptions::default())
    }

    pub fn with_device(device: Device) -> Self {
        Self::with_options(LabelerOptions { device })
    }

    pub fn with_options(options: LabelerOptions) -> Self {
        Self {
            params: None,
            height: 0,
            width: 0,
            kernel: None,
            device: options.device,
            kernel_builds: 0,
        }
    }

    #[inline]
    pub fn device(&self) -> Device {
        self.device
    }

    pub fn params(&self) -> Option<&PstParameters> {
        self.params.as_ref()
    }

    /// How many times a kernel has been built by this labeler.
    pub fn kernel_builds(&self) -> u64 {
        self.kernel_builds
    }

    /// Store new parameters.
    ///
    /// When a kernel has already been sized by a previous `apply`, it is
    /// rebuilt right away if the phase or warp strength changed.
    pub fn set_params(&mut self, params: PstParameters) {
        let (s, w) = (params.phase_strength(), params.warp_strength());
        self.params = Some(params);

        if self.height == 0 || self.width == 0 {
            return;
        }
        if let Some(kernel) = &self.kernel {
            if kernel.fits(self.height, self.width, s, w) {
                return;
            }
        }
        self.kernel = Some(build_kernel(
            self.device,
            &mut self.kernel_builds,
            self.height,
            self.width,
            s,
            w,
        ));
    }

    /// Validate a string-keyed mapping and store it as the new parameters.
    pub fn set_params_from_mapping(&mut self, map: Map<String, Value>) -> Result<()> {
        self.set_params(PstParameters::from_mapping(map)?);
        Ok(())
    }

    fn kernel_for(&mut self, height: usize, width: usize, params: &PstParameters) -> &PstKernel {
        let (s, w) = (params.phase_strength(), params.warp_strength());
        if !matches!(&self.kernel, Some(k) if k.fits(height, width, s, w)) {
            self.kernel = None;
        }
        self.height = height;
        self.width = width;

        let device = self.device;
        let builds = &mut self.kernel_builds;
        self.kernel
            .get_or_insert_with(|| build_kernel(device, builds, height, width, s, w))
    }

    /// Run the transform and return the unscaled field.
    ///
    /// With `morph_flag` set this is the binary feature map (0.0 / 1.0),
    /// otherwise the output phase in radians.
    ///
    /// # Errors
    /// * [`LabelError::ParamsNotSet`] before the first `set_params`
    /// * [`LabelError::ShapeMismatch`] for an empty image
    #[instrument(level = "debug", skip(self, image), fields(height = image.nrows(), width = image.ncols()))]
    pub fn apply_raw(&mut self, image: ArrayView2<u8>) -> Result<Array2<f32>> {
        let params = self.params.ok_or(LabelError::ParamsNotSet)?;
        let (height, width) = image.dim();
        if height == 0 || width == 0 {
            return Err(LabelError::ShapeMismatch(format!(
                "cannot label an empty {height}x{width} image"
            )));
        }

        let kernel = self.kernel_for(height, width, &params);
        let phase = kernel.phase_field(image, params.sigma_lpf());

        Ok(match params.morph_thresholds() {
            Some((lo, hi)) => feature_map(image, phase.view(), lo, hi),
            None => phase,
        })
    }

    /// Run the transform and wrap the byte-scaled mask in a [`PstResult`].
    ///
    /// Binary maps become 0/255; a raw phase field is min-max rescaled to
    /// 0..=255 (a constant field maps to all zeros).
    pub fn apply(&mut self, image: ArrayView2<u8>) -> Result<PstResult> {
        let raw = self.apply_raw(image)?;
        let binary = self.params.map_or(false, |p| p.morph_flag());

        let mask = if binary {
            raw.mapv(|v| if v > 0.0 { 255 } else { 0 })
        } else {
            rescale_to_u8(raw.view())
        };
        Ok(PstResult::new(mask))
    }
}

impl FeatureLabeler for PstLabeler {
    type Params = PstParameters;
    type Output = PstResult;

    fn set_params(&mut self, params: PstParameters) {
        PstLabeler::set_params(self, params);
    }

    fn apply(&mut self, image: ArrayView2<u8>) -> Result<PstResult> {
        PstLabeler::apply(self, image)
    }
}

/// Linear min-max mapping of a field to 0..=255.
fn rescale_to_u8(field: ArrayView2<f32>) -> Array2<u8> {
    let (lo, hi) = field
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    if !(hi > lo) {
        return Array2::zeros(field.dim());
    }
    let scale = 255.0 / (hi - lo);
    field.mapv(|v| {
        if v.is_finite() {
            ((v - lo) * scale).round().clamp(0.0, 255.0) as u8
        } else {
            0
        }
    })
}
