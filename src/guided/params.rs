//! Parameters of the Phase Stretch Transform labeler.
//!
//! Background on the individual knobs: Asghari & Jalali, "Edge detection in
//! digital images using dispersive phase stretch transform", IJBI 2015.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{LabelError, Result};

/// Mapping keys, in field order.
pub const FIELD_NAMES: [&str; 6] = [
    "phase_strength",
    "warp_strength",
    "sigma_LPF",
    "thresh_min",
    "thresh_max",
    "morph_flag",
];

/// Validated, immutable PST configuration.
///
/// With `morph_flag` set (the default) both thresholds are required and the
/// labeler binarizes the phase field; without it the thresholds are inert.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawParameters", into = "RawParameters")]
pub struct PstParameters {
    phase_strength: f32,
    warp_strength: f32,
    sigma_lpf: f32,
    thresh_min: Option<f32>,
    thresh_max: Option<f32>,
    morph_flag: bool,
}

/// Wire shape of [`PstParameters`]; unknown keys are rejected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawParameters {
    phase_strength: f32,
    warp_strength: f32,
    #[serde(rename = "sigma_LPF")]
    sigma_lpf: f32,
    #[serde(default)]
    thresh_min: Option<f32>,
    #[serde(default)]
    thresh_max: Option<f32>,
    #[serde(default = "default_morph_flag")]
    morph_flag: bool,
}

fn default_morph_flag() -> bool {
    true
}

impl TryFrom<RawParameters> for PstParameters {
    type Error = LabelError;

    fn try_from(raw: RawParameters) -> Result<Self> {
        PstParameters::new(
            raw.phase_strength,
            raw.warp_strength,
            raw.sigma_lpf,
            raw.thresh_min,
            raw.thresh_max,
            raw.morph_flag,
        )
    }
}

impl From<PstParameters> for RawParameters {
    fn from(p: PstParameters) -> Self {
        RawParameters {
            phase_strength: p.phase_strength,
            warp_strength: p.warp_strength,
            sigma_lpf: p.sigma_lpf,
            thresh_min: p.thresh_min,
            thresh_max: p.thresh_max,
            morph_flag: p.morph_flag,
        }
    }
}

impl PstParameters {
    /// Build and validate a parameter set.
    ///
    /// # Arguments
    /// * `phase_strength` - Phase strength (S) of the PST kernel
    /// * `warp_strength` - Warp strength (W) of the PST kernel
    /// * `sigma_lpf` - Width of the Gaussian low-pass filter applied before the kernel
    /// * `thresh_min` / `thresh_max` - Bi-threshold on the output phase
    /// * `morph_flag` - Whether to binarize and thin the phase field
    ///
    /// # Errors
    /// [`LabelError::InvalidParameters`] when `morph_flag` is set and a threshold is missing.
    pub fn new(
        phase_strength: f32,
        warp_strength: f32,
        sigma_lpf: f32,
        thresh_min: Option<f32>,
        thresh_max: Option<f32>,
        morph_flag: bool,
    ) -> Result<Self> {
        if morph_flag && (thresh_min.is_none() || thresh_max.is_none()) {
            return Err(LabelError::InvalidParameters(
                "morph_flag = true requires thresh_min and thresh_max".to_string(),
            ));
        }
        if !morph_flag && (thresh_min.is_some() || thresh_max.is_some()) {
            tracing::warn!("thresh_min or thresh_max has no effect since morph_flag is not set");
        }

        Ok(Self {
            phase_strength,
            warp_strength,
            sigma_lpf,
            thresh_min,
            thresh_max,
            morph_flag,
        })
    }

    /// Parameters with the morphological stage enabled.
    pub fn with_thresholds(
        phase_strength: f32,
        warp_strength: f32,
        sigma_lpf: f32,
        thresh_min: f32,
        thresh_max: f32,
    ) -> Self {
        Self {
            phase_strength,
            warp_strength,
            sigma_lpf,
            thresh_min: Some(thresh_min),
            thresh_max: Some(thresh_max),
            morph_flag: true,
        }
    }

    /// Parse a string-keyed mapping (`phase_strength`, `warp_strength`,
    /// `sigma_LPF`, `thresh_min`, `thresh_max`, `morph_flag`).
    ///
    /// Unknown keys and missing required keys are rejected.
    pub fn from_mapping(map: Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(map))
            .map_err(|e| LabelError::InvalidParameters(e.to_string()))
    }

    /// Same as [`from_mapping`](Self::from_mapping) for any iterator of key/value pairs.
    pub fn from_pairs<I, K>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::from_mapping(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Key/value view of the parameters, absent thresholds as `null`.
    pub fn to_mapping(&self) -> Map<String, Value> {
        self.iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    /// Fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Value)> {
        let values = [
            Value::from(self.phase_strength),
            Value::from(self.warp_strength),
            Value::from(self.sigma_lpf),
            Value::from(self.thresh_min),
            Value::from(self.thresh_max),
            Value::from(self.morph_flag),
        ];
        FIELD_NAMES.into_iter().zip(values)
    }

    pub fn phase_strength(&self) -> f32 {
        self.phase_strength
    }

    pub fn warp_strength(&self) -> f32 {
        self.warp_strength
    }

    pub fn sigma_lpf(&self) -> f32 {
        self.sigma_lpf
    }

    pub fn thresh_min(&self) -> Option<f32> {
        self.thresh_min
    }

    pub fn thresh_max(&self) -> Option<f32> {
        self.thresh_max
    }

    pub fn morph_flag(&self) -> bool {
        self.morph_flag
    }

    /// Both thresholds when the morphological stage is active.
    pub fn morph_thresholds(&self) -> Option<(f32, f32)> {
        match (self.morph_flag, self.thresh_min, self.thresh_max) {
            (true, Some(lo), Some(hi)) => Some((lo, hi)),
            _ => None,
        }
    }
}

impl TryFrom<Map<String, Value>> for PstParameters {
    type Error = LabelError;

    fn try_from(map: Map<String, Value>) -> Result<Self> {
        Self::from_mapping(map)
    }
}

impl TryFrom<Value> for PstParameters {
    type Error = LabelError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Self::from_mapping(map),
            other => Err(LabelError::InvalidParameters(format!(
                "expected a mapping, got {other}"
            ))),
        }
    }
}
