//! Automatic estimation of PST parameters from image patches.
//!
//! A pretrained patch predictor maps a normalized `(C, ph, pw)` patch to five
//! normalized outputs; the estimator samples many patches, denormalizes each
//! prediction and aggregates them with an element-wise median.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::{LabelError, Result};

pub mod estimator;
pub mod metadata;
pub mod predictor;

pub use estimator::{EstimatorOptions, PstParametersEstimator};
pub use metadata::EstimatorMetadata;
pub use predictor::{Activation, DenseLayer, DenseNetwork, PatchPredictor};

/// Number of values a predictor emits per patch, in parameter field order.
pub const NUM_OUTPUTS: usize = 5;

/// `<dir>/pst_estimator_model_v{version}.json`
pub fn model_path(models_dir: &Path, version: u32) -> PathBuf {
    models_dir.join(format!("pst_estimator_model_v{version}.json"))
}

/// `<dir>/pst_estimator_metadata_v{version}.json`
pub fn metadata_path(models_dir: &Path, version: u32) -> PathBuf {
    models_dir.join(format!("pst_estimator_metadata_v{version}.json"))
}

/// Read a JSON artifact, reporting failures against its path.
pub(crate) fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| LabelError::ModelArtifact {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| LabelError::ModelArtifact {
        path: path.to_path_buf(),
        reason: format!("parsing: {e}"),
    })
}
