//! Error types shared by the labeler, its results and the parameter estimator.

use std::path::PathBuf;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, LabelError>;

/// Everything that can go wrong while configuring or running the engine.
#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    /// A parameter set failed validation at construction time.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// `apply` was called before any parameters were set.
    #[error("labeler parameters are not set, call set_params before apply")]
    ParamsNotSet,

    /// The estimator could not collect enough valid patches within its retry budget.
    #[error(
        "failed to extract {requested} samples after {failed} rejected origins, inconsistent data provided"
    )]
    SamplingExhausted { requested: usize, failed: u64 },

    /// Array dimensions do not agree with each other or with model metadata.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A call argument is outside of its accepted range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A model artifact is missing or incompatible.
    #[error("model artifact {}: {reason}", path.display())]
    ModelArtifact { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}
