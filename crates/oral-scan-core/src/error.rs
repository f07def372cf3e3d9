//! Error taxonomy for the inference pipeline.
//!
//! Each stage of the pipeline has its own error type so callers can tell a
//! fatal startup failure (`ModelLoadError`) apart from per-request failures
//! (`InvalidImageError`, `InferenceError`) and from a missing visualization
//! (`ExplainabilityError`) that leaves the class decision intact.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// The model artifact or label set could not be loaded.
///
/// Fatal: no prediction can be served without a model.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    /// The artifact file does not exist.
    #[error("model artifact not found: {}", path.display())]
    Missing {
        /// Expected artifact location.
        path: PathBuf,
    },
    /// The file exists but could not be read.
    #[error("failed to read {}", path.display())]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a valid safetensors artifact.
    #[error("corrupt model artifact {}: {reason}", path.display())]
    Corrupt {
        /// Artifact location.
        path: PathBuf,
        /// What failed to parse.
        reason: String,
    },
    /// The weights do not describe a network with the expected input and output shapes.
    #[error("incompatible model architecture: {0}")]
    Incompatible(String),
    /// The label definition file is missing or malformed.
    #[error("invalid label file {}", path.display())]
    Labels {
        /// Label file location.
        path: PathBuf,
        /// What was wrong with it.
        #[source]
        source: LabelError,
    },
    /// The label count disagrees with the model's output dimensionality.
    #[error("label file lists {labels} classes but the model outputs {outputs}")]
    LabelMismatch {
        /// Number of labels in the label file.
        labels: usize,
        /// Number of model outputs.
        outputs: usize,
    },
}

/// A class-name list that cannot serve as a label set.
#[derive(Debug, Error)]
pub enum LabelError {
    /// The file could not be read.
    #[error("failed to read label file")]
    Io(#[from] std::io::Error),
    /// The JSON is malformed or has neither accepted layout.
    #[error("failed to parse class names: {0}")]
    Parse(#[from] serde_json::Error),
    /// No classes listed.
    #[error("no class names")]
    Empty,
    /// A name is empty or whitespace.
    #[error("class {0} has a blank name")]
    Blank(usize),
    /// The same name appears twice.
    #[error("duplicate class name '{0}'")]
    Duplicate(String),
}

/// Caller-supplied bytes are not a usable image.
#[derive(Debug, Error)]
pub enum InvalidImageError {
    /// Zero-byte input.
    #[error("image data is empty")]
    Empty,
    /// The bytes could not be decoded as any supported raster format.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    /// The decoded image has no pixels.
    #[error("image has zero width or height")]
    ZeroSized,
    /// The pixels could not be laid out as an input tensor.
    #[error("failed to lay out image as a tensor: {0}")]
    Layout(#[source] candle_core::Error),
}

/// A forward pass failed for a single request.
///
/// Not retried: the computation is deterministic.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The numerical backend reported an error.
    #[error("forward pass failed: {0}")]
    Forward(#[from] candle_core::Error),
    /// The model returned an unexpected number of scores.
    #[error("model produced {actual} scores, expected {expected}")]
    OutputShape {
        /// Number of classes in the label set.
        expected: usize,
        /// Number of scores produced.
        actual: usize,
    },
    /// The model returned NaN or infinite scores.
    #[error("model produced non-finite scores")]
    NonFinite,
    /// A probability vector failed validation.
    #[error("invalid probability vector: {0}")]
    InvalidProbabilities(String),
    /// A caller-imposed deadline expired; the computation was abandoned.
    #[error("inference timed out after {0:?}")]
    TimedOut(Duration),
    /// The worker thread could not be started.
    #[error("failed to start inference worker")]
    Spawn(#[source] std::io::Error),
    /// The worker thread exited without reporting a result.
    #[error("inference worker exited without a result")]
    WorkerLost,
    /// The caller abandoned the analysis before it finished.
    #[error("analysis cancelled")]
    Cancelled,
}

/// The saliency map could not be produced.
///
/// Non-fatal: the prediction is still returned, with the map absent.
#[derive(Debug, Error)]
pub enum ExplainabilityError {
    /// The model does not expose a convolutional feature map.
    #[error("model exposes no convolutional feature layer")]
    NoFeatureLayer,
    /// A specific feature layer was requested but the model does not have it.
    #[error("feature layer `{requested}` not found (model exposes `{available}`)")]
    LayerUnavailable {
        /// Requested layer name.
        requested: String,
        /// Layer the model actually exposes.
        available: String,
    },
    /// The target class index is outside the label set.
    #[error("target class {index} out of range for {classes} classes")]
    TargetOutOfRange {
        /// Requested class index.
        index: usize,
        /// Number of classes.
        classes: usize,
    },
    /// The numerical backend failed during the forward or backward pass.
    #[error("gradient computation failed: {0}")]
    Backend(#[from] candle_core::Error),
    /// The backward pass did not reach the feature layer.
    #[error("no gradient reached feature layer `{0}`")]
    MissingGradient(String),
    /// The rectified activation map has no positive evidence to show.
    #[error("saliency map carries no positive evidence")]
    Degenerate,
}

/// Any pipeline failure.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Startup failure.
    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),
    /// Undecodable input.
    #[error(transparent)]
    InvalidImage(#[from] InvalidImageError),
    /// Forward pass failure.
    #[error(transparent)]
    Inference(#[from] InferenceError),
    /// Saliency failure, when requested on its own.
    #[error(transparent)]
    Explainability(#[from] ExplainabilityError),
}
