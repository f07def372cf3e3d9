//! Oral Scan Core - inference and explainability pipeline
//!
//! This crate contains the domain types, the candle-based `OralNet` classifier,
//! Grad-CAM saliency, the [`InferencePipeline`] that ties them together, and
//! the ports through which callers feed images and receive reports.

pub mod domain;
pub mod error;
pub mod inference;
pub mod pipeline;
pub mod ports;
pub mod render;
pub mod scan;

pub use domain::{
    Analysis, ConfidenceBand, Decision, DiseaseInfo, Explanation, ImageBytes, ImageDimensions,
    LabelSet, Prediction, Probabilities, RiskAssessment, RiskFactors, RiskLevel, SaliencyMap,
    SaliencySummary, ScanReport,
};
pub use error::{
    ExplainabilityError, InferenceError, InvalidImageError, LabelError, ModelLoadError,
    PipelineError,
};
pub use pipeline::{
    AnalyzeOptions, ExecutionPolicy, InferencePipeline, ModelArtifact, Normalization,
    NormalizedTensor, PipelineConfig,
};
pub use ports::{
    ImageSource, OverlayStore, ProgressEvent, ProgressSink, ResultOutput, UnreadableImage,
};
pub use scan::{ScanOptions, ScanSummary, Scanner};
