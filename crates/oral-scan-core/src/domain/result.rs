//! Analysis result types.

use serde::{Deserialize, Serialize};

use super::{ConfidenceBand, DiseaseInfo, Prediction, RiskAssessment, SaliencyMap};
use crate::error::ExplainabilityError;

/// Raw image bytes as read from a source, not yet decoded.
#[derive(Debug, Clone)]
pub struct ImageBytes {
    /// Where the bytes came from.
    pub path: String,
    /// Encoded image data.
    pub bytes: Vec<u8>,
}

impl ImageBytes {
    /// Creates a new image payload.
    #[must_use]
    pub fn new(path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            bytes,
        }
    }
}

/// Image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageDimensions {
    /// Creates new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Outcome of the saliency step.
#[derive(Debug)]
pub enum Explanation {
    /// Grad-CAM map at the model's input resolution.
    Map(SaliencyMap),
    /// Saliency failed; the prediction is still valid.
    Unavailable(ExplainabilityError),
    /// The caller did not ask for a map.
    Skipped,
}

/// Pipeline output for one image.
#[derive(Debug)]
pub struct Analysis {
    /// Class decision and full distribution.
    pub prediction: Prediction,
    /// Saliency map or the reason it is absent.
    pub explanation: Explanation,
}

impl Analysis {
    /// The saliency map, if one was produced.
    #[must_use]
    pub fn saliency(&self) -> Option<&SaliencyMap> {
        match &self.explanation {
            Explanation::Map(map) => Some(map),
            Explanation::Unavailable(_) | Explanation::Skipped => None,
        }
    }
}

/// Serializable saliency status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaliencySummary {
    /// Whether a map was produced.
    pub available: bool,
    /// Where the overlay image was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay: Option<String>,
    /// Why the map is absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Complete screening report for a single image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Path to the analyzed image.
    pub path: String,
    /// Timestamp of analysis (ISO 8601).
    pub timestamp: String,
    /// Original image dimensions.
    pub dimensions: ImageDimensions,
    /// Classification.
    pub prediction: Prediction,
    /// Confidence bucket of the top class.
    pub confidence_band: ConfidenceBand,
    /// Risk of the finding combined with reported risk factors.
    pub risk: RiskAssessment,
    /// Reference text for the predicted class; absent for unknown labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<DiseaseInfo>,
    /// Saliency status.
    pub saliency: SaliencySummary,
}
