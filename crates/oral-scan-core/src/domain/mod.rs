//! Core domain types for oral disease screening.

mod info;
mod labels;
mod prediction;
mod result;
mod risk;
mod saliency;

pub use info::DiseaseInfo;
pub use labels::{LabelSet, DEFAULT_CLASS_NAMES};
pub use prediction::{
    ClassScore, ConfidenceBand, Decision, Prediction, Probabilities, SUM_TOLERANCE,
};
pub use result::{
    Analysis, Explanation, ImageBytes, ImageDimensions, SaliencySummary, ScanReport,
};
pub use risk::{RiskAssessment, RiskFactors, RiskLevel};
pub use saliency::SaliencyMap;
