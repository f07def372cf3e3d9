//! Probability vectors, class decisions and predictions.

use serde::{Deserialize, Serialize};

use super::LabelSet;
use crate::error::InferenceError;

/// Tolerance for a probability vector summing to one.
pub const SUM_TOLERANCE: f32 = 1e-4;

/// A probability distribution over the label set.
#[derive(Debug, Clone, PartialEq)]
pub struct Probabilities(Vec<f32>);

impl Probabilities {
    /// Wraps an existing probability vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector is empty or any entry is non-finite or
    /// outside `[0, 1]`.
    pub fn new(values: Vec<f32>) -> Result<Self, InferenceError> {
        if values.is_empty() {
            return Err(InferenceError::InvalidProbabilities(
                "empty vector".to_string(),
            ));
        }
        if let Some(bad) = values
            .iter()
            .find(|p| !p.is_finite() || !(0.0..=1.0).contains(*p))
        {
            return Err(InferenceError::InvalidProbabilities(format!(
                "entry {bad} outside 0.0..=1.0"
            )));
        }
        Ok(Self(values))
    }

    /// Applies a numerically stable softmax to raw class scores.
    ///
    /// # Errors
    ///
    /// Returns `InferenceError::NonFinite` if any logit is NaN or infinite.
    pub fn from_logits(logits: &[f32]) -> Result<Self, InferenceError> {
        if logits.is_empty() {
            return Err(InferenceError::InvalidProbabilities(
                "empty vector".to_string(),
            ));
        }
        if logits.iter().any(|x| !x.is_finite()) {
            return Err(InferenceError::NonFinite);
        }

        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
        let sum: f32 = exps.iter().sum();

        Ok(Self(exps.into_iter().map(|e| e / sum).collect()))
    }

    /// Index of the largest probability; ties go to the lowest index.
    #[must_use]
    pub fn top(&self) -> usize {
        let mut best = 0;
        for (index, &p) in self.0.iter().enumerate().skip(1) {
            if p > self.0[best] {
                best = index;
            }
        }
        best
    }

    /// Probability at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<f32> {
        self.0.get(index).copied()
    }

    /// Number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; a probability vector has at least one entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all entries.
    #[must_use]
    pub fn sum(&self) -> f32 {
        self.0.iter().sum()
    }

    /// The raw vector.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// The selected top class.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Index into the label set.
    pub index: usize,
    /// Class name.
    pub label: String,
    /// Probability of the selected class, not renormalized.
    pub confidence: f32,
}

/// Probability of one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassScore {
    /// Class name.
    pub label: String,
    /// Probability in `[0, 1]`.
    pub probability: f32,
}

/// Per-request classification result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Top class name.
    pub label: String,
    /// Top class index.
    pub index: usize,
    /// Probability of the top class.
    pub confidence: f32,
    /// Full distribution in label-set order.
    pub probabilities: Vec<ClassScore>,
}

impl Prediction {
    /// Assembles a prediction from a decision and its distribution.
    #[must_use]
    pub fn new(decision: &Decision, probabilities: &Probabilities, labels: &LabelSet) -> Self {
        let probabilities = labels
            .names()
            .iter()
            .zip(probabilities.as_slice())
            .map(|(label, &probability)| ClassScore {
                label: label.clone(),
                probability,
            })
            .collect();

        Self {
            label: decision.label.clone(),
            index: decision.index,
            confidence: decision.confidence,
            probabilities,
        }
    }

    /// Scores sorted from most to least likely.
    #[must_use]
    pub fn ranked(&self) -> Vec<&ClassScore> {
        let mut ranked: Vec<&ClassScore> = self.probabilities.iter().collect();
        ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        ranked
    }
}

/// Coarse confidence bucket shown next to a prediction.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    /// Above 80%.
    High,
    /// Above 50%.
    Medium,
    /// 50% or below.
    Low,
}

impl ConfidenceBand {
    /// Buckets a confidence in `[0, 1]`.
    #[must_use]
    pub fn from_confidence(confidence: f32) -> Self {
        if confidence > 0.8 {
            Self::High
        } else if confidence > 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = Probabilities::from_logits(&[1.0, 2.0, 3.0, -4.0, 0.5, 0.0, 9.0, 2.5])
            .expect("softmax");
        assert_eq!(probs.len(), 8);
        assert!((probs.sum() - 1.0).abs() < SUM_TOLERANCE);
        assert!(probs.as_slice().iter().all(|p| (0.0..=1.0).contains(p)));
        assert_eq!(probs.top(), 6);
    }

    #[test]
    fn test_softmax_large_logits_stable() {
        let probs = Probabilities::from_logits(&[1000.0, 1000.0]).expect("softmax");
        assert!((probs.get(0).unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_softmax_rejects_nan() {
        let err = Probabilities::from_logits(&[0.0, f32::NAN]).unwrap_err();
        assert!(matches!(err, InferenceError::NonFinite));
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(Probabilities::new(vec![]).is_err());
        assert!(Probabilities::new(vec![0.5, 1.5]).is_err());
        assert!(Probabilities::new(vec![-0.1, 1.1]).is_err());
        assert!(Probabilities::new(vec![0.25, 0.75]).is_ok());
    }

    #[test]
    fn test_top_breaks_ties_by_lowest_index() {
        let probs = Probabilities::new(vec![0.0, 0.0, 0.5, 0.0, 0.0, 0.5, 0.0, 0.0]).unwrap();
        assert_eq!(probs.top(), 2);
    }

    #[test]
    fn test_prediction_aligns_with_labels() {
        let labels = LabelSet::new(vec!["A".into(), "B".into()]).unwrap();
        let probs = Probabilities::new(vec![0.3, 0.7]).unwrap();
        let decision = Decision {
            index: 1,
            label: "B".into(),
            confidence: 0.7,
        };

        let prediction = Prediction::new(&decision, &probs, &labels);
        assert_eq!(prediction.probabilities.len(), 2);
        assert_eq!(prediction.probabilities[0].label, "A");
        assert_eq!(prediction.ranked()[0].label, "B");
    }

    #[test]
    fn test_confidence_band() {
        assert_eq!(ConfidenceBand::from_confidence(0.95), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::from_confidence(0.8), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::from_confidence(0.51), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::from_confidence(0.5), ConfidenceBand::Low);
    }
}
