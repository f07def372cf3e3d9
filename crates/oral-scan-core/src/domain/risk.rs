//! Risk levels for findings and the self-reported risk questionnaire.

use serde::{Deserialize, Serialize};

/// Severity attached to a finding or a questionnaire score.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Routine follow-up.
    Low,
    /// See a dentist soon.
    Medium,
    /// Seek care immediately.
    High,
}

impl RiskLevel {
    /// Risk level of a predicted class. Unknown classes are low risk.
    #[must_use]
    pub fn for_label(label: &str) -> Self {
        match label {
            "Oral_Cancer" => Self::High,
            "Ulcers" | "Gingivitis" | "Caries" => Self::Medium,
            _ => Self::Low,
        }
    }

    /// True for medium and high.
    #[must_use]
    pub fn is_elevated(self) -> bool {
        self >= Self::Medium
    }
}

/// Answers to the four-question lifestyle screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFactors {
    /// Uses tobacco or gutkha.
    pub tobacco: bool,
    /// Chews paan or betel.
    pub paan: bool,
    /// Smokes.
    pub smoking: bool,
    /// Drinks alcohol regularly.
    pub alcohol: bool,
}

impl RiskFactors {
    /// Number of questions answered yes.
    #[must_use]
    pub fn count(&self) -> usize {
        [self.tobacco, self.paan, self.smoking, self.alcohol]
            .into_iter()
            .filter(|&f| f)
            .count()
    }

    /// Tier from the questionnaire alone.
    #[must_use]
    pub fn level(&self) -> RiskLevel {
        match self.count() {
            0 => RiskLevel::Low,
            1 | 2 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }
}

/// Combined view of the finding and the questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Risk of the predicted class.
    pub finding: RiskLevel,
    /// Number of risk factors reported.
    pub factor_count: usize,
    /// Questionnaire tier.
    pub self_reported: RiskLevel,
    /// Finding risk after escalation by risk factors.
    pub overall: RiskLevel,
}

impl RiskAssessment {
    /// Assesses a predicted class given the reported risk factors.
    ///
    /// Two or more factors escalate a medium finding to high.
    #[must_use]
    pub fn assess(label: &str, factors: &RiskFactors) -> Self {
        let finding = RiskLevel::for_label(label);
        let factor_count = factors.count();
        let overall = if factor_count >= 2 && finding == RiskLevel::Medium {
            RiskLevel::High
        } else {
            finding
        };

        Self {
            finding,
            factor_count,
            self_reported: factors.level(),
            overall,
        }
    }
}
