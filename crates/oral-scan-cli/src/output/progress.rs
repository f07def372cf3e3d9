//! Progress bar adapter using indicatif.

use std::fmt::Write;

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};
use oral_scan_core::{ProgressEvent, ProgressSink, RiskLevel, ScanReport};

/// Classes listed per image in the status line.
const TOP_CLASSES: usize = 3;

/// Progress bar adapter for CLI output.
pub struct ProgressBar {
    bar: Option<IndicatifBar>,
    quiet: bool,
}

impl ProgressBar {
    /// Creates a new progress bar.
    ///
    /// # Arguments
    ///
    /// * `total` - Total number of items, if known
    /// * `quiet` - If true, suppress all output
    /// * `show_bar` - If true, show progress bar; otherwise show per-item status
    #[must_use]
    pub fn new(total: Option<u64>, quiet: bool, show_bar: bool) -> Self {
        if quiet {
            return Self {
                bar: None,
                quiet: true,
            };
        }

        let bar = if show_bar {
            let bar = total.map_or_else(IndicatifBar::new_spinner, IndicatifBar::new);

            if let Ok(style) = ProgressStyle::default_bar().template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            ) {
                bar.set_style(style.progress_chars("#>-"));
            }

            Some(bar)
        } else {
            None
        };

        Self { bar, quiet }
    }
}

const fn level_name(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::High => "high",
        RiskLevel::Medium => "medium",
        _ => "low",
    }
}

/// `path: Label 91%, Other 6%, ... , <level> risk (<urgency>)`
fn status_line(report: &ScanReport) -> String {
    let top: Vec<String> = report
        .prediction
        .ranked()
        .into_iter()
        .take(TOP_CLASSES)
        .map(|score| format!("{} {:.0}%", score.label, score.probability * 100.0))
        .collect();

    let mut line = format!(
        "{}: {}, {} risk",
        report.path,
        top.join(", "),
        level_name(report.risk.overall)
    );
    if let Some(info) = &report.info {
        let _ = write!(line, " ({})", info.urgency);
    }
    line
}

impl ProgressSink for ProgressBar {
    #[allow(clippy::cast_possible_truncation)]
    fn on_event(&self, event: ProgressEvent) {
        if self.quiet {
            return;
        }

        match event {
            ProgressEvent::Started { path, index, total } => {
                if let Some(bar) = &self.bar {
                    if let Some(t) = total {
                        bar.set_length(t as u64);
                    }
                    bar.set_position(index as u64);
                    bar.set_message(path);
                }
            }
            ProgressEvent::Completed { report } => {
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                } else if report.risk.overall.is_elevated() {
                    eprintln!("{}", status_line(&report));
                }
            }
            ProgressEvent::Skipped { path, reason } => {
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                }
                eprintln!("WARN: Skipping {path}: {reason}");
            }
            ProgressEvent::Finished {
                processed,
                skipped,
                elevated,
            } => {
                if let Some(bar) = &self.bar {
                    bar.finish_with_message(format!(
                        "Done: {processed} processed, {skipped} skipped, {elevated} need attention"
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oral_scan_core::domain::{ClassScore, DiseaseInfo, Prediction, RiskFactors};
    use oral_scan_core::{ConfidenceBand, ImageDimensions, RiskAssessment, SaliencySummary};

    fn report(label: &str, scores: &[(&str, f32)]) -> ScanReport {
        let prediction = Prediction {
            label: label.to_string(),
            index: 0,
            confidence: scores.iter().map(|s| s.1).fold(0.0, f32::max),
            probabilities: scores
                .iter()
                .map(|&(label, probability)| ClassScore {
                    label: label.to_string(),
                    probability,
                })
                .collect(),
        };
        ScanReport {
            path: "mouth.jpg".to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            dimensions: ImageDimensions::new(10, 10),
            confidence_band: ConfidenceBand::from_confidence(prediction.confidence),
            risk: RiskAssessment::assess(label, &RiskFactors::default()),
            info: DiseaseInfo::for_label(label),
            prediction,
            saliency: SaliencySummary::default(),
        }
    }

    #[test]
    fn test_status_line_ranks_top_classes() {
        let line = status_line(&report(
            "Ulcers",
            &[
                ("Calculus", 0.05),
                ("Caries", 0.15),
                ("Gingivitis", 0.02),
                ("Ulcers", 0.78),
            ],
        ));

        assert_eq!(
            line,
            "mouth.jpg: Ulcers 78%, Caries 15%, Calculus 5%, medium risk \
             (Monitor - See dentist if persists >2 weeks)"
        );
    }

    #[test]
    fn test_status_line_without_info() {
        let line = status_line(&report("Unknown", &[("Unknown", 1.0)]));
        assert_eq!(line, "mouth.jpg: Unknown 100%, low risk");
    }
}
