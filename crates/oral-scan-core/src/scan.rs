//! Batch screening over the ports.
//!
//! A [`Scanner`] pulls encoded images from an [`ImageSource`], runs each through
//! the shared [`InferencePipeline`], attaches the risk assessment, optionally
//! renders and stores a Grad-CAM overlay, and hands the report to a
//! [`ResultOutput`]. Unreadable or undecodable images are skipped.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use image::GenericImageView;
use tracing::{debug, info, warn};

use crate::domain::{
    Analysis, ConfidenceBand, DiseaseInfo, Explanation, ImageBytes, ImageDimensions,
    RiskAssessment, RiskFactors, SaliencySummary, ScanReport,
};
use crate::error::PipelineError;
use crate::pipeline::{decode_image, AnalyzeOptions, InferencePipeline};
use crate::ports::{ImageSource, OverlayStore, ProgressEvent, ProgressSink, ResultOutput};
use crate::render::{overlay, DEFAULT_ALPHA};

/// Per-scan settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanOptions {
    /// Saliency settings passed to the pipeline.
    pub analyze: AnalyzeOptions,
    /// Self-reported risk factors applied to every image.
    pub risk_factors: RiskFactors,
    /// Per-image deadline.
    pub timeout: Option<Duration>,
    /// Heat-map opacity for overlays.
    pub overlay_alpha: f32,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            analyze: AnalyzeOptions::default(),
            risk_factors: RiskFactors::default(),
            timeout: None,
            overlay_alpha: DEFAULT_ALPHA,
        }
    }
}

/// Counts from a finished scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Images analyzed.
    pub processed: usize,
    /// Images skipped because they could not be read or analyzed.
    pub skipped: usize,
    /// Images whose overall risk is medium or high.
    pub elevated: usize,
}

/// Runs the pipeline over a batch of images.
pub struct Scanner {
    pipeline: Arc<InferencePipeline>,
    options: ScanOptions,
}

impl Scanner {
    /// Creates a scanner around a loaded pipeline.
    #[must_use]
    pub const fn new(pipeline: Arc<InferencePipeline>, options: ScanOptions) -> Self {
        Self { pipeline, options }
    }

    /// Analyzes one image and builds its report.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` if the image cannot be decoded or the forward
    /// pass fails. Overlay storage failures are logged, not returned.
    pub fn scan_one(
        &self,
        image: &ImageBytes,
        overlays: Option<&dyn OverlayStore>,
    ) -> Result<ScanReport, PipelineError> {
        let decoded = decode_image(&image.bytes)?;
        let (width, height) = decoded.dimensions();

        let analysis = match self.options.timeout {
            Some(timeout) => {
                self.pipeline
                    .analyze_with_timeout(decoded.clone(), self.options.analyze, timeout)?
            }
            None => self.pipeline.analyze_image(&decoded, self.options.analyze)?,
        };

        let saliency = match (&analysis.explanation, overlays) {
            (Explanation::Map(map), Some(store)) => {
                let rendered = overlay(&decoded, map, self.options.overlay_alpha);
                match store.save(&image.path, &rendered) {
                    Ok(location) => {
                        debug!("Wrote overlay for {} to {location}", image.path);
                        SaliencySummary {
                            available: true,
                            overlay: Some(location),
                            reason: None,
                        }
                    }
                    Err(e) => {
                        warn!("Failed to store overlay for {}: {e:#}", image.path);
                        SaliencySummary {
                            available: true,
                            overlay: None,
                            reason: None,
                        }
                    }
                }
            }
            _ => summarize(&analysis),
        };

        let Analysis { prediction, .. } = analysis;
        let risk = RiskAssessment::assess(&prediction.label, &self.options.risk_factors);
        let info = DiseaseInfo::for_label(&prediction.label);

        Ok(ScanReport {
            path: image.path.clone(),
            timestamp: iso_timestamp(),
            dimensions: ImageDimensions::new(width, height),
            confidence_band: ConfidenceBand::from_confidence(prediction.confidence),
            prediction,
            risk,
            info,
            saliency,
        })
    }

    /// Scans every image from `source`.
    ///
    /// # Errors
    ///
    /// Returns an error only if writing a report fails. Per-image failures are
    /// reported as `Skipped` events.
    pub fn run(
        &self,
        source: &dyn ImageSource,
        output: &dyn ResultOutput,
        progress: &dyn ProgressSink,
        overlays: Option<&dyn OverlayStore>,
    ) -> Result<ScanSummary> {
        let total = source.count_hint();
        let mut summary = ScanSummary::default();

        for (index, item) in source.images().enumerate() {
            let image = match item {
                Ok(image) => image,
                Err(e) => {
                    warn!("Skipping unreadable image: {e}");
                    progress.on_event(ProgressEvent::Skipped {
                        path: e.path,
                        reason: e.reason,
                    });
                    summary.skipped += 1;
                    continue;
                }
            };

            progress.on_event(ProgressEvent::Started {
                path: image.path.clone(),
                index,
                total,
            });

            let report = match self.scan_one(&image, overlays) {
                Ok(report) => report,
                Err(e) => {
                    warn!("Skipping {}: {e}", image.path);
                    progress.on_event(ProgressEvent::Skipped {
                        path: image.path.clone(),
                        reason: e.to_string(),
                    });
                    summary.skipped += 1;
                    continue;
                }
            };

            if report.risk.overall.is_elevated() {
                summary.elevated += 1;
            }

            output.write(&report)?;
            progress.on_event(ProgressEvent::Completed { report });
            summary.processed += 1;
        }

        output.flush()?;

        info!(
            "Scan finished: {} processed, {} skipped, {} elevated",
            summary.processed, summary.skipped, summary.elevated
        );
        progress.on_event(ProgressEvent::Finished {
            processed: summary.processed,
            skipped: summary.skipped,
            elevated: summary.elevated,
        });

        Ok(summary)
    }
}

fn summarize(analysis: &Analysis) -> SaliencySummary {
    match &analysis.explanation {
        Explanation::Map(_) => SaliencySummary {
            available: true,
            overlay: None,
            reason: None,
        },
        Explanation::Unavailable(e) => SaliencySummary {
            available: false,
            overlay: None,
            reason: Some(e.to_string()),
        },
        Explanation::Skipped => SaliencySummary {
            available: false,
            overlay: None,
            reason: Some("not requested".to_string()),
        },
    }
}

/// Generate ISO 8601 UTC timestamp (RFC 3339 format).
fn iso_timestamp() -> String {
    match time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339) {
        Ok(ts) => ts,
        Err(e) => {
            debug!("Timestamp format failed: {e}");
            String::from("1970-01-01T00:00:00Z")
        }
    }
}
