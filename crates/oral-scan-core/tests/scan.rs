//! Scanner tests over mock ports.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use candle_core::Device;
use oral_scan_core::domain::RiskLevel;
use oral_scan_core::{
    AnalyzeOptions, ConfidenceBand, InferencePipeline, PipelineConfig, ProgressEvent,
    RiskFactors, ScanOptions, Scanner, UnreadableImage,
};
use oral_scan_test_support::{
    MockImageSource, MockOverlayStore, MockProgressSink, MockResultOutput, SyntheticImageBuilder,
    TinyModelBuilder, WeightInit,
};
use tempfile::TempDir;

fn scanner(builder: &TinyModelBuilder, options: ScanOptions) -> (TempDir, Scanner) {
    let dir = tempfile::tempdir().unwrap();
    let artifact = builder.write_to(dir.path()).unwrap();
    let pipeline =
        InferencePipeline::load_on(&artifact, PipelineConfig::default(), Device::Cpu).unwrap();
    (dir, Scanner::new(Arc::new(pipeline), options))
}

fn spot(path: &str) -> oral_scan_core::ImageBytes {
    SyntheticImageBuilder::png(path, &SyntheticImageBuilder::central_spot(120, 90)).unwrap()
}

#[test]
fn test_scan_reports_and_overlays() {
    let (_dir, scanner) = scanner(
        &TinyModelBuilder::new().favor_label("Oral_Cancer"),
        ScanOptions::default(),
    );
    let source = MockImageSource::new(vec![spot("a.png"), spot("b.png")]);
    let output = MockResultOutput::new();
    let progress = MockProgressSink::new();
    let overlays = MockOverlayStore::new();

    let summary = scanner
        .run(&source, &output, &progress, Some(&overlays))
        .unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.elevated, 2);
    assert_eq!(output.flush_count(), 1);
    assert_eq!(progress.finished_counts(), Some((2, 0, 2)));

    let reports = output.reports();
    assert_eq!(reports[0].path, "a.png");
    assert_eq!(reports[0].dimensions.width, 120);
    assert_eq!(reports[0].prediction.label, "Oral_Cancer");
    assert_eq!(reports[0].confidence_band, ConfidenceBand::High);
    assert_eq!(reports[0].risk.overall, RiskLevel::High);
    assert_eq!(reports[0].saliency.overlay.as_deref(), Some("memory://a.png"));

    let saved = overlays.saved();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].1.dimensions(), (120, 90));
}

#[test]
fn test_unreadable_and_undecodable_are_skipped() {
    let (_dir, scanner) = scanner(
        &TinyModelBuilder::new().favor_label("Calculus"),
        ScanOptions::default(),
    );
    let source = MockImageSource::with_failures(vec![
        Ok(spot("good.png")),
        Err(UnreadableImage::new("locked/secret.png", "permission denied")),
        Ok(SyntheticImageBuilder::not_an_image("notes.png")),
    ]);
    let output = MockResultOutput::new();
    let progress = MockProgressSink::new();

    let summary = scanner.run(&source, &output, &progress, None).unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.elevated, 0);
    assert_eq!(progress.skipped_count(), 2);
    assert_eq!(progress.completed_count(), 1);
    assert!(progress.events().iter().any(|e| matches!(
        e,
        ProgressEvent::Skipped { path, .. } if path == "notes.png"
    )));
    assert!(progress.events().iter().any(|e| matches!(
        e,
        ProgressEvent::Skipped { path, reason }
            if path == "locked/secret.png" && reason == "permission denied"
    )));
}

#[test]
fn test_report_carries_disease_info() {
    let (_dir, scanner) = scanner(
        &TinyModelBuilder::new().favor_label("Ulcers"),
        ScanOptions::default(),
    );

    let report = scanner.scan_one(&spot("u.png"), None).unwrap();
    assert_eq!(report.prediction.label, "Ulcers");
    let info = report.info.expect("known class has reference text");
    assert_eq!(info.name, "Mouth Ulcers (Canker Sores)");
    assert_eq!(info.urgency, "Monitor - See dentist if persists >2 weeks");
    assert!(info.description.contains("1-2 weeks"));
}

#[test]
fn test_risk_factors_escalate_medium_findings() {
    let options = ScanOptions {
        risk_factors: RiskFactors {
            tobacco: true,
            smoking: true,
            ..RiskFactors::default()
        },
        ..ScanOptions::default()
    };
    let (_dir, scanner) = scanner(&TinyModelBuilder::new().favor_label("Caries"), options);

    let report = scanner.scan_one(&spot("c.png"), None).unwrap();
    assert_eq!(report.risk.finding, RiskLevel::Medium);
    assert_eq!(report.risk.factor_count, 2);
    assert_eq!(report.risk.overall, RiskLevel::High);
}

#[test]
fn test_saliency_summary_reasons() {
    let skip = ScanOptions {
        analyze: AnalyzeOptions {
            explain: false,
            target_class: None,
        },
        ..ScanOptions::default()
    };
    let (_dir, scanner_skip) = scanner(&TinyModelBuilder::new(), skip);
    let report = scanner_skip.scan_one(&spot("s.png"), None).unwrap();
    assert!(!report.saliency.available);
    assert_eq!(report.saliency.reason.as_deref(), Some("not requested"));

    let (_dir2, degenerate) = scanner(
        &TinyModelBuilder::new().init(WeightInit::Zeros),
        ScanOptions::default(),
    );
    let overlays = MockOverlayStore::new();
    let report = degenerate.scan_one(&spot("d.png"), Some(&overlays)).unwrap();
    assert!(!report.saliency.available);
    assert!(report.saliency.reason.is_some());
    assert!(overlays.saved().is_empty());
}

#[test]
fn test_overlay_failure_is_not_fatal() {
    let (_dir, scanner) = scanner(&TinyModelBuilder::new(), ScanOptions::default());
    let overlays = MockOverlayStore::failing();

    let report = scanner.scan_one(&spot("f.png"), Some(&overlays)).unwrap();
    assert!(report.saliency.available);
    assert!(report.saliency.overlay.is_none());
}

#[test]
fn test_scan_with_timeout() {
    let options = ScanOptions {
        timeout: Some(std::time::Duration::from_secs(60)),
        ..ScanOptions::default()
    };
    let (_dir, scanner) = scanner(&TinyModelBuilder::new().favor_label("Ulcers"), options);

    let report = scanner.scan_one(&spot("t.png"), None).unwrap();
    assert_eq!(report.prediction.label, "Ulcers");
}
