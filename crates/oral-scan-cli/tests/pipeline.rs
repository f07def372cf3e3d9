//! End-to-end check tests against a tiny synthetic model.
//!
//! Each test writes a small randomly-initialized model and a few synthetic
//! images into a scratch directory, then runs the binary over them.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_panics_doc,
    deprecated
)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use oral_scan_test_support::{SyntheticImageBuilder, TinyModelBuilder};
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

/// Scratch workspace with a model directory and an image directory.
struct Workspace {
    root: TempDir,
}

impl Workspace {
    fn new(model: &TinyModelBuilder) -> Self {
        let root = tempfile::tempdir().unwrap();
        model.write_to(&root.path().join("models")).unwrap();
        std::fs::create_dir_all(root.path().join("images")).unwrap();
        Self { root }
    }

    fn favoring(label: &str) -> Self {
        Self::new(&TinyModelBuilder::new().favor_label(label))
    }

    fn models(&self) -> PathBuf {
        self.root.path().join("models")
    }

    fn images(&self) -> PathBuf {
        self.root.path().join("images")
    }

    fn add_image(&self, name: &str) -> PathBuf {
        SyntheticImageBuilder::write_to(
            &self.images(),
            name,
            &SyntheticImageBuilder::central_spot(96, 64),
        )
        .unwrap()
    }

    /// Command isolated from user config, pointed at this model.
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("oral-scan").unwrap();
        cmd.current_dir(self.root.path())
            .env("XDG_CONFIG_HOME", self.root.path().join("config"))
            .arg("--quiet")
            .arg("--models-dir")
            .arg(self.models());
        cmd
    }
}

fn parse_lines(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

// === Report Contents ===

#[test]
fn test_report_fields() {
    let ws = Workspace::favoring("Ulcers");
    let image = ws.add_image("mouth.png");

    let output = ws.cmd().arg(&image).output().unwrap();
    assert_eq!(output.status.code(), Some(1), "ulcers are medium risk");

    let reports = parse_lines(&output.stdout);
    assert_eq!(reports.len(), 1);
    let report = &reports[0];

    assert!(report["path"].as_str().unwrap().ends_with("mouth.png"));
    assert!(report["timestamp"].as_str().unwrap().contains('T'));
    assert_eq!(report["dimensions"]["width"], 96);
    assert_eq!(report["dimensions"]["height"], 64);

    let prediction = &report["prediction"];
    assert_eq!(prediction["label"], "Ulcers");
    assert_eq!(prediction["index"], 7);
    assert!(prediction["confidence"].as_f64().unwrap() > 0.99);
    assert_eq!(report["confidence_band"], "high");

    let probabilities = prediction["probabilities"].as_array().unwrap();
    assert_eq!(probabilities.len(), 8);
    assert_eq!(probabilities[0]["label"], "Calculus");
    let total: f64 = probabilities
        .iter()
        .map(|p| p["probability"].as_f64().unwrap())
        .sum();
    assert!((total - 1.0).abs() < 1e-4);

    assert_eq!(report["risk"]["finding"], "medium");
    assert_eq!(report["risk"]["overall"], "medium");
    assert_eq!(report["saliency"]["available"], true);

    assert_eq!(report["info"]["name"], "Mouth Ulcers (Canker Sores)");
    assert_eq!(
        report["info"]["urgency"],
        "Monitor - See dentist if persists >2 weeks"
    );
    assert!(!report["info"]["treatment"].as_array().unwrap().is_empty());
}

#[test]
fn test_low_risk_exits_zero() {
    let ws = Workspace::favoring("Normal_Mouth");
    ws.add_image("a.png");
    ws.add_image("b.jpg");

    let output = ws.cmd().arg(ws.images()).output().unwrap();
    assert_eq!(output.status.code(), Some(0));

    let reports = parse_lines(&output.stdout);
    assert_eq!(reports.len(), 2);
    for report in &reports {
        assert_eq!(report["prediction"]["label"], "Normal_Mouth");
        assert_eq!(report["risk"]["overall"], "low");
    }
}

#[test]
fn test_oral_cancer_is_high_risk() {
    let ws = Workspace::favoring("Oral_Cancer");
    let image = ws.add_image("a.png");

    let output = ws.cmd().arg(&image).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(parse_lines(&output.stdout)[0]["risk"]["overall"], "high");
}

// === Risk Questionnaire ===

#[test]
fn test_risk_factors_escalate_medium_finding() {
    let ws = Workspace::favoring("Caries");
    let image = ws.add_image("a.png");

    let output = ws
        .cmd()
        .args(["--tobacco", "--paan"])
        .arg(&image)
        .output()
        .unwrap();

    let report = &parse_lines(&output.stdout)[0];
    assert_eq!(report["risk"]["finding"], "medium");
    assert_eq!(report["risk"]["factor_count"], 2);
    assert_eq!(report["risk"]["self_reported"], "medium");
    assert_eq!(report["risk"]["overall"], "high");
}

#[test]
fn test_risk_factors_do_not_escalate_low_finding() {
    let ws = Workspace::favoring("Calculus");
    let image = ws.add_image("a.png");

    let output = ws
        .cmd()
        .args(["--tobacco", "--paan", "--smoke"])
        .arg(&image)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));

    let report = &parse_lines(&output.stdout)[0];
    assert_eq!(report["risk"]["self_reported"], "high");
    assert_eq!(report["risk"]["overall"], "low");
}

// === Saliency ===

#[test]
fn test_no_explain_reports_reason() {
    let ws = Workspace::favoring("Normal_Mouth");
    let image = ws.add_image("a.png");

    let output = ws.cmd().arg("--no-explain").arg(&image).output().unwrap();

    let saliency = &parse_lines(&output.stdout)[0]["saliency"];
    assert_eq!(saliency["available"], false);
    assert_eq!(saliency["reason"], "not requested");
}

#[test]
fn test_heatmap_dir_writes_overlay() {
    let ws = Workspace::favoring("Ulcers");
    let image = ws.add_image("mouth.png");
    let heatmaps = ws.root.path().join("heatmaps");

    let output = ws
        .cmd()
        .arg("--heatmap-dir")
        .arg(&heatmaps)
        .args(["--alpha", "0.6"])
        .arg(&image)
        .output()
        .unwrap();

    let overlay_path = heatmaps.join("mouth.gradcam.png");
    assert!(overlay_path.exists(), "overlay should be written");

    let overlay = image::open(&overlay_path).unwrap();
    assert_eq!((overlay.width(), overlay.height()), (96, 64));

    let saliency = &parse_lines(&output.stdout)[0]["saliency"];
    assert_eq!(saliency["available"], true);
    assert!(saliency["overlay"]
        .as_str()
        .unwrap()
        .ends_with(&file_name(&overlay_path)));
}

#[test]
fn test_no_explain_skips_overlay() {
    let ws = Workspace::favoring("Ulcers");
    let image = ws.add_image("mouth.png");
    let heatmaps = ws.root.path().join("heatmaps");

    ws.cmd()
        .arg("--no-explain")
        .arg("--heatmap-dir")
        .arg(&heatmaps)
        .arg(&image)
        .assert()
        .code(1);

    assert!(!heatmaps.exists());
}

#[test]
fn test_target_class_out_of_range_is_not_fatal() {
    let ws = Workspace::favoring("Normal_Mouth");
    let image = ws.add_image("a.png");

    let output = ws
        .cmd()
        .args(["--target-class", "42"])
        .arg(&image)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));

    let saliency = &parse_lines(&output.stdout)[0]["saliency"];
    assert_eq!(saliency["available"], false);
    assert!(saliency["reason"].as_str().unwrap().contains("42"));
}

#[test]
fn test_degenerate_saliency_is_reported() {
    let ws = Workspace::new(
        &TinyModelBuilder::new().init(oral_scan_test_support::WeightInit::Zeros),
    );
    let image = ws.add_image("a.png");

    let output = ws.cmd().arg(&image).output().unwrap();

    let report = &parse_lines(&output.stdout)[0];
    assert_eq!(report["prediction"]["label"], "Calculus");
    assert_eq!(report["confidence_band"], "low");
    assert_eq!(report["saliency"]["available"], false);
    assert!(report["saliency"]["reason"].is_string());
}

// === Output Formats ===

#[test]
fn test_json_array_format() {
    let ws = Workspace::favoring("Normal_Mouth");
    ws.add_image("a.png");
    ws.add_image("b.png");

    let output = ws
        .cmd()
        .args(["--format", "json"])
        .arg(ws.images())
        .output()
        .unwrap();

    let parsed: Value = serde_json::from_slice(&output.stdout).unwrap();
    let reports = parsed.as_array().unwrap();
    assert_eq!(reports.len(), 2);
    assert!(reports[0]["path"].as_str().unwrap().ends_with("a.png"));
    assert!(reports[1]["path"].as_str().unwrap().ends_with("b.png"));
}

#[test]
fn test_json_pretty_format() {
    let ws = Workspace::favoring("Normal_Mouth");
    let image = ws.add_image("a.png");

    ws.cmd()
        .args(["--format", "json", "--pretty"])
        .arg(&image)
        .assert()
        .code(0)
        .stdout(predicate::str::starts_with("[\n"));
}

#[test]
fn test_empty_json_array() {
    let ws = Workspace::favoring("Normal_Mouth");

    ws.cmd()
        .args(["--format", "json"])
        .arg(ws.images())
        .assert()
        .code(0)
        .stdout(predicate::str::starts_with("[]"));
}

// === Skips and Errors ===

#[test]
fn test_undecodable_file_is_skipped() {
    let ws = Workspace::favoring("Normal_Mouth");
    ws.add_image("good.png");
    std::fs::write(ws.images().join("broken.png"), b"definitely not a png").unwrap();

    let output = ws.cmd().arg(ws.images()).output().unwrap();
    assert_eq!(output.status.code(), Some(0));

    let reports = parse_lines(&output.stdout);
    assert_eq!(reports.len(), 1);
    assert!(reports[0]["path"].as_str().unwrap().ends_with("good.png"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("broken.png"));
}

#[test]
fn test_missing_model_exits_two() {
    let ws = Workspace::favoring("Normal_Mouth");
    let image = ws.add_image("a.png");
    let empty = ws.root.path().join("no-models");

    let mut cmd = Command::cargo_bin("oral-scan").unwrap();
    cmd.current_dir(ws.root.path())
        .env("XDG_CONFIG_HOME", ws.root.path().join("config"))
        .arg("--models-dir")
        .arg(&empty)
        .arg(&image);

    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("error:"))
        .stderr(predicate::str::contains("not found").or(predicate::str::contains("missing")));
}

#[test]
fn test_label_mismatch_exits_two() {
    let ws = Workspace::favoring("Normal_Mouth");
    let image = ws.add_image("a.png");
    std::fs::write(
        ws.models().join("class_names.json"),
        r#"["Calculus", "Caries", "Gingivitis"]"#,
    )
    .unwrap();

    ws.cmd().arg(&image).assert().code(2);
}

#[test]
fn test_timeout_flag() {
    let ws = Workspace::favoring("Hypodontia");
    let image = ws.add_image("a.png");

    let output = ws
        .cmd()
        .args(["--timeout", "60"])
        .arg(&image)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        parse_lines(&output.stdout)[0]["prediction"]["label"],
        "Hypodontia"
    );
}
