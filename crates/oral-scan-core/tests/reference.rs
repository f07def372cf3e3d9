//! Checks against the real trained artifact.
//!
//! Ignored by default. Run with
//! `ORAL_SCAN_MODELS_DIR=<dir> ORAL_SCAN_ULCERS_IMAGE=<jpg> cargo test -- --ignored`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;

use oral_scan_core::{AnalyzeOptions, InferencePipeline, ModelArtifact, PipelineConfig};

fn env_path(name: &str) -> PathBuf {
    std::env::var_os(name)
        .map(PathBuf::from)
        .unwrap_or_else(|| panic!("{name} must point at the reference data"))
}

#[test]
#[ignore = "requires the trained artifact and a reference image"]
fn test_reference_ulcers_image() {
    let artifact = ModelArtifact::in_dir(env_path("ORAL_SCAN_MODELS_DIR"));
    let pipeline = InferencePipeline::load(&artifact, PipelineConfig::default()).unwrap();

    let bytes = std::fs::read(env_path("ORAL_SCAN_ULCERS_IMAGE")).unwrap();
    let analysis = pipeline.analyze(&bytes, AnalyzeOptions::default()).unwrap();

    assert_eq!(analysis.prediction.label, "Ulcers");
    assert!(analysis.prediction.confidence >= 0.5);

    let map = analysis.saliency().expect("saliency map");
    assert_eq!((map.width(), map.height()), (224, 224));
}
