//! Integration tests for configuration layering.
//!
//! Tests the full priority chain: hardcoded defaults < XDG config < project config < CLI args

#![allow(clippy::unwrap_used)] // Test code uses unwrap for brevity
#![allow(deprecated)] // cargo_bin deprecation warning

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use oral_scan_test_support::{SyntheticImageBuilder, TinyModelBuilder};
use predicates::prelude::*;
use tempfile::TempDir;

/// Scratch project: tiny model in `models/`, one image, empty XDG home.
struct Project {
    root: TempDir,
    image: PathBuf,
}

impl Project {
    fn new(favor: &str) -> Self {
        let root = tempfile::tempdir().unwrap();
        TinyModelBuilder::new()
            .favor_label(favor)
            .write_to(&root.path().join("models"))
            .unwrap();
        let image = SyntheticImageBuilder::write_to(
            root.path(),
            "mouth.png",
            &SyntheticImageBuilder::central_spot(80, 60),
        )
        .unwrap();
        Self { root, image }
    }

    fn path(&self) -> &Path {
        self.root.path()
    }

    fn write_project_config(&self, toml: &str) {
        fs::write(self.path().join(".oral-scan.toml"), toml).unwrap();
    }

    fn write_xdg_config(&self, toml: &str) {
        let dir = self.path().join("xdg").join("oral-scan");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.toml"), toml).unwrap();
    }

    /// Command run from the project root with no `--models-dir`.
    fn bare_cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("oral-scan").unwrap();
        cmd.current_dir(self.path())
            .env("XDG_CONFIG_HOME", self.path().join("xdg"));
        cmd
    }

    fn cmd(&self) -> Command {
        let mut cmd = self.bare_cmd();
        cmd.arg("--models-dir").arg(self.path().join("models"));
        cmd
    }
}

#[test]
fn test_project_config_applies_format() {
    let project = Project::new("Normal_Mouth");
    project.write_project_config(
        r"
[output]
format = 'json'
",
    );

    project
        .cmd()
        .arg(&project.image)
        .assert()
        .code(0)
        .stdout(predicate::str::starts_with("["));
}

#[test]
fn test_cli_overrides_project_config() {
    let project = Project::new("Normal_Mouth");
    project.write_project_config(
        r"
[output]
format = 'json'
",
    );

    project
        .cmd()
        .args(["--format", "jsonl"])
        .arg(&project.image)
        .assert()
        .code(0)
        .stdout(predicate::str::starts_with("{"));
}

#[test]
fn test_config_sets_models_dir() {
    let project = Project::new("Ulcers");
    project.write_project_config(
        r"
[model]
dir = 'models'
",
    );

    project
        .bare_cmd()
        .arg(&project.image)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"Ulcers\""));
}

#[test]
fn test_xdg_config_is_read() {
    let project = Project::new("Normal_Mouth");
    project.write_xdg_config(
        r"
[explain]
enabled = false
",
    );

    project
        .cmd()
        .arg(&project.image)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("not requested"));
}

#[test]
fn test_project_config_overrides_xdg() {
    let project = Project::new("Normal_Mouth");
    project.write_xdg_config(
        r"
[explain]
enabled = false
",
    );
    project.write_project_config(
        r"
[explain]
enabled = true
",
    );

    project
        .cmd()
        .arg(&project.image)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("not requested").not());
}

#[test]
fn test_config_heatmap_dir() {
    let project = Project::new("Normal_Mouth");
    project.write_project_config(
        r"
[explain]
heatmap_dir = 'heat'
alpha = 0.8
",
    );

    project.cmd().arg(&project.image).assert().code(0);

    assert!(project.path().join("heat/mouth.gradcam.png").exists());
}

#[test]
fn test_config_pipeline_settings() {
    let project = Project::new("Oral_Cancer");
    project.write_project_config(
        r"
[model]
execution = 'concurrent'
normalization = 'imagenet'
timeout_secs = 60
",
    );

    project
        .cmd()
        .arg(&project.image)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"Oral_Cancer\""));
}

#[test]
fn test_invalid_config_value_warns() {
    let project = Project::new("Normal_Mouth");
    project.write_project_config(
        r"
[explain]
alpha = 3.0
",
    );

    project
        .cmd()
        .arg(&project.image)
        .assert()
        .stderr(predicate::str::contains("warning: explain.alpha"));
}

#[test]
fn test_unknown_execution_warns() {
    let project = Project::new("Normal_Mouth");
    project.write_project_config(
        r"
[model]
execution = 'parallel'
",
    );

    project
        .cmd()
        .arg(&project.image)
        .assert()
        .code(0)
        .stderr(predicate::str::contains("model.execution"));
}

#[test]
fn test_malformed_config_is_ignored() {
    let project = Project::new("Normal_Mouth");
    project.write_project_config("[output\nformat = 'json'");

    project
        .cmd()
        .arg(&project.image)
        .assert()
        .code(0)
        .stdout(predicate::str::starts_with("{"));
}
