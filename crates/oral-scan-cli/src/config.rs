//! Configuration file support for oral-scan.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/oral-scan/config.toml` (lowest priority)
//! - Project-local: `.oral-scan.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)

use std::path::{Path, PathBuf};

use oral_scan_core::{ExecutionPolicy, Normalization};
use serde::Deserialize;
use tracing::{debug, info};

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General options.
    pub general: GeneralConfig,
    /// Model settings.
    pub model: ModelConfig,
    /// Saliency map settings.
    pub explain: ExplainConfig,
    /// Output formatting settings.
    pub output: OutputConfig,
}

/// General configuration options.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Recurse into subdirectories by default.
    pub recursive: Option<bool>,
}

/// Model configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Custom models directory path.
    pub dir: Option<PathBuf>,
    /// Execution slot: "serialized" or "concurrent".
    pub execution: Option<String>,
    /// Pixel normalization: "unit" or "imagenet".
    pub normalization: Option<String>,
    /// Per-image timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Saliency map configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ExplainConfig {
    /// Enable/disable Grad-CAM.
    pub enabled: Option<bool>,
    /// Heat-map opacity (0.0-1.0).
    pub alpha: Option<f32>,
    /// Directory for overlay images.
    pub heatmap_dir: Option<PathBuf>,
}

/// Output formatting configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "json" or "jsonl".
    pub format: Option<String>,
    /// Pretty-print JSON output.
    pub pretty: Option<bool>,
    /// Show progress bar.
    pub progress: Option<bool>,
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/oral-scan/config.toml`
    /// 2. Project-local: `.oral-scan.toml` (searched up from cwd)
    ///
    /// Missing files are silently ignored. Invalid values are logged as warnings.
    pub fn load() -> Self {
        let mut config = Self::default();

        // Load XDG config (lowest priority)
        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(&xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        // Load project-local config (higher priority, merged)
        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        // Validate merged config
        if let Err(e) = config.validate() {
            eprintln!("warning: {e}");
        }

        config
    }

    /// Validate configuration values are within acceptable ranges.
    fn validate(&self) -> Result<(), String> {
        if let Some(a) = self.explain.alpha {
            if !(0.0..=1.0).contains(&a) {
                return Err(format!("explain.alpha must be 0.0-1.0, got {a}"));
            }
        }

        if self.model.timeout_secs == Some(0) {
            return Err("model.timeout_secs must be greater than 0".to_string());
        }

        if let Some(ref e) = self.model.execution {
            if parse_execution(e).is_none() {
                return Err(format!(
                    "model.execution must be 'serialized' or 'concurrent', got '{e}'"
                ));
            }
        }

        if let Some(ref n) = self.model.normalization {
            if parse_normalization(n).is_none() {
                return Err(format!(
                    "model.normalization must be 'unit' or 'imagenet', got '{n}'"
                ));
            }
        }

        // Output format validation
        if let Some(ref f) = self.output.format {
            if f != "json" && f != "jsonl" {
                return Err(format!(
                    "output.format must be 'json' or 'jsonl', got '{f}'"
                ));
            }
        }

        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    fn merge(&mut self, other: Self) {
        // General
        self.general.recursive = other.general.recursive.or(self.general.recursive);

        // Model
        self.model.dir = other.model.dir.or_else(|| self.model.dir.take());
        self.model.execution = other
            .model
            .execution
            .or_else(|| self.model.execution.take());
        self.model.normalization = other
            .model
            .normalization
            .or_else(|| self.model.normalization.take());
        self.model.timeout_secs = other.model.timeout_secs.or(self.model.timeout_secs);

        // Explain
        self.explain.enabled = other.explain.enabled.or(self.explain.enabled);
        self.explain.alpha = other.explain.alpha.or(self.explain.alpha);
        self.explain.heatmap_dir = other
            .explain
            .heatmap_dir
            .or_else(|| self.explain.heatmap_dir.take());

        // Output
        self.output.format = other.output.format.or_else(|| self.output.format.take());
        self.output.pretty = other.output.pretty.or(self.output.pretty);
        self.output.progress = other.output.progress.or(self.output.progress);
    }

    /// Execution policy, if configured and valid.
    pub fn execution(&self) -> Option<ExecutionPolicy> {
        self.model.execution.as_deref().and_then(parse_execution)
    }

    /// Pixel normalization, if configured and valid.
    pub fn normalization(&self) -> Option<Normalization> {
        self.model
            .normalization
            .as_deref()
            .and_then(parse_normalization)
    }
}

fn parse_execution(s: &str) -> Option<ExecutionPolicy> {
    match s {
        "serialized" => Some(ExecutionPolicy::Serialized),
        "concurrent" => Some(ExecutionPolicy::Concurrent),
        _ => None,
    }
}

fn parse_normalization(s: &str) -> Option<Normalization> {
    match s {
        "unit" => Some(Normalization::UnitRange),
        "imagenet" => Some(Normalization::IMAGENET),
        _ => None,
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("oral-scan").join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.oral-scan.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let config_path = dir.join(".oral-scan.toml");
        if config_path.exists() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    None
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}
