//! Check command - classify images and explain the predictions.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use oral_scan_adapters::{FsImageSource, FsOverlayStore, ModelStore};
use oral_scan_core::render::DEFAULT_ALPHA;
use oral_scan_core::{
    AnalyzeOptions, ImageSource, InferencePipeline, LabelSet, OverlayStore, PipelineConfig,
    RiskFactors, ScanOptions, Scanner,
};
use tracing::{debug, info, warn};

use super::ExitCode;
use crate::config::AppConfig;
use crate::output::{JsonLayout, JsonOutput, ProgressBar};

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON Lines (one JSON object per line)
    #[default]
    Jsonl,
    /// Single JSON array
    Json,
}

/// Parse and validate an opacity value (0.0-1.0).
fn parse_alpha(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in 0.0..=1.0"))
    }
}

/// Parse a positive number of seconds.
fn parse_timeout(s: &str) -> Result<u64, String> {
    let value: u64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a whole number of seconds"))?;
    if value == 0 {
        Err("timeout must be at least 1 second".to_string())
    } else {
        Ok(value)
    }
}

/// Shared arguments for image analysis.
#[derive(Args, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct CheckArgs {
    /// Files or directories to analyze
    pub paths: Vec<PathBuf>,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Skip Grad-CAM saliency maps
    #[arg(long)]
    pub no_explain: bool,

    /// Class to explain instead of the predicted one, by index or label
    #[arg(long, value_name = "CLASS")]
    pub target_class: Option<String>,

    /// Write Grad-CAM overlays into this directory
    #[arg(long, value_name = "DIR")]
    pub heatmap_dir: Option<PathBuf>,

    /// Heat-map opacity in overlays (0.0-1.0)
    #[arg(long, value_parser = parse_alpha)]
    pub alpha: Option<f32>,

    /// Risk factor: uses tobacco or gutkha
    #[arg(long)]
    pub tobacco: bool,

    /// Risk factor: chews paan or betel
    #[arg(long)]
    pub paan: bool,

    /// Risk factor: smokes
    #[arg(long)]
    pub smoke: bool,

    /// Risk factor: drinks alcohol regularly
    #[arg(long)]
    pub alcohol: bool,

    /// Show progress bar
    #[arg(long)]
    pub progress: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print JSON output (only affects --format json)
    #[arg(long)]
    pub pretty: bool,

    /// Custom models directory (overrides default and config)
    #[arg(long, value_name = "DIR")]
    pub models_dir: Option<PathBuf>,

    /// Per-image timeout in seconds
    #[arg(long, value_name = "SECS", value_parser = parse_timeout)]
    pub timeout: Option<u64>,

    /// Merged config (populated by `with_config`, not from CLI).
    #[arg(skip)]
    config: Option<AppConfig>,
}

impl CheckArgs {
    /// Apply configuration file values, respecting CLI precedence.
    ///
    /// Layering priority (lowest to highest):
    /// 1. Hardcoded defaults (in accessor methods)
    /// 2. Config file values (XDG, then project-local)
    /// 3. CLI arguments (already set on self)
    ///
    /// `--no-explain` always wins; config can only disable saliency when the
    /// flag wasn't passed.
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        if !args.recursive {
            args.recursive = config.general.recursive.unwrap_or(false);
        }

        if !args.no_explain {
            if let Some(enabled) = config.explain.enabled {
                args.no_explain = !enabled;
            }
        }
        args.alpha = args.alpha.or_else(|| {
            config
                .explain
                .alpha
                .filter(|a| (0.0..=1.0).contains(a))
        });
        if args.heatmap_dir.is_none() {
            args.heatmap_dir.clone_from(&config.explain.heatmap_dir);
        }

        if args.format.is_none() {
            args.format = config
                .output
                .format
                .as_ref()
                .and_then(|s| match s.as_str() {
                    "json" => Some(OutputFormat::Json),
                    "jsonl" => Some(OutputFormat::Jsonl),
                    _ => None,
                });
        }
        if !args.pretty {
            args.pretty = config.output.pretty.unwrap_or(false);
        }
        if !args.progress {
            args.progress = config.output.progress.unwrap_or(false);
        }

        if args.models_dir.is_none() {
            args.models_dir.clone_from(&config.model.dir);
        }
        args.timeout = args
            .timeout
            .or_else(|| config.model.timeout_secs.filter(|&t| t > 0));

        // Execution and normalization are config-only
        args.config = Some(config.clone());

        args
    }

    /// Get output format with fallback to JSONL.
    fn format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }

    /// Get overlay opacity with fallback to the default.
    fn alpha(&self) -> f32 {
        self.alpha.unwrap_or(DEFAULT_ALPHA)
    }

    /// Questionnaire answers from the risk flags.
    const fn risk_factors(&self) -> RiskFactors {
        RiskFactors {
            tobacco: self.tobacco,
            paan: self.paan,
            smoking: self.smoke,
            alcohol: self.alcohol,
        }
    }

    /// Pipeline settings from the merged config.
    fn pipeline_config(&self) -> PipelineConfig {
        let config = self.config.as_ref();
        PipelineConfig {
            normalization: config
                .and_then(AppConfig::normalization)
                .unwrap_or_default(),
            execution: config.and_then(AppConfig::execution).unwrap_or_default(),
            ..PipelineConfig::default()
        }
    }

    /// Resolves `--target-class` against the model's labels.
    ///
    /// A number is taken as an index as-is; range is checked by the pipeline.
    fn target_class(&self, labels: &LabelSet) -> Result<Option<usize>> {
        let Some(target) = self.target_class.as_deref() else {
            return Ok(None);
        };
        if let Ok(index) = target.parse::<usize>() {
            return Ok(Some(index));
        }
        labels.index_of(target).map(Some).with_context(|| {
            format!(
                "--target-class '{target}' is not a model class (expected one of: {})",
                labels.names().join(", ")
            )
        })
    }

    /// Scan settings from the merged args.
    fn scan_options(&self, target_class: Option<usize>) -> ScanOptions {
        ScanOptions {
            analyze: AnalyzeOptions {
                explain: !self.no_explain,
                target_class,
            },
            risk_factors: self.risk_factors(),
            timeout: self.timeout.map(Duration::from_secs),
            overlay_alpha: self.alpha(),
        }
    }

    const fn layout(&self) -> JsonLayout {
        match self.format {
            Some(OutputFormat::Json) => JsonLayout::Array {
                pretty: self.pretty,
            },
            _ => JsonLayout::Lines,
        }
    }
}

/// Result of running the check command.
#[allow(dead_code)] // Fields exposed for programmatic use
pub struct CheckResult {
    /// Number of images processed.
    pub processed: usize,
    /// Number of images skipped.
    pub skipped: usize,
    /// Number of images with a medium or high risk finding.
    pub elevated: usize,
    /// Exit code.
    pub exit_code: ExitCode,
}

/// Run the check command.
///
/// Expects `args` to have been processed through `with_config()` first
/// to apply configuration file settings.
pub fn run(args: &CheckArgs) -> Result<CheckResult> {
    info!("Running check command on {} paths", args.paths.len());

    if args.paths.is_empty() {
        anyhow::bail!("No paths specified");
    }

    let store = ModelStore::from_override(args.models_dir.clone());
    debug!("Using models directory: {}", store.dir().display());

    let pipeline = InferencePipeline::load(&store.artifact(), args.pipeline_config())
        .with_context(|| {
            format!(
                "Failed to load model from {}. Run `oral-scan models list` to inspect it",
                store.dir().display()
            )
        })?;

    let target_class = args.target_class(pipeline.labels())?;
    if let Some(target) = target_class {
        if target >= pipeline.labels().len() {
            warn!(
                "--target-class {target} is outside the {} model classes; saliency will be unavailable",
                pipeline.labels().len()
            );
        }
    }

    let scanner = Scanner::new(Arc::new(pipeline), args.scan_options(target_class));

    // Initialize image source
    let source = FsImageSource::new(args.paths.clone(), args.recursive);
    let total = source.count_hint();

    // Determine if we should show progress
    let show_progress = !args.quiet && (args.progress || std::io::stderr().is_terminal());
    let progress_bar = ProgressBar::new(total.map(|t| t as u64), args.quiet, show_progress);

    let output = JsonOutput::stdout(args.layout());
    debug!("Output format: {:?}", args.format());

    let overlays = if args.no_explain {
        None
    } else {
        args.heatmap_dir.as_ref().map(FsOverlayStore::new)
    };

    let summary = scanner.run(
        &source,
        &output,
        &progress_bar,
        overlays.as_ref().map(|s| s as &dyn OverlayStore),
    )?;

    let exit_code = if summary.elevated > 0 {
        ExitCode::RiskFound
    } else {
        ExitCode::Success
    };

    Ok(CheckResult {
        processed: summary.processed,
        skipped: summary.skipped,
        elevated: summary.elevated,
        exit_code,
    })
}
