//! CLI command definitions and handlers.

pub mod check;
pub mod models;

use clap::{Parser, Subcommand};

/// Oral scan - screen mouth photographs for common oral conditions
#[derive(Parser)]
#[command(name = "oral-scan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Shared check arguments (paths, saliency, risk factors).
    #[command(flatten)]
    pub check: check::CheckArgs,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Classify images and explain the predictions
    Check(check::CheckArgs),
    /// Inspect the installed model
    Models(models::ModelsArgs),
}

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Every finding is low risk.
    Success,
    /// At least one finding is medium or high risk.
    RiskFound,
    /// The command failed.
    Error,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        match code {
            ExitCode::Success => Self::SUCCESS,
            ExitCode::RiskFound => Self::from(1),
            ExitCode::Error => Self::from(2),
        }
    }
}
