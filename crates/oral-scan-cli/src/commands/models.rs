//! Models command - inspect the installed model.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use oral_scan_adapters::ModelStore;
use oral_scan_core::{InferencePipeline, PipelineConfig};

use crate::config::AppConfig;

/// Arguments for the models command
#[derive(Args)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,

    /// Custom models directory (overrides default and config)
    #[arg(long, value_name = "DIR", global = true)]
    pub models_dir: Option<PathBuf>,
}

/// Models subcommands
#[derive(Subcommand)]
pub enum ModelsCommand {
    /// List model files with size and SHA-256
    List,
    /// Print model directory path
    Path,
    /// Load the model and print its classes
    Verify,
}

/// Run the models command.
pub fn run(args: &ModelsArgs, config: &AppConfig) -> Result<()> {
    let store = ModelStore::from_override(
        args.models_dir
            .clone()
            .or_else(|| config.model.dir.clone()),
    );

    match args.command {
        ModelsCommand::List => list_models(&store),
        ModelsCommand::Path => {
            println!("{}", store.dir().display());
            Ok(())
        }
        ModelsCommand::Verify => verify_model(&store, config),
    }
}

fn list_models(store: &ModelStore) -> Result<()> {
    let files = store.list()?;

    println!("Models directory: {}", store.dir().display());
    println!();

    for file in &files {
        let filename = file
            .path
            .file_name()
            .map_or_else(|| file.path.to_string_lossy(), |n| n.to_string_lossy());
        match (file.size, &file.sha256) {
            (Some(size), Some(hash)) => {
                println!("  ✓ {} ({filename}, {size} bytes)", file.name);
                println!("      sha256 {hash}");
            }
            _ => println!("  ✗ {} ({filename})", file.name),
        }
    }

    println!();
    let installed = files.iter().filter(|f| f.is_present()).count();
    println!("{installed}/{} files present", files.len());
    if !store.is_installed() {
        println!(
            "Model not installed: copy the weights and class names into {}",
            store.dir().display()
        );
    }

    Ok(())
}

fn verify_model(store: &ModelStore, config: &AppConfig) -> Result<()> {
    let pipeline_config = PipelineConfig {
        normalization: config.normalization().unwrap_or_default(),
        execution: config.execution().unwrap_or_default(),
        ..PipelineConfig::default()
    };
    let pipeline = InferencePipeline::load(&store.artifact(), pipeline_config)?;

    println!("Model OK: {}", store.dir().display());
    println!("Device: {:?}", pipeline.device());
    for (index, name) in pipeline.labels().names().iter().enumerate() {
        println!("  {index}: {name}");
    }

    Ok(())
}
