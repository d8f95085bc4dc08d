//! qpwa-studio CLI - Quantum PWA project scaffolding.
//!
//! # Usage
//!
//! ```bash
//! # Scaffold a project into ./my-app
//! qpwa-studio generate "Quantum Notes" --short-name Notes --out ./my-app
//!
//! # Print the manifest for a config without writing anything
//! qpwa-studio manifest "Quantum Notes" --short-name Notes
//!
//! # Print the .qpwa file-type configuration
//! qpwa-studio filetype
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use qpwa_studio::assist::{AssistanceFacade, OfflineOracle};
use qpwa_studio::config::{AssistanceOptions, GenerationConfig, Theme};
use qpwa_studio::registry::CapabilityRegistry;
use qpwa_studio::steps::default_pipeline;
use qpwa_studio::templates::{FileTypeConfig, Manifest};
use qpwa_studio::writer::FsWriter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "qpwa-studio")]
#[command(about = "Quantum PWA project scaffolding")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scaffold a Quantum PWA project
    Generate {
        /// Full project name
        name: String,

        /// Short name used by the manifest
        #[arg(long)]
        short_name: Option<String>,

        /// Target directory for generated files
        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// Feature tags recorded in the project
        #[arg(long)]
        feature: Vec<String>,

        /// Background color
        #[arg(long, default_value = "#ffffff")]
        background: String,

        /// Theme color
        #[arg(long, default_value = "#000000")]
        theme: String,

        /// Disable all assistance surfaces
        #[arg(long)]
        no_assistance: bool,
    },

    /// Print the manifest for a config without writing anything
    Manifest {
        /// Full project name
        name: String,

        /// Short name used by the manifest
        #[arg(long)]
        short_name: Option<String>,
    },

    /// Print the .qpwa file-type configuration
    Filetype,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Generate {
            name,
            short_name,
            out,
            feature,
            background,
            theme,
            no_assistance,
        } => {
            let short_name = short_name.unwrap_or_else(|| name.clone());
            let mut config = GenerationConfig::new(name, short_name, out)
                .with_features(feature)
                .with_theme(Theme {
                    background,
                    primary: theme,
                });
            if no_assistance {
                config = config.with_assistance(AssistanceOptions {
                    inline: false,
                    suggestions: false,
                    documentation: false,
                    testing: false,
                    ..AssistanceOptions::default()
                });
            }
            let config = Arc::new(config);

            let writer = Arc::new(FsWriter::new(&config.project_root));
            let registry = Arc::new(CapabilityRegistry::new());
            let facade = Arc::new(AssistanceFacade::new(
                Arc::new(OfflineOracle),
                config.oracle.clone(),
            ));

            let pipeline = default_pipeline(Arc::clone(&config), writer, registry, facade);
            let report = pipeline
                .run(&config)
                .await
                .context("project generation failed")?;

            tracing::info!(steps = report.executed.len(), "project generated");
            for step in &report.executed {
                println!("  {}", step);
            }
        }
        Command::Manifest { name, short_name } => {
            let short_name = short_name.unwrap_or_else(|| name.clone());
            let config = GenerationConfig::new(name, short_name, ".");
            let manifest = Manifest::from_config(&config);
            println!("{}", manifest.to_json()?);
        }
        Command::Filetype => {
            println!("{}", FileTypeConfig::standard().to_json()?);
        }
    }

    Ok(())
}
