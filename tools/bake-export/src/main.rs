//! bake-export - scene bake tool
//!
//! Converts parsed scene descriptions (JSON) to baked scene (.bmi) and
//! geometry (.bgi) blobs

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use bake_export::{inspect, manifest, pipeline, BakeOptions};

#[derive(Parser)]
#[command(name = "bake-export")]
#[command(about = "Scene bake tool")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bake all scenes listed in a manifest
    Build {
        /// Path to bake.toml manifest
        #[arg(default_value = "bake.toml")]
        manifest: PathBuf,

        /// Output directory (overrides manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate manifest without baking
    Check {
        /// Path to bake.toml manifest
        #[arg(default_value = "bake.toml")]
        manifest: PathBuf,
    },

    /// Bake a single scene file
    Scene {
        /// Input scene description (.json)
        input: PathBuf,

        /// Output directory (default: next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip stand-alone object blobs
        #[arg(long)]
        no_objects: bool,
    },

    /// Print a summary of a baked .bmi or .bgi file
    Inspect {
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    match cli.command {
        Commands::Build { manifest, output } => {
            tracing::info!("Building scenes from {:?}", manifest);
            let config = manifest::load_manifest(&manifest)?;
            manifest::build_all(&config, output.as_deref())?;
            tracing::info!("Build complete!");
        }

        Commands::Check { manifest } => {
            tracing::info!("Checking manifest {:?}", manifest);
            let config = manifest::load_manifest(&manifest)?;
            manifest::validate(&config)?;
            tracing::info!("Manifest is valid!");
        }

        Commands::Scene {
            input,
            output,
            no_objects,
        } => {
            let output = output.unwrap_or_else(|| {
                input
                    .parent()
                    .map(PathBuf::from)
                    .unwrap_or_default()
            });
            let options = BakeOptions {
                export_standalone_objects: !no_objects,
                ..Default::default()
            };
            tracing::info!("Baking {:?} -> {:?}", input, output);
            pipeline::bake_file(&input, &output, &options)?;
            tracing::info!("Done!");
        }

        Commands::Inspect { file } => {
            println!("{}", inspect::inspect_file(&file)?);
        }
    }

    Ok(())
}
