//! Recon Application
//!
//! Command-line front end for preparing scenes, reconstructing them with the
//! external engine, and picking the best reconstruction per scene.
//!
//! Subcommands:
//! - `preprocess`: resize and crop a curated frame selection
//! - `reconstruct`: run the standard or robust engine pipeline on scenes
//! - `combine`: keep the better of two result roots per scene
//! - `analyze`: compare a robust result root against a baseline

mod commands;
mod error;
mod report;

use clap::{Parser, Subcommand};
use commands::{AnalyzeArgs, CombineArgs, PreprocessArgs, ReconstructArgs};
use error::AppError;
use tracing_subscriber::EnvFilter;

/// Recon - Scene preprocessing and sparse reconstruction
#[derive(Parser, Debug)]
#[command(name = "recon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resize and crop selected frames into the reconstruction layout
    Preprocess(PreprocessArgs),
    /// Reconstruct one scene, or every scene under the source path
    Reconstruct(ReconstructArgs),
    /// Copy the better of two reconstructions per scene into one root
    Combine(CombineArgs),
    /// Compare robust results against a baseline
    Analyze(AnalyzeArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    match try_main() {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.exit_code());
        }
    }
}

fn try_main() -> Result<i32, AppError> {
    let cli = Cli::parse();
    match cli.command {
        Command::Preprocess(args) => commands::preprocess(&args),
        Command::Reconstruct(args) => commands::reconstruct(&args),
        Command::Combine(args) => commands::combine(&args),
        Command::Analyze(args) => commands::analyze(&args),
    }
}
