//! Savanna CLI - train a lion to hunt an impala and watch it try
//!
//! This CLI provides:
//! - Training sessions with checkpoints and rule abstraction
//! - Step-by-step hunts with optional explanations
//! - Inspection and maintenance of saved knowledge

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "savanna")]
#[command(version, about = "Predator-prey hunt simulator with a Q-learning lion", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the predator
    Train(Box<savanna::cli::commands::train::TrainArgs>),

    /// Run one hunt with the trained predator
    Hunt(savanna::cli::commands::hunt::HuntArgs),

    /// Inspect or maintain saved knowledge
    Knowledge(savanna::cli::commands::knowledge::KnowledgeArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Train(args) => savanna::cli::commands::train::execute(*args),
        Commands::Hunt(args) => savanna::cli::commands::hunt::execute(args),
        Commands::Knowledge(args) => savanna::cli::commands::knowledge::execute(args),
    }
}
