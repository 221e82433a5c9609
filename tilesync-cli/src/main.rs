//! TileSync CLI
//!
//! Bulk-downloads Web-Mercator map tiles for a sector into a local cache.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::estimate::EstimateArgs;
use commands::sync::SyncArgs;

#[derive(Parser)]
#[command(name = "tilesync")]
#[command(version, about = "Bulk tile cache synchronization", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download every missing tile of a sector down to a target level
    Sync(SyncArgs),

    /// Estimate how much of a sector still needs downloading
    Estimate(EstimateArgs),

    /// View or change configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sync(args) => commands::sync::run(args),
        Commands::Estimate(args) => commands::estimate::run(args),
        Commands::Config(command) => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
