//! HEXLEGION CLI - Command-line interface
//!
//! Commands:
//! - play: Run one seeded self-play game and print its events
//! - batch: Run many seeds and summarize them
//! - recruits: Recruits a legion could make in a terrain
//! - board: Dump the strategic board
//! - variant: Write the standard variant as JSON

mod batch_cmd;
mod play_cmd;
mod query_cmd;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hexlegion_core::Variant;

#[derive(Parser)]
#[command(name = "hexlegion")]
#[command(about = "HEXLEGION hex war rules engine")]
struct Cli {
    /// Variant JSON file (defaults to the standard game)
    #[arg(long, global = true, value_name = "FILE")]
    variant: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one self-play game
    Play(play_cmd::PlayArgs),
    /// Play many self-play games
    Batch(batch_cmd::BatchArgs),
    /// List recruits for a terrain and legion contents
    Recruits(query_cmd::RecruitsArgs),
    /// Dump the strategic board
    Board(query_cmd::BoardArgs),
    /// Write the standard variant JSON
    Variant(query_cmd::VariantArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play(args) => play_cmd::run(args, load_variant(cli.variant.as_deref())?),
        Commands::Batch(args) => batch_cmd::run(args, load_variant(cli.variant.as_deref())?),
        Commands::Recruits(args) => query_cmd::recruits(args, load_variant(cli.variant.as_deref())?),
        Commands::Board(args) => query_cmd::board(args, load_variant(cli.variant.as_deref())?),
        Commands::Variant(args) => query_cmd::variant(args),
    }
}

/// Standard variant unless a file is given
fn load_variant(path: Option<&Path>) -> Result<Arc<Variant>> {
    let variant = match path {
        Some(path) => {
            Variant::load(path).with_context(|| format!("Failed to load variant: {}", path.display()))?
        }
        None => Variant::standard(),
    };
    Ok(Arc::new(variant))
}
