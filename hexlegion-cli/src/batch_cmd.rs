//! Batch command - many seeded self-play games
//!
//! ## Architecture
//!
//! - Level 1: run() - orchestration
//! - Level 2: build_config(), report_summary()

use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Result};
use clap::Args;

use hexlegion_core::{RuleOptions, Variant};
use hexlegion_selfplay::{run_batch, BatchConfig, BatchSummary, SelfPlayConfig};

// ============================================================================
// COMMAND ARGUMENTS
// ============================================================================

#[derive(Args)]
pub struct BatchArgs {
    /// Number of games
    #[arg(long, default_value = "16")]
    pub games: usize,

    /// Seed of the first game; the rest follow consecutively
    #[arg(long, default_value = "1")]
    pub first_seed: u64,

    /// Number of players (2-6)
    #[arg(long, default_value = "2")]
    pub players: usize,

    /// Stop each game after this strategic turn
    #[arg(long, default_value = "60")]
    pub max_turns: u32,

    /// Play the games one after another
    #[arg(long)]
    pub sequential: bool,

    /// Output the summary as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run batch command; fails if any game broke an invariant or halted
pub fn run(args: BatchArgs, variant: Arc<Variant>) -> Result<()> {
    let config = build_config(&args);
    tracing::info!(
        games = args.games,
        first_seed = args.first_seed,
        parallel = config.parallel,
        "starting self-play batch"
    );

    let start = Instant::now();
    let summary = run_batch(variant, &config);
    let elapsed = start.elapsed();

    report_summary(&summary, args.json, elapsed.as_secs_f64())?;

    if !summary.is_clean() {
        bail!(
            "{} invariant failures and {} halted games",
            summary.invariant_failures.len(),
            summary.halted
        );
    }
    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn build_config(args: &BatchArgs) -> BatchConfig {
    let game = SelfPlayConfig::default()
        .with_players(args.players)
        .with_max_turns(args.max_turns)
        .with_options(RuleOptions::default());
    let config = BatchConfig::new(args.games).with_first_seed(args.first_seed).with_game(game);
    if args.sequential {
        config.sequential()
    } else {
        config
    }
}

fn report_summary(summary: &BatchSummary, json: bool, seconds: f64) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!("\n=== Batch Results ===");
    println!("Games:          {} in {:.1}s", summary.games, seconds);
    println!("Finished:       {} ({:.1}%)", summary.finished, summary.finish_rate() * 100.0);
    println!("Turn limit:     {}", summary.turn_limited);
    println!("Command limit:  {}", summary.command_limited);
    println!("Stuck:          {}", summary.stuck);
    println!("Halted:         {}", summary.halted);
    println!("Avg turns:      {:.1}", summary.avg_turns);
    println!("Avg commands:   {:.1}", summary.avg_commands);
    println!("Battles:        {}", summary.total_battles);
    println!("Rejections:     {}", summary.total_rejections);
    for (seat, wins) in summary.wins_by_seat.iter().enumerate() {
        println!("P{seat} wins:        {wins}");
    }
    for failure in &summary.invariant_failures {
        println!("FAILED: {failure}");
    }
    Ok(())
}
