//! Play command - one seeded self-play game
//!
//! ## Architecture
//!
//! - Level 1: run() - orchestration
//! - Level 2: build_config(), report_game()
//! - Level 3: formatting utilities

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use hexlegion_core::{GameEvent, RuleOptions, Variant};
use hexlegion_selfplay::{play_game, GameRecord, SelfPlayConfig};

// ============================================================================
// COMMAND ARGUMENTS
// ============================================================================

#[derive(Args)]
pub struct PlayArgs {
    /// Seed for the dice and the random players
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Number of players (2-6)
    #[arg(long, default_value = "2")]
    pub players: usize,

    /// Stop after this strategic turn
    #[arg(long, default_value = "60")]
    pub max_turns: u32,

    /// Battle turn after which the attacker loses on time
    #[arg(long, default_value = "7")]
    pub battle_turns: u8,

    /// Output the full record as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run play command
pub fn run(args: PlayArgs, variant: Arc<Variant>) -> Result<()> {
    let config = build_config(&args);
    tracing::info!(seed = args.seed, players = args.players, "starting self-play game");

    let record = play_game(variant, &config).with_context(|| format!("Game with seed {} failed", args.seed))?;

    report_game(&record, args.json)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn build_config(args: &PlayArgs) -> SelfPlayConfig {
    SelfPlayConfig::default()
        .with_players(args.players)
        .with_seed(args.seed)
        .with_max_turns(args.max_turns)
        .with_options(RuleOptions::default().with_battle_turn_limit(args.battle_turns))
        .with_events(true)
}

fn report_game(record: &GameRecord, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }

    for event in &record.events {
        println!("{}", describe(event));
    }
    println!("\n=== Game Result ===");
    println!("Seed:      {}", record.seed);
    println!("End:       {:?}", record.end);
    match record.winner {
        Some(winner) => println!("Winner:    {winner}"),
        None => println!("Winner:    none"),
    }
    println!("Turns:     {}", record.turns);
    println!("Commands:  {} ({} rejected)", record.commands, record.rejections);
    println!("Battles:   {}", record.battles);
    for (seat, score) in record.scores.iter().enumerate() {
        println!("P{seat} score:  {score}");
    }
    Ok(())
}

// ============================================================================
// LEVEL 3 - UTILITIES
// ============================================================================

/// One line per event; the rarer ones fall back to debug output
fn describe(event: &GameEvent) -> String {
    match event {
        GameEvent::PhaseChanged { player, turn, phase } => format!("-- turn {turn}: {player} {phase:?}"),
        GameEvent::LegionMoved { marker, from, to, teleport, .. } => match teleport {
            Some(kind) => format!("{marker} teleports {from} -> {to} ({kind:?})"),
            None => format!("{marker} moves {from} -> {to}"),
        },
        GameEvent::BattleStarted { hex, .. } => format!("battle at {hex}"),
        GameEvent::BattleEnded { hex, outcome, turn } => format!("battle at {hex} ends on turn {turn}: {outcome:?}"),
        GameEvent::LegionEliminated { marker, owner, fate, points, .. } => {
            format!("{marker} of {owner} eliminated ({fate:?}, {points} points)")
        }
        GameEvent::PlayerEliminated { player } => format!("{player} eliminated"),
        GameEvent::GameOver { winner: Some(w), .. } => format!("game over, {w} wins"),
        GameEvent::GameOver { winner: None, .. } => "game over, no winner".to_string(),
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexlegion_core::PlayerId;

    #[test]
    fn test_config_from_args() {
        let args = PlayArgs { seed: 7, players: 3, max_turns: 5, battle_turns: 3, json: false };
        let config = build_config(&args);
        assert_eq!(config.seed, 7);
        assert_eq!(config.players, 3);
        assert_eq!(config.options.battle_turn_limit, 3);
        assert!(config.record_events);
    }

    #[test]
    fn test_describe_game_over() {
        let event = GameEvent::GameOver { winner: Some(PlayerId(1)), finish_order: vec![] };
        assert_eq!(describe(&event), "game over, P1 wins");
    }
}
