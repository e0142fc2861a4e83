//! Play one seeded game to completion and audit it as it goes

use crate::config::SelfPlayConfig;
use crate::driver::RandomDriver;
use hexlegion_core::{
    Color, EngineError, Game, GameEvent, PlayerId, PlayerSetup, SeededDice, SetupError, SpeciesId, Variant,
};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum SelfPlayError {
    #[error("game setup failed: {0}")]
    Setup(#[from] SetupError),

    #[error("seed {seed}: invariant broken after {command}: {message}")]
    Invariant { seed: u64, command: String, message: String },
}

/// Why a game stopped
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEnd {
    Finished,
    TurnLimit,
    CommandLimit,
    /// Neither the chosen command nor its fallback was accepted
    Stuck,
    /// The engine halted on a defect
    Halted(String),
}

/// Outcome and statistics of one game
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameRecord {
    pub seed: u64,
    pub end: GameEnd,
    pub winner: Option<PlayerId>,
    pub turns: u32,
    pub commands: usize,
    pub rejections: usize,
    pub battles: usize,
    pub scores: Vec<u32>,
    pub finish_order: Vec<Vec<PlayerId>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<GameEvent>,
}

impl GameRecord {
    pub fn finished(&self) -> bool {
        self.end == GameEnd::Finished
    }
}

/// Seats named bot0, bot1, ... in color order
pub fn seats(players: usize) -> Vec<PlayerSetup> {
    Color::ALL
        .iter()
        .take(players)
        .enumerate()
        .map(|(i, &color)| PlayerSetup::new(format!("bot{i}"), color))
        .collect()
}

/// Play a single game with seeded dice and a seeded random driver
pub fn play_game(variant: Arc<Variant>, config: &SelfPlayConfig) -> Result<GameRecord, SelfPlayError> {
    let mut game = Game::new(
        variant,
        config.options.clone(),
        &seats(config.players),
        Box::new(SeededDice::new(config.seed)),
    )?;
    let mut driver = RandomDriver::new(config.seed, config.weights);
    let mut events = Vec::new();
    let mut commands = 0;
    let mut rejections = 0;
    let mut battles = 0;

    let end = loop {
        if game.is_over() {
            break GameEnd::Finished;
        }
        if let Some(reason) = game.halted() {
            break GameEnd::Halted(reason.to_string());
        }
        if game.turn() > config.max_turns {
            break GameEnd::TurnLimit;
        }
        if commands >= config.max_commands {
            break GameEnd::CommandLimit;
        }
        let Some((player, command)) = driver.choose(&game) else {
            break GameEnd::Stuck;
        };

        let name = command.name();
        let applied = match game.apply_and_settle(player, command.clone()) {
            Ok(new) => Some(new),
            Err(EngineError::Illegal(reason)) => {
                rejections += 1;
                warn!(seed = config.seed, %player, command = name, %reason, "driver command rejected");
                match driver.fallback(&game) {
                    Some((p, fallback)) if fallback != command => game.apply_and_settle(p, fallback).ok(),
                    _ => None,
                }
            }
            Err(err) => {
                debug!(seed = config.seed, %err, "engine stopped");
                continue;
            }
        };
        let Some(new) = applied else {
            break game.halted().map_or(GameEnd::Stuck, |r| GameEnd::Halted(r.to_string()));
        };
        commands += 1;

        battles += new.iter().filter(|e| matches!(e, GameEvent::BattleStarted { .. })).count();
        if config.record_events {
            events.extend(new);
        }
        if config.check_invariants {
            check_invariants(&game).map_err(|message| SelfPlayError::Invariant {
                seed: config.seed,
                command: name.to_string(),
                message,
            })?;
        }
    };

    info!(seed = config.seed, ?end, turns = game.turn(), commands, rejections, "self-play game done");
    Ok(GameRecord {
        seed: config.seed,
        end,
        winner: game.winner(),
        turns: game.turn(),
        commands,
        rejections,
        battles,
        scores: game.players().iter().map(|p| p.score).collect(),
        finish_order: game.finish_order().to_vec(),
        events,
    })
}

/// Audit state the engine must never break.
///
/// Every species keeps `remaining + in play + dead == max`, no legion grows
/// past its cap (one extra allowed for starting legions) and each living
/// player holds at most one titan.
pub fn check_invariants(game: &Game) -> Result<(), String> {
    let table = &game.variant().species;
    let cap = game.options().max_legion_height + 1;

    let mut held: FxHashMap<SpeciesId, usize> = FxHashMap::default();
    for legion in game.legions() {
        if legion.height() > cap {
            return Err(format!("legion {} is {} high", legion.marker, legion.height()));
        }
        for creature in &legion.creatures {
            *held.entry(creature.species).or_default() += 1;
        }
    }

    for (id, species) in table.iter() {
        let Some(entry) = game.pool().entry(id) else {
            return Err(format!("pool does not track {}", species.name));
        };
        let in_play = held.get(&id).copied().unwrap_or(0);
        let total = entry.remaining as usize + entry.dead as usize + in_play;
        if total != entry.max as usize {
            return Err(format!(
                "{}: {} remaining + {} dead + {} in play != {}",
                species.name, entry.remaining, entry.dead, in_play, entry.max
            ));
        }
    }

    for player in game.players().iter().filter(|p| p.alive) {
        let titans: usize = game
            .legions_of(player.id)
            .iter()
            .map(|l| l.creatures.iter().filter(|c| table.is_titan(c.species)).count())
            .sum();
        if titans > 1 {
            return Err(format!("{} holds {titans} titans", player.name));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seats_have_distinct_colors() {
        let seats = seats(4);
        assert_eq!(seats.len(), 4);
        assert_eq!(seats[2].name, "bot2");
        assert_ne!(seats[0].color, seats[1].color);
    }

    #[test]
    fn test_fresh_game_passes_audit() {
        let game = Game::new(
            Arc::new(Variant::standard()),
            Default::default(),
            &seats(3),
            Box::new(SeededDice::new(1)),
        )
        .unwrap();
        assert_eq!(check_invariants(&game), Ok(()));
    }

    #[test]
    fn test_bad_player_count_is_setup_error() {
        let config = SelfPlayConfig::default().with_players(1);
        let err = play_game(Arc::new(Variant::standard()), &config).unwrap_err();
        assert!(matches!(err, SelfPlayError::Setup(_)));
    }

    #[test]
    fn test_same_seed_same_game() {
        let variant = Arc::new(Variant::standard());
        let config = SelfPlayConfig::default().with_seed(3).with_max_turns(4);
        let a = play_game(Arc::clone(&variant), &config).unwrap();
        let b = play_game(variant, &config).unwrap();
        assert_eq!(a.commands, b.commands);
        assert_eq!(a.scores, b.scores);
        assert_eq!(a.end, b.end);
    }

    #[test]
    fn test_events_recorded_on_request() {
        let config = SelfPlayConfig::default().with_seed(8).with_max_turns(2).with_events(true);
        let record = play_game(Arc::new(Variant::standard()), &config).unwrap();
        assert!(matches!(record.events.first(), Some(GameEvent::LegionSplit { .. })));
        assert!(record.commands > 0);
    }
}
