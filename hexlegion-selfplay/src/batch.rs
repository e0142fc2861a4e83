//! Batch play - many seeds, optionally in parallel

use hexlegion_core::Variant;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::BatchConfig;
use crate::runner::{play_game, GameEnd, GameRecord, SelfPlayError};

/// Aggregate of a batch
#[derive(Clone, Debug, Default, Serialize)]
pub struct BatchSummary {
    pub games: usize,
    pub finished: usize,
    pub turn_limited: usize,
    pub command_limited: usize,
    pub stuck: usize,
    pub halted: usize,
    /// Seeds whose audit failed, with the failure
    pub invariant_failures: Vec<String>,
    /// Wins per seat index
    pub wins_by_seat: Vec<usize>,
    pub avg_turns: f32,
    pub avg_commands: f32,
    pub total_rejections: usize,
    pub total_battles: usize,
}

impl BatchSummary {
    pub fn empty(seats: usize) -> Self {
        Self {
            wins_by_seat: vec![0; seats],
            ..Default::default()
        }
    }

    /// Fold one game into the totals
    pub fn record(&mut self, result: &Result<GameRecord, SelfPlayError>) {
        self.games += 1;
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                self.invariant_failures.push(err.to_string());
                return;
            }
        };
        match &record.end {
            GameEnd::Finished => self.finished += 1,
            GameEnd::TurnLimit => self.turn_limited += 1,
            GameEnd::CommandLimit => self.command_limited += 1,
            GameEnd::Stuck => self.stuck += 1,
            GameEnd::Halted(_) => self.halted += 1,
        }
        if let Some(seat) = record.winner.and_then(|w| self.wins_by_seat.get_mut(w.0 as usize)) {
            *seat += 1;
        }

        let played = self.games - self.invariant_failures.len();
        let n = played as f32;
        self.avg_turns += (record.turns as f32 - self.avg_turns) / n;
        self.avg_commands += (record.commands as f32 - self.avg_commands) / n;
        self.total_rejections += record.rejections;
        self.total_battles += record.battles;
    }

    pub fn finish_rate(&self) -> f32 {
        if self.games == 0 {
            0.0
        } else {
            self.finished as f32 / self.games as f32
        }
    }

    /// No audit failures and no engine halts
    pub fn is_clean(&self) -> bool {
        self.invariant_failures.is_empty() && self.halted == 0
    }
}

/// Play every seed of the batch and keep the individual results
pub fn play_seeds(variant: Arc<Variant>, config: &BatchConfig) -> Vec<Result<GameRecord, SelfPlayError>> {
    let seeds: Vec<u64> = config.seeds().collect();
    let play = |seed: u64| {
        let game = config.game.clone().with_seed(seed);
        let result = play_game(Arc::clone(&variant), &game);
        if let Err(err) = &result {
            error!(seed, %err, "self-play game failed");
        }
        result
    };
    if config.parallel {
        seeds.into_par_iter().map(play).collect()
    } else {
        seeds.into_iter().map(play).collect()
    }
}

/// Play a batch and summarize it
pub fn run_batch(variant: Arc<Variant>, config: &BatchConfig) -> BatchSummary {
    let mut summary = BatchSummary::empty(config.game.players);
    for result in play_seeds(variant, config) {
        summary.record(&result);
    }
    info!(
        games = summary.games,
        finished = summary.finished,
        failures = summary.invariant_failures.len(),
        halted = summary.halted,
        "batch done"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexlegion_core::PlayerId;

    fn record(end: GameEnd, winner: Option<u8>, turns: u32) -> GameRecord {
        GameRecord {
            seed: 0,
            end,
            winner: winner.map(PlayerId),
            turns,
            commands: 10,
            rejections: 1,
            battles: 2,
            scores: vec![0, 0],
            finish_order: Vec::new(),
            events: Vec::new(),
        }
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = BatchSummary::empty(2);
        summary.record(&Ok(record(GameEnd::Finished, Some(1), 10)));
        summary.record(&Ok(record(GameEnd::TurnLimit, None, 20)));
        summary.record(&Ok(record(GameEnd::Halted("bad".into()), None, 3)));

        assert_eq!(summary.games, 3);
        assert_eq!(summary.finished, 1);
        assert_eq!(summary.turn_limited, 1);
        assert_eq!(summary.halted, 1);
        assert_eq!(summary.wins_by_seat, vec![0, 1]);
        assert_eq!(summary.avg_turns, 11.0);
        assert_eq!(summary.total_battles, 6);
        assert!(!summary.is_clean());
    }

    #[test]
    fn test_empty_summary_rates() {
        let summary = BatchSummary::empty(3);
        assert_eq!(summary.finish_rate(), 0.0);
        assert!(summary.is_clean());
    }

    #[test]
    fn test_sequential_batch_plays_every_seed() {
        let config = BatchConfig::new(2)
            .with_first_seed(5)
            .sequential()
            .with_game(crate::SelfPlayConfig::default().with_max_turns(3));
        let results = play_seeds(Arc::new(Variant::standard()), &config);
        let seeds: Vec<u64> = results.iter().filter_map(|r| r.as_ref().ok()).map(|r| r.seed).collect();
        assert_eq!(seeds, vec![5, 6]);
    }
}
