//! Configuration types for self-play

use hexlegion_core::RuleOptions;
use serde::{Deserialize, Serialize};

/// Probabilities the random driver uses when a choice is optional
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriverWeights {
    /// Chance of making an optional split
    pub split: f64,
    /// Chance of moving another legion once one has moved
    pub extra_move: f64,
    /// Chance of preferring a destination held by an enemy
    pub attack: f64,
    pub recruit: f64,
    pub flee: f64,
    pub concede: f64,
    pub settle: f64,
    pub summon: f64,
    pub reinforce: f64,
    pub acquire: f64,
    /// Chance of moving a creature that is already on the battleland
    pub advance: f64,
    /// Movement rolls below this take a mulligan when one is left
    pub mulligan_below: u8,
}

impl Default for DriverWeights {
    fn default() -> Self {
        Self {
            split: 0.3,
            extra_move: 0.6,
            attack: 0.5,
            recruit: 0.9,
            flee: 0.3,
            concede: 0.02,
            settle: 0.02,
            summon: 0.7,
            reinforce: 0.9,
            acquire: 0.9,
            advance: 0.8,
            mulligan_below: 3,
        }
    }
}

/// One self-play game
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SelfPlayConfig {
    pub players: usize,
    /// Seeds both the dice and the driver
    pub seed: u64,
    /// Stop once this strategic turn is passed
    pub max_turns: u32,
    /// Stop after this many commands
    pub max_commands: usize,
    pub options: RuleOptions,
    pub weights: DriverWeights,
    /// Keep every event in the record
    pub record_events: bool,
    pub check_invariants: bool,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        Self {
            players: 2,
            seed: 42,
            max_turns: 60,
            max_commands: 50_000,
            options: RuleOptions::default(),
            weights: DriverWeights::default(),
            record_events: false,
            check_invariants: true,
        }
    }
}

impl SelfPlayConfig {
    pub fn with_players(mut self, players: usize) -> Self {
        self.players = players;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_turns(mut self, turns: u32) -> Self {
        self.max_turns = turns;
        self
    }

    pub fn with_max_commands(mut self, commands: usize) -> Self {
        self.max_commands = commands;
        self
    }

    pub fn with_options(mut self, options: RuleOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_weights(mut self, weights: DriverWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Keep the full event log
    pub fn with_events(mut self, record: bool) -> Self {
        self.record_events = record;
        self
    }
}

/// Many games over consecutive seeds
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchConfig {
    pub games: usize,
    pub first_seed: u64,
    /// Whether to run games in parallel
    pub parallel: bool,
    /// Template for every game; its seed is replaced
    pub game: SelfPlayConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            games: 16,
            first_seed: 1,
            parallel: true,
            game: SelfPlayConfig::default(),
        }
    }
}

impl BatchConfig {
    pub fn new(games: usize) -> Self {
        Self {
            games,
            ..Default::default()
        }
    }

    pub fn with_first_seed(mut self, seed: u64) -> Self {
        self.first_seed = seed;
        self
    }

    pub fn with_game(mut self, game: SelfPlayConfig) -> Self {
        self.game = game;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Seeds played by this batch
    pub fn seeds(&self) -> impl Iterator<Item = u64> {
        let first = self.first_seed;
        (0..self.games as u64).map(move |i| first.wrapping_add(i))
    }
}
