//! Tunable rule constants
//!
//! Everything here has a standard value; variants of the game adjust them
//! without touching the engine.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleOptions {
    /// Tallest a legion may grow (turn-1 starting legions excepted)
    pub max_legion_height: usize,
    /// Battle turn after which the attacker loses on time
    pub battle_turn_limit: u8,
    /// Score a titan's owner needs before the titan may teleport
    pub titan_teleport_score: u32,
    /// Score step that grants one summonable lord
    pub angel_step: u32,
    /// Score step that upgrades one grant to the best summonable lord
    pub archangel_step: u32,
    /// Score per point of extra titan power
    pub titan_points_per_power: u32,
    /// Mulligans each player gets on turn 1
    pub mulligans: u8,
    /// Battle turn on which the defender may reinforce
    pub reinforce_turn: u8,
    /// Movement roll required for either teleport
    pub teleport_roll: u8,
}

impl Default for RuleOptions {
    fn default() -> Self {
        Self {
            max_legion_height: 7,
            battle_turn_limit: 7,
            titan_teleport_score: 400,
            angel_step: 100,
            archangel_step: 500,
            titan_points_per_power: 100,
            mulligans: 1,
            reinforce_turn: 4,
            teleport_roll: 6,
        }
    }
}

impl RuleOptions {
    /// Set the battle turn limit
    pub fn with_battle_turn_limit(mut self, turns: u8) -> Self {
        self.battle_turn_limit = turns;
        self
    }

    /// Set the score needed for titan teleport
    pub fn with_titan_teleport_score(mut self, score: u32) -> Self {
        self.titan_teleport_score = score;
        self
    }

    pub fn with_mulligans(mut self, mulligans: u8) -> Self {
        self.mulligans = mulligans;
        self
    }

    pub fn with_max_legion_height(mut self, height: usize) -> Self {
        self.max_legion_height = height;
        self
    }

    pub fn with_acquisition_steps(mut self, angel: u32, archangel: u32) -> Self {
        self.angel_step = angel;
        self.archangel_step = archangel;
        self
    }
}
