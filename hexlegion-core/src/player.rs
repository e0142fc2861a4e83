//! Seats and their persistent state

use crate::legion::Marker;
use crate::strategic::HexLabel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Seat index
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Player color; each color owns its own marker names
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Color {
    Black,
    Blue,
    Brown,
    Gold,
    Green,
    Red,
}

impl Color {
    pub const ALL: [Color; 6] = [
        Color::Black,
        Color::Blue,
        Color::Brown,
        Color::Gold,
        Color::Green,
        Color::Red,
    ];

    /// Two-letter marker prefix
    pub fn abbrev(self) -> &'static str {
        match self {
            Color::Black => "Bk",
            Color::Blue => "Bu",
            Color::Brown => "Br",
            Color::Gold => "Gd",
            Color::Green => "Gr",
            Color::Red => "Rd",
        }
    }
}

/// Seat description handed to `Game::new`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSetup {
    pub name: String,
    pub color: Color,
}

impl PlayerSetup {
    pub fn new(name: impl Into<String>, color: Color) -> Self {
        Self { name: name.into(), color }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: Color,
    /// Lower acts first
    pub priority: u8,
    pub tower: HexLabel,
    /// Markers not currently in use
    pub markers: BTreeSet<Marker>,
    pub score: u32,
    pub movement_roll: Option<u8>,
    pub mulligans_left: u8,
    pub teleported: bool,
    pub summoned: bool,
    pub titan_dead: bool,
    pub alive: bool,
}

impl Player {
    pub fn new(id: PlayerId, setup: &PlayerSetup, tower: HexLabel, markers: BTreeSet<Marker>, mulligans: u8) -> Self {
        Self {
            id,
            name: setup.name.clone(),
            color: setup.color,
            priority: id.0,
            tower,
            markers,
            score: 0,
            movement_roll: None,
            mulligans_left: mulligans,
            teleported: false,
            summoned: false,
            titan_dead: false,
            alive: true,
        }
    }

    /// Reserve a specific marker
    pub fn take_marker(&mut self, marker: &Marker) -> bool {
        self.markers.remove(marker)
    }

    pub fn return_marker(&mut self, marker: Marker) {
        self.markers.insert(marker);
    }

    pub fn add_points(&mut self, points: u32) -> (u32, u32) {
        let before = self.score;
        self.score += points;
        (before, self.score)
    }

    /// Clear the flags that only last for one of this player's turns
    pub fn begin_turn(&mut self) {
        self.movement_roll = None;
        self.teleported = false;
        self.summoned = false;
    }
}
