//! Battlelands and everything computed on them

pub mod board;
pub mod combat;
pub mod los;
pub mod movement;

pub use board::{BattleSide, BattlelandSpec, Hazard, Hexside, HexTerrain, TacticalBoard};
pub use combat::{melee_profile, rangestrike_profile, Combatant, StrikeProfile};
pub use los::{bramble_count, clear_sight, is_los_blocked, SightState};
pub use movement::{adjacent_enemies, is_engaged, BattleOccupancy, Mover};
