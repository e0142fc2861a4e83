//! HEXLEGION Core - rules engine for a Titan-style hex war game
//!
//! This crate provides the authoritative game logic:
//! - Strategic board movement, teleports and engagements
//! - Legions, splitting, recruiting and the shared creature pool
//! - Tactical battles with terrain, line of sight, strikes and carries
//! - Scoring, angel acquisition and player elimination
//!
//! The engine is a synchronous state machine. Callers issue a `Command`,
//! receive the `GameEvent`s it caused, and call `Game::settle` afterwards.

pub mod command;
pub mod creature;
pub mod dice;
pub mod error;
pub mod event;
pub mod game;
pub mod hex;
pub mod legion;
pub mod options;
pub mod player;
pub mod pool;
pub mod recruit;
pub mod species;
pub mod strategic;
pub mod tactical;
pub mod variant;

// Re-exports for convenient access
pub use command::Command;
pub use creature::{CreatureId, CreatureInstance, Nativity};
pub use dice::{Dice, ScriptedDice, SeededDice};
pub use error::{EngineError, PoolError, Rejection, SetupError, VariantError};
pub use event::{BattleOutcome, GameEvent, LegionFate};
pub use game::battle::{Battle, BattlePhase, BattleUnit};
pub use game::engagement::{Engagement, EngagementStage};
pub use game::{Game, Phase};
pub use hex::Hex;
pub use legion::{Legion, Marker};
pub use options::RuleOptions;
pub use player::{Color, Player, PlayerId, PlayerSetup};
pub use pool::CreaturePool;
pub use recruit::RecruitOption;
pub use species::{Species, SpeciesId, SpeciesTable};
pub use strategic::{EntrySide, HexLabel, LegalMove, StrategicBoard, Teleport, Terrain};
pub use tactical::board::{BattleSide, TacticalBoard};
pub use tactical::combat::StrikeProfile;
pub use variant::Variant;
