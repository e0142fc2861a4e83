//! HEXLEGION Self-play - seeded random games through the public engine API
//!
//! This crate provides soak-testing infrastructure:
//! - A random driver that only issues commands the queries call legal
//! - A runner that plays one game and checks pool and height invariants
//! - Batches of seeds played in parallel with a summary
//!
//! ## Architecture
//!
//! - run_batch (orchestration)
//! - play_game (one seed)
//! - RandomDriver::choose (one command)
//! - configuration

mod batch;
mod config;
mod driver;
mod runner;

pub use batch::{play_seeds, run_batch, BatchSummary};
pub use config::{BatchConfig, DriverWeights, SelfPlayConfig};
pub use driver::RandomDriver;
pub use runner::{check_invariants, play_game, seats, GameEnd, GameRecord, SelfPlayError};
