//! Game - the authoritative match state machine
//!
//! Strategic phases run Split -> Move -> Fight -> Muster for each player in
//! seat order. During Fight, engagements are resolved one at a time and may
//! run a battle. Every command is validated before anything changes and
//! returns the events it caused; `settle` closes finished engagements,
//! eliminates players and detects the end of the game.

pub mod battle;
pub mod engagement;
pub mod queries;
pub mod scoring;
pub mod turn;

use crate::command::Command;
use crate::creature::{creature_points, effective_power, CreatureId, CreatureInstance, Nativity};
use crate::dice::{shuffle, Dice};
use crate::error::{EngineError, Rejection, SetupError};
use crate::event::GameEvent;
use crate::legion::{Legion, Marker};
use crate::options::RuleOptions;
use crate::player::{Color, Player, PlayerId, PlayerSetup};
use crate::pool::CreaturePool;
use crate::species::SpeciesId;
use crate::strategic::{HexLabel, Occupancy, StrategicBoard};
use crate::variant::Variant;
use battle::Battle;
use engagement::{Engagement, EngagementStage};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Strategic phase of the active player's turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Split,
    Move,
    Fight,
    Muster,
    GameOver,
}

pub struct Game {
    variant: Arc<Variant>,
    options: RuleOptions,
    board: StrategicBoard,
    nativity: Nativity,
    dice: Box<dyn Dice>,
    pool: CreaturePool,
    players: Vec<Player>,
    legions: BTreeMap<Marker, Legion>,
    turn: u32,
    active: PlayerId,
    phase: Phase,
    engagement: Option<Engagement>,
    battle: Option<Battle>,
    finish_order: Vec<Vec<PlayerId>>,
    next_creature: CreatureId,
    halted: Option<String>,
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("turn", &self.turn)
            .field("active", &self.active)
            .field("phase", &self.phase)
            .field("legions", &self.legions.len())
            .field("engagement", &self.engagement)
            .field("halted", &self.halted)
            .finish()
    }
}

impl Game {
    /// Seat the players, each with a starting legion in a shuffled tower
    pub fn new(
        variant: Arc<Variant>,
        options: RuleOptions,
        seats: &[PlayerSetup],
        mut dice: Box<dyn Dice>,
    ) -> Result<Self, SetupError> {
        let board = variant.strategic_board()?;
        let mut towers = board.towers();
        let max = towers.len().min(Color::ALL.len());
        if seats.len() < 2 || seats.len() > max {
            return Err(SetupError::PlayerCount { got: seats.len(), max });
        }
        for (i, seat) in seats.iter().enumerate() {
            if seats[..i].iter().any(|s| s.color == seat.color) {
                return Err(SetupError::DuplicateColor(seat.color));
            }
        }

        shuffle(&mut towers, dice.as_mut());
        let starting = variant.starting_species()?;
        let mut pool = CreaturePool::new(&variant.species, seats.len());
        let mut next_creature: CreatureId = 1;
        let mut players = Vec::with_capacity(seats.len());
        let mut legions = BTreeMap::new();

        for (i, seat) in seats.iter().enumerate() {
            let id = PlayerId(i as u8);
            let mut markers: BTreeSet<Marker> =
                variant.markers_for(seat.color).iter().map(Marker::new).collect();
            let Some(first) = markers.pop_first() else {
                return Err(SetupError::NoMarkers(seat.color));
            };
            let tower = towers[i];
            let mut creatures = Vec::with_capacity(starting.len());
            for &species in &starting {
                pool.take_one(species)?;
                creatures.push(CreatureInstance::new(next_creature, species));
                next_creature += 1;
            }
            info!(player = %id, name = %seat.name, %tower, marker = %first, "seated");
            legions.insert(first.clone(), Legion::new(first, id, tower, creatures));
            players.push(Player::new(id, seat, tower, markers, options.mulligans));
        }

        let nativity = variant.nativity();
        Ok(Self {
            variant,
            options,
            board,
            nativity,
            dice,
            pool,
            players,
            legions,
            turn: 1,
            active: PlayerId(0),
            phase: Phase::Split,
            engagement: None,
            battle: None,
            finish_order: Vec::new(),
            next_creature,
            halted: None,
        })
    }

    // ========================================================================
    // COMMAND DISPATCH
    // ========================================================================

    /// Validate and apply one command from `player`
    pub fn apply(&mut self, player: PlayerId, command: Command) -> Result<Vec<GameEvent>, EngineError> {
        if let Some(reason) = &self.halted {
            return Err(EngineError::Halted(reason.clone()));
        }
        if self.phase == Phase::GameOver {
            return Err(Rejection::GameOver.into());
        }
        if !self.player(player).map_or(false, |p| p.alive) {
            warn!(%player, "command from unknown or eliminated player ignored");
            return Ok(Vec::new());
        }

        let name = command.name();
        let result = match command {
            Command::Split { parent, child, creatures } => self.split(player, parent, child, creatures),
            Command::UndoSplit { child } => self.undo_split(player, child),
            Command::DoneSplits => self.done_splits(player),
            Command::TakeMulligan => self.take_mulligan(player),
            Command::MoveLegion { marker, to, entry_side, teleport } => {
                self.move_legion(player, marker, to, entry_side, teleport)
            }
            Command::UndoMove { marker } => self.undo_move(player, marker),
            Command::DoneMoves => self.done_moves(player),
            Command::ResolveEngagement { hex } => self.resolve_engagement(player, hex),
            Command::Flee => self.flee(player),
            Command::DeclineFlee => self.decline_flee(player),
            Command::Concede { marker } => self.concede(player, marker),
            Command::SettleMutually => self.settle_mutually(player),
            Command::Fight => self.fight(player),
            Command::MoveCreature { creature, to } => self.move_creature(player, creature, to),
            Command::UndoCreatureMove { creature } => self.undo_creature_move(player, creature),
            Command::DoneManeuvers => self.done_maneuvers(player),
            Command::Strike { striker, target } => self.strike(player, striker, target),
            Command::ApplyCarry { target } => self.apply_carry(player, target),
            Command::DoneStrikes => self.done_strikes(player),
            Command::SummonAngel { donor, species } => self.summon_angel(player, donor, species),
            Command::UndoSummon => self.undo_summon(player),
            Command::DeclineSummon => self.decline_summon(player),
            Command::Reinforce { recruit, recruiters } => self.reinforce(player, recruit, recruiters),
            Command::DeclineReinforce => self.decline_reinforce(player),
            Command::AcquireAngels { marker, species } => self.acquire_angels(player, marker, species),
            Command::DeclineAcquire { marker } => self.decline_acquire(player, marker),
            Command::Recruit { marker, recruit, recruiters } => self.recruit(player, marker, recruit, recruiters),
            Command::UndoRecruit { marker } => self.undo_recruit(player, marker),
            Command::DoneRecruits => self.done_recruits(player),
        };

        match &result {
            Ok(events) => debug!(%player, command = name, events = events.len(), "applied"),
            Err(EngineError::Illegal(reason)) => debug!(%player, command = name, %reason, "rejected"),
            Err(_) => {}
        }
        result
    }

    /// Apply a command and settle afterwards
    pub fn apply_and_settle(&mut self, player: PlayerId, command: Command) -> Result<Vec<GameEvent>, EngineError> {
        let mut events = self.apply(player, command)?;
        events.extend(self.settle());
        Ok(events)
    }

    // ========================================================================
    // SETTLE
    // ========================================================================

    /// Finish whatever bookkeeping no longer waits on a decision.
    ///
    /// Closes a resolved engagement once its summon, reinforcement and
    /// acquisition choices are all made, eliminates players left without
    /// legions or titan, ends the game, and moves Fight on to Muster when
    /// nothing is left to fight. Calling it again changes nothing.
    pub fn settle(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.halted.is_some() || self.phase == Phase::GameOver {
            return events;
        }

        if let Some(engagement) = &self.engagement {
            let waiting = engagement.pending_summon
                || engagement.pending_reinforce
                || self.legions.values().any(|l| !l.pending_acquire.is_empty());
            if engagement.stage == EngagementStage::Settling && !waiting {
                events.push(GameEvent::EngagementSettled { hex: engagement.hex });
                self.engagement = None;
                self.battle = None;
            }
        }

        self.eliminate_players(&mut events);
        if self.phase == Phase::GameOver {
            return events;
        }

        if self.engagement.is_none() {
            let active_alive = self.player(self.active).map_or(false, |p| p.alive);
            if !active_alive {
                self.advance_to_next_player(&mut events);
            } else if self.phase == Phase::Fight && self.engagements().is_empty() {
                self.set_phase(Phase::Muster, &mut events);
            }
        }
        events
    }

    fn eliminate_players(&mut self, events: &mut Vec<GameEvent>) {
        let doomed: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|p| p.alive)
            .filter(|p| p.titan_dead || !self.legions.values().any(|l| l.owner == p.id))
            .map(|p| p.id)
            .collect();
        if doomed.is_empty() {
            return;
        }

        for &id in &doomed {
            let leftovers: Vec<Marker> = self
                .legions
                .values()
                .filter(|l| l.owner == id)
                .map(|l| l.marker.clone())
                .collect();
            for marker in leftovers {
                self.disband(&marker);
            }
            if let Some(player) = self.player_mut(id) {
                player.alive = false;
            }
            info!(player = %id, "player eliminated");
            events.push(GameEvent::PlayerEliminated { player: id });
        }
        self.finish_order.push(doomed);

        let alive: Vec<PlayerId> = self.players.iter().filter(|p| p.alive).map(|p| p.id).collect();
        if alive.len() <= 1 {
            let winner = alive.first().copied();
            if let Some(w) = winner {
                self.finish_order.push(vec![w]);
            }
            self.phase = Phase::GameOver;
            self.engagement = None;
            self.battle = None;
            info!(?winner, turn = self.turn, "game over");
            events.push(GameEvent::GameOver { winner, finish_order: self.finish_order.clone() });
        }
    }

    // ========================================================================
    // SHARED HELPERS
    // ========================================================================

    /// Record an engine defect and halt the match
    fn invariant(&mut self, message: impl Into<String>) -> EngineError {
        let message = message.into();
        error!(%message, "invariant violated, halting match");
        self.halted = Some(message.clone());
        EngineError::Invariant(message)
    }

    fn stale(&self, what: &str, marker: &Marker) -> Result<Vec<GameEvent>, EngineError> {
        warn!(%marker, what, "stale reference ignored");
        Ok(Vec::new())
    }

    fn require_phase(&self, phase: Phase, action: &'static str) -> Result<(), Rejection> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(Rejection::WrongPhase(action))
        }
    }

    fn require_active(&self, player: PlayerId) -> Result<(), Rejection> {
        if player == self.active {
            Ok(())
        } else {
            Err(Rejection::NotYourTurn)
        }
    }

    fn set_phase(&mut self, phase: Phase, events: &mut Vec<GameEvent>) {
        self.phase = phase;
        debug!(player = %self.active, turn = self.turn, ?phase, "phase change");
        events.push(GameEvent::PhaseChanged { player: self.active, turn: self.turn, phase });
    }

    fn alloc_creature(&mut self) -> CreatureId {
        let id = self.next_creature;
        self.next_creature += 1;
        id
    }

    fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id.0 as usize)
    }

    fn score_of(&self, player: PlayerId) -> u32 {
        self.player(player).map_or(0, |p| p.score)
    }

    /// Effective power of a creature owned by `owner`
    fn power_of(&self, owner: PlayerId, species: SpeciesId) -> u8 {
        self.variant
            .species
            .get(species)
            .map_or(0, |s| effective_power(s, self.score_of(owner), &self.options))
    }

    fn points_of(&self, owner: PlayerId, species: SpeciesId) -> u32 {
        self.variant
            .species
            .get(species)
            .map_or(0, |s| creature_points(s, self.score_of(owner), &self.options))
    }

    fn legion_value(&self, legion: &Legion) -> u32 {
        legion.creatures.iter().map(|c| self.points_of(legion.owner, c.species)).sum()
    }

    /// Strategic occupancy, optionally leaving one legion out
    fn occupancy(&self, except: Option<&Marker>) -> Occupancy {
        let mut occ = Occupancy::default();
        for legion in self.legions.values() {
            if Some(&legion.marker) != except {
                occ.add(legion.hex, legion.owner);
            }
        }
        occ
    }

    fn legions_at(&self, hex: HexLabel) -> Vec<&Legion> {
        self.legions.values().filter(|l| l.hex == hex).collect()
    }

    /// Remove a legion, returning its creatures to the pool and its marker
    /// to its owner
    fn disband(&mut self, marker: &Marker) {
        let Some(legion) = self.legions.remove(marker) else {
            return;
        };
        for creature in &legion.creatures {
            self.pool.put_one_back(creature.species);
        }
        if let Some(owner) = self.player_mut(legion.owner) {
            owner.return_marker(legion.marker);
        }
    }

    /// Remove a legion whose creatures all die
    fn destroy(&mut self, marker: &Marker) {
        let Some(legion) = self.legions.remove(marker) else {
            return;
        };
        for creature in &legion.creatures {
            self.pool.kill_one(creature.species, &self.variant.species);
        }
        if let Some(owner) = self.player_mut(legion.owner) {
            owner.return_marker(legion.marker);
        }
    }
}

#[cfg(test)]
impl Game {
    /// Replace a player's legions with one legion of the named species
    pub(crate) fn place_legion(&mut self, owner: PlayerId, hex: HexLabel, names: &[&str]) -> Marker {
        let old: Vec<Marker> = self
            .legions
            .values()
            .filter(|l| l.owner == owner)
            .map(|l| l.marker.clone())
            .collect();
        for m in &old {
            self.disband(m);
        }
        let marker = self.place_extra(owner, hex, names);
        if let Some(legion) = self.legions.get_mut(&marker) {
            legion.moved = owner == self.active;
        }
        marker
    }

    /// Add a legion without disturbing the owner's others
    pub(crate) fn place_extra(&mut self, owner: PlayerId, hex: HexLabel, names: &[&str]) -> Marker {
        let marker = self.players[owner.0 as usize].markers.pop_first().unwrap();
        let mut creatures = Vec::new();
        for name in names {
            let species = self.variant.species.id(name).unwrap();
            self.pool.take_one(species).unwrap();
            creatures.push(CreatureInstance::new(self.alloc_creature(), species));
        }
        self.legions.insert(marker.clone(), Legion::new(marker.clone(), owner, hex, creatures));
        marker
    }

    pub(crate) fn force_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }
}
