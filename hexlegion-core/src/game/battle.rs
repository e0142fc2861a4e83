//! Battle - the tactical sub-game fought inside one engagement
//!
//! Each battle turn has two halves, defender first. A half runs
//! Reinforce -> Maneuver -> DriftDamage -> Strike -> Counterstrike. Dead
//! creatures stay where they fell until the half ends, so a creature killed
//! in the Strike step can still strike back.

use super::engagement::EngagementStage;
use super::Game;
use crate::creature::{CreatureId, CreatureInstance};
use crate::error::{EngineError, Rejection};
use crate::event::{BattleOutcome, GameEvent, LegionFate};
use crate::hex::Hex;
use crate::player::PlayerId;
use crate::recruit::is_legal_recruit;
use crate::species::SpeciesId;
use crate::tactical::board::{BattleSide, HexTerrain, TacticalBoard};
use crate::tactical::combat::{count_hits, melee_profile, rangestrike_profile, Combatant, StrikeProfile};
use crate::tactical::movement::{self, adjacent_enemies, is_engaged, BattleOccupancy, Mover};
use crate::variant::Variant;
use crate::legion::Marker;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattlePhase {
    Reinforce,
    Maneuver,
    DriftDamage,
    Strike,
    Counterstrike,
}

/// Excess hits from a melee strike, waiting for a target
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingCarry {
    pub striker: CreatureId,
    pub primary: CreatureId,
    pub profile: StrikeProfile,
    pub hits: u8,
}

/// A creature taken off the battleland, valued when it fell
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Casualty {
    pub side: BattleSide,
    pub creature: CreatureId,
    pub species: SpeciesId,
    pub points: u32,
}

#[derive(Clone, Debug)]
pub struct Battle {
    pub board: TacticalBoard,
    pub turn: u8,
    pub phase: BattlePhase,
    /// Side whose half of the battle turn it is
    pub active: BattleSide,
    pub carry: Option<PendingCarry>,
    /// The attacker has lost a creature, which opens summoning
    pub attacker_lost: bool,
    pub casualties: Vec<Casualty>,
    /// Victims of this half's Strike step, allowed to counterstrike
    struck_down: Vec<CreatureId>,
    /// Positions before this maneuver
    origins: FxHashMap<CreatureId, Option<Hex>>,
}

impl Battle {
    /// Side that strikes in the current phase
    pub fn striking_side(&self) -> BattleSide {
        match self.phase {
            BattlePhase::Counterstrike => self.active.other(),
            _ => self.active,
        }
    }

    fn titan_fell(&self, side: BattleSide, variant: &Variant) -> bool {
        self.casualties
            .iter()
            .any(|c| c.side == side && variant.species.is_titan(c.species))
    }

    fn dead_value(&self, side: BattleSide) -> u32 {
        self.casualties.iter().filter(|c| c.side == side).map(|c| c.points).sum()
    }
}

/// Snapshot of one creature in the current battle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleUnit {
    pub id: CreatureId,
    pub species: SpeciesId,
    pub side: BattleSide,
    pub hex: Option<Hex>,
    /// Effective power
    pub power: u8,
    pub hits: u8,
    pub moved: bool,
    pub struck: bool,
}

impl BattleUnit {
    pub fn alive(&self) -> bool {
        self.hits < self.power
    }

    pub fn capacity(&self) -> u8 {
        self.power.saturating_sub(self.hits)
    }
}

/// Living creatures standing on the battleland
pub(super) fn living_occupancy(units: &[BattleUnit]) -> BattleOccupancy {
    units
        .iter()
        .filter(|u| u.alive())
        .filter_map(|u| u.hex.map(|h| (h, u.side)))
        .collect()
}

fn combatant<'a>(variant: &'a Variant, unit: &BattleUnit) -> Option<Combatant<'a>> {
    Some(Combatant {
        id: unit.species,
        species: variant.species.get(unit.species)?,
        power: unit.power,
        hex: unit.hex?,
    })
}

impl Game {
    // ========================================================================
    // BATTLE STATE ACCESS
    // ========================================================================

    /// Every creature of both legions in the current battle
    pub fn battle_units(&self) -> Vec<BattleUnit> {
        let Some(engagement) = &self.engagement else {
            return Vec::new();
        };
        let mut units = Vec::new();
        for side in [BattleSide::Attacker, BattleSide::Defender] {
            let Some(legion) = self.legions.get(engagement.marker(side)) else {
                continue;
            };
            units.extend(legion.creatures.iter().map(|c| BattleUnit {
                id: c.id,
                species: c.species,
                side,
                hex: c.position,
                power: self.power_of(legion.owner, c.species),
                hits: c.hits,
                moved: c.moved,
                struck: c.struck,
            }));
        }
        units
    }

    fn battle_creature_mut(&mut self, id: CreatureId) -> Option<&mut CreatureInstance> {
        let engagement = self.engagement.as_ref()?;
        let marker = [&engagement.attacker, &engagement.defender]
            .into_iter()
            .find(|m| self.legions.get(*m).map_or(false, |l| l.creature(id).is_some()))?
            .clone();
        self.legions.get_mut(&marker)?.creature_mut(id)
    }

    fn for_side_creatures(&mut self, side: BattleSide, mut f: impl FnMut(&mut CreatureInstance)) {
        let Some(marker) = self.engagement.as_ref().map(|e| e.marker(side).clone()) else {
            return;
        };
        if let Some(legion) = self.legions.get_mut(&marker) {
            legion.creatures.iter_mut().for_each(&mut f);
        }
    }

    fn stale_creature(&self, creature: CreatureId) -> Result<Vec<GameEvent>, EngineError> {
        warn!(creature, "stale creature reference ignored");
        Ok(Vec::new())
    }

    fn require_battle_phase(
        &self,
        phases: &[BattlePhase],
        player: PlayerId,
        action: &'static str,
    ) -> Result<BattleSide, Rejection> {
        let battle = self.battle.as_ref().ok_or(Rejection::NotInBattle)?;
        if !phases.contains(&battle.phase) {
            return Err(Rejection::WrongPhase(action));
        }
        if self.engagement.as_ref().map_or(false, |e| e.has_pending()) {
            return Err(Rejection::PendingDecisions);
        }
        let side = battle.striking_side();
        if self.side_owner(side) != Some(player) {
            return Err(Rejection::NotYourTurn);
        }
        Ok(side)
    }

    /// Whether `unit` may strike in the current step
    pub(super) fn may_strike(&self, battle: &Battle, unit: &BattleUnit) -> bool {
        let recently_fallen = battle.phase == BattlePhase::Counterstrike && battle.struck_down.contains(&unit.id);
        unit.side == battle.striking_side()
            && matches!(battle.phase, BattlePhase::Strike | BattlePhase::Counterstrike)
            && unit.hex.is_some()
            && !unit.struck
            && (unit.alive() || recently_fallen)
    }

    /// Dice and strike number for `striker` against `target`, if legal
    pub(super) fn strike_profile(
        &self,
        variant: &Variant,
        battle: &Battle,
        striker: &BattleUnit,
        target: &BattleUnit,
        occupancy: &BattleOccupancy,
    ) -> Option<StrikeProfile> {
        if target.side == striker.side || !target.alive() {
            return None;
        }
        let attacker = combatant(variant, striker)?;
        let defender = combatant(variant, target)?;
        if adjacent_enemies(&battle.board, occupancy, attacker.hex, striker.side).contains(&defender.hex) {
            return Some(melee_profile(&battle.board, &self.nativity, &attacker, &defender));
        }
        if battle.phase != BattlePhase::Strike || is_engaged(&battle.board, occupancy, attacker.hex, striker.side) {
            return None;
        }
        let occupied = |h: Hex| occupancy.contains_key(&h);
        rangestrike_profile(&battle.board, &attacker, &defender, &occupied)
    }

    /// Creatures that may take the carry, with their remaining capacity
    pub(super) fn carry_candidates(
        &self,
        variant: &Variant,
        battle: &Battle,
        units: &[BattleUnit],
        carry: &PendingCarry,
    ) -> Vec<(CreatureId, u8)> {
        let Some(striker) = units.iter().find(|u| u.id == carry.striker) else {
            return Vec::new();
        };
        let occupancy = living_occupancy(units);
        units
            .iter()
            .filter(|u| u.id != carry.primary && u.alive())
            .filter(|u| {
                self.strike_profile(variant, battle, striker, u, &occupancy)
                    .map_or(false, |p| !p.rangestrike && carry.profile.allows_carry_to(&p))
            })
            .map(|u| (u.id, u.capacity()))
            .collect()
    }

    fn carry_room(&self, variant: &Variant, carry: &PendingCarry) -> u8 {
        let Some(battle) = self.battle.as_ref() else {
            return 0;
        };
        let units = self.battle_units();
        self.carry_candidates(variant, battle, &units, carry)
            .iter()
            .fold(0u8, |sum, (_, capacity)| sum.saturating_add(*capacity))
    }

    fn record_death(&mut self, unit: &BattleUnit, events: &mut Vec<GameEvent>) {
        let Some(marker) = self.engagement.as_ref().map(|e| e.marker(unit.side).clone()) else {
            return;
        };
        if let Some(battle) = self.battle.as_mut() {
            if unit.side == BattleSide::Attacker {
                battle.attacker_lost = true;
            }
            if battle.phase == BattlePhase::Strike {
                battle.struck_down.push(unit.id);
            }
        }
        debug!(creature = unit.id, %marker, "creature killed");
        events.push(GameEvent::CreatureKilled { creature: unit.id, species: unit.species, marker });
    }

    fn forfeit_carry(&mut self, events: &mut Vec<GameEvent>) {
        if let Some(carry) = self.battle.as_mut().and_then(|b| b.carry.take()) {
            events.push(GameEvent::CarryForfeited { hits: carry.hits });
        }
    }

    // ========================================================================
    // BATTLE FLOW
    // ========================================================================

    pub(super) fn start_battle(&mut self, events: &mut Vec<GameEvent>) {
        let Some(engagement) = self.engagement.as_mut() else {
            return;
        };
        engagement.stage = EngagementStage::Battle;
        let (hex, attacker, defender) = (engagement.hex, engagement.attacker.clone(), engagement.defender.clone());

        let terrain = self.board.terrain(hex).unwrap_or_default();
        let entry = self.legions.get(&attacker).and_then(|l| l.entry_side).unwrap_or_default();
        let board = match self.variant.battleland(terrain) {
            Some(spec) => TacticalBoard::new(spec, entry),
            None => TacticalBoard::flat(terrain),
        };
        for marker in [&attacker, &defender] {
            if let Some(legion) = self.legions.get_mut(marker) {
                legion.creatures.iter_mut().for_each(CreatureInstance::leave_battle);
            }
        }

        self.battle = Some(Battle {
            board,
            turn: 1,
            phase: BattlePhase::Reinforce,
            active: BattleSide::Defender,
            carry: None,
            attacker_lost: false,
            casualties: Vec::new(),
            struck_down: Vec::new(),
            origins: FxHashMap::default(),
        });
        info!(hex, %attacker, %defender, ?terrain, "battle started");
        events.push(GameEvent::BattleStarted { hex, attacker, defender, entry_side: entry });
        self.enter_reinforce_step(events);
    }

    fn push_phase_event(&self, events: &mut Vec<GameEvent>) {
        if let Some(b) = &self.battle {
            events.push(GameEvent::BattlePhaseChanged { turn: b.turn, phase: b.phase, active: b.active });
        }
    }

    fn enter_reinforce_step(&mut self, events: &mut Vec<GameEvent>) {
        let Some(battle) = self.battle.as_mut() else {
            return;
        };
        battle.phase = BattlePhase::Reinforce;
        let (turn, active, attacker_lost) = (battle.turn, battle.active, battle.attacker_lost);
        self.push_phase_event(events);

        let Some(engagement) = self.engagement.clone() else {
            return;
        };
        match active {
            BattleSide::Defender if turn == self.options.reinforce_turn && self.can_reinforce() => {
                if let Some(e) = self.engagement.as_mut() {
                    e.pending_reinforce = true;
                }
                events.push(GameEvent::ReinforcementOffered { marker: engagement.defender });
            }
            BattleSide::Attacker if attacker_lost && self.can_summon() => {
                if let Some(e) = self.engagement.as_mut() {
                    e.pending_summon = true;
                }
                events.push(GameEvent::SummonOffered { marker: engagement.attacker });
            }
            _ => self.begin_maneuver(events),
        }
    }

    fn begin_maneuver(&mut self, events: &mut Vec<GameEvent>) {
        let Some(battle) = self.battle.as_mut() else {
            return;
        };
        battle.phase = BattlePhase::Maneuver;
        battle.origins.clear();
        let side = battle.active;
        self.push_phase_event(events);
        self.for_side_creatures(side, |c| c.moved = false);
    }

    fn enter_strike_step(&mut self, phase: BattlePhase, events: &mut Vec<GameEvent>) {
        let Some(battle) = self.battle.as_mut() else {
            return;
        };
        battle.phase = phase;
        if phase == BattlePhase::Strike {
            battle.struck_down.clear();
        }
        let side = battle.striking_side();
        self.push_phase_event(events);
        self.for_side_creatures(side, |c| c.struck = false);
    }

    /// Counterstrike is over: clear the dead, then end the battle or pass
    /// the turn to the other side
    fn end_half(&mut self, events: &mut Vec<GameEvent>) {
        self.remove_dead(events);
        if let Some(outcome) = self.battle_outcome() {
            self.finish_battle(outcome, events);
            return;
        }
        let limit = self.options.battle_turn_limit;
        let Some(battle) = self.battle.as_mut() else {
            return;
        };
        if battle.active == BattleSide::Attacker {
            if battle.turn >= limit {
                self.finish_battle(BattleOutcome::TimeLoss, events);
                return;
            }
            battle.turn += 1;
        }
        battle.active = battle.active.other();
        self.enter_reinforce_step(events);
    }

    fn remove_dead(&mut self, events: &mut Vec<GameEvent>) {
        let variant = Arc::clone(&self.variant);
        let dead: Vec<BattleUnit> = self.battle_units().into_iter().filter(|u| !u.alive()).collect();
        if dead.is_empty() {
            return;
        }
        let Some(engagement) = self.engagement.clone() else {
            return;
        };

        let mut casualties = Vec::with_capacity(dead.len());
        for unit in &dead {
            let marker = engagement.marker(unit.side);
            let owner = self.legions.get(marker).map(|l| l.owner);
            let points = owner.map_or(0, |o| self.points_of(o, unit.species));
            if let Some(legion) = self.legions.get_mut(marker) {
                legion.remove_creature(unit.id);
            }
            self.pool.kill_one(unit.species, &variant.species);
            casualties.push(Casualty { side: unit.side, creature: unit.id, species: unit.species, points });
        }
        if let Some(battle) = self.battle.as_mut() {
            battle.casualties.extend(casualties);
        }
        events.push(GameEvent::CreaturesRemoved { creatures: dead.iter().map(|u| u.id).collect() });
    }

    fn battle_outcome(&self) -> Option<BattleOutcome> {
        let engagement = self.engagement.as_ref()?;
        let battle = self.battle.as_ref()?;
        let lost = |side: BattleSide| {
            let empty = self
                .legions
                .get(engagement.marker(side))
                .map_or(true, |l| l.creatures.is_empty());
            empty || battle.titan_fell(side, &self.variant)
        };
        match (lost(BattleSide::Attacker), lost(BattleSide::Defender)) {
            (true, true) => Some(BattleOutcome::Mutual),
            (true, false) => Some(BattleOutcome::Won(BattleSide::Defender)),
            (false, true) => Some(BattleOutcome::Won(BattleSide::Attacker)),
            (false, false) => None,
        }
    }

    /// Score the battle, remove the losers and open post-battle choices
    pub(super) fn finish_battle(&mut self, outcome: BattleOutcome, events: &mut Vec<GameEvent>) {
        self.remove_dead(events);
        let Some(engagement) = self.engagement.clone() else {
            return;
        };
        let Some(battle) = self.battle.take() else {
            return;
        };
        let variant = Arc::clone(&self.variant);
        info!(hex = engagement.hex, ?outcome, turn = battle.turn, "battle ended");
        events.push(GameEvent::BattleEnded { hex: engagement.hex, outcome, turn: battle.turn });

        let owner = |game: &Game, side: BattleSide| game.legions.get(engagement.marker(side)).map(|l| l.owner);
        let owners = [
            (BattleSide::Attacker, owner(self, BattleSide::Attacker)),
            (BattleSide::Defender, owner(self, BattleSide::Defender)),
        ];
        let owner_of = |side: BattleSide| owners.iter().find(|(s, _)| *s == side).and_then(|(_, o)| *o);
        let holds_titan = |game: &Game, side: BattleSide| {
            battle.titan_fell(side, &variant)
                || game
                    .legions
                    .get(engagement.marker(side))
                    .map_or(false, |l| l.has_titan(&variant.species))
        };

        let losers = match outcome {
            BattleOutcome::Won(winner) => vec![winner.other()],
            BattleOutcome::Conceded(side) => vec![side],
            BattleOutcome::TimeLoss => vec![BattleSide::Attacker],
            BattleOutcome::Mutual => {
                if holds_titan(self, BattleSide::Attacker) && !holds_titan(self, BattleSide::Defender) {
                    vec![BattleSide::Defender, BattleSide::Attacker]
                } else {
                    vec![BattleSide::Attacker, BattleSide::Defender]
                }
            }
        };
        let fate = match outcome {
            BattleOutcome::Conceded(_) => LegionFate::Conceded,
            BattleOutcome::TimeLoss => LegionFate::TimeLoss,
            _ => LegionFate::Destroyed,
        };

        // Every loser is valued before anyone's score changes
        let values: Vec<u32> = losers
            .iter()
            .map(|&side| {
                let standing = self.legions.get(engagement.marker(side)).map_or(0, |l| self.legion_value(l));
                standing + battle.dead_value(side)
            })
            .collect();
        for (&side, value) in losers.iter().zip(values) {
            let winner = engagement.marker(side.other());
            let credit = (outcome != BattleOutcome::Mutual).then_some(winner);
            self.lose_legion_valued(engagement.marker(side), fate, value, owner_of(side.other()), credit, events);
        }
        for side in [BattleSide::Attacker, BattleSide::Defender] {
            if battle.titan_fell(side, &variant) {
                if let Some(loser) = owner_of(side) {
                    self.titan_lost(loser, owner_of(side.other()), events);
                }
            }
        }

        let winner = match outcome {
            BattleOutcome::Won(side) => Some(side),
            BattleOutcome::TimeLoss => Some(BattleSide::Defender),
            BattleOutcome::Conceded(side) => Some(side.other()),
            BattleOutcome::Mutual => None,
        };
        if let Some(side) = winner {
            if let Some(legion) = self.legions.get_mut(engagement.marker(side)) {
                legion.creatures.iter_mut().for_each(CreatureInstance::leave_battle);
            }
        }

        self.enter_settling();
        if let Some(e) = self.engagement.as_mut() {
            e.summoned = None;
        }
        if matches!(outcome, BattleOutcome::Conceded(_)) {
            return;
        }
        match winner {
            Some(BattleSide::Attacker) if self.can_summon() => {
                if let Some(e) = self.engagement.as_mut() {
                    e.pending_summon = true;
                }
                events.push(GameEvent::SummonOffered { marker: engagement.attacker.clone() });
            }
            Some(BattleSide::Defender) if self.can_reinforce() => {
                if let Some(e) = self.engagement.as_mut() {
                    e.pending_reinforce = true;
                }
                events.push(GameEvent::ReinforcementOffered { marker: engagement.defender.clone() });
            }
            _ => {}
        }
    }

    // ========================================================================
    // MANEUVER
    // ========================================================================

    pub(super) fn move_creature(&mut self, player: PlayerId, creature: CreatureId, to: Hex) -> Result<Vec<GameEvent>, EngineError> {
        let side = self.require_battle_phase(&[BattlePhase::Maneuver], player, "move a creature")?;
        let Some(unit) = self.battle_units().into_iter().find(|u| u.id == creature) else {
            return self.stale_creature(creature);
        };
        if unit.side != side {
            return Err(Rejection::IllegalCreatureMove.into());
        }
        if unit.moved {
            return Err(Rejection::CreatureAlreadyMoved.into());
        }
        if !self.legal_creature_moves(creature).contains(&to) {
            return Err(Rejection::IllegalCreatureMove.into());
        }

        if let Some(battle) = self.battle.as_mut() {
            battle.origins.entry(creature).or_insert(unit.hex);
        }
        if let Some(c) = self.battle_creature_mut(creature) {
            c.position = Some(to);
            c.moved = true;
        }
        Ok(vec![GameEvent::CreatureMoved { creature, from: unit.hex, to }])
    }

    pub(super) fn undo_creature_move(&mut self, player: PlayerId, creature: CreatureId) -> Result<Vec<GameEvent>, EngineError> {
        let side = self.require_battle_phase(&[BattlePhase::Maneuver], player, "undo a creature move")?;
        let units = self.battle_units();
        let Some(unit) = units.iter().find(|u| u.id == creature).copied() else {
            return self.stale_creature(creature);
        };
        let origin = self.battle.as_ref().and_then(|b| b.origins.get(&creature).copied());
        let Some(origin) = origin.filter(|_| unit.moved && unit.side == side) else {
            return Err(Rejection::NothingToUndo.into());
        };
        if let Some(h) = origin {
            if units.iter().any(|u| u.id != creature && u.hex == Some(h)) {
                return Err(Rejection::IllegalCreatureMove.into());
            }
        }

        if let Some(c) = self.battle_creature_mut(creature) {
            c.position = origin;
            c.moved = false;
        }
        if let Some(battle) = self.battle.as_mut() {
            battle.origins.remove(&creature);
        }
        Ok(vec![GameEvent::CreatureMoveUndone { creature, to: origin }])
    }

    pub(super) fn done_maneuvers(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, EngineError> {
        let side = self.require_battle_phase(&[BattlePhase::Maneuver], player, "finish maneuvers")?;
        let mut events = Vec::new();
        if side == BattleSide::Attacker {
            if let Some(e) = self.engagement.as_mut() {
                e.summoned = None;
            }
        }

        // Creatures that never entered the battleland are lost
        let stragglers: Vec<BattleUnit> = self
            .battle_units()
            .into_iter()
            .filter(|u| u.side == side && u.hex.is_none() && u.alive())
            .collect();
        for unit in &stragglers {
            if let Some(c) = self.battle_creature_mut(unit.id) {
                c.hits = unit.power;
            }
            self.record_death(unit, &mut events);
        }

        if let Some(battle) = self.battle.as_mut() {
            battle.phase = BattlePhase::DriftDamage;
        }
        self.push_phase_event(&mut events);
        let drifting: Vec<BattleUnit> = match &self.battle {
            Some(battle) => self
                .battle_units()
                .into_iter()
                .filter(|u| u.side == side && u.alive())
                .filter(|u| {
                    u.hex.map_or(false, |h| battle.board.hex_terrain(h) == HexTerrain::Drift)
                        && !self.nativity.is_native_to_terrain(u.species, HexTerrain::Drift)
                })
                .collect(),
            None => Vec::new(),
        };
        for unit in &drifting {
            if let Some(c) = self.battle_creature_mut(unit.id) {
                c.hits += 1;
            }
            let killed = unit.hits + 1 >= unit.power;
            events.push(GameEvent::DriftDamage { creature: unit.id, killed });
            if killed {
                self.record_death(unit, &mut events);
            }
        }

        self.enter_strike_step(BattlePhase::Strike, &mut events);
        Ok(events)
    }

    // ========================================================================
    // STRIKES
    // ========================================================================

    pub(super) fn strike(&mut self, player: PlayerId, striker: CreatureId, target: CreatureId) -> Result<Vec<GameEvent>, EngineError> {
        let side = self.require_battle_phase(
            &[BattlePhase::Strike, BattlePhase::Counterstrike],
            player,
            "strike",
        )?;
        let variant = Arc::clone(&self.variant);
        let units = self.battle_units();
        let (Some(s), Some(t)) = (
            units.iter().find(|u| u.id == striker).copied(),
            units.iter().find(|u| u.id == target).copied(),
        ) else {
            return self.stale_creature(striker);
        };
        let Some(battle) = self.battle.as_ref() else {
            return Err(Rejection::NotInBattle.into());
        };
        if s.side != side {
            return Err(Rejection::IllegalTarget.into());
        }
        if s.struck {
            return Err(Rejection::AlreadyStruck.into());
        }
        if !self.may_strike(battle, &s) {
            return Err(Rejection::IllegalTarget.into());
        }
        let occupancy = living_occupancy(&units);
        let profile = self
            .strike_profile(&variant, battle, &s, &t, &occupancy)
            .ok_or(Rejection::IllegalTarget)?;

        let mut consequences = Vec::new();
        self.forfeit_carry(&mut consequences);
        let rolls: Vec<u8> = (0..profile.dice).map(|_| self.dice.roll()).collect();
        let hits = count_hits(&rolls, profile.strike_number);
        let damage = hits.min(t.capacity());
        let killed = damage >= t.capacity();
        if let Some(c) = self.battle_creature_mut(target) {
            c.hits += damage;
        }
        if let Some(c) = self.battle_creature_mut(striker) {
            c.struck = true;
        }
        if killed {
            self.record_death(&t, &mut consequences);
        }

        let excess = hits - damage;
        let mut carry = 0;
        if excess > 0 && !profile.rangestrike {
            let pending = PendingCarry { striker, primary: target, profile, hits: excess };
            carry = excess.min(self.carry_room(&variant, &pending));
            if carry > 0 {
                if let Some(battle) = self.battle.as_mut() {
                    battle.carry = Some(PendingCarry { hits: carry, ..pending });
                }
            }
        }

        let mut events = vec![GameEvent::Struck {
            striker,
            target,
            dice: profile.dice,
            strike_number: profile.strike_number,
            rolls,
            hits,
            damage,
            killed,
            carry,
        }];
        events.extend(consequences);
        Ok(events)
    }

    pub(super) fn apply_carry(&mut self, player: PlayerId, target: CreatureId) -> Result<Vec<GameEvent>, EngineError> {
        let battle = self.battle.as_ref().ok_or(Rejection::NotInBattle)?;
        let carry = battle.carry.ok_or(Rejection::CarryNotPending)?;
        if self.side_owner(battle.striking_side()) != Some(player) {
            return Err(Rejection::NotYourTurn.into());
        }
        let variant = Arc::clone(&self.variant);
        let units = self.battle_units();
        let candidates = self.carry_candidates(&variant, battle, &units, &carry);
        let Some(&(_, capacity)) = candidates.iter().find(|(id, _)| *id == target) else {
            return Err(Rejection::IllegalCarryTarget.into());
        };
        let Some(unit) = units.iter().find(|u| u.id == target).copied() else {
            return Err(Rejection::IllegalCarryTarget.into());
        };

        let damage = carry.hits.min(capacity);
        let killed = damage >= capacity;
        if let Some(c) = self.battle_creature_mut(target) {
            c.hits += damage;
        }
        let mut consequences = Vec::new();
        if killed {
            self.record_death(&unit, &mut consequences);
        }
        let left = carry.hits - damage;
        let rest = PendingCarry { hits: left, ..carry };
        let carry_left = if left > 0 { left.min(self.carry_room(&variant, &rest)) } else { 0 };
        if let Some(battle) = self.battle.as_mut() {
            battle.carry = (carry_left > 0).then_some(PendingCarry { hits: carry_left, ..carry });
        }

        let mut events = vec![GameEvent::CarryApplied { target, damage, killed, carry_left }];
        events.extend(consequences);
        Ok(events)
    }

    pub(super) fn done_strikes(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, EngineError> {
        let side = self.require_battle_phase(
            &[BattlePhase::Strike, BattlePhase::Counterstrike],
            player,
            "finish strikes",
        )?;
        let Some(battle) = self.battle.as_ref() else {
            return Err(Rejection::NotInBattle.into());
        };
        let units = self.battle_units();
        let occupancy = living_occupancy(&units);
        let forced = units.iter().any(|u| {
            u.side == side
                && u.alive()
                && !u.struck
                && u.hex.map_or(false, |h| is_engaged(&battle.board, &occupancy, h, side))
        });
        if forced {
            return Err(Rejection::ForcedStrikesRemain.into());
        }

        let phase = battle.phase;
        let mut events = Vec::new();
        self.forfeit_carry(&mut events);
        match phase {
            BattlePhase::Strike => self.enter_strike_step(BattlePhase::Counterstrike, &mut events),
            _ => self.end_half(&mut events),
        }
        Ok(events)
    }

    // ========================================================================
    // SUMMON AND REINFORCE
    // ========================================================================

    pub(super) fn summon_angel(
        &mut self,
        player: PlayerId,
        donor: Marker,
        species: SpeciesId,
    ) -> Result<Vec<GameEvent>, EngineError> {
        let engagement = self.engagement.as_ref().ok_or(Rejection::IllegalSummon)?;
        if !engagement.pending_summon {
            return Err(Rejection::IllegalSummon.into());
        }
        let attacker = engagement.attacker.clone();
        if self.side_owner(BattleSide::Attacker) != Some(player) {
            return Err(Rejection::NotYourTurn.into());
        }
        if !self.legions.contains_key(&donor) {
            return self.stale("summon donor", &donor);
        }
        if !self.summon_donors(player).contains(&(donor.clone(), species)) {
            return Err(Rejection::IllegalSummon.into());
        }

        let Some(mut creature) = self.legions.get_mut(&donor).and_then(|l| l.take_species(species)) else {
            return Err(self.invariant(format!("donor {donor} lost its summonable creature")));
        };
        creature.leave_battle();
        let id = creature.id;
        if let Some(legion) = self.legions.get_mut(&attacker) {
            legion.creatures.push(creature);
        }
        if let Some(p) = self.player_mut(player) {
            p.summoned = true;
        }
        if let Some(e) = self.engagement.as_mut() {
            e.pending_summon = false;
            e.summoned = Some((donor.clone(), id));
        }

        let mut events = vec![GameEvent::AngelSummoned { donor, marker: attacker, species, creature: id }];
        if self.battle.is_some() {
            self.begin_maneuver(&mut events);
        }
        Ok(events)
    }

    pub(super) fn undo_summon(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, EngineError> {
        let engagement = self.engagement.as_ref().ok_or(Rejection::NothingToUndo)?;
        let (donor, id) = engagement.summoned.clone().ok_or(Rejection::NothingToUndo)?;
        let attacker = engagement.attacker.clone();
        if self.side_owner(BattleSide::Attacker) != Some(player) {
            return Err(Rejection::NotYourTurn.into());
        }
        if !self.legions.contains_key(&donor) {
            return Err(Rejection::NothingToUndo.into());
        }
        if let Some(battle) = &self.battle {
            let unmoved = self
                .legions
                .get(&attacker)
                .and_then(|l| l.creature(id))
                .map_or(false, |c| c.position.is_none());
            if battle.phase != BattlePhase::Maneuver || battle.active != BattleSide::Attacker || !unmoved {
                return Err(Rejection::NothingToUndo.into());
            }
        }

        let Some(mut creature) = self.legions.get_mut(&attacker).and_then(|l| l.remove_creature(id)) else {
            return Err(Rejection::NothingToUndo.into());
        };
        creature.leave_battle();
        if let Some(legion) = self.legions.get_mut(&donor) {
            legion.creatures.push(creature);
        }
        if let Some(p) = self.player_mut(player) {
            p.summoned = false;
        }
        if let Some(e) = self.engagement.as_mut() {
            e.summoned = None;
            e.pending_summon = true;
        }

        let mut events = vec![GameEvent::SummonUndone { donor, creature: id }];
        if let Some(battle) = self.battle.as_mut() {
            battle.phase = BattlePhase::Reinforce;
            self.push_phase_event(&mut events);
        }
        Ok(events)
    }

    pub(super) fn decline_summon(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, EngineError> {
        let engagement = self.engagement.as_ref().ok_or(Rejection::IllegalSummon)?;
        if !engagement.pending_summon {
            return Err(Rejection::IllegalSummon.into());
        }
        let marker = engagement.attacker.clone();
        if self.side_owner(BattleSide::Attacker) != Some(player) {
            return Err(Rejection::NotYourTurn.into());
        }
        if let Some(e) = self.engagement.as_mut() {
            e.pending_summon = false;
        }
        let mut events = vec![GameEvent::SummonDeclined { marker }];
        if self.battle.is_some() {
            self.begin_maneuver(&mut events);
        }
        Ok(events)
    }

    pub(super) fn reinforce(
        &mut self,
        player: PlayerId,
        recruit: SpeciesId,
        recruiters: Vec<SpeciesId>,
    ) -> Result<Vec<GameEvent>, EngineError> {
        let engagement = self.engagement.as_ref().ok_or(Rejection::NoReinforcementPending)?;
        if !engagement.pending_reinforce {
            return Err(Rejection::NoReinforcementPending.into());
        }
        let marker = engagement.defender.clone();
        if self.side_owner(BattleSide::Defender) != Some(player) {
            return Err(Rejection::NotYourTurn.into());
        }
        if self.legions.get(&marker).map_or(true, |l| l.height() >= self.options.max_legion_height) {
            return Err(Rejection::LegionFull.into());
        }
        if !is_legal_recruit(&self.reinforcements(), recruit, &recruiters) {
            return Err(Rejection::IllegalRecruit.into());
        }

        if self.pool.take_one(recruit).is_err() {
            return Err(self.invariant(format!("pool refused a reinforcement it offered: {recruit:?}")));
        }
        let creature = self.alloc_creature();
        if let Some(legion) = self.legions.get_mut(&marker) {
            legion.creatures.push(CreatureInstance::new(creature, recruit));
        }
        if let Some(e) = self.engagement.as_mut() {
            e.pending_reinforce = false;
            e.reinforced = true;
        }

        let mut events = vec![GameEvent::Reinforced { marker, recruit, recruiters, creature }];
        if self.battle.is_some() {
            self.begin_maneuver(&mut events);
        }
        Ok(events)
    }

    pub(super) fn decline_reinforce(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, EngineError> {
        let engagement = self.engagement.as_ref().ok_or(Rejection::NoReinforcementPending)?;
        if !engagement.pending_reinforce {
            return Err(Rejection::NoReinforcementPending.into());
        }
        let marker = engagement.defender.clone();
        if self.side_owner(BattleSide::Defender) != Some(player) {
            return Err(Rejection::NotYourTurn.into());
        }
        if let Some(e) = self.engagement.as_mut() {
            e.pending_reinforce = false;
        }
        let mut events = vec![GameEvent::ReinforceDeclined { marker }];
        if self.battle.is_some() {
            self.begin_maneuver(&mut events);
        }
        Ok(events)
    }

    /// Legal maneuvers for one creature of the side now moving
    pub fn legal_creature_moves(&self, creature: CreatureId) -> BTreeSet<Hex> {
        let Some(battle) = self.battle.as_ref() else {
            return BTreeSet::new();
        };
        if battle.phase != BattlePhase::Maneuver {
            return BTreeSet::new();
        }
        let units = self.battle_units();
        let Some(unit) = units.iter().find(|u| u.id == creature) else {
            return BTreeSet::new();
        };
        if unit.side != battle.active || unit.moved || !unit.alive() {
            return BTreeSet::new();
        }
        let Some(species) = self.variant.species.get(unit.species) else {
            return BTreeSet::new();
        };
        let mut occupancy = living_occupancy(&units);
        if let Some(h) = unit.hex {
            occupancy.remove(&h);
        }
        let mover = Mover { id: unit.species, species, from: unit.hex, side: unit.side };
        movement::legal_moves(&battle.board, &self.nativity, &mover, &occupancy)
    }
}

#[cfg(test)]
impl Game {
    /// Swap the battleland for a featureless one
    pub(crate) fn flatten_battleland(&mut self) {
        if let Some(battle) = self.battle.as_mut() {
            battle.board = TacticalBoard::flat(battle.board.terrain());
        }
    }

    /// Put one side's creatures on the given hexes, in legion order
    pub(crate) fn deploy(&mut self, side: BattleSide, hexes: &[Hex]) -> Vec<CreatureId> {
        let ids: Vec<CreatureId> = self.side_units(side).iter().map(|u| u.id).collect();
        for (id, hex) in ids.iter().zip(hexes) {
            if let Some(c) = self.battle_creature_mut(*id) {
                c.position = Some(*hex);
                c.moved = true;
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::dice::ScriptedDice;
    use crate::game::tests::seats;
    use crate::game::Phase;
    use crate::options::RuleOptions;
    use crate::strategic::{EntrySide, Terrain};

    /// Player 0 attacks player 1 on hex 1; the battle is on a flat board
    fn battle_game(attacker: &[&str], defender: &[&str], rolls: Vec<u8>, options: RuleOptions) -> (Game, Marker, Marker) {
        let mut game = Game::new(
            Arc::new(Variant::standard()),
            options,
            &seats(2),
            Box::new(ScriptedDice::new(rolls).with_fallback(1)),
        )
        .unwrap();
        let a = game.place_legion(PlayerId(0), 1, attacker);
        let d = game.place_legion(PlayerId(1), 1, defender);
        game.force_phase(Phase::Fight);
        game.apply(PlayerId(0), Command::ResolveEngagement { hex: 1 }).unwrap();
        if game.engagement().unwrap().stage == EngagementStage::AwaitingFlee {
            game.apply(PlayerId(1), Command::DeclineFlee).unwrap();
        }
        game.apply(PlayerId(0), Command::Fight).unwrap();
        game.flatten_battleland();
        (game, a, d)
    }

    fn phase(game: &Game) -> BattlePhase {
        game.battle().unwrap().phase
    }

    /// Finish the defender's first half without anyone fighting
    fn pass_defender_half(game: &mut Game) {
        game.apply(PlayerId(1), Command::DoneManeuvers).unwrap();
        game.apply(PlayerId(1), Command::DoneStrikes).unwrap();
        game.apply(PlayerId(0), Command::DoneStrikes).unwrap();
    }

    /// Finish the attacker's half without anyone fighting
    fn pass_attacker_half(game: &mut Game) {
        game.apply(PlayerId(0), Command::DoneManeuvers).unwrap();
        game.apply(PlayerId(0), Command::DoneStrikes).unwrap();
        game.apply(PlayerId(1), Command::DoneStrikes).unwrap();
    }

    fn use_battleland(game: &mut Game, terrain: Terrain) {
        let variant = Arc::clone(&game.variant);
        let spec = variant.battleland(terrain).unwrap();
        game.battle.as_mut().unwrap().board = TacticalBoard::new(spec, EntrySide::Bottom);
    }

    fn species(game: &Game, name: &str) -> SpeciesId {
        game.variant().species.id(name).unwrap()
    }

    fn eliminated_at(events: &[GameEvent], marker: &Marker) -> usize {
        events
            .iter()
            .position(|e| matches!(e, GameEvent::LegionEliminated { marker: m, .. } if m == marker))
            .unwrap()
    }

    #[test]
    fn test_battle_opens_with_defender_maneuver() {
        let (game, _, _) = battle_game(&["Ogre"], &["Centaur"], vec![], RuleOptions::default());
        let battle = game.battle().unwrap();
        assert_eq!(battle.turn, 1);
        assert_eq!(battle.active, BattleSide::Defender);
        assert_eq!(battle.phase, BattlePhase::Maneuver);
        assert_eq!(game.actor(), Some(PlayerId(1)));
    }

    #[test]
    fn test_creature_enters_and_undoes() {
        let (mut game, _, _) = battle_game(&["Ogre"], &["Centaur"], vec![], RuleOptions::default());
        let centaur = game.side_units(BattleSide::Defender)[0].id;
        let moves = game.legal_creature_moves(centaur);
        assert!(!moves.is_empty());
        let to = *moves.iter().next().unwrap();

        let err = game.apply(PlayerId(0), Command::MoveCreature { creature: centaur, to }).unwrap_err();
        assert_eq!(err.rejection(), Some(&Rejection::NotYourTurn));

        game.apply(PlayerId(1), Command::MoveCreature { creature: centaur, to }).unwrap();
        assert_eq!(game.side_units(BattleSide::Defender)[0].hex, Some(to));
        let err = game.apply(PlayerId(1), Command::MoveCreature { creature: centaur, to }).unwrap_err();
        assert_eq!(err.rejection(), Some(&Rejection::CreatureAlreadyMoved));

        let events = game.apply(PlayerId(1), Command::UndoCreatureMove { creature: centaur }).unwrap();
        assert_eq!(events, vec![GameEvent::CreatureMoveUndone { creature: centaur, to: None }]);
        assert_eq!(game.side_units(BattleSide::Defender)[0].hex, None);
    }

    #[test]
    fn test_creatures_left_off_board_die() {
        let (mut game, _, d) = battle_game(&["Ogre", "Ogre"], &["Centaur", "Centaur"], vec![], RuleOptions::default());
        pass_defender_half(&mut game);
        let events = game.settle();

        assert!(game.legion(&d).is_none());
        // Two centaurs at 3x4 each
        assert_eq!(game.player(PlayerId(0)).unwrap().score, 24);
        assert!(events.contains(&GameEvent::PlayerEliminated { player: PlayerId(1) }));
        assert_eq!(game.phase(), Phase::GameOver);
        assert_eq!(game.winner(), Some(PlayerId(0)));
    }

    #[test]
    fn test_strike_with_carry() {
        let rolls = vec![6; 8];
        let (mut game, _, _) = battle_game(&["Troll"], &["Ogre", "Ogre"], rolls, RuleOptions::default());
        let ogres = game.deploy(BattleSide::Defender, &[Hex::new(0, 0), Hex::new(1, 0)]);
        pass_defender_half(&mut game);

        assert_eq!(game.battle().unwrap().active, BattleSide::Attacker);
        assert_eq!(phase(&game), BattlePhase::Maneuver);
        let troll = game.deploy(BattleSide::Attacker, &[Hex::new(0, 1)])[0];
        game.apply(PlayerId(0), Command::DoneManeuvers).unwrap();
        assert_eq!(phase(&game), BattlePhase::Strike);

        let err = game.apply(PlayerId(0), Command::ApplyCarry { target: ogres[1] }).unwrap_err();
        assert_eq!(err.rejection(), Some(&Rejection::CarryNotPending));

        let targets: Vec<CreatureId> = game.strike_targets(troll).iter().map(|(id, _)| *id).collect();
        assert_eq!(targets.len(), 2);

        let events = game.apply(PlayerId(0), Command::Strike { striker: troll, target: ogres[0] }).unwrap();
        assert_eq!(
            events[0],
            GameEvent::Struck {
                striker: troll,
                target: ogres[0],
                dice: 8,
                strike_number: 4,
                rolls: vec![6; 8],
                hits: 8,
                damage: 6,
                killed: true,
                carry: 2,
            }
        );
        assert_eq!(game.carry_targets(), vec![ogres[1]]);

        let err = game.apply(PlayerId(0), Command::ApplyCarry { target: ogres[0] }).unwrap_err();
        assert_eq!(err.rejection(), Some(&Rejection::IllegalCarryTarget));
        assert!(game.battle().unwrap().carry.is_some());

        let events = game.apply(PlayerId(0), Command::ApplyCarry { target: ogres[1] }).unwrap();
        assert_eq!(events[0], GameEvent::CarryApplied { target: ogres[1], damage: 2, killed: false, carry_left: 0 });
        assert!(game.battle().unwrap().carry.is_none());

        // Both ogres strike back, the dead one included
        game.apply(PlayerId(0), Command::DoneStrikes).unwrap();
        assert_eq!(phase(&game), BattlePhase::Counterstrike);
        let mut strikers = game.strikers();
        strikers.sort();
        assert_eq!(strikers, ogres);
        let err = game.apply(PlayerId(1), Command::DoneStrikes).unwrap_err();
        assert_eq!(err.rejection(), Some(&Rejection::ForcedStrikesRemain));
    }

    #[test]
    fn test_time_loss_destroys_attacker() {
        let options = RuleOptions::default().with_battle_turn_limit(1);
        let (mut game, a, d) = battle_game(&["Ogre"], &["Centaur"], vec![], options);
        game.deploy(BattleSide::Defender, &[Hex::new(0, -2)]);
        pass_defender_half(&mut game);
        game.deploy(BattleSide::Attacker, &[Hex::new(0, 2)]);
        game.apply(PlayerId(0), Command::DoneManeuvers).unwrap();
        game.apply(PlayerId(0), Command::DoneStrikes).unwrap();
        let events = game.apply(PlayerId(1), Command::DoneStrikes).unwrap();

        assert!(events.contains(&GameEvent::BattleEnded { hex: 1, outcome: BattleOutcome::TimeLoss, turn: 1 }));
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::LegionEliminated { fate: LegionFate::TimeLoss, points: 12, .. }
        )));
        assert!(game.legion(&a).is_none());
        assert!(game.legion(&d).is_some());
        assert_eq!(game.player(PlayerId(1)).unwrap().score, 12);
    }

    #[test]
    fn test_concede_mid_battle() {
        let (mut game, _, d) = battle_game(&["Ogre", "Ogre"], &["Centaur"], vec![], RuleOptions::default());
        let events = game.apply(PlayerId(1), Command::Concede { marker: d.clone() }).unwrap();
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::BattleEnded { outcome: BattleOutcome::Conceded(BattleSide::Defender), .. }
        )));
        assert!(game.battle().is_none());
        assert_eq!(game.player(PlayerId(0)).unwrap().score, 12);
        assert!(!game.engagement().unwrap().pending_summon);
    }

    #[test]
    fn test_mutual_kill_resolves_titan_side_last() {
        // Titan kills the ogre on six 2+ rolls, the ogre strikes back with six 6s
        let (mut game, a, d) = battle_game(&["Titan"], &["Ogre"], vec![6; 12], RuleOptions::default());
        let ogre = game.deploy(BattleSide::Defender, &[Hex::new(0, 0)])[0];
        pass_defender_half(&mut game);
        let titan = game.deploy(BattleSide::Attacker, &[Hex::new(0, 1)])[0];
        game.apply(PlayerId(0), Command::DoneManeuvers).unwrap();
        game.apply(PlayerId(0), Command::Strike { striker: titan, target: ogre }).unwrap();
        game.apply(PlayerId(0), Command::DoneStrikes).unwrap();
        game.apply(PlayerId(1), Command::Strike { striker: ogre, target: titan }).unwrap();
        let events = game.apply(PlayerId(1), Command::DoneStrikes).unwrap();

        assert!(events.contains(&GameEvent::BattleEnded { hex: 1, outcome: BattleOutcome::Mutual, turn: 1 }));
        assert!(eliminated_at(&events, &d) < eliminated_at(&events, &a));
        assert!(game.player(PlayerId(0)).unwrap().titan_dead);
        // Each side scores the other's value, with no legion credited
        assert_eq!(game.player(PlayerId(0)).unwrap().score, 12);
        assert_eq!(game.player(PlayerId(1)).unwrap().score, 24);
    }

    #[test]
    fn test_summon_after_a_loss_and_undo() {
        let (mut game, a, _) = battle_game(&["Ogre", "Ogre"], &["Troll"], vec![], RuleOptions::default());
        let donor = game.place_extra(PlayerId(0), 2, &["Angel", "Centaur"]);
        let angel = species(&game, "Angel");
        game.deploy(BattleSide::Defender, &[Hex::new(0, -3)]);
        pass_defender_half(&mut game);
        // The second ogre never enters and is lost
        game.deploy(BattleSide::Attacker, &[Hex::new(0, 3)]);
        pass_attacker_half(&mut game);
        assert!(game.battle().unwrap().attacker_lost);
        pass_defender_half(&mut game);

        assert_eq!(phase(&game), BattlePhase::Reinforce);
        assert!(game.engagement().unwrap().pending_summon);
        assert_eq!(game.actor(), Some(PlayerId(0)));
        assert_eq!(game.summon_donors(PlayerId(0)), vec![(donor.clone(), angel)]);
        let err = game.apply(PlayerId(0), Command::DoneManeuvers).unwrap_err();
        assert_eq!(err.rejection(), Some(&Rejection::WrongPhase("finish maneuvers")));

        let summon = Command::SummonAngel { donor: donor.clone(), species: angel };
        let events = game.apply(PlayerId(0), summon.clone()).unwrap();
        let GameEvent::AngelSummoned { creature, .. } = events[0].clone() else {
            panic!("expected a summon, got {:?}", events[0]);
        };
        assert_eq!(game.legion(&a).unwrap().height(), 2);
        assert_eq!(game.legion(&donor).unwrap().height(), 1);
        assert_eq!(phase(&game), BattlePhase::Maneuver);
        assert!(game.player(PlayerId(0)).unwrap().summoned);

        let events = game.apply(PlayerId(0), Command::UndoSummon).unwrap();
        assert_eq!(events[0], GameEvent::SummonUndone { donor: donor.clone(), creature });
        assert_eq!(game.legion(&a).unwrap().height(), 1);
        assert_eq!(game.legion(&donor).unwrap().height(), 2);
        assert_eq!(phase(&game), BattlePhase::Reinforce);
        assert!(game.engagement().unwrap().pending_summon);
        assert!(!game.player(PlayerId(0)).unwrap().summoned);

        // Once the angel has entered the battleland the summon stands
        game.apply(PlayerId(0), summon).unwrap();
        let to = *game.legal_creature_moves(creature).iter().next().unwrap();
        game.apply(PlayerId(0), Command::MoveCreature { creature, to }).unwrap();
        let err = game.apply(PlayerId(0), Command::UndoSummon).unwrap_err();
        assert_eq!(err.rejection(), Some(&Rejection::NothingToUndo));
        assert_eq!(game.legion(&a).unwrap().height(), 2);
    }

    #[test]
    fn test_reinforce_on_turn_four() {
        let (mut game, _, d) = battle_game(&["Ogre"], &["Ogre"], vec![], RuleOptions::default());
        let ogre = species(&game, "Ogre");
        game.deploy(BattleSide::Defender, &[Hex::new(0, -3)]);
        pass_defender_half(&mut game);
        game.deploy(BattleSide::Attacker, &[Hex::new(0, 3)]);
        pass_attacker_half(&mut game);
        for _ in 2..4 {
            assert!(!game.engagement().unwrap().pending_reinforce);
            pass_defender_half(&mut game);
            pass_attacker_half(&mut game);
        }

        let battle = game.battle().unwrap();
        assert_eq!((battle.turn, battle.active, battle.phase), (4, BattleSide::Defender, BattlePhase::Reinforce));
        assert!(game.engagement().unwrap().pending_reinforce);
        assert_eq!(game.actor(), Some(PlayerId(1)));

        // Marsh: an ogre musters another ogre
        let events = game
            .apply(PlayerId(1), Command::Reinforce { recruit: ogre, recruiters: vec![ogre] })
            .unwrap();
        assert!(matches!(events[0], GameEvent::Reinforced { recruit, .. } if recruit == ogre));
        assert_eq!(game.legion(&d).unwrap().height(), 2);
        assert!(game.engagement().unwrap().reinforced);
        assert_eq!(phase(&game), BattlePhase::Maneuver);

        let err = game.apply(PlayerId(1), Command::DeclineReinforce).unwrap_err();
        assert_eq!(err.rejection(), Some(&Rejection::NoReinforcementPending));
    }

    #[test]
    fn test_reinforce_after_winning() {
        let (mut game, a, d) = battle_game(&["Ogre"], &["Ogre"], vec![], RuleOptions::default());
        // Keeps the attacker in the game after the battle
        game.place_extra(PlayerId(0), 2, &["Centaur", "Centaur"]);
        let ogre = species(&game, "Ogre");
        game.deploy(BattleSide::Defender, &[Hex::new(0, -3)]);
        pass_defender_half(&mut game);
        // The attacker never enters and loses its only creature
        game.apply(PlayerId(0), Command::DoneManeuvers).unwrap();
        game.apply(PlayerId(0), Command::DoneStrikes).unwrap();
        let events = game.apply(PlayerId(1), Command::DoneStrikes).unwrap();

        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::BattleEnded { outcome: BattleOutcome::Won(BattleSide::Defender), .. }
        )));
        assert!(events.contains(&GameEvent::ReinforcementOffered { marker: d.clone() }));
        assert!(game.legion(&a).is_none());
        // The offer holds the engagement open
        assert!(game.settle().is_empty());

        game.apply(PlayerId(1), Command::Reinforce { recruit: ogre, recruiters: vec![ogre] }).unwrap();
        assert_eq!(game.legion(&d).unwrap().height(), 2);
        let events = game.settle();
        assert!(events.contains(&GameEvent::EngagementSettled { hex: 1 }));
        assert_eq!(game.phase(), Phase::Muster);
    }

    #[test]
    fn test_drift_hurts_only_non_natives() {
        let (mut game, _, _) = battle_game(&["Ogre"], &["Ogre", "Troll"], vec![], RuleOptions::default());
        use_battleland(&mut game, Terrain::Tundra);
        let ids = game.deploy(BattleSide::Defender, &[Hex::new(0, 0), Hex::new(-1, 1)]);
        let events = game.apply(PlayerId(1), Command::DoneManeuvers).unwrap();

        assert!(events.contains(&GameEvent::DriftDamage { creature: ids[0], killed: false }));
        assert!(!events.iter().any(|e| matches!(e, GameEvent::DriftDamage { creature, .. } if *creature == ids[1])));
        let units = game.side_units(BattleSide::Defender);
        assert_eq!(units[0].hits, 1);
        assert_eq!(units[1].hits, 0);
        assert_eq!(phase(&game), BattlePhase::Strike);
    }

    #[test]
    fn test_titan_death_ends_the_player() {
        // Troll: 8 dice needing 6s against the titan
        let (mut game, a, d) = battle_game(&["Troll"], &["Titan"], vec![6; 8], RuleOptions::default());
        let far = game.place_extra(PlayerId(1), 2, &["Centaur", "Centaur"]);
        let titan = game.deploy(BattleSide::Defender, &[Hex::new(0, 0)])[0];
        pass_defender_half(&mut game);
        let troll = game.deploy(BattleSide::Attacker, &[Hex::new(0, 1)])[0];
        game.apply(PlayerId(0), Command::DoneManeuvers).unwrap();
        let events = game.apply(PlayerId(0), Command::Strike { striker: troll, target: titan }).unwrap();
        assert!(matches!(events[0], GameEvent::Struck { killed: true, carry: 0, .. }));
        game.apply(PlayerId(0), Command::DoneStrikes).unwrap();
        let events = game.apply(PlayerId(1), Command::DoneStrikes).unwrap();

        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::BattleEnded { outcome: BattleOutcome::Won(BattleSide::Attacker), .. }
        )));
        // Titan 6x4 for the battle, then half of the unengaged centaurs
        assert!(events.contains(&GameEvent::LegionEliminated {
            marker: far.clone(),
            owner: PlayerId(1),
            fate: LegionFate::TitanLost,
            points: 12,
            scorer: Some(PlayerId(0)),
        }));
        assert!(game.legion(&d).is_none());
        assert!(game.legion(&far).is_none());
        assert!(game.legion(&a).is_some());
        assert_eq!(game.player(PlayerId(0)).unwrap().score, 36);
        assert!(game.player(PlayerId(1)).unwrap().titan_dead);

        let events = game.settle();
        assert!(events.contains(&GameEvent::PlayerEliminated { player: PlayerId(1) }));
        assert_eq!(game.winner(), Some(PlayerId(0)));
    }
}
