//! Read-only queries over the match state
//!
//! Nothing here mutates. The command handlers validate against the same
//! queries, so a command built from a query result is always legal.

use super::battle::{living_occupancy, Battle, BattleUnit};
use super::engagement::{Engagement, EngagementStage};
use super::{Game, Phase};
use crate::creature::{CreatureId, Nativity};
use crate::legion::{Legion, Marker};
use crate::options::RuleOptions;
use crate::player::{Player, PlayerId};
use crate::pool::CreaturePool;
use crate::recruit::{available_recruits, RecruitOption};
use crate::species::SpeciesId;
use crate::strategic::{HexLabel, LegalMove, StrategicBoard, Terrain, TeleportRights};
use crate::tactical::board::BattleSide;
use crate::tactical::combat::StrikeProfile;
use crate::variant::Variant;
use std::collections::{BTreeMap, BTreeSet};

impl Game {
    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    pub fn options(&self) -> &RuleOptions {
        &self.options
    }

    pub fn board(&self) -> &StrategicBoard {
        &self.board
    }

    pub fn nativity(&self) -> &Nativity {
        &self.nativity
    }

    pub fn pool(&self) -> &CreaturePool {
        &self.pool
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn active_player(&self) -> PlayerId {
        self.active
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id.0 as usize)
    }

    /// Legions in marker order
    pub fn legions(&self) -> impl Iterator<Item = &Legion> {
        self.legions.values()
    }

    pub fn legion(&self, marker: &Marker) -> Option<&Legion> {
        self.legions.get(marker)
    }

    pub fn legions_of(&self, player: PlayerId) -> Vec<&Legion> {
        self.legions.values().filter(|l| l.owner == player).collect()
    }

    pub fn engagement(&self) -> Option<&Engagement> {
        self.engagement.as_ref()
    }

    pub fn battle(&self) -> Option<&Battle> {
        self.battle.as_ref()
    }

    /// Elimination groups, first out first; the winner closes the list
    pub fn finish_order(&self) -> &[Vec<PlayerId>] {
        &self.finish_order
    }

    /// Reason the match stopped on an engine defect
    pub fn halted(&self) -> Option<&str> {
        self.halted.as_deref()
    }

    pub fn is_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    pub fn winner(&self) -> Option<PlayerId> {
        if !self.is_over() {
            return None;
        }
        self.players.iter().find(|p| p.alive).map(|p| p.id)
    }

    // ========================================================================
    // STRATEGIC
    // ========================================================================

    /// Every destination for `legion` with `roll`, teleports included
    pub(super) fn moves_for(&self, legion: &Legion, roll: u8) -> Vec<LegalMove> {
        let table = &self.variant.species;
        let may_teleport = roll == self.options.teleport_roll
            && self.player(legion.owner).map_or(false, |p| !p.teleported);
        let rights = TeleportRights {
            tower: may_teleport && self.board.is_tower(legion.hex) && legion.has_lord(table),
            titan: may_teleport
                && legion.has_titan(table)
                && self.score_of(legion.owner) >= self.options.titan_teleport_score,
        };
        self.board
            .legal_moves(&self.occupancy(Some(&legion.marker)), legion.owner, legion.hex, roll, rights)
    }

    /// Legal moves for an unmoved legion of the active player
    pub fn legal_moves(&self, marker: &Marker) -> Vec<LegalMove> {
        if self.phase != Phase::Move {
            return Vec::new();
        }
        let Some(legion) = self.legions.get(marker) else {
            return Vec::new();
        };
        if legion.owner != self.active || legion.moved {
            return Vec::new();
        }
        match self.player(legion.owner).and_then(|p| p.movement_roll) {
            Some(roll) => self.moves_for(legion, roll),
            None => Vec::new(),
        }
    }

    pub fn can_take_mulligan(&self, player: PlayerId) -> bool {
        let Some(p) = self.player(player) else {
            return false;
        };
        self.turn == 1
            && self.phase == Phase::Move
            && player == self.active
            && p.mulligans_left > 0
            && p.movement_roll.is_some()
            && !self.legions.values().any(|l| l.owner == player && l.moved)
    }

    /// Hexes holding legions of more than one player
    pub fn engagements(&self) -> Vec<HexLabel> {
        let mut owners: BTreeMap<HexLabel, BTreeSet<PlayerId>> = BTreeMap::new();
        for legion in self.legions.values() {
            owners.entry(legion.hex).or_default().insert(legion.owner);
        }
        owners.into_iter().filter(|(_, o)| o.len() > 1).map(|(hex, _)| hex).collect()
    }

    /// A legion without lords may flee
    pub fn can_flee(&self, marker: &Marker) -> bool {
        self.legions
            .get(marker)
            .map_or(false, |l| !l.has_lord(&self.variant.species))
    }

    // ========================================================================
    // RECRUITING
    // ========================================================================

    /// Recruits a legion holding `species` could make in `terrain`
    pub fn recruits_in(&self, terrain: Terrain, species: &[SpeciesId]) -> Vec<RecruitOption> {
        match self.variant.recruit_tree(terrain) {
            Some(tree) => available_recruits(tree, species, &self.variant.species, &self.pool),
            None => Vec::new(),
        }
    }

    /// Recruits open to a legion during its owner's muster
    pub fn legal_recruits(&self, marker: &Marker) -> Vec<RecruitOption> {
        if self.phase != Phase::Muster {
            return Vec::new();
        }
        let Some(legion) = self.legions.get(marker) else {
            return Vec::new();
        };
        if legion.owner != self.active
            || !legion.moved
            || legion.recruited.is_some()
            || legion.height() >= self.options.max_legion_height
        {
            return Vec::new();
        }
        match self.board.terrain(legion.hex) {
            Some(terrain) => self.recruits_in(terrain, &legion.species()),
            None => Vec::new(),
        }
    }

    pub fn can_recruit(&self, marker: &Marker) -> bool {
        !self.legal_recruits(marker).is_empty()
    }

    /// Recruits the engaged defender may take as a reinforcement
    pub fn reinforcements(&self) -> Vec<RecruitOption> {
        let Some(engagement) = &self.engagement else {
            return Vec::new();
        };
        let Some(legion) = self.legions.get(&engagement.defender) else {
            return Vec::new();
        };
        if legion.height() >= self.options.max_legion_height {
            return Vec::new();
        }
        match self.board.terrain(engagement.hex) {
            Some(terrain) => self.recruits_in(terrain, &legion.species()),
            None => Vec::new(),
        }
    }

    pub(super) fn can_reinforce(&self) -> bool {
        self.engagement.as_ref().map_or(false, |e| !e.reinforced) && !self.reinforcements().is_empty()
    }

    /// Unengaged legions of `player` able to give up a summonable creature
    pub fn summon_donors(&self, player: PlayerId) -> Vec<(Marker, SpeciesId)> {
        let table = &self.variant.species;
        let engaged = self.engagements();
        let mut donors = Vec::new();
        for legion in self.legions.values() {
            if legion.owner != player || legion.height() < 2 || engaged.contains(&legion.hex) {
                continue;
            }
            let mut held: Vec<SpeciesId> = legion
                .species()
                .into_iter()
                .filter(|&s| table.get(s).map_or(false, |sp| sp.summonable))
                .collect();
            held.sort();
            held.dedup();
            donors.extend(held.into_iter().map(|s| (legion.marker.clone(), s)));
        }
        donors
    }

    /// Whether the engaged attacker may summon right now
    pub fn can_summon(&self) -> bool {
        let Some(engagement) = &self.engagement else {
            return false;
        };
        let Some(attacker) = self.legions.get(&engagement.attacker) else {
            return false;
        };
        let fresh = self.player(attacker.owner).map_or(false, |p| !p.summoned);
        fresh
            && attacker.height() < self.options.max_legion_height
            && !self.summon_donors(attacker.owner).is_empty()
    }

    // ========================================================================
    // BATTLE
    // ========================================================================

    /// Creatures of the striking side that may still strike
    pub fn strikers(&self) -> Vec<CreatureId> {
        let Some(battle) = &self.battle else {
            return Vec::new();
        };
        self.battle_units()
            .iter()
            .filter(|u| self.may_strike(battle, u))
            .map(|u| u.id)
            .collect()
    }

    /// Legal targets for `creature` with the dice and roll each would need
    pub fn strike_targets(&self, creature: CreatureId) -> Vec<(CreatureId, StrikeProfile)> {
        let Some(battle) = &self.battle else {
            return Vec::new();
        };
        let units = self.battle_units();
        let Some(striker) = units.iter().find(|u| u.id == creature) else {
            return Vec::new();
        };
        if !self.may_strike(battle, striker) {
            return Vec::new();
        }
        let occupancy = living_occupancy(&units);
        units
            .iter()
            .filter_map(|t| {
                self.strike_profile(&self.variant, battle, striker, t, &occupancy)
                    .map(|p| (t.id, p))
            })
            .collect()
    }

    /// Creatures that may take the pending carry
    pub fn carry_targets(&self) -> Vec<CreatureId> {
        let Some(battle) = &self.battle else {
            return Vec::new();
        };
        let Some(carry) = &battle.carry else {
            return Vec::new();
        };
        let units = self.battle_units();
        self.carry_candidates(&self.variant, battle, &units, carry)
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    /// Units of one side in the current battle
    pub fn side_units(&self, side: BattleSide) -> Vec<BattleUnit> {
        self.battle_units().into_iter().filter(|u| u.side == side).collect()
    }

    // ========================================================================
    // TURN ORDER
    // ========================================================================

    /// The player whose decision the match is waiting on
    pub fn actor(&self) -> Option<PlayerId> {
        if self.halted.is_some() || self.is_over() {
            return None;
        }
        if let Some(legion) = self.legions.values().find(|l| !l.pending_acquire.is_empty()) {
            return Some(legion.owner);
        }
        let Some(engagement) = &self.engagement else {
            return Some(self.active);
        };
        if engagement.pending_summon {
            return self.side_owner(BattleSide::Attacker);
        }
        if engagement.pending_reinforce {
            return self.side_owner(BattleSide::Defender);
        }
        match engagement.stage {
            EngagementStage::AwaitingFlee => self.side_owner(BattleSide::Defender),
            EngagementStage::AwaitingFight => self.side_owner(BattleSide::Attacker),
            EngagementStage::Battle => self
                .battle
                .as_ref()
                .and_then(|b| self.side_owner(b.striking_side())),
            EngagementStage::Settling => Some(self.active),
        }
    }
}
