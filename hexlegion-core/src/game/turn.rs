//! Strategic turn: split, move and muster

use super::{Game, Phase};
use crate::error::{EngineError, Rejection};
use crate::event::GameEvent;
use crate::legion::{is_legal_split, subtract, Legion, Marker};
use crate::player::PlayerId;
use crate::recruit::{available_recruits, is_legal_recruit};
use crate::species::SpeciesId;
use crate::strategic::{EntrySide, HexLabel, Teleport};
use std::sync::Arc;
use tracing::debug;

impl Game {
    // ========================================================================
    // SPLIT
    // ========================================================================

    pub(super) fn split(
        &mut self,
        player: PlayerId,
        parent: Marker,
        child: Marker,
        creatures: Vec<SpeciesId>,
    ) -> Result<Vec<GameEvent>, EngineError> {
        self.require_active(player)?;
        self.require_phase(Phase::Split, "split")?;
        let variant = Arc::clone(&self.variant);
        let Some(legion) = self.legions.get(&parent) else {
            return self.stale("split parent", &parent);
        };
        if legion.owner != player {
            return Err(Rejection::NotOwner.into());
        }
        if !legion.can_split(self.turn) {
            return Err(Rejection::CannotSplit { height: legion.height(), turn: self.turn }.into());
        }
        let contents = legion.species();
        let rest = subtract(&contents, &creatures).ok_or(Rejection::IllegalSplit)?;
        if !is_legal_split(&contents, &rest, &creatures, &variant.species) {
            return Err(Rejection::IllegalSplit.into());
        }
        let available = self.player(player).map_or(false, |p| p.markers.contains(&child));
        if !available {
            return Err(Rejection::MarkerUnavailable.into());
        }

        let hex = legion.hex;
        if let Some(p) = self.player_mut(player) {
            p.take_marker(&child);
        }
        let mut moved = Vec::with_capacity(creatures.len());
        if let Some(source) = self.legions.get_mut(&parent) {
            for &species in &creatures {
                if let Some(c) = source.take_species(species) {
                    moved.push(c);
                }
            }
        }
        if moved.len() != creatures.len() {
            return Err(self.invariant(format!("split of {parent} lost creatures")));
        }

        let mut new = Legion::new(child.clone(), player, hex, moved);
        new.split_from = Some(parent.clone());
        self.legions.insert(child.clone(), new);
        Ok(vec![GameEvent::LegionSplit { player, parent, child, creatures }])
    }

    pub(super) fn undo_split(&mut self, player: PlayerId, child: Marker) -> Result<Vec<GameEvent>, EngineError> {
        self.require_active(player)?;
        self.require_phase(Phase::Split, "undo split")?;
        let Some(legion) = self.legions.get(&child) else {
            return self.stale("split child", &child);
        };
        if legion.owner != player {
            return Err(Rejection::NotOwner.into());
        }
        let parent = legion.split_from.clone().ok_or(Rejection::NothingToUndo)?;
        if !self.legions.contains_key(&parent) {
            return Err(Rejection::NothingToUndo.into());
        }
        self.merge(&parent, &child);
        Ok(vec![GameEvent::SplitUndone { parent, child }])
    }

    /// Fold `child` back into `parent` and release its marker
    fn merge(&mut self, parent: &Marker, child: &Marker) {
        let Some(absorbed) = self.legions.remove(child) else {
            return;
        };
        if let Some(target) = self.legions.get_mut(parent) {
            target.creatures.extend(absorbed.creatures);
        }
        if let Some(owner) = self.player_mut(absorbed.owner) {
            owner.return_marker(absorbed.marker);
        }
    }

    pub(super) fn done_splits(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, EngineError> {
        self.require_active(player)?;
        self.require_phase(Phase::Split, "finish splits")?;
        let max = self.options.max_legion_height;
        if self.legions.values().any(|l| l.owner == player && l.height() > max) {
            return Err(Rejection::MustSplitFirst.into());
        }

        let roll = self.dice.roll();
        if let Some(p) = self.player_mut(player) {
            p.movement_roll = Some(roll);
        }
        let mut events = vec![GameEvent::SplitsDone { player, roll }];
        self.set_phase(Phase::Move, &mut events);
        Ok(events)
    }

    // ========================================================================
    // MOVE
    // ========================================================================

    pub(super) fn take_mulligan(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, EngineError> {
        self.require_active(player)?;
        self.require_phase(Phase::Move, "take a mulligan")?;
        if !self.can_take_mulligan(player) {
            return Err(Rejection::MulliganUnavailable.into());
        }
        let roll = self.dice.roll();
        if let Some(p) = self.player_mut(player) {
            p.mulligans_left -= 1;
            p.movement_roll = Some(roll);
        }
        Ok(vec![GameEvent::MulliganTaken { player, roll }])
    }

    pub(super) fn move_legion(
        &mut self,
        player: PlayerId,
        marker: Marker,
        to: HexLabel,
        entry_side: Option<EntrySide>,
        teleport: bool,
    ) -> Result<Vec<GameEvent>, EngineError> {
        self.require_active(player)?;
        self.require_phase(Phase::Move, "move a legion")?;
        let variant = Arc::clone(&self.variant);
        let Some(roll) = self.player(player).and_then(|p| p.movement_roll) else {
            return Err(self.invariant(format!("{player} is moving without a movement roll")));
        };
        let Some(legion) = self.legions.get(&marker) else {
            return self.stale("moving legion", &marker);
        };
        if legion.owner != player {
            return Err(Rejection::NotOwner.into());
        }
        if legion.moved {
            return Err(Rejection::AlreadyMoved.into());
        }

        let options = self.moves_for(legion, roll);
        let chosen = options.into_iter().find(|m| m.hex == to).ok_or(Rejection::IllegalMove)?;

        let (side, kind) = if teleport {
            let kind = chosen.teleport.ok_or(Rejection::IllegalMove)?;
            let side = match kind {
                Teleport::Titan => Some(entry_side.unwrap_or_default()),
                Teleport::Tower => None,
            };
            (side, Some(kind))
        } else {
            let side = match entry_side {
                Some(s) if chosen.entry_sides.contains(&s) => s,
                Some(_) => return Err(Rejection::IllegalMove.into()),
                None => *chosen.entry_sides.first().ok_or(Rejection::IllegalMove)?,
            };
            (Some(side), None)
        };

        let table = &variant.species;
        let revealed = match kind {
            Some(Teleport::Titan) => legion.creatures.iter().map(|c| c.species).find(|&s| table.is_titan(s)),
            Some(Teleport::Tower) => legion.creatures.iter().map(|c| c.species).find(|&s| table.is_lord(s)),
            None => None,
        };
        let from = legion.hex;

        if let Some(legion) = self.legions.get_mut(&marker) {
            legion.hex = to;
            legion.moved = true;
            legion.entry_side = side;
            legion.teleported = kind.is_some();
        }
        if kind.is_some() {
            if let Some(p) = self.player_mut(player) {
                p.teleported = true;
            }
        }
        Ok(vec![GameEvent::LegionMoved { marker, from, to, entry_side: side, teleport: kind, revealed }])
    }

    pub(super) fn undo_move(&mut self, player: PlayerId, marker: Marker) -> Result<Vec<GameEvent>, EngineError> {
        self.require_active(player)?;
        self.require_phase(Phase::Move, "undo a move")?;
        let Some(legion) = self.legions.get_mut(&marker) else {
            return self.stale("legion to unmove", &marker);
        };
        if legion.owner != player {
            return Err(Rejection::NotOwner.into());
        }
        if !legion.moved {
            return Err(Rejection::NothingToUndo.into());
        }

        let teleported = legion.teleported;
        legion.hex = legion.start_hex;
        legion.moved = false;
        legion.teleported = false;
        legion.entry_side = None;
        let to = legion.hex;
        if teleported {
            if let Some(p) = self.player_mut(player) {
                p.teleported = false;
            }
        }
        Ok(vec![GameEvent::MoveUndone { marker, to }])
    }

    pub(super) fn done_moves(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, EngineError> {
        self.require_active(player)?;
        self.require_phase(Phase::Move, "finish moves")?;
        let any_moved = self.legions.values().any(|l| l.owner == player && l.moved);
        if !any_moved {
            let roll = self.player(player).and_then(|p| p.movement_roll).unwrap_or(0);
            let could_move = self
                .legions
                .values()
                .filter(|l| l.owner == player)
                .any(|l| !self.moves_for(l, roll).is_empty());
            if could_move {
                return Err(Rejection::MustMoveALegion.into());
            }
        }

        let mut events = Vec::new();
        let siblings: Vec<(Marker, Marker)> = self
            .legions
            .values()
            .filter(|l| l.owner == player)
            .filter_map(|l| {
                let parent = l.split_from.as_ref()?;
                let other = self.legions.get(parent)?;
                (other.hex == l.hex).then(|| (parent.clone(), l.marker.clone()))
            })
            .collect();
        for (parent, child) in siblings {
            debug!(%parent, %child, "recombining split legions left together");
            self.merge(&parent, &child);
            events.push(GameEvent::LegionsRecombined { parent, child });
        }

        let engagements = self.engagements();
        events.push(GameEvent::MovesDone { player, engagements });
        self.set_phase(Phase::Fight, &mut events);
        Ok(events)
    }

    // ========================================================================
    // MUSTER
    // ========================================================================

    pub(super) fn recruit(
        &mut self,
        player: PlayerId,
        marker: Marker,
        recruit: SpeciesId,
        recruiters: Vec<SpeciesId>,
    ) -> Result<Vec<GameEvent>, EngineError> {
        self.require_active(player)?;
        self.require_phase(Phase::Muster, "recruit")?;
        let variant = Arc::clone(&self.variant);
        let Some(legion) = self.legions.get(&marker) else {
            return self.stale("recruiting legion", &marker);
        };
        if legion.owner != player {
            return Err(Rejection::NotOwner.into());
        }
        if !legion.moved {
            return Err(Rejection::NotEligibleToRecruit.into());
        }
        if let Some(done) = &legion.recruited {
            if done.recruit == recruit {
                return Ok(Vec::new());
            }
            return Err(Rejection::AlreadyRecruited.into());
        }
        if legion.height() >= self.options.max_legion_height {
            return Err(Rejection::LegionFull.into());
        }
        let terrain = self.board.terrain(legion.hex).ok_or(Rejection::IllegalRecruit)?;
        let tree = variant.recruit_tree(terrain).ok_or(Rejection::IllegalRecruit)?;
        let options = available_recruits(tree, &legion.species(), &variant.species, &self.pool);
        if !is_legal_recruit(&options, recruit, &recruiters) {
            return Err(Rejection::IllegalRecruit.into());
        }

        let creature = self.alloc_creature();
        let max = self.options.max_legion_height;
        if let Some(legion) = self.legions.get_mut(&marker) {
            legion.recruit_creature(creature, recruit, &recruiters, &mut self.pool, max)?;
        }
        Ok(vec![GameEvent::Recruited { marker, recruit, recruiters, creature }])
    }

    pub(super) fn undo_recruit(&mut self, player: PlayerId, marker: Marker) -> Result<Vec<GameEvent>, EngineError> {
        self.require_active(player)?;
        self.require_phase(Phase::Muster, "undo a recruit")?;
        let Some(legion) = self.legions.get_mut(&marker) else {
            return self.stale("legion to unrecruit", &marker);
        };
        if legion.owner != player {
            return Err(Rejection::NotOwner.into());
        }
        let record = legion.undo_recruit(&mut self.pool).ok_or(Rejection::NothingToUndo)?;
        Ok(vec![GameEvent::RecruitUndone { marker, recruit: record.recruit }])
    }

    pub(super) fn done_recruits(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, EngineError> {
        self.require_active(player)?;
        self.require_phase(Phase::Muster, "finish recruiting")?;
        let mut events = vec![GameEvent::RecruitsDone { player }];
        self.advance_to_next_player(&mut events);
        Ok(events)
    }

    /// Hand the turn to the next living player in seat order
    pub(super) fn advance_to_next_player(&mut self, events: &mut Vec<GameEvent>) {
        let seats = self.players.len();
        let current = self.active.0 as usize;
        let next = (1..=seats)
            .map(|step| (current + step) % seats)
            .find(|&i| self.players[i].alive);
        let Some(next) = next else {
            return;
        };
        if next <= current {
            self.turn += 1;
        }

        let id = PlayerId(next as u8);
        self.active = id;
        for legion in self.legions.values_mut().filter(|l| l.owner == id) {
            legion.begin_turn();
        }
        if let Some(p) = self.player_mut(id) {
            p.begin_turn();
        }
        self.set_phase(Phase::Split, events);
    }
}
