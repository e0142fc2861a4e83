//! Points, angel acquisition and the removal of beaten legions

use super::Game;
use crate::creature::CreatureInstance;
use crate::error::{EngineError, Rejection};
use crate::event::{GameEvent, LegionFate};
use crate::legion::{Legion, Marker};
use crate::player::PlayerId;
use crate::species::SpeciesId;
use std::sync::Arc;
use tracing::info;

impl Game {
    /// Remove a legion that lost an engagement and credit its value.
    ///
    /// `battle_dead` is the value of its creatures already killed in battle.
    pub(super) fn lose_legion(
        &mut self,
        marker: &Marker,
        fate: LegionFate,
        battle_dead: u32,
        scorer: Option<PlayerId>,
        credit: Option<&Marker>,
        events: &mut Vec<GameEvent>,
    ) {
        let value = self.legions.get(marker).map_or(0, |l| self.legion_value(l)) + battle_dead;
        self.lose_legion_valued(marker, fate, value, scorer, credit, events);
    }

    /// As `lose_legion`, with the legion's full value already known
    pub(super) fn lose_legion_valued(
        &mut self,
        marker: &Marker,
        fate: LegionFate,
        value: u32,
        scorer: Option<PlayerId>,
        credit: Option<&Marker>,
        events: &mut Vec<GameEvent>,
    ) {
        let variant = Arc::clone(&self.variant);
        let Some(legion) = self.legions.get(marker) else {
            return;
        };
        let owner = legion.owner;
        let titan_died = fate != LegionFate::Fled && legion.has_titan(&variant.species);
        let points = match fate {
            LegionFate::Fled | LegionFate::Settled | LegionFate::TitanLost => value / 2,
            LegionFate::Destroyed | LegionFate::Conceded | LegionFate::TimeLoss => value,
        };

        match fate {
            // Nobody died: the creatures go home
            LegionFate::Fled | LegionFate::TitanLost => self.disband(marker),
            _ => self.destroy(marker),
        }
        info!(%marker, %owner, ?fate, points, "legion eliminated");
        events.push(GameEvent::LegionEliminated { marker: marker.clone(), owner, fate, points, scorer });

        if let Some(player) = scorer {
            self.award(player, points, credit, events);
        }
        if titan_died {
            self.titan_lost(owner, scorer, events);
        }
    }

    /// The player's titan is dead: every other legion they hold leaves the
    /// board, worth half to whoever engages it or else to the slayer
    pub(super) fn titan_lost(&mut self, owner: PlayerId, slayer: Option<PlayerId>, events: &mut Vec<GameEvent>) {
        match self.player_mut(owner) {
            Some(p) if !p.titan_dead => p.titan_dead = true,
            _ => return,
        }
        info!(player = %owner, ?slayer, "titan slain");

        let others: Vec<(Marker, crate::strategic::HexLabel)> = self
            .legions
            .values()
            .filter(|l| l.owner == owner)
            .map(|l| (l.marker.clone(), l.hex))
            .collect();
        for (marker, hex) in others {
            let engaging = self
                .legions
                .values()
                .find(|l| l.hex == hex && l.owner != owner)
                .map(|l| (l.owner, l.marker.clone()));
            let (scorer, credit) = match engaging {
                Some((player, legion)) => (Some(player), Some(legion)),
                None => (slayer, None),
            };
            self.lose_legion(&marker, LegionFate::TitanLost, 0, scorer, credit.as_ref(), events);
        }
    }

    /// Add points to a player; a crediting legion may be offered angels
    pub(super) fn award(&mut self, player: PlayerId, points: u32, credit: Option<&Marker>, events: &mut Vec<GameEvent>) {
        if points == 0 {
            return;
        }
        let Some(p) = self.player_mut(player) else {
            return;
        };
        let (before, total) = p.add_points(points);
        events.push(GameEvent::PointsScored { player, points, total });

        let Some(marker) = credit else {
            return;
        };
        let offer = match self.legions.get(marker) {
            Some(legion) if legion.owner == player => self.acquisition_offer(legion, before, total),
            _ => return,
        };
        if offer.is_empty() {
            return;
        }
        if let Some(legion) = self.legions.get_mut(marker) {
            legion.pending_acquire.extend(offer.iter().copied());
        }
        events.push(GameEvent::AcquisitionOffered { marker: marker.clone(), offer });
    }

    /// Creatures earned by a score rising from `before` to `after`
    pub(crate) fn acquisition_offer(&self, legion: &Legion, before: u32, after: u32) -> Vec<SpeciesId> {
        let acquirable = self.variant.species.acquirable();
        let (Some(&best), Some(&basic)) = (acquirable.first(), acquirable.last()) else {
            return Vec::new();
        };
        let crossed = |step: u32| if step == 0 { 0 } else { (after / step - before / step) as usize };
        let total = crossed(self.options.angel_step);
        let upgrades = if best == basic { 0 } else { crossed(self.options.archangel_step) };
        let room = self
            .options
            .max_legion_height
            .saturating_sub(legion.height() + legion.pending_acquire.len());

        let unclaimed = |species: SpeciesId| {
            let promised: usize = self
                .legions
                .values()
                .map(|l| l.pending_acquire.iter().filter(|&&s| s == species).count())
                .sum();
            (self.pool.remaining(species) as usize).saturating_sub(promised)
        };
        let mut left_best = unclaimed(best);
        let mut left_basic = unclaimed(basic);

        let mut offer = Vec::new();
        for i in 0..total.min(room) {
            if i < upgrades && left_best > 0 {
                offer.push(best);
                left_best -= 1;
            } else if left_basic > 0 {
                offer.push(basic);
                left_basic -= 1;
            }
        }
        offer
    }

    pub(super) fn acquire_angels(
        &mut self,
        player: PlayerId,
        marker: Marker,
        species: Vec<SpeciesId>,
    ) -> Result<Vec<GameEvent>, EngineError> {
        let variant = Arc::clone(&self.variant);
        let Some(legion) = self.legions.get(&marker) else {
            return self.stale("acquiring legion", &marker);
        };
        if legion.owner != player {
            return Err(Rejection::NotOwner.into());
        }
        if legion.pending_acquire.is_empty() {
            return Err(Rejection::NoAcquisitionPending.into());
        }

        // Any slot may be taken as the basic angel instead
        let acquirable = variant.species.acquirable();
        let basic = acquirable.last().copied();
        let mut offer = legion.pending_acquire.clone();
        for &wanted in &species {
            let slot = offer
                .iter()
                .position(|&o| o == wanted)
                .or_else(|| (Some(wanted) == basic).then(|| offer.iter().position(|o| acquirable.contains(o))).flatten())
                .ok_or(Rejection::IllegalAcquisition)?;
            offer.remove(slot);
        }
        if legion.height() + species.len() > self.options.max_legion_height {
            return Err(Rejection::LegionFull.into());
        }
        for &s in &species {
            let wanted = species.iter().filter(|&&o| o == s).count();
            if wanted > self.pool.remaining(s) as usize {
                return Err(Rejection::PoolExhausted.into());
            }
        }

        let mut creatures = Vec::with_capacity(species.len());
        for &s in &species {
            if self.pool.take_one(s).is_err() {
                return Err(self.invariant(format!("pool refused an acquisition checked against it: {s:?}")));
            }
            creatures.push(CreatureInstance::new(self.alloc_creature(), s));
        }
        if let Some(legion) = self.legions.get_mut(&marker) {
            legion.creatures.extend(creatures);
            legion.pending_acquire.clear();
        }
        Ok(vec![GameEvent::AngelsAcquired { marker, species }])
    }

    pub(super) fn decline_acquire(&mut self, player: PlayerId, marker: Marker) -> Result<Vec<GameEvent>, EngineError> {
        let Some(legion) = self.legions.get_mut(&marker) else {
            return self.stale("declining legion", &marker);
        };
        if legion.owner != player {
            return Err(Rejection::NotOwner.into());
        }
        if legion.pending_acquire.is_empty() {
            return Err(Rejection::NoAcquisitionPending.into());
        }
        legion.pending_acquire.clear();
        Ok(vec![GameEvent::AcquisitionDeclined { marker }])
    }
}
