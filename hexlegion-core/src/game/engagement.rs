//! Engagements: resolving a hex held by two players

use super::{Game, Phase};
use crate::error::{EngineError, Rejection};
use crate::event::{BattleOutcome, GameEvent, LegionFate};
use crate::legion::Marker;
use crate::player::PlayerId;
use crate::strategic::HexLabel;
use crate::tactical::board::BattleSide;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Where an engagement stands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngagementStage {
    /// Defender may flee
    AwaitingFlee,
    /// Either side may concede or settle, or the battle starts
    AwaitingFight,
    Battle,
    /// Resolved; waiting on summon, reinforcement or acquisition choices
    Settling,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub hex: HexLabel,
    pub attacker: Marker,
    pub defender: Marker,
    pub stage: EngagementStage,
    pub pending_summon: bool,
    pub pending_reinforce: bool,
    pub reinforced: bool,
    /// Donor and creature of this engagement's summon, for undo
    pub summoned: Option<(Marker, crate::creature::CreatureId)>,
}

impl Engagement {
    pub fn marker(&self, side: BattleSide) -> &Marker {
        match side {
            BattleSide::Attacker => &self.attacker,
            BattleSide::Defender => &self.defender,
        }
    }

    pub fn side_of(&self, marker: &Marker) -> Option<BattleSide> {
        if *marker == self.attacker {
            Some(BattleSide::Attacker)
        } else if *marker == self.defender {
            Some(BattleSide::Defender)
        } else {
            None
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending_summon || self.pending_reinforce
    }
}

impl Game {
    /// Owner of one side of the current engagement
    pub(super) fn side_owner(&self, side: BattleSide) -> Option<PlayerId> {
        let engagement = self.engagement.as_ref()?;
        self.legions.get(engagement.marker(side)).map(|l| l.owner)
    }

    fn require_stage(&self, stage: EngagementStage, action: &'static str) -> Result<&Engagement, Rejection> {
        match &self.engagement {
            Some(e) if e.stage == stage => Ok(e),
            Some(_) => Err(Rejection::WrongPhase(action)),
            None => Err(Rejection::NoEngagement),
        }
    }

    pub(super) fn resolve_engagement(&mut self, player: PlayerId, hex: HexLabel) -> Result<Vec<GameEvent>, EngineError> {
        self.require_active(player)?;
        self.require_phase(Phase::Fight, "resolve an engagement")?;
        if self.engagement.is_some() {
            return Err(Rejection::EngagementInProgress.into());
        }
        if self.legions.values().any(|l| !l.pending_acquire.is_empty()) {
            return Err(Rejection::PendingDecisions.into());
        }
        if !self.engagements().contains(&hex) {
            return Err(Rejection::NoEngagement.into());
        }

        let here = self.legions_at(hex);
        let attacker = here.iter().find(|l| l.owner == player).map(|l| l.marker.clone());
        let defender = here.iter().find(|l| l.owner != player).map(|l| l.marker.clone());
        let (Some(attacker), Some(defender)) = (attacker, defender) else {
            return Err(Rejection::NoEngagement.into());
        };
        let attacker_contents = self.legions.get(&attacker).map(|l| l.species()).unwrap_or_default();
        let defender_contents = self.legions.get(&defender).map(|l| l.species()).unwrap_or_default();

        let stage = if self.can_flee(&defender) {
            EngagementStage::AwaitingFlee
        } else {
            EngagementStage::AwaitingFight
        };
        self.engagement = Some(Engagement {
            hex,
            attacker: attacker.clone(),
            defender: defender.clone(),
            stage,
            pending_summon: false,
            pending_reinforce: false,
            reinforced: false,
            summoned: None,
        });
        Ok(vec![GameEvent::EngagementStarted { hex, attacker, defender, attacker_contents, defender_contents }])
    }

    pub(super) fn flee(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, EngineError> {
        let engagement = self.require_stage(EngagementStage::AwaitingFlee, "flee")?;
        let (attacker, defender) = (engagement.attacker.clone(), engagement.defender.clone());
        if self.side_owner(BattleSide::Defender) != Some(player) {
            return Err(Rejection::NotYourTurn.into());
        }
        if !self.can_flee(&defender) {
            return Err(Rejection::CannotFlee.into());
        }

        let mut events = vec![GameEvent::LegionFled { marker: defender.clone() }];
        let scorer = self.side_owner(BattleSide::Attacker);
        self.lose_legion(&defender, LegionFate::Fled, 0, scorer, Some(&attacker), &mut events);
        self.enter_settling();
        Ok(events)
    }

    pub(super) fn decline_flee(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, EngineError> {
        let defender = self.require_stage(EngagementStage::AwaitingFlee, "decline to flee")?.defender.clone();
        if self.side_owner(BattleSide::Defender) != Some(player) {
            return Err(Rejection::NotYourTurn.into());
        }
        if let Some(e) = self.engagement.as_mut() {
            e.stage = EngagementStage::AwaitingFight;
        }
        Ok(vec![GameEvent::FleeDeclined { marker: defender }])
    }

    pub(super) fn concede(&mut self, player: PlayerId, marker: Marker) -> Result<Vec<GameEvent>, EngineError> {
        let Some(engagement) = &self.engagement else {
            return Err(Rejection::NoEngagement.into());
        };
        let Some(side) = engagement.side_of(&marker) else {
            return self.stale("conceding legion", &marker);
        };
        if engagement.stage == EngagementStage::Settling {
            return Err(Rejection::WrongPhase("concede").into());
        }
        if self.side_owner(side) != Some(player) {
            return Err(Rejection::NotOwner.into());
        }

        let in_battle = engagement.stage == EngagementStage::Battle;
        let winner = engagement.marker(side.other()).clone();
        let mut events = vec![GameEvent::LegionConceded { marker: marker.clone() }];
        if in_battle {
            self.finish_battle(BattleOutcome::Conceded(side), &mut events);
        } else {
            let scorer = self.side_owner(side.other());
            self.lose_legion(&marker, LegionFate::Conceded, 0, scorer, Some(&winner), &mut events);
            self.enter_settling();
        }
        Ok(events)
    }

    /// Both legions are eliminated by agreement
    pub(super) fn settle_mutually(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, EngineError> {
        let engagement = self.require_stage(EngagementStage::AwaitingFight, "settle mutually")?;
        let (hex, attacker, defender) = (engagement.hex, engagement.attacker.clone(), engagement.defender.clone());
        let attacker_owner = self.side_owner(BattleSide::Attacker);
        let defender_owner = self.side_owner(BattleSide::Defender);
        if attacker_owner != Some(player) && defender_owner != Some(player) {
            return Err(Rejection::NotOwner.into());
        }

        let mut events = vec![GameEvent::SettledMutually { hex }];
        let variant = Arc::clone(&self.variant);
        let attacker_has_titan = self.legions.get(&attacker).map_or(false, |l| l.has_titan(&variant.species));
        let order = if attacker_has_titan {
            [(defender, attacker_owner), (attacker, defender_owner)]
        } else {
            [(attacker, defender_owner), (defender, attacker_owner)]
        };
        // Values are fixed before either legion leaves the board
        let values: Vec<u32> = order
            .iter()
            .map(|(m, _)| self.legions.get(m).map_or(0, |l| self.legion_value(l)))
            .collect();
        for ((marker, scorer), value) in order.iter().zip(values) {
            self.lose_legion_valued(marker, LegionFate::Settled, value, *scorer, None, &mut events);
        }
        self.enter_settling();
        Ok(events)
    }

    pub(super) fn fight(&mut self, player: PlayerId) -> Result<Vec<GameEvent>, EngineError> {
        self.require_stage(EngagementStage::AwaitingFight, "fight")?;
        let attacker_owner = self.side_owner(BattleSide::Attacker);
        let defender_owner = self.side_owner(BattleSide::Defender);
        if attacker_owner != Some(player) && defender_owner != Some(player) {
            return Err(Rejection::NotOwner.into());
        }
        let mut events = Vec::new();
        self.start_battle(&mut events);
        Ok(events)
    }

    /// Mark the engagement resolved; settle closes it once choices are made
    pub(super) fn enter_settling(&mut self) {
        if let Some(e) = self.engagement.as_mut() {
            e.stage = EngagementStage::Settling;
        }
        self.battle = None;
    }
}
