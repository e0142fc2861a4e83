//! Events describing every change a command makes
//!
//! A command yields its own event first, followed by any consequences
//! (deaths, scoring, phase changes) in the order they happened.

use crate::creature::CreatureId;
use crate::game::battle::BattlePhase;
use crate::game::Phase;
use crate::hex::Hex;
use crate::legion::Marker;
use crate::player::PlayerId;
use crate::species::SpeciesId;
use crate::strategic::{EntrySide, HexLabel, Teleport};
use crate::tactical::board::BattleSide;
use serde::{Deserialize, Serialize};

/// How a legion left the board
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegionFate {
    Destroyed,
    Fled,
    Conceded,
    Settled,
    TimeLoss,
    /// Its titan died elsewhere
    TitanLost,
}

/// How a battle ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleOutcome {
    Won(BattleSide),
    Mutual,
    TimeLoss,
    Conceded(BattleSide),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    LegionSplit {
        player: PlayerId,
        parent: Marker,
        child: Marker,
        creatures: Vec<SpeciesId>,
    },
    SplitUndone {
        parent: Marker,
        child: Marker,
    },
    SplitsDone {
        player: PlayerId,
        roll: u8,
    },
    MulliganTaken {
        player: PlayerId,
        roll: u8,
    },
    LegionMoved {
        marker: Marker,
        from: HexLabel,
        to: HexLabel,
        entry_side: Option<EntrySide>,
        teleport: Option<Teleport>,
        /// Creature shown to justify a teleport
        revealed: Option<SpeciesId>,
    },
    MoveUndone {
        marker: Marker,
        to: HexLabel,
    },
    LegionsRecombined {
        parent: Marker,
        child: Marker,
    },
    MovesDone {
        player: PlayerId,
        engagements: Vec<HexLabel>,
    },
    EngagementStarted {
        hex: HexLabel,
        attacker: Marker,
        defender: Marker,
        attacker_contents: Vec<SpeciesId>,
        defender_contents: Vec<SpeciesId>,
    },
    LegionFled {
        marker: Marker,
    },
    FleeDeclined {
        marker: Marker,
    },
    LegionConceded {
        marker: Marker,
    },
    SettledMutually {
        hex: HexLabel,
    },
    BattleStarted {
        hex: HexLabel,
        attacker: Marker,
        defender: Marker,
        entry_side: EntrySide,
    },
    BattlePhaseChanged {
        turn: u8,
        phase: BattlePhase,
        active: BattleSide,
    },
    CreatureMoved {
        creature: CreatureId,
        from: Option<Hex>,
        to: Hex,
    },
    CreatureMoveUndone {
        creature: CreatureId,
        to: Option<Hex>,
    },
    Struck {
        striker: CreatureId,
        target: CreatureId,
        dice: u8,
        strike_number: u8,
        rolls: Vec<u8>,
        hits: u8,
        damage: u8,
        killed: bool,
        /// Hits that may still be carried
        carry: u8,
    },
    CarryApplied {
        target: CreatureId,
        damage: u8,
        killed: bool,
        carry_left: u8,
    },
    CarryForfeited {
        hits: u8,
    },
    DriftDamage {
        creature: CreatureId,
        killed: bool,
    },
    CreatureKilled {
        creature: CreatureId,
        species: SpeciesId,
        marker: Marker,
    },
    CreaturesRemoved {
        creatures: Vec<CreatureId>,
    },
    AngelSummoned {
        donor: Marker,
        marker: Marker,
        species: SpeciesId,
        creature: CreatureId,
    },
    SummonUndone {
        donor: Marker,
        creature: CreatureId,
    },
    SummonDeclined {
        marker: Marker,
    },
    SummonOffered {
        marker: Marker,
    },
    ReinforcementOffered {
        marker: Marker,
    },
    Reinforced {
        marker: Marker,
        recruit: SpeciesId,
        recruiters: Vec<SpeciesId>,
        creature: CreatureId,
    },
    ReinforceDeclined {
        marker: Marker,
    },
    BattleEnded {
        hex: HexLabel,
        outcome: BattleOutcome,
        turn: u8,
    },
    LegionEliminated {
        marker: Marker,
        owner: PlayerId,
        fate: LegionFate,
        points: u32,
        scorer: Option<PlayerId>,
    },
    PointsScored {
        player: PlayerId,
        points: u32,
        total: u32,
    },
    AcquisitionOffered {
        marker: Marker,
        offer: Vec<SpeciesId>,
    },
    AngelsAcquired {
        marker: Marker,
        species: Vec<SpeciesId>,
    },
    AcquisitionDeclined {
        marker: Marker,
    },
    EngagementSettled {
        hex: HexLabel,
    },
    Recruited {
        marker: Marker,
        recruit: SpeciesId,
        recruiters: Vec<SpeciesId>,
        creature: CreatureId,
    },
    RecruitUndone {
        marker: Marker,
        recruit: SpeciesId,
    },
    RecruitsDone {
        player: PlayerId,
    },
    PhaseChanged {
        player: PlayerId,
        turn: u32,
        phase: Phase,
    },
    PlayerEliminated {
        player: PlayerId,
    },
    GameOver {
        winner: Option<PlayerId>,
        finish_order: Vec<Vec<PlayerId>>,
    },
}
