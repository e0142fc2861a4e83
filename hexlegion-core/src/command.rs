//! Commands a player can issue

use crate::creature::CreatureId;
use crate::hex::Hex;
use crate::legion::Marker;
use crate::species::SpeciesId;
use crate::strategic::{EntrySide, HexLabel};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    // Split phase
    Split {
        parent: Marker,
        child: Marker,
        /// Species moved into the new legion
        creatures: Vec<SpeciesId>,
    },
    UndoSplit {
        child: Marker,
    },
    DoneSplits,

    // Move phase
    TakeMulligan,
    MoveLegion {
        marker: Marker,
        to: HexLabel,
        /// Required when several sides are possible
        entry_side: Option<EntrySide>,
        teleport: bool,
    },
    UndoMove {
        marker: Marker,
    },
    DoneMoves,

    // Fight phase
    ResolveEngagement {
        hex: HexLabel,
    },
    Flee,
    DeclineFlee,
    Concede {
        marker: Marker,
    },
    SettleMutually,
    Fight,

    // Battle
    MoveCreature {
        creature: CreatureId,
        to: Hex,
    },
    UndoCreatureMove {
        creature: CreatureId,
    },
    DoneManeuvers,
    Strike {
        striker: CreatureId,
        target: CreatureId,
    },
    ApplyCarry {
        target: CreatureId,
    },
    /// Ends either the strike or the counterstrike step
    DoneStrikes,
    SummonAngel {
        donor: Marker,
        species: SpeciesId,
    },
    UndoSummon,
    DeclineSummon,
    Reinforce {
        recruit: SpeciesId,
        recruiters: Vec<SpeciesId>,
    },
    DeclineReinforce,
    AcquireAngels {
        marker: Marker,
        species: Vec<SpeciesId>,
    },
    DeclineAcquire {
        marker: Marker,
    },

    // Muster phase
    Recruit {
        marker: Marker,
        recruit: SpeciesId,
        recruiters: Vec<SpeciesId>,
    },
    UndoRecruit {
        marker: Marker,
    },
    DoneRecruits,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Split { .. } => "split",
            Command::UndoSplit { .. } => "undo split",
            Command::DoneSplits => "finish splits",
            Command::TakeMulligan => "take a mulligan",
            Command::MoveLegion { .. } => "move a legion",
            Command::UndoMove { .. } => "undo a move",
            Command::DoneMoves => "finish moves",
            Command::ResolveEngagement { .. } => "resolve an engagement",
            Command::Flee => "flee",
            Command::DeclineFlee => "decline to flee",
            Command::Concede { .. } => "concede",
            Command::SettleMutually => "settle mutually",
            Command::Fight => "fight",
            Command::MoveCreature { .. } => "move a creature",
            Command::UndoCreatureMove { .. } => "undo a creature move",
            Command::DoneManeuvers => "finish maneuvers",
            Command::Strike { .. } => "strike",
            Command::ApplyCarry { .. } => "apply a carry",
            Command::DoneStrikes => "finish strikes",
            Command::SummonAngel { .. } => "summon",
            Command::UndoSummon => "undo a summon",
            Command::DeclineSummon => "decline to summon",
            Command::Reinforce { .. } => "reinforce",
            Command::DeclineReinforce => "decline to reinforce",
            Command::AcquireAngels { .. } => "acquire angels",
            Command::DeclineAcquire { .. } => "decline angels",
            Command::Recruit { .. } => "recruit",
            Command::UndoRecruit { .. } => "undo a recruit",
            Command::DoneRecruits => "finish recruiting",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_json() {
        let cmd = Command::MoveLegion {
            marker: Marker::new("Rd03"),
            to: 42,
            entry_side: Some(EntrySide::Left),
            teleport: false,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains(r#""type":"MoveLegion""#));
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);

        let done: Command = serde_json::from_str(r#"{"type":"DoneSplits"}"#).unwrap();
        assert_eq!(done, Command::DoneSplits);
    }
}
