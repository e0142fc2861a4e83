//! Strike arithmetic: dice, required rolls and carries

use super::board::{Hazard, Hexside, HexTerrain, TacticalBoard};
use super::los::clear_sight;
use crate::creature::Nativity;
use crate::hex::Hex;
use crate::species::{Species, SpeciesId};
use serde::{Deserialize, Serialize};

/// Highest roll a strike can require
pub const MAX_STRIKE_NUMBER: u8 = 6;

/// Rangestrikes at this distance or beyond are harder
pub const LONG_RANGE: i8 = 4;

/// One side of a strike
#[derive(Clone, Copy, Debug)]
pub struct Combatant<'a> {
    pub id: SpeciesId,
    pub species: &'a Species,
    /// Effective power
    pub power: u8,
    pub hex: Hex,
}

/// Dice thrown and the roll each die needs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrikeProfile {
    pub dice: u8,
    pub strike_number: u8,
    pub rangestrike: bool,
}

impl StrikeProfile {
    /// Whether a carry from a strike with this profile may land on a target
    /// whose own profile is `other`
    pub fn allows_carry_to(&self, other: &StrikeProfile) -> bool {
        !self.rangestrike && other.dice >= self.dice && other.strike_number <= self.strike_number
    }
}

fn base_strike_number(attacker: &Combatant, defender: &Combatant) -> i16 {
    (4 - attacker.species.skill as i16 + defender.species.skill as i16).clamp(1, MAX_STRIKE_NUMBER as i16)
}

/// Melee strike between adjacent creatures
pub fn melee_profile(board: &TacticalBoard, nativity: &Nativity, attacker: &Combatant, defender: &Combatant) -> StrikeProfile {
    let native = |h: Hazard| nativity.is_native(attacker.id, h);
    let native_sand = native(Hazard::Terrain(HexTerrain::Sand));

    let mut dice = attacker.power as i16;
    let mut number = base_strike_number(attacker, defender);

    if let Some(edge) = board.edge(attacker.hex, defender.hex) {
        let down = edge.descends_from(attacker.hex);
        let up = edge.ascends_from(attacker.hex);
        match edge.feature {
            Hexside::Slope if down && native(Hazard::Side(Hexside::Slope)) => dice += 1,
            Hexside::Slope if up && !native(Hazard::Side(Hexside::Slope)) => number += 1,
            Hexside::Wall if down => dice += 1,
            Hexside::Wall if up => number += 1,
            Hexside::Dune if down && native_sand => dice += 2,
            Hexside::Dune if up && !native_sand => dice -= 1,
            _ => {}
        }
    }

    let here = board.hex_terrain(attacker.hex);
    if here == HexTerrain::Volcano && native(Hazard::Terrain(HexTerrain::Volcano)) {
        dice += 2;
    }

    let bramble = Hazard::Terrain(HexTerrain::Bramble);
    if board.hex_terrain(defender.hex) == HexTerrain::Bramble
        && nativity.is_native(defender.id, bramble)
        && !native(bramble)
    {
        number += 1;
    }

    StrikeProfile {
        dice: dice.max(0) as u8,
        strike_number: number.clamp(1, MAX_STRIKE_NUMBER as i16) as u8,
        rangestrike: false,
    }
}

/// Ranged strike, or `None` if the attacker cannot rangestrike this target.
///
/// `occupied` reports hexes holding living creatures.
pub fn rangestrike_profile(
    board: &TacticalBoard,
    attacker: &Combatant,
    defender: &Combatant,
    occupied: &dyn Fn(Hex) -> bool,
) -> Option<StrikeProfile> {
    if !attacker.species.rangestrikes {
        return None;
    }
    let distance = attacker.hex.distance_to(defender.hex);
    if distance < 2 || distance > attacker.species.skill as i8 {
        return None;
    }
    if defender.species.is_lord() && !attacker.species.magic_missile {
        return None;
    }
    let sight = clear_sight(board, attacker.hex, defender.hex, occupied)?;
    let dice = attacker.power / 2;
    if dice == 0 {
        return None;
    }

    let mut number = base_strike_number(attacker, defender);
    if distance >= LONG_RANGE {
        number += 1;
    }
    if !attacker.species.magic_missile {
        number += sight.bramble as i16;
        if sight.up_wall() {
            number += 1;
        }
    }
    Some(StrikeProfile {
        dice,
        strike_number: number.clamp(1, MAX_STRIKE_NUMBER as i16) as u8,
        rangestrike: true,
    })
}

/// Dice at or above the strike number
pub fn count_hits(rolls: &[u8], strike_number: u8) -> u8 {
    rolls.iter().filter(|&&r| r >= strike_number).count() as u8
}
