//! Creature instances and terrain nativity

use crate::hex::Hex;
use crate::options::RuleOptions;
use crate::recruit::RecruitTree;
use crate::species::{Species, SpeciesId, SpeciesTable};
use crate::tactical::board::{BattlelandSpec, Hazard, HexTerrain};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// Unique per game
pub type CreatureId = u32;

/// One creature's live state on top of its species data
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatureInstance {
    pub id: CreatureId,
    pub species: SpeciesId,
    pub hits: u8,
    /// Battle hex, `None` while off-board
    pub position: Option<Hex>,
    pub moved: bool,
    pub struck: bool,
}

impl CreatureInstance {
    pub fn new(id: CreatureId, species: SpeciesId) -> Self {
        Self { id, species, hits: 0, position: None, moved: false, struck: false }
    }

    /// Remaining hits before death at the given power
    pub fn capacity(&self, power: u8) -> u8 {
        power.saturating_sub(self.hits)
    }

    pub fn is_dead(&self, power: u8) -> bool {
        self.hits >= power
    }

    /// Drop all battle state; surviving creatures heal completely
    pub fn leave_battle(&mut self) {
        self.hits = 0;
        self.position = None;
        self.moved = false;
        self.struck = false;
    }
}

/// Power including the titan's growth with its owner's score
pub fn effective_power(species: &Species, owner_score: u32, options: &RuleOptions) -> u8 {
    if species.titan && options.titan_points_per_power > 0 {
        let bonus = owner_score / options.titan_points_per_power;
        species.power.saturating_add(bonus.min(u8::MAX as u32) as u8)
    } else {
        species.power
    }
}

/// Point value of one creature
pub fn creature_points(species: &Species, owner_score: u32, options: &RuleOptions) -> u32 {
    effective_power(species, owner_score, options) as u32 * species.skill as u32
}

/// Which species are native to which hazards.
///
/// A species is native to every hazard found on the battlelands of the
/// terrains it can be recruited in. Volcano is excluded from that rule and
/// granted only to the listed exceptions.
#[derive(Clone, Debug, Default)]
pub struct Nativity {
    native: FxHashMap<SpeciesId, FxHashSet<Hazard>>,
}

impl Nativity {
    pub fn compute(
        table: &SpeciesTable,
        trees: &[RecruitTree],
        battlelands: &[BattlelandSpec],
        volcano_natives: &[SpeciesId],
    ) -> Self {
        let volcano = Hazard::Terrain(HexTerrain::Volcano);
        let mut native: FxHashMap<SpeciesId, FxHashSet<Hazard>> = FxHashMap::default();

        for tree in trees {
            let Some(land) = battlelands.iter().find(|b| b.terrain == tree.terrain) else {
                continue;
            };
            let mut hazards = land.hazards();
            hazards.remove(&volcano);
            for species in tree.recruitable_species() {
                if table.get(species).is_none() {
                    continue;
                }
                native.entry(species).or_default().extend(hazards.iter().copied());
            }
        }
        for &species in volcano_natives {
            native.entry(species).or_default().insert(volcano);
        }
        Self { native }
    }

    pub fn is_native(&self, species: SpeciesId, hazard: Hazard) -> bool {
        self.native.get(&species).map_or(false, |h| h.contains(&hazard))
    }

    pub fn is_native_to_terrain(&self, species: SpeciesId, terrain: HexTerrain) -> bool {
        self.is_native(species, Hazard::Terrain(terrain))
    }

    pub fn hazards(&self, species: SpeciesId) -> Vec<Hazard> {
        let mut out: Vec<Hazard> = self
            .native
            .get(&species)
            .map(|h| h.iter().copied().collect())
            .unwrap_or_default();
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tactical::board::Hexside;
    use crate::variant::Variant;

    #[test]
    fn test_titan_power_grows_with_score() {
        let variant = Variant::standard();
        let options = RuleOptions::default();
        let titan = variant.species.get(variant.species.titan().unwrap()).unwrap();
        assert_eq!(effective_power(titan, 0, &options), 6);
        assert_eq!(effective_power(titan, 250, &options), 8);
        assert_eq!(creature_points(titan, 250, &options), 32);

        let ogre = variant.species.get(variant.species.id("Ogre").unwrap()).unwrap();
        assert_eq!(effective_power(ogre, 900, &options), 6);
    }

    #[test]
    fn test_capacity_and_healing() {
        let mut c = CreatureInstance::new(1, SpeciesId(0));
        c.hits = 4;
        c.position = Some(Hex::ORIGIN);
        assert_eq!(c.capacity(6), 2);
        assert!(!c.is_dead(6));
        assert!(c.is_dead(4));
        c.leave_battle();
        assert_eq!(c.hits, 0);
        assert_eq!(c.position, None);
    }

    #[test]
    fn test_standard_nativity() {
        let variant = Variant::standard();
        let nativity = variant.nativity();
        let id = |n: &str| variant.species.id(n).unwrap();

        assert!(nativity.is_native_to_terrain(id("Troll"), HexTerrain::Bog));
        assert!(nativity.is_native_to_terrain(id("Lion"), HexTerrain::Sand));
        assert!(nativity.is_native(id("Lion"), Hazard::Side(Hexside::Dune)));
        assert!(nativity.is_native_to_terrain(id("Gargoyle"), HexTerrain::Bramble));
        assert!(!nativity.is_native_to_terrain(id("Ogre"), HexTerrain::Sand));
        // Volcano is granted only by exception
        assert!(nativity.is_native_to_terrain(id("Dragon"), HexTerrain::Volcano));
        assert!(!nativity.is_native_to_terrain(id("Colossus"), HexTerrain::Volcano));
        assert!(!nativity.is_native_to_terrain(id("Minotaur"), HexTerrain::Volcano));
    }
}
