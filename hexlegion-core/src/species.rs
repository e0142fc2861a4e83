//! Creature species definitions

use serde::{Deserialize, Serialize};

/// Species identifier (index into a `SpeciesTable`)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpeciesId(pub u8);

impl SpeciesId {
    /// Placeholder for a creature whose identity is hidden from the observer
    pub const UNKNOWN: SpeciesId = SpeciesId(u8::MAX);

    pub fn is_unknown(self) -> bool {
        self == Self::UNKNOWN
    }
}

/// Character class
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreatureClass {
    Creature,
    Lord,
    DemiLord,
}

/// Immutable per-species statistics
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub name: String,
    pub power: u8,
    pub skill: u8,
    pub flies: bool,
    pub rangestrikes: bool,
    /// Rangestrike that ignores bramble and may target lords
    #[serde(default)]
    pub magic_missile: bool,
    pub class: CreatureClass,
    #[serde(default)]
    pub titan: bool,
    #[serde(default)]
    pub summonable: bool,
    /// Score threshold at which a legion may acquire this species (0 = never)
    #[serde(default)]
    pub acquire_at: u32,
    /// Population cap; titans are capped by seat count instead
    pub count: u8,
}

impl Species {
    pub fn creature(name: &str, power: u8, skill: u8, count: u8) -> Self {
        Self {
            name: name.to_string(),
            power,
            skill,
            flies: false,
            rangestrikes: false,
            magic_missile: false,
            class: CreatureClass::Creature,
            titan: false,
            summonable: false,
            acquire_at: 0,
            count,
        }
    }

    pub fn flying(mut self) -> Self {
        self.flies = true;
        self
    }

    pub fn ranged(mut self) -> Self {
        self.rangestrikes = true;
        self
    }

    pub fn with_class(mut self, class: CreatureClass) -> Self {
        self.class = class;
        self
    }

    pub fn magic(mut self) -> Self {
        self.rangestrikes = true;
        self.magic_missile = true;
        self
    }

    pub fn as_titan(mut self) -> Self {
        self.titan = true;
        self
    }

    /// Summonable, and granted to a legion whose score crosses `threshold`
    pub fn acquired_at(mut self, threshold: u32) -> Self {
        self.summonable = true;
        self.acquire_at = threshold;
        self
    }

    pub fn is_lord(&self) -> bool {
        self.class == CreatureClass::Lord
    }

    /// Lords and demi-lords return to the pool instead of the dead pile
    pub fn is_immortal(&self) -> bool {
        self.class != CreatureClass::Creature
    }

    /// Base point value
    pub fn points(&self) -> u32 {
        self.power as u32 * self.skill as u32
    }
}

/// Species table, loaded once and shared
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesTable {
    species: Vec<Species>,
}

impl SpeciesTable {
    pub fn new(species: Vec<Species>) -> Self {
        Self { species }
    }

    /// Get species id from name
    pub fn id(&self, name: &str) -> Option<SpeciesId> {
        self.species
            .iter()
            .position(|s| s.name == name)
            .map(|i| SpeciesId(i as u8))
    }

    /// Get species from id
    pub fn get(&self, id: SpeciesId) -> Option<&Species> {
        self.species.get(id.0 as usize)
    }

    pub fn name(&self, id: SpeciesId) -> &str {
        if id.is_unknown() {
            return "Unknown";
        }
        self.get(id).map(|s| s.name.as_str()).unwrap_or("?")
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SpeciesId, &Species)> {
        self.species
            .iter()
            .enumerate()
            .map(|(i, s)| (SpeciesId(i as u8), s))
    }

    pub fn is_lord(&self, id: SpeciesId) -> bool {
        self.get(id).map_or(false, Species::is_lord)
    }

    pub fn is_titan(&self, id: SpeciesId) -> bool {
        self.get(id).map_or(false, |s| s.titan)
    }

    pub fn is_creature_class(&self, id: SpeciesId) -> bool {
        self.get(id).map_or(false, |s| s.class == CreatureClass::Creature)
    }

    pub fn points(&self, id: SpeciesId) -> u32 {
        self.get(id).map_or(0, Species::points)
    }

    /// The titan species, if the table has one
    pub fn titan(&self) -> Option<SpeciesId> {
        self.iter().find(|(_, s)| s.titan).map(|(id, _)| id)
    }

    /// Summonable species ordered by acquisition threshold, highest first
    pub fn acquirable(&self) -> Vec<SpeciesId> {
        let mut ids: Vec<_> = self
            .iter()
            .filter(|(_, s)| s.acquire_at > 0)
            .map(|(id, _)| id)
            .collect();
        ids.sort_by_key(|id| std::cmp::Reverse(self.get(*id).map_or(0, |s| s.acquire_at)));
        ids
    }
}
