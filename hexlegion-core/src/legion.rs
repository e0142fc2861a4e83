//! Legions: marked stacks of creatures and the rules that guard them

use crate::creature::{CreatureId, CreatureInstance};
use crate::error::Rejection;
use crate::player::PlayerId;
use crate::pool::CreaturePool;
use crate::species::{SpeciesId, SpeciesTable};
use crate::strategic::{EntrySide, HexLabel};
use serde::{Deserialize, Serialize};

/// Height a legion may reach only on turn 1, before its first split
pub const STARTING_HEIGHT: usize = 8;

/// Minimum height of each half of a split
pub const MIN_SPLIT_HEIGHT: usize = 2;

/// Unique legion identity, e.g. `Bk03`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Marker(pub String);

impl Marker {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Record of this turn's recruit, kept for undo
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecruitRecord {
    pub creature: CreatureId,
    pub recruit: SpeciesId,
    pub recruiters: Vec<SpeciesId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Legion {
    pub marker: Marker,
    pub owner: PlayerId,
    pub hex: HexLabel,
    pub creatures: Vec<CreatureInstance>,
    pub moved: bool,
    pub teleported: bool,
    /// Hex occupied when the turn's movement began
    pub start_hex: HexLabel,
    pub entry_side: Option<EntrySide>,
    pub recruited: Option<RecruitRecord>,
    /// The legion this one was split from this turn
    pub split_from: Option<Marker>,
    /// Angels and archangels on offer after scoring
    pub pending_acquire: Vec<SpeciesId>,
}

impl Legion {
    pub fn new(marker: Marker, owner: PlayerId, hex: HexLabel, creatures: Vec<CreatureInstance>) -> Self {
        Self {
            marker,
            owner,
            hex,
            creatures,
            moved: false,
            teleported: false,
            start_hex: hex,
            entry_side: None,
            recruited: None,
            split_from: None,
            pending_acquire: Vec::new(),
        }
    }

    pub fn height(&self) -> usize {
        self.creatures.len()
    }

    pub fn species(&self) -> Vec<SpeciesId> {
        self.creatures.iter().map(|c| c.species).collect()
    }

    pub fn count_of(&self, species: SpeciesId) -> usize {
        self.creatures.iter().filter(|c| c.species == species).count()
    }

    pub fn has_lord(&self, table: &SpeciesTable) -> bool {
        self.creatures.iter().any(|c| table.is_lord(c.species))
    }

    pub fn has_titan(&self, table: &SpeciesTable) -> bool {
        self.creatures.iter().any(|c| table.is_titan(c.species))
    }

    pub fn creature(&self, id: CreatureId) -> Option<&CreatureInstance> {
        self.creatures.iter().find(|c| c.id == id)
    }

    pub fn creature_mut(&mut self, id: CreatureId) -> Option<&mut CreatureInstance> {
        self.creatures.iter_mut().find(|c| c.id == id)
    }

    /// Remove one creature of a species, preferring the most recent
    pub fn take_species(&mut self, species: SpeciesId) -> Option<CreatureInstance> {
        let index = self.creatures.iter().rposition(|c| c.species == species)?;
        Some(self.creatures.remove(index))
    }

    pub fn remove_creature(&mut self, id: CreatureId) -> Option<CreatureInstance> {
        let index = self.creatures.iter().position(|c| c.id == id)?;
        Some(self.creatures.remove(index))
    }

    /// Whether this legion may split on the given turn
    pub fn can_split(&self, turn: u32) -> bool {
        can_split(self.height(), turn)
    }

    /// Add a recruit taken from the pool.
    ///
    /// Repeating the recruit already made this turn is accepted and changes
    /// nothing (`Ok(false)`), so replayed commands are harmless.
    pub fn recruit_creature(
        &mut self,
        creature: CreatureId,
        recruit: SpeciesId,
        recruiters: &[SpeciesId],
        pool: &mut CreaturePool,
        max_height: usize,
    ) -> Result<bool, Rejection> {
        if let Some(done) = &self.recruited {
            if done.recruit == recruit {
                return Ok(false);
            }
            return Err(Rejection::AlreadyRecruited);
        }
        if self.height() >= max_height {
            return Err(Rejection::LegionFull);
        }
        pool.take_one(recruit)?;
        self.creatures.push(CreatureInstance::new(creature, recruit));
        self.recruited = Some(RecruitRecord {
            creature,
            recruit,
            recruiters: recruiters.to_vec(),
        });
        Ok(true)
    }

    /// Return this turn's recruit to the pool; `None` if there was none
    pub fn undo_recruit(&mut self, pool: &mut CreaturePool) -> Option<RecruitRecord> {
        let record = self.recruited.take()?;
        if self.remove_creature(record.creature).is_some() {
            pool.put_one_back(record.recruit);
        }
        Some(record)
    }

    /// Clear per-turn movement and recruit state
    pub fn begin_turn(&mut self) {
        self.moved = false;
        self.teleported = false;
        self.start_hex = self.hex;
        self.entry_side = None;
        self.recruited = None;
        self.split_from = None;
    }
}

pub fn can_split(height: usize, turn: u32) -> bool {
    if turn <= 1 {
        height == STARTING_HEIGHT
    } else {
        height >= 2 * MIN_SPLIT_HEIGHT
    }
}

fn sorted(species: &[SpeciesId]) -> Vec<SpeciesId> {
    let mut v = species.to_vec();
    v.sort();
    v
}

fn all_unknown(species: &[SpeciesId]) -> bool {
    species.iter().all(|s| s.is_unknown())
}

/// Whether `a` and `b` are a legal division of `parent`.
///
/// Contents may be all-unknown placeholders on both sides, in which case only
/// the heights are checked.
pub fn is_legal_split(parent: &[SpeciesId], a: &[SpeciesId], b: &[SpeciesId], table: &SpeciesTable) -> bool {
    if a.len() + b.len() != parent.len() {
        return false;
    }
    if a.len() < MIN_SPLIT_HEIGHT || b.len() < MIN_SPLIT_HEIGHT {
        return false;
    }

    let hidden = all_unknown(a) && all_unknown(b);
    if !hidden {
        let mut union = a.to_vec();
        union.extend_from_slice(b);
        if sorted(&union) != sorted(parent) {
            return false;
        }
    }

    if parent.len() == STARTING_HEIGHT {
        if a.len() != STARTING_HEIGHT / 2 {
            return false;
        }
        if !hidden {
            let lords = |side: &[SpeciesId]| side.iter().filter(|&&s| table.is_lord(s)).count();
            if lords(a) != 1 || lords(b) != 1 {
                return false;
            }
        }
    }
    true
}

/// Remove `wanted` species from `from`, returning the remainder, if all are present
pub fn subtract(from: &[SpeciesId], wanted: &[SpeciesId]) -> Option<Vec<SpeciesId>> {
    let mut rest = from.to_vec();
    for s in wanted {
        let index = rest.iter().position(|r| r == s)?;
        rest.remove(index);
    }
    Some(rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::Variant;

    fn starting(table: &SpeciesTable) -> Vec<SpeciesId> {
        ["Titan", "Angel", "Ogre", "Ogre", "Centaur", "Centaur", "Gargoyle", "Gargoyle"]
            .iter()
            .map(|n| table.id(n).unwrap())
            .collect()
    }

    fn ids(table: &SpeciesTable, names: &[&str]) -> Vec<SpeciesId> {
        names.iter().map(|n| table.id(n).unwrap()).collect()
    }

    #[test]
    fn test_can_split_rules() {
        assert!(can_split(8, 1));
        assert!(!can_split(7, 1));
        assert!(!can_split(3, 2));
        assert!(can_split(4, 2));
    }

    #[test]
    fn test_first_split_four_four_one_lord_each() {
        let variant = Variant::standard();
        let table = &variant.species;
        let parent = starting(table);

        let a = ids(table, &["Titan", "Ogre", "Centaur", "Gargoyle"]);
        let b = ids(table, &["Angel", "Ogre", "Centaur", "Gargoyle"]);
        assert!(is_legal_split(&parent, &a, &b, table));

        // Both lords on one side
        let a = ids(table, &["Titan", "Angel", "Centaur", "Gargoyle"]);
        let b = ids(table, &["Ogre", "Ogre", "Centaur", "Gargoyle"]);
        assert!(!is_legal_split(&parent, &a, &b, table));

        // 5/3
        let a = ids(table, &["Titan", "Ogre", "Ogre", "Centaur", "Gargoyle"]);
        let b = ids(table, &["Angel", "Centaur", "Gargoyle"]);
        assert!(!is_legal_split(&parent, &a, &b, table));
    }

    #[test]
    fn test_split_must_reconcile() {
        let variant = Variant::standard();
        let table = &variant.species;
        let parent = ids(table, &["Troll", "Troll", "Ogre", "Lion", "Lion"]);
        let a = ids(table, &["Troll", "Troll"]);
        let b = ids(table, &["Ogre", "Lion", "Lion"]);
        assert!(is_legal_split(&parent, &a, &b, table));

        let wrong = ids(table, &["Ogre", "Ogre", "Lion"]);
        assert!(!is_legal_split(&parent, &a, &wrong, table));

        let single = ids(table, &["Troll"]);
        let rest = ids(table, &["Troll", "Ogre", "Lion", "Lion"]);
        assert!(!is_legal_split(&parent, &single, &rest, table));
    }

    #[test]
    fn test_hidden_split_checks_heights_only() {
        let variant = Variant::standard();
        let table = &variant.species;
        let parent = vec![SpeciesId::UNKNOWN; 8];
        let half = vec![SpeciesId::UNKNOWN; 4];
        assert!(is_legal_split(&parent, &half, &half, table));
        let three = vec![SpeciesId::UNKNOWN; 3];
        let five = vec![SpeciesId::UNKNOWN; 5];
        assert!(!is_legal_split(&parent, &three, &five, table));
    }

    #[test]
    fn test_recruit_and_undo() {
        let variant = Variant::standard();
        let table = &variant.species;
        let mut pool = CreaturePool::new(table, 2);
        let ogre = table.id("Ogre").unwrap();
        let troll = table.id("Troll").unwrap();
        let creatures = (0..3).map(|i| CreatureInstance::new(i, ogre)).collect();
        let mut legion = Legion::new(Marker::new("Bk01"), PlayerId(0), 1, creatures);
        let before = pool.remaining(troll);

        assert_eq!(legion.recruit_creature(10, troll, &[ogre, ogre], &mut pool, 7), Ok(true));
        assert_eq!(legion.height(), 4);
        assert_eq!(pool.remaining(troll), before - 1);
        // Replay is a no-op, a different recruit is refused
        assert_eq!(legion.recruit_creature(11, troll, &[ogre, ogre], &mut pool, 7), Ok(false));
        assert_eq!(
            legion.recruit_creature(12, ogre, &[ogre], &mut pool, 7),
            Err(Rejection::AlreadyRecruited)
        );

        let record = legion.undo_recruit(&mut pool).unwrap();
        assert_eq!(record.recruit, troll);
        assert_eq!(legion.height(), 3);
        assert_eq!(pool.remaining(troll), before);
        assert!(legion.undo_recruit(&mut pool).is_none());
    }

    #[test]
    fn test_recruit_refused_at_max_height() {
        let variant = Variant::standard();
        let table = &variant.species;
        let mut pool = CreaturePool::new(table, 2);
        let ogre = table.id("Ogre").unwrap();
        let creatures = (0..7).map(|i| CreatureInstance::new(i, ogre)).collect();
        let mut legion = Legion::new(Marker::new("Bk01"), PlayerId(0), 1, creatures);
        assert_eq!(
            legion.recruit_creature(10, ogre, &[ogre], &mut pool, 7),
            Err(Rejection::LegionFull)
        );
    }

    #[test]
    fn test_subtract_multiset() {
        let a = vec![SpeciesId(1), SpeciesId(2), SpeciesId(1)];
        assert_eq!(subtract(&a, &[SpeciesId(1)]), Some(vec![SpeciesId(2), SpeciesId(1)]));
        assert_eq!(subtract(&a, &[SpeciesId(3)]), None);
    }
}
