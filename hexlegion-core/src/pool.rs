//! Shared creature pool ("caretaker")

use crate::error::PoolError;
use crate::species::{SpeciesId, SpeciesTable};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEntry {
    pub max: u8,
    pub remaining: u8,
    pub dead: u8,
}

/// Remaining and dead counts per species
///
/// For every species `remaining + in_play + dead == max` holds at all times.
#[derive(Clone, Debug, Default)]
pub struct CreaturePool {
    entries: FxHashMap<SpeciesId, PoolEntry>,
}

impl CreaturePool {
    /// Full pool for a table; titans are capped at one per seat
    pub fn new(table: &SpeciesTable, seats: usize) -> Self {
        let entries = table
            .iter()
            .map(|(id, species)| {
                let max = if species.titan { seats as u8 } else { species.count };
                (id, PoolEntry { max, remaining: max, dead: 0 })
            })
            .collect();
        Self { entries }
    }

    pub fn entry(&self, species: SpeciesId) -> Option<PoolEntry> {
        self.entries.get(&species).copied()
    }

    pub fn remaining(&self, species: SpeciesId) -> u8 {
        self.entries.get(&species).map_or(0, |e| e.remaining)
    }

    pub fn dead(&self, species: SpeciesId) -> u8 {
        self.entries.get(&species).map_or(0, |e| e.dead)
    }

    pub fn max_count(&self, species: SpeciesId) -> u8 {
        self.entries.get(&species).map_or(0, |e| e.max)
    }

    pub fn is_available(&self, species: SpeciesId) -> bool {
        self.remaining(species) > 0
    }

    pub fn number_in_play(&self, species: SpeciesId) -> u8 {
        self.entries
            .get(&species)
            .map_or(0, |e| e.max.saturating_sub(e.remaining + e.dead))
    }

    pub fn take_one(&mut self, species: SpeciesId) -> Result<(), PoolError> {
        let entry = self
            .entries
            .get_mut(&species)
            .ok_or(PoolError::UnknownSpecies(species))?;
        if entry.remaining == 0 {
            return Err(PoolError::Exhausted(species));
        }
        entry.remaining -= 1;
        Ok(())
    }

    /// Return one creature; overflow is clamped and logged
    pub fn put_one_back(&mut self, species: SpeciesId) {
        let Some(entry) = self.entries.get_mut(&species) else {
            tracing::warn!(?species, "put back of a species the pool does not track");
            return;
        };
        if entry.remaining + entry.dead >= entry.max {
            tracing::warn!(?species, "pool already full, ignoring put back");
            return;
        }
        entry.remaining += 1;
    }

    /// Send one creature to the dead pile; immortal species go back instead
    pub fn kill_one(&mut self, species: SpeciesId, table: &SpeciesTable) {
        if table.get(species).map_or(true, |s| s.is_immortal()) {
            self.put_one_back(species);
            return;
        }
        let Some(entry) = self.entries.get_mut(&species) else {
            tracing::warn!(?species, "kill of a species the pool does not track");
            return;
        };
        if entry.remaining + entry.dead >= entry.max {
            tracing::warn!(?species, "dead pile already full, ignoring kill");
            return;
        }
        entry.dead += 1;
    }

    pub fn iter(&self) -> impl Iterator<Item = (SpeciesId, PoolEntry)> + '_ {
        self.entries.iter().map(|(&id, &entry)| (id, entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::Variant;

    #[test]
    fn test_take_until_exhausted() {
        let variant = Variant::standard();
        let mut pool = CreaturePool::new(&variant.species, 2);
        let hydra = variant.species.id("Hydra").unwrap();
        let max = pool.max_count(hydra);
        for _ in 0..max {
            pool.take_one(hydra).unwrap();
        }
        assert_eq!(pool.take_one(hydra), Err(PoolError::Exhausted(hydra)));
        assert_eq!(pool.number_in_play(hydra), max);
    }

    #[test]
    fn test_kill_and_put_back() {
        let variant = Variant::standard();
        let table = &variant.species;
        let mut pool = CreaturePool::new(table, 2);
        let ogre = table.id("Ogre").unwrap();
        let angel = table.id("Angel").unwrap();

        pool.take_one(ogre).unwrap();
        pool.kill_one(ogre, table);
        assert_eq!(pool.dead(ogre), 1);
        assert_eq!(pool.number_in_play(ogre), 0);

        pool.take_one(angel).unwrap();
        pool.kill_one(angel, table);
        assert_eq!(pool.dead(angel), 0);
        assert_eq!(pool.remaining(angel), pool.max_count(angel));
    }

    #[test]
    fn test_put_back_clamps() {
        let variant = Variant::standard();
        let mut pool = CreaturePool::new(&variant.species, 2);
        let ogre = variant.species.id("Ogre").unwrap();
        pool.put_one_back(ogre);
        assert_eq!(pool.remaining(ogre), pool.max_count(ogre));
    }

    #[test]
    fn test_titans_capped_by_seats() {
        let variant = Variant::standard();
        let pool = CreaturePool::new(&variant.species, 3);
        let titan = variant.species.titan().unwrap();
        assert_eq!(pool.max_count(titan), 3);
    }
}
