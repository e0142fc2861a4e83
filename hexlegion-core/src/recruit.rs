//! Per-terrain recruit trees and the recruit search

use crate::pool::CreaturePool;
use crate::species::{SpeciesId, SpeciesTable};
use crate::strategic::Terrain;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// What a recruit step names
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    Species(SpeciesId),
    /// Any species at all
    Anything,
    /// Any creature-class species
    AnyCreature,
    /// Ends a sublist
    Break,
}

/// One entry of a recruit tree.
///
/// `count` is how many creatures of this step are needed to recruit the
/// species of the following step. Zero means the following species cannot
/// be recruited upward from this one (or, for a wildcard, needs nothing).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecruitStep {
    pub kind: StepKind,
    pub count: u8,
}

impl RecruitStep {
    pub const BREAK: RecruitStep = RecruitStep { kind: StepKind::Break, count: 0 };

    pub fn species(id: SpeciesId, count: u8) -> Self {
        Self { kind: StepKind::Species(id), count }
    }

    pub fn anything(count: u8) -> Self {
        Self { kind: StepKind::Anything, count }
    }

    pub fn any_creature(count: u8) -> Self {
        Self { kind: StepKind::AnyCreature, count }
    }
}

/// Ordered recruit steps for one terrain
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecruitTree {
    pub terrain: Terrain,
    pub steps: Vec<RecruitStep>,
}

impl RecruitTree {
    pub fn new(terrain: Terrain, steps: Vec<RecruitStep>) -> Self {
        Self { terrain, steps }
    }

    /// Steps split at break markers
    pub fn sublists(&self) -> impl Iterator<Item = &[RecruitStep]> {
        self.steps
            .split(|s| s.kind == StepKind::Break)
            .filter(|s| !s.is_empty())
    }

    /// Every species this terrain can ever recruit
    pub fn recruitable_species(&self) -> Vec<SpeciesId> {
        let mut out = Vec::new();
        for step in &self.steps {
            if let StepKind::Species(id) = step.kind {
                if !out.contains(&id) {
                    out.push(id);
                }
            }
        }
        out
    }
}

/// A recruit together with the creatures that must be revealed for it
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecruitOption {
    pub recruit: SpeciesId,
    pub recruiters: Vec<SpeciesId>,
}

fn count_of(legion: &[SpeciesId], species: SpeciesId) -> usize {
    legion.iter().filter(|&&s| s == species).count()
}

fn distinct(legion: &[SpeciesId]) -> Vec<SpeciesId> {
    let mut out: Vec<SpeciesId> = legion.to_vec();
    out.sort();
    out.dedup();
    out
}

/// Legal recruits for a legion's contents in a terrain.
///
/// Sorted by recruit value (highest first), then recruiter name.
pub fn available_recruits(
    tree: &RecruitTree,
    legion: &[SpeciesId],
    table: &SpeciesTable,
    pool: &CreaturePool,
) -> Vec<RecruitOption> {
    let mut options: Vec<RecruitOption> = Vec::new();
    let mut push = |recruit: SpeciesId, recruiters: Vec<SpeciesId>| {
        let option = RecruitOption { recruit, recruiters };
        if !options.contains(&option) {
            options.push(option);
        }
    };

    for sublist in tree.sublists() {
        for (i, step) in sublist.iter().enumerate() {
            let StepKind::Species(recruit) = step.kind else {
                continue;
            };

            // Same or down: one of this species or any later one in the sublist
            for later in &sublist[i..] {
                if let StepKind::Species(held) = later.kind {
                    if count_of(legion, held) > 0 {
                        push(recruit, vec![held]);
                    }
                }
            }

            let Some(prev) = i.checked_sub(1).map(|p| sublist[p]) else {
                continue;
            };
            let needed = prev.count as usize;
            match prev.kind {
                StepKind::Species(lower) => {
                    if needed > 0 && count_of(legion, lower) >= needed {
                        push(recruit, vec![lower; needed]);
                    }
                }
                StepKind::Anything | StepKind::AnyCreature if needed == 0 => {
                    push(recruit, Vec::new());
                }
                StepKind::Anything => {
                    for held in distinct(legion) {
                        if count_of(legion, held) >= needed {
                            push(recruit, vec![held; needed]);
                        }
                    }
                }
                StepKind::AnyCreature => {
                    for held in distinct(legion) {
                        if table.is_creature_class(held) && count_of(legion, held) >= needed {
                            push(recruit, vec![held; needed]);
                        }
                    }
                }
                StepKind::Break => {}
            }
        }
    }

    options.retain(|o| pool.is_available(o.recruit) && !table.is_titan(o.recruit));
    options.sort_by(|a, b| {
        let key = |o: &RecruitOption| {
            (
                Reverse(table.points(o.recruit)),
                o.recruiters.first().map(|&r| table.name(r).to_string()),
                o.recruiters.len(),
                table.name(o.recruit).to_string(),
            )
        };
        key(a).cmp(&key(b))
    });
    options
}

/// Whether `recruiters` is an acceptable way to recruit `recruit`
pub fn is_legal_recruit(
    options: &[RecruitOption],
    recruit: SpeciesId,
    recruiters: &[SpeciesId],
) -> bool {
    let mut wanted = recruiters.to_vec();
    wanted.sort();
    options.iter().any(|o| {
        let mut have = o.recruiters.clone();
        have.sort();
        o.recruit == recruit && have == wanted
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::Variant;

    fn ids(table: &SpeciesTable, names: &[&str]) -> Vec<SpeciesId> {
        names.iter().map(|n| table.id(n).unwrap()).collect()
    }

    fn names(table: &SpeciesTable, options: &[RecruitOption]) -> Vec<(String, Vec<String>)> {
        options
            .iter()
            .map(|o| {
                (
                    table.name(o.recruit).to_string(),
                    o.recruiters.iter().map(|r| table.name(*r).to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_tower_basic_creatures_only_recruit_themselves() {
        let variant = Variant::standard();
        let table = &variant.species;
        let pool = CreaturePool::new(table, 2);
        let legion = ids(table, &["Centaur", "Gargoyle", "Ogre", "Ogre"]);
        let tree = variant.recruit_tree(Terrain::Tower).unwrap();

        let options = available_recruits(tree, &legion, table, &pool);
        let mut got = names(table, &options);
        got.sort();
        assert_eq!(
            got,
            vec![
                ("Centaur".to_string(), vec!["Centaur".to_string()]),
                ("Gargoyle".to_string(), vec!["Gargoyle".to_string()]),
                ("Ogre".to_string(), vec!["Ogre".to_string()]),
            ]
        );
    }

    #[test]
    fn test_tower_titan_and_triples() {
        let variant = Variant::standard();
        let table = &variant.species;
        let pool = CreaturePool::new(table, 2);
        let legion = ids(table, &["Titan", "Ogre", "Ogre", "Ogre"]);
        let tree = variant.recruit_tree(Terrain::Tower).unwrap();

        let got = names(table, &available_recruits(tree, &legion, table, &pool));
        assert!(got.contains(&("Warlock".to_string(), vec!["Titan".to_string()])));
        assert!(got.contains(&("Guardian".to_string(), vec!["Ogre".to_string(); 3])));
        assert!(!got.iter().any(|(r, _)| r == "Titan"));
        // Guardian (12x2) outranks Warlock (5x4)
        assert_eq!(got[0].0, "Guardian");
    }

    #[test]
    fn test_up_recruit_needs_immediately_preceding_species() {
        let variant = Variant::standard();
        let table = &variant.species;
        let pool = CreaturePool::new(table, 2);
        let tree = variant.recruit_tree(Terrain::Plains).unwrap();

        // Three centaurs recruit a lion; two do not
        let three = ids(table, &["Centaur", "Centaur", "Centaur"]);
        let got = names(table, &available_recruits(tree, &three, table, &pool));
        assert!(got.contains(&("Lion".to_string(), vec!["Centaur".to_string(); 3])));
        assert!(!got.iter().any(|(r, _)| r == "Ranger"));

        let two = ids(table, &["Centaur", "Centaur"]);
        let got = names(table, &available_recruits(tree, &two, table, &pool));
        assert!(!got.iter().any(|(r, _)| r == "Lion"));

        // A ranger can recruit down the whole chain
        let ranger = ids(table, &["Ranger"]);
        let got = names(table, &available_recruits(tree, &ranger, table, &pool));
        let recruits: Vec<_> = got.iter().map(|(r, _)| r.as_str()).collect();
        assert_eq!(recruits, vec!["Ranger", "Lion", "Centaur"]);
    }

    #[test]
    fn test_wildcards() {
        let variant = Variant::standard();
        let table = &variant.species;
        let pool = CreaturePool::new(table, 2);
        let [ogre, troll, angel] = [
            table.id("Ogre").unwrap(),
            table.id("Troll").unwrap(),
            table.id("Angel").unwrap(),
        ];
        let tree = RecruitTree::new(
            Terrain::Plains,
            vec![
                RecruitStep::anything(0),
                RecruitStep::species(ogre, 0),
                RecruitStep::BREAK,
                RecruitStep::any_creature(2),
                RecruitStep::species(troll, 0),
            ],
        );

        let legion = vec![angel, angel];
        let options = available_recruits(&tree, &legion, table, &pool);
        assert!(options.contains(&RecruitOption { recruit: ogre, recruiters: vec![] }));
        // Angels are lords, so they do not satisfy the creature wildcard
        assert!(!options.iter().any(|o| o.recruit == troll));

        let legion = vec![ogre, ogre];
        let options = available_recruits(&tree, &legion, table, &pool);
        assert!(options.contains(&RecruitOption { recruit: troll, recruiters: vec![ogre, ogre] }));
    }

    #[test]
    fn test_pool_exhaustion_filters() {
        let variant = Variant::standard();
        let table = &variant.species;
        let mut pool = CreaturePool::new(table, 2);
        let centaur = table.id("Centaur").unwrap();
        while pool.take_one(centaur).is_ok() {}
        let tree = variant.recruit_tree(Terrain::Plains).unwrap();
        let options = available_recruits(tree, &[centaur], table, &pool);
        assert!(options.is_empty());
    }

    #[test]
    fn test_is_legal_recruit_ignores_order() {
        let variant = Variant::standard();
        let table = &variant.species;
        let pool = CreaturePool::new(table, 2);
        let tree = variant.recruit_tree(Terrain::Jungle).unwrap();
        let legion = ids(table, &["Cyclops", "Gargoyle", "Cyclops", "Cyclops"]);
        let options = available_recruits(tree, &legion, table, &pool);
        let behemoth = table.id("Behemoth").unwrap();
        let cyclops = table.id("Cyclops").unwrap();
        assert!(is_legal_recruit(&options, behemoth, &[cyclops, cyclops, cyclops]));
        assert!(!is_legal_recruit(&options, behemoth, &[cyclops, cyclops]));
    }
}
