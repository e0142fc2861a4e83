//! Variant - the immutable static data a game is played with
//!
//! Species, recruit trees, the strategic board, battlelands and marker
//! names. Built in code for the standard game or loaded from JSON, validated
//! once, and shared read-only by every game that uses it.

use crate::creature::Nativity;
use crate::error::VariantError;
use crate::hex::{iter_hex_ring, Hex};
use crate::player::Color;
use crate::recruit::{RecruitStep, RecruitTree, StepKind};
use crate::species::{CreatureClass, Species, SpeciesId, SpeciesTable};
use crate::strategic::{Gate, HexLabel, MasterHexSpec, StrategicBoard, Terrain};
use crate::tactical::board::{BattlelandSpec, Hexside, HexTerrain};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Markers per color in the standard game
pub const MARKERS_PER_COLOR: usize = 12;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    pub species: SpeciesTable,
    pub recruit_trees: Vec<RecruitTree>,
    pub board: Vec<MasterHexSpec>,
    pub battlelands: Vec<BattlelandSpec>,
    pub markers: BTreeMap<Color, Vec<String>>,
    /// Species native to volcano despite never recruiting there
    pub volcano_natives: Vec<String>,
    pub starting_legion: Vec<String>,
}

impl Variant {
    // ========================================================================
    // LOOKUPS
    // ========================================================================

    pub fn recruit_tree(&self, terrain: Terrain) -> Option<&RecruitTree> {
        self.recruit_trees.iter().find(|t| t.terrain == terrain)
    }

    pub fn battleland(&self, terrain: Terrain) -> Option<&BattlelandSpec> {
        self.battlelands.iter().find(|b| b.terrain == terrain)
    }

    pub fn markers_for(&self, color: Color) -> &[String] {
        self.markers.get(&color).map_or(&[], Vec::as_slice)
    }

    pub fn strategic_board(&self) -> Result<StrategicBoard, VariantError> {
        StrategicBoard::from_layout(&self.board).map_err(VariantError::Board)
    }

    fn resolve(&self, names: &[String]) -> Result<Vec<SpeciesId>, VariantError> {
        names
            .iter()
            .map(|n| self.species.id(n).ok_or_else(|| VariantError::UnknownSpecies(n.clone())))
            .collect()
    }

    pub fn starting_species(&self) -> Result<Vec<SpeciesId>, VariantError> {
        self.resolve(&self.starting_legion)
    }

    /// Nativity table for this data set
    pub fn nativity(&self) -> Nativity {
        let volcano: Vec<SpeciesId> = self
            .volcano_natives
            .iter()
            .filter_map(|n| self.species.id(n))
            .collect();
        Nativity::compute(&self.species, &self.recruit_trees, &self.battlelands, &volcano)
    }

    // ========================================================================
    // LOAD / SAVE
    // ========================================================================

    /// Load and validate from a JSON file
    pub fn load(path: &Path) -> Result<Self, VariantError> {
        let content = std::fs::read_to_string(path)?;
        let variant: Variant = serde_json::from_str(&content)?;
        variant.validate()?;
        Ok(variant)
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> Result<(), VariantError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check that the pieces refer to each other consistently
    pub fn validate(&self) -> Result<(), VariantError> {
        if self.species.is_empty() || self.species.len() >= SpeciesId::UNKNOWN.0 as usize {
            return Err(VariantError::Invalid(format!("{} species", self.species.len())));
        }
        if self.species.iter().filter(|(_, s)| s.titan).count() != 1 {
            return Err(VariantError::Invalid("exactly one titan species required".into()));
        }

        for tree in &self.recruit_trees {
            for step in &tree.steps {
                if let StepKind::Species(id) = step.kind {
                    if self.species.get(id).is_none() {
                        return Err(VariantError::Invalid(format!(
                            "{:?} recruit tree names species {}",
                            tree.terrain, id.0
                        )));
                    }
                }
            }
        }

        let board = self.strategic_board()?;
        if board.towers().is_empty() {
            return Err(VariantError::Board("no tower hexes".into()));
        }
        for hex in board.hexes() {
            if self.recruit_tree(hex.terrain).is_none() {
                return Err(VariantError::Invalid(format!("no recruit tree for {:?}", hex.terrain)));
            }
        }

        self.resolve(&self.volcano_natives)?;
        if self.starting_species()?.is_empty() {
            return Err(VariantError::Invalid("empty starting legion".into()));
        }
        Ok(())
    }

    // ========================================================================
    // STANDARD DATA
    // ========================================================================

    /// The standard game
    pub fn standard() -> Self {
        let species = SpeciesTable::new(standard_species());
        let recruit_trees = standard_recruit_trees(&species);
        let markers = Color::ALL
            .iter()
            .map(|&color| {
                let names = (1..=MARKERS_PER_COLOR)
                    .map(|i| format!("{}{:02}", color.abbrev(), i))
                    .collect();
                (color, names)
            })
            .collect();

        Self {
            name: "standard".to_string(),
            species,
            recruit_trees,
            board: standard_board(),
            battlelands: standard_battlelands(),
            markers,
            volcano_natives: vec!["Dragon".to_string()],
            starting_legion: ["Titan", "Angel", "Ogre", "Ogre", "Centaur", "Centaur", "Gargoyle", "Gargoyle"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

fn standard_species() -> Vec<Species> {
    use CreatureClass::{DemiLord, Lord};
    vec![
        Species::creature("Angel", 6, 4, 18).flying().with_class(Lord).acquired_at(100),
        Species::creature("Archangel", 9, 4, 6).flying().with_class(Lord).acquired_at(500),
        Species::creature("Behemoth", 8, 3, 18),
        Species::creature("Centaur", 3, 4, 25),
        Species::creature("Colossus", 10, 4, 10),
        Species::creature("Cyclops", 9, 2, 28),
        Species::creature("Dragon", 9, 3, 18).flying().ranged(),
        Species::creature("Gargoyle", 4, 3, 21).flying(),
        Species::creature("Giant", 7, 4, 18).ranged(),
        Species::creature("Gorgon", 6, 3, 25).flying().ranged(),
        Species::creature("Griffon", 5, 4, 18).flying(),
        Species::creature("Guardian", 12, 2, 6).flying().with_class(DemiLord),
        Species::creature("Hydra", 10, 3, 10).ranged(),
        Species::creature("Lion", 5, 3, 28),
        Species::creature("Minotaur", 4, 4, 21).ranged(),
        Species::creature("Ogre", 6, 2, 25),
        Species::creature("Ranger", 4, 4, 28).flying().ranged(),
        Species::creature("Serpent", 18, 2, 10),
        Species::creature("Titan", 6, 4, 6).with_class(Lord).as_titan(),
        Species::creature("Troll", 8, 2, 28),
        Species::creature("Unicorn", 6, 4, 12),
        Species::creature("Warbear", 6, 3, 21),
        Species::creature("Warlock", 5, 4, 6).magic().with_class(Lord),
        Species::creature("Wyvern", 7, 3, 18).flying(),
    ]
}

fn standard_recruit_trees(table: &SpeciesTable) -> Vec<RecruitTree> {
    let s = |name: &str, count: u8| RecruitStep::species(table.id(name).unwrap_or(SpeciesId::UNKNOWN), count);
    let chain = |terrain: Terrain, links: &[(&str, u8)]| {
        RecruitTree::new(terrain, links.iter().map(|&(n, c)| s(n, c)).collect())
    };

    vec![
        chain(Terrain::Plains, &[("Centaur", 3), ("Lion", 2), ("Ranger", 0)]),
        chain(Terrain::Woods, &[("Centaur", 3), ("Warbear", 2), ("Unicorn", 0)]),
        chain(Terrain::Brush, &[("Gargoyle", 2), ("Cyclops", 2), ("Gorgon", 0)]),
        chain(Terrain::Hills, &[("Ogre", 3), ("Minotaur", 2), ("Unicorn", 0)]),
        chain(
            Terrain::Jungle,
            &[("Gargoyle", 2), ("Cyclops", 3), ("Behemoth", 2), ("Serpent", 0)],
        ),
        chain(Terrain::Desert, &[("Lion", 3), ("Griffon", 2), ("Hydra", 0)]),
        chain(Terrain::Marsh, &[("Ogre", 3), ("Troll", 2), ("Ranger", 0)]),
        chain(Terrain::Swamp, &[("Troll", 3), ("Wyvern", 2), ("Hydra", 0)]),
        chain(
            Terrain::Mountains,
            &[("Lion", 2), ("Minotaur", 2), ("Dragon", 2), ("Colossus", 0)],
        ),
        chain(
            Terrain::Tundra,
            &[("Troll", 2), ("Warbear", 2), ("Giant", 2), ("Colossus", 0)],
        ),
        RecruitTree::new(
            Terrain::Tower,
            vec![
                s("Centaur", 0),
                RecruitStep::BREAK,
                s("Gargoyle", 0),
                RecruitStep::BREAK,
                s("Ogre", 0),
                RecruitStep::BREAK,
                RecruitStep::any_creature(3),
                s("Guardian", 0),
                RecruitStep::BREAK,
                s("Titan", 1),
                s("Warlock", 0),
            ],
        ),
    ]
}

/// Label of the `index`th hex of a ring around the board center
fn ring_label(ring: u8, index: usize) -> HexLabel {
    let index = index as HexLabel;
    match ring {
        1 => (index + 1) * 100,
        2 => 1 + index,
        3 => 21 + index,
        _ => 41 + index,
    }
}

/// Towers on ring 1, then three rings of ordinary land.
///
/// Each ring carries arrows around itself, alternating direction ring to
/// ring. Arches, arrows and blocks cross between rings at regular spots.
fn standard_board() -> Vec<MasterHexSpec> {
    const LAND: [Terrain; 10] = [
        Terrain::Plains,
        Terrain::Woods,
        Terrain::Brush,
        Terrain::Hills,
        Terrain::Jungle,
        Terrain::Desert,
        Terrain::Marsh,
        Terrain::Swamp,
        Terrain::Mountains,
        Terrain::Tundra,
    ];
    const RINGS: u8 = 4;

    let rings: Vec<Vec<Hex>> = (1..=RINGS).map(|k| iter_hex_ring(Hex::ORIGIN, k).collect()).collect();
    let mut specs: Vec<MasterHexSpec> = Vec::new();
    let mut index_of: FxHashMap<Hex, usize> = FxHashMap::default();
    for (k, ring) in (1..=RINGS).zip(&rings) {
        for (j, &position) in ring.iter().enumerate() {
            let terrain = if k == 1 {
                Terrain::Tower
            } else {
                LAND[(j + 3 * k as usize) % LAND.len()]
            };
            index_of.insert(position, specs.len());
            specs.push(MasterHexSpec {
                label: ring_label(k, j),
                terrain,
                position,
                exits: [Gate::None; 6],
            });
        }
    }

    let mut open = |from: Hex, to: Hex, gate: Gate| {
        if let (Some(&i), Some(dir)) = (index_of.get(&from), from.direction_to(to)) {
            specs[i].exits[dir as usize] = gate;
        }
    };
    let across = |hex: Hex, ring: u8| -> Option<Hex> {
        (0..6u8)
            .map(|d| hex.neighbor(d))
            .find(|n| n.distance_to_center() == ring as i8)
    };

    for (k, ring) in (1..=RINGS).zip(&rings) {
        let n = ring.len();
        for (j, &hex) in ring.iter().enumerate() {
            if k == 1 {
                for d in 0..6u8 {
                    let out = hex.neighbor(d);
                    if out.distance_to_center() == 2 {
                        open(hex, out, Gate::Arrows);
                    }
                }
                continue;
            }

            let next = ring[(j + 1) % n];
            let gate = if k == RINGS && j % 3 == 0 { Gate::Arrows } else { Gate::Arrow };
            if k % 2 == 0 {
                open(hex, next, gate);
            } else {
                open(next, hex, gate);
            }

            let inward = across(hex, k - 1);
            let outward = across(hex, k + 1).filter(|_| k < RINGS);
            match k {
                2 if j % 2 == 0 => {
                    if let Some(tower) = inward {
                        open(hex, tower, Gate::Arch);
                    }
                }
                2 => {
                    if let Some(out) = outward {
                        open(hex, out, Gate::Arrow);
                    }
                }
                3 if j % 3 == 1 => {
                    if let Some(inner) = inward {
                        open(hex, inner, Gate::Arch);
                    }
                    if let Some(out) = outward {
                        open(hex, out, Gate::Arch);
                    }
                }
                3 if j % 3 == 0 => {
                    if let Some(out) = outward {
                        open(hex, out, Gate::Arrow);
                    }
                }
                4 if j % 4 == 0 => {
                    if let Some(inner) = inward {
                        open(hex, inner, Gate::Arrow);
                    }
                }
                4 if j % 4 == 2 => {
                    if let Some(inner) = inward {
                        open(hex, inner, Gate::Block);
                    }
                }
                _ => {}
            }
        }
    }
    specs
}

fn standard_battlelands() -> Vec<BattlelandSpec> {
    use HexTerrain::{Bog, Bramble, Drift, Sand, Tower, Tree, Volcano};
    const ALL_SIDES: [u8; 6] = [0, 1, 2, 3, 4, 5];

    let mut tower = BattlelandSpec::new(Terrain::Tower)
        .hex(0, 0, Tower, 2)
        .sides(0, 0, &ALL_SIDES, Hexside::Wall);
    for d in 0..6u8 {
        let h = Hex::ORIGIN.neighbor(d);
        tower = tower
            .hex(h.q, h.r, Tower, 1)
            .sides(h.q, h.r, &[(d + 5) % 6, d, (d + 1) % 6], Hexside::Wall);
    }

    vec![
        BattlelandSpec::new(Terrain::Plains)
            .hex(-1, 0, Tree, 0)
            .hex(2, -1, Tree, 0),
        BattlelandSpec::new(Terrain::Woods)
            .hex(0, 0, Tree, 0)
            .hex(-2, 1, Tree, 0)
            .hex(2, -2, Tree, 0)
            .hex(1, 1, Tree, 0)
            .hex(-1, -1, Tree, 0),
        BattlelandSpec::new(Terrain::Brush)
            .hex(0, 0, Bramble, 0)
            .hex(1, -1, Bramble, 0)
            .hex(-1, 1, Bramble, 0)
            .hex(-2, 0, Bramble, 0)
            .hex(2, 0, Bramble, 0)
            .hex(0, -2, Bramble, 0),
        BattlelandSpec::new(Terrain::Hills)
            .hex(0, -1, HexTerrain::Plains, 1)
            .sides(0, -1, &[2, 3, 4], Hexside::Slope)
            .hex(-2, 1, HexTerrain::Plains, 1)
            .sides(-2, 1, &ALL_SIDES, Hexside::Slope)
            .hex(2, 0, Tree, 0),
        BattlelandSpec::new(Terrain::Jungle)
            .hex(0, 0, Tree, 0)
            .hex(-2, 2, Tree, 0)
            .hex(1, -1, Bramble, 0)
            .hex(-1, 0, Bramble, 0)
            .hex(2, 1, Bramble, 0)
            .hex(0, 2, Bramble, 0),
        BattlelandSpec::new(Terrain::Desert)
            .hex(0, 0, Sand, 1)
            .sides(0, 0, &[3, 4], Hexside::Dune)
            .hex(1, 0, Sand, 1)
            .side(1, 0, 3, Hexside::Dune)
            .hex(-1, 1, Sand, 0)
            .hex(-2, -1, Sand, 0),
        BattlelandSpec::new(Terrain::Marsh)
            .hex(0, 0, Bog, 0)
            .hex(-1, -1, Bog, 0)
            .hex(2, -1, Bog, 0)
            .hex(-2, 2, Bog, 0),
        BattlelandSpec::new(Terrain::Swamp)
            .hex(0, 0, Bog, 0)
            .hex(1, 1, Bog, 0)
            .hex(-2, 0, Bog, 0)
            .hex(1, -2, Tree, 0)
            .hex(-1, 2, Tree, 0),
        BattlelandSpec::new(Terrain::Mountains)
            .hex(0, -1, Volcano, 2)
            .side(0, -1, 3, Hexside::Cliff)
            .hex(1, 0, HexTerrain::Plains, 1)
            .side(1, 0, 4, Hexside::Cliff)
            .hex(-2, 1, HexTerrain::Plains, 1)
            .sides(-2, 1, &[2, 3], Hexside::Cliff),
        BattlelandSpec::new(Terrain::Tundra)
            .hex(0, 0, Drift, 0)
            .hex(1, -2, Drift, 0)
            .hex(-1, 1, Drift, 0)
            .hex(2, 0, Drift, 0)
            .hex(-2, -1, Drift, 0),
        tower,
    ]
}
