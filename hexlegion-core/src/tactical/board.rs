//! Battlelands: terrain, elevation and hexside hazards of one battle

use crate::hex::{hexagon, opposite, Hex};
use crate::strategic::{EntrySide, Terrain};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// Battleland radius; every battleland is a 37-hex hexagon
pub const RADIUS: u8 = 3;

/// Terrain of a single battle hex
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HexTerrain {
    #[default]
    Plains,
    Tree,
    Bramble,
    Drift,
    Bog,
    Sand,
    Volcano,
    Lake,
    Tower,
}

/// Feature on one side of a battle hex, stored on the upper hex
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Hexside {
    #[default]
    None,
    Slope,
    Wall,
    Cliff,
    Dune,
    River,
}

impl Hexside {
    /// Features that count as obstacles for line of sight
    pub fn is_obstacle(self) -> bool {
        matches!(self, Hexside::Slope | Hexside::Wall | Hexside::Cliff | Hexside::Dune)
    }
}

/// Anything a creature can be native to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Hazard {
    Terrain(HexTerrain),
    Side(Hexside),
}

/// Which legion a battle creature fights for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleSide {
    Attacker,
    Defender,
}

impl BattleSide {
    pub fn other(self) -> Self {
        match self {
            BattleSide::Attacker => BattleSide::Defender,
            BattleSide::Defender => BattleSide::Attacker,
        }
    }
}

// ============================================================================
// LAYOUT DATA
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BattleHexSpec {
    pub pos: Hex,
    pub terrain: HexTerrain,
    #[serde(default)]
    pub elevation: u8,
    #[serde(default)]
    pub sides: [Hexside; 6],
}

/// Unrotated layout of one terrain's battleland; unlisted hexes are flat plains
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BattlelandSpec {
    pub terrain: Terrain,
    pub hexes: Vec<BattleHexSpec>,
}

impl BattlelandSpec {
    pub fn new(terrain: Terrain) -> Self {
        Self { terrain, hexes: Vec::new() }
    }

    fn slot(&mut self, pos: Hex) -> &mut BattleHexSpec {
        let index = match self.hexes.iter().position(|h| h.pos == pos) {
            Some(i) => i,
            None => {
                self.hexes.push(BattleHexSpec {
                    pos,
                    terrain: HexTerrain::Plains,
                    elevation: 0,
                    sides: [Hexside::None; 6],
                });
                self.hexes.len() - 1
            }
        };
        &mut self.hexes[index]
    }

    pub fn hex(mut self, q: i8, r: i8, terrain: HexTerrain, elevation: u8) -> Self {
        let slot = self.slot(Hex::new(q, r));
        slot.terrain = terrain;
        slot.elevation = elevation;
        self
    }

    /// Put a feature on side `dir` of the (upper) hex at `(q, r)`
    pub fn side(mut self, q: i8, r: i8, dir: u8, side: Hexside) -> Self {
        self.slot(Hex::new(q, r)).sides[dir as usize % 6] = side;
        self
    }

    /// Same feature on several sides
    pub fn sides(mut self, q: i8, r: i8, dirs: &[u8], side: Hexside) -> Self {
        for &dir in dirs {
            self = self.side(q, r, dir, side);
        }
        self
    }

    /// Hazards present on this battleland, plains excluded
    pub fn hazards(&self) -> FxHashSet<Hazard> {
        let mut out = FxHashSet::default();
        for hex in &self.hexes {
            if !matches!(hex.terrain, HexTerrain::Plains | HexTerrain::Tower) {
                out.insert(Hazard::Terrain(hex.terrain));
            }
            for side in hex.sides {
                if side != Hexside::None {
                    out.insert(Hazard::Side(side));
                }
            }
        }
        out
    }
}

// ============================================================================
// BOARD
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TacticalHex {
    pub pos: Hex,
    pub terrain: HexTerrain,
    pub elevation: u8,
    pub sides: [Hexside; 6],
}

/// The hexside between two adjacent hexes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    pub feature: Hexside,
    /// The hex the feature belongs to, or the higher hex if there is none
    pub upper: Hex,
}

impl Edge {
    /// True when moving `from` across this edge goes downhill
    pub fn descends_from(&self, from: Hex) -> bool {
        self.feature != Hexside::None && self.upper == from
    }

    pub fn ascends_from(&self, from: Hex) -> bool {
        self.feature != Hexside::None && self.upper != from
    }
}

/// A battleland rotated for the side the attacker entered from
#[derive(Clone, Debug)]
pub struct TacticalBoard {
    terrain: Terrain,
    entry: EntrySide,
    hexes: FxHashMap<Hex, TacticalHex>,
}

impl TacticalBoard {
    pub fn new(spec: &BattlelandSpec, entry: EntrySide) -> Self {
        let rot = entry.rotation();
        let mut hexes: FxHashMap<Hex, TacticalHex> = hexagon(RADIUS)
            .into_iter()
            .map(|pos| {
                let hex = TacticalHex {
                    pos,
                    terrain: HexTerrain::Plains,
                    elevation: 0,
                    sides: [Hexside::None; 6],
                };
                (pos, hex)
            })
            .collect();

        for spec_hex in &spec.hexes {
            let pos = spec_hex.pos.rotated(rot);
            let Some(hex) = hexes.get_mut(&pos) else {
                tracing::warn!(%pos, terrain = ?spec.terrain, "battleland hex off the board, skipped");
                continue;
            };
            hex.terrain = spec_hex.terrain;
            hex.elevation = spec_hex.elevation;
            for (dir, side) in spec_hex.sides.iter().enumerate() {
                hex.sides[(dir + rot as usize) % 6] = *side;
            }
        }

        Self { terrain: spec.terrain, entry, hexes }
    }

    /// A featureless board, mostly for tests
    pub fn flat(terrain: Terrain) -> Self {
        Self::new(&BattlelandSpec::new(terrain), EntrySide::Bottom)
    }

    pub fn terrain(&self) -> Terrain {
        self.terrain
    }

    pub fn entry_side(&self) -> EntrySide {
        self.entry
    }

    pub fn get(&self, pos: Hex) -> Option<&TacticalHex> {
        self.hexes.get(&pos)
    }

    pub fn contains(&self, pos: Hex) -> bool {
        self.hexes.contains_key(&pos)
    }

    pub fn hex_terrain(&self, pos: Hex) -> HexTerrain {
        self.get(pos).map_or(HexTerrain::Plains, |h| h.terrain)
    }

    pub fn elevation(&self, pos: Hex) -> u8 {
        self.get(pos).map_or(0, |h| h.elevation)
    }

    pub fn hexes(&self) -> impl Iterator<Item = &TacticalHex> {
        self.hexes.values()
    }

    /// On-board neighbors with the direction leading to each
    pub fn neighbors(&self, pos: Hex) -> impl Iterator<Item = (u8, Hex)> + '_ {
        (0..6u8)
            .map(move |dir| (dir, pos.neighbor(dir)))
            .filter(|(_, n)| self.contains(*n))
    }

    /// Edge between two adjacent hexes
    pub fn edge(&self, a: Hex, b: Hex) -> Option<Edge> {
        let dir = a.direction_to(b)?;
        let ha = self.get(a)?;
        let hb = self.get(b)?;
        let mine = ha.sides[dir as usize];
        let theirs = hb.sides[opposite(dir) as usize];
        let edge = if mine != Hexside::None {
            Edge { feature: mine, upper: a }
        } else if theirs != Hexside::None {
            Edge { feature: theirs, upper: b }
        } else {
            let upper = if hb.elevation > ha.elevation { b } else { a };
            Edge { feature: Hexside::None, upper }
        };
        Some(edge)
    }

    /// Hexes a side's creatures enter through
    pub fn entrances(&self, side: BattleSide) -> Vec<Hex> {
        let row = match side {
            BattleSide::Attacker => RADIUS as i8,
            BattleSide::Defender => -(RADIUS as i8),
        };
        let mut out: Vec<Hex> = self.hexes.keys().copied().filter(|h| h.r == row).collect();
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hill() -> BattlelandSpec {
        BattlelandSpec::new(Terrain::Hills)
            .hex(0, 0, HexTerrain::Plains, 1)
            .sides(0, 0, &[0, 1, 2, 3, 4, 5], Hexside::Slope)
            .hex(1, 1, HexTerrain::Tree, 0)
    }

    #[test]
    fn test_board_has_full_hexagon() {
        let board = TacticalBoard::flat(Terrain::Plains);
        assert_eq!(board.hexes().count(), 37);
        assert_eq!(board.entrances(BattleSide::Attacker).len(), 4);
        assert_eq!(board.entrances(BattleSide::Defender).len(), 4);
    }

    #[test]
    fn test_edge_reports_upper_hex() {
        let board = TacticalBoard::new(&hill(), EntrySide::Bottom);
        let below = Hex::ORIGIN.neighbor(3);
        let edge = board.edge(below, Hex::ORIGIN).unwrap();
        assert_eq!(edge.feature, Hexside::Slope);
        assert_eq!(edge.upper, Hex::ORIGIN);
        assert!(edge.ascends_from(below));
        assert!(edge.descends_from(Hex::ORIGIN));
        assert!(board.edge(Hex::ORIGIN, Hex::new(3, 0)).is_none());
    }

    #[test]
    fn test_rotation_moves_terrain_and_sides() {
        let spec = BattlelandSpec::new(Terrain::Woods)
            .hex(0, 2, HexTerrain::Tree, 0)
            .side(0, 2, 0, Hexside::Wall);
        let bottom = TacticalBoard::new(&spec, EntrySide::Bottom);
        let right = TacticalBoard::new(&spec, EntrySide::Right);

        assert_eq!(bottom.hex_terrain(Hex::new(0, 2)), HexTerrain::Tree);
        let moved = Hex::new(0, 2).rotated(EntrySide::Right.rotation());
        assert_eq!(right.hex_terrain(moved), HexTerrain::Tree);
        assert_eq!(right.get(moved).unwrap().sides[2], Hexside::Wall);
        assert_eq!(right.hex_terrain(Hex::new(0, 2)), HexTerrain::Plains);
    }

    #[test]
    fn test_hazards_skip_plains() {
        let hazards = hill().hazards();
        assert!(hazards.contains(&Hazard::Terrain(HexTerrain::Tree)));
        assert!(hazards.contains(&Hazard::Side(Hexside::Slope)));
        assert!(!hazards.contains(&Hazard::Terrain(HexTerrain::Plains)));
    }
}
