//! Strategic board: the hex graph legions maneuver on

use crate::hex::{opposite, Hex};
use crate::player::PlayerId;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Strategic hex label
pub type HexLabel = u16;

/// Hops a tower teleport may cover through gates
pub const TOWER_TELEPORT_RANGE: u8 = 6;

/// Strategic terrain
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Terrain {
    #[default]
    Plains,
    Woods,
    Brush,
    Hills,
    Jungle,
    Desert,
    Marsh,
    Swamp,
    Mountains,
    Tundra,
    Tower,
}

impl Terrain {
    pub const ALL: [Terrain; 11] = [
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
        Terrain::Tower,
    ];
}

/// Hexside feature on the strategic board
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gate {
    #[default]
    None,
    /// Mandatory first exit
    Block,
    /// Usable on the first step only
    Arch,
    Arrow,
    Arrows,
}

impl Gate {
    fn opens_first_step(self) -> bool {
        matches!(self, Gate::Arch | Gate::Arrow | Gate::Arrows)
    }

    fn opens_later_step(self) -> bool {
        matches!(self, Gate::Arrow | Gate::Arrows)
    }
}

/// Which of the three battleland orientations an attacker enters from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntrySide {
    Left,
    #[default]
    Bottom,
    Right,
}

impl EntrySide {
    pub const ALL: [EntrySide; 3] = [EntrySide::Left, EntrySide::Bottom, EntrySide::Right];

    /// Fold a destination hexside (0-5) to one of three sides
    pub fn from_hexside(side: u8) -> Self {
        match (side % 6) / 2 {
            0 => EntrySide::Left,
            1 => EntrySide::Bottom,
            _ => EntrySide::Right,
        }
    }

    /// Sixty-degree steps the battleland is rotated by
    pub fn rotation(self) -> u8 {
        match self {
            EntrySide::Left => 4,
            EntrySide::Bottom => 0,
            EntrySide::Right => 2,
        }
    }
}

/// Serialized description of a strategic hex
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MasterHexSpec {
    pub label: HexLabel,
    pub terrain: Terrain,
    /// Plotted position; neighbors are derived from it
    pub position: Hex,
    pub exits: [Gate; 6],
}

/// A strategic hex with its neighbors linked
#[derive(Clone, Debug)]
pub struct MasterHex {
    pub label: HexLabel,
    pub terrain: Terrain,
    pub position: Hex,
    pub exits: [Gate; 6],
    pub neighbors: [Option<HexLabel>; 6],
}

impl MasterHex {
    pub fn block_direction(&self) -> Option<u8> {
        self.exits.iter().position(|&g| g == Gate::Block).map(|d| d as u8)
    }
}

/// Who stands where, seen from the board
#[derive(Clone, Debug, Default)]
pub struct Occupancy {
    by_hex: FxHashMap<HexLabel, Vec<PlayerId>>,
}

impl Occupancy {
    pub fn add(&mut self, hex: HexLabel, owner: PlayerId) {
        self.by_hex.entry(hex).or_default().push(owner);
    }

    pub fn friendly(&self, hex: HexLabel, player: PlayerId) -> usize {
        self.by_hex
            .get(&hex)
            .map_or(0, |owners| owners.iter().filter(|&&o| o == player).count())
    }

    pub fn enemies(&self, hex: HexLabel, player: PlayerId) -> usize {
        self.by_hex
            .get(&hex)
            .map_or(0, |owners| owners.iter().filter(|&&o| o != player).count())
    }

    pub fn is_empty(&self, hex: HexLabel) -> bool {
        self.by_hex.get(&hex).map_or(true, Vec::is_empty)
    }

    /// Held by exactly one legion, and that legion is hostile
    pub fn is_vulnerable_enemy(&self, hex: HexLabel, player: PlayerId) -> bool {
        self.enemies(hex, player) == 1 && self.friendly(hex, player) == 0
    }
}

/// Gate rules in force for the next step of a move
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Gating {
    /// Starting hex: arches and arrows both open
    FirstStep,
    /// Starting hex with a block: only this direction
    Block(u8),
    ArrowsOnly,
}

/// How a teleport was granted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Teleport {
    Tower,
    Titan,
}

/// Teleports the mover qualifies for this roll
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TeleportRights {
    pub tower: bool,
    pub titan: bool,
}

/// One legal destination for a legion
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalMove {
    pub hex: HexLabel,
    /// Entry sides reachable by normal movement (empty if teleport only)
    pub entry_sides: Vec<EntrySide>,
    pub teleport: Option<Teleport>,
}

impl LegalMove {
    pub fn is_normal(&self) -> bool {
        !self.entry_sides.is_empty()
    }
}

/// The strategic board
#[derive(Clone, Debug)]
pub struct StrategicBoard {
    hexes: BTreeMap<HexLabel, MasterHex>,
}

impl StrategicBoard {
    /// Link a layout into a board; duplicate labels or positions are rejected
    pub fn from_layout(layout: &[MasterHexSpec]) -> Result<Self, String> {
        let mut by_position: FxHashMap<Hex, HexLabel> = FxHashMap::default();
        for spec in layout {
            if by_position.insert(spec.position, spec.label).is_some() {
                return Err(format!("two strategic hexes plotted at {}", spec.position));
            }
        }

        let mut hexes = BTreeMap::new();
        for spec in layout {
            let mut neighbors = [None; 6];
            for (dir, slot) in neighbors.iter_mut().enumerate() {
                *slot = by_position.get(&spec.position.neighbor(dir as u8)).copied();
            }
            let hex = MasterHex {
                label: spec.label,
                terrain: spec.terrain,
                position: spec.position,
                exits: spec.exits,
                neighbors,
            };
            if hexes.insert(spec.label, hex).is_some() {
                return Err(format!("duplicate strategic hex label {}", spec.label));
            }
        }
        Ok(Self { hexes })
    }

    pub fn get(&self, label: HexLabel) -> Option<&MasterHex> {
        self.hexes.get(&label)
    }

    pub fn terrain(&self, label: HexLabel) -> Option<Terrain> {
        self.get(label).map(|h| h.terrain)
    }

    pub fn hexes(&self) -> impl Iterator<Item = &MasterHex> {
        self.hexes.values()
    }

    pub fn towers(&self) -> Vec<HexLabel> {
        self.hexes
            .values()
            .filter(|h| h.terrain == Terrain::Tower)
            .map(|h| h.label)
            .collect()
    }

    pub fn is_tower(&self, label: HexLabel) -> bool {
        self.terrain(label) == Some(Terrain::Tower)
    }

    // ========================================================================
    // NORMAL MOVES
    // ========================================================================

    /// Hexes reachable with exactly `roll` steps, paired with the entry side used
    pub fn find_normal_moves(
        &self,
        occupancy: &Occupancy,
        mover: PlayerId,
        from: HexLabel,
        roll: u8,
    ) -> BTreeSet<(HexLabel, EntrySide)> {
        let mut out = BTreeSet::new();
        if roll == 0 {
            return out;
        }
        let Some(start) = self.get(from) else {
            return out;
        };
        let gating = match start.block_direction() {
            Some(dir) => Gating::Block(dir),
            None => Gating::FirstStep,
        };
        self.search(occupancy, mover, from, roll, gating, None, &mut out);
        out
    }

    /// One level of the directional search.
    ///
    /// `came_from` is the hexside of `label` the legion entered through.
    #[allow(clippy::too_many_arguments)]
    fn search(
        &self,
        occupancy: &Occupancy,
        mover: PlayerId,
        label: HexLabel,
        roll: u8,
        gating: Gating,
        came_from: Option<u8>,
        out: &mut BTreeSet<(HexLabel, EntrySide)>,
    ) {
        let Some(hex) = self.get(label) else {
            return;
        };

        if let Some(side) = came_from {
            if occupancy.enemies(label, mover) > 0 {
                if occupancy.is_vulnerable_enemy(label, mover) {
                    out.insert((label, EntrySide::from_hexside(side)));
                }
                return;
            }
            if roll == 0 {
                if occupancy.friendly(label, mover) == 0 {
                    out.insert((label, EntrySide::from_hexside(side)));
                }
                return;
            }
        }

        for dir in 0..6u8 {
            if came_from == Some(dir) {
                continue;
            }
            let gate = hex.exits[dir as usize];
            let open = match gating {
                Gating::Block(block) => dir == block,
                Gating::FirstStep => gate.opens_first_step(),
                Gating::ArrowsOnly => gate.opens_later_step(),
            };
            if !open {
                continue;
            }
            if let Some(next) = hex.neighbors[dir as usize] {
                self.search(
                    occupancy,
                    mover,
                    next,
                    roll - 1,
                    Gating::ArrowsOnly,
                    Some(opposite(dir)),
                    out,
                );
            }
        }
    }

    // ========================================================================
    // TELEPORTS
    // ========================================================================

    /// Empty hexes within range through any gate, plus every other empty tower
    pub fn tower_teleport_moves(&self, occupancy: &Occupancy, from: HexLabel) -> BTreeSet<HexLabel> {
        let mut out = BTreeSet::new();
        let mut seen = BTreeSet::from([from]);
        let mut queue = VecDeque::from([(from, 0u8)]);

        while let Some((label, hops)) = queue.pop_front() {
            if label != from && occupancy.is_empty(label) {
                out.insert(label);
            }
            if hops == TOWER_TELEPORT_RANGE {
                continue;
            }
            let Some(hex) = self.get(label) else {
                continue;
            };
            for dir in 0..6 {
                let Some(next) = hex.neighbors[dir] else {
                    continue;
                };
                let back = self
                    .get(next)
                    .map_or(Gate::None, |n| n.exits[opposite(dir as u8) as usize]);
                if hex.exits[dir] == Gate::None && back == Gate::None {
                    continue;
                }
                if seen.insert(next) {
                    queue.push_back((next, hops + 1));
                }
            }
        }

        for tower in self.towers() {
            if tower != from && occupancy.is_empty(tower) {
                out.insert(tower);
            }
        }
        out
    }

    /// Every hex held by a single enemy legion
    pub fn titan_teleport_moves(&self, occupancy: &Occupancy, mover: PlayerId) -> BTreeSet<HexLabel> {
        self.hexes
            .keys()
            .copied()
            .filter(|&label| occupancy.is_vulnerable_enemy(label, mover))
            .collect()
    }

    /// Union of normal and teleport destinations
    pub fn legal_moves(
        &self,
        occupancy: &Occupancy,
        mover: PlayerId,
        from: HexLabel,
        roll: u8,
        rights: TeleportRights,
    ) -> Vec<LegalMove> {
        let mut moves: BTreeMap<HexLabel, LegalMove> = BTreeMap::new();
        for (hex, side) in self.find_normal_moves(occupancy, mover, from, roll) {
            moves
                .entry(hex)
                .or_insert_with(|| LegalMove { hex, entry_sides: Vec::new(), teleport: None })
                .entry_sides
                .push(side);
        }

        let mut teleports = Vec::new();
        if rights.tower {
            teleports.extend(
                self.tower_teleport_moves(occupancy, from)
                    .into_iter()
                    .map(|h| (h, Teleport::Tower)),
            );
        }
        if rights.titan {
            teleports.extend(
                self.titan_teleport_moves(occupancy, mover)
                    .into_iter()
                    .map(|h| (h, Teleport::Titan)),
            );
        }
        for (hex, kind) in teleports {
            let entry = moves
                .entry(hex)
                .or_insert_with(|| LegalMove { hex, entry_sides: Vec::new(), teleport: None });
            entry.teleport.get_or_insert(kind);
        }

        moves.into_values().collect()
    }
}
