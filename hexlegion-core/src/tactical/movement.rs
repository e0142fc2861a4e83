//! Creature movement on a battleland

use super::board::{BattleSide, Hazard, Hexside, HexTerrain, TacticalBoard};
use crate::creature::Nativity;
use crate::hex::Hex;
use crate::species::{Species, SpeciesId};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// Who stands where on the battleland
pub type BattleOccupancy = FxHashMap<Hex, BattleSide>;

/// A creature about to maneuver
#[derive(Clone, Copy, Debug)]
pub struct Mover<'a> {
    pub id: SpeciesId,
    pub species: &'a Species,
    /// `None` while still off-board
    pub from: Option<Hex>,
    pub side: BattleSide,
}

/// Hexes adjacent to `hex` holding the other side, cliffs excluded
pub fn adjacent_enemies(board: &TacticalBoard, occupancy: &BattleOccupancy, hex: Hex, side: BattleSide) -> Vec<Hex> {
    board
        .neighbors(hex)
        .filter(|&(_, n)| occupancy.get(&n) == Some(&side.other()))
        .filter(|&(_, n)| board.edge(hex, n).map_or(true, |e| e.feature != Hexside::Cliff))
        .map(|(_, n)| n)
        .collect()
}

pub fn is_engaged(board: &TacticalBoard, occupancy: &BattleOccupancy, hex: Hex, side: BattleSide) -> bool {
    !adjacent_enemies(board, occupancy, hex, side).is_empty()
}

/// Movement points a ground creature spends entering `to`, `None` if it cannot
pub fn step_cost(board: &TacticalBoard, nativity: &Nativity, id: SpeciesId, from: Option<Hex>, to: Hex) -> Option<u8> {
    let terrain = board.hex_terrain(to);
    let native = nativity.is_native_to_terrain(id, terrain);
    let mut cost = match terrain {
        HexTerrain::Bog | HexTerrain::Lake | HexTerrain::Tree | HexTerrain::Volcano if !native => return None,
        HexTerrain::Bramble | HexTerrain::Drift | HexTerrain::Sand if !native => 2,
        _ => 1,
    };

    if let Some(edge) = from.and_then(|f| board.edge(f, to)) {
        let side_native = nativity.is_native(id, Hazard::Side(edge.feature));
        match edge.feature {
            Hexside::Cliff => return None,
            Hexside::Wall if edge.upper == to => cost += 1,
            Hexside::Slope if edge.upper == to && !side_native => cost += 1,
            Hexside::River if !side_native => cost += 1,
            _ => {}
        }
    }
    Some(cost)
}

fn can_fly_over(nativity: &Nativity, id: SpeciesId, terrain: HexTerrain) -> bool {
    terrain != HexTerrain::Volcano || nativity.is_native_to_terrain(id, terrain)
}

fn can_land(nativity: &Nativity, id: SpeciesId, terrain: HexTerrain) -> bool {
    let native = nativity.is_native_to_terrain(id, terrain);
    native || !matches!(terrain, HexTerrain::Bog | HexTerrain::Lake | HexTerrain::Volcano)
}

/// Legal destinations for one creature this maneuver.
///
/// `occupancy` must not contain the mover itself.
pub fn legal_moves(
    board: &TacticalBoard,
    nativity: &Nativity,
    mover: &Mover,
    occupancy: &BattleOccupancy,
) -> BTreeSet<Hex> {
    if let Some(from) = mover.from {
        if is_engaged(board, occupancy, from, mover.side) {
            return BTreeSet::new();
        }
    }
    if mover.species.flies {
        flying_moves(board, nativity, mover, occupancy)
    } else {
        ground_moves(board, nativity, mover, occupancy)
    }
}

fn ground_moves(board: &TacticalBoard, nativity: &Nativity, mover: &Mover, occupancy: &BattleOccupancy) -> BTreeSet<Hex> {
    let speed = mover.species.skill;
    let mut best: FxHashMap<Hex, u8> = FxHashMap::default();
    let mut stack: Vec<(Hex, u8)> = Vec::new();

    match mover.from {
        Some(from) => stack.push((from, speed)),
        None => {
            for entrance in board.entrances(mover.side) {
                if occupancy.contains_key(&entrance) {
                    continue;
                }
                if let Some(cost) = step_cost(board, nativity, mover.id, None, entrance) {
                    if cost <= speed && best.get(&entrance).map_or(true, |&b| b < speed - cost) {
                        best.insert(entrance, speed - cost);
                        stack.push((entrance, speed - cost));
                    }
                }
            }
        }
    }

    while let Some((hex, left)) = stack.pop() {
        if Some(hex) != mover.from && is_engaged(board, occupancy, hex, mover.side) {
            continue;
        }
        for (_, next) in board.neighbors(hex) {
            if occupancy.contains_key(&next) || Some(next) == mover.from {
                continue;
            }
            let Some(cost) = step_cost(board, nativity, mover.id, Some(hex), next) else {
                continue;
            };
            if cost > left {
                continue;
            }
            let remaining = left - cost;
            if best.get(&next).map_or(true, |&b| b < remaining) {
                best.insert(next, remaining);
                stack.push((next, remaining));
            }
        }
    }
    best.into_keys().collect()
}

fn flying_moves(board: &TacticalBoard, nativity: &Nativity, mover: &Mover, occupancy: &BattleOccupancy) -> BTreeSet<Hex> {
    let speed = mover.species.skill;
    let mut dist: FxHashMap<Hex, u8> = FxHashMap::default();
    let mut frontier: Vec<Hex> = Vec::new();

    match mover.from {
        Some(from) => {
            dist.insert(from, 0);
            frontier.push(from);
        }
        None => {
            for entrance in board.entrances(mover.side) {
                if speed >= 1 && can_fly_over(nativity, mover.id, board.hex_terrain(entrance)) {
                    dist.insert(entrance, 1);
                    frontier.push(entrance);
                }
            }
        }
    }

    // Breadth-first: every hop costs one point
    while !frontier.is_empty() {
        let mut next_frontier = Vec::new();
        for hex in frontier {
            let d = dist.get(&hex).copied().unwrap_or(0);
            if d >= speed {
                continue;
            }
            for (_, next) in board.neighbors(hex) {
                if dist.contains_key(&next) || !can_fly_over(nativity, mover.id, board.hex_terrain(next)) {
                    continue;
                }
                dist.insert(next, d + 1);
                next_frontier.push(next);
            }
        }
        frontier = next_frontier;
    }

    dist.into_keys()
        .filter(|&h| Some(h) != mover.from)
        .filter(|h| !occupancy.contains_key(h))
        .filter(|&h| can_land(nativity, mover.id, board.hex_terrain(h)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategic::{EntrySide, Terrain};
    use crate::tactical::board::BattlelandSpec;
    use crate::variant::Variant;

    struct Fixture {
        variant: Variant,
        nativity: Nativity,
    }

    impl Fixture {
        fn new() -> Self {
            let variant = Variant::standard();
            let nativity = variant.nativity();
            Self { variant, nativity }
        }

        fn mover(&self, name: &str, from: Option<Hex>, side: BattleSide) -> Mover<'_> {
            let id = self.variant.species.id(name).unwrap();
            Mover { id, species: self.variant.species.get(id).unwrap(), from, side }
        }
    }

    #[test]
    fn test_ground_speed_on_flat_board() {
        let fx = Fixture::new();
        let board = TacticalBoard::flat(Terrain::Plains);
        // Ogre: skill 2
        let ogre = fx.mover("Ogre", Some(Hex::ORIGIN), BattleSide::Attacker);
        let moves = legal_moves(&board, &fx.nativity, &ogre, &BattleOccupancy::default());
        assert_eq!(moves.len(), 18);
        assert!(moves.iter().all(|h| h.distance_to(Hex::ORIGIN) <= 2));
        assert!(!moves.contains(&Hex::ORIGIN));
    }

    #[test]
    fn test_engaged_creature_cannot_move() {
        let fx = Fixture::new();
        let board = TacticalBoard::flat(Terrain::Plains);
        let mut occ = BattleOccupancy::default();
        occ.insert(Hex::new(0, -1), BattleSide::Defender);
        let ogre = fx.mover("Ogre", Some(Hex::ORIGIN), BattleSide::Attacker);
        assert!(legal_moves(&board, &fx.nativity, &ogre, &occ).is_empty());
    }

    #[test]
    fn test_movement_stops_next_to_enemy() {
        let fx = Fixture::new();
        let board = TacticalBoard::flat(Terrain::Plains);
        let mut occ = BattleOccupancy::default();
        occ.insert(Hex::new(0, -2), BattleSide::Defender);
        // Centaur: skill 4, but stops on (0,-1) which touches the enemy
        let centaur = fx.mover("Centaur", Some(Hex::new(0, 1)), BattleSide::Attacker);
        let moves = legal_moves(&board, &fx.nativity, &centaur, &occ);
        assert!(moves.contains(&Hex::new(0, -1)));
        assert!(!moves.contains(&Hex::new(0, -3)));
        assert!(!moves.contains(&Hex::new(0, -2)));
    }

    #[test]
    fn test_bog_and_bramble_costs() {
        let fx = Fixture::new();
        let spec = BattlelandSpec::new(Terrain::Marsh)
            .hex(0, -1, HexTerrain::Bog, 0)
            .hex(1, -1, HexTerrain::Bramble, 0);
        let board = TacticalBoard::new(&spec, EntrySide::Bottom);
        let occ = BattleOccupancy::default();

        let ogre = fx.mover("Ogre", Some(Hex::ORIGIN), BattleSide::Attacker);
        let moves = legal_moves(&board, &fx.nativity, &ogre, &occ);
        assert!(moves.contains(&Hex::new(0, -1))); // ogres recruit in the marsh
        assert!(moves.contains(&Hex::new(1, -1)));
        // Bramble costs the non-native ogre both points
        assert!(!moves.contains(&Hex::new(2, -2)));

        let lion = fx.mover("Lion", Some(Hex::ORIGIN), BattleSide::Attacker);
        let moves = legal_moves(&board, &fx.nativity, &lion, &occ);
        assert!(!moves.contains(&Hex::new(0, -1)));
    }

    #[test]
    fn test_cliff_stops_walkers_not_fliers() {
        let fx = Fixture::new();
        let spec = BattlelandSpec::new(Terrain::Mountains)
            .hex(0, -1, HexTerrain::Plains, 2)
            .sides(0, -1, &[0, 1, 2, 3, 4, 5], Hexside::Cliff);
        let board = TacticalBoard::new(&spec, EntrySide::Bottom);
        let occ = BattleOccupancy::default();

        let troll = fx.mover("Troll", Some(Hex::ORIGIN), BattleSide::Attacker);
        assert!(!legal_moves(&board, &fx.nativity, &troll, &occ).contains(&Hex::new(0, -1)));
        let griffon = fx.mover("Griffon", Some(Hex::ORIGIN), BattleSide::Attacker);
        assert!(legal_moves(&board, &fx.nativity, &griffon, &occ).contains(&Hex::new(0, -1)));
    }

    #[test]
    fn test_fliers_pass_over_creatures() {
        let fx = Fixture::new();
        let board = TacticalBoard::flat(Terrain::Plains);
        let mut occ = BattleOccupancy::default();
        for dir in 0..6 {
            occ.insert(Hex::ORIGIN.neighbor(dir), BattleSide::Attacker);
        }
        let gargoyle = fx.mover("Gargoyle", Some(Hex::ORIGIN), BattleSide::Attacker);
        let moves = legal_moves(&board, &fx.nativity, &gargoyle, &occ);
        assert!(moves.contains(&Hex::new(0, 2)));
        assert!(!moves.contains(&Hex::new(0, 1)));
    }

    #[test]
    fn test_entering_from_off_board() {
        let fx = Fixture::new();
        let board = TacticalBoard::flat(Terrain::Plains);
        let ogre = fx.mover("Ogre", None, BattleSide::Attacker);
        let moves = legal_moves(&board, &fx.nativity, &ogre, &BattleOccupancy::default());
        assert!(moves.contains(&Hex::new(0, 3)));
        assert!(moves.contains(&Hex::new(0, 2)));
        assert!(!moves.contains(&Hex::new(0, 1)));
        assert!(moves.iter().all(|h| h.r >= 2));
    }
}
