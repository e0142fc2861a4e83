//! Line of sight on a battleland
//!
//! A sight line is walked hex by hex along one side of the straight line
//! between the two endpoints, filling a `SightState`. Lines that run along a
//! hexspine are walked on both sides and are blocked only when both are.

use super::board::{Hexside, HexTerrain, TacticalBoard};
use crate::hex::{line, Hex, LineSide};

/// Everything a sight line crossed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SightState {
    /// Hexside each endpoint stands atop on the path, `[from, to]`
    pub atop: [Option<Hexside>; 2],
    /// A wall crossed away from either endpoint's own edge
    pub mid_wall: bool,
    pub obstacles: u8,
    pub walls: u8,
    /// A tree hex lies between the endpoints
    pub forest: bool,
    /// An occupied hex between the endpoints blocks sight
    pub creature: bool,
    /// Bramble hexes between the endpoints
    pub bramble: u8,
}

impl SightState {
    fn any_atop(&self, side: Hexside) -> bool {
        self.atop.iter().any(|a| *a == Some(side))
    }

    fn same_class_atop(&self) -> bool {
        matches!(self.atop, [Some(a), Some(b)] if a == b)
    }

    /// The target stands atop a wall on the path and the striker does not
    pub fn up_wall(&self) -> bool {
        self.atop[1] == Some(Hexside::Wall) && self.atop[0] != Some(Hexside::Wall)
    }

    pub fn is_blocked(&self) -> bool {
        if self.forest || self.creature {
            return true;
        }
        let atop_wall = self.any_atop(Hexside::Wall);
        if self.mid_wall && !atop_wall {
            return true;
        }
        if self.walls >= 2 && !atop_wall {
            return true;
        }
        self.obstacles >= 3 && !self.same_class_atop()
    }
}

/// Walk one side of the line from `from` to `to`
pub fn walk(
    board: &TacticalBoard,
    from: Hex,
    to: Hex,
    side: LineSide,
    occupied: &dyn Fn(Hex) -> bool,
) -> SightState {
    let path = line(from, to, side);
    let mut state = SightState::default();
    let n = path.len().saturating_sub(1);
    if n == 0 {
        return state;
    }

    for (i, pair) in path.windows(2).enumerate() {
        let Some(edge) = board.edge(pair[0], pair[1]) else {
            continue;
        };
        if edge.feature == Hexside::None {
            continue;
        }
        if edge.feature.is_obstacle() {
            state.obstacles += 1;
        }
        if edge.feature == Hexside::Wall {
            state.walls += 1;
        }
        if i == 0 && edge.upper == from {
            state.atop[0] = Some(edge.feature);
        } else if i == n - 1 && edge.upper == to {
            state.atop[1] = Some(edge.feature);
        } else if edge.feature == Hexside::Wall {
            state.mid_wall = true;
        }
    }

    let low = board.elevation(from).min(board.elevation(to));
    for i in 1..n {
        let hex = path[i];
        match board.hex_terrain(hex) {
            HexTerrain::Tree => state.forest = true,
            HexTerrain::Bramble => state.bramble += 1,
            _ => {}
        }
        if occupied(hex) && board.elevation(hex) >= low {
            let below_cliff = (i == 1 && is_cliff_below(board, from, hex))
                || (i == n - 1 && is_cliff_below(board, to, hex));
            if !below_cliff {
                state.creature = true;
            }
        }
    }
    state
}

fn is_cliff_below(board: &TacticalBoard, top: Hex, foot: Hex) -> bool {
    board
        .edge(top, foot)
        .map_or(false, |e| e.feature == Hexside::Cliff && e.upper == top)
}

/// True when every side of the line is blocked
pub fn is_los_blocked(board: &TacticalBoard, from: Hex, to: Hex, occupied: &dyn Fn(Hex) -> bool) -> bool {
    LineSide::BOTH
        .iter()
        .all(|&side| walk(board, from, to, side, occupied).is_blocked())
}

/// Fewest brambles crossed along any unblocked side; `None` without sight
pub fn bramble_count(board: &TacticalBoard, from: Hex, to: Hex, occupied: &dyn Fn(Hex) -> bool) -> Option<u8> {
    LineSide::BOTH
        .iter()
        .map(|&side| walk(board, from, to, side, occupied))
        .filter(|s| !s.is_blocked())
        .map(|s| s.bramble)
        .min()
}

/// The unblocked side with the fewest ranged penalties (brambles plus an
/// uphill wall); `None` without sight
pub fn clear_sight(board: &TacticalBoard, from: Hex, to: Hex, occupied: &dyn Fn(Hex) -> bool) -> Option<SightState> {
    LineSide::BOTH
        .iter()
        .map(|&side| walk(board, from, to, side, occupied))
        .filter(|s| !s.is_blocked())
        .min_by_key(|s| s.bramble + u8::from(s.up_wall()))
}
