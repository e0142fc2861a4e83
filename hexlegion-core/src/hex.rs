//! Hex geometry with axial coordinates
//!
//! Shared by both boards: the strategic board plots its hexes on an axial
//! grid to derive neighbors, and every battleland is an axial hexagon.

use serde::{Deserialize, Serialize};

/// Axial hex coordinates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hex {
    pub q: i8,
    pub r: i8,
}

/// Direction vectors in axial coordinates (dq, dr)
/// Index: 0=N, 1=NE, 2=SE, 3=S, 4=SW, 5=NW
pub const DIRECTIONS: [(i8, i8); 6] = [
    (0, -1),  // N
    (1, -1),  // NE
    (1, 0),   // SE
    (0, 1),   // S
    (-1, 1),  // SW
    (-1, 0),  // NW
];

impl Hex {
    pub const ORIGIN: Hex = Hex { q: 0, r: 0 };

    pub const fn new(q: i8, r: i8) -> Self {
        Self { q, r }
    }

    /// Third cube coordinate
    pub fn s(&self) -> i8 {
        -self.q - self.r
    }

    /// Distance from center (0,0)
    pub fn distance_to_center(&self) -> i8 {
        (self.q.abs() + self.r.abs() + self.s().abs()) / 2
    }

    /// Distance between two hexes
    pub fn distance_to(&self, other: Hex) -> i8 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        (dq + dr + ds) / 2
    }

    /// Get neighbor in direction (0-5)
    pub fn neighbor(&self, direction: u8) -> Hex {
        let (dq, dr) = DIRECTIONS[direction as usize % 6];
        Hex::new(self.q + dq, self.r + dr)
    }

    /// Direction (0-5) leading to an adjacent hex
    pub fn direction_to(&self, other: Hex) -> Option<u8> {
        let delta = (other.q - self.q, other.r - self.r);
        DIRECTIONS.iter().position(|&d| d == delta).map(|i| i as u8)
    }

    /// Rotate clockwise around the origin by `sixths` sixty-degree steps.
    /// Direction `d` maps to direction `d + sixths`.
    pub fn rotated(&self, sixths: u8) -> Hex {
        let mut hex = *self;
        for _ in 0..sixths % 6 {
            hex = Hex::new(-hex.r, -hex.s());
        }
        hex
    }
}

impl std::fmt::Display for Hex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.q, self.r)
    }
}

/// Opposite direction
pub fn opposite(direction: u8) -> u8 {
    (direction + 3) % 6
}

/// All hex positions at exactly distance N from a center, walked in ring order
pub fn iter_hex_ring(center: Hex, distance: u8) -> impl Iterator<Item = Hex> {
    let distance = distance as i8;
    (0..6).flat_map(move |side| {
        let dir = DIRECTIONS[side];
        (0..distance).map(move |step| {
            // Start position for this side (corner of hexagon)
            let start_q = center.q + distance * DIRECTIONS[(side + 4) % 6].0;
            let start_r = center.r + distance * DIRECTIONS[(side + 4) % 6].1;
            // Walk along the edge
            Hex::new(start_q + step * dir.0, start_r + step * dir.1)
        })
    })
}

/// Every hex within `radius` of the origin, center first then ring by ring
pub fn hexagon(radius: u8) -> Vec<Hex> {
    let mut hexes = vec![Hex::ORIGIN];
    for ring in 1..=radius {
        hexes.extend(iter_hex_ring(Hex::ORIGIN, ring));
    }
    hexes
}

/// Which way a straight line is nudged before rounding.
///
/// A line that runs exactly along a hexspine rounds ambiguously; nudging it
/// both ways gives the two candidate hex paths on either side of the spine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineSide {
    Left,
    Right,
}

impl LineSide {
    pub const BOTH: [LineSide; 2] = [LineSide::Left, LineSide::Right];

    fn nudge(self) -> (f64, f64, f64) {
        const EPS: f64 = 1e-6;
        match self {
            LineSide::Left => (EPS, 2.0 * EPS, -3.0 * EPS),
            LineSide::Right => (-EPS, -2.0 * EPS, 3.0 * EPS),
        }
    }
}

/// Hexes on the straight line from `from` to `to`, both ends included.
///
/// The walk is symmetric: `line(b, a, side)` is `line(a, b, side)` reversed.
pub fn line(from: Hex, to: Hex, side: LineSide) -> Vec<Hex> {
    let n = from.distance_to(to) as i32;
    if n == 0 {
        return vec![from];
    }
    let (eq, er, es) = side.nudge();
    let (aq, ar, as_) = (from.q as f64 + eq, from.r as f64 + er, from.s() as f64 + es);
    let (bq, br, bs) = (to.q as f64 + eq, to.r as f64 + er, to.s() as f64 + es);

    (0..=n)
        .map(|i| {
            let t = i as f64 / n as f64;
            cube_round(aq + (bq - aq) * t, ar + (br - ar) * t, as_ + (bs - as_) * t)
        })
        .collect()
}

fn cube_round(q: f64, r: f64, s: f64) -> Hex {
    let mut rq = q.round();
    let mut rr = r.round();
    let rs = s.round();
    let dq = (rq - q).abs();
    let dr = (rr - r).abs();
    let ds = (rs - s).abs();
    if dq > dr && dq > ds {
        rq = -rr - rs;
    } else if dr > ds {
        rr = -rq - rs;
    }
    Hex::new(rq as i8, rr as i8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        assert_eq!(Hex::new(0, 0).distance_to_center(), 0);
        assert_eq!(Hex::new(1, 0).distance_to_center(), 1);
        assert_eq!(Hex::new(2, 2).distance_to_center(), 4);
        assert_eq!(Hex::new(-1, 3).distance_to(Hex::new(2, 0)), 3);
    }

    #[test]
    fn test_hex_ring() {
        let ring: Vec<_> = iter_hex_ring(Hex::ORIGIN, 1).collect();
        assert_eq!(ring.len(), 6);
        assert_eq!(iter_hex_ring(Hex::ORIGIN, 3).count(), 18);
        assert_eq!(hexagon(3).len(), 37);
    }

    #[test]
    fn test_direction_to_neighbor() {
        let center = Hex::new(1, -1);
        for dir in 0..6u8 {
            assert_eq!(center.direction_to(center.neighbor(dir)), Some(dir));
        }
        assert_eq!(center.direction_to(Hex::new(3, 3)), None);
    }

    #[test]
    fn test_rotation_advances_directions() {
        for dir in 0..6u8 {
            let hex = Hex::ORIGIN.neighbor(dir);
            assert_eq!(hex.rotated(1), Hex::ORIGIN.neighbor((dir + 1) % 6));
            assert_eq!(hex.rotated(6), hex);
        }
        assert_eq!(Hex::new(2, -3).rotated(2).distance_to_center(), 3);
    }

    #[test]
    fn test_line_is_contiguous_and_symmetric() {
        let a = Hex::new(-2, 3);
        let b = Hex::new(3, -2);
        for side in LineSide::BOTH {
            let path = line(a, b, side);
            assert_eq!(path.first(), Some(&a));
            assert_eq!(path.last(), Some(&b));
            for pair in path.windows(2) {
                assert_eq!(pair[0].distance_to(pair[1]), 1);
            }
            let mut back = line(b, a, side);
            back.reverse();
            assert_eq!(back, path);
        }
    }

    #[test]
    fn test_line_along_spine_splits() {
        // (0,0) -> (1,1) runs along the spine between (1,0) and (0,1)
        let left = line(Hex::ORIGIN, Hex::new(1, 1), LineSide::Left);
        let right = line(Hex::ORIGIN, Hex::new(1, 1), LineSide::Right);
        assert_ne!(left, right);
        assert_eq!(left.len(), 3);
        assert_eq!(right.len(), 3);
    }
}
