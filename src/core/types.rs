//! Core type definitions used throughout the codebase

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Simulation tick counter (one discrete step of the whole world)
pub type Tick = u64;

/// Unique identifier for civilizations
///
/// Ordering is significant: every engine pass iterates civilizations in
/// ascending id order.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display(fmt = "civ#{}", _0)]
pub struct CivId(pub u32);

impl CivId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

/// Unique identifier for wars
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display(fmt = "war#{}", _0)]
pub struct WarId(pub u32);

/// Grid coordinate of a world cell
///
/// Orders by `x` then `y`; "lowest coordinate" tie-breaks use this order.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display(fmt = "({}, {})", x, y)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
}

/// The 8-neighbourhood offsets
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

impl CellCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// All eight surrounding coordinates, unbounded
    pub fn neighbors(&self) -> impl Iterator<Item = CellCoord> {
        let (x, y) = (self.x, self.y);
        NEIGHBOR_OFFSETS.iter().map(move |(dx, dy)| CellCoord::new(x + dx, y + dy))
    }

    /// King-move distance; two cells are adjacent when this is 1
    pub fn chebyshev_distance(&self, other: &CellCoord) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    pub fn distance_squared(&self, other: &CellCoord) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }

    pub fn is_adjacent(&self, other: &CellCoord) -> bool {
        self.chebyshev_distance(other) == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_civ_id_ordering() {
        let mut ids = vec![CivId(3), CivId(1), CivId(2)];
        ids.sort();
        assert_eq!(ids, vec![CivId(1), CivId(2), CivId(3)]);
    }

    #[test]
    fn test_civ_id_display() {
        assert_eq!(CivId(7).to_string(), "civ#7");
    }

    #[test]
    fn test_cell_neighbors() {
        let c = CellCoord::new(5, 5);
        let n: Vec<_> = c.neighbors().collect();
        assert_eq!(n.len(), 8);
        assert!(n.iter().all(|o| c.is_adjacent(o)));
        assert!(!n.contains(&c));
    }

    #[test]
    fn test_neighbors_outlive_the_coord() {
        let around = |x, y| CellCoord::new(x, y).neighbors();
        let n: Vec<_> = around(1, 1).collect();
        assert_eq!(n.len(), 8);
        assert!(n.contains(&CellCoord::new(0, 0)));
    }

    #[test]
    fn test_cell_ordering_is_x_then_y() {
        assert!(CellCoord::new(0, 9) < CellCoord::new(1, 0));
        assert!(CellCoord::new(2, 1) < CellCoord::new(2, 3));
    }

    #[test]
    fn test_chebyshev_distance() {
        let a = CellCoord::new(0, 0);
        assert_eq!(a.chebyshev_distance(&CellCoord::new(3, -2)), 3);
        assert_eq!(a.distance_squared(&CellCoord::new(3, -2)), 13);
    }
}
