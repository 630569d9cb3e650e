//! WorldGrid - the static terrain grid plus ownership bookkeeping
//!
//! Terrain and yields never change once the grid is built. The only mutation
//! the simulation performs is through `claim`, `release` and `transfer`, which
//! keep the one-owner-per-cell invariant.

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::core::types::{CellCoord, CivId};
use crate::world::cell::{ResourceAmounts, Terrain, WorldCell};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldGrid {
    width: u32,
    height: u32,
    /// Row-major, `y * width + x`
    cells: Vec<WorldCell>,
}

impl WorldGrid {
    pub fn new(width: u32, height: u32, cells: Vec<WorldCell>) -> Result<Self> {
        if cells.len() != (width as usize) * (height as usize) {
            return Err(SimError::InvalidConfig(format!(
                "grid of {}x{} needs {} cells, got {}",
                width,
                height,
                width as usize * height as usize,
                cells.len()
            )));
        }
        Ok(Self { width, height, cells })
    }

    /// Uniform grid, mainly for tests
    pub fn filled(width: u32, height: u32, terrain: Terrain, yields: ResourceAmounts) -> Self {
        let cells = vec![WorldCell::new(terrain, yields); width as usize * height as usize];
        Self { width, height, cells }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn in_bounds(&self, coord: CellCoord) -> bool {
        coord.x >= 0 && coord.y >= 0 && (coord.x as u32) < self.width && (coord.y as u32) < self.height
    }

    fn index(&self, coord: CellCoord) -> Option<usize> {
        if self.in_bounds(coord) {
            Some(coord.y as usize * self.width as usize + coord.x as usize)
        } else {
            None
        }
    }

    pub fn get(&self, coord: CellCoord) -> Option<&WorldCell> {
        self.index(coord).map(|i| &self.cells[i])
    }

    pub fn owner(&self, coord: CellCoord) -> Option<CivId> {
        self.get(coord).and_then(|c| c.owner)
    }

    /// Replace a cell's terrain and yields before the simulation starts
    pub fn set_cell(&mut self, coord: CellCoord, terrain: Terrain, yields: ResourceAmounts) -> Result<()> {
        let idx = self.index(coord).ok_or(SimError::OutOfBounds(coord))?;
        let owner = self.cells[idx].owner;
        self.cells[idx] = WorldCell { terrain, yields, owner };
        Ok(())
    }

    /// In-bounds 8-neighbourhood
    pub fn neighbors(&self, coord: CellCoord) -> impl Iterator<Item = CellCoord> + '_ {
        coord.neighbors().filter(move |c| self.in_bounds(*c))
    }

    /// Every coordinate with its cell, row-major
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, &WorldCell)> + '_ {
        let width = self.width as usize;
        self.cells.iter().enumerate().map(move |(i, cell)| {
            (CellCoord::new((i % width) as i32, (i / width) as i32), cell)
        })
    }

    /// In-bounds cells within a Euclidean radius of `center`
    pub fn cells_within_radius(&self, center: CellCoord, radius: i32) -> Vec<CellCoord> {
        let r2 = (radius as i64) * (radius as i64);
        let mut out = Vec::new();
        for y in (center.y - radius)..=(center.y + radius) {
            for x in (center.x - radius)..=(center.x + radius) {
                let c = CellCoord::new(x, y);
                if self.in_bounds(c) && c.distance_squared(&center) <= r2 {
                    out.push(c);
                }
            }
        }
        out
    }

    /// Whether `coord` could be claimed by anyone right now
    pub fn is_unclaimed_land(&self, coord: CellCoord) -> bool {
        self.get(coord)
            .map(|c| c.owner.is_none() && c.terrain.is_claimable())
            .unwrap_or(false)
    }

    /// Give an unowned cell to `civ`
    pub fn claim(&mut self, coord: CellCoord, civ: CivId) -> Result<()> {
        let idx = self.index(coord).ok_or(SimError::OutOfBounds(coord))?;
        let cell = &mut self.cells[idx];
        match cell.owner {
            None if cell.terrain.is_claimable() => {
                cell.owner = Some(civ);
                Ok(())
            }
            None => Err(SimError::InvariantViolation(format!(
                "{} tried to claim unclaimable cell {}",
                civ, coord
            ))),
            Some(existing) => Err(SimError::InvariantViolation(format!(
                "{} tried to claim {} already owned by {}",
                civ, coord, existing
            ))),
        }
    }

    /// Move a cell from `from` to `to`
    pub fn transfer(&mut self, coord: CellCoord, from: CivId, to: CivId) -> Result<()> {
        let idx = self.index(coord).ok_or(SimError::OutOfBounds(coord))?;
        let cell = &mut self.cells[idx];
        if cell.owner != Some(from) {
            return Err(SimError::InvariantViolation(format!(
                "transfer of {} from {} but owner is {:?}",
                coord, from, cell.owner
            )));
        }
        cell.owner = Some(to);
        Ok(())
    }

    /// Drop `civ`'s ownership of a cell
    pub fn release(&mut self, coord: CellCoord, civ: CivId) -> Result<()> {
        let idx = self.index(coord).ok_or(SimError::OutOfBounds(coord))?;
        let cell = &mut self.cells[idx];
        if cell.owner != Some(civ) {
            return Err(SimError::InvariantViolation(format!(
                "release of {} by {} but owner is {:?}",
                coord, civ, cell.owner
            )));
        }
        cell.owner = None;
        Ok(())
    }

    /// Number of neighbours that offer water access
    pub fn water_neighbors(&self, coord: CellCoord) -> usize {
        self.neighbors(coord)
            .filter_map(|c| self.get(c))
            .filter(|c| c.terrain.is_water_access())
            .count()
    }

    /// Number of claimable neighbours (a low count marks a chokepoint)
    pub fn passable_neighbors(&self, coord: CellCoord) -> usize {
        self.neighbors(coord)
            .filter_map(|c| self.get(c))
            .filter(|c| c.terrain.is_claimable())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> WorldGrid {
        WorldGrid::filled(5, 4, Terrain::Land, ResourceAmounts::new(0.5, 0.2, 0.1, 0.1))
    }

    #[test]
    fn test_new_rejects_wrong_cell_count() {
        let result = WorldGrid::new(2, 2, vec![]);
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_bounds() {
        let g = grid();
        assert!(g.in_bounds(CellCoord::new(4, 3)));
        assert!(!g.in_bounds(CellCoord::new(5, 0)));
        assert!(!g.in_bounds(CellCoord::new(-1, 0)));
    }

    #[test]
    fn test_corner_has_three_neighbors() {
        let g = grid();
        assert_eq!(g.neighbors(CellCoord::new(0, 0)).count(), 3);
        assert_eq!(g.neighbors(CellCoord::new(2, 2)).count(), 8);
    }

    #[test]
    fn test_claim_rejects_double_ownership() {
        let mut g = grid();
        let c = CellCoord::new(1, 1);
        g.claim(c, CivId(1)).unwrap();
        assert_eq!(g.owner(c), Some(CivId(1)));
        assert!(matches!(g.claim(c, CivId(2)), Err(SimError::InvariantViolation(_))));
        assert_eq!(g.owner(c), Some(CivId(1)));
    }

    #[test]
    fn test_claim_water_rejected() {
        let mut g = grid();
        let c = CellCoord::new(0, 0);
        g.set_cell(c, Terrain::Water, ResourceAmounts::default()).unwrap();
        assert!(g.claim(c, CivId(1)).is_err());
    }

    #[test]
    fn test_transfer_and_release() {
        let mut g = grid();
        let c = CellCoord::new(2, 2);
        g.claim(c, CivId(1)).unwrap();
        assert!(g.transfer(c, CivId(2), CivId(3)).is_err());
        g.transfer(c, CivId(1), CivId(2)).unwrap();
        assert_eq!(g.owner(c), Some(CivId(2)));
        g.release(c, CivId(2)).unwrap();
        assert!(g.is_unclaimed_land(c));
    }

    #[test]
    fn test_radius_query_clipped_to_bounds() {
        let g = grid();
        let cells = g.cells_within_radius(CellCoord::new(0, 0), 1);
        // (0,0), (1,0), (0,1); the diagonal is outside radius 1
        assert_eq!(cells.len(), 3);
    }
}
