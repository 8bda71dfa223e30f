//! Battle map: a rectangular grid of hex tiles
//!
//! Tiles are stored row-major so every traversal is deterministic.

use serde::{Deserialize, Serialize};

use crate::battle::hex::{AxialCoord, OffsetCoord};

/// A single tile on the battle map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HexTile {
    pub coord: OffsetCoord,
    pub axial: AxialCoord,
    /// Cost of entering or leaving this tile. Infinite means impassable.
    pub movement_cost: f64,
    pub terrain_level: i32,
    pub asset: Option<String>,
}

impl HexTile {
    pub fn new(coord: OffsetCoord) -> Self {
        Self {
            coord,
            axial: coord.to_axial(),
            movement_cost: 1.0,
            terrain_level: 0,
            asset: None,
        }
    }

    pub fn is_passable(&self) -> bool {
        self.movement_cost.is_finite()
    }
}

/// The full battle map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleMap {
    pub width: u32,
    pub height: u32,
    tiles: Vec<HexTile>,
}

impl BattleMap {
    /// Create a new battle map where every tile costs 1 to traverse
    pub fn new(width: u32, height: u32) -> Self {
        let mut tiles = Vec::with_capacity((width * height) as usize);
        for row in 0..height as i32 {
            for col in 0..width as i32 {
                tiles.push(HexTile::new(OffsetCoord::new(col, row)));
            }
        }
        Self {
            width,
            height,
            tiles,
        }
    }

    fn index(&self, coord: OffsetCoord) -> Option<usize> {
        if self.contains(coord) {
            Some(coord.row as usize * self.width as usize + coord.col as usize)
        } else {
            None
        }
    }

    /// Check if coordinate is within map bounds
    pub fn contains(&self, coord: OffsetCoord) -> bool {
        coord.col >= 0
            && coord.row >= 0
            && coord.col < self.width as i32
            && coord.row < self.height as i32
    }

    /// Get the tile at the given coordinate
    pub fn get(&self, coord: OffsetCoord) -> Option<&HexTile> {
        self.index(coord).map(|i| &self.tiles[i])
    }

    /// Set the movement cost of a tile (map construction only)
    pub fn set_movement_cost(&mut self, coord: OffsetCoord, cost: f64) {
        if let Some(i) = self.index(coord) {
            self.tiles[i].movement_cost = cost;
        }
    }

    /// Set terrain level and asset name of a tile
    pub fn set_terrain(&mut self, coord: OffsetCoord, level: i32, asset: Option<String>) {
        if let Some(i) = self.index(coord) {
            self.tiles[i].terrain_level = level;
            self.tiles[i].asset = asset;
        }
    }

    /// Every tile, row by row
    pub fn tiles(&self) -> impl Iterator<Item = &HexTile> {
        self.tiles.iter()
    }

    /// Every coordinate, row by row
    pub fn coords(&self) -> impl Iterator<Item = OffsetCoord> + '_ {
        self.tiles.iter().map(|t| t.coord)
    }

    /// Hex distance between two coordinates
    pub fn distance(&self, a: OffsetCoord, b: OffsetCoord) -> u32 {
        a.distance(&b)
    }

    /// On-map tiles adjacent to `center`
    pub fn neighbors(&self, center: OffsetCoord) -> Vec<OffsetCoord> {
        self.ring(center, 1)
    }

    /// On-map tiles at exactly `radius` steps from `center`
    pub fn ring(&self, center: OffsetCoord, radius: u32) -> Vec<OffsetCoord> {
        self.on_map(center.to_axial().ring(radius))
    }

    /// On-map tiles within `radius` of `center`, center first
    pub fn spiral(&self, center: OffsetCoord, radius: u32) -> Vec<OffsetCoord> {
        self.on_map(center.to_axial().spiral(radius))
    }

    /// On-map tiles on the straight line from `a` to `b` (inclusive)
    pub fn line(&self, a: OffsetCoord, b: OffsetCoord) -> Vec<OffsetCoord> {
        self.on_map(a.to_axial().line_to(&b.to_axial()))
    }

    fn on_map(&self, hexes: Vec<AxialCoord>) -> Vec<OffsetCoord> {
        hexes
            .into_iter()
            .map(|h| h.to_offset())
            .filter(|c| self.contains(*c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battle_map_creation() {
        let map = BattleMap::new(10, 8);
        assert_eq!(map.width, 10);
        assert_eq!(map.height, 8);
        assert_eq!(map.tiles().count(), 80);
    }

    #[test]
    fn test_tiles_are_row_major() {
        let map = BattleMap::new(3, 2);
        let coords: Vec<_> = map.coords().collect();
        assert_eq!(coords[0], OffsetCoord::new(0, 0));
        assert_eq!(coords[2], OffsetCoord::new(2, 0));
        assert_eq!(coords[3], OffsetCoord::new(0, 1));
    }

    #[test]
    fn test_get_and_bounds() {
        let map = BattleMap::new(5, 5);
        assert!(map.get(OffsetCoord::new(4, 4)).is_some());
        assert!(map.get(OffsetCoord::new(5, 0)).is_none());
        assert!(map.get(OffsetCoord::new(0, -1)).is_none());
        let tile = map.get(OffsetCoord::new(2, 3)).map(|t| t.axial);
        assert_eq!(tile, Some(OffsetCoord::new(2, 3).to_axial()));
    }

    #[test]
    fn test_corner_neighbors_are_clipped() {
        let map = BattleMap::new(5, 5);
        let neighbors = map.neighbors(OffsetCoord::new(0, 0));
        assert_eq!(neighbors.len(), 2);
        assert!(neighbors.contains(&OffsetCoord::new(1, 0)));
        assert!(neighbors.contains(&OffsetCoord::new(0, 1)));
    }

    #[test]
    fn test_impassable_tile() {
        let mut map = BattleMap::new(3, 3);
        map.set_movement_cost(OffsetCoord::new(1, 1), f64::INFINITY);
        assert!(!map.get(OffsetCoord::new(1, 1)).map_or(true, |t| t.is_passable()));
    }
}
