//! A dense top-down raster of column surfaces.
//!
//! One cell per half-step in x and z. Only every other cell of a row lies
//! on the lattice; the others stay empty and are filled from their
//! horizontal neighbours when displayed.

use std::collections::HashMap;

use crate::generator::lattice::HALF_STEP;
use crate::spatial_hash::SpatialHashIndex;
use crate::tile::{Tile, TileType};

#[derive(Clone)]
pub struct SurfaceMap {
    pub width: usize,
    pub height: usize,
    min_x: f32,
    min_z: f32,
    data: Vec<Option<Tile>>,
}

impl SurfaceMap {
    /// Rasterize every column of `index`. Empty index gives an empty map.
    pub fn from_index(index: &SpatialHashIndex) -> Self {
        let Some(extent) = index.extent() else {
            return Self {
                width: 0,
                height: 0,
                min_x: 0.0,
                min_z: 0.0,
                data: Vec::new(),
            };
        };

        let width = ((extent.max_x - extent.min_x) / HALF_STEP).round() as usize + 1;
        let height = ((extent.max_z - extent.min_z) / HALF_STEP).round() as usize + 1;
        let mut map = Self {
            width,
            height,
            min_x: extent.min_x,
            min_z: extent.min_z,
            data: vec![None; width * height],
        };

        for row in 0..height {
            for col in 0..width {
                let (x, z) = map.world_position(col, row);
                if let Some(tile) = index.surface_tile(x, z) {
                    map.data[row * width + col] = Some(*tile);
                }
            }
        }
        map
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// World `(x, z)` of a cell.
    pub fn world_position(&self, col: usize, row: usize) -> (f32, f32) {
        (
            self.min_x + col as f32 * HALF_STEP,
            self.min_z + row as f32 * HALF_STEP,
        )
    }

    pub fn get(&self, col: usize, row: usize) -> Option<&Tile> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.data[row * self.width + col].as_ref()
    }

    /// The cell's tile, or for an off-lattice cell the tile to its left or
    /// right.
    pub fn get_filled(&self, col: usize, row: usize) -> Option<&Tile> {
        self.get(col, row)
            .or_else(|| col.checked_sub(1).and_then(|c| self.get(c, row)))
            .or_else(|| self.get(col + 1, row))
    }

    /// 4-connected neighbours inside the map (no wrapping).
    pub fn neighbors(&self, col: usize, row: usize) -> Vec<(usize, usize)> {
        let mut result = Vec::with_capacity(4);
        if col > 0 {
            result.push((col - 1, row));
        }
        if col + 1 < self.width {
            result.push((col + 1, row));
        }
        if row > 0 {
            result.push((col, row - 1));
        }
        if row + 1 < self.height {
            result.push((col, row + 1));
        }
        result
    }

    /// Surface tiles per type.
    pub fn counts(&self) -> HashMap<TileType, usize> {
        let mut counts = HashMap::new();
        for tile in self.data.iter().flatten() {
            *counts.entry(tile.tile_type).or_insert(0) += 1;
        }
        counts
    }

    /// Lowest and highest surface height.
    pub fn height_range(&self) -> Option<(f32, f32)> {
        self.data.iter().flatten().fold(None, |range, t| match range {
            None => Some((t.y, t.y)),
            Some((lo, hi)) => Some((lo.min(t.y), hi.max(t.y))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> SpatialHashIndex {
        SpatialHashIndex::from_tiles([
            Tile::new(0.0, 3.0, 0.0, TileType::Grass),
            Tile::new(0.0, 2.0, 0.0, TileType::Dirt),
            Tile::new(1.0, 1.5, 0.0, TileType::Water),
            Tile::new(0.5, 4.0, 0.5, TileType::Sand),
        ])
    }

    #[test]
    fn test_cells_hold_column_surfaces() {
        let map = SurfaceMap::from_index(&index());
        assert_eq!((map.width, map.height), (3, 2));

        assert_eq!(map.get(0, 0).unwrap().tile_type, TileType::Grass);
        assert_eq!(map.get(2, 0).unwrap().tile_type, TileType::Water);
        assert_eq!(map.get(1, 1).unwrap().tile_type, TileType::Sand);
        assert!(map.get(1, 0).is_none());
        assert!(map.get(5, 5).is_none());
    }

    #[test]
    fn test_off_lattice_cells_fill_from_sides() {
        let map = SurfaceMap::from_index(&index());
        assert_eq!(map.get_filled(1, 0).unwrap().tile_type, TileType::Grass);
        assert_eq!(map.get_filled(0, 1).unwrap().tile_type, TileType::Sand);
    }

    #[test]
    fn test_counts_and_range() {
        let map = SurfaceMap::from_index(&index());
        let counts = map.counts();
        assert_eq!(counts[&TileType::Grass], 1);
        assert!(!counts.contains_key(&TileType::Dirt));
        assert_eq!(map.height_range(), Some((1.5, 4.0)));
    }

    #[test]
    fn test_neighbors_stay_inside() {
        let map = SurfaceMap::from_index(&index());
        assert_eq!(map.neighbors(0, 0).len(), 2);
        assert_eq!(map.neighbors(1, 1).len(), 3);
    }

    #[test]
    fn test_empty_index() {
        assert!(SurfaceMap::from_index(&SpatialHashIndex::new()).is_empty());
    }
}
