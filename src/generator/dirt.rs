//! Cliff face filling.
//!
//! The camera looks at the world from the south, so a tile whose south-west
//! or south-east neighbour sits two or more levels lower leaves a visible
//! gap. Each pass adds one layer of dirt under such tiles; repeating the pass
//! on the new dirt fills the whole face.

use std::collections::HashSet;

use crate::spatial_hash::{SpatialHashIndex, TileId};
use crate::tile::{Tile, TileType};

/// Offsets of the two south-facing diagonal neighbours.
const SOUTH_DIAGONALS: [(f32, f32); 2] = [(0.5, 0.5), (-0.5, 0.5)];

/// Whether a dirt tile is needed directly below `tile`: nothing is there yet
/// and a south diagonal column's surface is at least two levels lower.
pub fn needs_fill(grid: &SpatialHashIndex, tile: &Tile) -> bool {
    if grid.get_tile(tile.x, tile.y - 1.0, tile.z).is_some() {
        return false;
    }

    SOUTH_DIAGONALS.iter().any(|&(dx, dz)| {
        grid.surface_tile(tile.x + dx, tile.z + dz)
            .is_some_and(|n| n.y <= tile.y - 2.0)
    })
}

/// Run one dirt pass over `candidates` and insert the new tiles.
///
/// Decisions are made against the grid as it was before the pass; the new
/// dirt is inserted afterwards. Returns the handles of the inserted tiles,
/// which are the candidates for the next pass.
pub fn fill_once(grid: &mut SpatialHashIndex, candidates: &[TileId]) -> Vec<TileId> {
    let fills: Vec<Tile> = candidates
        .iter()
        .filter_map(|&id| grid.get(id))
        .filter(|tile| needs_fill(grid, tile))
        .map(|tile| Tile::new(tile.x, tile.y - 1.0, tile.z, TileType::Dirt))
        .collect();

    let before = grid.len();
    let mut inserted = Vec::with_capacity(fills.len());
    for tile in fills {
        let id = grid.insert(tile);
        if id.0 >= before && !inserted.contains(&id) {
            inserted.push(id);
        }
    }
    inserted
}

/// Grass tiles among `ids`: the candidates for the first pass.
pub fn initial_candidates(grid: &SpatialHashIndex, ids: &[TileId]) -> Vec<TileId> {
    ids.iter()
        .copied()
        .filter(|&id| grid.get(id).is_some_and(|t| t.tile_type == TileType::Grass))
        .collect()
}

/// First-pass candidates along a seam: the lowest tile of every
/// grass-topped column among `ids`.
///
/// A seam column may already carry dirt from the region it came from; the
/// face has to continue below that dirt, not below the grass.
pub fn seam_candidates(grid: &SpatialHashIndex, ids: &[TileId]) -> Vec<TileId> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter_map(|&id| grid.get(id))
        .filter(|tile| seen.insert(tile.column_key()))
        .filter(|tile| {
            grid.surface_tile(tile.x, tile.z)
                .is_some_and(|top| top.tile_type == TileType::Grass)
        })
        .filter_map(|tile| {
            grid.column_ids(tile.x, tile.z)
                .iter()
                .copied()
                .filter_map(|cid| grid.get(cid).map(|t| (cid, t.y)))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(cid, _)| cid)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cliff_is_filled_to_fixed_point() {
        let mut grid = SpatialHashIndex::new();
        let top = grid.insert(Tile::new(0.0, 8.0, 0.0, TileType::Grass));
        grid.insert(Tile::new(0.5, 3.0, 0.5, TileType::Grass));

        let mut frontier = initial_candidates(&grid, &[top]);
        let mut passes = 0;
        while !frontier.is_empty() && passes < 64 {
            frontier = fill_once(&mut grid, &frontier);
            passes += 1;
        }

        // Dirt from 7 down to 4: the lowest dirt still sees a drop of 1 only
        let column: Vec<f32> = grid.get_column(0.0, 0.0).iter().map(|t| t.y).collect();
        assert_eq!(column, vec![8.0, 7.0, 6.0, 5.0, 4.0]);
        assert!(grid
            .get_column(0.0, 0.0)
            .iter()
            .skip(1)
            .all(|t| t.tile_type == TileType::Dirt));
    }

    #[test]
    fn test_small_step_needs_no_dirt() {
        let mut grid = SpatialHashIndex::new();
        let top = grid.insert(Tile::new(0.0, 4.0, 0.0, TileType::Grass));
        grid.insert(Tile::new(-0.5, 3.0, 0.5, TileType::Grass));

        assert!(fill_once(&mut grid, &[top]).is_empty());
    }

    #[test]
    fn test_north_facing_drop_is_ignored() {
        let mut grid = SpatialHashIndex::new();
        let top = grid.insert(Tile::new(0.0, 9.0, 0.0, TileType::Grass));
        grid.insert(Tile::new(0.5, 1.0, -0.5, TileType::Grass));

        assert!(fill_once(&mut grid, &[top]).is_empty());
    }

    #[test]
    fn test_existing_tile_below_blocks_fill() {
        let mut grid = SpatialHashIndex::new();
        let top = grid.insert(Tile::new(0.0, 9.0, 0.0, TileType::Grass));
        grid.insert(Tile::new(0.0, 8.0, 0.0, TileType::Dirt));
        grid.insert(Tile::new(0.5, 1.0, 0.5, TileType::Grass));

        assert!(fill_once(&mut grid, &[top]).is_empty());
    }

    #[test]
    fn test_only_grass_starts_the_fill() {
        let mut grid = SpatialHashIndex::new();
        let sand = grid.insert(Tile::new(0.0, 5.0, 0.0, TileType::Sand));
        let grass = grid.insert(Tile::new(1.0, 5.0, 0.0, TileType::Grass));
        assert_eq!(initial_candidates(&grid, &[sand, grass]), vec![grass]);
    }

    #[test]
    fn test_seam_resumes_below_existing_dirt() {
        let mut grid = SpatialHashIndex::new();
        let grass = grid.insert(Tile::new(0.0, 10.0, 0.0, TileType::Grass));
        let upper = grid.insert(Tile::new(0.0, 9.0, 0.0, TileType::Dirt));
        let lower = grid.insert(Tile::new(0.0, 8.0, 0.0, TileType::Dirt));
        let sand = grid.insert(Tile::new(2.0, 4.0, 0.0, TileType::Sand));

        let seam = seam_candidates(&grid, &[grass, upper, lower, sand]);
        assert_eq!(seam, vec![lower]);

        grid.insert(Tile::new(-0.5, 6.0, 0.5, TileType::Grass));
        let added = fill_once(&mut grid, &seam);
        assert_eq!(added.len(), 1);
        assert_eq!(grid.get(added[0]).unwrap().y, 7.0);
    }
}
