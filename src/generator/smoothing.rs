//! Height interpolation by repeated neighbour averaging.
//!
//! Each pass computes every new height from the previous pass's snapshot,
//! so the visiting order has no influence on the result.

use rayon::prelude::*;

use crate::spatial_hash::{SpatialHashIndex, TileId};

use super::lattice::Neighbourhood;

/// Run one smoothing pass over `region`. Tiles outside `region` (border
/// tiles from an adjacent region) are read but never rewritten.
///
/// Returns the number of tiles whose height changed.
pub fn smooth_once(grid: &mut SpatialHashIndex, region: &[TileId]) -> usize {
    let neighbourhood = Neighbourhood::new(1.0);

    let snapshot: &SpatialHashIndex = grid;
    let heights: Vec<Option<f32>> = region
        .par_iter()
        .map(|&id| {
            let tile = snapshot.get(id)?;
            let (sum, count) = neighbourhood
                .tiles(snapshot, tile.x, tile.z)
                .fold((0.0f32, 0usize), |(sum, count), n| (sum + n.y, count + 1));

            if count == 0 {
                Some(tile.y)
            } else {
                Some((sum / count as f32).round())
            }
        })
        .collect();

    let mut changed = 0;
    for (&id, height) in region.iter().zip(heights) {
        let (Some(height), Some(tile)) = (height, grid.get_mut(id)) else {
            continue;
        };
        if tile.y != height {
            tile.y = height;
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{Tile, TileType};

    fn grid_of(tiles: &[(f32, f32, f32)]) -> (SpatialHashIndex, Vec<TileId>) {
        let mut grid = SpatialHashIndex::new();
        let ids = tiles
            .iter()
            .map(|&(x, y, z)| grid.insert(Tile::new(x, y, z, TileType::Grass)))
            .collect();
        (grid, ids)
    }

    #[test]
    fn test_uniform_heights_are_a_fixed_point() {
        let (mut grid, ids) = grid_of(&[
            (0.0, 5.0, 0.0),
            (1.0, 5.0, 0.0),
            (0.5, 5.0, 0.5),
            (0.0, 5.0, 1.0),
            (1.0, 5.0, 1.0),
        ]);

        for _ in 0..10 {
            assert_eq!(smooth_once(&mut grid, &ids), 0);
        }
        assert!(grid.tiles().iter().all(|t| t.y == 5.0));
    }

    #[test]
    fn test_pass_uses_previous_snapshot() {
        // Two mutual neighbours swap heights when read from a snapshot;
        // updating in place would leave both at the same value.
        let (mut grid, ids) = grid_of(&[(0.0, 2.0, 0.0), (0.5, 8.0, 0.5)]);

        smooth_once(&mut grid, &ids);

        assert_eq!(grid.get(ids[0]).unwrap().y, 8.0);
        assert_eq!(grid.get(ids[1]).unwrap().y, 2.0);
    }

    #[test]
    fn test_isolated_tile_keeps_height() {
        let (mut grid, ids) = grid_of(&[(0.0, 7.0, 0.0)]);
        assert_eq!(smooth_once(&mut grid, &ids), 0);
        assert_eq!(grid.get(ids[0]).unwrap().y, 7.0);
    }

    #[test]
    fn test_border_tiles_are_read_not_written() {
        let (mut grid, ids) = grid_of(&[(0.0, 0.0, 0.0)]);
        let border = grid.insert(Tile::new(-0.5, 10.0, 0.5, TileType::Grass));

        smooth_once(&mut grid, &ids);

        assert_eq!(grid.get(ids[0]).unwrap().y, 10.0);
        assert_eq!(grid.get(border).unwrap().y, 10.0);
    }

    #[test]
    fn test_mean_is_rounded() {
        // Neighbours 4 and 5 average to 4.5, which rounds up.
        let (mut grid, ids) = grid_of(&[(0.0, 0.0, 0.0)]);
        grid.insert(Tile::new(1.0, 4.0, 0.0, TileType::Grass));
        grid.insert(Tile::new(-1.0, 5.0, 0.0, TileType::Grass));

        smooth_once(&mut grid, &ids);
        assert_eq!(grid.get(ids[0]).unwrap().y, 5.0);
    }
}
