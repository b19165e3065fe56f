//! Water, deep water and shoreline classification
//!
//! Runs after smoothing, in three sweeps:
//! 1. Submerged tiles (`y <= water level`) become deep or shallow water
//!    depending on their radius-2 neighbourhood
//! 2. Isolated deep water is demoted to water, isolated water to grass
//! 3. Dry tiles right above the water level become sand next to water, or
//!    are lifted one level so bare shoreline does not touch the water edge

use crate::config::TerrainParams;
use crate::spatial_hash::{SpatialHashIndex, TileId};
use crate::tile::{quantize, TileType};

use super::lattice::Neighbourhood;

/// Counts produced by the water sweeps
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WaterStats {
    pub deep_water: usize,
    pub water: usize,
    pub demoted_deep: usize,
    pub drained: usize,
    pub sand: usize,
    pub lifted: usize,
}

/// Classify every submerged tile in `region` as deep or shallow water.
pub fn classify_water(
    grid: &mut SpatialHashIndex,
    region: &[TileId],
    params: &TerrainParams,
    stats: &mut WaterStats,
) {
    let water_level = params.water_level();
    let low_water = params.shallow_water_height();
    let neighbourhood = Neighbourhood::new(2.0);

    for &id in region {
        let Some(tile) = grid.get(id).copied() else {
            continue;
        };
        if tile.y > water_level {
            continue;
        }

        let deep = neighbourhood
            .tiles(grid, tile.x, tile.z)
            .all(|n| n.is_water() || n.y <= low_water);

        let (tile_type, height) = if deep {
            stats.deep_water += 1;
            (TileType::DeepWater, params.deep_water_height())
        } else {
            stats.water += 1;
            (TileType::Water, params.shallow_water_height())
        };

        if let Some(tile) = grid.get_mut(id) {
            tile.tile_type = tile_type;
            tile.y = height;
        }
    }
}

/// Remove single-tile specks: deep water with no deep neighbour on the
/// half-step diagonals becomes water, water with no water neighbour dries
/// out to grass one level above the water line.
pub fn correct_water(
    grid: &mut SpatialHashIndex,
    region: &[TileId],
    params: &TerrainParams,
    stats: &mut WaterStats,
) {
    let water_level = params.water_level();
    let neighbourhood = Neighbourhood::new(0.5);

    for &id in region {
        let Some(tile) = grid.get(id).copied() else {
            continue;
        };
        if !tile.is_water() {
            continue;
        }

        let has_neighbour_of = |kind: TileType| {
            neighbourhood
                .tiles(grid, tile.x, tile.z)
                .any(|n| n.tile_type == kind)
        };

        let replacement = match tile.tile_type {
            TileType::DeepWater if !has_neighbour_of(TileType::DeepWater) => {
                stats.demoted_deep += 1;
                Some((TileType::Water, params.shallow_water_height()))
            }
            TileType::Water if !has_neighbour_of(TileType::Water) => {
                stats.drained += 1;
                Some((TileType::Grass, water_level + 1.0))
            }
            _ => None,
        };

        if let (Some((tile_type, height)), Some(tile)) = (replacement, grid.get_mut(id)) {
            tile.tile_type = tile_type;
            tile.y = height;
        }
    }
}

/// Turn dry tiles at exactly one level above the water line into sand when
/// they touch shallow water, otherwise raise them one more level.
pub fn classify_shoreline(
    grid: &mut SpatialHashIndex,
    region: &[TileId],
    params: &TerrainParams,
    stats: &mut WaterStats,
) {
    let shore_height = params.water_level() + 1.0;
    let neighbourhood = Neighbourhood::new(1.0);

    for &id in region {
        let Some(tile) = grid.get(id).copied() else {
            continue;
        };
        if tile.is_water() || tile.height_key() != quantize(shore_height) {
            continue;
        }

        let touches_water = neighbourhood
            .tiles(grid, tile.x, tile.z)
            .any(|n| n.tile_type == TileType::Water);

        if let Some(tile) = grid.get_mut(id) {
            if touches_water {
                tile.tile_type = TileType::Sand;
                stats.sand += 1;
            } else {
                tile.y = shore_height + 1.0;
                stats.lifted += 1;
            }
        }
    }
}
