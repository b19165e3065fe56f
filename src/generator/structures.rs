//! Optional house placement on grass.
//!
//! Houses are scattered at random and then thinned so only clusters
//! survive: each filter pass drops every house with three or fewer houses
//! (itself included) within two units in x and z.

use rand::Rng;

use crate::config::TerrainParams;
use crate::objects::{HouseVariant, Structure, StructureKind};
use crate::spatial_hash::{SpatialHashIndex, TileId};
use crate::tile::TileType;

/// Half-width of the square searched for neighbouring houses.
const CLUSTER_RADIUS: f32 = 2.0;

/// Houses needed in the square (self included) to survive a pass, exclusive.
const CLUSTER_MIN: usize = 3;

pub fn spawn_structures<R: Rng>(
    grid: &SpatialHashIndex,
    candidates: &[TileId],
    params: &TerrainParams,
    rng: &mut R,
) -> Vec<Structure> {
    if params.structure_chance <= 0.0 {
        return Vec::new();
    }

    let mut houses: Vec<Structure> = candidates
        .iter()
        .filter_map(|&id| grid.get(id))
        .filter(|tile| tile.tile_type == TileType::Grass)
        .filter(|_| rng.gen::<f64>() < params.structure_chance)
        .map(|tile| Structure::on(tile, StructureKind::House(HouseVariant::Variant1)))
        .collect();

    for pass in 0..params.structure_cluster_passes {
        let before = houses.len();
        houses = cluster_filter(&houses);
        log::debug!(
            "Structure cluster pass {}/{}: {} -> {}",
            pass + 1,
            params.structure_cluster_passes,
            before,
            houses.len()
        );
        if houses.len() == before {
            break;
        }
    }

    houses
}

fn cluster_filter(houses: &[Structure]) -> Vec<Structure> {
    houses
        .iter()
        .filter(|house| {
            let nearby = houses
                .iter()
                .filter(|other| {
                    (other.x - house.x).abs() <= CLUSTER_RADIUS
                        && (other.z - house.z).abs() <= CLUSTER_RADIUS
                })
                .count();
            nearby > CLUSTER_MIN
        })
        .copied()
        .collect()
}
