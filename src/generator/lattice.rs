//! Staggered grid construction and neighbour lookup.

use crate::spatial_hash::{SpatialHashIndex, TileId};
use crate::tile::{is_lattice_point, Tile};

use super::RegionBounds;

/// Distance between adjacent sample positions along an axis.
pub const HALF_STEP: f32 = 0.5;

/// Slack when counting half-steps across a span.
const STEP_EPSILON: f32 = 1e-3;

/// All lattice positions `(x, z)` inside `bounds` (inclusive), z-major.
///
/// Returns nothing for non-finite or inverted bounds.
pub fn lattice_points(bounds: &RegionBounds) -> Vec<(f32, f32)> {
    if !bounds.is_valid() {
        return Vec::new();
    }

    let steps_x = ((bounds.end_x - bounds.start_x) / HALF_STEP + STEP_EPSILON).floor() as usize;
    let steps_z = ((bounds.end_z - bounds.start_z) / HALF_STEP + STEP_EPSILON).floor() as usize;

    let mut points = Vec::with_capacity((steps_x + 1) * (steps_z + 1) / 2 + 1);
    for iz in 0..=steps_z {
        let z = bounds.start_z + iz as f32 * HALF_STEP;
        for ix in 0..=steps_x {
            let x = bounds.start_x + ix as f32 * HALF_STEP;
            if is_lattice_point(x, z) {
                points.push((x, z));
            }
        }
    }
    points
}

/// Precomputed lattice offsets within a square radius.
///
/// Radius 0.5 gives the four half-step diagonals, radius 1 adds the axis
/// and whole-step diagonal neighbours (12 in total), radius 2 covers the
/// wider shoreline neighbourhood.
#[derive(Clone, Debug)]
pub struct Neighbourhood {
    offsets: Vec<(f32, f32)>,
}

impl Neighbourhood {
    pub fn new(radius: f32) -> Self {
        let steps = (radius / HALF_STEP + STEP_EPSILON).floor() as i32;
        let mut offsets = Vec::new();
        for ix in -steps..=steps {
            for iz in -steps..=steps {
                if ix == 0 && iz == 0 {
                    continue;
                }
                // Whole-number sum keeps the neighbour on the lattice
                if (ix + iz) % 2 != 0 {
                    continue;
                }
                offsets.push((ix as f32 * HALF_STEP, iz as f32 * HALF_STEP));
            }
        }
        Self { offsets }
    }

    pub fn offsets(&self) -> &[(f32, f32)] {
        &self.offsets
    }

    /// Surface tile of every existing neighbouring column around `(x, z)`.
    /// Missing columns are skipped.
    pub fn collect(&self, grid: &SpatialHashIndex, x: f32, z: f32) -> Vec<TileId> {
        self.offsets
            .iter()
            .filter_map(|&(dx, dz)| grid.surface(x + dx, z + dz))
            .collect()
    }

    pub fn tiles<'a>(
        &'a self,
        grid: &'a SpatialHashIndex,
        x: f32,
        z: f32,
    ) -> impl Iterator<Item = &'a Tile> + 'a {
        self.offsets
            .iter()
            .filter_map(move |&(dx, dz)| grid.surface_tile(x + dx, z + dz))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileType;

    #[test]
    fn test_lattice_points_are_valid() {
        let bounds = RegionBounds::new(-1.0, -2.0, 3.0, 2.5);
        let points = lattice_points(&bounds);

        assert!(!points.is_empty());
        for &(x, z) in &points {
            assert!(is_lattice_point(x, z), "({}, {}) is off the lattice", x, z);
            assert!(bounds.contains(x, z));
        }
    }

    #[test]
    fn test_unit_square_has_five_points() {
        // (0,0) (1,0) (0.5,0.5) (0,1) (1,1)
        let points = lattice_points(&RegionBounds::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(points.len(), 5);
        assert!(points.contains(&(0.5, 0.5)));
    }

    #[test]
    fn test_degenerate_bounds_yield_nothing() {
        assert!(lattice_points(&RegionBounds::new(0.0, 0.0, f32::NAN, 4.0)).is_empty());
        assert!(lattice_points(&RegionBounds::new(5.0, 0.0, 1.0, 4.0)).is_empty());
    }

    #[test]
    fn test_neighbourhood_sizes() {
        assert_eq!(Neighbourhood::new(0.5).offsets().len(), 4);
        assert_eq!(Neighbourhood::new(1.0).offsets().len(), 12);
        for &(dx, dz) in Neighbourhood::new(2.0).offsets() {
            assert!(is_lattice_point(dx, dz));
            assert!(dx.abs() <= 2.0 && dz.abs() <= 2.0);
        }
    }

    #[test]
    fn test_collect_skips_missing_columns() {
        let grid = SpatialHashIndex::from_tiles([
            Tile::new(0.0, 5.0, 0.0, TileType::Grass),
            Tile::new(0.5, 4.0, 0.5, TileType::Grass),
            Tile::new(1.0, 3.0, 0.0, TileType::Grass),
        ]);

        let around_origin = Neighbourhood::new(1.0).collect(&grid, 0.0, 0.0);
        assert_eq!(around_origin.len(), 2);
    }

    #[test]
    fn test_collect_uses_surface_of_stacked_column() {
        let grid = SpatialHashIndex::from_tiles([
            Tile::new(0.0, 5.0, 0.0, TileType::Grass),
            Tile::new(0.5, 2.0, 0.5, TileType::Dirt),
            Tile::new(0.5, 3.0, 0.5, TileType::Grass),
        ]);

        let heights: Vec<f32> = Neighbourhood::new(0.5).tiles(&grid, 0.0, 0.0).map(|t| t.y).collect();
        assert_eq!(heights, vec![3.0]);
    }
}
