//! Seed management for terrain generation
//!
//! Every region gets its own seed derived from the master seed and the
//! region's bounds, so regenerating the same rectangle is deterministic no
//! matter in which order regions were requested.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::generator::RegionBounds;
use crate::tile::quantize;

/// Seeds for the terrain generation systems.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TerrainSeeds {
    /// Master seed (used for display/reference)
    pub master: u64,
    /// Initial tile heights
    pub heights: u64,
    /// Structure placement
    pub structures: u64,
}

impl TerrainSeeds {
    pub fn from_master(master: u64) -> Self {
        Self {
            master,
            heights: derive_seed(master, "heights"),
            structures: derive_seed(master, "structures"),
        }
    }

    /// Seed for generating one particular region.
    pub fn for_region(&self, system: u64, bounds: &RegionBounds) -> u64 {
        let mut hasher = DefaultHasher::new();
        system.hash(&mut hasher);
        quantize(bounds.start_x).hash(&mut hasher);
        quantize(bounds.start_z).hash(&mut hasher);
        quantize(bounds.end_x).hash(&mut hasher);
        quantize(bounds.end_z).hash(&mut hasher);
        hasher.finish()
    }
}

impl Default for TerrainSeeds {
    fn default() -> Self {
        Self::from_master(rand::random())
    }
}

impl std::fmt::Display for TerrainSeeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TerrainSeeds {{ master: {}, heights: {}, structures: {} }}",
            self.master, self.heights, self.structures,
        )
    }
}

/// Derive a sub-seed from a master seed and a system name.
fn derive_seed(master: u64, system: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    master.hash(&mut hasher);
    system.hash(&mut hasher);
    hasher.finish()
}
