//! Region terrain generation
//!
//! A region is a rectangle of the staggered lattice. Generation runs as a
//! fixed sequence of passes over a private [`SpatialHashIndex`]:
//!
//! 1. Grid construction with initial heights
//! 2. Smoothing, `smooth_depth` times
//! 3. Water classification and correction
//! 4. Shoreline classification
//! 5. Dirt fill, up to `world_height` times
//! 6. Structure placement (off unless configured)
//!
//! Border tiles from an adjacent region take part as neighbours so heights
//! stay continuous across the seam, but are never rewritten or returned.
//!
//! [`TerrainJob`] exposes the passes one at a time so a caller can
//! interleave other work; [`generate_region`] and
//! [`generate_region_async`] run a job to completion.

pub mod dirt;
pub mod lattice;
pub mod smoothing;
pub mod structures;
pub mod water;

use std::time::Instant;

use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{HeightSource, TerrainParams};
use crate::objects::Structure;
use crate::seeds::TerrainSeeds;
use crate::spatial_hash::{SpatialHashIndex, TileId};
use crate::tile::{quantize, Tile, TileType};

use water::WaterStats;

/// Widest span, in grid units, a single region may cover on either axis.
pub const MAX_REGION_SPAN: f32 = 4096.0;

/// Inclusive rectangle in lattice coordinates
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionBounds {
    pub start_x: f32,
    pub start_z: f32,
    pub end_x: f32,
    pub end_z: f32,
}

impl RegionBounds {
    pub fn new(start_x: f32, start_z: f32, end_x: f32, end_z: f32) -> Self {
        Self {
            start_x,
            start_z,
            end_x,
            end_z,
        }
    }

    /// Finite, not inverted and no wider than [`MAX_REGION_SPAN`].
    pub fn is_valid(&self) -> bool {
        let finite = [self.start_x, self.start_z, self.end_x, self.end_z]
            .iter()
            .all(|v| v.is_finite());
        let span_x = self.end_x - self.start_x;
        let span_z = self.end_z - self.start_z;
        finite
            && (0.0..=MAX_REGION_SPAN).contains(&span_x)
            && (0.0..=MAX_REGION_SPAN).contains(&span_z)
    }

    pub fn contains(&self, x: f32, z: f32) -> bool {
        x >= self.start_x && x <= self.end_x && z >= self.start_z && z <= self.end_z
    }

    /// Equality on quantized corners, for correlating responses.
    pub fn same_area(&self, other: &RegionBounds) -> bool {
        self.quantized() == other.quantized()
    }

    fn quantized(&self) -> [i32; 4] {
        [
            quantize(self.start_x),
            quantize(self.start_z),
            quantize(self.end_x),
            quantize(self.end_z),
        ]
    }
}

impl std::fmt::Display for RegionBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {})..({}, {})",
            self.start_x, self.start_z, self.end_x, self.end_z
        )
    }
}

/// A rectangle to generate plus the already-placed tiles along its seam.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionRequest {
    pub bounds: RegionBounds,
    pub connected: Vec<Tile>,
}

impl RegionRequest {
    pub fn new(bounds: RegionBounds, connected: Vec<Tile>) -> Self {
        Self { bounds, connected }
    }
}

/// Output of one region generation.
///
/// `tiles` holds the region's own tiles and every dirt tile created during
/// the run, sorted z-major, y-minor.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedRegion {
    pub bounds: RegionBounds,
    pub tiles: Vec<Tile>,
    pub structures: Vec<Structure>,
}

impl GeneratedRegion {
    pub fn empty(bounds: RegionBounds) -> Self {
        Self {
            bounds,
            tiles: Vec::new(),
            structures: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// Pass a [`TerrainJob`] will run next
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationStage {
    Smoothing { iteration: usize },
    Water,
    Shoreline,
    Dirt { iteration: usize },
    Structures,
    Finished,
}

impl std::fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationStage::Smoothing { iteration } => write!(f, "smoothing #{}", iteration + 1),
            GenerationStage::Water => write!(f, "water"),
            GenerationStage::Shoreline => write!(f, "shoreline"),
            GenerationStage::Dirt { iteration } => write!(f, "dirt #{}", iteration + 1),
            GenerationStage::Structures => write!(f, "structures"),
            GenerationStage::Finished => write!(f, "finished"),
        }
    }
}

/// Source of pre-smoothing heights for one region.
enum InitialHeights {
    Uniform { max: u32 },
    Perlin { noise: Perlin, frequency: f64, max: u32 },
    Flat(f32),
}

impl InitialHeights {
    fn new(params: &TerrainParams, seed: u64) -> Self {
        match params.height_source {
            HeightSource::Uniform => InitialHeights::Uniform {
                max: params.world_height,
            },
            HeightSource::Perlin { frequency } => InitialHeights::Perlin {
                noise: Perlin::new(seed as u32),
                frequency,
                max: params.world_height,
            },
            HeightSource::Flat { height } => InitialHeights::Flat(height),
        }
    }

    fn sample<R: Rng>(&self, rng: &mut R, x: f32, z: f32) -> f32 {
        match self {
            InitialHeights::Uniform { max } => rng.gen_range(0..=*max) as f32,
            InitialHeights::Perlin {
                noise,
                frequency,
                max,
            } => {
                let n = noise.get([x as f64 * frequency, z as f64 * frequency]);
                let h = ((n + 1.0) / 2.0 * *max as f64).round();
                h.clamp(0.0, *max as f64) as f32
            }
            InitialHeights::Flat(height) => *height,
        }
    }
}

/// One region generation, advanced pass by pass with [`TerrainJob::step`].
pub struct TerrainJob {
    bounds: RegionBounds,
    params: TerrainParams,
    grid: SpatialHashIndex,
    /// The region's own tiles (rewritten by the passes, emitted).
    region: Vec<TileId>,
    /// Connected tiles from the neighbouring region (read-only, not emitted).
    border: Vec<TileId>,
    /// Index length after construction; everything past it is new dirt.
    seeded_len: usize,
    dirt_frontier: Vec<TileId>,
    structures: Vec<Structure>,
    water_stats: WaterStats,
    stage: GenerationStage,
    rng: ChaCha8Rng,
}

impl TerrainJob {
    pub fn new(request: &RegionRequest, params: &TerrainParams, seeds: &TerrainSeeds) -> Self {
        let bounds = request.bounds;
        let mut grid = SpatialHashIndex::new();
        let mut rng = ChaCha8Rng::seed_from_u64(seeds.for_region(seeds.heights, &bounds));
        let heights = InitialHeights::new(params, seeds.heights);

        let region: Vec<TileId> = lattice::lattice_points(&bounds)
            .into_iter()
            .map(|(x, z)| {
                let y = heights.sample(&mut rng, x, z);
                grid.insert(Tile::new(x, y, z, TileType::Grass))
            })
            .collect();

        let border: Vec<TileId> = if region.is_empty() {
            Vec::new()
        } else {
            request
                .connected
                .iter()
                .filter(|tile| !bounds.contains(tile.x, tile.z))
                .map(|tile| grid.insert(*tile))
                .collect()
        };

        let stage = if region.is_empty() {
            log::warn!("Region {} has no lattice points, skipping generation", bounds);
            GenerationStage::Finished
        } else if params.smooth_depth == 0 {
            GenerationStage::Water
        } else {
            GenerationStage::Smoothing { iteration: 0 }
        };

        let structure_rng =
            ChaCha8Rng::seed_from_u64(seeds.for_region(seeds.structures, &bounds));

        Self {
            bounds,
            params: params.clone(),
            seeded_len: grid.len(),
            grid,
            region,
            border,
            dirt_frontier: Vec::new(),
            structures: Vec::new(),
            water_stats: WaterStats::default(),
            stage,
            rng: structure_rng,
        }
    }

    pub fn stage(&self) -> GenerationStage {
        self.stage
    }

    pub fn is_finished(&self) -> bool {
        self.stage == GenerationStage::Finished
    }

    pub fn bounds(&self) -> RegionBounds {
        self.bounds
    }

    /// Working index: region, border and dirt tiles.
    pub fn grid(&self) -> &SpatialHashIndex {
        &self.grid
    }

    pub fn water_stats(&self) -> WaterStats {
        self.water_stats
    }

    /// Run the current pass and return the stage that follows it.
    pub fn step(&mut self) -> GenerationStage {
        self.stage = match self.stage {
            GenerationStage::Smoothing { iteration } => {
                let changed = smoothing::smooth_once(&mut self.grid, &self.region);
                log::debug!(
                    "Smoothing {}/{}: {} tiles changed",
                    iteration + 1,
                    self.params.smooth_depth,
                    changed
                );
                if iteration + 1 < self.params.smooth_depth {
                    GenerationStage::Smoothing {
                        iteration: iteration + 1,
                    }
                } else {
                    GenerationStage::Water
                }
            }
            GenerationStage::Water => {
                water::classify_water(&mut self.grid, &self.region, &self.params, &mut self.water_stats);
                water::correct_water(&mut self.grid, &self.region, &self.params, &mut self.water_stats);
                log::debug!("Water classified: {:?}", self.water_stats);
                GenerationStage::Shoreline
            }
            GenerationStage::Shoreline => {
                water::classify_shoreline(&mut self.grid, &self.region, &self.params, &mut self.water_stats);
                log::debug!(
                    "Shoreline: {} sand, {} lifted",
                    self.water_stats.sand,
                    self.water_stats.lifted
                );
                let mut candidates = dirt::initial_candidates(&self.grid, &self.region);
                candidates.extend(dirt::seam_candidates(&self.grid, &self.border));
                self.dirt_frontier = candidates;
                GenerationStage::Dirt { iteration: 0 }
            }
            GenerationStage::Dirt { iteration } => {
                let frontier = std::mem::take(&mut self.dirt_frontier);
                self.dirt_frontier = dirt::fill_once(&mut self.grid, &frontier);
                log::debug!(
                    "Dirt {}/{}: {} tiles added",
                    iteration + 1,
                    self.params.dirt_depth(),
                    self.dirt_frontier.len()
                );
                if self.dirt_frontier.is_empty() || iteration + 1 >= self.params.dirt_depth() {
                    GenerationStage::Structures
                } else {
                    GenerationStage::Dirt {
                        iteration: iteration + 1,
                    }
                }
            }
            GenerationStage::Structures => {
                self.structures = structures::spawn_structures(
                    &self.grid,
                    &self.region,
                    &self.params,
                    &mut self.rng,
                );
                GenerationStage::Finished
            }
            GenerationStage::Finished => GenerationStage::Finished,
        };
        self.stage
    }

    /// Run every remaining pass.
    pub fn run(&mut self) {
        self.run_with_progress(|_| {});
    }

    /// Run every remaining pass, reporting each stage before it runs.
    pub fn run_with_progress<F: FnMut(GenerationStage)>(&mut self, mut progress: F) {
        while !self.is_finished() {
            progress(self.stage);
            self.step();
        }
    }

    /// Emitted tiles, sorted z-major, y-minor. Border tiles are left out;
    /// dirt created under them is kept.
    pub fn finish(self) -> GeneratedRegion {
        let new_ids = (self.seeded_len..self.grid.len()).map(TileId);
        let mut tiles: Vec<Tile> = self
            .region
            .iter()
            .copied()
            .chain(new_ids)
            .filter_map(|id| self.grid.get(id).copied())
            .collect();
        tiles.sort_by(|a, b| a.z.total_cmp(&b.z).then(a.y.total_cmp(&b.y)));

        GeneratedRegion {
            bounds: self.bounds,
            tiles,
            structures: self.structures,
        }
    }
}

/// Generate a region in one blocking call.
pub fn generate_region(
    request: &RegionRequest,
    params: &TerrainParams,
    seeds: &TerrainSeeds,
) -> GeneratedRegion {
    let start = Instant::now();
    let mut job = TerrainJob::new(request, params, seeds);
    job.run();
    let region = job.finish();
    log::info!(
        "Generated region {}: {} tiles, {} structures in {:.1?}",
        region.bounds,
        region.tiles.len(),
        region.structures.len(),
        start.elapsed()
    );
    region
}

/// Generate a region, yielding to the runtime between passes.
pub async fn generate_region_async(
    request: RegionRequest,
    params: TerrainParams,
    seeds: TerrainSeeds,
) -> GeneratedRegion {
    let start = Instant::now();
    let mut job = TerrainJob::new(&request, &params, &seeds);
    while !job.is_finished() {
        job.step();
        tokio::task::yield_now().await;
    }
    let region = job.finish();
    log::info!(
        "Generated region {} (async): {} tiles in {:.1?}",
        region.bounds,
        region.tiles.len(),
        start.elapsed()
    );
    region
}
