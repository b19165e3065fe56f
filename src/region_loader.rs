//! Incremental world growth
//!
//! When the camera target gets close to an edge of the known world, a new
//! strip is requested past that edge, with the tiles on the edge line passed
//! along as the seam. Only one request is outstanding at a time; triggers
//! while it runs are dropped, not queued.

use std::collections::VecDeque;

use crate::config::TerrainParams;
use crate::generator::{generate_region, GeneratedRegion, RegionBounds, RegionRequest};
use crate::geometry::{IsoProjection, ScreenPoint};
use crate::seeds::TerrainSeeds;
use crate::spatial_hash::{Extent, SpatialHashIndex};
use crate::store::{structures_within, tiles_within, TileStore};
use crate::tile::quantize;
use crate::worker::GeneratorHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    West,
    East,
    North,
    South,
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Edge::West => write!(f, "west"),
            Edge::East => write!(f, "east"),
            Edge::North => write!(f, "north"),
            Edge::South => write!(f, "south"),
        }
    }
}

/// Where region requests are carried out.
pub trait RegionBackend {
    /// Hand `request` over. Returns `false` if it was not accepted and no
    /// answer will come.
    fn dispatch(&mut self, request: RegionRequest) -> bool;

    /// A finished region, if one is ready.
    fn poll(&mut self) -> Option<GeneratedRegion>;
}

/// Generates on the calling thread at dispatch time; results wait for
/// [`RegionBackend::poll`].
pub struct InlineBackend {
    params: TerrainParams,
    seeds: TerrainSeeds,
    ready: VecDeque<GeneratedRegion>,
}

impl InlineBackend {
    pub fn new(params: TerrainParams, seeds: TerrainSeeds) -> Self {
        Self {
            params,
            seeds,
            ready: VecDeque::new(),
        }
    }
}

impl RegionBackend for InlineBackend {
    fn dispatch(&mut self, request: RegionRequest) -> bool {
        let region = generate_region(&request, &self.params, &self.seeds);
        self.ready.push_back(region);
        true
    }

    fn poll(&mut self) -> Option<GeneratedRegion> {
        self.ready.pop_front()
    }
}

impl RegionBackend for GeneratorHandle {
    fn dispatch(&mut self, request: RegionRequest) -> bool {
        let bounds = request.bounds;
        let accepted = self.submit(request);
        if !accepted {
            log::warn!("Generator worker unavailable, dropped request for {}", bounds);
        }
        accepted
    }

    fn poll(&mut self) -> Option<GeneratedRegion> {
        self.try_recv()
    }
}

/// Outcome of one edge evaluation
#[derive(Clone, Debug, PartialEq)]
pub enum LoadAction {
    /// Camera is not near any edge.
    Idle,
    /// A request is already outstanding.
    Suppressed,
    /// Request sent to the backend; the guard is now set.
    Dispatched(RegionBounds),
    /// The backend refused the request; the guard stays clear.
    Rejected(RegionBounds),
    /// The store already held the region; merge it directly.
    FromStore(GeneratedRegion),
}

pub struct RegionLoader {
    /// Grid units added past the triggering edge.
    extension: f32,
    generating: bool,
    pending: Option<RegionBounds>,
    suppressed: usize,
}

impl RegionLoader {
    pub fn new(extension: f32) -> Self {
        Self {
            extension,
            generating: false,
            pending: None,
            suppressed: 0,
        }
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn pending(&self) -> Option<RegionBounds> {
        self.pending
    }

    /// Triggers dropped while a request was outstanding.
    pub fn suppressed(&self) -> usize {
        self.suppressed
    }

    /// Screen position (camera ignored) of the tile at an extent corner.
    /// Falls back to the bare corner at height 0 when that column is empty.
    fn corner_screen(index: &SpatialHashIndex, projection: &IsoProjection, x: f32, z: f32) -> ScreenPoint {
        match index.surface_tile(x, z) {
            Some(tile) => projection.project_absolute(tile.x, tile.y, tile.z),
            None => projection.project_absolute(x, 0.0, z),
        }
    }

    /// The first edge (west, east, north, south) the camera target is close to.
    pub fn approaching_edge(
        index: &SpatialHashIndex,
        projection: &IsoProjection,
        target: (f32, f32),
    ) -> Option<Edge> {
        let extent = index.extent()?;
        let viewport = projection.viewport();
        let (x, z) = target;

        let min = Self::corner_screen(index, projection, extent.min_x, extent.min_z);
        let max = Self::corner_screen(index, projection, extent.max_x, extent.max_z);

        if (min.x - x).abs() < viewport.width * 0.5 {
            Some(Edge::West)
        } else if (max.x - x).abs() < viewport.width * 1.5 {
            Some(Edge::East)
        } else if (min.y - z).abs() < viewport.width * 0.5 {
            Some(Edge::North)
        } else if (max.y - z).abs() < viewport.height + viewport.width * 0.5 {
            Some(Edge::South)
        } else {
            None
        }
    }

    /// Strip past `edge` spanning the full known extent on the other axis.
    pub fn bounds_for(&self, extent: &Extent, edge: Edge) -> RegionBounds {
        let Extent {
            min_x,
            max_x,
            min_z,
            max_z,
        } = *extent;
        let ext = self.extension;
        match edge {
            Edge::West => RegionBounds::new(min_x - ext, min_z, min_x - 0.5, max_z),
            Edge::East => RegionBounds::new(max_x + 0.5, min_z, max_x + ext, max_z),
            Edge::North => RegionBounds::new(min_x, min_z - ext, max_x, min_z - 0.5),
            Edge::South => RegionBounds::new(min_x, max_z + 0.5, max_x, max_z + ext),
        }
    }

    /// Request for the strip past `edge`, seamed with every tile on that
    /// edge line.
    pub fn request_for(&self, index: &SpatialHashIndex, edge: Edge) -> Option<RegionRequest> {
        let extent = index.extent()?;
        let bounds = self.bounds_for(&extent, edge);

        let connected = match edge {
            Edge::West => {
                let line = quantize(extent.min_x);
                index.collect_where(|t| quantize(t.x) == line)
            }
            Edge::East => {
                let line = quantize(extent.max_x);
                index.collect_where(|t| quantize(t.x) == line)
            }
            Edge::North => {
                let line = quantize(extent.min_z);
                index.collect_where(|t| quantize(t.z) == line)
            }
            Edge::South => {
                let line = quantize(extent.max_z);
                index.collect_where(|t| quantize(t.z) == line)
            }
        };

        Some(RegionRequest::new(bounds, connected))
    }

    /// Check the camera target against the world edges and start loading if
    /// needed. Stored tiles for the new strip are used instead of generating.
    pub fn evaluate(
        &mut self,
        index: &SpatialHashIndex,
        projection: &IsoProjection,
        target: (f32, f32),
        store: Option<&dyn TileStore>,
        backend: &mut dyn RegionBackend,
    ) -> LoadAction {
        if self.generating {
            self.suppressed += 1;
            log::debug!("Region load already in flight, trigger dropped");
            return LoadAction::Suppressed;
        }

        let Some(edge) = Self::approaching_edge(index, projection, target) else {
            return LoadAction::Idle;
        };
        let Some(request) = self.request_for(index, edge) else {
            return LoadAction::Idle;
        };

        if let Some(stored) = store.and_then(|s| Self::load_stored(s, &request.bounds)) {
            log::info!("Loaded {} stored tiles for {} edge {}", stored.tiles.len(), edge, stored.bounds);
            return LoadAction::FromStore(stored);
        }

        let bounds = request.bounds;
        log::info!("Camera near {} edge, requesting {}", edge, bounds);
        self.generating = true;
        self.pending = Some(bounds);
        if !backend.dispatch(request) {
            self.generating = false;
            self.pending = None;
            return LoadAction::Rejected(bounds);
        }
        LoadAction::Dispatched(bounds)
    }

    /// Stored tiles inside `bounds`, if there are any, with the structures
    /// standing on them.
    pub fn load_stored(store: &dyn TileStore, bounds: &RegionBounds) -> Option<GeneratedRegion> {
        let all = match store.get_all() {
            Ok(tiles) => tiles,
            Err(e) => {
                log::warn!("Tile store read failed, generating instead: {}", e);
                return None;
            }
        };

        let tiles = tiles_within(&all, bounds);
        if tiles.is_empty() {
            return None;
        }
        let structures = match store.get_structures() {
            Ok(structures) => structures_within(&structures, bounds),
            Err(e) => {
                log::warn!("Structure read failed, loading bare terrain: {}", e);
                Vec::new()
            }
        };
        Some(GeneratedRegion {
            bounds: *bounds,
            tiles,
            structures,
        })
    }

    /// Clear the guard if `region` answers the outstanding request.
    ///
    /// Returns `false` for a response nobody is waiting for.
    pub fn complete(&mut self, region: &GeneratedRegion) -> bool {
        match self.pending {
            Some(pending) if pending.same_area(&region.bounds) => {
                self.pending = None;
                self.generating = false;
                true
            }
            _ => {
                log::warn!("Ignoring unexpected region {}", region.bounds);
                false
            }
        }
    }
}
