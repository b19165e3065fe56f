//! World aggregate
//!
//! Owns the tile index, the non-terrain objects, the projection/camera, the
//! region loader and its backend, and the optional tile store. Everything
//! that reads or grows the world goes through here.

use crate::config::WorldConfig;
use crate::generator::lattice::HALF_STEP;
use crate::generator::{generate_region, GeneratedRegion, RegionBounds, RegionRequest};
use crate::geometry::{topmost, Camera, IsoProjection, ScreenPoint, Viewport};
use crate::objects::{Placed, Structure, Vehicle, WorldObject};
use crate::region_loader::{InlineBackend, LoadAction, RegionBackend, RegionLoader};
use crate::seeds::TerrainSeeds;
use crate::spatial_hash::{SpatialHashIndex, TileId};
use crate::store::TileStore;
use crate::tile::{is_lattice_point, Tile};

pub struct World {
    config: WorldConfig,
    seeds: TerrainSeeds,
    index: SpatialHashIndex,
    /// Structures and vehicles; terrain lives in `index`.
    objects: Vec<WorldObject>,
    projection: IsoProjection,
    loader: RegionLoader,
    backend: Box<dyn RegionBackend>,
    store: Option<Box<dyn TileStore>>,
    /// Last tile found under the pointer.
    selected: Option<TileId>,
    /// Lowest and highest tile seen so far.
    height_range: Option<(f32, f32)>,
}

impl World {
    /// An empty world that generates regions inline.
    pub fn new(config: WorldConfig) -> Self {
        let seeds = match config.seed {
            Some(seed) => TerrainSeeds::from_master(seed),
            None => TerrainSeeds::default(),
        };
        let backend = InlineBackend::new(config.terrain.clone(), seeds);
        let projection = IsoProjection::new(Viewport::from(config.viewport), Camera::default());

        Self {
            loader: RegionLoader::new(config.region_extension),
            config,
            seeds,
            index: SpatialHashIndex::new(),
            objects: Vec::new(),
            projection,
            backend: Box::new(backend),
            store: None,
            selected: None,
            height_range: None,
        }
    }

    /// Use `backend` for regions grown after the initial one.
    pub fn with_backend(mut self, backend: Box<dyn RegionBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_store(mut self, store: Box<dyn TileStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn seeds(&self) -> TerrainSeeds {
        self.seeds
    }

    pub fn index(&self) -> &SpatialHashIndex {
        &self.index
    }

    pub fn objects(&self) -> &[WorldObject] {
        &self.objects
    }

    pub fn projection(&self) -> &IsoProjection {
        &self.projection
    }

    pub fn camera(&self) -> Camera {
        self.projection.camera()
    }

    pub fn is_generating(&self) -> bool {
        self.loader.is_generating()
    }

    pub fn loader(&self) -> &RegionLoader {
        &self.loader
    }

    pub fn height_range(&self) -> Option<(f32, f32)> {
        self.height_range
    }

    /// Rectangle covered by the first generation.
    pub fn initial_bounds(&self) -> RegionBounds {
        let height = self.config.terrain.world_height as f32;
        RegionBounds::new(
            -1.0,
            -height,
            self.config.max_x + 1.0,
            self.config.max_z + height,
        )
    }

    /// Load the initial rectangle from the store, or generate and save it.
    /// Returns the number of tiles added.
    pub fn generate_initial(&mut self) -> usize {
        let bounds = self.initial_bounds();

        if let Some(stored) = self
            .store
            .as_deref()
            .and_then(|store| RegionLoader::load_stored(store, &bounds))
        {
            log::info!("Loaded {} tiles from the store", stored.tiles.len());
            return self.merge(stored, false);
        }

        let request = RegionRequest::new(bounds, Vec::new());
        let region = generate_region(&request, &self.config.terrain, &self.seeds);
        self.merge(region, true)
    }

    /// Add a region's tiles and structures. Returns how many tiles were new.
    fn merge(&mut self, region: GeneratedRegion, persist: bool) -> usize {
        if persist {
            self.persist(&region.tiles, &region.structures);
        }

        let added = self.index.extend(region.tiles.iter().copied());
        self.objects
            .extend(region.structures.into_iter().map(WorldObject::Structure));

        for tile in &region.tiles {
            self.height_range = Some(match self.height_range {
                Some((lo, hi)) => (lo.min(tile.y), hi.max(tile.y)),
                None => (tile.y, tile.y),
            });
        }

        log::debug!(
            "Merged {} new tiles from {} ({} total)",
            added,
            region.bounds,
            self.index.len()
        );
        added
    }

    fn persist(&mut self, tiles: &[Tile], structures: &[Structure]) {
        let Some(store) = self.store.as_mut() else {
            return;
        };
        let keys: Vec<String> = tiles.iter().map(Tile::key).collect();
        if let Err(e) = store.save_all(&keys, tiles) {
            log::warn!("Failed to save {} tiles: {}", tiles.len(), e);
        }
        let keys: Vec<String> = structures.iter().map(Structure::key).collect();
        if let Err(e) = store.save_structures(&keys, structures) {
            log::warn!("Failed to save {} structures: {}", structures.len(), e);
        }
    }

    pub fn get_tile(&self, x: f32, y: f32, z: f32) -> Option<&Tile> {
        self.index.get_tile(x, y, z)
    }

    pub fn get_column(&self, x: f32, z: f32) -> Vec<&Tile> {
        self.index.get_column(x, z)
    }

    /// The tile under screen point `(screen_x, screen_y)`.
    ///
    /// Falls back to the previous answer when no tile is hit.
    pub fn highlighted_tile(&mut self, screen_x: f32, screen_y: f32) -> Option<&Tile> {
        let point = ScreenPoint::new(screen_x, screen_y);
        let hit = topmost(self.tiles_under(point));

        if hit.is_some() {
            self.selected = hit;
        }
        self.selected.and_then(|id| self.index.get(id))
    }

    /// Tiles whose diamond contains `point`. Only the columns that can
    /// project under the point are looked up.
    fn tiles_under(&self, point: ScreenPoint) -> Vec<(TileId, &Tile)> {
        let Some((min_y, max_y)) = self.height_range else {
            return Vec::new();
        };
        let Some(area) = self.projection.candidate_area(point, min_y, max_y) else {
            return Vec::new();
        };

        let mut hits = Vec::new();
        let mut z = area.min_z;
        while z <= area.max_z {
            let mut x = area.min_x;
            while x <= area.max_x {
                if is_lattice_point(x, z) {
                    for &id in self.index.column_ids(x, z) {
                        if let Some(tile) = self.index.get(id) {
                            if tile.contains(&self.projection, point) {
                                hits.push((id, tile));
                            }
                        }
                    }
                }
                x += HALF_STEP;
            }
            z += HALF_STEP;
        }
        hits
    }

    pub fn selected_tile(&self) -> Option<&Tile> {
        self.selected.and_then(|id| self.index.get(id))
    }

    pub fn world_to_screen(&self, tile: &Tile) -> Option<ScreenPoint> {
        tile.screen_position(&self.projection)
    }

    pub fn tile_contains_screen_point(&self, tile: &Tile, screen_x: f32, screen_y: f32) -> bool {
        tile.contains(&self.projection, ScreenPoint::new(screen_x, screen_y))
    }

    /// Largest camera position: the middle of the far corner tile minus the
    /// viewport.
    fn camera_limit(&self) -> (f32, f32) {
        let terrain = &self.config.terrain;
        let corner_height = terrain.world_height as f32 - terrain.water_level();
        let corner = self
            .projection
            .middle_point_absolute(self.config.max_x, corner_height, self.config.max_z);
        let viewport = self.projection.viewport();
        (corner.x - viewport.width, corner.y - viewport.height)
    }

    /// Move the camera, clamped to the world, and start loading terrain if
    /// the new position is near an edge. Returns whether the camera moved.
    pub fn move_camera_to(&mut self, x: f32, z: f32) -> bool {
        let (limit_x, limit_z) = self.camera_limit();
        let x = x.max(0.0).min(limit_x);
        let z = z.max(0.0).min(limit_z);

        if self.camera().position() == (x, z) {
            return false;
        }

        self.evaluate_edges((x, z));
        self.projection.set_camera_position(x, z);
        true
    }

    pub fn move_camera_by(&mut self, dx: f32, dz: f32) -> bool {
        let (x, z) = self.camera().position();
        self.move_camera_to(x + dx, z + dz)
    }

    pub fn zoom_in(&mut self) -> bool {
        let changed = self.projection.zoom_in();
        if changed {
            self.reclamp_camera();
        }
        changed
    }

    pub fn zoom_out(&mut self) -> bool {
        let changed = self.projection.zoom_out();
        if changed {
            self.reclamp_camera();
        }
        changed
    }

    fn reclamp_camera(&mut self) {
        let (x, z) = self.camera().position();
        self.move_camera_to(x, z);
    }

    fn evaluate_edges(&mut self, target: (f32, f32)) {
        let action = self.loader.evaluate(
            &self.index,
            &self.projection,
            target,
            self.store.as_deref(),
            self.backend.as_mut(),
        );
        if let LoadAction::FromStore(region) = action {
            self.merge(region, false);
        }
    }

    /// Merge finished regions, then look at the edges once more.
    /// Returns the number of tiles added.
    pub fn pump(&mut self) -> usize {
        let mut added = 0;
        let mut completed = false;

        while let Some(region) = self.backend.poll() {
            if self.loader.complete(&region) {
                completed = true;
                added += self.merge(region, true);
            }
        }

        if completed {
            let target = self.camera().position();
            self.evaluate_edges(target);
        }
        added
    }

    /// Place a vehicle on top of column `(x, z)`. Returns its object index,
    /// or `None` if the column is empty.
    pub fn spawn_vehicle(&mut self, mut vehicle: Vehicle, x: f32, z: f32) -> Option<usize> {
        if !vehicle.move_to(&self.index, x, z) {
            return None;
        }
        self.objects.push(WorldObject::Vehicle(vehicle));
        Some(self.objects.len() - 1)
    }

    /// Move the vehicle at object index `slot` by `(dx, dz)`.
    pub fn move_vehicle_by(&mut self, slot: usize, dx: f32, dz: f32) -> bool {
        match self.objects.get_mut(slot) {
            Some(WorldObject::Vehicle(vehicle)) => vehicle.move_by(&self.index, dx, dz),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TerrainParams, ViewportConfig};
    use crate::objects::VehicleKind;
    use crate::store::JsonTileStore;
    use crate::worker::GeneratorHandle;
    use tempfile::tempdir;

    fn small_config(seed: u64) -> WorldConfig {
        WorldConfig {
            seed: Some(seed),
            max_x: 32.0,
            max_z: 48.0,
            viewport: ViewportConfig {
                width: 800.0,
                height: 600.0,
            },
            terrain: TerrainParams {
                world_height: 8,
                smooth_depth: 4,
                ..TerrainParams::default()
            },
            ..WorldConfig::default()
        }
    }

    fn generated(seed: u64) -> World {
        let mut world = World::new(small_config(seed));
        world.generate_initial();
        world
    }

    #[test]
    fn test_initial_world_covers_initial_bounds() {
        let world = generated(1);
        let extent = world.index().extent().unwrap();

        assert_eq!(extent.min_x, -1.0);
        assert_eq!(extent.max_x, 33.0);
        assert_eq!(extent.min_z, -8.0);
        assert_eq!(extent.max_z, 56.0);

        let (lo, hi) = world.height_range().unwrap();
        assert!(lo >= 0.0 && hi <= 9.0);
    }

    #[test]
    fn test_tile_lookup() {
        let world = generated(2);
        let column = world.get_column(4.0, 4.0);
        assert!(!column.is_empty());

        let top = column.iter().map(|t| t.y).fold(f32::MIN, f32::max);
        assert!(world.get_tile(4.0, top, 4.0).is_some());
        assert!(world.get_tile(4.0, top + 1.0, 4.0).is_none());
        assert!(world.get_column(4.25, 4.0).is_empty());
    }

    #[test]
    fn test_highlight_hits_centroid_and_sticks() {
        let mut world = generated(3);
        let tile = *world
            .index()
            .tiles()
            .iter()
            .filter(|t| world.world_to_screen(t).is_some())
            .max_by(|a, b| a.z.total_cmp(&b.z).then(a.y.total_cmp(&b.y)))
            .unwrap();
        let centre = world.projection().diamond(tile.x, tile.y, tile.z).unwrap().centroid();

        let hit = *world.highlighted_tile(centre.x, centre.y).unwrap();
        assert!(world.tile_contains_screen_point(&hit, centre.x, centre.y));

        // Nothing is drawn far off screen; the previous answer stays
        let sticky = *world.highlighted_tile(-10_000.0, -10_000.0).unwrap();
        assert_eq!(sticky, hit);
    }

    #[test]
    fn test_column_lookup_matches_full_scan() {
        let mut world = generated(3);
        world.move_camera_to(40.0, 30.0);
        let viewport = world.projection().viewport();

        for i in 0..12 {
            for j in 0..9 {
                let point = ScreenPoint::new(
                    viewport.width * (i as f32 + 0.37) / 12.0,
                    viewport.height * (j as f32 + 0.61) / 9.0,
                );
                let projection = *world.projection();
                let scanned = topmost(
                    world
                        .index()
                        .iter()
                        .filter(|(_, tile)| tile.contains(&projection, point)),
                );
                assert_eq!(topmost(world.tiles_under(point)), scanned, "at {:?}", point);
            }
        }
    }

    #[test]
    fn test_camera_is_clamped() {
        let mut world = generated(4);
        assert!(!world.move_camera_to(-50.0, -50.0));
        assert_eq!(world.camera().position(), (0.0, 0.0));

        world.move_camera_to(1.0e6, 1.0e6);
        let (x, z) = world.camera().position();
        assert!(x < 1.0e6 && z < 1.0e6);
    }

    #[test]
    fn test_zoom_recomputes_tile_size() {
        let mut world = generated(5);
        let before = world.projection().metrics().width;
        assert!(world.zoom_in());
        assert!(world.projection().metrics().width > before);
    }

    #[test]
    fn test_edge_load_is_merged_on_pump() {
        let mut world = generated(6);
        let before = world.index().len();

        assert!(world.move_camera_to(50.0, 50.0));
        assert!(world.is_generating());

        // Further movement while loading does not queue another request
        world.move_camera_to(60.0, 50.0);
        assert_eq!(world.loader().suppressed(), 1);

        let added = world.pump();
        assert!(added > 0);
        assert_eq!(world.index().len(), before + added);
        assert_eq!(world.index().extent().unwrap().min_x, -17.0);
    }

    #[test]
    fn test_stopped_worker_leaves_loader_idle() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let config = small_config(6);
        let worker = GeneratorHandle::spawn(runtime.handle(), config.terrain.clone(), TerrainSeeds::from_master(6));
        drop(runtime);

        let mut world = World::new(config).with_backend(Box::new(worker));
        world.generate_initial();

        assert!(world.move_camera_to(50.0, 50.0));
        assert!(!world.is_generating());
        assert_eq!(world.pump(), 0);
        assert_eq!(world.loader().suppressed(), 0);
    }

    #[test]
    fn test_store_round_trip_reuses_tiles() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tiles.json");

        let mut first = World::new(small_config(7)).with_store(Box::new(JsonTileStore::new(&path)));
        let generated = first.generate_initial();
        assert!(generated > 0);

        // Different seed, same store: stored tiles win
        let mut second = World::new(small_config(99)).with_store(Box::new(JsonTileStore::new(&path)));
        assert_eq!(second.generate_initial(), generated);

        let mut a: Vec<String> = first.index().tiles().iter().map(Tile::key).collect();
        let mut b: Vec<String> = second.index().tiles().iter().map(Tile::key).collect();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn test_store_brings_back_structures() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tiles.json");
        let mut config = small_config(7);
        config.terrain.structure_chance = 0.3;

        let mut first = World::new(config.clone()).with_store(Box::new(JsonTileStore::new(&path)));
        first.generate_initial();
        let houses = |world: &World| {
            let mut keys: Vec<String> = world
                .objects()
                .iter()
                .filter_map(|o| match o {
                    WorldObject::Structure(s) => Some(s.key()),
                    _ => None,
                })
                .collect();
            keys.sort();
            keys
        };
        assert!(!houses(&first).is_empty());

        config.seed = Some(99);
        config.terrain.structure_chance = 0.0;
        let mut second = World::new(config).with_store(Box::new(JsonTileStore::new(&path)));
        second.generate_initial();
        assert_eq!(houses(&second), houses(&first));
    }

    #[test]
    fn test_vehicle_moves_over_terrain() {
        let mut world = generated(8);
        let slot = world
            .spawn_vehicle(Vehicle::new(0.0, 0.0, 0.0, VehicleKind::Boat), 2.0, 2.0)
            .unwrap();
        assert!(world.move_vehicle_by(slot, 1.0, 0.0));

        let WorldObject::Vehicle(boat) = world.objects()[slot] else {
            panic!("expected a vehicle");
        };
        let top = world.index().surface_tile(3.0, 2.0).unwrap().y;
        assert_eq!(boat.y, top + 1.0);
        assert!(world.spawn_vehicle(boat, 3.25, 2.0).is_none());
    }
}
