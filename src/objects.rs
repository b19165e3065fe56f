//! Things that live in the world besides bare terrain
//!
//! Terrain tiles, structures and vehicles share one projection and one
//! hit-test; [`Placed`] supplies both from a world position.

use serde::{Deserialize, Serialize};

use crate::geometry::{IsoProjection, ScreenPoint, ScreenRect};
use crate::spatial_hash::SpatialHashIndex;
use crate::tile::{quantize, Tile};

/// Anything drawn at a world position.
pub trait Placed {
    /// World `(x, y, z)`.
    fn position(&self) -> (f32, f32, f32);

    /// Top-left corner on screen, `None` when off-screen.
    fn screen_position(&self, projection: &IsoProjection) -> Option<ScreenPoint> {
        let (x, y, z) = self.position();
        projection.world_to_screen(x, y, z)
    }

    fn bounding_box(&self, projection: &IsoProjection) -> Option<ScreenRect> {
        let (x, y, z) = self.position();
        projection.bounding_box(x, y, z)
    }

    /// Whether `point` lies on the object's top diamond.
    fn contains(&self, projection: &IsoProjection, point: ScreenPoint) -> bool {
        let (x, y, z) = self.position();
        projection.contains(x, y, z, point)
    }
}

impl Placed for Tile {
    fn position(&self) -> (f32, f32, f32) {
        (self.x, self.y, self.z)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HouseVariant {
    #[serde(rename = "VARIANT_1")]
    Variant1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "variant", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StructureKind {
    House(HouseVariant),
}

/// A building standing on a tile, one level above it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub kind: StructureKind,
}

impl Structure {
    /// A structure standing on top of `tile`.
    pub fn on(tile: &Tile, kind: StructureKind) -> Self {
        Self {
            x: tile.x,
            y: tile.y + 1.0,
            z: tile.z,
            kind,
        }
    }

    /// Storage key, distinct from the key of the tile it stands on.
    pub fn key(&self) -> String {
        format!("structure_x{}y{}z{}", quantize(self.x), quantize(self.y), quantize(self.z))
    }
}

impl Placed for Structure {
    fn position(&self) -> (f32, f32, f32) {
        (self.x, self.y, self.z)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleKind {
    Boat,
}

/// A movable object that always rests on top of its column.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub kind: VehicleKind,
}

impl Vehicle {
    pub fn new(x: f32, y: f32, z: f32, kind: VehicleKind) -> Self {
        Self { x, y, z, kind }
    }

    /// Move to column `(x, z)` and sit one level above its highest tile.
    ///
    /// Returns `false` and stays put when the column has no tiles.
    pub fn move_to(&mut self, grid: &SpatialHashIndex, x: f32, z: f32) -> bool {
        let Some(top) = grid.surface_tile(x, z) else {
            return false;
        };
        self.x = x;
        self.z = z;
        self.y = top.y + 1.0;
        true
    }

    pub fn move_by(&mut self, grid: &SpatialHashIndex, dx: f32, dz: f32) -> bool {
        self.move_to(grid, self.x + dx, self.z + dz)
    }
}

impl Placed for Vehicle {
    fn position(&self) -> (f32, f32, f32) {
        (self.x, self.y, self.z)
    }
}

/// Everything the world can hold
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WorldObject {
    Terrain(Tile),
    Structure(Structure),
    Vehicle(Vehicle),
}

impl WorldObject {
    pub fn as_tile(&self) -> Option<&Tile> {
        match self {
            WorldObject::Terrain(tile) => Some(tile),
            _ => None,
        }
    }

    pub fn is_terrain(&self) -> bool {
        matches!(self, WorldObject::Terrain(_))
    }
}

impl Placed for WorldObject {
    fn position(&self) -> (f32, f32, f32) {
        match self {
            WorldObject::Terrain(tile) => tile.position(),
            WorldObject::Structure(structure) => structure.position(),
            WorldObject::Vehicle(vehicle) => vehicle.position(),
        }
    }
}

impl From<Tile> for WorldObject {
    fn from(tile: Tile) -> Self {
        WorldObject::Terrain(tile)
    }
}

impl From<Structure> for WorldObject {
    fn from(structure: Structure) -> Self {
        WorldObject::Structure(structure)
    }
}

impl From<Vehicle> for WorldObject {
    fn from(vehicle: Vehicle) -> Self {
        WorldObject::Vehicle(vehicle)
    }
}
