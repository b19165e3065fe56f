//! Terrain tiles and column keys
//!
//! Tiles live on a staggered lattice: `x` and `z` step by 0.5 and only
//! positions where `x + z` is a whole number are valid. Several tiles may
//! share a column `(x, z)` at different heights.

use serde::{Deserialize, Serialize};

/// Tolerance used when comparing lattice coordinates.
const LATTICE_EPSILON: f32 = 1e-4;

/// Surface material of a tile
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TileType {
    #[default]
    Grass,
    Dirt,
    Water,
    DeepWater,
    Sand,
}

impl TileType {
    pub fn all() -> &'static [TileType] {
        &[
            TileType::Grass,
            TileType::Dirt,
            TileType::Water,
            TileType::DeepWater,
            TileType::Sand,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TileType::Grass => "Grass",
            TileType::Dirt => "Dirt",
            TileType::Water => "Water",
            TileType::DeepWater => "Deep Water",
            TileType::Sand => "Sand",
        }
    }

    /// Both shallow and deep water.
    pub fn is_water(&self) -> bool {
        matches!(self, TileType::Water | TileType::DeepWater)
    }
}

impl std::fmt::Display for TileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TileType::Grass => write!(f, "GRASS"),
            TileType::Dirt => write!(f, "DIRT"),
            TileType::Water => write!(f, "WATER"),
            TileType::DeepWater => write!(f, "DEEP_WATER"),
            TileType::Sand => write!(f, "SAND"),
        }
    }
}

/// Quantized `(x, z)` identifying a column of stacked tiles.
///
/// Coordinates are rounded to one decimal digit so that values produced by
/// repeated half-step arithmetic still land on the same key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnKey {
    pub x: i32,
    pub z: i32,
}

impl ColumnKey {
    pub fn new(x: f32, z: f32) -> Self {
        Self {
            x: quantize(x),
            z: quantize(z),
        }
    }
}

impl std::fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{}z{}", self.x, self.z)
    }
}

/// Round a coordinate or height to tenths, as an integer.
pub fn quantize(value: f32) -> i32 {
    (value * 10.0).round() as i32
}

/// Whether `(x, z)` is a valid position on the staggered lattice.
pub fn is_lattice_point(x: f32, z: f32) -> bool {
    let sum = x + z;
    (sum - sum.round()).abs() < LATTICE_EPSILON
}

/// A single terrain tile.
///
/// The serialized form is the persisted record `{x, y, z, type}`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(rename = "type")]
    pub tile_type: TileType,
}

impl Tile {
    pub fn new(x: f32, y: f32, z: f32, tile_type: TileType) -> Self {
        Self { x, y, z, tile_type }
    }

    pub fn column_key(&self) -> ColumnKey {
        ColumnKey::new(self.x, self.z)
    }

    /// Quantized height, used for equality inside a column.
    pub fn height_key(&self) -> i32 {
        quantize(self.y)
    }

    /// Storage key, unique per `(x, y, z)`.
    pub fn key(&self) -> String {
        format!("x{}y{}z{}", quantize(self.x), quantize(self.y), quantize(self.z))
    }

    pub fn same_position(&self, other: &Tile) -> bool {
        self.column_key() == other.column_key() && self.height_key() == other.height_key()
    }

    pub fn is_water(&self) -> bool {
        self.tile_type.is_water()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lattice_points() {
        assert!(is_lattice_point(0.0, 0.0));
        assert!(is_lattice_point(0.5, 0.5));
        assert!(is_lattice_point(-1.5, 2.5));
        assert!(!is_lattice_point(0.5, 0.0));
        assert!(!is_lattice_point(1.0, -0.5));
    }

    #[test]
    fn test_column_key_tolerates_float_drift() {
        let drifted = 0.1f32 + 0.2 + 0.2;
        assert_eq!(ColumnKey::new(drifted, 1.0), ColumnKey::new(0.5, 1.0));
        assert_ne!(ColumnKey::new(0.5, 1.0), ColumnKey::new(1.0, 0.5));
    }

    #[test]
    fn test_storage_key() {
        let tile = Tile::new(1.5, 31.5, -2.5, TileType::Water);
        assert_eq!(tile.key(), "x15y315z-25");
        assert_eq!(tile.column_key().to_string(), "x15z-25");
    }

    #[test]
    fn test_record_serialization() {
        let tile = Tile::new(0.5, 4.0, 1.5, TileType::DeepWater);
        let json = serde_json::to_string(&tile).unwrap();
        assert!(json.contains("\"type\":\"DEEP_WATER\""));

        let back: Tile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tile);
    }

    #[test]
    fn test_water_types() {
        assert!(TileType::Water.is_water());
        assert!(TileType::DeepWater.is_water());
        assert!(!TileType::Sand.is_water());
        assert_eq!(TileType::DeepWater.to_string(), "DEEP_WATER");
    }
}
