//! Tile persistence.
//!
//! Generated tiles are saved under their position key
//! (`x{10x}y{10y}z{10z}`) so a later session can reuse a region instead of
//! generating it again. Structures share the same file under
//! `structure_x..y..z..` keys.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::generator::RegionBounds;
use crate::objects::Structure;
use crate::tile::Tile;

/// Key/value storage of tile records.
pub trait TileStore: Send {
    /// Every stored tile.
    fn get_all(&self) -> Result<Vec<Tile>, StoreError>;

    /// Store `tiles[i]` under `keys[i]`, replacing existing records.
    fn save_all(&mut self, keys: &[String], tiles: &[Tile]) -> Result<(), StoreError>;

    /// Every stored structure.
    fn get_structures(&self) -> Result<Vec<Structure>, StoreError>;

    /// Store `structures[i]` under `keys[i]`, replacing existing records.
    fn save_structures(&mut self, keys: &[String], structures: &[Structure]) -> Result<(), StoreError>;
}

/// One value in the key/value file. Tile records keep the bare
/// `{x, y, z, type}` shape.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Tile(Tile),
    Structure(Structure),
}

impl StoredRecord {
    fn tile(&self) -> Option<Tile> {
        match self {
            StoredRecord::Tile(tile) => Some(*tile),
            StoredRecord::Structure(_) => None,
        }
    }

    fn structure(&self) -> Option<Structure> {
        match self {
            StoredRecord::Structure(structure) => Some(*structure),
            StoredRecord::Tile(_) => None,
        }
    }
}

/// Stored structures standing inside `bounds` (inclusive).
pub fn structures_within(structures: &[Structure], bounds: &RegionBounds) -> Vec<Structure> {
    structures
        .iter()
        .filter(|s| bounds.contains(s.x, s.z))
        .copied()
        .collect()
}

/// Stored tiles whose column lies inside `bounds` (inclusive).
pub fn tiles_within(tiles: &[Tile], bounds: &RegionBounds) -> Vec<Tile> {
    tiles
        .iter()
        .filter(|t| bounds.contains(t.x, t.z))
        .copied()
        .collect()
}

fn check_lengths<T>(keys: &[String], records: &[T]) -> Result<(), StoreError> {
    if keys.len() != records.len() {
        return Err(StoreError::KeyMismatch {
            keys: keys.len(),
            records: records.len(),
        });
    }
    Ok(())
}

/// Records kept in a single JSON object on disk: `{ key: {x, y, z, type} }`
/// for tiles, `{ key: {x, y, z, kind} }` for structures.
pub struct JsonTileStore {
    path: PathBuf,
}

impl JsonTileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load_records(&self) -> Result<BTreeMap<String, StoredRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        serde_json::from_reader(reader).map_err(|e| StoreError::Deserialization(e.to_string()))
    }

    fn write_records(&self, records: &BTreeMap<String, StoredRecord>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(&self.path)?;
        let writer = BufWriter::new(file);

        serde_json::to_writer(writer, records).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Remove the backing file (if it exists).
    pub fn clear(&self) -> std::io::Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

impl TileStore for JsonTileStore {
    fn get_all(&self) -> Result<Vec<Tile>, StoreError> {
        Ok(self.load_records()?.values().filter_map(StoredRecord::tile).collect())
    }

    fn save_all(&mut self, keys: &[String], tiles: &[Tile]) -> Result<(), StoreError> {
        check_lengths(keys, tiles)?;
        let mut records = self.load_records()?;
        for (key, tile) in keys.iter().zip(tiles) {
            records.insert(key.clone(), StoredRecord::Tile(*tile));
        }
        self.write_records(&records)
    }

    fn get_structures(&self) -> Result<Vec<Structure>, StoreError> {
        Ok(self
            .load_records()?
            .values()
            .filter_map(StoredRecord::structure)
            .collect())
    }

    fn save_structures(&mut self, keys: &[String], structures: &[Structure]) -> Result<(), StoreError> {
        check_lengths(keys, structures)?;
        if structures.is_empty() {
            return Ok(());
        }
        let mut records = self.load_records()?;
        for (key, structure) in keys.iter().zip(structures) {
            records.insert(key.clone(), StoredRecord::Structure(*structure));
        }
        self.write_records(&records)
    }
}

/// Store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryTileStore {
    records: BTreeMap<String, StoredRecord>,
}

impl MemoryTileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TileStore for MemoryTileStore {
    fn get_all(&self) -> Result<Vec<Tile>, StoreError> {
        Ok(self.records.values().filter_map(StoredRecord::tile).collect())
    }

    fn save_all(&mut self, keys: &[String], tiles: &[Tile]) -> Result<(), StoreError> {
        check_lengths(keys, tiles)?;
        for (key, tile) in keys.iter().zip(tiles) {
            self.records.insert(key.clone(), StoredRecord::Tile(*tile));
        }
        Ok(())
    }

    fn get_structures(&self) -> Result<Vec<Structure>, StoreError> {
        Ok(self.records.values().filter_map(StoredRecord::structure).collect())
    }

    fn save_structures(&mut self, keys: &[String], structures: &[Structure]) -> Result<(), StoreError> {
        check_lengths(keys, structures)?;
        for (key, structure) in keys.iter().zip(structures) {
            self.records.insert(key.clone(), StoredRecord::Structure(*structure));
        }
        Ok(())
    }
}

/// Errors that can occur during tile storage operations.
#[derive(Debug)]
pub enum StoreError {
    /// IO error (file not found, permissions, etc.)
    Io(std::io::Error),
    /// Serialization error
    Serialization(String),
    /// Deserialization error (corrupted or foreign file)
    Deserialization(String),
    /// A save called with differently sized key and record lists
    KeyMismatch { keys: usize, records: usize },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "IO error: {}", e),
            StoreError::Serialization(e) => write!(f, "Serialization error: {}", e),
            StoreError::Deserialization(e) => write!(f, "Deserialization error: {}", e),
            StoreError::KeyMismatch { keys, records } => {
                write!(f, "Got {} keys for {} records", keys, records)
            }
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{HouseVariant, StructureKind};
    use crate::tile::TileType;
    use tempfile::tempdir;

    fn sample_tiles() -> Vec<Tile> {
        vec![
            Tile::new(0.0, 5.0, 0.0, TileType::Grass),
            Tile::new(0.0, 4.0, 0.0, TileType::Dirt),
            Tile::new(20.5, 3.5, 0.5, TileType::Water),
        ]
    }

    fn keys_of(tiles: &[Tile]) -> Vec<String> {
        tiles.iter().map(Tile::key).collect()
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let mut store = JsonTileStore::new(dir.path().join("world").join("tiles.json"));
        let tiles = sample_tiles();

        store.save_all(&keys_of(&tiles), &tiles).unwrap();
        assert!(store.exists());

        let mut loaded = store.get_all().unwrap();
        loaded.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0], tiles[1]);
        assert_eq!(loaded[2].tile_type, TileType::Water);
    }

    #[test]
    fn test_records_use_position_keys() {
        let dir = tempdir().unwrap();
        let mut store = JsonTileStore::new(dir.path().join("tiles.json"));
        let tiles = sample_tiles();
        store.save_all(&keys_of(&tiles), &tiles).unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\"x0y50z0\""));
        assert!(text.contains("\"type\":\"WATER\""));
    }

    #[test]
    fn test_saving_twice_replaces_records() {
        let dir = tempdir().unwrap();
        let mut store = JsonTileStore::new(dir.path().join("tiles.json"));
        let tiles = sample_tiles();
        store.save_all(&keys_of(&tiles), &tiles).unwrap();
        store.save_all(&keys_of(&tiles[..1]), &tiles[..1]).unwrap();

        assert_eq!(store.get_all().unwrap().len(), 3);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = JsonTileStore::new(dir.path().join("absent.json"));
        assert!(store.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tiles.json");
        std::fs::write(&path, "not json").unwrap();

        let store = JsonTileStore::new(&path);
        assert!(matches!(store.get_all(), Err(StoreError::Deserialization(_))));
    }

    #[test]
    fn test_key_count_must_match() {
        let mut store = MemoryTileStore::new();
        let tiles = sample_tiles();
        let result = store.save_all(&keys_of(&tiles[..2]), &tiles);
        assert!(matches!(result, Err(StoreError::KeyMismatch { keys: 2, records: 3 })));
        assert!(store.is_empty());
    }

    #[test]
    fn test_tiles_within_bounds() {
        let tiles = sample_tiles();
        let inside = tiles_within(&tiles, &RegionBounds::new(-1.0, -1.0, 10.0, 10.0));
        assert_eq!(inside.len(), 2);
    }

    #[test]
    fn test_structures_share_the_file_with_tiles() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tiles.json");
        let tiles = sample_tiles();
        let house = Structure::on(&tiles[0], StructureKind::House(HouseVariant::Variant1));

        let mut store = JsonTileStore::new(&path);
        store.save_all(&keys_of(&tiles), &tiles).unwrap();
        store.save_structures(&[house.key()], &[house]).unwrap();

        let reopened = JsonTileStore::new(&path);
        assert_eq!(reopened.get_all().unwrap().len(), 3);
        assert_eq!(reopened.get_structures().unwrap(), vec![house]);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"structure_x0y60z0\""));
        assert!(text.contains("\"HOUSE\""));
    }

    #[test]
    fn test_tile_only_file_has_no_structures() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tiles.json");
        std::fs::write(&path, r#"{"x0y50z0":{"x":0.0,"y":5.0,"z":0.0,"type":"GRASS"}}"#).unwrap();

        let store = JsonTileStore::new(&path);
        assert_eq!(store.get_all().unwrap(), vec![Tile::new(0.0, 5.0, 0.0, TileType::Grass)]);
        assert!(store.get_structures().unwrap().is_empty());
    }

    #[test]
    fn test_structures_within_bounds() {
        let house = StructureKind::House(HouseVariant::Variant1);
        let structures: Vec<Structure> = sample_tiles().iter().map(|t| Structure::on(t, house)).collect();

        let mut store = MemoryTileStore::new();
        let keys: Vec<String> = structures.iter().map(Structure::key).collect();
        store.save_structures(&keys, &structures).unwrap();

        let stored = store.get_structures().unwrap();
        let inside = structures_within(&stored, &RegionBounds::new(10.0, 0.0, 30.0, 1.0));
        assert_eq!(inside.len(), 1);
        assert_eq!(inside[0].x, 20.5);
    }
}
