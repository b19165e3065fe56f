//! Column index over terrain tiles
//!
//! Owns every tile and maps each [`ColumnKey`] to the tiles stacked in that
//! column. Lookups by column or by `(x, y, z)` are O(1) in the number of
//! columns. Tiles are never removed.

use std::collections::HashMap;

use crate::tile::{quantize, ColumnKey, Tile};

/// Handle to a tile stored in a [`SpatialHashIndex`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub usize);

/// Axis-aligned extent of all known tiles (in lattice coordinates)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extent {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl Extent {
    fn from_tile(tile: &Tile) -> Self {
        Self {
            min_x: tile.x,
            max_x: tile.x,
            min_z: tile.z,
            max_z: tile.z,
        }
    }

    fn include(&mut self, tile: &Tile) {
        self.min_x = self.min_x.min(tile.x);
        self.max_x = self.max_x.max(tile.x);
        self.min_z = self.min_z.min(tile.z);
        self.max_z = self.max_z.max(tile.z);
    }
}

#[derive(Clone, Debug, Default)]
pub struct SpatialHashIndex {
    tiles: Vec<Tile>,
    columns: HashMap<ColumnKey, Vec<TileId>>,
    extent: Option<Extent>,
}

impl SpatialHashIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tiles(tiles: impl IntoIterator<Item = Tile>) -> Self {
        let mut index = Self::new();
        index.extend(tiles);
        index
    }

    /// Insert a tile, returning its handle.
    ///
    /// A tile whose column already holds a tile at the same height is not
    /// inserted again; the existing handle is returned instead.
    pub fn insert(&mut self, tile: Tile) -> TileId {
        let key = tile.column_key();
        let height = tile.height_key();

        if let Some(existing) = self.find_in_column(key, height) {
            return existing;
        }

        let id = TileId(self.tiles.len());
        self.tiles.push(tile);
        self.columns.entry(key).or_default().push(id);

        match self.extent.as_mut() {
            Some(extent) => extent.include(&tile),
            None => self.extent = Some(Extent::from_tile(&tile)),
        }

        id
    }

    /// Insert many tiles, returning how many were new.
    pub fn extend(&mut self, tiles: impl IntoIterator<Item = Tile>) -> usize {
        let before = self.tiles.len();
        for tile in tiles {
            self.insert(tile);
        }
        self.tiles.len() - before
    }

    fn find_in_column(&self, key: ColumnKey, height: i32) -> Option<TileId> {
        self.columns
            .get(&key)?
            .iter()
            .copied()
            .find(|id| self.tiles[id.0].height_key() == height)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn get(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id.0)
    }

    /// Mutable access for generation passes. Callers must not move a tile
    /// onto a height already used in its column.
    pub(crate) fn get_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        self.tiles.get_mut(id.0)
    }

    /// Handles of the tiles in column `(x, z)`, in insertion order.
    pub fn column_ids(&self, x: f32, z: f32) -> &[TileId] {
        self.columns
            .get(&ColumnKey::new(x, z))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Tiles in column `(x, z)`, in insertion order. Empty if unknown.
    pub fn get_column(&self, x: f32, z: f32) -> Vec<&Tile> {
        self.column_ids(x, z).iter().map(|id| &self.tiles[id.0]).collect()
    }

    pub fn tile_id(&self, x: f32, y: f32, z: f32) -> Option<TileId> {
        self.find_in_column(ColumnKey::new(x, z), quantize(y))
    }

    /// The tile at exactly `(x, y, z)`, if any.
    pub fn get_tile(&self, x: f32, y: f32, z: f32) -> Option<&Tile> {
        self.tile_id(x, y, z).map(|id| &self.tiles[id.0])
    }

    /// Highest tile in column `(x, z)`.
    pub fn surface(&self, x: f32, z: f32) -> Option<TileId> {
        self.column_ids(x, z)
            .iter()
            .copied()
            .max_by(|a, b| self.tiles[a.0].y.total_cmp(&self.tiles[b.0].y))
    }

    pub fn surface_tile(&self, x: f32, z: f32) -> Option<&Tile> {
        self.surface(x, z).map(|id| &self.tiles[id.0])
    }

    pub fn iter(&self) -> impl Iterator<Item = (TileId, &Tile)> {
        self.tiles.iter().enumerate().map(|(i, t)| (TileId(i), t))
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn extent(&self) -> Option<Extent> {
        self.extent
    }

    /// Lowest and highest tile height.
    pub fn height_range(&self) -> Option<(f32, f32)> {
        let mut iter = self.tiles.iter();
        let first = iter.next()?;
        Some(iter.fold((first.y, first.y), |(lo, hi), t| (lo.min(t.y), hi.max(t.y))))
    }

    /// Every tile in the index sorted z-major, y-minor (back to front,
    /// bottom to top) for painter's-algorithm drawing.
    pub fn draw_order(&self) -> Vec<TileId> {
        let mut ids: Vec<TileId> = (0..self.tiles.len()).map(TileId).collect();
        ids.sort_by(|a, b| {
            let (ta, tb) = (&self.tiles[a.0], &self.tiles[b.0]);
            ta.z.total_cmp(&tb.z).then(ta.y.total_cmp(&tb.y))
        });
        ids
    }

    /// Tiles satisfying `predicate`, cloned out of the index.
    pub fn collect_where(&self, predicate: impl Fn(&Tile) -> bool) -> Vec<Tile> {
        self.tiles.iter().filter(|t| predicate(t)).copied().collect()
    }
}
