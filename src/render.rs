//! Draw list construction
//!
//! Turns the world into painter-ordered draw commands. Images are looked up
//! through an [`ImageResolver`]; anything without a cached image is skipped
//! for this frame.

use crate::geometry::{Diamond, ScreenRect};
use crate::objects::{HouseVariant, Placed, StructureKind, VehicleKind, WorldObject};
use crate::tile::{Tile, TileType};
use crate::world::World;

/// Which image an object is drawn with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpriteKind {
    Tile(TileType),
    House(HouseVariant),
    Vehicle(VehicleKind),
}

impl SpriteKind {
    pub fn of(object: &WorldObject) -> Self {
        match object {
            WorldObject::Terrain(tile) => SpriteKind::Tile(tile.tile_type),
            WorldObject::Structure(structure) => match structure.kind {
                StructureKind::House(variant) => SpriteKind::House(variant),
            },
            WorldObject::Vehicle(vehicle) => SpriteKind::Vehicle(vehicle.kind),
        }
    }
}

/// Image cache owned by the presentation layer.
pub trait ImageResolver {
    type Image;

    fn has_cached_image(&self, sprite: SpriteKind) -> bool;

    fn cached_image(&self, sprite: SpriteKind) -> Option<&Self::Image>;
}

pub struct DrawCommand<'a, I> {
    pub sprite: SpriteKind,
    pub image: &'a I,
    /// World `(x, y, z)` of the object.
    pub position: (f32, f32, f32),
    pub rect: ScreenRect,
    /// Diamond to overlay when this is the selected tile.
    pub highlight: Option<Diamond>,
}

/// Visible objects in drawing order: back to front (`z`), bottom to top (`y`).
pub fn build_draw_list<'a, R>(world: &World, resolver: &'a R) -> Vec<DrawCommand<'a, R::Image>>
where
    R: ImageResolver,
    R::Image: 'a,
{
    let projection = world.projection();
    let selected = world.selected_tile().copied();

    let mut objects: Vec<WorldObject> = world
        .index()
        .tiles()
        .iter()
        .map(|tile| WorldObject::Terrain(*tile))
        .chain(world.objects().iter().copied())
        .collect();
    objects.sort_by(|a, b| {
        let (_, ay, az) = a.position();
        let (_, by, bz) = b.position();
        az.total_cmp(&bz).then(ay.total_cmp(&by))
    });

    objects
        .iter()
        .filter_map(|object| {
            let sprite = SpriteKind::of(object);
            if !resolver.has_cached_image(sprite) {
                return None;
            }
            let image = resolver.cached_image(sprite)?;
            let rect = object.bounding_box(projection)?;

            let highlight = match (object.as_tile(), selected.as_ref()) {
                (Some(tile), Some(sel)) if tile.same_position(sel) => highlight_for(world, tile),
                _ => None,
            };

            Some(DrawCommand {
                sprite,
                image,
                position: object.position(),
                rect,
                highlight,
            })
        })
        .collect()
}

fn highlight_for(world: &World, tile: &Tile) -> Option<Diamond> {
    world.projection().diamond(tile.x, tile.y, tile.z)
}
