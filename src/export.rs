use image::{ImageBuffer, Rgb, RgbImage};

use crate::geometry::{Diamond, ScreenPoint};
use crate::objects::{HouseVariant, VehicleKind};
use crate::render::{build_draw_list, ImageResolver, SpriteKind};
use crate::surface::SurfaceMap;
use crate::tile::TileType;
use crate::world::World;

const BACKGROUND: [u8; 3] = [18, 20, 28];
const HIGHLIGHT: [u8; 3] = [255, 255, 255];

/// Flat colour per sprite; stands in for a texture atlas when writing PNGs.
pub struct PaletteResolver {
    colors: Vec<(SpriteKind, [u8; 3])>,
}

impl Default for PaletteResolver {
    fn default() -> Self {
        let mut colors: Vec<(SpriteKind, [u8; 3])> = TileType::all()
            .iter()
            .map(|t| (SpriteKind::Tile(*t), tile_color(*t)))
            .collect();
        colors.push((SpriteKind::House(HouseVariant::Variant1), [168, 72, 52]));
        colors.push((SpriteKind::Vehicle(VehicleKind::Boat), [120, 84, 48]));
        Self { colors }
    }
}

impl ImageResolver for PaletteResolver {
    type Image = [u8; 3];

    fn has_cached_image(&self, sprite: SpriteKind) -> bool {
        self.colors.iter().any(|(s, _)| *s == sprite)
    }

    fn cached_image(&self, sprite: SpriteKind) -> Option<&[u8; 3]> {
        self.colors.iter().find(|(s, _)| *s == sprite).map(|(_, c)| c)
    }
}

pub fn tile_color(tile_type: TileType) -> [u8; 3] {
    match tile_type {
        TileType::Grass => [86, 152, 64],
        TileType::Dirt => [122, 86, 56],
        TileType::Water => [64, 128, 200],
        TileType::DeepWater => [30, 64, 140],
        TileType::Sand => [222, 204, 140],
    }
}

fn lerp_color(a: [u8; 3], b: [u8; 3], t: f32) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    [
        (a[0] as f32 + (b[0] as f32 - a[0] as f32) * t) as u8,
        (a[1] as f32 + (b[1] as f32 - a[1] as f32) * t) as u8,
        (a[2] as f32 + (b[2] as f32 - a[2] as f32) * t) as u8,
    ]
}

fn shade(color: [u8; 3], factor: f32) -> [u8; 3] {
    [
        (color[0] as f32 * factor).min(255.0) as u8,
        (color[1] as f32 * factor).min(255.0) as u8,
        (color[2] as f32 * factor).min(255.0) as u8,
    ]
}

/// Brighten high surfaces and darken low ones.
fn height_tint(color: [u8; 3], height: f32, world_height: f32) -> [u8; 3] {
    if world_height <= 0.0 {
        return color;
    }
    let t = (height / world_height).clamp(0.0, 1.0);
    lerp_color(shade(color, 0.7), shade(color, 1.2), t)
}

/// Render the current view of `world` the way a frame would be drawn.
///
/// Each object is a diamond top face with two side faces below it, painted
/// back to front. The selected tile gets a white outline.
pub fn render_isometric(world: &World) -> RgbImage {
    let projection = world.projection();
    let viewport = projection.viewport();
    let width = viewport.width.max(1.0) as u32;
    let height = viewport.height.max(1.0) as u32;
    let world_height = world.config().terrain.world_height as f32;
    let depth = projection.face_depth();

    let mut img: RgbImage = ImageBuffer::from_pixel(width, height, Rgb(BACKGROUND));
    let resolver = PaletteResolver::default();

    for command in build_draw_list(world, &resolver) {
        let (x, y, z) = command.position;
        let Some(diamond) = projection.diamond(x, y, z) else {
            continue;
        };
        let top = height_tint(*command.image, y, world_height);
        let left = shade(top, 0.75);
        let right = shade(top, 0.55);
        let middle_x = diamond.up.x;

        let x1 = command.rect.x1.floor().max(0.0) as u32;
        let y1 = command.rect.y1.floor().max(0.0) as u32;
        let x2 = (command.rect.x2.ceil().max(0.0) as u32).min(width);
        let y2 = (command.rect.y2.ceil().max(0.0) as u32).min(height);

        for py in y1..y2 {
            for px in x1..x2 {
                let point = ScreenPoint::new(px as f32 + 0.5, py as f32 + 0.5);
                if !diamond.swept_contains(point, depth) {
                    continue;
                }
                let color = if diamond.contains(point) {
                    top
                } else if point.x < middle_x {
                    left
                } else {
                    right
                };
                img.put_pixel(px, py, Rgb(color));
            }
        }

        if let Some(highlight) = command.highlight {
            outline_diamond(&mut img, &highlight);
        }
    }

    img
}

fn outline_diamond(img: &mut RgbImage, diamond: &Diamond) {
    let edges = [
        (diamond.left, diamond.up),
        (diamond.up, diamond.right),
        (diamond.right, diamond.down),
        (diamond.down, diamond.left),
    ];
    for (a, b) in edges {
        let steps = ((b.x - a.x).abs().max((b.y - a.y).abs()).ceil() as u32).max(1);
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let x = a.x + (b.x - a.x) * t;
            let y = a.y + (b.y - a.y) * t;
            if x >= 0.0 && y >= 0.0 && (x as u32) < img.width() && (y as u32) < img.height() {
                img.put_pixel(x as u32, y as u32, Rgb(HIGHLIGHT));
            }
        }
    }
}

/// Export the current view as a PNG.
pub fn export_isometric(world: &World, path: &str) -> Result<(), image::ImageError> {
    render_isometric(world).save(path)
}

/// Top-down map, one pixel per half-step, tinted by surface height.
pub fn render_surface_map(map: &SurfaceMap, world_height: f32) -> RgbImage {
    let mut img: RgbImage = ImageBuffer::from_pixel(map.width.max(1) as u32, map.height.max(1) as u32, Rgb(BACKGROUND));

    for row in 0..map.height {
        for col in 0..map.width {
            if let Some(tile) = map.get_filled(col, row) {
                let color = height_tint(tile_color(tile.tile_type), tile.y, world_height);
                img.put_pixel(col as u32, row as u32, Rgb(color));
            }
        }
    }

    img
}

/// Export the top-down map as a PNG.
pub fn export_surface_map(map: &SurfaceMap, world_height: f32, path: &str) -> Result<(), image::ImageError> {
    render_surface_map(map, world_height).save(path)
}
