//! ASCII rendering and export of the generated terrain
//!
//! Renders the top-down [`SurfaceMap`] as text and writes it, with legend and
//! statistics, to a file.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Write};
use chrono::Local;

use crate::surface::SurfaceMap;
use crate::tile::TileType;

/// ASCII rendering modes
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AsciiMode {
    /// Show surface material characters
    Tiles,
    /// Show surface height gradient
    Height,
}

impl AsciiMode {
    pub fn name(&self) -> &'static str {
        match self {
            AsciiMode::Tiles => "Tiles",
            AsciiMode::Height => "Height",
        }
    }

    pub fn all() -> &'static [AsciiMode] {
        &[AsciiMode::Tiles, AsciiMode::Height]
    }
}

/// Get ASCII character for a surface material
pub fn tile_char(tile_type: TileType) -> char {
    match tile_type {
        TileType::DeepWater => '~',
        TileType::Water => '-',
        TileType::Sand => '.',
        TileType::Grass => '"',
        TileType::Dirt => ':',
    }
}

/// Get ASCII character for a surface height (10-level gradient)
pub fn height_char(height: f32, world_height: f32) -> char {
    const CHARS: &[char] = &['_', '.', ',', '-', '=', '+', '*', '#', '%', '^'];
    if world_height <= 0.0 {
        return CHARS[0];
    }
    let normalized = (height / world_height).clamp(0.0, 1.0);
    let idx = (normalized * (CHARS.len() - 1) as f32) as usize;
    CHARS[idx.min(CHARS.len() - 1)]
}

/// Render the map to an ASCII string, one line per row of half-steps in `z`.
pub fn render_ascii_map(map: &SurfaceMap, mode: AsciiMode, world_height: f32) -> String {
    let mut result = String::with_capacity((map.width + 1) * map.height);

    for row in 0..map.height {
        for col in 0..map.width {
            let ch = match map.get_filled(col, row) {
                None => ' ',
                Some(tile) => match mode {
                    AsciiMode::Tiles => tile_char(tile.tile_type),
                    AsciiMode::Height => height_char(tile.y, world_height),
                },
            };
            result.push(ch);
        }
        result.push('\n');
    }

    result
}

/// Generate legend for tile characters
pub fn tile_legend() -> String {
    let mut legend = String::new();
    legend.push_str("=== TILE LEGEND ===\n");
    for tile_type in TileType::all() {
        legend.push_str(&format!("  {} {}\n", tile_char(*tile_type), tile_type.display_name()));
    }
    legend
}

/// Generate height legend
pub fn height_legend() -> String {
    "=== HEIGHT LEGEND ===\n\
     Sea floor -> World top:\n\
     _ . , - = + * # % ^\n".to_string()
}

/// Surface tile counts
pub fn calculate_tile_stats(map: &SurfaceMap) -> HashMap<TileType, usize> {
    map.counts()
}

/// Export the terrain to an ASCII file
pub fn export_world_file(map: &SurfaceMap, seed: u64, world_height: f32, path: &str) -> io::Result<()> {
    let mut file = File::create(path)?;

    // Header
    writeln!(file, "=== ISO TERRAIN WORLD FILE ===")?;
    writeln!(file, "Seed: {}", seed)?;
    writeln!(file, "Size: {}x{} half-steps", map.width, map.height)?;
    writeln!(file, "World height: {}", world_height)?;
    writeln!(file, "Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(file)?;

    for mode in AsciiMode::all() {
        writeln!(file, "=== MAP ({} View) ===", mode.name())?;
        write!(file, "{}", render_ascii_map(map, *mode, world_height))?;
        writeln!(file)?;
    }

    // Legend
    write!(file, "{}", tile_legend())?;
    writeln!(file)?;
    write!(file, "{}", height_legend())?;
    writeln!(file)?;

    // Statistics
    let stats = calculate_tile_stats(map);
    let total: usize = stats.values().sum();
    writeln!(file, "=== STATISTICS ===")?;
    writeln!(file, "Columns: {}", total)?;
    if let Some((lo, hi)) = map.height_range() {
        writeln!(file, "Surface height: {} to {}", lo, hi)?;
    }
    for tile_type in TileType::all() {
        let count = stats.get(tile_type).copied().unwrap_or(0);
        if count == 0 {
            continue;
        }
        let pct = 100.0 * count as f32 / total.max(1) as f32;
        writeln!(file, "  {:<12} {:>6} ({:.1}%)", tile_type.display_name(), count, pct)?;
    }

    Ok(())
}

/// Print ASCII map to stdout
pub fn print_ascii_map(map: &SurfaceMap, mode: AsciiMode, world_height: f32) {
    print!("{}", render_ascii_map(map, mode, world_height));
}
