use std::time::Duration;

use clap::Parser;
use tokio::runtime::Runtime;

use iso_terrain::ascii::{self, AsciiMode};
use iso_terrain::config::{HeightSource, WorldConfig};
use iso_terrain::export;
use iso_terrain::store::JsonTileStore;
use iso_terrain::surface::SurfaceMap;
use iso_terrain::tile::TileType;
use iso_terrain::worker::GeneratorHandle;
use iso_terrain::world::World;

#[derive(Parser, Debug)]
#[command(name = "iso_terrain")]
#[command(about = "Generate isometric tile terrain and grow it as the camera scrolls")]
struct Args {
    /// Random seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// JSON configuration file; command line values override it
    #[arg(short, long)]
    config: Option<String>,

    /// Viewport width in pixels
    #[arg(short = 'W', long)]
    width: Option<f32>,

    /// Viewport height in pixels
    #[arg(short = 'H', long)]
    height: Option<f32>,

    /// Largest x of the initial world
    #[arg(long)]
    max_x: Option<f32>,

    /// Largest z of the initial world
    #[arg(long)]
    max_z: Option<f32>,

    /// Number of height levels
    #[arg(long)]
    world_height: Option<u32>,

    /// Smoothing iterations
    #[arg(long)]
    smooth_depth: Option<usize>,

    /// Use Perlin noise with this frequency for initial heights
    #[arg(long)]
    perlin: Option<f64>,

    /// Chance that a grass tile spawns a house (0 disables structures)
    #[arg(long)]
    structures: Option<f64>,

    /// Persist generated tiles to this JSON file and reuse them on later runs
    #[arg(long)]
    store: Option<String>,

    /// Generate new regions on a background worker instead of inline
    #[arg(long)]
    background: bool,

    /// Number of camera steps to simulate
    #[arg(long, default_value = "0")]
    scroll: usize,

    /// Camera step in screen pixels along x (z moves half as far)
    #[arg(long, default_value = "40")]
    scroll_step: f32,

    /// Screen x to pick a tile at
    #[arg(long)]
    pick_x: Option<f32>,

    /// Screen y to pick a tile at
    #[arg(long)]
    pick_y: Option<f32>,

    /// Export the current view as an isometric PNG
    #[arg(long)]
    export_png: Option<String>,

    /// Export a top-down map PNG
    #[arg(long)]
    export_map: Option<String>,

    /// Export an ASCII world file
    #[arg(long)]
    export_ascii: Option<String>,

    /// Print the ASCII height view to stdout
    #[arg(long)]
    print: bool,
}

fn build_config(args: &Args) -> WorldConfig {
    let mut config = match &args.config {
        Some(path) => match WorldConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => WorldConfig::default(),
    };

    if let Some(width) = args.width {
        config.viewport.width = width;
    }
    if let Some(height) = args.height {
        config.viewport.height = height;
    }
    if let Some(max_x) = args.max_x {
        config.max_x = max_x;
    }
    if let Some(max_z) = args.max_z {
        config.max_z = max_z;
    }
    if let Some(world_height) = args.world_height {
        config.terrain.world_height = world_height;
    }
    if let Some(smooth_depth) = args.smooth_depth {
        config.terrain.smooth_depth = smooth_depth;
    }
    if let Some(frequency) = args.perlin {
        config.terrain.height_source = HeightSource::Perlin { frequency };
    }
    if let Some(chance) = args.structures {
        config.terrain.structure_chance = chance;
    }
    config.seed = args.seed.or(config.seed).or_else(|| Some(rand::random()));

    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
    config
}

/// Pump the world until no region is in flight.
fn settle(world: &mut World, runtime: Option<&Runtime>) -> usize {
    let mut added = world.pump();
    while world.is_generating() {
        if let Some(runtime) = runtime {
            runtime.block_on(tokio::time::sleep(Duration::from_millis(5)));
        }
        added += world.pump();
    }
    added
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    let config = build_config(&args);

    println!("Generating terrain with seed: {}", config.seed.unwrap_or_default());
    println!("World size: {}x{} (height {})", config.max_x, config.max_z, config.terrain.world_height);
    println!("Viewport: {}x{}", config.viewport.width, config.viewport.height);

    let runtime = if args.background {
        match Runtime::new() {
            Ok(runtime) => Some(runtime),
            Err(e) => {
                eprintln!("Failed to start worker runtime: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    let mut world = World::new(config.clone());
    if let Some(runtime) = &runtime {
        let handle = GeneratorHandle::spawn(runtime.handle(), config.terrain.clone(), world.seeds());
        world = world.with_backend(Box::new(handle));
        println!("Regions past the initial world generate in the background");
    }
    if let Some(path) = &args.store {
        println!("Using tile store: {}", path);
        world = world.with_store(Box::new(JsonTileStore::new(path)));
    }

    println!("Generating initial region...");
    let count = world.generate_initial();
    println!("Initial region: {} tiles in {} columns", count, world.index().column_count());
    if let Some((lo, hi)) = world.height_range() {
        println!("Height range: {} to {}", lo, hi);
    }

    if args.scroll > 0 {
        println!("Scrolling {} steps...", args.scroll);
        for step in 0..args.scroll {
            if !world.move_camera_by(args.scroll_step, args.scroll_step / 2.0) {
                println!("  step {}: camera at limit", step + 1);
                continue;
            }
            let added = settle(&mut world, runtime.as_ref());
            let (x, z) = world.camera().position();
            println!(
                "  step {}: camera ({:.0}, {:.0}), +{} tiles, {} total",
                step + 1,
                x,
                z,
                added,
                world.index().len()
            );
        }
    }

    if let (Some(x), Some(y)) = (args.pick_x, args.pick_y) {
        match world.highlighted_tile(x, y) {
            Some(tile) => println!(
                "Tile at ({}, {}): {} at x={} y={} z={}",
                x, y, tile.tile_type.display_name(), tile.x, tile.y, tile.z
            ),
            None => println!("No tile at ({}, {})", x, y),
        }
    }

    let map = SurfaceMap::from_index(world.index());
    let counts = map.counts();
    let total: usize = counts.values().sum();
    println!("Surface composition:");
    for tile_type in TileType::all() {
        let count = counts.get(tile_type).copied().unwrap_or(0);
        if count > 0 {
            println!(
                "  {:<12} {:>6} ({:.1}%)",
                tile_type.display_name(),
                count,
                100.0 * count as f64 / total.max(1) as f64
            );
        }
    }

    let world_height = config.terrain.world_height as f32;
    let seed = config.seed.unwrap_or_default();

    if args.print {
        ascii::print_ascii_map(&map, AsciiMode::Height, world_height);
    }

    if let Some(path) = &args.export_png {
        println!("Exporting isometric view to {}...", path);
        if let Err(e) = export::export_isometric(&world, path) {
            eprintln!("Failed to export {}: {}", path, e);
        }
    }

    if let Some(path) = &args.export_map {
        println!("Exporting map to {}...", path);
        if let Err(e) = export::export_surface_map(&map, world_height, path) {
            eprintln!("Failed to export {}: {}", path, e);
        }
    }

    if let Some(path) = &args.export_ascii {
        println!("Exporting ASCII world file to {}...", path);
        if let Err(e) = ascii::export_world_file(&map, seed, world_height, path) {
            eprintln!("Failed to export {}: {}", path, e);
        }
    }

    println!("Done!");
}
