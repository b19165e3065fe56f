//! Profiling tool to identify slow generation passes

use std::time::{Duration, Instant};

use iso_terrain::config::TerrainParams;
use iso_terrain::generator::{GenerationStage, RegionBounds, RegionRequest, TerrainJob};
use iso_terrain::seeds::TerrainSeeds;

#[derive(Default)]
struct PassTimes {
    smoothing: Duration,
    water: Duration,
    shoreline: Duration,
    dirt: Duration,
    structures: Duration,
}

impl PassTimes {
    fn record(&mut self, stage: GenerationStage, elapsed: Duration) {
        match stage {
            GenerationStage::Smoothing { .. } => self.smoothing += elapsed,
            GenerationStage::Water => self.water += elapsed,
            GenerationStage::Shoreline => self.shoreline += elapsed,
            GenerationStage::Dirt { .. } => self.dirt += elapsed,
            GenerationStage::Structures => self.structures += elapsed,
            GenerationStage::Finished => {}
        }
    }
}

fn percent(part: Duration, total: Duration) -> f64 {
    100.0 * part.as_secs_f64() / total.as_secs_f64().max(f64::EPSILON)
}

fn main() {
    let max_x = 128.0;
    let max_z = 128.0;
    let seed = 1337u64;
    let params = TerrainParams {
        structure_chance: 0.02,
        ..TerrainParams::default()
    };

    println!("=== Performance Profiling ===");
    println!("Region: {}x{} (height {})", max_x, max_z, params.world_height);
    println!("Smoothing iterations: {}", params.smooth_depth);
    println!("Dirt depth: {}", params.dirt_depth());
    println!();

    let bounds = RegionBounds::new(-1.0, 0.0, max_x + 1.0, max_z);
    let request = RegionRequest::new(bounds, Vec::new());
    let seeds = TerrainSeeds::from_master(seed);

    let start = Instant::now();
    let mut job = TerrainJob::new(&request, &params, &seeds);
    let setup_time = start.elapsed();
    println!("Lattice + initial heights: {:?} ({} tiles)", setup_time, job.grid().len());

    let mut times = PassTimes::default();
    while !job.is_finished() {
        let stage = job.stage();
        let start = Instant::now();
        job.step();
        let elapsed = start.elapsed();
        times.record(stage, elapsed);
        println!("  {:<16} {:?}", stage.to_string(), elapsed);
    }

    let stats = job.water_stats();
    println!("\nWater: {} deep, {} shallow, {} sand", stats.deep_water, stats.water, stats.sand);

    let start = Instant::now();
    let region = job.finish();
    let finish_time = start.elapsed();
    println!("Emitted {} tiles, {} structures", region.tiles.len(), region.structures.len());

    let total = setup_time
        + times.smoothing
        + times.water
        + times.shoreline
        + times.dirt
        + times.structures
        + finish_time;
    println!("\n=== Summary ===");
    println!("Setup:            {:>8.2}% ({:?})", percent(setup_time, total), setup_time);
    println!("Smoothing:        {:>8.2}% ({:?})", percent(times.smoothing, total), times.smoothing);
    println!("Water:            {:>8.2}% ({:?})", percent(times.water, total), times.water);
    println!("Shoreline:        {:>8.2}% ({:?})", percent(times.shoreline, total), times.shoreline);
    println!("Dirt:             {:>8.2}% ({:?})", percent(times.dirt, total), times.dirt);
    println!("Structures:       {:>8.2}% ({:?})", percent(times.structures, total), times.structures);
    println!("Finish:           {:>8.2}% ({:?})", percent(finish_time, total), finish_time);
    println!("─────────────────────────────────");
    println!("Total:            {:?}", total);
}
