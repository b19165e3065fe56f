//! World and terrain configuration.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Where the initial (pre-smoothing) tile heights come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeightSource {
    #[default]
    /// Independent random integer in `[0, world_height]` per tile.
    Uniform,
    /// Perlin noise sampled at world coordinates, so adjacent regions agree
    /// at their seam before smoothing.
    Perlin { frequency: f64 },
    /// Every tile starts at the same height.
    Flat { height: f32 },
}

/// Parameters for the generation pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    /// Number of height levels (default: 64). Higher = more hilly terrain.
    pub world_height: u32,

    /// Smoothing iterations (default: 10). Higher = flatter terrain.
    pub smooth_depth: usize,

    /// Initial height distribution.
    pub height_source: HeightSource,

    /// Probability that a grass tile spawns a structure (default: 0.0, off).
    pub structure_chance: f64,

    /// Cluster filter passes applied to spawned structures.
    pub structure_cluster_passes: usize,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            world_height: 64,
            smooth_depth: 10,
            height_source: HeightSource::Uniform,
            structure_chance: 0.0,
            structure_cluster_passes: 5,
        }
    }
}

impl TerrainParams {
    /// Highest submerged height: `round(world_height / 2) - 1`.
    pub fn water_level(&self) -> f32 {
        (self.world_height as f32 / 2.0).round() - 1.0
    }

    /// Height given to deep water tiles.
    pub fn deep_water_height(&self) -> f32 {
        self.water_level() + 0.3
    }

    /// Height given to shallow water tiles.
    pub fn shallow_water_height(&self) -> f32 {
        self.water_level() + 0.5
    }

    /// Upper bound on dirt fill passes.
    pub fn dirt_depth(&self) -> usize {
        self.world_height as usize
    }
}

/// Screen size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewportConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// Top-level configuration for a [`crate::world::World`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Master seed (random if not set).
    pub seed: Option<u64>,

    /// Largest x of the initial world, also bounds camera panning.
    pub max_x: f32,

    /// Largest z of the initial world, also bounds camera panning.
    pub max_z: f32,

    /// Grid units added past an edge when the world grows.
    pub region_extension: f32,

    pub viewport: ViewportConfig,

    pub terrain: TerrainParams,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_x: 64.0,
            max_z: 64.0,
            region_extension: 16.0,
            viewport: ViewportConfig::default(),
            terrain: TerrainParams::default(),
        }
    }
}

impl WorldConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: WorldConfig = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.terrain.world_height == 0 {
            return Err(ConfigError::Invalid("world_height must be positive".into()));
        }
        if !(self.viewport.width > 0.0 && self.viewport.height > 0.0) {
            return Err(ConfigError::Invalid("viewport must have a positive size".into()));
        }
        if !(self.region_extension >= 0.5) {
            return Err(ConfigError::Invalid("region_extension must be at least 0.5".into()));
        }
        if !self.max_x.is_finite() || !self.max_z.is_finite() {
            return Err(ConfigError::Invalid("world bounds must be finite".into()));
        }
        Ok(())
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}
