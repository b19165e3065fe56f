//! Isometric terrain library
//!
//! Procedural heightfield generation for a staggered isometric tile world,
//! incremental region loading as the camera scrolls, and exact
//! pointer-to-tile hit testing.

pub mod ascii;
pub mod config;
pub mod export;
pub mod generator;
pub mod geometry;
pub mod objects;
pub mod region_loader;
pub mod render;
pub mod seeds;
pub mod spatial_hash;
pub mod store;
pub mod surface;
pub mod tile;
pub mod worker;
pub mod world;
