//! Core data structures for the terraweave terrain engine.
//!
//! This crate holds the engine-independent types: tile identity, colors,
//! grid coordinates, and the [`TerrainGrid`] storage boundary. The matching
//! engine itself lives in the `terraweave` crate.

pub mod grid;
pub mod tile;

pub use grid::{CellCoord, CellRect, MapGrid, TerrainGrid};
pub use tile::{Color, TileId};
