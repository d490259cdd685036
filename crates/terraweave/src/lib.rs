//! Tile-terrain matching engine
//!
//! This crate turns terrain paints into concrete tile selections. Terrains
//! live in a per-tileset [`TerrainCatalog`]; tiles carry peering rules in a
//! [`PeeringIndex`]; painting goes through [`TerrainEngine`], which resolves
//! each affected cell to the tile whose symmetry-expanded rules best fit its
//! neighborhood and writes the result back to an injected grid store.
//!
//! # Features
//! - Tile and vertex matching modes, categories, and decorations
//! - Symmetry expansion (mirror/flip/rotate) of peering rules
//! - Deterministic matching with registration-order tie-breaks
//! - Atomic changesets with background resolution
//!
//! # Example
//!
//! ```rust,ignore
//! use terraweave::{TerrainEngine, TerrainCatalog, TerrainKind, PeeringDirection};
//! use terraweave_core::{CellCoord, Color, MapGrid, TileId};
//!
//! let mut engine = TerrainEngine::new(TerrainCatalog::new("Ground"));
//! let grass = engine.add_terrain("Grass", Color::GREEN, TerrainKind::MatchTiles, &[])?;
//!
//! let tile = TileId::base(0, 0);
//! engine.set_tile_terrain(tile, Some(grass))?;
//! for direction in PeeringDirection::ALL {
//!     engine.add_tile_peering(tile, direction, grass)?;
//! }
//!
//! let mut grid = MapGrid::new();
//! engine.replace_cell(&mut grid, 0, CellCoord::new(0, 0), grass)?;
//! ```

pub mod catalog;
pub mod changeset;
pub mod engine;
pub mod error;
pub mod matching;
pub mod peering;
pub mod symmetry;

// Re-export main types at crate root
pub use catalog::{CategoryInfo, IndexRemap, Terrain, TerrainCatalog, TerrainKind};
pub use changeset::{Changeset, ChangesetState, ResolvedCell};
pub use engine::TerrainEngine;
pub use error::{Result, TerrainError};
pub use matching::{MatchEngine, Neighborhood};
pub use peering::{DirectionSet, PeeringDirection, PeeringIndex, TileRules};
pub use symmetry::{SymmetryType, Transform};

// Re-export terraweave_core
pub use terraweave_core;
