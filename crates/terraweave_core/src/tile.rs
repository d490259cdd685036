//! Tile identity and display color types.

use serde::{Deserialize, Serialize};

/// Opaque identity of a tile in the host atlas.
///
/// The engine never interprets pixel data; a tile is just a key made of the
/// atlas source, the tile within that source, and the alternate variant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TileId {
    pub source: u32,
    pub tile: u32,
    pub alternate: u32,
}

impl TileId {
    pub const fn new(source: u32, tile: u32, alternate: u32) -> Self {
        Self {
            source,
            tile,
            alternate,
        }
    }

    /// Shorthand for the base alternate of a tile.
    pub const fn base(source: u32, tile: u32) -> Self {
        Self::new(source, tile, 0)
    }
}

/// RGBA display color for terrain visualization (no engine dependency).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    /// Convert from 8-bit channels, as produced by most editor color pickers.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const GREEN: Self = Self::rgb(0.0, 1.0, 0.0);
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}
