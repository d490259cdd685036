//! Grid coordinates and the injected grid-storage boundary.
//!
//! The engine never owns tile storage. Callers hand it anything implementing
//! [`TerrainGrid`]; [`MapGrid`] is a hash-map-backed reference implementation
//! for tests and simple hosts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::tile::TileId;

/// A signed cell coordinate. Positive y points down, matching the usual
/// screen-space tilemap convention.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
}

impl CellCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// The 8 surrounding coordinates, clockwise from the cell above.
    pub fn neighbors(self) -> [CellCoord; 8] {
        [
            self.offset(0, -1),  // top
            self.offset(1, -1),  // top-right
            self.offset(1, 0),   // right
            self.offset(1, 1),   // bottom-right
            self.offset(0, 1),   // bottom
            self.offset(-1, 1),  // bottom-left
            self.offset(-1, 0),  // left
            self.offset(-1, -1), // top-left
        ]
    }
}

/// An axis-aligned rectangle of cells, used by area updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl CellRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, coord: CellCoord) -> bool {
        coord.x >= self.x
            && coord.y >= self.y
            && coord.x < self.x + self.width as i32
            && coord.y < self.y + self.height as i32
    }

    /// Iterate every cell in the rectangle, row by row.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> {
        let rect = *self;
        (0..(rect.width as i64 * rect.height as i64)).map(move |i| rect.cell_at(i))
    }

    /// The i-th cell in row-major order. The index stays in i64 so rects
    /// with more than `i32::MAX` cells resolve rows correctly.
    fn cell_at(&self, i: i64) -> CellCoord {
        let width = self.width as i64;
        CellCoord::new(self.x + (i % width) as i32, self.y + (i / width) as i32)
    }
}

/// Storage boundary the engine reads and writes cells through.
///
/// Terrain assignment is the ground truth; the rendered tile and any
/// decoration are derived values the engine writes back after matching.
pub trait TerrainGrid {
    /// The terrain index assigned to a cell, if any.
    fn cell_terrain(&self, layer: u32, coord: CellCoord) -> Option<usize>;

    /// Assign or clear the terrain index of a cell.
    fn set_cell_terrain(&mut self, layer: u32, coord: CellCoord, terrain: Option<usize>);

    /// The tile currently rendered at a cell, if any.
    fn cell_tile(&self, layer: u32, coord: CellCoord) -> Option<TileId>;

    /// Write or clear the rendered tile of a cell.
    fn set_cell_tile(&mut self, layer: u32, coord: CellCoord, tile: Option<TileId>);

    /// The decoration tile attached to a cell, if any.
    fn cell_decoration(&self, layer: u32, coord: CellCoord) -> Option<TileId>;

    /// Write or clear the decoration tile of a cell.
    fn set_cell_decoration(&mut self, layer: u32, coord: CellCoord, tile: Option<TileId>);

    /// Every cell with an assigned terrain, as `(layer, coord, terrain)`.
    ///
    /// Used by catalog restructuring (remove/swap) to rewrite references.
    fn assigned_cells(&self) -> Vec<(u32, CellCoord, usize)>;
}

/// Per-cell storage record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct CellState {
    terrain: Option<usize>,
    tile: Option<TileId>,
    decoration: Option<TileId>,
}

impl CellState {
    fn is_empty(&self) -> bool {
        self.terrain.is_none() && self.tile.is_none() && self.decoration.is_none()
    }
}

/// Hash-map-backed grid with unbounded signed coordinates and any number
/// of layers. Empty cells are not stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapGrid {
    layers: HashMap<u32, HashMap<CellCoord, CellState>>,
}

impl MapGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-empty cells across all layers.
    pub fn cell_count(&self) -> usize {
        self.layers.values().map(|cells| cells.len()).sum()
    }

    fn cell(&self, layer: u32, coord: CellCoord) -> Option<&CellState> {
        self.layers.get(&layer)?.get(&coord)
    }

    fn update_cell(&mut self, layer: u32, coord: CellCoord, f: impl FnOnce(&mut CellState)) {
        let cells = self.layers.entry(layer).or_default();
        let state = cells.entry(coord).or_default();
        f(state);
        if state.is_empty() {
            cells.remove(&coord);
        }
    }
}

impl TerrainGrid for MapGrid {
    fn cell_terrain(&self, layer: u32, coord: CellCoord) -> Option<usize> {
        self.cell(layer, coord)?.terrain
    }

    fn set_cell_terrain(&mut self, layer: u32, coord: CellCoord, terrain: Option<usize>) {
        self.update_cell(layer, coord, |state| state.terrain = terrain);
    }

    fn cell_tile(&self, layer: u32, coord: CellCoord) -> Option<TileId> {
        self.cell(layer, coord)?.tile
    }

    fn set_cell_tile(&mut self, layer: u32, coord: CellCoord, tile: Option<TileId>) {
        self.update_cell(layer, coord, |state| state.tile = tile);
    }

    fn cell_decoration(&self, layer: u32, coord: CellCoord) -> Option<TileId> {
        self.cell(layer, coord)?.decoration
    }

    fn set_cell_decoration(&mut self, layer: u32, coord: CellCoord, tile: Option<TileId>) {
        self.update_cell(layer, coord, |state| state.decoration = tile);
    }

    fn assigned_cells(&self) -> Vec<(u32, CellCoord, usize)> {
        let mut cells: Vec<_> = self
            .layers
            .iter()
            .flat_map(|(&layer, cells)| {
                cells
                    .iter()
                    .filter_map(move |(&coord, state)| Some((layer, coord, state.terrain?)))
            })
            .collect();
        // Stable order for callers that iterate while mutating a copy
        cells.sort_unstable_by_key(|&(layer, coord, _)| (layer, coord));
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbors_clockwise_from_top() {
        let n = CellCoord::new(0, 0).neighbors();
        assert_eq!(n[0], CellCoord::new(0, -1));
        assert_eq!(n[2], CellCoord::new(1, 0));
        assert_eq!(n[4], CellCoord::new(0, 1));
        assert_eq!(n[7], CellCoord::new(-1, -1));
    }

    #[test]
    fn test_rect_cells_row_major() {
        let rect = CellRect::new(-1, -1, 3, 2);
        let cells: Vec<_> = rect.cells().collect();
        assert_eq!(cells.len(), 6);
        assert_eq!(cells[0], CellCoord::new(-1, -1));
        assert_eq!(cells[2], CellCoord::new(1, -1));
        assert_eq!(cells[3], CellCoord::new(-1, 0));
        assert!(cells.iter().all(|&c| rect.contains(c)));
        assert!(!rect.contains(CellCoord::new(2, 0)));
    }

    #[test]
    fn test_rect_rows_past_i32_cells() {
        // 60k x 60k holds 3.6e9 cells, past what a 32-bit cell index reaches
        let rect = CellRect::new(-5, -5, 60_000, 60_000);
        // 3e9 = 50_000 rows of 60_000 exactly
        assert_eq!(rect.cell_at(3_000_000_000), CellCoord::new(-5, 49_995));
        assert_eq!(rect.cell_at(3_000_000_001), CellCoord::new(-4, 49_995));
        assert_eq!(rect.cell_at(0), CellCoord::new(-5, -5));
        assert_eq!(rect.cell_at(59_999), CellCoord::new(59_994, -5));
        assert_eq!(rect.cell_at(60_000), CellCoord::new(-5, -4));
    }

    #[test]
    fn test_map_grid_stores_and_clears() {
        let mut grid = MapGrid::new();
        let coord = CellCoord::new(3, -2);

        grid.set_cell_terrain(0, coord, Some(1));
        grid.set_cell_tile(0, coord, Some(TileId::base(0, 5)));
        assert_eq!(grid.cell_terrain(0, coord), Some(1));
        assert_eq!(grid.cell_tile(0, coord), Some(TileId::base(0, 5)));
        assert_eq!(grid.cell_count(), 1);

        grid.set_cell_terrain(0, coord, None);
        grid.set_cell_tile(0, coord, None);
        assert_eq!(grid.cell_count(), 0);
    }

    #[test]
    fn test_assigned_cells_skips_terrainless() {
        let mut grid = MapGrid::new();
        grid.set_cell_terrain(0, CellCoord::new(0, 0), Some(2));
        grid.set_cell_tile(1, CellCoord::new(4, 4), Some(TileId::base(0, 1)));

        let cells = grid.assigned_cells();
        assert_eq!(cells, vec![(0, CellCoord::new(0, 0), 2)]);
    }
}
