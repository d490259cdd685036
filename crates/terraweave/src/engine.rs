//! The engine facade: catalog, rules, cells, and changesets in one place.
//!
//! [`TerrainEngine`] owns the catalog and peering index for one tileset and
//! operates on grid storage passed in by the caller. It never holds a grid
//! reference across calls; grids are external mutable structures with their
//! own synchronization discipline.

use std::collections::HashMap;

use terraweave_core::{CellCoord, CellRect, Color, TerrainGrid, TileId};

use crate::catalog::{CategoryInfo, Terrain, TerrainCatalog, TerrainKind};
use crate::changeset::{resolve_cells, Changeset, ChangesetState, Snapshot};
use crate::error::{Result, TerrainError};
use crate::peering::{DirectionSet, PeeringDirection, PeeringIndex};
use crate::symmetry::SymmetryType;

/// Terrain catalog, peering rules, and the operations that keep grid
/// storage consistent with them.
///
/// Structural catalog changes (remove/swap) rewrite every index reference:
/// category membership, peering rules, and cell assignments on the grid the
/// caller passes in. Nothing is ever left pointing at a stale index.
pub struct TerrainEngine {
    catalog: TerrainCatalog,
    index: PeeringIndex,
    /// Bumped on every catalog or rule mutation; changesets snapshot it
    /// and refuse to apply against a newer revision.
    revision: u64,
}

impl TerrainEngine {
    pub fn new(catalog: TerrainCatalog) -> Self {
        Self {
            catalog,
            index: PeeringIndex::new(),
            revision: 0,
        }
    }

    pub fn catalog(&self) -> &TerrainCatalog {
        &self.catalog
    }

    pub fn rules(&self) -> &PeeringIndex {
        &self.index
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ─── Terrain catalog ─────────────────────────────────────────────────

    pub fn add_terrain(
        &mut self,
        name: impl Into<String>,
        color: Color,
        kind: TerrainKind,
        categories: &[usize],
    ) -> Result<usize> {
        let index = self.catalog.add_terrain(name, color, kind, categories)?;
        self.revision += 1;
        Ok(index)
    }

    /// Remove a terrain, reindexing all higher indices down by one.
    ///
    /// The remap cascades everywhere: category membership, peering rules
    /// (tiles tagged with the removed terrain become untagged), and cell
    /// assignments on `grid` (cells assigned the removed terrain lose both
    /// assignment and rendered tile).
    pub fn remove_terrain(&mut self, grid: &mut impl TerrainGrid, index: usize) -> Result<Terrain> {
        let (removed, remap) = self.catalog.remove_terrain(index)?;
        self.index.remap_terrains(remap);
        for (layer, coord, terrain) in grid.assigned_cells() {
            match remap.apply(terrain) {
                Some(new) if new != terrain => grid.set_cell_terrain(layer, coord, Some(new)),
                Some(_) => {}
                None => {
                    grid.set_cell_terrain(layer, coord, None);
                    grid.set_cell_tile(layer, coord, None);
                    grid.set_cell_decoration(layer, coord, None);
                }
            }
        }
        self.revision += 1;
        Ok(removed)
    }

    /// Redefine a terrain in place.
    ///
    /// Changing the match mode cascades into the peering index so no rule
    /// outlives the mode that allowed it: tiles of a terrain turned into a
    /// category become untagged, a switch to vertex matching drops side
    /// peering, and a terrain turned into a decoration is removed from
    /// every tile's requirement sets.
    pub fn set_terrain(
        &mut self,
        index: usize,
        name: impl Into<String>,
        color: Color,
        kind: TerrainKind,
        categories: &[usize],
    ) -> Result<()> {
        let previous = self.catalog.terrain(index)?.kind;
        self.catalog.set_terrain(index, name, color, kind, categories)?;
        if kind != previous {
            self.index.apply_kind_change(index, kind);
        }
        self.revision += 1;
        Ok(())
    }

    pub fn set_terrain_icon(&mut self, index: usize, icon: Option<TileId>) -> Result<()> {
        self.catalog.set_terrain_icon(index, icon)?;
        self.revision += 1;
        Ok(())
    }

    /// Exchange two terrains' catalog positions. Rule and cell references
    /// are rewritten to follow, so no observable assignment changes; this
    /// exists to reorder display without the cost of a remove/add cycle.
    pub fn swap_terrains(&mut self, grid: &mut impl TerrainGrid, a: usize, b: usize) -> Result<()> {
        let remap = self.catalog.swap_terrains(a, b)?;
        self.index.remap_terrains(remap);
        for (layer, coord, terrain) in grid.assigned_cells() {
            if let Some(new) = remap.apply(terrain) {
                if new != terrain {
                    grid.set_cell_terrain(layer, coord, Some(new));
                }
            }
        }
        self.revision += 1;
        Ok(())
    }

    pub fn terrain_count(&self) -> usize {
        self.catalog.terrain_count()
    }

    pub fn terrain(&self, index: usize) -> Result<&Terrain> {
        self.catalog.terrain(index)
    }

    pub fn categories(&self) -> Vec<CategoryInfo> {
        self.catalog.categories()
    }

    // ─── Tile metadata ───────────────────────────────────────────────────

    /// Tag a tile with a terrain (or untag with `None`). Category terrains
    /// cannot be tagged onto tiles; they exist only as cell paint targets
    /// and peering requirements.
    pub fn set_tile_terrain(&mut self, tile: TileId, terrain: Option<usize>) -> Result<()> {
        if let Some(index) = terrain {
            let definition = self.catalog.terrain(index)?;
            if !definition.kind.taggable() {
                return Err(TerrainError::InvalidArgument(format!(
                    "terrain {index} is a category and cannot be tagged onto tiles"
                )));
            }
        }
        self.index.set_tile_terrain(tile, terrain);
        self.revision += 1;
        Ok(())
    }

    pub fn tile_terrain(&self, tile: TileId) -> Option<usize> {
        self.index.tile_terrain(tile)
    }

    pub fn set_tile_symmetry(&mut self, tile: TileId, symmetry: SymmetryType) -> Result<()> {
        let rules = self
            .index
            .rules_mut(tile)
            .ok_or_else(|| TerrainError::NotFound(format!("tile {tile:?} is not tagged")))?;
        rules.symmetry = symmetry;
        self.revision += 1;
        Ok(())
    }

    pub fn tile_symmetry(&self, tile: TileId) -> Option<SymmetryType> {
        Some(self.index.rules(tile)?.symmetry)
    }

    /// Attachment probability for decoration tiles, in `0.0..=1.0`.
    pub fn set_tile_probability(&mut self, tile: TileId, probability: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(TerrainError::InvalidArgument(format!(
                "probability {probability} outside 0.0..=1.0"
            )));
        }
        let rules = self
            .index
            .rules_mut(tile)
            .ok_or_else(|| TerrainError::NotFound(format!("tile {tile:?} is not tagged")))?;
        rules.probability = probability;
        self.revision += 1;
        Ok(())
    }

    /// Declare that `terrain` is acceptable at `direction` of `tile`.
    ///
    /// The direction must be valid for the tile's terrain match mode:
    /// vertex-matching tiles only peer on corners. Decoration terrains
    /// cannot be named as requirements.
    pub fn add_tile_peering(
        &mut self,
        tile: TileId,
        direction: PeeringDirection,
        terrain: usize,
    ) -> Result<()> {
        let kind = self.peering_mode(tile)?;
        if !direction.valid_for(kind) {
            return Err(TerrainError::InvalidArgument(format!(
                "direction {direction:?} is invalid for {kind:?} tiles"
            )));
        }
        let required = self.catalog.terrain(terrain)?;
        if required.kind == TerrainKind::Decoration {
            return Err(TerrainError::InvalidArgument(format!(
                "terrain {terrain} is a decoration and cannot be a peering requirement"
            )));
        }
        let rules = self
            .index
            .rules_mut(tile)
            .ok_or_else(|| TerrainError::NotFound(format!("tile {tile:?} is not tagged")))?;
        rules.add_peering(direction, terrain);
        self.revision += 1;
        Ok(())
    }

    pub fn remove_tile_peering(
        &mut self,
        tile: TileId,
        direction: PeeringDirection,
        terrain: usize,
    ) -> Result<()> {
        let rules = self
            .index
            .rules_mut(tile)
            .ok_or_else(|| TerrainError::NotFound(format!("tile {tile:?} is not tagged")))?;
        if !rules.remove_peering(direction, terrain) {
            return Err(TerrainError::NotFound(format!(
                "no peering for terrain {terrain} at {direction:?}"
            )));
        }
        self.revision += 1;
        Ok(())
    }

    /// Directions of `tile` that carry at least one rule, as declared.
    pub fn tile_peering_directions(&self, tile: TileId) -> DirectionSet {
        self.index
            .rules(tile)
            .map(|r| r.directions())
            .unwrap_or(DirectionSet::EMPTY)
    }

    pub fn tile_peering_terrains(&self, tile: TileId, direction: PeeringDirection) -> Vec<usize> {
        self.index
            .rules(tile)
            .map(|r| r.terrains_at(direction).iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn tile_directions_for_terrain(&self, tile: TileId, terrain: usize) -> DirectionSet {
        self.index
            .rules(tile)
            .map(|r| r.directions_for_terrain(terrain))
            .unwrap_or(DirectionSet::EMPTY)
    }

    /// Directions of `tile` that can carry a requirement once its declared
    /// symmetry is applied, i.e. [`Self::tile_peering_directions`] expanded
    /// through every transform the symmetry generates.
    pub fn tile_effective_peering_directions(&self, tile: TileId) -> DirectionSet {
        self.index
            .rules(tile)
            .map(|r| r.directions().expanded(r.symmetry))
            .unwrap_or(DirectionSet::EMPTY)
    }

    pub fn tiles_in_terrain(&self, terrain: usize) -> &[TileId] {
        self.index.tiles_in_terrain(terrain)
    }

    /// The tiles of `terrain` grouped by atlas source, groups and tiles
    /// both in registration order.
    pub fn tile_sources_in_terrain(&self, terrain: usize) -> Vec<(u32, Vec<TileId>)> {
        let mut sources: Vec<(u32, Vec<TileId>)> = Vec::new();
        for &tile in self.index.tiles_in_terrain(terrain) {
            match sources.iter_mut().find(|(source, _)| *source == tile.source) {
                Some((_, tiles)) => tiles.push(tile),
                None => sources.push((tile.source, vec![tile])),
            }
        }
        sources
    }

    // ─── Cells ───────────────────────────────────────────────────────────

    /// Assign a terrain to a cell without resolving its tile. Pair with
    /// [`Self::update_terrain_cell`] or use [`Self::replace_cell`] to
    /// resolve immediately.
    pub fn set_cell(
        &self,
        grid: &mut impl TerrainGrid,
        layer: u32,
        coord: CellCoord,
        terrain: usize,
    ) -> Result<()> {
        self.check_paintable(terrain)?;
        grid.set_cell_terrain(layer, coord, Some(terrain));
        Ok(())
    }

    pub fn set_cells(
        &self,
        grid: &mut impl TerrainGrid,
        layer: u32,
        coords: &[CellCoord],
        terrain: usize,
    ) -> Result<()> {
        self.check_paintable(terrain)?;
        for &coord in coords {
            grid.set_cell_terrain(layer, coord, Some(terrain));
        }
        Ok(())
    }

    /// Clear a cell's terrain assignment, rendered tile, and decoration.
    pub fn clear_cell(&self, grid: &mut impl TerrainGrid, layer: u32, coord: CellCoord) {
        grid.set_cell_terrain(layer, coord, None);
        grid.set_cell_tile(layer, coord, None);
        grid.set_cell_decoration(layer, coord, None);
    }

    pub fn get_cell(&self, grid: &impl TerrainGrid, layer: u32, coord: CellCoord) -> Option<usize> {
        grid.cell_terrain(layer, coord)
    }

    /// Assign a terrain and resolve the cell and its surroundings now.
    pub fn replace_cell(
        &self,
        grid: &mut impl TerrainGrid,
        layer: u32,
        coord: CellCoord,
        terrain: usize,
    ) -> Result<()> {
        self.replace_cells(grid, layer, &[coord], terrain)
    }

    pub fn replace_cells(
        &self,
        grid: &mut impl TerrainGrid,
        layer: u32,
        coords: &[CellCoord],
        terrain: usize,
    ) -> Result<()> {
        self.set_cells(grid, layer, coords, terrain)?;
        self.update_terrain_cells(grid, layer, coords, true);
        Ok(())
    }

    /// Re-resolve a cell's tile from its current terrain assignment.
    /// Used after programmatic [`Self::set_cell`] calls that bypassed
    /// resolution.
    pub fn update_terrain_cell(
        &self,
        grid: &mut impl TerrainGrid,
        layer: u32,
        coord: CellCoord,
        update_surrounding: bool,
    ) {
        self.update_terrain_cells(grid, layer, &[coord], update_surrounding);
    }

    pub fn update_terrain_cells(
        &self,
        grid: &mut impl TerrainGrid,
        layer: u32,
        coords: &[CellCoord],
        update_surrounding: bool,
    ) {
        let affected = self.affected_closure(grid, layer, coords, &HashMap::new(), update_surrounding);
        let snapshot = self.snapshot(grid, layer, &affected, &HashMap::new());
        let resolved = resolve_cells(&snapshot, &affected);
        for (coord, cell) in resolved {
            grid.set_cell_tile(layer, coord, cell.tile);
            grid.set_cell_decoration(layer, coord, cell.decoration);
        }
    }

    pub fn update_terrain_area(
        &self,
        grid: &mut impl TerrainGrid,
        layer: u32,
        area: CellRect,
        update_surrounding: bool,
    ) {
        let coords: Vec<CellCoord> = area.cells().collect();
        self.update_terrain_cells(grid, layer, &coords, update_surrounding);
    }

    // ─── Changesets ──────────────────────────────────────────────────────

    /// Batch a paint mapping into a changeset and start resolving it on a
    /// worker thread. The caller owns the changeset; the engine keeps no
    /// reference to it.
    pub fn create_changeset(
        &self,
        grid: &impl TerrainGrid,
        layer: u32,
        paint: HashMap<CellCoord, usize>,
    ) -> Result<Changeset> {
        for &terrain in paint.values() {
            self.check_paintable(terrain)?;
        }
        let coords: Vec<CellCoord> = paint.keys().copied().collect();
        let affected = self.affected_closure(grid, layer, &coords, &paint, true);
        let snapshot = self.snapshot(grid, layer, &affected, &paint);
        let mut changeset = Changeset::new(layer, paint, affected, self.revision);
        changeset.begin(snapshot);
        Ok(changeset)
    }

    /// Write a resolved changeset to grid storage in one step: paint cells
    /// get their terrain assignment, every affected cell gets its resolved
    /// tile and decoration. Blocks until resolution completes if needed.
    pub fn apply_changeset(
        &self,
        grid: &mut impl TerrainGrid,
        changeset: &mut Changeset,
    ) -> Result<()> {
        if changeset.state() == ChangesetState::Applied {
            return Err(TerrainError::InvalidState);
        }
        if changeset.revision != self.revision {
            return Err(TerrainError::StaleChangeset);
        }
        changeset.wait_ready();

        let layer = changeset.layer;
        for (&coord, &terrain) in &changeset.paint {
            grid.set_cell_terrain(layer, coord, Some(terrain));
        }
        for (&coord, cell) in &changeset.resolved {
            grid.set_cell_tile(layer, coord, cell.tile);
            grid.set_cell_decoration(layer, coord, cell.decoration);
        }
        changeset.mark_applied();
        Ok(())
    }

    // ─── Internal ────────────────────────────────────────────────────────

    fn check_paintable(&self, terrain: usize) -> Result<()> {
        let definition = self.catalog.terrain(terrain)?;
        if !definition.kind.paintable() {
            return Err(TerrainError::InvalidArgument(format!(
                "terrain {terrain} is a decoration and cannot be painted onto cells"
            )));
        }
        Ok(())
    }

    /// The paint cells plus, when requested, every neighbor whose best tile
    /// may have changed. Neighbors without a terrain assignment are left
    /// alone so manually placed tiles survive nearby painting.
    fn affected_closure(
        &self,
        grid: &impl TerrainGrid,
        layer: u32,
        coords: &[CellCoord],
        paint: &HashMap<CellCoord, usize>,
        update_surrounding: bool,
    ) -> Vec<CellCoord> {
        let mut affected: Vec<CellCoord> = Vec::with_capacity(coords.len());
        for &coord in coords {
            if !affected.contains(&coord) {
                affected.push(coord);
            }
        }
        if update_surrounding {
            for &coord in coords {
                for neighbor in coord.neighbors() {
                    if affected.contains(&neighbor) {
                        continue;
                    }
                    let assigned = paint.contains_key(&neighbor)
                        || grid.cell_terrain(layer, neighbor).is_some();
                    if assigned {
                        affected.push(neighbor);
                    }
                }
            }
        }
        affected
    }

    /// Capture the terrain of every affected cell and all of their
    /// neighbors, with `paint` overlaid on top of current assignments.
    fn snapshot(
        &self,
        grid: &impl TerrainGrid,
        layer: u32,
        affected: &[CellCoord],
        paint: &HashMap<CellCoord, usize>,
    ) -> Snapshot {
        let mut terrain = HashMap::new();
        let mut capture = |coord: CellCoord, terrain: &mut HashMap<CellCoord, Option<usize>>| {
            terrain.entry(coord).or_insert_with(|| {
                paint
                    .get(&coord)
                    .copied()
                    .or_else(|| grid.cell_terrain(layer, coord))
            });
        };
        for &coord in affected {
            capture(coord, &mut terrain);
            for neighbor in coord.neighbors() {
                capture(neighbor, &mut terrain);
            }
        }
        Snapshot {
            catalog: self.catalog.clone(),
            index: self.index.clone(),
            terrain,
            seed: rand::random(),
        }
    }

    fn peering_mode(&self, tile: TileId) -> Result<TerrainKind> {
        let terrain = self
            .index
            .tile_terrain(tile)
            .ok_or_else(|| TerrainError::NotFound(format!("tile {tile:?} is not tagged")))?;
        Ok(self.catalog.terrain(terrain)?.kind)
    }
}
