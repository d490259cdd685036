//! Per-tile peering rules and the tile-keyed rule index.
//!
//! Every tile tagged with a terrain carries a [`TileRules`]: the terrain it
//! belongs to, its declared [`SymmetryType`], and for each neighbor
//! direction the set of terrain indices acceptable there. The
//! [`PeeringIndex`] stores rules keyed by [`TileId`] and keeps per-terrain
//! tile lists in registration order, which is what makes match tie-breaking
//! deterministic.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use terraweave_core::TileId;

use crate::catalog::{IndexRemap, TerrainKind};
use crate::symmetry::{SymmetryType, Transform};

/// A neighbor direction slot, clockwise from the cell above.
///
/// Side directions peer against the 4-adjacent cells; corner directions
/// against the diagonal cells, which double as vertex corners in
/// [`TerrainKind::MatchVertices`] mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PeeringDirection {
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
    TopLeft,
}

impl PeeringDirection {
    pub const ALL: [PeeringDirection; 8] = [
        PeeringDirection::Top,
        PeeringDirection::TopRight,
        PeeringDirection::Right,
        PeeringDirection::BottomRight,
        PeeringDirection::Bottom,
        PeeringDirection::BottomLeft,
        PeeringDirection::Left,
        PeeringDirection::TopLeft,
    ];

    pub fn slot(self) -> u8 {
        self as u8
    }

    pub fn from_slot(slot: u8) -> PeeringDirection {
        Self::ALL[slot as usize % 8]
    }

    /// Corner directions are the odd slots.
    pub fn is_corner(self) -> bool {
        self.slot() % 2 == 1
    }

    /// The direction pointing back from the neighbor to this cell.
    pub fn opposite(self) -> PeeringDirection {
        Self::from_slot((self.slot() + 4) % 8)
    }

    /// Grid offset of the neighbor this direction peers against (y down).
    pub fn offset(self) -> (i32, i32) {
        const OFFSETS: [(i32, i32); 8] = [
            (0, -1),
            (1, -1),
            (1, 0),
            (1, 1),
            (0, 1),
            (-1, 1),
            (-1, 0),
            (-1, -1),
        ];
        OFFSETS[self.slot() as usize]
    }

    pub fn transformed(self, transform: Transform) -> PeeringDirection {
        Self::from_slot(transform.apply_slot(self.slot()))
    }

    /// Whether this direction may carry peering for tiles of `kind`.
    ///
    /// MatchTiles peers on all 8 neighbors; MatchVertices only on the
    /// vertex corners. Decoration placement rules use the full set.
    /// Category terrains cannot be tagged onto tiles at all.
    pub fn valid_for(self, kind: TerrainKind) -> bool {
        match kind {
            TerrainKind::MatchTiles | TerrainKind::Decoration => true,
            TerrainKind::MatchVertices => self.is_corner(),
            TerrainKind::Category => false,
        }
    }
}

/// A compact set of peering directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionSet(u8);

impl DirectionSet {
    pub const EMPTY: DirectionSet = DirectionSet(0);

    pub fn insert(&mut self, direction: PeeringDirection) {
        self.0 |= 1 << direction.slot();
    }

    pub fn remove(&mut self, direction: PeeringDirection) {
        self.0 &= !(1 << direction.slot());
    }

    pub fn contains(self, direction: PeeringDirection) -> bool {
        self.0 & (1 << direction.slot()) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = PeeringDirection> {
        PeeringDirection::ALL
            .into_iter()
            .filter(move |d| self.contains(*d))
    }

    /// The set with every direction mapped through `transform`.
    pub fn transformed(self, transform: Transform) -> DirectionSet {
        let mut out = DirectionSet::EMPTY;
        for direction in self.iter() {
            out.insert(direction.transformed(transform));
        }
        out
    }

    /// Union of this set under every transform in the symmetry's closure.
    /// Idempotent: expanding an already-expanded set changes nothing.
    pub fn expanded(self, symmetry: SymmetryType) -> DirectionSet {
        let mut out = DirectionSet::EMPTY;
        for &transform in symmetry.closure() {
            out.0 |= self.transformed(transform).0;
        }
        out
    }
}

impl FromIterator<PeeringDirection> for DirectionSet {
    fn from_iter<I: IntoIterator<Item = PeeringDirection>>(iter: I) -> Self {
        let mut set = DirectionSet::EMPTY;
        for direction in iter {
            set.insert(direction);
        }
        set
    }
}

/// The terrain tag, symmetry, and peering rules of one tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileRules {
    /// Terrain index this tile is tagged with.
    pub terrain: usize,
    #[serde(default)]
    pub symmetry: SymmetryType,
    /// Attachment probability, used only by decoration tiles.
    #[serde(default = "default_probability")]
    pub probability: f32,
    /// Acceptable terrain indices per direction slot.
    peering: [BTreeSet<usize>; 8],
}

fn default_probability() -> f32 {
    1.0
}

impl TileRules {
    pub fn new(terrain: usize) -> Self {
        Self {
            terrain,
            symmetry: SymmetryType::default(),
            probability: 1.0,
            peering: Default::default(),
        }
    }

    /// Add an acceptable terrain at a direction. Returns whether the rule
    /// was newly inserted.
    pub fn add_peering(&mut self, direction: PeeringDirection, terrain: usize) -> bool {
        self.peering[direction.slot() as usize].insert(terrain)
    }

    /// Remove a terrain from a direction. Returns whether it was present.
    pub fn remove_peering(&mut self, direction: PeeringDirection, terrain: usize) -> bool {
        self.peering[direction.slot() as usize].remove(&terrain)
    }

    /// Directions that carry at least one rule, as declared (unexpanded).
    pub fn directions(&self) -> DirectionSet {
        PeeringDirection::ALL
            .into_iter()
            .filter(|d| !self.peering[d.slot() as usize].is_empty())
            .collect()
    }

    /// The acceptable terrains declared at a direction.
    pub fn terrains_at(&self, direction: PeeringDirection) -> &BTreeSet<usize> {
        &self.peering[direction.slot() as usize]
    }

    /// Directions whose rule set contains `terrain`.
    pub fn directions_for_terrain(&self, terrain: usize) -> DirectionSet {
        PeeringDirection::ALL
            .into_iter()
            .filter(|d| self.peering[d.slot() as usize].contains(&terrain))
            .collect()
    }

    /// The requirement that applies at `direction` when the rules are used
    /// in the orientation given by `transform`: the declared rule of the
    /// slot that `transform` moves onto `direction`.
    pub fn requirement_under(
        &self,
        direction: PeeringDirection,
        transform: Transform,
    ) -> &BTreeSet<usize> {
        let declared = direction.transformed(transform.inverse());
        &self.peering[declared.slot() as usize]
    }

    /// Drop rules at directions the given match mode does not allow.
    pub fn clear_invalid_directions(&mut self, kind: TerrainKind) {
        for direction in PeeringDirection::ALL {
            if !direction.valid_for(kind) {
                self.peering[direction.slot() as usize].clear();
            }
        }
    }

    /// Remove `terrain` from every direction's requirement set.
    pub fn remove_requirement(&mut self, terrain: usize) {
        for rules in &mut self.peering {
            rules.remove(&terrain);
        }
    }

    fn remap(&mut self, remap: IndexRemap) -> Option<()> {
        self.terrain = remap.apply(self.terrain)?;
        for rules in &mut self.peering {
            *rules = rules.iter().filter_map(|&t| remap.apply(t)).collect();
        }
        Some(())
    }
}

/// Peering rules for every tagged tile, keyed by tile identity.
///
/// Insertion order is preserved both per tile and per terrain so that
/// matching can break ties by registration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeeringIndex {
    #[serde(with = "indexmap::map::serde_seq")]
    rules: IndexMap<TileId, TileRules>,
    /// terrain index -> tiles tagged with it, in registration order
    #[serde(with = "indexmap::map::serde_seq")]
    by_terrain: IndexMap<usize, Vec<TileId>>,
}

impl PeeringIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tile_count(&self) -> usize {
        self.rules.len()
    }

    /// Tag a tile with a terrain, or untag it with `None`.
    ///
    /// Re-tagging with a different terrain clears the tile's peering rules;
    /// they were declared against the old terrain's match mode.
    pub fn set_tile_terrain(&mut self, tile: TileId, terrain: Option<usize>) {
        let previous = self.rules.get(&tile).map(|r| r.terrain);
        if previous == terrain {
            return;
        }
        if let Some(old) = previous {
            if let Some(tiles) = self.by_terrain.get_mut(&old) {
                tiles.retain(|t| *t != tile);
            }
        }
        match terrain {
            Some(terrain) => {
                self.rules.insert(tile, TileRules::new(terrain));
                self.by_terrain.entry(terrain).or_default().push(tile);
            }
            None => {
                self.rules.shift_remove(&tile);
            }
        }
    }

    pub fn tile_terrain(&self, tile: TileId) -> Option<usize> {
        Some(self.rules.get(&tile)?.terrain)
    }

    pub fn rules(&self, tile: TileId) -> Option<&TileRules> {
        self.rules.get(&tile)
    }

    pub fn rules_mut(&mut self, tile: TileId) -> Option<&mut TileRules> {
        self.rules.get_mut(&tile)
    }

    /// Tiles tagged with `terrain`, oldest first.
    pub fn tiles_in_terrain(&self, terrain: usize) -> &[TileId] {
        self.by_terrain
            .get(&terrain)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Re-validate rules after a terrain's match mode changed.
    ///
    /// Tiles of a terrain turned into a category become untagged. Other
    /// mode changes drop peering declared at directions the new mode does
    /// not allow. A terrain turned into a decoration also stops being a
    /// valid requirement and is removed from every tile's peering sets.
    pub fn apply_kind_change(&mut self, terrain: usize, kind: TerrainKind) {
        let tiles: Vec<TileId> = self.tiles_in_terrain(terrain).to_vec();
        if !kind.taggable() {
            for tile in tiles {
                self.set_tile_terrain(tile, None);
            }
        } else {
            for tile in tiles {
                if let Some(rules) = self.rules.get_mut(&tile) {
                    rules.clear_invalid_directions(kind);
                }
            }
        }
        if kind == TerrainKind::Decoration {
            for rules in self.rules.values_mut() {
                rules.remove_requirement(terrain);
            }
        }
    }

    /// Rewrite every terrain index reference after a catalog remove/swap.
    /// Tiles whose terrain was removed become untagged.
    pub fn remap_terrains(&mut self, remap: IndexRemap) {
        let mut rules = IndexMap::with_capacity(self.rules.len());
        let mut by_terrain: IndexMap<usize, Vec<TileId>> = IndexMap::new();
        for (tile, mut tile_rules) in std::mem::take(&mut self.rules) {
            if tile_rules.remap(remap).is_some() {
                by_terrain
                    .entry(tile_rules.terrain)
                    .or_default()
                    .push(tile);
                rules.insert(tile, tile_rules);
            }
        }
        self.rules = rules;
        self.by_terrain = by_terrain;
    }
}
