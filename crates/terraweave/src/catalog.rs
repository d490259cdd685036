//! Terrain definitions and the per-tileset catalog.
//!
//! A [`TerrainCatalog`] owns the ordered list of terrain definitions for one
//! tileset. Terrain indices are positional: stable until a remove or swap,
//! at which point every index reference (category membership here, peering
//! rules and grid cells at the engine level) is rewritten via [`IndexRemap`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use terraweave_core::{Color, TileId};

use crate::error::{Result, TerrainError};

/// How tiles of a terrain participate in matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TerrainKind {
    /// Peer against all 8 neighboring cells (sides and corners).
    #[default]
    MatchTiles,
    /// Peer against the 4 diagonal vertex corners only.
    MatchVertices,
    /// Not paintable onto tiles; a named group other terrains belong to.
    /// A cell painted with a category resolves to any member terrain's tiles.
    Category,
    /// Attached to already-resolved cells by independent placement rules,
    /// without altering the host terrain's tile choice.
    Decoration,
}

impl TerrainKind {
    /// Whether tiles may be tagged with this kind of terrain.
    pub fn taggable(self) -> bool {
        !matches!(self, TerrainKind::Category)
    }

    /// Whether cells may be painted with this kind of terrain.
    pub fn paintable(self) -> bool {
        matches!(self, TerrainKind::MatchTiles | TerrainKind::MatchVertices | TerrainKind::Category)
    }
}

/// A terrain definition: "Grass", "Cliff", "Any ground", ...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terrain {
    pub name: String,
    pub color: Color,
    pub kind: TerrainKind,
    /// Indices of the [`TerrainKind::Category`] terrains this one belongs to.
    #[serde(default)]
    pub categories: BTreeSet<usize>,
    /// Representative tile shown by editor UIs.
    #[serde(default)]
    pub icon: Option<TileId>,
}

/// A category and the terrains that belong to it, as returned by
/// [`TerrainCatalog::categories`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub index: usize,
    pub name: String,
    pub members: Vec<usize>,
}

/// A structural change to terrain indices, applied to every index reference
/// (category membership, peering rules, grid cell assignments).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexRemap {
    /// Terrain `0` was removed; higher indices shift down by one.
    Removed(usize),
    /// Two terrains exchanged positions.
    Swapped(usize, usize),
}

impl IndexRemap {
    /// Map an old index to its new value, or `None` if it was removed.
    pub fn apply(self, index: usize) -> Option<usize> {
        match self {
            IndexRemap::Removed(removed) => {
                if index == removed {
                    None
                } else if index > removed {
                    Some(index - 1)
                } else {
                    Some(index)
                }
            }
            IndexRemap::Swapped(a, b) => {
                if index == a {
                    Some(b)
                } else if index == b {
                    Some(a)
                } else {
                    Some(index)
                }
            }
        }
    }
}

/// The ordered terrain definitions for one tileset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainCatalog {
    /// Stable identifier for this catalog.
    pub id: Uuid,
    pub name: String,
    terrains: Vec<Terrain>,
}

impl TerrainCatalog {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            terrains: Vec::new(),
        }
    }

    pub fn terrain_count(&self) -> usize {
        self.terrains.len()
    }

    pub fn terrain(&self, index: usize) -> Result<&Terrain> {
        self.terrains
            .get(index)
            .ok_or_else(|| TerrainError::NotFound(format!("terrain index {index}")))
    }

    pub fn terrains(&self) -> &[Terrain] {
        &self.terrains
    }

    /// Append a terrain and return its index.
    pub fn add_terrain(
        &mut self,
        name: impl Into<String>,
        color: Color,
        kind: TerrainKind,
        categories: &[usize],
    ) -> Result<usize> {
        let name = name.into();
        self.validate_definition(&name, kind, categories, None)?;

        let mut terrain = Terrain {
            name,
            color,
            kind,
            categories: categories.iter().copied().collect(),
            icon: None,
        };
        if kind == TerrainKind::Category {
            terrain.categories.clear();
        }
        self.terrains.push(terrain);
        Ok(self.terrains.len() - 1)
    }

    /// Remove a terrain, shifting all higher indices down by one and
    /// rewriting category membership. Returns the removed definition and
    /// the remap the caller must push through rules and grid cells.
    pub fn remove_terrain(&mut self, index: usize) -> Result<(Terrain, IndexRemap)> {
        if index >= self.terrains.len() {
            return Err(TerrainError::NotFound(format!("terrain index {index}")));
        }
        let removed = self.terrains.remove(index);
        let remap = IndexRemap::Removed(index);
        for terrain in &mut self.terrains {
            terrain.categories = terrain
                .categories
                .iter()
                .filter_map(|&c| remap.apply(c))
                .collect();
        }
        Ok((removed, remap))
    }

    /// Replace a terrain's fields in place, keeping its index.
    pub fn set_terrain(
        &mut self,
        index: usize,
        name: impl Into<String>,
        color: Color,
        kind: TerrainKind,
        categories: &[usize],
    ) -> Result<()> {
        if index >= self.terrains.len() {
            return Err(TerrainError::NotFound(format!("terrain index {index}")));
        }
        let name = name.into();
        self.validate_definition(&name, kind, categories, Some(index))?;

        let terrain = &mut self.terrains[index];
        terrain.name = name;
        terrain.color = color;
        terrain.kind = kind;
        terrain.categories = if kind == TerrainKind::Category {
            BTreeSet::new()
        } else {
            categories.iter().copied().collect()
        };
        Ok(())
    }

    pub fn set_terrain_icon(&mut self, index: usize, icon: Option<TileId>) -> Result<()> {
        if index >= self.terrains.len() {
            return Err(TerrainError::NotFound(format!("terrain index {index}")));
        }
        self.terrains[index].icon = icon;
        Ok(())
    }

    /// Exchange two terrains' positions without touching cells or rules
    /// that the caller doesn't rewrite. Returns the remap to push through.
    pub fn swap_terrains(&mut self, a: usize, b: usize) -> Result<IndexRemap> {
        if a >= self.terrains.len() {
            return Err(TerrainError::NotFound(format!("terrain index {a}")));
        }
        if b >= self.terrains.len() {
            return Err(TerrainError::NotFound(format!("terrain index {b}")));
        }
        self.terrains.swap(a, b);
        let remap = IndexRemap::Swapped(a, b);
        for terrain in &mut self.terrains {
            terrain.categories = terrain
                .categories
                .iter()
                .filter_map(|&c| remap.apply(c))
                .collect();
        }
        Ok(remap)
    }

    /// All category terrains with their member terrain indices.
    pub fn categories(&self) -> Vec<CategoryInfo> {
        self.terrains
            .iter()
            .enumerate()
            .filter(|(_, t)| t.kind == TerrainKind::Category)
            .map(|(index, t)| CategoryInfo {
                index,
                name: t.name.clone(),
                members: self
                    .terrains
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| m.categories.contains(&index))
                    .map(|(i, _)| i)
                    .collect(),
            })
            .collect()
    }

    /// Whether `terrain` satisfies a peering requirement of `required`:
    /// either the same index, or `required` is a category `terrain` belongs to.
    pub fn matches_requirement(&self, required: usize, terrain: usize) -> bool {
        if required == terrain {
            return true;
        }
        match (self.terrains.get(required), self.terrains.get(terrain)) {
            (Some(req), Some(t)) if req.kind == TerrainKind::Category => {
                t.categories.contains(&required)
            }
            _ => false,
        }
    }

    /// Serialize the catalog to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| TerrainError::InvalidArgument(e.to_string()))
    }

    /// Load a catalog from JSON produced by [`Self::to_json`].
    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: Self = serde_json::from_str(json)
            .map_err(|e| TerrainError::InvalidArgument(e.to_string()))?;
        for (i, terrain) in catalog.terrains.iter().enumerate() {
            for &c in &terrain.categories {
                if catalog.terrains.get(c).map(|t| t.kind) != Some(TerrainKind::Category) {
                    return Err(TerrainError::InvalidArgument(format!(
                        "terrain {i} references non-category index {c}"
                    )));
                }
            }
        }
        Ok(catalog)
    }

    fn validate_definition(
        &self,
        name: &str,
        kind: TerrainKind,
        categories: &[usize],
        own_index: Option<usize>,
    ) -> Result<()> {
        if name.is_empty() {
            return Err(TerrainError::InvalidArgument(
                "terrain name must not be empty".into(),
            ));
        }
        if kind == TerrainKind::Category && !categories.is_empty() {
            return Err(TerrainError::InvalidArgument(
                "a category cannot belong to another category".into(),
            ));
        }
        for &c in categories {
            if own_index == Some(c) {
                return Err(TerrainError::InvalidArgument(
                    "a terrain cannot be a member of itself".into(),
                ));
            }
            match self.terrains.get(c) {
                Some(t) if t.kind == TerrainKind::Category => {}
                Some(_) => {
                    return Err(TerrainError::InvalidArgument(format!(
                        "terrain index {c} is not a category"
                    )))
                }
                None => return Err(TerrainError::NotFound(format!("terrain index {c}"))),
            }
        }
        Ok(())
    }
}
