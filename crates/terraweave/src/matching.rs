//! Tile selection: scoring peering rules against a cell's neighborhood.
//!
//! Pure computation over read-only catalog and rule data. Given a cell's
//! assigned terrain and the terrain of its 8 neighbors, [`MatchEngine`]
//! picks the tile whose symmetry-expanded peering rules best fit. There is
//! no randomness here except decoration attachment, which is explicitly
//! independent of the host match.

use rand::Rng;

use terraweave_core::TileId;

use crate::catalog::{TerrainCatalog, TerrainKind};
use crate::peering::{PeeringDirection, PeeringIndex, TileRules};

/// The terrain of each neighbor, indexed by direction slot.
pub type Neighborhood = [Option<usize>; 8];

/// Scores and selects tiles for cells. Borrows a consistent snapshot of
/// catalog and rules; see the changeset module for how snapshots are taken.
pub struct MatchEngine<'a> {
    catalog: &'a TerrainCatalog,
    index: &'a PeeringIndex,
}

impl<'a> MatchEngine<'a> {
    pub fn new(catalog: &'a TerrainCatalog, index: &'a PeeringIndex) -> Self {
        Self { catalog, index }
    }

    /// Select the tile for a cell assigned `terrain` with the given
    /// neighborhood.
    ///
    /// Returns `None` only when the cell has no terrain or the terrain has
    /// no registered tiles; incomplete rule coverage degrades to the
    /// first-registered tile instead of failing.
    pub fn select_tile(&self, terrain: Option<usize>, neighbors: &Neighborhood) -> Option<TileId> {
        let terrain = terrain?;
        let mut best: Option<(TileId, i32)> = None;
        let mut fallback = None;

        for tile in self.candidates(terrain) {
            if fallback.is_none() {
                fallback = Some(tile);
            }
            let rules = match self.index.rules(tile) {
                Some(rules) => rules,
                None => continue,
            };
            let score = self.score(rules, neighbors);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                // First-registered candidate wins ties: only strictly
                // better scores replace the current best.
                _ => best = Some((tile, score)),
            }
        }

        match best {
            Some((tile, score)) if score >= 0 => Some(tile),
            // Total mismatch: guaranteed-safe default
            Some(_) => fallback,
            None => None,
        }
    }

    /// Pick a decoration to attach to a cell resolved to `host` terrain.
    ///
    /// Decorations are independent of the 8-neighbor match: a decoration
    /// tile's peering sets name the host terrains it may sit on (no sets
    /// at all means any host), and attachment is a Bernoulli draw on the
    /// tile's probability. First accepted tile in catalog order wins.
    pub fn select_decoration(&self, host: usize, rng: &mut impl Rng) -> Option<TileId> {
        for (terrain_index, terrain) in self.catalog.terrains().iter().enumerate() {
            if terrain.kind != TerrainKind::Decoration {
                continue;
            }
            for &tile in self.index.tiles_in_terrain(terrain_index) {
                let rules = match self.index.rules(tile) {
                    Some(rules) => rules,
                    None => continue,
                };
                if !self.accepts_host(rules, host) {
                    continue;
                }
                if rules.probability >= 1.0 || rng.gen::<f32>() < rules.probability {
                    return Some(tile);
                }
            }
        }
        None
    }

    /// Candidate tiles for a terrain, in registration order. For a
    /// category, the tiles of every member terrain in catalog order.
    fn candidates(&self, terrain: usize) -> Vec<TileId> {
        match self.catalog.terrain(terrain).map(|t| t.kind) {
            Ok(TerrainKind::Category) => self
                .catalog
                .terrains()
                .iter()
                .enumerate()
                .filter(|(_, t)| t.categories.contains(&terrain))
                .flat_map(|(member, _)| self.index.tiles_in_terrain(member).iter().copied())
                .collect(),
            Ok(_) => self.index.tiles_in_terrain(terrain).to_vec(),
            Err(_) => Vec::new(),
        }
    }

    /// Best score over the orientations declared by the tile's symmetry:
    /// +1 per direction whose requirement accepts the actual neighbor,
    /// -1 per direction whose requirement conflicts.
    fn score(&self, rules: &TileRules, neighbors: &Neighborhood) -> i32 {
        rules
            .symmetry
            .variants()
            .iter()
            .map(|&transform| {
                let mut score = 0;
                for direction in PeeringDirection::ALL {
                    let required = rules.requirement_under(direction, transform);
                    if required.is_empty() {
                        continue;
                    }
                    let matched = match neighbors[direction.slot() as usize] {
                        Some(actual) => required
                            .iter()
                            .any(|&r| self.catalog.matches_requirement(r, actual)),
                        None => false,
                    };
                    score += if matched { 1 } else { -1 };
                }
                score
            })
            .max()
            .unwrap_or(0)
    }

    fn accepts_host(&self, rules: &TileRules, host: usize) -> bool {
        if rules.directions().is_empty() {
            return true;
        }
        PeeringDirection::ALL.into_iter().any(|direction| {
            rules
                .terrains_at(direction)
                .iter()
                .any(|&r| self.catalog.matches_requirement(r, host))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetry::SymmetryType;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use terraweave_core::Color;

    fn tile(n: u32) -> TileId {
        TileId::base(0, n)
    }

    fn simple_catalog(count: usize) -> TerrainCatalog {
        let mut catalog = TerrainCatalog::new("Test");
        for i in 0..count {
            catalog
                .add_terrain(format!("t{i}"), Color::WHITE, TerrainKind::MatchTiles, &[])
                .unwrap();
        }
        catalog
    }

    fn full_ring(index: &mut PeeringIndex, tile_id: TileId, terrain: usize, required: usize) {
        index.set_tile_terrain(tile_id, Some(terrain));
        let rules = index.rules_mut(tile_id).unwrap();
        for direction in PeeringDirection::ALL {
            rules.add_peering(direction, required);
        }
    }

    #[test]
    fn test_unassigned_cell_clears() {
        let catalog = simple_catalog(1);
        let index = PeeringIndex::new();
        let engine = MatchEngine::new(&catalog, &index);
        assert_eq!(engine.select_tile(None, &[None; 8]), None);
    }

    #[test]
    fn test_full_match_beats_partial() {
        let catalog = simple_catalog(2);
        let mut index = PeeringIndex::new();

        // tile 1 requires terrain 1 everywhere, tile 2 requires terrain 0
        full_ring(&mut index, tile(1), 0, 1);
        full_ring(&mut index, tile(2), 0, 0);

        let engine = MatchEngine::new(&catalog, &index);
        let picked = engine.select_tile(Some(0), &[Some(0); 8]);
        assert_eq!(picked, Some(tile(2)));
    }

    #[test]
    fn test_tie_breaks_by_registration_order() {
        let catalog = simple_catalog(1);
        let mut index = PeeringIndex::new();
        full_ring(&mut index, tile(5), 0, 0);
        full_ring(&mut index, tile(3), 0, 0);

        let engine = MatchEngine::new(&catalog, &index);
        // identical rules, identical scores: first registered wins
        assert_eq!(engine.select_tile(Some(0), &[Some(0); 8]), Some(tile(5)));
    }

    #[test]
    fn test_determinism() {
        let catalog = simple_catalog(2);
        let mut index = PeeringIndex::new();
        full_ring(&mut index, tile(1), 0, 0);
        full_ring(&mut index, tile(2), 0, 1);

        let engine = MatchEngine::new(&catalog, &index);
        let neighbors = [Some(0), Some(1), None, Some(0), Some(0), None, Some(1), Some(0)];
        let first = engine.select_tile(Some(0), &neighbors);
        for _ in 0..10 {
            assert_eq!(engine.select_tile(Some(0), &neighbors), first);
        }
    }

    #[test]
    fn test_total_mismatch_falls_back_to_first_tile() {
        let catalog = simple_catalog(2);
        let mut index = PeeringIndex::new();
        full_ring(&mut index, tile(1), 0, 1);
        full_ring(&mut index, tile(2), 0, 1);

        let engine = MatchEngine::new(&catalog, &index);
        // every requirement conflicts, but resolution still yields a tile
        assert_eq!(engine.select_tile(Some(0), &[Some(0); 8]), Some(tile(1)));
    }

    #[test]
    fn test_terrain_without_tiles_yields_none() {
        let catalog = simple_catalog(1);
        let index = PeeringIndex::new();
        let engine = MatchEngine::new(&catalog, &index);
        assert_eq!(engine.select_tile(Some(0), &[Some(0); 8]), None);
    }

    #[test]
    fn test_symmetry_variant_recovers_score() {
        let catalog = simple_catalog(2);
        let mut index = PeeringIndex::new();

        index.set_tile_terrain(tile(1), Some(0));
        let rules = index.rules_mut(tile(1)).unwrap();
        rules.add_peering(PeeringDirection::Top, 1);
        rules.symmetry = SymmetryType::Flip;

        let engine = MatchEngine::new(&catalog, &index);
        // terrain 1 is below, not above: only the flipped variant matches
        let mut neighbors = [None; 8];
        neighbors[PeeringDirection::Bottom.slot() as usize] = Some(1);
        assert_eq!(engine.select_tile(Some(0), &neighbors), Some(tile(1)));

        // without symmetry the same neighborhood is a mismatch, but the
        // fallback still returns the tile
        index.rules_mut(tile(1)).unwrap().symmetry = SymmetryType::None;
        let engine = MatchEngine::new(&catalog, &index);
        assert_eq!(engine.select_tile(Some(0), &neighbors), Some(tile(1)));
    }

    #[test]
    fn test_category_cell_uses_member_tiles() {
        let mut catalog = TerrainCatalog::new("Test");
        catalog
            .add_terrain("ground", Color::WHITE, TerrainKind::Category, &[])
            .unwrap();
        catalog
            .add_terrain("grass", Color::GREEN, TerrainKind::MatchTiles, &[0])
            .unwrap();

        let mut index = PeeringIndex::new();
        full_ring(&mut index, tile(7), 1, 1);

        let engine = MatchEngine::new(&catalog, &index);
        // painting the category resolves to the member terrain's tile
        assert_eq!(engine.select_tile(Some(0), &[Some(1); 8]), Some(tile(7)));
    }

    #[test]
    fn test_category_requirement_accepts_members() {
        let mut catalog = TerrainCatalog::new("Test");
        catalog
            .add_terrain("ground", Color::WHITE, TerrainKind::Category, &[])
            .unwrap();
        catalog
            .add_terrain("grass", Color::GREEN, TerrainKind::MatchTiles, &[0])
            .unwrap();
        catalog
            .add_terrain("dirt", Color::WHITE, TerrainKind::MatchTiles, &[0])
            .unwrap();

        let mut index = PeeringIndex::new();
        // grass tile that accepts any "ground" neighbor
        full_ring(&mut index, tile(1), 1, 0);

        let engine = MatchEngine::new(&catalog, &index);
        // dirt neighbors satisfy the category requirement
        assert_eq!(engine.select_tile(Some(1), &[Some(2); 8]), Some(tile(1)));
    }

    #[test]
    fn test_decoration_attaches_to_listed_host_only() {
        let mut catalog = simple_catalog(2);
        let deco = catalog
            .add_terrain("flowers", Color::WHITE, TerrainKind::Decoration, &[])
            .unwrap();

        let mut index = PeeringIndex::new();
        index.set_tile_terrain(tile(9), Some(deco));
        index
            .rules_mut(tile(9))
            .unwrap()
            .add_peering(PeeringDirection::Top, 0);

        let engine = MatchEngine::new(&catalog, &index);
        let mut rng = SmallRng::seed_from_u64(7);
        assert_eq!(engine.select_decoration(0, &mut rng), Some(tile(9)));
        assert_eq!(engine.select_decoration(1, &mut rng), None);
    }

    #[test]
    fn test_decoration_probability_zero_never_attaches() {
        let mut catalog = simple_catalog(1);
        let deco = catalog
            .add_terrain("flowers", Color::WHITE, TerrainKind::Decoration, &[])
            .unwrap();

        let mut index = PeeringIndex::new();
        index.set_tile_terrain(tile(9), Some(deco));
        index.rules_mut(tile(9)).unwrap().probability = 0.0;

        let engine = MatchEngine::new(&catalog, &index);
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..32 {
            assert_eq!(engine.select_decoration(0, &mut rng), None);
        }
    }
}
