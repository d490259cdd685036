//! Batched terrain paints and their resolution lifecycle.
//!
//! A [`Changeset`] is created from a paint mapping, resolves every affected
//! cell against a consistent snapshot of catalog and rules, and is applied
//! to grid storage in one caller-visible step. Resolution runs on a worker
//! thread; per-cell work is independent, so the worker computes over the
//! moved-in snapshot with no shared mutable state and hands the result back
//! over a channel. The caller owns the changeset until apply; dropping an
//! unapplied changeset has no side effects.

use std::collections::HashMap;
use std::thread;

use crossbeam_channel::{unbounded, Receiver};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use uuid::Uuid;

use terraweave_core::{CellCoord, TileId};

use crate::catalog::TerrainCatalog;
use crate::matching::MatchEngine;
use crate::peering::{PeeringDirection, PeeringIndex};

/// Lifecycle of a changeset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangesetState {
    /// Holds only the input paint mapping; resolution not yet started.
    Created,
    /// A worker is resolving the affected cells.
    Resolving,
    /// Every affected cell has a resolved tile; waiting for apply.
    Ready,
    /// Written to grid storage. The changeset is inert from here on.
    Applied,
}

/// The outcome of resolving one cell: the derived tile and an optional
/// independently attached decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedCell {
    pub tile: Option<TileId>,
    pub decoration: Option<TileId>,
}

/// Read-only data resolution needs, captured at changeset creation.
/// Moved into the worker thread whole; later catalog mutations cannot
/// affect an in-flight changeset (they fail it at apply instead).
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    pub catalog: TerrainCatalog,
    pub index: PeeringIndex,
    /// Terrain assignment of every affected cell and every neighbor of one,
    /// with the paint mapping already overlaid.
    pub terrain: HashMap<CellCoord, Option<usize>>,
    /// Seed for decoration attachment draws.
    pub seed: u64,
}

/// A batch of cell-to-terrain assignments and their resolved tiles.
pub struct Changeset {
    pub id: Uuid,
    pub(crate) layer: u32,
    pub(crate) paint: HashMap<CellCoord, usize>,
    pub(crate) affected: Vec<CellCoord>,
    pub(crate) resolved: HashMap<CellCoord, ResolvedCell>,
    /// Catalog/rule revision this changeset's snapshot was taken at.
    pub(crate) revision: u64,
    state: ChangesetState,
    receiver: Option<Receiver<HashMap<CellCoord, ResolvedCell>>>,
}

impl Changeset {
    pub(crate) fn new(
        layer: u32,
        paint: HashMap<CellCoord, usize>,
        affected: Vec<CellCoord>,
        revision: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            layer,
            paint,
            affected,
            resolved: HashMap::new(),
            revision,
            state: ChangesetState::Created,
            receiver: None,
        }
    }

    /// Start resolution. An empty paint skips the worker and goes straight
    /// to `Ready` with no resolved tiles.
    pub(crate) fn begin(&mut self, snapshot: Snapshot) {
        debug_assert_eq!(self.state, ChangesetState::Created);
        if self.affected.is_empty() {
            self.state = ChangesetState::Ready;
            return;
        }
        let affected = self.affected.clone();
        let (sender, receiver) = unbounded();
        thread::spawn(move || {
            let resolved = resolve_cells(&snapshot, &affected);
            // The caller may have dropped the changeset; that's fine.
            let _ = sender.send(resolved);
        });
        self.receiver = Some(receiver);
        self.state = ChangesetState::Resolving;
    }

    pub fn state(&self) -> ChangesetState {
        self.state
    }

    pub fn layer(&self) -> u32 {
        self.layer
    }

    /// Resolved tiles per affected cell. Complete once [`Self::state`]
    /// is `Ready` or `Applied`.
    pub fn resolved(&self) -> &HashMap<CellCoord, ResolvedCell> {
        &self.resolved
    }

    /// Poll for completion without blocking.
    pub fn is_ready(&mut self) -> bool {
        if self.state == ChangesetState::Resolving {
            if let Some(receiver) = &self.receiver {
                if let Ok(resolved) = receiver.try_recv() {
                    self.finish(resolved);
                }
            }
        }
        matches!(self.state, ChangesetState::Ready | ChangesetState::Applied)
    }

    /// Block until resolution completes. No timeout; discard the changeset
    /// instead of waiting if cancellation is needed.
    pub fn wait_ready(&mut self) {
        if self.state != ChangesetState::Resolving {
            return;
        }
        if let Some(receiver) = self.receiver.take() {
            if let Ok(resolved) = receiver.recv() {
                self.finish(resolved);
            } else {
                // Worker gone without a result; treat as resolved-empty
                // rather than blocking the caller forever.
                self.state = ChangesetState::Ready;
            }
        }
    }

    pub(crate) fn mark_applied(&mut self) {
        self.state = ChangesetState::Applied;
        self.receiver = None;
    }

    fn finish(&mut self, resolved: HashMap<CellCoord, ResolvedCell>) {
        self.resolved = resolved;
        self.receiver = None;
        self.state = ChangesetState::Ready;
    }
}

/// Resolve every affected cell against the snapshot. Pure with respect to
/// the snapshot: cells are independent and order does not matter.
pub(crate) fn resolve_cells(
    snapshot: &Snapshot,
    affected: &[CellCoord],
) -> HashMap<CellCoord, ResolvedCell> {
    let engine = MatchEngine::new(&snapshot.catalog, &snapshot.index);
    let mut resolved = HashMap::with_capacity(affected.len());

    for &coord in affected {
        let terrain = snapshot.terrain.get(&coord).copied().flatten();
        let neighbors = neighborhood(&snapshot.terrain, coord);
        let tile = engine.select_tile(terrain, &neighbors);
        let decoration = terrain.and_then(|host| {
            let mut rng = SmallRng::seed_from_u64(cell_seed(snapshot.seed, coord));
            engine.select_decoration(host, &mut rng)
        });
        resolved.insert(coord, ResolvedCell { tile, decoration });
    }
    resolved
}

/// The terrain of each neighbor of `coord`, by direction slot.
fn neighborhood(
    terrain: &HashMap<CellCoord, Option<usize>>,
    coord: CellCoord,
) -> [Option<usize>; 8] {
    let mut neighbors = [None; 8];
    for direction in PeeringDirection::ALL {
        let (dx, dy) = direction.offset();
        neighbors[direction.slot() as usize] = terrain
            .get(&coord.offset(dx, dy))
            .copied()
            .flatten();
    }
    neighbors
}

/// Per-cell decoration seed, independent of resolution order.
fn cell_seed(seed: u64, coord: CellCoord) -> u64 {
    let mixed = ((coord.x as u32 as u64) << 32) | coord.y as u32 as u64;
    seed ^ mixed.wrapping_mul(0x9e37_79b9_7f4a_7c15)
}
