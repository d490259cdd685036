//! Error taxonomy for the terrain engine.

use thiserror::Error;

/// Errors that can occur when mutating catalogs, rules, or changesets.
///
/// Malformed input is rejected at the call that introduces it, never
/// silently dropped. Tile resolution itself never fails; missing rule
/// coverage degrades to a fallback tile instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TerrainError {
    /// Malformed input: empty name, direction invalid for the match mode,
    /// category cycle, non-paintable terrain kind, and similar.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A terrain index or tile key that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operating on a changeset that has already been applied.
    #[error("changeset has already been applied")]
    InvalidState,

    /// The catalog or peering rules changed after the changeset captured
    /// its snapshot; applying it would write tiles chosen by stale rules.
    #[error("catalog changed since the changeset was created")]
    StaleChangeset,
}

pub type Result<T> = std::result::Result<T, TerrainError>;
