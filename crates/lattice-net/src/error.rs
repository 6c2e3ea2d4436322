//! Error types for lattice-net.
//!
//! The protocols themselves never fail: every placement and removal order has
//! a defined outcome, reported through [`AttachReport`](crate::AttachReport)
//! and [`DetachReport`](crate::DetachReport). Errors only arise at the host
//! boundary.

use lattice_topology::BlockPos;
use thiserror::Error;

use crate::check::Violation;

/// Result type for lattice-net operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur at the host boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// A node was placed or loaded onto a position that is already occupied.
    #[error("position {0} is already occupied")]
    Occupied(BlockPos),

    /// A removal or save targeted a position with no network node.
    #[error("no network node at {0}")]
    Vacant(BlockPos),

    /// Saved records could not be encoded or decoded.
    #[error("record error: {0}")]
    Record(#[from] serde_json::Error),

    /// The world failed an invariant check.
    #[error("invariant violated: {0}")]
    Violation(#[from] Violation),
}
