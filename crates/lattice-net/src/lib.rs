//! Lattice Network
//!
//! Incremental connectivity for networks of nodes on a 6-connected cubic
//! lattice. Each network is anchored by one [`Coordinator`], which owns a size
//! counter and the capacity figures derived from it. Every other member is a
//! [`LatticeNode`] that hangs off the coordinator through a spanning tree.
//!
//! # Protocols
//!
//! - [`attach()`] runs when a node becomes visible (placed or loaded). It grows
//!   the spanning tree outward from the new node. Joining an existing tree
//!   through a single edge costs O(1).
//! - [`detach()`] runs when a node is about to become invisible (removed or
//!   unloaded). It decides which of the displaced subtrees can still reach the
//!   coordinator, re-roots them, and releases the rest.
//!
//! Work is bounded by the size of the affected subtree, never by the size of
//! the whole network.
//!
//! # Bitmasks
//!
//! Nodes record raw neighbour occupancy in an *adjacency* mask and the edges
//! used by the spanning tree in a *tree-edge* mask. A tree edge is stored on
//! its parent endpoint, pointing at the child. Only adjacency is persisted;
//! tree edges are rebuilt when a region loads (see [`persist`]).
//!
//! # Invariants
//!
//! Between protocol runs:
//!
//! - every attached node has exactly one tree path to a node touching its
//!   coordinator, and every node on that path shares the coordinator;
//! - a coordinator's size equals the number of nodes that reference it;
//! - tree edges are a subset of adjacency, and adjacency is symmetric.
//!
//! [`check::verify`] checks them over a world.

pub mod attach;
pub mod check;
pub mod config;
pub mod coordinator;
pub mod detach;
pub mod error;
pub mod lifecycle;
pub mod node;
pub mod persist;
pub mod world;

pub use attach::{attach, AttachMode, AttachReport};
pub use check::{verify, Violation};
pub use config::CapacityConfig;
pub use coordinator::{Capacity, Coordinator};
pub use detach::{detach, DetachOutcome, DetachReport};
pub use error::{Error, Result};
pub use lifecycle::{place, remove};
pub use node::LatticeNode;
pub use persist::{load_region, save_all, unload_region, Adjacency, LoadReport, NodeKind, SavedNode};
pub use world::{MemoryWorld, Occupant, World};

pub use lattice_topology::{BlockPos, Direction, DirectionSet};
