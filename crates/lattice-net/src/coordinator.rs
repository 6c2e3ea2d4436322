//! Coordinator nodes.

use lattice_topology::{BlockPos, DirectionSet};
use serde::{Deserialize, Serialize};

use crate::config::CapacityConfig;

/// Capacity figures derived from a coordinator's size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capacity {
    pub max_storage: u64,
    pub max_output: u64,
    pub max_input: u64,
}

/// The root of one network.
///
/// Owns the size counter: the number of lattice nodes attached through the
/// spanning tree, not counting the coordinator itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinator {
    pos: BlockPos,
    /// Directions in which a lattice node touches this coordinator.
    pub(crate) adjacency: DirectionSet,
    size: u32,
    capacity: Capacity,
    config: CapacityConfig,
}

impl Coordinator {
    /// A coordinator with no attached nodes and the default capacity formulas.
    pub fn new(pos: BlockPos) -> Self {
        Self::with_config(pos, CapacityConfig::default())
    }

    /// A coordinator with no attached nodes.
    pub fn with_config(pos: BlockPos, config: CapacityConfig) -> Self {
        Self {
            pos,
            adjacency: DirectionSet::EMPTY,
            size: 0,
            capacity: config.capacity(0),
            config,
        }
    }

    /// A coordinator restored with previously saved adjacency.
    pub fn with_adjacency(pos: BlockPos, adjacency: DirectionSet, config: CapacityConfig) -> Self {
        Self {
            adjacency,
            ..Self::with_config(pos, config)
        }
    }

    #[inline]
    pub const fn pos(&self) -> BlockPos {
        self.pos
    }

    #[inline]
    pub const fn adjacency(&self) -> DirectionSet {
        self.adjacency
    }

    /// Number of lattice nodes attached to this coordinator.
    #[inline]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Update the size and recompute the derived capacity.
    ///
    /// Only the protocols call this; hosts observe the change through
    /// [`World::size_changed`](crate::World::size_changed).
    pub fn set_size(&mut self, size: u32) {
        self.size = size;
        self.capacity = self.config.capacity(size);
    }

    #[inline]
    pub const fn capacity(&self) -> Capacity {
        self.capacity
    }

    #[inline]
    pub const fn config(&self) -> &CapacityConfig {
        &self.config
    }
}
