//! The host world the protocols run against.
//!
//! The protocols never own nodes. They look nodes up by position through the
//! [`World`] trait, which a host implements over its own grid storage.
//! [`MemoryWorld`] is a self-contained implementation used by tests and the
//! simulator.

use std::collections::{BTreeSet, HashMap};

use lattice_topology::{BlockPos, DirectionSet};

use crate::check::{self, Violation};
use crate::config::CapacityConfig;
use crate::coordinator::Coordinator;
use crate::node::LatticeNode;

/// A network member stored at a lattice position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Occupant {
    Node(LatticeNode),
    Coordinator(Coordinator),
}

impl Occupant {
    pub fn pos(&self) -> BlockPos {
        match self {
            Self::Node(node) => node.pos(),
            Self::Coordinator(coordinator) => coordinator.pos(),
        }
    }

    /// Recorded adjacency, whatever the kind.
    pub fn adjacency(&self) -> DirectionSet {
        match self {
            Self::Node(node) => node.adjacency(),
            Self::Coordinator(coordinator) => coordinator.adjacency(),
        }
    }

    pub fn as_node(&self) -> Option<&LatticeNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Coordinator(_) => None,
        }
    }

    pub fn as_coordinator(&self) -> Option<&Coordinator> {
        match self {
            Self::Coordinator(coordinator) => Some(coordinator),
            Self::Node(_) => None,
        }
    }
}

/// Storage and services the protocols need from the host.
///
/// Positions holding anything other than a network member must report `None`.
pub trait World {
    /// The network member at `pos`.
    fn occupant(&self, pos: BlockPos) -> Option<&Occupant>;

    /// Mutable access to the network member at `pos`.
    fn occupant_mut(&mut self, pos: BlockPos) -> Option<&mut Occupant>;

    /// Store a member, returning whatever was there before.
    fn insert_occupant(&mut self, occupant: Occupant) -> Option<Occupant>;

    /// Take the member out of `pos`.
    fn remove_occupant(&mut self, pos: BlockPos) -> Option<Occupant>;

    /// Schedule the member at `pos` for persistence.
    fn mark_dirty(&mut self, pos: BlockPos);

    /// Passive replicas skip every protocol.
    fn is_client_side(&self) -> bool {
        false
    }

    /// Called after a protocol changed a coordinator's size.
    fn size_changed(&mut self, _coordinator: BlockPos, _size: u32) {}

    /// Capacity formulas for coordinators created in this world.
    fn capacity_config(&self) -> CapacityConfig {
        CapacityConfig::default()
    }

    fn node(&self, pos: BlockPos) -> Option<&LatticeNode> {
        match self.occupant(pos)? {
            Occupant::Node(node) => Some(node),
            Occupant::Coordinator(_) => None,
        }
    }

    fn node_mut(&mut self, pos: BlockPos) -> Option<&mut LatticeNode> {
        match self.occupant_mut(pos)? {
            Occupant::Node(node) => Some(node),
            Occupant::Coordinator(_) => None,
        }
    }

    fn coordinator(&self, pos: BlockPos) -> Option<&Coordinator> {
        match self.occupant(pos)? {
            Occupant::Coordinator(coordinator) => Some(coordinator),
            Occupant::Node(_) => None,
        }
    }

    fn coordinator_mut(&mut self, pos: BlockPos) -> Option<&mut Coordinator> {
        match self.occupant_mut(pos)? {
            Occupant::Coordinator(coordinator) => Some(coordinator),
            Occupant::Node(_) => None,
        }
    }
}

/// Set a coordinator's size and notify the host.
pub(crate) fn update_size<W: World + ?Sized>(world: &mut W, coordinator: BlockPos, size: u32) {
    if let Some(entry) = world.coordinator_mut(coordinator) {
        entry.set_size(size);
        world.size_changed(coordinator, size);
    }
}

/// Current size of the coordinator at `pos`, zero if there is none.
pub(crate) fn size_of<W: World + ?Sized>(world: &W, coordinator: BlockPos) -> u32 {
    world.coordinator(coordinator).map_or(0, Coordinator::size)
}

/// An in-memory world.
///
/// Keeps members in a hash map, collects dirty positions, and remembers the
/// last size reported for each coordinator.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorld {
    occupants: HashMap<BlockPos, Occupant>,
    dirty: BTreeSet<BlockPos>,
    reported_sizes: HashMap<BlockPos, u32>,
    client_side: bool,
    capacity: CapacityConfig,
}

impl MemoryWorld {
    /// Create an empty server-side world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty passive replica.
    pub fn client() -> Self {
        Self {
            client_side: true,
            ..Self::default()
        }
    }

    /// Capacity formulas given to coordinators placed in this world.
    #[must_use]
    pub fn with_capacity(mut self, capacity: CapacityConfig) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn get(&self, pos: BlockPos) -> Option<&Occupant> {
        self.occupants.get(&pos)
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        self.occupants.contains_key(&pos)
    }

    /// All occupied positions, sorted.
    pub fn positions(&self) -> Vec<BlockPos> {
        let mut positions: Vec<_> = self.occupants.keys().copied().collect();
        positions.sort();
        positions
    }

    pub fn nodes(&self) -> impl Iterator<Item = &LatticeNode> {
        self.occupants.values().filter_map(Occupant::as_node)
    }

    pub fn coordinators(&self) -> impl Iterator<Item = &Coordinator> {
        self.occupants.values().filter_map(Occupant::as_coordinator)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.occupants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }

    /// Positions marked dirty since the last call, sorted.
    pub fn take_dirty(&mut self) -> Vec<BlockPos> {
        std::mem::take(&mut self.dirty).into_iter().collect()
    }

    pub fn is_dirty(&self, pos: BlockPos) -> bool {
        self.dirty.contains(&pos)
    }

    /// Last size reported through [`World::size_changed`] for `coordinator`.
    pub fn reported_size(&self, coordinator: BlockPos) -> Option<u32> {
        self.reported_sizes.get(&coordinator).copied()
    }

    /// Check every member for consistency.
    pub fn verify(&self) -> Result<(), Violation> {
        check::verify(self, &self.positions())
    }
}

impl World for MemoryWorld {
    fn occupant(&self, pos: BlockPos) -> Option<&Occupant> {
        self.occupants.get(&pos)
    }

    fn occupant_mut(&mut self, pos: BlockPos) -> Option<&mut Occupant> {
        self.occupants.get_mut(&pos)
    }

    fn insert_occupant(&mut self, occupant: Occupant) -> Option<Occupant> {
        self.occupants.insert(occupant.pos(), occupant)
    }

    fn remove_occupant(&mut self, pos: BlockPos) -> Option<Occupant> {
        self.dirty.remove(&pos);
        self.reported_sizes.remove(&pos);
        self.occupants.remove(&pos)
    }

    fn mark_dirty(&mut self, pos: BlockPos) {
        if self.occupants.contains_key(&pos) {
            self.dirty.insert(pos);
        }
    }

    fn is_client_side(&self) -> bool {
        self.client_side
    }

    fn size_changed(&mut self, coordinator: BlockPos, size: u32) {
        self.reported_sizes.insert(coordinator, size);
    }

    fn capacity_config(&self) -> CapacityConfig {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup_by_kind() {
        let mut world = MemoryWorld::new();
        let node_pos = BlockPos::new(1, 0, 0);
        world.insert_occupant(Occupant::Node(LatticeNode::new(node_pos)));
        world.insert_occupant(Occupant::Coordinator(Coordinator::new(BlockPos::ORIGIN)));

        assert!(world.node(node_pos).is_some());
        assert!(world.coordinator(node_pos).is_none());
        assert!(world.coordinator(BlockPos::ORIGIN).is_some());
        assert!(world.node(BlockPos::ORIGIN).is_none());
        assert_eq!(world.len(), 2);
        assert_eq!(world.positions(), vec![BlockPos::ORIGIN, node_pos]);
    }

    #[test]
    fn dirty_only_tracks_occupied_positions() {
        let mut world = MemoryWorld::new();
        world.insert_occupant(Occupant::Node(LatticeNode::new(BlockPos::ORIGIN)));
        world.mark_dirty(BlockPos::ORIGIN);
        world.mark_dirty(BlockPos::new(5, 5, 5));
        assert!(world.is_dirty(BlockPos::ORIGIN));
        assert_eq!(world.take_dirty(), vec![BlockPos::ORIGIN]);
        assert!(world.take_dirty().is_empty());
    }

    #[test]
    fn update_size_notifies_host() {
        let mut world = MemoryWorld::new();
        world.insert_occupant(Occupant::Coordinator(Coordinator::new(BlockPos::ORIGIN)));
        update_size(&mut world, BlockPos::ORIGIN, 3);
        assert_eq!(size_of(&world, BlockPos::ORIGIN), 3);
        assert_eq!(world.reported_size(BlockPos::ORIGIN), Some(3));

        // No coordinator there: nothing to update, nothing reported
        update_size(&mut world, BlockPos::new(9, 9, 9), 1);
        assert_eq!(world.reported_size(BlockPos::new(9, 9, 9)), None);
    }

    #[test]
    fn client_world_reports_client_side() {
        assert!(MemoryWorld::client().is_client_side());
        assert!(!MemoryWorld::new().is_client_side());
    }
}
