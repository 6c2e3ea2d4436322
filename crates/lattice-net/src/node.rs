//! Lattice nodes.

use lattice_topology::{BlockPos, Direction, DirectionSet};

/// A non-coordinator member of a network.
///
/// Passive state only: the protocols in [`attach`](crate::attach) and
/// [`detach`](crate::detach) are the sole writers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatticeNode {
    pub(crate) pos: BlockPos,
    /// Directions in which another network node sits. Persisted.
    pub(crate) adjacency: DirectionSet,
    /// Spanning-tree edges toward this node's children. Rebuilt on load.
    pub(crate) tree_edges: DirectionSet,
    /// Position of the coordinator this node belongs to.
    pub(crate) coordinator: Option<BlockPos>,
}

impl LatticeNode {
    /// A fresh, unattached node with empty masks.
    pub const fn new(pos: BlockPos) -> Self {
        Self::with_adjacency(pos, DirectionSet::EMPTY)
    }

    /// An unattached node restored with previously saved adjacency.
    pub const fn with_adjacency(pos: BlockPos, adjacency: DirectionSet) -> Self {
        Self {
            pos,
            adjacency,
            tree_edges: DirectionSet::EMPTY,
            coordinator: None,
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

    /// Tree edges held by this node; each points at one of its children.
    #[inline]
    pub const fn tree_edges(&self) -> DirectionSet {
        self.tree_edges
    }

    #[inline]
    pub const fn coordinator(&self) -> Option<BlockPos> {
        self.coordinator
    }

    #[inline]
    pub const fn is_attached(&self) -> bool {
        self.coordinator.is_some()
    }

    /// Adjacency edges that this node does not use as a tree edge.
    ///
    /// Includes the edge toward this node's own parent, since the parent
    /// holds that tree bit.
    #[inline]
    pub fn unused_edges(&self) -> DirectionSet {
        self.adjacency - self.tree_edges
    }

    /// Positions of this node's children in the spanning tree.
    pub fn children(&self) -> impl Iterator<Item = BlockPos> + '_ {
        self.tree_edges.iter().map(move |dir| self.pos.offset(dir))
    }

    /// Release this node from its network.
    pub(crate) fn release(&mut self) {
        self.coordinator = None;
        self.tree_edges = DirectionSet::EMPTY;
    }

    /// Drop both the adjacency and any tree edge in `dir`.
    pub(crate) fn disconnect(&mut self, dir: Direction) {
        self.adjacency.remove(dir);
        self.tree_edges.remove(dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_node_is_unattached_and_empty() {
        let node = LatticeNode::new(BlockPos::new(1, 2, 3));
        assert!(!node.is_attached());
        assert!(node.adjacency().is_empty());
        assert!(node.tree_edges().is_empty());
    }

    #[test]
    fn unused_edges_exclude_tree_edges() {
        let mut node = LatticeNode::new(BlockPos::ORIGIN);
        node.adjacency = [Direction::Up, Direction::East, Direction::North]
            .into_iter()
            .collect();
        node.tree_edges = Direction::East.into();
        let unused: Vec<_> = node.unused_edges().iter().collect();
        assert_eq!(unused, vec![Direction::Up, Direction::North]);
        let children: Vec<_> = node.children().collect();
        assert_eq!(children, vec![BlockPos::new(1, 0, 0)]);
    }

    #[test]
    fn release_keeps_adjacency() {
        let mut node = LatticeNode::with_adjacency(BlockPos::ORIGIN, DirectionSet::ALL);
        node.coordinator = Some(BlockPos::new(0, 1, 0));
        node.tree_edges = Direction::Down.into();
        node.release();
        assert!(!node.is_attached());
        assert!(node.tree_edges().is_empty());
        assert_eq!(node.adjacency(), DirectionSet::ALL);
    }
}
