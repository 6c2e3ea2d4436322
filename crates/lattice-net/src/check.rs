//! Consistency checks over a world.
//!
//! Hosts run these in debug builds or after loading a suspicious save; the
//! test suites run them after every step.

use std::collections::{HashMap, HashSet, VecDeque};

use lattice_topology::{BlockPos, Direction};
use thiserror::Error;

use crate::world::{Occupant, World};

/// The first inconsistency found by [`verify`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("{pos} records a neighbour to the {dir} that does not record it back")]
    AsymmetricAdjacency { pos: BlockPos, dir: Direction },

    #[error("{pos} records a neighbour to the {dir} where there is none")]
    DanglingAdjacency { pos: BlockPos, dir: Direction },

    #[error("{pos} holds a tree edge to the {dir} outside its adjacency")]
    TreeEdgeOutsideAdjacency { pos: BlockPos, dir: Direction },

    #[error("{pos} holds a tree edge to the {dir} that does not lead to a lattice node")]
    TreeEdgeToNonNode { pos: BlockPos, dir: Direction },

    #[error("{0} holds tree edges without belonging to a network")]
    UnattachedWithTreeEdges(BlockPos),

    #[error("{pos} belongs to {coordinator}, which is not a coordinator")]
    UnknownCoordinator { pos: BlockPos, coordinator: BlockPos },

    #[error("{0} is the child of more than one tree edge")]
    MultipleParents(BlockPos),

    #[error("tree edge from {parent} to {child} crosses networks")]
    MixedCoordinator { parent: BlockPos, child: BlockPos },

    #[error("{0} has no tree path to its coordinator")]
    Unrooted(BlockPos),

    #[error("coordinator {coordinator} has size {size} but {counted} nodes reference it")]
    SizeMismatch {
        coordinator: BlockPos,
        size: u32,
        counted: u32,
    },
}

/// Check the members at `positions` for consistency.
///
/// Positions should cover whole networks: sizes are compared against the
/// nodes counted among `positions` only. Checked, in order:
///
/// - adjacency is symmetric and points at members;
/// - tree edges lie inside adjacency and lead to lattice nodes;
/// - unattached nodes hold no tree edges;
/// - every node has at most one parent, in its own network;
/// - every attached node has a tree path to a node touching its coordinator;
/// - each coordinator's size matches the nodes referencing it.
pub fn verify<W: World + ?Sized>(world: &W, positions: &[BlockPos]) -> Result<(), Violation> {
    let mut parents: HashMap<BlockPos, BlockPos> = HashMap::new();
    let mut counted: HashMap<BlockPos, u32> = HashMap::new();

    for &pos in positions {
        let Some(occupant) = world.occupant(pos) else {
            continue;
        };
        for dir in occupant.adjacency().iter() {
            let back = dir.opposite();
            match (occupant, world.occupant(pos.offset(dir))) {
                (_, None) | (Occupant::Coordinator(_), Some(Occupant::Coordinator(_))) => {
                    return Err(Violation::DanglingAdjacency { pos, dir });
                }
                (_, Some(neighbor)) if !neighbor.adjacency().contains(back) => {
                    return Err(Violation::AsymmetricAdjacency { pos, dir });
                }
                _ => {}
            }
        }

        let Occupant::Node(node) = occupant else {
            continue;
        };
        let Some(coordinator) = node.coordinator() else {
            if !node.tree_edges().is_empty() {
                return Err(Violation::UnattachedWithTreeEdges(pos));
            }
            continue;
        };
        if world.coordinator(coordinator).is_none() {
            return Err(Violation::UnknownCoordinator { pos, coordinator });
        }
        *counted.entry(coordinator).or_default() += 1;

        for dir in node.tree_edges().iter() {
            if !node.adjacency().contains(dir) {
                return Err(Violation::TreeEdgeOutsideAdjacency { pos, dir });
            }
            let child = pos.offset(dir);
            let Some(child_node) = world.node(child) else {
                return Err(Violation::TreeEdgeToNonNode { pos, dir });
            };
            if child_node.coordinator() != Some(coordinator) {
                return Err(Violation::MixedCoordinator { parent: pos, child });
            }
            if parents.insert(child, pos).is_some() {
                return Err(Violation::MultipleParents(child));
            }
        }
    }

    // Walk down from every root; whatever is missed sits on a cycle or under
    // a root that does not touch its coordinator.
    let mut reached = HashSet::new();
    let mut queue: VecDeque<BlockPos> = positions
        .iter()
        .copied()
        .filter(|pos| !parents.contains_key(pos))
        .filter(|&pos| {
            world.node(pos).is_some_and(|node| {
                node.coordinator().is_some_and(|coordinator| {
                    pos.direction_to(coordinator)
                        .is_some_and(|dir| node.adjacency().contains(dir))
                })
            })
        })
        .collect();
    while let Some(pos) = queue.pop_front() {
        if !reached.insert(pos) {
            continue;
        }
        if let Some(node) = world.node(pos) {
            queue.extend(node.children());
        }
    }
    for &pos in positions {
        if world.node(pos).is_some_and(|node| node.is_attached()) && !reached.contains(&pos) {
            return Err(Violation::Unrooted(pos));
        }
    }

    for &pos in positions {
        if let Some(coordinator) = world.coordinator(pos) {
            let counted = counted.get(&pos).copied().unwrap_or(0);
            if coordinator.size() != counted {
                return Err(Violation::SizeMismatch {
                    coordinator: pos,
                    size: coordinator.size(),
                    counted,
                });
            }
        }
    }
    Ok(())
}
