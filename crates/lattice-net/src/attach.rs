//! Attach protocol: grow a spanning tree when a member becomes visible.
//!
//! # Placement
//!
//! 1. Probe the 6 neighbours and record adjacency on both sides.
//! 2. Unattached lattice nodes become frontier candidates. The first attached
//!    node or coordinator found is adopted directly, through a single tree edge.
//! 3. Without a coordinator the node stays isolated until a later event.
//! 4. Without candidates the node joins in O(1): the size grows by one.
//! 5. Otherwise a breadth-first search absorbs the unattached closure of the
//!    frontier, one tree edge per absorbed node.
//!
//! # Loading
//!
//! [`AttachMode::Loaded`] probes only the directions recorded in the saved
//! adjacency, drops recorded directions whose neighbour is gone, and does not
//! count a node a second time when an earlier load in the same region already
//! absorbed it.

use std::collections::{HashSet, VecDeque};

use lattice_topology::{BlockPos, Direction, DirectionSet};
use tracing::{debug, trace, warn};

use crate::world::{size_of, update_size, Occupant, World};

/// How the member became visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachMode {
    /// Newly placed: probe every direction.
    #[default]
    Placed,
    /// Restored from a save: trust the persisted adjacency.
    ///
    /// Only recorded directions are probed, so a neighbour placed while this
    /// record was unloaded is not linked to it.
    Loaded,
}

/// Outcome of one attach run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttachReport {
    /// Coordinator the member ended up under (itself for a coordinator).
    pub coordinator: Option<BlockPos>,
    /// Lattice nodes that joined the network during this run.
    pub absorbed: u32,
    /// Occupied positions inspected.
    pub visited: usize,
}

/// Run the attach protocol for the member at `pos`.
///
/// No-op on a client-side world or when `pos` holds no member.
pub fn attach<W: World + ?Sized>(world: &mut W, pos: BlockPos, mode: AttachMode) -> AttachReport {
    if world.is_client_side() {
        return AttachReport::default();
    }
    match world.occupant(pos) {
        Some(Occupant::Node(_)) => attach_node(world, pos, mode),
        Some(Occupant::Coordinator(_)) => attach_coordinator(world, pos, mode),
        None => AttachReport::default(),
    }
}

/// Directions to probe, starting from the adjacency already recorded.
fn probe_directions(mode: AttachMode, recorded: DirectionSet) -> DirectionSet {
    match mode {
        AttachMode::Placed => DirectionSet::ALL,
        AttachMode::Loaded => recorded,
    }
}

fn attach_node<W: World + ?Sized>(world: &mut W, pos: BlockPos, mode: AttachMode) -> AttachReport {
    let Some(node) = world.node(pos) else {
        return AttachReport::default();
    };
    let recorded = node.adjacency;
    let was_attached = node.coordinator.is_some();
    let mut coordinator = node.coordinator;

    let mut report = AttachReport::default();
    let mut adjacency = recorded;
    let mut frontier = Vec::new();
    let mut visited = HashSet::from([pos]);

    // 1-2. Record adjacency and classify neighbours
    for dir in probe_directions(mode, recorded).iter() {
        let neighbor_pos = pos.offset(dir);
        let back = dir.opposite();
        let mut changed = false;
        match world.occupant_mut(neighbor_pos) {
            Some(Occupant::Node(neighbor)) => {
                changed = !neighbor.adjacency.contains(back);
                neighbor.adjacency.insert(back);
                adjacency.insert(dir);
                match neighbor.coordinator {
                    None => {
                        frontier.push(dir);
                        visited.insert(neighbor_pos);
                    }
                    Some(owner) if coordinator.is_none() => {
                        coordinator = Some(owner);
                        neighbor.tree_edges.insert(back);
                    }
                    Some(_) => {}
                }
            }
            Some(Occupant::Coordinator(owner)) => {
                changed = !owner.adjacency.contains(back);
                owner.adjacency.insert(back);
                adjacency.insert(dir);
                if coordinator.is_none() {
                    coordinator = Some(owner.pos());
                }
            }
            None => {
                if adjacency.contains(dir) {
                    warn!(%pos, %dir, "dropping stale adjacency");
                    adjacency.remove(dir);
                }
                continue;
            }
        }
        report.visited += 1;
        if mode == AttachMode::Placed || changed {
            world.mark_dirty(neighbor_pos);
        }
    }

    if let Some(node) = world.node_mut(pos) {
        node.adjacency = adjacency;
        node.coordinator = coordinator;
    }
    if adjacency != recorded || (mode == AttachMode::Placed && !adjacency.is_empty()) {
        world.mark_dirty(pos);
    }

    // 3. Isolated: wait for a later event to join it
    let Some(coordinator) = coordinator else {
        trace!(%pos, candidates = frontier.len(), "node isolated");
        return report;
    };
    report.coordinator = Some(coordinator);

    let joined = u32::from(!was_attached);
    let size = size_of(world, coordinator);

    // 4. Single-edge join
    if frontier.is_empty() {
        report.absorbed = joined;
        if joined > 0 {
            update_size(world, coordinator, size + joined);
        }
        trace!(%pos, %coordinator, size = size + joined, "node joined through one edge");
        return report;
    }

    // 5. Absorb the unattached closure of the frontier
    if let Some(node) = world.node_mut(pos) {
        for &dir in &frontier {
            node.tree_edges.insert(dir);
        }
    }
    let queue = frontier.iter().map(|dir| pos.offset(*dir)).collect();
    let absorbed = absorb(world, coordinator, queue, &mut visited, &mut report.visited);
    report.absorbed = joined + absorbed;
    update_size(world, coordinator, size + report.absorbed);

    debug!(
        %pos,
        %coordinator,
        absorbed = report.absorbed,
        size = size + report.absorbed,
        "node attached"
    );
    report
}

fn attach_coordinator<W: World + ?Sized>(
    world: &mut W,
    pos: BlockPos,
    mode: AttachMode,
) -> AttachReport {
    let Some(owner) = world.coordinator(pos) else {
        return AttachReport::default();
    };
    let recorded = owner.adjacency;

    let mut report = AttachReport {
        coordinator: Some(pos),
        ..AttachReport::default()
    };
    let mut adjacency = recorded;
    let mut queue = VecDeque::new();
    let mut visited = HashSet::from([pos]);

    for dir in probe_directions(mode, recorded).iter() {
        let neighbor_pos = pos.offset(dir);
        let back = dir.opposite();
        match world.node_mut(neighbor_pos) {
            Some(neighbor) => {
                let changed = !neighbor.adjacency.contains(back);
                neighbor.adjacency.insert(back);
                adjacency.insert(dir);
                if neighbor.coordinator.is_none() {
                    queue.push_back(neighbor_pos);
                    visited.insert(neighbor_pos);
                }
                report.visited += 1;
                if mode == AttachMode::Placed || changed {
                    world.mark_dirty(neighbor_pos);
                }
            }
            None => {
                if adjacency.contains(dir) {
                    warn!(%pos, %dir, "dropping stale coordinator adjacency");
                    adjacency.remove(dir);
                }
            }
        }
    }

    if let Some(owner) = world.coordinator_mut(pos) {
        owner.adjacency = adjacency;
    }
    if adjacency != recorded {
        world.mark_dirty(pos);
    }

    let size = size_of(world, pos);
    report.absorbed = absorb(world, pos, queue, &mut visited, &mut report.visited);
    update_size(world, pos, size + report.absorbed);

    debug!(%pos, absorbed = report.absorbed, size = size + report.absorbed, "coordinator attached");
    report
}

/// Breadth-first absorption of unattached nodes into `coordinator`'s tree.
///
/// Every queued node is already linked from its parent. Returns the number of
/// nodes absorbed.
fn absorb<W: World + ?Sized>(
    world: &mut W,
    coordinator: BlockPos,
    mut queue: VecDeque<BlockPos>,
    visited: &mut HashSet<BlockPos>,
    inspected: &mut usize,
) -> u32 {
    let mut absorbed = 0;
    while let Some(current) = queue.pop_front() {
        let Some(node) = world.node(current) else {
            debug_assert!(false, "queued position {current} holds no lattice node");
            continue;
        };
        let adjacency = node.adjacency;
        *inspected += 1;

        let mut children = DirectionSet::EMPTY;
        for dir in adjacency.iter() {
            let next = current.offset(dir);
            if !visited.insert(next) {
                continue;
            }
            if world.node(next).is_some_and(|n| n.coordinator.is_none()) {
                children.insert(dir);
                queue.push_back(next);
            }
        }

        if let Some(node) = world.node_mut(current) {
            node.coordinator = Some(coordinator);
            node.tree_edges = node.tree_edges | children;
        }
        absorbed += 1;
    }
    absorbed
}

/// Directions of `pos` that lead to a network member.
pub(crate) fn probe_occupied<W: World + ?Sized>(world: &W, pos: BlockPos) -> DirectionSet {
    let is_coordinator = world.coordinator(pos).is_some();
    Direction::ALL
        .into_iter()
        .filter(|dir| match world.occupant(pos.offset(*dir)) {
            Some(Occupant::Node(_)) => true,
            // Coordinators only record lattice nodes
            Some(Occupant::Coordinator(_)) => !is_coordinator,
            None => false,
        })
        .collect()
}
