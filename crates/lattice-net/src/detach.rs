//! Detach protocol: repair a spanning tree when a member is about to vanish.
//!
//! # Teardown
//!
//! Every adjacency bit of the vanishing node is cleared on both sides. Each of
//! its tree edges names a *branch root*: a child whose subtree just lost its
//! way to the coordinator. The tree edge held by its parent is dropped too.
//!
//! # Branch resolution
//!
//! - No branch roots: the node was a leaf, the size drops by one.
//! - One branch: walk the subtree over tree edges, collecting every *unused
//!   edge* (adjacency that is not a tree edge). The first unused edge leading
//!   outside the subtree to a member of the same network is activated and the
//!   parent chain from its near end back to the branch root is reversed. If no
//!   edge qualifies the whole branch is released.
//! - Several branches: a branch may only be able to reach the coordinator
//!   through another displaced branch. A dependency matrix records which
//!   branches touch which, and a worklist propagates reachability to a
//!   fixpoint before any edge is activated.
//!
//! Work is bounded by the size of the displaced subtrees.
//!
//! # Coordinators
//!
//! When the coordinator itself vanishes, every node of its network is
//! released and the size drops to zero.

use std::collections::{HashMap, VecDeque};

use lattice_topology::{BlockPos, Direction, DirectionSet};
use tracing::{debug, trace};

use crate::world::{size_of, update_size, Occupant, World};

/// How the network was repaired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetachOutcome {
    /// The member did not belong to any network.
    #[default]
    Unattached,
    /// The node had no children in the spanning tree.
    Leaf,
    /// The node's children were resolved branch by branch.
    Branches { reattached: usize, discarded: usize },
    /// A coordinator vanished and released its whole network.
    Dissolved,
}

/// Outcome of one detach run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetachReport {
    /// The network the member belonged to (itself for a coordinator).
    pub coordinator: Option<BlockPos>,
    pub outcome: DetachOutcome,
    /// Lattice nodes that left the network, including the vanishing one.
    pub removed: u32,
    /// Nodes inspected while resolving branches.
    pub visited: usize,
}

/// An unused edge: `dir` leads from the near node at `from` to outside its
/// tree path.
type Edge = (BlockPos, Direction);

/// A displaced subtree.
#[derive(Debug, Default)]
struct Branch {
    /// Every member, mapped to its parent inside the branch.
    parents: HashMap<BlockPos, Option<BlockPos>>,
    /// Members in discovery order, branch root first.
    members: Vec<BlockPos>,
    /// Unused edges in discovery order.
    unused: Vec<Edge>,
}

impl Branch {
    /// Walk the subtree below `root` over tree edges.
    fn explore<W: World + ?Sized>(world: &W, root: BlockPos) -> Self {
        let mut branch = Self::default();
        branch.parents.insert(root, None);
        branch.members.push(root);

        let mut next = 0;
        while let Some(&current) = branch.members.get(next) {
            next += 1;
            let Some(node) = world.node(current) else {
                debug_assert!(false, "tree edge leads to {current}, which holds no lattice node");
                continue;
            };
            for child in node.children() {
                branch.parents.insert(child, Some(current));
                branch.members.push(child);
            }
            branch
                .unused
                .extend(node.unused_edges().iter().map(|dir| (current, dir)));
        }
        branch
    }

    fn contains(&self, pos: BlockPos) -> bool {
        self.parents.contains_key(&pos)
    }

    fn len(&self) -> u32 {
        u32::try_from(self.members.len()).unwrap_or(u32::MAX)
    }

    /// Hang the branch off `edge`, reversing the path from its near end to the
    /// branch root.
    fn reattach<W: World + ?Sized>(&self, world: &mut W, (near, dir): Edge) {
        if let Some(far) = world.node_mut(near.offset(dir)) {
            far.tree_edges.insert(dir.opposite());
        }

        let mut child = near;
        while let Some(parent) = self.parents.get(&child).copied().flatten() {
            let Some(down) = parent.direction_to(child) else {
                debug_assert!(false, "parent {parent} does not touch child {child}");
                break;
            };
            if let Some(node) = world.node_mut(parent) {
                node.tree_edges.remove(down);
            }
            if let Some(node) = world.node_mut(child) {
                node.tree_edges.insert(down.opposite());
            }
            child = parent;
        }
    }

    /// Drop every member out of the network.
    fn release<W: World + ?Sized>(&self, world: &mut W) {
        for &pos in &self.members {
            if let Some(node) = world.node_mut(pos) {
                node.release();
            }
        }
    }
}

/// Whether the member at `pos` is `coordinator` or attached to it.
fn reaches<W: World + ?Sized>(world: &W, pos: BlockPos, coordinator: BlockPos) -> bool {
    match world.occupant(pos) {
        Some(Occupant::Node(node)) => node.coordinator == Some(coordinator),
        Some(Occupant::Coordinator(owner)) => owner.pos() == coordinator,
        None => {
            debug_assert!(false, "adjacency points at empty position {pos}");
            false
        }
    }
}

/// Run the detach protocol for the member at `pos`.
///
/// Call this before removing the member from the world. No-op on a
/// client-side world or when `pos` holds no member.
pub fn detach<W: World + ?Sized>(world: &mut W, pos: BlockPos) -> DetachReport {
    if world.is_client_side() {
        return DetachReport::default();
    }
    match world.occupant(pos) {
        Some(Occupant::Node(_)) => detach_node(world, pos),
        Some(Occupant::Coordinator(_)) => detach_coordinator(world, pos),
        None => DetachReport::default(),
    }
}

fn detach_node<W: World + ?Sized>(world: &mut W, pos: BlockPos) -> DetachReport {
    let Some(node) = world.node(pos) else {
        return DetachReport::default();
    };
    let adjacency = node.adjacency;
    let tree_edges = node.tree_edges;
    let coordinator = node.coordinator;

    // A. Local teardown
    let mut roots = Vec::new();
    for dir in adjacency.iter() {
        let neighbor_pos = pos.offset(dir);
        let back = dir.opposite();
        match world.occupant_mut(neighbor_pos) {
            Some(Occupant::Node(neighbor)) => {
                debug_assert!(neighbor.adjacency.contains(back), "asymmetric adjacency at {pos} {dir}");
                neighbor.disconnect(back);
                if tree_edges.contains(dir) {
                    roots.push(neighbor_pos);
                }
            }
            Some(Occupant::Coordinator(owner)) => {
                debug_assert!(owner.adjacency.contains(back), "asymmetric adjacency at {pos} {dir}");
                owner.adjacency.remove(back);
            }
            None => {
                debug_assert!(false, "adjacency of {pos} points at empty position {neighbor_pos}");
                continue;
            }
        }
        world.mark_dirty(neighbor_pos);
    }
    if let Some(node) = world.node_mut(pos) {
        node.adjacency = DirectionSet::EMPTY;
        node.release();
    }

    let Some(coordinator) = coordinator else {
        return DetachReport::default();
    };
    let size = size_of(world, coordinator);

    // B. Branch classification
    let mut report = match roots.as_slice() {
        [] => DetachReport {
            coordinator: Some(coordinator),
            outcome: DetachOutcome::Leaf,
            removed: 1,
            visited: 0,
        },
        [root] => resolve_single(world, coordinator, *root),
        _ => resolve_many(world, coordinator, &roots),
    };
    report.coordinator = Some(coordinator);

    debug_assert!(report.removed <= size, "size of {coordinator} would underflow");
    let remaining = size.saturating_sub(report.removed);
    update_size(world, coordinator, remaining);

    debug!(
        %pos,
        %coordinator,
        outcome = ?report.outcome,
        removed = report.removed,
        size = remaining,
        "node detached"
    );
    report
}

/// One displaced subtree: reattach through the first qualifying edge or
/// release it.
fn resolve_single<W: World + ?Sized>(
    world: &mut W,
    coordinator: BlockPos,
    root: BlockPos,
) -> DetachReport {
    let branch = Branch::explore(world, root);
    let visited = branch.members.len();

    let witness = branch.unused.iter().copied().find(|&(near, dir)| {
        let far = near.offset(dir);
        !branch.contains(far) && reaches(world, far, coordinator)
    });

    match witness {
        Some(edge) => {
            trace!(%root, near = %edge.0, dir = %edge.1, "branch reattached");
            branch.reattach(world, edge);
            DetachReport {
                coordinator: Some(coordinator),
                outcome: DetachOutcome::Branches {
                    reattached: 1,
                    discarded: 0,
                },
                removed: 1,
                visited,
            }
        }
        None => {
            trace!(%root, members = visited, "branch released");
            branch.release(world);
            DetachReport {
                coordinator: Some(coordinator),
                outcome: DetachOutcome::Branches {
                    reattached: 0,
                    discarded: 1,
                },
                removed: 1 + branch.len(),
                visited,
            }
        }
    }
}

/// Several displaced subtrees that may depend on each other.
fn resolve_many<W: World + ?Sized>(
    world: &mut W,
    coordinator: BlockPos,
    roots: &[BlockPos],
) -> DetachReport {
    let branches: Vec<Branch> = roots.iter().map(|&root| Branch::explore(world, root)).collect();
    let count = branches.len();
    let visited = branches.iter().map(|b| b.members.len()).sum();

    // depend[i][j]: branch i touches branch j; depend[i][i]: branch i reaches
    // the coordinator. candidates[i] keeps the first edge per target branch.
    let mut depend = vec![vec![false; count]; count];
    let mut candidates: Vec<VecDeque<(usize, Edge)>> = vec![VecDeque::new(); count];

    for (i, branch) in branches.iter().enumerate() {
        for &(near, dir) in &branch.unused {
            let far = near.offset(dir);
            if branch.contains(far) {
                continue;
            }
            if let Some(j) = branches.iter().position(|other| other.contains(far)) {
                if !depend[i][j] {
                    depend[i][j] = true;
                    candidates[i].push_back((j, (near, dir)));
                }
                continue;
            }
            if reaches(world, far, coordinator) {
                depend[i][i] = true;
                candidates[i].push_front((i, (near, dir)));
                break;
            }
        }
    }

    // Fixpoint: a branch that reaches the coordinator carries every branch
    // that touches it. via[j] names the branch j was carried by.
    let mut via: Vec<Option<usize>> = (0..count).map(|i| depend[i][i].then_some(i)).collect();
    let mut worklist: VecDeque<usize> = (0..count).collect();
    while let Some(k) = worklist.pop_front() {
        if !depend[k][k] {
            continue;
        }
        for j in 0..count {
            if j != k && depend[j][k] && !depend[j][j] {
                depend[j][j] = true;
                via[j] = Some(k);
                worklist.push_back(j);
            }
        }
    }

    let mut removed = 1;
    let mut reattached = 0;
    let mut discarded = 0;
    for (i, branch) in branches.iter().enumerate() {
        // The witness must lead through the branch that carried this one, so
        // that no two branches end up hanging off each other.
        let witness = via[i].and_then(|k| {
            candidates[i]
                .iter()
                .find(|(target, _)| *target == k)
                .map(|&(_, edge)| edge)
        });
        match witness {
            Some(edge) => {
                trace!(branch = i, near = %edge.0, dir = %edge.1, "branch reattached");
                branch.reattach(world, edge);
                reattached += 1;
            }
            None => {
                debug_assert!(!depend[i][i], "branch {i} reaches the coordinator without a witness");
                trace!(branch = i, members = branch.members.len(), "branch released");
                branch.release(world);
                removed += branch.len();
                discarded += 1;
            }
        }
    }

    DetachReport {
        coordinator: Some(coordinator),
        outcome: DetachOutcome::Branches {
            reattached,
            discarded,
        },
        removed,
        visited,
    }
}

fn detach_coordinator<W: World + ?Sized>(world: &mut W, pos: BlockPos) -> DetachReport {
    let Some(owner) = world.coordinator(pos) else {
        return DetachReport::default();
    };
    let adjacency = owner.adjacency;
    let size = owner.size();

    let mut queue = VecDeque::new();
    for dir in adjacency.iter() {
        let neighbor_pos = pos.offset(dir);
        let Some(neighbor) = world.node_mut(neighbor_pos) else {
            debug_assert!(false, "coordinator adjacency points at {neighbor_pos}, which holds no lattice node");
            continue;
        };
        neighbor.adjacency.remove(dir.opposite());
        if neighbor.coordinator == Some(pos) {
            queue.push_back(neighbor_pos);
        }
        world.mark_dirty(neighbor_pos);
    }

    let mut released = 0;
    let mut visited = 0;
    while let Some(current) = queue.pop_front() {
        let Some(node) = world.node_mut(current) else {
            continue;
        };
        visited += 1;
        if node.coordinator != Some(pos) {
            continue;
        }
        let children: Vec<_> = node.children().collect();
        node.release();
        released += 1;
        queue.extend(children);
    }
    debug_assert_eq!(released, size, "coordinator {pos} size disagrees with its tree");

    if let Some(owner) = world.coordinator_mut(pos) {
        owner.adjacency = DirectionSet::EMPTY;
    }
    update_size(world, pos, 0);

    debug!(%pos, released, "coordinator detached");
    DetachReport {
        coordinator: Some(pos),
        outcome: DetachOutcome::Dissolved,
        removed: released,
        visited,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lifecycle, MemoryWorld, NodeKind};

    fn pos(x: i32, y: i32, z: i32) -> BlockPos {
        BlockPos::new(x, y, z)
    }

    fn build(nodes: &[(i32, i32, i32)], coordinator: (i32, i32, i32)) -> MemoryWorld {
        let mut world = MemoryWorld::new();
        lifecycle::place(&mut world, coordinator.into(), NodeKind::Coordinator).unwrap();
        for &p in nodes {
            lifecycle::place(&mut world, p.into(), NodeKind::Node).unwrap();
        }
        world
    }

    fn size(world: &MemoryWorld, coordinator: BlockPos) -> u32 {
        world.coordinator(coordinator).unwrap().size()
    }

    #[test]
    fn unattached_node_is_noop() {
        let mut world = MemoryWorld::new();
        lifecycle::place(&mut world, pos(0, 0, 0), NodeKind::Node).unwrap();
        lifecycle::place(&mut world, pos(1, 0, 0), NodeKind::Node).unwrap();
        let report = lifecycle::remove(&mut world, pos(0, 0, 0)).unwrap();
        assert_eq!(report, DetachReport::default());
        assert!(world.node(pos(1, 0, 0)).unwrap().adjacency().is_empty());
    }

    #[test]
    fn leaf_removal_decrements_size() {
        let mut world = build(&[(1, 0, 0), (2, 0, 0)], (0, 0, 0));
        let report = lifecycle::remove(&mut world, pos(2, 0, 0)).unwrap();
        assert_eq!(report.outcome, DetachOutcome::Leaf);
        assert_eq!(report.removed, 1);
        assert_eq!(size(&world, pos(0, 0, 0)), 1);
        assert!(world.node(pos(1, 0, 0)).unwrap().tree_edges().is_empty());
        world.verify().unwrap();
    }

    #[test]
    fn chain_without_alternate_path_is_released() {
        // R - A - B - C - D
        let mut world = build(&[(1, 0, 0), (2, 0, 0), (3, 0, 0), (4, 0, 0)], (0, 0, 0));
        let report = lifecycle::remove(&mut world, pos(2, 0, 0)).unwrap();
        assert_eq!(
            report.outcome,
            DetachOutcome::Branches {
                reattached: 0,
                discarded: 1
            }
        );
        assert_eq!(report.removed, 3);
        assert_eq!(size(&world, pos(0, 0, 0)), 1);
        assert!(!world.node(pos(3, 0, 0)).unwrap().is_attached());
        assert!(!world.node(pos(4, 0, 0)).unwrap().is_attached());
        world.verify().unwrap();
    }

    #[test]
    fn chain_with_alternate_edge_reroots() {
        // R - A - B - C - D, with D - E and E attached to R through a detour
        let mut world = build(
            &[
                (1, 0, 0),
                (2, 0, 0),
                (3, 0, 0),
                (4, 0, 0),
                (0, 1, 0),
                (0, 2, 0),
                (1, 2, 0),
                (2, 2, 0),
                (3, 2, 0),
                (4, 2, 0),
                (4, 1, 0),
            ],
            (0, 0, 0),
        );
        assert_eq!(size(&world, pos(0, 0, 0)), 11);

        let report = lifecycle::remove(&mut world, pos(2, 0, 0)).unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(size(&world, pos(0, 0, 0)), 10);
        assert_eq!(world.node(pos(3, 0, 0)).unwrap().coordinator(), Some(pos(0, 0, 0)));
        assert_eq!(world.node(pos(4, 0, 0)).unwrap().coordinator(), Some(pos(0, 0, 0)));
        world.verify().unwrap();
    }

    #[test]
    fn branch_reattaches_through_unused_edge() {
        let mut world = build(&[(1, 0, 0), (1, 1, 0), (0, 1, 0)], (0, 0, 0));
        // (0,1,0) hangs off the coordinator and touches (1,1,0) sideways
        let report = lifecycle::remove(&mut world, pos(1, 0, 0)).unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(size(&world, pos(0, 0, 0)), 2);
        assert_eq!(world.node(pos(0, 1, 0)).unwrap().tree_edges(), DirectionSet::from(Direction::East));
        assert!(world.node(pos(1, 1, 0)).unwrap().tree_edges().is_empty());
        world.verify().unwrap();
    }

    #[test]
    fn branch_reattaches_directly_to_coordinator() {
        // R - A - B - C with C touching R again from the side
        let mut world = build(&[(0, 1, 0), (1, 1, 0), (1, 0, 0)], (0, 0, 0));
        assert_eq!(world.node(pos(1, 1, 0)).unwrap().tree_edges(), DirectionSet::from(Direction::Down));

        let report = lifecycle::remove(&mut world, pos(0, 1, 0)).unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(size(&world, pos(0, 0, 0)), 2);
        // The former leaf is now the branch root, under the coordinator
        assert_eq!(world.node(pos(1, 0, 0)).unwrap().tree_edges(), DirectionSet::from(Direction::Up));
        assert!(world.node(pos(1, 1, 0)).unwrap().tree_edges().is_empty());
        world.verify().unwrap();
    }

    #[test]
    fn cross_dependent_branches_both_survive() {
        // X at (2,0,0) has two children: one toward +z, one toward -z.
        // Branch 1 touches branch 2 only; branch 2 touches the network.
        let mut world = MemoryWorld::new();
        lifecycle::place(&mut world, pos(0, 0, 0), NodeKind::Coordinator).unwrap();
        for p in [(1, 0, 0), (2, 0, 0), (2, 0, 1), (2, 0, -1)] {
            lifecycle::place(&mut world, p.into(), NodeKind::Node).unwrap();
        }
        // Branch 2 grows over to sit above the coordinator
        for p in [(2, 1, -1), (1, 1, -1), (0, 1, -1), (0, 1, 0)] {
            lifecycle::place(&mut world, p.into(), NodeKind::Node).unwrap();
        }
        // Branch 1 grows up and over to touch branch 2
        for p in [(2, 1, 1), (2, 2, 1), (2, 2, 0), (2, 2, -1)] {
            lifecycle::place(&mut world, p.into(), NodeKind::Node).unwrap();
        }
        world.verify().unwrap();
        let before = size(&world, pos(0, 0, 0));

        let report = lifecycle::remove(&mut world, pos(2, 0, 0)).unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(size(&world, pos(0, 0, 0)), before - 1);
        for node in world.nodes() {
            assert!(node.is_attached(), "{} was released", node.pos());
        }
        world.verify().unwrap();
    }

    #[test]
    fn mutually_touching_branches_pick_acyclic_witnesses() {
        // X at the origin has three branches. Only the east one climbs back
        // to the stem; the one below touches both others.
        let mut world = MemoryWorld::new();
        lifecycle::place(&mut world, pos(0, 5, 0), NodeKind::Coordinator).unwrap();
        // Stem from the coordinator down to X
        for y in (1..5).rev() {
            lifecycle::place(&mut world, pos(0, y, 0), NodeKind::Node).unwrap();
        }
        lifecycle::place(&mut world, pos(0, 0, 0), NodeKind::Node).unwrap();
        // Children of X: west, east, down
        lifecycle::place(&mut world, pos(-1, 0, 0), NodeKind::Node).unwrap();
        lifecycle::place(&mut world, pos(1, 0, 0), NodeKind::Node).unwrap();
        lifecycle::place(&mut world, pos(0, -1, 0), NodeKind::Node).unwrap();
        // Close the ring below X: west - down - east
        lifecycle::place(&mut world, pos(-1, -1, 0), NodeKind::Node).unwrap();
        lifecycle::place(&mut world, pos(1, -1, 0), NodeKind::Node).unwrap();
        // Only the east branch climbs back to the stem
        lifecycle::place(&mut world, pos(1, 1, 0), NodeKind::Node).unwrap();
        world.verify().unwrap();
        let before = size(&world, pos(0, 5, 0));

        lifecycle::remove(&mut world, pos(0, 0, 0)).unwrap();
        assert_eq!(size(&world, pos(0, 5, 0)), before - 1);
        world.verify().unwrap();
    }

    #[test]
    fn disconnected_branches_released_with_exact_count() {
        // A plus sign around X: each arm is its own branch with no way back
        let mut world = MemoryWorld::new();
        lifecycle::place(&mut world, pos(0, 0, 0), NodeKind::Coordinator).unwrap();
        lifecycle::place(&mut world, pos(1, 0, 0), NodeKind::Node).unwrap();
        for p in [(2, 0, 0), (2, 0, 1), (2, 0, 2), (2, 0, -1), (3, 0, 0)] {
            lifecycle::place(&mut world, p.into(), NodeKind::Node).unwrap();
        }
        assert_eq!(size(&world, pos(0, 0, 0)), 6);

        let report = lifecycle::remove(&mut world, pos(2, 0, 0)).unwrap();
        assert_eq!(
            report.outcome,
            DetachOutcome::Branches {
                reattached: 0,
                discarded: 3
            }
        );
        assert_eq!(report.removed, 5);
        assert_eq!(size(&world, pos(0, 0, 0)), 1);
        world.verify().unwrap();
    }

    #[test]
    fn coordinator_removal_dissolves_network() {
        let mut world = build(&[(1, 0, 0), (2, 0, 0), (0, 1, 0), (0, 1, 1)], (0, 0, 0));
        let report = lifecycle::remove(&mut world, pos(0, 0, 0)).unwrap();
        assert_eq!(report.outcome, DetachOutcome::Dissolved);
        assert_eq!(report.removed, 4);
        for node in world.nodes() {
            assert!(!node.is_attached());
            assert!(node.tree_edges().is_empty());
        }
        assert!(!world.node(pos(1, 0, 0)).unwrap().adjacency().contains(Direction::West));
        world.verify().unwrap();
    }

    #[test]
    fn removal_marks_neighbors_dirty() {
        let mut world = build(&[(1, 0, 0), (2, 0, 0)], (0, 0, 0));
        world.take_dirty();
        lifecycle::remove(&mut world, pos(1, 0, 0)).unwrap();
        assert_eq!(world.take_dirty(), vec![pos(0, 0, 0), pos(2, 0, 0)]);
    }
}
