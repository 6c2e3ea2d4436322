//! Network events for the simulation timeline.

use lattice_net::{BlockPos, Capacity, DetachOutcome, MemoryWorld, NodeKind};
use serde::{Deserialize, Serialize};

/// Events recorded while the simulation runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NetworkEvent {
    /// A member was placed and attached
    Placed {
        pos: BlockPos,
        kind: NodeKind,
        coordinator: Option<BlockPos>,
        absorbed: u32,
        frame: u64,
    },

    /// A member was detached and removed
    Removed {
        pos: BlockPos,
        kind: NodeKind,
        coordinator: Option<BlockPos>,
        removed: u32,
        reattached: usize,
        discarded: usize,
        frame: u64,
    },

    /// A region was saved, unloaded and loaded back
    Reloaded {
        members: usize,
        absorbed: u32,
        frame: u64,
    },
}

impl NetworkEvent {
    /// Get the frame number for this event.
    pub fn frame(&self) -> u64 {
        match self {
            NetworkEvent::Placed { frame, .. } => *frame,
            NetworkEvent::Removed { frame, .. } => *frame,
            NetworkEvent::Reloaded { frame, .. } => *frame,
        }
    }

    /// Branch counts of a detach outcome, as `(reattached, discarded)`.
    pub(crate) fn branch_counts(outcome: DetachOutcome) -> (usize, usize) {
        match outcome {
            DetachOutcome::Branches {
                reattached,
                discarded,
            } => (reattached, discarded),
            _ => (0, 0),
        }
    }
}

/// State of one coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorState {
    pub pos: BlockPos,
    pub size: u32,
    pub capacity: Capacity,
}

/// A summary of the world at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub frame: u64,
    pub coordinators: Vec<CoordinatorState>,
    pub node_count: usize,
    pub attached_count: usize,
}

impl NetworkSnapshot {
    /// Summarise `world` at `frame`.
    pub fn capture(world: &MemoryWorld, frame: u64) -> Self {
        let mut coordinators: Vec<_> = world
            .coordinators()
            .map(|c| CoordinatorState {
                pos: c.pos(),
                size: c.size(),
                capacity: c.capacity(),
            })
            .collect();
        coordinators.sort_by_key(|c| c.pos);

        Self {
            frame,
            coordinators,
            node_count: world.nodes().count(),
            attached_count: world.nodes().filter(|n| n.is_attached()).count(),
        }
    }
}
