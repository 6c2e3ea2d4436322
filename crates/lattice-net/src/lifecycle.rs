//! Placing and removing network members.
//!
//! These wrap the protocols with the world bookkeeping a host would otherwise
//! do by hand: attach runs after the member is stored, detach runs before it
//! is taken out.

use lattice_topology::BlockPos;

use crate::attach::{attach, AttachMode, AttachReport};
use crate::coordinator::Coordinator;
use crate::detach::{detach, DetachReport};
use crate::error::{Error, Result};
use crate::node::LatticeNode;
use crate::persist::NodeKind;
use crate::world::{Occupant, World};

/// Store a new member at `pos` and attach it.
pub fn place<W: World + ?Sized>(world: &mut W, pos: BlockPos, kind: NodeKind) -> Result<AttachReport> {
    if world.occupant(pos).is_some() {
        return Err(Error::Occupied(pos));
    }
    let occupant = match kind {
        NodeKind::Node => Occupant::Node(LatticeNode::new(pos)),
        NodeKind::Coordinator => {
            Occupant::Coordinator(Coordinator::with_config(pos, world.capacity_config()))
        }
    };
    world.insert_occupant(occupant);
    world.mark_dirty(pos);
    Ok(attach(world, pos, AttachMode::Placed))
}

/// Detach the member at `pos` and take it out of the world.
pub fn remove<W: World + ?Sized>(world: &mut W, pos: BlockPos) -> Result<DetachReport> {
    if world.occupant(pos).is_none() {
        return Err(Error::Vacant(pos));
    }
    let report = detach(world, pos);
    world.remove_occupant(pos);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryWorld;

    #[test]
    fn place_rejects_occupied_position() {
        let mut world = MemoryWorld::new();
        place(&mut world, BlockPos::ORIGIN, NodeKind::Node).unwrap();
        let err = place(&mut world, BlockPos::ORIGIN, NodeKind::Coordinator).unwrap_err();
        assert!(matches!(err, Error::Occupied(pos) if pos == BlockPos::ORIGIN));
        assert!(world.node(BlockPos::ORIGIN).is_some());
    }

    #[test]
    fn remove_rejects_vacant_position() {
        let mut world = MemoryWorld::new();
        let err = remove(&mut world, BlockPos::new(3, 3, 3)).unwrap_err();
        assert!(matches!(err, Error::Vacant(_)));
    }

    #[test]
    fn placed_coordinator_uses_world_capacity() {
        let config = crate::CapacityConfig::default().with_storage_per_node(10);
        let mut world = MemoryWorld::new().with_capacity(config);
        place(&mut world, BlockPos::ORIGIN, NodeKind::Coordinator).unwrap();
        place(&mut world, BlockPos::new(0, 1, 0), NodeKind::Node).unwrap();

        let capacity = world.coordinator(BlockPos::ORIGIN).unwrap().capacity();
        assert_eq!(capacity.max_storage, 20);
    }

    #[test]
    fn remove_takes_member_out() {
        let mut world = MemoryWorld::new();
        place(&mut world, BlockPos::ORIGIN, NodeKind::Coordinator).unwrap();
        place(&mut world, BlockPos::new(1, 0, 0), NodeKind::Node).unwrap();
        remove(&mut world, BlockPos::new(1, 0, 0)).unwrap();
        assert!(!world.contains(BlockPos::new(1, 0, 0)));
        assert!(world.coordinator(BlockPos::ORIGIN).unwrap().adjacency().is_empty());
        assert_eq!(world.coordinator(BlockPos::ORIGIN).unwrap().size(), 0);
    }
}
