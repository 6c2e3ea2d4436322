//! Lattice Topology
//!
//! Integer positions on a 6-connected cubic lattice and the face directions
//! that link them.
//!
//! # Directions
//!
//! Every position has exactly 6 face neighbours, one per [`Direction`]. The
//! directions are ordered so that a direction and its opposite differ only in
//! the lowest bit of their index:
//!
//! | index | direction | offset        |
//! |-------|-----------|---------------|
//! | 0     | Down      | ( 0, -1,  0)  |
//! | 1     | Up        | ( 0, +1,  0)  |
//! | 2     | North     | ( 0,  0, -1)  |
//! | 3     | South     | ( 0,  0, +1)  |
//! | 4     | West      | (-1,  0,  0)  |
//! | 5     | East      | (+1,  0,  0)  |
//!
//! # Direction Sets
//!
//! A [`DirectionSet`] packs one bit per direction into a byte. It is the unit
//! that network nodes use to record which neighbours exist and which edges are
//! part of a spanning tree.

mod direction;
mod pos;

pub use direction::{Direction, DirectionSet, InvalidDirectionBits};
pub use pos::BlockPos;

/// Number of face neighbours per lattice position (invariant: always 6)
pub const FACE_NEIGHBORS: usize = 6;

/// Bits of a [`DirectionSet`] that may be set.
pub const DIRECTION_MASK: u8 = (1 << FACE_NEIGHBORS) - 1;

// Compile-time assertion of the 6-neighbour invariant
const _: () = assert!(DIRECTION_MASK.count_ones() as usize == FACE_NEIGHBORS);

/// Positions of the 6 face neighbours of `pos`, in [`Direction::ALL`] order.
pub fn neighbors_of(pos: BlockPos) -> [BlockPos; FACE_NEIGHBORS] {
    Direction::ALL.map(|dir| pos.offset(dir))
}
