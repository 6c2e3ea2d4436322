//! Integer lattice positions.

use std::ops::{Add, Neg, Sub};

use crate::Direction;

/// A position on the cubic lattice.
///
/// Positions are identity keys: a network node keeps the position it was
/// created at for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockPos {
    /// East-west axis
    pub x: i32,
    /// Vertical axis
    pub y: i32,
    /// North-south axis
    pub z: i32,
}

impl BlockPos {
    /// Origin of the coordinate system.
    pub const ORIGIN: Self = Self { x: 0, y: 0, z: 0 };

    /// Create a new position.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The neighbouring position one step in `dir`.
    #[inline]
    pub fn offset(self, dir: Direction) -> Self {
        self + dir.vector()
    }

    /// The direction leading from `self` to `other`, if they share a face.
    pub fn direction_to(self, other: Self) -> Option<Direction> {
        let diff = other - self;
        Direction::ALL.into_iter().find(|dir| dir.vector() == diff)
    }
}

impl Add for BlockPos {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Sub for BlockPos {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl Neg for BlockPos {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

impl std::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl From<(i32, i32, i32)> for BlockPos {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Self { x, y, z }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_is_zero() {
        let origin = BlockPos::ORIGIN;
        assert_eq!((origin.x, origin.y, origin.z), (0, 0, 0));
        assert_eq!(origin, BlockPos::default());
    }

    #[test]
    fn offset_then_opposite_returns() {
        let pos = BlockPos::new(-4, 70, 9);
        for dir in Direction::ALL {
            assert_eq!(pos.offset(dir).offset(dir.opposite()), pos);
            assert_eq!(pos.direction_to(pos.offset(dir)), Some(dir));
        }
    }

    #[test]
    fn addition_subtraction() {
        let a = BlockPos::new(1, 2, 3);
        let b = BlockPos::new(4, -1, 2);

        assert_eq!(a + b, BlockPos::new(5, 1, 5));
        assert_eq!(a - b, BlockPos::new(-3, 3, 1));
        assert_eq!(a + (-b), a - b);
    }

    #[test]
    fn display_format() {
        assert_eq!(BlockPos::new(1, -2, 3).to_string(), "(1, -2, 3)");
    }
}
