//! Face directions and direction bitmasks.

use std::ops::{BitAnd, BitOr, Not, Sub};

use thiserror::Error;

use crate::{BlockPos, DIRECTION_MASK};

/// One of the 6 face directions of the cubic lattice.
///
/// The discriminant is the direction's bit index inside a [`DirectionSet`].
/// Opposite directions differ in the lowest bit only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Direction {
    Down = 0,
    Up = 1,
    North = 2,
    South = 3,
    West = 4,
    East = 5,
}

impl Direction {
    /// All directions in index order.
    pub const ALL: [Self; 6] = [
        Self::Down,
        Self::Up,
        Self::North,
        Self::South,
        Self::West,
        Self::East,
    ];

    /// Direction with the given bit index.
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Down),
            1 => Some(Self::Up),
            2 => Some(Self::North),
            3 => Some(Self::South),
            4 => Some(Self::West),
            5 => Some(Self::East),
            _ => None,
        }
    }

    /// Bit index of this direction.
    #[inline]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// The single-bit mask for this direction.
    #[inline]
    pub const fn bit(self) -> u8 {
        1 << self.index()
    }

    /// The direction pointing the other way.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Down => Self::Up,
            Self::Up => Self::Down,
            Self::North => Self::South,
            Self::South => Self::North,
            Self::West => Self::East,
            Self::East => Self::West,
        }
    }

    /// Unit offset of this direction.
    pub const fn vector(self) -> BlockPos {
        match self {
            Self::Down => BlockPos::new(0, -1, 0),
            Self::Up => BlockPos::new(0, 1, 0),
            Self::North => BlockPos::new(0, 0, -1),
            Self::South => BlockPos::new(0, 0, 1),
            Self::West => BlockPos::new(-1, 0, 0),
            Self::East => BlockPos::new(1, 0, 0),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Down => "down",
            Self::Up => "up",
            Self::North => "north",
            Self::South => "south",
            Self::West => "west",
            Self::East => "east",
        };
        f.write_str(name)
    }
}

/// A byte had bits set outside the 6 direction bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid direction bits: {0:#010b}")]
pub struct InvalidDirectionBits(pub u8);

/// A set of directions, one bit per [`Direction`].
///
/// Serialises as a single byte.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "u8", into = "u8")
)]
pub struct DirectionSet(u8);

impl DirectionSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// All 6 directions.
    pub const ALL: Self = Self(DIRECTION_MASK);

    /// Build a set from raw bits, rejecting bits above the 6 directions.
    pub const fn from_bits(bits: u8) -> Result<Self, InvalidDirectionBits> {
        if bits & !DIRECTION_MASK != 0 {
            Err(InvalidDirectionBits(bits))
        } else {
            Ok(Self(bits))
        }
    }

    /// Build a set from raw bits, dropping anything above the 6 directions.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & DIRECTION_MASK)
    }

    /// Raw bits.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn contains(self, dir: Direction) -> bool {
        self.0 & dir.bit() != 0
    }

    #[inline]
    pub fn insert(&mut self, dir: Direction) {
        self.0 |= dir.bit();
    }

    #[inline]
    pub fn remove(&mut self, dir: Direction) {
        self.0 &= !dir.bit();
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Check that every direction of `self` is also in `other`.
    #[inline]
    pub const fn is_subset(self, other: Self) -> bool {
        self.0 & !other.0 == 0
    }

    /// Directions in index order.
    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |dir| self.contains(*dir))
    }
}

impl From<Direction> for DirectionSet {
    fn from(dir: Direction) -> Self {
        Self(dir.bit())
    }
}

impl FromIterator<Direction> for DirectionSet {
    fn from_iter<I: IntoIterator<Item = Direction>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for dir in iter {
            set.insert(dir);
        }
        set
    }
}

impl TryFrom<u8> for DirectionSet {
    type Error = InvalidDirectionBits;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        Self::from_bits(bits)
    }
}

impl From<DirectionSet> for u8 {
    fn from(set: DirectionSet) -> Self {
        set.0
    }
}

impl BitOr for DirectionSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for DirectionSet {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Sub for DirectionSet {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 & !rhs.0)
    }
}

impl Not for DirectionSet {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0 & DIRECTION_MASK)
    }
}

impl std::fmt::Debug for DirectionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
