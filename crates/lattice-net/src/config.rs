//! Capacity configuration.
//!
//! A coordinator's energy capacity and I/O rates are monotonic step functions
//! of its size. The constants live here so hosts can tune them without
//! touching the protocols.

use serde::{Deserialize, Serialize};

use crate::coordinator::Capacity;

/// Constants for the capacity formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityConfig {
    /// Energy stored per member, the coordinator counting as one member.
    pub storage_per_node: u64,

    /// Output rate of a coordinator with no attached nodes.
    pub base_output: u64,

    /// Extra output rate per attached node.
    pub extra_output_per_node: u64,

    /// Input rate while the size is below `medium_tier_size`.
    pub low_input: u64,

    /// Input rate while the size is below `high_tier_size`.
    pub medium_input: u64,

    /// Input rate from `high_tier_size` upward.
    pub high_input: u64,

    /// Size at which the medium input tier starts.
    pub medium_tier_size: u32,

    /// Size at which the high input tier starts.
    pub high_tier_size: u32,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            storage_per_node: 1_000_000,
            base_output: 16,
            extra_output_per_node: 8,
            low_input: 32,
            medium_input: 128,
            high_input: 512,
            medium_tier_size: 32,
            high_tier_size: 128,
        }
    }
}

impl CapacityConfig {
    /// Set the energy stored per member.
    #[must_use]
    pub fn with_storage_per_node(mut self, storage: u64) -> Self {
        self.storage_per_node = storage;
        self
    }

    /// Set the output formula constants.
    #[must_use]
    pub fn with_output(mut self, base: u64, per_node: u64) -> Self {
        self.base_output = base;
        self.extra_output_per_node = per_node;
        self
    }

    /// Set the sizes at which the medium and high input tiers start.
    #[must_use]
    pub fn with_tier_sizes(mut self, medium: u32, high: u32) -> Self {
        self.medium_tier_size = medium;
        self.high_tier_size = high;
        self
    }

    /// Maximum stored energy for a coordinator with `size` attached nodes.
    ///
    /// Saturates instead of overflowing.
    pub fn max_storage(&self, size: u32) -> u64 {
        (u64::from(size) + 1).saturating_mul(self.storage_per_node)
    }

    /// Maximum output rate for a coordinator with `size` attached nodes.
    pub fn max_output(&self, size: u32) -> u64 {
        self.base_output
            .saturating_add(u64::from(size).saturating_mul(self.extra_output_per_node))
    }

    /// Maximum input rate for a coordinator with `size` attached nodes.
    pub fn max_input(&self, size: u32) -> u64 {
        if size < self.medium_tier_size {
            self.low_input
        } else if size < self.high_tier_size {
            self.medium_input
        } else {
            self.high_input
        }
    }

    /// All derived figures for `size`.
    pub fn capacity(&self, size: u32) -> Capacity {
        Capacity {
            max_storage: self.max_storage(size),
            max_output: self.max_output(size),
            max_input: self.max_input(size),
        }
    }
}
