//! Saving and restoring network members.
//!
//! Only the adjacency mask is persisted. Coordinator membership, tree edges,
//! and sizes are rebuilt by running the attach protocol in
//! [`AttachMode::Loaded`] over every restored member.
//!
//! Records written before adjacency was persisted carry no `adjacency` field.
//! [`load_region`] recomputes their adjacency from the occupied neighbours and
//! marks them dirty so the next save writes the new format.
//!
//! Reload is idempotent as long as every connected component holds at most one
//! coordinator. Ownership is not persisted, so with several coordinators in one
//! component each node joins whichever network reaches it first and the split
//! depends on load order. The total number of attached nodes is unchanged.

use std::collections::HashSet;

use lattice_topology::{BlockPos, DirectionSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::attach::{attach, probe_occupied, AttachMode};
use crate::coordinator::Coordinator;
use crate::detach::detach;
use crate::error::{Error, Result};
use crate::node::LatticeNode;
use crate::world::{Occupant, World};

/// Kind of network member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Node,
    Coordinator,
}

/// Persisted adjacency of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<DirectionSet>", into = "Option<DirectionSet>")]
pub enum Adjacency {
    /// Saved by a format that did not record adjacency.
    #[default]
    Unknown,
    Known(DirectionSet),
}

impl Adjacency {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub fn known(&self) -> Option<DirectionSet> {
        match self {
            Self::Unknown => None,
            Self::Known(bits) => Some(*bits),
        }
    }
}

impl From<Option<DirectionSet>> for Adjacency {
    fn from(bits: Option<DirectionSet>) -> Self {
        bits.map_or(Self::Unknown, Self::Known)
    }
}

impl From<Adjacency> for Option<DirectionSet> {
    fn from(adjacency: Adjacency) -> Self {
        adjacency.known()
    }
}

/// One persisted member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedNode {
    pub pos: BlockPos,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Adjacency::is_unknown")]
    pub adjacency: Adjacency,
}

impl SavedNode {
    /// Snapshot of a live member.
    pub fn from_occupant(occupant: &Occupant) -> Self {
        let kind = match occupant {
            Occupant::Node(_) => NodeKind::Node,
            Occupant::Coordinator(_) => NodeKind::Coordinator,
        };
        Self {
            pos: occupant.pos(),
            kind,
            adjacency: Adjacency::Known(occupant.adjacency()),
        }
    }

    fn into_occupant<W: World + ?Sized>(self, world: &W) -> Occupant {
        let bits = self.adjacency.known().unwrap_or(DirectionSet::EMPTY);
        match self.kind {
            NodeKind::Node => Occupant::Node(LatticeNode::with_adjacency(self.pos, bits)),
            NodeKind::Coordinator => Occupant::Coordinator(Coordinator::with_adjacency(
                self.pos,
                bits,
                world.capacity_config(),
            )),
        }
    }
}

/// What a region load did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    /// Members inserted into the world.
    pub loaded: usize,
    /// Members whose adjacency was recomputed from a legacy record.
    pub migrated: usize,
    /// Lattice nodes that joined a network while loading.
    pub absorbed: u32,
}

/// Snapshot the members at `positions`.
pub fn save_all<W: World + ?Sized>(world: &W, positions: &[BlockPos]) -> Result<Vec<SavedNode>> {
    positions
        .iter()
        .map(|&pos| {
            world
                .occupant(pos)
                .map(SavedNode::from_occupant)
                .ok_or(Error::Vacant(pos))
        })
        .collect()
}

/// Save a region and take it out of the world.
///
/// Every member is snapshotted before any of them is detached, so adjacency
/// inside the region survives in the records.
pub fn unload_region<W: World + ?Sized>(
    world: &mut W,
    positions: &[BlockPos],
) -> Result<Vec<SavedNode>> {
    let records = save_all(world, positions)?;
    for &pos in positions {
        detach(world, pos);
        world.remove_occupant(pos);
    }
    debug!(count = records.len(), "region unloaded");
    Ok(records)
}

/// Restore a region from saved records and rebuild its networks.
///
/// Fails without touching the world if any record targets an occupied
/// position or two records share one.
pub fn load_region<W: World + ?Sized>(world: &mut W, records: &[SavedNode]) -> Result<LoadReport> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if world.occupant(record.pos).is_some() || !seen.insert(record.pos) {
            return Err(Error::Occupied(record.pos));
        }
    }

    let mut report = LoadReport {
        loaded: records.len(),
        ..LoadReport::default()
    };
    for record in records {
        let occupant = record.clone().into_occupant(world);
        world.insert_occupant(occupant);
    }
    if world.is_client_side() {
        return Ok(report);
    }

    for record in records.iter().filter(|r| r.adjacency.is_unknown()) {
        migrate(world, record.pos);
        report.migrated += 1;
    }

    for record in records {
        report.absorbed += attach(world, record.pos, AttachMode::Loaded).absorbed;
    }

    if report.migrated > 0 {
        info!(migrated = report.migrated, "recomputed adjacency for legacy records");
    }
    debug!(loaded = report.loaded, absorbed = report.absorbed, "region loaded");
    Ok(report)
}

/// Recompute the adjacency of a legacy member from its neighbours.
fn migrate<W: World + ?Sized>(world: &mut W, pos: BlockPos) {
    let bits = probe_occupied(world, pos);
    match world.occupant_mut(pos) {
        Some(Occupant::Node(node)) => node.adjacency = bits,
        Some(Occupant::Coordinator(owner)) => owner.adjacency = bits,
        None => return,
    }
    for dir in bits.iter() {
        let neighbor = pos.offset(dir);
        match world.occupant_mut(neighbor) {
            Some(Occupant::Node(node)) => node.adjacency.insert(dir.opposite()),
            Some(Occupant::Coordinator(owner)) => owner.adjacency.insert(dir.opposite()),
            None => continue,
        }
        world.mark_dirty(neighbor);
    }
    world.mark_dirty(pos);
}

/// Encode records as JSON.
pub fn encode(records: &[SavedNode]) -> Result<String> {
    Ok(serde_json::to_string(records)?)
}

/// Decode records from JSON.
pub fn decode(json: &str) -> Result<Vec<SavedNode>> {
    Ok(serde_json::from_str(json)?)
}
