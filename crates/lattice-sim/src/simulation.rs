//! Seeded network simulation with event recording.

use lattice_net::{
    load_region, place, remove, unload_region, BlockPos, MemoryWorld, NodeKind, Result, World,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::SimulationConfig;
use crate::events::{NetworkEvent, NetworkSnapshot};

/// Attempts at finding a free position before a placement step gives up.
const PLACEMENT_ATTEMPTS: usize = 8;

/// Drives a world through random events and records them.
pub struct Simulation {
    config: SimulationConfig,
    world: MemoryWorld,
    rng: StdRng,
    events: Vec<NetworkEvent>,
    current_frame: u64,
}

impl Simulation {
    /// Create a simulation and place its initial coordinators.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let mut sim = Self {
            world: MemoryWorld::new().with_capacity(config.capacity),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            events: Vec::new(),
            current_frame: 0,
        };
        for _ in 0..sim.config.coordinators {
            sim.place_random(NodeKind::Coordinator)?;
        }
        Ok(sim)
    }

    /// Run the configured number of steps.
    pub fn run(&mut self) -> Result<()> {
        for _ in 0..self.config.steps {
            self.step()?;
        }
        let snapshot = self.snapshot();
        info!(
            frames = snapshot.frame,
            nodes = snapshot.node_count,
            attached = snapshot.attached_count,
            events = self.events.len(),
            "simulation finished"
        );
        Ok(())
    }

    /// Perform one random event and check the world afterwards.
    pub fn step(&mut self) -> Result<()> {
        let roll: f64 = self.rng.gen();
        let reload = self.config.reload_probability;
        let removal = reload + self.config.removal_probability;

        if roll < reload && !self.world.is_empty() {
            self.reload_region()?;
        } else if roll < removal && !self.world.is_empty() {
            self.remove_random()?;
        } else if self.world.coordinators().count() < self.config.coordinators {
            self.place_random(NodeKind::Coordinator)?;
        } else {
            self.place_random(NodeKind::Node)?;
        }

        self.world.verify()?;
        self.current_frame += 1;
        Ok(())
    }

    fn random_pos(&mut self) -> BlockPos {
        let extent = self.config.extent;
        BlockPos::new(
            self.rng.gen_range(-extent..=extent),
            self.rng.gen_range(-extent..=extent),
            self.rng.gen_range(-extent..=extent),
        )
    }

    fn place_random(&mut self, kind: NodeKind) -> Result<()> {
        for _ in 0..PLACEMENT_ATTEMPTS {
            let pos = self.random_pos();
            if self.world.contains(pos) {
                continue;
            }
            let report = place(&mut self.world, pos, kind)?;
            self.events.push(NetworkEvent::Placed {
                pos,
                kind,
                coordinator: report.coordinator,
                absorbed: report.absorbed,
                frame: self.current_frame,
            });
            return Ok(());
        }
        debug!(frame = self.current_frame, "no free position found");
        Ok(())
    }

    fn remove_random(&mut self) -> Result<()> {
        let positions = self.world.positions();
        let Some(&pos) = positions.choose(&mut self.rng) else {
            return Ok(());
        };
        let kind = if self.world.coordinator(pos).is_some() {
            NodeKind::Coordinator
        } else {
            NodeKind::Node
        };
        let report = remove(&mut self.world, pos)?;
        let (reattached, discarded) = NetworkEvent::branch_counts(report.outcome);
        self.events.push(NetworkEvent::Removed {
            pos,
            kind,
            coordinator: report.coordinator,
            removed: report.removed,
            reattached,
            discarded,
            frame: self.current_frame,
        });
        Ok(())
    }

    /// Unload every member on one side of a random plane and load it back in
    /// shuffled order.
    fn reload_region(&mut self) -> Result<()> {
        let pivot = self.rng.gen_range(-self.config.extent..=self.config.extent);
        let region: Vec<_> = self
            .world
            .positions()
            .into_iter()
            .filter(|pos| pos.x >= pivot)
            .collect();

        let mut records = unload_region(&mut self.world, &region)?;
        records.shuffle(&mut self.rng);
        let report = load_region(&mut self.world, &records)?;

        debug!(pivot, members = report.loaded, absorbed = report.absorbed, "region reloaded");
        self.events.push(NetworkEvent::Reloaded {
            members: report.loaded,
            absorbed: report.absorbed,
            frame: self.current_frame,
        });
        Ok(())
    }

    /// Get all recorded events.
    pub fn events(&self) -> &[NetworkEvent] {
        &self.events
    }

    /// Get the number of events recorded.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn world(&self) -> &MemoryWorld {
        &self.world
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Get a snapshot of the world at the current frame.
    pub fn snapshot(&self) -> NetworkSnapshot {
        NetworkSnapshot::capture(&self.world, self.current_frame)
    }
}
