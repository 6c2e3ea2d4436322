//! Lattice Network Simulator
//!
//! Drives a [`MemoryWorld`](lattice_net::MemoryWorld) through seeded random
//! placements, removals and region reloads, checking every network after each
//! step.
//!
//! # Usage
//!
//! ```
//! use lattice_sim::{Simulation, SimulationConfig};
//!
//! let mut sim = Simulation::new(SimulationConfig::small().with_seed(7)).unwrap();
//! sim.run().unwrap();
//! assert_eq!(sim.snapshot().frame, 200);
//! ```

mod config;
mod events;
mod simulation;

pub use config::SimulationConfig;
pub use events::{CoordinatorState, NetworkEvent, NetworkSnapshot};
pub use simulation::Simulation;
