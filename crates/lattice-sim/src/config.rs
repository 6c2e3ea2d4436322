//! Simulation configuration.

use lattice_net::CapacityConfig;
use serde::{Deserialize, Serialize};

/// Configuration for the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for deterministic simulation
    pub seed: u64,
    /// Number of steps [`Simulation::run`](crate::Simulation::run) performs
    pub steps: u64,
    /// Half-width of the cube events are drawn from
    pub extent: i32,
    /// Coordinators placed before the first step
    pub coordinators: usize,
    /// Probability that a step removes a member
    pub removal_probability: f64,
    /// Probability that a step unloads and reloads a region
    pub reload_probability: f64,
    /// Capacity formulas for placed coordinators
    pub capacity: CapacityConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            steps: 1_000,
            extent: 6,
            coordinators: 2,
            removal_probability: 0.3,
            reload_probability: 0.02,
            capacity: CapacityConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// A few hundred steps in a tight cube with a single coordinator.
    pub fn small() -> Self {
        Self {
            steps: 200,
            extent: 3,
            coordinators: 1,
            ..Self::default()
        }
    }

    /// Long run in a dense cube with frequent reloads.
    pub fn stress() -> Self {
        Self {
            steps: 20_000,
            extent: 8,
            coordinators: 4,
            removal_probability: 0.4,
            reload_probability: 0.05,
            ..Self::default()
        }
    }

    /// Look up a preset by name: `default`, `small` or `stress`.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default()),
            "small" => Some(Self::small()),
            "stress" => Some(Self::stress()),
            _ => None,
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_steps(mut self, steps: u64) -> Self {
        self.steps = steps;
        self
    }

    #[must_use]
    pub fn with_coordinators(mut self, coordinators: usize) -> Self {
        self.coordinators = coordinators;
        self
    }

    /// Set the removal and reload probabilities, clamped to `0.0..=1.0`.
    #[must_use]
    pub fn with_probabilities(mut self, removal: f64, reload: f64) -> Self {
        self.removal_probability = removal.clamp(0.0, 1.0);
        self.reload_probability = reload.clamp(0.0, 1.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let config: SimulationConfig = serde_json::from_str(r#"{"seed":9,"extent":2}"#).unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.extent, 2);
        assert_eq!(config.steps, SimulationConfig::default().steps);
        assert_eq!(config.capacity, CapacityConfig::default());
    }

    #[test]
    fn presets_by_name() {
        assert_eq!(SimulationConfig::preset("stress").unwrap().extent, 8);
        assert_eq!(SimulationConfig::preset("small").unwrap().coordinators, 1);
        assert_eq!(
            SimulationConfig::preset("default").unwrap().steps,
            SimulationConfig::default().steps
        );
        assert!(SimulationConfig::preset("config.json").is_none());
    }

    #[test]
    fn probabilities_are_clamped() {
        let config = SimulationConfig::default().with_probabilities(1.5, -0.2);
        assert_eq!(config.removal_probability, 1.0);
        assert_eq!(config.reload_probability, 0.0);
    }
}
