//! Simulation configuration.
use serde::{Deserialize, Serialize};

use crate::error::NefError;

/// Immutable configuration of a simulation.
///
/// The configuration is fixed when the network is created; only the simulated
/// state of the network mutates afterwards.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct SimConfig {
    /// The simulation time step, in seconds.
    pub dt: f64,
    /// The seed used for sampling ensemble tuning curves, encoders, and evaluation points.
    pub seed: u64,
    /// The number of evaluation points used to solve for decoding weights.
    pub num_eval_points: usize,
}

impl SimConfig {
    /// Create a new configuration with the specified parameters.
    /// Returns an error if the time step is non-positive or no evaluation points are requested.
    pub fn build(dt: f64, seed: u64, num_eval_points: usize) -> Result<Self, NefError> {
        if dt <= 0.0 {
            return Err(NefError::InvalidParameter(
                "Simulation time step must be positive".to_string(),
            ));
        }
        if num_eval_points == 0 {
            return Err(NefError::InvalidParameter(
                "At least one evaluation point is required".to_string(),
            ));
        }
        Ok(SimConfig {
            dt,
            seed,
            num_eval_points,
        })
    }

    /// The same configuration with a different seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            dt: 1e-3,
            seed: 42,
            num_eval_points: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_build_invalid_dt() {
        assert_eq!(
            SimConfig::build(0.0, 0, 100),
            Err(NefError::InvalidParameter(
                "Simulation time step must be positive".to_string()
            ))
        );
    }

    #[test]
    fn test_config_default() {
        let config = SimConfig::default();
        assert_eq!(config.dt, 1e-3);
        assert_eq!(config.num_eval_points, 500);
    }
}
