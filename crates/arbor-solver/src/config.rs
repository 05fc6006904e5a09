//! Simulator configuration.

use arbor_types::constants::DEFAULT_EIGEN_SWEEPS;
use arbor_types::{ArborError, ArborResult};
use serde::{Deserialize, Serialize};

/// Configuration for the tick pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Scales of the three fictitious torques in the rotating joint frame:
    /// linear joint acceleration, parent angular acceleration plus
    /// Coriolis, and the gyroscopic term. Zero disables a term.
    pub torque_fictitious_multipliers: [f32; 3],

    /// Bound on QL sweeps in the eigen fallback.
    pub max_eigen_sweeps: u32,

    /// Solve units of a level (and all joints) on the rayon pool.
    pub parallel: bool,

    /// Uniform acceleration [gx, gy, gz] applied to every non-static body
    /// in addition to registered fields.
    pub gravity: [f32; 3],
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            torque_fictitious_multipliers: [0.0; 3],
            max_eigen_sweeps: DEFAULT_EIGEN_SWEEPS,
            parallel: false,
            gravity: [0.0; 3],
        }
    }
}

impl SimulatorConfig {
    /// Sequential execution, everything else default.
    pub fn debug() -> Self {
        Self {
            parallel: false,
            ..Default::default()
        }
    }

    /// All fictitious torques enabled at full strength.
    pub fn with_fictitious() -> Self {
        Self {
            torque_fictitious_multipliers: [1.0; 3],
            ..Default::default()
        }
    }

    /// Default settings on the rayon pool.
    pub fn parallel() -> Self {
        Self {
            parallel: true,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> ArborResult<()> {
        if self.max_eigen_sweeps == 0 {
            return Err(ArborError::InvalidConfig(
                "max_eigen_sweeps must be at least 1".into(),
            ));
        }
        if !self.torque_fictitious_multipliers.iter().all(|m| m.is_finite()) {
            return Err(ArborError::InvalidConfig(
                "fictitious torque multipliers must be finite".into(),
            ));
        }
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return Err(ArborError::InvalidConfig("gravity must be finite".into()));
        }
        Ok(())
    }
}
