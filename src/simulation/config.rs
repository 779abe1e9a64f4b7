//! Simulation settings shared by every run

use serde::Serialize;
use thiserror::Error;

use super::types::{
    ALL_RED_TIME, DEFAULT_DELTA, DEFAULT_FIXED_GREEN, DEFAULT_SEED, DENSITY_PER_VEHICLE, MAX_DELTA,
    MAX_GREEN, MIN_GREEN, SATURATION_FLOW, YELLOW_TIME,
};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Time step must be in (0, 60] seconds, got {0}")]
    InvalidDelta(f64),

    #[error("Saturation flow must be positive and finite, got {0}")]
    InvalidSaturationFlow(f64),

    #[error("Clearance interval '{name}' must be positive and finite, got {value}")]
    InvalidClearance { name: &'static str, value: f64 },

    #[error("Fixed green time {0} is outside [10, 90] seconds")]
    FixedGreenOutOfRange(f64),

    #[error("Density per vehicle must be positive and finite, got {0}")]
    InvalidDensityScale(f64),
}

/// Tunable parameters of the intersection model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationConfig {
    /// Step size in seconds
    pub delta: f64,
    /// Vehicles per second a green approach can discharge
    pub saturation_flow: f64,
    pub yellow_time: f64,
    pub all_red_time: f64,
    /// Green time used by the fixed-time baseline
    pub fixed_green: f64,
    /// Seed for the arrival process
    pub seed: u64,
    /// Density points per queued vehicle (density saturates at 100)
    pub density_per_vehicle: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            delta: DEFAULT_DELTA,
            saturation_flow: SATURATION_FLOW,
            yellow_time: YELLOW_TIME,
            all_red_time: ALL_RED_TIME,
            fixed_green: DEFAULT_FIXED_GREEN,
            seed: DEFAULT_SEED,
            density_per_vehicle: DENSITY_PER_VEHICLE,
        }
    }
}

impl SimulationConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.delta > 0.0 && self.delta <= MAX_DELTA) {
            return Err(ConfigError::InvalidDelta(self.delta));
        }
        if !(self.saturation_flow.is_finite() && self.saturation_flow > 0.0) {
            return Err(ConfigError::InvalidSaturationFlow(self.saturation_flow));
        }
        for (name, value) in [("yellow", self.yellow_time), ("all_red", self.all_red_time)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidClearance { name, value });
            }
        }
        if !(MIN_GREEN..=MAX_GREEN).contains(&self.fixed_green) {
            return Err(ConfigError::FixedGreenOutOfRange(self.fixed_green));
        }
        if !(self.density_per_vehicle.is_finite() && self.density_per_vehicle > 0.0) {
            return Err(ConfigError::InvalidDensityScale(self.density_per_vehicle));
        }
        Ok(())
    }
}
