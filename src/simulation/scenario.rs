//! Traffic scenarios: arrival rates per approach and run length

use serde::Serialize;
use thiserror::Error;

use super::types::{Direction, PerDirection, MAX_ARRIVAL_RATE};

#[derive(Debug, Error, PartialEq)]
pub enum ScenarioError {
    #[error("Scenario name cannot be empty")]
    EmptyName,

    #[error("Arrival rate for {direction} must be finite and non-negative, got {rate}")]
    InvalidRate { direction: Direction, rate: f64 },

    #[error("Arrival rate for {direction} is {rate} veh/min, above the {max} veh/min limit")]
    RateTooHigh {
        direction: Direction,
        rate: f64,
        max: f64,
    },

    #[error("Scenario duration must be positive and finite, got {0}")]
    InvalidDuration(f64),

    #[error("Scenario '{key}' not found. Available scenarios: {available}")]
    NotFound { key: String, available: String },
}

/// An immutable, validated traffic pattern
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioSpec {
    key: String,
    name: String,
    description: String,
    /// Vehicles per minute arriving on each approach
    arrival_rates: PerDirection<f64>,
    /// Run length in seconds
    duration: f64,
}

impl ScenarioSpec {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        arrival_rates: PerDirection<f64>,
        duration: f64,
    ) -> Result<Self, ScenarioError> {
        let spec = Self {
            key: key.into(),
            name: name.into(),
            description: description.into(),
            arrival_rates,
            duration,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Same rate on all four approaches
    pub fn uniform(
        key: impl Into<String>,
        name: impl Into<String>,
        rate: f64,
        duration: f64,
    ) -> Result<Self, ScenarioError> {
        Self::new(key, name, "", PerDirection::splat(rate), duration)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.name.trim().is_empty() {
            return Err(ScenarioError::EmptyName);
        }
        for (direction, &rate) in self.arrival_rates.iter() {
            if !rate.is_finite() || rate < 0.0 {
                return Err(ScenarioError::InvalidRate { direction, rate });
            }
            if rate > MAX_ARRIVAL_RATE {
                return Err(ScenarioError::RateTooHigh {
                    direction,
                    rate,
                    max: MAX_ARRIVAL_RATE,
                });
            }
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(ScenarioError::InvalidDuration(self.duration));
        }
        Ok(())
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn arrival_rates(&self) -> &PerDirection<f64> {
        &self.arrival_rates
    }

    pub fn arrival_rate(&self, direction: Direction) -> f64 {
        self.arrival_rates[direction]
    }

    /// Combined arrival rate in vehicles per minute
    pub fn total_arrival_rate(&self) -> f64 {
        self.arrival_rates.values().sum()
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Copy of this scenario with the run length capped at `max_duration`
    pub fn truncated(&self, max_duration: f64) -> Self {
        let mut spec = self.clone();
        if max_duration > 0.0 && max_duration < spec.duration {
            spec.duration = max_duration;
        }
        spec
    }

    /// Copy of this scenario with a different run length
    pub fn with_duration(&self, duration: f64) -> Result<Self, ScenarioError> {
        let mut spec = self.clone();
        spec.duration = duration;
        spec.validate()?;
        Ok(spec)
    }
}

fn preset(
    key: &str,
    name: &str,
    description: &str,
    [north, south, east, west]: [f64; 4],
    duration: f64,
) -> ScenarioSpec {
    ScenarioSpec {
        key: key.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        arrival_rates: PerDirection([north, south, east, west]),
        duration,
    }
}

/// The built-in scenarios, in presentation order
pub fn catalog() -> Vec<ScenarioSpec> {
    vec![
        preset(
            "normal",
            "Normal Traffic",
            "Balanced traffic with moderate flow on all directions",
            [12.0, 12.0, 12.0, 12.0],
            3600.0,
        ),
        preset(
            "rush_ns",
            "Rush Hour (N-S)",
            "Heavy North-South traffic on the main road",
            [35.0, 35.0, 10.0, 10.0],
            3600.0,
        ),
        preset(
            "rush_ew",
            "Rush Hour (E-W)",
            "Heavy East-West traffic",
            [10.0, 10.0, 35.0, 35.0],
            3600.0,
        ),
        preset(
            "light",
            "Light Traffic",
            "Light traffic on all directions, late at night",
            [5.0, 5.0, 5.0, 5.0],
            3600.0,
        ),
        preset(
            "asymmetric_north",
            "Asymmetric (Heavy North)",
            "Very heavy traffic from the north only",
            [45.0, 8.0, 8.0, 8.0],
            3600.0,
        ),
        preset(
            "peak",
            "Peak Congestion",
            "Very heavy traffic on all directions",
            [40.0, 40.0, 40.0, 40.0],
            3600.0,
        ),
        preset(
            "morning",
            "Morning Commute",
            "Inbound-heavy commute into the city center",
            [30.0, 10.0, 25.0, 8.0],
            7200.0,
        ),
        preset(
            "evening",
            "Evening Commute",
            "Outbound-heavy commute leaving the city center",
            [10.0, 30.0, 8.0, 25.0],
            7200.0,
        ),
        preset(
            "weekend",
            "Weekend Leisure",
            "Moderate, balanced weekend traffic",
            [15.0, 18.0, 15.0, 18.0],
            3600.0,
        ),
    ]
}

/// Look up a built-in scenario by key.
pub fn find(key: &str) -> Result<ScenarioSpec, ScenarioError> {
    let scenarios = catalog();
    match scenarios.iter().position(|spec| spec.key == key) {
        Some(index) => Ok(scenarios[index].clone()),
        None => Err(ScenarioError::NotFound {
            key: key.to_string(),
            available: scenarios
                .iter()
                .map(|spec| spec.key.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}
