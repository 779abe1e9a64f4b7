//! Green-time policies
//!
//! A policy is asked once at the start of every green how long that green
//! should last. The fuzzy policy reasons over the queues; the fixed policy is
//! the constant-time baseline it is compared against.

use clap::ValueEnum;
use log::debug;
use serde::Serialize;

use super::queue::TrafficSnapshot;
use super::types::{Axis, Direction, DEFAULT_FIXED_GREEN, MAX_GREEN, MIN_GREEN};
use crate::fuzzy::{ApproachInputs, FuzzyError, InferenceEngine, MembershipLibrary, RuleBase};

/// Decides green durations for the phase controller
pub trait TimingPolicy: Send + Sync {
    fn name(&self) -> &str;

    /// Green time in seconds for `axis`, given the traffic right now.
    /// The controller clamps the result to [10, 90].
    fn decide(&self, axis: Axis, snapshot: &TrafficSnapshot) -> f64;
}

/// Which policy a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Mamdani controller over queue density and waiting time
    Fuzzy,
    /// Constant green time
    Fixed,
}

impl PolicyKind {
    pub fn name(self) -> &'static str {
        match self {
            PolicyKind::Fuzzy => "fuzzy",
            PolicyKind::Fixed => "fixed",
        }
    }
}

/// Clamp to the legal green range; NaN becomes the shortest green
pub fn clamp_green(duration: f64) -> f64 {
    if duration.is_nan() {
        MIN_GREEN
    } else {
        duration.clamp(MIN_GREEN, MAX_GREEN)
    }
}

/// Fuzzy controller: one inference per approach of the green pair, averaged
#[derive(Debug, Clone)]
pub struct FuzzyDecisionPolicy {
    engine: InferenceEngine,
    rules: RuleBase,
}

impl FuzzyDecisionPolicy {
    pub fn new() -> Result<Self, FuzzyError> {
        let library = MembershipLibrary::traffic()?;
        let rules = RuleBase::traffic(&library)?;
        Ok(Self {
            engine: InferenceEngine::new(library),
            rules,
        })
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub fn rules(&self) -> &RuleBase {
        &self.rules
    }

    /// Crisp inputs of one approach as the rules see them
    pub fn inputs_for(direction: Direction, snapshot: &TrafficSnapshot) -> ApproachInputs {
        ApproachInputs {
            current_density: snapshot.density[direction],
            current_waiting: snapshot.waiting[direction],
            opposing_density: snapshot.density[direction.opposite()],
            cross_density: snapshot.cross_density(direction),
        }
    }

    /// Green time for a single approach, clamped to [10, 90]
    pub fn decide_for(&self, direction: Direction, inputs: &ApproachInputs) -> f64 {
        let rules = self.rules.for_direction(direction);
        clamp_green(self.engine.evaluate(rules, inputs))
    }
}

impl TimingPolicy for FuzzyDecisionPolicy {
    fn name(&self) -> &str {
        PolicyKind::Fuzzy.name()
    }

    fn decide(&self, axis: Axis, snapshot: &TrafficSnapshot) -> f64 {
        let directions = axis.directions();
        let total: f64 = directions
            .iter()
            .map(|&direction| {
                let inputs = Self::inputs_for(direction, snapshot);
                let green = self.decide_for(direction, &inputs);
                debug!("{} wants {:.1}s from {:?}", direction, green, inputs);
                green
            })
            .sum();
        clamp_green(total / directions.len() as f64)
    }
}

/// Constant-time baseline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedTimePolicy {
    green: f64,
}

impl FixedTimePolicy {
    pub fn new(green: f64) -> Self {
        Self {
            green: clamp_green(green),
        }
    }

    pub fn green(&self) -> f64 {
        self.green
    }
}

impl Default for FixedTimePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FIXED_GREEN)
    }
}

impl TimingPolicy for FixedTimePolicy {
    fn name(&self) -> &str {
        PolicyKind::Fixed.name()
    }

    fn decide(&self, _axis: Axis, _snapshot: &TrafficSnapshot) -> f64 {
        self.green
    }
}
