//! Standalone intersection simulation
//!
//! Discrete-time model of one four-approach signalized intersection: seeded
//! arrivals, phase-gated departures, the signal cycle and the metrics that
//! compare timing policies. Runs entirely headless.

mod config;
mod intersection;
mod metrics;
mod policy;
mod queue;
mod scenario;
mod types;
mod world;

// Re-export public types for external use
// These may not be used within this crate but are part of the public API
#[allow(unused_imports)]
pub use config::{ConfigError, SimulationConfig};
#[allow(unused_imports)]
pub use intersection::{GreenRecord, LightColor, PhaseChange, PhaseController, SignalPhase};
#[allow(unused_imports)]
pub use metrics::{jain_index, DirectionReport, MetricsAccumulator, MetricsReport};
#[allow(unused_imports)]
pub use policy::{clamp_green, FixedTimePolicy, FuzzyDecisionPolicy, PolicyKind, TimingPolicy};
#[allow(unused_imports)]
pub use queue::{QueueSimulator, SimulationClock, StepOutcome, TrafficSnapshot, VehicleQueue};
#[allow(unused_imports)]
pub use scenario::{catalog, find as find_scenario, ScenarioError, ScenarioSpec};
#[allow(unused_imports)]
pub use types::{
    Axis, Direction, PerDirection, ALL_RED_TIME, COMPARISON_DURATION_CAP, DEFAULT_DELTA,
    DEFAULT_FIXED_GREEN, DEFAULT_SEED, DENSITY_PER_VEHICLE, MAX_ARRIVAL_RATE, MAX_DELTA,
    MAX_DENSITY, MAX_GREEN, MAX_WAITING, MIN_GREEN, SATURATION_FLOW, YELLOW_TIME,
};
pub use world::{build_policy, SimWorld};
