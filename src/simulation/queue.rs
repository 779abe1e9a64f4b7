//! Vehicle queues and the arrival process
//!
//! Each approach keeps the arrival time of every queued vehicle, so waiting
//! times are exact rather than estimated. Arrivals are Bernoulli draws per
//! step; departures discharge at the saturation flow while the approach has
//! a green light.

use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::VecDeque;

use super::config::{ConfigError, SimulationConfig};
use super::intersection::SignalPhase;
use super::scenario::ScenarioSpec;
use super::types::{Direction, PerDirection, MAX_DENSITY, MAX_WAITING};

/// Discharge credit within this distance of a whole vehicle counts as one
const CREDIT_EPSILON: f64 = 1e-9;

/// FIFO queue of one approach
#[derive(Debug, Clone, Default)]
pub struct VehicleQueue {
    /// Arrival time of each waiting vehicle, oldest first
    arrivals: VecDeque<f64>,
    arrived: u64,
    departed: u64,
    /// Summed waiting time of departed vehicles
    total_wait: f64,
    /// Fractional discharge capacity carried within a green
    credit: f64,
}

impl VehicleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, time: f64) {
        self.arrivals.push_back(time);
        self.arrived += 1;
    }

    /// Release up to `capacity` worth of vehicles at time `now`, oldest first.
    /// Pushes each departing vehicle's wait onto `waits`.
    fn discharge(&mut self, capacity: f64, now: f64, waits: &mut Vec<f64>) -> u32 {
        if self.arrivals.is_empty() {
            self.credit = 0.0;
            return 0;
        }

        self.credit += capacity;
        let mut released = 0;
        while self.credit >= 1.0 - CREDIT_EPSILON {
            let Some(arrival) = self.arrivals.pop_front() else {
                break;
            };
            let wait = now - arrival;
            self.total_wait += wait;
            self.departed += 1;
            self.credit -= 1.0;
            waits.push(wait);
            released += 1;
        }
        if self.arrivals.is_empty() {
            self.credit = 0.0;
        }
        released
    }

    /// Red and yellow lights forfeit any partial discharge
    fn hold(&mut self) {
        self.credit = 0.0;
    }

    pub fn len(&self) -> usize {
        self.arrivals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrivals.is_empty()
    }

    pub fn arrived(&self) -> u64 {
        self.arrived
    }

    pub fn departed(&self) -> u64 {
        self.departed
    }

    pub fn total_wait(&self) -> f64 {
        self.total_wait
    }

    pub fn oldest_arrival(&self) -> Option<f64> {
        self.arrivals.front().copied()
    }

    /// Age of the vehicle at the head of the queue (0 when empty)
    pub fn oldest_wait(&self, now: f64) -> f64 {
        self.oldest_arrival().map_or(0.0, |arrival| now - arrival)
    }

    /// Summed age of every queued vehicle at `now`
    pub fn queued_age(&self, now: f64) -> f64 {
        self.arrivals.iter().map(|arrival| now - arrival).sum()
    }
}

/// Simulated time as a step counter, so elapsed time never drifts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationClock {
    steps: u64,
    delta: f64,
}

impl SimulationClock {
    pub fn new(delta: f64) -> Self {
        Self { steps: 0, delta }
    }

    pub fn elapsed(&self) -> f64 {
        self.steps as f64 * self.delta
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn tick(&mut self) {
        self.steps += 1;
    }
}

/// What the controller may observe about the queues
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficSnapshot {
    pub time: f64,
    pub queue_lengths: PerDirection<usize>,
    /// Queue density, 0 to 100
    pub density: PerDirection<f64>,
    /// Age of the oldest queued vehicle, capped at 300 s
    pub waiting: PerDirection<f64>,
}

impl TrafficSnapshot {
    /// Derive densities and capped waits from raw queue lengths and head-of-queue ages.
    pub fn from_queues(
        time: f64,
        queue_lengths: PerDirection<usize>,
        oldest_waits: PerDirection<f64>,
        density_per_vehicle: f64,
    ) -> Self {
        Self {
            time,
            density: queue_lengths
                .map(|&length| (length as f64 * density_per_vehicle).min(MAX_DENSITY)),
            waiting: oldest_waits.map(|&wait| wait.clamp(0.0, MAX_WAITING)),
            queue_lengths,
        }
    }

    /// Mean density of the two approaches crossing `direction`
    pub fn cross_density(&self, direction: Direction) -> f64 {
        let [a, b] = direction.perpendicular();
        (self.density[a] + self.density[b]) / 2.0
    }

    pub fn total_queue(&self) -> usize {
        self.queue_lengths.values().sum()
    }
}

/// Everything that happened during one step
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// Simulated time at the start of the step
    pub time: f64,
    pub phase: SignalPhase,
    pub arrivals: PerDirection<u32>,
    pub departures: PerDirection<u32>,
    /// Waits of the vehicles that departed this step, per approach
    pub waits: PerDirection<Vec<f64>>,
    /// Queue lengths after the step
    pub queue_lengths: PerDirection<usize>,
}

/// Per-approach queues fed by a seeded arrival process
pub struct QueueSimulator {
    queues: PerDirection<VehicleQueue>,
    clock: SimulationClock,
    /// Arrival probability of one draw, and draws per step
    arrival_draws: PerDirection<(f64, u32)>,
    saturation_flow: f64,
    density_per_vehicle: f64,
    rng: StdRng,
}

impl QueueSimulator {
    pub fn new(scenario: &ScenarioSpec, config: &SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let arrival_draws = PerDirection::from_fn(|direction| {
            let probability = scenario.arrival_rate(direction) / 60.0 * config.delta;
            if probability <= 1.0 {
                return (probability, 1);
            }
            // More than one expected arrival per step: split into several draws.
            // Rates and steps are capped, so the count stays small.
            let draws = probability.ceil().min(f64::from(u32::MAX)) as u32;
            warn!(
                "{} arrival probability {:.2} per step exceeds 1, using {} draws of {:.3}",
                direction,
                probability,
                draws,
                probability / draws as f64
            );
            ((probability / draws as f64).min(1.0), draws)
        });

        Ok(Self {
            queues: PerDirection::from_fn(|_| VehicleQueue::new()),
            clock: SimulationClock::new(config.delta),
            arrival_draws,
            saturation_flow: config.saturation_flow,
            density_per_vehicle: config.density_per_vehicle,
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    /// Advance one step under `phase`: arrivals first, then departures.
    pub fn step(&mut self, phase: SignalPhase) -> StepOutcome {
        let now = self.clock.elapsed();
        let capacity = self.saturation_flow * self.clock.delta();

        let mut arrivals = PerDirection::splat(0u32);
        for direction in Direction::ALL {
            let (probability, draws) = self.arrival_draws[direction];
            for _ in 0..draws {
                if self.rng.random_bool(probability) {
                    self.queues[direction].push(now);
                    arrivals[direction] += 1;
                }
            }
        }

        let mut departures = PerDirection::splat(0u32);
        let mut waits: PerDirection<Vec<f64>> = PerDirection::default();
        for direction in Direction::ALL {
            let queue = &mut self.queues[direction];
            if phase.allows_departure(direction) {
                departures[direction] = queue.discharge(capacity, now, &mut waits[direction]);
            } else {
                queue.hold();
            }
            debug_assert_eq!(
                queue.arrived(),
                queue.departed() + queue.len() as u64,
                "vehicles lost on {}",
                direction
            );
        }

        self.clock.tick();

        StepOutcome {
            time: now,
            phase,
            arrivals,
            departures,
            waits,
            queue_lengths: self.queues.map(VehicleQueue::len),
        }
    }

    /// Current view of the queues for the timing policy
    pub fn snapshot(&self) -> TrafficSnapshot {
        let now = self.clock.elapsed();
        TrafficSnapshot::from_queues(
            now,
            self.queues.map(VehicleQueue::len),
            self.queues.map(|queue| queue.oldest_wait(now)),
            self.density_per_vehicle,
        )
    }

    pub fn queue(&self, direction: Direction) -> &VehicleQueue {
        &self.queues[direction]
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn elapsed(&self) -> f64 {
        self.clock.elapsed()
    }

    pub fn total_queued(&self) -> usize {
        self.queues.values().map(VehicleQueue::len).sum()
    }
}
