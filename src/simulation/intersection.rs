//! Signal phases of the intersection
//!
//! Standalone state machine: a fixed six-phase cycle whose green lengths come
//! from a timing policy queried once per green.

use log::debug;
use serde::Serialize;

use super::config::SimulationConfig;
use super::policy::{clamp_green, TimingPolicy};
use super::queue::TrafficSnapshot;
use super::types::{Axis, Direction};

/// Phase boundaries are compared with this tolerance to absorb float steps
const PHASE_EPSILON: f64 = 1e-9;

/// One state of the signal cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalPhase {
    NsGreen,
    NsYellow,
    AllRed1,
    EwGreen,
    EwYellow,
    AllRed2,
}

/// What a single approach sees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightColor {
    Green,
    Yellow,
    Red,
}

impl SignalPhase {
    /// Transition table of the cycle
    pub fn next(self) -> SignalPhase {
        match self {
            SignalPhase::NsGreen => SignalPhase::NsYellow,
            SignalPhase::NsYellow => SignalPhase::AllRed1,
            SignalPhase::AllRed1 => SignalPhase::EwGreen,
            SignalPhase::EwGreen => SignalPhase::EwYellow,
            SignalPhase::EwYellow => SignalPhase::AllRed2,
            SignalPhase::AllRed2 => SignalPhase::NsGreen,
        }
    }

    /// The axis that may discharge vehicles, if any
    pub fn green_axis(self) -> Option<Axis> {
        match self {
            SignalPhase::NsGreen => Some(Axis::NorthSouth),
            SignalPhase::EwGreen => Some(Axis::EastWest),
            _ => None,
        }
    }

    pub fn is_green(self) -> bool {
        self.green_axis().is_some()
    }

    /// Only a green phase lets vehicles leave, and only on its own axis
    pub fn allows_departure(self, direction: Direction) -> bool {
        self.green_axis() == Some(direction.axis())
    }

    pub fn light(self, direction: Direction) -> LightColor {
        match (self, direction.axis()) {
            (SignalPhase::NsGreen, Axis::NorthSouth) | (SignalPhase::EwGreen, Axis::EastWest) => {
                LightColor::Green
            }
            (SignalPhase::NsYellow, Axis::NorthSouth) | (SignalPhase::EwYellow, Axis::EastWest) => {
                LightColor::Yellow
            }
            _ => LightColor::Red,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SignalPhase::NsGreen => "NS_GREEN",
            SignalPhase::NsYellow => "NS_YELLOW",
            SignalPhase::AllRed1 => "ALL_RED_1",
            SignalPhase::EwGreen => "EW_GREEN",
            SignalPhase::EwYellow => "EW_YELLOW",
            SignalPhase::AllRed2 => "ALL_RED_2",
        }
    }
}

/// A green interval that was granted
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GreenRecord {
    pub axis: Axis,
    /// Simulated time the green started
    pub start: f64,
    pub duration: f64,
}

/// A phase change reported by [`PhaseController::advance`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseChange {
    pub from: SignalPhase,
    pub to: SignalPhase,
    /// Length fixed for the phase just entered
    pub duration: f64,
}

/// Drives the signal cycle and owns the timing policy
pub struct PhaseController {
    phase: SignalPhase,
    time_in_phase: f64,
    duration: f64,
    policy: Box<dyn TimingPolicy>,
    yellow_time: f64,
    all_red_time: f64,
    green_log: Vec<GreenRecord>,
    cycles: u64,
}

impl PhaseController {
    /// Start in north-south green, asking the policy for its length.
    pub fn new(
        policy: Box<dyn TimingPolicy>,
        config: &SimulationConfig,
        snapshot: &TrafficSnapshot,
    ) -> Self {
        let mut controller = Self {
            phase: SignalPhase::NsGreen,
            time_in_phase: 0.0,
            duration: 0.0,
            policy,
            yellow_time: config.yellow_time,
            all_red_time: config.all_red_time,
            green_log: Vec::new(),
            cycles: 0,
        };
        controller.duration = controller.phase_length(SignalPhase::NsGreen, snapshot);
        controller
    }

    /// Length of a phase about to start; greens are decided here and only here.
    fn phase_length(&mut self, phase: SignalPhase, snapshot: &TrafficSnapshot) -> f64 {
        match phase.green_axis() {
            Some(axis) => {
                let duration = clamp_green(self.policy.decide(axis, snapshot));
                debug!(
                    "{} green {:.1}s at t={:.0}s ({})",
                    axis.label(),
                    duration,
                    snapshot.time,
                    self.policy.name()
                );
                self.green_log.push(GreenRecord {
                    axis,
                    start: snapshot.time,
                    duration,
                });
                duration
            }
            None => match phase {
                SignalPhase::NsYellow | SignalPhase::EwYellow => self.yellow_time,
                _ => self.all_red_time,
            },
        }
    }

    /// Move the phase clock forward by `delta` seconds.
    ///
    /// Makes at most one transition per call. `snapshot` is the traffic state
    /// after the step and feeds the policy when a green begins.
    pub fn advance(&mut self, delta: f64, snapshot: &TrafficSnapshot) -> Option<PhaseChange> {
        self.time_in_phase += delta;
        if self.time_in_phase < self.duration - PHASE_EPSILON {
            return None;
        }

        let from = self.phase;
        let to = from.next();
        if to == SignalPhase::NsGreen {
            self.cycles += 1;
        }
        self.phase = to;
        self.time_in_phase = 0.0;
        self.duration = self.phase_length(to, snapshot);
        Some(PhaseChange {
            from,
            to,
            duration: self.duration,
        })
    }

    pub fn phase(&self) -> SignalPhase {
        self.phase
    }

    /// Length fixed for the current phase instance
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn time_in_phase(&self) -> f64 {
        self.time_in_phase
    }

    pub fn remaining(&self) -> f64 {
        (self.duration - self.time_in_phase).max(0.0)
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    /// Every green granted so far, in order
    pub fn green_log(&self) -> &[GreenRecord] {
        &self.green_log
    }

    /// Completed full cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}
