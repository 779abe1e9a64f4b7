//! A single simulation run
//!
//! `SimWorld` owns one queue simulator, one phase controller and one metrics
//! accumulator, and steps them in lockstep. Runs share nothing, so any number
//! of them can execute side by side.

use anyhow::{Context, Result};
use log::{debug, info};

use super::config::SimulationConfig;
use super::intersection::{PhaseChange, PhaseController, SignalPhase};
use super::metrics::{MetricsAccumulator, MetricsReport};
use super::policy::{FixedTimePolicy, FuzzyDecisionPolicy, PolicyKind, TimingPolicy};
use super::queue::{QueueSimulator, StepOutcome};
use super::scenario::ScenarioSpec;
use super::types::Direction;

/// Tolerance when comparing the clock with the run length
const END_EPSILON: f64 = 1e-9;

/// Build the policy for `kind` with the settings in `config`
pub fn build_policy(kind: PolicyKind, config: &SimulationConfig) -> Result<Box<dyn TimingPolicy>> {
    let policy: Box<dyn TimingPolicy> = match kind {
        PolicyKind::Fuzzy => Box::new(
            FuzzyDecisionPolicy::new().context("Failed to build the fuzzy controller")?,
        ),
        PolicyKind::Fixed => Box::new(FixedTimePolicy::new(config.fixed_green)),
    };
    Ok(policy)
}

/// The simulated intersection for one scenario and one policy
pub struct SimWorld {
    scenario: ScenarioSpec,
    simulator: QueueSimulator,
    controller: PhaseController,
    metrics: MetricsAccumulator,
    last_change: Option<PhaseChange>,
}

impl SimWorld {
    pub fn new(
        scenario: &ScenarioSpec,
        policy: Box<dyn TimingPolicy>,
        config: &SimulationConfig,
    ) -> Result<Self> {
        scenario
            .validate()
            .with_context(|| format!("Invalid scenario '{}'", scenario.key()))?;
        let simulator =
            QueueSimulator::new(scenario, config).context("Invalid simulation settings")?;
        let controller = PhaseController::new(policy, config, &simulator.snapshot());

        Ok(Self {
            scenario: scenario.clone(),
            simulator,
            controller,
            metrics: MetricsAccumulator::new(),
            last_change: None,
        })
    }

    /// Create a world running one of the built-in policies
    pub fn with_policy(
        scenario: &ScenarioSpec,
        kind: PolicyKind,
        config: &SimulationConfig,
    ) -> Result<Self> {
        let policy = build_policy(kind, config)?;
        Self::new(scenario, policy, config)
    }

    /// Advance the world by one step.
    ///
    /// Queues move under the current phase, metrics sample the result, then
    /// the controller advances with the post-step traffic state.
    pub fn tick(&mut self) -> StepOutcome {
        let outcome = self.simulator.step(self.controller.phase());
        self.metrics.observe(&outcome);

        let snapshot = self.simulator.snapshot();
        let delta = self.simulator.clock().delta();
        self.last_change = self.controller.advance(delta, &snapshot);
        if let Some(change) = &self.last_change {
            debug!(
                "t={:.0}s {} -> {} for {:.1}s",
                snapshot.time,
                change.from.label(),
                change.to.label(),
                change.duration
            );
        }
        outcome
    }

    pub fn is_finished(&self) -> bool {
        self.simulator.elapsed() >= self.scenario.duration() - END_EPSILON
    }

    /// Step until the scenario's run length and report.
    pub fn run(mut self) -> MetricsReport {
        while !self.is_finished() {
            self.tick();
        }
        let report = self.report();
        info!(
            "{} [{}] finished after {:.0}s: {}",
            self.scenario.name(),
            self.controller.policy_name(),
            self.simulator.elapsed(),
            report.summary()
        );
        report
    }

    /// Metrics up to the current step
    pub fn report(&self) -> MetricsReport {
        self.metrics.finalize(
            self.controller.policy_name(),
            self.simulator.elapsed(),
            self.controller.green_log(),
        )
    }

    pub fn time(&self) -> f64 {
        self.simulator.elapsed()
    }

    pub fn phase(&self) -> SignalPhase {
        self.controller.phase()
    }

    /// Phase change made by the most recent tick, if any
    pub fn last_change(&self) -> Option<PhaseChange> {
        self.last_change
    }

    pub fn scenario(&self) -> &ScenarioSpec {
        &self.scenario
    }

    pub fn simulator(&self) -> &QueueSimulator {
        &self.simulator
    }

    pub fn controller(&self) -> &PhaseController {
        &self.controller
    }

    /// Print a short status block
    pub fn print_summary(&self) {
        println!("=== {} ({}) ===", self.scenario.name(), self.controller.policy_name());
        println!(
            "Time: {:.0}s, phase {} ({:.1}s of {:.1}s)",
            self.time(),
            self.controller.phase().label(),
            self.controller.time_in_phase(),
            self.controller.duration()
        );
        for direction in Direction::ALL {
            let queue = self.simulator.queue(direction);
            println!(
                "  {:<5} queued={:<3} arrived={:<5} departed={:<5} light={:?}",
                direction.name(),
                queue.len(),
                queue.arrived(),
                queue.departed(),
                self.controller.phase().light(direction)
            );
        }
    }
}
