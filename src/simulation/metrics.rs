//! Performance metrics of a simulation run
//!
//! The accumulator keeps running sums only, so a run's memory use does not
//! grow with its length.

use ordered_float::OrderedFloat;
use serde::Serialize;

use super::intersection::GreenRecord;
use super::queue::StepOutcome;
use super::types::{Direction, PerDirection};

/// Jain's fairness index `(Σx)² / (n·Σx²)`.
///
/// 1.0 means every entry is equal; an empty or all-zero input counts as fair.
pub fn jain_index(values: &[f64]) -> f64 {
    let sum: f64 = values.iter().sum();
    let sum_of_squares: f64 = values.iter().map(|x| x * x).sum();
    if values.is_empty() || sum_of_squares <= 0.0 {
        return 1.0;
    }
    let index = (sum * sum) / (values.len() as f64 * sum_of_squares);
    index.min(1.0)
}

/// Metrics of one approach
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DirectionReport {
    pub arrivals: u64,
    pub departures: u64,
    pub avg_waiting_time: f64,
    pub max_waiting_time: f64,
    pub avg_queue_length: f64,
    pub max_queue_length: usize,
    /// Summed waiting time of departed vehicles, in seconds
    pub total_delay: f64,
    pub throughput_per_hour: f64,
    /// Mean green granted to this approach
    pub avg_green_time: f64,
}

/// Final metrics of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub policy: String,
    pub simulation_duration: f64,
    pub total_arrivals: u64,
    pub total_departures: u64,
    pub vehicles_in_system: u64,

    pub average_waiting_time: f64,
    pub max_waiting_time: f64,
    pub total_delay: f64,

    /// Mean of the total queue over all steps
    pub average_queue_length: f64,
    pub max_queue_length: usize,

    pub throughput_per_hour: f64,
    /// Jain index over per-direction departures
    pub fairness_index: f64,
    /// Jain index over per-direction average waits
    pub waiting_fairness_index: f64,
    /// Share of steps that ended with at least one queued vehicle
    pub utilization_rate: f64,

    pub green_phases: usize,
    pub average_green_time: f64,

    pub by_direction: PerDirection<DirectionReport>,
}

impl MetricsReport {
    pub fn summary(&self) -> String {
        format!(
            "{}: avg wait {:.2}s, max wait {:.2}s, avg queue {:.2}, max queue {}, \
             throughput {:.1} veh/h, fairness {:.3}",
            self.policy,
            self.average_waiting_time,
            self.max_waiting_time,
            self.average_queue_length,
            self.max_queue_length,
            self.throughput_per_hour,
            self.fairness_index
        )
    }
}

/// Running totals fed by every simulation step
#[derive(Debug, Clone, Default)]
pub struct MetricsAccumulator {
    steps: u64,
    busy_steps: u64,
    total_queue_sum: u64,
    total_queue_max: usize,
    queue_sum: PerDirection<u64>,
    queue_max: PerDirection<usize>,
    arrivals: PerDirection<u64>,
    departures: PerDirection<u64>,
    wait_sum: PerDirection<f64>,
    wait_max: PerDirection<OrderedFloat<f64>>,
}

impl MetricsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one step: queue lengths after the step plus every departure.
    pub fn observe(&mut self, outcome: &StepOutcome) {
        self.steps += 1;

        let total: usize = outcome.queue_lengths.values().sum();
        self.total_queue_sum += total as u64;
        self.total_queue_max = self.total_queue_max.max(total);
        if total > 0 {
            self.busy_steps += 1;
        }

        for direction in Direction::ALL {
            let length = outcome.queue_lengths[direction];
            self.queue_sum[direction] += length as u64;
            self.queue_max[direction] = self.queue_max[direction].max(length);
            self.arrivals[direction] += u64::from(outcome.arrivals[direction]);
            self.departures[direction] += u64::from(outcome.departures[direction]);

            let waits = &outcome.waits[direction];
            self.wait_sum[direction] += waits.iter().sum::<f64>();
            if let Some(longest) = waits.iter().copied().map(OrderedFloat).max() {
                self.wait_max[direction] = self.wait_max[direction].max(longest);
            }
        }
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Build the report for a run of `elapsed` simulated seconds.
    pub fn finalize(&self, policy: &str, elapsed: f64, greens: &[GreenRecord]) -> MetricsReport {
        let hours = elapsed / 3600.0;
        let per_hour = |count: u64| if hours > 0.0 { count as f64 / hours } else { 0.0 };
        let mean = |sum: f64, count: u64| if count > 0 { sum / count as f64 } else { 0.0 };

        let by_direction = PerDirection::from_fn(|direction| {
            let granted: Vec<f64> = greens
                .iter()
                .filter(|record| record.axis == direction.axis())
                .map(|record| record.duration)
                .collect();
            DirectionReport {
                arrivals: self.arrivals[direction],
                departures: self.departures[direction],
                avg_waiting_time: mean(self.wait_sum[direction], self.departures[direction]),
                max_waiting_time: self.wait_max[direction].into_inner(),
                avg_queue_length: mean(self.queue_sum[direction] as f64, self.steps),
                max_queue_length: self.queue_max[direction],
                total_delay: self.wait_sum[direction],
                throughput_per_hour: per_hour(self.departures[direction]),
                avg_green_time: mean(granted.iter().sum(), granted.len() as u64),
            }
        });

        let total_arrivals: u64 = self.arrivals.values().sum();
        let total_departures: u64 = self.departures.values().sum();
        let total_delay: f64 = self.wait_sum.values().sum();
        let max_waiting_time = self
            .wait_max
            .values()
            .copied()
            .max()
            .map_or(0.0, OrderedFloat::into_inner);

        let served: Vec<f64> = self.departures.values().map(|&d| d as f64).collect();
        // Only approaches that served someone have a meaningful average wait
        let waits: Vec<f64> = by_direction
            .values()
            .filter(|report| report.departures > 0)
            .map(|report| report.avg_waiting_time)
            .collect();

        MetricsReport {
            policy: policy.to_string(),
            simulation_duration: elapsed,
            total_arrivals,
            total_departures,
            vehicles_in_system: total_arrivals - total_departures,
            average_waiting_time: mean(total_delay, total_departures),
            max_waiting_time,
            total_delay,
            average_queue_length: mean(self.total_queue_sum as f64, self.steps),
            max_queue_length: self.total_queue_max,
            throughput_per_hour: per_hour(total_departures),
            fairness_index: jain_index(&served),
            waiting_fairness_index: jain_index(&waits),
            utilization_rate: mean(self.busy_steps as f64, self.steps),
            green_phases: greens.len(),
            average_green_time: mean(
                greens.iter().map(|record| record.duration).sum(),
                greens.len() as u64,
            ),
            by_direction,
        }
    }
}
