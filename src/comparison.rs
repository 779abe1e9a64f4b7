//! Fuzzy controller versus the fixed-time baseline
//!
//! Each scenario is run once per policy with the same seed, so both policies
//! face the identical arrival sequence. Scenarios are independent and run in
//! parallel when the `parallel` feature is enabled.

use anyhow::{Context, Result};
use log::info;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::simulation::{
    MetricsReport, PerDirection, PolicyKind, ScenarioSpec, SimWorld, SimulationConfig,
    COMPARISON_DURATION_CAP,
};

/// Improvements of the fuzzy policy over the baseline, in percent except
/// for fairness. Positive means the fuzzy policy did better.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Improvement {
    #[serde(rename = "waiting_time_improvement_%")]
    pub waiting_time: f64,
    #[serde(rename = "max_waiting_time_improvement_%")]
    pub max_waiting_time: f64,
    #[serde(rename = "queue_length_improvement_%")]
    pub queue_length: f64,
    #[serde(rename = "max_queue_length_improvement_%")]
    pub max_queue_length: f64,
    #[serde(rename = "throughput_improvement_%")]
    pub throughput: f64,
    #[serde(rename = "delay_reduction_%")]
    pub delay: f64,
    /// Absolute difference of the Jain indices
    #[serde(rename = "fairness_improvement")]
    pub fairness: f64,
}

/// Reduction of a lower-is-better metric, in percent of the baseline
fn reduction(fuzzy: f64, fixed: f64) -> f64 {
    if fixed > 0.0 {
        (fixed - fuzzy) / fixed * 100.0
    } else {
        0.0
    }
}

/// Gain of a higher-is-better metric, in percent of the baseline
fn gain(fuzzy: f64, fixed: f64) -> f64 {
    if fixed > 0.0 {
        (fuzzy - fixed) / fixed * 100.0
    } else {
        0.0
    }
}

impl Improvement {
    pub fn between(fuzzy: &MetricsReport, fixed: &MetricsReport) -> Self {
        Self {
            waiting_time: reduction(fuzzy.average_waiting_time, fixed.average_waiting_time),
            max_waiting_time: reduction(fuzzy.max_waiting_time, fixed.max_waiting_time),
            queue_length: reduction(fuzzy.average_queue_length, fixed.average_queue_length),
            max_queue_length: reduction(
                fuzzy.max_queue_length as f64,
                fixed.max_queue_length as f64,
            ),
            throughput: gain(fuzzy.throughput_per_hour, fixed.throughput_per_hour),
            delay: reduction(fuzzy.total_delay, fixed.total_delay),
            fairness: fuzzy.fairness_index - fixed.fairness_index,
        }
    }
}

/// Scenario descriptor as exported next to the results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioSummary {
    pub name: String,
    pub description: String,
    pub arrival_rates: PerDirection<f64>,
    /// Simulated seconds actually run
    pub duration: f64,
}

/// Both policies' results on one scenario
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioComparison {
    #[serde(skip)]
    pub key: String,
    pub scenario: ScenarioSummary,
    pub fuzzy: MetricsReport,
    pub fixed: MetricsReport,
    pub comparison: Improvement,
}

/// Run `scenario` under both policies with the same seed.
///
/// The run length is capped at 30 simulated minutes.
pub fn compare(scenario: &ScenarioSpec, config: &SimulationConfig) -> Result<ScenarioComparison> {
    let scenario = scenario.truncated(COMPARISON_DURATION_CAP);
    let fuzzy = SimWorld::with_policy(&scenario, PolicyKind::Fuzzy, config)
        .with_context(|| format!("Failed to set up fuzzy run of '{}'", scenario.key()))?
        .run();
    let fixed = SimWorld::with_policy(&scenario, PolicyKind::Fixed, config)
        .with_context(|| format!("Failed to set up fixed run of '{}'", scenario.key()))?
        .run();

    let comparison = Improvement::between(&fuzzy, &fixed);
    info!(
        "{}: waiting time {:+.1}%, throughput {:+.1}%",
        scenario.name(),
        comparison.waiting_time,
        comparison.throughput
    );

    Ok(ScenarioComparison {
        key: scenario.key().to_string(),
        scenario: ScenarioSummary {
            name: scenario.name().to_string(),
            description: scenario.description().to_string(),
            arrival_rates: *scenario.arrival_rates(),
            duration: scenario.duration(),
        },
        fuzzy,
        fixed,
        comparison,
    })
}

/// Compare every scenario; results keep the input order.
pub fn compare_all(
    scenarios: &[ScenarioSpec],
    config: &SimulationConfig,
) -> Result<Vec<ScenarioComparison>> {
    #[cfg(feature = "parallel")]
    let results = scenarios
        .par_iter()
        .map(|scenario| compare(scenario, config))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let results = scenarios
        .iter()
        .map(|scenario| compare(scenario, config))
        .collect();

    results
}

/// Results keyed by scenario key, in run order
struct KeyedResults<'a>(&'a [ScenarioComparison]);

impl Serialize for KeyedResults<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for result in self.0 {
            map.serialize_entry(&result.key, result)?;
        }
        map.end()
    }
}

/// Pretty JSON object keyed by scenario key
pub fn to_json(results: &[ScenarioComparison]) -> Result<String> {
    serde_json::to_string_pretty(&KeyedResults(results))
        .context("Failed to serialize comparison results")
}

/// Write the comparison results to `path`, creating parent directories.
pub fn export_json(results: &[ScenarioComparison], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let json = to_json(results)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Results exported to {}", path.display());
    Ok(())
}
