//! Mamdani inference over the traffic rule base
//!
//! fuzzify -> firing strength (min) -> clip consequent -> aggregate (max) ->
//! centroid. The engine holds only immutable data, so a decision is a pure
//! function of the rules and the crisp inputs.

use log::warn;

use super::membership::MembershipLibrary;
use super::rules::{ApproachInputs, FuzzyRule};

/// Number of evenly spaced samples of the output domain used for the centroid
pub const DEFUZZ_SAMPLES: usize = 801;

/// Outcome of one inference
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceResult {
    /// Crisp green time
    pub output: f64,
    /// Aggregated output membership, one value per sample point
    pub aggregate: Vec<f64>,
    /// Number of rules with a non-zero firing strength
    pub fired: usize,
    /// True when no rule fired and the domain midpoint was returned
    pub used_fallback: bool,
}

/// Precomputed Mamdani engine for the `green_time` output
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    library: MembershipLibrary,
    samples: Vec<f64>,
    /// Output label name with its curve over `samples`
    curves: Vec<(String, Vec<f64>)>,
}

impl InferenceEngine {
    pub fn new(library: MembershipLibrary) -> Self {
        let (min, max) = library.green_time.domain();
        let step = (max - min) / (DEFUZZ_SAMPLES - 1) as f64;
        let samples: Vec<f64> = (0..DEFUZZ_SAMPLES)
            .map(|i| min + step * i as f64)
            .collect();

        let curves = library
            .green_time
            .sets()
            .map(|(label, function)| {
                let curve: Vec<f64> = samples.iter().map(|&x| function.degree(x)).collect();
                (label.to_string(), curve)
            })
            .collect();

        Self {
            library,
            samples,
            curves,
        }
    }

    pub fn library(&self) -> &MembershipLibrary {
        &self.library
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Firing strength of a single rule: the minimum degree over its clauses.
    pub fn firing_strength(&self, rule: &FuzzyRule, inputs: &ApproachInputs) -> f64 {
        rule.antecedents
            .iter()
            .map(|clause| {
                clause
                    .input
                    .variable(&self.library)
                    .degree(&clause.label, inputs.value(clause.input))
                    .unwrap_or(0.0)
            })
            .fold(1.0, f64::min)
    }

    /// Run the full inference pipeline.
    pub fn infer(&self, rules: &[FuzzyRule], inputs: &ApproachInputs) -> InferenceResult {
        // Strongest activation per output label; max aggregation makes rule order irrelevant
        let mut activation = vec![0.0_f64; self.curves.len()];
        let mut fired = 0;
        for rule in rules {
            let strength = self.firing_strength(rule, inputs);
            if strength <= 0.0 {
                continue;
            }
            fired += 1;
            if let Some(slot) = self
                .curves
                .iter()
                .position(|(label, _)| *label == rule.consequent)
            {
                activation[slot] = activation[slot].max(strength);
            }
        }

        let aggregate: Vec<f64> = (0..self.samples.len())
            .map(|i| {
                self.curves
                    .iter()
                    .zip(&activation)
                    .map(|((_, curve), &strength)| curve[i].min(strength))
                    .fold(0.0, f64::max)
            })
            .collect();

        let (weighted, area) = self
            .samples
            .iter()
            .zip(&aggregate)
            .fold((0.0, 0.0), |(weighted, area), (&x, &mu)| {
                (weighted + x * mu, area + mu)
            });

        if area <= 0.0 {
            let fallback = self.library.green_time.midpoint();
            warn!(
                "No rule fired for {:?}, falling back to {:.1}s",
                inputs, fallback
            );
            return InferenceResult {
                output: fallback,
                aggregate,
                fired,
                used_fallback: true,
            };
        }

        InferenceResult {
            output: weighted / area,
            aggregate,
            fired,
            used_fallback: false,
        }
    }

    /// Crisp output only
    pub fn evaluate(&self, rules: &[FuzzyRule], inputs: &ApproachInputs) -> f64 {
        self.infer(rules, inputs).output
    }
}
