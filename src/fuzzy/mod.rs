//! Approximate-reasoning core
//!
//! Membership functions, the traffic rule base and the Mamdani engine that
//! turns crisp queue measurements into a green duration. Nothing in here
//! knows about simulated time.

mod engine;
mod membership;
mod rules;

use thiserror::Error;

pub use engine::{InferenceEngine, InferenceResult, DEFUZZ_SAMPLES};
pub use membership::{
    FuzzyVariable, MembershipError, MembershipFunction, MembershipLibrary, DENSITY, GREEN_TIME,
    WAITING,
};
pub use rules::{
    ApproachInputs, Clause, FuzzyRule, RuleBase, RuleCategory, RuleError, TrafficInput,
    RULES_PER_DIRECTION,
};

/// Failure to assemble the fuzzy controller
#[derive(Debug, Error)]
pub enum FuzzyError {
    #[error("Invalid membership definition: {0}")]
    Membership(#[from] MembershipError),

    #[error("Invalid rule: {0}")]
    Rule(#[from] RuleError),
}
