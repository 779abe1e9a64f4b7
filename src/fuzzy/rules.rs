//! Rule base of the green-time controller
//!
//! Each approach gets its own copy of the same 28 rules, so the full base
//! holds 112 rules. Rules read the approach's own queue density and waiting
//! time, the density of the opposing approach and the mean density of the
//! two crossing approaches.

use serde::Serialize;
use thiserror::Error;

use super::membership::{FuzzyVariable, MembershipLibrary};
use crate::simulation::{Direction, PerDirection};

/// Number of rules declared for every approach
pub const RULES_PER_DIRECTION: usize = 28;

#[derive(Debug, Error, PartialEq)]
pub enum RuleError {
    #[error("Rule '{rule}' references unknown label '{label}' of variable '{variable}'")]
    UnknownLabel {
        rule: String,
        variable: String,
        label: String,
    },

    #[error("Rule '{rule}' has no antecedent clauses")]
    NoClauses { rule: String },
}

/// Which priority a rule expresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    /// Queue density of this approach against its opposing approach
    Density,
    /// Long-waiting vehicles push the green upward
    Waiting,
    /// Balance against the crossing street
    Fairness,
}

impl RuleCategory {
    pub fn name(self) -> &'static str {
        match self {
            RuleCategory::Density => "density",
            RuleCategory::Waiting => "waiting",
            RuleCategory::Fairness => "fairness",
        }
    }
}

/// Crisp inputs the rules can refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrafficInput {
    CurrentDensity,
    CurrentWaiting,
    OpposingDensity,
    CrossDensity,
}

impl TrafficInput {
    /// The linguistic variable this input is fuzzified with
    pub fn variable(self, library: &MembershipLibrary) -> &FuzzyVariable {
        match self {
            TrafficInput::CurrentWaiting => &library.waiting,
            TrafficInput::CurrentDensity
            | TrafficInput::OpposingDensity
            | TrafficInput::CrossDensity => &library.density,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TrafficInput::CurrentDensity => "current_density",
            TrafficInput::CurrentWaiting => "current_waiting",
            TrafficInput::OpposingDensity => "opposing_density",
            TrafficInput::CrossDensity => "cross_density",
        }
    }
}

/// Crisp measurements of one approach at decision time
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ApproachInputs {
    /// Queue density of the approach, 0 to 100
    pub current_density: f64,
    /// Waiting time of the oldest queued vehicle, in seconds
    pub current_waiting: f64,
    pub opposing_density: f64,
    /// Mean density of the two crossing approaches
    pub cross_density: f64,
}

impl ApproachInputs {
    pub fn value(&self, input: TrafficInput) -> f64 {
        match input {
            TrafficInput::CurrentDensity => self.current_density,
            TrafficInput::CurrentWaiting => self.current_waiting,
            TrafficInput::OpposingDensity => self.opposing_density,
            TrafficInput::CrossDensity => self.cross_density,
        }
    }
}

/// One antecedent clause: `input IS label`
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub input: TrafficInput,
    pub label: String,
}

/// An unweighted rule; clauses are joined by AND (minimum).
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyRule {
    /// Stable identifier such as `north/density/3`
    pub name: String,
    pub category: RuleCategory,
    pub antecedents: Vec<Clause>,
    /// Label of the `green_time` output variable
    pub consequent: String,
}

impl FuzzyRule {
    /// Check every label against the library.
    pub fn validate(&self, library: &MembershipLibrary) -> Result<(), RuleError> {
        if self.antecedents.is_empty() {
            return Err(RuleError::NoClauses {
                rule: self.name.clone(),
            });
        }
        for clause in &self.antecedents {
            let variable = clause.input.variable(library);
            if !variable.has_label(&clause.label) {
                return Err(RuleError::UnknownLabel {
                    rule: self.name.clone(),
                    variable: variable.name().to_string(),
                    label: clause.label.clone(),
                });
            }
        }
        if !library.green_time.has_label(&self.consequent) {
            return Err(RuleError::UnknownLabel {
                rule: self.name.clone(),
                variable: library.green_time.name().to_string(),
                label: self.consequent.clone(),
            });
        }
        Ok(())
    }
}

/// Compact rule declaration, expanded once per approach
struct RuleTemplate {
    category: RuleCategory,
    when: &'static [(TrafficInput, &'static str)],
    then: &'static str,
}

use RuleCategory::{Density, Fairness, Waiting};
use TrafficInput::{
    CrossDensity as Cross, CurrentDensity as Cur, CurrentWaiting as Wait, OpposingDensity as Opp,
};

const fn rule(
    category: RuleCategory,
    when: &'static [(TrafficInput, &'static str)],
    then: &'static str,
) -> RuleTemplate {
    RuleTemplate {
        category,
        when,
        then,
    }
}

// Consequents never step down as the current density or waiting label steps up
const TEMPLATES: [RuleTemplate; RULES_PER_DIRECTION] = [
    // Current density against opposing density
    rule(Density, &[(Cur, "low"), (Opp, "low")], "short"),
    rule(Density, &[(Cur, "low"), (Opp, "medium")], "short"),
    rule(Density, &[(Cur, "low"), (Opp, "high")], "short"),
    rule(Density, &[(Cur, "medium"), (Opp, "low")], "medium"),
    rule(Density, &[(Cur, "medium"), (Opp, "medium")], "medium"),
    rule(Density, &[(Cur, "medium"), (Opp, "high")], "medium"),
    rule(Density, &[(Cur, "high"), (Opp, "low")], "very_long"),
    rule(Density, &[(Cur, "high"), (Opp, "medium")], "long"),
    rule(Density, &[(Cur, "high"), (Opp, "high")], "long"),
    // A loaded cross street tempers long greens
    rule(Density, &[(Cur, "medium"), (Opp, "low"), (Cross, "high")], "medium"),
    rule(Density, &[(Cur, "high"), (Opp, "low"), (Cross, "high")], "long"),
    rule(Density, &[(Cur, "high"), (Opp, "medium"), (Cross, "high")], "medium"),
    // Starvation guard
    rule(Waiting, &[(Wait, "very_long"), (Cur, "low"), (Opp, "low")], "long"),
    rule(Waiting, &[(Wait, "very_long"), (Cur, "low"), (Opp, "medium")], "long"),
    rule(Waiting, &[(Wait, "very_long"), (Cur, "low"), (Opp, "high")], "medium"),
    rule(Waiting, &[(Wait, "very_long"), (Cur, "medium")], "long"),
    rule(Waiting, &[(Wait, "very_long"), (Cur, "high")], "very_long"),
    rule(Waiting, &[(Wait, "long"), (Cur, "low"), (Opp, "high")], "medium"),
    rule(Waiting, &[(Wait, "long"), (Cur, "medium"), (Opp, "low")], "medium"),
    rule(Waiting, &[(Wait, "long"), (Cur, "high")], "very_long"),
    // Balance across all four approaches
    rule(Fairness, &[(Cur, "high"), (Opp, "high"), (Cross, "high")], "medium"),
    rule(Fairness, &[(Cur, "medium"), (Opp, "medium"), (Cross, "medium")], "medium"),
    rule(Fairness, &[(Cur, "medium"), (Opp, "high"), (Cross, "high")], "medium"),
    rule(Fairness, &[(Cur, "low"), (Cross, "high")], "short"),
    rule(Fairness, &[(Cur, "low"), (Opp, "low"), (Cross, "low")], "short"),
    rule(Fairness, &[(Cur, "medium"), (Opp, "low"), (Cross, "low")], "long"),
    rule(Fairness, &[(Cur, "high"), (Opp, "low"), (Cross, "low")], "very_long"),
    rule(Fairness, &[(Cur, "high"), (Opp, "medium"), (Cross, "medium")], "long"),
];

/// The complete, validated rule base
#[derive(Debug, Clone)]
pub struct RuleBase {
    rules: PerDirection<Vec<FuzzyRule>>,
}

impl RuleBase {
    /// Build the traffic rules for all four approaches.
    pub fn traffic(library: &MembershipLibrary) -> Result<Self, RuleError> {
        let rules = PerDirection::from_fn(|direction| {
            let mut counters = [0usize; 3];
            TEMPLATES
                .iter()
                .map(|template| {
                    let counter = &mut counters[template.category as usize];
                    *counter += 1;
                    FuzzyRule {
                        name: format!("{}/{}/{}", direction, template.category.name(), counter),
                        category: template.category,
                        antecedents: template
                            .when
                            .iter()
                            .map(|&(input, label)| Clause {
                                input,
                                label: label.to_string(),
                            })
                            .collect(),
                        consequent: template.then.to_string(),
                    }
                })
                .collect::<Vec<_>>()
        });

        for rule in rules.values().flatten() {
            rule.validate(library)?;
        }
        Ok(Self { rules })
    }

    /// Rules that decide the green time of one approach
    pub fn for_direction(&self, direction: Direction) -> &[FuzzyRule] {
        &self.rules[direction]
    }

    pub fn iter(&self) -> impl Iterator<Item = &FuzzyRule> {
        self.rules.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count_by_category(&self, category: RuleCategory) -> usize {
        self.iter().filter(|rule| rule.category == category).count()
    }
}
