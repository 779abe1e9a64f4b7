//! Membership functions and linguistic variables
//!
//! Every membership function is a piecewise-linear curve over ordered
//! breakpoints. Triangles and trapezoids are the only shapes the controller
//! uses, but any monotone-in-x breakpoint list is accepted.

use thiserror::Error;

/// Errors raised while building membership functions or variables.
#[derive(Debug, Error, PartialEq)]
pub enum MembershipError {
    #[error("Membership function needs at least one breakpoint")]
    Empty,

    #[error("Breakpoint {index} is not finite")]
    NonFinite { index: usize },

    #[error("Breakpoint {index} is out of order ({x} does not follow {previous})")]
    Unordered { index: usize, x: f64, previous: f64 },

    #[error("Degree {degree} at breakpoint {index} is out of range [0.0, 1.0]")]
    DegreeOutOfRange { index: usize, degree: f64 },

    #[error("Variable '{name}' has an invalid domain [{min}, {max}]")]
    InvalidDomain { name: String, min: f64, max: f64 },

    #[error("Variable '{name}' has no labels")]
    NoLabels { name: String },

    #[error("Variable '{name}' declares label '{label}' more than once")]
    DuplicateLabel { name: String, label: String },
}

/// A piecewise-linear membership curve.
///
/// Outside the first and last breakpoints the boundary degree is held, so a
/// triangle reads 0 beyond its feet and a shoulder stays at 1 on its plateau.
#[derive(Debug, Clone, PartialEq)]
pub struct MembershipFunction {
    points: Vec<(f64, f64)>,
}

impl MembershipFunction {
    /// Build a curve from `(x, degree)` breakpoints with strictly increasing x.
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self, MembershipError> {
        if points.is_empty() {
            return Err(MembershipError::Empty);
        }
        for (index, &(x, degree)) in points.iter().enumerate() {
            if !x.is_finite() || !degree.is_finite() {
                return Err(MembershipError::NonFinite { index });
            }
            if !(0.0..=1.0).contains(&degree) {
                return Err(MembershipError::DegreeOutOfRange { index, degree });
            }
            if index > 0 {
                let previous = points[index - 1].0;
                if x <= previous {
                    return Err(MembershipError::Unordered { index, x, previous });
                }
            }
        }
        Ok(Self { points })
    }

    /// Triangle with feet `a`, `c` and peak `b`.
    ///
    /// `a == b` gives a left shoulder, `b == c` a right shoulder.
    pub fn triangle(a: f64, b: f64, c: f64) -> Result<Self, MembershipError> {
        let mut points = Vec::with_capacity(3);
        if a < b {
            points.push((a, 0.0));
        }
        points.push((b, 1.0));
        if c > b {
            points.push((c, 0.0));
        }
        Self::new(points)
    }

    /// Trapezoid rising over `[a, b]`, flat on `[b, c]`, falling over `[c, d]`.
    pub fn trapezoid(a: f64, b: f64, c: f64, d: f64) -> Result<Self, MembershipError> {
        let mut points = Vec::with_capacity(4);
        if a < b {
            points.push((a, 0.0));
        }
        points.push((b, 1.0));
        if c > b {
            points.push((c, 1.0));
        }
        if d > c {
            points.push((d, 0.0));
        }
        Self::new(points)
    }

    /// Degree of membership of `x`, always in [0, 1]. NaN has degree 0.
    pub fn degree(&self, x: f64) -> f64 {
        if x.is_nan() {
            return 0.0;
        }
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        if x <= first.0 {
            return first.1;
        }
        if x >= last.0 {
            return last.1;
        }

        // First breakpoint strictly to the right of x; bounded by the checks above
        let upper = self.points.partition_point(|&(px, _)| px <= x);
        let (x0, y0) = self.points[upper - 1];
        let (x1, y1) = self.points[upper];
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }
}

/// A named variable with a bounded domain and an ordered set of labels.
#[derive(Debug, Clone)]
pub struct FuzzyVariable {
    name: String,
    min: f64,
    max: f64,
    labels: Vec<(String, MembershipFunction)>,
}

impl FuzzyVariable {
    pub fn new(
        name: impl Into<String>,
        min: f64,
        max: f64,
        labels: Vec<(String, MembershipFunction)>,
    ) -> Result<Self, MembershipError> {
        let name = name.into();
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(MembershipError::InvalidDomain { name, min, max });
        }
        if labels.is_empty() {
            return Err(MembershipError::NoLabels { name });
        }
        for (i, (label, _)) in labels.iter().enumerate() {
            if labels[..i].iter().any(|(other, _)| other == label) {
                return Err(MembershipError::DuplicateLabel {
                    name,
                    label: label.clone(),
                });
            }
        }
        Ok(Self {
            name,
            min,
            max,
            labels,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    /// Clamp a crisp value into the domain (NaN maps to the lower bound).
    pub fn clamp(&self, x: f64) -> f64 {
        if x.is_nan() {
            self.min
        } else {
            x.clamp(self.min, self.max)
        }
    }

    /// Label names in declaration order
    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.labels.iter().map(|(label, _)| label.as_str())
    }

    /// Labels with their membership functions, in declaration order
    pub fn sets(&self) -> impl Iterator<Item = (&str, &MembershipFunction)> + '_ {
        self.labels
            .iter()
            .map(|(label, function)| (label.as_str(), function))
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.function(label).is_some()
    }

    pub fn function(&self, label: &str) -> Option<&MembershipFunction> {
        self.labels
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, function)| function)
    }

    /// Degree of `label` at `x` after clamping `x` into the domain.
    /// Returns `None` for an unknown label.
    pub fn degree(&self, label: &str, x: f64) -> Option<f64> {
        let x = self.clamp(x);
        self.function(label).map(|function| function.degree(x))
    }

    /// Degrees of every label at `x`, in declaration order.
    pub fn fuzzify(&self, x: f64) -> Vec<(&str, f64)> {
        let x = self.clamp(x);
        self.labels
            .iter()
            .map(|(label, function)| (label.as_str(), function.degree(x)))
            .collect()
    }
}

/// Names of the linguistic variables used by the traffic controller
pub const DENSITY: &str = "density";
pub const WAITING: &str = "waiting";
pub const GREEN_TIME: &str = "green_time";

/// The three variables the traffic controller reasons over.
///
/// Adjacent input labels overlap on their plateaus: each label reaches full
/// membership before its predecessor starts to fall, so the union of two
/// neighbouring labels never dips below 1. The output labels keep plain
/// triangular shapes.
#[derive(Debug, Clone)]
pub struct MembershipLibrary {
    /// Queue density in percent of the approach capacity
    pub density: FuzzyVariable,
    /// Waiting time of the oldest queued vehicle, in seconds
    pub waiting: FuzzyVariable,
    /// Green duration, in seconds
    pub green_time: FuzzyVariable,
}

impl MembershipLibrary {
    pub fn traffic() -> Result<Self, MembershipError> {
        let density = FuzzyVariable::new(
            DENSITY,
            0.0,
            100.0,
            vec![
                ("low".into(), MembershipFunction::trapezoid(0.0, 0.0, 40.0, 60.0)?),
                ("medium".into(), MembershipFunction::trapezoid(20.0, 40.0, 60.0, 80.0)?),
                ("high".into(), MembershipFunction::trapezoid(40.0, 60.0, 100.0, 100.0)?),
            ],
        )?;

        let waiting = FuzzyVariable::new(
            WAITING,
            0.0,
            300.0,
            vec![
                ("short".into(), MembershipFunction::trapezoid(0.0, 0.0, 60.0, 100.0)?),
                ("medium".into(), MembershipFunction::trapezoid(40.0, 60.0, 140.0, 180.0)?),
                ("long".into(), MembershipFunction::trapezoid(120.0, 140.0, 220.0, 260.0)?),
                ("very_long".into(), MembershipFunction::trapezoid(200.0, 220.0, 300.0, 300.0)?),
            ],
        )?;

        let green_time = FuzzyVariable::new(
            GREEN_TIME,
            10.0,
            90.0,
            vec![
                ("short".into(), MembershipFunction::triangle(10.0, 10.0, 30.0)?),
                ("medium".into(), MembershipFunction::triangle(25.0, 40.0, 55.0)?),
                ("long".into(), MembershipFunction::triangle(50.0, 60.0, 70.0)?),
                ("very_long".into(), MembershipFunction::triangle(65.0, 90.0, 90.0)?),
            ],
        )?;

        Ok(Self {
            density,
            waiting,
            green_time,
        })
    }
}
