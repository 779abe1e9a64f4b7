//! Fuzzy Signal Library
//!
//! Fuzzy-logic green-time control for a single four-approach intersection,
//! a discrete-time queue simulator to drive it, and a comparison against a
//! fixed-time signal.

pub mod comparison;
pub mod fuzzy;
pub mod simulation;
