// src/scoring/mod.rs

pub mod engine;
pub mod penalty;
pub mod rules;
pub mod sign;

pub use engine::{CycleOutcome, Deduction, DeductionReason, ScoringEngine};
pub use sign::ClassLabels;
