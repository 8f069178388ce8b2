// src/security/mod.rs
//! Security evaluation of candidate curves: the bounded Pollard's-rho
//! attack and the composite fitness objective built on top of it.

pub mod fitness;
pub mod pollard_rho;

pub use fitness::{FitnessBreakdown, FitnessFunction, FitnessScore, FitnessWeights};
pub use pollard_rho::{AttackResult, RhoAttack};
