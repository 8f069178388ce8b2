// src/curves/mod.rs
//! Curve-parameter model: the candidate record, randomized generation, and
//! structural/security validation.

pub mod parameters;
pub mod validation;

pub use parameters::{
    find_generator, find_generator_from, hasse_window, random_curve, CurveParameters,
    GenerationError,
};
pub use validation::{CurveValidator, ValidationReport};
