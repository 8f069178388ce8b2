// src/config.rs
//! Run configuration for both search drivers.
//!
//! Configuration problems are the only fatal error class in this crate:
//! [`SearchConfig::validate`] is called at the top of every run and rejects
//! malformed input before any work starts. Everything downstream treats bad
//! candidates as data, never as errors.

use thiserror::Error;

use crate::security::FitnessWeights;

/// Errors reported for malformed configuration. Fatal to the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{parameter} = {value} is out of bounds: expected [{min}, {max}]")]
    ParameterOutOfBounds {
        parameter: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{parameter} = {value} is too small: expected at least {min}")]
    ParameterTooSmall {
        parameter: &'static str,
        value: u64,
        min: u64,
    },

    #[error("{parameter} = {value} is not a finite number")]
    ParameterNotFinite { parameter: &'static str, value: f64 },
}

/// Parent-selection strategy of the genetic driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMethod {
    /// Pick the best of `size` uniformly drawn candidates.
    Tournament { size: usize },
    /// Roulette-wheel selection proportional to fitness.
    FitnessProportional,
}

/// Knobs specific to the genetic driver.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneticConfig {
    pub selection: SelectionMethod,
    /// Probability that a selected pair is recombined at all.
    pub crossover_probability: f64,
    /// Independent per-field mutation probability.
    pub mutation_probability: f64,
    /// Standard deviation of the Gaussian integer perturbation.
    pub mutation_sigma: f64,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            selection: SelectionMethod::Tournament { size: 3 },
            crossover_probability: 0.5,
            mutation_probability: 0.2,
            mutation_sigma: 5.0,
        }
    }
}

/// Knobs specific to the swarm driver. The inertia weight decays linearly
/// from `inertia_max` to `inertia_min` over the run.
#[derive(Debug, Clone, PartialEq)]
pub struct SwarmConfig {
    pub inertia_max: f64,
    pub inertia_min: f64,
    /// Pull toward a particle's personal best.
    pub cognitive: f64,
    /// Pull toward the swarm's global best.
    pub social: f64,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            inertia_max: 0.9,
            inertia_min: 0.4,
            cognitive: 1.0,
            social: 2.5,
        }
    }
}

/// Complete configuration of one optimization run, shared by both drivers so
/// their results are directly comparable.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Bit width of the prime modulus to search at.
    pub bit_width: u32,
    /// Individuals per generation / particles in the swarm.
    pub population_size: usize,
    /// Generations (GA) or iterations (PSO).
    pub rounds: usize,
    /// Stop after this many rounds without a best-score improvement.
    pub stagnation_limit: usize,
    /// Seed for every random decision of the run.
    pub seed: u64,
    /// Witness count of the Miller–Rabin primality test.
    pub miller_rabin_rounds: u32,
    /// Per-invocation bound on the rho walk.
    pub rho_iteration_cap: u64,
    /// The shared fitness objective.
    pub weights: FitnessWeights,
    pub genetic: GeneticConfig,
    pub swarm: SwarmConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            bit_width: 32,
            population_size: 50,
            rounds: 40,
            stagnation_limit: 20,
            seed: 0,
            miller_rabin_rounds: 25,
            rho_iteration_cap: 10_000,
            weights: FitnessWeights::default(),
            genetic: GeneticConfig::default(),
            swarm: SwarmConfig::default(),
        }
    }
}

impl SearchConfig {
    /// Validate every bound. Called by both drivers before any work; a
    /// failure here is fatal to the run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bit_width < 8 || self.bit_width > 512 {
            return Err(ConfigError::ParameterOutOfBounds {
                parameter: "bit_width",
                value: self.bit_width as f64,
                min: 8.0,
                max: 512.0,
            });
        }
        if self.population_size < 2 {
            return Err(ConfigError::ParameterTooSmall {
                parameter: "population_size",
                value: self.population_size as u64,
                min: 2,
            });
        }
        if self.rounds < 1 {
            return Err(ConfigError::ParameterTooSmall {
                parameter: "rounds",
                value: self.rounds as u64,
                min: 1,
            });
        }
        if self.stagnation_limit < 1 {
            return Err(ConfigError::ParameterTooSmall {
                parameter: "stagnation_limit",
                value: self.stagnation_limit as u64,
                min: 1,
            });
        }
        if self.miller_rabin_rounds < 1 {
            return Err(ConfigError::ParameterTooSmall {
                parameter: "miller_rabin_rounds",
                value: self.miller_rabin_rounds as u64,
                min: 1,
            });
        }
        if self.rho_iteration_cap < 2 {
            return Err(ConfigError::ParameterTooSmall {
                parameter: "rho_iteration_cap",
                value: self.rho_iteration_cap,
                min: 2,
            });
        }

        Self::check_probability("crossover_probability", self.genetic.crossover_probability)?;
        Self::check_probability("mutation_probability", self.genetic.mutation_probability)?;
        if !self.genetic.mutation_sigma.is_finite() {
            return Err(ConfigError::ParameterNotFinite {
                parameter: "mutation_sigma",
                value: self.genetic.mutation_sigma,
            });
        }
        if self.genetic.mutation_sigma <= 0.0 {
            return Err(ConfigError::ParameterOutOfBounds {
                parameter: "mutation_sigma",
                value: self.genetic.mutation_sigma,
                min: f64::MIN_POSITIVE,
                max: f64::MAX,
            });
        }
        if let SelectionMethod::Tournament { size } = self.genetic.selection {
            if size < 1 {
                return Err(ConfigError::ParameterTooSmall {
                    parameter: "tournament size",
                    value: size as u64,
                    min: 1,
                });
            }
        }

        Self::check_coefficient("inertia_min", self.swarm.inertia_min)?;
        Self::check_coefficient("inertia_max", self.swarm.inertia_max)?;
        Self::check_coefficient("cognitive", self.swarm.cognitive)?;
        Self::check_coefficient("social", self.swarm.social)?;
        if self.swarm.inertia_min > self.swarm.inertia_max {
            return Err(ConfigError::ParameterOutOfBounds {
                parameter: "inertia_min",
                value: self.swarm.inertia_min,
                min: 0.0,
                max: self.swarm.inertia_max,
            });
        }

        Self::check_coefficient("attack_resistance weight", self.weights.attack_resistance)?;
        Self::check_coefficient("order_size weight", self.weights.order_size)?;
        Self::check_coefficient(
            "weak_structure_penalty weight",
            self.weights.weak_structure_penalty,
        )?;
        Self::check_coefficient("cofactor_bonus weight", self.weights.cofactor_bonus)?;

        Ok(())
    }

    fn check_probability(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
        if !value.is_finite() {
            return Err(ConfigError::ParameterNotFinite { parameter, value });
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::ParameterOutOfBounds {
                parameter,
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(())
    }

    fn check_coefficient(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
        if !value.is_finite() {
            return Err(ConfigError::ParameterNotFinite { parameter, value });
        }
        if value < 0.0 {
            return Err(ConfigError::ParameterOutOfBounds {
                parameter,
                value,
                min: 0.0,
                max: f64::MAX,
            });
        }
        Ok(())
    }
}
