// src/security/fitness.rs
//! Composite fitness of a candidate curve: structural validation, a bounded
//! rho attack, and a weighted aggregation of the two.
//!
//! The weights live in one named vector so both search drivers optimize the
//! exact same objective and experiments stay comparable. Because the attack
//! evaluator randomizes its walk starts, re-scoring the *same* candidate can
//! return slightly different values; that noise is an accepted property of
//! the objective, and the drivers only ever compare against a recorded
//! best-so-far rather than assuming monotonic history for one candidate.

use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use rand::Rng;

use crate::curves::{CurveParameters, CurveValidator, ValidationReport};
use crate::security::pollard_rho::{AttackResult, RhoAttack};

/// Weight vector of the fitness objective. Policy, not law: the defaults
/// below were chosen for balance, with attack resistance dominant, and are
/// meant to be tuned per experiment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitnessWeights {
    /// Weight of the normalized attack-resistance term (dominant).
    pub attack_resistance: f64,
    /// Weight of the normalized claimed-order size term.
    pub order_size: f64,
    /// Flat penalty for anomalous or supersingular structure. Large enough
    /// to matter, small enough to keep the gradient alive.
    pub weak_structure_penalty: f64,
    /// Flat bonus for a cofactor of exactly 1.
    pub cofactor_bonus: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            attack_resistance: 0.6,
            order_size: 0.2,
            weak_structure_penalty: 0.5,
            cofactor_bonus: 0.05,
        }
    }
}

/// Per-term contributions behind a score, kept for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct FitnessBreakdown {
    /// Normalized attack-resistance contribution before weighting.
    pub attack_resistance: f64,
    /// Normalized order-size contribution before weighting.
    pub order_size: f64,
    /// Applied weak-structure penalty (zero when the structure is clean).
    pub weak_structure_penalty: f64,
    /// Applied cofactor bonus (zero unless `h = 1`).
    pub cofactor_bonus: f64,
    pub report: ValidationReport,
    pub attack: AttackResult,
}

/// Scalar fitness of one candidate, with the breakdown retained whenever the
/// candidate survived the hard validity checks.
#[derive(Debug, Clone, PartialEq)]
pub struct FitnessScore {
    pub value: f64,
    pub breakdown: Option<FitnessBreakdown>,
}

impl FitnessScore {
    /// The floor assigned to every structurally invalid candidate.
    pub const MINIMUM: f64 = 0.0;

    /// The short-circuit score: minimum value, no breakdown.
    pub fn minimum() -> Self {
        Self {
            value: Self::MINIMUM,
            breakdown: None,
        }
    }

    /// Whether the candidate passed every hard validity check. Only viable
    /// scores can win a search run.
    pub fn is_viable(&self) -> bool {
        self.breakdown.is_some()
    }
}

/// The shared objective function: validate, then attack, then aggregate.
///
/// Immutable once built, so one instance can be shared across the parallel
/// scoring batch; the evaluator-invocation counter is atomic for the same
/// reason.
#[derive(Debug)]
pub struct FitnessFunction {
    weights: FitnessWeights,
    validator: CurveValidator,
    attack: RhoAttack,
    attack_invocations: AtomicU64,
}

impl FitnessFunction {
    pub fn new(weights: FitnessWeights, miller_rabin_rounds: u32, rho_iteration_cap: u64) -> Self {
        Self {
            weights,
            validator: CurveValidator::new(miller_rabin_rounds),
            attack: RhoAttack::new(rho_iteration_cap),
            attack_invocations: AtomicU64::new(0),
        }
    }

    pub fn weights(&self) -> &FitnessWeights {
        &self.weights
    }

    /// How many times the attack evaluator has run. Candidates failing a
    /// hard validity check never reach it.
    pub fn attack_invocations(&self) -> u64 {
        self.attack_invocations.load(Ordering::Relaxed)
    }

    /// Score one candidate. Invalid structure short-circuits to the minimum
    /// score without invoking the attack evaluator.
    pub fn score<R: Rng + ?Sized>(&self, params: &CurveParameters, rng: &mut R) -> FitnessScore {
        let report = self.validator.validate(params, rng);
        if !report.hard_checks_pass() {
            debug!("candidate failed hard validation, short-circuiting to minimum fitness");
            return FitnessScore::minimum();
        }

        self.attack_invocations.fetch_add(1, Ordering::Relaxed);
        let attack = self.attack.evaluate(params, rng);

        // A capped walk is the best observable outcome; otherwise normalize
        // the work estimate against the cap.
        let cap_bits = (self.attack.iteration_cap().max(2) as f64).log2();
        let attack_resistance = if attack.capped {
            1.0
        } else {
            (attack.estimated_security_bits / cap_bits).clamp(0.0, 1.0)
        };

        let order_size = (params.n.significant_bits() as f64
            / params.p.significant_bits().max(1) as f64)
            .min(1.0);

        let weak_structure_penalty = if report.has_weak_structure() {
            self.weights.weak_structure_penalty
        } else {
            0.0
        };
        let cofactor_bonus = if params.h == 1 {
            self.weights.cofactor_bonus
        } else {
            0.0
        };

        let value = (self.weights.attack_resistance * attack_resistance
            + self.weights.order_size * order_size
            + cofactor_bonus
            - weak_structure_penalty)
            .max(FitnessScore::MINIMUM);

        FitnessScore {
            value,
            breakdown: Some(FitnessBreakdown {
                attack_resistance,
                order_size,
                weak_structure_penalty,
                cofactor_bonus,
                report,
                attack,
            }),
        }
    }
}
