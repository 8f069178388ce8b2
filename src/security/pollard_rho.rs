// src/security/pollard_rho.rs
//! Pollard's-rho discrete-logarithm walk, used both as the fitness-side
//! attack-resistance estimator and as the standalone attack tool against an
//! observed public key. The two uses share [`RhoAttack::attack`] verbatim;
//! the evaluator merely fabricates a synthetic target first.
//!
//! The walk is Floyd's tortoise-and-hare over states `X = u·G + v·T`, with
//! the group partitioned into three branches by the x-coordinate of the
//! current point. A collision of the two walks yields a linear relation in
//! the unknown exponent; a singular relation (the occasional "useless
//! collision") triggers a bounded reseed within the remaining iteration
//! budget and never escapes this module. Running past the iteration cap is
//! a valid, reportable outcome — the cap is the per-invocation safety valve
//! and is interpreted as maximal resistance, never as a failure.

use log::{debug, trace};
use rand::Rng;
use rug::Integer;

use crate::arithmetic::{
    add, double, mod_inverse, mod_reduce, random_below, scalar_mul, AffinePoint,
};
use crate::curves::CurveParameters;

/// Outcome of one bounded rho attack.
///
/// `estimated_security_bits = log2(iterations)`; when no collision occurred
/// within the cap, `iterations` holds the cap itself as a lower bound and
/// `capped` is set. Recovering the discrete logarithm is only possible on a
/// collision with an invertible relation, and only meaningful when the
/// claimed order matches the true order of the generator.
#[derive(Debug, Clone, PartialEq)]
pub struct AttackResult {
    /// Rho rounds performed before the collision, or the cap.
    pub iterations: u64,
    /// `log2` of the iteration count — the work estimate in bits.
    pub estimated_security_bits: f64,
    /// True when the walk exhausted its budget without a usable collision.
    pub capped: bool,
    /// The recovered exponent `d` with `d·G = T`, when the collision solved.
    pub discrete_log: Option<Integer>,
}

/// One walk state: `point = base_coeff·G + target_coeff·T`, coefficients
/// tracked modulo the claimed order.
#[derive(Debug, Clone)]
struct WalkState {
    point: AffinePoint,
    base_coeff: Integer,
    target_coeff: Integer,
}

enum WalkOutcome {
    /// Collision with an invertible relation after `rounds` rounds.
    Solved { rounds: u64, discrete_log: Integer },
    /// Collision whose linear system was singular; reseed and retry.
    Degenerate { rounds: u64 },
    /// Budget exhausted without a collision.
    Exhausted { rounds: u64 },
}

/// Bounded Pollard's-rho attack against the discrete logarithm of a target
/// point in the subgroup generated by a candidate's base point.
#[derive(Debug, Clone, Copy)]
pub struct RhoAttack {
    iteration_cap: u64,
    max_reseeds: u32,
}

impl RhoAttack {
    /// Default bound on degenerate-collision reseeds per invocation.
    const DEFAULT_MAX_RESEEDS: u32 = 4;

    pub fn new(iteration_cap: u64) -> Self {
        Self {
            iteration_cap,
            max_reseeds: Self::DEFAULT_MAX_RESEEDS,
        }
    }

    pub fn with_reseeds(iteration_cap: u64, max_reseeds: u32) -> Self {
        Self {
            iteration_cap,
            max_reseeds,
        }
    }

    pub fn iteration_cap(&self) -> u64 {
        self.iteration_cap
    }

    /// Estimate attack resistance by attacking a synthetic target `d·G` for
    /// a random exponent `d`. Identical to [`RhoAttack::attack`] in every
    /// other respect.
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        params: &CurveParameters,
        rng: &mut R,
    ) -> AttackResult {
        if params.n < 2 {
            return self.capped_result();
        }
        let span = Integer::from(&params.n - 1u32);
        let exponent = Integer::from(1) + random_below(&span, rng);
        match scalar_mul(&params.generator(), &exponent, &params.a, &params.p) {
            Ok(target) => self.attack(params, &target, rng),
            // A degenerate group; nothing to walk on.
            Err(_) => self.capped_result(),
        }
    }

    /// Run the bounded rho walk against an arbitrary target point — for the
    /// attack tool, an observed public key.
    pub fn attack<R: Rng + ?Sized>(
        &self,
        params: &CurveParameters,
        target: &AffinePoint,
        rng: &mut R,
    ) -> AttackResult {
        // A claimed order below 2 leaves no room for walk coefficients.
        if params.n < 2 {
            return self.capped_result();
        }

        let mut consumed = 0u64;

        for attempt in 0..=self.max_reseeds {
            if consumed >= self.iteration_cap {
                break;
            }
            let budget = self.iteration_cap - consumed;

            match self.run_walk(params, target, budget, rng) {
                WalkOutcome::Solved {
                    rounds,
                    discrete_log,
                } => {
                    let total = consumed + rounds;
                    debug!(
                        "rho collision after {} rounds (attempt {})",
                        total, attempt
                    );
                    return AttackResult {
                        iterations: total,
                        estimated_security_bits: (total.max(1) as f64).log2(),
                        capped: false,
                        discrete_log: Some(discrete_log),
                    };
                }
                WalkOutcome::Degenerate { rounds } => {
                    consumed += rounds.max(1);
                    trace!("degenerate rho collision, reseeding walk (attempt {attempt})");
                }
                WalkOutcome::Exhausted { rounds } => {
                    consumed += rounds;
                    break;
                }
            }
        }

        self.capped_result()
    }

    /// The maximal-resistance result: the cap reported as a lower bound.
    fn capped_result(&self) -> AttackResult {
        AttackResult {
            iterations: self.iteration_cap,
            estimated_security_bits: (self.iteration_cap.max(1) as f64).log2(),
            capped: true,
            discrete_log: None,
        }
    }

    /// One tortoise/hare walk from a fresh random start, bounded by
    /// `budget` rounds.
    fn run_walk<R: Rng + ?Sized>(
        &self,
        params: &CurveParameters,
        target: &AffinePoint,
        budget: u64,
        rng: &mut R,
    ) -> WalkOutcome {
        let start = match self.random_start(params, target, rng) {
            Some(state) => state,
            None => return WalkOutcome::Degenerate { rounds: 0 },
        };

        let mut tortoise = match self.step(params, target, &start) {
            Ok(state) => state,
            Err(_) => return WalkOutcome::Degenerate { rounds: 0 },
        };
        let mut hare = match self
            .step(params, target, &tortoise)
            .and_then(|mid| self.step(params, target, &mid))
        {
            Ok(state) => state,
            Err(_) => return WalkOutcome::Degenerate { rounds: 0 },
        };

        let mut rounds = 1u64;
        loop {
            if tortoise.point == hare.point {
                return match self.solve_collision(params, &tortoise, &hare) {
                    Some(discrete_log) => WalkOutcome::Solved {
                        rounds,
                        discrete_log,
                    },
                    None => WalkOutcome::Degenerate { rounds },
                };
            }
            if rounds >= budget {
                return WalkOutcome::Exhausted { rounds };
            }

            let advanced = self.step(params, target, &tortoise).and_then(|t| {
                self.step(params, target, &hare)
                    .and_then(|mid| self.step(params, target, &mid))
                    .map(|h| (t, h))
            });
            match advanced {
                Ok((t, h)) => {
                    tortoise = t;
                    hare = h;
                }
                Err(_) => return WalkOutcome::Degenerate { rounds },
            }
            rounds += 1;
        }
    }

    /// Random initial state `u·G + v·T` with `u, v` in `[1, n)`.
    fn random_start<R: Rng + ?Sized>(
        &self,
        params: &CurveParameters,
        target: &AffinePoint,
        rng: &mut R,
    ) -> Option<WalkState> {
        let span = Integer::from(&params.n - 1u32);
        let base_coeff = Integer::from(1) + random_below(&span, rng);
        let target_coeff = Integer::from(1) + random_below(&span, rng);

        let from_base =
            scalar_mul(&params.generator(), &base_coeff, &params.a, &params.p).ok()?;
        let from_target = scalar_mul(target, &target_coeff, &params.a, &params.p).ok()?;
        let point = add(&from_base, &from_target, &params.a, &params.p).ok()?;

        Some(WalkState {
            point,
            base_coeff,
            target_coeff,
        })
    }

    /// The deterministic iteration function. Branches on `x mod 3`: add the
    /// target, double, or add the base point. Infinity has no x-coordinate,
    /// so it maps to the fixed restart state `T` — keeping `f` a function,
    /// which Floyd's cycle detection requires.
    fn step(
        &self,
        params: &CurveParameters,
        target: &AffinePoint,
        state: &WalkState,
    ) -> Result<WalkState, crate::arithmetic::ArithmeticError> {
        let (x, _) = match state.point.coordinates() {
            Some(xy) => xy,
            None => {
                return Ok(WalkState {
                    point: target.clone(),
                    base_coeff: Integer::new(),
                    target_coeff: Integer::from(1),
                });
            }
        };

        let n = &params.n;
        match x.mod_u(3) {
            0 => Ok(WalkState {
                point: add(&state.point, target, &params.a, &params.p)?,
                base_coeff: state.base_coeff.clone(),
                target_coeff: mod_reduce(&Integer::from(&state.target_coeff + 1u32), n),
            }),
            1 => Ok(WalkState {
                point: double(&state.point, &params.a, &params.p)?,
                base_coeff: mod_reduce(&Integer::from(&state.base_coeff * 2u32), n),
                target_coeff: mod_reduce(&Integer::from(&state.target_coeff * 2u32), n),
            }),
            _ => Ok(WalkState {
                point: add(&state.point, &params.generator(), &params.a, &params.p)?,
                base_coeff: mod_reduce(&Integer::from(&state.base_coeff + 1u32), n),
                target_coeff: state.target_coeff.clone(),
            }),
        }
    }

    /// Solve `u_t + v_t·d ≡ u_h + v_h·d (mod n)` for `d`. `None` when the
    /// relation is singular.
    fn solve_collision(
        &self,
        params: &CurveParameters,
        tortoise: &WalkState,
        hare: &WalkState,
    ) -> Option<Integer> {
        let n = &params.n;
        let denominator = mod_reduce(
            &Integer::from(&tortoise.target_coeff - &hare.target_coeff),
            n,
        );
        if denominator == 0 {
            return None;
        }
        let numerator = mod_reduce(
            &Integer::from(&hare.base_coeff - &tortoise.base_coeff),
            n,
        );
        let inverse = mod_inverse(&denominator, n).ok()?;
        Some(mod_reduce(&(numerator * inverse), n))
    }
}
