// src/curves/validation.rs
//! Structural and security validation of candidate curve parameters.
//!
//! [`CurveValidator::validate`] recomputes a fresh [`ValidationReport`] for
//! every candidate — reports are never cached or mutated. The checks run in
//! cost order and stop as soon as a failed hard check makes the rest
//! irrelevant: primality, non-singularity, point-on-curve, the Hasse bound
//! on the claimed order, and cofactor consistency. The two weak-structure
//! classes (anomalous, supersingular) are *flags*, not rejections; the
//! fitness layer penalizes them while keeping the search gradient alive.
//!
//! Validation is deterministic given the same candidate and the same
//! primality-witness seed.

use rand::Rng;
use rug::Integer;

use crate::arithmetic::{curve_discriminant, is_on_curve, miller_rabin, scalar_mul};
use crate::curves::parameters::{hasse_window, CurveParameters};

/// Outcome of validating one candidate. A pure function of the parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationReport {
    /// The modulus is (probably) prime and the characteristic exceeds 3.
    pub is_prime_p: bool,
    /// `-16(4a³ + 27b²) ≢ 0 (mod p)`: the curve is non-singular.
    pub discriminant_nonzero: bool,
    /// The claimed generator satisfies the curve equation.
    pub point_on_curve: bool,
    /// The claimed subgroup order lies inside the Hasse window.
    pub hasse_bound_ok: bool,
    /// `h ≥ 1`, `h·n` lies inside the Hasse window, and `h·G` stays finite
    /// for `h > 1`.
    pub cofactor_ok: bool,
    /// Curve order equals `p` (Frobenius trace 1) — weak, flagged.
    pub is_anomalous: bool,
    /// Frobenius trace divisible by `p` — weak, flagged.
    pub is_supersingular: bool,
}

impl ValidationReport {
    /// Whether every hard check passed. Weak-structure flags do not count:
    /// they reduce fitness instead of disqualifying the candidate.
    pub fn hard_checks_pass(&self) -> bool {
        self.is_prime_p
            && self.discriminant_nonzero
            && self.point_on_curve
            && self.hasse_bound_ok
            && self.cofactor_ok
    }

    /// Whether the curve falls into a known-weak structural class.
    pub fn has_weak_structure(&self) -> bool {
        self.is_anomalous || self.is_supersingular
    }
}

/// Validator with a configured primality-test confidence.
#[derive(Debug, Clone, Copy)]
pub struct CurveValidator {
    miller_rabin_rounds: u32,
}

impl CurveValidator {
    pub fn new(miller_rabin_rounds: u32) -> Self {
        Self {
            miller_rabin_rounds,
        }
    }

    /// Validate one candidate, short-circuiting after the first failed hard
    /// check. `rng` supplies the Miller–Rabin witnesses.
    pub fn validate<R: Rng + ?Sized>(
        &self,
        params: &CurveParameters,
        rng: &mut R,
    ) -> ValidationReport {
        let mut report = ValidationReport::default();

        // The affine chord-tangent formulas assume characteristic > 3, so
        // 2 and 3 are rejected along with composites.
        report.is_prime_p =
            params.p > 3 && miller_rabin(&params.p, self.miller_rabin_rounds, rng);
        if !report.is_prime_p {
            return report;
        }

        report.discriminant_nonzero =
            curve_discriminant(&params.a, &params.b, &params.p) != 0;
        if !report.discriminant_nonzero {
            return report;
        }

        report.point_on_curve =
            is_on_curve(&params.generator(), &params.a, &params.b, &params.p);
        if !report.point_on_curve {
            return report;
        }

        let (lower, upper) = hasse_window(&params.p);
        report.hasse_bound_ok = params.n >= lower && params.n <= upper;
        if !report.hasse_bound_ok {
            return report;
        }

        report.cofactor_ok = self.cofactor_consistent(params, &lower, &upper);
        if !report.cofactor_ok {
            return report;
        }

        // Weak-structure flags, judged on the full group order.
        let full_order = params.full_order();
        report.is_anomalous = full_order == params.p;
        let trace = Integer::from(&params.p + 1u32) - &full_order;
        report.is_supersingular = trace.is_divisible(&params.p);

        report
    }

    /// Cofactor consistency: the claimed full order `h·n` must also satisfy
    /// Hasse, and for `h > 1` multiplying the generator by the cofactor must
    /// not collapse to infinity.
    fn cofactor_consistent(
        &self,
        params: &CurveParameters,
        lower: &Integer,
        upper: &Integer,
    ) -> bool {
        if params.h < 1 {
            return false;
        }
        let full_order = params.full_order();
        if full_order < *lower || full_order > *upper {
            return false;
        }
        if params.h == 1 {
            return true;
        }
        match scalar_mul(&params.generator(), &params.h, &params.a, &params.p) {
            Ok(point) => !point.is_infinity(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0x5eed)
    }

    /// y² = x³ + 2x + 2 over F_17 with generator (5, 1); the subgroup order
    /// really is 19 and the Hasse window is [10, 26].
    fn known_good() -> CurveParameters {
        CurveParameters {
            a: Integer::from(2),
            b: Integer::from(2),
            p: Integer::from(17),
            gx: Integer::from(5),
            gy: Integer::from(1),
            n: Integer::from(19),
            h: Integer::from(1),
        }
    }

    #[test]
    fn test_known_good_curve_passes_everything() {
        let report = CurveValidator::new(25).validate(&known_good(), &mut rng());
        assert!(report.is_prime_p);
        assert!(report.discriminant_nonzero);
        assert!(report.point_on_curve);
        assert!(report.hasse_bound_ok);
        assert!(report.cofactor_ok);
        assert!(report.hard_checks_pass());
        assert!(!report.is_anomalous, "order 19 ≠ p = 17");
        assert!(!report.is_supersingular, "trace is -1");
        assert!(!report.has_weak_structure());
    }

    #[test]
    fn test_composite_modulus_short_circuits() {
        let mut params = known_good();
        params.p = Integer::from(16);
        let report = CurveValidator::new(25).validate(&params, &mut rng());
        assert!(!report.is_prime_p);
        assert!(
            !report.discriminant_nonzero && !report.point_on_curve && !report.hasse_bound_ok,
            "later checks must not run after the primality failure"
        );
        assert!(!report.hard_checks_pass());
    }

    #[test]
    fn test_singular_curve_rejected() {
        let mut params = known_good();
        params.a = Integer::from(0);
        params.b = Integer::from(0);
        let report = CurveValidator::new(25).validate(&params, &mut rng());
        assert!(report.is_prime_p);
        assert!(!report.discriminant_nonzero, "Δ = 0 must be rejected");
        assert!(!report.hard_checks_pass());
    }

    #[test]
    fn test_off_curve_generator_rejected() {
        let mut params = known_good();
        params.gy = Integer::from(2);
        let report = CurveValidator::new(25).validate(&params, &mut rng());
        assert!(!report.point_on_curve);
        assert!(!report.hard_checks_pass());
    }

    #[test]
    fn test_hasse_bound_for_p_17() {
        let validator = CurveValidator::new(25);
        // Inside [10, 26]: accepted (possibly flagged, never hard-failed).
        for order in [10u32, 19, 26] {
            let mut params = known_good();
            params.n = Integer::from(order);
            let report = validator.validate(&params, &mut rng());
            assert!(
                report.hasse_bound_ok,
                "claimed order {} lies inside [10, 26]",
                order
            );
        }
        // Outside: rejected.
        for order in [5u32, 9, 27, 100] {
            let mut params = known_good();
            params.n = Integer::from(order);
            let report = validator.validate(&params, &mut rng());
            assert!(
                !report.hasse_bound_ok,
                "claimed order {} violates the Hasse bound",
                order
            );
            assert!(!report.hard_checks_pass());
        }
    }

    #[test]
    fn test_anomalous_curve_flagged_not_rejected() {
        let mut params = known_good();
        params.n = Integer::from(17); // order == p
        let report = CurveValidator::new(25).validate(&params, &mut rng());
        assert!(report.hard_checks_pass(), "anomalous is a flag, not a failure");
        assert!(report.is_anomalous);
        assert!(report.has_weak_structure());
    }

    #[test]
    fn test_supersingular_curve_flagged_not_rejected() {
        let mut params = known_good();
        params.n = Integer::from(18); // order == p + 1, trace 0
        let report = CurveValidator::new(25).validate(&params, &mut rng());
        assert!(report.hard_checks_pass());
        assert!(report.is_supersingular);
        assert!(!report.is_anomalous);
    }

    #[test]
    fn test_cofactor_inconsistency_rejected() {
        let validator = CurveValidator::new(25);

        // h = 2 pushes the full order to 38, outside [10, 26].
        let mut params = known_good();
        params.h = Integer::from(2);
        let report = validator.validate(&params, &mut rng());
        assert!(!report.cofactor_ok);
        assert!(!report.hard_checks_pass());

        // A zero cofactor is invalid outright.
        let mut params = known_good();
        params.h = Integer::from(0);
        let report = validator.validate(&params, &mut rng());
        assert!(!report.cofactor_ok);
    }

    #[test]
    fn test_validation_is_deterministic_under_fixed_seed() {
        let validator = CurveValidator::new(25);
        let params = known_good();
        let first = validator.validate(&params, &mut StdRng::seed_from_u64(9));
        let second = validator.validate(&params, &mut StdRng::seed_from_u64(9));
        assert_eq!(first, second);
    }
}
