// src/curves/parameters.rs
//! Elliptic-curve domain parameters and randomized candidate generation.
//!
//! A [`CurveParameters`] record is the unit of search: the coefficients and
//! modulus of a short-Weierstrass curve, a claimed generator point, and a
//! claimed subgroup order with cofactor. Candidates produced here are
//! *valid-shaped* — prime modulus, non-singular coefficients, generator
//! actually on the curve, order claim inside the Hasse window — but their
//! security properties are only judged later by the validator and the
//! attack evaluator.

use log::debug;
use rand::Rng;
use rug::Integer;
use thiserror::Error;

use crate::arithmetic::{
    curve_discriminant, legendre_symbol, random_below, random_prime, tonelli_shanks, AffinePoint,
};

/// How many x-coordinates the generator scan probes before giving up.
const GENERATOR_SCAN_LIMIT: usize = 4096;

/// How many coefficient pairs are tried per modulus before resampling the
/// prime itself.
const COEFFICIENT_ATTEMPTS: usize = 32;

/// Errors raised while deriving a curve point; recovered by resampling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error(
        "no curve point found on y² = x³ + {a}x + {b} over F_{p} after {attempts} x-coordinates"
    )]
    NoGeneratorPoint {
        a: Integer,
        b: Integer,
        p: Integer,
        attempts: usize,
    },
}

/// Domain parameters of one candidate curve.
///
/// Immutable value type; the search drivers replace whole records rather
/// than mutating one in place. All fields are non-negative and, for a
/// candidate fresh out of [`random_curve`], bounded by the configured bit
/// width of `p`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveParameters {
    /// Coefficient `a` of `y² = x³ + ax + b`.
    pub a: Integer,
    /// Coefficient `b`.
    pub b: Integer,
    /// Prime modulus of the base field.
    pub p: Integer,
    /// Generator x-coordinate.
    pub gx: Integer,
    /// Generator y-coordinate.
    pub gy: Integer,
    /// Claimed order of the subgroup generated by `(gx, gy)`.
    pub n: Integer,
    /// Cofactor: full curve order divided by `n`.
    pub h: Integer,
}

impl CurveParameters {
    /// The claimed generator as an affine point.
    pub fn generator(&self) -> AffinePoint {
        AffinePoint::Point {
            x: self.gx.clone(),
            y: self.gy.clone(),
        }
    }

    /// Claimed order of the full curve group, `h · n`.
    pub fn full_order(&self) -> Integer {
        Integer::from(&self.h * &self.n)
    }

    /// Width of the modulus in bits.
    pub fn bit_width(&self) -> u32 {
        self.p.significant_bits()
    }
}

/// The Hasse interval `[p + 1 - 2⌊√p⌋, p + 1 + 2⌊√p⌋]` that every curve
/// order over `F_p` must fall into.
pub fn hasse_window(p: &Integer) -> (Integer, Integer) {
    let two_sqrt = p.clone().sqrt() * 2u32;
    let centre = Integer::from(p + 1u32);
    (Integer::from(&centre - &two_sqrt), centre + two_sqrt)
}

/// Find a point on `y² = x³ + ax + b` over `F_p` by scanning x-coordinates
/// upward from `start_x` (wrapping modulo `p`) and taking the Tonelli–Shanks
/// root of the first quadratic-residue right-hand side.
///
/// Deterministic for a given starting coordinate, which the swarm repair
/// step relies on.
pub fn find_generator_from(
    a: &Integer,
    b: &Integer,
    p: &Integer,
    start_x: &Integer,
) -> Result<(Integer, Integer), GenerationError> {
    let limit = p
        .to_usize()
        .map(|v| v.min(GENERATOR_SCAN_LIMIT))
        .unwrap_or(GENERATOR_SCAN_LIMIT);

    let mut x = Integer::from(start_x % p);
    for _ in 0..limit {
        let x_cubed = Integer::from(&x * &x) * &x;
        let rhs = (x_cubed + Integer::from(a * &x) + b) % p;
        if legendre_symbol(&rhs, p) == 1 {
            match tonelli_shanks(&rhs, p) {
                Ok(y) => return Ok((x, y)),
                // The residue check above makes this unreachable for a prime
                // modulus; keep scanning rather than trust the caller.
                Err(_) => {}
            }
        }
        x += 1;
        if x == *p {
            x = Integer::new();
        }
    }

    Err(GenerationError::NoGeneratorPoint {
        a: a.clone(),
        b: b.clone(),
        p: p.clone(),
        attempts: limit,
    })
}

/// Find a curve point starting the scan at a random x-coordinate.
pub fn find_generator<R: Rng + ?Sized>(
    a: &Integer,
    b: &Integer,
    p: &Integer,
    rng: &mut R,
) -> Result<(Integer, Integer), GenerationError> {
    let start = random_below(p, rng);
    find_generator_from(a, b, p, &start)
}

/// Sample one valid-shaped candidate.
///
/// Rejection-samples a prime `p` of exactly `bits` bits, draws coefficients
/// until the discriminant is nonzero, derives a generator, and claims an
/// order `p + 1 - t` with the trace `t` drawn uniformly from the Hasse
/// window (cofactor 1). Failed generator derivations resample the
/// coefficients; exhausted coefficient attempts resample the prime.
pub fn random_curve<R: Rng + ?Sized>(bits: u32, mr_rounds: u32, rng: &mut R) -> CurveParameters {
    loop {
        let p = random_prime(bits, mr_rounds, rng);

        for _ in 0..COEFFICIENT_ATTEMPTS {
            let a = random_below(&p, rng);
            let b = random_below(&p, rng);
            if curve_discriminant(&a, &b, &p) == 0 {
                continue;
            }

            match find_generator(&a, &b, &p, rng) {
                Ok((gx, gy)) => {
                    let two_sqrt = p.clone().sqrt() * 2u32;
                    let span = Integer::from(&two_sqrt * 2u32) + 1u32;
                    let trace = random_below(&span, rng) - &two_sqrt;
                    let n = Integer::from(&p + 1u32) - trace;

                    return CurveParameters {
                        a,
                        b,
                        p,
                        gx,
                        gy,
                        n,
                        h: Integer::from(1),
                    };
                }
                Err(err) => {
                    debug!("generator derivation failed, resampling coefficients: {err}");
                }
            }
        }
    }
}
