// src/arithmetic/modular.rs
//! Modular arithmetic kernel: reduction, exponentiation, inversion,
//! probabilistic primality testing, the Legendre symbol and Tonelli–Shanks
//! square roots over arbitrary-precision integers.
//!
//! Every operation is a pure function taking its modulus explicitly; nothing
//! in this module holds global state. Probabilistic routines draw all of
//! their randomness from the caller's generator, so a fixed seed reproduces
//! every decision bit for bit.

use rand::Rng;
use rug::integer::Order;
use rug::Integer;
use thiserror::Error;

/// Errors raised by the arithmetic kernel.
///
/// Both variants are expected, locally recoverable outcomes: callers resample
/// their inputs rather than aborting a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArithmeticError {
    #[error("{residue} is a quadratic non-residue modulo {modulus}: no square root exists")]
    NoSquareRoot { residue: Integer, modulus: Integer },

    #[error("{value} is not invertible modulo {modulus}")]
    NotInvertible { value: Integer, modulus: Integer },
}

/// Canonical representative of `value` in `[0, modulus)`.
pub fn mod_reduce(value: &Integer, modulus: &Integer) -> Integer {
    let remainder = Integer::from(value % modulus);
    if remainder < 0 {
        remainder + modulus
    } else {
        remainder
    }
}

/// Modular exponentiation `base^exponent mod modulus` for a non-negative
/// exponent.
pub fn mod_exp(base: &Integer, exponent: &Integer, modulus: &Integer) -> Integer {
    debug_assert!(*exponent >= 0, "exponent must be non-negative");
    base.clone()
        .pow_mod(exponent, modulus)
        .expect("modular exponentiation with a non-negative exponent cannot fail")
}

/// Modular inverse via the extended Euclidean algorithm.
pub fn mod_inverse(value: &Integer, modulus: &Integer) -> Result<Integer, ArithmeticError> {
    let reduced = mod_reduce(value, modulus);
    reduced
        .invert(modulus)
        .map_err(|_| ArithmeticError::NotInvertible {
            value: value.clone(),
            modulus: modulus.clone(),
        })
}

/// Miller–Rabin primality test with `rounds` random witnesses.
///
/// The error probability is at most `4^-rounds` for a composite input. The
/// witness bases come from `rng`, which keeps the verdict reproducible under
/// a fixed seed.
pub fn miller_rabin<R: Rng + ?Sized>(candidate: &Integer, rounds: u32, rng: &mut R) -> bool {
    if *candidate < 2 {
        return false;
    }
    if *candidate < 4 {
        return true;
    }
    if candidate.is_even() {
        return false;
    }

    // Write candidate - 1 as d * 2^s with d odd.
    let n_minus_one = Integer::from(candidate - 1u32);
    let mut d = n_minus_one.clone();
    let mut s = 0u32;
    while d.is_even() {
        d >>= 1;
        s += 1;
    }

    let base_span = Integer::from(candidate - 3u32);
    for _ in 0..rounds {
        // Witness base in [2, candidate - 2].
        let base = Integer::from(2) + random_below(&base_span, rng);
        let mut x = mod_exp(&base, &d, candidate);
        if x == 1 || x == n_minus_one {
            continue;
        }

        let mut composite = true;
        for _ in 1..s {
            x = x.square() % candidate;
            if x == n_minus_one {
                composite = false;
                break;
            }
        }
        if composite {
            return false;
        }
    }

    true
}

/// Legendre symbol `(value / p)` via Euler's criterion: `1` for a quadratic
/// residue, `-1` for a non-residue, `0` when `p` divides `value`.
pub fn legendre_symbol(value: &Integer, p: &Integer) -> i32 {
    let reduced = mod_reduce(value, p);
    if reduced == 0 {
        return 0;
    }
    let exponent = Integer::from(p - 1u32) / 2u32;
    let symbol = mod_exp(&reduced, &exponent, p);
    if symbol == 1 {
        1
    } else if symbol == Integer::from(p - 1u32) {
        -1
    } else {
        0
    }
}

/// Tonelli–Shanks modular square root for an odd prime modulus.
///
/// Returns one root `r` with `r² ≡ residue (mod p)`; the other root is
/// `p - r`. Fails with [`ArithmeticError::NoSquareRoot`] when the residue is
/// a quadratic non-residue.
pub fn tonelli_shanks(residue: &Integer, p: &Integer) -> Result<Integer, ArithmeticError> {
    let n = mod_reduce(residue, p);
    if n == 0 {
        return Ok(Integer::new());
    }
    if *p == 2 {
        return Ok(n);
    }
    if legendre_symbol(&n, p) != 1 {
        return Err(ArithmeticError::NoSquareRoot {
            residue: residue.clone(),
            modulus: p.clone(),
        });
    }

    // Fast path for p ≡ 3 (mod 4): r = n^((p+1)/4).
    if p.mod_u(4) == 3 {
        let exponent = Integer::from(p + 1u32) / 4u32;
        return Ok(mod_exp(&n, &exponent, p));
    }

    // Write p - 1 as q * 2^s with q odd.
    let mut q = Integer::from(p - 1u32);
    let mut s = 0u32;
    while q.is_even() {
        q >>= 1;
        s += 1;
    }

    // Any quadratic non-residue works as the seed of the correction chain.
    let mut z = Integer::from(2);
    while legendre_symbol(&z, p) != -1 {
        z += 1;
    }

    let mut m = s;
    let mut c = mod_exp(&z, &q, p);
    let mut t = mod_exp(&n, &q, p);
    let mut r = mod_exp(&n, &(Integer::from(&q + 1u32) / 2u32), p);

    while t != 1 {
        // Least i with t^(2^i) = 1; guaranteed i < m.
        let mut i = 0u32;
        let mut t_i = t.clone();
        while t_i != 1 {
            t_i = t_i.square() % p;
            i += 1;
        }

        let mut b = c;
        for _ in 0..(m - i - 1) {
            b = b.square() % p;
        }

        r = Integer::from(&r * &b) % p;
        let b_squared = Integer::from(&b * &b) % p;
        t = Integer::from(&t * &b_squared) % p;
        c = b_squared;
        m = i;
    }

    Ok(r)
}

/// Discriminant `Δ = -16(4a³ + 27b²) mod p` of the short-Weierstrass curve
/// `y² = x³ + ax + b`. The curve is singular exactly when this is zero.
pub fn curve_discriminant(a: &Integer, b: &Integer, p: &Integer) -> Integer {
    let a_cubed = Integer::from(a * a) * a;
    let b_squared = Integer::from(b * b);
    let inner = a_cubed * 4u32 + b_squared * 27u32;
    mod_reduce(&(inner * -16i32), p)
}

/// Uniform random integer in `[0, bound)`.
///
/// Draws 64 bits beyond the bound's width before reducing, which makes the
/// modulo bias negligible for every width this crate works at.
pub fn random_below<R: Rng + ?Sized>(bound: &Integer, rng: &mut R) -> Integer {
    debug_assert!(*bound > 0, "bound must be positive");
    let bits = bound.significant_bits() + 64;
    let mut buf = vec![0u8; ((bits + 7) / 8) as usize];
    rng.fill_bytes(&mut buf);
    Integer::from_digits(&buf, Order::Lsf) % bound
}

/// Random prime of exactly `bits` significant bits, found by rejection
/// sampling odd candidates with the top bit pinned.
pub fn random_prime<R: Rng + ?Sized>(bits: u32, rounds: u32, rng: &mut R) -> Integer {
    debug_assert!(bits >= 2, "a prime needs at least two bits");
    let mut buf = vec![0u8; ((bits + 7) / 8) as usize];
    loop {
        rng.fill_bytes(&mut buf);
        let mut candidate = Integer::from_digits(&buf, Order::Lsf);
        candidate.keep_bits_mut(bits);
        candidate.set_bit(bits - 1, true);
        candidate.set_bit(0, true);
        if miller_rabin(&candidate, rounds, rng) {
            return candidate;
        }
    }
}
