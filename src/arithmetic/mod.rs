// src/arithmetic/mod.rs
//! Number-theory kernel: modular arithmetic and affine elliptic-curve point
//! operations. Everything here is pure, side-effect-free and takes its
//! modulus explicitly.

pub mod modular;
pub mod point;

pub use modular::{
    curve_discriminant, legendre_symbol, miller_rabin, mod_exp, mod_inverse, mod_reduce,
    random_below, random_prime, tonelli_shanks, ArithmeticError,
};
pub use point::{add, double, is_on_curve, negate, scalar_mul, AffinePoint};
