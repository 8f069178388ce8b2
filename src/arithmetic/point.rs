// src/arithmetic/point.rs
//! Affine point arithmetic on short-Weierstrass curves `y² = x³ + ax + b`
//! over a prime field.
//!
//! The point at infinity is a distinguished variant rather than a coordinate
//! pair, and every operation takes the curve coefficient `a` and the modulus
//! explicitly. Slope computations propagate [`ArithmeticError::NotInvertible`]
//! instead of assuming a prime modulus; with a verified prime the only
//! degenerate denominators are the ones already routed to infinity.

use rug::Integer;

use crate::arithmetic::modular::{mod_inverse, mod_reduce, ArithmeticError};

/// A point on a short-Weierstrass curve in affine coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AffinePoint {
    /// The identity element of the group law.
    Infinity,
    /// A finite point with coordinates reduced modulo the field prime.
    Point { x: Integer, y: Integer },
}

impl AffinePoint {
    /// Build a finite point from coordinates, reducing them modulo `p`.
    pub fn new(x: Integer, y: Integer, p: &Integer) -> Self {
        AffinePoint::Point {
            x: mod_reduce(&x, p),
            y: mod_reduce(&y, p),
        }
    }

    pub fn is_infinity(&self) -> bool {
        matches!(self, AffinePoint::Infinity)
    }

    /// Coordinates of a finite point, `None` at infinity.
    pub fn coordinates(&self) -> Option<(&Integer, &Integer)> {
        match self {
            AffinePoint::Infinity => None,
            AffinePoint::Point { x, y } => Some((x, y)),
        }
    }
}

/// Whether `point` satisfies `y² ≡ x³ + ax + b (mod p)`. Infinity is always
/// on the curve.
pub fn is_on_curve(point: &AffinePoint, a: &Integer, b: &Integer, p: &Integer) -> bool {
    match point {
        AffinePoint::Infinity => true,
        AffinePoint::Point { x, y } => {
            let lhs = mod_reduce(&Integer::from(y * y), p);
            let x_cubed = Integer::from(x * x) * x;
            let rhs = mod_reduce(&(x_cubed + Integer::from(a * x) + b), p);
            lhs == rhs
        }
    }
}

/// The inverse `-P` of a point.
pub fn negate(point: &AffinePoint, p: &Integer) -> AffinePoint {
    match point {
        AffinePoint::Infinity => AffinePoint::Infinity,
        AffinePoint::Point { x, y } => AffinePoint::Point {
            x: x.clone(),
            y: mod_reduce(&(-y.clone()), p),
        },
    }
}

/// Chord-rule addition of two points.
pub fn add(
    lhs: &AffinePoint,
    rhs: &AffinePoint,
    a: &Integer,
    p: &Integer,
) -> Result<AffinePoint, ArithmeticError> {
    let (x1, y1) = match lhs.coordinates() {
        Some(xy) => xy,
        None => return Ok(rhs.clone()),
    };
    let (x2, y2) = match rhs.coordinates() {
        Some(xy) => xy,
        None => return Ok(lhs.clone()),
    };

    if x1 == x2 {
        // Same x: either P + (-P) = O, or a doubling.
        if mod_reduce(&Integer::from(y1 + y2), p) == 0 {
            return Ok(AffinePoint::Infinity);
        }
        return double(lhs, a, p);
    }

    let numerator = Integer::from(y2 - y1);
    let denominator = Integer::from(x2 - x1);
    let slope = mod_reduce(&(numerator * mod_inverse(&denominator, p)?), p);

    Ok(chord_result(&slope, x1, x2, y1, p))
}

/// Tangent-rule doubling of a point.
pub fn double(
    point: &AffinePoint,
    a: &Integer,
    p: &Integer,
) -> Result<AffinePoint, ArithmeticError> {
    let (x, y) = match point.coordinates() {
        Some(xy) => xy,
        None => return Ok(AffinePoint::Infinity),
    };
    if mod_reduce(y, p) == 0 {
        // Two-torsion: the tangent is vertical.
        return Ok(AffinePoint::Infinity);
    }

    let numerator = Integer::from(x * x) * 3u32 + a;
    let denominator = Integer::from(y * 2u32);
    let slope = mod_reduce(&(numerator * mod_inverse(&denominator, p)?), p);

    Ok(chord_result(&slope, x, x, y, p))
}

/// Scalar multiplication `k·P` by repeated doubling, for `k ≥ 0`.
pub fn scalar_mul(
    point: &AffinePoint,
    scalar: &Integer,
    a: &Integer,
    p: &Integer,
) -> Result<AffinePoint, ArithmeticError> {
    debug_assert!(*scalar >= 0, "scalar must be non-negative");

    let mut result = AffinePoint::Infinity;
    let mut addend = point.clone();
    let mut k = scalar.clone();
    while k > 0 {
        if k.is_odd() {
            result = add(&result, &addend, a, p)?;
        }
        addend = double(&addend, a, p)?;
        k >>= 1;
    }
    Ok(result)
}

/// Third intersection of the chord/tangent with the curve, mirrored:
/// `x3 = λ² - x1 - x2`, `y3 = λ(x1 - x3) - y1`.
fn chord_result(
    slope: &Integer,
    x1: &Integer,
    x2: &Integer,
    y1: &Integer,
    p: &Integer,
) -> AffinePoint {
    let x3 = mod_reduce(&(Integer::from(slope * slope) - x1 - x2), p);
    let run = Integer::from(x1 - &x3);
    let y3 = mod_reduce(&(Integer::from(slope * &run) - y1), p);
    AffinePoint::Point { x: x3, y: y3 }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The textbook curve y² = x³ + 2x + 2 over F_17 with generator (5, 1),
    // whose group has order 19.
    fn curve() -> (Integer, Integer, Integer) {
        (Integer::from(2), Integer::from(2), Integer::from(17))
    }

    fn generator() -> AffinePoint {
        AffinePoint::Point {
            x: Integer::from(5),
            y: Integer::from(1),
        }
    }

    #[test]
    fn test_point_on_curve_detection() {
        let (a, b, p) = curve();
        assert!(is_on_curve(&generator(), &a, &b, &p));
        assert!(is_on_curve(&AffinePoint::Infinity, &a, &b, &p));
        let off = AffinePoint::Point {
            x: Integer::from(5),
            y: Integer::from(2),
        };
        assert!(!is_on_curve(&off, &a, &b, &p));
    }

    #[test]
    fn test_doubling_matches_known_value() {
        let (a, b, p) = curve();
        let doubled = double(&generator(), &a, &p).expect("doubling must succeed");
        assert_eq!(
            doubled,
            AffinePoint::Point {
                x: Integer::from(6),
                y: Integer::from(3)
            },
            "2G on this curve is (6, 3)"
        );
        assert!(is_on_curve(&doubled, &a, &b, &p));
    }

    #[test]
    fn test_addition_matches_known_value() {
        let (a, _, p) = curve();
        let g = generator();
        let two_g = double(&g, &a, &p).unwrap();
        let three_g = add(&g, &two_g, &a, &p).expect("addition must succeed");
        assert_eq!(
            three_g,
            AffinePoint::Point {
                x: Integer::from(10),
                y: Integer::from(6)
            },
            "3G on this curve is (10, 6)"
        );
    }

    #[test]
    fn test_identity_and_inverse_laws() {
        let (a, _, p) = curve();
        let g = generator();

        let g_plus_o = add(&g, &AffinePoint::Infinity, &a, &p).unwrap();
        assert_eq!(g_plus_o, g, "P + O must equal P");

        let neg_g = negate(&g, &p);
        let sum = add(&g, &neg_g, &a, &p).unwrap();
        assert!(sum.is_infinity(), "P + (-P) must be the identity");
    }

    #[test]
    fn test_scalar_multiplication_agrees_with_group_order() {
        let (a, b, p) = curve();
        let g = generator();

        assert!(scalar_mul(&g, &Integer::from(0), &a, &p)
            .unwrap()
            .is_infinity());
        assert_eq!(scalar_mul(&g, &Integer::from(1), &a, &p).unwrap(), g);

        // The subgroup generated by G has order 19.
        let order_mul = scalar_mul(&g, &Integer::from(19), &a, &p).unwrap();
        assert!(order_mul.is_infinity(), "19·G must be the identity");

        let eighteen = scalar_mul(&g, &Integer::from(18), &a, &p).unwrap();
        assert_eq!(eighteen, negate(&g, &p), "18·G must equal -G");

        for k in 1u32..19 {
            let multiple = scalar_mul(&g, &Integer::from(k), &a, &p).unwrap();
            assert!(
                is_on_curve(&multiple, &a, &b, &p),
                "{}·G must stay on the curve",
                k
            );
        }
    }

    #[test]
    fn test_two_torsion_doubles_to_infinity() {
        // On y² = x³ + 4x over F_17 the point (0, 0) has order two.
        let a = Integer::from(4);
        let p = Integer::from(17);
        let torsion = AffinePoint::Point {
            x: Integer::from(0),
            y: Integer::from(0),
        };
        assert!(double(&torsion, &a, &p).unwrap().is_infinity());
    }
}
