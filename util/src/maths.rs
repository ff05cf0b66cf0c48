//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::{Float, FloatConst};

/// Get the signed shortest angular distance to travel from `a` to `b`.
///
/// The result lies in `(-pi, pi]` and `a + result` points along the same ray
/// as `b`. Inputs may be any finite angle, wrapped or not.
pub fn smallest_angular_difference<T>(a: T, b: T) -> T
where
    T: Float + FloatConst
{
    let pi_t = T::PI();
    let tau_t = pi_t + pi_t;

    let d = rem_euclid(b - a, tau_t);

    if d > pi_t {
        d - tau_t
    }
    else {
        d
    }
}

/// Wrap an angle into the range `(-pi, pi]`.
pub fn wrap_angle<T>(angle: T) -> T
where
    T: Float + FloatConst
{
    smallest_angular_difference(T::zero(), angle)
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Return `1` with the sign of `value`, or `0` if the value is zero.
pub fn sign_or_zero<T>(value: T) -> T
where
    T: Float
{
    if value > T::zero() {
        T::one()
    }
    else if value < T::zero() {
        -T::one()
    }
    else {
        T::zero()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    const TAU: f64 = std::f64::consts::TAU;
    const PI: f64 = std::f64::consts::PI;

    #[test]
    fn test_smallest_angular_difference() {
        assert_relative_eq!(smallest_angular_difference(1f64, 2f64), 1f64);
        assert_relative_eq!(smallest_angular_difference(2f64, 1f64), -1f64);
        assert_relative_eq!(smallest_angular_difference(0f64, TAU), 0f64);
        assert_relative_eq!(smallest_angular_difference(TAU, 0f64), 0f64);
        assert_relative_eq!(smallest_angular_difference(1f64, TAU), -1f64, epsilon = 1e-12);
        assert_relative_eq!(smallest_angular_difference(TAU - 1f64, 1f64), 2f64, epsilon = 1e-12);

        // Crossing the +-pi seam takes the short way round
        assert_relative_eq!(
            smallest_angular_difference(PI - 0.1, -PI + 0.1),
            0.2,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            smallest_angular_difference(-PI + 0.1, PI - 0.1),
            -0.2,
            epsilon = 1e-12
        );

        // Exactly opposite resolves to +pi
        assert_relative_eq!(smallest_angular_difference(0f64, PI), PI);
    }

    #[test]
    fn test_smallest_angular_difference_same_ray() {
        for &(a, b) in &[(0.3, 7.0), (-12.0, 4.5), (100.0, -100.0), (3.0, -3.0)] {
            let d: f64 = smallest_angular_difference(a, b);
            assert!(d > -PI && d <= PI);
            let end = a + d;
            assert_relative_eq!(end.cos(), b.cos(), epsilon = 1e-9);
            assert_relative_eq!(end.sin(), b.sin(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_wrap_angle() {
        assert_relative_eq!(wrap_angle(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(-PI), PI);
    }

    #[test]
    fn test_sign_or_zero() {
        assert_eq!(sign_or_zero(-3.2f64), -1.0);
        assert_eq!(sign_or_zero(0.0f64), 0.0);
        assert_eq!(sign_or_zero(0.1f64), 1.0);
    }
}
