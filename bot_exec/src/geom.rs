//! # Geometry value types
//!
//! Minimal planar geometry consumed by odometry and the drive controller. All types are plain
//! `Copy` values stored in canonical SI units (meters, radians, meters/second), arithmetic returns
//! new values.
//!
//! Frame convention: +x is the robot's forward direction at zero rotation, +y is to its left, and
//! rotations are counter-clockwise positive when viewed from above.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};

use util::maths::{smallest_angular_difference, wrap_angle};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A planar rotation.
///
/// The angle is not wrapped on construction so that continuous quantities (a gyro that has turned
/// several times) survive arithmetic. Use `wrapped` when a canonical angle is needed.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation2d {
    angle_radians: f64,
}

/// A signed distance along one axis.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Translation1d {
    magnitude: f64,
}

/// A signed speed along one axis.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Velocity1d {
    magnitude: f64,
}

/// A planar displacement.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Translation2d {
    pub x: Translation1d,
    pub y: Translation1d,
}

/// Position and heading of the robot in the field frame.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose2d {
    pub translation: Translation2d,
    pub rotation: Rotation2d,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Rotation2d {
    pub fn from_radians(angle_radians: f64) -> Self {
        Self { angle_radians }
    }

    pub fn from_degrees(angle_degrees: f64) -> Self {
        Self {
            angle_radians: angle_degrees.to_radians(),
        }
    }

    pub fn radians(&self) -> f64 {
        self.angle_radians
    }

    pub fn degrees(&self) -> f64 {
        self.angle_radians.to_degrees()
    }

    pub fn cos(&self) -> f64 {
        self.angle_radians.cos()
    }

    pub fn sin(&self) -> f64 {
        self.angle_radians.sin()
    }

    /// The same rotation expressed in `(-pi, pi]`.
    pub fn wrapped(&self) -> Self {
        Self::from_radians(wrap_angle(self.angle_radians))
    }

    /// Shortest signed rotation which takes `self` onto `other`.
    pub fn difference_to(&self, other: Rotation2d) -> Self {
        Self::from_radians(smallest_angular_difference(
            self.angle_radians,
            other.angle_radians,
        ))
    }
}

impl Add for Rotation2d {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::from_radians(self.angle_radians + rhs.angle_radians)
    }
}

impl Sub for Rotation2d {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::from_radians(self.angle_radians - rhs.angle_radians)
    }
}

impl Neg for Rotation2d {
    type Output = Self;

    fn neg(self) -> Self {
        Self::from_radians(-self.angle_radians)
    }
}

impl Mul<f64> for Rotation2d {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::from_radians(self.angle_radians * rhs)
    }
}

impl Translation1d {
    pub fn from_meters(magnitude: f64) -> Self {
        Self { magnitude }
    }

    pub fn meters(&self) -> f64 {
        self.magnitude
    }

    pub fn abs(&self) -> Self {
        Self::from_meters(self.magnitude.abs())
    }
}

impl Add for Translation1d {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::from_meters(self.magnitude + rhs.magnitude)
    }
}

impl Sub for Translation1d {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::from_meters(self.magnitude - rhs.magnitude)
    }
}

impl Neg for Translation1d {
    type Output = Self;

    fn neg(self) -> Self {
        Self::from_meters(-self.magnitude)
    }
}

impl Mul<f64> for Translation1d {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::from_meters(self.magnitude * rhs)
    }
}

impl Velocity1d {
    pub fn from_mps(magnitude: f64) -> Self {
        Self { magnitude }
    }

    pub fn mps(&self) -> f64 {
        self.magnitude
    }

    /// Distance covered at this speed over `seconds`.
    pub fn over(&self, seconds: f64) -> Translation1d {
        Translation1d::from_meters(self.magnitude * seconds)
    }
}

impl Mul<f64> for Velocity1d {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::from_mps(self.magnitude * rhs)
    }
}

impl Translation2d {
    pub fn new(x_m: f64, y_m: f64) -> Self {
        Self {
            x: Translation1d::from_meters(x_m),
            y: Translation1d::from_meters(y_m),
        }
    }

    pub fn norm(&self) -> Translation1d {
        Translation1d::from_meters(self.as_vector().norm())
    }

    /// Direction of this displacement measured from +x.
    pub fn angle(&self) -> Rotation2d {
        Rotation2d::from_radians(self.y.meters().atan2(self.x.meters()))
    }

    /// Rotate the displacement counter-clockwise by `rotation`.
    pub fn rotate_by(&self, rotation: Rotation2d) -> Self {
        let v = Rotation2::new(rotation.radians()) * self.as_vector();
        Self::new(v[0], v[1])
    }

    fn as_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x.meters(), self.y.meters())
    }
}

impl Add for Translation2d {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl AddAssign for Translation2d {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Translation2d {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Pose2d {
    pub fn new(translation: Translation2d, rotation: Rotation2d) -> Self {
        Self {
            translation,
            rotation,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_rotation_units() {
        let r = Rotation2d::from_degrees(90.0);
        assert_relative_eq!(r.radians(), FRAC_PI_2);
        assert_relative_eq!(r.degrees(), 90.0);
        assert_relative_eq!(Rotation2d::from_degrees(450.0).wrapped().degrees(), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rotation_difference() {
        let a = Rotation2d::from_degrees(170.0);
        let b = Rotation2d::from_degrees(-170.0);
        assert_relative_eq!(a.difference_to(b).degrees(), 20.0, epsilon = 1e-9);
        assert_relative_eq!(b.difference_to(a).degrees(), -20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_translation_rotate() {
        let t = Translation2d::new(1.0, 0.0).rotate_by(Rotation2d::from_radians(FRAC_PI_2));
        assert_relative_eq!(t.x.meters(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(t.y.meters(), 1.0, epsilon = 1e-12);

        let t = Translation2d::new(1.0, 3.0).rotate_by(Rotation2d::from_radians(PI));
        assert_relative_eq!(t.x.meters(), -1.0, epsilon = 1e-12);
        assert_relative_eq!(t.y.meters(), -3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_translation_norm_angle() {
        let t = Translation2d::new(3.0, 4.0);
        assert_relative_eq!(t.norm().meters(), 5.0);
        assert_relative_eq!(t.angle().radians(), (4.0f64).atan2(3.0));
    }
}
