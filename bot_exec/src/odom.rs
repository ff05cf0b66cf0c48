//! # Tank drive odometry
//!
//! Dead reckoning from the arc length travelled by each side of the drivetrain together with an
//! absolute yaw. Heading always comes from the yaw sensor, never from the wheels, so angular drift
//! is bounded by the drift of the sensor. The wheels only contribute the forward displacement.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;

use crate::geom::{Pose2d, Rotation2d, Translation1d, Translation2d};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct TankOdometry {
    pose: Pose2d,

    /// Absolute yaw which corresponds to a pose rotation of zero.
    zero_rotation: Rotation2d,

    last_left: Translation1d,
    last_right: Translation1d,

    initialized: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TankOdometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Integrate new wheel arc lengths and yaw into the pose.
    ///
    /// The first call after construction or `reset` only records the wheel baseline.
    pub fn update(
        &mut self,
        left: Translation1d,
        right: Translation1d,
        yaw_absolute: Rotation2d,
    ) -> Pose2d {
        if !self.initialized {
            self.last_left = left;
            self.last_right = right;
            self.initialized = true;
            return self.pose;
        }

        let d_left = left - self.last_left;
        let d_right = right - self.last_right;
        let forward = (d_left + d_right) * 0.5;

        let rotation = yaw_absolute - self.zero_rotation;
        self.pose.rotation = rotation;
        self.pose.translation += Translation2d {
            x: forward,
            y: Translation1d::default(),
        }
        .rotate_by(rotation);

        self.last_left = left;
        self.last_right = right;

        self.pose
    }

    /// Re-base the odometry so that the current absolute yaw corresponds to `pose.rotation`.
    ///
    /// The wheel baseline is taken again on the next update.
    pub fn reset(&mut self, pose: Pose2d, yaw_absolute: Rotation2d) {
        self.pose = pose;
        self.zero_rotation = yaw_absolute - pose.rotation;
        self.initialized = false;
    }

    pub fn pose(&self) -> Pose2d {
        self.pose
    }

    pub fn zero_rotation(&self) -> Rotation2d {
        self.zero_rotation
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn m(x: f64) -> Translation1d {
        Translation1d::from_meters(x)
    }

    #[test]
    fn test_first_update_is_noop() {
        let mut odom = TankOdometry::new();
        let before = odom.pose();
        odom.update(m(3.0), m(-2.0), Rotation2d::from_radians(1.0));
        assert_eq!(odom.pose(), before);
    }

    #[test]
    fn test_straight_line() {
        for &theta in [0.0, 0.3, FRAC_PI_2, -2.5].iter() {
            let mut odom = TankOdometry::new();
            let yaw = Rotation2d::from_radians(theta);
            odom.update(m(1.0), m(1.0), yaw);
            let pose = odom.update(m(1.5), m(1.5), yaw);

            assert_relative_eq!(pose.translation.x.meters(), 0.5 * theta.cos(), epsilon = 1e-12);
            assert_relative_eq!(pose.translation.y.meters(), 0.5 * theta.sin(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rotation_from_yaw_only() {
        let mut odom = TankOdometry::new();
        odom.reset(Pose2d::default(), Rotation2d::from_radians(0.2));
        odom.update(m(0.0), m(0.0), Rotation2d::from_radians(0.2));

        // Wheels disagree wildly but the heading comes from the yaw
        let pose = odom.update(m(-1.0), m(1.0), Rotation2d::from_radians(0.7));
        assert_relative_eq!(pose.rotation.radians(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(pose.translation.norm().meters(), 0.0);

        let pose = odom.update(m(5.0), m(2.0), Rotation2d::from_radians(-3.0));
        assert_relative_eq!(pose.rotation.radians(), -3.2, epsilon = 1e-12);
    }

    #[test]
    fn test_reset_to_pose() {
        let mut odom = TankOdometry::new();
        let start = Pose2d::new(Translation2d::new(1.0, 2.0), Rotation2d::from_radians(FRAC_PI_2));

        odom.reset(start, Rotation2d::from_radians(0.0));
        odom.update(m(10.0), m(10.0), Rotation2d::from_radians(0.0));
        let pose = odom.update(m(11.0), m(11.0), Rotation2d::from_radians(0.0));

        assert_relative_eq!(pose.rotation.radians(), FRAC_PI_2);
        assert_relative_eq!(pose.translation.x.meters(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(pose.translation.y.meters(), 3.0, epsilon = 1e-12);
    }
}
