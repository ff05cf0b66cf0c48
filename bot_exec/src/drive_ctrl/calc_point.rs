//! Point movement calculations

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use super::*;
use crate::{
    geom::{Rotation2d, Translation1d, Translation2d},
    sched::TickWait,
};
use hal_if::{Clock, Motor, YawSensor};

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl<M: Motor, Y: YawSensor, C: Clock> DriveCtrl<M, Y, C> {
    /// Drive in a straight line to a point in the field frame.
    ///
    /// With `options.use_back` the robot faces away from the point and reverses to it. If the
    /// robot is already within the distance tolerance of the point the current heading is kept.
    pub fn move_to_point<'a>(
        &mut self,
        target: Translation2d,
        options: MoveOptions<'a>,
        ticks: &mut dyn TickWait,
    ) -> Result<MoveStatus, DriveCtrlError> {
        if !target.x.meters().is_finite() || !target.y.meters().is_finite() {
            return Err(DriveCtrlError::InvalidArgument(format!(
                "target point must be finite, found {:?}",
                target
            )));
        }

        let now_s = self.clock.now_seconds();
        self.sense(now_s)?;
        let pose = self.pose();

        let (distance, heading) = point_approach(
            pose.translation,
            pose.rotation,
            target,
            options.use_back,
            self.params.movement_distance_threshold_m,
        );

        self.move_straight(distance, heading, options, ticks)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Signed distance and heading for a straight approach from `from` to `to`.
fn point_approach(
    from: Translation2d,
    current_heading: Rotation2d,
    to: Translation2d,
    use_back: bool,
    threshold_m: f64,
) -> (Translation1d, Rotation2d) {
    let delta = to - from;
    let distance = delta.norm();

    if distance.meters() <= threshold_m {
        let sign = if use_back { -1.0 } else { 1.0 };
        return (distance * sign, current_heading);
    }

    if use_back {
        (
            -distance,
            delta.angle() + Rotation2d::from_radians(std::f64::consts::PI),
        )
    } else {
        (distance, delta.angle())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    #[test]
    fn test_point_approach() {
        let origin = Translation2d::new(1.0, 1.0);
        let (d, h) = point_approach(
            origin,
            Rotation2d::default(),
            Translation2d::new(2.0, 2.0),
            false,
            0.005,
        );
        assert_relative_eq!(d.meters(), 2f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(h.radians(), FRAC_PI_4, epsilon = 1e-12);

        let (d, h) = point_approach(
            origin,
            Rotation2d::default(),
            Translation2d::new(2.0, 2.0),
            true,
            0.005,
        );
        assert_relative_eq!(d.meters(), -(2f64.sqrt()), epsilon = 1e-12);
        assert_relative_eq!(h.wrapped().radians(), FRAC_PI_4 - std::f64::consts::PI, epsilon = 1e-12);
    }

    #[test]
    fn test_point_approach_already_there() {
        let (d, h) = point_approach(
            Translation2d::new(1.0, 1.0),
            Rotation2d::from_radians(FRAC_PI_2),
            Translation2d::new(1.001, 1.0),
            false,
            0.005,
        );
        assert_relative_eq!(d.meters(), 0.001, epsilon = 1e-12);
        assert_relative_eq!(h.radians(), FRAC_PI_2);
    }
}
