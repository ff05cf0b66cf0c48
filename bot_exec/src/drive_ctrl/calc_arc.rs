//! Arc movement calculations

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;

use super::calc_straight::ProfilePlan;
use super::*;
use crate::{
    geom::{Pose2d, Rotation2d, Translation1d, Translation2d},
    sched::TickWait,
    trap_profile::{Constraints, State, TrapezoidProfile},
};
use hal_if::{Clock, Motor, YawSensor};
use util::maths::sign_or_zero;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Side ratios smaller than this are treated as a pivoting side, which doesn't move.
const MIN_SIDE_RATIO: f64 = 1e-6;

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl ArcDirection {
    /// `+1` for counter-clockwise, `-1` for clockwise.
    fn sign(&self) -> f64 {
        match self {
            ArcDirection::CounterClockwise => 1.0,
            ArcDirection::Clockwise => -1.0,
        }
    }
}

impl<M: Motor, Y: YawSensor, C: Clock> DriveCtrl<M, Y, C> {
    /// Drive along an arc of constant radius.
    ///
    /// `angle` is the angle swept around the arc's centre, a negative angle drives the arc
    /// backwards. The inner side travels `angle * (radius - track_width / 2)` and the outer side
    /// `angle * (radius + track_width / 2)`, both following profiles scaled so that they finish
    /// together. Completion uses half the usual distance tolerance.
    pub fn arc<'a>(
        &mut self,
        angle: Rotation2d,
        radius: Translation1d,
        direction: ArcDirection,
        start_heading: Rotation2d,
        options: MoveOptions<'a>,
        ticks: &mut dyn TickWait,
    ) -> Result<MoveStatus, DriveCtrlError> {
        let theta = angle.radians();
        let r = radius.meters();
        if !theta.is_finite() || !start_heading.radians().is_finite() {
            return Err(DriveCtrlError::InvalidArgument(format!(
                "arc needs a finite angle and start heading, found {} rad from {} rad",
                theta,
                start_heading.radians()
            )));
        }
        if !r.is_finite() || r <= 0.0 {
            return Err(DriveCtrlError::InvalidArgument(format!(
                "arc radius must be positive, found {} m",
                r
            )));
        }

        if options.turn_first && self.turn_to(start_heading, ticks)? == MoveStatus::Cancelled {
            return Ok(MoveStatus::Cancelled);
        }

        let now_s = self.clock.now_seconds();
        self.sense(now_s)?;

        let length = r * theta;
        let half_track_ratio = self.params.track_width_m / (2.0 * r);
        let inner = 1.0 - half_track_ratio;
        let outer = 1.0 + half_track_ratio;
        let (left_ratio, right_ratio) = match direction {
            ArcDirection::CounterClockwise => (inner, outer),
            ArcDirection::Clockwise => (outer, inner),
        };

        let v_max = self.params.max_speed_ms * self.velocity_scalar();
        let a_max = self.params.max_speed_ms * self.acceleration_scalar();

        let left_start = self.sensed.left_m;
        let right_start = self.sensed.right_m;
        let left = self.side_profile(
            v_max,
            a_max,
            left_ratio,
            left_start,
            self.sensed.left_vel_ms,
            length,
            options.dont_stop,
        )?;
        let right = self.side_profile(
            v_max,
            a_max,
            right_ratio,
            right_start,
            self.sensed.right_vel_ms,
            length,
            options.dont_stop,
        )?;

        // Heading change of the arc in the sensor frame, starting from the requested heading
        // even when the robot didn't turn to it first
        self.retarget_yaw(start_heading);
        let yaw_from = self.yaw.setpoint();
        let yaw_to = yaw_from + self.params.angle_direction * direction.sign() * theta;

        // The outer side always moves, so it measures progress
        let progress_left = left_ratio.abs() >= right_ratio.abs();
        let plan = ProfilePlan {
            kind: MoveKind::Arc,
            left,
            right,
            threshold_m: self.params.movement_distance_threshold_m / 2.0,
            yaw_sweep: Some((yaw_from, yaw_to)),
            progress_start_m: if progress_left { left_start } else { right_start },
            progress_dist_m: length * if progress_left { left_ratio } else { right_ratio },
            progress_left,
        };

        self.target_pose = arc_end_pose(self.pose(), r, theta, direction);

        debug!(
            "Arc {:.2} deg at radius {:.3} m {:?}, sides {:.3} m / {:.3} m",
            angle.degrees(),
            r,
            direction,
            length * left_ratio,
            length * right_ratio
        );

        let status = self.follow_profiles(plan, options, ticks)?;

        // Later movements hold the heading the arc ended on
        self.yaw.set_setpoint(yaw_to);

        Ok(status)
    }

    #[allow(clippy::too_many_arguments)]
    fn side_profile(
        &self,
        v_max: f64,
        a_max: f64,
        ratio: f64,
        start_m: f64,
        start_vel_ms: f64,
        length_m: f64,
        dont_stop: bool,
    ) -> Result<TrapezoidProfile, DriveCtrlError> {
        let scale = ratio.abs();
        let constraints = if scale < MIN_SIDE_RATIO {
            Constraints::new(v_max, a_max)?
        } else {
            Constraints::new(v_max * scale, a_max * scale)?
        };

        let dist = length_m * ratio;
        let v_end = if dont_stop {
            sign_or_zero(dist) * constraints.max_velocity()
        } else {
            0.0
        };

        Ok(TrapezoidProfile::new(
            constraints,
            State::new(start_m, start_vel_ms),
            State::new(start_m + dist, v_end),
        ))
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Pose reached by driving an arc from `start`.
fn arc_end_pose(start: Pose2d, radius: f64, theta: f64, direction: ArcDirection) -> Pose2d {
    let s = direction.sign();
    let to_centre = Translation2d::new(0.0, s * radius);

    let centre = start.translation + to_centre.rotate_by(start.rotation);
    let end_rotation = start.rotation + Rotation2d::from_radians(s * theta);

    Pose2d::new(centre - to_centre.rotate_by(end_rotation), end_rotation)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
