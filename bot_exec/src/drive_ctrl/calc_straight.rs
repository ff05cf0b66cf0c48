//! Straight movement calculations and the shared profile follower

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;

use super::*;
use crate::{
    geom::{Rotation2d, Translation1d, Translation2d},
    sched::{TickStatus, TickWait},
    trap_profile::{Constraints, State, TrapezoidProfile},
};
use hal_if::{Clock, Motor, YawSensor};
use util::maths::sign_or_zero;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Everything needed to follow a pair of side profiles.
pub(crate) struct ProfilePlan {
    pub kind: MoveKind,

    pub left: TrapezoidProfile,
    pub right: TrapezoidProfile,

    /// Per side position tolerance for completion.
    pub threshold_m: f64,

    /// Heading setpoints (sensor frame) at the start and end of the movement. When set, the
    /// heading setpoint is interpolated between them by profile progress, otherwise it is held.
    pub yaw_sweep: Option<(f64, f64)>,

    /// Start position and signed distance of the side used to measure progress.
    pub progress_start_m: f64,
    pub progress_dist_m: f64,
    pub progress_left: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl ProfilePlan {
    /// Fraction of the movement completed at `t`, in `[0, 1]`.
    fn progress(&self, t: f64) -> f64 {
        if self.progress_dist_m == 0.0 {
            return 1.0;
        }

        let profile = if self.progress_left {
            &self.left
        } else {
            &self.right
        };

        ((profile.calculate(t).position - self.progress_start_m) / self.progress_dist_m)
            .clamp(0.0, 1.0)
    }

    fn total_time(&self) -> f64 {
        self.left.total_time().max(self.right.total_time())
    }
}

impl<M: Motor, Y: YawSensor, C: Clock> DriveCtrl<M, Y, C> {
    /// Drive a signed distance along a field heading.
    ///
    /// Negative distances drive backwards while facing `heading`. The heading controller holds
    /// `heading` throughout when `options.turn_correct` is set.
    pub fn move_straight<'a>(
        &mut self,
        distance: Translation1d,
        heading: Rotation2d,
        options: MoveOptions<'a>,
        ticks: &mut dyn TickWait,
    ) -> Result<MoveStatus, DriveCtrlError> {
        let d = distance.meters();
        if !d.is_finite() || !heading.radians().is_finite() {
            return Err(DriveCtrlError::InvalidArgument(format!(
                "straight movement needs a finite distance and heading, found {} m at {} rad",
                d,
                heading.radians()
            )));
        }

        if options.turn_first && self.turn_to(heading, ticks)? == MoveStatus::Cancelled {
            return Ok(MoveStatus::Cancelled);
        }

        self.retarget_yaw(heading);

        let now_s = self.clock.now_seconds();
        self.sense(now_s)?;

        let v_max = self.params.max_speed_ms * self.velocity_scalar();
        let a_max = self.params.max_speed_ms * self.acceleration_scalar();
        let constraints = Constraints::new(v_max, a_max)?;

        let v_start = (self.sensed.left_vel_ms + self.sensed.right_vel_ms) / 2.0;
        let v_end = if options.dont_stop {
            sign_or_zero(d) * v_max
        } else {
            0.0
        };

        let left_start = self.sensed.left_m;
        let right_start = self.sensed.right_m;

        let plan = ProfilePlan {
            kind: MoveKind::Straight,
            left: TrapezoidProfile::new(
                constraints,
                State::new(left_start, v_start),
                State::new(left_start + d, v_end),
            ),
            right: TrapezoidProfile::new(
                constraints,
                State::new(right_start, v_start),
                State::new(right_start + d, v_end),
            ),
            threshold_m: self.params.movement_distance_threshold_m,
            yaw_sweep: None,
            progress_start_m: left_start,
            progress_dist_m: d,
            progress_left: true,
        };

        let start = self.pose();
        self.target_pose.translation =
            start.translation + Translation2d::new(d, 0.0).rotate_by(heading);
        self.target_pose.rotation = heading;

        debug!(
            "Straight {:.3} m at {:.2} deg, profile {:.3} s",
            d,
            heading.degrees(),
            plan.total_time()
        );

        self.follow_profiles(plan, options, ticks)
    }

    /// Follow a pair of side profiles until they complete, time out or are cancelled.
    pub(crate) fn follow_profiles<'a>(
        &mut self,
        plan: ProfilePlan,
        options: MoveOptions<'a>,
        ticks: &mut dyn TickWait,
    ) -> Result<MoveStatus, DriveCtrlError> {
        let MoveOptions {
            turn_correct,
            dont_stop,
            stop_immediately,
            mut commands,
            ..
        } = options;

        let total_s = plan.total_time();
        let extra_s = if stop_immediately {
            0.0
        } else {
            self.params.movement_max_extra_time_s
        };
        let ad = self.params.angle_direction;
        let correction = self.params.turn_correction_scalar_while_moving;

        self.left_pos.reset();
        self.right_pos.reset();
        self.yaw.reset();

        let start_s = self.clock.now_seconds();
        let mut fired = 0;

        let status = loop {
            let now_s = self.clock.now_seconds();
            self.sense(now_s)?;
            let elapsed_s = now_s - start_s;

            // Position controllers track the profiles
            self.left_pos
                .set_setpoint(plan.left.calculate(elapsed_s).position);
            self.right_pos
                .set_setpoint(plan.right.calculate(elapsed_s).position);
            let left_out = self
                .left_pos
                .update(self.sensed.left_m, now_s)
                .clamp(-1.0, 1.0);
            let right_out = self
                .right_pos
                .update(self.sensed.right_m, now_s)
                .clamp(-1.0, 1.0);

            // Heading correction
            let rot_out = if turn_correct {
                if let Some((from, to)) = plan.yaw_sweep {
                    self.yaw
                        .set_setpoint(from + (to - from) * plan.progress(elapsed_s));
                }
                -ad * self.yaw.update(self.sensed.yaw_sensor_rad, now_s) * correction
            } else {
                0.0
            };

            self.set_wheel_demands(left_out + rot_out, right_out - rot_out);
            self.actuate(now_s)?;

            fired += self.fire_due(&mut commands, elapsed_s, total_s - elapsed_s)?;

            if elapsed_s >= total_s {
                let settled = self.left_pos.at_setpoint(self.sensed.left_m, plan.threshold_m)
                    && self.right_pos.at_setpoint(self.sensed.right_m, plan.threshold_m);
                if settled {
                    break MoveStatus::Completed;
                }
                if elapsed_s >= total_s + extra_s {
                    break MoveStatus::Timeout;
                }
            }

            if ticks.wait_tick() == TickStatus::Cancel {
                break MoveStatus::Cancelled;
            }
        };

        match status {
            MoveStatus::Cancelled => {
                if !commands.is_empty() {
                    debug!("Dropping {} unfired commands", commands.len());
                }
                self.stop()?;
            }
            _ => {
                // Anything not yet reached still fires exactly once
                fired += self.fire_due(&mut commands, f64::INFINITY, f64::NEG_INFINITY)?;
                if !dont_stop {
                    self.stop()?;
                }
            }
        }

        self.finish_move(plan.kind, status, start_s, total_s, fired);

        Ok(status)
    }
}
