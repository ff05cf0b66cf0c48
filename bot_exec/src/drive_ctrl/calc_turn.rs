//! Turn in place calculations

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;

use super::*;
use crate::{
    geom::Rotation2d,
    sched::{TickStatus, TickWait},
};
use hal_if::{Clock, Motor, YawSensor};
use util::maths::sign_or_zero;

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl<M: Motor, Y: YawSensor, C: Clock> DriveCtrl<M, Y, C> {
    /// Turn in place to a field heading.
    ///
    /// The turn takes the shortest way round. It completes once the heading is within
    /// `turning_threshold_rad` and the wheels have settled, and gives up after `turn_timeout_s`.
    /// The motors are stopped at the end in every case.
    pub fn turn_to(
        &mut self,
        heading: Rotation2d,
        ticks: &mut dyn TickWait,
    ) -> Result<MoveStatus, DriveCtrlError> {
        if !heading.radians().is_finite() {
            return Err(DriveCtrlError::InvalidArgument(format!(
                "turn heading must be finite, found {}",
                heading.radians()
            )));
        }

        self.retarget_yaw(heading);
        self.yaw.reset();
        self.target_pose.rotation = heading;

        debug!(
            "Turning to {:.2} deg (sensor setpoint {:.4} rad)",
            heading.degrees(),
            self.yaw.setpoint()
        );

        let ad = self.params.angle_direction;
        let threshold = self.params.turning_threshold_rad;
        let start_s = self.clock.now_seconds();

        let status = loop {
            let now_s = self.clock.now_seconds();
            self.sense(now_s)?;

            let error = self.yaw_error();
            let mut output = self.yaw.update(self.sensed.yaw_sensor_rad, now_s);
            if error.abs() > threshold {
                output += sign_or_zero(output) * self.params.turn_feedforward;
            }
            let output = output.clamp(-self.params.turn_max_output, self.params.turn_max_output);

            self.set_wheel_demands(-ad * output, ad * output);
            self.actuate(now_s)?;

            let wheel_speed = self.sensed.left_vel_ms.abs() + self.sensed.right_vel_ms.abs();
            if error.abs() <= threshold && wheel_speed < self.params.turn_settle_speed_ms {
                break MoveStatus::Completed;
            }
            if now_s - start_s > self.params.turn_timeout_s {
                break MoveStatus::Timeout;
            }

            if ticks.wait_tick() == TickStatus::Cancel {
                break MoveStatus::Cancelled;
            }
        };

        self.stop()?;
        self.finish_move(MoveKind::Turn, status, start_s, 0.0, 0);

        Ok(status)
    }
}
