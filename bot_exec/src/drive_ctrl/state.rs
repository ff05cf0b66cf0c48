//! Implementations for the DriveCtrl state structure

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use serde::Serialize;

// Internal
use super::{
    CommandAction, CommandWorker, DriveCtrlError, DriveTm, MoveKind, MoveReport, MoveStatus,
    Params, StatusReport, TimedCommand, DRIVE_TM_CHANNEL, MOVE_REPORT_CHANNEL,
};
use crate::{
    ctrl::{Pid, Pidf, RateEstimator},
    geom::{Pose2d, Rotation2d, Translation1d},
    odom::TankOdometry,
};
use hal_if::{Clock, Motor, YawSensor};
use util::{maths::smallest_angular_difference, session::Telemetry};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Interval at which the yaw sensor is polled while it calibrates.
const CALIBRATION_POLL_S: f64 = 0.02;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Drivetrain controller.
///
/// The motors and yaw sensor are exclusively owned for the lifetime of the controller. Backends
/// that need to share a device with other code should hand in a handle type.
pub struct DriveCtrl<M: Motor, Y: YawSensor, C: Clock> {
    pub(crate) params: Params,

    left_motor: M,
    right_motor: M,
    yaw_sensor: Y,
    pub(crate) clock: C,

    pub(crate) left_vel: Pidf,
    pub(crate) right_vel: Pidf,
    pub(crate) left_pos: Pid,
    pub(crate) right_pos: Pid,

    /// Heading controller, runs in the sensor's frame so that its setpoint stays continuous.
    pub(crate) yaw: Pid,

    left_rate: RateEstimator,
    right_rate: RateEstimator,

    pub(crate) odom: TankOdometry,

    pub(crate) sensed: Sensed,
    outputs: (f64, f64),

    velocity_scalar: f64,
    acceleration_scalar: f64,

    pub(crate) target_pose: Pose2d,

    tm: Telemetry,
    report: StatusReport,

    /// Started on the first background command.
    worker: Option<CommandWorker>,
}

/// Measurements taken at the start of the current tick.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Sensed {
    /// Arc length travelled by each side.
    ///
    /// Units: meters
    pub left_m: f64,
    pub right_m: f64,

    /// Estimated side speeds.
    ///
    /// Units: meters/second
    pub left_vel_ms: f64,
    pub right_vel_ms: f64,

    /// Yaw as reported by the sensor, in its own sign convention.
    ///
    /// Units: radians
    pub yaw_sensor_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl<M: Motor, Y: YawSensor, C: Clock> DriveCtrl<M, Y, C> {
    /// Create a new controller, validating the parameters.
    pub fn new(
        params: Params,
        left_motor: M,
        right_motor: M,
        yaw_sensor: Y,
        clock: C,
        tm: Telemetry,
    ) -> Result<Self, DriveCtrlError> {
        params.validate()?;

        let min_dt = params.pid_min_dt_s;

        Ok(Self {
            left_vel: Pidf::new(params.velocity_pidf, min_dt),
            right_vel: Pidf::new(params.velocity_pidf, min_dt),
            left_pos: Pid::new(params.position_pid, min_dt),
            right_pos: Pid::new(params.position_pid, min_dt),
            yaw: Pid::new(params.yaw_pid, min_dt),
            left_rate: RateEstimator::new(params.rate_min_sample_time_s),
            right_rate: RateEstimator::new(params.rate_min_sample_time_s),
            odom: TankOdometry::new(),
            sensed: Sensed::default(),
            outputs: (0.0, 0.0),
            velocity_scalar: params.velocity_scalar,
            acceleration_scalar: params.acceleration_scalar,
            target_pose: Pose2d::default(),
            report: StatusReport::default(),
            worker: None,
            params,
            left_motor,
            right_motor,
            yaw_sensor,
            clock,
            tm,
        })
    }

    /// Calibrate the yaw sensor and zero the pose.
    ///
    /// Blocks until the sensor reports it has finished, or fails after `calibration_timeout_s`.
    pub fn calibrate(&mut self) -> Result<(), DriveCtrlError> {
        info!("Calibrating yaw sensor");

        self.yaw_sensor
            .calibrate()
            .map_err(|e| DriveCtrlError::CalibrationFailed(e.to_string()))?;

        let start_s = self.clock.now_seconds();
        loop {
            match self.yaw_sensor.is_calibrating() {
                Ok(false) => break,
                Ok(true) => (),
                Err(e) => return Err(DriveCtrlError::CalibrationFailed(e.to_string())),
            }

            let now_s = self.clock.now_seconds();
            if now_s - start_s > self.params.calibration_timeout_s {
                return Err(DriveCtrlError::CalibrationFailed(format!(
                    "still calibrating after {:.1} s",
                    self.params.calibration_timeout_s
                )));
            }

            self.clock.sleep_until(now_s + CALIBRATION_POLL_S);
        }

        info!(
            "Yaw sensor calibrated in {:.3} s",
            self.clock.now_seconds() - start_s
        );

        self.set_pose(Pose2d::default())
    }

    /// Re-base odometry so that the robot is currently at `pose`, and hold the current heading.
    pub fn set_pose(&mut self, pose: Pose2d) -> Result<(), DriveCtrlError> {
        let yaw_sensor_rad = self.yaw_sensor.rotation_degrees()?.to_radians();
        self.sensed.yaw_sensor_rad = yaw_sensor_rad;

        self.odom.reset(pose, self.sensor_to_absolute(yaw_sensor_rad));
        self.yaw.set_setpoint(yaw_sensor_rad);
        self.yaw.reset();
        self.target_pose = pose;

        info!("Pose set to {:?}", pose);

        Ok(())
    }

    /// Run one inner loop iteration with the current velocity setpoints.
    ///
    /// Used between movements to keep odometry and the velocity controllers running.
    pub fn tick(&mut self) -> Result<(), DriveCtrlError> {
        let now_s = self.clock.now_seconds();
        self.sense(now_s)?;
        self.actuate(now_s)
    }

    /// Zero the velocity setpoints and command both sides to zero power.
    pub fn stop(&mut self) -> Result<(), DriveCtrlError> {
        self.left_vel.set_setpoint(0.0);
        self.right_vel.set_setpoint(0.0);
        self.left_vel.reset();
        self.right_vel.reset();

        self.outputs = (0.0, 0.0);
        let left = self.left_motor.set_normalized(0.0);
        let right = self.right_motor.set_normalized(0.0);
        left?;
        right?;

        Ok(())
    }

    /// Drive each side at a normalised speed in `[-1, +1]`, closed loop, until changed.
    ///
    /// Takes effect on the next `tick`.
    pub fn drive_normalised(&mut self, left: f64, right: f64) {
        self.set_wheel_demands(left, right);
    }

    pub fn set_velocity_scalar(&mut self, scalar: f64) -> Result<(), DriveCtrlError> {
        if !scalar.is_finite() || scalar <= 0.0 {
            return Err(DriveCtrlError::InvalidArgument(format!(
                "velocity scalar must be positive, found {}",
                scalar
            )));
        }
        self.velocity_scalar = scalar;
        Ok(())
    }

    pub fn set_acceleration_scalar(&mut self, scalar: f64) -> Result<(), DriveCtrlError> {
        if !scalar.is_finite() || scalar <= 0.0 {
            return Err(DriveCtrlError::InvalidArgument(format!(
                "acceleration scalar must be positive, found {}",
                scalar
            )));
        }
        self.acceleration_scalar = scalar;
        Ok(())
    }

    pub fn velocity_scalar(&self) -> f64 {
        self.velocity_scalar
    }

    pub fn acceleration_scalar(&self) -> f64 {
        self.acceleration_scalar
    }

    pub fn pose(&self) -> Pose2d {
        self.odom.pose()
    }

    /// The pose the last movement was aiming for.
    pub fn target_pose(&self) -> Pose2d {
        self.target_pose
    }

    pub fn sensed(&self) -> Sensed {
        self.sensed
    }

    /// Last normalised power commanded to the left and right sides.
    pub fn outputs(&self) -> (f64, f64) {
        self.outputs
    }

    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    // ---- INNER LOOP ----

    /// Read the sensors and advance the speed estimators and odometry.
    pub(crate) fn sense(&mut self, now_s: f64) -> Result<(), DriveCtrlError> {
        let left_m = self.revs_to_m(self.left_motor.position_revolutions()?);
        let right_m = self.revs_to_m(self.right_motor.position_revolutions()?);
        let yaw_sensor_rad = self.yaw_sensor.rotation_degrees()?.to_radians();

        self.sensed = Sensed {
            left_m,
            right_m,
            left_vel_ms: self.left_rate.sample(left_m, now_s),
            right_vel_ms: self.right_rate.sample(right_m, now_s),
            yaw_sensor_rad,
        };

        self.odom.update(
            Translation1d::from_meters(left_m),
            Translation1d::from_meters(right_m),
            self.sensor_to_absolute(yaw_sensor_rad),
        );

        Ok(())
    }

    /// Set the velocity setpoints from normalised speed demands.
    pub(crate) fn set_wheel_demands(&mut self, left: f64, right: f64) {
        let max = self.params.max_speed_ms;
        self.left_vel.set_setpoint(left.clamp(-1.0, 1.0) * max);
        self.right_vel.set_setpoint(right.clamp(-1.0, 1.0) * max);
    }

    /// Run the velocity controllers and command the motors.
    pub(crate) fn actuate(&mut self, now_s: f64) -> Result<(), DriveCtrlError> {
        let left = self
            .left_vel
            .update(self.sensed.left_vel_ms, now_s)
            .clamp(-1.0, 1.0);
        let right = self
            .right_vel
            .update(self.sensed.right_vel_ms, now_s)
            .clamp(-1.0, 1.0);

        self.left_motor.set_normalized(left)?;
        self.right_motor.set_normalized(right)?;
        self.outputs = (left, right);

        self.tm.record(
            DRIVE_TM_CHANNEL,
            &DriveTm {
                pose: self.odom.pose(),
                left_pos_m: self.sensed.left_m,
                right_pos_m: self.sensed.right_m,
                left_vel_ms: self.sensed.left_vel_ms,
                right_vel_ms: self.sensed.right_vel_ms,
                left_vel_sp_ms: self.left_vel.setpoint(),
                right_vel_sp_ms: self.right_vel.setpoint(),
                left_output: left,
                right_output: right,
                yaw_sensor_rad: self.sensed.yaw_sensor_rad,
                yaw_sp_rad: self.yaw.setpoint(),
            },
        );

        Ok(())
    }

    // ---- HEADING ----

    /// Convert a sensor reading into the counter-clockwise absolute yaw used by odometry.
    pub(crate) fn sensor_to_absolute(&self, yaw_sensor_rad: f64) -> Rotation2d {
        Rotation2d::from_radians(self.params.angle_direction * yaw_sensor_rad)
    }

    /// Convert a field heading into the sensor frame.
    pub(crate) fn heading_to_sensor(&self, heading: Rotation2d) -> f64 {
        self.params.angle_direction * (heading + self.odom.zero_rotation()).radians()
    }

    /// Move the heading setpoint to `heading` the short way round.
    pub(crate) fn retarget_yaw(&mut self, heading: Rotation2d) {
        let target = self.heading_to_sensor(heading);
        let setpoint = self.yaw.setpoint();
        self.yaw
            .set_setpoint(setpoint + smallest_angular_difference(setpoint, target));
    }

    /// Heading controller error against the latest measurement.
    pub(crate) fn yaw_error(&self) -> f64 {
        self.yaw.setpoint() - self.sensed.yaw_sensor_rad
    }

    // ---- COMMANDS ----

    /// Fire every due command, removing it from the list. Returns the number fired.
    pub(crate) fn fire_due<'a>(
        &mut self,
        commands: &mut Vec<TimedCommand<'a>>,
        elapsed_s: f64,
        remaining_s: f64,
    ) -> Result<usize, DriveCtrlError> {
        let mut fired = 0;
        let mut i = 0;

        while i < commands.len() {
            if commands[i].is_due(elapsed_s, remaining_s) {
                let cmd = commands.remove(i);
                debug!(
                    "Firing command with offset {:.3} s at {:.3} s",
                    cmd.offset_s, elapsed_s
                );
                self.run_command(cmd)?;
                fired += 1;
            } else {
                i += 1;
            }
        }

        Ok(fired)
    }

    fn run_command(&mut self, cmd: TimedCommand) -> Result<(), DriveCtrlError> {
        match cmd.action {
            CommandAction::Inline(f) => {
                f();
                Ok(())
            }
            CommandAction::Background(f) => {
                if self.worker.is_none() {
                    self.worker = Some(CommandWorker::new()?);
                }
                match self.worker {
                    Some(ref w) => w.dispatch(f),
                    None => Err(DriveCtrlError::WorkerStopped),
                }
            }
        }
    }

    // ---- REPORTING ----

    /// Record the end of a movement.
    pub(crate) fn finish_move(
        &mut self,
        kind: MoveKind,
        status: MoveStatus,
        start_s: f64,
        profile_time_s: f64,
        commands_fired: usize,
    ) -> MoveReport {
        let (left_error_m, right_error_m) = match kind {
            MoveKind::Turn => (0.0, 0.0),
            _ => (
                self.left_pos.setpoint() - self.sensed.left_m,
                self.right_pos.setpoint() - self.sensed.right_m,
            ),
        };

        let report = MoveReport {
            kind,
            status,
            elapsed_s: self.clock.now_seconds() - start_s,
            profile_time_s,
            left_error_m,
            right_error_m,
            yaw_error_rad: self.yaw_error(),
            commands_fired,
        };

        match status {
            MoveStatus::Completed => info!(
                "{:?} completed in {:.3} s",
                kind, report.elapsed_s
            ),
            MoveStatus::Timeout => warn!(
                "{:?} timed out after {:.3} s (errors: left {:.4} m, right {:.4} m, yaw {:.4} rad)",
                kind, report.elapsed_s, left_error_m, right_error_m, report.yaw_error_rad
            ),
            MoveStatus::Cancelled => info!(
                "{:?} cancelled after {:.3} s",
                kind, report.elapsed_s
            ),
        }

        self.report.record(report);
        self.tm.record(MOVE_REPORT_CHANNEL, &report);

        report
    }

    fn revs_to_m(&self, revolutions: f64) -> f64 {
        revolutions * self.params.motor_to_wheel_gear_ratio * self.params.wheel_circumference_m
    }
}
