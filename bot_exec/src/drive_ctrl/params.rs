//! Drive control parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;
use thiserror::Error;

use crate::ctrl::{PidGains, PidfGains};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for drive control.
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    // ---- GEOMETRY ----
    /// Distance between the left and right wheel contact lines.
    ///
    /// Units: meters
    pub track_width_m: f64,

    /// Circumference of the driven wheels.
    ///
    /// Units: meters
    pub wheel_circumference_m: f64,

    /// Wheel revolutions per motor revolution.
    pub motor_to_wheel_gear_ratio: f64,

    // ---- LIMITS ----
    /// Hardware cap on the linear speed of either side.
    ///
    /// Units: meters/second
    pub max_speed_ms: f64,

    /// Multiplier on `max_speed_ms` giving the profile velocity limit. Can be changed at runtime.
    pub velocity_scalar: f64,

    /// Multiplier on `max_speed_ms` giving the profile acceleration limit (in m/s^2). Can be
    /// changed at runtime.
    pub acceleration_scalar: f64,

    // ---- TURNING ----
    /// Heading tolerance for a turn to be considered complete.
    ///
    /// Units: radians
    pub turning_threshold_rad: f64,

    /// Hard cap on the duration of a turn.
    ///
    /// Units: seconds
    pub turn_timeout_s: f64,

    /// Sum of absolute wheel speeds below which a turn has settled.
    ///
    /// Units: meters/second
    pub turn_settle_speed_ms: f64,

    /// Bias added in the sign of the turn output to overcome static friction, applied only while
    /// the heading error is outside `turning_threshold_rad`.
    pub turn_feedforward: f64,

    /// Limit on the normalised turn output.
    pub turn_max_output: f64,

    /// Scale of the heading correction folded into forward movements, between 0 and 1.
    pub turn_correction_scalar_while_moving: f64,

    /// Sign convention of the yaw sensor, +1 if it reads counter-clockwise positive, -1 if
    /// clockwise positive.
    pub angle_direction: f64,

    // ---- MOVEMENT ----
    /// Per side position tolerance for a movement to be considered complete.
    ///
    /// Units: meters
    pub movement_distance_threshold_m: f64,

    /// Time allowed after the end of the profile to settle before the movement is abandoned.
    ///
    /// Units: seconds
    pub movement_max_extra_time_s: f64,

    /// Maximum time to wait for the yaw sensor to calibrate.
    ///
    /// Units: seconds
    pub calibration_timeout_s: f64,

    // ---- CONTROLLERS ----
    /// Per side velocity controller, measurement and setpoint in m/s, output normalised power.
    pub velocity_pidf: PidfGains,

    /// Per side position controller, measurement and setpoint in meters, output normalised speed.
    pub position_pid: PidGains,

    /// Heading controller, measurement and setpoint in sensor frame radians.
    pub yaw_pid: PidGains,

    /// Minimum interval between controller updates.
    ///
    /// Units: seconds
    pub pid_min_dt_s: f64,

    /// Minimum sampling window of the wheel speed estimators.
    ///
    /// Units: seconds
    pub rate_min_sample_time_s: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("{0} must be finite and greater than zero, found {1}")]
    NotPositive(&'static str, f64),

    #[error("{0} must be finite and not negative, found {1}")]
    Negative(&'static str, f64),

    #[error("angle_direction must be +1 or -1, found {0}")]
    InvalidAngleDirection(f64),

    #[error("turn_correction_scalar_while_moving must be between 0 and 1, found {0}")]
    InvalidTurnCorrection(f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Params {
    /// Check the parameters are physically meaningful.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let positive = [
            ("track_width_m", self.track_width_m),
            ("wheel_circumference_m", self.wheel_circumference_m),
            ("motor_to_wheel_gear_ratio", self.motor_to_wheel_gear_ratio),
            ("max_speed_ms", self.max_speed_ms),
            ("velocity_scalar", self.velocity_scalar),
            ("acceleration_scalar", self.acceleration_scalar),
            ("turning_threshold_rad", self.turning_threshold_rad),
            ("turn_timeout_s", self.turn_timeout_s),
            ("turn_settle_speed_ms", self.turn_settle_speed_ms),
            ("turn_max_output", self.turn_max_output),
            ("movement_distance_threshold_m", self.movement_distance_threshold_m),
            ("calibration_timeout_s", self.calibration_timeout_s),
        ];
        for (name, value) in positive.iter() {
            if !value.is_finite() || *value <= 0.0 {
                return Err(ParamsError::NotPositive(*name, *value));
            }
        }

        let non_negative = [
            ("turn_feedforward", self.turn_feedforward),
            ("movement_max_extra_time_s", self.movement_max_extra_time_s),
            ("pid_min_dt_s", self.pid_min_dt_s),
            ("rate_min_sample_time_s", self.rate_min_sample_time_s),
        ];
        for (name, value) in non_negative.iter() {
            if !value.is_finite() || *value < 0.0 {
                return Err(ParamsError::Negative(*name, *value));
            }
        }

        if self.angle_direction != 1.0 && self.angle_direction != -1.0 {
            return Err(ParamsError::InvalidAngleDirection(self.angle_direction));
        }

        let tcs = self.turn_correction_scalar_while_moving;
        if !(0.0..=1.0).contains(&tcs) {
            return Err(ParamsError::InvalidTurnCorrection(tcs));
        }

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
