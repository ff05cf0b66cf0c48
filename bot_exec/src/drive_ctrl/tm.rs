//! Drive control telemetry and status reports

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;

use super::{MoveKind, MoveStatus};
use crate::geom::Pose2d;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Telemetry channel for per tick samples.
pub const DRIVE_TM_CHANNEL: &str = "drive_ctrl";

/// Telemetry channel for movement reports.
pub const MOVE_REPORT_CHANNEL: &str = "drive_ctrl_moves";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One inner loop sample.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DriveTm {
    pub pose: Pose2d,

    /// Arc length travelled by each side.
    ///
    /// Units: meters
    pub left_pos_m: f64,
    pub right_pos_m: f64,

    /// Estimated side speeds.
    ///
    /// Units: meters/second
    pub left_vel_ms: f64,
    pub right_vel_ms: f64,

    /// Velocity controller setpoints.
    ///
    /// Units: meters/second
    pub left_vel_sp_ms: f64,
    pub right_vel_sp_ms: f64,

    /// Normalised motor power.
    pub left_output: f64,
    pub right_output: f64,

    /// Yaw in the sensor's own frame and the heading controller setpoint.
    ///
    /// Units: radians
    pub yaw_sensor_rad: f64,
    pub yaw_sp_rad: f64,
}

/// Summary of one movement.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MoveReport {
    pub kind: MoveKind,
    pub status: MoveStatus,

    /// Time from the start of the movement to its end.
    ///
    /// Units: seconds
    pub elapsed_s: f64,

    /// Planned duration of the movement's profile, zero for turns.
    ///
    /// Units: seconds
    pub profile_time_s: f64,

    /// Position controller errors at the end of the movement, zero for turns.
    ///
    /// Units: meters
    pub left_error_m: f64,
    pub right_error_m: f64,

    /// Heading controller error at the end of the movement.
    ///
    /// Units: radians
    pub yaw_error_rad: f64,

    pub commands_fired: usize,
}

/// Status report for drive control.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    pub num_completed: u64,
    pub num_timeout: u64,
    pub num_cancelled: u64,

    pub last_move: Option<MoveReport>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl StatusReport {
    pub(crate) fn record(&mut self, report: MoveReport) {
        match report.status {
            MoveStatus::Completed => self.num_completed += 1,
            MoveStatus::Timeout => self.num_timeout += 1,
            MoveStatus::Cancelled => self.num_cancelled += 1,
        }
        self.last_move = Some(report);
    }

    pub fn num_moves(&self) -> u64 {
        self.num_completed + self.num_timeout + self.num_cancelled
    }
}
