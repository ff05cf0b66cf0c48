//! # Drive control module
//!
//! Closed-loop control of a tank drivetrain. `DriveCtrl` owns both sides' motors, the yaw sensor
//! and every controller, and exposes the movement primitives:
//!
//! - `turn_to` - turn in place to a field heading
//! - `move_straight` - drive a signed distance along a heading
//! - `arc` - drive a constant radius arc
//! - `move_to_point` - drive straight to a point in the field frame
//!
//! Each primitive blocks, running one inner loop iteration per tick and yielding through a
//! `TickWait` between iterations. Within a tick the order is always sense, odometry, profile,
//! position controllers, heading controller, velocity controllers, actuate, and finally any due
//! timed commands.
//!
//! Straight and arc movements follow one trapezoidal profile per side. The position controllers
//! track the profile and produce normalised speed demands, which (after any heading correction)
//! are scaled by `max_speed_ms` into setpoints for the per side velocity controllers.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod calc_arc;
mod calc_point;
mod calc_straight;
mod calc_turn;
mod cmd;
mod params;
mod state;
mod tm;
mod worker;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use cmd::*;
pub use params::*;
pub use state::*;
pub use tm::*;
pub use worker::*;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use hal_if::HalError;

use crate::trap_profile::ProfileError;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Possible errors that can occur during DriveCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum DriveCtrlError {
    #[error("Hardware error: {0}")]
    Hal(#[from] HalError),

    #[error("Invalid parameters: {0}")]
    InvalidParams(#[from] ParamsError),

    #[error("Invalid movement argument: {0}")]
    InvalidArgument(String),

    #[error("Could not plan the movement profile: {0}")]
    Profile(#[from] ProfileError),

    #[error("Yaw sensor calibration failed: {0}")]
    CalibrationFailed(String),

    #[error("Could not start the command worker: {0}")]
    WorkerSpawn(std::io::Error),

    #[error("The command worker has stopped")]
    WorkerStopped,
}
