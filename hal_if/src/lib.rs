//! # Hardware abstraction interface crate.
//!
//! Provides the interfaces through which the control core talks to the host system: motors, the
//! yaw sensor, competition state, the driver's controller and the clock. Nothing in this crate
//! talks to hardware itself, backends implement these traits.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Monotonic time source
pub mod clock;

/// Competition (field control) state
pub mod competition;

/// Driver controller input
pub mod controller;

/// Motor and motor group handles
pub mod motor;

/// Yaw (heading) sensor
pub mod yaw;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use clock::Clock;
pub use competition::CompetitionState;
pub use controller::{Axis, Button, ButtonEvent, ControllerInput, Edge};
pub use motor::{Motor, MotorGroup};
pub use yaw::YawSensor;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors reported by a hardware backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HalError {
    #[error("Device on port {0} is not connected")]
    Disconnected(u8),

    #[error("Device on port {port} reported a fault: {msg}")]
    Fault { port: u8, msg: String },

    #[error("Sensor is still calibrating")]
    Calibrating,

    #[error("Calibration failed: {0}")]
    CalibrationFailed(String),

    #[error("Motor group is empty")]
    EmptyGroup,
}
