//! # Feedback controllers
//!
//! Stateful control blocks used by the drivetrain. None of them read a clock themselves, the
//! caller passes the current time into every update so that they behave identically in the
//! simulation and on the robot.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod pid;
mod rate;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use pid::*;
pub use rate::*;
