//! # Robot library.
//!
//! The closed-loop motion core of the tank drive robot. Everything in here talks to the outside
//! world only through the `hal_if` traits, so the same code runs against the real hardware backend
//! and against the simulation in `sim`.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Feedback controllers - PID, PIDF and the rate of change estimator
pub mod ctrl;

/// Drivetrain control - turn, straight, arc and point movements with timed commands
pub mod drive_ctrl;

/// Minimal planar geometry types
pub mod geom;

/// Competition mode state machine and button bindings
pub mod mode;

/// Tank drive dead reckoning
pub mod odom;

/// Executable parameters
pub mod params;

/// Top level runtime tying the scheduler and the mode machine together
pub mod runtime;

/// Fixed period cooperative scheduler
pub mod sched;

/// Deterministic simulation of the hardware
pub mod sim;

/// Trapezoidal motion profile
pub mod trap_profile;
