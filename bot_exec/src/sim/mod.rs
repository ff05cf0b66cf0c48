//! # Simulated hardware
//!
//! A deterministic, single threaded stand-in for the robot's hardware which implements every
//! `hal_if` trait. All devices share one `SimWorld` holding the drivetrain physics, the
//! competition flags and a queue of scripted events.
//!
//! Time only moves when something sleeps on the `SimClock`. Sleeping steps the physics up to the
//! deadline in small substeps and applies any scripted events that fall due on the way, so the
//! scheduler, the drive controller and the runtime all run unchanged against the simulation.
//!
//! The world model is intentionally simple:
//!
//! - each side's speed follows a first order lag toward `power * free_speed_ms`,
//! - yaw follows differential drive kinematics, `(v_right - v_left) / track_width`,
//! - a `stuck` drivetrain holds both sides still,
//! - the motors produce nothing while the robot is disabled.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod devices;
mod world;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use devices::*;
pub use world::*;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::cell::RefCell;
use std::rc::Rc;

use hal_if::{Axis, Button};
use serde::Deserialize;

use crate::geom::Pose2d;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Physical parameters of the simulated robot.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SimParams {
    /// Speed of a side at full power.
    ///
    /// Units: meters/second
    pub free_speed_ms: f64,

    /// Time constant of the side speed response.
    ///
    /// Units: seconds
    pub speed_time_constant_s: f64,

    /// Units: meters
    pub track_width_m: f64,

    /// Units: meters
    pub wheel_circumference_m: f64,

    /// Wheel revolutions per motor revolution.
    pub motor_to_wheel_gear_ratio: f64,

    /// How long the yaw sensor takes to calibrate.
    ///
    /// Units: seconds
    pub yaw_calibration_s: f64,

    /// Longest physics step taken while sleeping.
    ///
    /// Units: seconds
    pub max_substep_s: f64,
}

/// Handle to a complete simulated robot.
///
/// Every device handed out shares the same world.
#[derive(Clone)]
pub struct Sim {
    world: Rc<RefCell<SimWorld>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Scripted changes to the world.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
pub enum SimEvent {
    SetEnabled(bool),
    SetAutonomous(bool),
    Press(Button),
    Release(Button),
    SetStuck(bool),
}

/// One side of the drivetrain.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            free_speed_ms: 2.0,
            speed_time_constant_s: 0.05,
            track_width_m: 0.3,
            wheel_circumference_m: 0.32,
            motor_to_wheel_gear_ratio: 0.6,
            yaw_calibration_s: 0.0,
            max_substep_s: 0.001,
        }
    }
}

impl Side {
    /// Port number reported in errors for this side's motor.
    pub fn port(&self) -> u8 {
        match self {
            Side::Left => 1,
            Side::Right => 2,
        }
    }
}

impl Sim {
    /// Create a simulated robot at rest at the origin, disabled and in driver mode.
    pub fn new(params: SimParams) -> Self {
        Self {
            world: Rc::new(RefCell::new(SimWorld::new(params))),
        }
    }

    pub fn clock(&self) -> SimClock {
        SimClock::new(self.world.clone())
    }

    pub fn motor(&self, side: Side) -> SimMotor {
        SimMotor::new(self.world.clone(), side)
    }

    pub fn left_motor(&self) -> SimMotor {
        self.motor(Side::Left)
    }

    pub fn right_motor(&self) -> SimMotor {
        self.motor(Side::Right)
    }

    pub fn yaw(&self) -> SimYaw {
        SimYaw::new(self.world.clone())
    }

    pub fn competition(&self) -> SimCompetition {
        SimCompetition::new(self.world.clone())
    }

    pub fn controller(&self) -> SimController {
        SimController::new(self.world.clone())
    }

    /// Queue `event` to be applied once the clock reaches `time_s`.
    pub fn schedule(&self, time_s: f64, event: SimEvent) {
        self.world.borrow_mut().schedule(time_s, event);
    }

    /// Apply `event` now.
    pub fn apply(&self, event: SimEvent) {
        self.world.borrow_mut().apply(event);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.apply(SimEvent::SetEnabled(enabled));
    }

    pub fn set_autonomous(&self, autonomous: bool) {
        self.apply(SimEvent::SetAutonomous(autonomous));
    }

    pub fn set_stuck(&self, stuck: bool) {
        self.apply(SimEvent::SetStuck(stuck));
    }

    pub fn set_axis(&self, axis: Axis, value: f64) {
        self.world.borrow_mut().set_axis(axis, value);
    }

    /// Make a side's motor report itself disconnected.
    pub fn set_connected(&self, side: Side, connected: bool) {
        self.world.borrow_mut().side_mut(side).connected = connected;
    }

    /// Make the next yaw calibration fail.
    pub fn fail_next_calibration(&self) {
        self.world.borrow_mut().fail_next_calibration = true;
    }

    pub fn now_s(&self) -> f64 {
        self.world.borrow().time_s()
    }

    /// Arc length travelled by a side since the start.
    ///
    /// Units: meters
    pub fn position_m(&self, side: Side) -> f64 {
        self.world.borrow().side(side).position_m
    }

    /// Units: meters/second
    pub fn velocity_ms(&self, side: Side) -> f64 {
        self.world.borrow().side(side).velocity_ms
    }

    /// Last power commanded to a side.
    pub fn power(&self, side: Side) -> f64 {
        self.world.borrow().side(side).power
    }

    /// Ground truth pose, yaw counter-clockwise positive.
    pub fn true_pose(&self) -> Pose2d {
        self.world.borrow().true_pose()
    }
}
