//! Simulated devices implementing the hardware interfaces

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::cell::RefCell;
use std::rc::Rc;

use log::info;

use super::{Side, SimWorld};
use hal_if::{
    Axis, ButtonEvent, Clock, CompetitionState, ControllerInput, HalError, Motor, YawSensor,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Simulation time. Sleeping steps the world.
#[derive(Clone)]
pub struct SimClock {
    world: Rc<RefCell<SimWorld>>,
}

/// The motor (or motor group) on one side of the drivetrain.
#[derive(Clone)]
pub struct SimMotor {
    world: Rc<RefCell<SimWorld>>,
    side: Side,
}

/// A yaw sensor which reads clockwise positive, in degrees.
#[derive(Clone)]
pub struct SimYaw {
    world: Rc<RefCell<SimWorld>>,
}

#[derive(Clone)]
pub struct SimCompetition {
    world: Rc<RefCell<SimWorld>>,
}

#[derive(Clone)]
pub struct SimController {
    world: Rc<RefCell<SimWorld>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimClock {
    pub(crate) fn new(world: Rc<RefCell<SimWorld>>) -> Self {
        Self { world }
    }
}

impl Clock for SimClock {
    fn now_seconds(&self) -> f64 {
        self.world.borrow().time_s()
    }

    fn sleep_until(&self, deadline_s: f64) {
        self.world.borrow_mut().advance_to(deadline_s);
    }
}

impl SimMotor {
    pub(crate) fn new(world: Rc<RefCell<SimWorld>>, side: Side) -> Self {
        Self { world, side }
    }

    /// Meters of wheel travel per motor revolution.
    fn m_per_rev(&self) -> f64 {
        let w = self.world.borrow();
        w.params().motor_to_wheel_gear_ratio * w.params().wheel_circumference_m
    }

    fn check_connected(&self) -> Result<(), HalError> {
        if self.world.borrow().side(self.side).connected {
            Ok(())
        } else {
            Err(HalError::Disconnected(self.side.port()))
        }
    }
}

impl Motor for SimMotor {
    fn set_normalized(&mut self, power: f64) -> Result<(), HalError> {
        self.check_connected()?;
        self.world.borrow_mut().side_mut(self.side).power = power.clamp(-1.0, 1.0);
        Ok(())
    }

    fn position_revolutions(&self) -> Result<f64, HalError> {
        self.check_connected()?;
        let position_m = self.world.borrow().side(self.side).position_m;
        Ok(position_m / self.m_per_rev())
    }

    fn velocity_rpm(&self) -> Result<f64, HalError> {
        self.check_connected()?;
        let velocity_ms = self.world.borrow().side(self.side).velocity_ms;
        Ok(velocity_ms / self.m_per_rev() * 60.0)
    }
}

impl SimYaw {
    pub(crate) fn new(world: Rc<RefCell<SimWorld>>) -> Self {
        Self { world }
    }
}

impl YawSensor for SimYaw {
    fn rotation_degrees(&self) -> Result<f64, HalError> {
        let w = self.world.borrow();
        if w.time_s() < w.calibrating_until_s {
            return Err(HalError::Calibrating);
        }

        Ok(-(w.yaw_rad() - w.yaw_zero_rad).to_degrees())
    }

    fn calibrate(&mut self) -> Result<(), HalError> {
        let mut w = self.world.borrow_mut();

        if w.fail_next_calibration {
            w.fail_next_calibration = false;
            return Err(HalError::CalibrationFailed("simulated failure".into()));
        }

        w.yaw_zero_rad = w.yaw_rad();
        w.calibrating_until_s = w.time_s() + w.params().yaw_calibration_s;
        info!(
            "Sim: yaw calibration started, takes {:.2} s",
            w.params().yaw_calibration_s
        );

        Ok(())
    }

    fn is_calibrating(&self) -> Result<bool, HalError> {
        let w = self.world.borrow();
        Ok(w.time_s() < w.calibrating_until_s)
    }
}

impl SimCompetition {
    pub(crate) fn new(world: Rc<RefCell<SimWorld>>) -> Self {
        Self { world }
    }
}

impl CompetitionState for SimCompetition {
    fn is_enabled(&self) -> bool {
        self.world.borrow().enabled()
    }

    fn is_autonomous(&self) -> bool {
        self.world.borrow().autonomous()
    }
}

impl SimController {
    pub(crate) fn new(world: Rc<RefCell<SimWorld>>) -> Self {
        Self { world }
    }
}

impl ControllerInput for SimController {
    fn axis(&self, axis: Axis) -> f64 {
        self.world.borrow().axis(axis)
    }

    fn take_events(&mut self) -> Vec<ButtonEvent> {
        self.world.borrow_mut().take_button_events()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
