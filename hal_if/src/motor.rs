//! # Motor interface
//!
//! A `Motor` is anything that can be driven with a normalised power and reports the position and
//! velocity of its output shaft. A `MotorGroup` combines several motors that drive the same wheels
//! so that the controller can treat one side of the drivetrain as a single motor.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::warn;

use crate::HalError;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

pub trait Motor {
    /// Command the motor with a power in `[-1, +1]`, where full scale is the battery voltage.
    fn set_normalized(&mut self, power: f64) -> Result<(), HalError>;

    /// Cumulative shaft position in revolutions.
    fn position_revolutions(&self) -> Result<f64, HalError>;

    /// Shaft velocity in revolutions per minute.
    fn velocity_rpm(&self) -> Result<f64, HalError>;
}

impl<M: Motor + ?Sized> Motor for Box<M> {
    fn set_normalized(&mut self, power: f64) -> Result<(), HalError> {
        (**self).set_normalized(power)
    }

    fn position_revolutions(&self) -> Result<f64, HalError> {
        (**self).position_revolutions()
    }

    fn velocity_rpm(&self) -> Result<f64, HalError> {
        (**self).velocity_rpm()
    }
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Several motors mechanically coupled to the same wheels.
///
/// Power is broadcast to every motor, position and velocity are averaged.
pub struct MotorGroup<M> {
    motors: Vec<M>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<M: Motor> MotorGroup<M> {
    pub fn new(motors: Vec<M>) -> Result<Self, HalError> {
        if motors.is_empty() {
            return Err(HalError::EmptyGroup);
        }

        Ok(Self { motors })
    }

    pub fn len(&self) -> usize {
        self.motors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.motors.is_empty()
    }

    fn average<F>(&self, f: F) -> Result<f64, HalError>
    where
        F: Fn(&M) -> Result<f64, HalError>,
    {
        let mut sum = 0.0;
        for m in self.motors.iter() {
            sum += f(m)?;
        }
        Ok(sum / self.motors.len() as f64)
    }
}

impl<M: Motor> Motor for MotorGroup<M> {
    /// Every motor is commanded even if an earlier one fails, the first error is returned.
    fn set_normalized(&mut self, power: f64) -> Result<(), HalError> {
        let power = power.clamp(-1.0, 1.0);
        let mut first_err = None;

        for (i, m) in self.motors.iter_mut().enumerate() {
            if let Err(e) = m.set_normalized(power) {
                warn!("Motor {} of group could not be commanded: {}", i, e);
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn position_revolutions(&self) -> Result<f64, HalError> {
        self.average(|m| m.position_revolutions())
    }

    fn velocity_rpm(&self) -> Result<f64, HalError> {
        self.average(|m| m.velocity_rpm())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
