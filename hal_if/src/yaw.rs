//! # Yaw sensor interface

use crate::HalError;

/// A gyro or IMU giving the robot's rotation about the vertical axis.
pub trait YawSensor {
    /// Continuous (unwrapped) rotation in degrees since calibration.
    ///
    /// The sign convention is that of the hardware. The drive controller's `angle_direction`
    /// parameter states which way is positive.
    fn rotation_degrees(&self) -> Result<f64, HalError>;

    /// Start calibration. Blocking backends return once calibration is complete, others return
    /// immediately and report progress through `is_calibrating`.
    fn calibrate(&mut self) -> Result<(), HalError>;

    fn is_calibrating(&self) -> Result<bool, HalError>;
}
