//! PID and PIDF controllers

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// PID tuning.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PidGains {
    /// Proportional gain
    pub kp: f64,

    /// Integral gain
    pub ki: f64,

    /// Derivative gain
    pub kd: f64,

    /// Limit on the magnitude of the accumulated integral, only applied when `ki` is non-zero.
    pub ki_limit: f64,
}

/// PIDF tuning, a PID plus a feed-forward gain applied to the setpoint.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PidfGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub ki_limit: f64,

    /// Feed-forward gain
    pub kf: f64,
}

/// A PID controller.
///
/// Time is passed in by the caller on every update. Updates arriving less than `min_dt` after the
/// previous one are ignored and return the previous output.
#[derive(Debug, Clone, Serialize)]
pub struct Pid {
    gains: PidGains,
    min_dt: f64,

    setpoint: f64,

    /// Time of the last accepted update, `None` until the first update after construction or
    /// reset.
    prev_time: Option<f64>,
    prev_error: f64,
    integral: f64,
    last_output: f64,
}

/// A PID controller with setpoint feed-forward.
#[derive(Debug, Clone, Serialize)]
pub struct Pidf {
    pid: Pid,
    kf: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PidfGains {
    /// The feedback part of the gains.
    pub fn pid(&self) -> PidGains {
        PidGains {
            kp: self.kp,
            ki: self.ki,
            kd: self.kd,
            ki_limit: self.ki_limit,
        }
    }
}

impl Pid {
    pub fn new(gains: PidGains, min_dt: f64) -> Self {
        Self {
            gains: PidGains {
                ki_limit: gains.ki_limit.abs(),
                ..gains
            },
            min_dt: min_dt.max(0.0),
            setpoint: 0.0,
            prev_time: None,
            prev_error: 0.0,
            integral: 0.0,
            last_output: 0.0,
        }
    }

    /// Update the controller with a new measurement taken at `now_s`.
    ///
    /// The first update after construction or `reset` has no time base, so it only applies the
    /// proportional term and records the time.
    pub fn update(&mut self, measurement: f64, now_s: f64) -> f64 {
        let error = self.setpoint - measurement;

        let prev_time = match self.prev_time {
            Some(t) => t,
            None => {
                self.prev_time = Some(now_s);
                self.prev_error = error;
                self.last_output = self.gains.kp * error;
                return self.last_output;
            }
        };

        let dt = now_s - prev_time;
        if dt < self.min_dt || dt <= 0.0 {
            return self.last_output;
        }

        self.integral += error * dt;
        if self.gains.ki != 0.0 {
            self.integral = self
                .integral
                .clamp(-self.gains.ki_limit, self.gains.ki_limit);
        }

        let derivative = if self.gains.kd != 0.0 {
            (error - self.prev_error) / dt
        } else {
            0.0
        };

        let output = self.gains.kp * error
            + self.gains.ki * self.integral
            + self.gains.kd * derivative;

        self.prev_time = Some(now_s);
        self.prev_error = error;
        self.last_output = output;

        output
    }

    /// True if `measurement` is within `threshold` of the setpoint.
    pub fn at_setpoint(&self, measurement: f64, threshold: f64) -> bool {
        (self.setpoint - measurement).abs() <= threshold
    }

    /// Clear the accumulated state, keeping the gains and setpoint.
    pub fn reset(&mut self) {
        self.prev_time = None;
        self.prev_error = 0.0;
        self.integral = 0.0;
        self.last_output = 0.0;
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn set_setpoint(&mut self, setpoint: f64) {
        self.setpoint = setpoint;
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// Error seen by the last accepted update.
    pub fn error(&self) -> f64 {
        self.prev_error
    }

    pub fn last_output(&self) -> f64 {
        self.last_output
    }

    pub fn gains(&self) -> &PidGains {
        &self.gains
    }
}

impl Pidf {
    pub fn new(gains: PidfGains, min_dt: f64) -> Self {
        Self {
            pid: Pid::new(gains.pid(), min_dt),
            kf: gains.kf,
        }
    }

    /// Update with a new measurement, returning the PID output plus `kf * setpoint`.
    ///
    /// The feed-forward is evaluated on every call, including those gated by `min_dt`.
    pub fn update(&mut self, measurement: f64, now_s: f64) -> f64 {
        self.pid.update(measurement, now_s) + self.kf * self.pid.setpoint()
    }

    pub fn at_setpoint(&self, measurement: f64, threshold: f64) -> bool {
        self.pid.at_setpoint(measurement, threshold)
    }

    pub fn reset(&mut self) {
        self.pid.reset()
    }

    pub fn setpoint(&self) -> f64 {
        self.pid.setpoint()
    }

    pub fn set_setpoint(&mut self, setpoint: f64) {
        self.pid.set_setpoint(setpoint)
    }

    /// The feedback controller underneath the feed-forward.
    pub fn pid(&self) -> &Pid {
        &self.pid
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn gains(kp: f64, ki: f64, kd: f64, ki_limit: f64) -> PidGains {
        PidGains { kp, ki, kd, ki_limit }
    }

    #[test]
    fn test_first_update_is_proportional() {
        let mut pid = Pid::new(gains(2.0, 10.0, 5.0, 100.0), 0.005);
        pid.set_setpoint(1.0);

        assert_relative_eq!(pid.update(0.25, 3.0), 1.5);
        assert_eq!(pid.integral(), 0.0);
    }

    #[test]
    fn test_pid_terms() {
        let mut pid = Pid::new(gains(1.0, 0.5, 0.1, 100.0), 0.0);
        pid.set_setpoint(2.0);

        pid.update(0.0, 0.0);

        // error 1.0 over 0.1 s: integral 0.1, derivative (1 - 2) / 0.1 = -10
        let out = pid.update(1.0, 0.1);
        assert_relative_eq!(pid.integral(), 0.1, epsilon = 1e-12);
        assert_relative_eq!(out, 1.0 + 0.5 * 0.1 - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_no_derivative_without_kd() {
        let mut pid = Pid::new(gains(1.0, 0.0, 0.0, 0.0), 0.0);
        pid.set_setpoint(1.0);
        pid.update(0.0, 0.0);
        assert_relative_eq!(pid.update(0.9, 0.01), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut pid = Pid::new(gains(1.0, 1.0, 0.0, 10.0), 0.0);
        pid.set_setpoint(1.0);
        pid.update(0.0, 0.0);
        pid.update(0.0, 1.0);
        assert!(pid.integral() > 0.0);

        pid.reset();
        assert_eq!(pid.integral(), 0.0);
        assert_eq!(pid.last_output(), 0.0);
        assert_eq!(pid.setpoint(), 1.0);

        // No time base after reset, so a large time jump doesn't integrate
        assert_relative_eq!(pid.update(0.5, 100.0), 0.5);
        assert_eq!(pid.integral(), 0.0);
    }

    #[test]
    fn test_at_setpoint() {
        let mut pid = Pid::new(PidGains::default(), 0.0);
        pid.set_setpoint(1.0);
        assert!(pid.at_setpoint(1.004, 0.005));
        assert!(pid.at_setpoint(0.995, 0.005));
        assert!(!pid.at_setpoint(0.99, 0.005));
    }

    #[test]
    fn test_pidf_feedforward() {
        let mut pidf = Pidf::new(
            PidfGains {
                kp: 0.2,
                ki: 0.0,
                kd: 0.0,
                ki_limit: 0.0,
                kf: 0.5,
            },
            0.005,
        );
        pidf.set_setpoint(1.0);

        assert_relative_eq!(pidf.update(1.0, 0.0), 0.5);
        assert_relative_eq!(pidf.update(0.5, 0.01), 0.5 + 0.1);

        // Gated call still picks up the new setpoint through the feed-forward
        pidf.set_setpoint(2.0);
        assert_relative_eq!(pidf.update(0.5, 0.011), 1.0 + 0.1);
    }

    proptest! {
        #[test]
        fn prop_updates_within_min_dt_are_ignored(
            kp in -5.0f64..5.0,
            ki in -5.0f64..5.0,
            kd in -5.0f64..5.0,
            start in 0.0f64..100.0,
            warmup in proptest::collection::vec(-10.0f64..10.0, 1..5),
            gated in proptest::collection::vec((0.0f64..0.0099, -10.0f64..10.0), 1..20),
        ) {
            let mut pid = Pid::new(gains(kp, ki, kd, 50.0), 0.01);
            pid.set_setpoint(1.0);

            // Accepted updates spaced by more than min_dt
            let mut t = start;
            for m in warmup.iter() {
                pid.update(*m, t);
                t += 0.02;
            }

            let t0 = t;
            let first = pid.update(0.0, t0);
            let integral = pid.integral();
            let error = pid.error();

            for (offset, m) in gated.iter() {
                prop_assert_eq!(pid.update(*m, t0 + offset), first);
                prop_assert_eq!(pid.integral(), integral);
                prop_assert_eq!(pid.error(), error);
            }
        }

        #[test]
        fn prop_integral_is_clamped(
            ki in prop_oneof![-10.0f64..-0.01, 0.01f64..10.0],
            ki_limit in 0.0f64..5.0,
            samples in proptest::collection::vec((0.001f64..0.5, -100.0f64..100.0), 1..100),
        ) {
            let mut pid = Pid::new(gains(1.0, ki, 0.0, ki_limit), 0.0);
            pid.set_setpoint(3.0);

            let mut t = 0.0;
            for (dt, m) in samples.iter() {
                t += dt;
                pid.update(*m, t);
                prop_assert!(pid.integral().abs() <= ki_limit);
            }
        }
    }
}
