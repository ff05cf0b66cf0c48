//! # Trapezoidal motion profile
//!
//! Generates a time parameterised `(position, velocity)` trajectory between two states, bounded by
//! a maximum velocity and a symmetric acceleration limit. The velocity against time plot is a
//! trapezoid, or a triangle when the distance is too short to reach the maximum velocity.
//!
//! Profiles are planned in the positive direction. When the goal lies behind the initial state
//! both states are reflected about zero, planned, and the result reflected back.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A point on a profile.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize)]
pub struct State {
    pub position: f64,
    pub velocity: f64,
}

/// Limits of a profile.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Constraints {
    max_velocity: f64,
    max_acceleration: f64,
}

/// A planned profile, evaluated with `calculate`.
#[derive(Debug, Clone, Serialize)]
pub struct TrapezoidProfile {
    constraints: Constraints,

    /// `+1` if planned as given, `-1` if the states were reflected.
    direction: f64,

    /// Initial and goal states in the planning direction.
    initial: State,
    goal: State,

    end_accel: f64,
    end_full_speed: f64,
    end_decel: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum ProfileError {
    #[error("Maximum velocity must be finite and non-negative, found {0}")]
    InvalidMaxVelocity(f64),

    #[error("Maximum acceleration must be finite and positive, found {0}")]
    InvalidMaxAcceleration(f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl State {
    pub fn new(position: f64, velocity: f64) -> Self {
        Self { position, velocity }
    }

    fn reflected(&self, direction: f64) -> Self {
        Self {
            position: self.position * direction,
            velocity: self.velocity * direction,
        }
    }
}

impl Constraints {
    pub fn new(max_velocity: f64, max_acceleration: f64) -> Result<Self, ProfileError> {
        if !max_velocity.is_finite() || max_velocity < 0.0 {
            return Err(ProfileError::InvalidMaxVelocity(max_velocity));
        }
        if !max_acceleration.is_finite() || max_acceleration <= 0.0 {
            return Err(ProfileError::InvalidMaxAcceleration(max_acceleration));
        }

        Ok(Self {
            max_velocity,
            max_acceleration,
        })
    }

    pub fn max_velocity(&self) -> f64 {
        self.max_velocity
    }

    pub fn max_acceleration(&self) -> f64 {
        self.max_acceleration
    }
}

impl TrapezoidProfile {
    /// Plan a profile from `initial` to `goal`.
    ///
    /// Velocities larger than the constraint are clamped to it.
    pub fn new(constraints: Constraints, initial: State, goal: State) -> Self {
        let direction = if goal.position < initial.position {
            -1.0
        } else {
            1.0
        };

        let v_max = constraints.max_velocity;
        let a_max = constraints.max_acceleration;

        let mut initial = initial.reflected(direction);
        let mut goal = goal.reflected(direction);
        initial.velocity = initial.velocity.min(v_max);
        goal.velocity = goal.velocity.min(v_max);

        // Extend the profile back to zero velocity at both ends so it's symmetric
        let cutoff_begin = initial.velocity / a_max;
        let cutoff_dist_begin = cutoff_begin * cutoff_begin * a_max / 2.0;

        let cutoff_end = goal.velocity / a_max;
        let cutoff_dist_end = cutoff_end * cutoff_end * a_max / 2.0;

        let full_trapezoid_dist =
            (cutoff_dist_begin + (goal.position - initial.position) + cutoff_dist_end).max(0.0);

        let mut accel_time = v_max / a_max;
        let mut full_speed_dist = full_trapezoid_dist - accel_time * accel_time * a_max;

        // Not enough distance to reach max velocity, or no velocity allowed at all
        if full_speed_dist < 0.0 || v_max <= 0.0 {
            accel_time = (full_trapezoid_dist / a_max).sqrt();
            full_speed_dist = 0.0;
        }

        let end_accel = accel_time - cutoff_begin;
        let end_full_speed = end_accel
            + if full_speed_dist > 0.0 {
                full_speed_dist / v_max
            } else {
                0.0
            };
        let end_decel = end_full_speed + accel_time - cutoff_end;

        Self {
            constraints,
            direction,
            initial,
            goal,
            end_accel,
            end_full_speed,
            end_decel,
        }
    }

    /// The target state `t` seconds after the start of the profile.
    pub fn calculate(&self, t: f64) -> State {
        let a_max = self.constraints.max_acceleration;
        let v_max = self.constraints.max_velocity;

        let result = if t < self.end_accel {
            State {
                position: self.initial.position + (self.initial.velocity + t * a_max / 2.0) * t,
                velocity: self.initial.velocity + t * a_max,
            }
        } else if t < self.end_full_speed {
            let accel_dist =
                (self.initial.velocity + self.end_accel * a_max / 2.0) * self.end_accel;
            State {
                position: self.initial.position + accel_dist + v_max * (t - self.end_accel),
                velocity: v_max,
            }
        } else if t <= self.end_decel {
            let time_left = self.end_decel - t;
            State {
                position: self.goal.position
                    - (self.goal.velocity + time_left * a_max / 2.0) * time_left,
                velocity: self.goal.velocity + time_left * a_max,
            }
        } else {
            self.goal
        };

        result.reflected(self.direction)
    }

    /// Duration of the whole profile.
    pub fn total_time(&self) -> f64 {
        self.end_decel
    }

    /// End times of the acceleration, cruise and deceleration phases.
    pub fn phase_times(&self) -> (f64, f64, f64) {
        (self.end_accel, self.end_full_speed, self.end_decel)
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
