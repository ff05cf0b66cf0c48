//! Simulated world state and physics

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::{HashMap, VecDeque};

use log::{debug, info, warn};

use super::{SimEvent, SimParams, Side};
use crate::geom::{Pose2d, Rotation2d, Translation2d};
use hal_if::{Axis, ButtonEvent};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// State of one side of the drivetrain.
#[derive(Debug, Clone, Copy)]
pub struct SideState {
    /// Last commanded power, in `[-1, +1]`.
    pub power: f64,

    /// Units: meters/second
    pub velocity_ms: f64,

    /// Units: meters
    pub position_m: f64,

    pub connected: bool,
}

/// Everything the simulated devices share.
pub struct SimWorld {
    params: SimParams,

    time_s: f64,

    left: SideState,
    right: SideState,

    /// Ground truth pose, yaw counter-clockwise positive.
    x_m: f64,
    y_m: f64,
    yaw_rad: f64,

    stuck: bool,

    enabled: bool,
    autonomous: bool,

    axes: HashMap<Axis, f64>,
    button_events: VecDeque<ButtonEvent>,

    /// Pending scripted events, sorted by time.
    events: Vec<(f64, SimEvent)>,

    /// Ground truth yaw the sensor reads as zero.
    pub(crate) yaw_zero_rad: f64,
    pub(crate) calibrating_until_s: f64,
    pub(crate) fail_next_calibration: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SideState {
    fn new() -> Self {
        Self {
            power: 0.0,
            velocity_ms: 0.0,
            position_m: 0.0,
            connected: true,
        }
    }
}

impl SimWorld {
    pub fn new(params: SimParams) -> Self {
        Self {
            params,
            time_s: 0.0,
            left: SideState::new(),
            right: SideState::new(),
            x_m: 0.0,
            y_m: 0.0,
            yaw_rad: 0.0,
            stuck: false,
            enabled: false,
            autonomous: false,
            axes: HashMap::new(),
            button_events: VecDeque::new(),
            events: Vec::new(),
            yaw_zero_rad: 0.0,
            calibrating_until_s: f64::NEG_INFINITY,
            fail_next_calibration: false,
        }
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    pub fn side(&self, side: Side) -> &SideState {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut SideState {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn autonomous(&self) -> bool {
        self.autonomous
    }

    pub fn yaw_rad(&self) -> f64 {
        self.yaw_rad
    }

    pub fn true_pose(&self) -> Pose2d {
        Pose2d::new(
            Translation2d::new(self.x_m, self.y_m),
            Rotation2d::from_radians(self.yaw_rad),
        )
    }

    pub fn axis(&self, axis: Axis) -> f64 {
        self.axes.get(&axis).copied().unwrap_or(0.0)
    }

    pub fn set_axis(&mut self, axis: Axis, value: f64) {
        self.axes.insert(axis, value.clamp(-1.0, 1.0));
    }

    pub fn take_button_events(&mut self) -> Vec<ButtonEvent> {
        self.button_events.drain(..).collect()
    }

    /// Queue an event, keeping the queue ordered. Events at the same time apply in the order they
    /// were queued.
    pub fn schedule(&mut self, time_s: f64, event: SimEvent) {
        let idx = self.events.partition_point(|(t, _)| *t <= time_s);
        self.events.insert(idx, (time_s, event));
    }

    pub fn apply(&mut self, event: SimEvent) {
        debug!("Sim event at {:.3} s: {:?}", self.time_s, event);

        match event {
            SimEvent::SetEnabled(e) => {
                if e != self.enabled {
                    info!("Sim: robot {}", if e { "enabled" } else { "disabled" });
                }
                self.enabled = e;
            }
            SimEvent::SetAutonomous(a) => self.autonomous = a,
            SimEvent::Press(button) => self.button_events.push_back(ButtonEvent::pressed(button)),
            SimEvent::Release(button) => {
                self.button_events.push_back(ButtonEvent::released(button))
            }
            SimEvent::SetStuck(s) => self.stuck = s,
        }
    }

    /// Advance the world to `deadline_s`, applying scripted events as they fall due.
    ///
    /// Does nothing if the deadline has already passed. The final substep lands exactly on the
    /// deadline.
    pub fn advance_to(&mut self, deadline_s: f64) {
        if !deadline_s.is_finite() {
            warn!("Ignoring advance to non-finite time {}", deadline_s);
            return;
        }

        self.apply_due_events();

        while self.time_s < deadline_s {
            let remaining = deadline_s - self.time_s;
            let dt = remaining.min(self.params.max_substep_s);

            self.step(dt);

            if dt >= remaining {
                self.time_s = deadline_s;
            } else {
                self.time_s += dt;
            }

            self.apply_due_events();
        }
    }

    fn apply_due_events(&mut self) {
        let num_due = self.events.partition_point(|(t, _)| *t <= self.time_s);
        let due: Vec<_> = self.events.drain(..num_due).collect();
        for (_, event) in due {
            self.apply(event);
        }
    }

    /// Integrate the physics over `dt_s`.
    fn step(&mut self, dt_s: f64) {
        if self.stuck {
            self.left.velocity_ms = 0.0;
            self.right.velocity_ms = 0.0;
            return;
        }

        let free_speed = self.params.free_speed_ms;
        let alpha = (dt_s / self.params.speed_time_constant_s).min(1.0);
        let enabled = self.enabled;

        for side in [&mut self.left, &mut self.right].iter_mut() {
            let power = if enabled { side.power } else { 0.0 };
            side.velocity_ms += (power * free_speed - side.velocity_ms) * alpha;
            side.position_m += side.velocity_ms * dt_s;
        }

        let forward = 0.5 * (self.left.velocity_ms + self.right.velocity_ms);
        let yaw_rate = (self.right.velocity_ms - self.left.velocity_ms) / self.params.track_width_m;

        // Integrate about the midpoint heading of the step
        let mid_yaw = self.yaw_rad + 0.5 * yaw_rate * dt_s;
        self.x_m += forward * mid_yaw.cos() * dt_s;
        self.y_m += forward * mid_yaw.sin() * dt_s;
        self.yaw_rad += yaw_rate * dt_s;
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use hal_if::Button;

    fn world() -> SimWorld {
        let mut w = SimWorld::new(SimParams::default());
        w.apply(SimEvent::SetEnabled(true));
        w
    }

    #[test]
    fn test_advance_lands_on_deadline() {
        let mut w = world();
        w.advance_to(0.0123);
        assert_eq!(w.time_s(), 0.0123);

        // Already past, time doesn't go backwards
        w.advance_to(0.01);
        assert_eq!(w.time_s(), 0.0123);
    }

    #[test]
    fn test_first_order_response() {
        let mut w = world();
        w.side_mut(Side::Left).power = 0.5;
        w.side_mut(Side::Right).power = 0.5;

        // Five time constants, within 1% of the final speed
        w.advance_to(0.25);
        let v = w.side(Side::Left).velocity_ms;
        assert!((v - 1.0).abs() < 0.01, "v = {}", v);
        assert_abs_diff_eq!(w.yaw_rad(), 0.0);
        assert!(w.true_pose().translation.x.meters() > 0.0);
    }

    #[test]
    fn test_turning_kinematics() {
        let mut w = world();
        w.side_mut(Side::Left).power = -0.5;
        w.side_mut(Side::Right).power = 0.5;
        w.advance_to(1.0);

        // Counter-clockwise, and spinning on the spot
        assert!(w.yaw_rad() > 0.0);
        let p = w.true_pose();
        assert_abs_diff_eq!(p.translation.x.meters(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.translation.y.meters(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(
            w.yaw_rad(),
            (w.side(Side::Right).position_m - w.side(Side::Left).position_m)
                / w.params().track_width_m,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_disabled_and_stuck() {
        let mut w = SimWorld::new(SimParams::default());
        w.side_mut(Side::Left).power = 1.0;
        w.advance_to(0.5);
        assert_eq!(w.side(Side::Left).position_m, 0.0);

        w.apply(SimEvent::SetEnabled(true));
        w.apply(SimEvent::SetStuck(true));
        w.advance_to(1.0);
        assert_eq!(w.side(Side::Left).position_m, 0.0);
    }

    #[test]
    fn test_scheduled_events() {
        let mut w = SimWorld::new(SimParams::default());
        w.schedule(0.2, SimEvent::SetAutonomous(true));
        w.schedule(0.1, SimEvent::SetEnabled(true));
        w.schedule(0.1, SimEvent::Press(Button::A));

        w.advance_to(0.1);
        assert!(w.enabled());
        assert!(!w.autonomous());
        assert_eq!(w.take_button_events(), vec![ButtonEvent::pressed(Button::A)]);
        assert!(w.take_button_events().is_empty());

        w.advance_to(0.3);
        assert!(w.autonomous());
    }
}
