//! # Robot Executable Parameters
//!
//! Parameters of the executable itself rather than of any one module.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::sim::{SimEvent, SimParams};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct BotExecParams {
    /// Target period of one tick.
    ///
    /// Units: seconds
    pub tick_period_s: f64,

    /// Ticks waking later than this after their start count as overruns.
    ///
    /// Units: seconds
    pub warn_period_s: f64,

    /// How long to run for.
    ///
    /// Units: seconds
    pub duration_s: f64,

    /// Number of telemetry records which may be waiting to be written.
    pub tm_queue_len: usize,

    /// Minimum log level, one of `info`, `debug` or `trace`.
    pub log_level: String,

    /// The simulated robot.
    pub sim: SimParams,

    /// Scripted field and controller events.
    #[serde(default)]
    pub events: Vec<ScriptedEvent>,
}

/// An event applied to the simulation at a fixed time.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScriptedEvent {
    /// Units: seconds
    pub time_s: f64,

    pub event: SimEvent,
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use hal_if::Button;

    #[test]
    fn test_parse() {
        let p: BotExecParams = toml::from_str(
            r#"
            tick_period_s = 0.01
            warn_period_s = 0.015
            duration_s = 30.0
            tm_queue_len = 4096
            log_level = "info"

            [sim]
            free_speed_ms = 2.0
            speed_time_constant_s = 0.05
            track_width_m = 0.3
            wheel_circumference_m = 0.32
            motor_to_wheel_gear_ratio = 0.6
            yaw_calibration_s = 1.0
            max_substep_s = 0.001

            [[events]]
            time_s = 0.5
            event = { SetEnabled = true }

            [[events]]
            time_s = 12.0
            event = { Press = "Up" }
            "#,
        )
        .unwrap();

        assert_eq!(p.tm_queue_len, 4096);
        assert_eq!(p.sim.yaw_calibration_s, 1.0);
        assert_eq!(p.events.len(), 2);
        assert_eq!(p.events[0].event, SimEvent::SetEnabled(true));
        assert_eq!(p.events[1].event, SimEvent::Press(Button::Up));
    }
}
