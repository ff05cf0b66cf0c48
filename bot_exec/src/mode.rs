//! # Mode state machine
//!
//! Tracks the competition state of the robot, one of four combinations of `{Driver, Autonomous}`
//! and `{enabled, disabled}`, and fires the user's hooks when it changes.
//!
//! On a transition the hooks fire in a fixed order:
//!
//! 1. `exit` of the old state
//! 2. `on_disable`, if the robot became disabled
//! 3. `on_enable`, if the robot became enabled
//! 4. `enter` of the new state
//!
//! After any transition `state_periodic` fires on every tick while the robot is enabled. While
//! driver control is enabled, controller button events are dispatched to the bindings held in the
//! machine's `ButtonMap`.
//!
//! The periodic hook which fires on every tick regardless of state lives on the runtime, see
//! `Runtime::set_periodic`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use color_eyre::Report;
use log::{debug, info};
use serde::Serialize;

use hal_if::{ButtonEvent, CompetitionState};

use crate::sched::TickWait;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Mode {
    Driver,
    Autonomous,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RobotState {
    pub mode: Mode,
    pub enabled: bool,
}

/// Bindings from button events to actions.
#[derive(Default)]
pub struct ButtonMap {
    bindings: HashMap<ButtonEvent, Box<dyn FnMut()>>,
}

/// The mode state machine.
#[derive(Default)]
pub struct ModeMachine {
    /// `None` until the first state has been observed.
    state: Option<RobotState>,

    buttons: ButtonMap,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// User hooks driven by the mode machine. Every hook defaults to doing nothing.
///
/// Hooks which receive `ticks` may run blocking routines such as movements. Those routines are
/// told to cancel when the robot leaves the state they were started in.
pub trait ModeHooks {
    /// Fires when `state` is entered.
    fn enter(&mut self, _state: RobotState, _ticks: &mut dyn TickWait) -> Result<(), Report> {
        Ok(())
    }

    /// Fires when `state` is left.
    fn exit(&mut self, _state: RobotState) -> Result<(), Report> {
        Ok(())
    }

    fn on_enable(&mut self) -> Result<(), Report> {
        Ok(())
    }

    fn on_disable(&mut self) -> Result<(), Report> {
        Ok(())
    }

    /// Fires every tick while enabled, with the current state.
    fn state_periodic(
        &mut self,
        _state: RobotState,
        _ticks: &mut dyn TickWait,
    ) -> Result<(), Report> {
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RobotState {
    pub fn new(mode: Mode, enabled: bool) -> Self {
        Self { mode, enabled }
    }

    /// Read the state from the field control system.
    pub fn observe<S: CompetitionState + ?Sized>(competition: &S) -> Self {
        Self {
            mode: if competition.is_autonomous() {
                Mode::Autonomous
            } else {
                Mode::Driver
            },
            enabled: competition.is_enabled(),
        }
    }
}

impl ButtonMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `action` to `event`, replacing any previous binding.
    pub fn bind<F>(&mut self, event: ButtonEvent, action: F)
    where
        F: FnMut() + 'static,
    {
        self.bindings.insert(event, Box::new(action));
    }

    /// Run the action bound to `event`, returning false if there is none.
    pub fn dispatch(&mut self, event: ButtonEvent) -> bool {
        match self.bindings.get_mut(&event) {
            Some(action) => {
                action();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl ModeMachine {
    pub fn new(buttons: ButtonMap) -> Self {
        Self {
            state: None,
            buttons,
        }
    }

    /// The current state, `None` before the first step.
    pub fn state(&self) -> Option<RobotState> {
        self.state
    }

    /// Process one tick given the observed state and any button events since the last tick.
    pub fn step<H: ModeHooks + ?Sized>(
        &mut self,
        observed: RobotState,
        events: Vec<ButtonEvent>,
        hooks: &mut H,
        ticks: &mut dyn TickWait,
    ) -> Result<(), Report> {
        match self.state {
            Some(old) if old == observed => (),
            Some(old) => {
                info!("Mode transition: {:?} -> {:?}", old, observed);
                hooks.exit(old)?;
                if old.enabled && !observed.enabled {
                    hooks.on_disable()?;
                }
                if !old.enabled && observed.enabled {
                    hooks.on_enable()?;
                }
                self.state = Some(observed);
                hooks.enter(observed, ticks)?;
            }
            None => {
                info!("Initial mode: {:?}", observed);
                if observed.enabled {
                    hooks.on_enable()?;
                }
                self.state = Some(observed);
                hooks.enter(observed, ticks)?;
            }
        }

        if observed.mode == Mode::Driver && observed.enabled {
            for event in events {
                if !self.buttons.dispatch(event) {
                    debug!("No binding for {:?}", event);
                }
            }
        }

        if observed.enabled {
            hooks.state_periodic(observed, ticks)?;
        }

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
