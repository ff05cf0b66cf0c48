//! # Runtime
//!
//! The top level loop of the robot. Each tick the runtime waits for the tick to fall due, observes
//! the competition state, takes the controller's button events and steps the mode machine.
//!
//! Hooks run inside the tick and may block by waiting on the `TickWait` they are handed. That
//! waiter is a `GuardedTicker`, which keeps the scheduler's phase and cancels the blocking routine
//! as soon as the robot leaves the state the routine was started in.
//!
//! The top level periodic hook is owned by the runtime rather than the mode hooks, so that it
//! fires on every tick including those waited out by a blocking routine.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use color_eyre::Report;
use log::{debug, info};

use hal_if::{Clock, CompetitionState, ControllerInput};

use crate::{
    mode::{ModeHooks, ModeMachine, RobotState},
    sched::{SchedStats, Scheduler, TickStatus, TickWait},
};

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// Hook fired once per tick with the state observed on that tick.
pub type PeriodicHook = Box<dyn FnMut(RobotState)>;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Owns everything needed to run the robot's main loop.
pub struct Runtime<C: Clock, S: CompetitionState, I: ControllerInput> {
    scheduler: Scheduler<C>,
    modes: ModeMachine,
    competition: S,
    controller: I,
    periodic: Option<PeriodicHook>,
}

/// A `TickWait` which cancels once the robot leaves a given state.
pub struct GuardedTicker<'r, C: Clock, S: CompetitionState + ?Sized> {
    scheduler: &'r mut Scheduler<C>,
    competition: &'r S,
    guard: RobotState,

    /// Fired after every wait, so the periodic hook keeps running under a blocking routine.
    periodic: Option<&'r mut PeriodicHook>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<C: Clock, S: CompetitionState, I: ControllerInput> Runtime<C, S, I> {
    pub fn new(
        scheduler: Scheduler<C>,
        modes: ModeMachine,
        competition: S,
        controller: I,
    ) -> Self {
        Self {
            scheduler,
            modes,
            competition,
            controller,
            periodic: None,
        }
    }

    /// Set the hook fired on every tick regardless of state, replacing any previous one.
    pub fn set_periodic<F>(&mut self, hook: F)
    where
        F: FnMut(RobotState) + 'static,
    {
        self.periodic = Some(Box::new(hook));
    }

    /// Wait for the next tick and run it.
    pub fn step<H: ModeHooks + ?Sized>(&mut self, hooks: &mut H) -> Result<(), Report> {
        self.scheduler.wait_next();

        let observed = RobotState::observe(&self.competition);
        let events = self.controller.take_events();

        if let Some(periodic) = self.periodic.as_mut() {
            periodic(observed);
        }

        let mut ticks = GuardedTicker {
            scheduler: &mut self.scheduler,
            competition: &self.competition,
            guard: observed,
            periodic: self.periodic.as_mut(),
        };
        self.modes.step(observed, events, hooks, &mut ticks)
    }

    /// Run ticks until `duration_s` has elapsed.
    pub fn run_for<H: ModeHooks + ?Sized>(
        &mut self,
        hooks: &mut H,
        duration_s: f64,
    ) -> Result<(), Report> {
        self.scheduler.start();
        let end_s = self.scheduler.clock().now_seconds() + duration_s;

        info!(
            "Running for {:.2} s at {:.1} Hz",
            duration_s,
            1.0 / self.scheduler.period_s()
        );

        while self.scheduler.next_tick_time() < end_s {
            self.step(hooks)?;
        }

        Ok(())
    }

    pub fn state(&self) -> Option<RobotState> {
        self.modes.state()
    }

    pub fn stats(&self) -> SchedStats {
        self.scheduler.stats()
    }

    pub fn clock(&self) -> &C {
        self.scheduler.clock()
    }
}

impl<'r, C: Clock, S: CompetitionState + ?Sized> GuardedTicker<'r, C, S> {
    /// Guard on the state observed now.
    pub fn new(scheduler: &'r mut Scheduler<C>, competition: &'r S) -> Self {
        let guard = RobotState::observe(competition);
        Self::with_guard(scheduler, competition, guard)
    }

    pub fn with_guard(
        scheduler: &'r mut Scheduler<C>,
        competition: &'r S,
        guard: RobotState,
    ) -> Self {
        Self {
            scheduler,
            competition,
            guard,
            periodic: None,
        }
    }

    pub fn guard(&self) -> RobotState {
        self.guard
    }
}

impl<'r, C: Clock, S: CompetitionState + ?Sized> TickWait for GuardedTicker<'r, C, S> {
    fn wait_tick(&mut self) -> TickStatus {
        self.scheduler.wait_next();

        let observed = RobotState::observe(self.competition);
        if let Some(periodic) = self.periodic.as_deref_mut() {
            periodic(observed);
        }

        if observed != self.guard {
            debug!(
                "Left {:?} for {:?}, cancelling the running routine",
                self.guard, observed
            );
            TickStatus::Cancel
        } else {
            TickStatus::Continue
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
