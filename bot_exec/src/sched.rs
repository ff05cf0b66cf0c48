//! # Tick scheduler
//!
//! Fixed period cooperative loop timing. The scheduler owns the phase of the control loop: tick
//! `n` is due at `start + n * period`. Waking later than the warning threshold records an overrun,
//! and waking a full period or more late drops the missed periods instead of bunching them up.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{trace, warn};
use serde::Serialize;
use thiserror::Error;

use hal_if::Clock;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Fixed period scheduler.
pub struct Scheduler<C: Clock> {
    clock: C,

    period_s: f64,

    /// Lateness beyond which a tick counts as an overrun.
    warn_slack_s: f64,

    start_s: Option<f64>,

    /// Index of the next tick to be waited for.
    index: u64,

    stats: SchedStats,
}

/// Timing statistics.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SchedStats {
    pub num_ticks: u64,
    pub num_overruns: u64,
    pub max_overrun_s: f64,
    pub num_dropped_periods: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum SchedError {
    #[error("Tick period must be finite and positive, found {0} s")]
    InvalidPeriod(f64),

    #[error("Warning period ({warn} s) must not be shorter than the tick period ({period} s)")]
    InvalidWarnPeriod { period: f64, warn: f64 },
}

/// What a blocking routine should do after waiting for a tick.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TickStatus {
    /// Keep going.
    Continue,

    /// Abandon the routine, the robot has left the state it was started in.
    Cancel,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// The suspension point of blocking routines.
///
/// Movements call `wait_tick` once per inner loop iteration. Implementors block until the next
/// tick boundary and report whether the routine may continue.
pub trait TickWait {
    fn wait_tick(&mut self) -> TickStatus;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<C: Clock> Scheduler<C> {
    pub fn new(clock: C, period_s: f64, warn_period_s: f64) -> Result<Self, SchedError> {
        if !period_s.is_finite() || period_s <= 0.0 {
            return Err(SchedError::InvalidPeriod(period_s));
        }
        if !warn_period_s.is_finite() || warn_period_s < period_s {
            return Err(SchedError::InvalidWarnPeriod {
                period: period_s,
                warn: warn_period_s,
            });
        }

        Ok(Self {
            clock,
            period_s,
            warn_slack_s: warn_period_s - period_s,
            start_s: None,
            index: 0,
            stats: SchedStats::default(),
        })
    }

    /// (Re)start the schedule, the first tick is due immediately.
    pub fn start(&mut self) {
        self.start_s = Some(self.clock.now_seconds());
        self.index = 0;
    }

    /// Time at which the next tick is due.
    pub fn next_tick_time(&self) -> f64 {
        match self.start_s {
            Some(s) => s + (self.index as f64) * self.period_s,
            None => self.clock.now_seconds(),
        }
    }

    /// Block until the next tick is due and return the wake time.
    ///
    /// Starts the schedule if it hasn't been started.
    pub fn wait_next(&mut self) -> f64 {
        if self.start_s.is_none() {
            self.start();
        }

        let deadline = self.next_tick_time();
        self.clock.sleep_until(deadline);
        let now = self.clock.now_seconds();

        let late = now - deadline;
        if late > self.warn_slack_s {
            self.stats.num_overruns += 1;
            if late > self.stats.max_overrun_s {
                self.stats.max_overrun_s = late;
            }
            warn!("Cycle overran by {:.06} s", late);
        }

        if late >= self.period_s {
            let missed = (late / self.period_s).floor() as u64;
            self.index += missed;
            self.stats.num_dropped_periods += missed;
            warn!("Dropped {} periods to catch up", missed);
        }

        self.index += 1;
        self.stats.num_ticks += 1;
        trace!("Tick {} at {:.06} s", self.stats.num_ticks, now);

        now
    }

    pub fn period_s(&self) -> f64 {
        self.period_s
    }

    pub fn stats(&self) -> SchedStats {
        self.stats
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl<C: Clock> TickWait for Scheduler<C> {
    fn wait_tick(&mut self) -> TickStatus {
        self.wait_next();
        TickStatus::Continue
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::Cell;

    /// Clock which jumps straight to the deadline when slept, plus an optional amount of work.
    struct StepClock {
        now: Cell<f64>,
        work: Cell<f64>,
    }

    impl StepClock {
        fn new(now: f64) -> Self {
            Self {
                now: Cell::new(now),
                work: Cell::new(0.0),
            }
        }
    }

    impl Clock for StepClock {
        fn now_seconds(&self) -> f64 {
            self.now.get()
        }

        fn sleep_until(&self, deadline_s: f64) {
            if self.now.get() < deadline_s {
                self.now.set(deadline_s);
            }
            self.now.set(self.now.get() + self.work.replace(0.0));
        }
    }

    #[test]
    fn test_invalid_periods() {
        assert_eq!(
            Scheduler::new(StepClock::new(0.0), 0.0, 0.1).err(),
            Some(SchedError::InvalidPeriod(0.0))
        );
        assert!(Scheduler::new(StepClock::new(0.0), 0.01, 0.005).is_err());
        assert!(Scheduler::new(StepClock::new(0.0), f64::NAN, 0.005).is_err());
    }

    #[test]
    fn test_phase_is_exact() {
        let start = 1234.5678;
        let period = 0.01;
        let mut sched = Scheduler::new(StepClock::new(start), period, 0.015).unwrap();
        sched.start();

        for n in 1..=1000u64 {
            sched.wait_next();
            assert_eq!(sched.next_tick_time(), start + (n as f64) * period);
        }

        let stats = sched.stats();
        assert_eq!(stats.num_ticks, 1000);
        assert_eq!(stats.num_overruns, 0);
        assert_eq!(stats.num_dropped_periods, 0);
    }

    #[test]
    fn test_small_overrun_keeps_phase() {
        let mut sched = Scheduler::new(StepClock::new(0.0), 0.01, 0.012).unwrap();
        sched.start();
        sched.wait_next();

        // Wake 5 ms late, beyond the 2 ms slack but within a period
        sched.clock().work.set(0.005);
        sched.wait_next();

        let stats = sched.stats();
        assert_eq!(stats.num_overruns, 1);
        assert!((stats.max_overrun_s - 0.005).abs() < 1e-12);
        assert_eq!(stats.num_dropped_periods, 0);
        assert_eq!(sched.next_tick_time(), 2.0 * 0.01);
    }

    #[test]
    fn test_large_overrun_drops_periods() {
        let mut sched = Scheduler::new(StepClock::new(0.0), 0.01, 0.015).unwrap();
        sched.start();
        sched.wait_next();

        // Wake 35 ms late, three whole periods are dropped
        sched.clock().work.set(0.035);
        let now = sched.wait_next();

        let stats = sched.stats();
        assert_eq!(stats.num_overruns, 1);
        assert_eq!(stats.num_dropped_periods, 3);
        assert!(sched.next_tick_time() > now);
        assert_eq!(sched.next_tick_time(), 5.0 * 0.01);
    }
}
