//! General time utility functions and clock sources

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::cell::Cell;
use std::thread;
use std::time::{Duration, Instant};

use hal_if::Clock;
use log::warn;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Number of counts in one full revolution of a 32 bit hardware timer.
const WRAP_SPAN: u64 = 1 << 32;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A free-running millisecond counter which wraps back to zero after `u32::MAX`.
pub trait RawTimer {
    fn raw_millis(&self) -> u32;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Host clock based on `std::time::Instant`, measuring from its creation.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant,
}

/// Extends a wrapping 32 bit counter into a monotonic 64 bit count.
///
/// The counter must be sampled at least once per wrap period, otherwise whole
/// wraps are lost.
#[derive(Debug, Default, Clone, Copy)]
pub struct WrapCompensator {
    last_raw: Option<u32>,
    num_wraps: u64,
}

/// A `Clock` built on top of a wrapping hardware millisecond timer.
pub struct WrappingClock<T: RawTimer> {
    timer: T,
    compensator: Cell<WrapCompensator>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_seconds(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn sleep_until(&self, deadline_s: f64) {
        let remaining = deadline_s - self.now_seconds();
        if !remaining.is_finite() {
            warn!("Ignoring sleep to non-finite deadline {}", deadline_s);
            return;
        }
        if remaining > 0.0 {
            thread::sleep(Duration::from_secs_f64(remaining));
        }
    }
}

impl WrapCompensator {
    /// Feed a new raw counter value, returning the extended count.
    pub fn extend(&mut self, raw: u32) -> u64 {
        if let Some(last) = self.last_raw {
            if raw < last {
                self.num_wraps += 1;
            }
        }
        self.last_raw = Some(raw);

        self.num_wraps * WRAP_SPAN + raw as u64
    }
}

impl<T: RawTimer> WrappingClock<T> {
    pub fn new(timer: T) -> Self {
        Self {
            timer,
            compensator: Cell::new(WrapCompensator::default()),
        }
    }

    fn extended_millis(&self) -> u64 {
        let mut comp = self.compensator.get();
        let millis = comp.extend(self.timer.raw_millis());
        self.compensator.set(comp);
        millis
    }
}

impl<T: RawTimer> Clock for WrappingClock<T> {
    fn now_seconds(&self) -> f64 {
        self.extended_millis() as f64 * 1e-3
    }

    fn now_millis(&self) -> i64 {
        self.extended_millis() as i64
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
