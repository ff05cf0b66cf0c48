//! # Clock interface

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A monotonic time source.
///
/// Values returned by `now_seconds` and `now_millis` must never decrease during a program run,
/// including across wrap-around of any underlying hardware counter. Resolution must be at least
/// one millisecond.
pub trait Clock {
    /// Time since an arbitrary fixed epoch, in seconds.
    fn now_seconds(&self) -> f64;

    /// Time since the same epoch, in whole milliseconds.
    fn now_millis(&self) -> i64 {
        (self.now_seconds() * 1e3).floor() as i64
    }

    /// Block until `now_seconds() >= deadline_s`. A deadline which is not finite returns
    /// immediately.
    ///
    /// The default implementation spins, backends with a real sleep should override it.
    fn sleep_until(&self, deadline_s: f64) {
        while deadline_s.is_finite() && self.now_seconds() < deadline_s {
            std::hint::spin_loop();
        }
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_seconds(&self) -> f64 {
        (**self).now_seconds()
    }

    fn now_millis(&self) -> i64 {
        (**self).now_millis()
    }

    fn sleep_until(&self, deadline_s: f64) {
        (**self).sleep_until(deadline_s)
    }
}
