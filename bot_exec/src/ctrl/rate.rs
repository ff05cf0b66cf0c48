//! Rate of change estimator

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Estimates the derivative of a sampled signal.
///
/// A new rate is only computed once at least `min_sample_time` has passed since the last accepted
/// sample, in between the last rate is held. This keeps encoder quantisation from turning into
/// spikes when samples arrive close together.
#[derive(Debug, Clone, Serialize)]
pub struct RateEstimator {
    min_sample_time: f64,

    /// Baseline `(value, time)`, `None` before the first sample.
    previous: Option<(f64, f64)>,
    last_rate: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RateEstimator {
    pub fn new(min_sample_time: f64) -> Self {
        Self {
            min_sample_time: min_sample_time.max(0.0),
            previous: None,
            last_rate: 0.0,
        }
    }

    /// Add a sample taken at `now_s` and return the current rate estimate.
    pub fn sample(&mut self, value: f64, now_s: f64) -> f64 {
        let (prev_value, prev_time) = match self.previous {
            Some(p) => p,
            None => {
                self.previous = Some((value, now_s));
                self.last_rate = 0.0;
                return 0.0;
            }
        };

        let dt = now_s - prev_time;
        if dt < self.min_sample_time || dt <= 0.0 {
            return self.last_rate;
        }

        self.last_rate = (value - prev_value) / dt;
        self.previous = Some((value, now_s));

        self.last_rate
    }

    /// The most recent estimate.
    pub fn rate(&self) -> f64 {
        self.last_rate
    }

    /// Forget the baseline, the next sample will return zero.
    pub fn reset(&mut self) {
        self.previous = None;
        self.last_rate = 0.0;
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
