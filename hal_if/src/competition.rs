//! # Competition state interface

/// State reported by the field control system.
pub trait CompetitionState {
    /// True if the robot is allowed to actuate.
    fn is_enabled(&self) -> bool;

    /// True if the match is in its autonomous period.
    fn is_autonomous(&self) -> bool;
}

impl<S: CompetitionState + ?Sized> CompetitionState for &S {
    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }

    fn is_autonomous(&self) -> bool {
        (**self).is_autonomous()
    }
}
