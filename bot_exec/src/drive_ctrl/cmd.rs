//! Movement options, timed commands and results

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// How a movement ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum MoveStatus {
    /// The target was reached within tolerance.
    Completed,

    /// The movement ran out of time, the robot may not be at the target.
    Timeout,

    /// The robot left the state the movement was started in and the movement was abandoned.
    Cancelled,
}

/// Rotation direction of an arc, viewed from above.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum ArcDirection {
    Clockwise,
    CounterClockwise,
}

/// The kind of movement, used in reports.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum MoveKind {
    Turn,
    Straight,
    Arc,
}

/// What a timed command does when it fires.
pub enum CommandAction<'a> {
    /// Run on the control thread, inside the tick.
    Inline(Box<dyn FnOnce() + 'a>),

    /// Handed to the command worker thread so the tick isn't held up.
    Background(Box<dyn FnOnce() + Send + 'static>),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An action fired once at a time offset within a movement.
///
/// Offsets of zero or more are measured from the start of the movement. Negative offsets are
/// measured back from the end of the movement's profile, so `-0.3` fires when 0.3 s of the
/// profile remain.
pub struct TimedCommand<'a> {
    pub offset_s: f64,
    pub action: CommandAction<'a>,
}

/// Options common to the straight, arc and point movements.
pub struct MoveOptions<'a> {
    /// Turn to the movement's heading before moving.
    pub turn_first: bool,

    /// Fold the heading controller's output into the wheel speeds while moving.
    pub turn_correct: bool,

    /// End at full profile velocity and leave the motors running, for chaining movements.
    pub dont_stop: bool,

    /// End as soon as the profile is finished and the wheels are within tolerance, without the
    /// extra settling time.
    pub stop_immediately: bool,

    /// Drive backwards to a point rather than forwards.
    pub use_back: bool,

    pub commands: Vec<TimedCommand<'a>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<'a> TimedCommand<'a> {
    pub fn inline<F>(offset_s: f64, action: F) -> Self
    where
        F: FnOnce() + 'a,
    {
        Self {
            offset_s,
            action: CommandAction::Inline(Box::new(action)),
        }
    }

    pub fn background<F>(offset_s: f64, action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            offset_s,
            action: CommandAction::Background(Box::new(action)),
        }
    }

    pub fn is_background(&self) -> bool {
        matches!(self.action, CommandAction::Background(_))
    }

    /// True if the command is due given the elapsed and remaining profile time.
    pub(crate) fn is_due(&self, elapsed_s: f64, remaining_s: f64) -> bool {
        if self.offset_s >= 0.0 {
            elapsed_s >= self.offset_s
        } else {
            remaining_s <= -self.offset_s
        }
    }
}

impl<'a> MoveOptions<'a> {
    /// Defaults for a straight movement: turn first and hold heading.
    pub fn straight() -> Self {
        Self {
            turn_first: true,
            turn_correct: true,
            dont_stop: false,
            stop_immediately: false,
            use_back: false,
            commands: Vec::new(),
        }
    }

    /// Defaults for an arc: no turn and no heading correction.
    pub fn arc() -> Self {
        Self {
            turn_first: false,
            turn_correct: false,
            ..Self::straight()
        }
    }

    pub fn with_command(mut self, command: TimedCommand<'a>) -> Self {
        self.commands.push(command);
        self
    }

    pub fn turn_first(mut self, turn_first: bool) -> Self {
        self.turn_first = turn_first;
        self
    }

    pub fn turn_correct(mut self, turn_correct: bool) -> Self {
        self.turn_correct = turn_correct;
        self
    }

    pub fn dont_stop(mut self) -> Self {
        self.dont_stop = true;
        self
    }

    pub fn stop_immediately(mut self) -> Self {
        self.stop_immediately = true;
        self
    }

    pub fn use_back(mut self) -> Self {
        self.use_back = true;
        self
    }
}

impl<'a> Default for MoveOptions<'a> {
    fn default() -> Self {
        Self::straight()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
