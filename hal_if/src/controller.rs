//! # Driver controller interface
//!
//! Used during driver control only. The autonomous path of the control core never reads it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Analog stick axes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    LeftX,
    LeftY,
    RightX,
    RightY,
}

/// Digital buttons.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    A,
    B,
    X,
    Y,
    Up,
    Down,
    Left,
    Right,
    L1,
    L2,
    R1,
    R2,
}

/// Which edge of a button press occurred.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    Pressed,
    Released,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single button transition.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ButtonEvent {
    pub button: Button,
    pub edge: Edge,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

pub trait ControllerInput {
    /// Position of the axis in `[-1, +1]`.
    fn axis(&self, axis: Axis) -> f64;

    /// Take every button event which occurred since the last call, oldest first.
    fn take_events(&mut self) -> Vec<ButtonEvent>;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ButtonEvent {
    pub fn pressed(button: Button) -> Self {
        Self {
            button,
            edge: Edge::Pressed,
        }
    }

    pub fn released(button: Button) -> Self {
        Self {
            button,
            edge: Edge::Released,
        }
    }
}
