//! Traffic light state machine
//!
//! Two-phase timer with no external inputs.

use std::fmt;

use super::config::LightTiming;
use super::types::{CellPos, LightId};

/// Public state of a light
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightState {
    Red,
    Green,
}

impl fmt::Display for LightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LightState::Red => f.write_str("red"),
            LightState::Green => f.write_str("green"),
        }
    }
}

/// A traffic light guarding one road cell
#[derive(Debug, Clone, PartialEq)]
pub struct SimTrafficLight {
    pub id: LightId,
    pub position: CellPos,
    pub state: LightState,
    /// Ticks spent in the current state
    pub timer: u32,
    pub red_duration: u32,
    pub green_duration: u32,
}

impl SimTrafficLight {
    /// Create a light whose starting phase is offset by its number so
    /// neighbouring lights do not switch in lockstep
    pub fn new(id: LightId, position: CellPos, timing: LightTiming) -> Self {
        let number = id.number();
        let (state, duration) = if number % 3 == 0 {
            (LightState::Green, timing.green)
        } else {
            (LightState::Red, timing.red)
        };

        Self {
            id,
            position,
            state,
            timer: (number % duration as usize) as u32,
            red_duration: timing.red,
            green_duration: timing.green,
        }
    }

    /// Advance one tick and return the new state
    pub fn advance(&mut self) -> LightState {
        self.timer += 1;
        match self.state {
            LightState::Red if self.timer >= self.red_duration => {
                self.state = LightState::Green;
                self.timer = 0;
            }
            LightState::Green if self.timer >= self.green_duration => {
                self.state = LightState::Red;
                self.timer = 0;
            }
            _ => {}
        }
        self.state
    }

    pub fn is_green(&self) -> bool {
        self.state == LightState::Green
    }
}
