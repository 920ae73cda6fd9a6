//! Pedestrian crossing state machine

use rand::Rng;

use super::config::CrossingTiming;
use super::types::{CellPos, CrossingId};

/// A pedestrian crossing over one road cell
#[derive(Debug, Clone, PartialEq)]
pub struct SimCrossing {
    pub id: CrossingId,
    pub position: CellPos,
    pub lanes: usize,
    pub active: bool,
    pub timer: u32,
    pub active_duration: u32,
}

impl SimCrossing {
    pub fn new(id: CrossingId, position: CellPos, lanes: usize, timing: CrossingTiming) -> Self {
        Self {
            id,
            position,
            lanes,
            active: false,
            timer: 0,
            active_duration: timing.for_lanes(lanes),
        }
    }

    /// Advance one tick. An idle crossing activates with `probability`, but
    /// only when `road_clear` holds. Returns whether the crossing is active.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        probability: f64,
        road_clear: bool,
    ) -> bool {
        if self.active {
            self.timer += 1;
            if self.timer >= self.active_duration {
                self.active = false;
                self.timer = 0;
            }
        } else if road_clear && rng.random_bool(probability) {
            self.active = true;
            self.timer = 0;
        }
        self.active
    }
}
