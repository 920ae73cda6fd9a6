//! Shared cell registries
//!
//! `OccupancyRegistry` records which vehicles stand in which cell and is the
//! only arbiter of lane contention. `ParkingDelayRegistry` blocks cells while
//! a parking maneuver is in progress. Both are owned by the world and lent
//! to each vehicle during its update.

use std::collections::HashMap;

use super::error::SimError;
use super::types::{CellPos, VehicleId};

/// Mapping from cell to the vehicles currently registered there
#[derive(Debug, Clone, Default)]
pub struct OccupancyRegistry {
    cells: HashMap<CellPos, Vec<VehicleId>>,
}

impl OccupancyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn occupants(&self, pos: CellPos) -> &[VehicleId] {
        self.cells.get(&pos).map_or(&[], Vec::as_slice)
    }

    pub fn count(&self, pos: CellPos) -> usize {
        self.occupants(pos).len()
    }

    /// Number of vehicles in `pos` other than `vehicle`
    pub fn count_excluding(&self, pos: CellPos, vehicle: VehicleId) -> usize {
        self.occupants(pos).iter().filter(|id| **id != vehicle).count()
    }

    /// Whether `vehicle` could stand in `pos` without exceeding `lanes`
    pub fn has_room_for(&self, pos: CellPos, lanes: usize, vehicle: VehicleId) -> bool {
        self.count_excluding(pos, vehicle) < lanes
    }

    pub fn is_registered(&self, pos: CellPos, vehicle: VehicleId) -> bool {
        self.occupants(pos).contains(&vehicle)
    }

    /// Register `vehicle` in `pos`. Registering twice is a no-op; going past
    /// the lane count is an invariant violation.
    pub fn register(&mut self, pos: CellPos, vehicle: VehicleId, lanes: usize) -> Result<(), SimError> {
        let occupants = self.cells.entry(pos).or_default();
        if occupants.contains(&vehicle) {
            return Ok(());
        }
        if occupants.len() >= lanes {
            return Err(SimError::CapacityExceeded {
                pos,
                lanes,
                occupants: occupants.len(),
            });
        }
        occupants.push(vehicle);
        Ok(())
    }

    /// Remove `vehicle` from `pos`, returning whether it was there
    pub fn deregister(&mut self, pos: CellPos, vehicle: VehicleId) -> bool {
        let Some(occupants) = self.cells.get_mut(&pos) else {
            return false;
        };
        let before = occupants.len();
        occupants.retain(|id| *id != vehicle);
        let removed = occupants.len() != before;
        if occupants.is_empty() {
            self.cells.remove(&pos);
        }
        removed
    }

    /// Remove `vehicle` from every cell
    pub fn remove_vehicle(&mut self, vehicle: VehicleId) {
        for occupants in self.cells.values_mut() {
            occupants.retain(|id| *id != vehicle);
        }
        self.cells.retain(|_, occupants| !occupants.is_empty());
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellPos, &[VehicleId])> + '_ {
        self.cells.iter().map(|(pos, ids)| (*pos, ids.as_slice()))
    }

    /// Total registrations across all cells
    pub fn total(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }
}

/// Cells temporarily blocked by a parking or unparking maneuver
#[derive(Debug, Clone, Default)]
pub struct ParkingDelayRegistry {
    cells: HashMap<CellPos, u32>,
}

impl ParkingDelayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block `pos` for `ticks` ticks, extending any shorter block
    pub fn mark(&mut self, pos: CellPos, ticks: u32) {
        if ticks == 0 {
            return;
        }
        let remaining = self.cells.entry(pos).or_insert(0);
        *remaining = (*remaining).max(ticks);
    }

    pub fn is_blocked(&self, pos: CellPos) -> bool {
        self.cells.contains_key(&pos)
    }

    pub fn remaining(&self, pos: CellPos) -> Option<u32> {
        self.cells.get(&pos).copied()
    }

    /// Count every block down by one tick and drop the finished ones.
    /// Returns the cells that became free, sorted.
    pub fn tick_down(&mut self) -> Vec<CellPos> {
        let mut cleared = Vec::new();
        self.cells.retain(|pos, remaining| {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                cleared.push(*pos);
                false
            } else {
                true
            }
        });
        cleared.sort();
        cleared
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellPos, u32)> + '_ {
        self.cells.iter().map(|(pos, ticks)| (*pos, *ticks))
    }
}
