//! Parking lots
//!
//! A lot accepts vehicles while it has free spaces and releases them once
//! their stay has run out. Rejection is an ordinary answer, not an error.

use std::collections::BTreeMap;
use std::f64::consts::TAU;

use log::{debug, info};
use rand::Rng;

use super::road_network::ParkingKind;
use super::types::{CellPos, LotId, Tick, VehicleId};

/// Who holds a parking space
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Occupant {
    /// A simulated vehicle
    Vehicle(VehicleId),
    /// A placeholder car present before the first tick
    Resident(usize),
}

/// Answer to a parking request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParkingResponse {
    Accepted { lot: LotId, exit_tick: Tick },
    Rejected { lot: LotId },
}

/// A street segment or building with a bounded number of spaces
#[derive(Debug, Clone, PartialEq)]
pub struct SimParkingLot {
    pub id: LotId,
    pub kind: ParkingKind,
    /// Road cell from which the lot is entered
    pub position: CellPos,
    pub capacity: usize,
    pub average_stay: u32,
    occupants: BTreeMap<Occupant, Tick>,
}

impl SimParkingLot {
    pub fn new(
        id: LotId,
        kind: ParkingKind,
        position: CellPos,
        capacity: usize,
        average_stay: u32,
    ) -> Self {
        Self {
            id,
            kind,
            position,
            capacity,
            average_stay,
            occupants: BTreeMap::new(),
        }
    }

    /// Fill a fraction of the lot with residents leaving at random ticks in
    /// `1..=2 * average_stay`
    pub fn seed_residents<R: Rng + ?Sized>(&mut self, fraction: f64, rng: &mut R) {
        let count = ((self.capacity as f64 * fraction) as usize).min(self.capacity);
        let latest = (u64::from(self.average_stay) * 2).max(1);
        for index in 0..count {
            let exit_tick = rng.random_range(1..=latest);
            self.occupants.insert(Occupant::Resident(index), exit_tick);
        }
    }

    /// Put an occupant in the lot directly. Returns `false` when full.
    pub fn admit(&mut self, occupant: Occupant, exit_tick: Tick) -> bool {
        if self.is_full() && !self.occupants.contains_key(&occupant) {
            return false;
        }
        self.occupants.insert(occupant, exit_tick);
        true
    }

    /// Ask for a space at tick `now`
    pub fn request_parking<R: Rng + ?Sized>(
        &mut self,
        vehicle: VehicleId,
        now: Tick,
        rng: &mut R,
    ) -> ParkingResponse {
        if self.is_full() {
            debug!("{}: rejected {vehicle}, no capacity available", self.id);
            return ParkingResponse::Rejected { lot: self.id };
        }

        let exit_tick = now + sample_stay(self.average_stay, rng);
        self.occupants.insert(Occupant::Vehicle(vehicle), exit_tick);
        info!("{}: accepted {vehicle}, leaves at tick {exit_tick}", self.id);
        ParkingResponse::Accepted {
            lot: self.id,
            exit_tick,
        }
    }

    /// Release every occupant whose stay is over at `now`
    pub fn advance(&mut self, now: Tick) -> Vec<Occupant> {
        let leaving: Vec<Occupant> = self
            .occupants
            .iter()
            .filter(|(_, exit_tick)| now >= **exit_tick)
            .map(|(occupant, _)| *occupant)
            .collect();
        for occupant in &leaving {
            self.occupants.remove(occupant);
            debug!("{}: {occupant:?} left", self.id);
        }
        leaving
    }

    pub fn occupied(&self) -> usize {
        self.occupants.len()
    }

    pub fn available(&self) -> usize {
        self.capacity.saturating_sub(self.occupants.len())
    }

    pub fn is_full(&self) -> bool {
        self.occupants.len() >= self.capacity
    }

    pub fn exit_tick(&self, vehicle: VehicleId) -> Option<Tick> {
        self.occupants.get(&Occupant::Vehicle(vehicle)).copied()
    }

    pub fn occupants(&self) -> impl Iterator<Item = (Occupant, Tick)> + '_ {
        self.occupants.iter().map(|(occupant, tick)| (*occupant, *tick))
    }
}

/// Draw a stay length from a normal distribution around `average` with a
/// standard deviation of a third of it, truncated, at least one tick
pub fn sample_stay<R: Rng + ?Sized>(average: u32, rng: &mut R) -> Tick {
    let mean = f64::from(average);
    let std_dev = mean / 3.0;
    // Box-Muller; 1 - u keeps the logarithm finite
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos();
    let stay = (mean + std_dev * z).trunc();
    if stay < 1.0 {
        1
    } else {
        stay as Tick
    }
}
