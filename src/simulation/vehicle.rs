//! Vehicle movement and parking logic
//!
//! Each tick a vehicle either handles its parking sub-state or drives:
//! possibly asks to park, checks whether the cell ahead admits it, picks a
//! next cell, commits the move in the occupancy registry and finally checks
//! whether it has reached an exit.

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;

use super::crossing::SimCrossing;
use super::error::SimError;
use super::occupancy::{OccupancyRegistry, ParkingDelayRegistry};
use super::parking::{ParkingResponse, SimParkingLot};
use super::road_network::RoadNetwork;
use super::traffic_light::SimTrafficLight;
use super::types::{CellPos, CrossingId, Direction, LightId, LotId, Tick, VehicleId};

/// Result of a vehicle update indicating what the world should do with it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleUpdateResult {
    Continue,
    /// Reached an exit and already left the occupancy registry
    Exited,
}

/// Parking sub-state of a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParkingState {
    #[default]
    Driving,
    /// Waiting on a lot's answer; never survives past the update that set it
    RequestingParking,
    Parked,
    /// Pulling out of a space, still blocking its cell
    ExitingDelay,
}

/// Why a vehicle could not enter a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveBlock {
    ParkingManeuver,
    RedLight(LightId),
    ActiveCrossing(CrossingId),
    LaneFull,
}

/// Driving behaviour shared by every vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrivingRules {
    pub turn_probability: f64,
    pub parking_enabled: bool,
    pub parking_probability: f64,
    pub maneuver_delay_ticks: u32,
}

/// Everything a vehicle reads or mutates during its update. Lights and
/// crossings have already been advanced for this tick.
pub struct VehicleContext<'a> {
    pub tick: Tick,
    pub network: &'a RoadNetwork,
    pub lights: &'a [SimTrafficLight],
    pub crossings: &'a [SimCrossing],
    pub lots: &'a mut [SimParkingLot],
    pub occupancy: &'a mut OccupancyRegistry,
    pub delays: &'a mut ParkingDelayRegistry,
    pub rng: &'a mut StdRng,
    pub rules: DrivingRules,
}

impl VehicleContext<'_> {
    /// Whether `vehicle` may enter `pos` this tick
    fn admits(&self, pos: CellPos, vehicle: VehicleId) -> Result<(), MoveBlock> {
        if self.delays.is_blocked(pos) {
            return Err(MoveBlock::ParkingManeuver);
        }
        if let Some(light) = self.network.light_at(pos) {
            // A light we have no state for counts as red
            let green = self.lights.get(light.0).is_some_and(|l| l.is_green());
            if !green {
                return Err(MoveBlock::RedLight(light));
            }
        }
        if let Some(crossing) = self.network.crossing_at(pos) {
            if self.crossings.get(crossing.0).is_some_and(|c| c.active) {
                return Err(MoveBlock::ActiveCrossing(crossing));
            }
        }
        if !self
            .occupancy
            .has_room_for(pos, self.network.lanes(pos), vehicle)
        {
            return Err(MoveBlock::LaneFull);
        }
        Ok(())
    }
}

/// A vehicle in the traffic simulation
#[derive(Debug, Clone, PartialEq)]
pub struct SimVehicle {
    pub id: VehicleId,
    pub position: CellPos,
    pub direction: Direction,
    /// Ticks spent blocked while driving
    pub wait_time: u32,
    pub parking_state: ParkingState,
    /// Ticks left in `Parked` or `ExitingDelay`
    pub parking_timer: Tick,
    pub parked_at: Option<LotId>,
    /// The lot most recently left; not requested again right away
    pub last_lot: Option<LotId>,
}

impl SimVehicle {
    pub fn new(id: VehicleId, position: CellPos, direction: Direction) -> Self {
        Self {
            id,
            position,
            direction,
            wait_time: 0,
            parking_state: ParkingState::Driving,
            parking_timer: 0,
            parked_at: None,
            last_lot: None,
        }
    }

    pub fn is_parked(&self) -> bool {
        self.parking_state == ParkingState::Parked
    }

    /// Update vehicle state for one tick
    pub fn update(&mut self, ctx: &mut VehicleContext<'_>) -> Result<VehicleUpdateResult, SimError> {
        if ctx.network.lanes(self.position) == 0 {
            return Err(SimError::VehicleOffRoad {
                vehicle: self.id,
                pos: self.position,
            });
        }

        match self.parking_state {
            ParkingState::Parked => {
                self.update_parked(ctx);
                return Ok(VehicleUpdateResult::Continue);
            }
            ParkingState::ExitingDelay => {
                self.parking_timer = self.parking_timer.saturating_sub(1);
                if self.parking_timer > 0 {
                    return Ok(VehicleUpdateResult::Continue);
                }
                debug!("{} finished pulling out at {}", self.id, self.position);
                self.parking_state = ParkingState::Driving;
            }
            ParkingState::RequestingParking => {
                self.parking_state = ParkingState::Driving;
            }
            ParkingState::Driving => {}
        }

        if ctx.rules.parking_enabled && self.try_park(ctx)? {
            return Ok(VehicleUpdateResult::Continue);
        }

        self.drive(ctx)?;

        if ctx.network.is_exit(self.position, self.direction) {
            ctx.occupancy.deregister(self.position, self.id);
            info!(
                "{} reached exit at {} heading {}",
                self.id, self.position, self.direction
            );
            return Ok(VehicleUpdateResult::Exited);
        }

        Ok(VehicleUpdateResult::Continue)
    }

    /// Gate, choose and commit one step
    fn drive(&mut self, ctx: &mut VehicleContext<'_>) -> Result<(), SimError> {
        if let Some(ahead) = ctx.network.step(self.position, self.direction) {
            if ctx.network.cell(ahead).is_road() {
                if let Err(block) = ctx.admits(ahead, self.id) {
                    self.wait_time += 1;
                    debug!(
                        "{} waiting at {} for {ahead}: {block:?}, wait_time={}",
                        self.id, self.position, self.wait_time
                    );
                    return Ok(());
                }
            }
        }

        let routes = self.routes(ctx.network);
        if routes.is_empty() {
            self.wait_time += 1;
            warn!(
                "{} at {} heading {} has no feasible direction, wait_time={}",
                self.id, self.position, self.direction, self.wait_time
            );
            return Ok(());
        }
        let open: Vec<(Direction, CellPos)> = routes
            .into_iter()
            .filter(|(_, next)| ctx.admits(*next, self.id).is_ok())
            .collect();
        let turn_probability = ctx.rules.turn_probability;
        let Some((direction, next)) = self.choose_next(&open, &mut *ctx.rng, turn_probability) else {
            self.wait_time += 1;
            debug!(
                "{} at {}: every route is blocked, wait_time={}",
                self.id, self.position, self.wait_time
            );
            return Ok(());
        };

        let lanes = ctx.network.lanes(next);
        ctx.occupancy.register(next, self.id, lanes)?;
        ctx.occupancy.deregister(self.position, self.id);
        debug!(
            "{} moved {} -> {next} heading {direction}",
            self.id, self.position
        );
        self.position = next;
        self.direction = direction;
        Ok(())
    }

    /// Directions the road layout lets the vehicle take from its current
    /// cell, in `Direction::ALL` order, ignoring traffic
    pub fn routes(&self, network: &RoadNetwork) -> Vec<(Direction, CellPos)> {
        let mut candidates = Vec::new();
        let mut with_flow = 0;

        for direction in Direction::ALL {
            if direction == self.direction.opposite() {
                continue;
            }
            let Some(next) = network.step(self.position, direction) else {
                continue;
            };
            let cell = network.cell(next);
            if !cell.is_road() {
                continue;
            }
            let against_flow = cell.allows(direction.opposite());
            let follows_road =
                cell.allows(direction) || (direction == self.direction && !against_flow);
            if follows_road {
                with_flow += 1;
            }
            candidates.push((direction, next, follows_road, against_flow));
        }

        // At an intersection a lateral move onto a crossing road is fine as
        // long as it does not run into oncoming traffic
        let at_intersection = with_flow >= 2;
        candidates
            .into_iter()
            .filter(|(_, _, follows_road, against_flow)| {
                *follows_road || (at_intersection && !*against_flow)
            })
            .map(|(direction, next, _, _)| (direction, next))
            .collect()
    }

    /// Pick among open moves: sometimes switch heading when there is a
    /// choice, otherwise keep going straight if possible
    fn choose_next<R: Rng + ?Sized>(
        &self,
        options: &[(Direction, CellPos)],
        rng: &mut R,
        turn_probability: f64,
    ) -> Option<(Direction, CellPos)> {
        if options.is_empty() {
            return None;
        }

        if options.len() > 1 && rng.random_bool(turn_probability) {
            let turns: Vec<(Direction, CellPos)> = options
                .iter()
                .copied()
                .filter(|(direction, _)| *direction != self.direction)
                .collect();
            if let Some(turn) = turns.choose(rng) {
                return Some(*turn);
            }
        }

        if let Some(straight) = options.iter().find(|(d, _)| *d == self.direction) {
            return Some(*straight);
        }
        options.choose(rng).copied()
    }

    /// Maybe ask the lot at the current cell for a space. Returns whether
    /// the vehicle parked.
    fn try_park(&mut self, ctx: &mut VehicleContext<'_>) -> Result<bool, SimError> {
        if self.parking_state != ParkingState::Driving {
            return Ok(false);
        }
        if !ctx.rng.random_bool(ctx.rules.parking_probability) {
            return Ok(false);
        }
        let Some(lot_id) = ctx.network.parking_lot_at(self.position) else {
            return Ok(false);
        };
        if self.last_lot == Some(lot_id) {
            return Ok(false);
        }

        self.parking_state = ParkingState::RequestingParking;
        ctx.delays
            .mark(self.position, ctx.rules.maneuver_delay_ticks);
        let lot = ctx
            .lots
            .get_mut(lot_id.0)
            .ok_or(SimError::UnknownLot(lot_id))?;

        match lot.request_parking(self.id, ctx.tick, &mut *ctx.rng) {
            ParkingResponse::Accepted { exit_tick, .. } => {
                self.parking_state = ParkingState::Parked;
                self.parking_timer = exit_tick.saturating_sub(ctx.tick);
                self.parked_at = Some(lot_id);
                self.last_lot = Some(lot_id);
                debug!(
                    "{} parked in {lot_id} at {} for {} ticks",
                    self.id, self.position, self.parking_timer
                );
                Ok(true)
            }
            ParkingResponse::Rejected { .. } => {
                self.parking_state = ParkingState::Driving;
                debug!("{} turned away by {lot_id}", self.id);
                Ok(false)
            }
        }
    }

    fn update_parked(&mut self, ctx: &mut VehicleContext<'_>) {
        self.parking_timer = self.parking_timer.saturating_sub(1);
        if self.parking_timer > 0 {
            return;
        }

        // The vehicle kept its lane while parked, so pulling out never waits
        self.parked_at = None;
        let delay = ctx.rules.maneuver_delay_ticks;
        if delay == 0 {
            self.parking_state = ParkingState::Driving;
        } else {
            self.parking_state = ParkingState::ExitingDelay;
            self.parking_timer = Tick::from(delay);
            ctx.delays.mark(self.position, delay);
        }
        debug!("{} leaving its space at {}", self.id, self.position);
    }
}
