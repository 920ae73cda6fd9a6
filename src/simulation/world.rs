//! Main simulation world that ties everything together
//!
//! `SimWorld` owns the network, every signal, lot and vehicle, the shared
//! registries and the single random source. `tick` advances all of them in
//! a fixed order so vehicles always see a fully updated set of lights and
//! crossings.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

use super::config::SimConfig;
use super::crossing::SimCrossing;
use super::error::SimError;
use super::metrics::SimMetrics;
use super::occupancy::{OccupancyRegistry, ParkingDelayRegistry};
use super::parking::SimParkingLot;
use super::road_network::{ParkingKind, RoadNetwork};
use super::snapshot::{TickObserver, TickSnapshot, VehicleView};
use super::traffic_light::SimTrafficLight;
use super::types::{CellPos, CrossingId, Direction, LightId, LotId, Tick, VehicleId};
use super::vehicle::{DrivingRules, SimVehicle, VehicleContext, VehicleUpdateResult};

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: Tick,
    pub spawned: Option<VehicleId>,
    pub exited: Vec<VehicleId>,
    /// Vehicles removed after a non-fatal error in their own update
    pub dropped: Vec<VehicleId>,
}

/// The main simulation world
pub struct SimWorld {
    pub network: RoadNetwork,

    /// Lights, indexed by `LightId`
    pub lights: Vec<SimTrafficLight>,

    /// Crossings, indexed by `CrossingId`
    pub crossings: Vec<SimCrossing>,

    /// Parking lots, indexed by `LotId`
    pub parking_lots: Vec<SimParkingLot>,

    /// Live vehicles; iteration order is the update order
    pub vehicles: BTreeMap<VehicleId, SimVehicle>,

    pub occupancy: OccupancyRegistry,

    pub parking_delays: ParkingDelayRegistry,

    pub metrics: SimMetrics,

    config: SimConfig,

    /// Next ID to assign
    next_vehicle_id: usize,

    /// Ticks completed so far
    tick: Tick,

    rng: StdRng,
}

impl SimWorld {
    /// Build a world for the configured road size
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        let (rows, cols) = config.road_size.dimensions();
        Self::with_dimensions(config, rows, cols)
    }

    /// Build a world on a grid of explicit dimensions
    pub fn with_dimensions(config: SimConfig, rows: usize, cols: usize) -> Result<Self, SimError> {
        config.validate()?;
        let network = RoadNetwork::build(rows, cols, config.parking.enabled)?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let lights: Vec<SimTrafficLight> = network
            .traffic_light_positions()
            .iter()
            .enumerate()
            .map(|(index, pos)| SimTrafficLight::new(LightId(index), *pos, config.light_timing))
            .collect();

        let crossings: Vec<SimCrossing> = network
            .crossing_positions()
            .iter()
            .enumerate()
            .map(|(index, pos)| {
                SimCrossing::new(
                    CrossingId(index),
                    *pos,
                    network.lanes(*pos),
                    config.crossing_timing,
                )
            })
            .collect();

        let mut parking_lots = Vec::with_capacity(network.parking_positions().len());
        for (index, pos) in network.parking_positions().iter().enumerate() {
            let (capacity, kind) = network
                .cell(*pos)
                .parking()
                .unwrap_or((0, ParkingKind::Street));
            let mut lot = SimParkingLot::new(
                LotId(index),
                kind,
                *pos,
                capacity,
                config.parking.average_stay,
            );
            lot.seed_residents(config.parking.initial_occupancy, &mut rng);
            parking_lots.push(lot);
        }

        info!(
            "Built {}x{} road network: {} traffic lights, {} crossings, {} parking lots",
            rows,
            cols,
            lights.len(),
            crossings.len(),
            parking_lots.len()
        );

        Ok(Self {
            network,
            lights,
            crossings,
            parking_lots,
            vehicles: BTreeMap::new(),
            occupancy: OccupancyRegistry::new(),
            parking_delays: ParkingDelayRegistry::new(),
            metrics: SimMetrics::default(),
            config,
            next_vehicle_id: 1,
            tick: 0,
            rng,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Number of ticks completed so far
    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    fn driving_rules(&self) -> DrivingRules {
        DrivingRules {
            turn_probability: self.config.turn_probability,
            parking_enabled: self.config.parking.enabled,
            parking_probability: self.config.parking.request_probability,
            maneuver_delay_ticks: self.config.parking.maneuver_delay_ticks,
        }
    }

    fn next_vehicle_id(&mut self) -> VehicleId {
        let id = VehicleId(self.next_vehicle_id);
        self.next_vehicle_id += 1;
        id
    }

    /// Whether a new vehicle could be placed in `pos` right now
    fn can_enter(&self, pos: CellPos) -> bool {
        !self.parking_delays.is_blocked(pos)
            && self.occupancy.count(pos) < self.network.lanes(pos)
    }

    fn should_spawn(&self, now: Tick) -> bool {
        let interval = Tick::from(self.config.spawn_interval);
        now > 0 && interval > 0 && now % interval == 0
    }

    /// Spawn a vehicle at a random entry point that has room. Returns `None`
    /// when every entry point is full.
    pub fn spawn_vehicle(&mut self) -> Result<Option<VehicleId>, SimError> {
        let candidates: Vec<CellPos> = self
            .network
            .entry_points()
            .iter()
            .map(|(pos, _)| *pos)
            .filter(|pos| self.can_enter(*pos))
            .collect();

        let Some(&pos) = candidates.choose(&mut self.rng) else {
            warn!("Every entry point is full, skipping spawn at tick {}", self.tick);
            return Ok(None);
        };
        let direction = self.pick_direction(pos);
        self.spawn_at(pos, direction).map(Some)
    }

    /// Spawn a vehicle on any road cell. Without an explicit heading one of
    /// the cell's allowed directions is picked.
    pub fn spawn_vehicle_at(
        &mut self,
        pos: CellPos,
        direction: Option<Direction>,
    ) -> Result<VehicleId, SimError> {
        if self.network.lanes(pos) == 0 || !self.can_enter(pos) {
            return Err(SimError::CellUnavailable { pos });
        }
        let direction = match direction {
            Some(direction) => direction,
            None => self.pick_direction(pos),
        };
        self.spawn_at(pos, direction)
    }

    /// Uniform choice among the cell's allowed directions, east if none
    fn pick_direction(&mut self, pos: CellPos) -> Direction {
        self.network
            .cell(pos)
            .allowed
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(Direction::East)
    }

    fn spawn_at(&mut self, pos: CellPos, direction: Direction) -> Result<VehicleId, SimError> {
        let id = self.next_vehicle_id();
        self.occupancy.register(pos, id, self.network.lanes(pos))?;
        self.vehicles.insert(id, SimVehicle::new(id, pos, direction));
        self.metrics.record_spawn(id);
        info!("Spawned {id} at {pos} heading {direction}");
        Ok(id)
    }

    /// Update all vehicles in id order. Returns (exited, dropped) ids.
    fn update_vehicles(&mut self, now: Tick) -> Result<(Vec<VehicleId>, Vec<VehicleId>), SimError> {
        let rules = self.driving_rules();
        let mut ctx = VehicleContext {
            tick: now,
            network: &self.network,
            lights: &self.lights,
            crossings: &self.crossings,
            lots: &mut self.parking_lots,
            occupancy: &mut self.occupancy,
            delays: &mut self.parking_delays,
            rng: &mut self.rng,
            rules,
        };

        let mut exited = Vec::new();
        let mut dropped = Vec::new();
        for (id, vehicle) in self.vehicles.iter_mut() {
            match vehicle.update(&mut ctx) {
                Ok(VehicleUpdateResult::Continue) => {}
                Ok(VehicleUpdateResult::Exited) => exited.push(*id),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!("Removing {id} after failed update: {err}");
                    ctx.occupancy.remove_vehicle(*id);
                    dropped.push(*id);
                }
            }
        }
        Ok((exited, dropped))
    }

    /// Main simulation tick
    pub fn tick(&mut self) -> Result<TickReport, SimError> {
        let now = self.tick;

        for light in &mut self.lights {
            light.advance();
        }

        let probability = self.config.crossing_probability;
        let wait_for_clear = self.config.crossing_waits_for_clear_road;
        for crossing in &mut self.crossings {
            let road_clear = !wait_for_clear || self.occupancy.count(crossing.position) == 0;
            crossing.advance(&mut self.rng, probability, road_clear);
        }

        for lot in &mut self.parking_lots {
            lot.advance(now);
        }

        let spawned = if self.should_spawn(now) {
            self.spawn_vehicle()?
        } else {
            None
        };

        let (exited, dropped) = self.update_vehicles(now)?;

        let cleared = self.parking_delays.tick_down();
        if !cleared.is_empty() {
            debug!("Parking maneuvers finished at {cleared:?}");
        }

        for id in exited.iter().chain(&dropped) {
            if let Some(vehicle) = self.vehicles.remove(id) {
                self.metrics.observe_wait(*id, vehicle.wait_time);
            }
        }
        for _ in &exited {
            self.metrics.record_exit();
        }
        for _ in &dropped {
            self.metrics.record_drop();
        }

        for vehicle in self.vehicles.values() {
            self.metrics.observe_wait(vehicle.id, vehicle.wait_time);
        }

        self.tick += 1;
        Ok(TickReport {
            tick: now,
            spawned,
            exited,
            dropped,
        })
    }

    /// Run for `ticks` ticks, offering a snapshot to `observer` after each
    /// one. The observer can stop the run early.
    pub fn run(
        &mut self,
        ticks: Tick,
        observer: &mut impl TickObserver,
    ) -> Result<&SimMetrics, SimError> {
        for _ in 0..ticks {
            self.tick()?;
            let snapshot = self.snapshot();
            if observer.observe(&snapshot).is_break() {
                info!("Stop requested after tick {}", snapshot.tick);
                break;
            }
        }
        Ok(&self.metrics)
    }

    /// Current state for renderers
    pub fn snapshot(&self) -> TickSnapshot {
        TickSnapshot {
            tick: self.tick,
            vehicles: self
                .vehicles
                .values()
                .map(|vehicle| VehicleView {
                    id: vehicle.id,
                    position: vehicle.position,
                    direction: vehicle.direction,
                    parking_state: vehicle.parking_state,
                    in_parking_delay: self.parking_delays.is_blocked(vehicle.position),
                })
                .collect(),
            light_states: self
                .lights
                .iter()
                .map(|light| (light.id, light.state))
                .collect(),
            crossing_states: self
                .crossings
                .iter()
                .map(|crossing| (crossing.id, crossing.active))
                .collect(),
            lot_occupancy: self
                .parking_lots
                .iter()
                .map(|lot| (lot.id, lot.occupied()))
                .collect(),
        }
    }

    /// Verify occupancy and capacity invariants
    pub fn check_invariants(&self) -> Result<(), SimError> {
        for (pos, ids) in self.occupancy.iter() {
            let lanes = self.network.lanes(pos);
            if ids.len() > lanes {
                return Err(SimError::CapacityExceeded {
                    pos,
                    lanes,
                    occupants: ids.len(),
                });
            }
            for id in ids {
                let reason = match self.vehicles.get(id) {
                    None => "no such vehicle is alive",
                    Some(vehicle) if vehicle.position != pos => "the vehicle is elsewhere",
                    Some(_) => continue,
                };
                return Err(SimError::OccupancyMismatch {
                    vehicle: *id,
                    pos,
                    reason,
                });
            }
        }

        for vehicle in self.vehicles.values() {
            if !self.occupancy.is_registered(vehicle.position, vehicle.id) {
                return Err(SimError::OccupancyMismatch {
                    vehicle: vehicle.id,
                    pos: vehicle.position,
                    reason: "the vehicle is not registered there",
                });
            }
            if let (true, Some(lot)) = (vehicle.is_parked(), vehicle.parked_at) {
                let held = self
                    .parking_lots
                    .get(lot.0)
                    .is_some_and(|l| l.exit_tick(vehicle.id).is_some());
                if !held {
                    return Err(SimError::ParkedOutsideLot {
                        vehicle: vehicle.id,
                        lot,
                    });
                }
            }
        }

        for lot in &self.parking_lots {
            if lot.occupied() > lot.capacity {
                return Err(SimError::LotOverCapacity {
                    lot: lot.id,
                    occupants: lot.occupied(),
                    capacity: lot.capacity,
                });
            }
        }
        Ok(())
    }

    /// Print a summary of the world state
    pub fn print_summary(&self) {
        println!("=== Traffic Simulation Summary ===");
        println!("Tick: {}", self.tick);
        println!(
            "Grid: {}x{}, Lights: {}, Crossings: {}, Parking lots: {}",
            self.network.rows(),
            self.network.cols(),
            self.lights.len(),
            self.crossings.len(),
            self.parking_lots.len()
        );
        println!(
            "Vehicles: {} ({} parked)",
            self.vehicles.len(),
            self.vehicles.values().filter(|v| v.is_parked()).count()
        );
        println!(
            "Spawned: {}, Exited: {}",
            self.metrics.spawned, self.metrics.exited
        );

        let green = self.lights.iter().filter(|l| l.is_green()).count();
        let active = self.crossings.iter().filter(|c| c.active).count();
        println!(
            "Green lights: {}/{}, Active crossings: {}/{}",
            green,
            self.lights.len(),
            active,
            self.crossings.len()
        );
        if !self.parking_lots.is_empty() {
            let occupied: usize = self.parking_lots.iter().map(|l| l.occupied()).sum();
            let capacity: usize = self.parking_lots.iter().map(|l| l.capacity).sum();
            println!("Parking: {occupied}/{capacity} spaces taken");
        }
    }

    /// Text map of the grid with signals and vehicles overlaid
    pub fn map_string(&self) -> String {
        self.snapshot().render(&self.network)
    }

    /// Draw a visual map of the world in the terminal
    pub fn draw_map(&self) {
        println!("\n=== Road Map (tick {}) ===", self.tick);
        println!("Legend: v/V=vehicle(s), P=parked, p=pulling out, R/G=light, ==active crossing, B=building");
        print!("{}", self.map_string());
    }
}
