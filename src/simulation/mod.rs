//! Grid traffic simulation engine
//!
//! Everything needed to build a road network and step vehicles, lights,
//! crossings and parking lots through discrete ticks. Nothing here prints
//! to the terminal except the explicit `print_summary`/`draw_map` helpers.

mod config;
mod crossing;
mod error;
mod metrics;
mod occupancy;
mod parking;
mod road_network;
mod snapshot;
mod traffic_light;
mod types;
mod vehicle;
mod world;

pub use config::{CrossingTiming, LightTiming, ParkingConfig, RoadSize, SimConfig};
pub use crossing::SimCrossing;
pub use error::{ConfigError, SimError};
pub use metrics::{SimMetrics, WaitSummary};
pub use occupancy::{OccupancyRegistry, ParkingDelayRegistry};
pub use parking::{sample_stay, Occupant, ParkingResponse, SimParkingLot};
pub use road_network::{Cell, CellKind, Feature, ParkingKind, RoadLayout, RoadNetwork};
pub use snapshot::{TickObserver, TickSnapshot, VehicleView};
pub use traffic_light::{LightState, SimTrafficLight};
pub use types::{
    CellPos, CrossingId, Direction, LightId, LotId, Tick, VehicleId, BUILDING_LOT_CAPACITY,
    CROSSING_ACTIVATION_PROBABILITY, MIN_GRID_DIMENSION, TURN_PROBABILITY,
};
pub use vehicle::{
    DrivingRules, MoveBlock, ParkingState, SimVehicle, VehicleContext, VehicleUpdateResult,
};
pub use world::{SimWorld, TickReport};
