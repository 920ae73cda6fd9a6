//! Error types for the simulation engine

use thiserror::Error;

use super::types::{CellPos, LotId, VehicleId};

/// Invalid configuration, detected before a world is built
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown road size '{0}' (expected small, medium or large)")]
    UnknownRoadSize(String),

    #[error("malformed duration pair '{0}' (expected two positive integers like '5,4')")]
    MalformedDurationPair(String),

    #[error("{name} must be at least one tick")]
    ZeroDuration { name: &'static str },

    #[error("{name} must lie in [0, 1], got {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },

    #[error("grid of {rows}x{cols} is too small, both dimensions must be at least {min}")]
    GridTooSmall { rows: usize, cols: usize, min: usize },
}

/// Errors raised while building or advancing a simulation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cell {pos} already holds {occupants} vehicles on {lanes} lanes")]
    CapacityExceeded {
        pos: CellPos,
        lanes: usize,
        occupants: usize,
    },

    #[error("feature placed on non-road cell {pos}")]
    FeatureOffRoad { pos: CellPos },

    #[error("road cell {pos} declares no travel direction")]
    RoadWithoutDirection { pos: CellPos },

    #[error("{lot} holds {occupants} vehicles but has capacity {capacity}")]
    LotOverCapacity {
        lot: LotId,
        occupants: usize,
        capacity: usize,
    },

    #[error("occupancy registry lists {vehicle} at {pos} but {reason}")]
    OccupancyMismatch {
        vehicle: VehicleId,
        pos: CellPos,
        reason: &'static str,
    },

    #[error("{vehicle} is parked at {lot} but the lot does not hold it")]
    ParkedOutsideLot { vehicle: VehicleId, lot: LotId },

    #[error("no parking lot with id {0}")]
    UnknownLot(LotId),

    #[error("{vehicle} is on non-road cell {pos}")]
    VehicleOffRoad { vehicle: VehicleId, pos: CellPos },

    #[error("cell {pos} cannot take a vehicle right now")]
    CellUnavailable { pos: CellPos },
}

impl SimError {
    /// Whether this error must abort the run rather than just the entity
    /// that raised it
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SimError::Config(_)
                | SimError::CapacityExceeded { .. }
                | SimError::FeatureOffRoad { .. }
                | SimError::RoadWithoutDirection { .. }
                | SimError::LotOverCapacity { .. }
                | SimError::OccupancyMismatch { .. }
                | SimError::ParkedOutsideLot { .. }
        )
    }
}
