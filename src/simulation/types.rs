//! Core types for the grid traffic simulation
//!
//! Identifiers, grid coordinates and headings shared by every component.

use std::fmt;

/// Simulation time, counted in whole ticks
pub type Tick = u64;

/// A unique identifier for a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VehicleId(pub usize);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vehicle_{}", self.0)
    }
}

/// A wrapper type for traffic light IDs (index into the world's light list)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LightId(pub usize);

impl LightId {
    /// 1-based number used for naming and initial phase offsets
    pub fn number(self) -> usize {
        self.0 + 1
    }
}

impl fmt::Display for LightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "traffic_light_{}", self.number())
    }
}

/// A wrapper type for pedestrian crossing IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CrossingId(pub usize);

impl fmt::Display for CrossingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "crossing_{}", self.0 + 1)
    }
}

/// A wrapper type for parking lot IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LotId(pub usize);

impl fmt::Display for LotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parking_{}", self.0 + 1)
    }
}

/// A (row, col) coordinate on the road grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// The neighbouring cell one step along `direction`, if it stays inside
    /// a `rows x cols` grid
    pub fn step(self, direction: Direction, rows: usize, cols: usize) -> Option<CellPos> {
        let (dr, dc) = direction.offset();
        let row = self.row.checked_add_signed(dr)?;
        let col = self.col.checked_add_signed(dc)?;
        (row < rows && col < cols).then_some(CellPos { row, col })
    }
}

impl fmt::Display for CellPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Travel heading on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// All headings, in the fixed order used when enumerating neighbours
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Unit (row, col) offset; rows grow southwards
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::North => (-1, 0),
            Direction::South => (1, 0),
            Direction::East => (0, 1),
            Direction::West => (0, -1),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    pub fn arrow(self) -> char {
        match self {
            Direction::North => '↑',
            Direction::South => '↓',
            Direction::East => '→',
            Direction::West => '←',
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "northbound",
            Direction::South => "southbound",
            Direction::East => "eastbound",
            Direction::West => "westbound",
        };
        f.write_str(name)
    }
}

/// Probability that a pedestrian crossing activates on a tick while idle
pub const CROSSING_ACTIVATION_PROBABILITY: f64 = 0.3;

/// Probability that a vehicle with several options switches heading
pub const TURN_PROBABILITY: f64 = 0.5;

/// Capacity of the multi-storey lot next to the middle road
pub const BUILDING_LOT_CAPACITY: usize = 10;

/// Smallest grid dimension that keeps every road on its own row/column
pub const MIN_GRID_DIMENSION: usize = 5;
