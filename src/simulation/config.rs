//! Simulation configuration
//!
//! Everything the orchestrator needs to build and run a world. Parsing from
//! strings is provided so a command line front end can hand values straight
//! through.

use std::str::FromStr;

use super::error::ConfigError;
use super::types::{Tick, CROSSING_ACTIVATION_PROBABILITY, TURN_PROBABILITY};

/// Road network size class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoadSize {
    #[default]
    Small,
    Medium,
    Large,
}

impl RoadSize {
    /// Grid dimensions as (rows, cols)
    pub fn dimensions(self) -> (usize, usize) {
        match self {
            RoadSize::Small => (10, 15),
            RoadSize::Medium => (15, 20),
            RoadSize::Large => (20, 30),
        }
    }
}

impl FromStr for RoadSize {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(RoadSize::Small),
            "medium" => Ok(RoadSize::Medium),
            "large" => Ok(RoadSize::Large),
            _ => Err(ConfigError::UnknownRoadSize(s.to_string())),
        }
    }
}

fn parse_pair(s: &str) -> Result<(u32, u32), ConfigError> {
    let malformed = || ConfigError::MalformedDurationPair(s.to_string());
    let (first, second) = s.split_once(',').ok_or_else(malformed)?;
    let first = first.trim().parse::<u32>().map_err(|_| malformed())?;
    let second = second.trim().parse::<u32>().map_err(|_| malformed())?;
    if first == 0 || second == 0 {
        return Err(malformed());
    }
    Ok((first, second))
}

/// Traffic light phase lengths, in ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightTiming {
    pub red: u32,
    pub green: u32,
}

impl Default for LightTiming {
    fn default() -> Self {
        Self { red: 5, green: 4 }
    }
}

impl FromStr for LightTiming {
    type Err = ConfigError;

    /// Parses `"red,green"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (red, green) = parse_pair(s)?;
        Ok(Self { red, green })
    }
}

/// How long a crossing stays active, by the number of lanes it spans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossingTiming {
    pub single_lane: u32,
    pub double_lane: u32,
}

impl CrossingTiming {
    pub fn for_lanes(&self, lanes: usize) -> u32 {
        if lanes > 1 {
            self.double_lane
        } else {
            self.single_lane
        }
    }
}

impl Default for CrossingTiming {
    fn default() -> Self {
        Self {
            single_lane: 1,
            double_lane: 3,
        }
    }
}

impl FromStr for CrossingTiming {
    type Err = ConfigError;

    /// Parses `"single,double"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (single_lane, double_lane) = parse_pair(s)?;
        Ok(Self {
            single_lane,
            double_lane,
        })
    }
}

/// Parking behaviour
#[derive(Debug, Clone, PartialEq)]
pub struct ParkingConfig {
    pub enabled: bool,
    /// Mean stay in ticks
    pub average_stay: u32,
    /// Ticks a parking or unparking maneuver blocks its cell
    pub maneuver_delay_ticks: u32,
    /// Fraction of every lot filled before the first tick
    pub initial_occupancy: f64,
    /// Chance per tick that a driving vehicle on a lot cell asks to park
    pub request_probability: f64,
}

impl Default for ParkingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            average_stay: 5,
            maneuver_delay_ticks: 1,
            initial_occupancy: 0.3,
            request_probability: 0.2,
        }
    }
}

/// Full simulation configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub road_size: RoadSize,
    pub ticks: Tick,
    pub light_timing: LightTiming,
    pub crossing_timing: CrossingTiming,
    pub crossing_probability: f64,
    /// Crossings only activate while no vehicle stands on them
    pub crossing_waits_for_clear_road: bool,
    pub turn_probability: f64,
    /// Spawn one vehicle every this many ticks; 0 disables spawning
    pub spawn_interval: u32,
    /// Seed for the shared random source; `None` draws one from the OS
    pub seed: Option<u64>,
    pub parking: ParkingConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            road_size: RoadSize::Small,
            ticks: 50,
            light_timing: LightTiming::default(),
            crossing_timing: CrossingTiming::default(),
            crossing_probability: CROSSING_ACTIVATION_PROBABILITY,
            crossing_waits_for_clear_road: false,
            turn_probability: TURN_PROBABILITY,
            spawn_interval: 1,
            seed: None,
            parking: ParkingConfig::default(),
        }
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ProbabilityOutOfRange { name, value })
    }
}

fn check_duration(name: &'static str, value: u32) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::ZeroDuration { name })
    } else {
        Ok(())
    }
}

impl SimConfig {
    /// Create a default configuration with a fixed seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Reject configurations the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_duration("red duration", self.light_timing.red)?;
        check_duration("green duration", self.light_timing.green)?;
        check_duration("single-lane crossing duration", self.crossing_timing.single_lane)?;
        check_duration("double-lane crossing duration", self.crossing_timing.double_lane)?;
        check_probability("crossing probability", self.crossing_probability)?;
        check_probability("turn probability", self.turn_probability)?;
        check_probability("parking initial occupancy", self.parking.initial_occupancy)?;
        check_probability("parking request probability", self.parking.request_probability)?;
        if self.parking.enabled {
            check_duration("average parking stay", self.parking.average_stay)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_size_classes() {
        assert_eq!("Medium".parse::<RoadSize>(), Ok(RoadSize::Medium));
        assert_eq!(RoadSize::Large.dimensions(), (20, 30));
        assert!(matches!(
            "huge".parse::<RoadSize>(),
            Err(ConfigError::UnknownRoadSize(_))
        ));
    }

    #[test]
    fn parses_duration_pairs() {
        assert_eq!(
            "9, 4".parse::<LightTiming>(),
            Ok(LightTiming { red: 9, green: 4 })
        );
        assert_eq!(
            "1,3".parse::<CrossingTiming>().map(|t| t.for_lanes(2)),
            Ok(3)
        );
        for bad in ["5", "5,", "a,b", "0,4", "5,4,3"] {
            assert!(bad.parse::<LightTiming>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn validate_rejects_bad_probabilities() {
        let mut config = SimConfig::default();
        assert!(config.validate().is_ok());
        config.turn_probability = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ProbabilityOutOfRange { .. })
        ));
    }
}
