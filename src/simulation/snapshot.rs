//! Read-only views handed to renderers and other observers

use std::collections::{BTreeMap, HashMap};
use std::ops::ControlFlow;

use super::road_network::{CellKind, RoadNetwork};
use super::traffic_light::LightState;
use super::types::{CellPos, CrossingId, Direction, LightId, LotId, Tick, VehicleId};
use super::vehicle::ParkingState;

/// One vehicle as seen from outside the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VehicleView {
    pub id: VehicleId,
    pub position: CellPos,
    pub direction: Direction,
    pub parking_state: ParkingState,
    /// The vehicle's cell is blocked by a parking maneuver
    pub in_parking_delay: bool,
}

/// World state at the end of a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSnapshot {
    pub tick: Tick,
    pub vehicles: Vec<VehicleView>,
    pub light_states: BTreeMap<LightId, LightState>,
    pub crossing_states: BTreeMap<CrossingId, bool>,
    pub lot_occupancy: BTreeMap<LotId, usize>,
}

impl TickSnapshot {
    /// One character per cell: road arrows, `R`/`G` lights, `=` active
    /// crossings, `B` buildings, `v`/`V` one or more moving vehicles, `P`
    /// parked and `p` pulling out
    pub fn render(&self, network: &RoadNetwork) -> String {
        let mut grid: Vec<Vec<char>> = (0..network.rows())
            .map(|row| {
                (0..network.cols())
                    .map(|col| {
                        let cell = network.cell(CellPos::new(row, col));
                        match cell.kind {
                            CellKind::Empty => ' ',
                            CellKind::Building => 'B',
                            CellKind::Road => cell.allowed.first().map_or('?', |d| d.arrow()),
                        }
                    })
                    .collect()
            })
            .collect();
        let mut put = |pos: CellPos, symbol: char| {
            if let Some(slot) = grid.get_mut(pos.row).and_then(|line| line.get_mut(pos.col)) {
                *slot = symbol;
            }
        };

        for (id, active) in &self.crossing_states {
            if let (true, Some(pos)) = (*active, network.crossing_positions().get(id.0)) {
                put(*pos, '=');
            }
        }
        for (id, state) in &self.light_states {
            if let Some(pos) = network.traffic_light_positions().get(id.0) {
                let symbol = match state {
                    LightState::Red => 'R',
                    LightState::Green => 'G',
                };
                put(*pos, symbol);
            }
        }

        let mut per_cell: HashMap<CellPos, usize> = HashMap::new();
        for vehicle in &self.vehicles {
            *per_cell.entry(vehicle.position).or_insert(0) += 1;
        }
        for vehicle in &self.vehicles {
            let symbol = match vehicle.parking_state {
                ParkingState::Parked => 'P',
                ParkingState::ExitingDelay => 'p',
                _ if per_cell.get(&vehicle.position).copied().unwrap_or(0) > 1 => 'V',
                _ => 'v',
            };
            put(vehicle.position, symbol);
        }

        let mut map = String::new();
        for line in &grid {
            map.extend(line.iter());
            map.push('\n');
        }
        map
    }
}

/// Consumer of per-tick snapshots. Returning `ControlFlow::Break` stops the
/// run before the next tick.
pub trait TickObserver {
    fn observe(&mut self, snapshot: &TickSnapshot) -> ControlFlow<()>;
}

impl<F> TickObserver for F
where
    F: FnMut(&TickSnapshot) -> ControlFlow<()>,
{
    fn observe(&mut self, snapshot: &TickSnapshot) -> ControlFlow<()> {
        self(snapshot)
    }
}
