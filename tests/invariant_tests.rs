//! Property tests for the world-wide invariants
//!
//! Random seeds, grid sizes and knob settings; every tick must leave the
//! occupancy registry, parking delays and lots consistent.

use std::collections::{BTreeMap, HashSet};
use std::ops::ControlFlow;

use proptest::prelude::*;

use grid_traffic_sim::simulation::{
    CellPos, ParkingConfig, ParkingState, SimConfig, SimWorld, TickSnapshot, VehicleId,
};

fn arb_config() -> impl Strategy<Value = SimConfig> {
    (
        any::<u64>(),
        0.0f64..=1.0,
        0.0f64..=1.0,
        any::<bool>(),
        any::<bool>(),
        0u32..3,
        1u32..4,
    )
        .prop_map(
            |(seed, crossing_probability, turn_probability, parking, clear_road, delay, interval)| {
                SimConfig {
                    crossing_probability,
                    turn_probability,
                    crossing_waits_for_clear_road: clear_road,
                    spawn_interval: interval,
                    parking: ParkingConfig {
                        enabled: parking,
                        maneuver_delay_ticks: delay,
                        request_probability: 0.5,
                        ..ParkingConfig::default()
                    },
                    ..SimConfig::seeded(seed)
                }
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn occupancy_never_exceeds_lanes(
        config in arb_config(),
        rows in 5usize..14,
        cols in 5usize..18,
    ) {
        let mut world = SimWorld::with_dimensions(config, rows, cols).unwrap();
        for _ in 0..60 {
            world.tick().unwrap();
            prop_assert!(world.check_invariants().is_ok(), "{:?}", world.check_invariants());
            for (pos, ids) in world.occupancy.iter() {
                prop_assert!(ids.len() <= world.network.lanes(pos));
            }
            for lot in &world.parking_lots {
                prop_assert!(lot.occupied() <= lot.capacity);
            }
        }
    }

    #[test]
    fn driving_vehicles_avoid_parking_maneuvers(config in arb_config()) {
        let mut world = SimWorld::new(config).unwrap();
        for _ in 0..60 {
            let blocked: HashSet<CellPos> = world.parking_delays.iter().map(|(pos, _)| pos).collect();
            let before: BTreeMap<VehicleId, CellPos> = world
                .vehicles
                .values()
                .map(|vehicle| (vehicle.id, vehicle.position))
                .collect();
            world.tick().unwrap();
            for vehicle in world.vehicles.values() {
                if let Some(previous) = before.get(&vehicle.id) {
                    if *previous != vehicle.position {
                        prop_assert!(
                            !blocked.contains(&vehicle.position),
                            "{} entered {} during a maneuver",
                            vehicle.id,
                            vehicle.position
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn seeded_runs_are_deterministic(config in arb_config()) {
        let mut snapshots = Vec::new();
        for _ in 0..2 {
            let mut world = SimWorld::new(config.clone()).unwrap();
            let mut seen: Vec<TickSnapshot> = Vec::new();
            world
                .run(40, &mut |snapshot: &TickSnapshot| {
                    seen.push(snapshot.clone());
                    ControlFlow::Continue(())
                })
                .unwrap();
            snapshots.push(seen);
        }
        prop_assert_eq!(&snapshots[0], &snapshots[1]);
    }

    #[test]
    fn exits_leave_no_trace(config in arb_config()) {
        let mut world = SimWorld::new(config).unwrap();
        for _ in 0..80 {
            let report = world.tick().unwrap();
            for id in &report.exited {
                prop_assert!(!world.vehicles.contains_key(id));
                let registered = world.occupancy.iter().any(|(_, ids)| ids.contains(id));
                prop_assert!(!registered, "{} still registered after exiting", id);
            }
        }
        let metrics = &world.metrics;
        prop_assert_eq!(
            metrics.spawned,
            metrics.exited + metrics.dropped + world.vehicles.len()
        );
        prop_assert_eq!(metrics.active(), world.vehicles.len());
        prop_assert_eq!(metrics.max_wait.len(), metrics.spawned);
    }
}

/// Test that an observer can stop a run between ticks
#[test]
fn test_observer_stops_run() {
    let mut world = SimWorld::new(SimConfig::seeded(17)).expect("world should build");
    let mut calls = 0;
    let mut stop_after_five = |snapshot: &TickSnapshot| {
        calls += 1;
        if snapshot.tick >= 5 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    };
    world.run(50, &mut stop_after_five).expect("run should succeed");
    assert_eq!(calls, 5);
    assert_eq!(world.current_tick(), 5);
}

/// Test that snapshots list every vehicle and parked vehicles keep their lane
#[test]
fn test_snapshot_reflects_world() {
    let config = SimConfig {
        parking: ParkingConfig {
            enabled: true,
            request_probability: 0.8,
            ..ParkingConfig::default()
        },
        ..SimConfig::seeded(23)
    };
    let mut world = SimWorld::new(config).expect("world should build");
    for _ in 0..30 {
        world.tick().expect("tick should succeed");
        let snapshot = world.snapshot();
        assert_eq!(snapshot.vehicles.len(), world.vehicles.len());
        assert_eq!(snapshot.light_states.len(), world.lights.len());
        assert_eq!(snapshot.crossing_states.len(), world.crossings.len());
        let parked = snapshot
            .vehicles
            .iter()
            .filter(|view| view.parking_state == ParkingState::Parked)
            .count();
        let lot_spaces: usize = world.parking_lots.iter().map(|lot| lot.occupied()).sum();
        assert!(parked <= lot_spaces);
        assert_eq!(world.occupancy.total(), world.vehicles.len());
        let map = snapshot.render(&world.network);
        assert_eq!(map.lines().count(), world.network.rows());
    }
}
