//! Parking lot tests

use rand::rngs::StdRng;
use rand::SeedableRng;

use grid_traffic_sim::simulation::{
    sample_stay, CellPos, LotId, Occupant, ParkingConfig, ParkingKind, ParkingResponse,
    SimConfig, SimParkingLot, SimWorld, VehicleId,
};

fn street_lot(capacity: usize) -> SimParkingLot {
    SimParkingLot::new(LotId(0), ParkingKind::Street, CellPos::new(8, 2), capacity, 5)
}

/// Test that a lot accepts until full and then rejects
#[test]
fn test_lot_capacity() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut lot = street_lot(2);

    for id in 1..=2 {
        let response = lot.request_parking(VehicleId(id), 10, &mut rng);
        assert!(matches!(response, ParkingResponse::Accepted { .. }));
    }
    assert!(lot.is_full());
    assert_eq!(lot.available(), 0);

    let response = lot.request_parking(VehicleId(3), 10, &mut rng);
    assert_eq!(response, ParkingResponse::Rejected { lot: LotId(0) });
    assert_eq!(lot.occupied(), 2);
    assert_eq!(lot.exit_tick(VehicleId(3)), None);
}

/// Test that a full single-space lot turns away a second request in the
/// same tick
#[test]
fn test_second_request_rejected() {
    let mut rng = StdRng::seed_from_u64(2);
    let mut lot = street_lot(1);
    assert!(matches!(
        lot.request_parking(VehicleId(1), 4, &mut rng),
        ParkingResponse::Accepted { .. }
    ));
    assert!(matches!(
        lot.request_parking(VehicleId(2), 4, &mut rng),
        ParkingResponse::Rejected { .. }
    ));
}

/// Test that every accepted stay ends strictly after the request
#[test]
fn test_exit_tick_after_request() {
    let mut rng = StdRng::seed_from_u64(3);
    for now in 0..200 {
        let mut lot = street_lot(1);
        match lot.request_parking(VehicleId(1), now, &mut rng) {
            ParkingResponse::Accepted { exit_tick, .. } => {
                assert!(exit_tick > now);
                assert_eq!(lot.exit_tick(VehicleId(1)), Some(exit_tick));
            }
            ParkingResponse::Rejected { .. } => panic!("empty lot rejected a vehicle"),
        }
    }
}

/// Test that occupants leave exactly when their stay runs out
#[test]
fn test_lot_releases_on_exit_tick() {
    let mut lot = street_lot(3);
    assert!(lot.admit(Occupant::Vehicle(VehicleId(1)), 5));
    assert!(lot.admit(Occupant::Vehicle(VehicleId(2)), 7));

    assert!(lot.advance(4).is_empty());
    assert_eq!(lot.advance(5), vec![Occupant::Vehicle(VehicleId(1))]);
    assert_eq!(lot.occupied(), 1);
    assert_eq!(lot.advance(9), vec![Occupant::Vehicle(VehicleId(2))]);
    assert_eq!(lot.occupied(), 0);
}

/// Test that direct admission respects capacity
#[test]
fn test_admit_respects_capacity() {
    let mut lot = street_lot(1);
    assert!(lot.admit(Occupant::Resident(0), 100));
    assert!(!lot.admit(Occupant::Vehicle(VehicleId(1)), 100));
    // Updating an existing occupant is not a new admission
    assert!(lot.admit(Occupant::Resident(0), 50));
    assert_eq!(lot.occupied(), 1);
}

/// Test initial occupancy seeding
#[test]
fn test_seed_residents() {
    let mut rng = StdRng::seed_from_u64(4);

    let mut lot = SimParkingLot::new(LotId(0), ParkingKind::Building, CellPos::new(4, 7), 10, 5);
    lot.seed_residents(0.3, &mut rng);
    assert_eq!(lot.occupied(), 3);
    for (occupant, exit_tick) in lot.occupants() {
        assert!(matches!(occupant, Occupant::Resident(_)));
        assert!((1..=10).contains(&exit_tick), "exit tick {exit_tick} out of range");
    }

    // Fractions round down
    let mut lot = street_lot(2);
    lot.seed_residents(0.3, &mut rng);
    assert_eq!(lot.occupied(), 0);

    let mut lot = street_lot(2);
    lot.seed_residents(1.0, &mut rng);
    assert!(lot.is_full());
}

/// Test that sampled stays are never shorter than a tick and centre on the
/// average
#[test]
fn test_sample_stay_distribution() {
    let mut rng = StdRng::seed_from_u64(5);
    let samples: Vec<u64> = (0..5000).map(|_| sample_stay(9, &mut rng)).collect();
    assert!(samples.iter().all(|stay| *stay >= 1));
    let mean = samples.iter().sum::<u64>() as f64 / samples.len() as f64;
    // Truncation pulls the mean about half a tick below the average
    assert!((7.5..9.5).contains(&mean), "mean stay {mean}");

    assert!((0..100).all(|_| sample_stay(1, &mut rng) >= 1));
}

/// Test that worlds seed every lot from the configured occupancy
#[test]
fn test_world_seeds_lots() {
    let config = SimConfig {
        parking: ParkingConfig {
            enabled: true,
            initial_occupancy: 0.5,
            ..ParkingConfig::default()
        },
        ..SimConfig::seeded(8)
    };
    let world = SimWorld::new(config).expect("world should build");
    assert!(!world.parking_lots.is_empty());
    for lot in &world.parking_lots {
        assert_eq!(lot.occupied(), lot.capacity / 2, "{} seeded wrongly", lot.id);
        assert_eq!(world.network.parking_lot_at(lot.position), Some(lot.id));
    }
    let building = world
        .parking_lots
        .iter()
        .find(|lot| lot.kind == ParkingKind::Building)
        .expect("building lot exists");
    assert_eq!(building.occupied(), 5);
}
