//! Road network layout tests
//!
//! Checks the fixed layout produced for the small grid and the structural
//! guarantees every grid size must satisfy.

use grid_traffic_sim::simulation::{
    CellKind, CellPos, ConfigError, CrossingId, Direction, LightId, ParkingKind, RoadNetwork,
    RoadSize, SimError, BUILDING_LOT_CAPACITY,
};

fn small(with_parking: bool) -> RoadNetwork {
    let (rows, cols) = RoadSize::Small.dimensions();
    RoadNetwork::build(rows, cols, with_parking).expect("small grid should build")
}

/// Test that the seven roads land on the expected rows and columns
#[test]
fn test_small_grid_layout() {
    let network = small(false);
    let layout = network.layout();
    assert_eq!((network.rows(), network.cols()), (10, 15));
    assert_eq!(
        (layout.top_row, layout.middle_row, layout.bottom_row),
        (1, 4, 8)
    );
    assert_eq!(
        (layout.inner_left_col, layout.inner_right_col, layout.right_col),
        (3, 11, 14)
    );

    // Outer columns carry two lanes, everything else one
    assert_eq!(network.lanes(CellPos::new(5, 0)), 2);
    assert_eq!(network.lanes(CellPos::new(5, 14)), 2);
    assert_eq!(network.lanes(CellPos::new(1, 6)), 1);
    assert_eq!(network.lanes(CellPos::new(3, 7)), 0);

    assert!(network.cell(CellPos::new(1, 6)).allows(Direction::West));
    assert!(network.cell(CellPos::new(8, 6)).allows(Direction::East));
    assert!(network.cell(CellPos::new(4, 6)).allows(Direction::East));
    assert!(network.cell(CellPos::new(6, 3)).allows(Direction::North));
    assert!(network.cell(CellPos::new(6, 11)).allows(Direction::South));

    // Columns are placed after rows, so they win at intersections
    assert!(network.cell(CellPos::new(1, 0)).allows(Direction::South));
    assert!(!network.cell(CellPos::new(1, 0)).allows(Direction::West));

    // The middle road stops one short of each outer column
    assert!(network.cell(CellPos::new(4, 1)).allows(Direction::East));
    assert!(network.cell(CellPos::new(4, 0)).allows(Direction::South));
}

/// Test entry points and the exit table
#[test]
fn test_entry_and_exit_points() {
    let network = small(false);
    assert_eq!(
        network.entry_points(),
        &[
            (CellPos::new(0, 0), Direction::South),
            (CellPos::new(0, 11), Direction::South),
            (CellPos::new(9, 3), Direction::North),
            (CellPos::new(9, 14), Direction::North),
        ]
    );

    assert!(network.is_exit(CellPos::new(9, 0), Direction::South));
    assert!(network.is_exit(CellPos::new(0, 14), Direction::North));
    assert!(network.is_exit(CellPos::new(0, 3), Direction::North));
    assert!(network.is_exit(CellPos::new(9, 11), Direction::South));
    assert!(!network.is_exit(CellPos::new(9, 0), Direction::East));
    assert_eq!(network.exit_points().len(), 4);
}

/// Test that lights and crossings are placed and numbered in row-major order
#[test]
fn test_signal_placement() {
    let network = small(false);
    assert_eq!(
        network.traffic_light_positions(),
        &[
            CellPos::new(0, 0),
            CellPos::new(0, 14),
            CellPos::new(9, 0),
            CellPos::new(9, 11),
        ]
    );
    assert_eq!(network.light_at(CellPos::new(9, 0)), Some(LightId(2)));
    assert_eq!(LightId(2).to_string(), "traffic_light_3");

    let expected: Vec<CellPos> = [
        (1, 1),
        (1, 4),
        (1, 10),
        (1, 13),
        (2, 0),
        (4, 1),
        (4, 4),
        (4, 10),
        (4, 13),
        (7, 14),
        (8, 1),
        (8, 4),
        (8, 10),
        (8, 13),
    ]
    .into_iter()
    .map(|(row, col)| CellPos::new(row, col))
    .collect();
    assert_eq!(network.crossing_positions(), expected.as_slice());
    assert_eq!(network.crossing_at(CellPos::new(2, 0)), Some(CrossingId(4)));
    assert_eq!(network.crossing_at(CellPos::new(2, 1)), None);
}

/// Test that parking only appears when enabled and respects its rules
#[test]
fn test_parking_placement() {
    assert!(small(false).parking_positions().is_empty());

    let network = small(true);
    let layout = network.layout();
    assert!(!network.parking_positions().is_empty());

    for pos in network.parking_positions() {
        let cell = network.cell(*pos);
        assert!(cell.is_road(), "lot at {pos} is off road");
        assert!(!cell.has_light() && !cell.has_crossing(), "lot at {pos} shares a signal cell");
        let on_row = [layout.top_row, layout.middle_row, layout.bottom_row].contains(&pos.row);
        let on_col = [
            layout.left_col,
            layout.inner_left_col,
            layout.inner_right_col,
            layout.right_col,
        ]
        .contains(&pos.col);
        assert!(!(on_row && on_col), "lot at intersection {pos}");
    }

    assert_eq!(
        network.cell(CellPos::new(8, 2)).parking(),
        Some((1, ParkingKind::Street))
    );
    assert_eq!(
        network.cell(CellPos::new(3, 0)).parking(),
        Some((2, ParkingKind::Street))
    );
}

/// Test that the building lot sits beside the middle road
#[test]
fn test_building_lot() {
    let network = small(true);
    let access = CellPos::new(4, 7);
    assert_eq!(
        network.cell(access).parking(),
        Some((BUILDING_LOT_CAPACITY, ParkingKind::Building))
    );
    assert!(network.cell(access).is_road());
    assert_eq!(network.cell(CellPos::new(3, 7)).kind, CellKind::Building);
    assert!(network.cell(CellPos::new(3, 7)).features.is_empty());

    let buildings = network
        .road_cells()
        .filter(|(_, cell)| cell.parking().map(|(_, kind)| kind) == Some(ParkingKind::Building))
        .count();
    assert_eq!(buildings, 1);
}

/// Test that every size class builds a consistent grid
#[test]
fn test_all_sizes_build() {
    for size in [RoadSize::Small, RoadSize::Medium, RoadSize::Large] {
        let (rows, cols) = size.dimensions();
        for with_parking in [false, true] {
            let network = RoadNetwork::build(rows, cols, with_parking)
                .unwrap_or_else(|err| panic!("{size:?} failed: {err}"));
            assert_eq!(network.traffic_light_positions().len(), 4);
            assert!(!network.entry_points().is_empty(), "{size:?} has no entries");
            for (pos, cell) in network.road_cells() {
                assert!(!cell.allowed.is_empty(), "road {pos} has no direction");
                assert!(cell.lanes >= 1);
            }
        }
    }
}

/// Test that building is deterministic
#[test]
fn test_build_is_deterministic() {
    assert_eq!(small(true), small(true));
    assert_eq!(small(true).to_string(), small(true).to_string());
}

/// Test that grids below the minimum are rejected
#[test]
fn test_grid_too_small() {
    let result = RoadNetwork::build(4, 15, false);
    assert!(matches!(
        result,
        Err(SimError::Config(ConfigError::GridTooSmall { rows: 4, .. }))
    ));
}

/// Test the text rendering of the network
#[test]
fn test_network_display() {
    let text = small(true).to_string();
    assert_eq!(text.lines().count(), 10);
    assert!(text.contains("[T"));
    assert!(text.contains("X]"));
    assert!(text.contains("[B]"));
}
