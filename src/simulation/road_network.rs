//! Grid road network
//!
//! Builds the static topology: which cells are road, how many lanes they
//! carry, which way traffic flows and where lights, crossings and parking
//! lots sit. Everything here is fixed once `build` returns.

use std::collections::HashMap;
use std::fmt;

use super::error::{ConfigError, SimError};
use super::types::{
    CellPos, CrossingId, Direction, LightId, LotId, BUILDING_LOT_CAPACITY, MIN_GRID_DIMENSION,
};

/// What occupies a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Road,
    Building,
    Empty,
}

/// Kind of parking facility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParkingKind {
    Street,
    Building,
}

/// A tag attached to a road cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    TrafficLight,
    Crossing,
    Parking { capacity: usize, kind: ParkingKind },
}

/// One grid unit of the network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub kind: CellKind,
    pub lanes: usize,
    pub allowed: Vec<Direction>,
    pub features: Vec<Feature>,
}

impl Cell {
    fn empty() -> Self {
        Self {
            kind: CellKind::Empty,
            lanes: 0,
            allowed: Vec::new(),
            features: Vec::new(),
        }
    }

    fn road(lanes: usize, direction: Direction) -> Self {
        Self {
            kind: CellKind::Road,
            lanes,
            allowed: vec![direction],
            features: Vec::new(),
        }
    }

    pub fn is_road(&self) -> bool {
        self.kind == CellKind::Road
    }

    pub fn allows(&self, direction: Direction) -> bool {
        self.allowed.contains(&direction)
    }

    pub fn has_light(&self) -> bool {
        self.features.contains(&Feature::TrafficLight)
    }

    pub fn has_crossing(&self) -> bool {
        self.features.contains(&Feature::Crossing)
    }

    /// Parking capacity and kind, if the cell serves a lot
    pub fn parking(&self) -> Option<(usize, ParkingKind)> {
        self.features.iter().find_map(|feature| match feature {
            Feature::Parking { capacity, kind } => Some((*capacity, *kind)),
            _ => None,
        })
    }

    /// Short text form used by the terminal map
    pub fn symbol(&self) -> String {
        match self.kind {
            CellKind::Empty => ".".to_string(),
            CellKind::Building => "[B]".to_string(),
            CellKind::Road => {
                let mut symbol = self
                    .allowed
                    .first()
                    .map(|d| d.arrow().to_string())
                    .unwrap_or_else(|| "?".to_string());
                if self.lanes > 1 {
                    symbol.push_str(&format!("({})", self.lanes));
                }
                let mut suffix = String::new();
                if self.has_light() {
                    suffix.push('T');
                }
                if self.has_crossing() {
                    suffix.push('X');
                }
                if self.parking().is_some() {
                    suffix.push('P');
                }
                if !suffix.is_empty() {
                    symbol.push_str(&format!("[{suffix}]"));
                }
                symbol
            }
        }
    }
}

/// Row and column indices of the seven roads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoadLayout {
    pub top_row: usize,
    pub middle_row: usize,
    pub bottom_row: usize,
    pub left_col: usize,
    pub inner_left_col: usize,
    pub inner_right_col: usize,
    pub right_col: usize,
}

impl RoadLayout {
    fn horizontal_rows(&self) -> [usize; 3] {
        [self.top_row, self.bottom_row, self.middle_row]
    }

    fn vertical_cols(&self) -> [usize; 4] {
        [
            self.left_col,
            self.right_col,
            self.inner_left_col,
            self.inner_right_col,
        ]
    }

    fn is_intersection(&self, pos: CellPos) -> bool {
        self.horizontal_rows().contains(&pos.row) && self.vertical_cols().contains(&pos.col)
    }
}

/// Convert a fraction of the grid into an index, rounding half to even
fn frac_index(fraction: f64, len: usize) -> usize {
    let scaled = (fraction * (len - 1) as f64).round_ties_even();
    (scaled.max(0.0) as usize).min(len - 1)
}

const CROSSING_FRACTIONS: [f64; 4] = [0.1, 0.3, 0.7, 0.9];

/// The static road grid
#[derive(Debug, Clone, PartialEq)]
pub struct RoadNetwork {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
    layout: RoadLayout,
    light_positions: Vec<CellPos>,
    crossing_positions: Vec<CellPos>,
    lot_positions: Vec<CellPos>,
    light_index: HashMap<CellPos, LightId>,
    crossing_index: HashMap<CellPos, CrossingId>,
    lot_index: HashMap<CellPos, LotId>,
    entry_points: Vec<(CellPos, Direction)>,
    exit_points: Vec<(CellPos, Direction)>,
}

impl RoadNetwork {
    /// Build the network for a `rows x cols` grid. Parking lots are only
    /// placed when `with_parking` is set. Deterministic in its inputs.
    pub fn build(rows: usize, cols: usize, with_parking: bool) -> Result<Self, SimError> {
        if rows < MIN_GRID_DIMENSION || cols < MIN_GRID_DIMENSION {
            return Err(ConfigError::GridTooSmall {
                rows,
                cols,
                min: MIN_GRID_DIMENSION,
            }
            .into());
        }

        let layout = RoadLayout {
            top_row: frac_index(0.1, rows),
            middle_row: frac_index(0.5, rows),
            bottom_row: frac_index(0.9, rows),
            left_col: 0,
            inner_left_col: frac_index(0.2, cols),
            inner_right_col: frac_index(0.8, cols),
            right_col: cols - 1,
        };

        let mut network = Self {
            rows,
            cols,
            cells: vec![Cell::empty(); rows * cols],
            layout,
            light_positions: Vec::new(),
            crossing_positions: Vec::new(),
            lot_positions: Vec::new(),
            light_index: HashMap::new(),
            crossing_index: HashMap::new(),
            lot_index: HashMap::new(),
            entry_points: Vec::new(),
            exit_points: Vec::new(),
        };

        network.place_roads();
        network.place_lights();
        network.place_crossings();
        if with_parking {
            network.place_parking();
        }
        network.index_features();
        network.entry_points = network.scan_entry_points();
        network.exit_points = vec![
            (CellPos::new(rows - 1, layout.left_col), Direction::South),
            (CellPos::new(0, layout.right_col), Direction::North),
            (CellPos::new(0, layout.inner_left_col), Direction::North),
            (CellPos::new(rows - 1, layout.inner_right_col), Direction::South),
        ];
        network.validate()?;

        Ok(network)
    }

    fn place_roads(&mut self) {
        let RoadLayout {
            top_row,
            middle_row,
            bottom_row,
            left_col,
            inner_left_col,
            inner_right_col,
            right_col,
        } = self.layout;

        // Later roads overwrite earlier ones where they cross
        for col in 0..self.cols {
            *self.cell_mut(CellPos::new(top_row, col)) = Cell::road(1, Direction::West);
            *self.cell_mut(CellPos::new(bottom_row, col)) = Cell::road(1, Direction::East);
        }
        for row in 0..self.rows {
            *self.cell_mut(CellPos::new(row, left_col)) = Cell::road(2, Direction::South);
            *self.cell_mut(CellPos::new(row, right_col)) = Cell::road(2, Direction::North);
        }
        for col in 1..self.cols - 1 {
            *self.cell_mut(CellPos::new(middle_row, col)) = Cell::road(1, Direction::East);
        }
        for row in 0..self.rows {
            *self.cell_mut(CellPos::new(row, inner_left_col)) = Cell::road(1, Direction::North);
            *self.cell_mut(CellPos::new(row, inner_right_col)) = Cell::road(1, Direction::South);
        }
    }

    fn place_lights(&mut self) {
        let last_row = self.rows - 1;
        let positions = [
            CellPos::new(0, self.layout.left_col),
            CellPos::new(0, self.layout.right_col),
            CellPos::new(last_row, self.layout.left_col),
            CellPos::new(last_row, self.layout.inner_right_col),
        ];
        for pos in positions {
            self.cell_mut(pos).features.push(Feature::TrafficLight);
        }
    }

    fn place_crossings(&mut self) {
        let mut positions = Vec::new();
        for row in [
            self.layout.top_row,
            self.layout.bottom_row,
            self.layout.middle_row,
        ] {
            for fraction in CROSSING_FRACTIONS {
                positions.push(CellPos::new(row, frac_index(fraction, self.cols)));
            }
        }
        positions.push(CellPos::new(frac_index(0.25, self.rows), self.layout.left_col));
        positions.push(CellPos::new(frac_index(0.75, self.rows), self.layout.right_col));

        for pos in positions {
            let cell = self.cell_mut(pos);
            if cell.is_road() && !cell.has_crossing() {
                cell.features.push(Feature::Crossing);
            }
        }
    }

    fn place_parking(&mut self) {
        let layout = self.layout;
        let mut candidates = Vec::new();
        for row in layout.horizontal_rows() {
            candidates.extend((0..self.cols).map(|col| CellPos::new(row, col)));
        }
        for col in layout.vertical_cols() {
            candidates.extend((0..self.rows).map(|row| CellPos::new(row, col)));
        }

        for pos in candidates {
            if layout.is_intersection(pos) {
                continue;
            }
            let cell = self.cell_mut(pos);
            if !cell.is_road() || cell.has_light() || cell.has_crossing() || cell.parking().is_some()
            {
                continue;
            }
            let capacity = cell.lanes;
            cell.features.push(Feature::Parking {
                capacity,
                kind: ParkingKind::Street,
            });
        }

        // The building sits just above the middle road and is served from
        // the road cell beneath it
        let access = CellPos::new(layout.middle_row, frac_index(0.53, self.cols));
        let Some(building) = access.step(Direction::North, self.rows, self.cols) else {
            return;
        };
        let access_is_street_lot = matches!(
            self.cell(access).parking(),
            Some((_, ParkingKind::Street))
        );
        if !access_is_street_lot || self.cell(building).kind != CellKind::Empty {
            return;
        }
        self.cell_mut(building).kind = CellKind::Building;
        for feature in &mut self.cell_mut(access).features {
            if let Feature::Parking { capacity, kind } = feature {
                *capacity = BUILDING_LOT_CAPACITY;
                *kind = ParkingKind::Building;
            }
        }
    }

    fn index_features(&mut self) {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let pos = CellPos::new(row, col);
                let cell = &self.cells[row * self.cols + col];
                if cell.has_light() {
                    self.light_index
                        .insert(pos, LightId(self.light_positions.len()));
                    self.light_positions.push(pos);
                }
                if cell.has_crossing() {
                    self.crossing_index
                        .insert(pos, CrossingId(self.crossing_positions.len()));
                    self.crossing_positions.push(pos);
                }
                if cell.parking().is_some() {
                    self.lot_index.insert(pos, LotId(self.lot_positions.len()));
                    self.lot_positions.push(pos);
                }
            }
        }
    }

    fn scan_entry_points(&self) -> Vec<(CellPos, Direction)> {
        let mut entries = Vec::new();
        let last_row = self.rows - 1;
        let last_col = self.cols - 1;
        let mut push_if = |pos: CellPos, direction: Direction| {
            let cell = self.cell(pos);
            if cell.is_road() && cell.allows(direction) {
                entries.push((pos, direction));
            }
        };

        for col in 0..self.cols {
            push_if(CellPos::new(0, col), Direction::South);
        }
        for col in 0..self.cols {
            push_if(CellPos::new(last_row, col), Direction::North);
        }
        for row in 1..last_row {
            push_if(CellPos::new(row, 0), Direction::East);
            push_if(CellPos::new(row, last_col), Direction::West);
        }
        entries
    }

    /// Check the structural invariants of the built grid
    fn validate(&self) -> Result<(), SimError> {
        for (index, cell) in self.cells.iter().enumerate() {
            let pos = CellPos::new(index / self.cols, index % self.cols);
            if cell.is_road() && cell.allowed.is_empty() {
                return Err(SimError::RoadWithoutDirection { pos });
            }
            if !cell.is_road() && !cell.features.is_empty() {
                return Err(SimError::FeatureOffRoad { pos });
            }
        }
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn layout(&self) -> RoadLayout {
        self.layout
    }

    /// Cell at a position known to be inside the grid
    pub fn cell(&self, pos: CellPos) -> &Cell {
        &self.cells[pos.row * self.cols + pos.col]
    }

    fn cell_mut(&mut self, pos: CellPos) -> &mut Cell {
        &mut self.cells[pos.row * self.cols + pos.col]
    }

    /// Cell at a position, or `None` when outside the grid
    pub fn cell_at(&self, row: usize, col: usize) -> Option<&Cell> {
        (row < self.rows && col < self.cols).then(|| &self.cells[row * self.cols + col])
    }

    pub fn contains(&self, pos: CellPos) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    /// Lane count of a cell; 0 for anything that is not road
    pub fn lanes(&self, pos: CellPos) -> usize {
        self.cell_at(pos.row, pos.col)
            .filter(|cell| cell.is_road())
            .map_or(0, |cell| cell.lanes)
    }

    /// The neighbour of `pos` along `direction`, if inside the grid
    pub fn step(&self, pos: CellPos, direction: Direction) -> Option<CellPos> {
        pos.step(direction, self.rows, self.cols)
    }

    /// Boundary cells where vehicles appear, with the inward heading
    pub fn entry_points(&self) -> &[(CellPos, Direction)] {
        &self.entry_points
    }

    /// Boundary (cell, heading) pairs where vehicles leave
    pub fn exit_points(&self) -> &[(CellPos, Direction)] {
        &self.exit_points
    }

    /// Whether being at `pos` heading `direction` means leaving the network
    pub fn is_exit(&self, pos: CellPos, direction: Direction) -> bool {
        self.exit_points.contains(&(pos, direction))
    }

    pub fn traffic_light_positions(&self) -> &[CellPos] {
        &self.light_positions
    }

    pub fn crossing_positions(&self) -> &[CellPos] {
        &self.crossing_positions
    }

    pub fn parking_positions(&self) -> &[CellPos] {
        &self.lot_positions
    }

    pub fn light_at(&self, pos: CellPos) -> Option<LightId> {
        self.light_index.get(&pos).copied()
    }

    pub fn crossing_at(&self, pos: CellPos) -> Option<CrossingId> {
        self.crossing_index.get(&pos).copied()
    }

    pub fn parking_lot_at(&self, pos: CellPos) -> Option<LotId> {
        self.lot_index.get(&pos).copied()
    }

    /// Every road cell, in row-major order
    pub fn road_cells(&self) -> impl Iterator<Item = (CellPos, &Cell)> + '_ {
        self.cells.iter().enumerate().filter_map(move |(index, cell)| {
            cell.is_road()
                .then(|| (CellPos::new(index / self.cols, index % self.cols), cell))
        })
    }
}

impl fmt::Display for RoadNetwork {
    /// Aligned grid of cell symbols, one row per line
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbols: Vec<Vec<String>> = (0..self.rows)
            .map(|row| {
                (0..self.cols)
                    .map(|col| self.cell(CellPos::new(row, col)).symbol())
                    .collect()
            })
            .collect();
        let widths: Vec<usize> = (0..self.cols)
            .map(|col| {
                symbols
                    .iter()
                    .map(|line| line[col].chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        for line in &symbols {
            let padded: Vec<String> = line
                .iter()
                .zip(&widths)
                .map(|(symbol, &width)| format!("{symbol:<width$}"))
                .collect();
            writeln!(f, "{}", padded.join(" | "))?;
        }
        Ok(())
    }
}
