//! Spatial indexing for efficient neighbor lookup.
#![allow(clippy::cast_possible_truncation)]

use std::collections::HashMap;

use mapcluster_core::geometry::Point;

/// Cell coordinate as `(column, row)`.
pub type CellKey = (i64, i64);

/// Uniform spatial hash for 2D neighbor queries.
///
/// The plane is divided into `cell_width` x `cell_height` cells starting at
/// `origin`; only occupied cells are stored.
#[derive(Debug)]
pub struct SpatialGrid<T> {
    origin: Point,
    cell_width: f64,
    cell_height: f64,
    cells: HashMap<CellKey, Vec<T>>,
}

impl<T: Copy> Default for SpatialGrid<T> {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl<T: Copy> SpatialGrid<T> {
    /// Create a grid of square cells anchored at the origin.
    pub fn new(cell_size: f64) -> Self {
        Self::with_origin(Point::ORIGIN, cell_size, cell_size)
    }

    /// Create a grid of `cell_width` x `cell_height` cells anchored at `origin`.
    pub fn with_origin(origin: Point, cell_width: f64, cell_height: f64) -> Self {
        Self {
            origin,
            cell_width,
            cell_height,
            cells: HashMap::new(),
        }
    }

    /// Clear all data and change the cell layout.
    pub fn reconfigure(&mut self, origin: Point, cell_width: f64, cell_height: f64) {
        self.cells.clear();
        self.origin = origin;
        self.cell_width = cell_width;
        self.cell_height = cell_height;
    }

    /// Clear all data.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Number of occupied cells.
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Cell containing `point` (floor division).
    #[inline]
    pub fn cell_of(&self, point: Point) -> CellKey {
        (
            ((point.x - self.origin.x) / self.cell_width).floor() as i64,
            ((point.y - self.origin.y) / self.cell_height).floor() as i64,
        )
    }

    /// Insert a value at the given point.
    pub fn insert(&mut self, point: Point, value: T) {
        let cell = self.cell_of(point);
        self.insert_at(cell, value);
    }

    /// Insert a value into an explicit cell.
    pub fn insert_at(&mut self, cell: CellKey, value: T) {
        self.cells.entry(cell).or_default().push(value);
    }

    /// Collect the contents of the 3x3 cell neighborhood around `point`.
    pub fn query_neighborhood(&self, point: Point, result: &mut Vec<T>) {
        let (cx, cy) = self.cell_of(point);
        result.clear();

        // Saturated keys at the i64 limits can repeat; each cell is read once.
        let mut seen: [Option<CellKey>; 9] = [None; 9];
        let mut n = 0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                let key = (cx.saturating_add(dx), cy.saturating_add(dy));
                if seen[..n].contains(&Some(key)) {
                    continue;
                }
                seen[n] = Some(key);
                n += 1;
                if let Some(values) = self.cells.get(&key) {
                    result.extend(values.iter().copied());
                }
            }
        }
    }

    /// Occupied cells in row-major order (by row, then column).
    pub fn sorted_cells(&self) -> Vec<(CellKey, &[T])> {
        let mut cells: Vec<(CellKey, &[T])> = self
            .cells
            .iter()
            .map(|(key, values)| (*key, values.as_slice()))
            .collect();
        cells.sort_unstable_by_key(|((x, y), _)| (*y, *x));
        cells
    }
}
