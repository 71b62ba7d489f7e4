//! Grid-based clustering algorithm.
//!
//! Bins anchors into fixed-size cells over the view extent. Every cell with
//! at least `min_points` members becomes one cluster; the rest of the
//! features stay unclustered. O(n) binning plus O(k log k) over the k
//! occupied cells.
#![allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]

use std::collections::HashSet;

use crate::spatial::{CellKey, SpatialGrid};
use mapcluster_core::clustering::{
    ClusteringConfig, ClusteringState, FeatureClustering, Strategy, UNCLUSTERED,
};
use mapcluster_core::geometry::{Bounds, Point};
use mapcluster_core::{CancellationToken, ClusteringError};

/// Grid clustering configuration.
#[derive(Clone, Debug)]
pub struct GridConfig {
    /// Extent the cells are laid over; its minimum corner is the grid origin.
    pub extent: Bounds,
    /// Cell edge length in map units.
    pub cell_size: f64,
    /// Split the extent into this many cells per axis instead of `cell_size`.
    pub divisions: Option<usize>,
    /// Minimum cell population to form a cluster.
    pub min_points: usize,
    /// Maximum members per cluster; surplus members stay unclustered.
    pub max_cluster_size: usize,
    /// Maximum clusters; the most populated cells win.
    pub max_clusters: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        let defaults = ClusteringConfig::default();
        Self {
            extent: Bounds::empty(),
            cell_size: defaults.grid_cell_size,
            divisions: None,
            min_points: defaults.min_points,
            max_cluster_size: defaults.max_features_per_cluster,
            max_clusters: defaults.max_clusters,
        }
    }
}

impl GridConfig {
    /// Builds the grid parameters from a generic configuration.
    #[must_use]
    pub fn from_clustering(config: &ClusteringConfig, extent: Bounds) -> Self {
        Self {
            extent,
            cell_size: config.grid_cell_size,
            divisions: config.grid_divisions,
            min_points: config.min_points,
            max_cluster_size: config.max_features_per_cluster,
            max_clusters: config.max_clusters,
        }
    }
}

/// Grid clustering state.
#[derive(Default)]
pub struct GridState {
    cells: SpatialGrid<usize>,
    features_processed: usize,
    clusters_found: usize,
}

impl GridState {
    /// Features binned in the last run.
    #[must_use]
    pub fn features_processed(&self) -> usize {
        self.features_processed
    }

    /// Clusters produced by the last run.
    #[must_use]
    pub fn clusters_found(&self) -> usize {
        self.clusters_found
    }

    /// Occupied cells in the last run.
    #[must_use]
    pub fn occupied_cells(&self) -> usize {
        self.cells.occupied_cells()
    }
}

impl ClusteringState for GridState {
    fn reset(&mut self) {
        self.cells.clear();
        self.features_processed = 0;
        self.clusters_found = 0;
    }
}

/// Grid-based clustering over a fixed cell layout.
#[derive(Default)]
pub struct GridClustering {
    config: GridConfig,
}

impl GridClustering {
    /// Create with custom configuration.
    #[must_use]
    pub fn new(config: GridConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Cell width and height for the given extent.
    fn cell_dimensions(&self, extent: &Bounds) -> (f64, f64) {
        let size = self.config.cell_size;
        match self.config.divisions {
            Some(n) if n > 0 => {
                let n = n as f64;
                let or_size = |dim: f64| if dim > 0.0 { dim / n } else { size };
                (or_size(extent.width()), or_size(extent.height()))
            }
            _ => (size, size),
        }
    }

    /// Cell holding `point`. With a division count, a feature on the far
    /// edge of the extent belongs to the last cell rather than a new one.
    fn cell_for(&self, grid: &SpatialGrid<usize>, extent: &Bounds, point: Point) -> CellKey {
        let (mut cx, mut cy) = grid.cell_of(point);
        if let Some(n) = self.config.divisions.filter(|&n| n > 0) {
            let last = i64::try_from(n).unwrap_or(i64::MAX) - 1;
            if extent.contains(point) {
                cx = cx.clamp(0, last);
                cy = cy.clamp(0, last);
            }
        }
        (cx, cy)
    }
}

impl FeatureClustering for GridClustering {
    type State = GridState;

    fn name(&self) -> &'static str {
        "Grid"
    }

    fn strategy(&self) -> Strategy {
        Strategy::Grid
    }

    fn create_state(&self) -> Self::State {
        GridState::default()
    }

    fn cluster(
        &self,
        anchors: &[Point],
        state: &mut Self::State,
        labels: &mut [i32],
        cancel: &CancellationToken,
    ) -> Result<usize, ClusteringError> {
        if anchors.len() != labels.len() {
            return Err(ClusteringError::LabelMismatch {
                features: anchors.len(),
                labels: labels.len(),
            });
        }
        state.reset();
        labels.fill(UNCLUSTERED);
        if anchors.is_empty() {
            return Ok(0);
        }

        let extent = if self.config.extent.is_valid() {
            self.config.extent
        } else {
            Bounds::from_points(anchors.iter().copied())
        };
        let (cell_w, cell_h) = self.cell_dimensions(&extent);
        if !(cell_w.is_finite() && cell_w > 0.0 && cell_h.is_finite() && cell_h > 0.0) {
            return Err(ClusteringError::InvalidConfig(format!(
                "grid cell size must be positive, got {cell_w} x {cell_h}"
            )));
        }

        state
            .cells
            .reconfigure(Point::new(extent.min_x, extent.min_y), cell_w, cell_h);
        for (i, &point) in anchors.iter().enumerate() {
            cancel.check()?;
            let cell = self.cell_for(&state.cells, &extent, point);
            state.cells.insert_at(cell, i);
        }
        state.features_processed = anchors.len();

        let min_points = self.config.min_points.max(1);
        let mut qualifying: Vec<(CellKey, &[usize])> = state
            .cells
            .sorted_cells()
            .into_iter()
            .filter(|(_, members)| members.len() >= min_points)
            .collect();

        if qualifying.len() > self.config.max_clusters {
            let mut ranked = qualifying.clone();
            ranked.sort_by(|(ka, a), (kb, b)| {
                b.len()
                    .cmp(&a.len())
                    .then_with(|| (ka.1, ka.0).cmp(&(kb.1, kb.0)))
            });
            let keep: HashSet<CellKey> = ranked
                .into_iter()
                .take(self.config.max_clusters)
                .map(|(key, _)| key)
                .collect();
            qualifying.retain(|(key, _)| keep.contains(key));
        }

        let mut cluster_id = 0i32;
        for (_, members) in &qualifying {
            for &i in members.iter().take(self.config.max_cluster_size) {
                labels[i] = cluster_id;
            }
            cluster_id += 1;
        }

        state.clusters_found = qualifying.len();
        Ok(state.clusters_found)
    }
}
