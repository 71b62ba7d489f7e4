//! Density-based (DBSCAN-style) clustering.
//!
//! Unvisited anchors are scanned in input order. An anchor whose
//! neighbourhood (itself included) holds at least `min_points` anchors seeds
//! a cluster that expands breadth-first through the neighbours of every core
//! member. A border anchor belongs to the first expansion that reaches it and
//! is never reassigned. Once a cluster is full, the rest of its frontier is
//! diverted to unclustered and no later cluster may absorb it.
#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use crate::spatial::SpatialGrid;
use mapcluster_core::clustering::{
    ClusteringConfig, ClusteringState, FeatureClustering, Strategy, UNCLUSTERED,
};
use mapcluster_core::geometry::Point;
use mapcluster_core::{CancellationToken, ClusteringError};

/// Density clustering configuration.
#[derive(Clone, Debug)]
pub struct DensityConfig {
    /// Neighbourhood radius in map units (inclusive).
    pub epsilon: f64,
    /// Neighbourhood size, self included, that makes an anchor core.
    pub min_points: usize,
    /// Maximum members per cluster.
    pub max_cluster_size: usize,
    /// Maximum number of clusters.
    pub max_clusters: usize,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self::from_clustering(&ClusteringConfig::default())
    }
}

impl DensityConfig {
    /// Builds the density parameters from a generic configuration.
    #[must_use]
    pub fn from_clustering(config: &ClusteringConfig) -> Self {
        Self {
            epsilon: config.min_distance,
            min_points: config.density_threshold,
            max_cluster_size: config.max_features_per_cluster,
            max_clusters: config.max_clusters,
        }
    }
}

/// Density clustering state.
#[derive(Default)]
pub struct DensityState {
    grid: SpatialGrid<usize>,
    visited: Vec<bool>,
    diverted: Vec<bool>,
    /// Cluster whose frontier last queued each anchor.
    queued_for: Vec<i32>,
    neighbors: Vec<usize>,
    candidates: Vec<usize>,
    seeds: Vec<usize>,
}

impl DensityState {
    /// Number of anchors diverted by full clusters in the last run.
    #[must_use]
    pub fn diverted_count(&self) -> usize {
        self.diverted.iter().filter(|&&d| d).count()
    }
}

impl ClusteringState for DensityState {
    fn reset(&mut self) {
        self.grid.clear();
        self.visited.clear();
        self.diverted.clear();
        self.queued_for.clear();
        self.neighbors.clear();
        self.candidates.clear();
        self.seeds.clear();
    }
}

/// Read-only inputs shared by the neighbour queries of one run.
struct DensityContext<'a> {
    anchors: &'a [Point],
    grid: &'a SpatialGrid<usize>,
    eps_sq: f64,
}

impl DensityContext<'_> {
    /// Anchors within epsilon of `idx`, itself included, in ascending index order.
    fn region_query_into(
        &self,
        idx: usize,
        candidates: &mut Vec<usize>,
        neighbors: &mut Vec<usize>,
    ) {
        let center = self.anchors[idx];
        self.grid.query_neighborhood(center, candidates);
        neighbors.clear();
        neighbors.extend(
            candidates
                .iter()
                .copied()
                .filter(|&j| self.anchors[j].distance_squared(&center) <= self.eps_sq),
        );
        neighbors.sort_unstable();
        neighbors.dedup();
    }
}

/// Mutable per-anchor flags used during expansion.
struct Tracking<'a> {
    labels: &'a mut [i32],
    visited: &'a mut [bool],
    diverted: &'a mut [bool],
    queued_for: &'a mut [i32],
}

/// DBSCAN-style clustering with member and cluster caps.
#[derive(Default)]
pub struct DensityClustering {
    config: DensityConfig,
}

impl DensityClustering {
    /// Create with custom configuration.
    #[must_use]
    pub fn new(config: DensityConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &DensityConfig {
        &self.config
    }

    fn is_core(&self, neighbors: &[usize]) -> bool {
        neighbors.len() >= self.config.min_points.max(1)
    }

    /// Queue every neighbour not yet claimed, diverted or already queued.
    fn enqueue(
        tracking: &mut Tracking<'_>,
        seeds: &mut Vec<usize>,
        neighbors: &[usize],
        id: i32,
    ) {
        for &q in neighbors {
            if tracking.labels[q] == UNCLUSTERED
                && !tracking.diverted[q]
                && tracking.queued_for[q] != id
            {
                tracking.queued_for[q] = id;
                seeds.push(q);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn expand_cluster(
        &self,
        ctx: &DensityContext<'_>,
        tracking: &mut Tracking<'_>,
        seeds: &mut Vec<usize>,
        candidates: &mut Vec<usize>,
        neighbors: &mut Vec<usize>,
        id: i32,
        cancel: &CancellationToken,
    ) -> Result<(), ClusteringError> {
        let mut size = 1;
        let mut i = 0;
        while i < seeds.len() {
            cancel.check()?;
            let p = seeds[i];
            i += 1;

            // First expansion wins: claimed or diverted anchors stay put.
            if tracking.labels[p] != UNCLUSTERED || tracking.diverted[p] {
                continue;
            }
            if size >= self.config.max_cluster_size {
                tracking.diverted[p] = true;
                tracking.visited[p] = true;
                continue;
            }

            tracking.labels[p] = id;
            size += 1;

            if !tracking.visited[p] {
                tracking.visited[p] = true;
                ctx.region_query_into(p, candidates, neighbors);
                if self.is_core(neighbors) {
                    Self::enqueue(tracking, seeds, neighbors, id);
                }
            }
        }
        Ok(())
    }
}

impl FeatureClustering for DensityClustering {
    type State = DensityState;

    fn name(&self) -> &'static str {
        "Density"
    }

    fn strategy(&self) -> Strategy {
        Strategy::Density
    }

    fn create_state(&self) -> Self::State {
        DensityState::default()
    }

    fn cluster(
        &self,
        anchors: &[Point],
        state: &mut Self::State,
        labels: &mut [i32],
        cancel: &CancellationToken,
    ) -> Result<usize, ClusteringError> {
        let n = anchors.len();
        if n != labels.len() {
            return Err(ClusteringError::LabelMismatch {
                features: n,
                labels: labels.len(),
            });
        }
        let epsilon = self.config.epsilon;
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(ClusteringError::InvalidConfig(format!(
                "density radius must be positive, got {epsilon}"
            )));
        }

        state.reset();
        labels.fill(UNCLUSTERED);
        if n == 0 || self.config.max_cluster_size == 0 || self.config.max_clusters == 0 {
            return Ok(0);
        }

        // Cell size equal to epsilon keeps every neighbour inside the 3x3 probe.
        state.grid.reconfigure(Point::ORIGIN, epsilon, epsilon);
        for (i, &point) in anchors.iter().enumerate() {
            state.grid.insert(point, i);
        }
        state.visited.resize(n, false);
        state.diverted.resize(n, false);
        state.queued_for.resize(n, UNCLUSTERED);

        let DensityState {
            grid,
            visited,
            diverted,
            queued_for,
            neighbors,
            candidates,
            seeds,
        } = state;
        let ctx = DensityContext {
            anchors,
            grid,
            eps_sq: epsilon * epsilon,
        };
        let mut tracking = Tracking {
            labels,
            visited,
            diverted,
            queued_for,
        };

        let mut clusters = 0usize;
        for i in 0..n {
            cancel.check()?;
            if tracking.visited[i] {
                continue;
            }
            tracking.visited[i] = true;

            ctx.region_query_into(i, candidates, neighbors);
            if !self.is_core(neighbors) || clusters >= self.config.max_clusters {
                continue;
            }

            let id = clusters as i32;
            clusters += 1;
            tracking.labels[i] = id;
            tracking.queued_for[i] = id;

            seeds.clear();
            Self::enqueue(&mut tracking, seeds, neighbors, id);
            self.expand_cluster(&ctx, &mut tracking, seeds, candidates, neighbors, id, cancel)?;
        }

        log::debug!(
            "density clustering: {n} anchors, {clusters} clusters, {} diverted",
            tracking.diverted.iter().filter(|&&d| d).count()
        );
        Ok(clusters)
    }
}
