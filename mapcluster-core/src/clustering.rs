//! Clustering traits and types.
#![allow(clippy::cast_precision_loss)]

use std::fmt;
use std::time::Duration;

use crate::cancel::CancellationToken;
use crate::error::{ClusteringError, Error, Result};
use crate::feature::Feature;
use crate::geometry::{Bounds, Point};
use crate::summary::{summarize_attributes, AttributeSummary};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Label value for features that belong to no cluster.
pub const UNCLUSTERED: i32 = -1;

/// Clustering strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Strategy {
    /// Fixed-size cell binning.
    Grid,
    /// Greedy nearest-centroid assignment.
    Distance,
    /// Density-reachability expansion.
    Density,
    /// Pick one of the above from the estimated point density.
    #[default]
    Adaptive,
}

impl Strategy {
    /// Lowercase name, also used as the cluster id prefix.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Grid => "grid",
            Strategy::Distance => "distance",
            Strategy::Density => "density",
            Strategy::Adaptive => "adaptive",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Density thresholds (features per unit area) for adaptive selection.
///
/// Above `grid_density` the grid is used, from `density_density` up to
/// `grid_density` density expansion, below it distance clustering.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct AdaptiveThresholds {
    /// Densities strictly above this use the grid.
    pub grid_density: f64,
    /// Densities at or above this (and not above `grid_density`) use density expansion.
    pub density_density: f64,
}

impl Default for AdaptiveThresholds {
    fn default() -> Self {
        Self {
            grid_density: 1000.0,
            density_density: 100.0,
        }
    }
}

/// Configuration for clustering algorithms.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct ClusteringConfig {
    /// Algorithm to run.
    pub strategy: Strategy,
    /// Hard cap on members per cluster.
    pub max_features_per_cluster: usize,
    /// Join radius (distance strategy) and neighbourhood radius (density strategy).
    pub min_distance: f64,
    /// Grid cell edge length, in map units.
    pub grid_cell_size: f64,
    /// Divide the extent into this many cells per axis instead of using `grid_cell_size`.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub grid_divisions: Option<usize>,
    /// Minimum members for a grid cell to become a cluster.
    pub min_points: usize,
    /// Minimum neighbourhood size (self included) for a core feature.
    pub density_threshold: usize,
    /// Maximum number of clusters produced.
    pub max_clusters: usize,
    /// Adaptive selection thresholds.
    pub adaptive: AdaptiveThresholds,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Adaptive,
            max_features_per_cluster: 100,
            min_distance: 50.0,
            grid_cell_size: 50.0,
            grid_divisions: None,
            min_points: 2,
            density_threshold: 3,
            max_clusters: 100,
            adaptive: AdaptiveThresholds::default(),
        }
    }
}

impl ClusteringConfig {
    /// Creates a new clustering configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the per-cluster member cap.
    #[must_use]
    pub fn with_max_features_per_cluster(mut self, max: usize) -> Self {
        self.max_features_per_cluster = max;
        self
    }

    /// Sets the distance / neighbourhood radius.
    #[must_use]
    pub fn with_min_distance(mut self, distance: f64) -> Self {
        self.min_distance = distance;
        self
    }

    /// Sets the grid cell size.
    #[must_use]
    pub fn with_grid_cell_size(mut self, size: f64) -> Self {
        self.grid_cell_size = size;
        self
    }

    /// Divides the extent into `divisions` cells per axis.
    #[must_use]
    pub fn with_grid_divisions(mut self, divisions: usize) -> Self {
        self.grid_divisions = Some(divisions);
        self
    }

    /// Sets the minimum grid cell population.
    #[must_use]
    pub fn with_min_points(mut self, points: usize) -> Self {
        self.min_points = points;
        self
    }

    /// Sets the core-feature threshold.
    #[must_use]
    pub fn with_density_threshold(mut self, threshold: usize) -> Self {
        self.density_threshold = threshold;
        self
    }

    /// Sets the maximum number of clusters.
    #[must_use]
    pub fn with_max_clusters(mut self, max: usize) -> Self {
        self.max_clusters = max;
        self
    }

    /// Sets the adaptive thresholds.
    #[must_use]
    pub fn with_adaptive_thresholds(mut self, grid_density: f64, density_density: f64) -> Self {
        self.adaptive = AdaptiveThresholds {
            grid_density,
            density_density,
        };
        self
    }

    /// Names of fields holding unusable values.
    #[must_use]
    pub fn invalid_fields(&self) -> Vec<&'static str> {
        let positive = |value: f64| value.is_finite() && value > 0.0;
        let mut invalid = Vec::new();
        if self.max_features_per_cluster == 0 {
            invalid.push("maxFeaturesPerCluster");
        }
        if !positive(self.min_distance) {
            invalid.push("minDistance");
        }
        if !positive(self.grid_cell_size) {
            invalid.push("gridCellSize");
        }
        if self.grid_divisions == Some(0) {
            invalid.push("gridDivisions");
        }
        if self.max_clusters == 0 {
            invalid.push("maxClusters");
        }
        if !self.adaptive.grid_density.is_finite()
            || !self.adaptive.density_density.is_finite()
            || self.adaptive.density_density > self.adaptive.grid_density
        {
            invalid.push("adaptive");
        }
        invalid
    }

    /// Fails if any field holds an unusable value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] naming every invalid field.
    pub fn validate(&self) -> Result<()> {
        let invalid = self.invalid_fields();
        if invalid.is_empty() {
            Ok(())
        } else {
            Err(Error::ConfigError(format!(
                "invalid values for: {}",
                invalid.join(", ")
            )))
        }
    }

    /// Replaces unusable values with their defaults and returns the names of
    /// the fields that were reset.
    pub fn sanitize(&mut self) -> Vec<&'static str> {
        let invalid = self.invalid_fields();
        let defaults = Self::default();
        for field in &invalid {
            match *field {
                "maxFeaturesPerCluster" => {
                    self.max_features_per_cluster = defaults.max_features_per_cluster;
                }
                "minDistance" => self.min_distance = defaults.min_distance,
                "gridCellSize" => self.grid_cell_size = defaults.grid_cell_size,
                "gridDivisions" => self.grid_divisions = None,
                "maxClusters" => self.max_clusters = defaults.max_clusters,
                _ => self.adaptive = defaults.adaptive.clone(),
            }
        }
        invalid
    }
}

/// Running sum of member anchors.
///
/// The centroid is derived on read as `sum / count`, so it never lags behind
/// the members and does not drift over many incremental updates.
#[derive(Debug, Clone, Default)]
pub struct CentroidAccumulator {
    sum_x: f64,
    sum_y: f64,
    count: usize,
    bounds: Bounds,
}

impl CentroidAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a member anchor.
    #[inline]
    pub fn push(&mut self, point: Point) {
        self.sum_x += point.x;
        self.sum_y += point.y;
        self.count += 1;
        self.bounds.extend(point);
    }

    /// Number of anchors added.
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Mean of the anchors, or `None` when empty.
    #[inline]
    #[must_use]
    pub fn centroid(&self) -> Option<Point> {
        (self.count > 0).then(|| {
            let n = self.count as f64;
            Point::new(self.sum_x / n, self.sum_y / n)
        })
    }

    /// Bounding box of the anchors.
    #[inline]
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }
}

/// A cluster of map features.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Cluster {
    /// Identifier, unique within one result.
    pub id: String,
    /// Mean of the members' anchors.
    pub centroid: Point,
    /// Number of members.
    pub count: usize,
    /// Bounding box of the members' anchors.
    pub bounds: Bounds,
    /// Member features.
    pub members: Vec<Feature>,
    /// Attribute statistics of the members.
    pub attribute_summary: AttributeSummary,
}

impl Cluster {
    /// Builds a cluster from its members, deriving centroid, bounds and count.
    ///
    /// The attribute summary is left empty; see [`Cluster::summarize`].
    #[must_use]
    pub fn from_members(id: String, members: Vec<Feature>) -> Self {
        let mut acc = CentroidAccumulator::new();
        for member in &members {
            acc.push(member.anchor());
        }
        Self {
            id,
            centroid: acc.centroid().unwrap_or(Point::ORIGIN),
            count: acc.count(),
            bounds: acc.bounds(),
            members,
            attribute_summary: AttributeSummary::new(),
        }
    }

    /// Fills in the attribute summary from the members.
    pub fn summarize(&mut self) {
        self.attribute_summary = summarize_attributes(&self.members);
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the cluster has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Statistics about a clustering run.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ClusteringStatistics {
    /// Number of input features.
    pub total_features: usize,
    /// Number of clusters produced.
    pub total_clusters: usize,
    /// Mean members per cluster (0 without clusters).
    pub average_cluster_size: f64,
    /// Largest cluster.
    pub max_cluster_size: usize,
    /// Wall time of the run.
    pub processing_time_ms: f64,
    /// Strategy that actually ran.
    pub strategy: Strategy,
}

impl ClusteringStatistics {
    /// Computes statistics for a finished run.
    #[must_use]
    pub fn new(
        clusters: &[Cluster],
        total_features: usize,
        strategy: Strategy,
        elapsed: Duration,
    ) -> Self {
        let clustered: usize = clusters.iter().map(|c| c.count).sum();
        let total_clusters = clusters.len();
        Self {
            total_features,
            total_clusters,
            average_cluster_size: if total_clusters > 0 {
                clustered as f64 / total_clusters as f64
            } else {
                0.0
            },
            max_cluster_size: clusters.iter().map(|c| c.count).max().unwrap_or(0),
            processing_time_ms: elapsed.as_secs_f64() * 1000.0,
            strategy,
        }
    }
}

/// Output of one clustering request.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusteringResult {
    /// Clusters in label order.
    pub clusters: Vec<Cluster>,
    /// Features that belong to no cluster.
    pub unclustered: Vec<Feature>,
    /// Run statistics.
    pub stats: ClusteringStatistics,
}

impl ClusteringResult {
    /// Result for an empty input: no clusters, zeroed statistics.
    #[must_use]
    pub fn empty(strategy: Strategy) -> Self {
        Self {
            clusters: Vec::new(),
            unclustered: Vec::new(),
            stats: ClusteringStatistics {
                strategy,
                ..Default::default()
            },
        }
    }

    /// Number of features placed in clusters.
    #[must_use]
    pub fn clustered_count(&self) -> usize {
        self.clusters.iter().map(|c| c.count).sum()
    }

    /// Returns true if every input feature is accounted for exactly once.
    #[must_use]
    pub fn is_conserved(&self) -> bool {
        self.clustered_count() + self.unclustered.len() == self.stats.total_features
    }
}

/// Per-run scratch state of a clustering algorithm.
pub trait ClusteringState {
    /// Clears everything left over from a previous run.
    fn reset(&mut self);
}

/// Trait for clustering algorithms.
///
/// Algorithms label anchor points: `labels[i]` receives the cluster index of
/// feature `i` (dense, starting at 0) or [`UNCLUSTERED`]. The return value is
/// the number of clusters.
pub trait FeatureClustering: Send + Sync {
    /// Scratch state type.
    type State: ClusteringState + Send;

    /// Returns the name of the algorithm.
    fn name(&self) -> &'static str;

    /// Strategy implemented by this algorithm.
    fn strategy(&self) -> Strategy;

    /// Allocates fresh scratch state.
    fn create_state(&self) -> Self::State;

    /// Clusters the given anchors.
    fn cluster(
        &self,
        anchors: &[Point],
        state: &mut Self::State,
        labels: &mut [i32],
        cancel: &CancellationToken,
    ) -> std::result::Result<usize, ClusteringError>;
}
