//! Distance-based clustering algorithm.
//!
//! Single greedy pass over the anchors sorted by x. Each anchor joins the
//! nearest open bucket whose centroid is within `min_distance`, or opens a
//! new bucket while fewer than `max_clusters` exist.
//!
//! Key characteristics:
//! - Complexity: O(n log n) sort plus O(n * k) for k buckets
//! - Buckets keep a running sum, so centroids never drift
//! - Deterministic: equal x keeps input order, equal distance keeps the
//!   older bucket

use mapcluster_core::clustering::{
    CentroidAccumulator, ClusteringConfig, ClusteringState, FeatureClustering, Strategy,
    UNCLUSTERED,
};
use mapcluster_core::geometry::Point;
use mapcluster_core::{CancellationToken, ClusteringError};

/// Distance clustering configuration.
#[derive(Clone, Debug)]
pub struct DistanceConfig {
    /// Join radius in map units (inclusive).
    pub min_distance: f64,
    /// Buckets at this size stop accepting members.
    pub max_cluster_size: usize,
    /// Maximum number of buckets.
    pub max_clusters: usize,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self::from_clustering(&ClusteringConfig::default())
    }
}

impl DistanceConfig {
    /// Builds the distance parameters from a generic configuration.
    #[must_use]
    pub fn from_clustering(config: &ClusteringConfig) -> Self {
        Self {
            min_distance: config.min_distance,
            max_cluster_size: config.max_features_per_cluster,
            max_clusters: config.max_clusters,
        }
    }
}

/// Distance clustering state.
#[derive(Default)]
pub struct DistanceState {
    /// Anchor indices in processing order.
    order: Vec<usize>,
    /// Open buckets, in creation order.
    buckets: Vec<CentroidAccumulator>,
    features_processed: usize,
}

impl DistanceState {
    /// Centroids of the buckets built by the last run, in creation order.
    #[must_use]
    pub fn centroids(&self) -> Vec<Point> {
        self.buckets
            .iter()
            .filter_map(CentroidAccumulator::centroid)
            .collect()
    }

    /// Features processed in the last run.
    #[must_use]
    pub fn features_processed(&self) -> usize {
        self.features_processed
    }
}

impl ClusteringState for DistanceState {
    fn reset(&mut self) {
        self.order.clear();
        self.buckets.clear();
        self.features_processed = 0;
    }
}

/// Greedy nearest-centroid clustering.
#[derive(Default)]
pub struct DistanceClustering {
    config: DistanceConfig,
}

impl DistanceClustering {
    /// Create with custom configuration.
    #[must_use]
    pub fn new(config: DistanceConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &DistanceConfig {
        &self.config
    }

    /// Nearest bucket with room whose centroid lies within the join radius.
    fn nearest_open_bucket(&self, buckets: &[CentroidAccumulator], point: Point) -> Option<usize> {
        let radius_sq = self.config.min_distance * self.config.min_distance;
        let mut best: Option<(usize, f64)> = None;

        for (idx, bucket) in buckets.iter().enumerate() {
            if bucket.count() >= self.config.max_cluster_size {
                continue;
            }
            let Some(centroid) = bucket.centroid() else {
                continue;
            };
            let dist_sq = centroid.distance_squared(&point);
            if dist_sq > radius_sq {
                continue;
            }
            // Strict comparison keeps the earlier bucket on ties.
            match best {
                Some((_, d)) if d <= dist_sq => {}
                _ => best = Some((idx, dist_sq)),
            }
        }

        best.map(|(idx, _)| idx)
    }
}

impl FeatureClustering for DistanceClustering {
    type State = DistanceState;

    fn name(&self) -> &'static str {
        "Distance"
    }

    fn strategy(&self) -> Strategy {
        Strategy::Distance
    }

    fn create_state(&self) -> Self::State {
        DistanceState::default()
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
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
        let radius = self.config.min_distance;
        if !(radius.is_finite() && radius >= 0.0) {
            return Err(ClusteringError::InvalidConfig(format!(
                "distance threshold must be finite and non-negative, got {radius}"
            )));
        }

        state.reset();
        labels.fill(UNCLUSTERED);

        state.order.extend(0..anchors.len());
        // sort_by is stable: equal x keeps input order.
        state
            .order
            .sort_by(|&a, &b| anchors[a].x.total_cmp(&anchors[b].x));

        let mut buckets = std::mem::take(&mut state.buckets);
        for &i in &state.order {
            cancel.check()?;
            let point = anchors[i];

            if let Some(idx) = self.nearest_open_bucket(&buckets, point) {
                buckets[idx].push(point);
                labels[i] = idx as i32;
            } else if buckets.len() < self.config.max_clusters && self.config.max_cluster_size > 0
            {
                let mut bucket = CentroidAccumulator::new();
                bucket.push(point);
                labels[i] = buckets.len() as i32;
                buckets.push(bucket);
            }
        }
        state.buckets = buckets;
        state.features_processed = anchors.len();

        Ok(state.buckets.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn run(config: DistanceConfig, anchors: &[Point]) -> (usize, Vec<i32>, DistanceState) {
        let algo = DistanceClustering::new(config);
        let mut state = algo.create_state();
        let mut labels = vec![0; anchors.len()];
        let n = algo
            .cluster(anchors, &mut state, &mut labels, &CancellationToken::new())
            .unwrap();
        (n, labels, state)
    }

    fn config(min_distance: f64) -> DistanceConfig {
        DistanceConfig {
            min_distance,
            ..Default::default()
        }
    }

    #[test]
    fn test_distance_state_reset() {
        let mut state = DistanceState::default();
        state.order.push(3);
        state.buckets.push(CentroidAccumulator::new());
        state.features_processed = 5;
        state.reset();
        assert!(state.order.is_empty());
        assert!(state.centroids().is_empty());
        assert_eq!(state.features_processed(), 0);
    }

    #[test]
    fn test_two_groups() {
        let anchors = [
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(101.0, 1.0),
        ];
        let (n, labels, state) = run(config(10.0), &anchors);

        assert_eq!(n, 2);
        assert_eq!(labels, vec![0, 1, 0, 1]);
        let centroids = state.centroids();
        assert_relative_eq!(centroids[0].x, 1.0);
        assert_relative_eq!(centroids[1].x, 100.5);
        assert_relative_eq!(centroids[1].y, 0.5);
    }

    #[test]
    fn test_processing_order_is_by_x() {
        // The x-sorted order seeds the bucket at x=0 first, even though the
        // feature at x=8 comes first in the input.
        let anchors = [Point::new(8.0, 0.0), Point::new(0.0, 0.0)];
        let (n, labels, state) = run(config(10.0), &anchors);
        assert_eq!(n, 1);
        assert_eq!(labels, vec![0, 0]);
        assert_relative_eq!(state.centroids()[0].x, 4.0);
    }

    #[test]
    fn test_radius_is_inclusive() {
        let anchors = [Point::new(0.0, 0.0), Point::new(3.0, 4.0)];
        let (n, labels, _) = run(config(5.0), &anchors);
        assert_eq!(n, 1);
        assert_eq!(labels, vec![0, 0]);
    }

    #[test]
    fn test_tie_goes_to_earlier_bucket() {
        // Equal x keeps input order, so (0, 5) is processed last and sits
        // exactly on the radius of both buckets.
        let anchors = [
            Point::new(0.0, 0.0),
            Point::new(0.0, 10.0),
            Point::new(0.0, 5.0),
        ];
        let (n, labels, state) = run(config(5.0), &anchors);
        assert_eq!(n, 2);
        assert_eq!(labels, vec![0, 1, 0]);
        assert_relative_eq!(state.centroids()[0].y, 2.5);

        let anchors = [
            Point::new(0.0, 10.0),
            Point::new(0.0, 0.0),
            Point::new(0.0, 5.0),
        ];
        let (_, labels, state) = run(config(5.0), &anchors);
        assert_eq!(labels, vec![0, 1, 0]);
        assert_relative_eq!(state.centroids()[0].y, 7.5);
    }

    #[test]
    fn test_full_bucket_forces_new_one() {
        let cfg = DistanceConfig {
            min_distance: 10.0,
            max_cluster_size: 2,
            ..Default::default()
        };
        let anchors = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
        ];
        let (n, labels, _) = run(cfg, &anchors);
        assert_eq!(n, 2);
        assert_eq!(labels, vec![0, 0, 1]);
    }

    #[test]
    fn test_max_clusters_leaves_rest_unclustered() {
        let cfg = DistanceConfig {
            min_distance: 1.0,
            max_clusters: 2,
            ..Default::default()
        };
        let anchors = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(10.5, 0.0),
        ];
        let (n, labels, _) = run(cfg, &anchors);
        assert_eq!(n, 2);
        assert_eq!(labels, vec![0, 1, UNCLUSTERED, 1]);
    }

    #[test]
    fn test_deterministic() {
        let anchors: Vec<Point> = (0..200)
            .map(|i| Point::new(f64::from((i * 37) % 101), f64::from((i * 17) % 53)))
            .collect();
        let (n1, labels1, _) = run(config(8.0), &anchors);
        let (n2, labels2, _) = run(config(8.0), &anchors);
        assert_eq!(n1, n2);
        assert_eq!(labels1, labels2);
    }

    #[test]
    fn test_label_mismatch() {
        let algo = DistanceClustering::default();
        let mut state = algo.create_state();
        let mut labels = vec![0; 1];
        let err = algo
            .cluster(
                &[Point::ORIGIN, Point::ORIGIN],
                &mut state,
                &mut labels,
                &CancellationToken::new(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            ClusteringError::LabelMismatch {
                features: 2,
                labels: 1
            }
        );
    }
}
