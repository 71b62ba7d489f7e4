//! High-level processing helpers that combine labelling and cluster assembly.

use std::time::Instant;

use rayon::prelude::*;

use crate::{DensityClustering, DensityConfig, DistanceClustering, DistanceConfig};
use crate::{GridClustering, GridConfig};
use mapcluster_core::clustering::{
    Cluster, ClusteringConfig, ClusteringResult, ClusteringStatistics, FeatureClustering,
    Strategy, UNCLUSTERED,
};
use mapcluster_core::feature::Feature;
use mapcluster_core::geometry::{Bounds, Point};
use mapcluster_core::{CancellationToken, ClusteringError};

/// Anchor points of a feature list.
#[derive(Debug, Clone, Default)]
pub struct Anchors {
    /// One anchor per feature, in input order.
    pub points: Vec<Point>,
    /// Features whose geometry fell back to the origin.
    pub sentinels: usize,
}

/// Extracts one anchor per feature; malformed geometry maps to the origin.
#[must_use]
pub fn extract_anchors(features: &[Feature]) -> Anchors {
    let extracted: Vec<Option<Point>> = features
        .par_iter()
        .map(|feature| feature.geometry.try_anchor())
        .collect();
    let sentinels = extracted.iter().filter(|anchor| anchor.is_none()).count();
    Anchors {
        points: extracted
            .into_iter()
            .map(|anchor| anchor.unwrap_or(Point::ORIGIN))
            .collect(),
        sentinels,
    }
}

/// Label anchors with a clustering algorithm, allocating fresh state.
pub fn label_anchors<A: FeatureClustering>(
    algo: &A,
    anchors: &[Point],
    cancel: &CancellationToken,
) -> Result<(Vec<i32>, usize), ClusteringError> {
    let mut state = algo.create_state();
    let mut labels = vec![UNCLUSTERED; anchors.len()];
    let num_clusters = algo.cluster(anchors, &mut state, &mut labels, cancel)?;
    Ok((labels, num_clusters))
}

/// Move features into clusters according to their labels.
///
/// Labels outside `0..num_clusters` send the feature to the unclustered
/// list. Clusters that end up empty are dropped; the rest are numbered
/// `"<strategy>-<index>"` in label order and summarised in parallel.
#[must_use]
pub fn assemble_clusters(
    features: Vec<Feature>,
    labels: &[i32],
    num_clusters: usize,
    strategy: Strategy,
) -> (Vec<Cluster>, Vec<Feature>) {
    let mut buckets: Vec<Vec<Feature>> = vec![Vec::new(); num_clusters];
    let mut unclustered = Vec::new();

    for (feature, &label) in features.into_iter().zip(labels) {
        match usize::try_from(label).ok().and_then(|l| buckets.get_mut(l)) {
            Some(bucket) => bucket.push(feature),
            None => unclustered.push(feature),
        }
    }

    let mut clusters: Vec<Cluster> = buckets
        .into_iter()
        .filter(|members| !members.is_empty())
        .enumerate()
        .map(|(idx, members)| Cluster::from_members(format!("{strategy}-{idx}"), members))
        .collect();
    clusters.par_iter_mut().for_each(Cluster::summarize);

    (clusters, unclustered)
}

/// Run one algorithm over the features and build the full result.
pub fn cluster_features_with<A: FeatureClustering>(
    algo: &A,
    features: Vec<Feature>,
    anchors: &[Point],
    cancel: &CancellationToken,
    started: Instant,
) -> Result<ClusteringResult, ClusteringError> {
    if features.len() != anchors.len() {
        return Err(ClusteringError::LabelMismatch {
            features: features.len(),
            labels: anchors.len(),
        });
    }

    let total_features = features.len();
    let strategy = algo.strategy();
    let (labels, num_clusters) = label_anchors(algo, anchors, cancel)?;
    cancel.check()?;

    let (clusters, unclustered) = assemble_clusters(features, &labels, num_clusters, strategy);
    let stats = ClusteringStatistics::new(&clusters, total_features, strategy, started.elapsed());

    log::debug!(
        "{} clustering: {} features, {} clusters, {} unclustered",
        algo.name(),
        total_features,
        clusters.len(),
        unclustered.len()
    );

    Ok(ClusteringResult {
        clusters,
        unclustered,
        stats,
    })
}

/// Run a concrete strategy with parameters taken from `config`.
///
/// `extent` is the grid layout extent; the other strategies ignore it.
/// [`Strategy::Adaptive`] is not concrete and falls back to distance
/// clustering; use the dispatcher to resolve it.
pub fn cluster_features(
    strategy: Strategy,
    config: &ClusteringConfig,
    extent: Bounds,
    features: Vec<Feature>,
    anchors: &[Point],
    cancel: &CancellationToken,
    started: Instant,
) -> Result<ClusteringResult, ClusteringError> {
    match strategy {
        Strategy::Grid => {
            let algo = GridClustering::new(GridConfig::from_clustering(config, extent));
            cluster_features_with(&algo, features, anchors, cancel, started)
        }
        Strategy::Density => {
            let algo = DensityClustering::new(DensityConfig::from_clustering(config));
            cluster_features_with(&algo, features, anchors, cancel, started)
        }
        Strategy::Distance | Strategy::Adaptive => {
            let algo = DistanceClustering::new(DistanceConfig::from_clustering(config));
            cluster_features_with(&algo, features, anchors, cancel, started)
        }
    }
}
