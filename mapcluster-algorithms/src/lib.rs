//! mapcluster-algorithms: Clustering algorithms for map features.
//!
//! This crate provides three interchangeable clustering algorithms and the
//! adaptive dispatcher that chooses between them:
//! - **Grid** - fixed-size cell binning over the view extent
//! - **Distance** - greedy nearest-centroid assignment, O(n log n + n k)
//! - **Density** - DBSCAN-style expansion with first-expansion-wins borders
//!
//! [`AdaptiveDispatcher::dispatch`] is the single request/response entry
//! point.
#![warn(missing_docs)]

mod density;
mod dispatch;
mod distance;
mod grid;
mod processing;
pub mod spatial;

pub use density::{DensityClustering, DensityConfig, DensityState};
pub use dispatch::{
    estimate_density, resolve_extent, select_strategy, AdaptiveDispatcher, DispatchPlan,
};
pub use distance::{DistanceClustering, DistanceConfig, DistanceState};
pub use grid::{GridClustering, GridConfig, GridState};
pub use processing::{
    assemble_clusters, cluster_features, cluster_features_with, extract_anchors, label_anchors,
    Anchors,
};
pub use spatial::SpatialGrid;

// Re-export core clustering traits
pub use mapcluster_core::clustering::{
    ClusteringConfig, ClusteringResult, ClusteringStatistics, FeatureClustering, Strategy,
};
