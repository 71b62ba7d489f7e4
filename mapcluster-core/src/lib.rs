//! mapcluster-core: Core traits and types for map feature clustering.
//!
//! This crate provides the data model (features, geometry, clusters),
//! anchor-point extraction, attribute summaries, configuration and the
//! request/response messages shared by the algorithms and the worker.
//!

pub mod cancel;
pub mod clustering;
pub mod error;
pub mod feature;
pub mod geometry;
pub mod request;
pub mod summary;

pub use cancel::CancellationToken;
pub use clustering::{
    AdaptiveThresholds, CentroidAccumulator, Cluster, ClusteringConfig, ClusteringResult,
    ClusteringState, ClusteringStatistics, FeatureClustering, Strategy, UNCLUSTERED,
};
pub use error::{ClusteringError, Error, Result};
pub use feature::{AttributeValue, Attributes, Feature};
pub use geometry::{Bounds, Geometry, Point};
pub use request::{ClusterRequest, ViewParams};
pub use summary::{
    summarize_attributes, AttributeSummary, CategoricalSummary, CategoryShare, FieldSummary,
    NumericSummary,
};
