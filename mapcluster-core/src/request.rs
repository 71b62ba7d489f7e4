//! Request message accepted by the clustering engine.

use crate::clustering::ClusteringConfig;
use crate::feature::Feature;
use crate::geometry::Bounds;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Map view the features are displayed in.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ViewParams {
    /// Map zoom level.
    pub zoom: f64,
    /// Visible extent as `[minX, minY, maxX, maxY]`.
    pub extent: [f64; 4],
}

impl ViewParams {
    /// Creates view parameters.
    #[must_use]
    pub fn new(zoom: f64, extent: [f64; 4]) -> Self {
        Self { zoom, extent }
    }

    /// The extent as bounds.
    #[must_use]
    pub fn extent_bounds(&self) -> Bounds {
        Bounds::from_extent(self.extent)
    }
}

/// One clustering request: features, configuration and view.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct ClusterRequest {
    /// Features to cluster; moved into the result.
    pub features: Vec<Feature>,
    /// Algorithm configuration.
    pub config: ClusteringConfig,
    /// View parameters.
    pub view_params: ViewParams,
}

impl ClusterRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(features: Vec<Feature>, config: ClusteringConfig, view_params: ViewParams) -> Self {
        Self {
            features,
            config,
            view_params,
        }
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;
    use crate::clustering::Strategy;
    use serde_json::json;

    #[test]
    fn test_request_from_json_with_defaults() {
        let request: ClusterRequest = serde_json::from_value(json!({
            "features": [
                {"geometry": {"coordinates": [1, 2]}, "attributes": {"name": "a"}},
                {"geometry": {"coordinates": null}, "attributes": {}}
            ],
            "config": {"strategy": "density", "minDistance": 5, "densityThreshold": 2},
            "viewParams": {"zoom": 12, "extent": [0, 0, 100, 50]}
        }))
        .unwrap();

        assert_eq!(request.features.len(), 2);
        assert_eq!(request.config.strategy, Strategy::Density);
        assert!((request.config.min_distance - 5.0).abs() < f64::EPSILON);
        assert_eq!(request.config.density_threshold, 2);
        assert_eq!(
            request.config.max_features_per_cluster,
            ClusteringConfig::default().max_features_per_cluster
        );
        assert!((request.view_params.extent_bounds().area() - 5000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_request() {
        let request: ClusterRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.features.is_empty());
        assert_eq!(request.config, ClusteringConfig::default());
    }
}
