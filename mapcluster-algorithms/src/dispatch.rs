//! Adaptive strategy selection and the request entry point.
#![allow(clippy::cast_precision_loss, clippy::unused_self)]

use std::time::Instant;

use crate::processing::{cluster_features, extract_anchors, Anchors};
use mapcluster_core::clustering::{
    AdaptiveThresholds, ClusteringConfig, ClusteringResult, Strategy,
};
use mapcluster_core::geometry::{Bounds, Point};
use mapcluster_core::request::{ClusterRequest, ViewParams};
use mapcluster_core::{CancellationToken, ClusteringError};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Extent used for density estimation and grid layout.
///
/// The view extent when it is finite with positive area, otherwise the
/// bounding box of the anchors.
#[must_use]
pub fn resolve_extent(view: &ViewParams, anchors: &[Point]) -> Bounds {
    let extent = view.extent_bounds();
    if extent.has_area() {
        extent
    } else {
        Bounds::from_points(anchors.iter().copied())
    }
}

/// Features per unit area; 0 when the extent has no area.
#[must_use]
pub fn estimate_density(feature_count: usize, extent: &Bounds) -> f64 {
    if extent.has_area() {
        feature_count as f64 / extent.area()
    } else {
        0.0
    }
}

/// Concrete strategy for a density.
///
/// Above `grid_density` → grid; from `density_density` up to and including
/// `grid_density` → density; below → distance.
#[must_use]
pub fn select_strategy(density: f64, thresholds: &AdaptiveThresholds) -> Strategy {
    if density > thresholds.grid_density {
        Strategy::Grid
    } else if density >= thresholds.density_density {
        Strategy::Density
    } else {
        Strategy::Distance
    }
}

/// Outcome of planning a request, before any clustering runs.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DispatchPlan {
    /// Strategy that will run (never adaptive).
    pub strategy: Strategy,
    /// Whether the strategy came from the adaptive thresholds.
    pub adaptive: bool,
    /// Resolved extent.
    pub extent: Bounds,
    /// Estimated density over the extent.
    pub density: f64,
    /// Number of features.
    pub feature_count: usize,
    /// Features whose anchor fell back to the origin.
    pub sentinel_anchors: usize,
    /// Configuration after invalid values were reset.
    pub config: ClusteringConfig,
    /// Fields that were reset to their defaults.
    pub reset_fields: Vec<&'static str>,
}

/// Selects a strategy from point density and runs one request.
///
/// Stateless: every call works on its own request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptiveDispatcher;

impl AdaptiveDispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Plans a request without clustering it.
    #[must_use]
    pub fn plan(&self, request: &ClusterRequest) -> DispatchPlan {
        let anchors = extract_anchors(&request.features);
        self.plan_with_anchors(request, &anchors)
    }

    fn plan_with_anchors(&self, request: &ClusterRequest, anchors: &Anchors) -> DispatchPlan {
        let mut config = request.config.clone();
        let reset_fields = config.sanitize();
        if !reset_fields.is_empty() {
            log::warn!(
                "invalid clustering config values reset to defaults: {}",
                reset_fields.join(", ")
            );
        }

        let extent = resolve_extent(&request.view_params, &anchors.points);
        let density = estimate_density(anchors.points.len(), &extent);
        let (strategy, adaptive) = match config.strategy {
            Strategy::Adaptive => (select_strategy(density, &config.adaptive), true),
            explicit => (explicit, false),
        };

        DispatchPlan {
            strategy,
            adaptive,
            extent,
            density,
            feature_count: anchors.points.len(),
            sentinel_anchors: anchors.sentinels,
            config,
            reset_fields,
        }
    }

    /// Clusters one request.
    ///
    /// Malformed features never fail the request; an empty feature list
    /// yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns [`ClusteringError::Cancelled`] if `cancel` fires during the
    /// run.
    pub fn dispatch(
        &self,
        request: ClusterRequest,
        cancel: &CancellationToken,
    ) -> Result<ClusteringResult, ClusteringError> {
        let started = Instant::now();
        cancel.check()?;

        let anchors = extract_anchors(&request.features);
        let plan = self.plan_with_anchors(&request, &anchors);
        if plan.sentinel_anchors > 0 {
            log::warn!(
                "{} of {} features have malformed geometry; anchored at the origin",
                plan.sentinel_anchors,
                plan.feature_count
            );
        }
        log::debug!(
            "dispatching {} features: density {:.6} over {:?}, strategy {}{}",
            plan.feature_count,
            plan.density,
            plan.extent,
            plan.strategy,
            if plan.adaptive { " (adaptive)" } else { "" }
        );

        if request.features.is_empty() {
            return Ok(ClusteringResult::empty(plan.strategy));
        }

        cluster_features(
            plan.strategy,
            &plan.config,
            plan.extent,
            request.features,
            &anchors.points,
            cancel,
            started,
        )
    }
}
