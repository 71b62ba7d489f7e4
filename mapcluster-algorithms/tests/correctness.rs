#![allow(clippy::uninlined_format_args, clippy::cast_precision_loss)]
use approx::assert_relative_eq;
use mapcluster_algorithms::{AdaptiveDispatcher, ClusteringConfig, ClusteringResult, Strategy};
use mapcluster_core::{CancellationToken, ClusterRequest, Feature, Geometry, Point, ViewParams};

/// Three loose groups plus scattered singles and two malformed features.
fn generate_features() -> Vec<Feature> {
    let mut features = Vec::new();
    for (cx, cy) in [(100.0, 100.0), (400.0, 120.0), (250.0, 380.0)] {
        for i in 0..40 {
            let dx = f64::from(i % 7) * 3.0;
            let dy = f64::from(i / 7) * 3.0;
            features.push(
                Feature::point(cx + dx, cy + dy)
                    .with_attribute("weight", f64::from(i))
                    .with_attribute("kind", if i % 3 == 0 { "depot" } else { "stop" }),
            );
        }
    }
    for i in 0..15 {
        let t = f64::from(i);
        features.push(Feature::point(37.0 * t % 500.0, 91.0 * t % 500.0));
    }
    features.push(Feature::new(Geometry::Empty));
    features.push(Feature::new(Geometry::Line(Vec::new())));
    features
}

fn run(features: Vec<Feature>, config: ClusteringConfig, extent: [f64; 4]) -> ClusteringResult {
    let request = ClusterRequest::new(features, config, ViewParams::new(12.0, extent));
    AdaptiveDispatcher::new()
        .dispatch(request, &CancellationToken::new())
        .unwrap()
}

fn concrete_strategies() -> [Strategy; 3] {
    [Strategy::Grid, Strategy::Distance, Strategy::Density]
}

fn name_of(feature: &Feature) -> String {
    feature
        .attribute("name")
        .map(ToString::to_string)
        .unwrap_or_default()
}

#[test]
fn test_conservation_for_every_strategy() {
    for strategy in concrete_strategies() {
        let features = generate_features();
        let total = features.len();
        let config = ClusteringConfig::new()
            .with_strategy(strategy)
            .with_min_distance(20.0)
            .with_grid_cell_size(60.0);
        let result = run(features, config, [0.0, 0.0, 500.0, 500.0]);

        assert_eq!(result.stats.strategy, strategy);
        assert_eq!(result.stats.total_features, total);
        assert_eq!(
            result.clustered_count() + result.unclustered.len(),
            total,
            "{} lost or duplicated features",
            strategy
        );
        assert!(result.is_conserved());
        assert!(!result.clusters.is_empty(), "{} found no clusters", strategy);
    }
}

#[test]
fn test_centroid_and_bounds_match_members() {
    for strategy in concrete_strategies() {
        let config = ClusteringConfig::new()
            .with_strategy(strategy)
            .with_min_distance(20.0)
            .with_grid_cell_size(60.0);
        let result = run(generate_features(), config, [0.0, 0.0, 500.0, 500.0]);

        for cluster in &result.clusters {
            assert_eq!(cluster.count, cluster.members.len());
            let n = cluster.members.len() as f64;
            let mean_x = cluster.members.iter().map(|m| m.anchor().x).sum::<f64>() / n;
            let mean_y = cluster.members.iter().map(|m| m.anchor().y).sum::<f64>() / n;
            assert_relative_eq!(cluster.centroid.x, mean_x, epsilon = 1e-9);
            assert_relative_eq!(cluster.centroid.y, mean_y, epsilon = 1e-9);
            for member in &cluster.members {
                assert!(cluster.bounds.contains(member.anchor()));
            }
        }
    }
}

#[test]
fn test_cap_respected_for_every_strategy() {
    for strategy in concrete_strategies() {
        let features = generate_features();
        let total = features.len();
        let config = ClusteringConfig::new()
            .with_strategy(strategy)
            .with_min_distance(40.0)
            .with_grid_cell_size(100.0)
            .with_max_features_per_cluster(7);
        let result = run(features, config, [0.0, 0.0, 500.0, 500.0]);

        for cluster in &result.clusters {
            assert!(
                cluster.count <= 7,
                "{} cluster {} has {} members",
                strategy,
                cluster.id,
                cluster.count
            );
        }
        assert_eq!(result.clustered_count() + result.unclustered.len(), total);
    }
}

#[test]
fn test_cluster_ids_are_sequential() {
    let config = ClusteringConfig::new()
        .with_strategy(Strategy::Grid)
        .with_grid_cell_size(60.0);
    let result = run(generate_features(), config, [0.0, 0.0, 500.0, 500.0]);
    for (i, cluster) in result.clusters.iter().enumerate() {
        assert_eq!(cluster.id, format!("grid-{}", i));
    }
}

#[test]
fn test_distance_is_deterministic() {
    let config = ClusteringConfig::new()
        .with_strategy(Strategy::Distance)
        .with_min_distance(25.0);
    let first = run(generate_features(), config.clone(), [0.0, 0.0, 500.0, 500.0]);
    let second = run(generate_features(), config, [0.0, 0.0, 500.0, 500.0]);

    assert_eq!(first.clusters.len(), second.clusters.len());
    for (a, b) in first.clusters.iter().zip(&second.clusters) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.members, b.members);
        assert_eq!(a.centroid, b.centroid);
    }
    assert_eq!(first.unclustered, second.unclustered);
}

#[test]
fn test_grid_single_cell_over_extent() {
    let features: Vec<Feature> = (0..5)
        .map(|i| Feature::point(10.0 * f64::from(i), 5.0 * f64::from(i)))
        .collect();

    let config = ClusteringConfig::new()
        .with_strategy(Strategy::Grid)
        .with_grid_cell_size(1000.0);
    let result = run(features.clone(), config.clone(), [0.0, 0.0, 100.0, 100.0]);
    assert_eq!(result.clusters.len(), 1);
    assert_eq!(result.clusters[0].count, 5);
    assert!(result.unclustered.is_empty());

    let result = run(features, config.with_min_points(10), [0.0, 0.0, 100.0, 100.0]);
    assert!(result.clusters.is_empty());
    assert_eq!(result.unclustered.len(), 5);
}

#[test]
fn test_grid_divisions() {
    let features = vec![
        Feature::point(0.0, 0.0),
        Feature::point(4.0, 4.0),
        Feature::point(10.0, 10.0),
        Feature::point(6.0, 9.0),
    ];
    let config = ClusteringConfig::new()
        .with_strategy(Strategy::Grid)
        .with_grid_divisions(2)
        .with_min_points(2);
    let result = run(features, config, [0.0, 0.0, 10.0, 10.0]);

    assert_eq!(result.clusters.len(), 2);
    assert_eq!(result.clusters[0].count, 2);
    assert_eq!(result.clusters[1].count, 2);
    assert_relative_eq!(result.clusters[1].bounds.max_x, 10.0);
}

#[test]
fn test_density_chain() {
    let features = vec![
        Feature::point(0.0, 0.0),
        Feature::point(1.0, 1.0),
        Feature::point(2.0, 2.0),
        Feature::point(100.0, 100.0),
        Feature::point(101.0, 101.0),
    ];
    let config = ClusteringConfig::new()
        .with_strategy(Strategy::Density)
        .with_min_distance(5.0)
        .with_density_threshold(2);
    let result = run(features, config, [0.0, 0.0, 200.0, 200.0]);

    assert_eq!(result.clusters.len(), 2);
    assert!(result.unclustered.is_empty());

    let anchors = |i: usize| -> Vec<Point> {
        result.clusters[i]
            .members
            .iter()
            .map(Feature::anchor)
            .collect()
    };
    assert_eq!(
        anchors(0),
        vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0)
        ]
    );
    assert_eq!(
        anchors(1),
        vec![Point::new(100.0, 100.0), Point::new(101.0, 101.0)]
    );
}

#[test]
fn test_malformed_coordinates_counted_once() {
    for strategy in concrete_strategies() {
        let features = vec![
            Feature::new(Geometry::Empty).with_attribute("name", "broken"),
            Feature::point(300.0, 300.0),
            Feature::point(301.0, 300.0),
        ];
        let config = ClusteringConfig::new()
            .with_strategy(strategy)
            .with_min_distance(5.0)
            .with_density_threshold(2);
        let result = run(features, config, [0.0, 0.0, 400.0, 400.0]);

        assert_eq!(result.stats.total_features, 3);
        let in_clusters = result
            .clusters
            .iter()
            .flat_map(|c| &c.members)
            .filter(|m| name_of(m) == "broken")
            .count();
        let in_unclustered = result
            .unclustered
            .iter()
            .filter(|m| name_of(m) == "broken")
            .count();
        assert_eq!(in_clusters + in_unclustered, 1, "{}", strategy);
        assert_eq!(
            result
                .unclustered
                .iter()
                .chain(result.clusters.iter().flat_map(|c| &c.members))
                .find(|m| name_of(m) == "broken")
                .map(Feature::anchor),
            Some(Point::ORIGIN)
        );
    }
}

fn border_scene(left_first: bool) -> Vec<Feature> {
    let named = |name: &str, x: f64, y: f64| Feature::point(x, y).with_attribute("name", name);
    let left = vec![
        named("left-core", 1.0, 0.0),
        named("left-a", 1.0, 0.5),
        named("left-b", 1.0, -0.5),
    ];
    let right = vec![
        named("right-core", 3.0, 0.0),
        named("right-a", 3.0, 0.5),
        named("right-b", 3.0, -0.5),
    ];
    let border = named("border", 2.0, 0.0);

    let (first, second) = if left_first {
        (left, right)
    } else {
        (right, left)
    };
    let mut features = first;
    features.push(border);
    features.extend(second);
    features
}

fn cluster_of_border(result: &ClusteringResult) -> Option<Vec<String>> {
    result
        .clusters
        .iter()
        .find(|c| c.members.iter().any(|m| name_of(m) == "border"))
        .map(|c| c.members.iter().map(name_of).collect())
}

#[test]
fn test_border_tie_break_first_expansion_wins() {
    let config = ClusteringConfig::new()
        .with_strategy(Strategy::Density)
        .with_min_distance(1.0)
        .with_density_threshold(4);

    let result = run(border_scene(true), config.clone(), [0.0, -1.0, 4.0, 1.0]);
    assert_eq!(result.clusters.len(), 2);
    let members = cluster_of_border(&result).unwrap();
    assert!(members.contains(&"left-core".to_string()));
    assert_eq!(result.clusters[1].count, 3);

    let result = run(border_scene(false), config, [0.0, -1.0, 4.0, 1.0]);
    assert_eq!(result.clusters.len(), 2);
    let members = cluster_of_border(&result).unwrap();
    assert!(members.contains(&"right-core".to_string()));
    assert_eq!(result.clusters[1].count, 3);
}

#[test]
fn test_adaptive_thresholds() {
    let dispatcher = AdaptiveDispatcher::new();
    let plan_for = |count: usize, extent: [f64; 4]| {
        let request = ClusterRequest::new(
            vec![Feature::point(0.5, 0.5); count],
            ClusteringConfig::default(),
            ViewParams::new(10.0, extent),
        );
        dispatcher.plan(&request)
    };

    let unit = [0.0, 0.0, 1.0, 1.0];
    assert_eq!(plan_for(1001, unit).strategy, Strategy::Grid);
    assert_eq!(plan_for(1000, unit).strategy, Strategy::Density);
    assert_eq!(plan_for(100, unit).strategy, Strategy::Density);
    assert_eq!(plan_for(999, [0.0, 0.0, 10.0, 1.0]).strategy, Strategy::Distance);

    let plan = plan_for(1000, unit);
    assert!(plan.adaptive);
    assert_relative_eq!(plan.density, 1000.0);
}

#[test]
fn test_adaptive_run_reports_concrete_strategy() {
    let result = run(
        generate_features(),
        ClusteringConfig::default(),
        [0.0, 0.0, 500.0, 500.0],
    );
    assert_eq!(result.stats.strategy, Strategy::Distance);
    assert!(result.is_conserved());
}

#[test]
fn test_attribute_summary_attached() {
    let config = ClusteringConfig::new()
        .with_strategy(Strategy::Distance)
        .with_min_distance(30.0);
    let result = run(generate_features(), config, [0.0, 0.0, 500.0, 500.0]);
    let largest = result
        .clusters
        .iter()
        .max_by_key(|c| c.count)
        .unwrap();
    assert!(largest.attribute_summary.contains_key("weight"));
    assert!(largest.attribute_summary.contains_key("kind"));
}
