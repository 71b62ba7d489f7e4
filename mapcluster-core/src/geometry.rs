//! Geometry encodings and anchor-point extraction.
//!
//! Features arrive with point, line or polygon geometry. Clustering works on
//! a single anchor per feature: the point itself, or the first vertex of the
//! first ring for lines and polygons. Full polygon centroids are not
//! computed.

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};
#[cfg(feature = "serde")]
use serde_json::Value;

/// Planar coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    /// X coordinate (easting).
    pub x: f64,
    /// Y coordinate (northing).
    pub y: f64,
}

impl Point {
    /// Anchor assigned to geometry that has no usable coordinate.
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    /// Creates a new point.
    #[inline]
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Computes the squared Euclidean distance to another point.
    #[inline]
    #[must_use]
    pub fn distance_squared(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Computes the Euclidean distance to another point.
    #[inline]
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Returns true if both coordinates are finite.
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Bounds {
    /// Minimum x.
    pub min_x: f64,
    /// Minimum y.
    pub min_y: f64,
    /// Maximum x.
    pub max_x: f64,
    /// Maximum y.
    pub max_y: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::empty()
    }
}

impl Bounds {
    /// Creates bounds from explicit corners.
    #[must_use]
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Bounds containing nothing; extending it with a point yields that point.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    /// Creates bounds from a `[minX, minY, maxX, maxY]` extent.
    #[must_use]
    pub fn from_extent(extent: [f64; 4]) -> Self {
        Self::new(extent[0], extent[1], extent[2], extent[3])
    }

    /// Minimal bounds containing every point.
    pub fn from_points<I: IntoIterator<Item = Point>>(points: I) -> Self {
        let mut bounds = Self::empty();
        for point in points {
            bounds.extend(point);
        }
        bounds
    }

    /// Grows the bounds to contain `point`.
    #[inline]
    pub fn extend(&mut self, point: Point) {
        self.min_x = self.min_x.min(point.x);
        self.min_y = self.min_y.min(point.y);
        self.max_x = self.max_x.max(point.x);
        self.max_y = self.max_y.max(point.y);
    }

    /// Returns true if `point` lies inside or on the edge.
    #[inline]
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    /// Returns true if the bounds are finite and not inverted.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
            && self.min_x <= self.max_x
            && self.min_y <= self.max_y
    }

    /// Width along x (0 for invalid bounds).
    #[must_use]
    pub fn width(&self) -> f64 {
        if self.is_valid() {
            self.max_x - self.min_x
        } else {
            0.0
        }
    }

    /// Height along y (0 for invalid bounds).
    #[must_use]
    pub fn height(&self) -> f64 {
        if self.is_valid() {
            self.max_y - self.min_y
        } else {
            0.0
        }
    }

    /// Area covered (0 for invalid or degenerate bounds).
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Returns true if the bounds enclose a positive area.
    #[must_use]
    pub fn has_area(&self) -> bool {
        self.area() > 0.0
    }
}

/// Geometry of a feature.
///
/// Lines carry a single path; polygons carry their rings, outer ring first.
/// Anything that could not be interpreted is `Empty`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Geometry {
    /// Missing or malformed geometry.
    #[default]
    Empty,
    /// Single coordinate pair.
    Point(Point),
    /// One ring or path.
    Line(Vec<Point>),
    /// Nested rings.
    Polygon(Vec<Vec<Point>>),
}

impl Geometry {
    /// Shorthand for a point geometry.
    #[must_use]
    pub fn point(x: f64, y: f64) -> Self {
        Self::Point(Point::new(x, y))
    }

    /// Representative coordinate, or `None` when the geometry has no
    /// usable vertex.
    #[must_use]
    pub fn try_anchor(&self) -> Option<Point> {
        let anchor = match self {
            Self::Empty => None,
            Self::Point(point) => Some(*point),
            Self::Line(path) => path.first().copied(),
            Self::Polygon(rings) => rings.first().and_then(|ring| ring.first()).copied(),
        };
        anchor.filter(Point::is_finite)
    }

    /// Representative coordinate; [`Point::ORIGIN`] for malformed geometry.
    #[must_use]
    pub fn anchor(&self) -> Point {
        self.try_anchor().unwrap_or(Point::ORIGIN)
    }
}

#[cfg(feature = "serde")]
impl Geometry {
    /// Interprets a JSON geometry object.
    ///
    /// Accepts a GeoJSON-style `coordinates` member or Esri-style `x`/`y`,
    /// `paths` and `rings` members. A bare coordinate array is read as if it
    /// were the `coordinates` member. Unrecognised input becomes `Empty`.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) => {
                if let Some(coordinates) = map.get("coordinates") {
                    return Self::from_coordinates(coordinates);
                }
                if let (Some(x), Some(y)) = (
                    map.get("x").and_then(Value::as_f64),
                    map.get("y").and_then(Value::as_f64),
                ) {
                    return Self::point(x, y);
                }
                if let Some(rings) = map.get("rings") {
                    return Self::from_coordinates(rings);
                }
                if let Some(paths) = map.get("paths") {
                    return match Self::from_coordinates(paths) {
                        Self::Polygon(mut paths) if !paths.is_empty() => {
                            Self::Line(paths.swap_remove(0))
                        }
                        other => other,
                    };
                }
                Self::Empty
            }
            Value::Array(_) => Self::from_coordinates(value),
            _ => Self::Empty,
        }
    }

    /// Interprets a coordinate array by nesting depth: pair, ring or nested
    /// rings. Deeper nesting collapses to its first element.
    #[must_use]
    pub fn from_coordinates(value: &Value) -> Self {
        if let Some(point) = parse_pair(value) {
            return Self::Point(point);
        }
        let Some(items) = value.as_array() else {
            return Self::Empty;
        };
        let Some(first) = items.first() else {
            return Self::Empty;
        };

        if parse_pair(first).is_some() {
            Self::Line(items.iter().filter_map(parse_pair).collect())
        } else if first
            .as_array()
            .and_then(|inner| inner.first())
            .and_then(parse_pair)
            .is_some()
        {
            Self::Polygon(items.iter().map(parse_ring).collect())
        } else if first.is_array() {
            Self::from_coordinates(first)
        } else {
            Self::Empty
        }
    }

    /// JSON `coordinates` value for this geometry (`null` when empty).
    #[must_use]
    pub fn to_coordinates(&self) -> Value {
        fn pair(point: &Point) -> Value {
            Value::from(vec![point.x, point.y])
        }
        fn ring(points: &[Point]) -> Value {
            Value::Array(points.iter().map(pair).collect())
        }
        match self {
            Self::Empty => Value::Null,
            Self::Point(point) => pair(point),
            Self::Line(path) => ring(path),
            Self::Polygon(rings) => {
                Value::Array(rings.iter().map(Vec::as_slice).map(ring).collect())
            }
        }
    }
}

#[cfg(feature = "serde")]
fn parse_pair(value: &Value) -> Option<Point> {
    match value.as_array()?.as_slice() {
        [x, y, ..] => Some(Point::new(x.as_f64()?, y.as_f64()?)),
        _ => None,
    }
}

#[cfg(feature = "serde")]
fn parse_ring(value: &Value) -> Vec<Point> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(parse_pair).collect())
        .unwrap_or_default()
}

#[cfg(feature = "serde")]
impl Serialize for Geometry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serde_json::Map::with_capacity(1);
        map.insert("coordinates".to_string(), self.to_coordinates());
        Value::Object(map).serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Geometry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}
