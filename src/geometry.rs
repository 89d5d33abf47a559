use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attribute::{AttrValue, Attributes};
use crate::error::RecordError;

/// Euclidean distance between two points.
#[inline]
pub fn distance(a: &Point, b: &Point) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// A 2D point carrying an open-ended attribute map.
///
/// Serializes in record shape: `x`, `y` and the attributes flattened next to
/// them. Deserializes from the same shape with the loader's rules, so nested
/// arrays and objects become text attributes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct Point {
    pub x: f64,
    pub y: f64,
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attributes(x: f64, y: f64, attributes: Attributes) -> Self {
        Self { x, y, attributes }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    /// Whether `name` is present and mapped to a value equal to `value`.
    pub fn has_attribute(&self, name: &str, value: &AttrValue) -> bool {
        self.attributes.get(name) == Some(value)
    }

    #[inline]
    pub fn distance_to(&self, other: &Point) -> f64 {
        distance(self, other)
    }
}

impl TryFrom<Value> for Point {
    type Error = RecordError;

    fn try_from(record: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut fields) = record else {
            return Err(RecordError::MissingCoordinates);
        };
        let mut coordinate = |name: &str| {
            fields
                .remove(name)
                .and_then(|v| v.as_f64())
                .ok_or(RecordError::MissingCoordinates)
        };
        let x = coordinate("x")?;
        let y = coordinate("y")?;
        let attributes = fields
            .iter()
            .map(|(name, value)| (name.clone(), AttrValue::from_json(value)))
            .collect();
        Ok(Point::with_attributes(x, y, attributes))
    }
}

/// One of the four equal parts of a subdivided node, in visiting order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Quadrant {
    NorthWest = 0,
    NorthEast = 1,
    SouthWest = 2,
    SouthEast = 3,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::NorthWest,
        Quadrant::NorthEast,
        Quadrant::SouthWest,
        Quadrant::SouthEast,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Axis-aligned rectangle.
///
/// Built from a center and a full width/height, stored as its edges so that
/// quadrants produced by [`Rectangle::quadrants`] share split lines exactly.
/// Containment and intersection include the edges.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RectSpec", into = "RectSpec")]
pub struct Rectangle {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

#[derive(Copy, Clone, Serialize, Deserialize)]
struct RectSpec {
    center_x: f64,
    center_y: f64,
    width: f64,
    height: f64,
}

impl From<RectSpec> for Rectangle {
    fn from(spec: RectSpec) -> Self {
        Rectangle::new(spec.center_x, spec.center_y, spec.width, spec.height)
    }
}

impl From<Rectangle> for RectSpec {
    fn from(rect: Rectangle) -> Self {
        RectSpec {
            center_x: rect.center_x(),
            center_y: rect.center_y(),
            width: rect.width(),
            height: rect.height(),
        }
    }
}

impl Rectangle {
    pub fn new(center_x: f64, center_y: f64, width: f64, height: f64) -> Self {
        let half_width = width / 2.0;
        let half_height = height / 2.0;
        Self {
            min_x: center_x - half_width,
            min_y: center_y - half_height,
            max_x: center_x + half_width,
            max_y: center_y + half_height,
        }
    }

    pub fn from_corners(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    pub fn center_x(&self) -> f64 {
        (self.min_x + self.max_x) / 2.0
    }

    pub fn center_y(&self) -> f64 {
        (self.min_y + self.max_y) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn half_width(&self) -> f64 {
        self.width() / 2.0
    }

    pub fn half_height(&self) -> f64 {
        self.height() / 2.0
    }

    /// Finite edges and non-negative extent on both axes.
    pub fn is_valid(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite())
            && self.min_x <= self.max_x
            && self.min_y <= self.max_y
    }

    #[inline]
    pub fn contains(&self, point: &Point) -> bool {
        self.contains_xy(point.x, point.y)
    }

    #[inline]
    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        self.min_x <= x && x <= self.max_x && self.min_y <= y && y <= self.max_y
    }

    /// False only when `other` lies strictly outside along either axis.
    #[inline]
    pub fn intersects(&self, other: &Rectangle) -> bool {
        !(other.min_x > self.max_x
            || other.max_x < self.min_x
            || other.min_y > self.max_y
            || other.max_y < self.min_y)
    }

    /// Lower bound on the distance from `point` to anything inside the
    /// rectangle. Zero when the point is inside or on an edge.
    #[inline]
    pub fn distance_to_point(&self, point: &Point) -> f64 {
        let dx = (self.min_x - point.x).max(0.0).max(point.x - self.max_x);
        let dy = (self.min_y - point.y).max(0.0).max(point.y - self.max_y);
        dx.hypot(dy)
    }

    /// Splits into NW, NE, SW, SE. Neighbouring quadrants share the parent's
    /// center lines, so the four exactly tile the parent.
    pub fn quadrants(&self) -> [Rectangle; 4] {
        let cx = self.center_x();
        let cy = self.center_y();
        [
            Rectangle::from_corners(self.min_x, self.min_y, cx, cy),
            Rectangle::from_corners(cx, self.min_y, self.max_x, cy),
            Rectangle::from_corners(self.min_x, cy, cx, self.max_y),
            Rectangle::from_corners(cx, cy, self.max_x, self.max_y),
        ]
    }

    /// First quadrant, in NW, NE, SW, SE order, that contains `point`,
    /// assuming `self` contains it. Points on a split line go west and north.
    #[inline]
    pub fn quadrant_of(&self, point: &Point) -> Quadrant {
        let west = point.x <= self.center_x();
        let north = point.y <= self.center_y();
        match (north, west) {
            (true, true) => Quadrant::NorthWest,
            (true, false) => Quadrant::NorthEast,
            (false, true) => Quadrant::SouthWest,
            (false, false) => Quadrant::SouthEast,
        }
    }
}
