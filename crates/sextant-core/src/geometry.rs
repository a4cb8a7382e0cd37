//! Geometric primitives for diagram element placement.
//!
//! - [`Point`] - A position in diagram space, also used as a translation vector
//! - [`Size`] - Width and height of a shape
//! - [`Bounds`] - An axis-aligned rectangle
//!
//! The coordinate system matches BPMN DI: origin at the top-left, X grows to
//! the right and Y grows downward.

use serde::{Deserialize, Serialize};

/// A 2D point in diagram coordinates.
///
/// # Examples
///
/// ```
/// # use sextant_core::geometry::Point;
/// let drop = Point::new(500.0, 500.0);
/// let origin = Point::new(120.0, 80.0);
///
/// let delta = drop.sub_point(origin);
/// assert_eq!(delta, Point::new(380.0, 420.0));
/// assert_eq!(origin.add_point(delta), drop);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    x: f32,
    y: f32,
}

impl Point {
    /// Creates a new point
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the x-coordinate
    pub fn x(self) -> f32 {
        self.x
    }

    /// Returns the y-coordinate
    pub fn y(self) -> f32 {
        self.y
    }

    /// Component-wise sum of two points
    pub fn add_point(self, other: Point) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    /// Component-wise difference of two points
    pub fn sub_point(self, other: Point) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    /// Point halfway between `self` and `other`
    pub fn midpoint(self, other: Point) -> Self {
        Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Width and height of a shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    width: f32,
    height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn width(self) -> f32 {
        self.width
    }

    pub fn height(self) -> f32 {
        self.height
    }

    /// Area covered by a rectangle of this size
    pub fn area(self) -> f32 {
        self.width * self.height
    }
}

/// An axis-aligned rectangle, stored as its minimum and maximum corners.
///
/// Shapes and labels are placed with bounds; connections derive theirs from
/// their waypoints with [`Bounds::from_points`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
}

impl Bounds {
    /// Creates bounds of `size` centered on `center`
    pub fn new_from_center(center: Point, size: Size) -> Self {
        let half_width = size.width / 2.0;
        let half_height = size.height / 2.0;
        Self {
            min_x: center.x - half_width,
            min_y: center.y - half_height,
            max_x: center.x + half_width,
            max_y: center.y + half_height,
        }
    }

    /// Creates bounds of `size` whose top-left corner is `top_left`
    pub fn new_from_top_left(top_left: Point, size: Size) -> Self {
        Self {
            min_x: top_left.x,
            min_y: top_left.y,
            max_x: top_left.x + size.width,
            max_y: top_left.y + size.height,
        }
    }

    /// Smallest bounds containing every point, or `None` for an empty slice.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let start = Self::new_from_top_left(*first, Size::default());
        Some(rest.iter().fold(start, |acc, point| {
            acc.merge(&Self::new_from_top_left(*point, Size::default()))
        }))
    }

    pub fn max_y(self) -> f32 {
        self.max_y
    }

    pub fn width(self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(self) -> f32 {
        self.max_y - self.min_y
    }

    /// Returns the top-left corner
    pub fn min_point(self) -> Point {
        Point::new(self.min_x, self.min_y)
    }

    /// Returns the center point
    pub fn center(self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn to_size(self) -> Size {
        Size::new(self.width(), self.height())
    }

    /// Smallest bounds that contain both `self` and `other`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sextant_core::geometry::{Bounds, Point, Size};
    /// let task = Bounds::new_from_top_left(Point::new(100.0, 100.0), Size::new(100.0, 80.0));
    /// let event = Bounds::new_from_top_left(Point::new(300.0, 122.0), Size::new(36.0, 36.0));
    ///
    /// let selection = task.merge(&event);
    /// assert_eq!(selection.min_point(), Point::new(100.0, 100.0));
    /// assert_eq!(selection.to_size(), Size::new(236.0, 80.0));
    /// ```
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Moves the bounds by `offset`, keeping the size.
    pub fn translate(&self, offset: Point) -> Self {
        Self {
            min_x: self.min_x + offset.x,
            min_y: self.min_y + offset.y,
            max_x: self.max_x + offset.x,
            max_y: self.max_y + offset.y,
        }
    }

    /// Checks whether `point` lies inside or on the border.
    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_arithmetic() {
        let p = Point::new(10.0, 20.0);
        let q = Point::new(4.0, -6.0);

        assert_eq!(p.add_point(q), Point::new(14.0, 14.0));
        assert_eq!(p.sub_point(q), Point::new(6.0, 26.0));
        assert_eq!(p.midpoint(q), Point::new(7.0, 7.0));
    }

    #[test]
    fn test_bounds_constructors_agree() {
        let size = Size::new(100.0, 80.0);
        let a = Bounds::new_from_top_left(Point::new(450.0, 460.0), size);
        let b = Bounds::new_from_center(Point::new(500.0, 500.0), size);

        assert_eq!(a, b);
        assert_eq!(a.center(), Point::new(500.0, 500.0));
        assert_eq!(a.to_size(), size);
    }

    #[test]
    fn test_bounds_from_points() {
        let waypoints = [
            Point::new(200.0, 140.0),
            Point::new(250.0, 140.0),
            Point::new(250.0, 60.0),
        ];
        let bounds = Bounds::from_points(&waypoints).unwrap();

        assert_eq!(bounds.min_point(), Point::new(200.0, 60.0));
        assert_eq!(bounds.to_size(), Size::new(50.0, 80.0));
        assert_eq!(bounds.max_y(), 140.0);
        assert!(Bounds::from_points(&[]).is_none());
    }

    #[test]
    fn test_contains_point_includes_border() {
        let lane = Bounds::new_from_top_left(Point::new(0.0, 0.0), Size::new(600.0, 120.0));

        assert!(lane.contains_point(Point::new(0.0, 0.0)));
        assert!(lane.contains_point(Point::new(300.0, 60.0)));
        assert!(lane.contains_point(Point::new(600.0, 120.0)));
        assert!(!lane.contains_point(Point::new(300.0, 121.0)));
    }

    #[test]
    fn test_size_area() {
        assert_eq!(Size::new(90.0, 20.0).area(), 1800.0);
    }
}
