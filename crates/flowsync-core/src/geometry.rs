//! Geometric primitives for diagram shapes and connector routing.
//!
//! This module provides the geometric types shared by the diagram graph, the
//! BPMN reader/writer and the connector realignment engine.
//!
//! # Overview
//!
//! - [`Point`] - A 2D coordinate in diagram space
//! - [`Size`] - Width and height dimensions
//! - [`Bounds`] - An axis-aligned rectangle defined by minimum and maximum coordinates
//! - [`Insets`] - Padding/margin values for four sides
//!
//! # Coordinate System
//!
//! Flowsync uses the coordinate system of BPMN DI, which is the same as SVG:
//!
//! ```text
//!   (0,0) ────────► +X
//!     │
//!     │
//!     │
//!     ▼
//!    +Y
//! ```
//!
//! - **Origin**: Top-left corner at `(0, 0)`
//! - **X-axis**: Increases rightward
//! - **Y-axis**: Increases downward
//!
//! A BPMN `dc:Bounds` element stores the top-left corner plus a size, which maps
//! to [`Bounds::new_from_top_left`].

/// A 2D point representing a position in diagram coordinate space.
///
/// # Examples
///
/// ```
/// # use flowsync_core::geometry::Point;
/// let waypoint = Point::new(250.0, 80.0);
/// let center = Point::new(200.0, 100.0);
///
/// let direction = waypoint.sub_point(center);
/// assert_eq!(direction.x(), 50.0);
/// assert_eq!(direction.y(), -20.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    x: f32,
    y: f32,
}

impl Point {
    /// Creates a new point with the specified coordinates
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the x-coordinate of the point
    pub fn x(self) -> f32 {
        self.x
    }

    /// Returns the y-coordinate of the point
    pub fn y(self) -> f32 {
        self.y
    }

    /// Subtracts another point from this point, returning a new point
    pub fn sub_point(self, other: Point) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

}

/// Represents the dimensions of an element with width and height
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    width: f32,
    height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Returns the width dimension of this size
    pub fn width(self) -> f32 {
        self.width
    }

    /// Returns the height dimension of this size
    pub fn height(self) -> f32 {
        self.height
    }

    /// Returns a new Size with the specified width and the same height
    pub fn with_width(self, width: f32) -> Self {
        Self { width, ..self }
    }

    /// Returns true if either dimension is negative
    pub fn is_negative(self) -> bool {
        self.width < 0.0 || self.height < 0.0
    }

}

/// Represents an axis-aligned rectangle with minimum and maximum coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
}

impl Bounds {
    /// Creates a new bounds from a top-left point and a size
    pub fn new_from_top_left(top_left: Point, size: Size) -> Self {
        Self {
            min_x: top_left.x,
            min_y: top_left.y,
            max_x: top_left.x + size.width,
            max_y: top_left.y + size.height,
        }
    }

    /// Returns the minimum x-coordinate of the bounds
    pub fn min_x(self) -> f32 {
        self.min_x
    }

    /// Returns the minimum y-coordinate of the bounds
    pub fn min_y(self) -> f32 {
        self.min_y
    }

    /// Returns the maximum x-coordinate of the bounds
    pub fn max_x(self) -> f32 {
        self.max_x
    }

    /// Returns the maximum y-coordinate of the bounds
    pub fn max_y(self) -> f32 {
        self.max_y
    }

    /// Returns the width of the bounds
    pub fn width(self) -> f32 {
        self.max_x - self.min_x
    }

    /// Returns the height of the bounds
    pub fn height(self) -> f32 {
        self.max_y - self.min_y
    }

    /// Converts bounds to a Size object
    pub fn to_size(self) -> Size {
        Size {
            width: self.width(),
            height: self.height(),
        }
    }

    /// Returns the center point of the bounds
    pub fn center(self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Returns the midpoint of the top edge
    pub fn top_center(self) -> Point {
        Point::new((self.min_x + self.max_x) / 2.0, self.min_y)
    }

    /// Returns bounds with the same top-left corner and the given width
    pub fn with_width(self, width: f32) -> Self {
        Self {
            max_x: self.min_x + width,
            ..self
        }
    }

    /// Grows the bounds by `amount` on every side.
    pub fn expand(self, amount: f32) -> Self {
        self.add_padding(Insets::uniform(amount))
    }

    /// Returns true if the point lies inside the bounds or on their edge.
    pub fn contains(self, point: Point) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    /// Returns true if `point` sits on the rectangle's border, allowing `tolerance`
    /// units of slack.
    ///
    /// The point must lie inside the bounds expanded by `tolerance`, and within
    /// `tolerance` of at least one of the four edge lines.
    ///
    /// # Examples
    ///
    /// ```
    /// # use flowsync_core::geometry::{Bounds, Point, Size};
    /// let bounds = Bounds::new_from_top_left(Point::new(0.0, 0.0), Size::new(100.0, 50.0));
    ///
    /// assert!(bounds.is_on_border(Point::new(100.0, 25.0), 5.0));
    /// assert!(bounds.is_on_border(Point::new(103.0, 25.0), 5.0));
    /// assert!(!bounds.is_on_border(Point::new(50.0, 25.0), 5.0));
    /// assert!(!bounds.is_on_border(Point::new(100.0, 80.0), 5.0));
    /// ```
    pub fn is_on_border(self, point: Point, tolerance: f32) -> bool {
        if !self.expand(tolerance).contains(point) {
            return false;
        }

        (point.x - self.min_x).abs() <= tolerance
            || (point.x - self.max_x).abs() <= tolerance
            || (point.y - self.min_y).abs() <= tolerance
            || (point.y - self.max_y).abs() <= tolerance
    }

    /// Finds where the ray from `inside` toward `outside` first leaves the rectangle.
    ///
    /// The ray is `inside + t * (outside - inside)` for `t > 0`. A candidate `t`
    /// is computed for each edge and kept only when the other coordinate falls
    /// within the rectangle's extent on that axis; the smallest candidate wins.
    /// The returned point lies exactly on the chosen edge.
    ///
    /// When `inside` and `outside` coincide, or no edge qualifies, the top-center
    /// point of the rectangle is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// # use flowsync_core::geometry::{Bounds, Point, Size};
    /// let bounds = Bounds::new_from_top_left(Point::new(0.0, 0.0), Size::new(100.0, 50.0));
    /// let center = Point::new(50.0, 25.0);
    ///
    /// assert_eq!(bounds.border_intersection(center, Point::new(200.0, 25.0)), Point::new(100.0, 25.0));
    /// assert_eq!(bounds.border_intersection(center, Point::new(50.0, -100.0)), Point::new(50.0, 0.0));
    /// assert_eq!(bounds.border_intersection(center, center), bounds.top_center());
    /// ```
    pub fn border_intersection(self, inside: Point, outside: Point) -> Point {
        let direction = outside.sub_point(inside);
        let (dx, dy) = (direction.x, direction.y);

        if dx == 0.0 && dy == 0.0 {
            return self.top_center();
        }

        let mut best: Option<(f32, Point)> = None;
        let mut consider = |t: f32, point: Point| {
            if t.is_finite() && t > 0.0 && best.is_none_or(|(best_t, _)| t < best_t) {
                best = Some((t, point));
            }
        };

        if dx != 0.0 {
            for edge_x in [self.min_x, self.max_x] {
                let t = (edge_x - inside.x) / dx;
                let y = dy.mul_add(t, inside.y);
                if y >= self.min_y && y <= self.max_y {
                    consider(t, Point::new(edge_x, y));
                }
            }
        }

        if dy != 0.0 {
            for edge_y in [self.min_y, self.max_y] {
                let t = (edge_y - inside.y) / dy;
                let x = dx.mul_add(t, inside.x);
                if x >= self.min_x && x <= self.max_x {
                    consider(t, Point::new(x, edge_y));
                }
            }
        }

        best.map_or_else(|| self.top_center(), |(_, point)| point)
    }

    /// Merges two bounds to create a larger bounds that contains both.
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Expands the bounds by adding insets.
    pub fn add_padding(&self, insets: Insets) -> Self {
        Self {
            min_x: self.min_x - insets.left(),
            min_y: self.min_y - insets.top(),
            max_x: self.max_x + insets.right(),
            max_y: self.max_y + insets.bottom(),
        }
    }
}

/// Represents spacing around an element (padding, margin, etc.)
/// with potentially different values for each side
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Insets {
    top: f32,
    right: f32,
    bottom: f32,
    left: f32,
}

impl Insets {
    /// Creates uniform insets with the same value for all sides
    pub fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// Returns the top inset value
    pub fn top(self) -> f32 {
        self.top
    }

    /// Returns the right inset value
    pub fn right(self) -> f32 {
        self.right
    }

    /// Returns the bottom inset value
    pub fn bottom(self) -> f32 {
        self.bottom
    }

    /// Returns the left inset value
    pub fn left(self) -> f32 {
        self.left
    }

}


#[cfg(test)]
mod proptest_tests {
    use float_cmp::approx_eq;
    use proptest::prelude::*;

    use super::*;

    // ===================
    // Strategies
    // ===================

    fn bounds_strategy() -> impl Strategy<Value = Bounds> {
        (
            -1000.0f32..1000.0,
            -1000.0f32..1000.0,
            1.0f32..500.0,
            1.0f32..500.0,
        )
            .prop_map(|(x, y, w, h)| Bounds::new_from_top_left(Point::new(x, y), Size::new(w, h)))
    }

    fn direction_strategy() -> impl Strategy<Value = Point> {
        (-1000.0f32..1000.0, -1000.0f32..1000.0)
            .prop_filter("direction must be non-zero", |(x, y)| {
                x.abs() > 0.01 || y.abs() > 0.01
            })
            .prop_map(|(x, y)| Point::new(x, y))
    }

    // ===================
    // Property Test Functions
    // ===================

    /// A ray cast from the center always exits on the border.
    fn check_intersection_lies_on_border(
        bounds: Bounds,
        direction: Point,
    ) -> Result<(), TestCaseError> {
        let center = bounds.center();
        let outside = Point::new(center.x() + direction.x(), center.y() + direction.y());
        let hit = bounds.border_intersection(center, outside);

        prop_assert!(bounds.is_on_border(hit, 0.01), "{hit:?} not on {bounds:?}");
        Ok(())
    }

    /// The exit point lies on the ray, in the direction of travel.
    fn check_intersection_follows_direction(
        bounds: Bounds,
        direction: Point,
    ) -> Result<(), TestCaseError> {
        let center = bounds.center();
        let outside = Point::new(center.x() + direction.x(), center.y() + direction.y());
        let hit = bounds.border_intersection(center, outside);
        let offset = hit.sub_point(center);

        // Same direction: non-negative dot product, zero cross product.
        let dot = offset.x() * direction.x() + offset.y() * direction.y();
        let cross = offset.x() * direction.y() - offset.y() * direction.x();
        let scale = offset.x().hypot(offset.y()) * direction.x().hypot(direction.y());

        prop_assert!(dot >= 0.0);
        prop_assert!(approx_eq!(f32, cross / scale.max(1.0), 0.0, epsilon = 0.001));
        Ok(())
    }

    /// Merged bounds contain both inputs.
    fn check_bounds_merge_contains_both(b1: Bounds, b2: Bounds) -> Result<(), TestCaseError> {
        let merged = b1.merge(&b2);

        prop_assert!(merged.contains(Point::new(b1.min_x(), b1.min_y())));
        prop_assert!(merged.contains(Point::new(b2.min_x(), b2.min_y())));
        prop_assert!(merged.max_x() >= b1.max_x() && merged.max_x() >= b2.max_x());
        prop_assert!(merged.max_y() >= b1.max_y() && merged.max_y() >= b2.max_y());
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn intersection_lies_on_border(bounds in bounds_strategy(), direction in direction_strategy()) {
            check_intersection_lies_on_border(bounds, direction)?;
        }

        #[test]
        fn intersection_follows_direction(bounds in bounds_strategy(), direction in direction_strategy()) {
            check_intersection_follows_direction(bounds, direction)?;
        }

        #[test]
        fn bounds_merge_contains_both(b1 in bounds_strategy(), b2 in bounds_strategy()) {
            check_bounds_merge_contains_both(b1, b2)?;
        }
    }
}
