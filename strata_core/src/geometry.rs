// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Point, angle and distance helpers used by bounds and transform math.
//!
//! Angles are in degrees and measured in the y-down raster frame, so a
//! positive angle turns clockwise on screen.

use kurbo::{Point, Rect};
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// Euclidean distance between two points.
#[inline]
#[must_use]
pub fn distance(a: Point, b: Point) -> f64 {
    (b - a).hypot()
}

/// Angle in degrees of the vector from `a` to `b`.
///
/// Returns `0.0` when the points coincide.
#[inline]
#[must_use]
pub fn angle(a: Point, b: Point) -> f64 {
    let d = b - a;
    if d.x == 0.0 && d.y == 0.0 {
        return 0.0;
    }
    d.y.atan2(d.x).to_degrees()
}

/// The point at `distance` from `origin` in direction `degrees`.
#[inline]
#[must_use]
pub fn coordinates(origin: Point, distance: f64, degrees: f64) -> Point {
    let r = degrees.to_radians();
    Point::new(origin.x + distance * r.cos(), origin.y + distance * r.sin())
}

/// Rotates `p` around `pivot` by `degrees`.
///
/// Works in polar form so that degenerate inputs (zero distance) map onto the
/// pivot exactly.
#[must_use]
pub fn rotate_about(p: Point, pivot: Point, degrees: f64) -> Point {
    let d = distance(pivot, p);
    if d == 0.0 {
        return pivot;
    }
    coordinates(pivot, d, angle(pivot, p) + degrees)
}

/// Smallest rectangle containing all `points`.
///
/// An empty slice yields [`Rect::ZERO`].
#[must_use]
pub fn bounding_rect(points: &[Point]) -> Rect {
    let Some((first, rest)) = points.split_first() else {
        return Rect::ZERO;
    };
    rest.iter().fold(
        Rect::from_points(*first, *first),
        |r, p| r.union_pt(*p),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn distance_is_euclidean() {
        assert!(close(
            distance(Point::new(0.0, 0.0), Point::new(3.0, 4.0)),
            5.0
        ));
    }

    #[test]
    fn angle_quadrants() {
        let o = Point::ORIGIN;
        assert!(close(angle(o, Point::new(1.0, 0.0)), 0.0));
        assert!(close(angle(o, Point::new(0.0, 1.0)), 90.0));
        assert!(close(angle(o, Point::new(-1.0, 0.0)), 180.0));
        assert!(close(angle(o, Point::new(0.0, -1.0)), -90.0));
        assert!(close(angle(o, o), 0.0));
    }

    #[test]
    fn rotate_quarter_turn_is_clockwise_in_y_down() {
        let p = rotate_about(Point::new(10.0, 0.0), Point::ORIGIN, 90.0);
        assert!(close(p.x, 0.0));
        assert!(close(p.y, 10.0));
    }

    #[test]
    fn rotate_pivot_is_fixed() {
        let pivot = Point::new(5.0, 5.0);
        assert_eq!(rotate_about(pivot, pivot, 33.0), pivot);
    }

    #[test]
    fn bounding_rect_of_points() {
        let r = bounding_rect(&[
            Point::new(1.0, 5.0),
            Point::new(-2.0, 3.0),
            Point::new(4.0, -1.0),
        ]);
        assert_eq!(r, Rect::new(-2.0, -1.0, 4.0, 5.0));
        assert_eq!(bounding_rect(&[]), Rect::ZERO);
    }
}
