// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounds and placement transforms.
//!
//! Bounds follow the corner-rotation algorithm: take the scaled box with its
//! origin point at `(x, y)`, add each corner's distortion offset, then rotate
//! every corner about the origin point in polar form. The renderer's
//! placement matrix maps the same four corners to the same positions, which
//! the tests below check.

use kurbo::{Affine, Point, Rect};

use super::layer::Placement;
use crate::geometry;
use crate::transform::Homography;

impl Placement {
    /// Top-left of the unrotated, undistorted scaled box.
    #[must_use]
    pub fn top_left(&self) -> Point {
        let s = self.scaled_size();
        Point::new(
            self.x - self.origin.x * s.width,
            self.y - self.origin.y * s.height,
        )
    }

    /// The four transformed corners (top-left, top-right, bottom-right,
    /// bottom-left) in canvas space.
    #[must_use]
    pub fn corners(&self) -> [Point; 4] {
        let s = self.scaled_size();
        let tl = self.top_left();
        let pivot = Point::new(self.x, self.y);
        let box_corners = [
            tl,
            Point::new(tl.x + s.width, tl.y),
            Point::new(tl.x + s.width, tl.y + s.height),
            Point::new(tl.x, tl.y + s.height),
        ];
        let mut out = [Point::ORIGIN; 4];
        for (i, c) in box_corners.into_iter().enumerate() {
            let d = self.distort[i];
            let moved = Point::new(c.x + d.x * s.width, c.y + d.y * s.height);
            out[i] = geometry::rotate_about(moved, pivot, self.rotation);
        }
        out
    }

    /// Axis-aligned bounds of [`corners`](Self::corners).
    ///
    /// Degenerates to a zero-area rectangle at the origin point when the box
    /// has no area.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        geometry::bounding_rect(&self.corners())
    }

    /// The affine part of placement: pivot-relative scale and rotation,
    /// then translation of the origin point to `(x, y)`.
    ///
    /// Input coordinates are pixels of the cropped box, with `(0, 0)` at its
    /// top-left.
    #[must_use]
    pub fn placement_affine(&self) -> Affine {
        let c = self.cropped_size();
        Affine::translate((self.x, self.y))
            * Affine::rotate(self.rotation.to_radians())
            * Affine::scale_non_uniform(self.scale.x, self.scale.y)
            * Affine::translate((-self.origin.x * c.width, -self.origin.y * c.height))
    }

    /// Mirroring about the cropped box center.
    #[must_use]
    pub fn flip_affine(&self) -> Affine {
        let c = self.cropped_size();
        let sx = if self.flip.horizontal { -1.0 } else { 1.0 };
        let sy = if self.flip.vertical { -1.0 } else { 1.0 };
        crate::transform::scale_about(Point::new(c.width / 2.0, c.height / 2.0), sx, sy)
    }

    /// Perspective remap of the cropped box corners by the distortion
    /// offsets, or `None` when no corner is offset or the quad is
    /// degenerate.
    #[must_use]
    pub fn distortion(&self) -> Option<Homography> {
        if !self.is_distorted() {
            return None;
        }
        let c = self.cropped_size();
        let src = [
            Point::new(0.0, 0.0),
            Point::new(c.width, 0.0),
            Point::new(c.width, c.height),
            Point::new(0.0, c.height),
        ];
        let mut dst = src;
        for (p, d) in dst.iter_mut().zip(self.distort) {
            p.x += d.x * c.width;
            p.y += d.y * c.height;
        }
        Homography::from_quad_to_quad(src, dst)
    }

    /// The full placement transform in application order: flip, distort,
    /// scale, rotate, translate.
    #[must_use]
    pub fn transform(&self) -> Homography {
        let flip = Homography::from_affine(self.flip_affine());
        let place = Homography::from_affine(self.placement_affine());
        match self.distortion() {
            Some(d) => place * d * flip,
            None => place * flip,
        }
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Size, Vec2};

    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn rect_close(a: Rect, b: Rect) -> bool {
        close(a.x0, b.x0) && close(a.y0, b.y0) && close(a.x1, b.x1) && close(a.y1, b.y1)
    }

    #[test]
    fn untransformed_bounds_start_at_position() {
        let mut p = Placement::new(30.0, 40.0, 100.0, 50.0);
        p.origin = Point::ORIGIN;
        assert_eq!(p.bounds(), Rect::new(30.0, 40.0, 130.0, 90.0));

        // The default centered origin puts (x, y) in the middle.
        let p = Placement::new(30.0, 40.0, 100.0, 50.0);
        assert_eq!(p.bounds(), Rect::new(-20.0, 15.0, 80.0, 65.0));
    }

    #[test]
    fn quarter_turns_swap_size_for_any_origin() {
        for origin in [Point::ORIGIN, Point::new(0.5, 0.5), Point::new(0.9, 0.2)] {
            for (deg, expect) in [
                (0.0, Size::new(100.0, 40.0)),
                (90.0, Size::new(40.0, 100.0)),
                (180.0, Size::new(100.0, 40.0)),
                (270.0, Size::new(40.0, 100.0)),
            ] {
                let mut p = Placement::new(0.0, 0.0, 100.0, 40.0);
                p.origin = origin;
                p.rotation = deg;
                let s = p.bounds().size();
                assert!(
                    close(s.width, expect.width) && close(s.height, expect.height),
                    "{deg} {origin:?}: {s:?}"
                );
            }
        }
    }

    #[test]
    fn zero_scale_collapses_onto_origin_point() {
        let mut p = Placement::new(12.0, 8.0, 100.0, 40.0);
        p.scale = Vec2::ZERO;
        p.rotation = 33.0;
        assert_eq!(p.bounds(), Rect::new(12.0, 8.0, 12.0, 8.0));
    }

    #[test]
    fn crop_then_size_reports_cropped_box() {
        let mut p = Placement::new(0.0, 0.0, 100.0, 100.0);
        p.crop = Some(Rect::new(10.0, 10.0, 60.0, 60.0));
        assert_eq!(p.bounds().size(), Size::new(50.0, 50.0));
    }

    #[test]
    fn transform_agrees_with_bounds() {
        let mut p = Placement::new(120.0, 80.0, 60.0, 30.0);
        p.origin = Point::new(0.25, 0.75);
        p.scale = Vec2::new(1.5, 0.5);
        p.rotation = 37.0;
        p.distort = [
            Vec2::new(0.1, 0.0),
            Vec2::new(0.0, 0.2),
            Vec2::new(-0.1, 0.1),
            Vec2::ZERO,
        ];
        let h = p.transform();
        let c = p.cropped_size();
        let src = [
            Point::ORIGIN,
            Point::new(c.width, 0.0),
            Point::new(c.width, c.height),
            Point::new(0.0, c.height),
        ];
        let mapped = src.map(|s| h.apply(s).unwrap());
        for (m, e) in mapped.iter().zip(p.corners()) {
            assert!(close(m.x, e.x) && close(m.y, e.y), "{m:?} vs {e:?}");
        }
        assert!(rect_close(geometry::bounding_rect(&mapped), p.bounds()));
    }

    #[test]
    fn flip_keeps_the_box_in_place() {
        let mut p = Placement::new(50.0, 50.0, 20.0, 10.0);
        let before = p.bounds();
        p.flip.horizontal = true;
        let h = p.transform();
        let tl = h.apply(Point::ORIGIN).unwrap();
        // The top-left source pixel lands on the top-right corner.
        assert!(close(tl.x, before.x1) && close(tl.y, before.y0));
        assert_eq!(p.bounds(), before);
    }
}
