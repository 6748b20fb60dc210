// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal row-major 3×3 projective transform.
//!
//! Affine placement (scale, rotate, translate) is expressed with
//! [`kurbo::Affine`]; this type adds the projective part needed for corner
//! distortion, without pulling in a full linear-algebra crate.

use core::ops::Mul;

use kurbo::{Affine, Point};
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

const EPSILON: f64 = 1e-9;

/// A row-major 3×3 homography stored as `[f64; 9]`.
///
/// Maps `(x, y, 1)` to `(x', y', w')` with the projected point
/// `(x' / w', y' / w')`:
///
/// ```text
/// [ m0 m1 m2 ]
/// [ m3 m4 m5 ]
/// [ m6 m7 m8 ]
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    /// Matrix coefficients, row-major.
    pub m: [f64; 9],
}

impl Homography {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    };

    /// Creates a homography from row-major coefficients.
    #[inline]
    #[must_use]
    pub const fn from_rows(m: [f64; 9]) -> Self {
        Self { m }
    }

    /// Lifts an affine transform.
    #[must_use]
    pub fn from_affine(a: Affine) -> Self {
        let [a, b, c, d, e, f] = a.as_coeffs();
        Self {
            m: [a, c, e, b, d, f, 0.0, 0.0, 1.0],
        }
    }

    /// Returns the affine part if the bottom row is `[0, 0, w]` with
    /// non-zero `w`.
    #[must_use]
    pub fn to_affine(&self) -> Option<Affine> {
        let m = &self.m;
        if m[6].abs() > EPSILON || m[7].abs() > EPSILON || m[8].abs() < EPSILON {
            return None;
        }
        let w = m[8];
        Some(Affine::new([
            m[0] / w,
            m[3] / w,
            m[1] / w,
            m[4] / w,
            m[2] / w,
            m[5] / w,
        ]))
    }

    /// Builds the homography mapping the four `src` corners onto `dst`.
    ///
    /// Returns `None` for degenerate quads.
    #[must_use]
    pub fn from_quad_to_quad(src: [Point; 4], dst: [Point; 4]) -> Option<Self> {
        if !src
            .iter()
            .chain(dst.iter())
            .all(|p| p.x.is_finite() && p.y.is_finite())
        {
            return None;
        }
        let mut a = [[0.0_f64; 8]; 8];
        let mut b = [0.0_f64; 8];
        for i in 0..4 {
            let (s, d) = (src[i], dst[i]);
            let r0 = 2 * i;
            let r1 = r0 + 1;
            a[r0] = [s.x, s.y, 1.0, 0.0, 0.0, 0.0, -d.x * s.x, -d.x * s.y];
            b[r0] = d.x;
            a[r1] = [0.0, 0.0, 0.0, s.x, s.y, 1.0, -d.y * s.x, -d.y * s.y];
            b[r1] = d.y;
        }
        let x = solve_8x8(a, b)?;
        let h = Self {
            m: [x[0], x[1], x[2], x[3], x[4], x[5], x[6], x[7], 1.0],
        };
        h.is_finite().then_some(h)
    }

    /// Determinant of the matrix.
    #[must_use]
    pub fn determinant(&self) -> f64 {
        let [a, b, c, d, e, f, g, h, i] = self.m;
        a * (e * i - f * h) - b * (d * i - f * g) + c * (d * h - e * g)
    }

    /// Returns the inverse, or `None` if the matrix is singular.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < EPSILON {
            return None;
        }
        let [a, b, c, d, e, f, g, h, i] = self.m;
        let k = 1.0 / det;
        let inv = Self {
            m: [
                (e * i - f * h) * k,
                (c * h - b * i) * k,
                (b * f - c * e) * k,
                (f * g - d * i) * k,
                (a * i - c * g) * k,
                (c * d - a * f) * k,
                (d * h - e * g) * k,
                (b * g - a * h) * k,
                (a * e - b * d) * k,
            ],
        };
        inv.is_finite().then_some(inv)
    }

    /// Maps a point. Returns `None` when it lands on the line at infinity.
    #[must_use]
    pub fn apply(&self, p: Point) -> Option<Point> {
        let m = &self.m;
        let w = m[6] * p.x + m[7] * p.y + m[8];
        if !w.is_finite() || w.abs() < EPSILON {
            return None;
        }
        let x = (m[0] * p.x + m[1] * p.y + m[2]) / w;
        let y = (m[3] * p.x + m[4] * p.y + m[5]) / w;
        (x.is_finite() && y.is_finite()).then(|| Point::new(x, y))
    }

    /// Is every coefficient [finite]?
    ///
    /// [finite]: f64::is_finite
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.m.iter().all(|v| v.is_finite())
    }
}

impl Default for Homography {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Homography {
    type Output = Self;

    /// `self * rhs` applies `rhs` first.
    fn mul(self, rhs: Self) -> Self {
        let (l, r) = (&self.m, &rhs.m);
        let mut out = [0.0; 9];
        for row in 0..3 {
            for col in 0..3 {
                out[row * 3 + col] = l[row * 3] * r[col]
                    + l[row * 3 + 1] * r[3 + col]
                    + l[row * 3 + 2] * r[6 + col];
            }
        }
        Self { m: out }
    }
}

/// Scales by `(sx, sy)` about `pivot`.
#[must_use]
pub fn scale_about(pivot: Point, sx: f64, sy: f64) -> Affine {
    Affine::translate(pivot.to_vec2())
        * Affine::scale_non_uniform(sx, sy)
        * Affine::translate(-pivot.to_vec2())
}

/// Rotates by `degrees` (clockwise in y-down space) about `pivot`.
#[must_use]
pub fn rotate_about(pivot: Point, degrees: f64) -> Affine {
    Affine::translate(pivot.to_vec2())
        * Affine::rotate(degrees.to_radians())
        * Affine::translate(-pivot.to_vec2())
}

fn solve_8x8(mut a: [[f64; 8]; 8], mut b: [f64; 8]) -> Option<[f64; 8]> {
    for col in 0..8 {
        let mut pivot = col;
        for row in col + 1..8 {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        if !a[pivot][col].is_finite() || a[pivot][col].abs() < EPSILON {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        let inv = 1.0 / a[col][col];
        for j in col..8 {
            a[col][j] *= inv;
        }
        b[col] *= inv;

        for row in 0..8 {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in col..8 {
                a[row][j] -= factor * a[col][j];
            }
            b[row] -= factor * b[col];
        }
    }
    Some(b)
}
