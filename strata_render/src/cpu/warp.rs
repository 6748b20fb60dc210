// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometric resampling.
//!
//! Affine placements go through tiny-skia's pixmap drawing, which keeps
//! pure integer translations as exact copies. Projective placements are
//! inverse-mapped per destination pixel center and sampled bilinearly.

use kurbo::{Affine, Point};
use strata_core::transform::Homography;
use tiny_skia::{FilterQuality, Pixmap, PixmapPaint, Transform};

use super::ops::copy_into;
use super::raster::{new_pixmap, pack, unpack};
use crate::backend::BackendError;

/// Premultiplied unit-float pixels with their extent, for point sampling.
pub(crate) struct Samples {
    pub(crate) data: Vec<[f32; 4]>,
    pub(crate) width: usize,
    pub(crate) height: usize,
}

impl Samples {
    pub(crate) fn new(pm: &Pixmap) -> Self {
        Self {
            data: unpack(pm),
            width: pm.width() as usize,
            height: pm.height() as usize,
        }
    }

    fn at(&self, x: i64, y: i64) -> [f32; 4] {
        match (usize::try_from(x), usize::try_from(y)) {
            (Ok(x), Ok(y)) if x < self.width && y < self.height => self.data[y * self.width + x],
            _ => [0.0; 4],
        }
    }

    /// Bilinear sample at continuous coordinates, where pixel `(i, j)`
    /// covers `[i, i + 1) × [j, j + 1)`. Outside is transparent.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "sample positions are floored to pixel indices"
    )]
    pub(crate) fn bilinear(&self, x: f64, y: f64) -> [f32; 4] {
        let (x, y) = (x - 0.5, y - 0.5);
        if !x.is_finite() || !y.is_finite() {
            return [0.0; 4];
        }
        let (x0, y0) = (x.floor(), y.floor());
        let (fx, fy) = ((x - x0) as f32, (y - y0) as f32);
        let (x0, y0) = (x0 as i64, y0 as i64);
        let c00 = self.at(x0, y0);
        let c10 = self.at(x0 + 1, y0);
        let c01 = self.at(x0, y0 + 1);
        let c11 = self.at(x0 + 1, y0 + 1);
        let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
        let mut out = [0.0; 4];
        for (c, v) in out.iter_mut().enumerate() {
            *v = lerp(lerp(c00[c], c10[c], fx), lerp(c01[c], c11[c], fx), fy);
        }
        out
    }
}

fn is_integer_translation(t: Affine) -> bool {
    let [a, b, c, d, e, f] = t.as_coeffs();
    a == 1.0 && b == 0.0 && c == 0.0 && d == 1.0 && e.fract() == 0.0 && f.fract() == 0.0
}

/// Resamples `src` through `t` into a `width × height` pixmap.
#[expect(
    clippy::cast_possible_truncation,
    reason = "tiny-skia works in f32; integer offsets are checked first"
)]
pub(crate) fn affine(
    src: &Pixmap,
    t: Affine,
    width: u32,
    height: u32,
) -> Result<Pixmap, BackendError> {
    let mut out = new_pixmap(width, height, "affine_transform")?;
    if is_integer_translation(t) {
        let [.., e, f] = t.as_coeffs();
        copy_into(&mut out, src, e as i32, f as i32);
        return Ok(out);
    }
    let [a, b, c, d, e, f] = t.as_coeffs().map(|v| v as f32);
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    out.draw_pixmap(
        0,
        0,
        src.as_ref(),
        &paint,
        Transform::from_row(a, b, c, d, e, f),
        None,
    );
    Ok(out)
}

/// Resamples `src` through the projective `h` into a `width × height`
/// pixmap.
pub(crate) fn projective(
    src: &Pixmap,
    h: &Homography,
    width: u32,
    height: u32,
) -> Result<Pixmap, BackendError> {
    let mut out = new_pixmap(width, height, "warp")?;
    let inverse = h
        .inverse()
        .ok_or_else(|| BackendError::new("warp", "transform is not invertible"))?;
    let samples = Samples::new(src);
    let mut dst = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        for x in 0..width {
            let center = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            dst.push(
                inverse
                    .apply(center)
                    .map_or([0.0; 4], |p| samples.bilinear(p.x, p.y)),
            );
        }
    }
    pack(&mut out, &dst);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use strata_core::color::Color;
    use tiny_skia::PremultipliedColorU8;

    use super::*;
    use crate::cpu::raster::skia_color;

    fn checker() -> Pixmap {
        let mut pm = Pixmap::new(2, 2).unwrap();
        let px = pm.pixels_mut();
        px[0] = PremultipliedColorU8::from_rgba(255, 0, 0, 255).unwrap();
        px[1] = PremultipliedColorU8::from_rgba(0, 255, 0, 255).unwrap();
        px[2] = PremultipliedColorU8::from_rgba(0, 0, 255, 255).unwrap();
        px[3] = PremultipliedColorU8::from_rgba(255, 255, 255, 255).unwrap();
        pm
    }

    #[test]
    fn integer_translation_is_exact() {
        let out = affine(&checker(), Affine::translate((1.0, 2.0)), 4, 4).unwrap();
        assert_eq!(out.pixel(1, 2), checker().pixel(0, 0));
        assert_eq!(out.pixel(2, 3), checker().pixel(1, 1));
        assert_eq!(out.pixel(0, 0).unwrap().alpha(), 0);
    }

    #[test]
    fn scaling_fills_the_target() {
        let mut src = Pixmap::new(2, 2).unwrap();
        src.fill(skia_color(Color::WHITE));
        let out = affine(&src, Affine::scale(3.0), 6, 6).unwrap();
        assert_eq!(out.pixel(3, 3).unwrap().alpha(), 255);
    }

    #[test]
    fn identity_warp_matches_source() {
        let out = projective(&checker(), &Homography::default(), 2, 2).unwrap();
        for (a, b) in out.pixels().iter().zip(checker().pixels()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn warp_maps_through_the_inverse() {
        let h = Homography::from_affine(Affine::translate((1.0, 0.0)));
        let out = projective(&checker(), &h, 3, 2).unwrap();
        assert_eq!(out.pixel(1, 0), checker().pixel(0, 0));
        assert_eq!(out.pixel(0, 0).unwrap().alpha(), 0);
    }

    #[test]
    fn singular_warp_fails() {
        let h = Homography::from_rows([0.0; 9]);
        assert_eq!(
            projective(&checker(), &h, 2, 2).unwrap_err().operation,
            "warp"
        );
    }
}
