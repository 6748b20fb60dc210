// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host drawing surfaces.
//!
//! A [`Surface`] is whatever the host draws on: a window, a frame buffer, a
//! document page. The renderer only needs to hand it a flattened image and
//! a position, and to ask how large it is so that canvases can default to
//! its size. Frame callbacks and surface lifetime stay with the host.

use kurbo::{Affine, Point};
use strata_core::image::Image;

/// A destination for flattened canvases.
pub trait Surface {
    /// The surface's default size in pixels.
    fn size(&self) -> (u32, u32);

    /// The surface's current transform, applied by the host to everything
    /// drawn. Identity unless the host says otherwise.
    fn transform(&self) -> Affine {
        Affine::IDENTITY
    }

    /// Draws `image` with its top-left corner at `at`.
    fn draw_image(&mut self, image: &Image, at: Point);
}

/// A surface that composites drawn images into an in-memory image with
/// source-over blending, ignoring its transform.
///
/// Useful for headless hosts and tests.
#[derive(Clone, Debug)]
pub struct ImageSurface {
    image: Image,
}

impl ImageSurface {
    /// A transparent surface.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: Image::new(width, height),
        }
    }

    /// What has been drawn so far.
    #[must_use]
    pub fn image(&self) -> &Image {
        &self.image
    }
}

impl Surface for ImageSurface {
    fn size(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "positions are rounded to whole pixels on purpose"
    )]
    fn draw_image(&mut self, image: &Image, at: Point) {
        let (ox, oy) = (at.x.round() as i64, at.y.round() as i64);
        for y in 0..image.height() {
            for x in 0..image.width() {
                let (dx, dy) = (ox + i64::from(x), oy + i64::from(y));
                let (Ok(dx), Ok(dy)) = (u32::try_from(dx), u32::try_from(dy)) else {
                    continue;
                };
                let (Some(src), Some(dst)) = (image.pixel(x, y), self.image.pixel(dx, dy)) else {
                    continue;
                };
                self.image.set_pixel(dx, dy, source_over(src, dst));
            }
        }
    }
}

/// Straight-alpha source-over of two RGBA8 pixels.
fn source_over(src: [u8; 4], dst: [u8; 4]) -> [u8; 4] {
    let sa = f64::from(src[3]) / 255.0;
    let da = f64::from(dst[3]) / 255.0;
    let a = sa + da * (1.0 - sa);
    if a <= 0.0 {
        return [0; 4];
    }
    let blend = |s: u8, d: u8| to_byte((f64::from(s) * sa + f64::from(d) * da * (1.0 - sa)) / a);
    [
        blend(src[0], dst[0]),
        blend(src[1], dst[1]),
        blend(src[2], dst[2]),
        to_byte(a * 255.0),
    ]
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "value is clamped to [0, 255] before the cast"
)]
fn to_byte(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
