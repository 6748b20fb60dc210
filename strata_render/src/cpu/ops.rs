// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-pixel color operations and compositing.

use kurbo::Rect;
use strata_core::document::{Adjustments, BlendMode};
use tiny_skia::{ColorU8, FilterQuality, Pixmap, PixmapPaint, PremultipliedColorU8, Transform};

use super::raster::{new_pixmap, unit_byte};
use crate::backend::BackendError;

/// Rec. 709 luma of straight unit channels.
pub(crate) fn luma(r: f32, g: f32, b: f32) -> f32 {
    0.2126 * r + 0.7152 * g + 0.0722 * b
}

/// Copies `rect` (rounded to whole pixels) into a new pixmap anchored at
/// its top-left.
#[expect(
    clippy::cast_possible_truncation,
    reason = "crop rectangles are rounded to whole pixels on purpose"
)]
pub(crate) fn crop(pm: &Pixmap, rect: Rect) -> Result<Pixmap, BackendError> {
    let (x0, y0) = (rect.x0.round(), rect.y0.round());
    let w = (rect.x1.round() - x0).max(0.0) as u32;
    let h = (rect.y1.round() - y0).max(0.0) as u32;
    let mut out = new_pixmap(w, h, "crop")?;
    copy_into(&mut out, pm, -(x0 as i32), -(y0 as i32));
    Ok(out)
}

/// Draws `src` into `dst` at an integer offset without resampling.
pub(crate) fn copy_into(dst: &mut Pixmap, src: &Pixmap, x: i32, y: i32) {
    let paint = PixmapPaint {
        quality: FilterQuality::Nearest,
        ..PixmapPaint::default()
    };
    dst.draw_pixmap(x, y, src.as_ref(), &paint, Transform::identity(), None);
}

/// Scales every premultiplied channel by `opacity`.
pub(crate) fn opacity(pm: &Pixmap, opacity: f64) -> Pixmap {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "opacity is a unit factor"
    )]
    let k = opacity.clamp(0.0, 1.0) as f32;
    let mut out = pm.clone();
    let scale = |c: u8| unit_byte(f32::from(c) / 255.0 * k);
    for px in out.pixels_mut() {
        *px = PremultipliedColorU8::from_rgba(
            scale(px.red()),
            scale(px.green()),
            scale(px.blue()),
            scale(px.alpha()),
        )
        .unwrap_or(PremultipliedColorU8::TRANSPARENT);
    }
    out
}

/// Saturation, then contrast about mid-gray, then brightness, then
/// inversion, on straight color channels. Alpha is untouched.
#[expect(
    clippy::cast_possible_truncation,
    reason = "adjustment factors are small and clamped"
)]
pub(crate) fn adjust(pm: &Pixmap, adj: &Adjustments) -> Pixmap {
    let (brightness, contrast, saturation) = (
        adj.brightness as f32,
        adj.contrast as f32,
        adj.saturation as f32,
    );
    let mut out = pm.clone();
    for px in out.pixels_mut() {
        let c = px.demultiply();
        if c.alpha() == 0 {
            continue;
        }
        let mut rgb = [c.red(), c.green(), c.blue()].map(|v| f32::from(v) / 255.0);
        let l = luma(rgb[0], rgb[1], rgb[2]);
        for v in &mut rgb {
            *v = l + (*v - l) * saturation;
            *v = (*v - 0.5) * contrast + 0.5;
            *v += brightness;
            *v = v.clamp(0.0, 1.0);
            if adj.inverted {
                *v = 1.0 - *v;
            }
        }
        let [r, g, b] = rgb.map(unit_byte);
        *px = ColorU8::from_rgba(r, g, b, c.alpha()).premultiply();
    }
    out
}

/// Multiplies each pixel by the mask's `luma × alpha` at the same
/// position. Pixels the mask does not cover become transparent.
pub(crate) fn blend_with_mask(pm: &Pixmap, mask: &Pixmap) -> Pixmap {
    let mut out = pm.clone();
    let width = out.width();
    for (i, px) in (0_u32..).zip(out.pixels_mut()) {
        let (x, y) = (i % width, i / width);
        let m = mask.pixel(x, y).map_or(0.0, |m| {
            let c = m.demultiply();
            let unit = |v: u8| f32::from(v) / 255.0;
            luma(unit(c.red()), unit(c.green()), unit(c.blue())) * unit(c.alpha())
        });
        let scale = |c: u8| unit_byte(f32::from(c) / 255.0 * m);
        *px = PremultipliedColorU8::from_rgba(
            scale(px.red()),
            scale(px.green()),
            scale(px.blue()),
            scale(px.alpha()),
        )
        .unwrap_or(PremultipliedColorU8::TRANSPARENT);
    }
    out
}

pub(crate) fn skia_blend(mode: BlendMode) -> tiny_skia::BlendMode {
    match mode {
        BlendMode::Normal => tiny_skia::BlendMode::SourceOver,
        BlendMode::Lighten => tiny_skia::BlendMode::Lighten,
        BlendMode::Darken => tiny_skia::BlendMode::Darken,
        BlendMode::Multiply => tiny_skia::BlendMode::Multiply,
        BlendMode::Screen => tiny_skia::BlendMode::Screen,
        BlendMode::Overlay => tiny_skia::BlendMode::Overlay,
        BlendMode::SoftLight => tiny_skia::BlendMode::SoftLight,
        BlendMode::HardLight => tiny_skia::BlendMode::HardLight,
        BlendMode::Difference => tiny_skia::BlendMode::Difference,
        BlendMode::Hue => tiny_skia::BlendMode::Hue,
        BlendMode::Color => tiny_skia::BlendMode::Color,
    }
}

/// Draws `top` over a copy of `bottom` with `mode`.
pub(crate) fn composite(
    top: &Pixmap,
    bottom: &Pixmap,
    mode: BlendMode,
) -> Result<Pixmap, BackendError> {
    if (top.width(), top.height()) != (bottom.width(), bottom.height()) {
        return Err(BackendError::new(
            "composite",
            format!(
                "size mismatch: {}x{} over {}x{}",
                top.width(),
                top.height(),
                bottom.width(),
                bottom.height()
            ),
        ));
    }
    let mut out = bottom.clone();
    let paint = PixmapPaint {
        blend_mode: skia_blend(mode),
        quality: FilterQuality::Nearest,
        ..PixmapPaint::default()
    };
    out.draw_pixmap(0, 0, top.as_ref(), &paint, Transform::identity(), None);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use strata_core::color::Color;

    use super::*;
    use crate::cpu::raster::skia_color;

    fn solid(w: u32, h: u32, c: Color) -> Pixmap {
        let mut pm = Pixmap::new(w, h).unwrap();
        pm.fill(skia_color(c));
        pm
    }

    fn px(pm: &Pixmap, x: u32, y: u32) -> [u8; 4] {
        let c = pm.pixel(x, y).unwrap().demultiply();
        [c.red(), c.green(), c.blue(), c.alpha()]
    }

    #[test]
    fn crop_reanchors_and_pads() {
        let mut pm = solid(4, 4, Color::WHITE);
        pm.pixels_mut()[5] = PremultipliedColorU8::from_rgba(0, 0, 0, 255).unwrap();
        let out = crop(&pm, Rect::new(1.0, 1.0, 6.0, 3.0)).unwrap();
        assert_eq!((out.width(), out.height()), (5, 2));
        assert_eq!(px(&out, 0, 0), [0, 0, 0, 255]);
        assert_eq!(px(&out, 2, 1), [255, 255, 255, 255]);
        assert_eq!(out.pixel(4, 0).unwrap().alpha(), 0);
        assert!(crop(&pm, Rect::new(1.0, 1.0, 1.0, 3.0)).is_err());
    }

    #[test]
    fn opacity_scales_alpha() {
        let out = opacity(&solid(1, 1, Color::WHITE), 0.5);
        assert_eq!(out.pixel(0, 0).unwrap().alpha(), 128);
        let out = opacity(&solid(1, 1, Color::WHITE), 0.0);
        assert_eq!(out.pixel(0, 0).unwrap().alpha(), 0);
    }

    #[test]
    fn adjust_darkens_desaturates_and_inverts() {
        let red = solid(1, 1, Color::rgb(1.0, 0.0, 0.0));
        let black = adjust(
            &red,
            &Adjustments {
                brightness: -1.0,
                saturation: 0.0,
                ..Adjustments::default()
            },
        );
        assert_eq!(px(&black, 0, 0), [0, 0, 0, 255]);

        let gray = adjust(
            &red,
            &Adjustments {
                saturation: 0.0,
                ..Adjustments::default()
            },
        );
        let [r, g, b, _] = px(&gray, 0, 0);
        assert_eq!((r, g), (g, b));

        let inverted = adjust(
            &red,
            &Adjustments {
                inverted: true,
                ..Adjustments::default()
            },
        );
        assert_eq!(px(&inverted, 0, 0), [0, 255, 255, 255]);
    }

    #[test]
    fn mask_keeps_white_and_drops_black() {
        let layer = solid(2, 1, Color::rgb(1.0, 0.0, 0.0));
        let mut mask = solid(1, 1, Color::WHITE);
        let out = blend_with_mask(&layer, &mask);
        assert_eq!(px(&out, 0, 0), [255, 0, 0, 255]);
        assert_eq!(out.pixel(1, 0).unwrap().alpha(), 0);

        mask.fill(skia_color(Color::BLACK));
        let out = blend_with_mask(&layer, &mask);
        assert_eq!(out.pixel(0, 0).unwrap().alpha(), 0);
    }

    #[test]
    fn composite_multiply_and_mismatch() {
        let top = solid(2, 2, Color::rgb(1.0, 0.0, 0.0));
        let bottom = solid(2, 2, Color::WHITE);
        let out = composite(&top, &bottom, BlendMode::Multiply).unwrap();
        assert_eq!(px(&out, 1, 1), [255, 0, 0, 255]);

        let out = composite(&bottom, &top, BlendMode::Difference).unwrap();
        assert_eq!(px(&out, 0, 0), [0, 255, 255, 255]);

        let err = composite(&solid(1, 1, Color::WHITE), &bottom, BlendMode::Normal).unwrap_err();
        assert_eq!(err.operation, "composite");
    }
}
