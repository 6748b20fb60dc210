// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixmap allocation, image conversion and payload rasterization.

use kurbo::{BezPath, PathEl};
use strata_core::color::Color;
use strata_core::document::{PathPayload, Payload};
use strata_core::image::Image;
use tiny_skia::{
    ColorU8, FillRule, FilterQuality, GradientStop, LinearGradient, Paint, Path, PathBuilder,
    Pixmap, PixmapPaint, Point, PremultipliedColorU8, RadialGradient, Rect, SpreadMode, Stroke,
    Transform,
};

use super::codec;
use crate::backend::BackendError;

/// Allocates a transparent pixmap, failing for empty or oversized extents.
pub(crate) fn new_pixmap(
    width: u32,
    height: u32,
    operation: &'static str,
) -> Result<Pixmap, BackendError> {
    Pixmap::new(width, height).ok_or_else(|| {
        BackendError::new(
            operation,
            format!("cannot allocate a {width}x{height} raster"),
        )
    })
}

/// Straight RGBA8 to premultiplied pixmap.
pub(crate) fn from_image(image: &Image) -> Result<Pixmap, BackendError> {
    let mut pm = new_pixmap(image.width(), image.height(), "from_image")?;
    let src: &[[u8; 4]] = bytemuck::cast_slice(image.data());
    for (dst, &[r, g, b, a]) in pm.pixels_mut().iter_mut().zip(src) {
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pm)
}

/// Premultiplied pixmap to straight RGBA8.
pub(crate) fn to_image(pm: &Pixmap) -> Result<Image, BackendError> {
    let mut data = Vec::with_capacity(pm.data().len());
    for px in pm.pixels() {
        let c = px.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    Image::from_rgba8(pm.width(), pm.height(), data)
        .ok_or_else(|| BackendError::new("to_image", "pixel buffer has the wrong length"))
}

/// Premultiplied pixels as unit floats, row-major.
pub(crate) fn unpack(pm: &Pixmap) -> Vec<[f32; 4]> {
    pm.pixels()
        .iter()
        .map(|p| {
            [
                f32::from(p.red()) / 255.0,
                f32::from(p.green()) / 255.0,
                f32::from(p.blue()) / 255.0,
                f32::from(p.alpha()) / 255.0,
            ]
        })
        .collect()
}

/// Writes premultiplied unit floats back, clamping color channels to alpha.
pub(crate) fn pack(pm: &mut Pixmap, src: &[[f32; 4]]) {
    for (dst, v) in pm.pixels_mut().iter_mut().zip(src) {
        let a = unit_byte(v[3]);
        let c = |x: f32| unit_byte(x).min(a);
        *dst = PremultipliedColorU8::from_rgba(c(v[0]), c(v[1]), c(v[2]), a)
            .unwrap_or(PremultipliedColorU8::TRANSPARENT);
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "value is clamped to [0, 255] before the cast"
)]
pub(crate) fn unit_byte(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

pub(crate) fn skia_color(c: Color) -> tiny_skia::Color {
    let [r, g, b, a] = c.to_rgba8();
    tiny_skia::Color::from_rgba8(r, g, b, a)
}

/// Rasterizes every payload kind except nested canvases.
#[expect(
    clippy::cast_possible_truncation,
    reason = "tiny-skia works in f32; layer geometry fits comfortably"
)]
pub(crate) fn rasterize(payload: &Payload, width: u32, height: u32) -> Result<Pixmap, BackendError> {
    let mut pm = new_pixmap(width, height, "rasterize")?;
    let (w, h) = (width as f32, height as f32);
    match payload {
        Payload::Fill(c) => pm.fill(skia_color(*c)),
        Payload::LinearGradient { top, bottom } => {
            let shader = LinearGradient::new(
                Point::from_xy(0.0, 0.0),
                Point::from_xy(0.0, h),
                vec![
                    GradientStop::new(0.0, skia_color(*top)),
                    GradientStop::new(1.0, skia_color(*bottom)),
                ],
                SpreadMode::Pad,
                Transform::identity(),
            );
            fill_shader(&mut pm, shader, *top);
        }
        Payload::RadialGradient {
            inner,
            outer,
            spread,
        } => {
            // The gradient spans the smaller half-extent; `spread` of it is
            // solid inner color.
            let center = Point::from_xy(w / 2.0, h / 2.0);
            let spread = spread.clamp(0.0, 0.99) as f32;
            let shader = RadialGradient::new(
                center,
                center,
                (w.min(h) / 2.0).max(f32::EPSILON),
                vec![
                    GradientStop::new(0.0, skia_color(*inner)),
                    GradientStop::new(spread, skia_color(*inner)),
                    GradientStop::new(1.0, skia_color(*outer)),
                ],
                SpreadMode::Pad,
                Transform::identity(),
            );
            fill_shader(&mut pm, shader, *outer);
        }
        Payload::Path(p) => draw_path(&mut pm, p),
        Payload::Pixels {
            colors,
            width: pw,
            height: ph,
        } => {
            let mut img = Image::new(*pw, *ph);
            for (i, px) in img.data_mut().chunks_exact_mut(4).enumerate() {
                let c = colors.get(i).copied().unwrap_or(Color::TRANSPARENT);
                px.copy_from_slice(&c.to_rgba8());
            }
            return fit(&from_image(&img)?, width, height);
        }
        Payload::Rendered(img) => return fit(&from_image(img)?, width, height),
        Payload::Encoded(bytes) => {
            let img = codec::decode_bytes(bytes)?;
            return fit(&from_image(&img)?, width, height);
        }
        Payload::File(path) => {
            let img = codec::decode_file(std::path::Path::new(path))?;
            return fit(&from_image(&img)?, width, height);
        }
        Payload::Canvas(_) => {
            return Err(BackendError::new(
                "rasterize",
                "nested canvases are merged by the renderer",
            ));
        }
    }
    Ok(pm)
}

fn fill_shader(pm: &mut Pixmap, shader: Option<tiny_skia::Shader<'static>>, fallback: Color) {
    // Degenerate gradients (zero-length axis) collapse to a solid color.
    let Some(shader) = shader else {
        pm.fill(skia_color(fallback));
        return;
    };
    let paint = Paint {
        shader,
        anti_alias: false,
        ..Paint::default()
    };
    if let Some(rect) = Rect::from_xywh(0.0, 0.0, pm.width() as f32, pm.height() as f32) {
        pm.fill_rect(rect, &paint, Transform::identity(), None);
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "tiny-skia works in f32; layer geometry fits comfortably"
)]
fn draw_path(pm: &mut Pixmap, p: &PathPayload) {
    pm.fill(skia_color(p.background));
    let Some(path) = to_skia_path(&p.path) else {
        return;
    };
    let offset = p.raster_offset();
    let ts = Transform::from_translate(offset.x as f32, offset.y as f32);
    let mut paint = Paint::default();
    paint.set_color(skia_color(p.fill));
    paint.anti_alias = true;
    pm.fill_path(&path, &paint, FillRule::Winding, ts, None);
    if p.stroke_width > 0.0 {
        paint.set_color(skia_color(p.stroke));
        let stroke = Stroke {
            width: p.stroke_width as f32,
            ..Stroke::default()
        };
        pm.stroke_path(&path, &paint, &stroke, ts, None);
    }
}

/// Converts a kurbo path; `None` when it has no drawable segments.
#[expect(
    clippy::cast_possible_truncation,
    reason = "tiny-skia works in f32; layer geometry fits comfortably"
)]
pub(crate) fn to_skia_path(path: &BezPath) -> Option<Path> {
    let mut pb = PathBuilder::new();
    let f = |p: kurbo::Point| (p.x as f32, p.y as f32);
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                let (x, y) = f(p);
                pb.move_to(x, y);
            }
            PathEl::LineTo(p) => {
                let (x, y) = f(p);
                pb.line_to(x, y);
            }
            PathEl::QuadTo(a, b) => {
                let ((x1, y1), (x, y)) = (f(a), f(b));
                pb.quad_to(x1, y1, x, y);
            }
            PathEl::CurveTo(a, b, c) => {
                let ((x1, y1), (x2, y2), (x, y)) = (f(a), f(b), f(c));
                pb.cubic_to(x1, y1, x2, y2, x, y);
            }
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

/// Scales `src` to exactly `width × height`, or copies it when the size
/// already matches.
pub(crate) fn fit(src: &Pixmap, width: u32, height: u32) -> Result<Pixmap, BackendError> {
    if src.width() == width && src.height() == height {
        return Ok(src.clone());
    }
    let mut out = new_pixmap(width, height, "rasterize")?;
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    let ts = Transform::from_scale(
        width as f32 / src.width() as f32,
        height as f32 / src.height() as f32,
    );
    out.draw_pixmap(0, 0, src.as_ref(), &paint, ts, None);
    Ok(out)
}
