// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The CPU backend's named-filter catalogue.
//!
//! Every filter keeps the raster's size. Centers given as `dx`/`dy` are
//! offsets from the raster center, with positive `dy` moving down. Angles
//! are in degrees.

use std::collections::HashMap;

use strata_core::color::Color;
use strata_core::filter::{FilterEntry, FilterRegistry, FilterSchema, ParamSpec, ParamValue};
use tiny_skia::{ColorU8, Pixmap};

use super::blur::gaussian_blur;
use super::raster::{pack, unit_byte, unpack};
use super::warp::Samples;
use crate::backend::BackendError;

/// Builds the registry of filters [`apply`] understands.
pub(crate) fn catalogue() -> FilterRegistry {
    let mut r = FilterRegistry::new();
    r.register(FilterSchema::new(
        "levels",
        [
            ParamSpec::number("r", 1.0, 0.0, 10.0),
            ParamSpec::number("g", 1.0, 0.0, 10.0),
            ParamSpec::number("b", 1.0, 0.0, 10.0),
            ParamSpec::number("a", 1.0, 0.0, 10.0),
        ],
    ));
    r.register(FilterSchema::new(
        "edges",
        [ParamSpec::number("intensity", 1.0, 0.0, 10.0)],
    ));
    r.register(FilterSchema::new(
        "motionblur",
        [
            ParamSpec::number("radius", 20.0, 0.0, 100.0),
            ParamSpec::number("angle", 0.0, -360.0, 360.0),
        ],
    ));
    r.alias("motion", "motionblur");
    r.register(FilterSchema::new(
        "zoomblur",
        [
            ParamSpec::number("amount", 20.0, 0.0, 200.0),
            ParamSpec::number("dx", 0.0, f64::MIN, f64::MAX),
            ParamSpec::number("dy", 0.0, f64::MIN, f64::MAX),
        ],
    ));
    r.alias("zoom", "zoomblur");
    r.register(FilterSchema::new(
        "pixelate",
        [ParamSpec::number("scale", 8.0, 1.0, 100.0)],
    ));
    r.alias("pixellate", "pixelate");
    r.register(FilterSchema::new(
        "bloom",
        [
            ParamSpec::number("radius", 10.0, 0.0, 100.0),
            ParamSpec::number("intensity", 1.0, 0.0, 1.0),
        ],
    ));
    r.register(FilterSchema::new(
        "twirl",
        [
            ParamSpec::number("dx", 0.0, f64::MIN, f64::MAX),
            ParamSpec::number("dy", 0.0, f64::MIN, f64::MAX),
            ParamSpec::number("radius", 150.0, 0.0, 500.0),
            ParamSpec::number("angle", 100.0, -3600.0, 3600.0),
        ],
    ));
    r.register(FilterSchema::new(
        "checkerboard",
        [
            ParamSpec::value("clr1", ParamValue::Color(Color::BLACK)),
            ParamSpec::value("clr2", ParamValue::Color(Color::WHITE)),
            ParamSpec::number("width", 80.0, 0.0, 800.0),
            ParamSpec::number("sharpness", 1.0, 0.0, 1.0),
        ],
    ));
    r.register(FilterSchema::new("average", []));
    r.register(FilterSchema::new(
        "posterize",
        [ParamSpec::number("levels", 6.0, 2.0, 30.0)],
    ));
    r.register(FilterSchema::new(
        "sepia",
        [ParamSpec::number("intensity", 1.0, 0.0, 1.0)],
    ));
    r
}

/// Applies a resolved filter.
#[expect(
    clippy::cast_possible_truncation,
    reason = "filter parameters are clamped to small ranges"
)]
pub(crate) fn apply(pm: &Pixmap, entry: &FilterEntry) -> Result<Pixmap, BackendError> {
    let n = |k: &str| entry.number(k) as f32;
    let out = match entry.name() {
        "levels" => {
            let m = [n("r"), n("g"), n("b"), n("a")];
            map_straight(pm, |c| [c[0] * m[0], c[1] * m[1], c[2] * m[2], c[3] * m[3]])
        }
        "edges" => edges(pm, n("intensity")),
        "motionblur" => motion_blur(pm, entry.number("radius"), entry.number("angle")),
        "zoomblur" => zoom_blur(
            pm,
            entry.number("amount"),
            entry.number("dx"),
            entry.number("dy"),
        ),
        "pixelate" => pixelate(pm, entry.number("scale")),
        "bloom" => bloom(pm, entry.number("radius"), n("intensity")),
        "twirl" => twirl(
            pm,
            entry.number("dx"),
            entry.number("dy"),
            entry.number("radius"),
            entry.number("angle"),
        ),
        "checkerboard" => checkerboard(
            pm,
            entry.color("clr1"),
            entry.color("clr2"),
            entry.number("width"),
            entry.number("sharpness"),
        ),
        "average" => average(pm),
        "posterize" => {
            let steps = n("levels").round().max(2.0) - 1.0;
            map_straight(pm, |c| {
                let q = |v: f32| (v * steps).round() / steps;
                [q(c[0]), q(c[1]), q(c[2]), c[3]]
            })
        }
        "sepia" => {
            let k = n("intensity");
            map_straight(pm, |c| {
                let [r, g, b, a] = c;
                let tone = [
                    0.393 * r + 0.769 * g + 0.189 * b,
                    0.349 * r + 0.686 * g + 0.168 * b,
                    0.272 * r + 0.534 * g + 0.131 * b,
                ];
                let mix = |from: f32, to: f32| from + (to - from) * k;
                [mix(r, tone[0]), mix(g, tone[1]), mix(b, tone[2]), a]
            })
        }
        other => {
            return Err(BackendError::new(
                "apply_filter",
                format!("filter `{other}` is not supported by this backend"),
            ));
        }
    };
    Ok(out)
}

/// Maps straight-alpha unit channels through `f`, clamping the result.
fn map_straight(pm: &Pixmap, f: impl Fn([f32; 4]) -> [f32; 4]) -> Pixmap {
    let mut out = pm.clone();
    for px in out.pixels_mut() {
        let c = px.demultiply();
        let unit = |v: u8| f32::from(v) / 255.0;
        let [r, g, b, a] = f([unit(c.red()), unit(c.green()), unit(c.blue()), unit(c.alpha())])
            .map(unit_byte);
        *px = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    out
}

fn from_floats(pm: &Pixmap, data: &[[f32; 4]]) -> Pixmap {
    let mut out = pm.clone();
    pack(&mut out, data);
    out
}

fn center(pm: &Pixmap, dx: f64, dy: f64) -> (f64, f64) {
    (
        f64::from(pm.width()) / 2.0 + dx,
        f64::from(pm.height()) / 2.0 + dy,
    )
}

/// Sobel gradient magnitude per color channel; alpha is kept.
fn edges(pm: &Pixmap, intensity: f32) -> Pixmap {
    let s = Samples::new(pm);
    let (w, h) = (s.width, s.height);
    let at = |x: usize, y: usize, dx: isize, dy: isize| {
        let x = x.saturating_add_signed(dx).min(w - 1);
        let y = y.saturating_add_signed(dy).min(h - 1);
        s.data[y * w + x]
    };
    let mut out = Vec::with_capacity(s.data.len());
    for y in 0..h {
        for x in 0..w {
            let mut px = [0.0; 4];
            for (c, v) in px.iter_mut().take(3).enumerate() {
                let p = |dx, dy| at(x, y, dx, dy)[c];
                let gx = p(1, -1) + 2.0 * p(1, 0) + p(1, 1) - p(-1, -1) - 2.0 * p(-1, 0) - p(-1, 1);
                let gy = p(-1, 1) + 2.0 * p(0, 1) + p(1, 1) - p(-1, -1) - 2.0 * p(0, -1) - p(1, -1);
                *v = (gx * gx + gy * gy).sqrt() * intensity;
            }
            px[3] = s.data[y * w + x][3];
            out.push(px);
        }
    }
    from_floats(pm, &out)
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "tap counts are bounded by the clamped radius"
)]
fn motion_blur(pm: &Pixmap, radius: f64, angle: f64) -> Pixmap {
    let taps = radius.ceil() as i32;
    if taps <= 0 {
        return pm.clone();
    }
    let (sin, cos) = angle.to_radians().sin_cos();
    let s = Samples::new(pm);
    let count = (2 * taps + 1) as f32;
    let mut out = Vec::with_capacity(s.data.len());
    for y in 0..pm.height() {
        for x in 0..pm.width() {
            let (cx, cy) = (f64::from(x) + 0.5, f64::from(y) + 0.5);
            let mut acc = [0.0_f32; 4];
            for t in -taps..=taps {
                let d = f64::from(t) * radius / f64::from(taps);
                let v = s.bilinear(cx + d * cos, cy + d * sin);
                for (a, v) in acc.iter_mut().zip(v) {
                    *a += v;
                }
            }
            out.push(acc.map(|v| v / count));
        }
    }
    from_floats(pm, &out)
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "tap counts are bounded by the clamped amount"
)]
fn zoom_blur(pm: &Pixmap, amount: f64, dx: f64, dy: f64) -> Pixmap {
    let taps = (amount.ceil() as u32).min(32);
    if taps == 0 {
        return pm.clone();
    }
    let (cx, cy) = center(pm, dx, dy);
    // The farthest corner streaks by `amount` pixels towards the center.
    let reach = f64::from(pm.width()).hypot(f64::from(pm.height())).max(1.0);
    let s = Samples::new(pm);
    let count = (taps + 1) as f32;
    let mut out = Vec::with_capacity(s.data.len());
    for y in 0..pm.height() {
        for x in 0..pm.width() {
            let (px, py) = (f64::from(x) + 0.5, f64::from(y) + 0.5);
            let mut acc = [0.0_f32; 4];
            for t in 0..=taps {
                let k = 1.0 - amount / reach * f64::from(t) / f64::from(taps);
                let v = s.bilinear(cx + (px - cx) * k, cy + (py - cy) * k);
                for (a, v) in acc.iter_mut().zip(v) {
                    *a += v;
                }
            }
            out.push(acc.map(|v| v / count));
        }
    }
    from_floats(pm, &out)
}

/// Averages square blocks of `scale` pixels aligned on the raster center.
#[expect(
    clippy::cast_possible_truncation,
    reason = "block indices are small integers"
)]
fn pixelate(pm: &Pixmap, scale: f64) -> Pixmap {
    let scale = scale.max(1.0);
    let (cx, cy) = center(pm, 0.0, 0.0);
    let block = |x: u32, y: u32| {
        (
            ((f64::from(x) + 0.5 - cx) / scale).floor() as i64,
            ((f64::from(y) + 0.5 - cy) / scale).floor() as i64,
        )
    };
    let data = unpack(pm);
    let mut sums: HashMap<(i64, i64), ([f32; 4], f32)> = HashMap::new();
    let coords = || (0..pm.height()).flat_map(|y| (0..pm.width()).map(move |x| (x, y)));
    for ((x, y), px) in coords().zip(&data) {
        let (sum, n) = sums.entry(block(x, y)).or_default();
        for (s, v) in sum.iter_mut().zip(px) {
            *s += v;
        }
        *n += 1.0;
    }
    let out: Vec<[f32; 4]> = coords()
        .map(|(x, y)| {
            sums.get(&block(x, y))
                .map_or([0.0; 4], |(sum, n)| sum.map(|v| v / n))
        })
        .collect();
    from_floats(pm, &out)
}

/// Adds a blurred copy on top, scaled by `intensity`.
fn bloom(pm: &Pixmap, radius: f64, intensity: f32) -> Pixmap {
    let glow = unpack(&gaussian_blur(pm, radius));
    let mut data = unpack(pm);
    for (px, g) in data.iter_mut().zip(&glow) {
        for (v, g) in px.iter_mut().zip(g) {
            *v = (*v + g * intensity).min(1.0);
        }
    }
    from_floats(pm, &data)
}

/// Rotates content around the center, by `angle` at the center falling
/// off to nothing at `radius`.
fn twirl(pm: &Pixmap, dx: f64, dy: f64, radius: f64, angle: f64) -> Pixmap {
    if radius <= 0.0 || angle == 0.0 {
        return pm.clone();
    }
    let (cx, cy) = center(pm, dx, dy);
    let s = Samples::new(pm);
    let mut out = Vec::with_capacity(s.data.len());
    for y in 0..pm.height() {
        for x in 0..pm.width() {
            let (vx, vy) = (f64::from(x) + 0.5 - cx, f64::from(y) + 0.5 - cy);
            let r = vx.hypot(vy);
            if r >= radius {
                out.push(s.bilinear(vx + cx, vy + cy));
                continue;
            }
            let theta = -(angle.to_radians() * (1.0 - r / radius));
            let (sin, cos) = theta.sin_cos();
            out.push(s.bilinear(
                cx + vx * cos - vy * sin,
                cy + vx * sin + vy * cos,
            ));
        }
    }
    from_floats(pm, &out)
}

/// Draws a checkerboard of `width`-pixel squares over the raster. Lower
/// `sharpness` blends the colors across square edges.
#[expect(
    clippy::cast_possible_truncation,
    reason = "blend weights are unit floats"
)]
fn checkerboard(pm: &Pixmap, a: Color, b: Color, width: f64, sharpness: f64) -> Pixmap {
    if width <= 0.0 {
        return pm.clone();
    }
    let mut data = unpack(pm);
    let band = (1.0 - sharpness) * width / 2.0;
    let premul = |c: Color| {
        let [r, g, b, a] = c.to_array();
        [r * a, g * a, b * a, a].map(|v| v as f32)
    };
    let (ca, cb) = (premul(a), premul(b));
    let w = pm.width();
    for (i, dst) in (0_u32..).zip(data.iter_mut()) {
        let (x, y) = (f64::from(i % w) + 0.5, f64::from(i / w) + 0.5);
        let (fx, fy) = ((x / width).floor(), (y / width).floor());
        let odd = (fx + fy).rem_euclid(2.0) >= 1.0;
        let (own, other) = if odd { (cb, ca) } else { (ca, cb) };
        // Distance to the nearest square edge.
        let edge = (x - fx * width)
            .min((fx + 1.0) * width - x)
            .min(y - fy * width)
            .min((fy + 1.0) * width - y);
        let t = if band <= 0.0 {
            1.0
        } else {
            (0.5 + 0.5 * (edge / band).min(1.0)) as f32
        };
        let top: [f32; 4] = core::array::from_fn(|c| own[c] * t + other[c] * (1.0 - t));
        let keep = 1.0 - top[3];
        for (d, s) in dst.iter_mut().zip(top) {
            *d = s + *d * keep;
        }
    }
    from_floats(pm, &data)
}

/// Fills the raster with its mean premultiplied color.
fn average(pm: &Pixmap) -> Pixmap {
    let data = unpack(pm);
    let mut sum = [0.0_f64; 4];
    for px in &data {
        for (s, v) in sum.iter_mut().zip(px) {
            *s += f64::from(*v);
        }
    }
    let n = data.len().max(1) as f64;
    #[expect(
        clippy::cast_possible_truncation,
        reason = "means of unit floats are unit floats"
    )]
    let mean = sum.map(|s| (s / n) as f32);
    from_floats(pm, &vec![mean; data.len()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::ops::luma;
    use crate::cpu::raster::skia_color;

    fn gray_of(pm: &Pixmap, x: u32, y: u32) -> f32 {
        let c = pm.pixel(x, y).unwrap().demultiply();
        let unit = |v: u8| f32::from(v) / 255.0;
        luma(unit(c.red()), unit(c.green()), unit(c.blue()))
    }

    fn solid(w: u32, h: u32, c: Color) -> Pixmap {
        let mut pm = Pixmap::new(w, h).unwrap();
        pm.fill(skia_color(c));
        pm
    }

    fn px(pm: &Pixmap, x: u32, y: u32) -> [u8; 4] {
        let c = pm.pixel(x, y).unwrap().demultiply();
        [c.red(), c.green(), c.blue(), c.alpha()]
    }

    fn run(pm: &Pixmap, name: &str, params: &[(&str, ParamValue)]) -> Pixmap {
        let entry = catalogue().resolve(name, params).unwrap();
        apply(pm, &entry).unwrap()
    }

    /// Left half black, right half white.
    fn split(w: u32, h: u32) -> Pixmap {
        let mut pm = solid(w, h, Color::BLACK);
        let white = skia_color(Color::WHITE).premultiply().to_color_u8();
        for (i, p) in (0_u32..).zip(pm.pixels_mut()) {
            if i % w >= w / 2 {
                *p = white;
            }
        }
        pm
    }

    #[test]
    fn short_names_resolve_to_canonical_filters() {
        let r = catalogue();
        assert_eq!(r.canonical_name("Motion"), Some("motionblur"));
        assert_eq!(r.canonical_name("zoom"), Some("zoomblur"));
        assert_eq!(r.canonical_name("pixellate"), Some("pixelate"));
        assert!(r.resolve("kaleidoscope", &[]).is_err());
        let e = r.resolve("bloom", &[("intensity", 5.0.into())]).unwrap();
        assert_eq!(e.number("intensity"), 1.0);
        assert_eq!(e.number("radius"), 10.0);
    }

    #[test]
    fn levels_scale_channels() {
        let red = solid(1, 1, Color::rgb(1.0, 0.5, 0.0));
        let out = run(&red, "levels", &[("r", 0.0.into())]);
        assert_eq!(px(&out, 0, 0), [0, 128, 0, 255]);
        let out = run(&red, "levels", &[("a", 0.0.into())]);
        assert_eq!(out.pixel(0, 0).unwrap().alpha(), 0);
    }

    #[test]
    fn edges_light_up_only_at_steps() {
        let out = run(&split(8, 4), "edges", &[]);
        assert_eq!(px(&out, 0, 1), [0, 0, 0, 255]);
        assert!(gray_of(&out, 4, 1) > 0.9);
        assert_eq!(px(&out, 7, 1), [0, 0, 0, 255]);
    }

    #[test]
    fn blurs_soften_a_step() {
        let pm = split(40, 3);
        let out = run(&pm, "motion", &[("radius", 4.0.into())]);
        let mid = gray_of(&out, 20, 1);
        assert!(mid > 0.2 && mid < 0.9);
        assert_eq!(px(&out, 2, 1)[0], 0);

        let out = run(&pm, "motion", &[("radius", 0.0.into())]);
        assert_eq!(out.pixels(), pm.pixels());

        let out = run(&pm, "zoom", &[("amount", 0.0.into())]);
        assert_eq!(out.pixels(), pm.pixels());
    }

    #[test]
    fn pixelate_makes_uniform_blocks() {
        let out = run(&split(8, 8), "pixelate", &[("scale", 8.0.into())]);
        // Blocks are centered, so the step at x = 4 stays a block edge.
        assert_eq!(px(&out, 0, 0), px(&out, 3, 7));
        assert_eq!(px(&out, 4, 0), px(&out, 7, 7));

        // Alternating pixels average to gray within a block.
        let mut stripes = split(4, 1);
        stripes.pixels_mut().swap(1, 2);
        let out = run(&stripes, "pixelate", &[("scale", 2.0.into())]);
        assert_eq!(px(&out, 0, 0), px(&out, 1, 0));
        assert!((127..=128).contains(&px(&out, 0, 0)[0]));
    }

    #[test]
    fn bloom_brightens_near_light() {
        let out = run(&split(20, 20), "bloom", &[("radius", 3.0.into())]);
        assert!(px(&out, 8, 10)[0] > 0);
        assert_eq!(px(&out, 15, 10), [255, 255, 255, 255]);
    }

    #[test]
    fn twirl_moves_pixels_inside_the_radius_only() {
        let pm = split(40, 40);
        let out = run(&pm, "twirl", &[("radius", 10.0.into()), ("angle", 90.0.into())]);
        assert_ne!(px(&out, 20, 15), px(&pm, 20, 15));
        assert_eq!(px(&out, 2, 2), px(&pm, 2, 2));
        let out = run(&pm, "twirl", &[("radius", 0.0.into())]);
        assert_eq!(out.pixels(), pm.pixels());
    }

    #[test]
    fn checkerboard_covers_the_layer() {
        let pm = solid(8, 8, Color::rgb(1.0, 0.0, 0.0));
        let out = run(&pm, "checkerboard", &[("width", 2.0.into())]);
        assert_eq!(px(&out, 0, 0), [0, 0, 0, 255]);
        assert_eq!(px(&out, 2, 0), [255, 255, 255, 255]);
        assert_eq!(px(&out, 2, 2), [0, 0, 0, 255]);

        let clear = ParamValue::Color(Color::TRANSPARENT);
        let out = run(&pm, "checkerboard", &[("clr1", clear), ("width", 2.0.into())]);
        assert_eq!(px(&out, 0, 0), [255, 0, 0, 255]);
    }

    #[test]
    fn average_fills_with_the_mean() {
        let out = run(&split(2, 1), "average", &[]);
        let [r, g, b, a] = px(&out, 0, 0);
        assert!((127..=128).contains(&r));
        assert_eq!((r, g), (g, b));
        assert_eq!(a, 255);
        assert_eq!(px(&out, 0, 0), px(&out, 1, 0));
    }

    #[test]
    fn posterize_and_sepia() {
        let pm = solid(1, 1, Color::rgb(0.2, 0.6, 0.9));
        let out = run(&pm, "posterize", &[("levels", 2.0.into())]);
        assert_eq!(px(&out, 0, 0), [0, 255, 255, 255]);

        let white = solid(1, 1, Color::WHITE);
        let out = run(&white, "sepia", &[]);
        assert_eq!(px(&out, 0, 0), [255, 255, 239, 255]);
        let out = run(&white, "sepia", &[("intensity", 0.0.into())]);
        assert_eq!(px(&out, 0, 0), [255, 255, 255, 255]);
    }
}
