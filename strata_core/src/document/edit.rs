// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer property getters and mutators.
//!
//! Mutators are setters: each replaces the field it names, except the flips
//! and [`invert`](Document::invert), which toggle. Numeric inputs are clamped
//! to their documented ranges instead of being rejected. Every mutator marks
//! the layer for re-render.

use alloc::string::String;
use alloc::sync::Arc;

use kurbo::{Point, Rect, Size, Vec2};

use super::build::clamp_or;
use super::id::LayerId;
use super::layer::{Adjustments, BlendMode, Compositing, Coord, Effects, Placement, Shadow};
use super::payload::Payload;
use super::store::Document;
use crate::error::Result;
use crate::filter::{FilterRegistry, ParamValue};
use crate::image::Image;

/// Range of the built-in blur and sharpen amounts.
pub const EFFECT_RANGE: (f64, f64) = (0.0, 100.0);

impl Document {
    // -- Property getters (read-only, no dirty marking) --

    /// Returns a layer's payload.
    #[must_use]
    pub fn payload(&self, id: LayerId) -> &Payload {
        self.validate(id);
        &self.payload[id.idx as usize]
    }

    /// Returns a layer's placement.
    #[must_use]
    pub fn placement(&self, id: LayerId) -> &Placement {
        self.validate(id);
        &self.placement[id.idx as usize]
    }

    /// Returns a layer's compositing state.
    #[must_use]
    pub fn compositing(&self, id: LayerId) -> &Compositing {
        self.validate(id);
        &self.compositing[id.idx as usize]
    }

    /// Returns a layer's color adjustments.
    #[must_use]
    pub fn adjustments(&self, id: LayerId) -> &Adjustments {
        self.validate(id);
        &self.adjustments[id.idx as usize]
    }

    /// Returns a layer's effects.
    #[must_use]
    pub fn effects(&self, id: LayerId) -> &Effects {
        self.validate(id);
        &self.effects[id.idx as usize]
    }

    /// Returns a layer's name.
    #[must_use]
    pub fn name(&self, id: LayerId) -> Option<&str> {
        self.validate(id);
        self.name[id.idx as usize].as_deref()
    }

    /// Whether a layer is hidden.
    #[must_use]
    pub fn is_hidden(&self, id: LayerId) -> bool {
        self.compositing(id).hidden
    }

    // -- Placement --

    /// Moves the layer's origin point.
    ///
    /// Fractions are relative to the owning canvas; integers are pixels.
    pub fn translate(&mut self, id: LayerId, x: impl Into<Coord>, y: impl Into<Coord>) {
        self.validate(id);
        let (cw, ch) = self.canvas_extent(id);
        let p = &mut self.placement[id.idx as usize];
        p.x = x.into().to_pixels(cw);
        p.y = y.into().to_pixels(ch);
        self.touch(id.idx);
    }

    /// Sets the pivot point.
    ///
    /// Accepts [`Anchor`](super::Anchor)s, fractions of the base box, or
    /// pixels (converted to fractions of the base box).
    pub fn set_origin(&mut self, id: LayerId, x: impl Into<Coord>, y: impl Into<Coord>) {
        self.validate(id);
        let p = &mut self.placement[id.idx as usize];
        p.origin = Point::new(
            x.into().to_fraction(p.width),
            y.into().to_fraction(p.height),
        );
        self.touch(id.idx);
    }

    /// Pivots about the top-left corner.
    pub fn origin_top_left(&mut self, id: LayerId) {
        self.set_origin(id, 0.0, 0.0);
    }

    /// Pivots about the center (the default).
    pub fn origin_center(&mut self, id: LayerId) {
        self.set_origin(id, 0.5, 0.5);
    }

    /// Pivots about the bottom-right corner.
    pub fn origin_bottom_right(&mut self, id: LayerId) {
        self.set_origin(id, 1.0, 1.0);
    }

    /// Sets the scale.
    ///
    /// A fraction is a factor; pixels are a target size measured against
    /// the cropped box. Without `h`, both axes use the factor derived from
    /// `w`, keeping proportions.
    pub fn set_scale(&mut self, id: LayerId, w: impl Into<Coord>, h: Option<Coord>) {
        self.validate(id);
        let p = &self.placement[id.idx as usize];
        let base = p.cropped_size();
        let factor = |c: Coord, extent: f64| match c {
            Coord::Fraction(f) => f,
            Coord::Pixels(_) => c.to_fraction(extent),
        };
        let sx = factor(w.into(), base.width);
        let sy = h.map_or(sx, |h| factor(h, base.height));
        self.set_scale_xy(id, sx, sy);
    }

    /// Sets both scale factors directly.
    pub fn set_scale_xy(&mut self, id: LayerId, sx: f64, sy: f64) {
        self.validate(id);
        self.placement[id.idx as usize].scale = Vec2::new(finite_or(sx, 1.0), finite_or(sy, 1.0));
        self.touch(id.idx);
    }

    /// Sets the clockwise rotation in degrees.
    pub fn rotate(&mut self, id: LayerId, degrees: f64) {
        self.validate(id);
        self.placement[id.idx as usize].rotation = finite_or(degrees, 0.0);
        self.touch(id.idx);
    }

    /// Toggles horizontal mirroring.
    pub fn flip_horizontal(&mut self, id: LayerId) {
        self.validate(id);
        let f = &mut self.placement[id.idx as usize].flip;
        f.horizontal = !f.horizontal;
        self.touch(id.idx);
    }

    /// Toggles vertical mirroring.
    pub fn flip_vertical(&mut self, id: LayerId) {
        self.validate(id);
        let f = &mut self.placement[id.idx as usize].flip;
        f.vertical = !f.vertical;
        self.touch(id.idx);
    }

    /// Replaces all four corner offsets, given as fractions of the box
    /// (top-left, top-right, bottom-right, bottom-left).
    pub fn distort(&mut self, id: LayerId, corners: [Vec2; 4]) {
        self.validate(id);
        self.placement[id.idx as usize].distort =
            corners.map(|c| Vec2::new(finite_or(c.x, 0.0), finite_or(c.y, 0.0)));
        self.touch(id.idx);
    }

    /// Like [`distort`](Self::distort), with offsets in pixels of the base
    /// box.
    pub fn distort_pixels(&mut self, id: LayerId, corners: [Vec2; 4]) {
        self.validate(id);
        let p = &self.placement[id.idx as usize];
        let (w, h) = (p.width, p.height);
        let frac = |v: f64, e: f64| if e == 0.0 { 0.0 } else { v / e };
        self.distort(id, corners.map(|c| Vec2::new(frac(c.x, w), frac(c.y, h))));
    }

    /// Clips the layer to a sub-rectangle of its base box.
    ///
    /// Fractions are relative to the base size. A negative width or height
    /// means "to the far edge, minus that much". The rectangle is clipped to
    /// the base box, so a crop running past an edge ends at that edge.
    pub fn crop(
        &mut self,
        id: LayerId,
        x: impl Into<Coord>,
        y: impl Into<Coord>,
        w: impl Into<Coord>,
        h: impl Into<Coord>,
    ) {
        self.validate(id);
        let p = &mut self.placement[id.idx as usize];
        let x = x.into().to_pixels(p.width);
        let y = y.into().to_pixels(p.height);
        let mut w = w.into().to_pixels(p.width);
        let mut h = h.into().to_pixels(p.height);
        if w < 0.0 {
            w += p.width - x;
        }
        if h < 0.0 {
            h += p.height - y;
        }
        let x0 = x.clamp(0.0, p.width);
        let y0 = y.clamp(0.0, p.height);
        let x1 = (x + w.max(0.0)).clamp(x0, p.width);
        let y1 = (y + h.max(0.0)).clamp(y0, p.height);
        p.crop = Some(Rect::new(x0, y0, x1, y1));
        self.touch(id.idx);
    }

    /// Removes the crop.
    pub fn clear_crop(&mut self, id: LayerId) {
        self.validate(id);
        self.placement[id.idx as usize].crop = None;
        self.touch(id.idx);
    }

    // -- Compositing --

    /// Sets opacity, clamped to `[0, 1]`.
    pub fn set_opacity(&mut self, id: LayerId, opacity: f64) {
        self.validate(id);
        self.compositing[id.idx as usize].opacity = clamp_or(opacity, 0.0, 1.0, 1.0);
        self.touch(id.idx);
    }

    /// Sets opacity from a percentage.
    pub fn set_opacity_percent(&mut self, id: LayerId, percent: i64) {
        self.set_opacity(id, percent.clamp(0, 100) as f64 / 100.0);
    }

    /// Sets the blend operator.
    pub fn set_blend_mode(&mut self, id: LayerId, mode: BlendMode) {
        self.validate(id);
        self.compositing[id.idx as usize].blend = mode;
        self.touch(id.idx);
    }

    /// Sets opacity and blend operator together.
    pub fn blend(&mut self, id: LayerId, opacity: f64, mode: BlendMode) {
        self.set_opacity(id, opacity);
        self.set_blend_mode(id, mode);
    }

    /// Hides the layer from merges.
    pub fn hide(&mut self, id: LayerId) {
        self.set_hidden(id, true);
    }

    /// Shows a hidden layer.
    pub fn show(&mut self, id: LayerId) {
        self.set_hidden(id, false);
    }

    fn set_hidden(&mut self, id: LayerId, hidden: bool) {
        self.validate(id);
        self.compositing[id.idx as usize].hidden = hidden;
        self.touch(id.idx);
    }

    /// Adds a drop shadow. Alpha is clamped to `[0, 1]` and blur to
    /// `[0, ∞)`.
    pub fn dropshadow(&mut self, id: LayerId, shadow: Shadow) {
        self.validate(id);
        let d = Shadow::default();
        self.compositing[id.idx as usize].shadow = Some(Shadow {
            dx: finite_or(shadow.dx, d.dx),
            dy: finite_or(shadow.dy, d.dy),
            alpha: clamp_or(shadow.alpha, 0.0, 1.0, d.alpha),
            blur: clamp_or(shadow.blur, 0.0, f64::INFINITY, d.blur),
        });
        self.touch(id.idx);
    }

    /// Removes the drop shadow.
    pub fn clear_shadow(&mut self, id: LayerId) {
        self.validate(id);
        self.compositing[id.idx as usize].shadow = None;
        self.touch(id.idx);
    }

    // -- Adjustments --

    /// Sets brightness, clamped to `[-1, 1]`.
    pub fn set_brightness(&mut self, id: LayerId, v: f64) {
        self.validate(id);
        let (lo, hi) = Adjustments::BRIGHTNESS;
        self.adjustments[id.idx as usize].brightness = clamp_or(v, lo, hi, 0.0);
        self.touch(id.idx);
    }

    /// Sets contrast, clamped to `[0.25, 4]`.
    pub fn set_contrast(&mut self, id: LayerId, v: f64) {
        self.validate(id);
        let (lo, hi) = Adjustments::CONTRAST;
        self.adjustments[id.idx as usize].contrast = clamp_or(v, lo, hi, 1.0);
        self.touch(id.idx);
    }

    /// Sets saturation, clamped to `[0, 2]`.
    pub fn set_saturation(&mut self, id: LayerId, v: f64) {
        self.validate(id);
        let (lo, hi) = Adjustments::SATURATION;
        self.adjustments[id.idx as usize].saturation = clamp_or(v, lo, hi, 1.0);
        self.touch(id.idx);
    }

    /// Sets brightness, contrast and saturation.
    pub fn adjust(&mut self, id: LayerId, brightness: f64, contrast: f64, saturation: f64) {
        self.set_brightness(id, brightness);
        self.set_contrast(id, contrast);
        self.set_saturation(id, saturation);
    }

    /// Removes all color.
    pub fn desaturate(&mut self, id: LayerId) {
        self.set_saturation(id, 0.0);
    }

    /// Toggles channel inversion.
    pub fn invert(&mut self, id: LayerId) {
        self.validate(id);
        let a = &mut self.adjustments[id.idx as usize];
        a.inverted = !a.inverted;
        self.touch(id.idx);
    }

    // -- Effects --

    /// Applies an effect.
    ///
    /// `"blur"` and `"sharpen"` set the built-in amounts from the `amount`
    /// parameter (defaults 10 and 2.5). Any other name is resolved through
    /// `registry` and appended to the filter chain.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownFilter`](crate::Error::UnknownFilter) when the name
    /// is not registered.
    pub fn filter(
        &mut self,
        id: LayerId,
        registry: &FilterRegistry,
        name: &str,
        params: &[(&str, ParamValue)],
    ) -> Result<()> {
        self.validate(id);
        let amount = |default: f64| {
            params
                .iter()
                .rev()
                .find_map(|(k, v)| match (*k, v) {
                    ("amount", ParamValue::Number(n)) => Some(*n),
                    _ => None,
                })
                .unwrap_or(default)
        };
        if name.eq_ignore_ascii_case("blur") {
            self.blur(id, amount(10.0));
        } else if name.eq_ignore_ascii_case("sharpen") {
            self.sharpen(id, amount(2.5));
        } else {
            let entry = registry.resolve(name, params)?;
            self.effects[id.idx as usize].filters.push(entry);
            self.touch(id.idx);
        }
        Ok(())
    }

    /// Sets the Gaussian blur amount, clamped to `[0, 100]`.
    pub fn blur(&mut self, id: LayerId, amount: f64) {
        self.validate(id);
        let (lo, hi) = EFFECT_RANGE;
        self.effects[id.idx as usize].blur = clamp_or(amount, lo, hi, 0.0);
        self.touch(id.idx);
    }

    /// Sets the unsharp-mask amount, clamped to `[0, 100]`.
    pub fn sharpen(&mut self, id: LayerId, amount: f64) {
        self.validate(id);
        let (lo, hi) = EFFECT_RANGE;
        self.effects[id.idx as usize].sharpness = clamp_or(amount, lo, hi, 0.0);
        self.touch(id.idx);
    }

    /// Removes blur, sharpen and every named filter.
    pub fn clear_filters(&mut self, id: LayerId) {
        self.validate(id);
        let e = &mut self.effects[id.idx as usize];
        e.blur = 0.0;
        e.sharpness = 0.0;
        e.filters.clear();
        self.touch(id.idx);
    }

    /// Chooses whether filters run before (`true`) or after transforms.
    pub fn set_filters_first(&mut self, id: LayerId, first: bool) {
        self.validate(id);
        self.effects[id.idx as usize].filters_first = first;
        self.touch(id.idx);
    }

    /// Renames the layer.
    pub fn set_name(&mut self, id: LayerId, name: impl Into<String>) {
        self.validate(id);
        self.name[id.idx as usize] = Some(name.into());
    }

    /// Replaces the payload with a rendered raster, keeping every other
    /// property.
    ///
    /// The base size becomes the raster size and the crop is cleared, since
    /// crop rectangles refer to the old payload's pixels.
    pub fn set_rendered(&mut self, id: LayerId, image: impl Into<Arc<Image>>) {
        self.validate(id);
        let image = image.into();
        let i = id.idx as usize;
        let p = &mut self.placement[i];
        p.width = f64::from(image.width());
        p.height = f64::from(image.height());
        p.crop = None;
        self.payload[i] = Payload::Rendered(image);
        self.touch(id.idx);
    }

    // -- Geometry queries --

    /// Axis-aligned bounds of the transformed layer in canvas space.
    #[must_use]
    pub fn bounds(&self, id: LayerId) -> Rect {
        self.placement(id).bounds()
    }

    /// Size of [`bounds`](Self::bounds).
    #[must_use]
    pub fn size(&self, id: LayerId) -> Size {
        self.bounds(id).size()
    }

    fn canvas_extent(&self, id: LayerId) -> (f64, f64) {
        let (w, h) = self.canvas_size(self.canvas_of(id));
        (f64::from(w), f64::from(h))
    }
}

fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() { v } else { fallback }
}
