// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-layer state records.
//!
//! The [`Document`](super::Document) stores one of each record per layer slot
//! and hands out shared references; every mutation goes through a document
//! method so that clamping and dirty marking cannot be bypassed.

use alloc::vec::Vec;

use kurbo::{Point, Rect, Size, Vec2};

use crate::filter::FilterEntry;

// ---------------------------------------------------------------------------
// Blend modes
// ---------------------------------------------------------------------------

/// How a layer's raster combines with what is already on the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Source-over.
    #[default]
    Normal,
    /// Per-channel maximum.
    Lighten,
    /// Per-channel minimum.
    Darken,
    /// Per-channel product.
    Multiply,
    /// Inverse product of the inverses.
    Screen,
    /// Multiply or screen depending on the backdrop.
    Overlay,
    /// Soft light.
    SoftLight,
    /// Multiply or screen depending on the source.
    HardLight,
    /// Absolute difference.
    Difference,
    /// Source hue with backdrop saturation and luminosity.
    Hue,
    /// Source hue and saturation with backdrop luminosity.
    Color,
}

impl BlendMode {
    /// Every blend mode, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::Normal,
        Self::Lighten,
        Self::Darken,
        Self::Multiply,
        Self::Screen,
        Self::Overlay,
        Self::SoftLight,
        Self::HardLight,
        Self::Difference,
        Self::Hue,
        Self::Color,
    ];

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Lighten => "lighten",
            Self::Darken => "darken",
            Self::Multiply => "multiply",
            Self::Screen => "screen",
            Self::Overlay => "overlay",
            Self::SoftLight => "softlight",
            Self::HardLight => "hardlight",
            Self::Difference => "difference",
            Self::Hue => "hue",
            Self::Color => "color",
        }
    }

    /// Parses a name case-insensitively. Underscores and dashes are ignored,
    /// so `"soft-light"` and `"SOFT_LIGHT"` both match.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let mut buf = [0_u8; 16];
        let mut n = 0;
        for b in name.bytes().filter(|b| *b != b'_' && *b != b'-') {
            if n == buf.len() {
                return None;
            }
            buf[n] = b.to_ascii_lowercase();
            n += 1;
        }
        let key = &buf[..n];
        Self::ALL.into_iter().find(|m| m.name().as_bytes() == key)
    }
}

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// A coordinate given either relative to some extent or in pixels.
///
/// Floating-point inputs convert to [`Fraction`](Self::Fraction) and integer
/// inputs to [`Pixels`](Self::Pixels), so `translate(doc, id, 0.5, 0.5)`
/// centers a layer while `translate(doc, id, 10, 20)` places it at an
/// absolute position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Coord {
    /// A fraction of the relevant extent.
    Fraction(f64),
    /// Absolute pixels.
    Pixels(i64),
}

impl Coord {
    /// Resolves to pixels against `extent`.
    #[inline]
    #[must_use]
    pub fn to_pixels(self, extent: f64) -> f64 {
        match self {
            Self::Fraction(f) => f * extent,
            Self::Pixels(p) => p as f64,
        }
    }

    /// Resolves to a fraction of `extent`. A zero extent yields `0.0` for
    /// pixel inputs.
    #[inline]
    #[must_use]
    pub fn to_fraction(self, extent: f64) -> f64 {
        match self {
            Self::Fraction(f) => f,
            Self::Pixels(_) if extent == 0.0 => 0.0,
            Self::Pixels(_) => self.to_pixels(1.0) / extent,
        }
    }
}

impl From<f64> for Coord {
    fn from(v: f64) -> Self {
        Self::Fraction(v)
    }
}

impl From<f32> for Coord {
    fn from(v: f32) -> Self {
        Self::Fraction(f64::from(v))
    }
}

impl From<i32> for Coord {
    fn from(v: i32) -> Self {
        Self::Pixels(i64::from(v))
    }
}

impl From<i64> for Coord {
    fn from(v: i64) -> Self {
        Self::Pixels(v)
    }
}

impl From<u32> for Coord {
    fn from(v: u32) -> Self {
        Self::Pixels(i64::from(v))
    }
}

/// Named origin positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// Left edge (x = 0).
    Left,
    /// Top edge (y = 0).
    Top,
    /// Right edge (x = 1).
    Right,
    /// Bottom edge (y = 1).
    Bottom,
    /// Middle (0.5).
    Center,
}

impl From<Anchor> for Coord {
    fn from(a: Anchor) -> Self {
        Self::Fraction(match a {
            Anchor::Left | Anchor::Top => 0.0,
            Anchor::Right | Anchor::Bottom => 1.0,
            Anchor::Center => 0.5,
        })
    }
}

// ---------------------------------------------------------------------------
// State records
// ---------------------------------------------------------------------------

/// Horizontal and vertical mirroring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Flip {
    /// Mirror left to right.
    pub horizontal: bool,
    /// Mirror top to bottom.
    pub vertical: bool,
}

impl Flip {
    /// Whether either axis is mirrored.
    #[inline]
    #[must_use]
    pub const fn any(self) -> bool {
        self.horizontal || self.vertical
    }
}

/// A drop shadow drawn underneath its layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shadow {
    /// Horizontal offset in pixels.
    pub dx: f64,
    /// Vertical offset in pixels (positive moves down).
    pub dy: f64,
    /// Shadow opacity in `[0, 1]`.
    pub alpha: f64,
    /// Blur amount; the shadow is blurred with half this radius.
    pub blur: f64,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            dx: 10.0,
            dy: 10.0,
            alpha: 0.75,
            blur: 8.0,
        }
    }
}

/// Where a layer sits and how it is shaped.
#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    /// Horizontal position of the origin point in canvas pixels.
    pub x: f64,
    /// Vertical position of the origin point in canvas pixels.
    pub y: f64,
    /// Intrinsic width.
    pub width: f64,
    /// Intrinsic height.
    pub height: f64,
    /// Pivot for scale, rotation and positioning, as a fraction of the box.
    pub origin: Point,
    /// Horizontal and vertical scale factors.
    pub scale: Vec2,
    /// Clockwise rotation in degrees.
    pub rotation: f64,
    /// Mirroring, applied about the box center before everything else.
    pub flip: Flip,
    /// Per-corner offsets as fractions of the box (top-left, top-right,
    /// bottom-right, bottom-left).
    pub distort: [Vec2; 4],
    /// Visible sub-rectangle of the intrinsic box, in pixels.
    pub crop: Option<Rect>,
}

impl Placement {
    pub(crate) fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            origin: Point::new(0.5, 0.5),
            scale: Vec2::new(1.0, 1.0),
            rotation: 0.0,
            flip: Flip::default(),
            distort: [Vec2::ZERO; 4],
            crop: None,
        }
    }

    /// Intrinsic size before crop.
    #[inline]
    #[must_use]
    pub fn base_size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Size after crop, before scale.
    ///
    /// The crop never grows the box: each side is the smaller of the base
    /// extent and the crop extent.
    #[must_use]
    pub fn cropped_size(&self) -> Size {
        match self.crop {
            Some(c) => Size::new(self.width.min(c.width()), self.height.min(c.height())),
            None => self.base_size(),
        }
    }

    /// Size after crop and scale, before rotation and distortion.
    #[must_use]
    pub fn scaled_size(&self) -> Size {
        let s = self.cropped_size();
        Size::new(s.width * self.scale.x, s.height * self.scale.y)
    }

    /// Whether any corner offset is non-zero.
    #[must_use]
    pub fn is_distorted(&self) -> bool {
        self.distort.iter().any(|d| d.x != 0.0 || d.y != 0.0)
    }
}

/// How a layer combines with the canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Compositing {
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Blend operator.
    pub blend: BlendMode,
    /// Hidden layers are skipped by merges.
    pub hidden: bool,
    /// Optional drop shadow.
    pub shadow: Option<Shadow>,
}

impl Default for Compositing {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            blend: BlendMode::Normal,
            hidden: false,
            shadow: None,
        }
    }
}

/// Color adjustments.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Adjustments {
    /// Brightness offset in `[-1, 1]`.
    pub brightness: f64,
    /// Contrast factor in `[0.25, 4]`.
    pub contrast: f64,
    /// Saturation factor in `[0, 2]`.
    pub saturation: f64,
    /// Whether color channels are inverted.
    pub inverted: bool,
}

impl Adjustments {
    /// Valid brightness range.
    pub const BRIGHTNESS: (f64, f64) = (-1.0, 1.0);
    /// Valid contrast range.
    pub const CONTRAST: (f64, f64) = (0.25, 4.0);
    /// Valid saturation range.
    pub const SATURATION: (f64, f64) = (0.0, 2.0);

    /// Whether brightness, contrast and saturation are all neutral.
    ///
    /// Inversion is tracked separately.
    #[must_use]
    pub fn is_neutral(&self) -> bool {
        self.brightness == 0.0 && self.contrast == 1.0 && self.saturation == 1.0
    }
}

impl Default for Adjustments {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 1.0,
            saturation: 1.0,
            inverted: false,
        }
    }
}

/// Blur, sharpen and the named filter chain.
#[derive(Clone, Debug, PartialEq)]
pub struct Effects {
    /// Gaussian blur amount in `[0, 100]`.
    pub blur: f64,
    /// Unsharp-mask amount in `[0, 100]`.
    pub sharpness: f64,
    /// Named filters, applied in order.
    pub filters: Vec<FilterEntry>,
    /// Whether filters run before transforms (`true`) or after.
    pub filters_first: bool,
}

impl Effects {
    /// Whether any effect would change the raster.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blur == 0.0 && self.sharpness == 0.0 && self.filters.is_empty()
    }
}

impl Default for Effects {
    fn default() -> Self {
        Self {
            blur: 0.0,
            sharpness: 0.0,
            filters: Vec::new(),
            filters_first: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_names_round_trip() {
        for m in BlendMode::ALL {
            assert_eq!(BlendMode::from_name(m.name()), Some(m));
        }
        assert_eq!(BlendMode::from_name("Soft-Light"), Some(BlendMode::SoftLight));
        assert_eq!(BlendMode::from_name("dodge"), None);
        assert_eq!(BlendMode::from_name("a-very-long-unknown-mode"), None);
    }

    #[test]
    fn coord_interpretation_depends_on_input_type() {
        assert_eq!(Coord::from(0.25).to_pixels(400.0), 100.0);
        assert_eq!(Coord::from(30).to_pixels(400.0), 30.0);
        assert_eq!(Coord::from(50).to_fraction(200.0), 0.25);
        assert_eq!(Coord::from(50).to_fraction(0.0), 0.0);
        assert_eq!(Coord::from(Anchor::Right), Coord::Fraction(1.0));
    }

    #[test]
    fn crop_never_grows_the_box() {
        let mut p = Placement::new(0.0, 0.0, 100.0, 80.0);
        p.crop = Some(Rect::new(10.0, 10.0, 60.0, 200.0));
        assert_eq!(p.cropped_size(), Size::new(50.0, 80.0));
        p.scale = Vec2::new(2.0, 0.5);
        assert_eq!(p.scaled_size(), Size::new(100.0, 40.0));
    }
}
