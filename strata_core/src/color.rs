// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Immutable RGBA color values.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// An RGBA color with every channel clamped to `[0, 1]`.
///
/// Colors are plain values: construct a new one instead of mutating. Channels
/// are straight (not premultiplied) alpha.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    r: f64,
    g: f64,
    b: f64,
    a: f64,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    /// Opaque black.
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };

    /// Opaque white.
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    /// Creates a color from unit floats. Out-of-range and NaN channels are
    /// clamped.
    #[must_use]
    pub fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self {
            r: unit(r),
            g: unit(g),
            b: unit(b),
            a: unit(a),
        }
    }

    /// Creates an opaque color from unit floats.
    #[must_use]
    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    /// Creates a color from 8-bit channels.
    #[must_use]
    pub const fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
            a: a as f64 / 255.0,
        }
    }

    /// Creates an opaque gray.
    #[must_use]
    pub fn gray(v: f64) -> Self {
        Self::rgba(v, v, v, 1.0)
    }

    /// Creates a gray with the given alpha.
    #[must_use]
    pub fn gray_alpha(v: f64, a: f64) -> Self {
        Self::rgba(v, v, v, a)
    }

    /// Red channel.
    #[inline]
    #[must_use]
    pub const fn r(self) -> f64 {
        self.r
    }

    /// Green channel.
    #[inline]
    #[must_use]
    pub const fn g(self) -> f64 {
        self.g
    }

    /// Blue channel.
    #[inline]
    #[must_use]
    pub const fn b(self) -> f64 {
        self.b
    }

    /// Alpha channel.
    #[inline]
    #[must_use]
    pub const fn a(self) -> f64 {
        self.a
    }

    /// Returns a copy with a different alpha.
    #[must_use]
    pub fn with_alpha(self, a: f64) -> Self {
        Self { a: unit(a), ..self }
    }

    /// Whether the alpha channel is zero.
    #[must_use]
    pub fn is_transparent(self) -> bool {
        self.a <= 0.0
    }

    /// Converts to rounded 8-bit channels.
    #[must_use]
    pub fn to_rgba8(self) -> [u8; 4] {
        [
            to_byte(self.r),
            to_byte(self.g),
            to_byte(self.b),
            to_byte(self.a),
        ]
    }

    /// Returns the channels as `[r, g, b, a]`.
    #[must_use]
    pub const fn to_array(self) -> [f64; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl From<[u8; 4]> for Color {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self::from_rgba8(r, g, b, a)
    }
}

impl From<[f64; 4]> for Color {
    fn from([r, g, b, a]: [f64; 4]) -> Self {
        Self::rgba(r, g, b, a)
    }
}

impl From<[f64; 3]> for Color {
    fn from([r, g, b]: [f64; 3]) -> Self {
        Self::rgb(r, g, b)
    }
}

fn unit(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "value is clamped to [0, 255] before the cast"
)]
fn to_byte(v: f64) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_are_clamped() {
        let c = Color::rgba(1.5, -0.2, 0.5, f64::NAN);
        assert_eq!(c.r(), 1.0);
        assert_eq!(c.g(), 0.0);
        assert_eq!(c.b(), 0.5);
        assert_eq!(c.a(), 0.0);
    }

    #[test]
    fn byte_round_trip() {
        let c = Color::from_rgba8(255, 0, 128, 255);
        assert_eq!(c.to_rgba8(), [255, 0, 128, 255]);
    }

    #[test]
    fn equality_is_by_value() {
        assert_eq!(Color::rgb(1.0, 0.0, 0.0), Color::from([255, 0, 0, 255]));
        assert_ne!(Color::gray(0.5), Color::gray_alpha(0.5, 0.5));
    }

    #[test]
    fn with_alpha_keeps_rgb() {
        let c = Color::rgb(0.2, 0.4, 0.6).with_alpha(2.0);
        assert_eq!(c.to_array(), [0.2, 0.4, 0.6, 1.0]);
    }
}
