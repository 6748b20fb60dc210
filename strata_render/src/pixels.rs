// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel access and statistics for a rendered layer.

use std::sync::Arc;

use strata_core::color::Color;
use strata_core::document::{Document, LayerId};
use strata_core::image::Image;

/// Which pixels take part in [`Pixels::min`], [`Pixels::max`] and
/// [`Pixels::average`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Transparency {
    /// Every pixel counts.
    Include,
    /// Only pixels whose alpha is strictly above the threshold count.
    Threshold(AlphaThreshold),
}

impl Default for Transparency {
    fn default() -> Self {
        Self::Threshold(AlphaThreshold::Byte(0))
    }
}

/// An alpha cutoff, as a unit fraction or a byte.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AlphaThreshold {
    /// Fraction of full opacity in `[0, 1]`.
    Unit(f64),
    /// Alpha byte in `[0, 255]`.
    Byte(u8),
}

impl AlphaThreshold {
    fn as_byte_f64(self) -> f64 {
        match self {
            Self::Unit(v) => v.clamp(0.0, 1.0) * 255.0,
            Self::Byte(b) => f64::from(b),
        }
    }
}

impl From<f64> for AlphaThreshold {
    fn from(v: f64) -> Self {
        Self::Unit(v)
    }
}

impl From<u8> for AlphaThreshold {
    fn from(v: u8) -> Self {
        Self::Byte(v)
    }
}

/// Number of histogram bins per channel.
pub const HISTOGRAM_BINS: usize = 255;

/// A buffered, editable copy of a rendered layer.
///
/// Edits made with [`set`](Self::set) stay local until
/// [`update`](Self::update) writes them back into the layer.
#[derive(Clone, Debug)]
pub struct Pixels {
    image: Image,
    origin: (i32, i32),
}

impl Pixels {
    /// Wraps an image placed at canvas position `(0, 0)`.
    #[must_use]
    pub fn from_image(image: Image) -> Self {
        Self::placed(image, (0, 0))
    }

    /// Wraps an image whose top-left sits at `origin` in canvas pixels.
    #[must_use]
    pub fn placed(image: Image, origin: (i32, i32)) -> Self {
        Self { image, origin }
    }

    /// Canvas position of the top-left pixel.
    #[must_use]
    pub const fn origin(&self) -> (i32, i32) {
        self.origin
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.image.height()
    }

    /// Channels per pixel; always RGBA.
    #[must_use]
    pub const fn channels(&self) -> usize {
        4
    }

    /// Whether the buffer carries alpha; always `true`.
    #[must_use]
    pub const fn has_alpha(&self) -> bool {
        true
    }

    /// Pixel count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.image.width() as usize * self.image.height() as usize
    }

    /// Whether there are no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }

    /// The color at `(x, y)`, or `None` outside the buffer.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<Color> {
        self.image.pixel(x, y).map(Color::from)
    }

    /// Sets the color at `(x, y)`; ignored outside the buffer.
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.image.set_pixel(x, y, color.to_rgba8());
    }

    /// Colors inside a box, row by row, skipping positions outside the
    /// buffer.
    #[must_use]
    pub fn get_range(&self, x: u32, y: u32, w: u32, h: u32) -> Vec<Color> {
        let mut out = Vec::new();
        for j in 0..h {
            for i in 0..w {
                if let Some(c) = self.get(x.saturating_add(i), y.saturating_add(j)) {
                    out.push(c);
                }
            }
        }
        out
    }

    /// Per-channel minimum over the selected pixels.
    ///
    /// Returns transparent black when no pixel is selected.
    #[must_use]
    pub fn min(&self, transparency: Transparency) -> Color {
        self.fold(transparency, [u8::MAX; 4], |acc, px| {
            core::array::from_fn(|i| acc[i].min(px[i]))
        })
    }

    /// Per-channel maximum over the selected pixels.
    #[must_use]
    pub fn max(&self, transparency: Transparency) -> Color {
        self.fold(transparency, [0; 4], |acc, px| {
            core::array::from_fn(|i| acc[i].max(px[i]))
        })
    }

    /// Per-channel mean over the selected pixels, truncated to whole byte
    /// values.
    #[must_use]
    pub fn average(&self, transparency: Transparency) -> Color {
        let mut sum = [0_u64; 4];
        let mut n = 0_u64;
        for px in self.selected(transparency) {
            for (s, &v) in sum.iter_mut().zip(px) {
                *s += u64::from(v);
            }
            n += 1;
        }
        if n == 0 {
            return Color::TRANSPARENT;
        }
        Color::from(sum.map(|s| u8::try_from(s / n).unwrap_or(u8::MAX)))
    }

    /// Per-channel histogram (red, green, blue, alpha).
    ///
    /// Bin `i` counts the byte value `i`; the last bin also counts 255. Each
    /// channel is normalized so that its fullest bin is `1.0`.
    #[must_use]
    pub fn histogram(&self) -> [[f64; HISTOGRAM_BINS]; 4] {
        let mut counts = [[0_u64; HISTOGRAM_BINS]; 4];
        for px in self.rgba() {
            for (c, &v) in px.iter().enumerate() {
                counts[c][usize::from(v).min(HISTOGRAM_BINS - 1)] += 1;
            }
        }
        counts.map(|channel| {
            let peak = channel.iter().copied().max().unwrap_or(0);
            if peak == 0 {
                return [0.0; HISTOGRAM_BINS];
            }
            channel.map(|n| n as f64 / peak as f64)
        })
    }

    /// Commits the buffer into `layer` as a rendered payload.
    pub fn update(&self, doc: &mut Document, layer: LayerId) {
        doc.set_rendered(layer, Arc::new(self.image.clone()));
    }

    /// The underlying image.
    #[must_use]
    pub fn image(&self) -> &Image {
        &self.image
    }

    /// Consumes the buffer, returning the image.
    #[must_use]
    pub fn into_image(self) -> Image {
        self.image
    }

    fn rgba(&self) -> &[[u8; 4]] {
        bytemuck::cast_slice(self.image.data())
    }

    fn selected(&self, transparency: Transparency) -> impl Iterator<Item = &[u8; 4]> + '_ {
        let cutoff = match transparency {
            Transparency::Include => None,
            Transparency::Threshold(t) => Some(t.as_byte_f64()),
        };
        self.rgba()
            .iter()
            .filter(move |px| cutoff.is_none_or(|c| f64::from(px[3]) > c))
    }

    fn fold(
        &self,
        transparency: Transparency,
        init: [u8; 4],
        f: impl Fn([u8; 4], [u8; 4]) -> [u8; 4],
    ) -> Color {
        let mut any = false;
        let acc = self.selected(transparency).fold(init, |acc, px| {
            any = true;
            f(acc, *px)
        });
        if any { Color::from(acc) } else { Color::TRANSPARENT }
    }
}

#[cfg(test)]
mod tests {
    use strata_core::document::{LayerOptions, PayloadKind};

    use super::*;

    fn sample() -> Pixels {
        let mut img = Image::new(2, 2);
        img.set_pixel(0, 0, [10, 200, 30, 255]);
        img.set_pixel(1, 0, [250, 20, 60, 128]);
        img.set_pixel(0, 1, [0, 0, 0, 0]);
        img.set_pixel(1, 1, [100, 100, 100, 10]);
        Pixels::from_image(img)
    }

    #[test]
    fn bounds_checked_access() {
        let mut p = sample();
        assert_eq!(p.get(1, 0), Some(Color::from([250, 20, 60, 128])));
        assert_eq!(p.get(2, 0), None);
        p.set(5, 5, Color::WHITE);
        p.set(0, 1, Color::WHITE);
        assert_eq!(p.get(0, 1), Some(Color::WHITE));
        assert_eq!(p.len(), 4);
        assert_eq!(p.get_range(1, 0, 5, 5).len(), 2);
    }

    #[test]
    fn statistics_skip_transparent_pixels_by_default() {
        let p = sample();
        assert_eq!(p.min(Transparency::default()), Color::from([10, 20, 30, 10]));
        assert_eq!(p.min(Transparency::Include), Color::from([0, 0, 0, 0]));
        assert_eq!(p.max(Transparency::default()), Color::from([250, 200, 100, 255]));
    }

    #[test]
    fn thresholds_accept_units_and_bytes() {
        let p = sample();
        let unit = Transparency::Threshold(0.1.into());
        let byte = Transparency::Threshold(26_u8.into());
        // 0.1 * 255 = 25.5, so the pixel with alpha 10 drops out either way.
        assert_eq!(p.min(unit), p.min(byte));
        assert_eq!(p.min(unit), Color::from([10, 20, 30, 128]));
    }

    #[test]
    fn average_truncates() {
        let p = sample();
        // (10 + 250 + 100) / 3 = 120, (200 + 20 + 100) / 3 = 106.67
        let avg = p.average(Transparency::default()).to_rgba8();
        assert_eq!(avg, [120, 106, 63, 131]);
        let none = Pixels::from_image(Image::new(3, 3));
        assert_eq!(none.average(Transparency::default()), Color::TRANSPARENT);
    }

    #[test]
    fn histogram_peaks_at_one() {
        let p = sample();
        let h = p.histogram();
        for channel in &h {
            let peak = channel.iter().copied().fold(0.0, f64::max);
            assert_eq!(peak, 1.0);
        }
        // Alpha 255 lands in the last bin.
        assert_eq!(h[3][HISTOGRAM_BINS - 1], 1.0);
        assert_eq!(h[0][10], 1.0);
    }

    #[test]
    fn update_commits_a_rendered_payload() {
        let mut doc = Document::new();
        let c = doc.create_canvas(10, 10);
        let id = doc.add_fill(c, None, LayerOptions::new()).unwrap();
        let mut p = Pixels::from_image(Image::new(4, 3));
        p.set(0, 0, Color::WHITE);
        assert_eq!(doc.payload(id).kind(), PayloadKind::Fill);
        p.update(&mut doc, id);
        assert_eq!(doc.payload(id).kind(), PayloadKind::Rendered);
        assert_eq!(doc.placement(id).width, 4.0);
    }
}
