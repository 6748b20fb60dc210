// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend-neutral raster images.

use alloc::vec;
use alloc::vec::Vec;

use crate::color::Color;

/// A straight-alpha RGBA8 raster, row-major, top row first.
///
/// This is the exchange format between the document and renderers: flattened
/// canvases come back as `Image`s and can be fed back in as layer payloads.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl core::fmt::Debug for Image {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Image {
    /// Creates a fully transparent image.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; pixel_count(width, height) * 4],
        }
    }

    /// Creates an image filled with a single color.
    #[must_use]
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        let px = color.to_rgba8();
        let mut data = Vec::with_capacity(pixel_count(width, height) * 4);
        for _ in 0..pixel_count(width, height) {
            data.extend_from_slice(&px);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wraps an existing RGBA8 buffer.
    ///
    /// Returns `None` when `data.len() != width * height * 4`.
    #[must_use]
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        (data.len() == pixel_count(width, height) * 4).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// Width in pixels.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Whether the image has no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Raw RGBA8 bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw RGBA8 bytes.
    #[must_use]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consumes the image and returns its bytes.
    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the pixel at `(x, y)` as bytes, or `None` out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let i = self.offset(x, y)?;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Writes the pixel at `(x, y)`. Out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, px: [u8; 4]) {
        if let Some(i) = self.offset(x, y) {
            self.data[i..i + 4].copy_from_slice(&px);
        }
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| (y as usize * self.width as usize + x as usize) * 4)
    }
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_transparent() {
        let img = Image::new(3, 2);
        assert_eq!(img.data().len(), 24);
        assert!(img.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn filled_and_pixel_access() {
        let mut img = Image::filled(2, 2, Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(img.pixel(1, 1), Some([255, 0, 0, 255]));
        assert_eq!(img.pixel(2, 0), None);
        img.set_pixel(0, 1, [1, 2, 3, 4]);
        img.set_pixel(9, 9, [9, 9, 9, 9]);
        assert_eq!(img.pixel(0, 1), Some([1, 2, 3, 4]));
    }

    #[test]
    fn from_rgba8_checks_length() {
        assert!(Image::from_rgba8(2, 2, vec![0; 15]).is_none());
        assert!(Image::from_rgba8(2, 2, vec![0; 16]).is_some());
    }
}
