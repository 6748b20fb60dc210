// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Image decoding and size probing through the `image` crate.

use std::io::Cursor;
use std::path::Path;

use image::ImageReader;
use strata_core::document::ImageProbe;
use strata_core::image::Image;

use crate::backend::BackendError;

/// Decodes an image file to straight RGBA8.
pub(crate) fn decode_file(path: &Path) -> Result<Image, BackendError> {
    let decoded = image::open(path)
        .map_err(|e| BackendError::new("rasterize", format!("{}: {e}", path.display())))?;
    into_image(decoded)
}

/// Decodes encoded image bytes to straight RGBA8.
pub(crate) fn decode_bytes(bytes: &[u8]) -> Result<Image, BackendError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| BackendError::new("rasterize", e.to_string()))?;
    into_image(decoded)
}

fn into_image(decoded: image::DynamicImage) -> Result<Image, BackendError> {
    let rgba = decoded.to_rgba8();
    let (w, h) = rgba.dimensions();
    Image::from_rgba8(w, h, rgba.into_raw())
        .ok_or_else(|| BackendError::new("rasterize", "decoder returned a short buffer"))
}

/// Pixel size of an image file, reading only its header.
pub(crate) fn file_size(path: &Path) -> Result<(u32, u32), BackendError> {
    image::image_dimensions(path)
        .map_err(|e| BackendError::new("image_size", format!("{}: {e}", path.display())))
}

/// Sizes image files and encoded bytes for
/// [`Document::set_image_probe`](strata_core::document::Document::set_image_probe).
///
/// Only headers are read; pixels are decoded at render time.
#[derive(Clone, Copy, Debug, Default)]
pub struct CodecProbe;

impl ImageProbe for CodecProbe {
    fn file_size(&self, path: &str) -> Option<(u32, u32)> {
        file_size(Path::new(path)).ok()
    }

    fn encoded_size(&self, bytes: &[u8]) -> Option<(u32, u32)> {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()
    }
}
