// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CPU backend built on `tiny-skia`, with codecs from `image` and `tiff`.
//!
//! Rasters are premultiplied [`Pixmap`]s. Rasterization and compositing use
//! tiny-skia's pipelines directly; color operations, blurs, projective warps
//! and the filter catalogue work on unit floats and write back with color
//! channels clamped to alpha.
//!
//! ```
//! use strata_core::document::{Document, LayerOptions};
//! use strata_core::color::Color;
//! use strata_render::Renderer;
//! use strata_render::cpu::CpuBackend;
//!
//! let mut doc = Document::new();
//! let canvas = doc.create_canvas(64, 64);
//! doc.add_fill(canvas, Some(Color::rgb(1.0, 0.0, 0.0)), LayerOptions::new()).unwrap();
//!
//! let mut renderer = Renderer::new(CpuBackend::new());
//! let image = renderer.render_canvas(&doc, canvas).unwrap();
//! assert_eq!(image.pixel(32, 32), Some([255, 0, 0, 255]));
//! ```

mod blur;
mod codec;
mod filters;
mod ops;
mod raster;
mod warp;

use std::path::Path;

use kurbo::{Affine, Rect};
use strata_core::document::{Adjustments, BlendMode, Payload};
use strata_core::filter::{FilterEntry, FilterRegistry};
use strata_core::image::Image;
use strata_core::transform::Homography;
use tiny_skia::Pixmap;

pub use codec::CodecProbe;

use crate::backend::{Backend, BackendError};

/// The software backend.
#[derive(Clone)]
pub struct CpuBackend {
    filters: FilterRegistry,
}

impl core::fmt::Debug for CpuBackend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CpuBackend")
            .field("filters", &self.filters.names().count())
            .finish()
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuBackend {
    /// Creates a backend with the built-in filter catalogue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            filters: filters::catalogue(),
        }
    }
}

impl Backend for CpuBackend {
    type Raster = Pixmap;

    fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    fn empty(&self, width: u32, height: u32) -> Result<Pixmap, BackendError> {
        raster::new_pixmap(width, height, "empty")
    }

    fn rasterize(&self, payload: &Payload, width: u32, height: u32) -> Result<Pixmap, BackendError> {
        raster::rasterize(payload, width, height)
    }

    fn extent(&self, raster: &Pixmap) -> (u32, u32) {
        (raster.width(), raster.height())
    }

    fn from_image(&self, image: &Image) -> Result<Pixmap, BackendError> {
        raster::from_image(image)
    }

    fn to_image(&self, raster: &Pixmap) -> Result<Image, BackendError> {
        raster::to_image(raster)
    }

    fn crop(&self, raster: &Pixmap, rect: Rect) -> Result<Pixmap, BackendError> {
        ops::crop(raster, rect)
    }

    fn affine_transform(
        &self,
        raster: &Pixmap,
        transform: Affine,
        width: u32,
        height: u32,
    ) -> Result<Pixmap, BackendError> {
        warp::affine(raster, transform, width, height)
    }

    fn warp(
        &self,
        raster: &Pixmap,
        transform: &Homography,
        width: u32,
        height: u32,
    ) -> Result<Pixmap, BackendError> {
        warp::projective(raster, transform, width, height)
    }

    fn opacity(&self, raster: &Pixmap, opacity: f64) -> Result<Pixmap, BackendError> {
        Ok(ops::opacity(raster, opacity))
    }

    fn adjust(&self, raster: &Pixmap, adjustments: &Adjustments) -> Result<Pixmap, BackendError> {
        Ok(ops::adjust(raster, adjustments))
    }

    fn blend_with_mask(&self, raster: &Pixmap, mask: &Pixmap) -> Result<Pixmap, BackendError> {
        Ok(ops::blend_with_mask(raster, mask))
    }

    fn gaussian_blur(&self, raster: &Pixmap, sigma: f64) -> Result<Pixmap, BackendError> {
        Ok(blur::gaussian_blur(raster, sigma))
    }

    fn unsharp(
        &self,
        raster: &Pixmap,
        radius: f64,
        intensity: f64,
    ) -> Result<Pixmap, BackendError> {
        Ok(blur::unsharp(raster, radius, intensity))
    }

    fn apply_filter(&self, raster: &Pixmap, filter: &FilterEntry) -> Result<Pixmap, BackendError> {
        filters::apply(raster, filter)
    }

    fn composite(
        &self,
        top: &Pixmap,
        bottom: &Pixmap,
        mode: BlendMode,
    ) -> Result<Pixmap, BackendError> {
        ops::composite(top, bottom, mode)
    }

    fn image_size(&self, path: &Path) -> Result<(u32, u32), BackendError> {
        codec::file_size(path)
    }
}

#[cfg(test)]
mod tests {
    use strata_core::color::Color;

    use super::*;

    #[test]
    fn catalogue_is_installed() {
        let b = CpuBackend::new();
        let names: Vec<_> = b.filters().names().collect();
        assert!(names.contains(&"bloom"));
        assert!(names.contains(&"sepia"));
        assert_eq!(b.filters().canonical_name("motion"), Some("motionblur"));
    }

    #[test]
    fn empty_and_extent() {
        let b = CpuBackend::new();
        let r = b.empty(3, 2).unwrap();
        assert_eq!(b.extent(&r), (3, 2));
        assert!(r.pixels().iter().all(|p| p.alpha() == 0));
        assert_eq!(b.empty(0, 2).unwrap_err().operation, "empty");
    }

    #[test]
    fn image_conversion_round_trips() {
        let b = CpuBackend::new();
        let img = Image::filled(2, 2, Color::rgb(0.0, 0.5, 1.0));
        let back = b.to_image(&b.from_image(&img).unwrap()).unwrap();
        assert_eq!(back, img);
    }

    #[test]
    fn default_export_writes_a_file() {
        let b = CpuBackend::new();
        let r = b
            .rasterize(&Payload::Fill(Color::WHITE), 4, 4)
            .unwrap();
        let path = std::env::temp_dir().join("strata_cpu_backend_export.png");
        let bytes = b
            .export(
                &r,
                &path,
                crate::ExportFormat::Png,
                &crate::ExportOptions::new(),
            )
            .unwrap();
        assert!(bytes > 0);
        assert_eq!(b.image_size(&path).unwrap(), (4, 4));
        std::fs::remove_file(&path).unwrap();
    }
}
