// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend capability contract.
//!
//! The [`Renderer`](crate::Renderer) never touches pixels itself. It drives a
//! [`Backend`] through a small set of raster capabilities:
//!
//! - **Rasterization**: turn a typed [`Payload`] into a raster at a given
//!   size. Nested-canvas payloads never reach the backend; the renderer
//!   merges them first and hands over the result via
//!   [`from_image`](Backend::from_image).
//!
//! - **Geometry**: [`crop`](Backend::crop) re-anchors a sub-rectangle at
//!   `(0, 0)`; [`affine_transform`](Backend::affine_transform) and
//!   [`warp`](Backend::warp) resample into a new raster of a given size.
//!
//! - **Color**: opacity, adjustments, masking, blurs and the named filter
//!   chain, whose catalogue the backend publishes through
//!   [`filters`](Backend::filters).
//!
//! - **Compositing**: [`composite`](Backend::composite) blends two rasters of
//!   equal size with one of the [`BlendMode`]s.
//!
//! - **Codecs**: [`image_size`](Backend::image_size) probes files and
//!   [`export`](Backend::export) writes a raster to disk.
//!
//! Every capability reports failure with a [`BackendError`] naming the
//! operation; the renderer converts it into
//! [`Error::RenderBackend`](strata_core::Error::RenderBackend) and drops any
//! partial output.

use std::path::Path;

use kurbo::{Affine, Rect};
use strata_core::document::{Adjustments, BlendMode, Payload};
use strata_core::filter::{FilterEntry, FilterRegistry};
use strata_core::image::Image;
use strata_core::transform::Homography;

use crate::export::{self, ExportFormat, ExportOptions};

/// A failed backend capability.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{operation}: {message}")]
pub struct BackendError {
    /// The capability that failed, e.g. `"rasterize"`.
    pub operation: &'static str,
    /// What went wrong.
    pub message: String,
}

impl BackendError {
    /// Creates an error for `operation`.
    #[must_use]
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

impl From<BackendError> for strata_core::Error {
    fn from(e: BackendError) -> Self {
        Self::RenderBackend {
            operation: e.operation,
            message: e.message,
        }
    }
}

/// Raster operations a renderer needs from a concrete imaging library.
///
/// Rasters are values: every capability takes its inputs by reference and
/// returns a new raster, so the renderer can cache intermediate results
/// freely.
pub trait Backend {
    /// The backend's raster type.
    type Raster: Clone;

    /// Named filters this backend can apply.
    fn filters(&self) -> &FilterRegistry;

    /// A fully transparent raster.
    fn empty(&self, width: u32, height: u32) -> Result<Self::Raster, BackendError>;

    /// Rasterizes `payload` at `width × height`.
    ///
    /// Called for every payload kind except [`Payload::Canvas`].
    fn rasterize(
        &self,
        payload: &Payload,
        width: u32,
        height: u32,
    ) -> Result<Self::Raster, BackendError>;

    /// Pixel size of a raster.
    fn extent(&self, raster: &Self::Raster) -> (u32, u32);

    /// Imports a straight-alpha image.
    fn from_image(&self, image: &Image) -> Result<Self::Raster, BackendError>;

    /// Exports a raster as a straight-alpha image.
    fn to_image(&self, raster: &Self::Raster) -> Result<Image, BackendError>;

    /// The pixels inside `rect`, moved so that `rect`'s top-left becomes
    /// `(0, 0)`. Areas of `rect` outside the raster are transparent.
    fn crop(&self, raster: &Self::Raster, rect: Rect) -> Result<Self::Raster, BackendError>;

    /// Resamples `raster` through `transform` into a new `width × height`
    /// raster.
    fn affine_transform(
        &self,
        raster: &Self::Raster,
        transform: Affine,
        width: u32,
        height: u32,
    ) -> Result<Self::Raster, BackendError>;

    /// Like [`affine_transform`](Self::affine_transform), for projective
    /// transforms.
    fn warp(
        &self,
        raster: &Self::Raster,
        transform: &Homography,
        width: u32,
        height: u32,
    ) -> Result<Self::Raster, BackendError>;

    /// Multiplies every pixel's alpha by `opacity`.
    fn opacity(&self, raster: &Self::Raster, opacity: f64) -> Result<Self::Raster, BackendError>;

    /// Applies brightness, contrast and saturation, then inversion.
    fn adjust(
        &self,
        raster: &Self::Raster,
        adjustments: &Adjustments,
    ) -> Result<Self::Raster, BackendError>;

    /// Removes alpha where `mask` is dark: each pixel keeps
    /// `luminance × alpha` of the mask pixel at the same position. Pixels
    /// outside the mask are removed.
    fn blend_with_mask(
        &self,
        raster: &Self::Raster,
        mask: &Self::Raster,
    ) -> Result<Self::Raster, BackendError>;

    /// Gaussian blur with standard deviation `sigma` in pixels.
    fn gaussian_blur(&self, raster: &Self::Raster, sigma: f64)
    -> Result<Self::Raster, BackendError>;

    /// Unsharp mask of the given blur radius and strength.
    fn unsharp(
        &self,
        raster: &Self::Raster,
        radius: f64,
        intensity: f64,
    ) -> Result<Self::Raster, BackendError>;

    /// Applies a filter resolved from [`filters`](Self::filters).
    fn apply_filter(
        &self,
        raster: &Self::Raster,
        filter: &FilterEntry,
    ) -> Result<Self::Raster, BackendError>;

    /// Draws `top` over `bottom` (both the same size) with `mode`.
    fn composite(
        &self,
        top: &Self::Raster,
        bottom: &Self::Raster,
        mode: BlendMode,
    ) -> Result<Self::Raster, BackendError>;

    /// Forces any deferred work in `raster` to be evaluated.
    ///
    /// Eager backends return the raster unchanged, which is what the default
    /// does.
    fn accumulate(&self, raster: Self::Raster) -> Result<Self::Raster, BackendError> {
        Ok(raster)
    }

    /// Pixel size of the image file at `path`.
    fn image_size(&self, path: &Path) -> Result<(u32, u32), BackendError>;

    /// Encodes `raster` to `path`, returning the number of bytes written.
    ///
    /// The default converts to an [`Image`] and uses the built-in encoders.
    fn export(
        &self,
        raster: &Self::Raster,
        path: &Path,
        format: ExportFormat,
        options: &ExportOptions,
    ) -> Result<u64, BackendError> {
        let image = self.to_image(raster)?;
        export::write_file(&image, path, format, options)
    }
}
