// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render pipeline, canvas merge and export for [`strata_core`] documents.
//!
//! This crate turns a [`Document`](strata_core::document::Document) into
//! pixels. It defines:
//!
//! - [`Backend`]: the raster capabilities a renderer needs (rasterize, crop,
//!   transform, blend, filter, encode), implemented by [`cpu::CpuBackend`]
//! - [`Renderer`]: the fixed per-layer pipeline, shadow synthesis and
//!   back-to-front canvas merge, with stage tracing and a fast-path
//!   [`RenderCache`]
//! - [`Pixels`]: per-pixel access, min/max/average and histograms of a
//!   rendered layer
//! - [`ExportOptions`]: PNG, GIF, JPEG and TIFF encoding
//! - [`Surface`] and [`DebugOverlay`]: what a host provides to receive
//!   flattened canvases and structured debug drawing
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Forwards to `strata_core/trace`, so the
//!   renderer's [`TraceSink`](strata_core::trace::TraceSink) receives events.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod backend;
mod cache;
mod export;
mod pipeline;
mod pixels;
mod surface;

pub mod cpu;
pub mod overlay;

pub use backend::{Backend, BackendError};
pub use cache::RenderCache;
pub use export::{ExportFormat, ExportOptions, TiffMode, encode, write_file};
pub use overlay::{DebugOverlay, OverlayCommand};
pub use pipeline::{LayerRaster, MergeOptions, RENDER_ORDER, RenderOptions, Renderer};
pub use pixels::{AlphaThreshold, HISTOGRAM_BINS, Pixels, Transparency};
pub use surface::{ImageSurface, Surface};
