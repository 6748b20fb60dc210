// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-layer render pipeline and canvas merge.
//!
//! A layer is rendered by a fixed sequence of stages:
//!
//! ```text
//!   Rasterize ─► Crop ─► Filters ─► Opacity ─► Adjustments ─► Mask ─► Transforms ─► CanvasCrop
//!                           ▲                                                  │
//!                           └──────── moved here when filters_first is false ──┘
//! ```
//!
//! Rasterization produces the layer's base box at its intrinsic size.
//! Every stage after it is skipped when it would not change the raster.
//! Transforms resample the cropped box into the integer-aligned bounding
//! box of the placed layer, which is then optionally cropped to the canvas.
//!
//! A merge starts from a transparent canvas-sized raster and composites
//! every visible layer back to front, each preceded by its dropshadow
//! (multiplied under it). Layers whose bounds miss the canvas are skipped.
//!
//! Coordinates are y-down throughout, so no vertical flip is needed between
//! document space and raster space.

use std::path::Path;
use std::time::Instant;

use kurbo::{Affine, Point, Rect};
use strata_core::document::{
    Adjustments, BlendMode, CanvasId, Document, DocumentChanges, INVALID, LayerId, Payload, Shadow,
};
use strata_core::image::Image;
use strata_core::trace::{
    ExportEvent, LayerRenderedEvent, MergeBeginEvent, MergeEndEvent, MergeSummaryBuilder,
    RenderStage, StageBeginEvent, StageEndEvent, TraceSink, Tracer,
};
use strata_core::transform::Homography;
use strata_core::Result;

use crate::backend::{Backend, BackendError};
use crate::cache::{CacheKey, CachedLayer, RenderCache};
use crate::export::{self, ExportOptions};
use crate::overlay::{self, DebugOverlay};
use crate::pixels::Pixels;
use crate::surface::Surface;

/// Stage order after rasterization, with filters in their default place.
pub const RENDER_ORDER: [RenderStage; 6] = [
    RenderStage::Crop,
    RenderStage::Filters,
    RenderStage::Opacity,
    RenderStage::Adjustments,
    RenderStage::Mask,
    RenderStage::Transforms,
];

/// A rendered layer and where its top-left pixel sits on the canvas.
#[derive(Clone, Debug)]
pub struct LayerRaster<R> {
    /// The pixels.
    pub raster: R,
    /// Canvas x of the raster's left edge.
    pub x: i32,
    /// Canvas y of the raster's top edge.
    pub y: i32,
}

/// Options for rendering a single layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    /// Crop the placed layer to its canvas, yielding a canvas-sized raster
    /// at `(0, 0)`.
    pub crop_to_canvas: bool,
    /// Reuse the cached raster when the layer has not changed. Only
    /// canvas-cropped renders are cached.
    pub fast: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            crop_to_canvas: true,
            fast: false,
        }
    }
}

/// Options for merging a canvas.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Reuse cached layer rasters and force evaluation of the result.
    ///
    /// The cache is consulted only when the document has no pending
    /// changes, so call [`Document::evaluate`] (and hand the result to
    /// [`Renderer::apply_changes`]) after editing.
    pub fast: bool,
    /// Merge only these layers (still in stacking order). `None` merges all.
    pub layers: Option<Vec<LayerId>>,
}

/// Drives a [`Backend`] to render layers and merge canvases.
pub struct Renderer<B: Backend> {
    backend: B,
    cache: RenderCache<B::Raster>,
    sink: Option<Box<dyn TraceSink>>,
    epoch: Instant,
}

impl<B: Backend + core::fmt::Debug> core::fmt::Debug for Renderer<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Renderer")
            .field("backend", &self.backend)
            .field("cached_layers", &self.cache.len())
            .field("traced", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

impl<B: Backend> Renderer<B> {
    /// Creates a renderer over `backend` with an empty cache and no trace
    /// sink.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cache: RenderCache::new(),
            sink: None,
            epoch: Instant::now(),
        }
    }

    /// Attaches a trace sink. Events are only emitted when the `trace`
    /// feature is enabled.
    #[must_use]
    pub fn with_trace_sink(mut self, sink: impl TraceSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Replaces the trace sink, returning the previous one.
    pub fn set_trace_sink(
        &mut self,
        sink: Option<Box<dyn TraceSink>>,
    ) -> Option<Box<dyn TraceSink>> {
        core::mem::replace(&mut self.sink, sink)
    }

    /// The backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The fast-path cache.
    #[must_use]
    pub fn cache(&self) -> &RenderCache<B::Raster> {
        &self.cache
    }

    /// Drops every cached raster.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Evicts cached rasters of layers reported by
    /// [`Document::evaluate`].
    pub fn apply_changes(&mut self, changes: &DocumentChanges) {
        self.cache.evict(changes);
    }

    fn pass(&mut self) -> Pass<'_, B> {
        let tracer = match self.sink.as_deref_mut() {
            Some(sink) => Tracer::new(sink),
            None => Tracer::none(),
        };
        Pass {
            backend: &self.backend,
            cache: &mut self.cache,
            tracer,
            epoch: self.epoch,
            summary: None,
        }
    }

    // -- Layer API --

    /// Runs `layer` through the render pipeline.
    ///
    /// # Errors
    ///
    /// [`Error::RenderBackend`] when a backend capability fails, including
    /// when the layer has no area.
    pub fn render_layer(
        &mut self,
        doc: &Document,
        layer: LayerId,
        options: RenderOptions,
    ) -> Result<LayerRaster<B::Raster>> {
        let mut pass = self.pass();
        if options.crop_to_canvas && options.fast {
            let cached = pass.cached_layer(doc, layer, true)?;
            return Ok(LayerRaster {
                raster: cached.raster,
                x: 0,
                y: 0,
            });
        }
        pass.layer(doc, layer, options.crop_to_canvas)
    }

    /// Renders `layer` to a straight-alpha image, ready to be added back to
    /// a document with [`Document::add_image`].
    ///
    /// # Errors
    ///
    /// As for [`render_layer`](Self::render_layer).
    pub fn layer_image(
        &mut self,
        doc: &Document,
        layer: LayerId,
        options: RenderOptions,
    ) -> Result<Image> {
        let rendered = self.render_layer(doc, layer, options)?;
        Ok(self.backend.to_image(&rendered.raster)?)
    }

    /// Renders the dropshadow of `layer`, uncropped, or `None` when it
    /// has none.
    ///
    /// # Errors
    ///
    /// [`Error::RenderBackend`] when a backend capability fails.
    pub fn render_shadow(
        &mut self,
        doc: &Document,
        layer: LayerId,
    ) -> Result<Option<LayerRaster<B::Raster>>> {
        let Some(shadow) = doc.compositing(layer).shadow else {
            return Ok(None);
        };
        self.pass().shadow(doc, layer, shadow).map(Some)
    }

    /// Renders `layer` without canvas cropping and wraps it for pixel
    /// access. The result remembers the raster's canvas position.
    ///
    /// # Errors
    ///
    /// As for [`render_layer`](Self::render_layer).
    pub fn pixels(&mut self, doc: &Document, layer: LayerId) -> Result<Pixels> {
        let rendered = self.pass().layer(doc, layer, false)?;
        let image = self.backend.to_image(&rendered.raster)?;
        Ok(Pixels::placed(image, (rendered.x, rendered.y)))
    }

    // -- Canvas API --

    /// Flattens `canvas` into a canvas-sized image.
    ///
    /// # Errors
    ///
    /// [`Error::RenderBackend`] when a backend capability fails. No partial
    /// result is returned.
    pub fn merge(
        &mut self,
        doc: &Document,
        canvas: CanvasId,
        options: &MergeOptions,
    ) -> Result<Image> {
        let raster = self.merge_raster(doc, canvas, options)?;
        Ok(self.backend.to_image(&raster)?)
    }

    /// [`merge`](Self::merge) with default options.
    ///
    /// # Errors
    ///
    /// As for [`merge`](Self::merge).
    pub fn render_canvas(&mut self, doc: &Document, canvas: CanvasId) -> Result<Image> {
        self.merge(doc, canvas, &MergeOptions::default())
    }

    /// Merges `canvas`, then describes each merged layer's bounds and
    /// origin point to `overlay`.
    ///
    /// # Errors
    ///
    /// As for [`merge`](Self::merge). Nothing is sent to the overlay on
    /// failure.
    pub fn merge_with_overlay(
        &mut self,
        doc: &Document,
        canvas: CanvasId,
        options: &MergeOptions,
        overlay: &mut dyn DebugOverlay,
    ) -> Result<Image> {
        let image = self.merge(doc, canvas, options)?;
        let (cw, ch) = doc.canvas_size(canvas);
        let area = Rect::new(0.0, 0.0, f64::from(cw), f64::from(ch));
        for id in doc.layers(canvas) {
            if !is_selected(options, id) || doc.is_hidden(id) {
                continue;
            }
            let p = doc.placement(id);
            overlay::guides(overlay, area, p.bounds(), Point::new(p.x, p.y));
        }
        Ok(image)
    }

    /// Merges `canvas` and draws the result on `surface` with its top-left
    /// corner at `at` (the surface origin by default).
    ///
    /// # Errors
    ///
    /// As for [`merge`](Self::merge). Nothing is drawn on failure.
    pub fn draw(
        &mut self,
        doc: &Document,
        canvas: CanvasId,
        surface: &mut dyn Surface,
        at: Option<Point>,
    ) -> Result<()> {
        let image = self.render_canvas(doc, canvas)?;
        surface.draw_image(&image, at.unwrap_or(Point::ORIGIN));
        Ok(())
    }

    /// Merges `canvas` and encodes it to `path`, returning the number of
    /// bytes written. The format comes from `options` or, failing that,
    /// from the file extension.
    ///
    /// # Errors
    ///
    /// [`Error::RenderBackend`] when the format cannot be determined, the
    /// merge fails, or the file cannot be written.
    pub fn export(
        &mut self,
        doc: &Document,
        canvas: CanvasId,
        path: impl AsRef<Path>,
        options: &ExportOptions,
    ) -> Result<u64> {
        let path = path.as_ref();
        let format = options.resolve_format(path)?;
        let raster = self.merge_raster(doc, canvas, &MergeOptions::default())?;
        let bytes = self.backend.export(&raster, path, format, options)?;
        let (width, height) = self.backend.extent(&raster);
        self.pass().exported(width, height, bytes);
        Ok(bytes)
    }

    /// Encodes an already-rendered image to `path`.
    ///
    /// # Errors
    ///
    /// As for [`export`](Self::export), minus the merge.
    pub fn export_image(
        &mut self,
        image: &Image,
        path: impl AsRef<Path>,
        options: &ExportOptions,
    ) -> Result<u64> {
        let path = path.as_ref();
        let format = options.resolve_format(path)?;
        let bytes = export::write_file(image, path, format, options)?;
        self.pass().exported(image.width(), image.height(), bytes);
        Ok(bytes)
    }

    fn merge_raster(
        &mut self,
        doc: &Document,
        canvas: CanvasId,
        options: &MergeOptions,
    ) -> Result<B::Raster> {
        let mut pass = self.pass();
        let started = pass.now();
        if pass.tracer.is_active() {
            pass.summary = Some(MergeSummaryBuilder::new(canvas.index(), started));
        }
        pass.tracer.merge_begin(&MergeBeginEvent {
            canvas: canvas.index(),
            layer_count: u32::try_from(doc.len(canvas)).unwrap_or(u32::MAX),
            fast: options.fast,
            timestamp_ns: started,
        });
        let raster = pass.merge(doc, canvas, options)?;
        let ended = pass.now();
        pass.tracer.merge_end(&MergeEndEvent {
            canvas: canvas.index(),
            timestamp_ns: ended,
        });
        if let Some(summary) = pass.summary.take() {
            pass.tracer.merge_summary(&summary.finish(ended));
        }
        Ok(raster)
    }
}

fn is_selected(options: &MergeOptions, id: LayerId) -> bool {
    options.layers.as_ref().is_none_or(|only| only.contains(&id))
}

/// Integer pixel box covering `r`.
#[expect(
    clippy::cast_possible_truncation,
    reason = "layer bounds are far inside the i32 range"
)]
fn pixel_box(r: Rect) -> (i32, i32, u32, u32) {
    let (x0, y0) = (r.x0.floor(), r.y0.floor());
    let w = (r.x1.ceil() - x0).max(0.0);
    let h = (r.y1.ceil() - y0).max(0.0);
    (x0 as i32, y0 as i32, w as u32, h as u32)
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "layer sizes are far inside the u32 range"
)]
fn whole(v: f64) -> u32 {
    v.round().max(0.0) as u32
}

/// Pixels a shadow reaches beyond its layer's bounds: the blur halo.
fn shadow_pad(shadow: &Shadow) -> f64 {
    (3.0 * shadow.blur / 2.0).ceil()
}

/// Black silhouette of a placed layer at the shadow's alpha, blurred by half
/// the shadow's blur and offset by `(dx, dy)`.
#[expect(
    clippy::cast_possible_truncation,
    reason = "shadow offsets and halos are small whole pixel counts"
)]
fn silhouette<B: Backend>(
    b: &B,
    base: &LayerRaster<B::Raster>,
    shadow: &Shadow,
) -> Result<LayerRaster<B::Raster>, BackendError> {
    let pad = shadow_pad(shadow);
    let (w, h) = b.extent(&base.raster);
    let padded = b.crop(
        &base.raster,
        Rect::new(-pad, -pad, f64::from(w) + pad, f64::from(h) + pad),
    )?;
    let black = b.adjust(
        &padded,
        &Adjustments {
            brightness: -1.0,
            saturation: 0.0,
            ..Adjustments::default()
        },
    )?;
    let faded = b.opacity(&black, shadow.alpha)?;
    let sigma = shadow.blur / 2.0;
    let raster = if sigma > 0.0 {
        b.gaussian_blur(&faded, sigma)?
    } else {
        faded
    };
    let pad = pad as i32;
    Ok(LayerRaster {
        raster,
        x: base.x - pad + shadow.dx.round() as i32,
        y: base.y - pad + shadow.dy.round() as i32,
    })
}

/// One render or merge, borrowing the renderer's parts.
struct Pass<'a, B: Backend> {
    backend: &'a B,
    cache: &'a mut RenderCache<B::Raster>,
    tracer: Tracer<'a>,
    epoch: Instant,
    summary: Option<MergeSummaryBuilder>,
}

impl<B: Backend> Pass<'_, B> {
    fn now(&self) -> u64 {
        if self.tracer.is_active() {
            u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
        } else {
            0
        }
    }

    fn begin(&mut self, layer: u32, stage: RenderStage) {
        let t = self.now();
        self.tracer.stage_begin(&StageBeginEvent {
            layer,
            stage,
            timestamp_ns: t,
        });
        if let Some(s) = &mut self.summary {
            s.stage_begin(stage, t);
        }
    }

    fn end(&mut self, layer: u32, stage: RenderStage) {
        let t = self.now();
        self.tracer.stage_end(&StageEndEvent {
            layer,
            stage,
            timestamp_ns: t,
        });
        if let Some(s) = &mut self.summary {
            s.stage_end(stage, t);
        }
    }

    /// Runs `f` against the backend inside a traced stage.
    fn staged<T>(
        &mut self,
        layer: u32,
        stage: RenderStage,
        f: impl FnOnce(&B) -> Result<T, BackendError>,
    ) -> Result<T> {
        self.begin(layer, stage);
        let out = f(self.backend);
        self.end(layer, stage);
        Ok(out?)
    }

    fn rendered(&mut self, layer: u32, raster: &B::Raster, cached: bool) {
        let (width, height) = self.backend.extent(raster);
        self.tracer.layer_rendered(&LayerRenderedEvent {
            layer,
            width,
            height,
            cached,
        });
        if let Some(s) = &mut self.summary {
            s.layer_rendered(cached);
        }
    }

    fn exported(&mut self, width: u32, height: u32, bytes: u64) {
        let timestamp_ns = self.now();
        self.tracer.export(&ExportEvent {
            width,
            height,
            bytes,
            timestamp_ns,
        });
    }

    // -- Layer pipeline --

    fn layer(
        &mut self,
        doc: &Document,
        id: LayerId,
        crop_to_canvas: bool,
    ) -> Result<LayerRaster<B::Raster>> {
        let slot = id.index();
        let p = doc.placement(id);
        let effects = doc.effects(id);
        let (bw, bh) = (whole(p.width), whole(p.height));

        let mut raster = match doc.payload(id) {
            Payload::Canvas(nested) => {
                let nested = *nested;
                self.begin(slot, RenderStage::Rasterize);
                let merged = self.merge(doc, nested, &MergeOptions::default());
                let out = merged.and_then(|m| {
                    Ok(self
                        .backend
                        .crop(&m, Rect::new(0.0, 0.0, f64::from(bw), f64::from(bh)))?)
                });
                self.end(slot, RenderStage::Rasterize);
                out?
            }
            payload => self.staged(slot, RenderStage::Rasterize, |b| {
                b.rasterize(payload, bw, bh)
            })?,
        };

        let crop_rect = p.crop.map(|c| {
            let s = p.cropped_size();
            Rect::from_origin_size(c.origin(), s)
        });
        if let Some(rect) = crop_rect {
            raster = self.staged(slot, RenderStage::Crop, |b| b.crop(&raster, rect))?;
        }

        if effects.filters_first {
            raster = self.effects(doc, id, raster)?;
        }

        let opacity = doc.compositing(id).opacity;
        if opacity < 1.0 {
            raster = self.staged(slot, RenderStage::Opacity, |b| b.opacity(&raster, opacity))?;
        }

        let adjustments = doc.adjustments(id);
        if !adjustments.is_neutral() || adjustments.inverted {
            raster = self.staged(slot, RenderStage::Adjustments, |b| {
                b.adjust(&raster, adjustments)
            })?;
        }

        if let Some(mask) = doc.mask_of(id).filter(|m| !doc.is_empty(*m)) {
            self.begin(slot, RenderStage::Mask);
            let masked = self.mask(doc, mask, crop_rect, &raster);
            self.end(slot, RenderStage::Mask);
            raster = masked?;
        }

        let (x0, y0, w, h) = pixel_box(p.bounds());
        let placed = Homography::from_affine(Affine::translate((-f64::from(x0), -f64::from(y0))))
            * p.transform();
        raster = self.staged(slot, RenderStage::Transforms, |b| {
            match placed.to_affine().filter(|_| !p.is_distorted()) {
                Some(affine) => b.affine_transform(&raster, affine, w, h),
                None => b.warp(&raster, &placed, w, h),
            }
        })?;

        if !effects.filters_first {
            raster = self.effects(doc, id, raster)?;
        }

        if !crop_to_canvas {
            return Ok(LayerRaster {
                raster,
                x: x0,
                y: y0,
            });
        }
        let raster = self.to_canvas(doc, slot, doc.canvas_of(id), &raster, x0, y0)?;
        Ok(LayerRaster { raster, x: 0, y: 0 })
    }

    /// Blur, sharpen, then the named chain.
    fn effects(&mut self, doc: &Document, id: LayerId, raster: B::Raster) -> Result<B::Raster> {
        let effects = doc.effects(id);
        if effects.is_empty() {
            return Ok(raster);
        }
        self.staged(id.index(), RenderStage::Filters, |b| {
            let mut raster = raster;
            if effects.blur > 0.0 {
                raster = b.gaussian_blur(&raster, effects.blur)?;
            }
            if effects.sharpness > 0.0 {
                raster = b.unsharp(&raster, effects.sharpness, 0.5)?;
            }
            for filter in &effects.filters {
                raster = b.apply_filter(&raster, filter)?;
            }
            Ok(raster)
        })
    }

    fn mask(
        &mut self,
        doc: &Document,
        mask: CanvasId,
        crop: Option<Rect>,
        raster: &B::Raster,
    ) -> Result<B::Raster> {
        let mut mask = self.merge(doc, mask, &MergeOptions::default())?;
        if let Some(rect) = crop {
            mask = self.backend.crop(&mask, rect)?;
        }
        Ok(self.backend.blend_with_mask(raster, &mask)?)
    }

    fn to_canvas(
        &mut self,
        doc: &Document,
        slot: u32,
        canvas: CanvasId,
        raster: &B::Raster,
        x: i32,
        y: i32,
    ) -> Result<B::Raster> {
        let (cw, ch) = doc.canvas_size(canvas);
        let (x, y) = (f64::from(x), f64::from(y));
        let rect = Rect::new(-x, -y, f64::from(cw) - x, f64::from(ch) - y);
        self.staged(slot, RenderStage::CanvasCrop, |b| b.crop(raster, rect))
    }

    fn shadow(
        &mut self,
        doc: &Document,
        id: LayerId,
        shadow: Shadow,
    ) -> Result<LayerRaster<B::Raster>> {
        let slot = id.index();
        let base = self.layer(doc, id, false)?;
        self.staged(slot, RenderStage::Shadow, |b| silhouette(b, &base, &shadow))
    }

    /// Canvas-sized layer and shadow rasters, from the cache when allowed.
    fn cached_layer(
        &mut self,
        doc: &Document,
        id: LayerId,
        fast: bool,
    ) -> Result<CachedLayer<B::Raster>> {
        let slot = id.index();
        let canvas = doc.canvas_of(id);
        let key = CacheKey {
            generation: id.generation(),
            revision: doc.revision(id),
            canvas_size: doc.canvas_size(canvas),
        };
        let use_cache = fast && !doc.has_pending_changes();
        if use_cache && let Some(hit) = self.cache.get(slot, key).cloned() {
            self.rendered(slot, &hit.raster, true);
            return Ok(hit);
        }
        // One uncropped render feeds both the shadow and the layer.
        let placed = self.layer(doc, id, false)?;
        let shadow = match doc.compositing(id).shadow {
            Some(s) => {
                let sh = self.staged(slot, RenderStage::Shadow, |b| silhouette(b, &placed, &s))?;
                Some(self.to_canvas(doc, slot, canvas, &sh.raster, sh.x, sh.y)?)
            }
            None => None,
        };
        let raster = self.to_canvas(doc, slot, canvas, &placed.raster, placed.x, placed.y)?;
        self.rendered(slot, &raster, false);
        let out = CachedLayer { raster, shadow };
        if use_cache {
            self.cache.insert(slot, key, out.clone());
        }
        Ok(out)
    }

    /// Whether a layer contributes anything to its canvas.
    fn is_visible(doc: &Document, id: LayerId, area: Rect) -> bool {
        if doc.is_hidden(id) {
            return false;
        }
        let p = doc.placement(id);
        let s = p.scaled_size();
        if s.width <= 0.0 || s.height <= 0.0 {
            return false;
        }
        let mut reach = p.bounds();
        if let Some(shadow) = doc.compositing(id).shadow {
            let pad = shadow_pad(&shadow);
            let cast = reach + kurbo::Vec2::new(shadow.dx, shadow.dy);
            reach = reach.union(cast.inflate(pad, pad));
        }
        let (_, _, w, h) = pixel_box(p.bounds());
        w > 0 && h > 0 && reach.intersect(area).area() > 0.0
    }

    // -- Merge --

    fn merge(
        &mut self,
        doc: &Document,
        canvas: CanvasId,
        options: &MergeOptions,
    ) -> Result<B::Raster> {
        let (cw, ch) = doc.canvas_size(canvas);
        let area = Rect::new(0.0, 0.0, f64::from(cw), f64::from(ch));
        let mut base = self.backend.empty(cw, ch)?;
        for id in doc.layers(canvas) {
            if !is_selected(options, id) || !Self::is_visible(doc, id, area) {
                continue;
            }
            let layer = self.cached_layer(doc, id, options.fast)?;
            let blend = doc.compositing(id).blend;
            base = self.staged(id.index(), RenderStage::Composite, |b| {
                let mut base = base;
                if let Some(shadow) = &layer.shadow {
                    base = b.composite(shadow, &base, BlendMode::Multiply)?;
                }
                b.composite(&layer.raster, &base, blend)
            })?;
        }
        if options.fast {
            base = self.staged(INVALID, RenderStage::Accumulate, |b| b.accumulate(base))?;
        }
        Ok(base)
    }
}

#[cfg(test)]
mod tests {
    use strata_core::color::Color;
    use strata_core::document::LayerOptions;

    use super::*;
    use crate::cpu::CpuBackend;
    use crate::overlay::OverlayCommand;
    use crate::surface::ImageSurface;

    fn renderer() -> Renderer<CpuBackend> {
        Renderer::new(CpuBackend::new())
    }

    fn near(a: u8, b: u8, tolerance: u8) -> bool {
        a.abs_diff(b) <= tolerance
    }

    #[test]
    fn red_fill_covers_the_canvas() {
        let mut doc = Document::new();
        let canvas = doc.create_canvas(400, 400);
        doc.add_fill(canvas, Some(Color::rgb(1.0, 0.0, 0.0)), LayerOptions::new())
            .unwrap();
        let image = renderer().render_canvas(&doc, canvas).unwrap();
        assert_eq!((image.width(), image.height()), (400, 400));
        assert!(image.data().chunks_exact(4).all(|p| p == [255, 0, 0, 255]));
    }

    #[test]
    fn half_opaque_white_over_black_is_mid_gray() {
        let mut doc = Document::new();
        let canvas = doc.create_canvas(8, 8);
        doc.add_fill(canvas, Some(Color::BLACK), LayerOptions::new())
            .unwrap();
        let white = doc
            .add_fill(canvas, Some(Color::WHITE), LayerOptions::new())
            .unwrap();
        doc.set_opacity(white, 0.5);
        let [r, g, b, a] = renderer().render_canvas(&doc, canvas).unwrap().pixel(4, 4).unwrap();
        assert!(near(r, 128, 1) && near(g, 128, 1) && near(b, 128, 1), "{r} {g} {b}");
        assert_eq!(a, 255);
    }

    #[test]
    fn multiply_multiplies_channels() {
        let mut doc = Document::new();
        let canvas = doc.create_canvas(8, 8);
        doc.add_fill(canvas, Some(Color::rgb(1.0, 0.5, 0.5)), LayerOptions::new())
            .unwrap();
        let top = doc
            .add_fill(canvas, Some(Color::rgb(0.5, 0.5, 1.0)), LayerOptions::new())
            .unwrap();
        doc.set_blend_mode(top, BlendMode::Multiply);
        let [r, g, b, _] = renderer().render_canvas(&doc, canvas).unwrap().pixel(0, 0).unwrap();
        assert!(near(r, 128, 1), "{r}");
        assert!(near(g, 64, 1), "{g}");
        assert!(near(b, 128, 1), "{b}");
    }

    #[test]
    fn transparent_layers_leave_the_base_alone() {
        let mut doc = Document::new();
        let canvas = doc.create_canvas(8, 8);
        doc.add_linear_gradient(canvas, Color::WHITE, Color::rgb(0.0, 0.0, 1.0), LayerOptions::new())
            .unwrap();
        let mut r = renderer();
        let before = r.render_canvas(&doc, canvas).unwrap();
        for mode in BlendMode::ALL {
            let clear = doc
                .add_fill(canvas, Some(Color::TRANSPARENT), LayerOptions::new())
                .unwrap();
            doc.set_blend_mode(clear, mode);
            assert_eq!(r.render_canvas(&doc, canvas).unwrap(), before, "{mode:?}");
            doc.remove_layer(clear);
        }
    }

    #[test]
    fn hidden_layers_are_skipped() {
        let mut doc = Document::new();
        let canvas = doc.create_canvas(4, 4);
        doc.add_fill(canvas, Some(Color::WHITE), LayerOptions::new())
            .unwrap();
        let top = doc
            .add_fill(canvas, Some(Color::BLACK), LayerOptions::new())
            .unwrap();
        doc.hide(top);
        let image = renderer().render_canvas(&doc, canvas).unwrap();
        assert_eq!(image.pixel(1, 1), Some([255, 255, 255, 255]));
    }

    #[test]
    fn merge_is_deterministic() {
        let mut doc = Document::new();
        let canvas = doc.create_canvas(40, 30);
        let a = doc
            .add_radial_gradient(canvas, Color::WHITE, Color::BLACK, 0.2, LayerOptions::new())
            .unwrap();
        doc.rotate(a, 30.0);
        doc.blur(a, 2.0);
        let b = doc
            .add_fill(
                canvas,
                Some(Color::rgb(0.2, 0.6, 0.9)),
                LayerOptions::new().size(10.0, 10.0),
            )
            .unwrap();
        doc.set_blend_mode(b, BlendMode::Overlay);
        let mut r = renderer();
        assert_eq!(
            r.render_canvas(&doc, canvas).unwrap(),
            r.render_canvas(&doc, canvas).unwrap()
        );
    }

    #[test]
    fn rendered_layer_round_trips_as_a_payload() {
        let mut doc = Document::new();
        let canvas = doc.create_canvas(20, 20);
        let layer = doc
            .add_linear_gradient(canvas, Color::rgb(1.0, 0.0, 0.0), Color::rgb(0.0, 0.0, 1.0), LayerOptions::new())
            .unwrap();
        let mut r = renderer();
        let first = r.layer_image(&doc, layer, RenderOptions::default()).unwrap();

        let other = doc.create_canvas(20, 20);
        let copy = doc.add_image(other, first.clone(), LayerOptions::new()).unwrap();
        let second = r.layer_image(&doc, copy, RenderOptions::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn crop_shrinks_the_uncropped_raster() {
        let mut doc = Document::new();
        let canvas = doc.create_canvas(100, 100);
        let layer = doc
            .add_fill(canvas, Some(Color::WHITE), LayerOptions::new())
            .unwrap();
        doc.crop(layer, 10, 10, 50, 50);
        let px = renderer().pixels(&doc, layer).unwrap();
        assert_eq!((px.width(), px.height()), (50, 50));
        assert_eq!(px.origin(), (25, 25));
    }

    #[test]
    fn shadow_is_multiplied_under_the_layer() {
        let mut doc = Document::new();
        let canvas = doc.create_canvas(100, 100);
        let layer = doc
            .add_fill(
                canvas,
                Some(Color::WHITE),
                LayerOptions::new().at(50.0, 50.0).size(40.0, 40.0),
            )
            .unwrap();
        doc.dropshadow(
            layer,
            Shadow {
                dx: 10.0,
                dy: 10.0,
                alpha: 1.0,
                blur: 0.0,
            },
        );
        let mut r = renderer();
        let shadow = r.render_shadow(&doc, layer).unwrap().unwrap();
        assert_eq!((shadow.x, shadow.y), (40, 40));

        let image = r.render_canvas(&doc, canvas).unwrap();
        assert_eq!(image.pixel(50, 50), Some([255, 255, 255, 255]));
        assert_eq!(image.pixel(75, 75), Some([0, 0, 0, 255]));
        assert_eq!(image.pixel(20, 20), Some([0, 0, 0, 0]));
    }

    #[test]
    fn layers_without_shadow_have_none() {
        let mut doc = Document::new();
        let canvas = doc.create_canvas(4, 4);
        let layer = doc.add_fill(canvas, None, LayerOptions::new()).unwrap();
        assert!(renderer().render_shadow(&doc, layer).unwrap().is_none());
    }

    #[test]
    fn mask_luminance_hides_the_layer() {
        let mut doc = Document::new();
        let canvas = doc.create_canvas(100, 100);
        let layer = doc
            .add_fill(canvas, Some(Color::WHITE), LayerOptions::new())
            .unwrap();
        let mask = doc.mask(layer);
        doc.add_fill(mask, None, LayerOptions::new()).unwrap();
        doc.add_fill(
            mask,
            Some(Color::BLACK),
            LayerOptions::new().at(25.0, 50.0).size(50.0, 100.0),
        )
        .unwrap();
        let image = renderer().render_canvas(&doc, canvas).unwrap();
        assert_eq!(image.pixel(10, 50).unwrap()[3], 0);
        assert_eq!(image.pixel(90, 50), Some([255, 255, 255, 255]));
    }

    #[test]
    fn empty_mask_is_ignored() {
        let mut doc = Document::new();
        let canvas = doc.create_canvas(10, 10);
        let layer = doc
            .add_fill(canvas, Some(Color::WHITE), LayerOptions::new())
            .unwrap();
        doc.mask(layer);
        let image = renderer().render_canvas(&doc, canvas).unwrap();
        assert_eq!(image.pixel(5, 5), Some([255, 255, 255, 255]));
    }

    #[test]
    fn nested_canvas_is_merged_in_place() {
        let mut doc = Document::new();
        let inner = doc.create_canvas(10, 10);
        doc.add_fill(inner, Some(Color::rgb(1.0, 0.0, 0.0)), LayerOptions::new())
            .unwrap();
        let outer = doc.create_canvas(20, 20);
        doc.add_canvas(outer, inner, LayerOptions::new().at(5.0, 5.0))
            .unwrap();
        let image = renderer().render_canvas(&doc, outer).unwrap();
        assert_eq!(image.pixel(2, 2), Some([255, 0, 0, 255]));
        assert_eq!(image.pixel(15, 15), Some([0, 0, 0, 0]));
    }

    #[test]
    fn selected_layers_only() {
        let mut doc = Document::new();
        let canvas = doc.create_canvas(4, 4);
        let bottom = doc
            .add_fill(canvas, Some(Color::WHITE), LayerOptions::new())
            .unwrap();
        doc.add_fill(canvas, Some(Color::BLACK), LayerOptions::new())
            .unwrap();
        let options = MergeOptions {
            layers: Some(vec![bottom]),
            ..MergeOptions::default()
        };
        let image = renderer().merge(&doc, canvas, &options).unwrap();
        assert_eq!(image.pixel(0, 0), Some([255, 255, 255, 255]));
    }

    #[test]
    fn fast_merges_reuse_unchanged_layers() {
        let mut doc = Document::new();
        let canvas = doc.create_canvas(16, 16);
        let layer = doc
            .add_fill(canvas, Some(Color::WHITE), LayerOptions::new())
            .unwrap();
        let fast = MergeOptions {
            fast: true,
            ..MergeOptions::default()
        };
        let mut r = renderer();
        r.apply_changes(&doc.evaluate());

        let first = r.merge(&doc, canvas, &fast).unwrap();
        let second = r.merge(&doc, canvas, &fast).unwrap();
        assert_eq!(first, second);
        assert_eq!((r.cache().hits(), r.cache().misses()), (1, 1));

        doc.set_opacity(layer, 0.0);
        let pending = r.merge(&doc, canvas, &fast).unwrap();
        assert_eq!(pending.pixel(0, 0).unwrap()[3], 0);
        assert_eq!(r.cache().hits(), 1);

        r.apply_changes(&doc.evaluate());
        assert!(r.cache().is_empty());
        let after = r.merge(&doc, canvas, &fast).unwrap();
        assert_eq!(after, pending);
    }

    #[test]
    fn overlay_gets_guides_for_merged_layers() {
        let mut doc = Document::new();
        let canvas = doc.create_canvas(10, 10);
        let shown = doc.add_fill(canvas, None, LayerOptions::new()).unwrap();
        let hidden = doc.add_fill(canvas, None, LayerOptions::new()).unwrap();
        doc.hide(hidden);

        let mut one: Vec<OverlayCommand> = Vec::new();
        overlay::guides(
            &mut one,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            doc.bounds(shown),
            Point::new(5.0, 5.0),
        );
        let mut recorded: Vec<OverlayCommand> = Vec::new();
        renderer()
            .merge_with_overlay(&doc, canvas, &MergeOptions::default(), &mut recorded)
            .unwrap();
        assert_eq!(recorded, one);
    }

    #[test]
    fn draw_places_the_merge_on_the_surface() {
        let mut doc = Document::new();
        let canvas = doc.create_canvas(2, 2);
        doc.add_fill(canvas, Some(Color::BLACK), LayerOptions::new())
            .unwrap();
        let mut surface = ImageSurface::new(4, 4);
        renderer()
            .draw(&doc, canvas, &mut surface, Some(Point::new(2.0, 2.0)))
            .unwrap();
        assert_eq!(surface.image().pixel(3, 3), Some([0, 0, 0, 255]));
        assert_eq!(surface.image().pixel(0, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn export_infers_the_format_from_the_extension() {
        let mut doc = Document::new();
        let canvas = doc.create_canvas(6, 5);
        doc.add_fill(canvas, None, LayerOptions::new()).unwrap();
        let mut r = renderer();
        let path = std::env::temp_dir().join("strata_pipeline_export.png");
        let bytes = r
            .export(&doc, canvas, &path, &ExportOptions::new())
            .unwrap();
        assert_eq!(bytes, std::fs::metadata(&path).unwrap().len());
        assert_eq!(r.backend().image_size(&path).unwrap(), (6, 5));
        std::fs::remove_file(&path).unwrap();

        let err = r
            .export(&doc, canvas, "no_extension", &ExportOptions::new())
            .unwrap_err();
        assert!(matches!(err, strata_core::Error::RenderBackend { .. }));
    }

    #[test]
    fn stage_order_starts_with_crop() {
        assert_eq!(RENDER_ORDER[0], RenderStage::Crop);
        assert_eq!(RENDER_ORDER[5], RenderStage::Transforms);
    }

    #[test]
    fn flipped_layer_renders_mirrored() {
        let mut doc = Document::new();
        let canvas = doc.create_canvas(4, 2);
        let red = Color::rgb(1.0, 0.0, 0.0);
        let blue = Color::rgb(0.0, 0.0, 1.0);
        let row = [red, red, blue, blue];
        let layer = doc
            .add_pixels(canvas, [row, row].concat(), 4, 2, LayerOptions::new())
            .unwrap();
        let mut r = renderer();
        let plain = r.render_canvas(&doc, canvas).unwrap();
        assert_eq!(plain.pixel(0, 0), Some([255, 0, 0, 255]));

        doc.flip_horizontal(layer);
        let flipped = r.render_canvas(&doc, canvas).unwrap();
        for (x, y, want) in [(0, 0, [0, 0, 255]), (1, 1, [0, 0, 255]), (3, 0, [255, 0, 0])] {
            let [cr, cg, cb, a] = flipped.pixel(x, y).unwrap();
            assert!(
                near(cr, want[0], 1) && near(cg, want[1], 1) && near(cb, want[2], 1),
                "({x}, {y}): {cr} {cg} {cb}"
            );
            assert!(near(a, 255, 1), "({x}, {y}) alpha {a}");
        }
    }

    #[test]
    fn distortion_moves_the_corner() {
        let mut doc = Document::new();
        let canvas = doc.create_canvas(40, 40);
        let layer = doc
            .add_fill(canvas, Some(Color::WHITE), LayerOptions::new().size(20.0, 20.0))
            .unwrap();
        let mut r = renderer();
        let before = r.render_canvas(&doc, canvas).unwrap();
        assert_eq!(before.pixel(32, 8).map(|p| p[3]), Some(0));

        doc.distort(
            layer,
            [
                kurbo::Vec2::ZERO,
                kurbo::Vec2::new(0.25, -0.25),
                kurbo::Vec2::ZERO,
                kurbo::Vec2::ZERO,
            ],
        );
        let tr = doc.placement(layer).corners()[1];
        assert!(
            (tr.x - 35.0).abs() < 1e-9 && (tr.y - 5.0).abs() < 1e-9,
            "top-right corner at {tr:?}"
        );
        let image = r.render_canvas(&doc, canvas).unwrap();
        // Just inside the moved corner, then just beyond it.
        let inside = image.pixel(32, 8).unwrap()[3];
        assert!(inside > 250, "inside alpha {inside}");
        assert_eq!(image.pixel(36, 6).map(|p| p[3]), Some(0));
        let interior = image.pixel(12, 12).unwrap()[3];
        assert!(interior > 250, "interior alpha {interior}");
    }

    #[test]
    fn late_filters_spread_past_the_rotated_edge() {
        let mut doc = Document::new();
        let canvas = doc.create_canvas(60, 60);
        let layer = doc
            .add_fill(canvas, Some(Color::WHITE), LayerOptions::new().size(20.0, 20.0))
            .unwrap();
        doc.rotate(layer, 45.0);
        doc.blur(layer, 3.0);
        let mut r = renderer();

        // (38, 38) lies on the diagonal, two pixels outside the rotated edge
        // but inside the rotated bounds.
        let early = r.render_canvas(&doc, canvas).unwrap().pixel(38, 38).unwrap()[3];
        assert!(early <= 2, "blur before rotation stays inside: {early}");

        doc.set_filters_first(layer, false);
        let late = r.render_canvas(&doc, canvas).unwrap().pixel(38, 38).unwrap()[3];
        assert!(late > 20, "blur after rotation spreads outward: {late}");
    }

    #[cfg(feature = "trace")]
    #[test]
    fn merges_emit_trace_events() {
        use std::cell::RefCell;
        use std::rc::Rc;

        use strata_core::trace::MergeSummary;

        #[derive(Default)]
        struct Log {
            stages: Vec<RenderStage>,
            merges: u32,
            rendered: u32,
            summaries: Vec<MergeSummary>,
        }
        struct Sink(Rc<RefCell<Log>>);
        impl TraceSink for Sink {
            fn on_stage_begin(&mut self, e: &StageBeginEvent) {
                self.0.borrow_mut().stages.push(e.stage);
            }
            fn on_merge_begin(&mut self, _: &MergeBeginEvent) {
                self.0.borrow_mut().merges += 1;
            }
            fn on_layer_rendered(&mut self, _: &LayerRenderedEvent) {
                self.0.borrow_mut().rendered += 1;
            }
            fn on_merge_summary(&mut self, s: &MergeSummary) {
                self.0.borrow_mut().summaries.push(*s);
            }
        }

        let mut doc = Document::new();
        let canvas = doc.create_canvas(8, 8);
        let layer = doc.add_fill(canvas, None, LayerOptions::new()).unwrap();
        doc.set_opacity(layer, 0.5);
        let log = Rc::new(RefCell::new(Log::default()));
        let mut r = renderer().with_trace_sink(Sink(Rc::clone(&log)));
        r.render_canvas(&doc, canvas).unwrap();

        let log = log.borrow();
        assert_eq!(log.merges, 1);
        assert_eq!(log.rendered, 1);
        assert_eq!(
            log.stages,
            [
                RenderStage::Rasterize,
                RenderStage::Opacity,
                RenderStage::Transforms,
                RenderStage::CanvasCrop,
                RenderStage::Composite,
            ]
        );
        assert_eq!(log.summaries.len(), 1);
        assert_eq!(log.summaries[0].layers_rendered, 1);
    }

    #[cfg(feature = "trace")]
    fn stage_trace(doc: &Document, canvas: CanvasId) -> Vec<RenderStage> {
        use std::cell::RefCell;
        use std::rc::Rc;

        struct Stages(Rc<RefCell<Vec<RenderStage>>>);
        impl TraceSink for Stages {
            fn on_stage_begin(&mut self, e: &StageBeginEvent) {
                self.0.borrow_mut().push(e.stage);
            }
        }

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut r = renderer().with_trace_sink(Stages(Rc::clone(&log)));
        r.render_canvas(doc, canvas).unwrap();
        log.take()
    }

    #[cfg(feature = "trace")]
    #[test]
    fn late_filters_run_after_transforms() {
        let mut doc = Document::new();
        let canvas = doc.create_canvas(16, 16);
        let layer = doc
            .add_fill(canvas, Some(Color::WHITE), LayerOptions::new().size(8.0, 8.0))
            .unwrap();
        doc.rotate(layer, 30.0);
        doc.blur(layer, 1.0);
        doc.set_opacity(layer, 0.5);
        doc.set_brightness(layer, 0.2);
        assert_eq!(
            stage_trace(&doc, canvas),
            [
                RenderStage::Rasterize,
                RenderStage::Filters,
                RenderStage::Opacity,
                RenderStage::Adjustments,
                RenderStage::Transforms,
                RenderStage::CanvasCrop,
                RenderStage::Composite,
            ]
        );

        doc.set_filters_first(layer, false);
        assert_eq!(
            stage_trace(&doc, canvas),
            [
                RenderStage::Rasterize,
                RenderStage::Opacity,
                RenderStage::Adjustments,
                RenderStage::Transforms,
                RenderStage::Filters,
                RenderStage::CanvasCrop,
                RenderStage::Composite,
            ]
        );
    }

    #[cfg(feature = "trace")]
    #[test]
    fn shadowed_layers_rasterize_once() {
        let mut doc = Document::new();
        let canvas = doc.create_canvas(32, 32);
        let layer = doc
            .add_fill(canvas, Some(Color::WHITE), LayerOptions::new().size(10.0, 10.0))
            .unwrap();
        doc.dropshadow(layer, Shadow::default());
        let stages = stage_trace(&doc, canvas);
        let count = |stage: RenderStage| stages.iter().filter(|s| **s == stage).count();
        assert_eq!(count(RenderStage::Rasterize), 1, "{stages:?}");
        assert_eq!(count(RenderStage::Transforms), 1, "{stages:?}");
        assert_eq!(count(RenderStage::Shadow), 1, "{stages:?}");
        assert_eq!(count(RenderStage::CanvasCrop), 2, "{stages:?}");
    }
}
