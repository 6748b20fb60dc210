// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the render pipeline.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! renderers call at each pipeline stage. All method bodies default to no-ops,
//! so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! [`MergeSummaryBuilder`] collects stage timings during a merge and produces
//! a [`MergeSummary`] at the end.
//!
//! Timestamps are nanoseconds on a monotonic clock chosen by the renderer;
//! only differences between them are meaningful.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which step of a layer render or merge is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderStage {
    /// Turning the typed payload into a raster.
    Rasterize,
    /// Clipping to the layer's crop rectangle.
    Crop,
    /// Blur, sharpen and the named filter chain.
    Filters,
    /// Uniform opacity.
    Opacity,
    /// Brightness, contrast, saturation and inversion.
    Adjustments,
    /// Alpha masking by the layer's mask canvas.
    Mask,
    /// Flip, distort, scale, rotate and translate.
    Transforms,
    /// Clipping the placed layer to its canvas.
    CanvasCrop,
    /// Dropshadow synthesis and compositing.
    Shadow,
    /// Blending a layer onto the accumulated base.
    Composite,
    /// Forcing evaluation of the merged result.
    Accumulate,
}

impl RenderStage {
    /// Number of stages.
    pub const COUNT: usize = 11;

    /// All stages in declaration order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Rasterize,
        Self::Crop,
        Self::Filters,
        Self::Opacity,
        Self::Adjustments,
        Self::Mask,
        Self::Transforms,
        Self::CanvasCrop,
        Self::Shadow,
        Self::Composite,
        Self::Accumulate,
    ];

    /// Stable index in `0..COUNT`.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Rasterize => 0,
            Self::Crop => 1,
            Self::Filters => 2,
            Self::Opacity => 3,
            Self::Adjustments => 4,
            Self::Mask => 5,
            Self::Transforms => 6,
            Self::CanvasCrop => 7,
            Self::Shadow => 8,
            Self::Composite => 9,
            Self::Accumulate => 10,
        }
    }

    /// Inverse of [`index`](Self::index).
    #[must_use]
    pub const fn from_index(i: usize) -> Option<Self> {
        if i < Self::COUNT {
            Some(Self::ALL[i])
        } else {
            None
        }
    }

    /// Short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rasterize => "rasterize",
            Self::Crop => "crop",
            Self::Filters => "filters",
            Self::Opacity => "opacity",
            Self::Adjustments => "adjust",
            Self::Mask => "mask",
            Self::Transforms => "transform",
            Self::CanvasCrop => "canvas-crop",
            Self::Shadow => "shadow",
            Self::Composite => "composite",
            Self::Accumulate => "accumulate",
        }
    }
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Marks the beginning of a pipeline stage for one layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageBeginEvent {
    /// Slot index of the layer being rendered.
    pub layer: u32,
    /// Which stage is starting.
    pub stage: RenderStage,
    /// Timestamp in nanoseconds.
    pub timestamp_ns: u64,
}

/// Marks the end of a pipeline stage for one layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageEndEvent {
    /// Slot index of the layer being rendered.
    pub layer: u32,
    /// Which stage is ending.
    pub stage: RenderStage,
    /// Timestamp in nanoseconds.
    pub timestamp_ns: u64,
}

/// Emitted once a layer has a finished raster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerRenderedEvent {
    /// Slot index of the layer.
    pub layer: u32,
    /// Raster width in pixels.
    pub width: u32,
    /// Raster height in pixels.
    pub height: u32,
    /// Whether the raster came from the fast-path cache.
    pub cached: bool,
}

/// Emitted when a canvas merge starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergeBeginEvent {
    /// Slot index of the canvas.
    pub canvas: u32,
    /// Number of layers considered (hidden ones included).
    pub layer_count: u32,
    /// Whether the fast path is requested.
    pub fast: bool,
    /// Timestamp in nanoseconds.
    pub timestamp_ns: u64,
}

/// Emitted when a canvas merge finishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergeEndEvent {
    /// Slot index of the canvas.
    pub canvas: u32,
    /// Timestamp in nanoseconds.
    pub timestamp_ns: u64,
}

/// Emitted after an image has been encoded to a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportEvent {
    /// Exported width in pixels.
    pub width: u32,
    /// Exported height in pixels.
    pub height: u32,
    /// Encoded size in bytes.
    pub bytes: u64,
    /// Timestamp in nanoseconds.
    pub timestamp_ns: u64,
}

/// Per-merge timing summary produced by [`MergeSummaryBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergeSummary {
    /// Slot index of the canvas.
    pub canvas: u32,
    /// Layers rendered from scratch.
    pub layers_rendered: u32,
    /// Layers served from the fast-path cache.
    pub layers_cached: u32,
    /// Total nanoseconds spent per stage, indexed by [`RenderStage::index`].
    pub stage_ns: [u64; RenderStage::COUNT],
    /// Wall time of the whole merge in nanoseconds.
    pub total_ns: u64,
}

impl MergeSummary {
    /// Nanoseconds spent in `stage`.
    #[must_use]
    pub const fn stage(&self, stage: RenderStage) -> u64 {
        self.stage_ns[stage.index()]
    }
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the renderer.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a canvas merge starts.
    fn on_merge_begin(&mut self, e: &MergeBeginEvent) {
        _ = e;
    }

    /// Called when a canvas merge ends.
    fn on_merge_end(&mut self, e: &MergeEndEvent) {
        _ = e;
    }

    /// Called at the beginning of a pipeline stage.
    fn on_stage_begin(&mut self, e: &StageBeginEvent) {
        _ = e;
    }

    /// Called at the end of a pipeline stage.
    fn on_stage_end(&mut self, e: &StageEndEvent) {
        _ = e;
    }

    /// Called when a layer raster is ready.
    fn on_layer_rendered(&mut self, e: &LayerRenderedEvent) {
        _ = e;
    }

    /// Called after an export completes.
    fn on_export(&mut self, e: &ExportEvent) {
        _ = e;
    }

    /// Called with a per-merge summary.
    fn on_merge_summary(&mut self, s: &MergeSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Whether events reach a sink.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }

    /// Emits a [`MergeBeginEvent`].
    #[inline]
    pub fn merge_begin(&mut self, e: &MergeBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_merge_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`MergeEndEvent`].
    #[inline]
    pub fn merge_end(&mut self, e: &MergeEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_merge_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`StageBeginEvent`].
    #[inline]
    pub fn stage_begin(&mut self, e: &StageBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_stage_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`StageEndEvent`].
    #[inline]
    pub fn stage_end(&mut self, e: &StageEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_stage_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`LayerRenderedEvent`].
    #[inline]
    pub fn layer_rendered(&mut self, e: &LayerRenderedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_layer_rendered(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`ExportEvent`].
    #[inline]
    pub fn export(&mut self, e: &ExportEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_export(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`MergeSummary`].
    #[inline]
    pub fn merge_summary(&mut self, s: &MergeSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_merge_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }
}

// ---------------------------------------------------------------------------
// MergeSummaryBuilder
// ---------------------------------------------------------------------------

/// Accumulates stage timings during one merge and produces a
/// [`MergeSummary`].
///
/// Nested or repeated stages (the same stage for several layers) add up.
#[derive(Debug)]
pub struct MergeSummaryBuilder {
    canvas: u32,
    started_ns: u64,
    open: [Option<u64>; RenderStage::COUNT],
    stage_ns: [u64; RenderStage::COUNT],
    layers_rendered: u32,
    layers_cached: u32,
}

impl MergeSummaryBuilder {
    /// Starts a summary for `canvas` at time `started_ns`.
    #[must_use]
    pub fn new(canvas: u32, started_ns: u64) -> Self {
        Self {
            canvas,
            started_ns,
            open: [None; RenderStage::COUNT],
            stage_ns: [0; RenderStage::COUNT],
            layers_rendered: 0,
            layers_cached: 0,
        }
    }

    /// Records the start of a stage.
    pub fn stage_begin(&mut self, stage: RenderStage, t_ns: u64) {
        self.open[stage.index()] = Some(t_ns);
    }

    /// Records the end of a stage. Unmatched ends are ignored.
    pub fn stage_end(&mut self, stage: RenderStage, t_ns: u64) {
        if let Some(start) = self.open[stage.index()].take() {
            self.stage_ns[stage.index()] += t_ns.saturating_sub(start);
        }
    }

    /// Counts a finished layer raster.
    pub fn layer_rendered(&mut self, cached: bool) {
        if cached {
            self.layers_cached += 1;
        } else {
            self.layers_rendered += 1;
        }
    }

    /// Consumes the builder and produces the final [`MergeSummary`].
    #[must_use]
    pub fn finish(self, ended_ns: u64) -> MergeSummary {
        MergeSummary {
            canvas: self.canvas,
            layers_rendered: self.layers_rendered,
            layers_cached: self.layers_cached,
            stage_ns: self.stage_ns,
            total_ns: ended_ns.saturating_sub(self.started_ns),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_indices_round_trip() {
        for (i, stage) in RenderStage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
            assert_eq!(RenderStage::from_index(i), Some(*stage));
        }
        assert_eq!(RenderStage::from_index(RenderStage::COUNT), None);
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_merge_begin(&MergeBeginEvent {
            canvas: 0,
            layer_count: 3,
            fast: false,
            timestamp_ns: 0,
        });
        sink.on_stage_begin(&StageBeginEvent {
            layer: 1,
            stage: RenderStage::Crop,
            timestamp_ns: 10,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        assert!(!tracer.is_active());
        tracer.merge_end(&MergeEndEvent {
            canvas: 0,
            timestamp_ns: 5,
        });
    }

    #[test]
    fn summary_builder_accumulates_repeated_stages() {
        let mut b = MergeSummaryBuilder::new(2, 1_000);
        b.stage_begin(RenderStage::Rasterize, 1_000);
        b.stage_end(RenderStage::Rasterize, 1_100);
        b.stage_begin(RenderStage::Rasterize, 1_200);
        b.stage_end(RenderStage::Rasterize, 1_250);
        b.stage_begin(RenderStage::Composite, 1_250);
        b.stage_end(RenderStage::Composite, 1_400);
        b.stage_end(RenderStage::Mask, 9_999);
        b.layer_rendered(false);
        b.layer_rendered(true);
        b.layer_rendered(false);

        let s = b.finish(1_500);
        assert_eq!(s.canvas, 2);
        assert_eq!(s.stage(RenderStage::Rasterize), 150);
        assert_eq!(s.stage(RenderStage::Composite), 150);
        assert_eq!(s.stage(RenderStage::Mask), 0);
        assert_eq!(s.layers_rendered, 2);
        assert_eq!(s.layers_cached, 1);
        assert_eq!(s.total_ns, 500);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            stages: Vec<RenderStage>,
        }
        impl TraceSink for RecordingSink {
            fn on_stage_begin(&mut self, e: &StageBeginEvent) {
                self.stages.push(e.stage);
            }
        }

        let mut sink = RecordingSink { stages: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.stage_begin(&StageBeginEvent {
            layer: 0,
            stage: RenderStage::Mask,
            timestamp_ns: 0,
        });
        drop(tracer);
        assert_eq!(sink.stages, &[RenderStage::Mask]);
    }
}
