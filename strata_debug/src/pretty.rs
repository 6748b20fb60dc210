// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are printed in microseconds.

use std::io::Write;

use strata_core::document::INVALID;
use strata_core::trace::{
    ExportEvent, LayerRenderedEvent, MergeBeginEvent, MergeEndEvent, MergeSummary, RenderStage,
    StageBeginEvent, StageEndEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    stages: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("stages", &self.stages)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self::with_writer(writer)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            stages: true,
        }
    }

    /// Suppresses per-stage lines, keeping merges, layers and summaries.
    #[must_use]
    pub fn without_stages(mut self) -> Self {
        self.stages = false;
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn us(ns: u64) -> f64 {
    ns as f64 / 1000.0
}

/// `layer=N`, or `canvas` for stages that belong to the merge itself.
fn subject(layer: u32) -> String {
    if layer == INVALID {
        "canvas".to_owned()
    } else {
        format!("layer={layer}")
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_merge_begin(&mut self, e: &MergeBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[merge:begin] canvas={} layers={} fast={} at {:.1}µs",
            e.canvas,
            e.layer_count,
            e.fast,
            us(e.timestamp_ns),
        );
    }

    fn on_merge_end(&mut self, e: &MergeEndEvent) {
        let _ = writeln!(
            self.writer,
            "[merge:end] canvas={} at {:.1}µs",
            e.canvas,
            us(e.timestamp_ns),
        );
    }

    fn on_stage_begin(&mut self, e: &StageBeginEvent) {
        if !self.stages {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[stage:begin] {} {} at {:.1}µs",
            subject(e.layer),
            e.stage.name(),
            us(e.timestamp_ns),
        );
    }

    fn on_stage_end(&mut self, e: &StageEndEvent) {
        if !self.stages {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[stage:end] {} {} at {:.1}µs",
            subject(e.layer),
            e.stage.name(),
            us(e.timestamp_ns),
        );
    }

    fn on_layer_rendered(&mut self, e: &LayerRenderedEvent) {
        let source = if e.cached { "cached" } else { "rendered" };
        let _ = writeln!(
            self.writer,
            "[layer] layer={} {}x{} {source}",
            e.layer, e.width, e.height,
        );
    }

    fn on_export(&mut self, e: &ExportEvent) {
        let _ = writeln!(
            self.writer,
            "[export] {}x{} bytes={} at {:.1}µs",
            e.width,
            e.height,
            e.bytes,
            us(e.timestamp_ns),
        );
    }

    fn on_merge_summary(&mut self, s: &MergeSummary) {
        let mut line = format!(
            "[summary] canvas={} rendered={} cached={} total={:.1}µs",
            s.canvas,
            s.layers_rendered,
            s.layers_cached,
            us(s.total_ns),
        );
        for stage in RenderStage::ALL {
            let ns = s.stage_ns[stage.index()];
            if ns > 0 {
                line.push_str(&format!(" {}={:.1}µs", stage.name(), us(ns)));
            }
        }
        let _ = writeln!(self.writer, "{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(sink: PrettyPrintSink<Vec<u8>>) -> Vec<String> {
        String::from_utf8(sink.into_inner())
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn stage_lines_name_the_layer() {
        let mut sink = PrettyPrintSink::with_writer(Vec::new());
        sink.on_stage_begin(&StageBeginEvent {
            layer: 3,
            stage: RenderStage::Transforms,
            timestamp_ns: 1_500,
        });
        sink.on_stage_end(&StageEndEvent {
            layer: INVALID,
            stage: RenderStage::Accumulate,
            timestamp_ns: 2_000,
        });
        assert_eq!(
            lines(sink),
            [
                "[stage:begin] layer=3 transform at 1.5µs",
                "[stage:end] canvas accumulate at 2.0µs",
            ]
        );
    }

    #[test]
    fn stages_can_be_suppressed() {
        let mut sink = PrettyPrintSink::with_writer(Vec::new()).without_stages();
        sink.on_stage_begin(&StageBeginEvent {
            layer: 0,
            stage: RenderStage::Crop,
            timestamp_ns: 0,
        });
        sink.on_layer_rendered(&LayerRenderedEvent {
            layer: 0,
            width: 20,
            height: 10,
            cached: false,
        });
        assert_eq!(lines(sink), ["[layer] layer=0 20x10 rendered"]);
    }

    #[test]
    fn summary_lists_only_timed_stages() {
        let mut stage_ns = [0; RenderStage::COUNT];
        stage_ns[RenderStage::Rasterize.index()] = 3_000;
        let mut sink = PrettyPrintSink::with_writer(Vec::new());
        sink.on_merge_summary(&MergeSummary {
            canvas: 1,
            layers_rendered: 2,
            layers_cached: 0,
            stage_ns,
            total_ns: 4_000,
        });
        assert_eq!(
            lines(sink),
            ["[summary] canvas=1 rendered=2 cached=0 total=4.0µs rasterize=3.0µs"]
        );
    }
}
