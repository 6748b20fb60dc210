// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Merges and canvas-level stages go on thread 0. Each layer gets its own
//! thread (`layer + 1`), so stage spans of different layers do not interleave
//! in the viewer.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use strata_core::document::INVALID;
use strata_core::trace::RenderStage;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let events: Vec<Value> = decode(bytes).map(to_json).collect();
    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn to_json(recorded: RecordedEvent) -> Value {
    match recorded {
        RecordedEvent::MergeBegin(e) => json!({
            "ph": "B",
            "name": "merge",
            "cat": "Merge",
            "ts": ns_to_us(e.timestamp_ns),
            "pid": 0,
            "tid": 0,
            "args": {
                "canvas": e.canvas,
                "layer_count": e.layer_count,
                "fast": e.fast,
            }
        }),
        RecordedEvent::MergeEnd(e) => json!({
            "ph": "E",
            "name": "merge",
            "cat": "Merge",
            "ts": ns_to_us(e.timestamp_ns),
            "pid": 0,
            "tid": 0,
            "args": {
                "canvas": e.canvas,
            }
        }),
        RecordedEvent::StageBegin(e) => stage("B", e.layer, e.stage, e.timestamp_ns),
        RecordedEvent::StageEnd(e) => stage("E", e.layer, e.stage, e.timestamp_ns),
        RecordedEvent::LayerRendered(e) => json!({
            "ph": "i",
            "name": "LayerRendered",
            "cat": "Layer",
            "ts": 0,
            "pid": 0,
            "tid": thread(e.layer),
            "s": "t",
            "args": {
                "layer": e.layer,
                "width": e.width,
                "height": e.height,
                "cached": e.cached,
            }
        }),
        RecordedEvent::Export(e) => json!({
            "ph": "i",
            "name": "Export",
            "cat": "Export",
            "ts": ns_to_us(e.timestamp_ns),
            "pid": 0,
            "tid": 0,
            "s": "g",
            "args": {
                "width": e.width,
                "height": e.height,
                "bytes": e.bytes,
            }
        }),
        RecordedEvent::MergeSummary(s) => {
            let stages: serde_json::Map<String, Value> = RenderStage::ALL
                .iter()
                .map(|st| {
                    (
                        format!("{}_us", st.name()),
                        json!(ns_to_us(s.stage_ns[st.index()])),
                    )
                })
                .collect();
            json!({
                "ph": "i",
                "name": "MergeSummary",
                "cat": "Summary",
                "ts": 0,
                "pid": 0,
                "tid": 0,
                "s": "g",
                "args": {
                    "canvas": s.canvas,
                    "layers_rendered": s.layers_rendered,
                    "layers_cached": s.layers_cached,
                    "total_us": ns_to_us(s.total_ns),
                    "stages": stages,
                }
            })
        }
    }
}

fn stage(ph: &str, layer: u32, stage: RenderStage, timestamp_ns: u64) -> Value {
    json!({
        "ph": ph,
        "name": stage.name(),
        "cat": "Stage",
        "ts": ns_to_us(timestamp_ns),
        "pid": 0,
        "tid": thread(layer),
    })
}

fn thread(layer: u32) -> u64 {
    if layer == INVALID {
        0
    } else {
        u64::from(layer) + 1
    }
}

fn ns_to_us(ns: u64) -> f64 {
    ns as f64 / 1000.0
}
