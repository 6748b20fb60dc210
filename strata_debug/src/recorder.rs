// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, each led by a one-byte tag.
//! [`decode`] reads them back as an iterator of [`RecordedEvent`]. Decoding
//! stops at the first unknown tag or truncated record.

use strata_core::trace::{
    ExportEvent, LayerRenderedEvent, MergeBeginEvent, MergeEndEvent, MergeSummary, RenderStage,
    StageBeginEvent, StageEndEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_MERGE_BEGIN: u8 = 1;
const TAG_MERGE_END: u8 = 2;
const TAG_STAGE_BEGIN: u8 = 3;
const TAG_STAGE_END: u8 = 4;
const TAG_LAYER_RENDERED: u8 = 5;
const TAG_EXPORT: u8 = 6;
const TAG_MERGE_SUMMARY: u8 = 7;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Discards everything recorded so far.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_stage(&mut self, stage: RenderStage) {
        self.write_u8(u8::try_from(stage.index()).unwrap_or(u8::MAX));
    }
}

impl TraceSink for RecorderSink {
    fn on_merge_begin(&mut self, e: &MergeBeginEvent) {
        self.write_u8(TAG_MERGE_BEGIN);
        self.write_u32(e.canvas);
        self.write_u32(e.layer_count);
        self.write_bool(e.fast);
        self.write_u64(e.timestamp_ns);
    }

    fn on_merge_end(&mut self, e: &MergeEndEvent) {
        self.write_u8(TAG_MERGE_END);
        self.write_u32(e.canvas);
        self.write_u64(e.timestamp_ns);
    }

    fn on_stage_begin(&mut self, e: &StageBeginEvent) {
        self.write_u8(TAG_STAGE_BEGIN);
        self.write_u32(e.layer);
        self.write_stage(e.stage);
        self.write_u64(e.timestamp_ns);
    }

    fn on_stage_end(&mut self, e: &StageEndEvent) {
        self.write_u8(TAG_STAGE_END);
        self.write_u32(e.layer);
        self.write_stage(e.stage);
        self.write_u64(e.timestamp_ns);
    }

    fn on_layer_rendered(&mut self, e: &LayerRenderedEvent) {
        self.write_u8(TAG_LAYER_RENDERED);
        self.write_u32(e.layer);
        self.write_u32(e.width);
        self.write_u32(e.height);
        self.write_bool(e.cached);
    }

    fn on_export(&mut self, e: &ExportEvent) {
        self.write_u8(TAG_EXPORT);
        self.write_u32(e.width);
        self.write_u32(e.height);
        self.write_u64(e.bytes);
        self.write_u64(e.timestamp_ns);
    }

    fn on_merge_summary(&mut self, s: &MergeSummary) {
        self.write_u8(TAG_MERGE_SUMMARY);
        self.write_u32(s.canvas);
        self.write_u32(s.layers_rendered);
        self.write_u32(s.layers_cached);
        for ns in s.stage_ns {
            self.write_u64(ns);
        }
        self.write_u64(s.total_ns);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedEvent {
    /// A [`MergeBeginEvent`].
    MergeBegin(MergeBeginEvent),
    /// A [`MergeEndEvent`].
    MergeEnd(MergeEndEvent),
    /// A [`StageBeginEvent`].
    StageBegin(StageBeginEvent),
    /// A [`StageEndEvent`].
    StageEnd(StageEndEvent),
    /// A [`LayerRenderedEvent`].
    LayerRendered(LayerRenderedEvent),
    /// An [`ExportEvent`].
    Export(ExportEvent),
    /// A [`MergeSummary`].
    MergeSummary(MergeSummary),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let end = self.pos.checked_add(N)?;
        let bytes = self.data.get(self.pos..end)?.try_into().ok()?;
        self.pos = end;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_bool(&mut self) -> Option<bool> {
        self.read_u8().map(|b| b != 0)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_stage(&mut self) -> Option<RenderStage> {
        RenderStage::from_index(usize::from(self.read_u8()?))
    }

    fn decode_merge_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::MergeBegin(MergeBeginEvent {
            canvas: self.read_u32()?,
            layer_count: self.read_u32()?,
            fast: self.read_bool()?,
            timestamp_ns: self.read_u64()?,
        }))
    }

    fn decode_merge_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::MergeEnd(MergeEndEvent {
            canvas: self.read_u32()?,
            timestamp_ns: self.read_u64()?,
        }))
    }

    fn decode_stage_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::StageBegin(StageBeginEvent {
            layer: self.read_u32()?,
            stage: self.read_stage()?,
            timestamp_ns: self.read_u64()?,
        }))
    }

    fn decode_stage_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::StageEnd(StageEndEvent {
            layer: self.read_u32()?,
            stage: self.read_stage()?,
            timestamp_ns: self.read_u64()?,
        }))
    }

    fn decode_layer_rendered(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::LayerRendered(LayerRenderedEvent {
            layer: self.read_u32()?,
            width: self.read_u32()?,
            height: self.read_u32()?,
            cached: self.read_bool()?,
        }))
    }

    fn decode_export(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Export(ExportEvent {
            width: self.read_u32()?,
            height: self.read_u32()?,
            bytes: self.read_u64()?,
            timestamp_ns: self.read_u64()?,
        }))
    }

    fn decode_merge_summary(&mut self) -> Option<RecordedEvent> {
        let canvas = self.read_u32()?;
        let layers_rendered = self.read_u32()?;
        let layers_cached = self.read_u32()?;
        let mut stage_ns = [0; RenderStage::COUNT];
        for ns in &mut stage_ns {
            *ns = self.read_u64()?;
        }
        Some(RecordedEvent::MergeSummary(MergeSummary {
            canvas,
            layers_rendered,
            layers_cached,
            stage_ns,
            total_ns: self.read_u64()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_MERGE_BEGIN => self.decode_merge_begin(),
            TAG_MERGE_END => self.decode_merge_end(),
            TAG_STAGE_BEGIN => self.decode_stage_begin(),
            TAG_STAGE_END => self.decode_stage_end(),
            TAG_LAYER_RENDERED => self.decode_layer_rendered(),
            TAG_EXPORT => self.decode_export(),
            TAG_MERGE_SUMMARY => self.decode_merge_summary(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_summary() -> MergeSummary {
        let mut stage_ns = [0; RenderStage::COUNT];
        stage_ns[RenderStage::Rasterize.index()] = 1_500;
        stage_ns[RenderStage::Composite.index()] = 400;
        MergeSummary {
            canvas: 2,
            layers_rendered: 3,
            layers_cached: 1,
            stage_ns,
            total_ns: 2_500,
        }
    }

    #[test]
    fn stage_events_decode_in_order() {
        let mut rec = RecorderSink::new();
        let begin = StageBeginEvent {
            layer: 4,
            stage: RenderStage::Mask,
            timestamp_ns: 2_000,
        };
        let end = StageEndEvent {
            layer: 4,
            stage: RenderStage::Mask,
            timestamp_ns: 3_000,
        };
        rec.on_stage_begin(&begin);
        rec.on_stage_end(&end);

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(
            events,
            [RecordedEvent::StageBegin(begin), RecordedEvent::StageEnd(end)]
        );
    }

    #[test]
    fn merge_with_summary() {
        let mut rec = RecorderSink::new();
        rec.on_merge_begin(&MergeBeginEvent {
            canvas: 2,
            layer_count: 4,
            fast: true,
            timestamp_ns: 100,
        });
        rec.on_layer_rendered(&LayerRenderedEvent {
            layer: 0,
            width: 400,
            height: 300,
            cached: true,
        });
        rec.on_merge_end(&MergeEndEvent {
            canvas: 2,
            timestamp_ns: 2_600,
        });
        rec.on_merge_summary(&sample_summary());

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 4);
        assert!(matches!(
            events[0],
            RecordedEvent::MergeBegin(MergeBeginEvent { fast: true, .. })
        ));
        match &events[1] {
            RecordedEvent::LayerRendered(e) => {
                assert_eq!((e.width, e.height), (400, 300));
                assert!(e.cached);
            }
            other => panic!("expected LayerRendered, got {other:?}"),
        }
        assert!(matches!(events[2], RecordedEvent::MergeEnd(_)));
        assert_eq!(events[3], RecordedEvent::MergeSummary(sample_summary()));
    }

    #[test]
    fn export_event() {
        let mut rec = RecorderSink::new();
        let orig = ExportEvent {
            width: 640,
            height: 480,
            bytes: 12_345,
            timestamp_ns: 9,
        };
        rec.on_export(&orig);
        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events, [RecordedEvent::Export(orig)]);
    }

    #[test]
    fn truncated_record_stops_decoding() {
        let mut rec = RecorderSink::new();
        rec.on_merge_end(&MergeEndEvent {
            canvas: 0,
            timestamp_ns: 1,
        });
        rec.on_export(&ExportEvent {
            width: 1,
            height: 1,
            bytes: 1,
            timestamp_ns: 1,
        });
        let bytes = rec.into_bytes();
        let events: Vec<_> = decode(&bytes[..bytes.len() - 3]).collect();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        let events: Vec<_> = decode(&[]).collect();
        assert!(events.is_empty());
    }

    #[test]
    fn unknown_tag_stops_decoding() {
        let events: Vec<_> = decode(&[0xff, 1, 2, 3]).collect();
        assert!(events.is_empty());
    }
}
