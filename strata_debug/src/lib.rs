// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, Chrome trace export and overlay capture for
//! strata diagnostics.
//!
//! This crate provides [`TraceSink`](strata_core::trace::TraceSink)
//! implementations for development and post-mortem analysis of renders:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`]: writes Chrome Trace Event Format JSON from recorded
//!   bytes.
//!
//! It also provides [`overlay::OverlayRecorder`], a
//! [`DebugOverlay`](strata_render::DebugOverlay) that keeps the commands a
//! merge emits and serializes them to JSON for an external viewer.

pub mod chrome;
pub mod overlay;
pub mod pretty;
pub mod recorder;
