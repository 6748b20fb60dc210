// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Document model for non-destructive 2D layer compositing.
//!
//! `strata_core` provides the data structures for building stacks of image
//! layers that are transformed, masked, filtered and blended on demand. It is
//! `no_std` compatible (with `alloc`) and stores every layer and canvas in a
//! struct-of-arrays arena addressed by generational handles.
//!
//! # Architecture
//!
//! The crate is organized around an edit/flatten loop:
//!
//! ```text
//!   caller
//!     │  add_layer / translate / filter / mask ...
//!     ▼
//!   Document ──► evaluate() ──► DocumentChanges ──► render cache
//!     │
//!     └──────────► Renderer::merge()  (strata_render)
//!                        │
//!                        ▼
//!                  Image ──► add_image() (fed back as a layer)
//! ```
//!
//! **[`document`]**: The [`Document`](document::Document) arena: canvases,
//! layers, payload classification, mutators, bounds, lookup and copies.
//!
//! **[`dirty`]**: Dirty-tracking channels via `understory_dirty`. RENDER
//! propagates from mask and nested-canvas contents to the layers displaying
//! them; TOPOLOGY records structural changes per canvas.
//!
//! **[`filter`]**: Named-effect registry with parameter schemas and aliases.
//!
//! **[`geometry`]**, **[`transform`]**: Angle/distance helpers and the
//! projective transform used for corner distortion.
//!
//! **[`color`]**, **[`image`]**: Clamped RGBA colors and the straight-alpha
//! RGBA8 exchange raster.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! render-pipeline instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod color;
pub mod dirty;
pub mod document;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod image;
pub mod trace;
pub mod transform;

pub use error::{Error, Result};
