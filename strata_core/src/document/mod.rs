// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer and canvas data model.
//!
//! A *canvas* is an ordered stack of layers plus a declared size. A *layer*
//! has:
//!
//! - An identity ([`LayerId`]): a generational handle that becomes stale
//!   when the layer is removed, preventing use-after-free bugs at the API
//!   level.
//! - A typed [`Payload`] it rasterizes from.
//! - [`Placement`] (position, origin, scale, rotation, flip, distortion,
//!   crop), [`Compositing`] (opacity, blend mode, visibility, shadow),
//!   [`Adjustments`] and [`Effects`].
//! - Optionally a mask canvas it owns exclusively, created on demand by
//!   [`Document::mask`].
//!
//! All layers and canvases live in one [`Document`] arena. Relations between
//! them (owner canvas, mask, nested payload canvas) are slot indices, never
//! references, so deep copies and removal are plain index bookkeeping.
//!
//! # Dirty tracking
//!
//! Property mutations mark the layer on the [`RENDER`](crate::dirty::RENDER)
//! channel with eager propagation: a layer that displays a canvas (as its
//! mask or nested payload) depends on every layer of that canvas, so editing
//! a mask stroke invalidates the masked layer too. Structural changes mark
//! the canvas on [`TOPOLOGY`](crate::dirty::TOPOLOGY).
//! [`Document::evaluate`] drains both and bumps per-layer revisions.

mod bounds;
mod build;
mod edit;
mod evaluate;
mod find;
mod id;
mod layer;
mod payload;
mod store;

pub use build::{LayerOptions, MAX_SPREAD};
pub use edit::EFFECT_RANGE;
pub use evaluate::DocumentChanges;
pub use find::LayerQuery;
pub use id::{CanvasId, INVALID, LayerId};
pub use layer::{
    Adjustments, Anchor, BlendMode, Compositing, Coord, Effects, Flip, Placement, Shadow,
};
pub use payload::{
    GradientStyle, ImageProbe, LayerSource, NoProbe, PathPayload, PathSource, Payload,
    PayloadKind,
};
pub use store::Document;
