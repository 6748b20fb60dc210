// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The [`Document`](crate::document::Document) uses multi-channel dirty
//! tracking (via [`understory_dirty`]) to decide which cached layer renders
//! are stale.
//!
//! # Propagation semantics
//!
//! - **Propagating**: [`RENDER`] uses
//!   [`EagerPolicy`](understory_dirty::EagerPolicy). Every layer that
//!   displays a canvas (as its mask or as a nested payload) depends on each
//!   layer inside that canvas, so editing a mask layer also marks the layer it
//!   masks, and so on up through arbitrarily deep nesting.
//!
//! - **Structural**: [`TOPOLOGY`] is marked on the canvas-owning side when
//!   layers are added, removed, or reordered. It does not propagate.
//!
//! # Consumption
//!
//! [`Document::evaluate`](crate::document::Document::evaluate) drains both
//! channels, bumps the revision of every affected layer, and reports the
//! result as [`DocumentChanges`](crate::document::DocumentChanges).

use understory_dirty::Channel;

/// Anything affecting a layer's rendered pixels changed.
pub const RENDER: Channel = Channel::new(0);

/// Layer order or membership of a canvas changed.
pub const TOPOLOGY: Channel = Channel::new(1);
