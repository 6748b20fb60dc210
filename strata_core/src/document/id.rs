// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer and canvas identity types.

use core::fmt;

/// Sentinel value indicating "no layer" or "no canvas" in index fields.
pub const INVALID: u32 = u32::MAX;

/// A handle to a layer in a [`Document`](super::Document).
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after a layer is removed and the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId {
    /// Slot index into the document's layer arrays.
    pub(crate) idx: u32,
    /// Generation counter; must match the document's generation for this slot.
    pub(crate) generation: u32,
}

impl LayerId {
    /// Returns the raw slot index (for diagnostics and trace events).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerId({}@gen{})", self.idx, self.generation)
    }
}

/// A handle to a canvas in a [`Document`](super::Document).
///
/// Canvases are the top-level compositions a caller creates, the masks owned
/// by layers, and the compositions nested inside layers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanvasId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl CanvasId {
    /// Returns the raw slot index (for diagnostics and trace events).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for CanvasId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanvasId({}@gen{})", self.idx, self.generation)
    }
}
