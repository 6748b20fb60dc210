// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change collection.
//!
//! Evaluation drains both dirty channels:
//!
//! 1. **RENDER**: every layer whose raster is stale, including layers that
//!    display an edited mask or nested canvas. Each gets its revision bumped
//!    so render caches keyed on `(generation, revision)` miss.
//! 2. **TOPOLOGY**: canvases whose membership or order changed.
//!
//! [`DocumentChanges`] uses raw slot indices, like trace events, so that
//! consumers can index their own side tables without generation checks.

use alloc::vec::Vec;

use super::store::Document;
use crate::dirty;

/// The set of changes produced by a single [`Document::evaluate`] call.
#[derive(Clone, Debug, Default)]
pub struct DocumentChanges {
    /// Layers whose rendered output is stale.
    pub invalidated: Vec<u32>,
    /// Canvases whose layer list changed (or that were resized).
    pub topology: Vec<u32>,
    /// Layers added since the last evaluate.
    pub added: Vec<u32>,
    /// Layers removed since the last evaluate.
    pub removed: Vec<u32>,
}

impl DocumentChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.invalidated.clear();
        self.topology.clear();
        self.added.clear();
        self.removed.clear();
    }

    /// Whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.invalidated.is_empty()
            && self.topology.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
    }
}

impl Document {
    /// Drains pending invalidations and returns what changed.
    pub fn evaluate(&mut self) -> DocumentChanges {
        let mut changes = DocumentChanges::default();
        self.evaluate_into(&mut changes);
        changes
    }

    /// Like [`evaluate`](Self::evaluate), but reuses a caller-provided buffer
    /// to avoid allocation.
    pub fn evaluate_into(&mut self, changes: &mut DocumentChanges) {
        changes.clear();

        changes.invalidated = self
            .dirty
            .drain(dirty::RENDER)
            .affected()
            .deterministic()
            .run()
            .collect();
        changes
            .invalidated
            .retain(|&idx| idx < self.len && !self.free_list.contains(&idx));
        for &idx in &changes.invalidated {
            self.revision[idx as usize] += 1;
        }

        changes.topology = self
            .canvas_dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .collect();

        core::mem::swap(&mut self.pending_added, &mut changes.added);
        core::mem::swap(&mut self.pending_removed, &mut changes.removed);
        self.pending = false;
    }
}
