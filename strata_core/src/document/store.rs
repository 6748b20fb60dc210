// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays document storage with allocation, ownership, and
//! structural operations.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::id::{CanvasId, INVALID, LayerId};
use super::layer::{Adjustments, Compositing, Effects, Placement};
use super::payload::{ImageProbe, NoProbe, Payload};
use crate::color::Color;
use crate::dirty;

/// One canvas slot.
#[derive(Clone, Debug)]
pub(crate) struct CanvasSlot {
    pub(crate) width: u32,
    pub(crate) height: u32,
    /// Layer slots, back to front.
    pub(crate) layers: Vec<u32>,
    /// The layer owning this canvas as its mask, or [`INVALID`].
    pub(crate) parent: u32,
    /// Layers whose raster depends on this canvas (mask owner and nested
    /// payload holders).
    pub(crate) users: Vec<u32>,
}

impl CanvasSlot {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            layers: Vec::new(),
            parent: INVALID,
            users: Vec::new(),
        }
    }
}

/// Struct-of-arrays storage for every layer and canvas of a composition.
///
/// Layers and canvases are addressed by [`LayerId`] and [`CanvasId`]
/// handles. Destroyed slots are recycled via free lists, and generation
/// counters prevent stale handle access.
///
/// Every layer belongs to exactly one canvas. A layer may additionally own a
/// mask canvas, and may display another canvas as its payload; both
/// relations are expressed as slot indices.
pub struct Document {
    // -- Layer properties --
    pub(crate) payload: Vec<Payload>,
    pub(crate) placement: Vec<Placement>,
    pub(crate) compositing: Vec<Compositing>,
    pub(crate) adjustments: Vec<Adjustments>,
    pub(crate) effects: Vec<Effects>,
    pub(crate) name: Vec<Option<String>>,

    // -- Layer ownership --
    pub(crate) owner: Vec<u32>,
    pub(crate) mask: Vec<u32>,

    // -- Layer allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) revision: Vec<u64>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Canvases --
    pub(crate) canvases: Vec<CanvasSlot>,
    pub(crate) canvas_generation: Vec<u32>,
    pub(crate) canvas_free: Vec<u32>,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,
    pub(crate) canvas_dirty: DirtyTracker<u32>,
    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,
    pub(crate) pending: bool,

    pub(crate) probe: Box<dyn ImageProbe>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("layers", &(self.len as usize - self.free_list.len()))
            .field(
                "canvases",
                &(self.canvases.len() - self.canvas_free.len()),
            )
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty document.
    ///
    /// Image files and encoded bytes cannot be classified until a probe is
    /// installed with [`set_image_probe`](Self::set_image_probe).
    #[must_use]
    pub fn new() -> Self {
        Self {
            payload: Vec::new(),
            placement: Vec::new(),
            compositing: Vec::new(),
            adjustments: Vec::new(),
            effects: Vec::new(),
            name: Vec::new(),
            owner: Vec::new(),
            mask: Vec::new(),
            generation: Vec::new(),
            revision: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            canvases: Vec::new(),
            canvas_generation: Vec::new(),
            canvas_free: Vec::new(),
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            canvas_dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
            pending: false,
            probe: Box::new(NoProbe),
        }
    }

    /// Installs the capability used to size image files and encoded bytes.
    pub fn set_image_probe(&mut self, probe: impl ImageProbe + 'static) {
        self.probe = Box::new(probe);
    }

    // -- Canvas allocation API --

    /// Creates an empty top-level canvas.
    pub fn create_canvas(&mut self, width: u32, height: u32) -> CanvasId {
        let idx = self.alloc_canvas(width, height);
        self.canvas_id(idx)
    }

    /// Destroys a canvas and every layer in it (including their masks).
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale, or if the canvas is still displayed by
    /// a layer (as its mask or nested payload).
    pub fn destroy_canvas(&mut self, id: CanvasId) {
        self.validate_canvas(id);
        assert!(
            self.canvases[id.idx as usize].users.is_empty(),
            "cannot destroy a canvas that is still displayed by a layer"
        );
        self.release_canvas(id.idx);
    }

    /// Returns whether the given handle refers to a live canvas.
    #[must_use]
    pub fn is_canvas_alive(&self, id: CanvasId) -> bool {
        (id.idx as usize) < self.canvases.len()
            && self.canvas_generation[id.idx as usize] == id.generation
            && !self.canvas_free.contains(&id.idx)
    }

    /// Returns the declared size of a canvas.
    #[must_use]
    pub fn canvas_size(&self, id: CanvasId) -> (u32, u32) {
        self.validate_canvas(id);
        let c = &self.canvases[id.idx as usize];
        (c.width, c.height)
    }

    /// Resizes a canvas.
    ///
    /// Every layer in it, and every layer displaying it, is invalidated.
    pub fn set_canvas_size(&mut self, id: CanvasId, width: u32, height: u32) {
        self.validate_canvas(id);
        let c = &mut self.canvases[id.idx as usize];
        c.width = width;
        c.height = height;
        let layers = c.layers.clone();
        let users = c.users.clone();
        for idx in layers.into_iter().chain(users) {
            self.touch(idx);
        }
        self.canvas_dirty.mark(id.idx, dirty::TOPOLOGY);
    }

    /// Returns the layers of a canvas, back to front.
    pub fn layers(&self, id: CanvasId) -> impl ExactSizeIterator<Item = LayerId> + '_ {
        self.validate_canvas(id);
        self.canvases[id.idx as usize]
            .layers
            .iter()
            .map(|&idx| self.layer_id(idx))
    }

    /// Returns the number of layers in a canvas.
    #[must_use]
    pub fn len(&self, id: CanvasId) -> usize {
        self.validate_canvas(id);
        self.canvases[id.idx as usize].layers.len()
    }

    /// Returns whether a canvas has no layers.
    #[must_use]
    pub fn is_empty(&self, id: CanvasId) -> bool {
        self.len(id) == 0
    }

    /// Returns the layer owning a mask canvas.
    ///
    /// Top-level and nested canvases have no parent layer.
    #[must_use]
    pub fn parent_layer(&self, id: CanvasId) -> Option<LayerId> {
        self.validate_canvas(id);
        let p = self.canvases[id.idx as usize].parent;
        (p != INVALID).then(|| self.layer_id(p))
    }

    /// Returns whether a canvas is some layer's mask.
    #[must_use]
    pub fn is_mask(&self, id: CanvasId) -> bool {
        self.parent_layer(id).is_some()
    }

    /// Default paint for fills and paths added to `id`: black, or white when
    /// the canvas is a mask (so that new mask content reveals the layer).
    #[must_use]
    pub fn default_fill(&self, id: CanvasId) -> Color {
        if self.is_mask(id) {
            Color::WHITE
        } else {
            Color::BLACK
        }
    }

    // -- Layer lifecycle API --

    /// Returns whether the given handle refers to a live layer.
    #[must_use]
    pub fn is_alive(&self, id: LayerId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    /// Returns the live layer in slot `idx`, if any.
    ///
    /// Slot indices appear in [`DocumentChanges`](super::DocumentChanges) and
    /// trace events.
    #[must_use]
    pub fn layer_at(&self, idx: u32) -> Option<LayerId> {
        (idx < self.len && !self.free_list.contains(&idx)).then(|| self.layer_id(idx))
    }

    /// Removes a layer from its canvas and destroys it, together with its
    /// mask.
    pub fn remove_layer(&mut self, id: LayerId) {
        self.validate(id);
        self.release_layer(id.idx);
    }

    /// Returns the canvas a layer belongs to.
    #[must_use]
    pub fn canvas_of(&self, id: LayerId) -> CanvasId {
        self.validate(id);
        self.canvas_id(self.owner[id.idx as usize])
    }

    /// Returns a layer's position in its canvas (0 is the back).
    #[must_use]
    pub fn index_of(&self, id: LayerId) -> usize {
        self.validate(id);
        let owner = self.owner[id.idx as usize];
        self.position(owner, id.idx)
    }

    /// Returns the layer's mask canvas, creating an empty one on first use.
    ///
    /// A new mask is sized to the layer's base box. Fills and paths added to
    /// it default to white.
    pub fn mask(&mut self, id: LayerId) -> CanvasId {
        self.validate(id);
        let existing = self.mask[id.idx as usize];
        if existing != INVALID {
            return self.canvas_id(existing);
        }
        let p = &self.placement[id.idx as usize];
        let (w, h) = (to_extent(p.width), to_extent(p.height));
        let c = self.alloc_canvas(w, h);
        self.canvases[c as usize].parent = id.idx;
        self.attach_user(id.idx, c);
        self.mask[id.idx as usize] = c;
        self.canvas_id(c)
    }

    /// Returns the layer's mask canvas, if one was created.
    #[must_use]
    pub fn mask_of(&self, id: LayerId) -> Option<CanvasId> {
        self.validate(id);
        let m = self.mask[id.idx as usize];
        (m != INVALID).then(|| self.canvas_id(m))
    }

    /// Returns the revision counter of a layer.
    ///
    /// The counter increases whenever [`evaluate`](Self::evaluate) finds the
    /// layer's rendered output invalidated, including through its mask or a
    /// nested canvas.
    #[must_use]
    pub fn revision(&self, id: LayerId) -> u64 {
        self.validate(id);
        self.revision[id.idx as usize]
    }

    /// Whether mutations happened since the last
    /// [`evaluate`](Self::evaluate).
    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        self.pending
    }

    // -- Copy API --

    /// Deep-copies a canvas into a new top-level canvas.
    ///
    /// Every layer and every mask is copied with a fresh identity. Nested
    /// canvases referenced as payloads are shared, like any other canvas a
    /// caller owns.
    pub fn copy_canvas(&mut self, id: CanvasId) -> CanvasId {
        self.validate_canvas(id);
        let idx = self.copy_canvas_slot(id.idx);
        self.canvas_id(idx)
    }

    /// Deep-copies a layer (and its mask) to the top of `target`.
    ///
    /// Fails with [`CanvasInCanvasRecursion`] when the layer displays
    /// `target`, through its nested payload or its mask, at any depth.
    ///
    /// [`CanvasInCanvasRecursion`]: crate::error::Error::CanvasInCanvasRecursion
    pub fn copy_layer(&mut self, id: LayerId, target: CanvasId) -> crate::Result<LayerId> {
        self.validate(id);
        self.validate_canvas(target);
        if self.layer_reaches(id.idx, target.idx) {
            return Err(crate::Error::CanvasInCanvasRecursion);
        }
        let idx = self.copy_layer_slot(id.idx, target.idx, None);
        Ok(self.layer_id(idx))
    }

    /// Deep-copies a layer and inserts the copy directly above it.
    pub fn duplicate(&mut self, id: LayerId) -> LayerId {
        self.validate(id);
        let owner = self.owner[id.idx as usize];
        let at = self.position(owner, id.idx) + 1;
        let idx = self.copy_layer_slot(id.idx, owner, Some(at));
        self.layer_id(idx)
    }

    // -- Arrangement API --

    /// Moves a layer one step towards the front.
    pub fn arrange_up(&mut self, id: LayerId) {
        self.validate(id);
        let owner = self.owner[id.idx as usize];
        let at = self.position(owner, id.idx);
        self.move_layer(id.idx, at + 1);
    }

    /// Moves a layer one step towards the back.
    pub fn arrange_down(&mut self, id: LayerId) {
        self.validate(id);
        let owner = self.owner[id.idx as usize];
        let at = self.position(owner, id.idx);
        self.move_layer(id.idx, at.saturating_sub(1));
    }

    /// Moves a layer to the front of its canvas.
    pub fn arrange_front(&mut self, id: LayerId) {
        self.validate(id);
        self.move_layer(id.idx, usize::MAX);
    }

    /// Moves a layer to the back of its canvas.
    pub fn arrange_back(&mut self, id: LayerId) {
        self.validate(id);
        self.move_layer(id.idx, 0);
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: LayerId) {
        assert!(
            id.idx < self.len
                && self.generation[id.idx as usize] == id.generation
                && !self.free_list.contains(&id.idx),
            "stale LayerId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Panics if the handle is stale.
    pub(crate) fn validate_canvas(&self, id: CanvasId) {
        assert!(
            self.is_canvas_alive(id),
            "stale CanvasId: {id:?} (current gen: {})",
            self.canvas_generation
                .get(id.idx as usize)
                .copied()
                .unwrap_or(u32::MAX)
        );
    }

    pub(crate) fn layer_id(&self, idx: u32) -> LayerId {
        LayerId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    pub(crate) fn canvas_id(&self, idx: u32) -> CanvasId {
        CanvasId {
            idx,
            generation: self.canvas_generation[idx as usize],
        }
    }

    /// Marks a layer's rendered output stale, propagating to every layer that
    /// displays it.
    pub(crate) fn touch(&mut self, idx: u32) {
        self.dirty.mark_with(idx, dirty::RENDER, &EagerPolicy);
        self.pending = true;
    }

    fn position(&self, canvas: u32, idx: u32) -> usize {
        self.canvases[canvas as usize]
            .layers
            .iter()
            .position(|&l| l == idx)
            .unwrap_or(0)
    }

    fn alloc_canvas(&mut self, width: u32, height: u32) -> u32 {
        let idx = if let Some(idx) = self.canvas_free.pop() {
            self.canvas_generation[idx as usize] += 1;
            self.canvases[idx as usize] = CanvasSlot::new(width, height);
            idx
        } else {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "canvas count is bounded far below u32::MAX"
            )]
            let idx = self.canvases.len() as u32;
            self.canvases.push(CanvasSlot::new(width, height));
            self.canvas_generation.push(0);
            idx
        };
        self.canvas_dirty.mark(idx, dirty::TOPOLOGY);
        self.pending = true;
        idx
    }

    /// Allocates a layer slot and links it into `canvas` at `at` (or on top).
    pub(crate) fn alloc_layer(
        &mut self,
        canvas: u32,
        at: Option<usize>,
        payload: Payload,
        placement: Placement,
    ) -> u32 {
        let nested = payload.nested_canvas();
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            self.generation[idx as usize] += 1;
            self.payload[idx as usize] = payload;
            self.placement[idx as usize] = placement;
            self.compositing[idx as usize] = Compositing::default();
            self.adjustments[idx as usize] = Adjustments::default();
            self.effects[idx as usize] = Effects::default();
            self.name[idx as usize] = None;
            self.owner[idx as usize] = canvas;
            self.mask[idx as usize] = INVALID;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.payload.push(payload);
            self.placement.push(placement);
            self.compositing.push(Compositing::default());
            self.adjustments.push(Adjustments::default());
            self.effects.push(Effects::default());
            self.name.push(None);
            self.owner.push(canvas);
            self.mask.push(INVALID);
            self.generation.push(0);
            self.revision.push(0);
            idx
        };

        let c = &mut self.canvases[canvas as usize];
        match at {
            Some(at) if at < c.layers.len() => c.layers.insert(at, idx),
            _ => c.layers.push(idx),
        }
        // Everyone displaying the canvas now depends on the new layer.
        for user in c.users.clone() {
            let _ = self.dirty.add_dependency(user, idx, dirty::RENDER);
        }
        if let Some(n) = nested {
            self.attach_user(idx, n.idx);
        }

        self.pending_added.push(idx);
        self.canvas_dirty.mark(canvas, dirty::TOPOLOGY);
        self.touch(idx);
        idx
    }

    /// Unlinks and frees a layer slot, releasing its mask.
    fn release_layer(&mut self, idx: u32) {
        // Invalidate displaying layers while the edges still exist.
        self.touch(idx);

        let owner = self.owner[idx as usize];
        self.canvases[owner as usize].layers.retain(|&l| l != idx);
        self.canvas_dirty.mark(owner, dirty::TOPOLOGY);

        let mask = self.mask[idx as usize];
        if mask != INVALID {
            self.detach_user(idx, mask);
            self.release_canvas(mask);
        }
        if let Some(n) = self.payload[idx as usize].nested_canvas() {
            self.detach_user(idx, n.idx);
        }

        self.dirty.remove_key(idx);

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;
        self.payload[idx as usize] = Payload::Fill(Color::TRANSPARENT);
        self.name[idx as usize] = None;
        self.mask[idx as usize] = INVALID;
        self.owner[idx as usize] = INVALID;

        self.free_list.push(idx);
        self.pending_removed.push(idx);
    }

    /// Releases every layer of a canvas, then frees the canvas slot.
    fn release_canvas(&mut self, idx: u32) {
        let layers = self.canvases[idx as usize].layers.clone();
        for l in layers.into_iter().rev() {
            self.release_layer(l);
        }
        self.canvas_dirty.remove_key(idx);
        self.canvas_generation[idx as usize] += 1;
        self.canvases[idx as usize] = CanvasSlot::new(0, 0);
        self.canvas_free.push(idx);
        self.pending = true;
    }

    /// Records that `user` displays `canvas`.
    fn attach_user(&mut self, user: u32, canvas: u32) {
        let c = &mut self.canvases[canvas as usize];
        c.users.push(user);
        for l in c.layers.clone() {
            let _ = self.dirty.add_dependency(user, l, dirty::RENDER);
        }
    }

    fn detach_user(&mut self, user: u32, canvas: u32) {
        let c = &mut self.canvases[canvas as usize];
        c.users.retain(|&u| u != user);
        for l in c.layers.clone() {
            self.dirty.remove_dependency(user, l, dirty::RENDER);
        }
    }

    /// Whether `target` is `from` or is reachable from it through nested
    /// payloads or masks.
    pub(crate) fn reaches(&self, from: u32, target: u32) -> bool {
        let mut stack = alloc::vec![from];
        let mut seen = Vec::new();
        while let Some(c) = stack.pop() {
            if c == target {
                return true;
            }
            if seen.contains(&c) {
                continue;
            }
            seen.push(c);
            for &l in &self.canvases[c as usize].layers {
                if let Some(n) = self.payload[l as usize].nested_canvas() {
                    stack.push(n.idx);
                }
                if self.mask[l as usize] != INVALID {
                    stack.push(self.mask[l as usize]);
                }
            }
        }
        false
    }

    /// Whether `target` is displayed by layer `idx`, through its nested
    /// payload or its mask.
    fn layer_reaches(&self, idx: u32, target: u32) -> bool {
        let nested = self.payload[idx as usize].nested_canvas().map(|n| n.idx);
        let mask = Some(self.mask[idx as usize]).filter(|&m| m != INVALID);
        nested
            .into_iter()
            .chain(mask)
            .any(|c| self.reaches(c, target))
    }

    fn copy_canvas_slot(&mut self, src: u32) -> u32 {
        let (w, h) = {
            let c = &self.canvases[src as usize];
            (c.width, c.height)
        };
        let dst = self.alloc_canvas(w, h);
        for l in self.canvases[src as usize].layers.clone() {
            self.copy_layer_slot(l, dst, None);
        }
        dst
    }

    pub(crate) fn copy_layer_slot(&mut self, src: u32, canvas: u32, at: Option<usize>) -> u32 {
        let s = src as usize;
        let (payload, placement) = (self.payload[s].clone(), self.placement[s].clone());
        let idx = self.alloc_layer(canvas, at, payload, placement);
        let d = idx as usize;
        self.compositing[d] = self.compositing[s];
        self.adjustments[d] = self.adjustments[s];
        self.effects[d] = self.effects[s].clone();
        self.name[d] = self.name[s].clone();

        let src_mask = self.mask[s];
        if src_mask != INVALID {
            let m = self.copy_canvas_slot(src_mask);
            self.canvases[m as usize].parent = idx;
            self.attach_user(idx, m);
            self.mask[d] = m;
        }
        idx
    }

    /// Moves a layer to position `at` (clamped) within its canvas.
    fn move_layer(&mut self, idx: u32, at: usize) {
        let owner = self.owner[idx as usize];
        let layers = &mut self.canvases[owner as usize].layers;
        let from = layers.iter().position(|&l| l == idx).unwrap_or(0);
        let to = at.min(layers.len() - 1);
        if from == to {
            return;
        }
        let l = layers.remove(from);
        layers.insert(to, l);
        for user in self.canvases[owner as usize].users.clone() {
            self.touch(user);
        }
        self.canvas_dirty.mark(owner, dirty::TOPOLOGY);
        self.pending = true;
    }
}

/// Rounds a layer extent to a canvas extent.
fn to_extent(v: f64) -> u32 {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "clamped to the u32 range first"
    )]
    let e = v.round().clamp(0.0, f64::from(u32::MAX)) as u32;
    e
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::LayerOptions;

    fn fill(doc: &mut Document, c: CanvasId) -> LayerId {
        doc.add_fill(c, None, LayerOptions::default()).unwrap()
    }

    #[test]
    fn create_and_remove() {
        let mut doc = Document::new();
        let c = doc.create_canvas(100, 100);
        let id = fill(&mut doc, c);
        assert!(doc.is_alive(id));
        assert_eq!(doc.canvas_of(id), c);
        doc.remove_layer(id);
        assert!(!doc.is_alive(id));
        assert!(doc.is_empty(c));
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut doc = Document::new();
        let c = doc.create_canvas(10, 10);
        let id1 = fill(&mut doc, c);
        doc.remove_layer(id1);
        let id2 = fill(&mut doc, c);
        assert!(!doc.is_alive(id1));
        assert!(doc.is_alive(id2));
        assert_eq!(id1.index(), id2.index());
        assert_ne!(id1.generation(), id2.generation());
    }

    #[test]
    #[should_panic(expected = "stale LayerId")]
    fn removed_handle_panics() {
        let mut doc = Document::new();
        let c = doc.create_canvas(10, 10);
        let id = fill(&mut doc, c);
        doc.remove_layer(id);
        let _ = doc.index_of(id);
    }

    #[test]
    #[should_panic(expected = "stale CanvasId")]
    fn destroyed_canvas_panics() {
        let mut doc = Document::new();
        let c = doc.create_canvas(10, 10);
        doc.destroy_canvas(c);
        let _ = doc.canvas_size(c);
    }

    #[test]
    #[should_panic(expected = "still displayed")]
    fn destroying_a_displayed_canvas_panics() {
        let mut doc = Document::new();
        let outer = doc.create_canvas(10, 10);
        let inner = doc.create_canvas(10, 10);
        doc.add_canvas(outer, inner, LayerOptions::default()).unwrap();
        doc.destroy_canvas(inner);
    }

    #[test]
    fn destroying_a_canvas_releases_layers_and_masks() {
        let mut doc = Document::new();
        let c = doc.create_canvas(10, 10);
        let id = fill(&mut doc, c);
        let m = doc.mask(id);
        let inside = fill(&mut doc, m);
        doc.destroy_canvas(c);
        assert!(!doc.is_alive(id));
        assert!(!doc.is_alive(inside));
        assert!(!doc.is_canvas_alive(m));
    }

    #[test]
    fn arrange_reorders_within_canvas() {
        let mut doc = Document::new();
        let c = doc.create_canvas(10, 10);
        let a = fill(&mut doc, c);
        let b = fill(&mut doc, c);
        let d = fill(&mut doc, c);

        doc.arrange_front(a);
        assert_eq!(doc.layers(c).collect::<Vec<_>>(), [b, d, a]);
        doc.arrange_back(d);
        assert_eq!(doc.layers(c).collect::<Vec<_>>(), [d, b, a]);
        doc.arrange_up(d);
        assert_eq!(doc.index_of(d), 1);
        doc.arrange_down(d);
        doc.arrange_down(d);
        assert_eq!(doc.index_of(d), 0);
        doc.arrange_up(a);
        assert_eq!(doc.index_of(a), 2);
    }

    #[test]
    fn mask_is_lazy_sized_and_back_referenced() {
        let mut doc = Document::new();
        let c = doc.create_canvas(200, 100);
        let id = doc
            .add_fill(c, None, LayerOptions::new().size(60.0, 40.0))
            .unwrap();
        assert_eq!(doc.mask_of(id), None);
        let m = doc.mask(id);
        assert_eq!(doc.mask(id), m);
        assert_eq!(doc.canvas_size(m), (60, 40));
        assert_eq!(doc.parent_layer(m), Some(id));
        assert_eq!(doc.default_fill(m), Color::WHITE);
        assert_eq!(doc.default_fill(c), Color::BLACK);
    }

    #[test]
    fn copy_canvas_is_deep() {
        let mut doc = Document::new();
        let c = doc.create_canvas(50, 50);
        let id = fill(&mut doc, c);
        let m = doc.mask(id);
        let masked = fill(&mut doc, m);

        let copy = doc.copy_canvas(c);
        let copied: Vec<_> = doc.layers(copy).collect();
        assert_eq!(copied.len(), 1);
        assert_ne!(copied[0], id);
        let copied_mask = doc.mask_of(copied[0]).unwrap();
        assert_ne!(copied_mask, m);
        assert_eq!(doc.parent_layer(copied_mask), Some(copied[0]));

        doc.set_opacity(copied[0], 0.25);
        let inner = doc.layers(copied_mask).next().unwrap();
        doc.rotate(inner, 45.0);
        assert_eq!(doc.compositing(id).opacity, 1.0);
        assert_eq!(doc.placement(masked).rotation, 0.0);
    }

    #[test]
    fn duplicate_lands_above_source() {
        let mut doc = Document::new();
        let c = doc.create_canvas(10, 10);
        let a = fill(&mut doc, c);
        let b = fill(&mut doc, c);
        doc.set_name(a, "base");
        let dup = doc.duplicate(a);
        assert_eq!(doc.layers(c).collect::<Vec<_>>(), [a, dup, b]);
        assert_eq!(doc.name(dup), Some("base"));
    }

    #[test]
    fn mask_edits_invalidate_the_owner() {
        let mut doc = Document::new();
        let c = doc.create_canvas(10, 10);
        let id = fill(&mut doc, c);
        let m = doc.mask(id);
        let inside = fill(&mut doc, m);
        let _ = doc.evaluate();
        let before = doc.revision(id);

        doc.set_opacity(inside, 0.5);
        let changes = doc.evaluate();
        assert!(changes.invalidated.contains(&inside.index()));
        assert!(changes.invalidated.contains(&id.index()));
        assert!(doc.revision(id) > before);
    }

    #[test]
    fn nested_edits_propagate_through_levels() {
        let mut doc = Document::new();
        let top = doc.create_canvas(10, 10);
        let mid = doc.create_canvas(10, 10);
        let leaf = doc.create_canvas(10, 10);
        let holder = doc.add_canvas(top, mid, LayerOptions::default()).unwrap();
        let inner_holder = doc.add_canvas(mid, leaf, LayerOptions::default()).unwrap();
        let deep = fill(&mut doc, leaf);
        let _ = doc.evaluate();
        assert!(!doc.has_pending_changes());

        doc.hide(deep);
        assert!(doc.has_pending_changes());
        let changes = doc.evaluate();
        for l in [deep, inner_holder, holder] {
            assert!(changes.invalidated.contains(&l.index()), "{l:?}");
        }
    }

    #[test]
    fn structural_changes_report_topology() {
        let mut doc = Document::new();
        let outer = doc.create_canvas(10, 10);
        let inner = doc.create_canvas(10, 10);
        let holder = doc.add_canvas(outer, inner, LayerOptions::default()).unwrap();
        let _ = doc.evaluate();

        let a = fill(&mut doc, inner);
        let changes = doc.evaluate();
        assert!(changes.topology.contains(&inner.index()));
        assert!(changes.added.contains(&a.index()));
        assert!(changes.invalidated.contains(&holder.index()));

        doc.remove_layer(a);
        let changes = doc.evaluate();
        assert!(changes.removed.contains(&a.index()));
        assert!(changes.invalidated.contains(&holder.index()));
    }
}
