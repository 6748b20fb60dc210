// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fast-path cache of canvas-cropped layer rasters.
//!
//! Entries are keyed by layer slot and validated against the layer's
//! generation and revision, plus the canvas size the raster was cropped to.
//! A stale entry is never returned; it is simply overwritten on the next
//! insert. [`RenderCache::evict`] drops entries reported as changed by
//! [`Document::evaluate`](strata_core::document::Document::evaluate).

use std::collections::HashMap;

use strata_core::document::DocumentChanges;

/// What a cached raster was rendered from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    pub(crate) generation: u32,
    pub(crate) revision: u64,
    pub(crate) canvas_size: (u32, u32),
}

/// A layer's canvas-sized raster and, if it casts one, its shadow.
#[derive(Clone, Debug)]
pub(crate) struct CachedLayer<R> {
    pub(crate) raster: R,
    pub(crate) shadow: Option<R>,
}

#[derive(Clone, Debug)]
struct Entry<R> {
    key: CacheKey,
    layer: CachedLayer<R>,
}

/// Per-layer raster cache used by fast merges.
#[derive(Clone, Debug)]
pub struct RenderCache<R> {
    entries: HashMap<u32, Entry<R>>,
    hits: u64,
    misses: u64,
}

impl<R> Default for RenderCache<R> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }
}

impl<R> RenderCache<R> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookups served since creation.
    #[must_use]
    pub const fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that had to render since creation.
    #[must_use]
    pub const fn misses(&self) -> u64 {
        self.misses
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drops entries for invalidated and removed layers.
    pub fn evict(&mut self, changes: &DocumentChanges) {
        for idx in changes.invalidated.iter().chain(&changes.removed) {
            self.entries.remove(idx);
        }
    }

    pub(crate) fn get(&mut self, slot: u32, key: CacheKey) -> Option<&CachedLayer<R>> {
        match self.entries.get(&slot) {
            Some(e) if e.key == key => {
                self.hits += 1;
                Some(&e.layer)
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    pub(crate) fn insert(&mut self, slot: u32, key: CacheKey, layer: CachedLayer<R>) {
        self.entries.insert(slot, Entry { key, layer });
    }
}
