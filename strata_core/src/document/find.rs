// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer lookup by position or name.

use alloc::format;
use alloc::vec::Vec;

use super::id::{CanvasId, INVALID, LayerId};
use super::store::Document;
use crate::error::{Error, Result};

/// How [`Document::find`] selects a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerQuery<'a> {
    /// Position in the canvas, 0 being the back.
    Index(usize),
    /// First layer with this name, searching depth-first into masks and
    /// nested canvases.
    Name(&'a str),
}

impl From<usize> for LayerQuery<'_> {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

impl<'a> From<&'a str> for LayerQuery<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl Document {
    /// Finds a layer.
    ///
    /// Index queries only look at `canvas` itself. Name queries visit layers
    /// back to front; after each layer that does not match, its mask and
    /// then its nested canvas are searched before moving on.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when nothing matches.
    pub fn find<'a>(&self, canvas: CanvasId, query: impl Into<LayerQuery<'a>>) -> Result<LayerId> {
        self.validate_canvas(canvas);
        let query = query.into();
        let found = match query {
            LayerQuery::Index(i) => self.canvases[canvas.idx as usize].layers.get(i).copied(),
            LayerQuery::Name(name) => self.find_named(canvas.idx, name),
        };
        found.map(|idx| self.layer_id(idx)).ok_or_else(|| Error::NotFound {
            query: match query {
                LayerQuery::Index(i) => format!("#{i}"),
                LayerQuery::Name(n) => n.into(),
            },
        })
    }

    fn find_named(&self, canvas: u32, name: &str) -> Option<u32> {
        // Explicit stack; pushed in reverse so pops come back to front.
        let mut stack: Vec<u32> = self.canvases[canvas as usize]
            .layers
            .iter()
            .rev()
            .copied()
            .collect();
        let mut visited: Vec<u32> = Vec::new();
        while let Some(idx) = stack.pop() {
            if self.name[idx as usize].as_deref() == Some(name) {
                return Some(idx);
            }
            let mut children = Vec::new();
            let mask = self.mask[idx as usize];
            if mask != INVALID {
                children.push(mask);
            }
            if let Some(n) = self.payload[idx as usize].nested_canvas() {
                // Shared canvases are searched once.
                if !visited.contains(&n.idx) {
                    visited.push(n.idx);
                    children.push(n.idx);
                }
            }
            for c in children.into_iter().rev() {
                stack.extend(self.canvases[c as usize].layers.iter().rev().copied());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::LayerOptions;

    #[test]
    fn index_and_name_lookup() {
        let mut doc = Document::new();
        let c = doc.create_canvas(10, 10);
        let a = doc.add_fill(c, None, LayerOptions::new().named("a")).unwrap();
        let b = doc.add_fill(c, None, LayerOptions::new().named("b")).unwrap();
        assert_eq!(doc.find(c, 1_usize), Ok(b));
        assert_eq!(doc.find(c, "a"), Ok(a));
        assert_eq!(
            doc.find(c, 5_usize),
            Err(Error::NotFound { query: "#5".into() })
        );
        assert_eq!(
            doc.find(c, "zz"),
            Err(Error::NotFound { query: "zz".into() })
        );
    }

    #[test]
    fn names_are_found_inside_masks_and_nested_canvases() {
        let mut doc = Document::new();
        let top = doc.create_canvas(10, 10);
        let group = doc.create_canvas(10, 10);
        let host = doc.add_fill(top, None, LayerOptions::new()).unwrap();
        let m = doc.mask(host);
        let in_mask = doc.add_fill(m, None, LayerOptions::new().named("shape")).unwrap();
        doc.add_canvas(top, group, LayerOptions::new()).unwrap();
        let in_group = doc.add_fill(group, None, LayerOptions::new().named("deep")).unwrap();
        doc.add_fill(group, None, LayerOptions::new().named("shape")).unwrap();

        assert_eq!(doc.find(top, "deep"), Ok(in_group));
        // The mask of the earlier layer is searched first.
        assert_eq!(doc.find(top, "shape"), Ok(in_mask));
        // Index lookups do not recurse.
        assert!(doc.find(top, 2_usize).is_err());
    }
}
