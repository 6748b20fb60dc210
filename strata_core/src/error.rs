// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error taxonomy shared by the document model and renderers.
//!
//! Only conditions a caller can react to are errors. Numeric inputs are
//! clamped rather than rejected, and stale handles are programming errors that
//! panic.

use alloc::string::String;

/// Errors surfaced by document construction, lookups, and rendering.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Layer construction could not classify its source against the known
    /// payload kinds.
    #[error("unrecognized layer payload: {reason}")]
    UnrecognizedPayload {
        /// What went wrong while classifying.
        reason: String,
    },

    /// A canvas would directly or indirectly contain itself.
    #[error("a canvas cannot contain itself as a nested layer")]
    CanvasInCanvasRecursion,

    /// The filter name is neither a registered canonical name nor an alias.
    #[error("unknown filter `{name}`")]
    UnknownFilter {
        /// The name as given by the caller.
        name: String,
    },

    /// A layer lookup by name or index found nothing.
    #[error("no layer matches `{query}`")]
    NotFound {
        /// The query, formatted for display.
        query: String,
    },

    /// A backend capability failed. No partial output is produced.
    #[error("render backend failed in `{operation}`: {message}")]
    RenderBackend {
        /// Name of the failing capability (for example `rasterize`).
        operation: &'static str,
        /// Backend-specific detail.
        message: String,
    },
}

/// Shorthand for results carrying [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;
