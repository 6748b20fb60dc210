// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer payloads and the sources they are built from.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use kurbo::{BezPath, Rect, Shape as _};

use super::id::{CanvasId, LayerId};
use crate::color::Color;
use crate::image::Image;

/// The nine payload kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    /// An image file on disk.
    File,
    /// A solid color.
    Fill,
    /// A vertical two-color gradient.
    LinearGradient,
    /// A two-color gradient from the center outwards.
    RadialGradient,
    /// A vector path.
    Path,
    /// A list of colors laid out in rows.
    Pixels,
    /// Another canvas, merged on demand.
    Canvas,
    /// An already-rendered raster.
    Rendered,
    /// Raw encoded image bytes.
    Encoded,
}

/// A vector path with its paint.
#[derive(Clone, Debug, PartialEq)]
pub struct PathPayload {
    /// The outline, in its own coordinate space.
    pub path: BezPath,
    /// Interior paint.
    pub fill: Color,
    /// Outline paint.
    pub stroke: Color,
    /// Outline width; `0` when the stroke is transparent.
    pub stroke_width: f64,
    /// Paint behind the path, covering the whole layer box.
    pub background: Color,
}

impl PathPayload {
    /// Bounding box of the path geometry, without stroke.
    #[must_use]
    pub fn geometry_bounds(&self) -> Rect {
        self.path.bounding_box()
    }

    /// Translation that maps path coordinates into the layer raster, so
    /// that the stroked outline starts at `(0, 0)`.
    #[must_use]
    pub fn raster_offset(&self) -> kurbo::Vec2 {
        let b = self.geometry_bounds();
        kurbo::Vec2::new(
            -b.x0 + self.stroke_width / 2.0,
            -b.y0 + self.stroke_width / 2.0,
        )
    }
}

/// What a layer rasterizes from.
///
/// Color, gradient and path payloads are values and are deep-copied with the
/// layer; rendered and encoded payloads are immutable blobs shared by
/// reference count.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// An image file path.
    File(String),
    /// A solid color.
    Fill(Color),
    /// Top-to-bottom gradient.
    LinearGradient {
        /// Color at the top edge.
        top: Color,
        /// Color at the bottom edge.
        bottom: Color,
    },
    /// Center-outwards gradient.
    RadialGradient {
        /// Color at the center.
        inner: Color,
        /// Color at the rim.
        outer: Color,
        /// Fraction of the radius filled solid with `inner`, in `[0, 0.99]`.
        spread: f64,
    },
    /// A vector path.
    Path(PathPayload),
    /// Row-major colors.
    Pixels {
        /// At least `width * height` entries; missing entries are transparent.
        colors: Vec<Color>,
        /// Row length.
        width: u32,
        /// Row count.
        height: u32,
    },
    /// A nested canvas, merged when the layer is rasterized.
    Canvas(CanvasId),
    /// A rendered raster.
    Rendered(Arc<Image>),
    /// Encoded image bytes (PNG, JPEG, ...).
    Encoded(Arc<[u8]>),
}

impl Payload {
    /// The payload's kind tag.
    #[must_use]
    pub const fn kind(&self) -> PayloadKind {
        match self {
            Self::File(_) => PayloadKind::File,
            Self::Fill(_) => PayloadKind::Fill,
            Self::LinearGradient { .. } => PayloadKind::LinearGradient,
            Self::RadialGradient { .. } => PayloadKind::RadialGradient,
            Self::Path(_) => PayloadKind::Path,
            Self::Pixels { .. } => PayloadKind::Pixels,
            Self::Canvas(_) => PayloadKind::Canvas,
            Self::Rendered(_) => PayloadKind::Rendered,
            Self::Encoded(_) => PayloadKind::Encoded,
        }
    }

    /// The nested canvas, if this payload is one.
    #[must_use]
    pub const fn nested_canvas(&self) -> Option<CanvasId> {
        match self {
            Self::Canvas(c) => Some(*c),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Gradient shape for [`LayerSource::TwoColors`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum GradientStyle {
    /// Top to bottom.
    #[default]
    Linear,
    /// From the center outwards.
    Radial {
        /// Solid inner fraction of the radius.
        spread: f64,
    },
}

/// A path plus optional paint, as given by the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct PathSource {
    /// The outline.
    pub path: BezPath,
    /// Interior paint; defaults to black, or white inside a mask.
    pub fill: Option<Color>,
    /// Outline paint; defaults to transparent.
    pub stroke: Option<Color>,
    /// Outline width; defaults to `1.0`.
    pub stroke_width: Option<f64>,
    /// Paint behind the path; defaults to transparent.
    pub background: Option<Color>,
}

impl PathSource {
    /// A path with default paint.
    #[must_use]
    pub fn new(path: BezPath) -> Self {
        Self {
            path,
            fill: None,
            stroke: None,
            stroke_width: None,
            background: None,
        }
    }

    /// Sets the fill.
    #[must_use]
    pub fn fill(mut self, c: Color) -> Self {
        self.fill = Some(c);
        self
    }

    /// Sets the stroke paint and width.
    #[must_use]
    pub fn stroke(mut self, c: Color, width: f64) -> Self {
        self.stroke = Some(c);
        self.stroke_width = Some(width);
        self
    }

    /// Sets the background.
    #[must_use]
    pub fn background(mut self, c: Color) -> Self {
        self.background = Some(c);
        self
    }
}

/// Everything a layer can be built from, in classification order.
///
/// [`Document::add_layer`](super::Document::add_layer) inspects the variant
/// to pick a payload kind and a default size.
#[derive(Clone, Debug)]
pub enum LayerSource {
    /// An image file path.
    File(String),
    /// Two colors make a gradient.
    TwoColors {
        /// First color (top, or center).
        from: Color,
        /// Second color (bottom, or rim).
        to: Color,
        /// Gradient shape.
        style: GradientStyle,
    },
    /// One color makes a fill.
    OneColor(Color),
    /// An existing layer is deep-copied.
    Layer(LayerId),
    /// An existing canvas is nested.
    Canvas(CanvasId),
    /// A vector path.
    Path(PathSource),
    /// Colors laid out in `width`-long rows.
    Pixels {
        /// Row-major colors.
        colors: Vec<Color>,
        /// Row length.
        width: u32,
        /// Row count.
        height: u32,
    },
    /// A rendered raster.
    Rendered(Arc<Image>),
    /// Encoded image bytes.
    Encoded(Arc<[u8]>),
}

impl From<&str> for LayerSource {
    fn from(path: &str) -> Self {
        Self::File(path.into())
    }
}

impl From<String> for LayerSource {
    fn from(path: String) -> Self {
        Self::File(path)
    }
}

impl From<Color> for LayerSource {
    fn from(c: Color) -> Self {
        Self::OneColor(c)
    }
}

impl From<(Color, Color)> for LayerSource {
    fn from((from, to): (Color, Color)) -> Self {
        Self::TwoColors {
            from,
            to,
            style: GradientStyle::Linear,
        }
    }
}

impl From<LayerId> for LayerSource {
    fn from(id: LayerId) -> Self {
        Self::Layer(id)
    }
}

impl From<CanvasId> for LayerSource {
    fn from(id: CanvasId) -> Self {
        Self::Canvas(id)
    }
}

impl From<BezPath> for LayerSource {
    fn from(path: BezPath) -> Self {
        Self::Path(PathSource::new(path))
    }
}

impl From<PathSource> for LayerSource {
    fn from(path: PathSource) -> Self {
        Self::Path(path)
    }
}

impl From<Image> for LayerSource {
    fn from(img: Image) -> Self {
        Self::Rendered(Arc::new(img))
    }
}

impl From<Arc<Image>> for LayerSource {
    fn from(img: Arc<Image>) -> Self {
        Self::Rendered(img)
    }
}

impl From<Vec<u8>> for LayerSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Encoded(bytes.into())
    }
}

/// Sizes image files and encoded bytes during classification.
///
/// The document is codec-agnostic; renderers supply a probe through
/// [`Document::set_image_probe`](super::Document::set_image_probe).
pub trait ImageProbe {
    /// Pixel size of the image file at `path`, or `None` if unreadable.
    fn file_size(&self, path: &str) -> Option<(u32, u32)>;

    /// Pixel size of encoded image bytes, or `None` if undecodable.
    fn encoded_size(&self, bytes: &[u8]) -> Option<(u32, u32)>;
}

/// A probe that recognizes nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProbe;

impl ImageProbe for NoProbe {
    fn file_size(&self, _path: &str) -> Option<(u32, u32)> {
        None
    }

    fn encoded_size(&self, _bytes: &[u8]) -> Option<(u32, u32)> {
        None
    }
}
