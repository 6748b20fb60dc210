// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer construction and payload classification.

use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use kurbo::{Shape as _, Vec2};

use super::id::{CanvasId, LayerId};
use super::layer::Placement;
use super::payload::{GradientStyle, LayerSource, PathPayload, PathSource, Payload};
use super::store::Document;
use crate::color::Color;
use crate::error::{Error, Result};
use crate::image::Image;

/// Largest accepted radial gradient spread.
pub const MAX_SPREAD: f64 = 0.99;

/// Optional overrides for new layers.
///
/// Unset position fields default to the canvas center. Unset size fields
/// default to the payload's intrinsic size, or to the canvas size for fills
/// and gradients. Setting a size on a payload with an intrinsic size records
/// a scale factor instead of resizing the payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerOptions {
    /// Horizontal position of the origin point.
    pub x: Option<f64>,
    /// Vertical position of the origin point.
    pub y: Option<f64>,
    /// Target width.
    pub w: Option<f64>,
    /// Target height.
    pub h: Option<f64>,
    /// Layer name, for [`Document::find`].
    pub name: Option<String>,
}

impl LayerOptions {
    /// No overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the position.
    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    /// Sets the target size.
    #[must_use]
    pub fn size(mut self, w: f64, h: f64) -> Self {
        self.w = Some(w);
        self.h = Some(h);
        self
    }

    /// Sets the name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Base size and implicit scale for a payload with its own pixel size.
fn intrinsic(w0: u32, h0: u32, opts: &LayerOptions) -> (f64, f64, Vec2) {
    let (w0, h0) = (f64::from(w0), f64::from(h0));
    let sx = opts.w.map_or(1.0, |w| w / w0);
    let sy = opts.h.map_or(1.0, |h| h / h0);
    (w0, h0, Vec2::new(sx, sy))
}

fn unrecognized(reason: impl Into<String>) -> Error {
    Error::UnrecognizedPayload {
        reason: reason.into(),
    }
}

impl Document {
    /// Adds a layer built from `source` to the top of `canvas`.
    ///
    /// The source is classified in [`LayerSource`] order. See
    /// [`LayerOptions`] for how positions and sizes default.
    ///
    /// # Errors
    ///
    /// - [`Error::UnrecognizedPayload`] when an image cannot be sized or a
    ///   pixel buffer has no area.
    /// - [`Error::CanvasInCanvasRecursion`] when a canvas would end up
    ///   containing itself.
    pub fn add_layer(
        &mut self,
        canvas: CanvasId,
        source: impl Into<LayerSource>,
        opts: LayerOptions,
    ) -> Result<LayerId> {
        self.validate_canvas(canvas);
        let (cw, ch) = {
            let (w, h) = self.canvas_size(canvas);
            (f64::from(w), f64::from(h))
        };
        let sized = |opts: &LayerOptions| {
            (
                opts.w.unwrap_or(cw),
                opts.h.unwrap_or(ch),
                Vec2::new(1.0, 1.0),
            )
        };

        let (payload, (w, h, scale)) = match source.into() {
            LayerSource::File(path) => {
                let (w0, h0) = self
                    .probe
                    .file_size(&path)
                    .ok_or_else(|| unrecognized(format!("cannot read image file `{path}`")))?;
                (Payload::File(path), intrinsic(w0, h0, &opts))
            }
            LayerSource::TwoColors { from, to, style } => {
                let payload = match style {
                    GradientStyle::Linear => Payload::LinearGradient {
                        top: from,
                        bottom: to,
                    },
                    GradientStyle::Radial { spread } => Payload::RadialGradient {
                        inner: from,
                        outer: to,
                        spread: clamp_or(spread, 0.0, MAX_SPREAD, 0.0),
                    },
                };
                (payload, sized(&opts))
            }
            LayerSource::OneColor(c) => (Payload::Fill(c), sized(&opts)),
            LayerSource::Layer(src) => return self.add_layer_copy(canvas, src, opts),
            LayerSource::Canvas(nested) => {
                self.validate_canvas(nested);
                if self.reaches(nested.idx, canvas.idx) {
                    return Err(Error::CanvasInCanvasRecursion);
                }
                let (w0, h0) = self.canvas_size(nested);
                (Payload::Canvas(nested), intrinsic(w0, h0, &opts))
            }
            LayerSource::Path(src) => {
                let payload = self.classify_path(canvas, src);
                let b = payload.path.bounding_box();
                let pad = payload.stroke_width;
                let (w, h) = (b.width() + pad, b.height() + pad);
                let scale = Vec2::new(
                    opts.w.map_or(1.0, |t| if w > 0.0 { t / w } else { 1.0 }),
                    opts.h.map_or(1.0, |t| if h > 0.0 { t / h } else { 1.0 }),
                );
                (Payload::Path(payload), (w, h, scale))
            }
            LayerSource::Pixels {
                colors,
                width,
                height,
            } => {
                if width == 0 || height == 0 {
                    return Err(unrecognized("pixel buffer has no area"));
                }
                (
                    Payload::Pixels {
                        colors,
                        width,
                        height,
                    },
                    intrinsic(width, height, &opts),
                )
            }
            LayerSource::Rendered(img) => {
                if img.is_empty() {
                    return Err(unrecognized("rendered image is empty"));
                }
                let size = intrinsic(img.width(), img.height(), &opts);
                (Payload::Rendered(img), size)
            }
            LayerSource::Encoded(bytes) => {
                let (w0, h0) = self
                    .probe
                    .encoded_size(&bytes)
                    .ok_or_else(|| unrecognized("cannot decode image bytes"))?;
                (Payload::Encoded(bytes), intrinsic(w0, h0, &opts))
            }
        };

        let x = opts.x.unwrap_or(cw / 2.0);
        let y = opts.y.unwrap_or(ch / 2.0);
        let mut placement = Placement::new(x, y, w.max(0.0), h.max(0.0));
        placement.scale = scale;
        let idx = self.alloc_layer(canvas.idx, None, payload, placement);
        self.name[idx as usize] = opts.name;
        Ok(self.layer_id(idx))
    }

    /// Resolves path paint defaults for `canvas`.
    fn classify_path(&self, canvas: CanvasId, src: PathSource) -> PathPayload {
        let fill = src.fill.unwrap_or_else(|| self.default_fill(canvas));
        let stroke = src.stroke.unwrap_or(Color::TRANSPARENT);
        let mut stroke_width = src.stroke_width.unwrap_or(1.0);
        if stroke.a() == 0.0 {
            stroke_width = 0.0;
        }
        PathPayload {
            path: src.path,
            fill,
            stroke,
            stroke_width: clamp_or(stroke_width, 0.0, f64::INFINITY, 0.0),
            background: src.background.unwrap_or(Color::TRANSPARENT),
        }
    }

    // -- Typed helpers --

    /// Adds an image file layer.
    pub fn add_file(&mut self, canvas: CanvasId, path: &str, opts: LayerOptions) -> Result<LayerId> {
        self.add_layer(canvas, LayerSource::File(path.into()), opts)
    }

    /// Adds a solid fill. `None` picks [`default_fill`](Self::default_fill).
    pub fn add_fill(
        &mut self,
        canvas: CanvasId,
        color: Option<Color>,
        opts: LayerOptions,
    ) -> Result<LayerId> {
        let c = color.unwrap_or_else(|| self.default_fill(canvas));
        self.add_layer(canvas, LayerSource::OneColor(c), opts)
    }

    /// Adds a top-to-bottom gradient.
    pub fn add_linear_gradient(
        &mut self,
        canvas: CanvasId,
        top: Color,
        bottom: Color,
        opts: LayerOptions,
    ) -> Result<LayerId> {
        self.add_layer(
            canvas,
            LayerSource::TwoColors {
                from: top,
                to: bottom,
                style: GradientStyle::Linear,
            },
            opts,
        )
    }

    /// Adds a center-outwards gradient.
    pub fn add_radial_gradient(
        &mut self,
        canvas: CanvasId,
        inner: Color,
        outer: Color,
        spread: f64,
        opts: LayerOptions,
    ) -> Result<LayerId> {
        self.add_layer(
            canvas,
            LayerSource::TwoColors {
                from: inner,
                to: outer,
                style: GradientStyle::Radial { spread },
            },
            opts,
        )
    }

    /// Adds a vector path layer.
    pub fn add_path(
        &mut self,
        canvas: CanvasId,
        path: PathSource,
        opts: LayerOptions,
    ) -> Result<LayerId> {
        self.add_layer(canvas, LayerSource::Path(path), opts)
    }

    /// Adds a layer from row-major colors.
    pub fn add_pixels(
        &mut self,
        canvas: CanvasId,
        colors: Vec<Color>,
        width: u32,
        height: u32,
        opts: LayerOptions,
    ) -> Result<LayerId> {
        self.add_layer(
            canvas,
            LayerSource::Pixels {
                colors,
                width,
                height,
            },
            opts,
        )
    }

    /// Nests `nested` inside `canvas`.
    pub fn add_canvas(
        &mut self,
        canvas: CanvasId,
        nested: CanvasId,
        opts: LayerOptions,
    ) -> Result<LayerId> {
        self.add_layer(canvas, LayerSource::Canvas(nested), opts)
    }

    /// Deep-copies `layer` onto `canvas`, then applies any position or name
    /// override.
    pub fn add_layer_copy(
        &mut self,
        canvas: CanvasId,
        layer: LayerId,
        opts: LayerOptions,
    ) -> Result<LayerId> {
        let id = self.copy_layer(layer, canvas)?;
        let p = &mut self.placement[id.idx as usize];
        if let Some(x) = opts.x {
            p.x = x;
        }
        if let Some(y) = opts.y {
            p.y = y;
        }
        if opts.name.is_some() {
            self.name[id.idx as usize] = opts.name;
        }
        Ok(id)
    }

    /// Adds an already-rendered raster.
    pub fn add_image(
        &mut self,
        canvas: CanvasId,
        image: impl Into<Arc<Image>>,
        opts: LayerOptions,
    ) -> Result<LayerId> {
        self.add_layer(canvas, LayerSource::Rendered(image.into()), opts)
    }

    /// Adds encoded image bytes.
    pub fn add_encoded(
        &mut self,
        canvas: CanvasId,
        bytes: impl Into<Arc<[u8]>>,
        opts: LayerOptions,
    ) -> Result<LayerId> {
        self.add_layer(canvas, LayerSource::Encoded(bytes.into()), opts)
    }
}

/// Clamps `v` into `[lo, hi]`, mapping NaN to `fallback`.
pub(crate) fn clamp_or(v: f64, lo: f64, hi: f64, fallback: f64) -> f64 {
    if v.is_nan() { fallback } else { v.clamp(lo, hi) }
}
