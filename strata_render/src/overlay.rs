// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Visual feedback drawn over a merged canvas.
//!
//! The renderer never draws feedback itself. It describes it as
//! [`OverlayCommand`]s sent to a caller-supplied [`DebugOverlay`], which the
//! host executes on its own surface after drawing the merged image.

use kurbo::{Point, Rect};
use strata_core::color::Color;

use crate::pixels::HISTOGRAM_BINS;

/// Translucent black used behind overlay elements.
pub const OVERLAY_BACKGROUND: Color = Color::from_rgba8(0, 0, 0, 153);
/// Translucent white used for overlay strokes and text.
pub const OVERLAY_FOREGROUND: Color = Color::from_rgba8(255, 255, 255, 153);

/// Ruler thickness in pixels.
pub const RULER_WIDTH: f64 = 30.0;
/// Distance between ruler ticks in pixels.
pub const RULER_STEP: f64 = 10.0;

/// One structured draw command.
#[derive(Clone, Debug, PartialEq)]
pub enum OverlayCommand {
    /// An axis-aligned rectangle.
    Rect {
        /// Area in canvas pixels.
        rect: Rect,
        /// Interior paint, if filled.
        fill: Option<Color>,
        /// Outline paint, if stroked.
        stroke: Option<Color>,
        /// Outline width.
        stroke_width: f64,
    },
    /// A straight line.
    Line {
        /// Start point.
        from: Point,
        /// End point.
        to: Point,
        /// Paint.
        color: Color,
        /// Width.
        width: f64,
    },
    /// An ellipse inscribed in `rect`.
    Oval {
        /// Bounding box of the ellipse.
        rect: Rect,
        /// Interior paint, if filled.
        fill: Option<Color>,
        /// Outline paint, if stroked.
        stroke: Option<Color>,
    },
    /// A text label with its baseline starting at `at`.
    Label {
        /// Baseline origin.
        at: Point,
        /// Text.
        text: String,
        /// Paint.
        color: Color,
        /// Font size in points.
        size: f64,
    },
}

/// Receives overlay commands, in drawing order.
pub trait DebugOverlay {
    /// Executes or records one command.
    fn command(&mut self, command: OverlayCommand);
}

impl DebugOverlay for Vec<OverlayCommand> {
    fn command(&mut self, command: OverlayCommand) {
        self.push(command);
    }
}

/// Outlines a layer's bounds and marks its origin point with a dot and a
/// crosshair spanning `canvas`.
pub fn guides(overlay: &mut dyn DebugOverlay, canvas: Rect, bounds: Rect, origin: Point) {
    overlay.command(OverlayCommand::Rect {
        rect: bounds,
        fill: None,
        stroke: Some(OVERLAY_FOREGROUND),
        stroke_width: 0.5,
    });
    let r = 5.0;
    overlay.command(OverlayCommand::Oval {
        rect: Rect::new(origin.x - r, origin.y - r, origin.x + r, origin.y + r),
        fill: Some(OVERLAY_BACKGROUND),
        stroke: Some(OVERLAY_FOREGROUND),
    });
    for (from, to) in [
        (Point::new(origin.x, canvas.y0), Point::new(origin.x, canvas.y1)),
        (Point::new(canvas.x0, origin.y), Point::new(canvas.x1, origin.y)),
    ] {
        overlay.command(OverlayCommand::Line {
            from,
            to,
            color: OVERLAY_FOREGROUND,
            width: 0.5,
        });
    }
}

/// Draws rulers along the left and top edges of `area`, with a tick every
/// [`RULER_STEP`] pixels and a label on every fifth tick.
pub fn rulers(overlay: &mut dyn DebugOverlay, area: Rect) {
    let rw = RULER_WIDTH;
    for rect in [
        Rect::new(area.x0, area.y0, area.x0 + rw, area.y1),
        Rect::new(area.x0 + rw, area.y0, area.x1, area.y0 + rw),
    ] {
        overlay.command(OverlayCommand::Rect {
            rect,
            fill: Some(OVERLAY_BACKGROUND),
            stroke: None,
            stroke_width: 0.0,
        });
    }
    // Ticks start just past the ruler corner, so tick i sits at
    // (i + 3) * RULER_STEP from the edge.
    let tick = |i: u32| area.y0 + rw + f64::from(i) * RULER_STEP;
    for i in 0..ticks(area.height() - rw) {
        let y = tick(i);
        if (i + 3) % 5 == 0 {
            overlay.command(OverlayCommand::Label {
                at: Point::new(area.x0 + 2.0, y - 2.0),
                text: ((i + 3) * 10).to_string(),
                color: OVERLAY_FOREGROUND,
                size: 8.5,
            });
        }
        overlay.command(OverlayCommand::Line {
            from: Point::new(area.x0, y),
            to: Point::new(area.x0 + rw, y),
            color: tick_color(i),
            width: 0.5,
        });
    }
    for i in 0..ticks(area.width() - rw) {
        let x = area.x0 + rw + f64::from(i) * RULER_STEP;
        overlay.command(OverlayCommand::Line {
            from: Point::new(x, area.y0),
            to: Point::new(x, area.y0 + rw),
            color: tick_color(i),
            width: 0.5,
        });
    }
}

/// Draws a histogram panel with its top-left near `at`: one baseline and one
/// bar per bin for each channel.
pub fn histogram(overlay: &mut dyn DebugOverlay, channels: &[[f64; HISTOGRAM_BINS]], at: Point) {
    let bar_h = 30.0;
    let bin_w = 0.5;
    let count = u32::try_from(channels.len()).unwrap_or(u32::MAX);
    let x = at.x + 5.0;
    let mut y = at.y + 5.0;
    overlay.command(OverlayCommand::Rect {
        rect: Rect::from_origin_size(
            (x, y),
            (
                30.0 + 255.0 * bin_w,
                20.0 + f64::from(count) * (bar_h + 10.0),
            ),
        ),
        fill: Some(OVERLAY_BACKGROUND),
        stroke: None,
        stroke_width: 0.0,
    });
    let x = x + 15.0;
    y += 15.0;
    for channel in channels {
        let base = y + bar_h;
        overlay.command(OverlayCommand::Line {
            from: Point::new(x, base),
            to: Point::new(x + 255.0 * bin_w, base),
            color: OVERLAY_FOREGROUND,
            width: 0.75,
        });
        for (i, v) in (0_u32..).zip(channel) {
            let bx = x + f64::from(i) * bin_w;
            overlay.command(OverlayCommand::Line {
                from: Point::new(bx, base),
                to: Point::new(bx, base - v * bar_h),
                color: OVERLAY_FOREGROUND,
                width: 0.75,
            });
        }
        y += bar_h + 10.0;
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "tick counts are small and non-negative after the max"
)]
fn ticks(extent: f64) -> u32 {
    (extent / RULER_STEP).floor().max(0.0) as u32
}

fn tick_color(i: u32) -> Color {
    if (i + 3) % 5 == 0 {
        Color::WHITE
    } else {
        OVERLAY_FOREGROUND
    }
}
