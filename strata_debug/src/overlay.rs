// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Overlay command capture.
//!
//! [`OverlayRecorder`] is a [`DebugOverlay`] that keeps every command a merge
//! emits. The recording can be replayed into another overlay or written as
//! JSON, one object per command, for viewers that draw on top of an exported
//! image.

use std::io::{self, Write};

use kurbo::{Point, Rect};
use serde_json::{Value, json};
use strata_core::color::Color;
use strata_render::{DebugOverlay, OverlayCommand};

/// Records overlay commands in drawing order.
#[derive(Clone, Debug, Default)]
pub struct OverlayRecorder {
    commands: Vec<OverlayCommand>,
}

impl OverlayRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded commands.
    #[must_use]
    pub fn commands(&self) -> &[OverlayCommand] {
        &self.commands
    }

    /// Number of recorded commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Sends every recorded command to `target`, in order.
    pub fn replay(&self, target: &mut dyn DebugOverlay) {
        for command in &self.commands {
            target.command(command.clone());
        }
    }

    /// The recording as a JSON array.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Array(self.commands.iter().map(command_json).collect())
    }

    /// Writes the recording as pretty-printed JSON.
    pub fn write_json(&self, writer: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(writer, &self.to_json())?;
        Ok(())
    }
}

impl DebugOverlay for OverlayRecorder {
    fn command(&mut self, command: OverlayCommand) {
        self.commands.push(command);
    }
}

fn rect(r: Rect) -> Value {
    json!([r.x0, r.y0, r.x1, r.y1])
}

fn point(p: Point) -> Value {
    json!([p.x, p.y])
}

fn color(c: Option<Color>) -> Value {
    c.map_or(Value::Null, |c| json!(c.to_array()))
}

fn command_json(command: &OverlayCommand) -> Value {
    match command {
        OverlayCommand::Rect {
            rect: r,
            fill,
            stroke,
            stroke_width,
        } => json!({
            "kind": "rect",
            "rect": rect(*r),
            "fill": color(*fill),
            "stroke": color(*stroke),
            "stroke_width": stroke_width,
        }),
        OverlayCommand::Line {
            from,
            to,
            color: c,
            width,
        } => json!({
            "kind": "line",
            "from": point(*from),
            "to": point(*to),
            "color": color(Some(*c)),
            "width": width,
        }),
        OverlayCommand::Oval {
            rect: r,
            fill,
            stroke,
        } => json!({
            "kind": "oval",
            "rect": rect(*r),
            "fill": color(*fill),
            "stroke": color(*stroke),
        }),
        OverlayCommand::Label {
            at,
            text,
            color: c,
            size,
        } => json!({
            "kind": "label",
            "at": point(*at),
            "text": text,
            "color": color(Some(*c)),
            "size": size,
        }),
    }
}
