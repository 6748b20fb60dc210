// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Builds a layered document and flattens it with diagnostics attached.
//!
//! Layers exercise gradients, a stroked path, a distorted pixel grid, a
//! masked nested canvas, filters, blend modes and a dropshadow. The canvas is
//! merged twice on the fast path (the second merge is served from the cache),
//! exported as PNG, JPEG and TIFF, and the recorded trace is written as
//! Chrome Trace Event Format JSON alongside an overlay capture.
//!
//! Run with: `cargo run -p flatten_demo -- [output-dir]`

use std::cell::RefCell;
use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::rc::Rc;

use kurbo::{BezPath, Point, Vec2};
use strata_core::color::Color;
use strata_core::document::{BlendMode, CanvasId, Document, LayerOptions, PathSource, Shadow};
use strata_core::filter::ParamValue;
use strata_core::trace::{
    ExportEvent, LayerRenderedEvent, MergeBeginEvent, MergeEndEvent, MergeSummary,
    StageBeginEvent, StageEndEvent, TraceSink,
};
use strata_debug::overlay::OverlayRecorder;
use strata_debug::pretty::PrettyPrintSink;
use strata_debug::recorder::RecorderSink;
use strata_render::cpu::CpuBackend;
use strata_render::{ExportOptions, MergeOptions, Renderer, TiffMode, Transparency};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;

/// Forwards every event to a pretty printer and a shared recorder.
struct Fanout {
    pretty: PrettyPrintSink,
    recorder: Rc<RefCell<RecorderSink>>,
}

impl TraceSink for Fanout {
    fn on_merge_begin(&mut self, e: &MergeBeginEvent) {
        self.pretty.on_merge_begin(e);
        self.recorder.borrow_mut().on_merge_begin(e);
    }

    fn on_merge_end(&mut self, e: &MergeEndEvent) {
        self.pretty.on_merge_end(e);
        self.recorder.borrow_mut().on_merge_end(e);
    }

    fn on_stage_begin(&mut self, e: &StageBeginEvent) {
        self.pretty.on_stage_begin(e);
        self.recorder.borrow_mut().on_stage_begin(e);
    }

    fn on_stage_end(&mut self, e: &StageEndEvent) {
        self.pretty.on_stage_end(e);
        self.recorder.borrow_mut().on_stage_end(e);
    }

    fn on_layer_rendered(&mut self, e: &LayerRenderedEvent) {
        self.pretty.on_layer_rendered(e);
        self.recorder.borrow_mut().on_layer_rendered(e);
    }

    fn on_export(&mut self, e: &ExportEvent) {
        self.pretty.on_export(e);
        self.recorder.borrow_mut().on_export(e);
    }

    fn on_merge_summary(&mut self, s: &MergeSummary) {
        self.pretty.on_merge_summary(s);
        self.recorder.borrow_mut().on_merge_summary(s);
    }
}

/// A five-pointed star centered on the origin.
fn star_outline(outer: f64, inner: f64) -> BezPath {
    let mut path = BezPath::new();
    for i in 0..10 {
        let r = if i % 2 == 0 { outer } else { inner };
        let angle = std::f64::consts::PI * f64::from(i) / 5.0 - std::f64::consts::FRAC_PI_2;
        let p = Point::new(r * angle.cos(), r * angle.sin());
        if i == 0 {
            path.move_to(p);
        } else {
            path.line_to(p);
        }
    }
    path.close_path();
    path
}

fn build(doc: &mut Document, renderer: &Renderer<CpuBackend>) -> Result<CanvasId, Box<dyn Error>> {
    let canvas = doc.create_canvas(WIDTH, HEIGHT);
    let filters = renderer.backend().filters();

    doc.add_linear_gradient(
        canvas,
        Color::rgb(0.09, 0.12, 0.25),
        Color::rgb(0.85, 0.45, 0.30),
        LayerOptions::new().named("sky"),
    )?;

    let sun = doc.add_radial_gradient(
        canvas,
        Color::rgb(1.0, 0.95, 0.6),
        Color::TRANSPARENT,
        0.4,
        LayerOptions::new().at(470.0, 140.0).size(260.0, 260.0).named("sun"),
    )?;
    doc.set_blend_mode(sun, BlendMode::Screen);
    doc.filter(sun, filters, "bloom", &[("radius", ParamValue::Number(12.0))])?;

    let star = doc.add_path(
        canvas,
        PathSource::new(star_outline(90.0, 38.0))
            .fill(Color::rgb(0.98, 0.8, 0.2))
            .stroke(Color::WHITE, 4.0),
        LayerOptions::new().at(180.0, 200.0).named("star"),
    )?;
    doc.rotate(star, 15.0);
    doc.dropshadow(star, Shadow::default());

    let grid: Vec<Color> = (0..64)
        .map(|i| if (i / 8 + i % 8) % 2 == 0 { Color::BLACK } else { Color::WHITE })
        .collect();
    let board = doc.add_pixels(
        canvas,
        grid,
        8,
        8,
        LayerOptions::new().at(470.0, 360.0).size(160.0, 160.0).named("board"),
    )?;
    doc.distort(
        board,
        [
            Vec2::new(0.15, 0.0),
            Vec2::new(-0.15, 0.0),
            Vec2::ZERO,
            Vec2::ZERO,
        ],
    );
    doc.set_opacity(board, 0.8);

    let inset = doc.create_canvas(200, 120);
    doc.add_fill(inset, Some(Color::rgb(0.2, 0.7, 0.5)), LayerOptions::new())?;
    doc.add_radial_gradient(
        inset,
        Color::WHITE,
        Color::rgb(0.2, 0.7, 0.5),
        0.0,
        LayerOptions::new(),
    )?;
    let card = doc.add_canvas(canvas, inset, LayerOptions::new().at(180.0, 400.0).named("card"))?;
    let mask = doc.mask(card);
    doc.add_linear_gradient(mask, Color::WHITE, Color::BLACK, LayerOptions::new())?;
    doc.filter(card, filters, "posterize", &[("levels", ParamValue::Number(5.0))])?;
    doc.set_blend_mode(card, BlendMode::Overlay);

    Ok(canvas)
}

fn main() -> Result<(), Box<dyn Error>> {
    let out_dir = std::env::args()
        .nth(1)
        .map_or_else(|| std::env::temp_dir().join("strata_demo"), PathBuf::from);
    std::fs::create_dir_all(&out_dir)?;

    let recorder = Rc::new(RefCell::new(RecorderSink::new()));
    let sink = Fanout {
        pretty: PrettyPrintSink::new(Box::new(std::io::stdout())).without_stages(),
        recorder: Rc::clone(&recorder),
    };
    let mut renderer = Renderer::new(CpuBackend::new()).with_trace_sink(sink);

    let mut doc = Document::new();
    let canvas = build(&mut doc, &renderer)?;
    renderer.apply_changes(&doc.evaluate());

    // -- flatten ---------------------------------------------------------------
    let fast = MergeOptions {
        fast: true,
        ..MergeOptions::default()
    };
    renderer.merge(&doc, canvas, &fast)?;
    let mut overlay = OverlayRecorder::new();
    let image = renderer.merge_with_overlay(&doc, canvas, &fast, &mut overlay)?;
    println!(
        "cache: {} hits, {} misses",
        renderer.cache().hits(),
        renderer.cache().misses()
    );

    // -- export ----------------------------------------------------------------
    for (name, options) in [
        ("flatten.png", ExportOptions::new()),
        ("flatten.jpg", ExportOptions::new().compression(0.15)),
        ("flatten.tiff", ExportOptions::new().tiff(TiffMode::Lzw)),
    ] {
        let path = out_dir.join(name);
        let bytes = renderer.export_image(&image, &path, &options)?;
        println!("wrote {} ({bytes} bytes)", path.display());
    }

    // -- statistics ------------------------------------------------------------
    let star = doc.find(canvas, "star")?;
    let pixels = renderer.pixels(&doc, star)?;
    let avg = pixels.average(Transparency::default()).to_rgba8();
    println!(
        "star: {}x{} at {:?}, average {avg:?}",
        pixels.width(),
        pixels.height(),
        pixels.origin()
    );

    // -- diagnostics -----------------------------------------------------------
    let trace_path = out_dir.join("flatten_trace.json");
    let mut writer = BufWriter::new(File::create(&trace_path)?);
    strata_debug::chrome::export(recorder.borrow().as_bytes(), &mut writer)?;
    println!("wrote {}", trace_path.display());

    let overlay_path = out_dir.join("flatten_overlay.json");
    overlay.write_json(&mut BufWriter::new(File::create(&overlay_path)?))?;
    println!("wrote {} ({} commands)", overlay_path.display(), overlay.len());

    Ok(())
}
