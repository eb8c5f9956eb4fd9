//! One framing run: capture, decode, measure, compose, render, reveal.
//!
//! Each step either hands its value to the next or aborts the run. The raw
//! capture stays on disk when a later step fails.

use crate::color::Rgb;
use crate::config::{FrameConfig, Settings};
use crate::fsutil::{abs_path, write_json_pretty};
use crate::histogram::dominant_color;
use crate::layout::{check_canvas_size, compute_layout, Geometry};
use crate::render::SceneRenderer;
use crate::scene::compose_scene;
use crate::shell::CaptureShell;
use crate::source::SourceImage;
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

#[derive(Debug, Default, Clone, Serialize)]
pub struct Timings {
    pub capture_ms: Option<u64>,
    pub decode_ms: u64,
    pub analyze_ms: u64,
    pub render_ms: u64,
    pub reveal_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub image_path: PathBuf,
    pub source_path: PathBuf,
    pub renderer: &'static str,
    pub geometry: Geometry,
    pub border_color: Rgb,
    pub scene_path: Option<PathBuf>,
    pub revealed: bool,
    pub timings: Timings,
    pub warnings: Vec<String>,
}

/// Per-run knobs that are not framing settings.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub emit_scene: Option<PathBuf>,
}

/// Layout and border color for one source. The two share nothing but the
/// read-only image, so they may run side by side.
pub fn analyze(
    source: &SourceImage,
    frame: &FrameConfig,
    parallel: bool,
) -> Result<(Geometry, Rgb)> {
    let layout = || {
        compute_layout(
            source.width(),
            source.height(),
            frame.target_aspect_ratio,
            frame.outer_pad_percent,
            frame.screenshot_pad_percent,
        )
    };
    let color = || dominant_color(source.rgba());

    let (geometry, border_color) = if parallel {
        thread::scope(|scope| {
            let histogram = scope.spawn(color);
            let geometry = layout();
            let border_color = histogram
                .join()
                .map_err(|_| anyhow!("histogram worker panicked"))?;
            Ok::<_, anyhow::Error>((geometry, border_color))
        })?
    } else {
        (layout(), color())
    };

    let border_color = border_color
        .ok_or_else(|| anyhow!("image has no pixels: {}", source.path().display()))?;
    Ok((geometry, border_color))
}

/// Frames the image at `input` and writes the result to `output`, which may
/// be the same file.
pub fn frame_file(
    input: &Path,
    output: &Path,
    settings: &Settings,
    renderer: &dyn SceneRenderer,
    options: &RunOptions,
) -> Result<RunReport> {
    settings.frame.validate()?;
    let mut timings = Timings::default();

    let started = Instant::now();
    let source = SourceImage::load(input).context("decode failed")?;
    timings.decode_ms = started.elapsed().as_millis() as u64;
    log::info!(
        "decoded {}x{} source in {}ms",
        source.width(),
        source.height(),
        timings.decode_ms
    );

    let started = Instant::now();
    let (geometry, border_color) = analyze(&source, &settings.frame, settings.parallel)?;
    timings.analyze_ms = started.elapsed().as_millis() as u64;
    log::info!(
        "frame {}x{} ({:?} axis), border color {} in {}ms",
        geometry.final_size.0,
        geometry.final_size.1,
        geometry.independent_axis,
        border_color,
        timings.analyze_ms
    );
    check_canvas_size(geometry.final_size).context("layout failed")?;

    let scene = compose_scene(&geometry, border_color, &source, &settings.frame.gradient);
    if let Some(path) = options.emit_scene.as_deref() {
        write_json_pretty(path, &scene)?;
        log::info!("scene written to {}", path.display());
    }

    let started = Instant::now();
    renderer
        .render(&scene, scene.viewport(), output)
        .with_context(|| format!("render failed ({} renderer)", renderer.name()))?;
    timings.render_ms = started.elapsed().as_millis() as u64;
    log::info!(
        "{} renderer wrote {} in {}ms",
        renderer.name(),
        output.display(),
        timings.render_ms
    );

    Ok(RunReport {
        image_path: abs_path(output),
        source_path: abs_path(input),
        renderer: renderer.name(),
        geometry,
        border_color,
        scene_path: options.emit_scene.as_deref().map(abs_path),
        revealed: false,
        timings,
        warnings: Vec::new(),
    })
}

/// Captures a region into `path`, frames it in place and reveals it.
///
/// A reveal failure does not fail the run: the framed file is already on
/// disk, so it is reported as a warning instead.
pub fn snap(
    path: &Path,
    settings: &Settings,
    shell: &dyn CaptureShell,
    renderer: &dyn SceneRenderer,
    options: &RunOptions,
) -> Result<RunReport> {
    settings.frame.validate()?;

    let started = Instant::now();
    shell
        .capture_region_to_file(path)
        .context("capture failed")?;
    let capture_ms = started.elapsed().as_millis() as u64;
    log::info!("captured {} in {}ms", path.display(), capture_ms);

    let mut report = frame_file(path, path, settings, renderer, options)?;
    report.timings.capture_ms = Some(capture_ms);

    if settings.reveal {
        let started = Instant::now();
        match shell.reveal_in_file_browser(path) {
            Ok(()) => report.revealed = true,
            Err(err) => {
                log::warn!("could not reveal {}: {err:#}", path.display());
                report.warnings.push(format!("reveal failed: {err:#}"));
            }
        }
        report.timings.reveal_ms = Some(started.elapsed().as_millis() as u64);
    }

    Ok(report)
}
