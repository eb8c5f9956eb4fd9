//! Frame geometry.
//!
//! The screenshot is held at its native size. One axis of the canvas (the
//! independent axis) is derived from the screenshot plus padding, the other
//! from the target aspect ratio. Both paddings are fractions of the final
//! independent axis and are applied on both sides.

use anyhow::{bail, Result};
use serde::Serialize;

/// Longest canvas side any renderer is asked to paint (Chromium's limit).
pub const MAX_CANVAS_SIDE: u32 = 16_384;
/// Canvas area cap: 256 Mpx, 1 GiB of RGBA8.
pub const MAX_CANVAS_PIXELS: u64 = 1 << 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Geometry {
    pub final_size: (u32, u32),
    pub screenshot_size: (u32, u32),
    pub screenshot_pad: f64,
    /// Already contained in `final_size`; kept for reporting.
    pub outer_pad: f64,
    pub border_box_size: (f64, f64),
    pub border_radius: f64,
    pub independent_axis: Axis,
}

/// Fraction of the independent axis left for the screenshot itself.
pub fn screenshot_percent(outer_pad_percent: f64, screenshot_pad_percent: f64) -> f64 {
    1.0 - (2.0 * outer_pad_percent + 2.0 * screenshot_pad_percent)
}

/// `target_aspect_ratio` is height / width. Callers must keep
/// `2 * (outer_pad_percent + screenshot_pad_percent) < 1`; larger pads
/// degenerate the layout.
pub fn compute_layout(
    screenshot_width: u32,
    screenshot_height: u32,
    target_aspect_ratio: f64,
    outer_pad_percent: f64,
    screenshot_pad_percent: f64,
) -> Geometry {
    let width = f64::from(screenshot_width);
    let height = f64::from(screenshot_height);
    let screenshot_aspect_ratio = height / width;

    let independent_axis = if screenshot_aspect_ratio > target_aspect_ratio {
        Axis::Vertical
    } else {
        Axis::Horizontal
    };

    let percent = screenshot_percent(outer_pad_percent, screenshot_pad_percent);
    debug_assert!(percent > 0.0, "padding leaves no room for the screenshot");

    let independent_source = match independent_axis {
        Axis::Horizontal => width,
        Axis::Vertical => height,
    };
    let final_independent = (independent_source / percent).round();
    let final_dependent = match independent_axis {
        Axis::Horizontal => (final_independent * target_aspect_ratio).round(),
        Axis::Vertical => (final_independent / target_aspect_ratio).round(),
    };

    let final_size = match independent_axis {
        Axis::Horizontal => (final_independent as u32, final_dependent as u32),
        Axis::Vertical => (final_dependent as u32, final_independent as u32),
    };

    let outer_pad = final_independent * outer_pad_percent;
    let screenshot_pad = final_independent * screenshot_pad_percent;

    Geometry {
        final_size,
        screenshot_size: (screenshot_width, screenshot_height),
        screenshot_pad,
        outer_pad,
        border_box_size: (width + 2.0 * screenshot_pad, height + 2.0 * screenshot_pad),
        border_radius: 2.0 * screenshot_pad,
        independent_axis,
    }
}

/// Rejects canvases no renderer can allocate. Extreme aspect ratios turn
/// an ordinary screenshot into one, and an oversized RGBA buffer aborts the
/// process instead of returning an error.
pub fn check_canvas_size(size: (u32, u32)) -> Result<()> {
    let (width, height) = size;
    if width == 0 || height == 0 {
        bail!("frame canvas {width}x{height} is empty");
    }
    let pixels = u64::from(width) * u64::from(height);
    if width > MAX_CANVAS_SIDE || height > MAX_CANVAS_SIDE || pixels > MAX_CANVAS_PIXELS {
        bail!(
            "frame canvas {width}x{height} is too large (at most {MAX_CANVAS_SIDE}px per side); \
             check --target-aspect and the padding flags"
        );
    }
    Ok(())
}
