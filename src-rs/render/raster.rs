use super::SceneRenderer;
use crate::config::Gradient;
use crate::fsutil::ensure_parent_dir;
use crate::layout::check_canvas_size;
use crate::scene::{ObjectFit, Scene};
use anyhow::{bail, Context, Result};
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};
use std::borrow::Cow;
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Page background outside the root box, as a browser would paint it.
const PAGE_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

pub struct RasterRenderer {
    timeout: Duration,
}

impl RasterRenderer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl SceneRenderer for RasterRenderer {
    fn name(&self) -> &'static str {
        "raster"
    }

    fn render(&self, scene: &Scene, viewport: (u32, u32), out: &Path) -> Result<()> {
        check_canvas_size(viewport)?;
        let scene = scene.clone();
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("snapframe-raster".to_string())
            .spawn(move || {
                let _ = tx.send(rasterize(&scene, viewport));
            })
            .context("failed to start raster worker")?;

        let canvas = match rx.recv_timeout(self.timeout) {
            Ok(canvas) => canvas,
            Err(RecvTimeoutError::Timeout) => bail!(
                "raster renderer did not finish within {}s",
                self.timeout.as_secs_f64()
            ),
            Err(RecvTimeoutError::Disconnected) => {
                bail!("raster renderer stopped without producing an image")
            }
        };

        ensure_parent_dir(out)?;
        canvas
            .save_with_format(out, ImageFormat::Png)
            .with_context(|| format!("failed to write framed image: {}", out.display()))?;
        Ok(())
    }
}

/// Paints the scene onto a `viewport`-sized canvas anchored at the top-left
/// of the root box.
pub fn rasterize(scene: &Scene, viewport: (u32, u32)) -> RgbaImage {
    let (vw, vh) = viewport;
    let mut canvas = RgbaImage::from_pixel(vw, vh, PAGE_BACKGROUND);

    let root = &scene.root;
    let (rw, rh) = root.size;
    paint_gradient(&mut canvas, root.size, &root.gradient);

    let rounded = &root.child;
    let (bw, bh) = rounded.size;
    let bx = (f64::from(rw) - bw) / 2.0;
    let by = (f64::from(rh) - bh) / 2.0;
    let shape = RoundedRect::new(bx, by, bw, bh, rounded.radius);
    paint_covered(&mut canvas, &shape, rounded.fill.to_rgba(255));

    let element = &rounded.child;
    let (ew, eh) = element.size;
    let content = match element.fit {
        ObjectFit::Contain => {
            let source: &RgbaImage = element.source.pixels();
            let (fw, fh) = contain_fit((source.width(), source.height()), (ew, eh));
            if (fw, fh) == source.dimensions() {
                Cow::Borrowed(source)
            } else {
                Cow::Owned(imageops::resize(source, fw, fh, FilterType::Lanczos3))
            }
        }
    };

    let ex = bx + (bw - f64::from(ew)) / 2.0;
    let ey = by + (bh - f64::from(eh)) / 2.0;
    let ox = (ex + (f64::from(ew) - f64::from(content.width())) / 2.0).round() as i64;
    let oy = (ey + (f64::from(eh) - f64::from(content.height())) / 2.0).round() as i64;
    blit_clipped(&mut canvas, &content, ox, oy, &shape);

    canvas
}

/// Largest size with the source's aspect ratio that fits inside `bounds`.
pub fn contain_fit(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (sw, sh) = (f64::from(source.0), f64::from(source.1));
    let (bw, bh) = (f64::from(bounds.0), f64::from(bounds.1));
    if sw <= 0.0 || sh <= 0.0 {
        return (0, 0);
    }
    let scale = (bw / sw).min(bh / sh);
    (
        ((sw * scale).round() as u32).min(bounds.0),
        ((sh * scale).round() as u32).min(bounds.1),
    )
}

fn paint_gradient(canvas: &mut RgbaImage, size: (u32, u32), gradient: &Gradient) {
    let (w, h) = (f64::from(size.0), f64::from(size.1));
    let angle = gradient.angle_deg.to_radians();
    let (dx, dy) = (angle.sin(), -angle.cos());
    // CSS sizes the gradient line so the start and end colors land exactly
    // on the corners.
    let length = (w * dx).abs() + (h * dy).abs();
    let (cx, cy) = (w / 2.0, h / 2.0);

    let max_x = size.0.min(canvas.width());
    let max_y = size.1.min(canvas.height());
    for y in 0..max_y {
        for x in 0..max_x {
            let px = f64::from(x) + 0.5 - cx;
            let py = f64::from(y) + 0.5 - cy;
            let t = if length > 0.0 {
                (px * dx + py * dy) / length + 0.5
            } else {
                0.5
            };
            canvas.put_pixel(x, y, gradient.from.lerp(gradient.to, t).to_rgba(255));
        }
    }
}

struct RoundedRect {
    cx: f64,
    cy: f64,
    half_w: f64,
    half_h: f64,
    radius: f64,
}

impl RoundedRect {
    fn new(x: f64, y: f64, w: f64, h: f64, radius: f64) -> Self {
        let half_w = w.max(0.0) / 2.0;
        let half_h = h.max(0.0) / 2.0;
        Self {
            cx: x + half_w,
            cy: y + half_h,
            half_w,
            half_h,
            radius: radius.max(0.0).min(half_w).min(half_h),
        }
    }

    /// Signed distance from `(px, py)` to the outline, negative inside.
    fn distance(&self, px: f64, py: f64) -> f64 {
        let qx = (px - self.cx).abs() - (self.half_w - self.radius);
        let qy = (py - self.cy).abs() - (self.half_h - self.radius);
        let outside = qx.max(0.0).hypot(qy.max(0.0));
        let inside = qx.max(qy).min(0.0);
        outside + inside - self.radius
    }

    /// Fraction of the pixel at `(x, y)` covered by the shape.
    fn coverage(&self, x: i64, y: i64) -> f64 {
        (0.5 - self.distance(x as f64 + 0.5, y as f64 + 0.5)).clamp(0.0, 1.0)
    }

    fn pixel_bounds(&self, width: u32, height: u32) -> (i64, i64, i64, i64) {
        let x0 = ((self.cx - self.half_w).floor() as i64).max(0);
        let y0 = ((self.cy - self.half_h).floor() as i64).max(0);
        let x1 = ((self.cx + self.half_w).ceil() as i64).min(i64::from(width));
        let y1 = ((self.cy + self.half_h).ceil() as i64).min(i64::from(height));
        (x0, y0, x1, y1)
    }
}

fn paint_covered(canvas: &mut RgbaImage, shape: &RoundedRect, color: Rgba<u8>) {
    let (x0, y0, x1, y1) = shape.pixel_bounds(canvas.width(), canvas.height());
    for y in y0..y1 {
        for x in x0..x1 {
            let coverage = shape.coverage(x, y);
            if coverage <= 0.0 {
                continue;
            }
            let mut src = color;
            src[3] = (f64::from(src[3]) * coverage).round() as u8;
            let dst = canvas.get_pixel_mut(x as u32, y as u32);
            *dst = blend_pixel(*dst, src);
        }
    }
}

fn blit_clipped(canvas: &mut RgbaImage, content: &RgbaImage, ox: i64, oy: i64, clip: &RoundedRect) {
    let (cw, ch) = (i64::from(canvas.width()), i64::from(canvas.height()));
    for (sx, sy, px) in content.enumerate_pixels() {
        let x = ox + i64::from(sx);
        let y = oy + i64::from(sy);
        if x < 0 || y < 0 || x >= cw || y >= ch {
            continue;
        }
        let coverage = clip.coverage(x, y);
        if coverage <= 0.0 {
            continue;
        }
        let mut src = *px;
        src[3] = (f64::from(src[3]) * coverage).round() as u8;
        let dst = canvas.get_pixel_mut(x as u32, y as u32);
        *dst = blend_pixel(*dst, src);
    }
}

fn blend_pixel(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let a = f64::from(src[3]) / 255.0;
    if a <= 0.0 {
        return dst;
    }
    if a >= 1.0 {
        return src;
    }
    let inv = 1.0 - a;
    let mix = |d: u8, s: u8| {
        (f64::from(d) * inv + f64::from(s) * a)
            .round()
            .clamp(0.0, 255.0) as u8
    };
    let out_a = (f64::from(dst[3]) + f64::from(src[3]) * inv)
        .round()
        .clamp(0.0, 255.0) as u8;
    Rgba([mix(dst[0], src[0]), mix(dst[1], src[1]), mix(dst[2], src[2]), out_a])
}
