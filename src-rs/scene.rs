//! Declarative frame scene handed to a renderer.
//!
//! Gradient canvas ⊃ rounded border box ⊃ screenshot. Every child is centered
//! in its parent; the border box clips its content.

use crate::color::Rgb;
use crate::config::Gradient;
use crate::layout::Geometry;
use crate::source::SourceImage;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Scene {
    pub root: GradientBox,
}

#[derive(Debug, Clone, Serialize)]
pub struct GradientBox {
    pub size: (u32, u32),
    pub gradient: Gradient,
    pub child: RoundedBox,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundedBox {
    pub size: (f64, f64),
    pub radius: f64,
    pub fill: Rgb,
    pub child: ImageElement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectFit {
    /// Scale to fit entirely inside the box, keeping aspect ratio.
    Contain,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageElement {
    pub size: (u32, u32),
    pub fit: ObjectFit,
    #[serde(serialize_with = "serialize_source")]
    pub source: SourceImage,
}

fn serialize_source<S: serde::Serializer>(
    source: &SourceImage,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&source.path().display().to_string())
}

impl Scene {
    /// Canvas size, which is also the renderer viewport.
    pub fn viewport(&self) -> (u32, u32) {
        self.root.size
    }
}

pub fn compose_scene(
    geometry: &Geometry,
    border_color: Rgb,
    source: &SourceImage,
    gradient: &Gradient,
) -> Scene {
    Scene {
        root: GradientBox {
            size: geometry.final_size,
            gradient: *gradient,
            child: RoundedBox {
                size: geometry.border_box_size,
                radius: geometry.border_radius,
                fill: border_color,
                child: ImageElement {
                    size: geometry.screenshot_size,
                    fit: ObjectFit::Contain,
                    source: source.clone(),
                },
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::compute_layout;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    fn source(w: u32, h: u32) -> (tempfile::TempDir, SourceImage) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shot.png");
        RgbaImage::from_pixel(w, h, Rgba([9, 9, 9, 255]))
            .save(&path)
            .unwrap();
        let source = SourceImage::load(&path).unwrap();
        (dir, source)
    }

    #[test]
    fn scene_sizes_match_geometry_exactly() {
        let (_dir, source) = source(120, 80);
        let geometry = compute_layout(120, 80, 2.0 / 3.0, 0.1, 0.02);
        let scene = compose_scene(&geometry, Rgb::new(9, 9, 9), &source, &Gradient::default());

        assert_eq!(scene.root.size, geometry.final_size);
        assert_eq!(scene.viewport(), geometry.final_size);
        assert_eq!(scene.root.child.size, geometry.border_box_size);
        assert_eq!(scene.root.child.radius, geometry.border_radius);
        assert_eq!(scene.root.child.fill, Rgb::new(9, 9, 9));
        assert_eq!(scene.root.child.child.size, (120, 80));
        assert_eq!(scene.root.child.child.fit, ObjectFit::Contain);
        assert_eq!(scene.root.gradient, Gradient::default());
    }

    #[test]
    fn serializes_without_pixel_data() {
        let (_dir, source) = source(10, 10);
        let geometry = compute_layout(10, 10, 2.0 / 3.0, 0.1, 0.02);
        let scene = compose_scene(&geometry, Rgb::new(1, 2, 3), &source, &Gradient::default());

        let value = serde_json::to_value(&scene).unwrap();
        let rounded = &value["root"]["child"];
        assert_eq!(rounded["fill"], "#010203");
        assert_eq!(rounded["child"]["fit"], "contain");
        assert_eq!(
            rounded["child"]["source"],
            source.path().display().to_string()
        );
        assert_eq!(value["root"]["gradient"]["from"], "#0069a3");
    }
}
