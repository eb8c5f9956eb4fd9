use crate::color::Rgb;
use anyhow::{bail, Result};
use serde::Serialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const OUT_DIR_ENV: &str = "SNAPFRAME_OUT_DIR";
pub const BROWSER_ENV: &str = "SNAPFRAME_BROWSER";

const SAVE_DIR_NAME: &str = "Snapframe";

/// Two-stop linear gradient painted behind the frame. The angle follows CSS
/// conventions: 0° points up, 90° points right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Gradient {
    pub angle_deg: f64,
    pub from: Rgb,
    pub to: Rgb,
}

impl Default for Gradient {
    fn default() -> Self {
        Self {
            angle_deg: 45.0,
            from: Rgb::new(0x00, 0x69, 0xa3),
            to: Rgb::new(0x00, 0xbb, 0x8a),
        }
    }
}

/// Framing ratios.
///
/// Defaults: portrait target of 2/3 (height / width), 10% outer padding and
/// 2% border padding per side, both measured on the final canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameConfig {
    pub target_aspect_ratio: f64,
    pub outer_pad_percent: f64,
    pub screenshot_pad_percent: f64,
    pub gradient: Gradient,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            target_aspect_ratio: 2.0 / 3.0,
            outer_pad_percent: 0.1,
            screenshot_pad_percent: 0.02,
            gradient: Gradient::default(),
        }
    }
}

impl FrameConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.target_aspect_ratio.is_finite() || self.target_aspect_ratio <= 0.0 {
            bail!(
                "target aspect ratio must be a positive number, got {}",
                self.target_aspect_ratio
            );
        }
        for (name, value) in [
            ("outer pad", self.outer_pad_percent),
            ("screenshot pad", self.screenshot_pad_percent),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("{name} must be a non-negative fraction, got {value}");
            }
        }
        let reserved = 2.0 * (self.outer_pad_percent + self.screenshot_pad_percent);
        if reserved >= 1.0 {
            bail!(
                "padding reserves {:.0}% of the canvas; outer + screenshot pad must stay below 0.5",
                reserved * 100.0
            );
        }
        if !self.gradient.angle_deg.is_finite() {
            bail!("gradient angle must be finite");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RendererKind {
    /// In-process rasterizer
    Raster,
    /// Headless Chromium screenshot of the scene as HTML
    Browser,
}

/// Everything one run needs besides the collaborators.
#[derive(Debug, Clone)]
pub struct Settings {
    pub frame: FrameConfig,
    pub renderer: RendererKind,
    pub browser: Option<String>,
    pub render_timeout: Duration,
    pub parallel: bool,
    pub reveal: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            renderer: RendererKind::Raster,
            browser: None,
            render_timeout: Duration::from_secs(30),
            parallel: true,
            reveal: true,
        }
    }
}

/// Save directory: `$SNAPFRAME_OUT_DIR`, else `<Documents>/Snapframe`, else
/// `./Snapframe`.
pub fn save_dir() -> PathBuf {
    env::var(OUT_DIR_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::document_dir().map(|d| d.join(SAVE_DIR_NAME)))
        .or_else(|| dirs::home_dir().map(|d| d.join("Documents").join(SAVE_DIR_NAME)))
        .unwrap_or_else(|| PathBuf::from(SAVE_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = FrameConfig::default();
        config.validate().unwrap();
        assert_eq!(config.target_aspect_ratio, 2.0 / 3.0);
        assert_eq!(config.gradient.from.hex(), "#0069a3");
        assert_eq!(config.gradient.to.hex(), "#00bb8a");
    }

    #[test]
    fn rejects_padding_that_swallows_the_canvas() {
        let config = FrameConfig {
            outer_pad_percent: 0.4,
            screenshot_pad_percent: 0.1,
            ..FrameConfig::default()
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("below 0.5"), "{err}");
    }

    #[test]
    fn rejects_bad_ratios() {
        for ratio in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = FrameConfig {
                target_aspect_ratio: ratio,
                ..FrameConfig::default()
            };
            assert!(config.validate().is_err(), "accepted {ratio}");
        }
        let config = FrameConfig {
            outer_pad_percent: -0.1,
            ..FrameConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
