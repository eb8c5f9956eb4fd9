//! Scene rasterization backends.

mod browser;
mod raster;

pub use browser::BrowserRenderer;
pub use raster::RasterRenderer;

use crate::config::{RendererKind, Settings};
use crate::scene::Scene;
use anyhow::Result;
use std::path::Path;

/// Turns a scene into a PNG at `out`, replacing whatever is there.
/// Implementations must give up after their configured timeout.
pub trait SceneRenderer {
    fn name(&self) -> &'static str;

    fn render(&self, scene: &Scene, viewport: (u32, u32), out: &Path) -> Result<()>;
}

pub fn renderer_for(settings: &Settings) -> Result<Box<dyn SceneRenderer>> {
    Ok(match settings.renderer {
        RendererKind::Raster => Box::new(RasterRenderer::new(settings.render_timeout)),
        RendererKind::Browser => Box::new(BrowserRenderer::resolve(
            settings.browser.as_deref(),
            settings.render_timeout,
        )?),
    })
}
