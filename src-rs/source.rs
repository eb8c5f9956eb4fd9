use anyhow::{bail, Context, Result};
use image::RgbaImage;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A decoded screenshot. Pixel data and the original file bytes are shared
/// read-only with the scene built from it.
#[derive(Clone)]
pub struct SourceImage {
    path: PathBuf,
    encoded: Arc<[u8]>,
    pixels: Arc<RgbaImage>,
}

impl SourceImage {
    /// Reads and decodes `path`. Zero-area images are rejected here so the
    /// histogram and layout never see one.
    pub fn load(path: &Path) -> Result<Self> {
        let encoded = fs::read(path)
            .with_context(|| format!("failed to read image: {}", path.display()))?;
        let decoded = image::load_from_memory(&encoded)
            .with_context(|| format!("not a decodable image: {}", path.display()))?;
        let pixels = decoded.to_rgba8();
        if pixels.width() == 0 || pixels.height() == 0 {
            bail!("image has no pixels: {}", path.display());
        }
        Ok(Self {
            path: path.to_path_buf(),
            encoded: encoded.into(),
            pixels: Arc::new(pixels),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Row-major RGBA8 samples, `width * height * 4` bytes.
    pub fn rgba(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub fn pixels(&self) -> &Arc<RgbaImage> {
        &self.pixels
    }

    pub fn encoded(&self) -> &Arc<[u8]> {
        &self.encoded
    }

    /// MIME type sniffed from the encoded bytes, for data URIs.
    pub fn mime(&self) -> &'static str {
        image::guess_format(&self.encoded)
            .map(|format| format.to_mime_type())
            .unwrap_or("image/png")
    }
}

impl fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceImage")
            .field("path", &self.path)
            .field("width", &self.width())
            .field("height", &self.height())
            .field("encoded_len", &self.encoded.len())
            .finish()
    }
}
