use std::fs;
use std::path::Path;

use tracing::debug;

use crate::constants::format::RGBA_BYTES_PER_PIXEL;
use crate::errors::MeasurementError;

/// Headerless RGBA8 frame dump, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbaImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl RgbaImage {
    /// Pixel at `(x, y)` as `[r, g, b, a]`.
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y * self.width + x) * RGBA_BYTES_PER_PIXEL;
        let bytes = self.pixels.get(start..start + RGBA_BYTES_PER_PIXEL)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

/// Load a raw RGBA8 buffer of exactly `width * height * 4` bytes.
///
/// The alpha channel is forced to fully opaque.
pub fn load_rgba_image(
    path: impl AsRef<Path>,
    width: usize,
    height: usize,
) -> Result<RgbaImage, MeasurementError> {
    let path = path.as_ref();
    let mut pixels = fs::read(path)?;
    let expected = width
        .checked_mul(height)
        .and_then(|area| area.checked_mul(RGBA_BYTES_PER_PIXEL))
        .ok_or_else(|| MeasurementError::Image {
            path: path.to_path_buf(),
            reason: format!("dimensions {width}x{height} overflow"),
        })?;
    if pixels.len() != expected {
        return Err(MeasurementError::Image {
            path: path.to_path_buf(),
            reason: format!(
                "expected {expected} bytes for {width}x{height}, found {}",
                pixels.len()
            ),
        });
    }
    for pixel in pixels.chunks_exact_mut(RGBA_BYTES_PER_PIXEL) {
        pixel[3] = u8::MAX;
    }
    debug!(path = %path.display(), width, height, "loaded raw rgba image");
    Ok(RgbaImage {
        width,
        height,
        pixels,
    })
}
